use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};

use asesor_core::retrieval::{CampaignPlan, LoanProfile};

use crate::connection::DbPool;
use crate::repositories::{AdvisorDataRepository, RepositoryError};

pub struct SqlAdvisorDataRepository {
    pool: DbPool,
}

impl SqlAdvisorDataRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdvisorDataRepository for SqlAdvisorDataRepository {
    async fn financing_options(&self) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT opciones_financiamiento FROM agente_financiero WHERE tipo_negocio = 'Pequeño'",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(financing_option_from_row).collect()
    }

    async fn loan_profiles(&self) -> Result<Vec<LoanProfile>, RepositoryError> {
        let rows =
            sqlx::query("SELECT nivel_endeudamiento, ingresos_mensuales FROM agente_financiero")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(loan_profile_from_row).collect()
    }

    async fn required_documents(&self) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query("SELECT DISTINCT documentos_necesarios FROM agente_financiero")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(required_documents_from_row).collect()
    }

    async fn campaign_plan_near_budget(
        &self,
        budget: f64,
    ) -> Result<Option<CampaignPlan>, RepositoryError> {
        let row = sqlx::query(
            "SELECT plataformas_utilizadas, tipo_anuncio, estrategias_utilizadas, presupuesto
             FROM agente_marketing
             ORDER BY ABS(presupuesto - ?1) ASC, presupuesto DESC, rendimiento DESC
             LIMIT 1",
        )
        .bind(budget)
        .fetch_optional(&self.pool)
        .await?;

        row.map(campaign_plan_from_row).transpose()
    }

    async fn average_price(&self, category: &str) -> Result<Option<f64>, RepositoryError> {
        let average: Option<f64> =
            sqlx::query_scalar("SELECT AVG(precio) FROM agente_mercado WHERE categoria = ?1")
                .bind(category)
                .fetch_one(&self.pool)
                .await?;

        Ok(average)
    }

    async fn competitor_count(&self, location: &str) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM agente_mercado WHERE ubicacion_geografica = ?1",
        )
        .bind(location)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn international_markets(&self) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query("SELECT mercados_internacionales FROM agente_mercado")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(international_markets_from_row).collect()
    }
}

fn financing_option_from_row(row: SqliteRow) -> Result<String, RepositoryError> {
    Ok(row.try_get("opciones_financiamiento")?)
}

fn loan_profile_from_row(row: SqliteRow) -> Result<LoanProfile, RepositoryError> {
    Ok(LoanProfile {
        debt_level: row.try_get("nivel_endeudamiento")?,
        monthly_income: row.try_get("ingresos_mensuales")?,
    })
}

fn required_documents_from_row(row: SqliteRow) -> Result<String, RepositoryError> {
    Ok(row.try_get("documentos_necesarios")?)
}

fn campaign_plan_from_row(row: SqliteRow) -> Result<CampaignPlan, RepositoryError> {
    Ok(CampaignPlan {
        platforms: row.try_get("plataformas_utilizadas")?,
        ad_type: row.try_get("tipo_anuncio")?,
        strategies: row.try_get("estrategias_utilizadas")?,
        budget: row.try_get("presupuesto")?,
    })
}

fn international_markets_from_row(row: SqliteRow) -> Result<String, RepositoryError> {
    Ok(row.try_get("mercados_internacionales")?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_with_settings, migrations};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    async fn seed_financiero(pool: &DbPool) {
        for (tipo, opciones, nivel, ingresos, documentos) in [
            ("Pequeño", "Microcrédito, Crédito PyME", "Bajo", 18500.0, "INE, Estados de cuenta"),
            ("Pequeño", "Crédito PyME, Arrendamiento", "Bajo", 22300.0, "INE, Estados de cuenta"),
            ("Mediano", "Línea de crédito revolvente", "Alto", 64200.0, "INE, Declaración anual"),
        ] {
            sqlx::query(
                "INSERT INTO agente_financiero
                 (tipo_negocio, opciones_financiamiento, nivel_endeudamiento, ingresos_mensuales, documentos_necesarios)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(tipo)
            .bind(opciones)
            .bind(nivel)
            .bind(ingresos)
            .bind(documentos)
            .execute(pool)
            .await
            .expect("seed agente_financiero");
        }
    }

    async fn seed_marketing(pool: &DbPool, rows: &[(&str, &str, &str, f64, f64)]) {
        for (plataformas, tipo, estrategias, presupuesto, rendimiento) in rows {
            sqlx::query(
                "INSERT INTO agente_marketing
                 (plataformas_utilizadas, tipo_anuncio, estrategias_utilizadas, presupuesto, rendimiento)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(plataformas)
            .bind(tipo)
            .bind(estrategias)
            .bind(presupuesto)
            .bind(rendimiento)
            .execute(pool)
            .await
            .expect("seed agente_marketing");
        }
    }

    async fn seed_mercado(pool: &DbPool) {
        for (categoria, ubicacion, precio, mercados) in [
            ("Alimentos", "Oaxaca Centro", 45.0, "Estados Unidos, Canadá"),
            ("Alimentos", "Oaxaca Centro", 55.0, "Estados Unidos"),
            ("Artesanías", "Oaxaca Centro", 350.0, "Japón, Estados Unidos"),
            ("Alimentos", "Puebla Norte", 62.0, "Canadá"),
        ] {
            sqlx::query(
                "INSERT INTO agente_mercado
                 (categoria, ubicacion_geografica, precio, mercados_internacionales)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(categoria)
            .bind(ubicacion)
            .bind(precio)
            .bind(mercados)
            .execute(pool)
            .await
            .expect("seed agente_mercado");
        }
    }

    #[tokio::test]
    async fn financing_options_only_include_small_businesses() {
        let pool = setup_pool().await;
        seed_financiero(&pool).await;
        let repository = SqlAdvisorDataRepository::new(pool.clone());

        let options = repository.financing_options().await.expect("financing options");

        assert_eq!(
            options,
            vec![
                "Microcrédito, Crédito PyME".to_string(),
                "Crédito PyME, Arrendamiento".to_string(),
            ],
        );

        pool.close().await;
    }

    #[tokio::test]
    async fn loan_profiles_cover_every_business_size() {
        let pool = setup_pool().await;
        seed_financiero(&pool).await;
        let repository = SqlAdvisorDataRepository::new(pool.clone());

        let profiles = repository.loan_profiles().await.expect("loan profiles");

        assert_eq!(profiles.len(), 3);
        assert_eq!(profiles[0].debt_level, "Bajo");
        assert_eq!(profiles[2].debt_level, "Alto");
        assert!((profiles[1].monthly_income - 22300.0).abs() < f64::EPSILON);

        pool.close().await;
    }

    #[tokio::test]
    async fn required_documents_are_deduplicated_by_row() {
        let pool = setup_pool().await;
        seed_financiero(&pool).await;
        let repository = SqlAdvisorDataRepository::new(pool.clone());

        let documents = repository.required_documents().await.expect("required documents");

        assert_eq!(
            documents,
            vec!["INE, Estados de cuenta".to_string(), "INE, Declaración anual".to_string()],
        );

        pool.close().await;
    }

    #[tokio::test]
    async fn campaign_plan_prefers_nearest_budget() {
        let pool = setup_pool().await;
        seed_marketing(
            &pool,
            &[
                ("Facebook, Instagram", "Video corto", "Retargeting", 500.0, 3.8),
                ("Google Ads", "Anuncio de búsqueda", "Palabras clave", 5000.0, 2.9),
                ("TikTok", "Video vertical", "Contenido orgánico", 12000.0, 4.5),
            ],
        )
        .await;
        let repository = SqlAdvisorDataRepository::new(pool.clone());

        let plan = repository
            .campaign_plan_near_budget(450.0)
            .await
            .expect("campaign plan")
            .expect("a row should match");

        assert_eq!(plan.platforms, "Facebook, Instagram");
        assert!((plan.budget - 500.0).abs() < f64::EPSILON);

        pool.close().await;
    }

    #[tokio::test]
    async fn campaign_plan_breaks_budget_ties_toward_higher_budget() {
        let pool = setup_pool().await;
        seed_marketing(
            &pool,
            &[
                ("Facebook", "Video corto", "Retargeting", 400.0, 4.9),
                ("Google Ads", "Anuncio de búsqueda", "Palabras clave", 600.0, 2.1),
            ],
        )
        .await;
        let repository = SqlAdvisorDataRepository::new(pool.clone());

        let plan = repository
            .campaign_plan_near_budget(500.0)
            .await
            .expect("campaign plan")
            .expect("a row should match");

        assert_eq!(plan.platforms, "Google Ads");

        pool.close().await;
    }

    #[tokio::test]
    async fn campaign_plan_is_none_on_empty_table() {
        let pool = setup_pool().await;
        let repository = SqlAdvisorDataRepository::new(pool.clone());

        let plan = repository.campaign_plan_near_budget(450.0).await.expect("campaign plan");

        assert!(plan.is_none());

        pool.close().await;
    }

    #[tokio::test]
    async fn average_price_covers_only_the_requested_category() {
        let pool = setup_pool().await;
        seed_mercado(&pool).await;
        let repository = SqlAdvisorDataRepository::new(pool.clone());

        let average = repository
            .average_price("Alimentos")
            .await
            .expect("average price")
            .expect("category has rows");
        assert!((average - 54.0).abs() < f64::EPSILON);

        let missing = repository.average_price("Electrónica").await.expect("average price");
        assert!(missing.is_none());

        pool.close().await;
    }

    #[tokio::test]
    async fn competitor_count_is_zero_for_unknown_location() {
        let pool = setup_pool().await;
        seed_mercado(&pool).await;
        let repository = SqlAdvisorDataRepository::new(pool.clone());

        let local = repository.competitor_count("Oaxaca Centro").await.expect("competitor count");
        assert_eq!(local, 3);

        let unknown = repository.competitor_count("CDMX").await.expect("competitor count");
        assert_eq!(unknown, 0);

        pool.close().await;
    }

    #[tokio::test]
    async fn international_markets_come_from_every_row() {
        let pool = setup_pool().await;
        seed_mercado(&pool).await;
        let repository = SqlAdvisorDataRepository::new(pool.clone());

        let markets = repository.international_markets().await.expect("international markets");

        assert_eq!(markets.len(), 4);
        assert!(markets.contains(&"Japón, Estados Unidos".to_string()));

        pool.close().await;
    }
}
