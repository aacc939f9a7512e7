use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_FINANCIAL_IDS: &[i64] = &[1, 2, 3];
const SEED_MARKETING_IDS: &[i64] = &[1, 2, 3];
const SEED_MARKET_IDS: &[i64] = &[1, 2, 3, 4];

const SEED_SMALL_BUSINESS_ROWS: i64 = 2;
const SEED_LOW_DEBT_ROWS: i64 = 2;
const SEED_MARKET_CATEGORIES: i64 = 2;
const SEED_MARKET_LOCATIONS: i64 = 2;

/// Deterministic demo dataset for the three advisor domains.
///
/// Backs local development, the `seed` CLI command, and the fixture
/// verification tests. Rows carry explicit ids so reloading is safe.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    /// SQL fixture content for the demo seed data.
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed.sql");

    /// Load the demo dataset into the database.
    pub async fn load(pool: &DbPool) -> Result<SeedReport, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedReport {
            financial_rows: SEED_FINANCIAL_IDS.len(),
            marketing_rows: SEED_MARKETING_IDS.len(),
            market_rows: SEED_MARKET_IDS.len(),
        })
    }

    /// Verify that the seeded rows exist and match the dataset contract.
    pub async fn verify(pool: &DbPool) -> Result<SeedVerification, RepositoryError> {
        let mut checks = Vec::new();

        let quoted_financial = sql_array_from_ids(SEED_FINANCIAL_IDS);
        let financial_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM agente_financiero WHERE id IN {quoted_financial}"
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("financial-rows", financial_count == SEED_FINANCIAL_IDS.len() as i64));

        let small_business_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM agente_financiero WHERE tipo_negocio = 'Pequeño'",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("financial-small-business-rows", small_business_count == SEED_SMALL_BUSINESS_ROWS));

        let low_debt_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM agente_financiero WHERE nivel_endeudamiento = 'Bajo'",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("financial-low-debt-rows", low_debt_count == SEED_LOW_DEBT_ROWS));

        let quoted_marketing = sql_array_from_ids(SEED_MARKETING_IDS);
        let marketing_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM agente_marketing WHERE id IN {quoted_marketing}"
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("marketing-rows", marketing_count == SEED_MARKETING_IDS.len() as i64));

        let budget_spread: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM agente_marketing WHERE presupuesto = 500.0)
             AND EXISTS(SELECT 1 FROM agente_marketing WHERE presupuesto = 12000.0)",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("marketing-budget-spread", budget_spread == 1));

        let quoted_market = sql_array_from_ids(SEED_MARKET_IDS);
        let market_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM agente_mercado WHERE id IN {quoted_market}"
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("market-rows", market_count == SEED_MARKET_IDS.len() as i64));

        let category_count: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT categoria) FROM agente_mercado")
                .fetch_one(pool)
                .await?;
        checks.push(("market-categories", category_count == SEED_MARKET_CATEGORIES));

        let location_count: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT ubicacion_geografica) FROM agente_mercado")
                .fetch_one(pool)
                .await?;
        checks.push(("market-locations", location_count == SEED_MARKET_LOCATIONS));

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(SeedVerification { all_present, checks })
    }

    /// Remove the seeded rows from a test database.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let quoted_financial = sql_array_from_ids(SEED_FINANCIAL_IDS);
        let quoted_marketing = sql_array_from_ids(SEED_MARKETING_IDS);
        let quoted_market = sql_array_from_ids(SEED_MARKET_IDS);

        sqlx::query(&format!("DELETE FROM agente_financiero WHERE id IN {quoted_financial}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM agente_marketing WHERE id IN {quoted_marketing}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM agente_mercado WHERE id IN {quoted_market}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

fn sql_array_from_ids(ids: &[i64]) -> String {
    let quoted = ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug)]
pub struct SeedReport {
    pub financial_rows: usize,
    pub marketing_rows: usize,
    pub market_rows: usize,
}

#[derive(Debug)]
pub struct SeedVerification {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_with_settings, migrations};

    #[test]
    fn sql_fixture_is_valid() {
        assert!(!DemoSeedDataset::SQL.is_empty());
    }

    #[tokio::test]
    async fn verify_seed_contract_and_idempotency() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");

        migrations::run_pending(&pool).await.expect("run migrations");

        let first = DemoSeedDataset::load(&pool).await.expect("load seed fixtures");
        let first_verification = DemoSeedDataset::verify(&pool).await.expect("verify seed fixtures");
        assert!(first_verification.all_present);
        assert_eq!(first.financial_rows, 3);
        assert_eq!(first.marketing_rows, 3);
        assert_eq!(first.market_rows, 4);

        let second = DemoSeedDataset::load(&pool).await.expect("reload seed fixtures");
        let second_verification =
            DemoSeedDataset::verify(&pool).await.expect("re-verify seed fixtures");
        assert!(second_verification.all_present);
        assert_eq!(second.market_rows, 4);
        assert_eq!(first_verification.checks, second_verification.checks);
    }

    #[tokio::test]
    async fn verify_seed_answers_the_advisor_queries() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");

        migrations::run_pending(&pool).await.expect("run migrations");
        DemoSeedDataset::load(&pool).await.expect("load seed fixtures");

        let average_food_price: f64 =
            sqlx::query_scalar("SELECT AVG(precio) FROM agente_mercado WHERE categoria = 'Alimentos'")
                .fetch_one(&pool)
                .await
                .expect("query average price");
        assert!((average_food_price - 54.0).abs() < f64::EPSILON);

        let oaxaca_competitors: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM agente_mercado WHERE ubicacion_geografica = 'Oaxaca Centro'",
        )
        .fetch_one(&pool)
        .await
        .expect("query competitor count");
        assert_eq!(oaxaca_competitors, 3);

        let nearest_platforms: String = sqlx::query_scalar(
            "SELECT plataformas_utilizadas FROM agente_marketing
             ORDER BY ABS(presupuesto - 450.0) ASC, presupuesto DESC, rendimiento DESC
             LIMIT 1",
        )
        .fetch_one(&pool)
        .await
        .expect("query nearest campaign");
        assert_eq!(nearest_platforms, "Facebook, Instagram");

        DemoSeedDataset::clean(&pool).await.expect("clean seed fixtures");
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM agente_financiero")
            .fetch_one(&pool)
            .await
            .expect("count after clean");
        assert_eq!(remaining, 0);
    }

    #[test]
    fn seed_contract_json_matches_rust_seed_constants() {
        let contract: serde_json::Value =
            serde_json::from_str(include_str!("../../../config/fixtures/demo_seed_contract.json"))
                .expect("demo seed contract JSON must parse");

        assert_eq!(contract["dataset_version"].as_str(), Some("asesor-demo-1.0.0"));
        assert_eq!(contract["seed_dataset"].as_str(), Some("deterministic_advisor_demo"));

        let financial = &contract["tables"]["agente_financiero"];
        assert_eq!(financial["rows"].as_u64(), Some(SEED_FINANCIAL_IDS.len() as u64));
        assert_eq!(financial["small_business_rows"].as_i64(), Some(SEED_SMALL_BUSINESS_ROWS));
        assert_eq!(financial["low_debt_rows"].as_i64(), Some(SEED_LOW_DEBT_ROWS));

        let marketing = &contract["tables"]["agente_marketing"];
        assert_eq!(marketing["rows"].as_u64(), Some(SEED_MARKETING_IDS.len() as u64));

        let market = &contract["tables"]["agente_mercado"];
        assert_eq!(market["rows"].as_u64(), Some(SEED_MARKET_IDS.len() as u64));
        assert_eq!(market["categories"].as_i64(), Some(SEED_MARKET_CATEGORIES));
        assert_eq!(market["locations"].as_i64(), Some(SEED_MARKET_LOCATIONS));
    }
}
