use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use asesor_agent::{AdvisorPipeline, OllamaClient};
use asesor_core::config::{AppConfig, ConfigError, LoadOptions};
use asesor_db::repositories::SqlAdvisorDataRepository;
use asesor_db::{connect_with_config, migrations, DbPool};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub pipeline: Arc<AdvisorPipeline>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let repository = Arc::new(SqlAdvisorDataRepository::new(db_pool.clone()));
    let llm = Arc::new(OllamaClient::from_config(&config.llm));
    let pipeline = Arc::new(AdvisorPipeline::new(repository, llm));
    info!(
        event_name = "system.bootstrap.pipeline_ready",
        model = %config.llm.model,
        "advisor pipeline initialized"
    );

    Ok(Application { config, db_pool, pipeline })
}
