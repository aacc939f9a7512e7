use crate::commands::CommandResult;
use asesor_core::config::{AppConfig, LoadOptions};
use asesor_db::{connect_with_settings, migrations};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    match runtime.block_on(apply_pending(&config)) {
        Ok(version) => CommandResult::success(
            "migrate",
            format!("database schema is current at migration version {version}"),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}

/// Apply pending migrations and report the schema version the database
/// ends up at.
async fn apply_pending(config: &AppConfig) -> Result<i64, (&'static str, String, u8)> {
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

    let applied = match migrations::run_pending(&pool).await {
        Ok(()) => {
            sqlx::query_scalar::<_, i64>("SELECT IFNULL(MAX(version), 0) FROM _sqlx_migrations")
                .fetch_one(&pool)
                .await
                .map_err(|error| ("migration", error.to_string(), 5u8))
        }
        Err(error) => Err(("migration", error.to_string(), 5u8)),
    };

    pool.close().await;
    applied
}
