mod advice;
mod preference;
mod problem;
mod router;
mod telemetry;

use std::net::SocketAddr;

use email_memory_core::{EmailAdvisor, ReferenceTables};
use email_memory_storage::Database;
use email_memory_util::{load_env_file, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let tables = match &config.tables_path {
        Some(path) => ReferenceTables::load(path)?,
        None => ReferenceTables::builtin(),
    };
    let source = config
        .tables_path
        .as_deref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "builtin".to_string());
    info!(
        stage = "advisor",
        source = %source,
        typos = tables.typo_count(),
        disposable = tables.disposable_count(),
        "reference tables loaded"
    );

    let database = Database::connect(&config.database_url).await?;
    database.run_migrations().await?;
    info!(stage = "storage", "database ready");

    let state = router::AppState::new(metrics, database, EmailAdvisor::new(tables));

    let addr: SocketAddr = config.bind_addr;
    info!(stage = "app", %addr, env = %config.environment.as_str(), "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state))
        .await
        .map_err(|err| err.into())
}
