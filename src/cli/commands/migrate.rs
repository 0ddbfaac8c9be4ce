use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config;
use crate::database::DatabaseManager;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect_lazy(&config::config().database)?;
    DatabaseManager::migrate(&pool).await?;
    output_success(output_format, "Database migrations applied", None)
}
