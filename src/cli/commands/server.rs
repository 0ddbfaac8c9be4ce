use clap::Subcommand;
use serde_json::Value;
use std::time::Duration;

use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::config;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Check server health status from the /health endpoint")]
    Health {
        #[arg(long, help = "Server base URL (defaults to the locally configured port)")]
        url: Option<String>,
    },
}

fn default_url() -> String {
    format!("http://127.0.0.1:{}", config::config().server.port)
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Health { url } => {
            let base = url.unwrap_or_else(default_url);
            let endpoint = format!("{}/health", base.trim_end_matches('/'));

            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()?;
            let response = client.get(&endpoint).send().await?;
            let status = response.status();
            let body: Value = response.json().await.unwrap_or(Value::Null);

            if status.is_success() {
                output_success(output_format, &format!("{} is healthy", base), Some(body))
            } else {
                output_error(
                    output_format,
                    &format!("{} reported {}", base, status),
                    Some(body),
                )?;
                anyhow::bail!("server unhealthy")
            }
        }
    }
}
