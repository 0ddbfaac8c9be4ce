use clap::Subcommand;
use serde_json::json;

use crate::auth::{hash_password, validate_password, validate_username};
use crate::cli::utils::{output_success, output_table};
use crate::cli::OutputFormat;
use crate::config;
use crate::database::models::{Role, User};
use crate::database::DatabaseManager;

/// Environment variable read when `--password` is omitted
pub const PASSWORD_ENV: &str = "SITE_LEDGER_PASSWORD";

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create a user (use this to bootstrap the first manager)")]
    Add {
        #[arg(help = "Login name")]
        username: String,
        #[arg(long, default_value = "supervisor", help = "manager or supervisor")]
        role: Role,
        #[arg(long, default_value = "", help = "Contact phone number")]
        phone: String,
        #[arg(long, help = "Password (falls back to SITE_LEDGER_PASSWORD)")]
        password: Option<String>,
    },

    #[command(about = "List active users")]
    List,
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let app_config = config::config();
    let pool = DatabaseManager::connect_lazy(&app_config.database)?;

    match cmd {
        UserCommands::Add {
            username,
            role,
            phone,
            password,
        } => {
            let password = match password.or_else(|| std::env::var(PASSWORD_ENV).ok()) {
                Some(password) => password,
                None => anyhow::bail!("no password given: pass --password or set {}", PASSWORD_ENV),
            };
            validate_username(&username).map_err(anyhow::Error::msg)?;
            validate_password(&password).map_err(anyhow::Error::msg)?;

            let hash = hash_password(&password, app_config.security.bcrypt_cost)?;
            let user = User::create(&pool, &username, &hash, role, &phone).await?;

            output_success(
                output_format,
                &format!("Created {} '{}'", user.role, user.username),
                Some(json!({ "id": user.id, "username": user.username, "role": user.role })),
            )
        }
        UserCommands::List => {
            let users = User::list_active(&pool, None).await?;
            let rows = users
                .iter()
                .map(|u| vec![u.username.clone(), u.role.to_string(), u.phone.clone(), u.id.to_string()])
                .collect::<Vec<_>>();
            output_table(
                output_format,
                "users",
                &["USERNAME", "ROLE", "PHONE", "ID"],
                &rows,
                serde_json::to_value(&users)?,
            )
        }
    }
}
