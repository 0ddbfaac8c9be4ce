use anyhow::Context;
use site_ledger_api::{app, config, database::DatabaseManager, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    let config = config::config();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.default_log_filter())),
        )
        .init();

    config.validate().context("invalid configuration")?;
    tracing::info!("Starting Site Ledger API in {:?} mode", config.environment);
    if site_ledger_api::is_development!() {
        tracing::warn!("Development profile active; set APP_ENV=production for deployments");
    }

    let state = AppState::from_config(config)?;
    tracing::info!(
        "Database {} (spreadsheet sink: {})",
        DatabaseManager::redacted_url(&config.database.url),
        state.sheets.name()
    );

    if config.database.auto_migrate {
        DatabaseManager::migrate(&state.pool)
            .await
            .context("migrations failed")?;
    }

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Site Ledger API listening on http://{}", bind_addr);

    axum::serve(listener, app(state, &config.security.cors_origins))
        .with_graceful_shutdown(shutdown_signal(config.server.exit_on_stdin_close))
        .await?;
    tracing::info!("Site Ledger API stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or when stdin closes if `watch_stdin` is set
async fn shutdown_signal(watch_stdin: bool) {
    let stdin_closed = async {
        if !watch_stdin {
            return std::future::pending::<()>().await;
        }
        // A detached thread, so a blocked read never holds up process exit
        let (closed_tx, closed_rx) = tokio::sync::oneshot::channel::<()>();
        std::thread::spawn(move || {
            let _ = std::io::copy(&mut std::io::stdin().lock(), &mut std::io::sink());
            let _ = closed_tx.send(());
        });
        let _ = closed_rx.await;
        tracing::info!("stdin closed, shutting down");
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("Ctrl-C received, shutting down"),
        _ = stdin_closed => {}
    }
}
