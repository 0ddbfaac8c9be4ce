mod common;

use anyhow::Result;
use reqwest::StatusCode;
use std::time::Duration;

#[tokio::test]
async fn health_reports_database_outage() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::get(server.url("/health")).await?;

    // The test server points at a database that never answers
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["status"], "degraded");
    Ok(())
}

#[tokio::test]
async fn root_banner_names_the_service() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::get(server.url("/")).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Site Ledger API");
    assert_eq!(body["data"]["spreadsheet_sink"], "log");
    Ok(())
}

#[tokio::test]
async fn unknown_routes_are_not_found() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::get(server.url("/api/nothing-here")).await?;
    assert!(
        res.status() == StatusCode::NOT_FOUND || res.status() == StatusCode::UNAUTHORIZED,
        "unexpected status: {}",
        res.status()
    );
    Ok(())
}

#[tokio::test]
async fn server_exits_when_stdin_closes() -> Result<()> {
    let port = portpicker::pick_unused_port().expect("free port");
    let mut child = common::server_command(port).spawn()?;
    common::wait_ready(&format!("http://127.0.0.1:{}", port), Duration::from_secs(15)).await?;

    drop(child.stdin.take());

    let status = common::wait_for_exit(&mut child, Duration::from_secs(10)).await?;
    if status.is_none() {
        let _ = child.kill();
    }
    assert!(status.is_some_and(|s| s.success()), "server still running or failed: {:?}", status);
    Ok(())
}

#[tokio::test]
async fn failed_auto_migration_stops_startup() -> Result<()> {
    let port = portpicker::pick_unused_port().expect("free port");
    let mut child = common::server_command(port)
        .env("DATABASE_AUTO_MIGRATE", "true")
        .spawn()?;

    let status = common::wait_for_exit(&mut child, Duration::from_secs(20)).await?;
    if status.is_none() {
        let _ = child.kill();
    }
    assert!(status.is_some_and(|s| !s.success()), "expected a failed exit, got {:?}", status);

    // Nothing was ever served
    assert!(reqwest::get(format!("http://127.0.0.1:{}/health", port)).await.is_err());
    Ok(())
}
