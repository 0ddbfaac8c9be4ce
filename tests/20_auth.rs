mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;
use site_ledger_api::database::models::Role;

#[tokio::test]
async fn protected_routes_require_a_bearer_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    for path in ["/api/auth/me", "/api/sites", "/api/expenses", "/api/reports/summary"] {
        let res = client.get(server.url(path)).send().await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{}", path);

        let body = res.json::<serde_json::Value>().await?;
        assert_eq!(body["success"], false);
        assert!(body.get("error").is_some(), "missing error field: {}", body);
    }
    Ok(())
}

#[tokio::test]
async fn forged_tokens_are_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::Client::new()
        .get(server.url("/api/auth/me"))
        .bearer_auth("not.a.token")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn valid_token_reaches_the_user_lookup() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::Client::new()
        .get(server.url("/api/auth/me"))
        .bearer_auth(common::token_for(Role::Manager))
        .send()
        .await?;

    // Accepted by the token check, then fails on the unreachable database
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

#[tokio::test]
async fn login_requires_credentials() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "username": "  ", "password": "" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], false);

    // Missing JSON body
    let res = client.post(server.url("/api/auth/login")).send().await?;
    assert!(res.status().is_client_error(), "got {}", res.status());
    Ok(())
}

#[tokio::test]
async fn login_surfaces_database_outage() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::Client::new()
        .post(server.url("/api/auth/login"))
        .json(&json!({ "username": "admin", "password": "123" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}
