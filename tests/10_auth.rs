mod common;

use anyhow::Result;
use reqwest::StatusCode;
use uuid::Uuid;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::get(server.url("/health")).await?;

    // OK with a database, SERVICE_UNAVAILABLE without one
    assert!(
        res.status() == StatusCode::OK || res.status() == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status: {}",
        res.status()
    );
    let body = res.json::<serde_json::Value>().await?;
    assert!(body.get("success").is_some(), "missing success flag: {}", body);
    assert!(body.get("message").is_some(), "missing message: {}", body);
    Ok(())
}

#[tokio::test]
async fn root_describes_service() -> Result<()> {
    let server = common::ensure_server().await?;
    let body = reqwest::get(server.url("/")).await?.json::<serde_json::Value>().await?;

    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "venue-admin-api");
    Ok(())
}

#[tokio::test]
async fn protected_route_requires_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::get(server.url("/get-all-roles")).await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn malformed_and_foreign_tokens_are_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(server.url("/get-venues"))
        .header("Authorization", "Bearer not-a-jwt")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let foreign = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &serde_json::json!({ "sub": Uuid::new_v4(), "email": "x@example.com", "iat": 0, "exp": 4_000_000_000u64 }),
        &jsonwebtoken::EncodingKey::from_secret(b"some other secret"),
    )?;
    let res = client
        .post(server.url("/remove-venues"))
        .bearer_auth(foreign)
        .json(&serde_json::json!({ "ids": [Uuid::new_v4()] }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn token_for_unknown_admin_is_rejected() -> Result<()> {
    if common::database().await.is_none() {
        return Ok(());
    }
    let server = common::ensure_server().await?;

    let res = reqwest::Client::new()
        .get(server.url("/fetch-roles"))
        .bearer_auth(common::token_for(Uuid::new_v4()))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn server_refuses_to_start_without_a_secret() -> Result<()> {
    let port = portpicker::pick_unused_port().expect("free port");
    let mut child = tokio::process::Command::new(env!("CARGO_BIN_EXE_venue-admin-api"))
        .env("APP_ENV", "staging")
        .env("JWT_SECRET", "")
        .env("VENUE_API_PORT", port.to_string())
        .env("HOST", "127.0.0.1")
        .env("DATABASE_URL", "postgres://postgres@127.0.0.1:1/unused")
        .env("DATABASE_AUTO_MIGRATE", "false")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    let status = tokio::time::timeout(std::time::Duration::from_secs(10), child.wait())
        .await
        .expect("server kept running with an empty secret")?;
    assert!(!status.success());
    Ok(())
}
