use anyhow::Result;
use serde_json::Value;
use std::time::Duration;

mod common;

async fn start_exporter() -> (u16, tokio::task::JoinHandle<Result<()>>) {
    let port = common::get_available_port();
    let dsn = common::unreachable_dsn();

    let handle = tokio::spawn(async move {
        odyssey_exporter::exporter::new(
            port,
            Some("127.0.0.1".to_string()),
            dsn,
            Some(Duration::from_secs(2)),
        )
        .await
    });

    assert!(
        common::wait_for_server(port, 50).await,
        "Server failed to start"
    );

    (port, handle)
}

#[tokio::test]
async fn test_health_endpoint_reports_unreachable_odyssey() -> Result<()> {
    let (port, handle) = start_exporter().await;

    let response = reqwest::Client::new()
        .get(format!("{}/health", common::get_test_url(port)))
        .send()
        .await?;

    assert_eq!(response.status(), 503);

    let body: Value = response.json().await?;
    assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["odyssey"], "error");
    assert!(body["commit"].is_string());

    handle.abort();

    Ok(())
}

#[tokio::test]
async fn test_health_endpoint_options_request() -> Result<()> {
    let (port, handle) = start_exporter().await;

    let response = reqwest::Client::new()
        .request(
            reqwest::Method::OPTIONS,
            format!("{}/health", common::get_test_url(port)),
        )
        .send()
        .await?;

    assert_eq!(response.status(), 503);
    assert!(response.headers().contains_key("X-App"));
    assert!(response.text().await?.is_empty());

    handle.abort();

    Ok(())
}

#[tokio::test]
async fn test_health_endpoint_has_x_app_header() -> Result<()> {
    let (port, handle) = start_exporter().await;

    let response = reqwest::Client::new()
        .get(format!("{}/health", common::get_test_url(port)))
        .send()
        .await?;

    let x_app = response
        .headers()
        .get("X-App")
        .expect("X-App header should be present");

    let x_app_str = x_app.to_str()?;
    assert!(x_app_str.starts_with(concat!(
        env!("CARGO_PKG_NAME"),
        ":",
        env!("CARGO_PKG_VERSION"),
        ":"
    )));

    handle.abort();

    Ok(())
}

#[tokio::test]
async fn test_request_id_is_propagated() -> Result<()> {
    let (port, handle) = start_exporter().await;

    let response = reqwest::Client::new()
        .get(format!("{}/health", common::get_test_url(port)))
        .header("x-request-id", "scrape-42")
        .send()
        .await?;

    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .map(|v| v.to_str().unwrap_or_default()),
        Some("scrape-42")
    );

    let generated = reqwest::Client::new()
        .get(format!("{}/health", common::get_test_url(port)))
        .send()
        .await?;
    assert!(generated.headers().contains_key("x-request-id"));

    handle.abort();

    Ok(())
}
