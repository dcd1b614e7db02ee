mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use common::TestContext;
use serde_json::Value;

use netcaster::web::{AppState, create_router};

fn server(ctx: &TestContext) -> TestServer {
    let state = AppState::new(
        ctx.database.clone(),
        ctx.supervisor.clone(),
        ctx.generator.clone(),
        "http://tv.example.com",
    );
    TestServer::new(create_router(state)).unwrap()
}

#[tokio::test]
async fn test_health_endpoints() {
    let ctx = TestContext::new().await;
    let server = server(&ctx);

    let health: Value = server.get("/health").await.json();
    assert_eq!(health["data"]["status"], "healthy");
    assert_eq!(health["data"]["database"], "connected");

    server.get("/ready").await.assert_status_ok();
    server.get("/live").await.assert_status_ok();
}

#[tokio::test]
async fn test_broadcast_lifecycle_over_api() {
    let ctx = TestContext::new().await;
    let (network, _) = ctx.network_with_pool("Api", true, &[3600, 1800]).await;
    let server = server(&ctx);
    let base = format!("/api/v1/networks/{}", network.id);

    let status: Value = server.get(&format!("{base}/broadcast")).await.json();
    assert_eq!(status["success"], true);
    assert_eq!(status["data"]["state"], "stopped");

    let started: Value = server.post(&format!("{base}/broadcast/start")).await.json();
    assert_eq!(started["data"]["outcome"], "started");
    assert_eq!(started["data"]["status"]["state"], "active");
    assert!(started["data"]["status"]["pid"].is_i64());

    let restarted: Value = server.post(&format!("{base}/broadcast/restart")).await.json();
    assert_eq!(restarted["data"]["outcome"], "started");

    let stopped: Value = server.post(&format!("{base}/broadcast/stop")).await.json();
    assert_eq!(stopped["data"]["cleaned_up"], true);

    let status: Value = server.get(&format!("{base}/broadcast")).await.json();
    assert_eq!(status["data"]["state"], "stopped");
    assert_eq!(status["data"]["requested"], false);
}

#[tokio::test]
async fn test_schedule_endpoints() {
    let ctx = TestContext::new().await;
    let (network, contents) = ctx.network_with_pool("Schedule", false, &[3600, 1800]).await;
    let server = server(&ctx);
    let base = format!("/api/v1/networks/{}", network.id);

    let generated: Value = server.post(&format!("{base}/schedule/regenerate")).await.json();
    assert!(generated["data"]["created"].as_u64().unwrap() > 0);

    let schedule: Value = server
        .get(&format!("{base}/schedule"))
        .add_query_param("limit", 2)
        .await
        .json();
    let programmes = schedule["data"].as_array().unwrap();
    assert_eq!(programmes.len(), 2);
    assert_eq!(
        programmes[0]["content"]["id"],
        contents[0].id().to_string()
    );
    assert_eq!(programmes[0]["end_time"], programmes[1]["start_time"]);
}

#[tokio::test]
async fn test_invalid_and_unknown_network_ids() {
    let ctx = TestContext::new().await;
    let server = server(&ctx);

    server
        .get("/api/v1/networks/not-a-uuid/broadcast")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post(&format!(
            "/api/v1/networks/{}/broadcast/start",
            uuid::Uuid::new_v4()
        ))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_epg_endpoints() {
    let ctx = TestContext::new().await;
    let (first, _) = ctx.network_with_pool("First & Best", false, &[3600]).await;
    let (second, _) = ctx.network_with_pool("Second", false, &[1800]).await;
    ctx.generator.generate_schedule(&first).await.unwrap();
    ctx.generator.generate_schedule(&second).await.unwrap();
    let server = server(&ctx);

    let response = server.get(&format!("/network/{}/epg.xml", first.token)).await;
    response.assert_status_ok();
    let xml = response.text();
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(xml.contains(&format!("<channel id=\"{}\">", first.token)));
    assert!(xml.contains("<display-name>First &amp; Best</display-name>"));
    assert!(xml.contains("<title>First &amp; Best item1</title>"));
    assert!(!xml.contains(&second.token));

    let all = server.get("/epg.xml").await.text();
    assert!(all.contains(&format!("<channel id=\"{}\">", first.token)));
    assert!(all.contains(&format!("channel=\"{}\"", second.token)));

    server
        .get("/network/unknown/epg.xml")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
