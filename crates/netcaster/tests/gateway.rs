mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use common::TestContext;

use netcaster::models::Network;
use netcaster::web::{AppState, create_router};

const MANIFEST: &str = "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:6\n#EXT-X-MEDIA-SEQUENCE:7\n#EXTINF:6.000,\nsegment_007.ts\n#EXTINF:6.000,\nsegment_008.ts\n";

fn server(ctx: &TestContext) -> TestServer {
    let state = AppState::new(
        ctx.database.clone(),
        ctx.supervisor.clone(),
        ctx.generator.clone(),
        "http://tv.example.com/",
    );
    TestServer::new(create_router(state)).unwrap()
}

async fn live_network(ctx: &TestContext, name: &str) -> Network {
    let (network, _) = ctx.network_with_pool(name, true, &[3600]).await;
    ctx.supervisor.request(&network).await.unwrap();
    ctx.control_plane.set_playlist(&network.token, MANIFEST);
    ctx.control_plane
        .set_segment(&network.token, "segment_007", b"\x47segment-seven");
    ctx.reload(&network).await
}

#[tokio::test]
async fn test_playlist_is_rewritten_to_gateway_urls() {
    let ctx = TestContext::new().await;
    let network = live_network(&ctx, "Rewrite").await;
    let server = server(&ctx);

    let response = server
        .get(&format!("/network/{}/playlist", network.token))
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.header("content-type"),
        "application/vnd.apple.mpegurl"
    );
    let body = response.text();
    assert!(body.starts_with("#EXTM3U\n"));
    assert!(body.contains("#EXT-X-MEDIA-SEQUENCE:7\n"));
    assert!(body.contains(&format!(
        "http://tv.example.com/network/{}/segment/segment_007.ts\n",
        network.token
    )));
    assert!(!body.lines().any(|line| line == "segment_008.ts"));
}

#[tokio::test]
async fn test_playlist_unknown_or_disabled_network_is_404() {
    let ctx = TestContext::new().await;
    let (disabled, _) = ctx.network_with_pool("Disabled", false, &[3600]).await;
    let server = server(&ctx);

    server
        .get("/network/doesnotexist/playlist")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get(&format!("/network/{}/playlist", disabled.token))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_playlist_before_start_asks_to_retry() {
    let ctx = TestContext::new().await;
    let (network, _) = ctx.network_with_pool("Cold", true, &[3600]).await;
    let server = server(&ctx);

    let response = server
        .get(&format!("/network/{}/playlist", network.token))
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.header("retry-after"), "5");
    assert!(ctx.control_plane.calls().iter().all(|call| !matches!(
        call,
        common::Call::Playlist(_)
    )));
}

#[tokio::test]
async fn test_playlist_not_warmed_up_asks_to_retry() {
    let ctx = TestContext::new().await;
    let (network, _) = ctx.network_with_pool("Warming", true, &[3600]).await;
    ctx.supervisor.request(&network).await.unwrap();
    let server = server(&ctx);

    // Started, but the control plane has no manifest yet
    let response = server
        .get(&format!("/network/{}/playlist", network.token))
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.header("retry-after"), "5");
}

#[tokio::test]
async fn test_segment_is_proxied_uncached() {
    let ctx = TestContext::new().await;
    let network = live_network(&ctx, "Segments").await;
    let server = server(&ctx);

    let response = server
        .get(&format!("/network/{}/segment/segment_007.ts", network.token))
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "video/MP2T");
    assert_eq!(response.header("cache-control"), "no-cache, no-store");
    assert_eq!(response.header("access-control-allow-origin"), "*");
    assert_eq!(response.as_bytes().as_ref(), b"\x47segment-seven");
    assert!(ctx.control_plane.calls().contains(&common::Call::Segment(
        network.token.clone(),
        "segment_007".to_string()
    )));
}

#[tokio::test]
async fn test_malformed_segment_name_is_rejected() {
    let ctx = TestContext::new().await;
    let network = live_network(&ctx, "Strict").await;
    let server = server(&ctx);

    for name in ["seg.mp4", "seg%20007.ts", "a.b.ts"] {
        server
            .get(&format!("/network/{}/segment/{}", network.token, name))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
    let too_long = "a".repeat(65);
    server
        .get(&format!("/network/{}/segment/{}", network.token, too_long))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_segment_is_404() {
    let ctx = TestContext::new().await;
    let network = live_network(&ctx, "Sparse").await;
    let server = server(&ctx);

    server
        .get(&format!("/network/{}/segment/segment_999.ts", network.token))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_segment_after_stop_is_never_replayed() {
    let ctx = TestContext::new().await;
    let network = live_network(&ctx, "Stopped").await;
    let server = server(&ctx);
    let path = format!("/network/{}/segment/segment_007.ts", network.token);

    server.get(&path).await.assert_status_ok();

    ctx.supervisor.stop(&network).await.unwrap();
    let response = server.get(&path).await;

    let status = response.status_code();
    assert!(
        status == StatusCode::NOT_FOUND || status == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status {status}"
    );
    assert_ne!(response.as_bytes().as_ref(), b"\x47segment-seven");
}

#[tokio::test]
async fn test_deleted_network_endpoints_are_gone() {
    let ctx = TestContext::new().await;
    let network = live_network(&ctx, "Deleted").await;
    let server = server(&ctx);

    server
        .delete(&format!("/api/v1/networks/{}", network.id))
        .await
        .assert_status_ok();

    server
        .get(&format!("/network/{}/playlist", network.token))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get(&format!("/network/{}/segment/segment_007.ts", network.token))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
