//! Integration tests for connecting a store through the OAuth flow.

use products_showcase_core::{ApiVersion, ShopDomain};
use products_showcase_integration_tests::{
    ACCESS_TOKEN, ADMIN_TOKEN, DETECTED_VERSION, EDITOR_TOKEN, GOOD_CODE, REST_VERSIONS, SHOP,
    SHOP_NAME, TestApp,
};
use secrecy::SecretString;
use reqwest::{StatusCode, Url, header::LOCATION};
use serde_json::{Value, json};

/// Start the flow through the API and return the `state` nonce Shopify would echo back.
async fn initiate(app: &TestApp) -> String {
    let resp = app
        .post("/api/oauth/initiate", ADMIN_TOKEN)
        .json(&json!({
            "shop_url": format!("https://{SHOP}/"),
            "client_id": "client-id",
            "client_secret": "client-secret",
        }))
        .send()
        .await
        .expect("Failed to initiate OAuth");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("Failed to parse response");
    let redirect_url = Url::parse(body["redirect_url"].as_str().expect("redirect_url"))
        .expect("redirect_url is a URL");
    assert_eq!(redirect_url.host_str(), Some(SHOP));
    assert_eq!(redirect_url.path(), "/admin/oauth/authorize");

    let pairs: Vec<(String, String)> = redirect_url.query_pairs().into_owned().collect();
    assert!(pairs.contains(&("client_id".to_string(), "client-id".to_string())));
    assert!(pairs.contains(&("scope".to_string(), "read_products".to_string())));
    assert!(pairs.contains(&("redirect_uri".to_string(), app.url("/oauth/callback"))));

    pairs
        .into_iter()
        .find(|(name, _)| name == "state")
        .map(|(_, value)| value)
        .expect("state parameter")
}

async fn callback(app: &TestApp, query: &[(&str, &str)]) {
    let url = Url::parse_with_params(&app.url("/oauth/callback"), query).expect("callback URL");
    let resp = app
        .anonymous()
        .get(url)
        .send()
        .await
        .expect("Failed to call OAuth callback");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[LOCATION], "/admin/settings");
}

// ============================================================================
// Happy Path
// ============================================================================

#[tokio::test]
async fn test_connect_stores_token_and_detects_version() {
    let app = TestApp::spawn().await;
    let state = initiate(&app).await;

    callback(&app, &[("code", GOOD_CODE), ("shop", SHOP), ("state", state.as_str())]).await;

    let credentials = app
        .state
        .settings()
        .api_credentials()
        .await
        .expect("settings readable")
        .expect("store connected");
    assert_eq!(credentials.shop.as_str(), SHOP);
    assert_eq!(credentials.api_version.as_str(), DETECTED_VERSION);
    assert_eq!(app.shopify.hits("PublicApiVersions").await, 1);

    let page = app.settings_page().await;
    assert!(page.contains("Successfully connected to Shopify!"));
    assert!(page.contains(SHOP_NAME));

    // Later calls go out at the detected version.
    let resp = app
        .get("/api/connection-status", EDITOR_TOKEN)
        .send()
        .await
        .expect("Failed to get connection status");
    let body: Value = resp.json().await.expect("Failed to parse response");
    assert_eq!(body["connected"], true);
    assert_eq!(body["shop_name"], SHOP_NAME);
    assert_eq!(app.shopify.last_version().await.as_deref(), Some(DETECTED_VERSION));
}

#[tokio::test]
async fn test_settings_form_connect_redirects_to_shopify() {
    let app = TestApp::spawn().await;

    let resp = app
        .post("/admin/settings/connect", ADMIN_TOKEN)
        .form(&[
            ("shop_url", SHOP),
            ("client_id", "client-id"),
            ("client_secret", "client-secret"),
        ])
        .send()
        .await
        .expect("Failed to submit connect form");

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let location = resp.headers()[LOCATION].to_str().expect("ascii location");
    assert!(location.starts_with(&format!("https://{SHOP}/admin/oauth/authorize?")));
}

// ============================================================================
// API Version Detection
// ============================================================================

#[tokio::test]
async fn test_version_detected_over_rest_when_graphql_fails() {
    let app = TestApp::spawn().await;
    app.shopify.fail_operation("PublicApiVersions").await;
    let state = initiate(&app).await;

    callback(&app, &[("code", GOOD_CODE), ("state", state.as_str())]).await;

    assert_eq!(app.shopify.hits("PublicApiVersions").await, 1);
    assert_eq!(app.shopify.hits(REST_VERSIONS).await, 1);
    let detected = app
        .state
        .settings()
        .detected_api_version()
        .await
        .expect("settings readable");
    assert_eq!(detected.as_ref().map(ApiVersion::as_str), Some(DETECTED_VERSION));
}

#[tokio::test]
async fn test_failed_detection_keeps_stored_version() {
    let app = TestApp::spawn_connected().await;
    let previous = ApiVersion::parse("2025-07").expect("valid version");
    app.state
        .settings()
        .save_api_version(&previous)
        .await
        .expect("store API version");
    app.shopify.fail_operation("PublicApiVersions").await;
    app.shopify.fail_rest_versions().await;

    let shop = ShopDomain::parse(SHOP).expect("valid shop");
    let detected = app
        .state
        .oauth()
        .detect_api_version(&shop, &SecretString::from(ACCESS_TOKEN))
        .await
        .expect("detection failures are not errors");
    assert!(detected.is_none());
    assert_eq!(app.shopify.hits(REST_VERSIONS).await, 1);

    // Reconnecting still succeeds and leaves the version alone.
    let state = initiate(&app).await;
    callback(&app, &[("code", GOOD_CODE), ("state", state.as_str())]).await;
    assert!(app.settings_page().await.contains("Successfully connected to Shopify!"));

    let stored = app
        .state
        .settings()
        .detected_api_version()
        .await
        .expect("settings readable");
    assert_eq!(stored, Some(previous));
    assert_eq!(app.shopify.hits(REST_VERSIONS).await, 2);
}

// ============================================================================
// Rejections
// ============================================================================

#[tokio::test]
async fn test_initiate_rejects_non_shopify_domain() {
    let app = TestApp::spawn().await;

    let resp = app
        .post("/api/oauth/initiate", ADMIN_TOKEN)
        .json(&json!({
            "shop_url": "shop.example.com",
            "client_id": "client-id",
            "client_secret": "client-secret",
        }))
        .send()
        .await
        .expect("Failed to initiate OAuth");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn test_initiate_requires_every_credential() {
    let app = TestApp::spawn().await;

    let resp = app
        .post("/api/oauth/initiate", ADMIN_TOKEN)
        .json(&json!({ "shop_url": SHOP, "client_id": "client-id" }))
        .send()
        .await
        .expect("Failed to initiate OAuth");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Shopify API credentials not configured");
}

#[tokio::test]
async fn test_unknown_state_sets_error_notice() {
    let app = TestApp::spawn().await;

    callback(&app, &[("code", GOOD_CODE), ("state", "not-a-real-state")]).await;

    let page = app.settings_page().await;
    assert!(page.contains("Invalid or expired OAuth state"));
    assert_eq!(app.shopify.hits("PublicApiVersions").await, 0);
}

#[tokio::test]
async fn test_state_is_single_use() {
    let app = TestApp::spawn().await;
    let state = initiate(&app).await;

    callback(&app, &[("code", GOOD_CODE), ("state", state.as_str())]).await;
    assert!(app.settings_page().await.contains("Successfully connected"));

    callback(&app, &[("code", GOOD_CODE), ("state", state.as_str())]).await;
    assert!(app.settings_page().await.contains("Invalid or expired OAuth state"));
}

#[tokio::test]
async fn test_rejected_code_reports_shopify_description() {
    let app = TestApp::spawn().await;
    let state = initiate(&app).await;

    callback(&app, &[("code", "stale-code"), ("state", state.as_str())]).await;

    let page = app.settings_page().await;
    assert!(page.contains("The authorization code was not found or was already used"));
    let credentials = app
        .state
        .settings()
        .api_credentials()
        .await
        .expect("settings readable");
    assert!(credentials.is_none());
}

#[tokio::test]
async fn test_mismatched_hmac_is_rejected() {
    let app = TestApp::spawn().await;
    let state = initiate(&app).await;

    callback(
        &app,
        &[("code", GOOD_CODE), ("hmac", "deadbeef"), ("state", state.as_str())],
    )
    .await;

    let page = app.settings_page().await;
    assert!(page.contains("OAuth callback signature could not be verified"));
    assert!(
        app.state
            .settings()
            .api_credentials()
            .await
            .expect("settings readable")
            .is_none()
    );
}

#[tokio::test]
async fn test_shopify_error_parameter_is_reported() {
    let app = TestApp::spawn().await;

    callback(&app, &[("error", "access_denied")]).await;

    let page = app.settings_page().await;
    assert!(page.contains("notice-error"));
}

// ============================================================================
// Disconnect
// ============================================================================

#[tokio::test]
async fn test_disconnect_removes_token() {
    let app = TestApp::spawn_connected().await;

    let resp = app
        .post("/api/oauth/disconnect", ADMIN_TOKEN)
        .send()
        .await
        .expect("Failed to disconnect");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .get("/api/connection-status", EDITOR_TOKEN)
        .send()
        .await
        .expect("Failed to get connection status");
    let body: Value = resp.json().await.expect("Failed to parse response");
    assert_eq!(body["connected"], false);
    assert_eq!(app.shopify.hits("ShopName").await, 0);
}

#[tokio::test]
async fn test_refresh_api_version() {
    let app = TestApp::spawn_connected().await;

    let resp = app
        .post("/api/oauth/refresh-api-version", ADMIN_TOKEN)
        .send()
        .await
        .expect("Failed to refresh API version");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], true);
    assert_eq!(body["detected"], true);
    assert_eq!(body["api_version"], DETECTED_VERSION);
}
