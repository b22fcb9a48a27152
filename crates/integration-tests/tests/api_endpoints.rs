//! Integration tests for capability checks, health endpoints and the settings UI.

use std::time::Duration;

use products_showcase_integration_tests::{ADMIN_TOKEN, EDITOR_TOKEN, TestApp};
use reqwest::{
    StatusCode,
    header::{COOKIE, LOCATION, SET_COOKIE},
};
use serde_json::Value;

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::spawn().await;

    let resp = app
        .anonymous()
        .get(app.url("/health"))
        .header("x-request-id", "trace-abc-123")
        .send()
        .await
        .expect("Failed to get health");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-request-id"], "trace-abc-123");
    assert_eq!(resp.text().await.expect("body"), "ok");

    let resp = app
        .anonymous()
        .get(app.url("/health/ready"))
        .send()
        .await
        .expect("Failed to get readiness");
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
}

// ============================================================================
// Capabilities
// ============================================================================

#[tokio::test]
async fn test_api_requires_token() {
    let app = TestApp::spawn().await;

    for path in ["/api/connection-status", "/api/cache-status"] {
        let resp = app
            .anonymous()
            .get(app.url(path))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{path}");
        let body: Value = resp.json().await.expect("Failed to parse response");
        assert_eq!(body["error"], true);
    }

    let resp = app
        .get("/api/connection-status", "not-a-configured-token")
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_editor_token_cannot_use_admin_endpoints() {
    let app = TestApp::spawn_connected().await;

    let resp = app
        .post("/api/clear-cache", EDITOR_TOKEN)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app
        .post("/api/oauth/disconnect", EDITOR_TOKEN)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(
        app.state
            .settings()
            .api_credentials()
            .await
            .expect("settings readable")
            .is_some()
    );
}

#[tokio::test]
async fn test_admin_token_grants_editor_endpoints() {
    let app = TestApp::spawn_connected().await;

    let resp = app
        .get("/api/search-products?query=linen", ADMIN_TOKEN)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_token_cookie_is_accepted() {
    let app = TestApp::spawn().await;

    let resp = app
        .anonymous()
        .get(app.url("/api/cache-status"))
        .header(COOKIE, format!("showcase_token={ADMIN_TOKEN}"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_connection_status_without_credentials() {
    let app = TestApp::spawn().await;

    let resp = app
        .get("/api/connection-status", EDITOR_TOKEN)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("Failed to parse response");
    assert_eq!(body["connected"], false);
    assert_eq!(body["message"], "Shopify credentials not configured.");
    assert!(body.get("shop_name").is_none());
}

#[tokio::test]
async fn test_connection_status_reports_upstream_failure() {
    let app = TestApp::spawn_connected().await;
    app.shopify.fail_with("Access denied for shop field.").await;

    let resp = app
        .get("/api/connection-status", EDITOR_TOKEN)
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = resp.json().await.expect("Failed to parse response");
    assert_eq!(body["connected"], false);
    assert_eq!(body["message"], "Access denied for shop field.");
}

// ============================================================================
// Settings UI
// ============================================================================

#[tokio::test]
async fn test_settings_page_redirects_to_login() {
    let app = TestApp::spawn().await;

    let resp = app
        .anonymous()
        .get(app.url("/admin/settings"))
        .send()
        .await
        .expect("Failed to get settings");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[LOCATION], "/admin/login");
}

#[tokio::test]
async fn test_login_and_logout() {
    let app = TestApp::spawn().await;
    let browser = TestApp::browser();

    let resp = browser
        .post(app.url("/admin/login"))
        .form(&[("token", ADMIN_TOKEN)])
        .send()
        .await
        .expect("Failed to log in");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[LOCATION], "/admin/settings");
    let cookie = resp.headers()[SET_COOKIE].to_str().expect("ascii cookie");
    assert!(cookie.contains("HttpOnly"));
    assert!(!cookie.contains("Secure"));

    let resp = browser
        .get(app.url("/admin/settings"))
        .send()
        .await
        .expect("Failed to get settings");
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.expect("body").contains("Shopify API Configuration"));

    let resp = browser
        .post(app.url("/admin/logout"))
        .send()
        .await
        .expect("Failed to log out");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = browser
        .get(app.url("/admin/settings"))
        .send()
        .await
        .expect("Failed to get settings");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_editor_token_cannot_sign_in() {
    let app = TestApp::spawn().await;

    let resp = app
        .anonymous()
        .post(app.url("/admin/login"))
        .form(&[("token", EDITOR_TOKEN)])
        .send()
        .await
        .expect("Failed to log in");
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(!resp.headers().contains_key(SET_COOKIE));
    assert!(
        resp.text()
            .await
            .expect("body")
            .contains("This token does not grant access to settings.")
    );
}

#[tokio::test]
async fn test_save_settings() {
    let app = TestApp::spawn().await;

    let resp = app
        .post("/admin/settings", ADMIN_TOKEN)
        .form(&[
            ("cache_duration", "7200"),
            ("utm_source", "newsletter"),
            ("utm_medium", ""),
            ("utm_campaign", " spring "),
        ])
        .send()
        .await
        .expect("Failed to save settings");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let settings = app.state.settings();
    assert_eq!(
        settings.cache_duration().await.expect("cache duration"),
        Duration::from_secs(7200)
    );
    let utm = settings.utm().await.expect("utm");
    assert_eq!(utm.source.as_deref(), Some("newsletter"));
    assert_eq!(utm.medium, None);
    assert_eq!(utm.campaign.as_deref(), Some("spring"));

    let page = app.settings_page().await;
    assert!(page.contains("Settings saved successfully!"));
    assert!(page.contains(r#"<option value="7200" selected>"#));
}

#[tokio::test]
async fn test_save_settings_rejects_unknown_cache_duration() {
    let app = TestApp::spawn().await;

    let resp = app
        .post("/admin/settings", ADMIN_TOKEN)
        .form(&[("cache_duration", "17"), ("utm_source", "newsletter")])
        .send()
        .await
        .expect("Failed to save settings");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let page = app.settings_page().await;
    assert!(page.contains("cache duration 17s is not one of the offered choices"));
    assert!(
        app.state
            .settings()
            .utm()
            .await
            .expect("utm")
            .is_empty()
    );
}

#[tokio::test]
async fn test_settings_clear_cache_action() {
    let app = TestApp::spawn_connected().await;

    app.get("/api/products/5", EDITOR_TOKEN)
        .send()
        .await
        .expect("Failed to fetch product");

    let resp = app
        .post("/admin/settings/clear-cache", ADMIN_TOKEN)
        .send()
        .await
        .expect("Failed to clear cache");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let page = app.settings_page().await;
    assert!(page.contains("Cache cleared successfully!"));
    assert!(page.contains("Cached items: 0"));
}
