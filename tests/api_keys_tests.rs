//! API key management endpoint tests
//!
//! Drives the public and key management routers in-process with
//! `tower::ServiceExt::oneshot`.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use serial_test::serial;
use tempfile::TempDir;
use tower::ServiceExt;

use parley_gateway::{
    AppState, CredentialStore, ProviderServices, SecretName, SecretSet, ServerConfig, routes,
};

fn clear_key_env() {
    for name in SecretName::ALL {
        unsafe {
            std::env::remove_var(name.env_var());
        }
    }
}

fn create_app(secrets_path: PathBuf, secrets: SecretSet) -> Router {
    let config = ServerConfig {
        secrets_path: secrets_path.clone(),
        ..ServerConfig::default()
    };
    let state = AppState::with_services(
        config,
        Arc::new(CredentialStore::with_secrets(secrets_path, secrets)),
        Arc::new(ProviderServices::with_client(reqwest::Client::new())),
    );

    routes::api::create_public_router()
        .merge(routes::api::create_api_router())
        .with_state(state)
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn save_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/save_api_keys")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn validate_request() -> Request<Body> {
    Request::builder()
        .uri("/validate_api_keys")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let dir = TempDir::new().unwrap();
    let app = create_app(dir.path().join("api_keys.json"), SecretSet::default());

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await, json!({"status": "OK"}));
}

#[tokio::test]
#[serial]
async fn test_save_then_validate() {
    clear_key_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("api_keys.json");
    let app = create_app(path.clone(), SecretSet::default());

    let response = app.clone().oneshot(validate_request()).await.unwrap();
    let json = read_json(response).await;
    assert_eq!(json["valid"], false);
    assert_eq!(json["missing_keys"].as_array().unwrap().len(), 4);

    let bundle = json!({
        "murfApiKey": "murf-key",
        "assemblyAiApiKey": "assembly-key",
        "geminiApiKey": "gemini-key",
        "serpApiKey": "serp-key"
    });
    let response = app.clone().oneshot(save_request(bundle)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await, json!({"success": true}));

    let saved: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved["murfApiKey"], "murf-key");
    assert_eq!(saved["assemblyAiApiKey"], "assembly-key");
    assert_eq!(saved["geminiApiKey"], "gemini-key");
    assert_eq!(saved["serpApiKey"], "serp-key");

    let response = app.oneshot(validate_request()).await.unwrap();
    assert_eq!(
        read_json(response).await,
        json!({"valid": true, "missing_keys": []})
    );
}

#[tokio::test]
#[serial]
async fn test_partial_bundle_reports_missing_names() {
    clear_key_env();
    let dir = TempDir::new().unwrap();
    let app = create_app(dir.path().join("api_keys.json"), SecretSet::default());

    let bundle = json!({
        "murfApiKey": "murf-key",
        "geminiApiKey": "   ",
    });
    let response = app.clone().oneshot(save_request(bundle)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(validate_request()).await.unwrap();
    assert_eq!(
        read_json(response).await,
        json!({
            "valid": false,
            "missing_keys": ["ASSEMBLYAI_API_KEY", "GEMINI_API_KEY", "SERPAPI_API_KEY"]
        })
    );
}

#[tokio::test]
#[serial]
async fn test_environment_fills_keys_absent_from_bundle() {
    clear_key_env();
    unsafe {
        std::env::set_var("SERPAPI_API_KEY", "serp-from-env");
    }

    let dir = TempDir::new().unwrap();
    let app = create_app(dir.path().join("api_keys.json"), SecretSet::default());
    let bundle = json!({
        "murfApiKey": "murf-key",
        "assemblyAiApiKey": "assembly-key",
        "geminiApiKey": "gemini-key"
    });
    app.clone().oneshot(save_request(bundle)).await.unwrap();

    let response = app.oneshot(validate_request()).await.unwrap();
    assert_eq!(read_json(response).await["valid"], true);

    clear_key_env();
}

#[tokio::test]
async fn test_save_failure_is_reported() {
    let dir = TempDir::new().unwrap();
    let app = create_app(
        dir.path().join("missing-dir").join("api_keys.json"),
        SecretSet::default(),
    );

    let response = app
        .oneshot(save_request(json!({"murfApiKey": "murf-key"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        read_json(response).await,
        json!({"detail": "Failed to save API keys."})
    );
}

#[tokio::test]
async fn test_unreadable_body_fails_like_a_failed_save() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("api_keys.json");
    let app = create_app(path.clone(), SecretSet::default());

    let cases = [
        (Some("application/json"), "not json"),
        (Some("application/json"), "[1,2]"),
        (Some("application/json"), r#"{"murfApiKey": 42}"#),
        (None, r#"{"murfApiKey": "murf-key"}"#),
    ];

    for (content_type, body) in cases {
        let mut request = Request::builder().method("POST").uri("/save_api_keys");
        if let Some(content_type) = content_type {
            request = request.header("content-type", content_type);
        }
        let request = request.body(Body::from(body)).unwrap();

        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(
            response.status(),
            StatusCode::INTERNAL_SERVER_ERROR,
            "body: {body}"
        );
        assert_eq!(
            read_json(response).await,
            json!({"detail": "Failed to save API keys."})
        );
    }

    assert!(!path.exists());
}
