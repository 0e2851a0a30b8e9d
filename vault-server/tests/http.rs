use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tempfile::TempDir;
use tower::ServiceExt;
use vault_config::{PipelineConfig, StorageConfig, VaultConfig};
use vault_core::VaultSupervisor;
use vault_server::routes::create_app;
use vault_server::state::AppState;

fn fast_pipeline() -> PipelineConfig {
    PipelineConfig {
        broadcaster_flush_interval_secs: 1,
        ..PipelineConfig::default()
    }
}

async fn test_state(root: &TempDir, vault_id: &str) -> AppState {
    let config = VaultConfig {
        id: vault_id.to_string(),
        name: vault_id.to_string(),
        enabled: true,
        storage: StorageConfig::Local {
            path: root.path().to_path_buf(),
        },
        index_path: root.path().join("index"),
        db_path: root.path().join("catalog.db"),
        pipeline: fast_pipeline(),
    };
    let supervisor = VaultSupervisor::new(config).await.expect("supervisor builds");
    supervisor.start().await.expect("supervisor starts");
    let state = AppState::new();
    state.insert(supervisor);
    state
}

#[tokio::test(flavor = "multi_thread")]
async fn health_endpoint_reports_ok() {
    let root = TempDir::new().unwrap();
    let state = test_state(&root, "v-health").await;
    let app = create_app(state);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_vault_returns_404() {
    let root = TempDir::new().unwrap();
    let state = test_state(&root, "v-known").await;
    let app = create_app(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/files/tree/does-not-exist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread")]
async fn tree_endpoint_returns_root_for_known_vault() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("note.md"), "# hi").unwrap();
    let state = test_state(&root, "v-tree").await;
    let app = create_app(state);

    tokio::time::sleep(Duration::from_millis(200)).await;

    let response = app
        .oneshot(Request::builder().uri("/api/v1/files/tree/v-tree").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread")]
async fn search_on_unready_vault_does_not_error_for_known_vault() {
    let root = TempDir::new().unwrap();
    let state = test_state(&root, "v-search").await;
    let app = create_app(state);

    let body = serde_json::json!({ "type": "text", "query": "anything" });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/search/v-search")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.status() == StatusCode::OK || response.status() == StatusCode::SERVICE_UNAVAILABLE);
}
