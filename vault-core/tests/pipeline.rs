use std::future::Future;
use std::time::Duration;

use tempfile::TempDir;
use vault_config::{PipelineConfig, StorageConfig, VaultConfig};
use vault_contracts::{BroadcastSource, Catalog, ExplorerCache, SearchIndex};
use vault_core::VaultSupervisor;
use vault_model::{FileStatus, SseEvent, VaultState};

fn fast_pipeline() -> PipelineConfig {
    PipelineConfig {
        broadcaster_flush_interval_secs: 1,
        dlq_retry_interval_secs: 1,
        reindex_drain_poll_secs: 1,
        ..PipelineConfig::default()
    }
}

async fn new_vault(root: &TempDir, id: &str) -> std::sync::Arc<VaultSupervisor> {
    let config = VaultConfig {
        id: id.to_string(),
        name: id.to_string(),
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
    supervisor
}

async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn happy_path_create_is_cataloged_cached_and_indexed() {
    let root = TempDir::new().unwrap();
    std::fs::create_dir_all(root.path().join("docs")).unwrap();
    let vault = new_vault(&root, "v-happy").await;

    let (client_id, mut stream) = vault.broadcaster().subscribe(vault.vault_id());
    let connected = stream.recv().await.unwrap();
    assert!(matches!(connected, SseEvent::Connected { .. }));

    std::fs::write(root.path().join("docs/README.md"), "# Doc").unwrap();

    let catalogued = wait_until(Duration::from_secs(4), || async {
        vault
            .catalog()
            .get_by_path("docs/README.md")
            .await
            .ok()
            .flatten()
            .map(|e| e.status == FileStatus::Active)
            .unwrap_or(false)
    })
    .await;
    assert!(catalogued, "file should be active in the catalog within one flush interval");

    let children = vault.explorer().get_children("docs").await.unwrap();
    assert!(children.iter().any(|c| c.metadata.name == "README.md"));

    let found = wait_until(Duration::from_secs(2), || async {
        vault.search().by_text("Doc").await.map(|r| r.total >= 1).unwrap_or(false)
    })
    .await;
    assert!(found, "search should index the new document");

    let bulk = tokio::time::timeout(Duration::from_secs(3), stream.recv()).await.unwrap().unwrap();
    match bulk {
        SseEvent::BulkProcess { changes, .. } => {
            assert!(changes.iter().any(|c| c.path == "docs/README.md"));
        }
        other => panic!("expected bulk_process, got {other:?}"),
    }

    vault.broadcaster().unsubscribe(client_id);
    vault.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn soft_delete_marks_entry_deleted_and_clears_cache() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("note.md"), "hello").unwrap();
    let vault = new_vault(&root, "v-delete").await;

    wait_until(Duration::from_secs(4), || async {
        vault.catalog().get_by_path("note.md").await.ok().flatten().is_some()
    })
    .await;

    std::fs::remove_file(root.path().join("note.md")).unwrap();

    let deleted = wait_until(Duration::from_secs(4), || async {
        vault
            .catalog()
            .get_by_path("note.md")
            .await
            .ok()
            .flatten()
            .map(|e| e.status == FileStatus::Deleted)
            .unwrap_or(false)
    })
    .await;
    assert!(deleted);

    let metadata = vault.explorer().get_metadata("note.md").await.unwrap();
    assert!(metadata.is_none());

    vault.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn reindex_restores_active_set() {
    let root = TempDir::new().unwrap();
    for i in 0..5 {
        std::fs::write(root.path().join(format!("n{i}.md")), format!("note {i}")).unwrap();
    }
    let vault = new_vault(&root, "v-reindex").await;

    let all_active = wait_until(Duration::from_secs(5), || async {
        for i in 0..5 {
            let active = vault
                .catalog()
                .get_by_path(&format!("n{i}.md"))
                .await
                .ok()
                .flatten()
                .map(|e| e.status == FileStatus::Active)
                .unwrap_or(false);
            if !active {
                return false;
            }
        }
        true
    })
    .await;
    assert!(all_active, "all five files should be active before reindex");

    vault.trigger_reindex().await.expect("reindex completes");

    assert_eq!(vault.state().await, VaultState::Active);
    for i in 0..5 {
        let entry = vault.catalog().get_by_path(&format!("n{i}.md")).await.unwrap().unwrap();
        assert_eq!(entry.status, FileStatus::Active);
    }

    vault.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn path_traversal_is_rejected_without_touching_state() {
    let root = TempDir::new().unwrap();
    std::fs::create_dir_all(root.path().join("folder1")).unwrap();
    let vault = new_vault(&root, "v-traversal").await;

    assert!(vault.explorer().get_tree("../etc/passwd").await.is_err());
    assert!(vault.explorer().get_tree("folder1/../../etc").await.is_err());
    assert!(vault.explorer().get_tree("./folder1").await.is_ok());

    vault.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn burst_of_creates_coalesces_into_one_bulk_process() {
    let root = TempDir::new().unwrap();
    let vault = new_vault(&root, "v-burst").await;

    let (_, mut stream) = vault.broadcaster().subscribe(vault.vault_id());
    stream.recv().await.unwrap(); // connected

    for i in 0..50 {
        std::fs::write(root.path().join(format!("burst{i}.md")), "x").unwrap();
    }

    let event = tokio::time::timeout(Duration::from_secs(3), stream.recv()).await.unwrap().unwrap();
    match event {
        SseEvent::BulkProcess { changes, .. } => assert!(!changes.is_empty() && changes.len() <= 50),
        other => panic!("expected bulk_process, got {other:?}"),
    }

    vault.stop().await;
}
