use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use vault_contracts::{validate_path, BroadcastSink, Catalog, SearchIndex};
use vault_model::{ChangeAction, ChangeKind, ChangeRecord, FileChangeEvent, FileEntry, FileId, FileStatus, VaultId};

use crate::reconciler::DlqHandle;
use crate::search::markdown;

/// Per-vault worker pool: one dispatcher task shards incoming events by
/// `hash(path) % worker_count` into per-lane channels, matching the
/// "sharding by path hash into worker lanes" requirement of spec.md §4.6
/// and the teacher's per-library actor-lane convention in
/// `ferrex-core::scan::orchestration`.
pub struct WorkerPool;

pub struct WorkerContext<C, S, B> {
    pub vault_id: VaultId,
    pub root: PathBuf,
    pub catalog: Arc<C>,
    pub search: Arc<S>,
    pub broadcaster: Arc<B>,
    pub explorer_tx: mpsc::Sender<FileChangeEvent>,
    pub dlq: DlqHandle,
}

impl<C, S, B> Clone for WorkerContext<C, S, B> {
    fn clone(&self) -> Self {
        Self {
            vault_id: self.vault_id.clone(),
            root: self.root.clone(),
            catalog: self.catalog.clone(),
            search: self.search.clone(),
            broadcaster: self.broadcaster.clone(),
            explorer_tx: self.explorer_tx.clone(),
            dlq: self.dlq.clone(),
        }
    }
}

impl WorkerPool {
    /// Spawns the dispatcher and `worker_count` lane tasks. Returns once
    /// spawned; the tasks run until `token` is cancelled and the upstream
    /// `EventBusReceiver` closes.
    pub fn spawn<C, S, B>(
        mut source: crate::event_bus::EventBusReceiver,
        worker_count: usize,
        context: WorkerContext<C, S, B>,
        token: CancellationToken,
    ) where
        C: Catalog + 'static,
        S: SearchIndex + 'static,
        B: BroadcastSink + 'static,
    {
        let worker_count = worker_count.max(1);
        let mut lanes = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let (tx, rx) = mpsc::channel::<FileChangeEvent>(256);
            lanes.push(tx);
            let context = context.clone();
            let lane_token = token.clone();
            tokio::spawn(run_lane(rx, context, lane_token));
        }

        let dispatch_token = token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = dispatch_token.cancelled() => break,
                    event = source.recv() => {
                        match event {
                            Some(event) => {
                                let lane = lane_index(&event.path, worker_count);
                                if lanes[lane].send(event).await.is_err() {
                                    break;
                                }
                            }
                            None => break,
                        }
                    }
                }
            }
        });
    }
}

fn lane_index(path: &Path, worker_count: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    (hasher.finish() as usize) % worker_count
}

async fn run_lane<C, S, B>(mut rx: mpsc::Receiver<FileChangeEvent>, context: WorkerContext<C, S, B>, token: CancellationToken)
where
    C: Catalog + 'static,
    S: SearchIndex + 'static,
    B: BroadcastSink + 'static,
{
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            event = rx.recv() => {
                let Some(event) = event else { break };
                if let Err(e) = process_event(&context, &event).await {
                    warn!(vault = %context.vault_id, path = %event.path.display(), "worker step failed: {e}, routing to DLQ");
                    context.dlq.send(event).await;
                }
            }
        }
    }
}

async fn process_event<C, S, B>(context: &WorkerContext<C, S, B>, event: &FileChangeEvent) -> vault_model::Result<()>
where
    C: Catalog,
    S: SearchIndex,
    B: BroadcastSink,
{
    let relative = event
        .path
        .strip_prefix(&context.root)
        .unwrap_or(&event.path)
        .to_string_lossy();
    let relative = validate_path(&relative)?;

    let (action, file_id) = match event.kind {
        ChangeKind::Created => {
            let entry = upsert_created(context, &relative).await?;
            if entry.is_markdown() {
                reindex_markdown(context, &context.root.join(&relative), &relative).await?;
            }
            (ChangeAction::Created, Some(entry.id))
        }
        ChangeKind::Modified => {
            let entry = update_modified(context, &relative).await?;
            if let Some(entry) = &entry {
                if entry.is_markdown() {
                    reindex_markdown(context, &context.root.join(&relative), &relative).await?;
                }
            }
            (ChangeAction::Modified, entry.map(|e| e.id))
        }
        ChangeKind::Deleted => {
            let id = mark_deleted(context, &relative).await?;
            context.search.remove_document(&relative).await?;
            (ChangeAction::Deleted, id)
        }
    };

    let _ = context.explorer_tx.try_send(event.clone());

    context.broadcaster.enqueue(
        &context.vault_id,
        ChangeRecord {
            id: file_id,
            path: relative,
            action,
        },
    );

    Ok(())
}

async fn ensure_parent_chain<C: Catalog>(catalog: &C, relative_dir: &str) -> vault_model::Result<Option<FileId>> {
    if relative_dir.is_empty() {
        return Ok(None);
    }

    let mut parent_id: Option<FileId> = None;
    let mut cumulative = String::new();
    for segment in relative_dir.split('/') {
        if segment.is_empty() {
            continue;
        }
        if !cumulative.is_empty() {
            cumulative.push('/');
        }
        cumulative.push_str(segment);

        let entry = match catalog.get_by_path(&cumulative).await? {
            Some(existing) => existing,
            None => {
                let now = Utc::now();
                catalog
                    .upsert_by_path(FileEntry {
                        id: FileId::new(),
                        path: cumulative.clone(),
                        name: segment.to_string(),
                        parent_id,
                        is_dir: true,
                        size: 0,
                        created: now,
                        modified: now,
                        status: FileStatus::Active,
                    })
                    .await?
            }
        };
        parent_id = Some(entry.id);
    }

    Ok(parent_id)
}

fn dirname(path: &str) -> String {
    match path.rsplit_once('/') {
        Some((parent, _)) => parent.to_string(),
        None => String::new(),
    }
}

fn basename(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

async fn upsert_created<C: Catalog, S: SearchIndex, B: BroadcastSink>(
    context: &WorkerContext<C, S, B>,
    relative: &str,
) -> vault_model::Result<FileEntry> {
    let absolute = context.root.join(relative);
    let fs_metadata = tokio::fs::metadata(&absolute)
        .await
        .map_err(|e| vault_model::VaultError::io(&context.vault_id, e))?;

    let parent_id = ensure_parent_chain(context.catalog.as_ref(), &dirname(relative)).await?;
    let now = Utc::now();
    let modified = fs_metadata.modified().map(chrono::DateTime::<Utc>::from).unwrap_or(now);

    context
        .catalog
        .upsert_by_path(FileEntry {
            id: FileId::new(),
            path: relative.to_string(),
            name: basename(relative),
            parent_id,
            is_dir: fs_metadata.is_dir(),
            size: fs_metadata.len(),
            created: now,
            modified,
            status: FileStatus::Active,
        })
        .await
}

async fn update_modified<C: Catalog, S: SearchIndex, B: BroadcastSink>(
    context: &WorkerContext<C, S, B>,
    relative: &str,
) -> vault_model::Result<Option<FileEntry>> {
    let Some(mut entry) = context.catalog.get_by_path(relative).await? else {
        return Ok(Some(upsert_created(context, relative).await?));
    };

    let absolute = context.root.join(relative);
    if let Ok(fs_metadata) = tokio::fs::metadata(&absolute).await {
        entry.size = fs_metadata.len();
        entry.modified = fs_metadata
            .modified()
            .map(chrono::DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
    }
    entry.status = FileStatus::Active;

    Ok(Some(context.catalog.upsert_by_path(entry).await?))
}

async fn mark_deleted<C: Catalog, S: SearchIndex, B: BroadcastSink>(
    context: &WorkerContext<C, S, B>,
    relative: &str,
) -> vault_model::Result<Option<FileId>> {
    let Some(entry) = context.catalog.get_by_path(relative).await? else {
        return Ok(None);
    };
    context.catalog.set_status(entry.id, FileStatus::Deleted).await?;
    Ok(Some(entry.id))
}

async fn reindex_markdown<C, S, B>(
    context: &WorkerContext<C, S, B>,
    absolute: &Path,
    relative: &str,
) -> vault_model::Result<()>
where
    C: Catalog,
    S: SearchIndex,
    B: BroadcastSink,
{
    let content = match tokio::fs::read_to_string(absolute).await {
        Ok(content) => content,
        Err(_) => return Ok(()), // file vanished between event and read; next Deleted event cleans it up
    };

    let stem = Path::new(relative)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| relative.to_string());
    let metadata = markdown::extract(&content, &stem);
    let tags: Vec<String> = metadata.tags.into_iter().collect();
    let wikilinks: Vec<String> = metadata.wikilinks.into_iter().collect();
    context
        .search
        .index_document(relative, &metadata.title, &tags, &wikilinks, &content)
        .await
}
