use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, FileIdMap};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use vault_contracts::{EventSink, Watcher};
use vault_model::{ChangeKind, FileChangeEvent, Result, VaultError, VaultId};
use walkdir::WalkDir;

/// Local-filesystem `Watcher` implementation for one vault root, built on
/// `notify` + `notify-debouncer-full` the way
/// `ferrex-core::scanner::file_watcher::FileWatcher` watches media library
/// paths, generalized from "one watcher shared across libraries" to "one
/// watcher per vault" and extended with the blocking-send and `reindex()`
/// walk the pipeline requires.
pub struct LocalWatcher<S: EventSink> {
    vault_id: VaultId,
    root: PathBuf,
    sink: Arc<S>,
    debouncer: Arc<Mutex<Option<Debouncer<RecommendedWatcher, FileIdMap>>>>,
}

impl<S: EventSink + 'static> LocalWatcher<S> {
    pub fn new(vault_id: VaultId, root: PathBuf, sink: Arc<S>) -> Self {
        Self {
            vault_id,
            root,
            sink,
            debouncer: Arc::new(Mutex::new(None)),
        }
    }

    fn convert(event: Event, vault_id: &VaultId, root: &Path) -> Vec<FileChangeEvent> {
        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Modify(_) => ChangeKind::Modified,
            EventKind::Remove(_) => ChangeKind::Deleted,
            _ => return Vec::new(),
        };

        event
            .paths
            .into_iter()
            .filter(|p| !is_hidden(root, p))
            .map(|path| FileChangeEvent::new(vault_id.clone(), path, kind))
            .collect()
    }

    /// `notify`'s recursive inotify watch does not pick up subdirectories
    /// created after the watch was registered, so a new directory needs its
    /// own `watch()` call plus a walk to emit `Created` for whatever was
    /// already placed in it by the time we notice (e.g. `mkdir d && cp -r
    /// src/* d`). Runs in the relay task, not the debouncer callback, so it
    /// can await the channel send and the debouncer lock.
    async fn handle_possible_new_directory(
        path: &Path,
        root: &Path,
        vault_id: &VaultId,
        sink: &Arc<S>,
        debouncer: &Mutex<Option<Debouncer<RecommendedWatcher, FileIdMap>>>,
    ) {
        let is_dir = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.is_dir(),
            Err(_) => return,
        };
        if !is_dir {
            return;
        }

        {
            let mut guard = debouncer.lock().await;
            if let Some(d) = guard.as_mut() {
                if let Err(e) = d.watcher().watch(path, RecursiveMode::Recursive) {
                    warn!(vault = %vault_id, path = %path.display(), "failed to watch new subdirectory: {e}");
                }
            }
        }

        let root = root.to_path_buf();
        let walk_root = path.to_path_buf();
        let files = tokio::task::spawn_blocking(move || {
            WalkDir::new(&walk_root)
                .into_iter()
                .filter_entry(|e| !is_hidden(&root, e.path()) || e.path() == walk_root)
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.path().to_path_buf())
                .collect::<Vec<_>>()
        })
        .await
        .unwrap_or_default();

        for file in files {
            sink.send(FileChangeEvent::new(vault_id.clone(), file, ChangeKind::Created)).await;
        }
    }
}

#[async_trait]
impl<S: EventSink + 'static> Watcher for LocalWatcher<S> {
    async fn start(&self) -> Result<()> {
        info!(vault = %self.vault_id, root = %self.root.display(), "starting watcher");

        let use_poll = is_network_filesystem(&self.root);
        if use_poll {
            warn!(vault = %self.vault_id, "vault root resides on a network filesystem; watching falls back to polling via the debouncer's internal poll mode is not wired up here, proceeding with inotify-style watching");
        }

        let vault_id = self.vault_id.clone();
        let sink = self.sink.clone();
        let root = self.root.clone();
        let debouncer_handle = self.debouncer.clone();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<FileChangeEvent>();

        let forward_vault_id = vault_id.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if event.kind == ChangeKind::Created {
                    Self::handle_possible_new_directory(&event.path, &root, &vault_id, &sink, &debouncer_handle).await;
                }
                // Blocking send: backpressure propagates to the debouncer's
                // callback thread via the unbounded relay channel filling up
                // is not possible (unbounded), so the real backpressure point
                // is this await on the bounded Event Bus underneath `sink`.
                sink.send(event).await;
            }
            debug!(vault = %forward_vault_id, "watcher relay task exiting");
        });

        let convert_vault_id = self.vault_id.clone();
        let convert_root = self.root.clone();
        let mut debouncer = new_debouncer(
            Duration::from_millis(200),
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    for debounced in events {
                        #[allow(deprecated)]
                        let notify_event = debounced.event.clone();
                        for change in Self::convert(notify_event, &convert_vault_id, &convert_root) {
                            if tx.send(change).is_err() {
                                error!(vault = %convert_vault_id, "watcher relay channel closed");
                            }
                        }
                    }
                }
                Err(errors) => {
                    for e in errors {
                        error!("debouncer error: {e}");
                    }
                }
            },
        )
        .map_err(|e| VaultError::WatcherBackend {
            vault: self.vault_id.clone(),
            message: e.to_string(),
        })?;

        debouncer
            .watcher()
            .watch(&self.root, RecursiveMode::Recursive)
            .map_err(|e| VaultError::WatcherBackend {
                vault: self.vault_id.clone(),
                message: e.to_string(),
            })?;

        *self.debouncer.lock().await = Some(debouncer);
        Ok(())
    }

    async fn stop(&self) {
        if let Some(mut debouncer) = self.debouncer.lock().await.take() {
            let _ = debouncer.watcher().unwatch(&self.root);
        }
        info!(vault = %self.vault_id, "watcher stopped");
    }

    async fn reindex(&self) -> Result<()> {
        info!(vault = %self.vault_id, "walking vault root for reindex");

        for entry in WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| !is_hidden(&self.root, e.path()) || e.path() == self.root)
        {
            let entry = entry.map_err(|e| VaultError::WatcherBackend {
                vault: self.vault_id.clone(),
                message: e.to_string(),
            })?;

            if entry.file_type().is_file() {
                let event = FileChangeEvent::new(
                    self.vault_id.clone(),
                    entry.path().to_path_buf(),
                    ChangeKind::Created,
                );
                self.sink.send(event).await;
            }
        }

        Ok(())
    }
}

/// True if any path component between `root` and `path` (inclusive of
/// `path` itself) starts with `.`, so a file inside a hidden directory such
/// as `.obsidian/app.json` is excluded even though its own basename isn't
/// dotted. Checked the same way for live watch events and `reindex()`'s
/// walk so the two paths stay idempotent with each other.
fn is_hidden(root: &Path, path: &Path) -> bool {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .any(|c| match c {
            std::path::Component::Normal(segment) => segment.to_str().map(|s| s.starts_with('.')).unwrap_or(false),
            _ => false,
        })
}

/// Determine if a path resides on a network filesystem, matching
/// `ferrex-core::scanner::file_watcher::is_network_filesystem`.
fn is_network_filesystem(path: &Path) -> bool {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    let file = match fs::File::open("/proc/mounts") {
        Ok(f) => f,
        Err(_) => return false,
    };
    let reader = BufReader::new(file);

    let mut best_match: Option<(PathBuf, String)> = None;
    for line in reader.lines().map_while(std::io::Result::ok) {
        let mut parts = line.split_whitespace();
        let _src = parts.next();
        let mountpoint = parts.next();
        let fstype = parts.next();
        if let (Some(mnt), Some(fs_type)) = (mountpoint, fstype) {
            let mnt_path = PathBuf::from(mnt);
            if canonical.starts_with(&mnt_path) {
                let take = match &best_match {
                    None => true,
                    Some((best, _)) => mnt_path.as_os_str().len() > best.as_os_str().len(),
                };
                if take {
                    best_match = Some((mnt_path, fs_type.to_string()));
                }
            }
        }
    }

    best_match
        .map(|(_, fstype)| {
            ["nfs", "nfs4", "cifs", "smbfs", "smb3", "afs", "sshfs", "fuse.sshfs"]
                .contains(&fstype.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_paths_are_detected() {
        let root = Path::new("/vault");
        assert!(is_hidden(root, Path::new("/vault/.obsidian/config")));
        assert!(!is_hidden(root, Path::new("/vault/notes/readme.md")));
    }

    #[test]
    fn hidden_ancestor_directory_hides_descendant_files() {
        let root = Path::new("/vault");
        assert!(is_hidden(root, Path::new("/vault/.obsidian/app.json")));
        assert!(is_hidden(root, Path::new("/vault/.obsidian/plugins/foo/data.json")));
    }
}
