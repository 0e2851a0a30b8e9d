mod schema;

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tokio::sync::RwLock;
use vault_contracts::Catalog;
use vault_model::{FileEntry, FileId, FileStatus, Result, VaultError, VaultId};

use schema::{status_from_id, status_id, SCHEMA_SQL};

/// `sqlx`-backed catalog against a single embedded SQLite file per vault
/// (spec.md §6). The `RwLock` around the pool gives the "single writer,
/// many readers" policy of spec.md §5 a concrete, enforced shape at the API
/// boundary; SQLite's own driver already serializes writers underneath it,
/// the same layering `ferrex-core`'s Postgres repositories leave implicit
/// because Postgres itself owns that concern.
pub struct SqliteCatalog {
    vault_id: VaultId,
    pool: RwLock<SqlitePool>,
}

struct CatalogRow {
    id: String,
    path: String,
    name: String,
    parent_id: Option<String>,
    is_dir: bool,
    size: i64,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
    status_id: i64,
}

impl CatalogRow {
    fn into_entry(self, vault_id: &VaultId) -> Result<FileEntry> {
        let id = FileId::from_str(&self.id)
            .map_err(|e| VaultError::Storage(format!("corrupt file id {}: {e}", self.id)))?;
        let parent_id = self
            .parent_id
            .map(|p| FileId::from_str(&p))
            .transpose()
            .map_err(|e| VaultError::Storage(format!("corrupt parent id: {e}")))?;
        let status = status_from_id(self.status_id).ok_or_else(|| {
            VaultError::Storage(format!("unknown status id {} in catalog for vault {vault_id}", self.status_id))
        })?;

        Ok(FileEntry {
            id,
            path: self.path,
            name: self.name,
            parent_id,
            is_dir: self.is_dir,
            size: self.size.max(0) as u64,
            created: self.created,
            modified: self.modified,
            status,
        })
    }
}

impl SqliteCatalog {
    pub async fn open(vault_id: VaultId, db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| VaultError::io(&vault_id, e))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .map_err(|e| VaultError::Storage(format!("opening catalog db: {e}")))?;

        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&pool)
            .await
            .map_err(|e| VaultError::Storage(format!("applying catalog schema: {e}")))?;

        Ok(Self {
            vault_id,
            pool: RwLock::new(pool),
        })
    }

    async fn fetch_row(&self, predicate_sql: &str, bind: &str) -> Result<Option<CatalogRow>> {
        let pool = self.pool.read().await;
        let query = format!(
            "SELECT id, path, name, parent_id, is_dir, size, created, modified, status_id
             FROM file_entries WHERE {predicate_sql}"
        );
        let row = sqlx::query(&query)
            .bind(bind)
            .fetch_optional(&*pool)
            .await
            .map_err(|e| VaultError::Storage(e.to_string()))?;

        Ok(row.map(|r| CatalogRow {
            id: r.get("id"),
            path: r.get("path"),
            name: r.get("name"),
            parent_id: r.get("parent_id"),
            is_dir: r.get::<i64, _>("is_dir") != 0,
            size: r.get("size"),
            created: r.get("created"),
            modified: r.get("modified"),
            status_id: r.get("status_id"),
        }))
    }
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn create(&self, entry: FileEntry) -> Result<FileEntry> {
        if self.get_by_path(&entry.path).await?.is_some() {
            return Err(VaultError::Storage(format!(
                "entry already exists at path {}",
                entry.path
            )));
        }
        self.upsert_by_path(entry).await
    }

    async fn upsert_by_path(&self, entry: FileEntry) -> Result<FileEntry> {
        let pool = self.pool.write().await;
        let existing_id = sqlx::query("SELECT id FROM file_entries WHERE path = ?1")
            .bind(&entry.path)
            .fetch_optional(&*pool)
            .await
            .map_err(|e| VaultError::Storage(e.to_string()))?
            .map(|row| row.get::<String, _>("id"));

        let id = existing_id
            .as_deref()
            .map(FileId::from_str)
            .transpose()
            .map_err(|e| VaultError::Storage(e.to_string()))?
            .unwrap_or(entry.id);

        sqlx::query(
            "INSERT INTO file_entries (id, path, name, parent_id, is_dir, size, created, modified, status_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
                path = excluded.path,
                name = excluded.name,
                parent_id = excluded.parent_id,
                is_dir = excluded.is_dir,
                size = excluded.size,
                modified = excluded.modified,
                status_id = excluded.status_id",
        )
        .bind(id.to_string())
        .bind(&entry.path)
        .bind(&entry.name)
        .bind(entry.parent_id.map(|p| p.to_string()))
        .bind(entry.is_dir as i64)
        .bind(entry.size as i64)
        .bind(entry.created)
        .bind(entry.modified)
        .bind(status_id(entry.status))
        .execute(&*pool)
        .await
        .map_err(|e| VaultError::Storage(e.to_string()))?;

        Ok(FileEntry { id, ..entry })
    }

    async fn get_by_id(&self, id: FileId) -> Result<Option<FileEntry>> {
        self.fetch_row("id = ?1", &id.to_string())
            .await?
            .map(|r| r.into_entry(&self.vault_id))
            .transpose()
    }

    async fn get_by_path(&self, path: &str) -> Result<Option<FileEntry>> {
        self.fetch_row("path = ?1", path)
            .await?
            .map(|r| r.into_entry(&self.vault_id))
            .transpose()
    }

    async fn list_children(&self, parent_id: Option<FileId>) -> Result<Vec<FileEntry>> {
        let pool = self.pool.read().await;
        let rows = match parent_id {
            Some(id) => {
                sqlx::query(
                    "SELECT id, path, name, parent_id, is_dir, size, created, modified, status_id
                     FROM file_entries WHERE parent_id = ?1",
                )
                .bind(id.to_string())
                .fetch_all(&*pool)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT id, path, name, parent_id, is_dir, size, created, modified, status_id
                     FROM file_entries WHERE parent_id IS NULL",
                )
                .fetch_all(&*pool)
                .await
            }
        }
        .map_err(|e| VaultError::Storage(e.to_string()))?;

        rows.into_iter()
            .map(|r| {
                CatalogRow {
                    id: r.get("id"),
                    path: r.get("path"),
                    name: r.get("name"),
                    parent_id: r.get("parent_id"),
                    is_dir: r.get::<i64, _>("is_dir") != 0,
                    size: r.get("size"),
                    created: r.get("created"),
                    modified: r.get("modified"),
                    status_id: r.get("status_id"),
                }
                .into_entry(&self.vault_id)
            })
            .collect()
    }

    async fn set_status(&self, id: FileId, status: FileStatus) -> Result<()> {
        let pool = self.pool.write().await;
        sqlx::query("UPDATE file_entries SET status_id = ?1 WHERE id = ?2")
            .bind(status_id(status))
            .bind(id.to_string())
            .execute(&*pool)
            .await
            .map_err(|e| VaultError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn disable_all(&self) -> Result<()> {
        let pool = self.pool.write().await;
        sqlx::query("UPDATE file_entries SET status_id = ?1 WHERE status_id = ?2")
            .bind(status_id(FileStatus::Disabled))
            .bind(status_id(FileStatus::Active))
            .execute(&*pool)
            .await
            .map_err(|e| VaultError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_model::FileStatus;

    fn entry(path: &str) -> FileEntry {
        let now = Utc::now();
        FileEntry {
            id: FileId::new(),
            path: path.to_string(),
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            parent_id: None,
            is_dir: false,
            size: 10,
            created: now,
            modified: now,
            status: FileStatus::Active,
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = SqliteCatalog::open(VaultId::new("v1"), &dir.path().join("catalog.db"))
            .await
            .unwrap();

        let created = catalog.create(entry("notes/a.md")).await.unwrap();
        let fetched = catalog.get_by_path("notes/a.md").await.unwrap().unwrap();
        assert_eq!(created.id, fetched.id);
        assert_eq!(fetched.status, FileStatus::Active);
    }

    #[tokio::test]
    async fn upsert_reuses_id_for_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = SqliteCatalog::open(VaultId::new("v1"), &dir.path().join("catalog.db"))
            .await
            .unwrap();

        let first = catalog.upsert_by_path(entry("notes/a.md")).await.unwrap();
        let second = catalog.upsert_by_path(entry("notes/a.md")).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn disable_all_flips_active_entries() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = SqliteCatalog::open(VaultId::new("v1"), &dir.path().join("catalog.db"))
            .await
            .unwrap();

        catalog.create(entry("notes/a.md")).await.unwrap();
        catalog.disable_all().await.unwrap();
        let fetched = catalog.get_by_path("notes/a.md").await.unwrap().unwrap();
        assert_eq!(fetched.status, FileStatus::Disabled);
    }
}
