use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use vault_contracts::{validate_path, Catalog, ExplorerCache};
use vault_model::{FileEntry, TreeNode, VaultId};

use crate::errors::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChildrenQuery {
    #[serde(default)]
    pub path: String,
}

/// `GET /api/v1/files/tree/{vault}`
pub async fn tree_handler(State(state): State<AppState>, Path(vault): Path<String>) -> AppResult<Json<TreeNode>> {
    let vault = state.get(&VaultId::new(vault))?;
    let tree = vault.explorer().get_tree("").await?;
    Ok(Json(tree))
}

/// `GET /api/v1/files/children/{vault}?path=…`
pub async fn children_handler(
    State(state): State<AppState>,
    Path(vault): Path<String>,
    Query(query): Query<ChildrenQuery>,
) -> AppResult<Json<Vec<TreeNode>>> {
    let vault = state.get(&VaultId::new(vault))?;
    let path = validate_path(&query.path)?;
    let children = vault.explorer().get_children(&path).await?;
    Ok(Json(children))
}

/// `GET /api/v1/file/{vault}/{id}`
pub async fn get_file_handler(
    State(state): State<AppState>,
    Path((vault, id)): Path<(String, String)>,
) -> AppResult<Json<FileContent>> {
    let vault = state.get(&VaultId::new(vault))?;
    let file_id: vault_model::FileId = id
        .parse()
        .map_err(|_| AppError::bad_request(format!("invalid file id: {id}")))?;

    let entry = vault
        .catalog()
        .get_by_id(file_id)
        .await?
        .filter(|e| e.status.is_visible())
        .ok_or_else(|| AppError::not_found(format!("file not found: {id}")))?;

    let absolute = vault.explorer().root().join(&entry.path);
    let content = tokio::fs::read_to_string(&absolute)
        .await
        .map_err(|e| AppError::internal(format!("reading {}: {e}", entry.path)))?;

    Ok(Json(FileContent { entry, content }))
}

#[derive(Debug, serde::Serialize)]
pub struct FileContent {
    #[serde(flatten)]
    pub entry: FileEntry,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateFileRequest {
    pub vault_id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub is_folder: bool,
    #[serde(default)]
    pub content: String,
}

/// `POST /api/v1/file/create`
pub async fn create_file_handler(State(state): State<AppState>, Json(req): Json<CreateFileRequest>) -> AppResult<Json<FileEntry>> {
    let vault = state.get(&VaultId::new(req.vault_id))?;

    let parent_path = match &req.parent_id {
        Some(id) => {
            let parent_id: vault_model::FileId = id
                .parse()
                .map_err(|_| AppError::bad_request(format!("invalid parent_id: {id}")))?;
            vault
                .catalog()
                .get_by_id(parent_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("parent not found: {id}")))?
                .path
        }
        None => String::new(),
    };

    let relative = if parent_path.is_empty() {
        req.name.clone()
    } else {
        format!("{parent_path}/{}", req.name)
    };
    let relative = validate_path(&relative)?;
    let absolute = vault.explorer().root().join(&relative);

    if vault.catalog().get_by_path(&relative).await?.is_some() {
        return Err(AppError::conflict(format!("already exists: {relative}")));
    }

    if req.is_folder {
        tokio::fs::create_dir_all(&absolute)
            .await
            .map_err(|e| AppError::internal(e.to_string()))?;
    } else {
        if let Some(parent) = absolute.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::internal(e.to_string()))?;
        }
        tokio::fs::write(&absolute, &req.content)
            .await
            .map_err(|e| AppError::internal(e.to_string()))?;
    }

    // The watcher observes the filesystem write and drives the catalog/cache/index update
    // asynchronously; callers poll `files/tree` or subscribe to SSE for the resulting event.
    let now = chrono::Utc::now();
    Ok(Json(FileEntry {
        id: vault_model::FileId::new(),
        path: relative.clone(),
        name: req.name,
        parent_id: None,
        is_dir: req.is_folder,
        size: req.content.len() as u64,
        created: now,
        modified: now,
        status: vault_model::FileStatus::Active,
    }))
}
