use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use vault_contracts::SearchIndex;
use vault_model::{SearchState, VaultId};

use crate::errors::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Text,
    Title,
    Tag,
    Wikilink,
    Fuzzy,
    Phrase,
    Prefix,
    Combined,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(rename = "type")]
    pub kind: SearchType,
    pub query: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub wikilinks: Vec<String>,
    pub limit: Option<usize>,
}

/// `POST /api/v1/search/{vault}`
pub async fn search_handler(
    State(state): State<AppState>,
    Path(vault): Path<String>,
    Json(req): Json<SearchRequest>,
) -> AppResult<Json<vault_contracts::SearchResults>> {
    let vault = state.get(&VaultId::new(vault))?;
    let search = vault.search();

    if search.state() != SearchState::Ready {
        return Err(AppError::service_unavailable("search index not ready"));
    }

    let mut results = match req.kind {
        SearchType::Text => search.by_text(req.query.as_deref().unwrap_or_default()).await?,
        SearchType::Title => search.by_title(req.query.as_deref().unwrap_or_default()).await?,
        SearchType::Tag => {
            if req.tags.len() > 1 {
                search.by_tags_any(&req.tags).await?
            } else {
                search.by_tag(req.tags.first().map(String::as_str).unwrap_or_default()).await?
            }
        }
        SearchType::Wikilink => {
            if req.wikilinks.len() > 1 {
                search.by_wikilinks_any(&req.wikilinks).await?
            } else {
                search.by_wikilink(req.wikilinks.first().map(String::as_str).unwrap_or_default()).await?
            }
        }
        SearchType::Fuzzy => search.fuzzy(req.query.as_deref().unwrap_or_default(), 2).await?,
        SearchType::Phrase => search.phrase(req.query.as_deref().unwrap_or_default()).await?,
        SearchType::Prefix => search.prefix(req.query.as_deref().unwrap_or_default()).await?,
        SearchType::Combined => search.combined(req.query.as_deref(), &req.tags, &req.wikilinks).await?,
    };

    if let Some(limit) = req.limit {
        results.hits.truncate(limit);
    }

    Ok(Json(results))
}
