//! Public site configuration documents.

use axum::{Json, extract::State};
use serde::Serialize;

use vitrine_core::catalog::{ActiveFilters, FilterVocabulary};
use vitrine_core::site::{SiteContent, SiteDocument, SiteSections};

use crate::db::SiteConfigRepository;
use crate::error::Result;
use crate::state::AppState;

/// Logo, favicon and title.
pub async fn content(State(state): State<AppState>) -> Result<Json<SiteContent>> {
    let content: SiteContent = SiteConfigRepository::new(state.pool())
        .get(SiteDocument::Content)
        .await?;
    Ok(Json(content.normalized()))
}

/// Enabled home page sections only.
pub async fn sections(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let sections: SiteSections = SiteConfigRepository::new(state.pool())
        .get(SiteDocument::Sections)
        .await?;
    Ok(Json(sections.visible()))
}

#[derive(Debug, Serialize)]
pub struct Filters {
    pub vocabulary: FilterVocabulary,
    pub active: ActiveFilters,
}

/// Filter vocabulary and which filters are shown.
pub async fn filters(State(state): State<AppState>) -> Result<Json<Filters>> {
    let repo = SiteConfigRepository::new(state.pool());
    let vocabulary: FilterVocabulary = repo.get(SiteDocument::Filters).await?;
    let active: ActiveFilters = repo.get(SiteDocument::ActiveFilters).await?;
    Ok(Json(Filters {
        vocabulary: vocabulary.normalized(),
        active,
    }))
}
