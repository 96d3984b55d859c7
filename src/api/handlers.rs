use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::ClientId,
    models::{ChosenRecord, Interaction, MediaItem, PreferenceList, QuotaStatus},
    services::{
        preferences,
        quota::QuotaStore,
        RandomKind,
    },
};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Deserialize)]
pub struct RandomQuery {
    #[serde(default)]
    kind: RandomKind,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub preferences: Vec<String>,
    #[serde(default)]
    pub history: Vec<Interaction>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub items: Vec<MediaItem>,
    pub quota: QuotaStatus,
}

#[derive(Debug, Deserialize)]
pub struct InteractionRequest {
    #[serde(default)]
    pub preferences: Vec<String>,
    pub interaction: Interaction,
    /// Overrides the configured preference cap
    pub cap: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct InteractionResponse {
    pub preferences: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct QuotaResponse {
    #[serde(flatten)]
    pub status: QuotaStatus,
    pub chosen: Vec<ChosenRecord>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Free-text title search
pub async fn search_titles(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<MediaItem>>> {
    let query = params.q.trim();
    if query.is_empty() {
        return Err(AppError::InvalidInput("Query must not be empty".to_string()));
    }

    let items = state.catalog.search(query).await?;
    state.remember(&items).await;

    Ok(Json(items))
}

/// A random movie or series
pub async fn random_title(
    State(state): State<AppState>,
    Query(params): Query<RandomQuery>,
) -> AppResult<Json<MediaItem>> {
    let item = state
        .catalog
        .random_title(params.kind)
        .await?
        .ok_or_else(|| AppError::NotFound("No title available".to_string()))?;
    state.remember(std::slice::from_ref(&item)).await;

    Ok(Json(item))
}

/// Full details for one title
pub async fn title_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MediaItem>> {
    let item = state
        .catalog
        .details(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Title {} not found", id)))?;
    state.remember(std::slice::from_ref(&item)).await;

    Ok(Json(item))
}

/// Recommendations for the calling client
///
/// Always succeeds; the list may be empty once the daily quota is used up.
pub async fn recommend(
    State(state): State<AppState>,
    Extension(client): Extension<ClientId>,
    Json(request): Json<RecommendationRequest>,
) -> Json<RecommendationResponse> {
    let quota = state.quotas.for_client(client.as_deref());

    let items = state
        .recommender
        .get_recommendations(&request.preferences, &request.history, quota.as_ref())
        .await;
    state.remember(&items).await;

    let status = status_or_permissive(quota.as_ref()).await;

    Json(RecommendationResponse {
        items,
        quota: status,
    })
}

/// Folds one interaction into the caller's preference list
pub async fn record_interaction(
    State(state): State<AppState>,
    Json(request): Json<InteractionRequest>,
) -> AppResult<Json<InteractionResponse>> {
    let cap = request.cap.unwrap_or(state.preference_cap);
    if cap == 0 {
        return Err(AppError::InvalidInput(
            "Preference cap must be positive".to_string(),
        ));
    }

    let current = PreferenceList::from_labels(request.preferences, cap);
    let updated = {
        let inner = state.inner.read().await;
        preferences::update(&current, &request.interaction, &inner.items)
    };

    tracing::info!(
        item_id = %request.interaction.item_id,
        action = %request.interaction.action,
        preferences = updated.len(),
        "Interaction recorded"
    );

    Ok(Json(InteractionResponse {
        preferences: updated.into_vec(),
    }))
}

/// Today's quota for the calling client
///
/// A failing state store is reported as a permissive quota with nothing chosen.
pub async fn quota_status(
    State(state): State<AppState>,
    Extension(client): Extension<ClientId>,
) -> Json<QuotaResponse> {
    let quota = state.quotas.for_client(client.as_deref());
    let status = status_or_permissive(quota.as_ref()).await;
    let chosen = if status.persistent {
        quota.today().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Chosen items unavailable");
            Vec::new()
        })
    } else {
        Vec::new()
    };

    Json(QuotaResponse { status, chosen })
}

async fn status_or_permissive(quota: &dyn QuotaStore) -> QuotaStatus {
    match quota.status().await {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!(error = %e, "Quota status unavailable, reporting permissive quota");
            QuotaStatus {
                limit: quota.limit(),
                remaining: quota.limit(),
                limit_reached: false,
                persistent: false,
            }
        }
    }
}
