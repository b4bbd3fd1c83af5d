use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rental_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{kind_from_path, CreateUtilityRateRequest, RateHistoryQuery};
use crate::models::UtilityRate;
use crate::startup::AppState;

#[tracing::instrument(skip(state, request))]
pub async fn create_utility_rate(
    State(state): State<AppState>,
    Json(request): Json<CreateUtilityRateRequest>,
) -> Result<(StatusCode, Json<UtilityRate>), AppError> {
    let input = request.into_input()?;
    let rate = state.engine.create_utility_rate(input).await?;
    Ok((StatusCode::CREATED, Json(rate)))
}

#[tracing::instrument(skip(state))]
pub async fn list_utility_rates(
    State(state): State<AppState>,
) -> Result<Json<Vec<UtilityRate>>, AppError> {
    Ok(Json(state.engine.list_utility_rates().await?))
}

#[tracing::instrument(skip(state))]
pub async fn get_current_utility_rate(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<UtilityRate>, AppError> {
    let kind = kind_from_path(&kind)?;
    Ok(Json(state.engine.current_utility_rate(kind).await?))
}

#[tracing::instrument(skip(state, query))]
pub async fn get_utility_rate_history(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<RateHistoryQuery>,
) -> Result<Json<Vec<UtilityRate>>, AppError> {
    let kind = kind_from_path(&kind)?;
    let (start, end) = query.into_range()?;
    Ok(Json(
        state.engine.utility_rate_history(kind, start, end).await?,
    ))
}

#[tracing::instrument(skip(state))]
pub async fn delete_utility_rate(
    State(state): State<AppState>,
    Path(rate_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.engine.delete_utility_rate(rate_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
