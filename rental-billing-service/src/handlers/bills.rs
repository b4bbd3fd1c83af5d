use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rental_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{BillQuery, GenerateBillRequest, GenerateBillsRequest, StatisticsQuery};
use crate::models::{BatchBillResult, BillLookup, GeneratedBill, MonthlyBillStatistics};
use crate::startup::AppState;

#[tracing::instrument(skip(state, request), fields(room_id = %room_id))]
pub async fn generate_bill_for_room(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Json(request): Json<GenerateBillRequest>,
) -> Result<(StatusCode, Json<GeneratedBill>), AppError> {
    let period = request.into_period()?;

    let generated = state
        .engine
        .generate_monthly_bill_for_room(room_id, period)
        .await?;

    Ok((StatusCode::CREATED, Json(generated)))
}

#[tracing::instrument(skip(state, request))]
pub async fn generate_bills_for_rooms(
    State(state): State<AppState>,
    Json(request): Json<GenerateBillsRequest>,
) -> Result<Json<BatchBillResult>, AppError> {
    let command = request.into_command()?;

    let result = state
        .engine
        .generate_monthly_bills_for_rooms(&command.room_ids, command.period)
        .await;

    Ok(Json(result))
}

#[tracing::instrument(skip(state, request))]
pub async fn generate_bills_for_active_rooms(
    State(state): State<AppState>,
    Json(request): Json<GenerateBillRequest>,
) -> Result<Json<BatchBillResult>, AppError> {
    let period = request.into_period()?;

    let result = state
        .engine
        .generate_monthly_bills_for_all_active_rooms(period)
        .await?;

    Ok(Json(result))
}

#[tracing::instrument(skip(state, query))]
pub async fn get_bill_by_room(
    State(state): State<AppState>,
    Query(query): Query<BillQuery>,
) -> Result<Json<BillLookup>, AppError> {
    let (room_id, period) = query.into_parts()?;

    let lookup = state.engine.get_monthly_bill_by_room(room_id, period).await?;

    Ok(Json(lookup))
}

#[tracing::instrument(skip(state, query))]
pub async fn get_bill_statistics(
    State(state): State<AppState>,
    Query(query): Query<StatisticsQuery>,
) -> Result<Json<MonthlyBillStatistics>, AppError> {
    let period = query.into_period()?;

    let statistics = state.engine.get_monthly_bill_statistics(period).await?;

    Ok(Json(statistics))
}
