use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rental_core::error::AppError;
use uuid::Uuid;

use crate::dtos::RecordMeterReadingRequest;
use crate::models::MeterReading;
use crate::startup::AppState;

#[tracing::instrument(skip(state, request))]
pub async fn record_meter_reading(
    State(state): State<AppState>,
    Json(request): Json<RecordMeterReadingRequest>,
) -> Result<(StatusCode, Json<MeterReading>), AppError> {
    let input = request.into_input()?;
    let reading = state.engine.record_meter_reading(input).await?;
    Ok((StatusCode::CREATED, Json(reading)))
}

#[tracing::instrument(skip(state))]
pub async fn get_latest_meter_reading(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<MeterReading>, AppError> {
    Ok(Json(state.engine.latest_meter_reading(room_id).await?))
}
