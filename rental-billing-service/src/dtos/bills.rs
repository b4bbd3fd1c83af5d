use rental_core::error::AppError;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::billing::BillingPeriod;

fn missing(field: &str) -> AppError {
    AppError::BadRequest(anyhow::anyhow!("{} is required", field))
}

/// Checks a request and turns validator failures into a 400.
pub fn validate_request<T: Validate>(request: &T) -> Result<(), AppError> {
    request
        .validate()
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Invalid request: {}", e)))
}

fn period(month: Option<u32>, year: Option<i32>) -> Result<BillingPeriod, AppError> {
    let month = month.ok_or_else(|| missing("month"))?;
    let year = year.ok_or_else(|| missing("year"))?;
    Ok(BillingPeriod::new(month, year)?)
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateBillRequest {
    #[validate(required(message = "month is required"), range(min = 1, max = 12))]
    pub month: Option<u32>,
    #[validate(required(message = "year is required"), range(min = 2000, max = 2100))]
    pub year: Option<i32>,
}

impl GenerateBillRequest {
    pub fn into_period(self) -> Result<BillingPeriod, AppError> {
        validate_request(&self)?;
        period(self.month, self.year)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateBillsRequest {
    #[validate(required(message = "room_ids is required"))]
    pub room_ids: Option<Vec<Uuid>>,
    #[validate(required(message = "month is required"), range(min = 1, max = 12))]
    pub month: Option<u32>,
    #[validate(required(message = "year is required"), range(min = 2000, max = 2100))]
    pub year: Option<i32>,
}

/// Typed form of a multi-room generation request.
#[derive(Debug, Clone)]
pub struct GenerateBillsCommand {
    pub room_ids: Vec<Uuid>,
    pub period: BillingPeriod,
}

impl GenerateBillsRequest {
    pub fn into_command(self) -> Result<GenerateBillsCommand, AppError> {
        validate_request(&self)?;
        let period = period(self.month, self.year)?;
        let room_ids = self.room_ids.ok_or_else(|| missing("room_ids"))?;
        Ok(GenerateBillsCommand { room_ids, period })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct BillQuery {
    #[validate(required(message = "room_id is required"))]
    pub room_id: Option<Uuid>,
    #[validate(required(message = "month is required"), range(min = 1, max = 12))]
    pub month: Option<u32>,
    #[validate(required(message = "year is required"), range(min = 2000, max = 2100))]
    pub year: Option<i32>,
}

impl BillQuery {
    pub fn into_parts(self) -> Result<(Uuid, BillingPeriod), AppError> {
        validate_request(&self)?;
        let period = period(self.month, self.year)?;
        let room_id = self.room_id.ok_or_else(|| missing("room_id"))?;
        Ok((room_id, period))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct StatisticsQuery {
    #[validate(required(message = "month is required"), range(min = 1, max = 12))]
    pub month: Option<u32>,
    #[validate(required(message = "year is required"), range(min = 2000, max = 2100))]
    pub year: Option<i32>,
}

impl StatisticsQuery {
    pub fn into_period(self) -> Result<BillingPeriod, AppError> {
        validate_request(&self)?;
        period(self.month, self.year)
    }
}
