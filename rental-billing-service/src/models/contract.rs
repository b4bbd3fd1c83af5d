//! Contract model.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Contract status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Active,
    Expired,
    Terminated,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Active => "active",
            ContractStatus::Expired => "expired",
            ContractStatus::Terminated => "terminated",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "active" => ContractStatus::Active,
            "expired" => ContractStatus::Expired,
            _ => ContractStatus::Terminated,
        }
    }
}

/// A tenancy agreement for one room.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Contract {
    pub contract_id: Uuid,
    pub room_id: Uuid,
    pub tenant_id: Uuid,
    pub status: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Contract {
    pub fn contract_status(&self) -> ContractStatus {
        ContractStatus::from_string(&self.status)
    }
}

/// An active contract joined with the room and tenant details billing needs.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActiveContract {
    pub contract_id: Uuid,
    pub room_id: Uuid,
    pub tenant_id: Uuid,
    pub status: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub room_number: String,
    /// Monthly rent; rooms without configured details have no price.
    pub room_price: Option<Decimal>,
    pub tenant_name: String,
}
