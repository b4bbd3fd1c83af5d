//! Monthly bill shapes produced by the billing engine.
//!
//! None of these are stored as rows; the persisted artefact of a bill is its
//! [`OutstandingPayment`].

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ActiveContract, MeterReading, OutstandingPayment, OutstandingPaymentDetail};

/// Bill item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillItemType {
    RoomRent,
    Water,
    Electric,
}

impl BillItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillItemType::RoomRent => "room_rent",
            BillItemType::Water => "water",
            BillItemType::Electric => "electric",
        }
    }
}

/// One line of a monthly bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillItem {
    pub description: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub item_type: BillItemType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<Decimal>,
}

/// A room's bill for one month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyBill {
    pub outstanding_payment_id: Uuid,
    pub room_id: Uuid,
    pub room_number: String,
    pub tenant_name: String,
    pub month: u32,
    pub year: i32,
    pub due_date: NaiveDate,
    pub total_amount: Decimal,
    pub items: Vec<BillItem>,
}

/// Result of generating one room's bill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedBill {
    pub bill: MonthlyBill,
    pub contract: ActiveContract,
    pub outstanding_payment: OutstandingPayment,
}

/// A room the batch generator could not bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchBillError {
    pub room_id: Uuid,
    pub error: String,
}

/// Batch totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_rooms: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub total_amount: Decimal,
}

/// Outcome of a batch generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchBillResult {
    pub success: Vec<GeneratedBill>,
    pub errors: Vec<BatchBillError>,
    pub summary: BatchSummary,
}

/// A stored bill for a room and month, with the reading it was based on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillLookup {
    pub outstanding_payment: OutstandingPaymentDetail,
    pub meter_reading: Option<MeterReading>,
}

/// Aggregates over the bills due in one month.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillStatistics {
    pub total_bills: usize,
    pub total_amount: Decimal,
    pub paid_bills: usize,
    pub unpaid_bills: usize,
    pub partially_paid_bills: usize,
    pub overdue_bills: usize,
    pub collection_rate: f64,
}

/// Statistics response for one month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyBillStatistics {
    pub month: u32,
    pub year: i32,
    pub statistics: BillStatistics,
    pub bills: Vec<OutstandingPaymentDetail>,
}
