//! Outstanding payment model.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
    Overdue,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::PartiallyPaid => "partially_paid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Overdue => "overdue",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "partially_paid" => PaymentStatus::PartiallyPaid,
            "paid" => PaymentStatus::Paid,
            "overdue" => PaymentStatus::Overdue,
            _ => PaymentStatus::Unpaid,
        }
    }
}

/// An amount owed on a contract. Created by the bill generator; settled by
/// the payment services.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OutstandingPayment {
    pub outstanding_payment_id: Uuid,
    pub contract_id: Uuid,
    pub due_date: NaiveDate,
    pub amount_due: Decimal,
    pub status: String,
    /// First day of the billed month; `None` for payments not raised by the
    /// monthly bill generator.
    pub billed_month: Option<NaiveDate>,
    pub created_utc: DateTime<Utc>,
}

/// Input for the outstanding payment of a monthly bill.
#[derive(Debug, Clone)]
pub struct CreateOutstandingPayment {
    pub contract_id: Uuid,
    pub room_id: Uuid,
    pub billed_month: NaiveDate,
    pub due_date: NaiveDate,
    pub amount_due: Decimal,
    pub status: PaymentStatus,
}

/// Outstanding payment joined with its contract's room and tenant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OutstandingPaymentDetail {
    pub outstanding_payment_id: Uuid,
    pub contract_id: Uuid,
    pub due_date: NaiveDate,
    pub amount_due: Decimal,
    pub status: String,
    pub created_utc: DateTime<Utc>,
    pub room_id: Uuid,
    pub room_number: String,
    pub tenant_id: Uuid,
    pub tenant_name: String,
}

impl OutstandingPaymentDetail {
    pub fn payment_status(&self) -> PaymentStatus {
        PaymentStatus::from_string(&self.status)
    }
}
