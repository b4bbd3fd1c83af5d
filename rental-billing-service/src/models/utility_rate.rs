//! Utility rate model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Metered utility with its own rate schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilityKind {
    Water,
    Electric,
}

impl UtilityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UtilityKind::Water => "water",
            UtilityKind::Electric => "electric",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "water" => Some(UtilityKind::Water),
            "electric" => Some(UtilityKind::Electric),
            _ => None,
        }
    }
}

impl fmt::Display for UtilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Price per metered unit, in force from `effective_from` until a later rate
/// of the same kind supersedes it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UtilityRate {
    pub rate_id: Uuid,
    pub kind: String,
    pub rate_per_unit: Decimal,
    pub effective_from: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
}

impl UtilityRate {
    pub fn utility_kind(&self) -> Option<UtilityKind> {
        UtilityKind::parse(&self.kind)
    }
}

/// Input for creating a utility rate.
#[derive(Debug, Clone)]
pub struct CreateUtilityRate {
    pub kind: UtilityKind,
    pub rate_per_unit: Decimal,
    pub effective_from: DateTime<Utc>,
}
