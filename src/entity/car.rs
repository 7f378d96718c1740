//! Car row and its sale status

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Sale status of a car on the lot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarStatus {
    Available,
    Reserved,
    Sold,
}

impl CarStatus {
    /// Stored text form
    pub fn as_str(&self) -> &'static str {
        match self {
            CarStatus::Available => "available",
            CarStatus::Reserved => "reserved",
            CarStatus::Sold => "sold",
        }
    }
}

impl fmt::Display for CarStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CarStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(CarStatus::Available),
            "reserved" => Ok(CarStatus::Reserved),
            "sold" => Ok(CarStatus::Sold),
            other => Err(StoreError::InvalidField {
                field: "status",
                reason: format!("unknown car status {:?}", other),
            }),
        }
    }
}

/// A single car, keyed by VIN
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Car {
    pub vin: String,
    /// Foreign key into the models table
    pub model: i64,
    pub price: Decimal,
    pub date_start: NaiveDateTime,
    pub status: CarStatus,
}
