//! Sale row

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A completed sale, keyed by `sales_number`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub sales_number: String,
    /// Foreign key into the cars table (not updated by `update_vin`)
    pub car_vin: String,
    pub sales_date: NaiveDateTime,
    pub cost: Decimal,
}
