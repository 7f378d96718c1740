//! Derived read-only views
//!
//! Built on demand by the engine, never persisted.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::CarStatus;

/// Car joined with its model and, when sold, the matching sale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarFullInfo {
    pub vin: String,
    pub car_model_name: String,
    pub car_model_brand: String,
    pub price: Decimal,
    pub date_start: NaiveDateTime,
    pub status: CarStatus,
    pub sales_date: Option<NaiveDateTime>,
    pub sales_cost: Option<Decimal>,
}

/// One row of the best-selling models ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSaleStats {
    pub car_model_name: String,
    pub brand: String,
    pub sales_number: u64,
}
