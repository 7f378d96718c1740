//! Car model row

use serde::{Deserialize, Serialize};

/// A car model (make + name), referenced by `Car::model`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarModel {
    pub id: i64,
    pub name: String,
    pub brand: String,
}

impl CarModel {
    pub fn new(id: i64, name: impl Into<String>, brand: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            brand: brand.into(),
        }
    }
}
