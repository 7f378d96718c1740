//! # lotstore
//!
//! A minimal persistent record store for a car dealership with:
//! - Three tables (models, cars, sales) in fixed-width text record files
//! - A sorted `key;slot` index file per table
//! - Cross-table consistency operations (sell, revert sale, change VIN)
//! - A best-selling-models aggregation
//! - Verification and repair of cross-file drift
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Dealership                            │
//! │        (single writer, consistency ops, aggregation)         │
//! └──────────┬──────────────────┬──────────────────┬────────────┘
//!            │                  │                  │
//!            ▼                  ▼                  ▼
//!   ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//!   │ Table<CarModel> │ │   Table<Car>    │ │   Table<Sale>   │
//!   └────────┬────────┘ └────────┬────────┘ └────────┬────────┘
//!            │                   │                   │
//!            ▼                   ▼                   ▼
//!   ┌─────────────────────────────────────────────────────────┐
//!   │     RecordFile (fixed-width slots) + SortedIndex         │
//!   └─────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod entity;
pub mod storage;
pub mod table;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StoreError, Result};
pub use config::Config;
pub use engine::{Dealership, RepairReport};
pub use entity::{Car, CarFullInfo, CarModel, CarStatus, ModelSaleStats, Sale};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of lotstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
