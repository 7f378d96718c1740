//! Entity Module
//!
//! Typed rows stored by the engine and the derived read-only views built
//! from them.
//!
//! ## Tables
//! - `CarModel` — keyed by `id`, never mutated after insert
//! - `Car` — keyed by `vin`, status and vin rewritten in place
//! - `Sale` — keyed by `sales_number`, physically removed on revert
//!
//! ## Derived
//! - `CarFullInfo` — join of Car + CarModel + optional Sale
//! - `ModelSaleStats` — per-model sales ranking row

mod car;
mod car_model;
mod report;
mod sale;

pub use car::{Car, CarStatus};
pub use car_model::CarModel;
pub use report::{CarFullInfo, ModelSaleStats};
pub use sale::Sale;
