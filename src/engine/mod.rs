//! Engine Module
//!
//! The dealership store that coordinates the three tables.
//!
//! ## Responsibilities
//! - Create the data directory and table files on open
//! - Cross-table consistency operations (sell, revert, VIN change)
//! - Read-side joins and the best-sellers aggregation
//! - Verification and repair of drift between tables

mod repair;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::config::Config;
use crate::entity::{Car, CarFullInfo, CarModel, CarStatus, ModelSaleStats, Sale};
use crate::error::{Result, StoreError};
use crate::table::Table;

pub use repair::RepairReport;

/// How many models `top_models_by_sales` returns
pub const TOP_MODELS_LIMIT: usize = 3;

/// The dealership record store
///
/// ## Concurrency Model: Single Writer
///
/// - **Writes** (inserts and consistency operations): Serialized by
///   `write_lock`, so a multi-table operation runs to completion before the
///   next one starts
/// - **Reads**: Go straight to the tables; each table guards its own index
///   with an RwLock
///
/// Nothing coordinates separate processes. Only one `Dealership` should
/// have a given data directory open at a time.
///
/// ## Failure Model
///
/// Each consistency operation performs several independent file writes.
/// A failure between them (e.g. `sell_car` for an unknown VIN) leaves the
/// first write in place. `verify()` reports such drift and `repair()`
/// fixes it.
pub struct Dealership {
    models: Table<CarModel>,
    cars: Table<Car>,
    sales: Table<Sale>,

    /// Serializes write operations
    write_lock: Mutex<()>,
}

impl Dealership {
    /// Open or create a store with the given config
    ///
    /// Creates the data directory and any missing table files, then loads
    /// the three indexes into memory.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let dir = config.data_dir.as_path();
        let width = config.record_width;
        let sync = config.sync_writes;

        let models: Table<CarModel> = Table::open(dir, width, sync)?;
        let cars: Table<Car> = Table::open(dir, width, sync)?;
        let sales: Table<Sale> = Table::open(dir, width, sync)?;

        info!(
            data_dir = %dir.display(),
            models = models.len(),
            cars = cars.len(),
            sales = sales.len(),
            "store opened"
        );

        Ok(Self {
            models,
            cars,
            sales,
            write_lock: Mutex::new(()),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    // =========================================================================
    // Inserts
    // =========================================================================

    pub fn add_model(&self, model: CarModel) -> Result<CarModel> {
        let _write_guard = self.lock()?;
        self.models.insert(model)
    }

    pub fn add_car(&self, car: Car) -> Result<Car> {
        let _write_guard = self.lock()?;
        self.cars.insert(car)
    }

    // =========================================================================
    // Consistency Operations
    // =========================================================================

    /// Record a sale and mark its car as sold
    ///
    /// Steps:
    /// 1. Insert the sale (record + index)
    /// 2. Flip the car's status to `sold`
    ///
    /// If the car is unknown the sale from step 1 stays on disk and
    /// `NotFound` is returned.
    pub fn sell_car(&self, sale: Sale) -> Result<Car> {
        let _write_guard = self.lock()?;

        let sale = self.sales.insert(sale)?;
        let car = self
            .cars
            .update(sale.car_vin.as_str(), |car| car.status = CarStatus::Sold)
            .map_err(|e| {
                if e.is_not_found() {
                    warn!(sales_number = %sale.sales_number, vin = %sale.car_vin,
                        "sale recorded for unknown car");
                }
                e
            })?;

        info!(sales_number = %sale.sales_number, vin = %car.vin, "car sold");
        Ok(car)
    }

    /// Delete a sale and put its car back on the lot
    ///
    /// Steps:
    /// 1. Drop the sale's slot; later slots shift and the index is rebuilt
    /// 2. Flip the car's status to `available`
    ///
    /// Returns the updated car. Fails with `NotFound` if no such sale exists,
    /// or `CarNotFound` if the sale's car cannot be resolved (the sale is
    /// already gone at that point).
    pub fn revert_sale(&self, sales_number: &str) -> Result<Car> {
        let _write_guard = self.lock()?;

        let sale = self.sales.remove(sales_number)?;
        let car = self
            .cars
            .update(sale.car_vin.as_str(), |car| car.status = CarStatus::Available)
            .map_err(|e| match e {
                StoreError::NotFound { .. } => StoreError::CarNotFound(sale.car_vin.clone()),
                other => other,
            })?;

        info!(sales_number, vin = %car.vin, "sale reverted");
        Ok(car)
    }

    /// Change a car's primary key, keeping its slot and other fields
    ///
    /// Sales that reference `old_vin` are left untouched.
    pub fn update_vin(&self, old_vin: &str, new_vin: &str) -> Result<Car> {
        let _write_guard = self.lock()?;

        let car = self
            .cars
            .update(old_vin, |car| car.vin = new_vin.to_string())?;

        info!(old_vin, new_vin, "vin updated");
        Ok(car)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// All cars with `status`, in insertion order
    pub fn get_cars(&self, status: CarStatus) -> Result<Vec<Car>> {
        self.cars.scan_filter(|car| car.status == status)?.collect()
    }

    /// Car joined with its model and, if sold, the first matching sale
    ///
    /// Returns `Ok(None)` if the VIN is not indexed.
    pub fn get_car_info(&self, vin: &str) -> Result<Option<CarFullInfo>> {
        let car = match self.cars.get(vin)? {
            Some(car) => car,
            None => return Ok(None),
        };

        let model = self
            .models
            .get(&car.model)?
            .ok_or_else(|| StoreError::not_found("models", car.model))?;

        let mut sale = None;
        if car.status == CarStatus::Sold {
            for row in self.sales.scan()? {
                let row = row?;
                if row.car_vin == vin {
                    sale = Some(row);
                    break;
                }
            }
        }

        Ok(Some(CarFullInfo {
            vin: car.vin,
            car_model_name: model.name,
            car_model_brand: model.brand,
            price: car.price,
            date_start: car.date_start,
            status: car.status,
            sales_date: sale.as_ref().map(|s| s.sales_date),
            sales_cost: sale.map(|s| s.cost),
        }))
    }

    /// Best-selling models, at most `TOP_MODELS_LIMIT`
    ///
    /// Ranked by sale count, then by average listed price of the model's
    /// cars, both descending. Remaining ties keep the order in which each
    /// model's first sale appears in the sales file.
    pub fn top_models_by_sales(&self) -> Result<Vec<ModelSaleStats>> {
        // vin → model, and per-model price totals, from one pass over cars
        let mut vin_to_model: HashMap<String, i64> = HashMap::new();
        let mut price_totals: HashMap<i64, (Decimal, u64)> = HashMap::new();
        for car in self.cars.scan()? {
            let car = car?;
            let total = price_totals.entry(car.model).or_insert((Decimal::ZERO, 0));
            total.0 += car.price;
            total.1 += 1;
            vin_to_model.insert(car.vin, car.model);
        }

        // sale counts in first-seen order
        let mut counts: Vec<(i64, u64)> = Vec::new();
        let mut positions: HashMap<i64, usize> = HashMap::new();
        for sale in self.sales.scan()? {
            let sale = sale?;
            if let Some(&model) = vin_to_model.get(&sale.car_vin) {
                let pos = *positions.entry(model).or_insert_with(|| {
                    counts.push((model, 0));
                    counts.len() - 1
                });
                counts[pos].1 += 1;
            }
        }

        let averages: HashMap<i64, Decimal> = price_totals
            .into_iter()
            .map(|(model, (sum, n))| (model, sum / Decimal::from(n)))
            .collect();
        let average = |model: i64| averages.get(&model).copied().unwrap_or(Decimal::ZERO);

        // stable sort keeps first-seen order for full ties
        counts.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then_with(|| average(b.0).cmp(&average(a.0)))
        });
        counts.truncate(TOP_MODELS_LIMIT);

        counts
            .into_iter()
            .map(|(model_id, sales_number)| -> Result<ModelSaleStats> {
                let model = self
                    .models
                    .get(&model_id)?
                    .ok_or_else(|| StoreError::not_found("models", model_id))?;
                Ok(ModelSaleStats {
                    car_model_name: model.name,
                    brand: model.brand,
                    sales_number,
                })
            })
            .collect()
    }

    // =========================================================================
    // Table Accessors
    // =========================================================================
    //
    // Raw table handles for inspection and tests. Writes made through them
    // skip `write_lock` and the cross-table steps, so `verify()` may report
    // the result as drift.

    pub fn models(&self) -> &Table<CarModel> {
        &self.models
    }

    pub fn cars(&self) -> &Table<Car> {
        &self.cars
    }

    pub fn sales(&self) -> &Table<Sale> {
        &self.sales
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|e| StoreError::LockPoisoned(format!("Write lock poisoned: {}", e)))
    }

    /// VINs referenced by at least one sale
    fn sold_vins(&self) -> Result<HashSet<String>> {
        self.sales
            .scan()?
            .map(|sale| sale.map(|s| s.car_vin))
            .collect()
    }
}
