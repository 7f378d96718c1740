//! Store verification and repair
//!
//! Detects and fixes the drift a failed multi-file operation can leave
//! behind:
//! - an index that no longer matches its record file
//! - a car whose status disagrees with the sales table
//! - a sale whose car VIN is not in the cars table

use std::collections::HashMap;

use tracing::{info, warn};

use crate::entity::{Car, CarStatus};
use crate::error::Result;

use super::Dealership;

/// Result of a verify or repair pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RepairReport {
    /// Tables whose index disagreed with the record file
    pub index_drift: Vec<&'static str>,

    /// VINs with an active sale but a status other than `sold`
    pub marked_sold: Vec<String>,

    /// VINs marked `sold` with no active sale
    pub marked_available: Vec<String>,

    /// Sales numbers whose car VIN is unknown (reported, never deleted)
    pub orphan_sales: Vec<String>,
}

impl RepairReport {
    /// True when nothing needed fixing
    pub fn is_clean(&self) -> bool {
        self.index_drift.is_empty()
            && self.marked_sold.is_empty()
            && self.marked_available.is_empty()
            && self.orphan_sales.is_empty()
    }
}

impl Dealership {
    /// Inspect the store without modifying it
    pub fn verify(&self) -> Result<RepairReport> {
        let _write_guard = self.lock()?;

        let mut report = RepairReport::default();
        if self.models.index_drift()? {
            report.index_drift.push("models");
        }
        if self.cars.index_drift()? {
            report.index_drift.push("cars");
        }
        if self.sales.index_drift()? {
            report.index_drift.push("sales");
        }
        self.status_drift(&mut report)?;

        Ok(report)
    }

    /// Rebuild drifted indexes, then correct car statuses
    ///
    /// Steps:
    /// 1. Rebuild every index from its record file
    /// 2. Mark cars with an active sale as `sold`
    /// 3. Mark `sold` cars without a sale as `available`
    pub fn repair(&self) -> Result<RepairReport> {
        let _write_guard = self.lock()?;

        let mut report = RepairReport::default();
        if self.models.rebuild_index()? {
            report.index_drift.push("models");
        }
        if self.cars.rebuild_index()? {
            report.index_drift.push("cars");
        }
        if self.sales.rebuild_index()? {
            report.index_drift.push("sales");
        }
        for table in &report.index_drift {
            warn!(table = *table, "index rebuilt from record file");
        }

        self.status_drift(&mut report)?;

        for vin in &report.marked_sold {
            self.cars
                .update(vin.as_str(), |car| car.status = CarStatus::Sold)?;
            warn!(vin = %vin, "status corrected to sold");
        }
        for vin in &report.marked_available {
            self.cars
                .update(vin.as_str(), |car| car.status = CarStatus::Available)?;
            warn!(vin = %vin, "status corrected to available");
        }
        for sales_number in &report.orphan_sales {
            warn!(sales_number = %sales_number, "sale references unknown car");
        }

        info!(
            index_drift = report.index_drift.len(),
            marked_sold = report.marked_sold.len(),
            marked_available = report.marked_available.len(),
            orphan_sales = report.orphan_sales.len(),
            "repair finished"
        );
        Ok(report)
    }

    /// Compare each car's status against the sales table
    ///
    /// Cars are resolved the way the index would resolve them: the last
    /// slot written for a VIN wins.
    fn status_drift(&self, report: &mut RepairReport) -> Result<()> {
        let mut latest: HashMap<String, Car> = HashMap::new();
        for car in self.cars.scan()? {
            let car = car?;
            latest.insert(car.vin.clone(), car);
        }

        let sold_vins = self.sold_vins()?;

        for (vin, car) in &latest {
            let has_sale = sold_vins.contains(vin);
            match car.status {
                CarStatus::Sold if !has_sale => report.marked_available.push(vin.clone()),
                CarStatus::Available | CarStatus::Reserved if has_sale => {
                    report.marked_sold.push(vin.clone())
                }
                _ => {}
            }
        }

        for sale in self.sales.scan()? {
            let sale = sale?;
            if !latest.contains_key(&sale.car_vin) {
                report.orphan_sales.push(sale.sales_number);
            }
        }

        report.marked_sold.sort();
        report.marked_available.sort();
        report.orphan_sales.sort();
        Ok(())
    }
}
