//! Tests for Table
//!
//! These tests verify:
//! - Insert / lookup round trips for every row type
//! - Index contents after N inserts
//! - Lazy scans in file order
//! - In-place updates, including primary key changes
//! - Physical removal and index rebuild
//! - Fail-fast decoding of malformed records

use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use lotstore::table::{Record, Table};
use lotstore::{Car, CarModel, CarStatus, Sale, StoreError};
use rust_decimal::Decimal;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const WIDTH: usize = 500;

fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn car(vin: &str, model: i64, price: i64) -> Car {
    Car {
        vin: vin.to_string(),
        model,
        price: Decimal::from(price),
        date_start: date(2023, 1, 1),
        status: CarStatus::Available,
    }
}

fn sale(number: &str, vin: &str) -> Sale {
    Sale {
        sales_number: number.to_string(),
        car_vin: vin.to_string(),
        sales_date: date(2023, 2, 1),
        cost: Decimal::new(4400050, 2),
    }
}

fn open<R: Record>(dir: &Path) -> Table<R> {
    Table::open(dir, WIDTH, false).unwrap()
}

// =============================================================================
// Insert / Lookup Tests
// =============================================================================

#[test]
fn test_open_creates_both_files() {
    let temp_dir = TempDir::new().unwrap();

    let _cars: Table<Car> = open(temp_dir.path());

    assert!(temp_dir.path().join("cars.txt").exists());
    assert!(temp_dir.path().join("cars_index.txt").exists());
}

#[test]
fn test_insert_get_round_trip_all_tables() {
    let temp_dir = TempDir::new().unwrap();
    let models: Table<CarModel> = open(temp_dir.path());
    let cars: Table<Car> = open(temp_dir.path());
    let sales: Table<Sale> = open(temp_dir.path());

    let model = CarModel::new(7, "Model X", "Tesla");
    let c = car("5YJ3E1EA1JF000001", 7, 45000);
    let s = sale("S1", "5YJ3E1EA1JF000001");

    assert_eq!(models.insert(model.clone()).unwrap(), model);
    assert_eq!(cars.insert(c.clone()).unwrap(), c);
    assert_eq!(sales.insert(s.clone()).unwrap(), s);

    assert_eq!(models.get(&7i64).unwrap(), Some(model));
    assert_eq!(cars.get("5YJ3E1EA1JF000001").unwrap(), Some(c));
    assert_eq!(sales.get("S1").unwrap(), Some(s));
}

#[test]
fn test_get_missing_key_is_none() {
    let temp_dir = TempDir::new().unwrap();
    let cars: Table<Car> = open(temp_dir.path());

    assert_eq!(cars.get("missing").unwrap(), None);
}

#[test]
fn test_index_after_n_inserts() {
    let temp_dir = TempDir::new().unwrap();
    let cars: Table<Car> = open(temp_dir.path());

    let vins = ["VIN-D", "VIN-A", "VIN-C", "VIN-B", "VIN-E"];
    for vin in vins {
        cars.insert(car(vin, 1, 1000)).unwrap();
    }

    let entries = cars.index_entries();
    assert_eq!(entries.len(), vins.len());
    assert!(entries.windows(2).all(|w| w[0].0 < w[1].0));
    for (vin, slot) in &entries {
        let text = cars.record_file().read_slot(*slot).unwrap();
        assert_eq!(Car::decode(&text).unwrap().vin, *vin);
    }

    let raw = fs::read_to_string(temp_dir.path().join("cars_index.txt")).unwrap();
    assert_eq!(raw.lines().count(), vins.len());
    assert!(raw.starts_with("VIN-A;1\n"));
}

#[test]
fn test_model_index_sorted_numerically() {
    let temp_dir = TempDir::new().unwrap();
    let models: Table<CarModel> = open(temp_dir.path());

    models.insert(CarModel::new(10, "Ten", "B")).unwrap();
    models.insert(CarModel::new(9, "Nine", "A")).unwrap();

    let raw = fs::read_to_string(temp_dir.path().join("models_index.txt")).unwrap();
    assert_eq!(raw, "9;1\n10;0\n");
}

#[test]
fn test_reinsert_same_key_points_to_new_slot() {
    let temp_dir = TempDir::new().unwrap();
    let cars: Table<Car> = open(temp_dir.path());

    cars.insert(car("VIN1", 1, 1000)).unwrap();
    cars.insert(car("VIN1", 1, 2000)).unwrap();

    assert_eq!(cars.len(), 1);
    assert_eq!(cars.get("VIN1").unwrap().unwrap().price, Decimal::from(2000));
    assert_eq!(cars.record_file().slot_count().unwrap(), 2);
}

#[test]
fn test_insert_too_long_row_leaves_table_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let models: Table<CarModel> = Table::open(temp_dir.path(), 16, false).unwrap();

    let err = models
        .insert(CarModel::new(1, "A Very Long Model Name", "Brand"))
        .unwrap_err();

    assert!(matches!(err, StoreError::RecordTooLong { .. }));
    assert!(models.is_empty());
    assert_eq!(models.record_file().slot_count().unwrap(), 0);
}

#[test]
fn test_reopen_reloads_index() {
    let temp_dir = TempDir::new().unwrap();
    {
        let sales: Table<Sale> = open(temp_dir.path());
        sales.insert(sale("S2", "VIN2")).unwrap();
        sales.insert(sale("S1", "VIN1")).unwrap();
    }

    let sales: Table<Sale> = open(temp_dir.path());
    assert_eq!(sales.len(), 2);
    assert_eq!(sales.get("S1").unwrap().unwrap().car_vin, "VIN1");
}

// =============================================================================
// Scan Tests
// =============================================================================

#[test]
fn test_scan_in_file_order() {
    let temp_dir = TempDir::new().unwrap();
    let cars: Table<Car> = open(temp_dir.path());

    for vin in ["C", "A", "B"] {
        cars.insert(car(vin, 1, 1000)).unwrap();
    }

    let vins: Vec<String> = cars.scan().unwrap().map(|c| c.unwrap().vin).collect();
    assert_eq!(vins, vec!["C", "A", "B"]);
}

#[test]
fn test_scan_filter() {
    let temp_dir = TempDir::new().unwrap();
    let cars: Table<Car> = open(temp_dir.path());

    cars.insert(car("A", 1, 1000)).unwrap();
    cars.insert(car("B", 2, 1000)).unwrap();
    cars.insert(car("C", 1, 1000)).unwrap();

    let model_one: Vec<Car> = cars
        .scan_filter(|c| c.model == 1)
        .unwrap()
        .collect::<lotstore::Result<_>>()
        .unwrap();

    assert_eq!(model_one.len(), 2);
    assert_eq!(model_one[1].vin, "C");
}

#[test]
fn test_scan_malformed_record_fails_fast() {
    let temp_dir = TempDir::new().unwrap();
    let cars: Table<Car> = open(temp_dir.path());

    cars.insert(car("A", 1, 1000)).unwrap();
    cars.record_file().append("garbage-without-fields").unwrap();

    let results: Vec<_> = cars.scan().unwrap().collect();
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(StoreError::Corrupt { line: 1, .. })));
}

#[test]
fn test_get_with_corrupt_index_slot_is_error() {
    let temp_dir = TempDir::new().unwrap();
    {
        let cars: Table<Car> = open(temp_dir.path());
        cars.insert(car("A", 1, 1000)).unwrap();
    }
    fs::write(
        temp_dir.path().join("cars_index.txt"),
        "A;18446744073709551615\n",
    )
    .unwrap();

    let cars: Table<Car> = open(temp_dir.path());

    assert!(matches!(cars.get("A"), Err(StoreError::Corrupt { .. })));
}

// =============================================================================
// Update Tests
// =============================================================================

#[test]
fn test_update_changes_only_target_slot() {
    let temp_dir = TempDir::new().unwrap();
    let cars: Table<Car> = open(temp_dir.path());

    cars.insert(car("A", 1, 1000)).unwrap();
    cars.insert(car("B", 1, 1000)).unwrap();

    let updated = cars.update("A", |c| c.status = CarStatus::Sold).unwrap();

    assert_eq!(updated.status, CarStatus::Sold);
    assert_eq!(cars.get("A").unwrap().unwrap().status, CarStatus::Sold);
    assert_eq!(cars.get("B").unwrap().unwrap().status, CarStatus::Available);

    let raw = fs::read(temp_dir.path().join("cars.txt")).unwrap();
    assert_eq!(raw.len(), 2 * (WIDTH + 1));
}

#[test]
fn test_update_missing_key() {
    let temp_dir = TempDir::new().unwrap();
    let cars: Table<Car> = open(temp_dir.path());

    let err = cars.update("nope", |c| c.status = CarStatus::Sold).unwrap_err();

    assert!(matches!(err, StoreError::NotFound { table: "cars", .. }));
}

#[test]
fn test_update_primary_key_moves_index_entry() {
    let temp_dir = TempDir::new().unwrap();
    let cars: Table<Car> = open(temp_dir.path());

    cars.insert(car("OLD", 3, 5000)).unwrap();

    cars.update("OLD", |c| c.vin = "NEW".to_string()).unwrap();

    assert_eq!(cars.get("OLD").unwrap(), None);
    let moved = cars.get("NEW").unwrap().unwrap();
    assert_eq!(moved.model, 3);
    assert_eq!(cars.index_entries(), vec![("NEW".to_string(), 0)]);
}

#[test]
fn test_update_to_existing_key_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let cars: Table<Car> = open(temp_dir.path());

    cars.insert(car("A", 1, 1000)).unwrap();
    cars.insert(car("B", 1, 1000)).unwrap();

    let err = cars.update("A", |c| c.vin = "B".to_string()).unwrap_err();

    assert!(matches!(err, StoreError::InvalidField { field: "key", .. }));
    assert!(cars.get("A").unwrap().is_some());
}

// =============================================================================
// Remove Tests
// =============================================================================

#[test]
fn test_remove_renumbers_and_rebuilds_index() {
    let temp_dir = TempDir::new().unwrap();
    let sales: Table<Sale> = open(temp_dir.path());

    sales.insert(sale("S1", "V1")).unwrap();
    sales.insert(sale("S2", "V2")).unwrap();
    sales.insert(sale("S3", "V3")).unwrap();

    let removed = sales.remove("S1").unwrap();

    assert_eq!(removed.car_vin, "V1");
    assert_eq!(
        sales.index_entries(),
        vec![("S2".to_string(), 0), ("S3".to_string(), 1)]
    );
    assert_eq!(sales.get("S3").unwrap().unwrap().car_vin, "V3");
    assert_eq!(sales.get("S1").unwrap(), None);

    let raw = fs::read_to_string(temp_dir.path().join("sales_index.txt")).unwrap();
    assert_eq!(raw, "S2;0\nS3;1\n");
}

#[test]
fn test_remove_missing_key() {
    let temp_dir = TempDir::new().unwrap();
    let sales: Table<Sale> = open(temp_dir.path());

    sales.insert(sale("S1", "V1")).unwrap();

    assert!(matches!(
        sales.remove("S9"),
        Err(StoreError::NotFound { table: "sales", .. })
    ));
    assert_eq!(sales.len(), 1);
}

// =============================================================================
// Index Rebuild Tests
// =============================================================================

#[test]
fn test_rebuild_index_after_lost_index_write() {
    let temp_dir = TempDir::new().unwrap();
    {
        let cars: Table<Car> = open(temp_dir.path());
        cars.insert(car("A", 1, 1000)).unwrap();
        // row reaches the record file but its index entry never does
        cars.record_file()
            .append(&car("B", 1, 1000).encode().unwrap())
            .unwrap();
    }

    let cars: Table<Car> = open(temp_dir.path());
    assert!(cars.index_drift().unwrap());
    assert_eq!(cars.get("B").unwrap(), None);

    assert!(cars.rebuild_index().unwrap());

    assert!(!cars.index_drift().unwrap());
    assert_eq!(cars.get("B").unwrap().unwrap().vin, "B");
    assert!(!cars.rebuild_index().unwrap());
}
