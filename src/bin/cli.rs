//! lotstore CLI
//!
//! Command-line front end for a lotstore data directory.

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use lotstore::{Car, CarModel, CarStatus, Config, Dealership, RepairReport, Sale};
use rust_decimal::Decimal;
use tracing_subscriber::{fmt, EnvFilter};

/// lotstore CLI
#[derive(Parser, Debug)]
#[command(name = "lotstore-cli")]
#[command(about = "CLI for the lotstore dealership record store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./lotstore_data")]
    data_dir: String,

    /// Record slot width in bytes
    #[arg(short = 'w', long, default_value = "500")]
    record_width: usize,

    /// fsync after every write
    #[arg(long)]
    sync: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a car model
    AddModel {
        id: i64,
        name: String,
        brand: String,
    },

    /// Add a car to the lot
    AddCar {
        vin: String,
        /// Model id
        model: i64,
        price: Decimal,
        /// Listing date (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)
        #[arg(value_parser = parse_date)]
        date_start: NaiveDateTime,
        #[arg(long, default_value = "available")]
        status: CarStatus,
    },

    /// Record a sale and mark the car sold
    Sell {
        sales_number: String,
        vin: String,
        #[arg(value_parser = parse_date)]
        sales_date: NaiveDateTime,
        cost: Decimal,
    },

    /// Delete a sale and mark the car available
    Revert { sales_number: String },

    /// Change a car's VIN
    UpdateVin { old_vin: String, new_vin: String },

    /// List cars with a given status
    Cars {
        #[arg(long, default_value = "available")]
        status: CarStatus,
    },

    /// Show full information about one car
    Info { vin: String },

    /// Show the best-selling models
    Top,

    /// Check indexes and car statuses without writing
    Verify,

    /// Rebuild indexes and fix car statuses
    Repair,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lotstore=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .record_width(args.record_width)
        .sync_writes(args.sync)
        .build();

    let store = match Dealership::open(config) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&store, args.command) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(store: &Dealership, command: Commands) -> lotstore::Result<()> {
    match command {
        Commands::AddModel { id, name, brand } => {
            let model = store.add_model(CarModel::new(id, name, brand))?;
            println!("{} {} {}", model.id, model.brand, model.name);
        }
        Commands::AddCar {
            vin,
            model,
            price,
            date_start,
            status,
        } => {
            let car = store.add_car(Car {
                vin,
                model,
                price,
                date_start,
                status,
            })?;
            print_car(&car);
        }
        Commands::Sell {
            sales_number,
            vin,
            sales_date,
            cost,
        } => {
            let car = store.sell_car(Sale {
                sales_number,
                car_vin: vin,
                sales_date,
                cost,
            })?;
            print_car(&car);
        }
        Commands::Revert { sales_number } => {
            print_car(&store.revert_sale(&sales_number)?);
        }
        Commands::UpdateVin { old_vin, new_vin } => {
            print_car(&store.update_vin(&old_vin, &new_vin)?);
        }
        Commands::Cars { status } => {
            for car in store.get_cars(status)? {
                print_car(&car);
            }
        }
        Commands::Info { vin } => match store.get_car_info(&vin)? {
            Some(info) => {
                println!("vin:     {}", info.vin);
                println!("model:   {} {}", info.car_model_brand, info.car_model_name);
                println!("price:   {}", info.price);
                println!("listed:  {}", info.date_start);
                println!("status:  {}", info.status);
                if let (Some(date), Some(cost)) = (info.sales_date, info.sales_cost) {
                    println!("sold:    {} for {}", date, cost);
                }
            }
            None => println!("(not found)"),
        },
        Commands::Top => {
            for (rank, stats) in store.top_models_by_sales()?.iter().enumerate() {
                println!(
                    "{}. {} {} ({} sales)",
                    rank + 1,
                    stats.brand,
                    stats.car_model_name,
                    stats.sales_number
                );
            }
        }
        Commands::Verify => print_report(&store.verify()?),
        Commands::Repair => print_report(&store.repair()?),
    }
    Ok(())
}

fn print_car(car: &Car) {
    println!(
        "{} model={} price={} listed={} status={}",
        car.vin, car.model, car.price, car.date_start, car.status
    );
}

fn print_report(report: &RepairReport) {
    if report.is_clean() {
        println!("store is consistent");
        return;
    }
    println!("index drift:      {:?}", report.index_drift);
    println!("marked sold:      {:?}", report.marked_sold);
    println!("marked available: {:?}", report.marked_available);
    println!("orphan sales:     {:?}", report.orphan_sales);
}

/// Accept a bare date (midnight) or a full ISO-8601 timestamp
fn parse_date(s: &str) -> Result<NaiveDateTime, String> {
    if let Ok(dt) = s.parse::<NaiveDateTime>() {
        return Ok(dt);
    }
    s.parse::<NaiveDate>()
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("invalid date {:?}", s))
}
