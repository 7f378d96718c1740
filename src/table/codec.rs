//! Row codec
//!
//! Encoding and decoding of typed rows to `;`-delimited slot text.
//!
//! ## Row Formats
//! - models: `id;name;brand`
//! - cars:   `vin;model_id;price;date_start;status`
//! - sales:  `sales_number;car_vin;sales_date;cost`
//!
//! Timestamps are ISO-8601 without offset (`2023-01-01T00:00:00`), decimals
//! use their plain string form.

use std::str::{FromStr, Split};

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::entity::{Car, CarModel, CarStatus, Sale};
use crate::error::{Result, StoreError};
use crate::storage::{IndexKey, FILLER};

/// Field delimiter inside a slot
pub const FIELD_SEPARATOR: char = ';';

/// Timestamp layout; the fraction is omitted when zero
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A typed row that can live in a `Table`
pub trait Record: Sized {
    type Key: IndexKey;

    /// Table name used in errors and logs
    const TABLE: &'static str;
    const RECORD_FILE: &'static str;
    const INDEX_FILE: &'static str;

    fn key(&self) -> Self::Key;

    /// Encode to unpadded slot text
    fn encode(&self) -> Result<String>;

    /// Decode from unpadded slot text; the error is a human-readable reason
    fn decode(text: &str) -> std::result::Result<Self, String>;
}

// =============================================================================
// Record Implementations
// =============================================================================

impl Record for CarModel {
    type Key = i64;

    const TABLE: &'static str = "models";
    const RECORD_FILE: &'static str = "models.txt";
    const INDEX_FILE: &'static str = "models_index.txt";

    fn key(&self) -> i64 {
        self.id
    }

    fn encode(&self) -> Result<String> {
        Ok(join(&[
            self.id.to_string(),
            checked("name", &self.name)?,
            checked_last("brand", &self.brand)?,
        ]))
    }

    fn decode(text: &str) -> std::result::Result<Self, String> {
        let mut fields = FieldReader::new(text, 3)?;
        Ok(CarModel {
            id: fields.parse("id")?,
            name: fields.text("name")?,
            brand: fields.text("brand")?,
        })
    }
}

impl Record for Car {
    type Key = String;

    const TABLE: &'static str = "cars";
    const RECORD_FILE: &'static str = "cars.txt";
    const INDEX_FILE: &'static str = "cars_index.txt";

    fn key(&self) -> String {
        self.vin.clone()
    }

    fn encode(&self) -> Result<String> {
        Ok(join(&[
            checked("vin", &self.vin)?,
            self.model.to_string(),
            self.price.to_string(),
            format_date(&self.date_start),
            self.status.to_string(),
        ]))
    }

    fn decode(text: &str) -> std::result::Result<Self, String> {
        let mut fields = FieldReader::new(text, 5)?;
        Ok(Car {
            vin: fields.text("vin")?,
            model: fields.parse("model")?,
            price: fields.parse::<Decimal>("price")?,
            date_start: fields.date("date_start")?,
            status: fields.parse::<CarStatus>("status")?,
        })
    }
}

impl Record for Sale {
    type Key = String;

    const TABLE: &'static str = "sales";
    const RECORD_FILE: &'static str = "sales.txt";
    const INDEX_FILE: &'static str = "sales_index.txt";

    fn key(&self) -> String {
        self.sales_number.clone()
    }

    fn encode(&self) -> Result<String> {
        Ok(join(&[
            checked("sales_number", &self.sales_number)?,
            checked("car_vin", &self.car_vin)?,
            format_date(&self.sales_date),
            self.cost.to_string(),
        ]))
    }

    fn decode(text: &str) -> std::result::Result<Self, String> {
        let mut fields = FieldReader::new(text, 4)?;
        Ok(Sale {
            sales_number: fields.text("sales_number")?,
            car_vin: fields.text("car_vin")?,
            sales_date: fields.date("sales_date")?,
            cost: fields.parse::<Decimal>("cost")?,
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Sequential reader over the fields of one slot
struct FieldReader<'a> {
    fields: Split<'a, char>,
}

impl<'a> FieldReader<'a> {
    /// Fails unless `text` has exactly `expected` fields
    fn new(text: &'a str, expected: usize) -> std::result::Result<Self, String> {
        let found = text.split(FIELD_SEPARATOR).count();
        if found != expected {
            return Err(format!("expected {} fields, found {}", expected, found));
        }
        Ok(Self {
            fields: text.split(FIELD_SEPARATOR),
        })
    }

    fn next(&mut self, name: &str) -> std::result::Result<&'a str, String> {
        self.fields
            .next()
            .ok_or_else(|| format!("missing field {}", name))
    }

    fn text(&mut self, name: &str) -> std::result::Result<String, String> {
        self.next(name).map(str::to_string)
    }

    fn parse<T>(&mut self, name: &str) -> std::result::Result<T, String>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.next(name)?;
        raw.trim()
            .parse()
            .map_err(|e| format!("invalid {} {:?}: {}", name, raw, e))
    }

    fn date(&mut self, name: &str) -> std::result::Result<NaiveDateTime, String> {
        self.parse(name)
    }
}

fn join(fields: &[String]) -> String {
    fields.join(&FIELD_SEPARATOR.to_string())
}

/// Reject text that would break the slot layout
fn checked(field: &'static str, value: &str) -> Result<String> {
    if value.contains(FIELD_SEPARATOR) || value.contains('\n') || value.contains('\r') {
        return Err(StoreError::InvalidField {
            field,
            reason: format!("{:?} contains a delimiter or line break", value),
        });
    }
    Ok(value.to_string())
}

/// Like `checked`, for a free-text field that ends the line
///
/// Trailing filler would be stripped as slot padding on read.
fn checked_last(field: &'static str, value: &str) -> Result<String> {
    if value.ends_with(FILLER) {
        return Err(StoreError::InvalidField {
            field,
            reason: format!("{:?} ends with padding", value),
        });
    }
    checked(field, value)
}

fn format_date(value: &NaiveDateTime) -> String {
    value.format(DATE_FORMAT).to_string()
}
