use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::core::error::AppError;

/// Scale of the NUMERIC(14, 3) quantity columns
const QUANTITY_SCALE: u32 = 3;
/// Exclusive upper bound of a NUMERIC(14, 3) value
const QUANTITY_LIMIT: i64 = 100_000_000_000;

/// Scale of the NUMERIC(12, 4) density column
const DENSITY_SCALE: u32 = 4;
/// Exclusive upper bound of a NUMERIC(12, 4) value
const DENSITY_LIMIT: i64 = 100_000_000;

lazy_static! {
    /// Month label used by production figures and report descriptors: `YYYY-MM`
    /// - Valid: "2023-01", "2024-12"
    /// - Invalid: "2023-1", "2023-13", "23-01", "January"
    pub static ref MONTH_REGEX: Regex = Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").unwrap();

    /// Resource names: letters (any script), digits, spaces and hyphens
    /// - Valid: "titanium", "Iron ore", "helium-3", "Титан"
    /// - Invalid: "", " titanium", "tit@nium", "a/b"
    pub static ref RESOURCE_NAME_REGEX: Regex =
        Regex::new(r"^[\p{L}\p{N}]+(?:[ \-][\p{L}\p{N}]+)*$").unwrap();
}

/// Canonical lookup form of a resource name
pub fn normalize_resource_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Convert a JSON quantity into the stored decimal form.
///
/// Quantities must be finite, non-negative and fit the quantity columns.
pub fn quantity_from_f64(value: f64, field: &str) -> Result<Decimal, AppError> {
    bounded_decimal(value, field, QUANTITY_SCALE, QUANTITY_LIMIT)
}

pub fn density_from_f64(value: f64) -> Result<Decimal, AppError> {
    bounded_decimal(value, "density", DENSITY_SCALE, DENSITY_LIMIT)
}

fn bounded_decimal(value: f64, field: &str, scale: u32, limit: i64) -> Result<Decimal, AppError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::Validation(format!(
            "{} must be a non-negative number",
            field
        )));
    }

    Decimal::from_f64(value)
        .map(|d| d.round_dp(scale))
        .filter(|d| *d < Decimal::from(limit))
        .ok_or_else(|| {
            AppError::Validation(format!("{} must be less than {}", field, limit))
        })
}

pub fn quantity_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}
