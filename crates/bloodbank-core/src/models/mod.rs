//! Data models for blood donation network entities.
//!
//! This module contains the typed records decoded from store documents:
//!
//! - `BloodGroup`: The eight ABO/Rh groups accepted by the registration form
//! - `DonorRecord`: A registered donor with contact info and coordinates
//! - `HospitalRecord`: A hospital with coordinates and per-group stock
//!
//! Documents arrive as loose JSON objects. Decoding goes field by field and
//! every field is optional, so a record with a malformed or missing field is
//! still counted; only the affected field is dropped.

pub mod blood_group;
pub mod donor;
pub mod hospital;

pub use blood_group::{BloodGroup, UnknownBloodGroup};
pub use donor::DonorRecord;
pub use hospital::{HospitalRecord, Inventory};

use serde_json::Value;

use crate::store::Record;

/// Read a non-null string field.
pub(crate) fn string_field(record: &Record, key: &str) -> Option<String> {
    record.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Read a numeric field as `f64`, accepting integer or float encodings.
pub(crate) fn f64_field(record: &Record, key: &str) -> Option<f64> {
    record
        .get(key)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
}
