//! Core library for the blood donation dashboard.
//!
//! This crate holds everything below the terminal UI:
//!
//! - `models`: Donor and hospital records, blood groups, decoded from loose documents
//! - `store`: The `DataStore` contract with Firestore and local JSON backends
//! - `aggregate`: Summary metrics and map points derived from the records
//! - `dashboard`: One read-and-aggregate cycle producing a `DashboardSnapshot`
//! - `geocode`: The geocoding seam and its placeholder implementation
//! - `registration`: Donor registration form validation and submission

pub mod aggregate;
pub mod dashboard;
pub mod geocode;
pub mod models;
pub mod registration;
pub mod store;

pub use aggregate::{build_map_points, compute_metrics, MapPoint, MapView, Metrics, PointKind};
pub use dashboard::{load_snapshot, DashboardSnapshot};
pub use geocode::{placeholder_geocode, Coordinates, Geocoder, PlaceholderGeocoder};
pub use models::{BloodGroup, DonorRecord, HospitalRecord};
pub use registration::{FormState, RegistrationForm, RegistrationHandler};
pub use store::{DataStore, StoreError};
