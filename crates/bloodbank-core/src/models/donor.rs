//! Registered blood donors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{f64_field, string_field, BloodGroup};
use crate::store::{Document, Record};

/// A donor as stored in the `donors` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DonorRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub blood_group: Option<BloodGroup>,
    pub contact: Option<String>,
    pub location: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl DonorRecord {
    /// Decode a donor from a loose record, keeping whatever fields are usable.
    pub fn from_record(record: &Record) -> Self {
        Self {
            id: None,
            name: string_field(record, "name"),
            blood_group: string_field(record, "blood_group").and_then(|s| s.parse().ok()),
            contact: string_field(record, "contact"),
            location: string_field(record, "location"),
            lat: f64_field(record, "lat"),
            lon: f64_field(record, "lon"),
            timestamp: record.get("timestamp").and_then(parse_timestamp),
        }
    }

    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: Some(doc.id.clone()),
            ..Self::from_record(&doc.fields)
        }
    }

    /// Both coordinates, if the donor has them.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lon)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("-")
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_decode_full_donor() {
        let donor = DonorRecord::from_record(&record(json!({
            "name": "Asha",
            "blood_group": "O-",
            "contact": "9876543210",
            "location": "Madurai",
            "lat": 9.93,
            "lon": 78.12,
            "timestamp": "2024-03-01T10:15:00Z",
        })));

        assert_eq!(donor.name.as_deref(), Some("Asha"));
        assert_eq!(donor.blood_group, Some(BloodGroup::ONegative));
        assert_eq!(donor.coordinates(), Some((9.93, 78.12)));
        assert_eq!(
            donor.timestamp.map(|t| t.to_rfc3339()),
            Some("2024-03-01T10:15:00+00:00".to_string())
        );
    }

    #[test]
    fn test_decode_integer_coordinates() {
        let donor = DonorRecord::from_record(&record(json!({"lat": 10, "lon": 78})));
        assert_eq!(donor.coordinates(), Some((10.0, 78.0)));
    }

    #[test]
    fn test_decode_tolerates_bad_fields() {
        let donor = DonorRecord::from_record(&record(json!({
            "name": "no-coords",
            "blood_group": "Z+",
            "lat": "ten",
            "timestamp": 12,
        })));

        assert_eq!(donor.display_name(), "no-coords");
        assert_eq!(donor.blood_group, None);
        assert_eq!(donor.lat, None);
        assert_eq!(donor.coordinates(), None);
        assert_eq!(donor.timestamp, None);
    }

    #[test]
    fn test_coordinates_require_both() {
        let donor = DonorRecord {
            lat: Some(10.0),
            ..Default::default()
        };
        assert_eq!(donor.coordinates(), None);
    }
}
