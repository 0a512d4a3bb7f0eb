//! Hospitals and their blood stock.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{f64_field, string_field, BloodGroup};
use crate::store::{Document, Record};

/// Units on hand per blood group.
pub type Inventory = BTreeMap<BloodGroup, i64>;

/// A hospital as stored in the `hospitals` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HospitalRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub inventory: Option<Inventory>,
}

impl HospitalRecord {
    /// Decode a hospital from a loose record, keeping whatever fields are usable.
    pub fn from_record(record: &Record) -> Self {
        Self {
            id: None,
            name: string_field(record, "name"),
            location: string_field(record, "location"),
            lat: f64_field(record, "lat"),
            lon: f64_field(record, "lon"),
            inventory: record.get("inventory").and_then(decode_inventory),
        }
    }

    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: Some(doc.id.clone()),
            ..Self::from_record(&doc.fields)
        }
    }

    /// Both coordinates, if the hospital has them.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lon)
    }

    /// Units of one group; zero when the inventory or the entry is absent.
    pub fn units(&self, group: BloodGroup) -> i64 {
        self.inventory
            .as_ref()
            .and_then(|inv| inv.get(&group))
            .copied()
            .unwrap_or(0)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("-")
    }
}

/// Only object-shaped inventories count as defined. Unknown group labels and
/// non-integral counts are dropped.
fn decode_inventory(value: &Value) -> Option<Inventory> {
    let map = value.as_object()?;
    let inventory = map
        .iter()
        .filter_map(|(key, count)| {
            let group = key.parse::<BloodGroup>().ok()?;
            let units = count.as_i64().or_else(|| {
                count
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && f.is_finite())
                    .map(|f| f as i64)
            })?;
            Some((group, units))
        })
        .collect();
    Some(inventory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_decode_hospital_with_inventory() {
        let hospital = HospitalRecord::from_record(&record(json!({
            "name": "Government General Hospital",
            "location": "Chennai",
            "lat": 13.08,
            "lon": 80.27,
            "inventory": {"A+": 12, "O-": 3, "AB+": 0},
        })));

        assert_eq!(hospital.display_name(), "Government General Hospital");
        assert_eq!(hospital.units(BloodGroup::APositive), 12);
        assert_eq!(hospital.units(BloodGroup::ONegative), 3);
        assert_eq!(hospital.units(BloodGroup::BPositive), 0);
        assert_eq!(hospital.inventory.as_ref().map(|i| i.len()), Some(3));
    }

    #[test]
    fn test_missing_inventory_is_none() {
        let hospital = HospitalRecord::from_record(&record(json!({"name": "X"})));
        assert_eq!(hospital.inventory, None);
        assert_eq!(hospital.units(BloodGroup::APositive), 0);
    }

    #[test]
    fn test_inventory_drops_unusable_entries() {
        let hospital = HospitalRecord::from_record(&record(json!({
            "inventory": {"A+": 4.0, "B+": 2.5, "plasma": 9, "O+": "many"},
        })));

        let inventory = hospital.inventory.unwrap();
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.get(&BloodGroup::APositive), Some(&4));
    }

    #[test]
    fn test_non_object_inventory_is_undefined() {
        let hospital = HospitalRecord::from_record(&record(json!({"inventory": [1, 2]})));
        assert_eq!(hospital.inventory, None);
    }
}
