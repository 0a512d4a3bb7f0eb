//! Summary metrics and map points derived from donor and hospital records.

use serde::Serialize;

use crate::models::{BloodGroup, DonorRecord, HospitalRecord};

/// Notice shown in place of the map when no record has coordinates.
pub const NO_LOCATION_NOTICE: &str = "No location data available to display on the map.";

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub donor_count: usize,
    pub hospital_count: usize,
    pub total_a_positive_units: i64,
}

/// What a map point stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PointKind {
    Hospital,
    Donor,
}

impl PointKind {
    /// RGBA render color. Hospitals red, donors green.
    pub fn color(&self) -> [u8; 4] {
        match self {
            PointKind::Hospital => [255, 0, 0, 160],
            PointKind::Donor => [0, 255, 0, 160],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PointKind::Hospital => "Hospital",
            PointKind::Donor => "Donor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapPoint {
    pub lat: f64,
    pub lon: f64,
    pub kind: PointKind,
}

impl MapPoint {
    pub fn color(&self) -> [u8; 4] {
        self.kind.color()
    }
}

/// Either points to draw or the empty-map notice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MapView {
    Points(Vec<MapPoint>),
    NoLocationData,
}

impl MapView {
    pub fn from_points(points: Vec<MapPoint>) -> Self {
        if points.is_empty() {
            MapView::NoLocationData
        } else {
            MapView::Points(points)
        }
    }

    pub fn points(&self) -> &[MapPoint] {
        match self {
            MapView::Points(points) => points,
            MapView::NoLocationData => &[],
        }
    }
}

/// Total units of one group across all hospitals, saturating at the `i64` bounds.
pub fn total_units(hospitals: &[HospitalRecord], group: BloodGroup) -> i64 {
    hospitals
        .iter()
        .fold(0i64, |acc, h| acc.saturating_add(h.units(group)))
}

pub fn compute_metrics(donors: &[DonorRecord], hospitals: &[HospitalRecord]) -> Metrics {
    Metrics {
        donor_count: donors.len(),
        hospital_count: hospitals.len(),
        total_a_positive_units: total_units(hospitals, BloodGroup::APositive),
    }
}

/// Hospitals first, then donors. Records without both coordinates are skipped.
pub fn build_map_points(donors: &[DonorRecord], hospitals: &[HospitalRecord]) -> Vec<MapPoint> {
    let hospital_points = hospitals.iter().filter_map(|h| {
        h.coordinates().map(|(lat, lon)| MapPoint {
            lat,
            lon,
            kind: PointKind::Hospital,
        })
    });

    let donor_points = donors.iter().filter_map(|d| {
        d.coordinates().map(|(lat, lon)| MapPoint {
            lat,
            lon,
            kind: PointKind::Donor,
        })
    });

    hospital_points.chain(donor_points).collect()
}
