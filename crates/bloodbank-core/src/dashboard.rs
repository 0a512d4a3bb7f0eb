//! One dashboard read-and-aggregate cycle.
//!
//! Every call to `load_snapshot` reads both collections fresh; nothing is
//! cached between page loads. A failed read is logged and treated as an
//! empty collection so the dashboard still renders.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::{build_map_points, compute_metrics, MapView, Metrics};
use crate::models::{DonorRecord, HospitalRecord};
use crate::store::{DataStore, Document, DONORS_COLLECTION, HOSPITALS_COLLECTION};

/// Everything one dashboard render needs.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub metrics: Metrics,
    pub hospitals: Vec<HospitalRecord>,
    pub donors: Vec<DonorRecord>,
    pub map: MapView,
    pub taken_at: DateTime<Utc>,
}

impl DashboardSnapshot {
    pub fn build(donors: Vec<DonorRecord>, hospitals: Vec<HospitalRecord>) -> Self {
        let metrics = compute_metrics(&donors, &hospitals);
        let map = MapView::from_points(build_map_points(&donors, &hospitals));
        Self {
            metrics,
            hospitals,
            donors,
            map,
            taken_at: Utc::now(),
        }
    }

    /// Rows for the hospital inventory table, or `None` when there are no
    /// hospitals and the table should be left out.
    pub fn hospital_table(&self) -> Option<&[HospitalRecord]> {
        if self.hospitals.is_empty() {
            None
        } else {
            Some(&self.hospitals)
        }
    }
}

async fn fetch_or_empty(store: &dyn DataStore, collection: &str) -> Vec<Document> {
    match store.fetch_all(collection).await {
        Ok(docs) => docs,
        Err(e) => {
            warn!(collection, error = %e, "Fetch failed, treating collection as empty");
            Vec::new()
        }
    }
}

pub async fn load_snapshot(store: &dyn DataStore) -> DashboardSnapshot {
    let (donor_docs, hospital_docs) = futures::join!(
        fetch_or_empty(store, DONORS_COLLECTION),
        fetch_or_empty(store, HOSPITALS_COLLECTION),
    );

    let donors: Vec<DonorRecord> = donor_docs.iter().map(DonorRecord::from_document).collect();
    let hospitals: Vec<HospitalRecord> = hospital_docs.iter().map(HospitalRecord::from_document).collect();

    let snapshot = DashboardSnapshot::build(donors, hospitals);
    info!(
        donors = snapshot.metrics.donor_count,
        hospitals = snapshot.metrics.hospital_count,
        points = snapshot.map.points().len(),
        "Dashboard snapshot loaded"
    );
    snapshot
}
