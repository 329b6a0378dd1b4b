//! The census feed: the composed, display-ready view of the census.
//!
//! One refresh fetches patients and events concurrently, builds the filtered
//! rows through the merge engine, then batches coverage for exactly the
//! visible rows. Every source degrades independently; a failure shows up as
//! that source's status flag, never as an error crossing into the caller.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;

use census_core::{build_census_rows, select_live_updates, CensusFilters, CensusRow, LatestEvents};
use census_types::{Coverage, PatientEvent};

use crate::coverage::{ApiCoverageSource, CoverageBatcher, CoverageSource};
use crate::events::{fetch_events, EventQuery};
use crate::http::ApiClient;
use crate::patients::{fetch_patients, PatientQuery};
use crate::preferences::FacilityContext;

/// Lifecycle of one data source behind the feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceStatus {
    NotStarted,
    InFlight,
    Settled,
    Failed,
}

impl SourceStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, SourceStatus::InFlight)
    }

    pub fn failed(&self) -> bool {
        matches!(self, SourceStatus::Failed)
    }
}

/// One settled view of the census.
#[derive(Clone, Debug)]
pub struct CensusSnapshot {
    pub rows: Vec<CensusRow>,
    pub live_updates: Vec<PatientEvent>,
    coverage: HashMap<i64, Option<Coverage>>,
    pub patients_status: SourceStatus,
    pub events_status: SourceStatus,
    pub coverage_status: SourceStatus,
}

impl CensusSnapshot {
    /// The view before any refresh has run.
    pub fn initial() -> Self {
        Self {
            rows: Vec::new(),
            live_updates: Vec::new(),
            coverage: HashMap::new(),
            patients_status: SourceStatus::NotStarted,
            events_status: SourceStatus::NotStarted,
            coverage_status: SourceStatus::NotStarted,
        }
    }

    /// The view is loading while any constituent source is.
    pub fn is_loading(&self) -> bool {
        self.patients_status.is_loading()
            || self.events_status.is_loading()
            || self.coverage_status.is_loading()
    }

    /// Single aggregate failure flag for the banner; per-source detail stays
    /// on the status fields.
    pub fn has_error(&self) -> bool {
        self.patients_status.failed()
            || self.events_status.failed()
            || self.coverage_status.failed()
    }

    /// Coverage for a visible row, if resolved. `None` renders as
    /// "no insurance".
    pub fn coverage_for(&self, patient_id: i64) -> Option<&Coverage> {
        self.coverage.get(&patient_id).and_then(|c| c.as_ref())
    }
}

/// The composed census feed.
pub struct CensusFeed<S> {
    api: Arc<ApiClient>,
    scope: Arc<FacilityContext>,
    batcher: CoverageBatcher<S>,
    filters: CensusFilters,
}

impl CensusFeed<ApiCoverageSource> {
    pub fn new(api: Arc<ApiClient>, scope: Arc<FacilityContext>) -> Self {
        let batcher = CoverageBatcher::new(ApiCoverageSource::new(api.clone()));
        Self::with_batcher(api, scope, batcher)
    }
}

impl<S: CoverageSource> CensusFeed<S> {
    pub fn with_batcher(
        api: Arc<ApiClient>,
        scope: Arc<FacilityContext>,
        batcher: CoverageBatcher<S>,
    ) -> Self {
        Self {
            api,
            scope,
            batcher,
            filters: CensusFilters::default(),
        }
    }

    pub fn set_filters(&mut self, filters: CensusFilters) {
        self.filters = filters;
    }

    pub fn filters(&self) -> &CensusFilters {
        &self.filters
    }

    /// Coverage lookup backed by the batch cache, for consumers holding an
    /// older snapshot while a refresh is in flight.
    pub fn cached_coverage(&self, patient_id: i64) -> Option<Coverage> {
        self.batcher.get(patient_id).flatten()
    }

    /// Fetch everything and compose the view.
    ///
    /// There is no retry: a failed source stays empty until the next
    /// explicit refresh.
    pub async fn refresh(&self) -> CensusSnapshot {
        let patient_query = PatientQuery::default();
        let event_query = EventQuery::default();
        let (patients_result, events_result) = tokio::join!(
            fetch_patients(&self.api, &patient_query),
            fetch_events(&self.api, &event_query),
        );

        let (patients, patients_status) = match patients_result {
            Ok(patients) => (patients, SourceStatus::Settled),
            Err(err) => {
                tracing::warn!("census patient fetch failed: {err}");
                (Vec::new(), SourceStatus::Failed)
            }
        };
        let (events, events_status) = match events_result {
            Ok(events) => (events, SourceStatus::Settled),
            Err(err) => {
                tracing::warn!("census event fetch failed: {err}");
                (Vec::new(), SourceStatus::Failed)
            }
        };

        let selection = self.scope.selected();
        let latest = LatestEvents::from_events(&events);
        let rows = build_census_rows(&latest, &patients, &self.filters, selection, Utc::now());

        let visible: Vec<i64> = rows.iter().map(|r| r.patient.patient_id).collect();
        let coverage = if visible.is_empty() {
            HashMap::new()
        } else {
            self.batcher.fetch_many(&visible).await
        };

        let known: HashSet<i64> = patients.iter().map(|p| p.patient_id).collect();
        let live_updates = select_live_updates(&events, &known)
            .into_iter()
            .cloned()
            .collect();

        CensusSnapshot {
            rows,
            live_updates,
            coverage,
            patients_status,
            events_status,
            // The batcher converts every per-item failure to "no coverage",
            // so the source as a whole always settles.
            coverage_status: SourceStatus::Settled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_snapshot_is_not_loading_and_not_failed() {
        let snapshot = CensusSnapshot::initial();
        assert!(!snapshot.is_loading());
        assert!(!snapshot.has_error());
        assert!(snapshot.rows.is_empty());
    }

    #[test]
    fn any_failed_source_raises_the_aggregate_flag() {
        let mut snapshot = CensusSnapshot::initial();
        snapshot.patients_status = SourceStatus::Settled;
        snapshot.events_status = SourceStatus::Failed;
        assert!(snapshot.has_error());
    }

    #[test]
    fn any_inflight_source_means_loading() {
        let mut snapshot = CensusSnapshot::initial();
        snapshot.patients_status = SourceStatus::Settled;
        snapshot.coverage_status = SourceStatus::InFlight;
        assert!(snapshot.is_loading());
    }

    #[test]
    fn coverage_accessor_distinguishes_missing_from_uninsured() {
        let mut snapshot = CensusSnapshot::initial();
        snapshot.coverage.insert(5, None);
        assert!(snapshot.coverage_for(5).is_none());
        assert!(snapshot.coverage_for(6).is_none());
    }
}
