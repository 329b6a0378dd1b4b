//! Insurance coverage: per-patient fetch and the batched cache.
//!
//! The census table needs coverage for every visible row, which naively
//! means one request per row. The batcher bounds that fan-out: identifiers
//! are deduplicated, partitioned into fixed-size batches processed
//! sequentially (requests within a batch run concurrently and are joined),
//! and results land in a cache keyed by patient id. One patient's failure
//! records "no coverage" for that patient and never aborts the batch.
//!
//! In-flight requests are never duplicated, and results arriving for
//! identifiers that are no longer requested (the visible set changed while
//! a batch was out) are discarded rather than applied.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::join_all;

use census_core::normalize::{decode_records, unwrap_data_envelope};
use census_types::Coverage;

use crate::error::ClientResult;
use crate::http::ApiClient;

/// Requests issued concurrently per batch.
pub const COVERAGE_BATCH_SIZE: usize = 10;

/// Where coverage records come from.
///
/// The batcher is generic over this so it can be exercised without HTTP.
#[async_trait]
pub trait CoverageSource: Send + Sync {
    async fn patient_coverage(&self, patient_id: i64) -> ClientResult<Option<Coverage>>;
}

/// Fetch one patient's coverage.
///
/// The response is a `{data: [...]}` envelope whose first element is
/// authoritative; an empty list means the patient has no insurance.
pub async fn fetch_patient_coverage(
    api: &ApiClient,
    patient_id: i64,
) -> ClientResult<Option<Coverage>> {
    let params = [("patientId", patient_id.to_string())];
    let value = api.get_json("/coverage", &params).await?;

    let mut records: Vec<Coverage> = decode_records(unwrap_data_envelope(value), "coverage");
    if records.is_empty() {
        return Ok(None);
    }
    Ok(Some(records.remove(0)))
}

/// [`CoverageSource`] backed by the census API.
pub struct ApiCoverageSource {
    api: Arc<ApiClient>,
}

impl ApiCoverageSource {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl CoverageSource for ApiCoverageSource {
    async fn patient_coverage(&self, patient_id: i64) -> ClientResult<Option<Coverage>> {
        fetch_patient_coverage(&self.api, patient_id).await
    }
}

enum CacheSlot {
    /// A fetch issued by the given generation is outstanding.
    InFlight(u64),
    Resolved(Option<Coverage>),
}

#[derive(Default)]
struct CacheState {
    slots: HashMap<i64, CacheSlot>,
    /// The identifiers of the most recent `fetch_many` call; arrivals for
    /// anything else are stale and dropped.
    requested: HashSet<i64>,
    generation: u64,
}

/// Batched, cached coverage lookups.
pub struct CoverageBatcher<S> {
    source: S,
    state: Mutex<CacheState>,
    batch_size: usize,
}

impl<S: CoverageSource> CoverageBatcher<S> {
    pub fn new(source: S) -> Self {
        Self::with_batch_size(source, COVERAGE_BATCH_SIZE)
    }

    pub fn with_batch_size(source: S, batch_size: usize) -> Self {
        Self {
            source,
            state: Mutex::new(CacheState::default()),
            batch_size: batch_size.max(1),
        }
    }

    /// Fetch coverage for a set of patients, batched and deduplicated.
    ///
    /// Returns the mapping for every requested identifier; identifiers whose
    /// fetch is still outstanding elsewhere (or was superseded) map to
    /// `None`. Already-resolved identifiers are served from the cache.
    pub async fn fetch_many(&self, patient_ids: &[i64]) -> HashMap<i64, Option<Coverage>> {
        let wanted = dedupe(patient_ids);

        let (generation, to_fetch) = {
            let mut state = self.state.lock().expect("coverage cache lock poisoned");
            state.generation += 1;
            let generation = state.generation;
            state.requested = wanted.iter().copied().collect();

            let to_fetch: Vec<i64> = wanted
                .iter()
                .copied()
                .filter(|id| !state.slots.contains_key(id))
                .collect();
            for id in &to_fetch {
                state.slots.insert(*id, CacheSlot::InFlight(generation));
            }
            (generation, to_fetch)
        };

        // Sequential batches bound the number of outstanding requests; the
        // requests within a batch run concurrently and are joined before the
        // next batch goes out.
        for batch in to_fetch.chunks(self.batch_size) {
            let fetches = batch.iter().map(|&patient_id| async move {
                let result = self.source.patient_coverage(patient_id).await;
                (patient_id, result)
            });
            let settled = join_all(fetches).await;

            let mut state = self.state.lock().expect("coverage cache lock poisoned");
            for (patient_id, result) in settled {
                let coverage = match result {
                    Ok(coverage) => coverage,
                    Err(err) => {
                        tracing::warn!("coverage fetch failed for patient {patient_id}: {err}");
                        None
                    }
                };

                if state.requested.contains(&patient_id) {
                    state.slots.insert(patient_id, CacheSlot::Resolved(coverage));
                } else {
                    // Superseded while in flight: drop the stale arrival and
                    // release the slot for a future request.
                    if matches!(state.slots.get(&patient_id), Some(CacheSlot::InFlight(g)) if *g == generation)
                    {
                        state.slots.remove(&patient_id);
                    }
                }
            }
        }

        let state = self.state.lock().expect("coverage cache lock poisoned");
        wanted
            .iter()
            .map(|id| {
                let coverage = match state.slots.get(id) {
                    Some(CacheSlot::Resolved(coverage)) => coverage.clone(),
                    _ => None,
                };
                (*id, coverage)
            })
            .collect()
    }

    /// Resolved coverage for one patient, if known.
    ///
    /// The outer `None` means "not resolved (yet)"; the inner `None` means
    /// "resolved: no insurance".
    pub fn get(&self, patient_id: i64) -> Option<Option<Coverage>> {
        let state = self.state.lock().expect("coverage cache lock poisoned");
        match state.slots.get(&patient_id) {
            Some(CacheSlot::Resolved(coverage)) => Some(coverage.clone()),
            _ => None,
        }
    }

    /// Drop cached results for the given identifiers so the next request
    /// re-fetches them.
    pub fn invalidate(&self, patient_ids: &[i64]) {
        let mut state = self.state.lock().expect("coverage cache lock poisoned");
        for id in patient_ids {
            if matches!(state.slots.get(id), Some(CacheSlot::Resolved(_))) {
                state.slots.remove(id);
            }
        }
    }

    /// Drop every cached result.
    pub fn clear(&self) {
        let mut state = self.state.lock().expect("coverage cache lock poisoned");
        state
            .slots
            .retain(|_, slot| matches!(slot, CacheSlot::InFlight(_)));
    }
}

fn dedupe(patient_ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::new();
    patient_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}
