//! Events endpoint.
//!
//! The raw payload is shape-inconsistent (mixed key casing, aliased
//! fields), so the response goes straight through the normaliser and comes
//! back canonical and most-recent-first.

use census_core::normalize_events;
use census_types::PatientEvent;

use crate::error::ClientResult;
use crate::http::ApiClient;

/// Optional filters for the event stream.
#[derive(Clone, Debug, Default)]
pub struct EventQuery {
    pub patient_id: Option<i64>,
    pub event_type: Option<String>,
    pub limit: Option<u32>,
}

impl EventQuery {
    fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(id) = self.patient_id {
            params.push(("patientId", id.to_string()));
        }
        if let Some(event_type) = &self.event_type {
            params.push(("eventType", event_type.clone()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}

/// Fetch and normalise the event stream.
///
/// A payload that is not an array normalises to an empty list; only
/// transport failures surface as errors, for the caller to degrade.
pub async fn fetch_events(api: &ApiClient, query: &EventQuery) -> ClientResult<Vec<PatientEvent>> {
    let value = api.get_json("/events", &query.to_params()).await?;
    Ok(normalize_events(&value))
}
