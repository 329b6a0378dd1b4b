//! Patient census endpoint.
//!
//! The backend wraps the patient list in a `{data: [...]}` envelope, with a
//! paginated variant that adds `hasMore`/`totalCount`, and has also been
//! seen returning a bare array. All three shapes are accepted; malformed
//! individual records are skipped rather than failing the page.

use census_core::normalize::{decode_records, unwrap_data_envelope};
use census_core::{enrich_patient, PatientDetail};
use census_types::Patient;

use crate::adt::fetch_adt_records;
use crate::coverage::fetch_patient_coverage;
use crate::error::ClientResult;
use crate::events::{fetch_events, EventQuery};
use crate::http::ApiClient;

/// Number of recent events loaded for the detail view.
const DETAIL_EVENT_LIMIT: u32 = 10;

/// Optional filters for the patient list.
#[derive(Clone, Debug, Default)]
pub struct PatientQuery {
    pub patient_id: Option<i64>,
    pub patient_status: Option<String>,
}

impl PatientQuery {
    fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(id) = self.patient_id {
            params.push(("patientId", id.to_string()));
        }
        if let Some(status) = &self.patient_status {
            params.push(("patientStatus", status.clone()));
        }
        params
    }
}

/// Fetch the patient census.
pub async fn fetch_patients(api: &ApiClient, query: &PatientQuery) -> ClientResult<Vec<Patient>> {
    let value = api.get_json("/patients", &query.to_params()).await?;
    Ok(decode_records(unwrap_data_envelope(value), "patient"))
}

/// Fetch a single patient by id, if the backend knows it.
pub async fn fetch_patient(api: &ApiClient, patient_id: i64) -> ClientResult<Option<Patient>> {
    let query = PatientQuery {
        patient_id: Some(patient_id),
        patient_status: None,
    };
    let mut patients = fetch_patients(api, &query).await?;
    if patients.is_empty() {
        return Ok(None);
    }
    Ok(Some(patients.remove(0)))
}

/// Fetch the enriched detail record for one patient.
///
/// Coverage, ADT history and recent events are fetched concurrently and
/// degrade independently: one source failing never hides the others.
pub async fn fetch_patient_details(
    api: &ApiClient,
    patient_id: i64,
) -> ClientResult<Option<PatientDetail>> {
    let Some(patient) = fetch_patient(api, patient_id).await? else {
        tracing::warn!("patient {patient_id} not found");
        return Ok(None);
    };

    let event_query = EventQuery {
        patient_id: Some(patient_id),
        limit: Some(DETAIL_EVENT_LIMIT),
        ..Default::default()
    };
    let (coverage, adt_records, events) = tokio::join!(
        fetch_patient_coverage(api, patient_id),
        fetch_adt_records(api, patient_id),
        fetch_events(api, &event_query),
    );

    let coverage = coverage.unwrap_or_else(|err| {
        tracing::warn!("coverage fetch failed for patient {patient_id}: {err}");
        None
    });
    let adt_records = adt_records.unwrap_or_else(|err| {
        tracing::warn!("ADT fetch failed for patient {patient_id}: {err}");
        Vec::new()
    });
    let events = events.unwrap_or_else(|err| {
        tracing::warn!("events fetch failed for patient {patient_id}: {err}");
        Vec::new()
    });

    Ok(Some(enrich_patient(patient, coverage, adt_records, events)))
}
