//! Facility scoping.
//!
//! Every data view must respect the currently selected facility, but the
//! backend's endpoints are inconsistent about it: some accept a facility
//! parameter, others must return the full unscoped dataset and are filtered
//! client-side. This module holds both halves of that policy: the request
//! shaping decision used by the transport, and the record-level in-scope
//! predicates used by the merge engine.
//!
//! A selection of `None` means "no scoping filter": everything the role
//! allows is visible.

use census_types::{FacilityRef, Patient, PatientEvent};

/// Query parameter carrying the facility selection on scoped requests.
pub const FACILITY_PARAM: &str = "facId";

/// Endpoints that never receive the facility parameter.
///
/// The patient, coverage and ADT endpoints do not support it and the login
/// and facility-list endpoints must return the full unscoped dataset.
/// Matching is by substring, so `/adt?patientId=5` is covered.
pub const UNSCOPED_ENDPOINTS: &[&str] = &["/patients", "/coverage", "/adt", "/login", "/facilities"];

/// Whether the facility parameter should be injected into a request.
///
/// Only GET requests are shaped, and only when the path is not excluded.
/// The transport additionally skips injection when the caller already passed
/// an explicit facility parameter, which keeps the operation idempotent.
pub fn should_inject_facility(method: &str, path: &str) -> bool {
    if !method.eq_ignore_ascii_case("GET") {
        return false;
    }
    !UNSCOPED_ENDPOINTS.iter().any(|e| path.contains(e))
}

/// Whether a patient belongs to the current facility selection.
pub fn patient_in_scope(patient: &Patient, selection: Option<i64>) -> bool {
    match selection {
        None => true,
        Some(facility_id) => patient.facility_id == Some(facility_id),
    }
}

/// Whether an event belongs to the current facility selection.
///
/// An event follows its owning patient when one is known. Events without a
/// patient match fall back to their own facility field, coerced to an
/// integer; events that carry neither are out of scope under an active
/// selection.
pub fn event_in_scope(
    event: &PatientEvent,
    patient: Option<&Patient>,
    selection: Option<i64>,
) -> bool {
    let Some(facility_id) = selection else {
        return true;
    };

    match patient {
        Some(p) => p.facility_id == Some(facility_id),
        None => event
            .facility
            .as_ref()
            .and_then(FacilityRef::as_id)
            .is_some_and(|id| id == facility_id),
    }
}
