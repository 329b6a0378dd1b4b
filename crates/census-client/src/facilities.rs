//! Facilities endpoint.
//!
//! The facility endpoint is the least consistent of the lot: it has been
//! seen returning a bare array, a single facility object, and a
//! `{data: [...]}` envelope depending on role and deployment. All are
//! accepted; the prepared result is active sites only, sorted by name.

use census_core::normalize::{decode_records, unwrap_data_envelope};
use census_core::prepare_facilities;
use census_types::Facility;
use serde_json::Value;

use crate::error::ClientResult;
use crate::http::ApiClient;

/// Fetch the facilities the current role can access.
pub async fn fetch_facilities(api: &ApiClient) -> ClientResult<Vec<Facility>> {
    let value = api.get_json("/facilities", &[]).await?;

    let raw = match value {
        // A single facility object (facility-manager roles).
        Value::Object(ref map) if map.contains_key("facId") => vec![value],
        other => unwrap_data_envelope(other),
    };

    Ok(prepare_facilities(decode_records(raw, "facility")))
}
