//! ADT history endpoint.
//!
//! Cancelled records are dropped and the remainder sorted most recent first
//! before anything downstream sees them.

use census_core::normalize::{decode_records, unwrap_data_envelope};
use census_core::prepare_adt_records;
use census_types::AdtRecord;

use crate::error::ClientResult;
use crate::http::ApiClient;

/// Fetch a patient's ADT (admission/discharge/transfer) history.
pub async fn fetch_adt_records(
    api: &ApiClient,
    patient_id: i64,
) -> ClientResult<Vec<AdtRecord>> {
    let params = [("patientId", patient_id.to_string())];
    let value = api.get_json("/adt", &params).await?;
    Ok(prepare_adt_records(decode_records(
        unwrap_data_envelope(value),
        "ADT",
    )))
}
