//! Raw payload normalisation.
//!
//! The events backend delivers the same conceptual field under several key
//! casings (`eventType` vs `EventType`) and aliases (`eventId`, `EventId`,
//! `MessageId`). Rather than chained ad-hoc fallbacks, each canonical field
//! resolves through a fixed, table-driven alias list, first present key
//! wins. The tables are public so the priority order is testable.
//!
//! Normalisation never fails: non-array input yields an empty list, and a
//! malformed element becomes a best-effort partial record instead of being
//! dropped.

use census_types::{AdtRecord, Facility, FacilityRef, PatientEvent};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

/// Source-key aliases for the event identifier, in priority order.
///
/// When none is present the identifier falls back to a stringified generic
/// `id` field, then to the empty string.
pub const EVENT_ID_KEYS: &[&str] = &["eventId", "EventId", "MessageId"];
pub const EVENT_TYPE_KEYS: &[&str] = &["eventType", "EventType"];
pub const PATIENT_ID_KEYS: &[&str] = &["patientId", "PatientId"];
pub const PATIENT_NAME_KEYS: &[&str] = &["patientName", "PatientName"];
pub const TIMESTAMP_KEYS: &[&str] = &["timestamp", "Timestamp", "CreatedAt"];
pub const ROOM_KEYS: &[&str] = &["room", "Room"];
pub const PREVIOUS_ROOM_KEYS: &[&str] = &["previousRoom", "PreviousRoom"];
pub const ORIGIN_KEYS: &[&str] = &["origin", "Origin"];
pub const ORIGIN_TYPE_KEYS: &[&str] = &["originType", "OriginType"];
pub const DESTINATION_KEYS: &[&str] = &["destination", "Destination"];
pub const DESTINATION_TYPE_KEYS: &[&str] = &["destinationType", "DestinationType"];
pub const FACILITY_KEYS: &[&str] = &["facility", "Facility"];
pub const PREVIOUS_FACILITY_KEYS: &[&str] = &["previousFacility", "PreviousFacility"];
pub const PREVIOUS_PROVIDER_KEYS: &[&str] = &["previousProvider", "PreviousProvider"];
pub const CURRENT_PROVIDER_KEYS: &[&str] = &["currentProvider", "CurrentProvider"];

/// Resolve a string-valued field through its alias list.
///
/// A key that is present but `null` is skipped, matching the source feed's
/// habit of sending explicit nulls. Numbers are accepted and stringified.
fn resolve_text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    for key in keys {
        match obj.get(*key) {
            Some(Value::String(s)) => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => continue,
        }
    }
    None
}

/// Resolve an integer-valued field through its alias list.
///
/// Numeric strings are tolerated; anything else falls through to the next
/// alias.
fn resolve_id(obj: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    for key in keys {
        match obj.get(*key) {
            Some(Value::Number(n)) => {
                if let Some(id) = n.as_i64() {
                    return Some(id);
                }
            }
            Some(Value::String(s)) => {
                if let Ok(id) = s.trim().parse() {
                    return Some(id);
                }
            }
            _ => continue,
        }
    }
    None
}

/// Resolve a facility reference, which arrives as a number or a string.
fn resolve_facility(obj: &Map<String, Value>, keys: &[&str]) -> Option<FacilityRef> {
    for key in keys {
        match obj.get(*key) {
            Some(Value::Number(n)) => {
                if let Some(id) = n.as_i64() {
                    return Some(FacilityRef::Id(id));
                }
            }
            Some(Value::String(s)) => return Some(FacilityRef::Text(s.clone())),
            _ => continue,
        }
    }
    None
}

/// Event identifier, falling back to a stringified generic `id` field.
///
/// The fallback is deterministic: the same raw object always synthesises the
/// same identifier.
fn resolve_event_id(obj: &Map<String, Value>) -> String {
    if let Some(id) = resolve_text(obj, EVENT_ID_KEYS) {
        return id;
    }
    match obj.get("id") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

/// Normalise one raw event object into the canonical shape.
///
/// Non-object input yields an empty default record rather than an error, so
/// a malformed element never poisons the surrounding batch.
pub fn normalize_event(raw: &Value) -> PatientEvent {
    let Some(obj) = raw.as_object() else {
        return PatientEvent::default();
    };

    PatientEvent {
        event_id: resolve_event_id(obj),
        event_type: resolve_text(obj, EVENT_TYPE_KEYS).unwrap_or_default(),
        patient_id: resolve_id(obj, PATIENT_ID_KEYS).unwrap_or(0),
        patient_name: resolve_text(obj, PATIENT_NAME_KEYS).unwrap_or_default(),
        timestamp: resolve_text(obj, TIMESTAMP_KEYS).unwrap_or_default(),
        room: resolve_text(obj, ROOM_KEYS),
        previous_room: resolve_text(obj, PREVIOUS_ROOM_KEYS),
        origin: resolve_text(obj, ORIGIN_KEYS),
        origin_type: resolve_text(obj, ORIGIN_TYPE_KEYS),
        destination: resolve_text(obj, DESTINATION_KEYS),
        destination_type: resolve_text(obj, DESTINATION_TYPE_KEYS),
        facility: resolve_facility(obj, FACILITY_KEYS),
        previous_facility: resolve_facility(obj, PREVIOUS_FACILITY_KEYS),
        previous_provider: resolve_text(obj, PREVIOUS_PROVIDER_KEYS),
        current_provider: resolve_text(obj, CURRENT_PROVIDER_KEYS),
    }
}

/// Normalise a raw events payload into canonical records, most recent first.
///
/// The payload is not guaranteed to be an array; anything else yields `[]`.
/// Records whose timestamp does not parse sort as earliest, i.e. at the end
/// of the descending output.
pub fn normalize_events(raw: &Value) -> Vec<PatientEvent> {
    let Some(items) = raw.as_array() else {
        return Vec::new();
    };

    let mut events: Vec<PatientEvent> = items.iter().map(normalize_event).collect();
    events.sort_by_key(|e| {
        std::cmp::Reverse(parse_event_timestamp(&e.timestamp).unwrap_or(i64::MIN))
    });
    events
}

/// Parse an ISO-ish event timestamp to epoch milliseconds.
///
/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM:SS[.fff]` (with a space also
/// tolerated as separator) and bare dates. Returns `None` for anything else;
/// callers decide how an unparseable timestamp degrades (sort-last here,
/// excluded by bounded date-range filters in the merge engine).
pub fn parse_event_timestamp(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis());
    }

    None
}

/// Decode a list of raw JSON values into typed records, skipping elements
/// that do not parse.
///
/// One malformed record must never hide the rest of the payload; failures
/// are logged and dropped.
pub fn decode_records<T: serde::de::DeserializeOwned>(items: Vec<Value>, what: &str) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!("failed to parse {what} record: {err}");
                None
            }
        })
        .collect()
}

/// Unwrap the common response envelopes: a bare array, or `{data: [...]}`.
///
/// Anything else is treated as "no data".
pub fn unwrap_data_envelope(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Prepare ADT history for display: drop cancelled records, sort descending
/// by effective date.
pub fn prepare_adt_records(mut records: Vec<AdtRecord>) -> Vec<AdtRecord> {
    records.retain(|r| !r.is_cancelled_record);
    records.sort_by_key(|r| {
        std::cmp::Reverse(parse_event_timestamp(&r.effective_date_time).unwrap_or(i64::MIN))
    });
    records
}

/// Prepare the facility list for display: active sites only, sorted by name.
pub fn prepare_facilities(mut facilities: Vec<Facility>) -> Vec<Facility> {
    facilities.retain(|f| f.active != Some(false));
    facilities.sort_by(|a, b| {
        a.facility_name
            .to_lowercase()
            .cmp(&b.facility_name.to_lowercase())
    });
    facilities
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lowercase_alias_wins_when_both_present() {
        let raw = json!([{
            "eventType": "RoomChange",
            "EventType": "Discharge",
            "PatientId": 5,
            "Timestamp": "2024-05-01T10:00:00Z"
        }]);

        let events = normalize_events(&raw);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "RoomChange");
        assert_eq!(events[0].patient_id, 5);
    }

    #[test]
    fn non_array_input_yields_empty() {
        assert!(normalize_events(&json!({})).is_empty());
        assert!(normalize_events(&Value::Null).is_empty());
        assert!(normalize_events(&json!("not events")).is_empty());
    }

    #[test]
    fn output_is_most_recent_first() {
        let raw = json!([
            {"EventId": "jan", "Timestamp": "2024-01-01T00:00:00Z"},
            {"EventId": "mar", "Timestamp": "2024-03-01T00:00:00Z"},
            {"EventId": "feb", "Timestamp": "2024-02-01T00:00:00Z"}
        ]);

        let events = normalize_events(&raw);
        let ids: Vec<&str> = events.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec!["mar", "feb", "jan"]);
    }

    #[test]
    fn unparseable_timestamps_sort_last() {
        let raw = json!([
            {"EventId": "bad", "Timestamp": "not a date"},
            {"EventId": "good", "Timestamp": "2024-03-01T00:00:00Z"}
        ]);

        let events = normalize_events(&raw);
        assert_eq!(events[0].event_id, "good");
        assert_eq!(events[1].event_id, "bad");
    }

    #[test]
    fn event_id_alias_priority_and_fallback() {
        let with_message_id = json!({"MessageId": "m-1"});
        assert_eq!(normalize_event(&with_message_id).event_id, "m-1");

        let with_generic_id = json!({"id": 7001});
        assert_eq!(normalize_event(&with_generic_id).event_id, "7001");

        let with_nothing = json!({"EventType": "Death"});
        assert_eq!(normalize_event(&with_nothing).event_id, "");
    }

    #[test]
    fn event_id_synthesis_is_deterministic() {
        let raw = json!({"id": 42, "EventType": "Transfer"});
        assert_eq!(normalize_event(&raw).event_id, normalize_event(&raw).event_id);
    }

    #[test]
    fn explicit_null_falls_through_to_next_alias() {
        let raw = json!({"eventType": null, "EventType": "Admission"});
        assert_eq!(normalize_event(&raw).event_type, "Admission");
    }

    #[test]
    fn facility_field_keeps_number_or_text() {
        let numeric = normalize_event(&json!({"Facility": 10}));
        assert_eq!(numeric.facility, Some(FacilityRef::Id(10)));

        let text = normalize_event(&json!({"facility": "22"}));
        assert_eq!(text.facility, Some(FacilityRef::Text("22".to_string())));
        assert_eq!(text.facility.unwrap().as_id(), Some(22));
    }

    #[test]
    fn malformed_element_becomes_partial_record() {
        let raw = json!(["just a string", {"EventId": "ok"}]);
        let events = normalize_events(&raw);
        assert_eq!(events.len(), 2);
        assert!(events.iter().any(|e| e.event_id == "ok"));
        assert!(events.iter().any(|e| e.event_id.is_empty()));
    }

    #[test]
    fn timestamp_parser_accepts_iso_variants() {
        assert!(parse_event_timestamp("2024-05-01T10:00:00Z").is_some());
        assert!(parse_event_timestamp("2024-05-01T10:00:00.123Z").is_some());
        assert!(parse_event_timestamp("2024-05-01T10:00:00").is_some());
        assert!(parse_event_timestamp("2024-05-01").is_some());
        assert!(parse_event_timestamp("").is_none());
        assert!(parse_event_timestamp("half past nine").is_none());
    }

    #[test]
    fn adt_history_drops_cancelled_and_sorts_descending() {
        let records = vec![
            AdtRecord {
                adt_record_id: 1,
                patient_id: 5,
                effective_date_time: "2024-01-05T00:00:00Z".to_string(),
                ..Default::default()
            },
            AdtRecord {
                adt_record_id: 2,
                patient_id: 5,
                is_cancelled_record: true,
                effective_date_time: "2024-01-09T00:00:00Z".to_string(),
                ..Default::default()
            },
            AdtRecord {
                adt_record_id: 3,
                patient_id: 5,
                effective_date_time: "2024-01-07T00:00:00Z".to_string(),
                ..Default::default()
            },
        ];

        let prepared = prepare_adt_records(records);
        let ids: Vec<i64> = prepared.iter().map(|r| r.adt_record_id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn facility_list_is_active_only_sorted_by_name() {
        let facilities = vec![
            Facility {
                fac_id: 44,
                facility_name: "Willow Creek".to_string(),
                ..Default::default()
            },
            Facility {
                fac_id: 22,
                facility_name: "Aspen House".to_string(),
                active: Some(false),
                ..Default::default()
            },
            Facility {
                fac_id: 12,
                facility_name: "maple grove".to_string(),
                active: Some(true),
                ..Default::default()
            },
        ];

        let prepared = prepare_facilities(facilities);
        let names: Vec<&str> = prepared.iter().map(|f| f.facility_name.as_str()).collect();
        assert_eq!(names, vec!["maple grove", "Willow Creek"]);
    }

    #[test]
    fn envelope_unwrapping_handles_bare_and_wrapped() {
        assert_eq!(unwrap_data_envelope(json!([1, 2])).len(), 2);
        assert_eq!(unwrap_data_envelope(json!({"data": [1]})).len(), 1);
        assert!(unwrap_data_envelope(json!({"data": "nope"})).is_empty());
        assert!(unwrap_data_envelope(json!(3)).is_empty());
    }
}
