//! The census row merge engine.
//!
//! Joins patients, their most recent event and the active filters into the
//! rows the census view renders. The view is event-driven: a patient with no
//! events is invisible here by design, while an event whose patient is
//! unknown still surfaces on a synthesised placeholder row.

use std::collections::HashMap;

use census_types::{DateRangeFilter, Patient, PatientEvent, PatientStatus, StatusFilter};
use chrono::{DateTime, Utc};

use crate::normalize::parse_event_timestamp;
use crate::scope::event_in_scope;

/// Latest event per patient, in deterministic first-insertion order.
///
/// Built in a single pass over the event stream, retaining per patient the
/// event with the greatest parsed timestamp. When fed normaliser output
/// (already most-recent-first) the insertion order is the recency order of
/// each patient's newest event, and iteration preserves it, which is why this
/// is an explicit order vector beside the map rather than a bare `HashMap`.
///
/// Events with a missing or zero patient identifier cannot be attributed to
/// anyone and are excluded entirely.
#[derive(Clone, Debug, Default)]
pub struct LatestEvents {
    order: Vec<i64>,
    by_patient: HashMap<i64, PatientEvent>,
}

impl LatestEvents {
    pub fn from_events(events: &[PatientEvent]) -> Self {
        let mut latest = LatestEvents::default();

        for event in events {
            if event.patient_id == 0 {
                continue;
            }

            match latest.by_patient.get(&event.patient_id) {
                None => {
                    latest.order.push(event.patient_id);
                    latest.by_patient.insert(event.patient_id, event.clone());
                }
                Some(existing) => {
                    let existing_ts =
                        parse_event_timestamp(&existing.timestamp).unwrap_or(i64::MIN);
                    let candidate_ts =
                        parse_event_timestamp(&event.timestamp).unwrap_or(i64::MIN);
                    if candidate_ts > existing_ts {
                        latest.by_patient.insert(event.patient_id, event.clone());
                    }
                }
            }
        }

        latest
    }

    pub fn get(&self, patient_id: i64) -> Option<&PatientEvent> {
        self.by_patient.get(&patient_id)
    }

    /// Iterate `(patient_id, latest event)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &PatientEvent)> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.by_patient.get(id).map(|e| (*id, e)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Active census view filters, applied in a fixed order: facility scope,
/// status, event type, free-text search, date range.
#[derive(Clone, Debug, Default)]
pub struct CensusFilters {
    pub status: StatusFilter,
    /// `None` shows every event type; `Some` requires an exact match.
    pub event_type: Option<String>,
    /// Case-insensitive substring of `"Last, First"` or the patient id.
    pub search: String,
    pub date_range: DateRangeFilter,
}

/// One census row: a patient paired with their most recent event.
///
/// `placeholder` marks rows whose patient was synthesised from the event's
/// denormalised name because the census feed had no matching record.
#[derive(Clone, Debug, PartialEq)]
pub struct CensusRow {
    pub patient: Patient,
    pub event: PatientEvent,
    pub placeholder: bool,
}

/// Synthesise a stand-in patient for an event with no census match.
///
/// The denormalised event name is split on the `"Last, First"` convention;
/// a name without a comma lands wholly in the last-name slot. Status
/// defaults to Current so the row reads as an active resident.
fn placeholder_patient(patient_id: i64, patient_name: &str) -> Patient {
    let (last_name, first_name) = match patient_name.split_once(',') {
        Some((last, first)) => (last.trim().to_string(), first.trim().to_string()),
        None => (patient_name.trim().to_string(), String::new()),
    };

    Patient {
        patient_id,
        first_name,
        last_name,
        patient_status: PatientStatus::Current,
        ..Default::default()
    }
}

fn status_matches(status: &PatientStatus, filter: StatusFilter) -> bool {
    match filter {
        StatusFilter::All => true,
        StatusFilter::Active => *status == PatientStatus::Current,
        StatusFilter::Discharged => *status == PatientStatus::Discharged,
    }
}

fn search_matches(patient: &Patient, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }

    patient.display_name().to_lowercase().contains(&needle)
        || patient.patient_id.to_string().contains(&needle)
}

fn date_range_matches(event: &PatientEvent, range: DateRangeFilter, now: DateTime<Utc>) -> bool {
    let max_hours = match range {
        DateRangeFilter::All => return true,
        DateRangeFilter::Last24Hours => 24.0,
        DateRangeFilter::Last7Days => 24.0 * 7.0,
        DateRangeFilter::Last30Days => 24.0 * 30.0,
    };

    // Under a bounded range an unparseable timestamp is excluded.
    let Some(event_ms) = parse_event_timestamp(&event.timestamp) else {
        return false;
    };
    let hours_ago = (now.timestamp_millis() - event_ms) as f64 / 3_600_000.0;
    hours_ago <= max_hours
}

/// Build the census rows: one row per patient with a qualifying latest
/// event, in the latest-first order of `latest`.
///
/// `now` is injected rather than read from the clock so the date-range
/// filter is deterministic under test.
pub fn build_census_rows(
    latest: &LatestEvents,
    patients: &[Patient],
    filters: &CensusFilters,
    selection: Option<i64>,
    now: DateTime<Utc>,
) -> Vec<CensusRow> {
    let by_id: HashMap<i64, &Patient> = patients
        .iter()
        .map(|p| (p.patient_id, p))
        .collect();

    let mut rows = Vec::new();

    for (patient_id, event) in latest.iter() {
        let known = by_id.get(&patient_id).copied();

        if !event_in_scope(event, known, selection) {
            continue;
        }

        // Status is only meaningful for real census records; a placeholder's
        // status is synthetic and passes through.
        if let Some(patient) = known {
            if !status_matches(&patient.patient_status, filters.status) {
                continue;
            }
        }

        if let Some(wanted) = &filters.event_type {
            if &event.event_type != wanted {
                continue;
            }
        }

        let patient = match known {
            Some(p) => p.clone(),
            None => placeholder_patient(patient_id, &event.patient_name),
        };

        if !search_matches(&patient, &filters.search) {
            continue;
        }

        if !date_range_matches(event, filters.date_range, now) {
            continue;
        }

        rows.push(CensusRow {
            patient,
            event: event.clone(),
            placeholder: known.is_none(),
        });
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(patient_id: i64, event_type: &str, timestamp: &str) -> PatientEvent {
        PatientEvent {
            event_id: format!("{patient_id}-{event_type}-{timestamp}"),
            event_type: event_type.to_string(),
            patient_id,
            patient_name: String::new(),
            timestamp: timestamp.to_string(),
            ..Default::default()
        }
    }

    fn patient(patient_id: i64, facility_id: Option<i64>, status: PatientStatus) -> Patient {
        Patient {
            patient_id,
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            patient_status: status,
            facility_id,
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn latest_event_keeps_greatest_timestamp() {
        let events = vec![
            event(5, "Admission", "2024-01-01T00:00:00Z"),
            event(5, "RoomChange", "2024-02-01T00:00:00Z"),
        ];

        let latest = LatestEvents::from_events(&events);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest.get(5).unwrap().event_type, "RoomChange");
    }

    #[test]
    fn latest_event_works_on_unordered_input() {
        let events = vec![
            event(5, "RoomChange", "2024-02-01T00:00:00Z"),
            event(5, "Admission", "2024-01-01T00:00:00Z"),
        ];

        let latest = LatestEvents::from_events(&events);
        assert_eq!(latest.get(5).unwrap().event_type, "RoomChange");
    }

    #[test]
    fn zero_patient_id_events_are_excluded() {
        let events = vec![event(0, "Death", "2024-02-01T00:00:00Z")];
        assert!(LatestEvents::from_events(&events).is_empty());
    }

    #[test]
    fn iteration_preserves_insertion_order() {
        let events = vec![
            event(3, "Death", "2024-03-01T00:00:00Z"),
            event(1, "Admission", "2024-02-01T00:00:00Z"),
            event(2, "Discharge", "2024-01-01T00:00:00Z"),
        ];

        let latest = LatestEvents::from_events(&events);
        let order: Vec<i64> = latest.iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[test]
    fn patients_without_events_never_appear() {
        let patients = vec![
            patient(1, None, PatientStatus::Current),
            patient(2, None, PatientStatus::Current),
        ];
        let latest = LatestEvents::from_events(&[event(1, "Admission", "2024-04-30T00:00:00Z")]);

        for status in [StatusFilter::All, StatusFilter::Active, StatusFilter::Discharged] {
            let filters = CensusFilters {
                status,
                ..Default::default()
            };
            let rows = build_census_rows(&latest, &patients, &filters, None, now());
            assert!(rows.iter().all(|r| r.patient.patient_id != 2));
        }
    }

    #[test]
    fn unknown_patient_gets_placeholder_row() {
        let mut orphan = event(9, "Death", "2024-04-30T00:00:00Z");
        orphan.patient_name = "Smith, Jane".to_string();

        let latest = LatestEvents::from_events(&[orphan]);
        let rows = build_census_rows(&latest, &[], &CensusFilters::default(), None, now());

        assert_eq!(rows.len(), 1);
        assert!(rows[0].placeholder);
        assert_eq!(rows[0].patient.last_name, "Smith");
        assert_eq!(rows[0].patient.first_name, "Jane");
        assert_eq!(rows[0].patient.patient_status, PatientStatus::Current);
    }

    #[test]
    fn placeholder_name_without_comma_lands_in_last_name() {
        let mut orphan = event(9, "Death", "2024-04-30T00:00:00Z");
        orphan.patient_name = "Cher".to_string();

        let latest = LatestEvents::from_events(&[orphan]);
        let rows = build_census_rows(&latest, &[], &CensusFilters::default(), None, now());
        assert_eq!(rows[0].patient.last_name, "Cher");
        assert_eq!(rows[0].patient.first_name, "");
    }

    #[test]
    fn status_filter_only_binds_real_patients() {
        let patients = vec![patient(1, None, PatientStatus::Discharged)];
        let mut orphan = event(9, "Death", "2024-04-30T00:00:00Z");
        orphan.patient_name = "Smith, Jane".to_string();
        let latest = LatestEvents::from_events(&[
            event(1, "Discharge", "2024-04-30T01:00:00Z"),
            orphan,
        ]);

        let filters = CensusFilters {
            status: StatusFilter::Active,
            ..Default::default()
        };
        let rows = build_census_rows(&latest, &patients, &filters, None, now());

        // The discharged real patient is filtered out; the placeholder's
        // synthetic status does not bind it.
        assert_eq!(rows.len(), 1);
        assert!(rows[0].placeholder);
    }

    #[test]
    fn event_type_filter_requires_exact_match() {
        let patients = vec![patient(1, None, PatientStatus::Current)];
        let latest = LatestEvents::from_events(&[event(1, "RoomChange", "2024-04-30T00:00:00Z")]);

        let matching = CensusFilters {
            event_type: Some("RoomChange".to_string()),
            ..Default::default()
        };
        assert_eq!(build_census_rows(&latest, &patients, &matching, None, now()).len(), 1);

        let other = CensusFilters {
            event_type: Some("Death".to_string()),
            ..Default::default()
        };
        assert!(build_census_rows(&latest, &patients, &other, None, now()).is_empty());
    }

    #[test]
    fn search_matches_name_or_patient_id() {
        let patients = vec![patient(104, None, PatientStatus::Current)];
        let latest = LatestEvents::from_events(&[event(104, "Admission", "2024-04-30T00:00:00Z")]);

        for needle in ["doe", "Doe, J", "104"] {
            let filters = CensusFilters {
                search: needle.to_string(),
                ..Default::default()
            };
            assert_eq!(
                build_census_rows(&latest, &patients, &filters, None, now()).len(),
                1,
                "search {needle:?} should match"
            );
        }

        let miss = CensusFilters {
            search: "smith".to_string(),
            ..Default::default()
        };
        assert!(build_census_rows(&latest, &patients, &miss, None, now()).is_empty());
    }

    #[test]
    fn date_range_bounds_by_event_age() {
        let patients = vec![patient(1, None, PatientStatus::Current)];
        // Two days before `now()`.
        let latest = LatestEvents::from_events(&[event(1, "Admission", "2024-04-29T12:00:00Z")]);

        let day = CensusFilters {
            date_range: DateRangeFilter::Last24Hours,
            ..Default::default()
        };
        assert!(build_census_rows(&latest, &patients, &day, None, now()).is_empty());

        let week = CensusFilters {
            date_range: DateRangeFilter::Last7Days,
            ..Default::default()
        };
        assert_eq!(build_census_rows(&latest, &patients, &week, None, now()).len(), 1);
    }

    #[test]
    fn unparseable_timestamp_is_excluded_by_bounded_ranges_only() {
        let patients = vec![patient(1, None, PatientStatus::Current)];
        let latest = LatestEvents::from_events(&[event(1, "Admission", "sometime")]);

        let bounded = CensusFilters {
            date_range: DateRangeFilter::Last30Days,
            ..Default::default()
        };
        assert!(build_census_rows(&latest, &patients, &bounded, None, now()).is_empty());

        let unbounded = CensusFilters::default();
        assert_eq!(build_census_rows(&latest, &patients, &unbounded, None, now()).len(), 1);
    }

    #[test]
    fn facility_selection_scopes_rows() {
        let patients = vec![
            patient(1, Some(10), PatientStatus::Current),
            patient(2, Some(22), PatientStatus::Current),
        ];
        let latest = LatestEvents::from_events(&[
            event(1, "Admission", "2024-04-30T02:00:00Z"),
            event(2, "Admission", "2024-04-30T01:00:00Z"),
        ]);

        let rows = build_census_rows(&latest, &patients, &CensusFilters::default(), Some(10), now());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].patient.patient_id, 1);
    }

    #[test]
    fn census_scenario_end_to_end() {
        let patients = vec![patient(1, Some(10), PatientStatus::Current)];

        let raw = serde_json::json!([{
            "EventType": "RoomChange",
            "PatientId": 1,
            "Timestamp": "2024-05-01T10:00:00Z",
            "Room": "204",
            "PreviousRoom": "101"
        }]);
        let events = crate::normalize::normalize_events(&raw);
        let latest = LatestEvents::from_events(&events);

        let filters = CensusFilters {
            status: StatusFilter::Active,
            ..Default::default()
        };
        let rows = build_census_rows(&latest, &patients, &filters, Some(10), now());

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.patient.patient_id, 1);
        assert_eq!(row.event.event_type, "RoomChange");
        assert_eq!(row.event.previous_room.as_deref(), Some("101"));
        assert_eq!(row.event.room.as_deref(), Some("204"));
        assert!(!row.placeholder);
    }

    #[test]
    fn rows_come_out_latest_first() {
        let patients = vec![
            patient(1, None, PatientStatus::Current),
            patient(2, None, PatientStatus::Current),
        ];
        let raw = serde_json::json!([
            {"PatientId": 1, "EventType": "Admission", "Timestamp": "2024-04-29T00:00:00Z"},
            {"PatientId": 2, "EventType": "Death", "Timestamp": "2024-04-30T00:00:00Z"}
        ]);
        let events = crate::normalize::normalize_events(&raw);
        let latest = LatestEvents::from_events(&events);

        let rows = build_census_rows(&latest, &patients, &CensusFilters::default(), None, now());
        let order: Vec<i64> = rows.iter().map(|r| r.patient.patient_id).collect();
        assert_eq!(order, vec![2, 1]);
    }
}
