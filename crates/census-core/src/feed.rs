//! Live-updates feed selection and event summaries.
//!
//! The live feed surfaces only the care events worth interrupting a user
//! for, for patients actually present in the loaded census, capped to a
//! small panel.

use std::collections::HashSet;

use census_types::PatientEvent;

/// Event types surfaced on the live-updates feed.
pub const IMPORTANT_EVENT_TYPES: &[&str] = &["RoomChange", "InsuranceUpdate", "Death"];

/// Maximum number of entries on the live-updates feed.
pub const LIVE_UPDATES_LIMIT: usize = 10;

/// Select the live-updates entries from a normalised (most-recent-first)
/// event stream.
///
/// Only important event types qualify, and only for patients in the known
/// census set.
pub fn select_live_updates<'a>(
    events: &'a [PatientEvent],
    known_patients: &HashSet<i64>,
) -> Vec<&'a PatientEvent> {
    events
        .iter()
        .filter(|e| IMPORTANT_EVENT_TYPES.contains(&e.event_type.as_str()))
        .filter(|e| known_patients.contains(&e.patient_id))
        .take(LIVE_UPDATES_LIMIT)
        .collect()
}

/// Human-readable label for an event type.
///
/// Known types have fixed labels; unknown camel-case types are split on
/// their case boundaries (`HOAStatus` stays intact, `PayerAudit` becomes
/// `Payer Audit`).
pub fn event_type_label(event_type: &str) -> String {
    match event_type {
        "RoomChange" => "Room Change".to_string(),
        "InsuranceUpdate" => "Insurance Update".to_string(),
        "HospitalTransfer" => "Hospital Transfer".to_string(),
        "HOAStatus" => "HOA Status".to_string(),
        other => split_camel_case(other),
    }
}

fn split_camel_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    let mut prev_lower = false;
    for c in value.chars() {
        if c.is_uppercase() && prev_lower {
            out.push(' ');
        }
        prev_lower = c.is_lowercase();
        out.push(c);
    }
    out
}

/// One-line summary of an event, as shown on the live feed.
///
/// Falls back to a generic form for event types without a dedicated shape.
pub fn event_summary(event: &PatientEvent) -> String {
    let name = if event.patient_name.is_empty() {
        format!("Patient #{}", event.patient_id)
    } else {
        event.patient_name.clone()
    };

    match event.event_type.as_str() {
        "RoomChange" => {
            let previous = event.previous_room.as_deref().unwrap_or("Unknown");
            let current = event.room.as_deref().unwrap_or("Unknown");
            format!("Room change: {name} - Room {previous} → {current}")
        }
        "InsuranceUpdate" => {
            let previous = event.previous_provider.as_deref().unwrap_or("Unknown");
            let current = event.current_provider.as_deref().unwrap_or("Unknown");
            format!("Insurance update: {name} - {previous} → {current}")
        }
        "Death" => {
            let previous = event.previous_room.as_deref().unwrap_or("Unknown");
            format!("Death: {name} - Previously in Room {previous}")
        }
        other => format!("Event: {name} - {other}"),
    }
}
