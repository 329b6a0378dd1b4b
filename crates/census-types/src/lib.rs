//! Shared domain types for the census monitoring client.
//!
//! These are the canonical shapes the rest of the workspace works with:
//! patients, the normalised patient events, insurance coverage, ADT history
//! records and facilities. The backend delivers most of them in camelCase
//! JSON; the serde attributes here pin the wire names so every other crate
//! can stay in ordinary Rust naming.
//!
//! Records are read-only to the client. Nothing in this crate performs I/O
//! or holds behaviour beyond small accessors.

use serde::{Deserialize, Serialize};

/// Census status of a patient as reported by the backend feed.
///
/// The backend occasionally introduces new status strings; those are carried
/// verbatim in [`PatientStatus::Other`] rather than failing deserialisation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PatientStatus {
    New,
    Current,
    Discharged,
    Other(String),
}

impl From<String> for PatientStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "New" => PatientStatus::New,
            "Current" => PatientStatus::Current,
            "Discharged" => PatientStatus::Discharged,
            _ => PatientStatus::Other(value),
        }
    }
}

impl From<PatientStatus> for String {
    fn from(value: PatientStatus) -> Self {
        match value {
            PatientStatus::New => "New".to_string(),
            PatientStatus::Current => "Current".to_string(),
            PatientStatus::Discharged => "Discharged".to_string(),
            PatientStatus::Other(s) => s,
        }
    }
}

impl Default for PatientStatus {
    fn default() -> Self {
        PatientStatus::New
    }
}

/// A patient record from the census feed.
///
/// `facility_id` is the scoping key; it is optional because some feeds omit
/// it, in which case the patient is visible under every facility selection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub patient_id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub birth_date: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub patient_status: PatientStatus,
    #[serde(rename = "facId", default)]
    pub facility_id: Option<i64>,
    #[serde(default)]
    pub admission_date: Option<String>,
    #[serde(default)]
    pub room_desc: Option<String>,
    #[serde(default)]
    pub bed_desc: Option<String>,
    #[serde(default)]
    pub floor_desc: Option<String>,
    #[serde(default)]
    pub unit_desc: Option<String>,
}

impl Patient {
    /// Display name in the `"Last, First"` form used throughout the UI and
    /// by the free-text search filter.
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }
}

/// A facility reference as it appears on raw event payloads.
///
/// Some event sources carry the numeric facility id, others a free-text
/// facility name. Scoping coerces the value to an integer via [`Self::as_id`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FacilityRef {
    Id(i64),
    Text(String),
}

impl FacilityRef {
    /// Coerce the reference to a facility id, if it is one.
    ///
    /// Numeric references return their value; text references are parsed as
    /// an integer and return `None` when they do not parse.
    pub fn as_id(&self) -> Option<i64> {
        match self {
            FacilityRef::Id(id) => Some(*id),
            FacilityRef::Text(text) => text.trim().parse().ok(),
        }
    }
}

/// A normalised patient event.
///
/// This is the canonical shape produced by the event normaliser; raw payloads
/// arrive with inconsistent key casing and are never handled directly outside
/// of normalisation. `patient_id == 0` marks an event that could not be
/// attributed to any patient. `timestamp` is kept verbatim because the source
/// sometimes delivers unparseable values; consumers parse it on demand and
/// degrade gracefully.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientEvent {
    pub event_id: String,
    pub event_type: String,
    pub patient_id: i64,
    pub patient_name: String,
    pub timestamp: String,

    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub previous_room: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub origin_type: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub destination_type: Option<String>,
    #[serde(default)]
    pub facility: Option<FacilityRef>,
    #[serde(default)]
    pub previous_facility: Option<FacilityRef>,

    #[serde(default)]
    pub previous_provider: Option<String>,
    #[serde(default)]
    pub current_provider: Option<String>,
}

/// Payer precedence within a patient's coverage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PayerRank {
    Primary,
    Secondary,
    Tertiary,
    Other(String),
}

impl From<String> for PayerRank {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Primary" => PayerRank::Primary,
            "Secondary" => PayerRank::Secondary,
            "Tertiary" => PayerRank::Tertiary,
            _ => PayerRank::Other(value),
        }
    }
}

impl From<PayerRank> for String {
    fn from(value: PayerRank) -> Self {
        match value {
            PayerRank::Primary => "Primary".to_string(),
            PayerRank::Secondary => "Secondary".to_string(),
            PayerRank::Tertiary => "Tertiary".to_string(),
            PayerRank::Other(s) => s,
        }
    }
}

/// One insurance payer on a patient's coverage record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payer {
    #[serde(default)]
    pub payer_id: Option<i64>,
    pub payer_name: String,
    #[serde(default)]
    pub payer_code: Option<String>,
    pub payer_rank: PayerRank,
    #[serde(default)]
    pub payer_type: Option<String>,
}

/// A patient's insurance coverage: the ordered list of payers.
///
/// Absence of coverage is a normal state (a patient with no insurance), so
/// consumers hold `Option<Coverage>` and must never treat `None` as an error.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    #[serde(default)]
    pub coverage_id: Option<i64>,
    pub patient_id: i64,
    #[serde(default)]
    pub payers: Vec<Payer>,
}

impl Coverage {
    /// First payer of the given rank, if any.
    ///
    /// Duplicate ranks can occur in the raw data; the first match is
    /// authoritative.
    pub fn payer_of_rank(&self, rank: &PayerRank) -> Option<&Payer> {
        self.payers.iter().find(|p| &p.payer_rank == rank)
    }
}

/// One ADT (admission/discharge/transfer) history record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdtRecord {
    pub adt_record_id: i64,
    pub patient_id: i64,
    #[serde(default)]
    pub entered_by: String,
    #[serde(default)]
    pub action_type: String,
    #[serde(default)]
    pub action_code: String,
    #[serde(default)]
    pub standard_action_type: String,
    #[serde(default)]
    pub payer_name: Option<String>,
    #[serde(default)]
    pub payer_type: Option<String>,
    #[serde(default)]
    pub payer_code: Option<String>,
    #[serde(default)]
    pub admission_type: Option<String>,
    #[serde(default)]
    pub admission_source: Option<String>,
    #[serde(default)]
    pub outpatient: bool,
    #[serde(default)]
    pub bed_desc: Option<String>,
    #[serde(default)]
    pub room_desc: Option<String>,
    #[serde(default)]
    pub floor_desc: Option<String>,
    #[serde(default)]
    pub unit_desc: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub origin_type: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub destination_type: Option<String>,
    #[serde(default)]
    pub discharge_status: Option<String>,
    #[serde(default)]
    pub stop_billing_date: Option<String>,
    #[serde(default)]
    pub is_cancelled_record: bool,
    #[serde(default)]
    pub modified_date_time: String,
    #[serde(default)]
    pub effective_date_time: String,
    #[serde(default)]
    pub entered_date: String,
}

/// An organisational facility (site).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    #[serde(rename = "facId")]
    pub fac_id: i64,
    #[serde(default)]
    pub facility_name: String,
    #[serde(default)]
    pub facility_code: Option<String>,
    #[serde(default)]
    pub org_id: Option<i64>,
    #[serde(default)]
    pub org_name: Option<String>,
    #[serde(default)]
    pub address_line1: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub bed_count: Option<i64>,
    #[serde(default)]
    pub health_type: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
    /// `None` is treated as active; only an explicit `false` hides a site.
    #[serde(default)]
    pub active: Option<bool>,
}

/// Errors that can occur when parsing filter values from user input.
#[derive(Debug, thiserror::Error)]
pub enum FilterParseError {
    /// The input did not name a known status filter
    #[error("unknown status filter '{0}' (expected all, active or discharged)")]
    Status(String),
    /// The input did not name a known date range
    #[error("unknown date range '{0}' (expected 24h, 7d, 30d or all)")]
    DateRange(String),
}

/// Patient-status filter applied to census rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Discharged,
}

impl StatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Active => "active",
            StatusFilter::Discharged => "discharged",
        }
    }
}

impl std::str::FromStr for StatusFilter {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "discharged" => Ok(StatusFilter::Discharged),
            _ => Err(FilterParseError::Status(s.to_string())),
        }
    }
}

/// Recency window applied to census rows, measured from "now" back to the
/// row's event timestamp.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DateRangeFilter {
    Last24Hours,
    Last7Days,
    Last30Days,
    #[default]
    All,
}

impl DateRangeFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateRangeFilter::Last24Hours => "24h",
            DateRangeFilter::Last7Days => "7d",
            DateRangeFilter::Last30Days => "30d",
            DateRangeFilter::All => "all",
        }
    }
}

impl std::str::FromStr for DateRangeFilter {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "24h" => Ok(DateRangeFilter::Last24Hours),
            "7d" => Ok(DateRangeFilter::Last7Days),
            "30d" => Ok(DateRangeFilter::Last30Days),
            "all" => Ok(DateRangeFilter::All),
            _ => Err(FilterParseError::DateRange(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patient_status_tolerates_unknown_strings() {
        let status = PatientStatus::from("OnLeave".to_string());
        assert_eq!(status, PatientStatus::Other("OnLeave".to_string()));
        assert_eq!(String::from(status), "OnLeave");
    }

    #[test]
    fn patient_deserialises_wire_names() {
        let json = r#"{
            "patientId": 42,
            "firstName": "John",
            "lastName": "Doe",
            "birthDate": "1950-02-11",
            "gender": "M",
            "patientStatus": "Current",
            "facId": 12,
            "roomDesc": "204",
            "bedDesc": "A"
        }"#;
        let patient: Patient = serde_json::from_str(json).expect("parse patient");
        assert_eq!(patient.patient_id, 42);
        assert_eq!(patient.facility_id, Some(12));
        assert_eq!(patient.patient_status, PatientStatus::Current);
        assert_eq!(patient.display_name(), "Doe, John");
    }

    #[test]
    fn facility_ref_coerces_numeric_text() {
        assert_eq!(FacilityRef::Id(10).as_id(), Some(10));
        assert_eq!(FacilityRef::Text(" 22 ".to_string()).as_id(), Some(22));
        assert_eq!(FacilityRef::Text("Maple Grove".to_string()).as_id(), None);
    }

    #[test]
    fn first_payer_wins_per_rank() {
        let coverage = Coverage {
            coverage_id: None,
            patient_id: 5,
            payers: vec![
                Payer {
                    payer_id: Some(1),
                    payer_name: "Medicare".to_string(),
                    payer_code: None,
                    payer_rank: PayerRank::Primary,
                    payer_type: None,
                },
                Payer {
                    payer_id: Some(2),
                    payer_name: "Duplicate Primary".to_string(),
                    payer_code: None,
                    payer_rank: PayerRank::Primary,
                    payer_type: None,
                },
            ],
        };

        let primary = coverage.payer_of_rank(&PayerRank::Primary).expect("primary");
        assert_eq!(primary.payer_name, "Medicare");
        assert!(coverage.payer_of_rank(&PayerRank::Secondary).is_none());
    }

    #[test]
    fn filters_parse_and_reject() {
        assert_eq!("active".parse::<StatusFilter>().unwrap(), StatusFilter::Active);
        assert!("bogus".parse::<StatusFilter>().is_err());
        assert_eq!(
            "7d".parse::<DateRangeFilter>().unwrap(),
            DateRangeFilter::Last7Days
        );
        assert!("yesterday".parse::<DateRangeFilter>().is_err());
    }
}
