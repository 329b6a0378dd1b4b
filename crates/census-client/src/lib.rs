//! # Census Client
//!
//! REST client for the census/ADT monitoring backend.
//!
//! Handles:
//! - Transport: bearer-token auth and facility-parameter injection
//! - Typed endpoint wrappers with envelope tolerance
//! - Batched, cached insurance-coverage lookups
//! - The persisted facility selection and role-based auto-selection
//! - The composed census feed consumed by presentation layers
//!
//! The pure normalisation and merging logic lives in `census-core`; this
//! crate wires it to the network and to session state.

#![warn(rust_2018_idioms)]

pub mod adt;
pub mod auth;
pub mod config;
pub mod coverage;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod facilities;
pub mod http;
pub mod patients;
pub mod preferences;

pub use adt::fetch_adt_records;
pub use auth::{login, logout, LoginResponse};
pub use config::ClientConfig;
pub use coverage::{
    fetch_patient_coverage, ApiCoverageSource, CoverageBatcher, CoverageSource,
    COVERAGE_BATCH_SIZE,
};
pub use dashboard::{CensusFeed, CensusSnapshot, SourceStatus};
pub use error::{ClientError, ClientResult};
pub use events::{fetch_events, EventQuery};
pub use facilities::fetch_facilities;
pub use http::ApiClient;
pub use patients::{fetch_patient, fetch_patient_details, fetch_patients, PatientQuery};
pub use preferences::{
    apply_accessible, infer_selection_at_login, select_facility, FacilityContext,
    FacilityPreferences, FACILITY_FETCH_TIMEOUT,
};
