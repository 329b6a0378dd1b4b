//! # Census Core
//!
//! Pure data logic for the census/ADT monitoring client.
//!
//! This crate contains the normalisation and merging layer, free of any
//! HTTP or async dependency:
//! - Event normalisation from raw, inconsistently-cased payloads
//! - Facility scoping decisions and in-scope predicates
//! - The latest-event-per-patient map and the census row merge engine
//! - Live-updates feed selection and event summaries
//! - ADT history and facility list preparation
//! - Patient detail enrichment
//!
//! **No transport concerns**: fetching, caching, batching and persistence
//! belong in `census-client`. Everything here is a pure function over the
//! types in `census-types`, which keeps the whole layer unit-testable in
//! isolation.

pub mod detail;
pub mod feed;
pub mod merge;
pub mod normalize;
pub mod scope;

pub use detail::{enrich_patient, ActiveCoverage, PatientDetail};
pub use feed::{
    event_summary, event_type_label, select_live_updates, IMPORTANT_EVENT_TYPES,
    LIVE_UPDATES_LIMIT,
};
pub use merge::{build_census_rows, CensusFilters, CensusRow, LatestEvents};
pub use normalize::{
    decode_records, normalize_events, parse_event_timestamp, prepare_adt_records,
    prepare_facilities, unwrap_data_envelope,
};
pub use scope::{event_in_scope, patient_in_scope, should_inject_facility, FACILITY_PARAM};
