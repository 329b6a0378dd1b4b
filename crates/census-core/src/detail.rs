//! Patient detail enrichment.
//!
//! The detail view bundles one patient with their rank-resolved insurance
//! payers, prepared ADT history and recent events. Each source degrades
//! independently: no coverage, no history and no events are all valid
//! states.

use census_types::{AdtRecord, Coverage, Patient, PatientEvent, Payer, PayerRank};

/// A patient's insurance coverage resolved by rank for display.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActiveCoverage {
    pub primary: Option<Payer>,
    pub secondary: Option<Payer>,
    pub all_payers: Vec<Payer>,
}

/// The enriched patient record backing the detail view.
#[derive(Clone, Debug, PartialEq)]
pub struct PatientDetail {
    pub patient: Patient,
    pub active_coverage: ActiveCoverage,
    pub adt_history: Vec<AdtRecord>,
    pub recent_events: Vec<PatientEvent>,
}

/// Merge a patient with their coverage, ADT history and recent events.
///
/// Duplicate payer ranks resolve to the first match. Callers are expected
/// to have prepared the ADT history and events already (cancelled records
/// dropped, recency sort applied).
pub fn enrich_patient(
    patient: Patient,
    coverage: Option<Coverage>,
    adt_history: Vec<AdtRecord>,
    recent_events: Vec<PatientEvent>,
) -> PatientDetail {
    let active_coverage = match &coverage {
        Some(c) => ActiveCoverage {
            primary: c.payer_of_rank(&PayerRank::Primary).cloned(),
            secondary: c.payer_of_rank(&PayerRank::Secondary).cloned(),
            all_payers: c.payers.clone(),
        },
        None => ActiveCoverage::default(),
    };

    PatientDetail {
        patient,
        active_coverage,
        adt_history,
        recent_events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payer(name: &str, rank: PayerRank) -> Payer {
        Payer {
            payer_id: None,
            payer_name: name.to_string(),
            payer_code: None,
            payer_rank: rank,
            payer_type: None,
        }
    }

    #[test]
    fn resolves_payers_by_rank() {
        let coverage = Coverage {
            coverage_id: None,
            patient_id: 5,
            payers: vec![
                payer("Medicare", PayerRank::Primary),
                payer("Aetna", PayerRank::Secondary),
                payer("Shadow Primary", PayerRank::Primary),
            ],
        };

        let detail = enrich_patient(Patient::default(), Some(coverage), vec![], vec![]);
        assert_eq!(
            detail.active_coverage.primary.as_ref().map(|p| p.payer_name.as_str()),
            Some("Medicare")
        );
        assert_eq!(
            detail.active_coverage.secondary.as_ref().map(|p| p.payer_name.as_str()),
            Some("Aetna")
        );
        assert_eq!(detail.active_coverage.all_payers.len(), 3);
    }

    #[test]
    fn no_coverage_is_a_valid_state() {
        let detail = enrich_patient(Patient::default(), None, vec![], vec![]);
        assert!(detail.active_coverage.primary.is_none());
        assert!(detail.active_coverage.all_payers.is_empty());
    }
}
