//! Stage validators: pure predicates over one stage's raw input.
//!
//! A rejection is a value, not a failure — the state machine reports the
//! message and stays put, and the student resubmits. Which stages treat a
//! wrong answer as blocking is decided by the caller; the soft-gated
//! stages (safety, mineral identification, labeling) have no validator at
//! all.

use std::collections::BTreeSet;
use thiserror::Error;

use crate::model::{Equipment, LabMeasurements, MeasurementRequests};

/// Why a stage submission was turned back, worded for the student.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum StageRejection {
    #[error(
        "Incorrect selection. Check the inventory: exactly {expected} items are needed to measure mass and volume by displacement."
    )]
    WrongEquipment { expected: usize },

    #[error("Describe your procedure before sending it for review.")]
    EmptyProcedure,

    #[error("Request all three measurements before calculating.")]
    MeasurementsMissing,

    #[error(
        "Incorrect calculation. Check the formula: density = mass / volume. The correct answer is {expected:.2} g/cm³."
    )]
    WrongDensity { expected: f64 },

    #[error("Explain how your data supports the identification.")]
    EmptyJustification,
}

/// Stage 1: the selection must equal the required set exactly — same
/// cardinality, same members. Any subset, superset, or substitution fails.
pub fn check_equipment(selected: &BTreeSet<Equipment>) -> Result<(), StageRejection> {
    let required = Equipment::required_set();
    if *selected == required {
        Ok(())
    } else {
        Err(StageRejection::WrongEquipment {
            expected: required.len(),
        })
    }
}

/// Stage 2: any non-blank procedure text is sent onward for review.
pub fn check_procedure(text: &str) -> Result<(), StageRejection> {
    if text.trim().is_empty() {
        Err(StageRejection::EmptyProcedure)
    } else {
        Ok(())
    }
}

/// Stage 5: the calculate action stays gated until every reading was
/// requested at least once.
pub fn check_measurements(requests: &MeasurementRequests) -> Result<(), StageRejection> {
    if requests.is_complete() {
        Ok(())
    } else {
        Err(StageRejection::MeasurementsMissing)
    }
}

/// Stage 6: parses the student's density and checks it against the
/// derived ground truth. Unparsable input earns the same corrective
/// message as a wrong value, correct answer included.
pub fn check_density(input: &str, truth: &LabMeasurements) -> Result<f64, StageRejection> {
    let expected = truth.apparent_density();
    let guess = input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|g| g.is_finite())
        .ok_or(StageRejection::WrongDensity { expected })?;
    if truth.accepts_guess(guess) {
        Ok(guess)
    } else {
        Err(StageRejection::WrongDensity { expected })
    }
}

/// Stage 8: the conclusion needs at least one sentence of justification.
pub fn check_justification(text: &str) -> Result<(), StageRejection> {
    if text.trim().is_empty() {
        Err(StageRejection::EmptyJustification)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equipment_accepts_only_the_exact_set() {
        assert!(check_equipment(&Equipment::required_set()).is_ok());

        // subset
        let mut missing = Equipment::required_set();
        missing.remove(&Equipment::Water);
        assert!(check_equipment(&missing).is_err());

        // superset
        let mut extra = Equipment::required_set();
        extra.insert(Equipment::BunsenBurner);
        assert!(check_equipment(&extra).is_err());

        // substitution keeps the cardinality but swaps a member
        let mut swapped = Equipment::required_set();
        swapped.remove(&Equipment::Balance);
        swapped.insert(Equipment::Beaker);
        assert!(check_equipment(&swapped).is_err());

        assert!(check_equipment(&BTreeSet::new()).is_err());
    }

    #[test]
    fn equipment_rejection_names_the_expected_count() {
        let err = check_equipment(&BTreeSet::new()).unwrap_err();
        assert!(err.to_string().contains("exactly 4 items"));
    }

    #[test]
    fn procedure_and_justification_require_text() {
        assert!(check_procedure("Weigh the sample first.").is_ok());
        assert_eq!(
            check_procedure("   \n"),
            Err(StageRejection::EmptyProcedure)
        );
        assert!(check_justification("Density matches the range.").is_ok());
        assert_eq!(
            check_justification(""),
            Err(StageRejection::EmptyJustification)
        );
    }

    #[test]
    fn measurements_gate_until_complete() {
        let mut requests = MeasurementRequests::new();
        assert_eq!(
            check_measurements(&requests),
            Err(StageRejection::MeasurementsMissing)
        );
        for m in crate::model::Measurement::ALL {
            requests.request(m);
        }
        assert!(check_measurements(&requests).is_ok());
    }

    #[test]
    fn density_accepts_within_tolerance() {
        let truth = LabMeasurements::seeded();
        assert_eq!(check_density("3.52", &truth), Ok(3.52));
        assert_eq!(check_density(" 3.50 ", &truth), Ok(3.50));
        // boundary is inclusive
        assert_eq!(check_density("3.55", &truth), Ok(3.55));
    }

    #[test]
    fn density_rejection_reveals_the_correct_value() {
        let truth = LabMeasurements::seeded();
        let err = check_density("3.6", &truth).unwrap_err();
        assert!(err.to_string().contains("3.50"));

        let err = check_density("not a number", &truth).unwrap_err();
        assert_eq!(err, StageRejection::WrongDensity { expected: 3.5 });
    }
}
