//! Scoring rules: ten fixed-weight contributions, each computed from the
//! assembled draft alone and independent of every other rule.
//!
//! The score is evaluated exactly once, at finalization; nothing here is
//! called incrementally while the activity runs.

use std::collections::BTreeSet;

use crate::model::{Equipment, LabMeasurements, Mineral, RecordDraft, SAMPLE_MINERAL};

/// Ceiling reached by a perfect run.
pub const MAX_SCORE: u32 = 100;

/// Stage 1: the inventory plan matched the required set exactly.
#[must_use]
pub fn equipment_points(selected: &BTreeSet<Equipment>) -> u32 {
    if *selected == Equipment::required_set() { 10 } else { 0 }
}

/// Stage 2: a procedure was proposed.
#[must_use]
pub fn procedure_points(text: &str) -> u32 {
    if text.trim().is_empty() { 0 } else { 10 }
}

/// Stage 3: feedback text was obtained (the provider never fails, so this
/// only misses when the feedback is somehow blank).
#[must_use]
pub fn feedback_points(text: &str) -> u32 {
    if text.is_empty() { 0 } else { 5 }
}

/// Stage 4: the indispensable PPE was picked.
#[must_use]
pub fn safety_points(correct: bool) -> u32 {
    if correct { 10 } else { 0 }
}

/// Stage 5: reaching the data-request stage is worth a flat credit.
#[must_use]
pub fn data_request_points() -> u32 {
    5
}

/// Stage 6: the calculated density landed within tolerance.
#[must_use]
pub fn density_points(guess: f64, truth: &LabMeasurements) -> u32 {
    if truth.accepts_guess(guess) { 15 } else { 0 }
}

/// Stage 7: the sample was identified as the designated mineral.
#[must_use]
pub fn mineral_points(choice: Mineral) -> u32 {
    if choice == SAMPLE_MINERAL { 15 } else { 0 }
}

/// Stage 8: the conclusion was justified.
#[must_use]
pub fn justification_points(text: &str) -> u32 {
    if text.trim().is_empty() { 0 } else { 10 }
}

/// Stage 9: reaching the labeling stage is worth a flat credit.
#[must_use]
pub fn labeling_points() -> u32 {
    5
}

/// Stage 10: the summary report was requested.
#[must_use]
pub fn report_points(requested: bool) -> u32 {
    if requested { 15 } else { 0 }
}

/// Per-stage contributions for one finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub equipment: u32,
    pub procedure: u32,
    pub feedback: u32,
    pub safety: u32,
    pub data_request: u32,
    pub density: u32,
    pub mineral: u32,
    pub justification: u32,
    pub labeling: u32,
    pub report: u32,
}

impl ScoreBreakdown {
    /// Applies every rule to the assembled draft.
    #[must_use]
    pub fn evaluate(draft: &RecordDraft, report_requested: bool) -> Self {
        Self {
            equipment: equipment_points(&draft.equipment),
            procedure: procedure_points(&draft.procedure),
            feedback: feedback_points(&draft.feedback),
            safety: safety_points(draft.safety.is_correct()),
            data_request: data_request_points(),
            density: density_points(draft.user_density, &draft.measurements),
            mineral: mineral_points(draft.mineral),
            justification: justification_points(&draft.justification),
            labeling: labeling_points(),
            report: report_points(report_requested),
        }
    }

    /// Plain sum of the ten contributions, never above [`MAX_SCORE`].
    #[must_use]
    pub fn total(&self) -> u32 {
        self.equipment
            + self.procedure
            + self.feedback
            + self.safety
            + self.data_request
            + self.density
            + self.mineral
            + self.justification
            + self.labeling
            + self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AvatarId, Ppe, SafetyCheck, SampleId, SampleLabel, StudentIdentity,
    };
    use crate::time::fixed_now;

    fn build_draft() -> RecordDraft {
        let started_at = fixed_now();
        RecordDraft {
            identity: StudentIdentity::new("Ana", "3C", AvatarId::new(1).unwrap()).unwrap(),
            equipment: Equipment::required_set(),
            procedure: "Weigh, submerge, divide.".to_owned(),
            feedback: "Solid plan.".to_owned(),
            safety: SafetyCheck::record(Ppe::SafetyGoggles),
            measurements: LabMeasurements::seeded(),
            user_density: 3.5,
            mineral: Mineral::Chalcopyrite,
            justification: "3.50 is closest to the chalcopyrite range.".to_owned(),
            label: SampleLabel::for_session(SampleId::derive(started_at), started_at),
            started_at,
        }
    }

    #[test]
    fn perfect_run_scores_the_ceiling() {
        let breakdown = ScoreBreakdown::evaluate(&build_draft(), true);
        assert_eq!(breakdown.total(), MAX_SCORE);
    }

    #[test]
    fn worked_example_totals_seventy_five() {
        // Correct equipment, non-empty procedure, feedback present, wrong
        // safety answer, correct density, wrong mineral, non-empty
        // justification, summary requested.
        let mut draft = build_draft();
        draft.safety = SafetyCheck::record(Ppe::LatexGloves);
        draft.mineral = Mineral::Galena;
        let breakdown = ScoreBreakdown::evaluate(&draft, true);
        assert_eq!(breakdown.safety, 0);
        assert_eq!(breakdown.mineral, 0);
        assert_eq!(breakdown.total(), 75);
    }

    #[test]
    fn rules_are_independent() {
        // Flipping one input moves only its own contribution.
        let full = ScoreBreakdown::evaluate(&build_draft(), true);

        let mut draft = build_draft();
        draft.user_density = 9.9;
        let off = ScoreBreakdown::evaluate(&draft, true);
        assert_eq!(off.density, 0);
        assert_eq!(off.equipment, full.equipment);
        assert_eq!(off.mineral, full.mineral);
        assert_eq!(off.total(), full.total() - 15);
    }

    #[test]
    fn density_rule_uses_the_inclusive_tolerance() {
        let truth = LabMeasurements::seeded();
        assert_eq!(density_points(3.55, &truth), 15);
        assert_eq!(density_points(3.56, &truth), 0);
    }

    #[test]
    fn missing_report_costs_fifteen() {
        let breakdown = ScoreBreakdown::evaluate(&build_draft(), false);
        assert_eq!(breakdown.total(), MAX_SCORE - 15);
    }
}
