use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::model::equipment::Equipment;
use crate::model::identity::StudentIdentity;
use crate::model::ids::SampleId;
use crate::model::lab::LabMeasurements;
use crate::model::mineral::Mineral;
use crate::model::safety::SafetyCheck;
use crate::scoring;

/// Material line printed on the sample label.
pub const SAMPLE_MATERIAL: &str = "Oxidized copper ore";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RecordError {
    #[error("score {0} exceeds the maximum of 100")]
    ScoreOutOfRange(u32),

    #[error("completion timestamp is before session start")]
    InvalidTimeRange,

    #[error("record is not marked completed")]
    NotCompleted,
}

//
// ─── SAMPLE LABEL ──────────────────────────────────────────────────────────────
//

/// The label pasted on the stored sample at stage nine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleLabel {
    sample_id: SampleId,
    date: String,
    material: String,
}

impl SampleLabel {
    /// Builds the label for a session, dating it from the session start.
    #[must_use]
    pub fn for_session(sample_id: SampleId, started_at: DateTime<Utc>) -> Self {
        Self {
            sample_id,
            date: started_at.format("%Y-%m-%d").to_string(),
            material: SAMPLE_MATERIAL.to_owned(),
        }
    }

    /// Rebuilds a label exactly as it was frozen.
    #[must_use]
    pub fn from_persisted(sample_id: SampleId, date: String, material: String) -> Self {
        Self {
            sample_id,
            date,
            material,
        }
    }

    #[must_use]
    pub fn sample_id(&self) -> &SampleId {
        &self.sample_id
    }

    #[must_use]
    pub fn date(&self) -> &str {
        &self.date
    }

    #[must_use]
    pub fn material(&self) -> &str {
        &self.material
    }
}

//
// ─── PROGRESS RECORD ───────────────────────────────────────────────────────────
//

/// Everything gathered over the ten stages, assembled but not yet frozen.
///
/// The result assembler builds one of these right before requesting the
/// narrative summary; scoring reads it; `freeze` turns it into the
/// immutable [`ProgressRecord`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraft {
    pub identity: StudentIdentity,
    pub equipment: BTreeSet<Equipment>,
    pub procedure: String,
    pub feedback: String,
    pub safety: SafetyCheck,
    pub measurements: LabMeasurements,
    pub user_density: f64,
    pub mineral: Mineral,
    pub justification: String,
    pub label: SampleLabel,
    pub started_at: DateTime<Utc>,
}

impl RecordDraft {
    /// Freezes the draft into a completed record.
    ///
    /// # Errors
    ///
    /// Returns `RecordError` if the score exceeds 100 or the completion
    /// timestamp precedes the session start.
    pub fn freeze(
        self,
        report: String,
        score: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<ProgressRecord, RecordError> {
        if score > scoring::MAX_SCORE {
            return Err(RecordError::ScoreOutOfRange(score));
        }
        if completed_at < self.started_at {
            return Err(RecordError::InvalidTimeRange);
        }
        Ok(ProgressRecord {
            identity: self.identity,
            equipment: self.equipment,
            procedure: self.procedure,
            feedback: self.feedback,
            safety: self.safety,
            measurements: self.measurements,
            user_density: self.user_density,
            mineral: self.mineral,
            justification: self.justification,
            label: self.label,
            report,
            score,
            started_at: self.started_at,
            completed_at,
        })
    }
}

/// One student's finished run. Immutable once constructed; the only ways
/// in are [`RecordDraft::freeze`] and [`ProgressRecord::from_persisted`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    identity: StudentIdentity,
    equipment: BTreeSet<Equipment>,
    procedure: String,
    feedback: String,
    safety: SafetyCheck,
    measurements: LabMeasurements,
    user_density: f64,
    mineral: Mineral,
    justification: String,
    label: SampleLabel,
    report: String,
    score: u32,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
}

impl ProgressRecord {
    /// Rehydrates a record from durable storage.
    ///
    /// Storage keeps a `completed` flag; anything persisted mid-activity
    /// must not resume, so `completed = false` is rejected here and the
    /// caller starts a fresh session instead.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotCompleted` for partial records, and the
    /// same range checks as [`RecordDraft::freeze`] otherwise.
    pub fn from_persisted(
        draft: RecordDraft,
        report: String,
        score: u32,
        completed: bool,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, RecordError> {
        if !completed {
            return Err(RecordError::NotCompleted);
        }
        draft.freeze(report, score, completed_at)
    }

    #[must_use]
    pub fn identity(&self) -> &StudentIdentity {
        &self.identity
    }

    #[must_use]
    pub fn equipment(&self) -> &BTreeSet<Equipment> {
        &self.equipment
    }

    #[must_use]
    pub fn procedure(&self) -> &str {
        &self.procedure
    }

    #[must_use]
    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    #[must_use]
    pub fn safety(&self) -> SafetyCheck {
        self.safety
    }

    #[must_use]
    pub fn measurements(&self) -> &LabMeasurements {
        &self.measurements
    }

    /// Derived density, recomputed from the measurements so every display
    /// site agrees with the formula.
    #[must_use]
    pub fn apparent_density(&self) -> f64 {
        self.measurements.apparent_density()
    }

    #[must_use]
    pub fn user_density(&self) -> f64 {
        self.user_density
    }

    #[must_use]
    pub fn mineral(&self) -> Mineral {
        self.mineral
    }

    #[must_use]
    pub fn justification(&self) -> &str {
        &self.justification
    }

    #[must_use]
    pub fn label(&self) -> &SampleLabel {
        &self.label
    }

    #[must_use]
    pub fn report(&self) -> &str {
        &self.report
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AvatarId, Ppe};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn build_draft() -> RecordDraft {
        let started_at = fixed_now();
        RecordDraft {
            identity: StudentIdentity::new("Ana", "3C", AvatarId::new(2).unwrap()).unwrap(),
            equipment: Equipment::required_set(),
            procedure: "Weigh the sample, then displace water.".to_owned(),
            feedback: "Good plan.".to_owned(),
            safety: SafetyCheck::record(Ppe::SafetyGoggles),
            measurements: LabMeasurements::seeded(),
            user_density: 3.5,
            mineral: Mineral::Chalcopyrite,
            justification: "3.50 sits in the chalcopyrite range.".to_owned(),
            label: SampleLabel::for_session(SampleId::derive(started_at), started_at),
            started_at,
        }
    }

    #[test]
    fn freeze_produces_an_immutable_record() {
        let completed_at = fixed_now() + Duration::minutes(12);
        let record = build_draft()
            .freeze("Summary.".to_owned(), 100, completed_at)
            .unwrap();
        assert_eq!(record.score(), 100);
        assert_eq!(record.completed_at(), completed_at);
        assert!((record.apparent_density() - 3.50).abs() < 1e-12);
    }

    #[test]
    fn freeze_rejects_out_of_range_score() {
        let err = build_draft()
            .freeze("Summary.".to_owned(), 101, fixed_now())
            .unwrap_err();
        assert_eq!(err, RecordError::ScoreOutOfRange(101));
    }

    #[test]
    fn freeze_rejects_completion_before_start() {
        let err = build_draft()
            .freeze("Summary.".to_owned(), 90, fixed_now() - Duration::seconds(1))
            .unwrap_err();
        assert_eq!(err, RecordError::InvalidTimeRange);
    }

    #[test]
    fn from_persisted_rejects_partial_records() {
        let err = ProgressRecord::from_persisted(
            build_draft(),
            "Summary.".to_owned(),
            75,
            false,
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, RecordError::NotCompleted);
    }

    #[test]
    fn label_carries_session_date_and_material() {
        let label = SampleLabel::for_session(SampleId::derive(fixed_now()), fixed_now());
        assert_eq!(label.date(), "2023-11-14");
        assert_eq!(label.material(), SAMPLE_MATERIAL);
        assert_eq!(label.sample_id().as_str(), "CU-OX-0000");
    }
}
