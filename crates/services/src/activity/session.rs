use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;

use lab_core::model::{
    Equipment, LabMeasurements, Measurement, MeasurementRequests, Mineral, Ppe,
    ProgressRecord, RecordDraft, SafetyCheck, SampleId, SampleLabel, StudentIdentity,
};
use lab_core::scoring::ScoreBreakdown;
use lab_core::validate;
use lab_core::validate::StageRejection;

use super::progress::ActivityProgress;
use super::stage::Stage;
use crate::error::ActivityError;

//
// ─── SUBMISSION OUTCOME ────────────────────────────────────────────────────────
//

/// Outcome of submitting one stage's input.
///
/// A rejection leaves the session exactly where it was; the student reads
/// the reason and resubmits.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Accepted,
    Rejected(StageRejection),
}

impl Submission {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Submission::Accepted)
    }
}

//
// ─── STAGE STATE ───────────────────────────────────────────────────────────────
//

/// Answers gathered during the planning stages (1-3).
#[derive(Debug, Clone, PartialEq)]
struct Plan {
    equipment: BTreeSet<Equipment>,
    procedure: String,
    feedback: String,
}

/// Plan plus everything measured at the bench (stages 4-6).
#[derive(Debug, Clone, PartialEq)]
struct Bench {
    plan: Plan,
    safety: SafetyCheck,
    user_density: f64,
}

/// Bench plus the interpretation answers (stages 7-8).
#[derive(Debug, Clone, PartialEq)]
struct Conclusion {
    bench: Bench,
    mineral: Mineral,
    justification: String,
}

/// Current stage together with exactly the data that stage can have.
///
/// Each variant carries what earlier stages produced and nothing more, so
/// states like "score exists but the record is unfinished" cannot be
/// expressed at all.
#[derive(Debug, Clone, PartialEq)]
enum StageState {
    Equipment,
    Procedure {
        equipment: BTreeSet<Equipment>,
    },
    Feedback {
        plan: Plan,
    },
    Safety {
        plan: Plan,
    },
    DataRequest {
        plan: Plan,
        safety: SafetyCheck,
        requested: MeasurementRequests,
    },
    Density {
        plan: Plan,
        safety: SafetyCheck,
    },
    MineralId {
        bench: Bench,
    },
    Justification {
        bench: Bench,
        mineral: Mineral,
    },
    Labeling {
        conclusion: Conclusion,
    },
    Completed {
        record: ProgressRecord,
    },
}

impl StageState {
    fn stage(&self) -> Stage {
        match self {
            StageState::Equipment => Stage::Equipment,
            StageState::Procedure { .. } => Stage::Procedure,
            StageState::Feedback { .. } => Stage::Feedback,
            StageState::Safety { .. } => Stage::Safety,
            StageState::DataRequest { .. } => Stage::DataRequest,
            StageState::Density { .. } => Stage::Density,
            StageState::MineralId { .. } => Stage::MineralId,
            StageState::Justification { .. } => Stage::Justification,
            StageState::Labeling { .. } => Stage::Labeling,
            StageState::Completed { .. } => Stage::Report,
        }
    }

    fn plan(&self) -> Option<&Plan> {
        match self {
            StageState::Equipment | StageState::Procedure { .. } | StageState::Completed { .. } => {
                None
            }
            StageState::Feedback { plan }
            | StageState::Safety { plan }
            | StageState::DataRequest { plan, .. }
            | StageState::Density { plan, .. } => Some(plan),
            StageState::MineralId { bench } | StageState::Justification { bench, .. } => {
                Some(&bench.plan)
            }
            StageState::Labeling { conclusion } => Some(&conclusion.bench.plan),
        }
    }

    fn bench(&self) -> Option<&Bench> {
        match self {
            StageState::MineralId { bench } | StageState::Justification { bench, .. } => {
                Some(bench)
            }
            StageState::Labeling { conclusion } => Some(&conclusion.bench),
            _ => None,
        }
    }
}

fn unexpected(state: &StageState, expected: Stage) -> ActivityError {
    match state {
        StageState::Completed { .. } => ActivityError::Completed,
        other => ActivityError::StageMismatch {
            expected,
            actual: other.stage(),
        },
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory state machine for one student's run through the activity.
///
/// Owns the single record-in-progress. All transitions are strictly
/// forward and gated on the stage validators; the two asynchronous
/// boundaries (procedure feedback and finalization) are driven by
/// `ActivityLoopService`, which holds the exclusive `&mut` borrow for the
/// duration of each request — duplicate concurrent submissions against
/// the same stage are ruled out by the borrow alone.
pub struct ActivitySession {
    identity: StudentIdentity,
    started_at: DateTime<Utc>,
    sample_id: SampleId,
    measurements: LabMeasurements,
    state: StageState,
}

impl ActivitySession {
    /// Starts a fresh session at stage one.
    ///
    /// `started_at` should come from the services layer clock; it seeds
    /// the sample id, which is derived here once and never regenerated.
    #[must_use]
    pub fn new(identity: StudentIdentity, started_at: DateTime<Utc>) -> Self {
        Self {
            identity,
            started_at,
            sample_id: SampleId::derive(started_at),
            measurements: LabMeasurements::seeded(),
            state: StageState::Equipment,
        }
    }

    #[must_use]
    pub fn identity(&self) -> &StudentIdentity {
        &self.identity
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn sample_id(&self) -> &SampleId {
        &self.sample_id
    }

    /// The seeded ground-truth measurements for this session.
    #[must_use]
    pub fn measurements(&self) -> &LabMeasurements {
        &self.measurements
    }

    #[must_use]
    pub fn current_stage(&self) -> Stage {
        self.state.stage()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self.state, StageState::Completed { .. })
    }

    /// The frozen record, present only after finalization.
    #[must_use]
    pub fn record(&self) -> Option<&ProgressRecord> {
        match &self.state {
            StageState::Completed { record } => Some(record),
            _ => None,
        }
    }

    /// Returns a summary of the current activity progress.
    #[must_use]
    pub fn progress(&self) -> ActivityProgress {
        ActivityProgress {
            step: self.current_stage().number(),
            total: Stage::TOTAL,
            is_complete: self.is_complete(),
        }
    }

    /// Assistant feedback, once stage two has been answered.
    #[must_use]
    pub fn feedback(&self) -> Option<&str> {
        match &self.state {
            StageState::Completed { record } => Some(record.feedback()),
            other => other.plan().map(|plan| plan.feedback.as_str()),
        }
    }

    /// The accepted density guess, once stage six has been passed.
    #[must_use]
    pub fn user_density(&self) -> Option<f64> {
        match &self.state {
            StageState::Completed { record } => Some(record.user_density()),
            other => other.bench().map(|bench| bench.user_density),
        }
    }

    /// The label as it will be printed at stage nine. Pure preview; the
    /// same values are frozen into the record at finalization.
    #[must_use]
    pub fn label_preview(&self) -> SampleLabel {
        SampleLabel::for_session(self.sample_id.clone(), self.started_at)
    }

    // ─── Stage submissions ─────────────────────────────────────────────────

    /// Stage 1: confirm the equipment plan.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if the session is past stage one.
    pub fn submit_equipment(
        &mut self,
        selected: BTreeSet<Equipment>,
    ) -> Result<Submission, ActivityError> {
        let state = self.take_state();
        match state {
            StageState::Equipment => match validate::check_equipment(&selected) {
                Ok(()) => {
                    self.state = StageState::Procedure {
                        equipment: selected,
                    };
                    Ok(Submission::Accepted)
                }
                Err(reason) => {
                    self.state = StageState::Equipment;
                    Ok(Submission::Rejected(reason))
                }
            },
            other => self.put_back(other, Stage::Equipment),
        }
    }

    /// Stage 2: validate a proposed procedure without advancing.
    ///
    /// The transition itself happens in `record_feedback`, after the
    /// asynchronous evaluation has resolved.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if the session is not at stage two.
    pub fn propose_procedure(&self, text: &str) -> Result<Submission, ActivityError> {
        match &self.state {
            StageState::Procedure { .. } => Ok(match validate::check_procedure(text) {
                Ok(()) => Submission::Accepted,
                Err(reason) => Submission::Rejected(reason),
            }),
            other => Err(unexpected(other, Stage::Procedure)),
        }
    }

    /// Stage 2 → 3: store the validated procedure and its feedback.
    pub(crate) fn record_feedback(
        &mut self,
        procedure: String,
        feedback: String,
    ) -> Result<(), ActivityError> {
        let state = self.take_state();
        match state {
            StageState::Procedure { equipment } => {
                self.state = StageState::Feedback {
                    plan: Plan {
                        equipment,
                        procedure,
                        feedback,
                    },
                };
                Ok(())
            }
            other => self.put_back(other, Stage::Procedure),
        }
    }

    /// Stage 3: the student has read the feedback.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if the session is not at stage three.
    pub fn acknowledge_feedback(&mut self) -> Result<(), ActivityError> {
        let state = self.take_state();
        match state {
            StageState::Feedback { plan } => {
                self.state = StageState::Safety { plan };
                Ok(())
            }
            other => self.put_back(other, Stage::Feedback),
        }
    }

    /// Stage 4: record the safety answer. A wrong answer advances anyway;
    /// correctness is kept for scoring only.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if the session is not at stage four.
    pub fn submit_safety(&mut self, answer: Ppe) -> Result<Submission, ActivityError> {
        let state = self.take_state();
        match state {
            StageState::Safety { plan } => {
                self.state = StageState::DataRequest {
                    plan,
                    safety: SafetyCheck::record(answer),
                    requested: MeasurementRequests::new(),
                };
                Ok(Submission::Accepted)
            }
            other => self.put_back(other, Stage::Safety),
        }
    }

    /// Stage 5: ask the assistant for one reading. Repeat requests are
    /// harmless; the returned value is the seeded ground truth.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if the session is not at stage five.
    pub fn request_measurement(
        &mut self,
        measurement: Measurement,
    ) -> Result<f64, ActivityError> {
        match &mut self.state {
            StageState::DataRequest { requested, .. } => {
                requested.request(measurement);
                Ok(self.measurements.value_of(measurement))
            }
            other => Err(unexpected(other, Stage::DataRequest)),
        }
    }

    /// Stage 5 → 6: move on to the calculation once every reading has
    /// been requested.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if the session is not at stage five.
    pub fn confirm_measurements(&mut self) -> Result<Submission, ActivityError> {
        let state = self.take_state();
        match state {
            StageState::DataRequest {
                plan,
                safety,
                requested,
            } => match validate::check_measurements(&requested) {
                Ok(()) => {
                    self.state = StageState::Density { plan, safety };
                    Ok(Submission::Accepted)
                }
                Err(reason) => {
                    self.state = StageState::DataRequest {
                        plan,
                        safety,
                        requested,
                    };
                    Ok(Submission::Rejected(reason))
                }
            },
            other => self.put_back(other, Stage::DataRequest),
        }
    }

    /// Stage 6: check the student's density calculation.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if the session is not at stage six.
    pub fn submit_density(&mut self, input: &str) -> Result<Submission, ActivityError> {
        let state = self.take_state();
        match state {
            StageState::Density { plan, safety } => {
                match validate::check_density(input, &self.measurements) {
                    Ok(guess) => {
                        self.state = StageState::MineralId {
                            bench: Bench {
                                plan,
                                safety,
                                user_density: guess,
                            },
                        };
                        Ok(Submission::Accepted)
                    }
                    Err(reason) => {
                        self.state = StageState::Density { plan, safety };
                        Ok(Submission::Rejected(reason))
                    }
                }
            }
            other => self.put_back(other, Stage::Density),
        }
    }

    /// Stage 7: record the mineral identification. Any choice advances;
    /// only the designated mineral scores.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if the session is not at stage seven.
    pub fn identify_mineral(&mut self, choice: Mineral) -> Result<Submission, ActivityError> {
        let state = self.take_state();
        match state {
            StageState::MineralId { bench } => {
                self.state = StageState::Justification {
                    bench,
                    mineral: choice,
                };
                Ok(Submission::Accepted)
            }
            other => self.put_back(other, Stage::MineralId),
        }
    }

    /// Stage 8: justify the identification.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if the session is not at stage eight.
    pub fn submit_justification(&mut self, text: &str) -> Result<Submission, ActivityError> {
        let state = self.take_state();
        match state {
            StageState::Justification { bench, mineral } => {
                match validate::check_justification(text) {
                    Ok(()) => {
                        self.state = StageState::Labeling {
                            conclusion: Conclusion {
                                bench,
                                mineral,
                                justification: text.trim().to_owned(),
                            },
                        };
                        Ok(Submission::Accepted)
                    }
                    Err(reason) => {
                        self.state = StageState::Justification { bench, mineral };
                        Ok(Submission::Rejected(reason))
                    }
                }
            }
            other => self.put_back(other, Stage::Justification),
        }
    }

    // ─── Finalization ──────────────────────────────────────────────────────

    /// Assembles the draft the summary prompt and scoring read.
    pub(crate) fn assemble_draft(&self) -> Result<RecordDraft, ActivityError> {
        match &self.state {
            StageState::Labeling { conclusion } => Ok(RecordDraft {
                identity: self.identity.clone(),
                equipment: conclusion.bench.plan.equipment.clone(),
                procedure: conclusion.bench.plan.procedure.clone(),
                feedback: conclusion.bench.plan.feedback.clone(),
                safety: conclusion.bench.safety,
                measurements: self.measurements,
                user_density: conclusion.bench.user_density,
                mineral: conclusion.mineral,
                justification: conclusion.justification.clone(),
                label: self.label_preview(),
                started_at: self.started_at,
            }),
            other => Err(unexpected(other, Stage::Labeling)),
        }
    }

    /// Stage 9 → 10: score the run, freeze the record, and enter the
    /// terminal stage. Runs exactly once; a completed session rejects the
    /// call and keeps its record untouched.
    pub(crate) fn finalize_record(
        &mut self,
        report: String,
        completed_at: DateTime<Utc>,
    ) -> Result<&ProgressRecord, ActivityError> {
        let draft = self.assemble_draft()?;
        let score = ScoreBreakdown::evaluate(&draft, true).total();
        let record = draft.freeze(report, score, completed_at)?;
        self.state = StageState::Completed { record };
        match &self.state {
            StageState::Completed { record } => Ok(record),
            _ => Err(ActivityError::Completed),
        }
    }

    fn take_state(&mut self) -> StageState {
        std::mem::replace(&mut self.state, StageState::Equipment)
    }

    fn put_back<T>(&mut self, state: StageState, expected: Stage) -> Result<T, ActivityError> {
        let err = unexpected(&state, expected);
        self.state = state;
        Err(err)
    }
}

impl fmt::Debug for ActivitySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivitySession")
            .field("name", &self.identity.name())
            .field("sample_id", &self.sample_id)
            .field("stage", &self.current_stage())
            .field("is_complete", &self.is_complete())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use lab_core::model::AvatarId;
    use lab_core::time::fixed_now;

    fn build_session() -> ActivitySession {
        let identity =
            StudentIdentity::new("Valentina Rojas", "3C TP", AvatarId::new(1).unwrap()).unwrap();
        ActivitySession::new(identity, fixed_now())
    }

    /// Drives a session up to the labeling stage with correct answers.
    fn advance_to_labeling(session: &mut ActivitySession) {
        session
            .submit_equipment(Equipment::required_set())
            .unwrap();
        session
            .record_feedback("Weigh, submerge, divide.".into(), "Good plan.".into())
            .unwrap();
        session.acknowledge_feedback().unwrap();
        session.submit_safety(Ppe::SafetyGoggles).unwrap();
        for m in Measurement::ALL {
            session.request_measurement(m).unwrap();
        }
        session.confirm_measurements().unwrap();
        session.submit_density("3.5").unwrap();
        session.identify_mineral(Mineral::Chalcopyrite).unwrap();
        session
            .submit_justification("3.50 sits in the chalcopyrite range.")
            .unwrap();
    }

    #[test]
    fn fresh_session_starts_at_stage_one() {
        let session = build_session();
        assert_eq!(session.current_stage(), Stage::Equipment);
        assert!(!session.is_complete());
        assert_eq!(session.progress().step, 1);
        assert_eq!(session.sample_id().as_str(), "CU-OX-0000");
    }

    #[test]
    fn wrong_equipment_is_rejected_in_place() {
        let mut session = build_session();
        let mut missing = Equipment::required_set();
        missing.remove(&Equipment::Water);

        let outcome = session.submit_equipment(missing).unwrap();
        assert!(!outcome.is_accepted());
        assert_eq!(session.current_stage(), Stage::Equipment);

        let outcome = session.submit_equipment(Equipment::required_set()).unwrap();
        assert!(outcome.is_accepted());
        assert_eq!(session.current_stage(), Stage::Procedure);
    }

    #[test]
    fn input_for_the_wrong_stage_is_an_error() {
        let mut session = build_session();
        let err = session.submit_density("3.5").unwrap_err();
        assert!(matches!(
            err,
            ActivityError::StageMismatch {
                expected: Stage::Density,
                actual: Stage::Equipment,
            }
        ));
        // the rejected call must not disturb the state
        assert_eq!(session.current_stage(), Stage::Equipment);
    }

    #[test]
    fn measurements_gate_the_calculation() {
        let mut session = build_session();
        session.submit_equipment(Equipment::required_set()).unwrap();
        session
            .record_feedback("Plan.".into(), "Feedback.".into())
            .unwrap();
        session.acknowledge_feedback().unwrap();
        session.submit_safety(Ppe::DustMask).unwrap();

        session.request_measurement(Measurement::Mass).unwrap();
        let outcome = session.confirm_measurements().unwrap();
        assert!(!outcome.is_accepted());
        assert_eq!(session.current_stage(), Stage::DataRequest);

        assert_eq!(
            session.request_measurement(Measurement::InitialVolume).unwrap(),
            50.0
        );
        assert_eq!(
            session.request_measurement(Measurement::FinalVolume).unwrap(),
            95.0
        );
        assert!(session.confirm_measurements().unwrap().is_accepted());
        assert_eq!(session.current_stage(), Stage::Density);
    }

    #[test]
    fn density_rejection_reveals_the_expected_value() {
        let mut session = build_session();
        session.submit_equipment(Equipment::required_set()).unwrap();
        session
            .record_feedback("Plan.".into(), "Feedback.".into())
            .unwrap();
        session.acknowledge_feedback().unwrap();
        session.submit_safety(Ppe::SafetyGoggles).unwrap();
        for m in Measurement::ALL {
            session.request_measurement(m).unwrap();
        }
        session.confirm_measurements().unwrap();

        let outcome = session.submit_density("3.6").unwrap();
        let Submission::Rejected(reason) = outcome else {
            panic!("3.6 should be out of tolerance");
        };
        assert!(reason.to_string().contains("3.50"));
        assert_eq!(session.current_stage(), Stage::Density);

        assert!(session.submit_density("3.52").unwrap().is_accepted());
        assert_eq!(session.user_density(), Some(3.52));
    }

    #[test]
    fn soft_gates_advance_on_wrong_answers() {
        let mut session = build_session();
        session.submit_equipment(Equipment::required_set()).unwrap();
        session
            .record_feedback("Plan.".into(), "Feedback.".into())
            .unwrap();
        session.acknowledge_feedback().unwrap();

        assert!(session.submit_safety(Ppe::LatexGloves).unwrap().is_accepted());
        assert_eq!(session.current_stage(), Stage::DataRequest);

        for m in Measurement::ALL {
            session.request_measurement(m).unwrap();
        }
        session.confirm_measurements().unwrap();
        session.submit_density("3.5").unwrap();

        assert!(session.identify_mineral(Mineral::Galena).unwrap().is_accepted());
        assert_eq!(session.current_stage(), Stage::Justification);
    }

    #[test]
    fn finalize_freezes_the_record_once() {
        let mut session = build_session();
        advance_to_labeling(&mut session);
        assert_eq!(session.current_stage(), Stage::Labeling);

        let completed_at = fixed_now() + Duration::minutes(20);
        let score = {
            let record = session
                .finalize_record("A fine report.".into(), completed_at)
                .unwrap();
            assert_eq!(record.score(), 100);
            assert_eq!(record.completed_at(), completed_at);
            record.score()
        };

        assert!(session.is_complete());
        assert_eq!(session.current_stage(), Stage::Report);

        // a second finalization is rejected and changes nothing
        let err = session
            .finalize_record("Another report.".into(), completed_at + Duration::hours(1))
            .unwrap_err();
        assert!(matches!(err, ActivityError::Completed));
        let record = session.record().unwrap();
        assert_eq!(record.score(), score);
        assert_eq!(record.completed_at(), completed_at);
        assert_eq!(record.report(), "A fine report.");
    }

    #[test]
    fn sample_id_survives_from_start_to_frozen_record() {
        let mut session = build_session();
        let sample_id = session.sample_id().clone();
        advance_to_labeling(&mut session);
        session
            .finalize_record("Report.".into(), fixed_now() + Duration::minutes(5))
            .unwrap();
        assert_eq!(session.record().unwrap().label().sample_id(), &sample_id);
    }

    #[test]
    fn imperfect_run_scores_seventy_five() {
        let mut session = build_session();
        session.submit_equipment(Equipment::required_set()).unwrap();
        session
            .record_feedback("Weigh then displace.".into(), "Noted.".into())
            .unwrap();
        session.acknowledge_feedback().unwrap();
        session.submit_safety(Ppe::LabCoat).unwrap(); // wrong
        for m in Measurement::ALL {
            session.request_measurement(m).unwrap();
        }
        session.confirm_measurements().unwrap();
        session.submit_density("3.5").unwrap(); // correct
        session.identify_mineral(Mineral::Quartz).unwrap(); // wrong
        session.submit_justification("Closest match.").unwrap();

        let record = session
            .finalize_record("Summary.".into(), fixed_now() + Duration::minutes(5))
            .unwrap();
        assert_eq!(record.score(), 75);
    }
}
