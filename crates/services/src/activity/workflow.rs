use std::collections::BTreeSet;
use std::sync::Arc;

use lab_core::Clock;
use lab_core::model::{Equipment, Measurement, Mineral, Ppe, ProgressRecord, StudentIdentity};
use storage::repository::ProgressRepository;

use super::session::{ActivitySession, Submission};
use crate::error::ActivityError;
use crate::feedback::FeedbackProvider;

/// Raw input for one stage, as collected by the host UI.
///
/// The variant implies the stage it belongs to; feeding it to a session
/// at any other stage is reported as [`ActivityError::StageMismatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum StageInput {
    Equipment(BTreeSet<Equipment>),
    Procedure(String),
    FeedbackAcknowledged,
    Safety(Ppe),
    MeasurementRequest(Measurement),
    MeasurementsConfirmed,
    Density(String),
    Mineral(Mineral),
    Justification(String),
}

/// Orchestrates session start, the two asynchronous stage boundaries, and
/// completion.
///
/// Holds the clock, the feedback provider, and the record store; the
/// session itself stays a plain value owned by the caller.
#[derive(Clone)]
pub struct ActivityLoopService {
    clock: Clock,
    feedback: Arc<dyn FeedbackProvider>,
    records: Arc<dyn ProgressRepository>,
}

impl ActivityLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        feedback: Arc<dyn FeedbackProvider>,
        records: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            feedback,
            records,
        }
    }

    /// Start a fresh session for the registered student.
    #[must_use]
    pub fn start(&self, identity: StudentIdentity) -> ActivitySession {
        ActivitySession::new(identity, self.clock.now())
    }

    /// Submit one stage's input, whichever stage it belongs to.
    ///
    /// Procedure input suspends on the feedback provider; everything else
    /// resolves synchronously inside the session.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` when the input does not match the current
    /// stage or the session is already complete.
    pub async fn submit(
        &self,
        session: &mut ActivitySession,
        input: StageInput,
    ) -> Result<Submission, ActivityError> {
        match input {
            StageInput::Equipment(selected) => session.submit_equipment(selected),
            StageInput::Procedure(text) => self.submit_procedure(session, &text).await,
            StageInput::FeedbackAcknowledged => session
                .acknowledge_feedback()
                .map(|()| Submission::Accepted),
            StageInput::Safety(answer) => session.submit_safety(answer),
            StageInput::MeasurementRequest(measurement) => session
                .request_measurement(measurement)
                .map(|_| Submission::Accepted),
            StageInput::MeasurementsConfirmed => session.confirm_measurements(),
            StageInput::Density(input) => session.submit_density(&input),
            StageInput::Mineral(choice) => session.identify_mineral(choice),
            StageInput::Justification(text) => session.submit_justification(&text),
        }
    }

    /// Stage 2 → 3: validate the procedure, then hold the session at
    /// stage two until the evaluation resolves.
    ///
    /// The provider never fails — on any internal error the feedback is
    /// its explanatory fallback text — so this boundary always settles.
    /// The exclusive `&mut session` borrow doubles as the duplicate-
    /// submission guard for the duration of the request.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if the session is not at stage two.
    pub async fn submit_procedure(
        &self,
        session: &mut ActivitySession,
        text: &str,
    ) -> Result<Submission, ActivityError> {
        match session.propose_procedure(text)? {
            Submission::Rejected(reason) => Ok(Submission::Rejected(reason)),
            Submission::Accepted => {
                let feedback = self.feedback.evaluate_procedure(text).await;
                session.record_feedback(text.to_owned(), feedback)?;
                Ok(Submission::Accepted)
            }
        }
    }

    /// Stage 9 → 10: assemble the record, request the narrative summary,
    /// score, freeze, and persist.
    ///
    /// Persistence is fire-and-forget: a storage failure is logged and
    /// the completed record is returned regardless, since it already
    /// lives in memory. Calling this on an already-completed session is a
    /// no-op that returns the existing record unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if the session has not reached stage nine.
    pub async fn finalize(
        &self,
        session: &mut ActivitySession,
    ) -> Result<ProgressRecord, ActivityError> {
        if let Some(record) = session.record() {
            return Ok(record.clone());
        }

        let draft = session.assemble_draft()?;
        let report = self.feedback.generate_summary(&draft).await;
        let record = session
            .finalize_record(report, self.clock.now())?
            .clone();

        if let Err(err) = self.records.append_record(&record).await {
            tracing::warn!(error = %err, "failed to persist completed lab record");
        }

        Ok(record)
    }

    /// Rehydrate the latest frozen record for a read-only summary view.
    ///
    /// Anything short of a valid completed record — an empty store, a
    /// backend failure, a malformed or partial row — comes back as `None`
    /// and the host starts a fresh session from stage one.
    pub async fn load_completed(&self) -> Option<ProgressRecord> {
        let row = match self.records.load_latest().await {
            Ok(Some(row)) => row,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read stored lab record");
                return None;
            }
        };
        match row.into_record() {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(error = %err, "stored lab record is unusable; starting fresh");
                None
            }
        }
    }
}
