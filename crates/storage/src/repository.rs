use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use lab_core::model::{
    AvatarId, Equipment, LabMeasurements, Mineral, Ppe, ProgressRecord, RecordDraft,
    SafetyCheck, SampleId, SampleLabel, StudentIdentity,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Persisted shape of a finished run, flattened for storage backends.
///
/// Mirrors the domain `ProgressRecord` so repositories can serialize and
/// deserialize without leaking storage concerns into the domain layer.
/// `into_record` revalidates everything; a row that fails is treated by
/// callers as "no valid record", never partially resumed.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRow {
    pub name: String,
    pub course: String,
    pub avatar: u8,
    pub equipment: BTreeSet<Equipment>,
    pub procedure: String,
    pub feedback: String,
    pub safety_answer: Ppe,
    pub safety_correct: bool,
    pub mass: f64,
    pub initial_volume: f64,
    pub final_volume: f64,
    pub apparent_density: f64,
    pub user_density: f64,
    pub mineral: Mineral,
    pub justification: String,
    pub sample_id: String,
    pub label_date: String,
    pub material: String,
    pub report: String,
    pub score: u32,
    pub completed: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl ProgressRow {
    #[must_use]
    pub fn from_record(record: &ProgressRecord) -> Self {
        Self {
            name: record.identity().name().to_owned(),
            course: record.identity().course().to_owned(),
            avatar: record.identity().avatar().value(),
            equipment: record.equipment().clone(),
            procedure: record.procedure().to_owned(),
            feedback: record.feedback().to_owned(),
            safety_answer: record.safety().answer(),
            safety_correct: record.safety().is_correct(),
            mass: record.measurements().mass(),
            initial_volume: record.measurements().initial_volume(),
            final_volume: record.measurements().final_volume(),
            apparent_density: record.apparent_density(),
            user_density: record.user_density(),
            mineral: record.mineral(),
            justification: record.justification().to_owned(),
            sample_id: record.label().sample_id().as_str().to_owned(),
            label_date: record.label().date().to_owned(),
            material: record.label().material().to_owned(),
            report: record.report().to_owned(),
            score: record.score(),
            completed: true,
            started_at: record.started_at(),
            completed_at: record.completed_at(),
        }
    }

    /// Convert the row back into a frozen domain record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` when any field fails domain
    /// validation, the stored safety grading disagrees with the answer, or
    /// the stored density does not match the formula.
    pub fn into_record(self) -> Result<ProgressRecord, StorageError> {
        let avatar = AvatarId::new(self.avatar).map_err(ser)?;
        let identity = StudentIdentity::new(self.name, self.course, avatar).map_err(ser)?;
        let measurements =
            LabMeasurements::new(self.mass, self.initial_volume, self.final_volume)
                .map_err(ser)?;

        if (self.apparent_density - measurements.apparent_density()).abs() > 1e-9 {
            return Err(StorageError::Serialization(
                "stored apparent density does not match the measurements".into(),
            ));
        }

        let safety = SafetyCheck::record(self.safety_answer);
        if safety.is_correct() != self.safety_correct {
            return Err(StorageError::Serialization(
                "stored safety grading does not match the answer".into(),
            ));
        }

        let sample_id = SampleId::from_persisted(self.sample_id).map_err(ser)?;
        let label = SampleLabel::from_persisted(sample_id, self.label_date, self.material);

        let draft = RecordDraft {
            identity,
            equipment: self.equipment,
            procedure: self.procedure,
            feedback: self.feedback,
            safety,
            measurements,
            user_density: self.user_density,
            mineral: self.mineral,
            justification: self.justification,
            label,
            started_at: self.started_at,
        };

        ProgressRecord::from_persisted(
            draft,
            self.report,
            self.score,
            self.completed,
            self.completed_at,
        )
        .map_err(ser)
    }
}

/// Repository contract for finished activity records.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Append a frozen record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn append_record(&self, record: &ProgressRecord) -> Result<i64, StorageError>;

    /// Fetch the most recently stored row, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures; an empty store is
    /// `Ok(None)`.
    async fn load_latest(&self) -> Result<Option<ProgressRow>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    rows: Arc<Mutex<Vec<ProgressRow>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn append_record(&self, record: &ProgressRecord) -> Result<i64, StorageError> {
        let mut guard = self
            .rows
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.push(ProgressRow::from_record(record));
        Ok(i64::try_from(guard.len()).unwrap_or(i64::MAX))
    }

    async fn load_latest(&self) -> Result<Option<ProgressRow>, StorageError> {
        let guard = self
            .rows
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.last().cloned())
    }
}

/// Aggregates the record repository behind a trait object for easy
/// backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub records: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            records: Arc::new(InMemoryRepository::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use lab_core::time::fixed_now;

    fn build_record() -> ProgressRecord {
        let started_at = fixed_now();
        let draft = RecordDraft {
            identity: StudentIdentity::new("Ana", "3C", AvatarId::new(2).unwrap()).unwrap(),
            equipment: Equipment::required_set(),
            procedure: "Weigh, submerge, divide.".to_owned(),
            feedback: "Looks right.".to_owned(),
            safety: SafetyCheck::record(Ppe::SafetyGoggles),
            measurements: LabMeasurements::seeded(),
            user_density: 3.5,
            mineral: Mineral::Chalcopyrite,
            justification: "Within the chalcopyrite range.".to_owned(),
            label: SampleLabel::for_session(SampleId::derive(started_at), started_at),
            started_at,
        };
        draft
            .freeze(
                "A concise report.".to_owned(),
                100,
                started_at + Duration::minutes(9),
            )
            .unwrap()
    }

    #[tokio::test]
    async fn round_trips_a_frozen_record() {
        let repo = InMemoryRepository::new();
        let record = build_record();
        repo.append_record(&record).await.unwrap();

        let row = repo.load_latest().await.unwrap().unwrap();
        assert_eq!(row.into_record().unwrap(), record);
    }

    #[tokio::test]
    async fn empty_store_loads_nothing() {
        let repo = InMemoryRepository::new();
        assert!(repo.load_latest().await.unwrap().is_none());
    }

    #[test]
    fn malformed_rows_fail_rehydration() {
        let base = ProgressRow::from_record(&build_record());

        let mut partial = base.clone();
        partial.completed = false;
        assert!(partial.into_record().is_err());

        let mut inflated = base.clone();
        inflated.score = 120;
        assert!(inflated.into_record().is_err());

        let mut drifted = base.clone();
        drifted.apparent_density = 9.0;
        assert!(drifted.into_record().is_err());

        let mut inconsistent = base;
        inconsistent.safety_correct = false;
        assert!(inconsistent.into_record().is_err());
    }
}
