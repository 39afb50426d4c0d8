use sqlx::Row;
use std::collections::BTreeSet;

use lab_core::model::{Equipment, Mineral, Ppe, ProgressRecord};

use super::SqliteRepository;
use crate::repository::{ProgressRepository, ProgressRow, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn u8_from_i64(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn map_row(row: &sqlx::sqlite::SqliteRow) -> Result<ProgressRow, StorageError> {
    let equipment: BTreeSet<Equipment> =
        serde_json::from_str(row.try_get::<String, _>("equipment").map_err(ser)?.as_str())
            .map_err(ser)?;
    let safety_answer: Ppe =
        serde_json::from_str(row.try_get::<String, _>("safety_answer").map_err(ser)?.as_str())
            .map_err(ser)?;
    let mineral: Mineral =
        serde_json::from_str(row.try_get::<String, _>("mineral").map_err(ser)?.as_str())
            .map_err(ser)?;

    Ok(ProgressRow {
        name: row.try_get("name").map_err(ser)?,
        course: row.try_get("course").map_err(ser)?,
        avatar: u8_from_i64("avatar", row.try_get::<i64, _>("avatar").map_err(ser)?)?,
        equipment,
        procedure: row.try_get("procedure").map_err(ser)?,
        feedback: row.try_get("feedback").map_err(ser)?,
        safety_answer,
        safety_correct: row.try_get("safety_correct").map_err(ser)?,
        mass: row.try_get("mass").map_err(ser)?,
        initial_volume: row.try_get("initial_volume").map_err(ser)?,
        final_volume: row.try_get("final_volume").map_err(ser)?,
        apparent_density: row.try_get("apparent_density").map_err(ser)?,
        user_density: row.try_get("user_density").map_err(ser)?,
        mineral,
        justification: row.try_get("justification").map_err(ser)?,
        sample_id: row.try_get("sample_id").map_err(ser)?,
        label_date: row.try_get("label_date").map_err(ser)?,
        material: row.try_get("material").map_err(ser)?,
        report: row.try_get("report").map_err(ser)?,
        score: u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        completed: row.try_get("completed").map_err(ser)?,
        started_at: row.try_get("started_at").map_err(ser)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
    })
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn append_record(&self, record: &ProgressRecord) -> Result<i64, StorageError> {
        let row = ProgressRow::from_record(record);
        let equipment = serde_json::to_string(&row.equipment).map_err(ser)?;
        let safety_answer = serde_json::to_string(&row.safety_answer).map_err(ser)?;
        let mineral = serde_json::to_string(&row.mineral).map_err(ser)?;

        let res = sqlx::query(
            r"
                INSERT INTO progress_records (
                    name, course, avatar, equipment, procedure, feedback,
                    safety_answer, safety_correct,
                    mass, initial_volume, final_volume, apparent_density,
                    user_density, mineral, justification,
                    sample_id, label_date, material,
                    report, score, completed, started_at, completed_at
                )
                VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                    ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23
                )
            ",
        )
        .bind(&row.name)
        .bind(&row.course)
        .bind(i64::from(row.avatar))
        .bind(equipment)
        .bind(&row.procedure)
        .bind(&row.feedback)
        .bind(safety_answer)
        .bind(row.safety_correct)
        .bind(row.mass)
        .bind(row.initial_volume)
        .bind(row.final_volume)
        .bind(row.apparent_density)
        .bind(row.user_density)
        .bind(mineral)
        .bind(&row.justification)
        .bind(&row.sample_id)
        .bind(&row.label_date)
        .bind(&row.material)
        .bind(&row.report)
        .bind(i64::from(row.score))
        .bind(row.completed)
        .bind(row.started_at)
        .bind(row.completed_at)
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn load_latest(&self) -> Result<Option<ProgressRow>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    name, course, avatar, equipment, procedure, feedback,
                    safety_answer, safety_correct,
                    mass, initial_volume, final_volume, apparent_density,
                    user_density, mineral, justification,
                    sample_id, label_date, material,
                    report, score, completed, started_at, completed_at
                FROM progress_records
                ORDER BY id DESC
                LIMIT 1
            ",
        )
        .fetch_optional(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_row).transpose()
    }
}
