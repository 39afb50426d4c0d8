use chrono::Duration;
use lab_core::model::{
    AvatarId, Equipment, LabMeasurements, Mineral, Ppe, ProgressRecord, RecordDraft,
    SafetyCheck, SampleId, SampleLabel, StudentIdentity,
};
use lab_core::time::fixed_now;
use storage::repository::ProgressRepository;
use storage::sqlite::SqliteRepository;

fn build_record() -> ProgressRecord {
    let started_at = fixed_now();
    let draft = RecordDraft {
        identity: StudentIdentity::new("Valentina Rojas", "3C TP", AvatarId::new(4).unwrap())
            .unwrap(),
        equipment: Equipment::required_set(),
        procedure: "Weigh the sample, submerge it, read the displaced volume.".to_owned(),
        feedback: "Consider drying the sample first.".to_owned(),
        safety: SafetyCheck::record(Ppe::SafetyGoggles),
        measurements: LabMeasurements::seeded(),
        user_density: 3.52,
        mineral: Mineral::Chalcopyrite,
        justification: "3.50 g/cm³ is nearest to the chalcopyrite range.".to_owned(),
        label: SampleLabel::for_session(SampleId::derive(started_at), started_at),
        started_at,
    };
    draft
        .freeze(
            "The sample was identified as chalcopyrite.".to_owned(),
            100,
            started_at + Duration::minutes(14),
        )
        .unwrap()
}

#[tokio::test]
async fn sqlite_round_trips_a_frozen_record() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let record = build_record();
    let id = repo.append_record(&record).await.expect("append");
    assert!(id > 0);

    let row = repo
        .load_latest()
        .await
        .expect("load")
        .expect("row present");
    assert_eq!(row.sample_id, "CU-OX-0000");
    assert_eq!(row.score, 100);
    assert!(row.completed);
    assert_eq!(row.into_record().expect("rehydrate"), record);
}

#[tokio::test]
async fn sqlite_returns_none_on_empty_store() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_empty?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    assert!(repo.load_latest().await.expect("load").is_none());
}

#[tokio::test]
async fn sqlite_latest_row_wins() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_latest?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let first = build_record();
    repo.append_record(&first).await.expect("append first");

    let started_at = fixed_now() + Duration::hours(1);
    let second = {
        let draft = RecordDraft {
            identity: StudentIdentity::new("Diego Soto", "3C TP", AvatarId::new(1).unwrap())
                .unwrap(),
            equipment: Equipment::required_set(),
            procedure: "Mass first, then displacement.".to_owned(),
            feedback: "Good sequencing.".to_owned(),
            safety: SafetyCheck::record(Ppe::LatexGloves),
            measurements: LabMeasurements::seeded(),
            user_density: 3.49,
            mineral: Mineral::Hematite,
            justification: "Closest value in the table.".to_owned(),
            label: SampleLabel::for_session(SampleId::derive(started_at), started_at),
            started_at,
        };
        draft
            .freeze(
                "Second run report.".to_owned(),
                60,
                started_at + Duration::minutes(5),
            )
            .unwrap()
    };
    repo.append_record(&second).await.expect("append second");

    let row = repo.load_latest().await.expect("load").expect("row");
    assert_eq!(row.name, "Diego Soto");
    assert_eq!(row.into_record().expect("rehydrate"), second);
}
