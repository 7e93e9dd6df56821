use diesel::prelude::*;
use tempfile::tempdir;

use gym_journal_bot::store::{ExerciseInput, JournalStore, MuscleGroup, MuscleGroupInsert, REST_NOTE};

async fn open_store(dir: &tempfile::TempDir) -> (JournalStore, String) {
    let db_path = dir.path().join("journal.db").to_string_lossy().to_string();
    let store = JournalStore::new(&db_path).await.expect("open store");
    (store, db_path)
}

fn inserted(insert: &MuscleGroupInsert) -> &MuscleGroup {
    match insert {
        MuscleGroupInsert::Added(group) | MuscleGroupInsert::AlreadyAdded(group) => group,
    }
}

#[derive(QueryableByName)]
struct CountRow {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    count: i64,
}

fn count_rows(db_path: &str, table: &str) -> i64 {
    let mut conn = gym_journal_bot::db::open_connection_sync(db_path).unwrap();
    diesel::sql_query(format!("SELECT COUNT(*) AS count FROM {table}"))
        .get_result::<CountRow>(&mut conn)
        .unwrap()
        .count
}

#[tokio::test]
async fn users_are_created_once_per_external_id() {
    let dir = tempdir().unwrap();
    let (store, db_path) = open_store(&dir).await;

    let first = store.get_or_create_user(100, Some("Ann")).await.unwrap();
    let again = store.get_or_create_user(100, Some("Ann B.")).await.unwrap();

    assert_eq!(first, again);
    assert_eq!(first.name.as_deref(), Some("Ann"));
    assert_eq!(count_rows(&db_path, "users"), 1);
    assert!(store.find_user(200).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_plan_names_create_separate_rows() {
    let dir = tempdir().unwrap();
    let (store, _db_path) = open_store(&dir).await;
    let user = store.get_or_create_user(1, None).await.unwrap();

    let a = store.create_plan(user.id, "Leg Day").await.unwrap();
    let b = store.create_plan(user.id, "Leg Day").await.unwrap();

    assert_ne!(a.id, b.id);
    let plans = store.list_plans(user.id).await.unwrap();
    assert_eq!(plans.len(), 2);
    assert!(plans.iter().all(|plan| plan.name == "Leg Day"));
}

#[tokio::test]
async fn muscle_groups_are_unique_per_day() {
    let dir = tempdir().unwrap();
    let (store, _db_path) = open_store(&dir).await;
    let user = store.get_or_create_user(1, None).await.unwrap();
    let plan = store.create_plan(user.id, "Split").await.unwrap();
    let monday = store.create_day(plan.id, "Пн").await.unwrap();
    let tuesday = store.create_day(plan.id, "Вт").await.unwrap();

    let first = store.add_muscle_group(monday.id, "Ноги").await.unwrap();
    let second = store.add_muscle_group(monday.id, "Ноги").await.unwrap();
    let other_day = store.add_muscle_group(tuesday.id, "Ноги").await.unwrap();

    assert!(matches!(first, MuscleGroupInsert::Added(_)));
    assert!(matches!(second, MuscleGroupInsert::AlreadyAdded(_)));
    assert_eq!(inserted(&first).id, inserted(&second).id);
    assert!(matches!(other_day, MuscleGroupInsert::Added(_)));
    assert_eq!(store.list_muscle_groups(monday.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn mark_rest_sets_the_note() {
    let dir = tempdir().unwrap();
    let (store, _db_path) = open_store(&dir).await;
    let user = store.get_or_create_user(1, None).await.unwrap();
    let plan = store.create_plan(user.id, "Split").await.unwrap();
    let day = store.create_day(plan.id, "Сб").await.unwrap();
    assert!(!day.is_rest());

    let rested = store.mark_rest(day.id).await.unwrap().expect("day exists");
    assert_eq!(rested.note.as_deref(), Some(REST_NOTE));
    assert!(rested.is_rest());
    assert!(store.mark_rest(day.id + 100).await.unwrap().is_none());
}

#[tokio::test]
async fn load_plan_groups_muscles_under_their_days() {
    let dir = tempdir().unwrap();
    let (store, _db_path) = open_store(&dir).await;
    let user = store.get_or_create_user(1, None).await.unwrap();
    let plan = store.create_plan(user.id, "Split").await.unwrap();
    let monday = store.create_day(plan.id, "Пн").await.unwrap();
    let wednesday = store.create_day(plan.id, "Ср").await.unwrap();
    store.add_muscle_group(monday.id, "Грудь").await.unwrap();
    store.add_muscle_group(wednesday.id, "Спина").await.unwrap();
    store.add_muscle_group(monday.id, "Руки").await.unwrap();

    let detail = store.load_plan(plan.id).await.unwrap().expect("plan exists");
    let names: Vec<(String, Vec<String>)> = detail
        .days
        .iter()
        .map(|day| {
            (
                day.day.weekday.clone(),
                day.muscle_groups.iter().map(|g| g.name.clone()).collect(),
            )
        })
        .collect();
    assert_eq!(
        names,
        vec![
            ("Пн".to_string(), vec!["Грудь".to_string(), "Руки".to_string()]),
            ("Ср".to_string(), vec!["Спина".to_string()]),
        ]
    );
}

#[tokio::test]
async fn delete_plan_removes_every_descendant() {
    let dir = tempdir().unwrap();
    let (store, db_path) = open_store(&dir).await;
    let user = store.get_or_create_user(1, None).await.unwrap();
    let keep = store.create_plan(user.id, "Keep").await.unwrap();
    let doomed = store.create_plan(user.id, "Doomed").await.unwrap();

    let kept_day = store.create_day(keep.id, "Пт").await.unwrap();
    store.add_muscle_group(kept_day.id, "Плечи").await.unwrap();

    let day = store.create_day(doomed.id, "Пн").await.unwrap();
    let group = store.add_muscle_group(day.id, "Ноги").await.unwrap();
    store
        .add_exercise(
            inserted(&group).id,
            &ExerciseInput {
                name: "Присед".to_string(),
                sets: Some(5),
                reps: Some(5),
                weight: Some(100),
            },
        )
        .await
        .unwrap();
    assert_eq!(count_rows(&db_path, "exercises"), 1);

    let deleted = store.delete_plan(doomed.id).await.unwrap().expect("deleted");
    assert_eq!(deleted.name, "Doomed");

    assert!(store.load_plan(doomed.id).await.unwrap().is_none());
    assert!(store.find_day(day.id).await.unwrap().is_none());
    assert_eq!(count_rows(&db_path, "exercises"), 0);
    assert_eq!(count_rows(&db_path, "workout_days"), 1);
    assert_eq!(count_rows(&db_path, "muscle_groups"), 1);

    let remaining = store.list_plans(user.id).await.unwrap();
    assert_eq!(remaining, vec![keep]);
    assert!(store.delete_plan(doomed.id).await.unwrap().is_none());
}

#[tokio::test]
async fn exercises_round_trip_under_a_muscle_group() {
    let dir = tempdir().unwrap();
    let (store, _db_path) = open_store(&dir).await;
    let user = store.get_or_create_user(1, None).await.unwrap();
    let plan = store.create_plan(user.id, "Split").await.unwrap();
    let day = store.create_day(plan.id, "Чт").await.unwrap();
    let group = store.add_muscle_group(day.id, "Спина").await.unwrap();
    let group_id = inserted(&group).id;

    let created = store
        .add_exercise(
            group_id,
            &ExerciseInput {
                name: "Тяга".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(created.name, "Тяга");
    assert_eq!(created.sets, None);
    assert_eq!(store.list_exercises(group_id).await.unwrap(), vec![created]);
}
