use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use diesel::prelude::*;
use diesel_async::pooled_connection::bb8::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::RunQueryDsl;
use serde::Serialize;

use crate::db::{self, SqliteAsyncConn, SqlitePool, SqlitePooledConn};
use crate::error::{GymJournalError, Result};

mod schema;
use schema::{exercises, muscle_groups, users, workout_days, workout_plans};

/// Note value that marks a day as a rest day.
pub const REST_NOTE: &str = "Отдых";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Queryable)]
pub struct User {
    pub id: i32,
    pub external_id: i64,
    pub name: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Queryable)]
pub struct Plan {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Queryable)]
pub struct Day {
    pub id: i32,
    pub plan_id: i32,
    pub weekday: String,
    pub note: Option<String>,
    pub created_at: i64,
}

impl Day {
    pub fn is_rest(&self) -> bool {
        self.note.as_deref() == Some(REST_NOTE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Queryable)]
pub struct MuscleGroup {
    pub id: i32,
    pub day_id: i32,
    pub name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Queryable)]
pub struct Exercise {
    pub id: i32,
    pub muscle_group_id: i32,
    pub name: String,
    pub sets: Option<i32>,
    pub reps: Option<i32>,
    pub weight: Option<i32>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ExerciseInput {
    pub name: String,
    pub sets: Option<i32>,
    pub reps: Option<i32>,
    pub weight: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayDetail {
    pub day: Day,
    pub muscle_groups: Vec<MuscleGroup>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanDetail {
    pub plan: Plan,
    pub days: Vec<DayDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MuscleGroupInsert {
    Added(MuscleGroup),
    AlreadyAdded(MuscleGroup),
}

#[derive(Insertable)]
#[diesel(table_name = users)]
struct NewUser<'a> {
    external_id: i64,
    name: Option<&'a str>,
    created_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = workout_plans)]
struct NewPlan<'a> {
    user_id: i32,
    name: &'a str,
    created_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = workout_days)]
struct NewDay<'a> {
    plan_id: i32,
    weekday: &'a str,
    note: Option<&'a str>,
    created_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = muscle_groups)]
struct NewMuscleGroup<'a> {
    day_id: i32,
    name: &'a str,
    created_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = exercises)]
struct NewExercise<'a> {
    muscle_group_id: i32,
    name: &'a str,
    sets: Option<i32>,
    reps: Option<i32>,
    weight: Option<i32>,
    created_at: i64,
}

/// Users, plans, days, muscle groups and exercises in one SQLite file.
///
/// Every operation checks out its own pooled connection and gives it back
/// before returning; nothing holds a connection across calls.
pub struct JournalStore {
    pool: SqlitePool,
}

impl JournalStore {
    pub async fn new(sqlite_path: impl AsRef<str>) -> Result<Self> {
        let sqlite_path = sqlite_path.as_ref();
        db::ensure_parent_dir(sqlite_path)?;
        db::run_migrations(sqlite_path).await?;

        let manager = AsyncDieselConnectionManager::<SqliteAsyncConn>::new(sqlite_path);
        let pool: SqlitePool = Pool::builder()
            .build(manager)
            .await
            .map_err(|e| GymJournalError::Storage(e.to_string()))?;
        Ok(Self { pool })
    }

    pub async fn get_or_create_user(&self, external_id: i64, name: Option<&str>) -> Result<User> {
        let mut conn = self.conn().await?;
        if let Some(user) = find_user_by_external_id(&mut conn, external_id).await? {
            return Ok(user);
        }

        let new = NewUser {
            external_id,
            name,
            created_at: now_ts(),
        };
        diesel::insert_or_ignore_into(users::table)
            .values(&new)
            .execute(&mut conn)
            .await
            .map_err(|e| GymJournalError::Storage(e.to_string()))?;

        let user = find_user_by_external_id(&mut conn, external_id)
            .await?
            .ok_or_else(|| {
                GymJournalError::Storage(format!("user {external_id} missing after insert"))
            })?;
        tracing::info!(user_id = user.id, external_id, "Registered user");
        Ok(user)
    }

    pub async fn find_user(&self, external_id: i64) -> Result<Option<User>> {
        let mut conn = self.conn().await?;
        find_user_by_external_id(&mut conn, external_id).await
    }

    pub async fn create_plan(&self, user_id: i32, name: &str) -> Result<Plan> {
        let new = NewPlan {
            user_id,
            name,
            created_at: now_ts(),
        };

        let mut conn = self.conn().await?;
        diesel::insert_into(workout_plans::table)
            .values(&new)
            .execute(&mut conn)
            .await
            .map_err(|e| GymJournalError::Storage(e.to_string()))?;

        let plan: Plan = workout_plans::table
            .filter(workout_plans::user_id.eq(user_id))
            .order(workout_plans::id.desc())
            .first(&mut conn)
            .await
            .map_err(|e| GymJournalError::Storage(e.to_string()))?;
        tracing::info!(plan_id = plan.id, user_id, "Created workout plan");
        Ok(plan)
    }

    pub async fn list_plans(&self, user_id: i32) -> Result<Vec<Plan>> {
        let mut conn = self.conn().await?;
        workout_plans::table
            .filter(workout_plans::user_id.eq(user_id))
            .order(workout_plans::id.asc())
            .load::<Plan>(&mut conn)
            .await
            .map_err(|e| GymJournalError::Storage(e.to_string()))
    }

    pub async fn find_plan(&self, plan_id: i32) -> Result<Option<Plan>> {
        let mut conn = self.conn().await?;
        find_plan_by_id(&mut conn, plan_id).await
    }

    /// Loads a plan with its days in creation order, each carrying its muscle
    /// groups in creation order.
    pub async fn load_plan(&self, plan_id: i32) -> Result<Option<PlanDetail>> {
        let mut conn = self.conn().await?;
        let Some(plan) = find_plan_by_id(&mut conn, plan_id).await? else {
            return Ok(None);
        };

        let days: Vec<Day> = workout_days::table
            .filter(workout_days::plan_id.eq(plan_id))
            .order(workout_days::id.asc())
            .load(&mut conn)
            .await
            .map_err(|e| GymJournalError::Storage(e.to_string()))?;

        let day_ids: Vec<i32> = days.iter().map(|day| day.id).collect();
        let groups: Vec<MuscleGroup> = if day_ids.is_empty() {
            Vec::new()
        } else {
            muscle_groups::table
                .filter(muscle_groups::day_id.eq_any(&day_ids))
                .order(muscle_groups::id.asc())
                .load(&mut conn)
                .await
                .map_err(|e| GymJournalError::Storage(e.to_string()))?
        };

        let mut by_day: HashMap<i32, Vec<MuscleGroup>> = HashMap::new();
        for group in groups {
            by_day.entry(group.day_id).or_default().push(group);
        }

        let days = days
            .into_iter()
            .map(|day| DayDetail {
                muscle_groups: by_day.remove(&day.id).unwrap_or_default(),
                day,
            })
            .collect();

        Ok(Some(PlanDetail { plan, days }))
    }

    /// Removes the plan together with its days, muscle groups and exercises.
    /// Returns the removed plan, or `None` when it was already gone.
    /// The descendants go in the same statement through `ON DELETE CASCADE`,
    /// which needs `PRAGMA foreign_keys = ON` on the connection.
    pub async fn delete_plan(&self, plan_id: i32) -> Result<Option<Plan>> {
        let mut conn = self.conn().await?;
        let Some(plan) = find_plan_by_id(&mut conn, plan_id).await? else {
            return Ok(None);
        };

        let deleted = diesel::delete(workout_plans::table.filter(workout_plans::id.eq(plan_id)))
            .execute(&mut conn)
            .await
            .map_err(|e| GymJournalError::Storage(e.to_string()))?;
        if deleted == 0 {
            return Ok(None);
        }
        tracing::info!(plan_id, "Deleted workout plan");
        Ok(Some(plan))
    }

    pub async fn create_day(&self, plan_id: i32, weekday: &str) -> Result<Day> {
        let new = NewDay {
            plan_id,
            weekday,
            note: None,
            created_at: now_ts(),
        };

        let mut conn = self.conn().await?;
        diesel::insert_into(workout_days::table)
            .values(&new)
            .execute(&mut conn)
            .await
            .map_err(|e| GymJournalError::Storage(e.to_string()))?;

        let day: Day = workout_days::table
            .filter(workout_days::plan_id.eq(plan_id))
            .order(workout_days::id.desc())
            .first(&mut conn)
            .await
            .map_err(|e| GymJournalError::Storage(e.to_string()))?;
        tracing::info!(day_id = day.id, plan_id, weekday, "Added day to plan");
        Ok(day)
    }

    pub async fn find_day(&self, day_id: i32) -> Result<Option<Day>> {
        let mut conn = self.conn().await?;
        find_day_by_id(&mut conn, day_id).await
    }

    pub async fn mark_rest(&self, day_id: i32) -> Result<Option<Day>> {
        let mut conn = self.conn().await?;
        let updated = diesel::update(workout_days::table.filter(workout_days::id.eq(day_id)))
            .set(workout_days::note.eq(Some(REST_NOTE)))
            .execute(&mut conn)
            .await
            .map_err(|e| GymJournalError::Storage(e.to_string()))?;
        if updated == 0 {
            return Ok(None);
        }
        find_day_by_id(&mut conn, day_id).await
    }

    /// Attaches a muscle group to a day unless one with the same name is
    /// already there.
    pub async fn add_muscle_group(&self, day_id: i32, name: &str) -> Result<MuscleGroupInsert> {
        let mut conn = self.conn().await?;
        if let Some(existing) = find_muscle_group(&mut conn, day_id, name).await? {
            return Ok(MuscleGroupInsert::AlreadyAdded(existing));
        }

        let new = NewMuscleGroup {
            day_id,
            name,
            created_at: now_ts(),
        };
        let inserted = diesel::insert_or_ignore_into(muscle_groups::table)
            .values(&new)
            .execute(&mut conn)
            .await
            .map_err(|e| GymJournalError::Storage(e.to_string()))?;

        let group = find_muscle_group(&mut conn, day_id, name)
            .await?
            .ok_or_else(|| {
                GymJournalError::Storage(format!("muscle group {name} missing after insert"))
            })?;
        if inserted == 0 {
            return Ok(MuscleGroupInsert::AlreadyAdded(group));
        }
        tracing::info!(muscle_group_id = group.id, day_id, name, "Added muscle group");
        Ok(MuscleGroupInsert::Added(group))
    }

    pub async fn list_muscle_groups(&self, day_id: i32) -> Result<Vec<MuscleGroup>> {
        let mut conn = self.conn().await?;
        muscle_groups::table
            .filter(muscle_groups::day_id.eq(day_id))
            .order(muscle_groups::id.asc())
            .load::<MuscleGroup>(&mut conn)
            .await
            .map_err(|e| GymJournalError::Storage(e.to_string()))
    }

    pub async fn add_exercise(
        &self,
        muscle_group_id: i32,
        input: &ExerciseInput,
    ) -> Result<Exercise> {
        let new = NewExercise {
            muscle_group_id,
            name: &input.name,
            sets: input.sets,
            reps: input.reps,
            weight: input.weight,
            created_at: now_ts(),
        };

        let mut conn = self.conn().await?;
        diesel::insert_into(exercises::table)
            .values(&new)
            .execute(&mut conn)
            .await
            .map_err(|e| GymJournalError::Storage(e.to_string()))?;

        exercises::table
            .filter(exercises::muscle_group_id.eq(muscle_group_id))
            .order(exercises::id.desc())
            .first::<Exercise>(&mut conn)
            .await
            .map_err(|e| GymJournalError::Storage(e.to_string()))
    }

    pub async fn list_exercises(&self, muscle_group_id: i32) -> Result<Vec<Exercise>> {
        let mut conn = self.conn().await?;
        exercises::table
            .filter(exercises::muscle_group_id.eq(muscle_group_id))
            .order(exercises::id.asc())
            .load::<Exercise>(&mut conn)
            .await
            .map_err(|e| GymJournalError::Storage(e.to_string()))
    }

    async fn conn(&self) -> Result<SqlitePooledConn<'_>> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| GymJournalError::Storage(e.to_string()))?;
        db::apply_pragmas_async(&mut conn).await?;
        Ok(conn)
    }
}

async fn find_user_by_external_id(
    conn: &mut SqliteAsyncConn,
    external_id: i64,
) -> Result<Option<User>> {
    users::table
        .filter(users::external_id.eq(external_id))
        .first::<User>(conn)
        .await
        .optional()
        .map_err(|e| GymJournalError::Storage(e.to_string()))
}

async fn find_plan_by_id(conn: &mut SqliteAsyncConn, plan_id: i32) -> Result<Option<Plan>> {
    workout_plans::table
        .filter(workout_plans::id.eq(plan_id))
        .first::<Plan>(conn)
        .await
        .optional()
        .map_err(|e| GymJournalError::Storage(e.to_string()))
}

async fn find_day_by_id(conn: &mut SqliteAsyncConn, day_id: i32) -> Result<Option<Day>> {
    workout_days::table
        .filter(workout_days::id.eq(day_id))
        .first::<Day>(conn)
        .await
        .optional()
        .map_err(|e| GymJournalError::Storage(e.to_string()))
}

async fn find_muscle_group(
    conn: &mut SqliteAsyncConn,
    day_id: i32,
    name: &str,
) -> Result<Option<MuscleGroup>> {
    muscle_groups::table
        .filter(muscle_groups::day_id.eq(day_id))
        .filter(muscle_groups::name.eq(name))
        .first::<MuscleGroup>(conn)
        .await
        .optional()
        .map_err(|e| GymJournalError::Storage(e.to_string()))
}

fn now_ts() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
