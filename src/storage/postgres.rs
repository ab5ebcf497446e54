// flow-backend/src/storage/postgres.rs
use super::{Storage, StorageError, StorageResult};
use crate::db::DbPool;
use crate::models::{
    elapsed_seconds, Event, EventChanges, FileRecord, NewEvent, NewFile, NewProject,
    NewSettings, NewTask, NewTimeEntry, NewTrack, NewUser, Project, ProjectChanges, Settings,
    SettingsChanges, Task, TaskChanges, TimeEntry, TimeEntryChanges, Track, User,
};
use crate::schema::{events, files, projects, settings, tasks, time_entries, tracks, users};
use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::pooled_connection::bb8::{PooledConnection, RunError};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};

impl From<RunError> for StorageError {
    fn from(error: RunError) -> Self {
        StorageError::Pool(error.to_string())
    }
}

fn deleted_or_not_found(count: usize, entity: &'static str, id: i32) -> StorageResult<()> {
    if count > 0 {
        Ok(())
    } else {
        Err(StorageError::not_found(entity, id))
    }
}

/// PostgreSQL backend over a bb8 pool of diesel-async connections.
pub struct PgStorage {
    pool: DbPool,
}

impl PgStorage {
    pub fn new(pool: DbPool) -> Self {
        PgStorage { pool }
    }

    async fn conn(&self) -> StorageResult<PooledConnection<'_, AsyncPgConnection>> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl Storage for PgStorage {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> StorageResult<()> {
        let mut conn = self.conn().await?;
        diesel::select(diesel::dsl::sql::<diesel::sql_types::Integer>("1"))
            .get_result::<i32>(&mut conn)
            .await?;
        Ok(())
    }

    async fn has_users(&self) -> StorageResult<bool> {
        let mut conn = self.conn().await?;
        let any = users::table
            .select(users::id)
            .first::<i32>(&mut conn)
            .await
            .optional()?;
        Ok(any.is_some())
    }

    async fn get_user(&self, id: i32) -> StorageResult<Option<User>> {
        let mut conn = self.conn().await?;
        Ok(users::table
            .find(id)
            .select(User::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        let mut conn = self.conn().await?;
        Ok(users::table
            .filter(users::username.eq(username))
            .select(User::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn create_user(&self, user: NewUser) -> StorageResult<User> {
        let mut conn = self.conn().await?;
        diesel::insert_into(users::table)
            .values(&user)
            .returning(User::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|err| match err {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    StorageError::Conflict(format!("Username '{}' already exists", user.username))
                }
                other => StorageError::from(other),
            })
    }

    async fn list_projects(&self, owner: i32) -> StorageResult<Vec<Project>> {
        let mut conn = self.conn().await?;
        Ok(projects::table
            .filter(projects::user_id.eq(owner))
            .order(projects::id.asc())
            .select(Project::as_select())
            .load(&mut conn)
            .await?)
    }

    async fn get_project(&self, id: i32) -> StorageResult<Option<Project>> {
        let mut conn = self.conn().await?;
        Ok(projects::table
            .find(id)
            .select(Project::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn create_project(&self, project: NewProject) -> StorageResult<Project> {
        let mut conn = self.conn().await?;
        Ok(diesel::insert_into(projects::table)
            .values(&project)
            .returning(Project::as_returning())
            .get_result(&mut conn)
            .await?)
    }

    async fn update_project(&self, id: i32, changes: ProjectChanges) -> StorageResult<Project> {
        if changes.is_empty() {
            return self
                .get_project(id)
                .await?
                .ok_or(StorageError::not_found("Project", id));
        }
        let mut conn = self.conn().await?;
        diesel::update(projects::table.find(id))
            .set(&changes)
            .returning(Project::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?
            .ok_or(StorageError::not_found("Project", id))
    }

    async fn delete_project(&self, id: i32) -> StorageResult<()> {
        let mut conn = self.conn().await?;
        conn.transaction::<_, StorageError, _>(move |conn| {
            async move {
                let exists = projects::table
                    .find(id)
                    .select(projects::id)
                    .for_update()
                    .first::<i32>(conn)
                    .await
                    .optional()?;
                if exists.is_none() {
                    return Err(StorageError::not_found("Project", id));
                }
                diesel::delete(time_entries::table.filter(time_entries::project_id.eq(id)))
                    .execute(conn)
                    .await?;
                diesel::delete(tasks::table.filter(tasks::project_id.eq(id)))
                    .execute(conn)
                    .await?;
                diesel::delete(projects::table.find(id)).execute(conn).await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }

    async fn list_tasks(&self, owner: i32) -> StorageResult<Vec<Task>> {
        let mut conn = self.conn().await?;
        Ok(tasks::table
            .filter(tasks::user_id.eq(owner))
            .order(tasks::id.asc())
            .select(Task::as_select())
            .load(&mut conn)
            .await?)
    }

    async fn get_task(&self, id: i32) -> StorageResult<Option<Task>> {
        let mut conn = self.conn().await?;
        Ok(tasks::table
            .find(id)
            .select(Task::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn list_tasks_by_project(&self, project_id: i32) -> StorageResult<Vec<Task>> {
        let mut conn = self.conn().await?;
        Ok(tasks::table
            .filter(tasks::project_id.eq(project_id))
            .order(tasks::id.asc())
            .select(Task::as_select())
            .load(&mut conn)
            .await?)
    }

    async fn create_task(&self, task: NewTask) -> StorageResult<Task> {
        let mut conn = self.conn().await?;
        Ok(diesel::insert_into(tasks::table)
            .values(&task)
            .returning(Task::as_returning())
            .get_result(&mut conn)
            .await?)
    }

    async fn update_task(&self, id: i32, changes: TaskChanges) -> StorageResult<Task> {
        if changes.is_empty() {
            return self
                .get_task(id)
                .await?
                .ok_or(StorageError::not_found("Task", id));
        }
        let mut conn = self.conn().await?;
        diesel::update(tasks::table.find(id))
            .set(&changes)
            .returning(Task::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?
            .ok_or(StorageError::not_found("Task", id))
    }

    async fn delete_task(&self, id: i32) -> StorageResult<()> {
        let mut conn = self.conn().await?;
        conn.transaction::<_, StorageError, _>(move |conn| {
            async move {
                let exists = tasks::table
                    .find(id)
                    .select(tasks::id)
                    .for_update()
                    .first::<i32>(conn)
                    .await
                    .optional()?;
                if exists.is_none() {
                    return Err(StorageError::not_found("Task", id));
                }
                diesel::delete(time_entries::table.filter(time_entries::task_id.eq(id)))
                    .execute(conn)
                    .await?;
                diesel::delete(tasks::table.find(id)).execute(conn).await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }

    async fn list_time_entries(&self, owner: i32) -> StorageResult<Vec<TimeEntry>> {
        let mut conn = self.conn().await?;
        Ok(time_entries::table
            .filter(time_entries::user_id.eq(owner))
            .order(time_entries::id.asc())
            .select(TimeEntry::as_select())
            .load(&mut conn)
            .await?)
    }

    async fn get_time_entry(&self, id: i32) -> StorageResult<Option<TimeEntry>> {
        let mut conn = self.conn().await?;
        Ok(time_entries::table
            .find(id)
            .select(TimeEntry::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn list_time_entries_by_task(&self, task_id: i32) -> StorageResult<Vec<TimeEntry>> {
        let mut conn = self.conn().await?;
        Ok(time_entries::table
            .filter(time_entries::task_id.eq(task_id))
            .order(time_entries::id.asc())
            .select(TimeEntry::as_select())
            .load(&mut conn)
            .await?)
    }

    async fn list_time_entries_by_project(
        &self,
        project_id: i32,
    ) -> StorageResult<Vec<TimeEntry>> {
        let mut conn = self.conn().await?;
        Ok(time_entries::table
            .filter(time_entries::project_id.eq(project_id))
            .order(time_entries::id.asc())
            .select(TimeEntry::as_select())
            .load(&mut conn)
            .await?)
    }

    async fn current_time_entry(&self, owner: i32) -> StorageResult<Option<TimeEntry>> {
        let mut conn = self.conn().await?;
        Ok(time_entries::table
            .filter(time_entries::user_id.eq(owner))
            .filter(time_entries::end_time.is_null())
            .order((time_entries::start_time.desc(), time_entries::id.desc()))
            .select(TimeEntry::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn start_time_entry(&self, entry: NewTimeEntry) -> StorageResult<TimeEntry> {
        let mut conn = self.conn().await?;
        conn.transaction::<_, StorageError, _>(move |conn| {
            async move {
                // Row lock on the owner serializes concurrent starts for one user.
                users::table
                    .find(entry.user_id)
                    .select(users::id)
                    .for_update()
                    .first::<i32>(conn)
                    .await
                    .optional()?;

                let now = Utc::now();
                let running = time_entries::table
                    .filter(time_entries::user_id.eq(entry.user_id))
                    .filter(time_entries::end_time.is_null())
                    .select(TimeEntry::as_select())
                    .load(conn)
                    .await?;
                for open in running {
                    let duration = elapsed_seconds(open.start_time, now);
                    diesel::update(time_entries::table.find(open.id))
                        .set(&TimeEntryChanges::close(now, duration))
                        .execute(conn)
                        .await?;
                    log::debug!("Auto-closed time entry {} ({}s)", open.id, duration);
                }

                let created = diesel::insert_into(time_entries::table)
                    .values(&entry)
                    .returning(TimeEntry::as_returning())
                    .get_result(conn)
                    .await?;
                Ok(created)
            }
            .scope_boxed()
        })
        .await
    }

    async fn update_time_entry(
        &self,
        id: i32,
        changes: TimeEntryChanges,
    ) -> StorageResult<TimeEntry> {
        if changes.is_empty() {
            return self
                .get_time_entry(id)
                .await?
                .ok_or(StorageError::not_found("TimeEntry", id));
        }
        let mut conn = self.conn().await?;
        diesel::update(time_entries::table.find(id))
            .set(&changes)
            .returning(TimeEntry::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?
            .ok_or(StorageError::not_found("TimeEntry", id))
    }

    async fn delete_time_entry(&self, id: i32) -> StorageResult<()> {
        let mut conn = self.conn().await?;
        let deleted = diesel::delete(time_entries::table.find(id))
            .execute(&mut conn)
            .await?;
        deleted_or_not_found(deleted, "TimeEntry", id)
    }

    async fn list_files(&self, owner: i32) -> StorageResult<Vec<FileRecord>> {
        let mut conn = self.conn().await?;
        Ok(files::table
            .filter(files::user_id.eq(owner))
            .order(files::id.asc())
            .select(FileRecord::as_select())
            .load(&mut conn)
            .await?)
    }

    async fn get_file(&self, id: i32) -> StorageResult<Option<FileRecord>> {
        let mut conn = self.conn().await?;
        Ok(files::table
            .find(id)
            .select(FileRecord::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn list_files_by_task(&self, task_id: i32) -> StorageResult<Vec<FileRecord>> {
        let mut conn = self.conn().await?;
        Ok(files::table
            .filter(files::task_id.eq(task_id))
            .order(files::id.asc())
            .select(FileRecord::as_select())
            .load(&mut conn)
            .await?)
    }

    async fn list_files_by_project(&self, project_id: i32) -> StorageResult<Vec<FileRecord>> {
        let mut conn = self.conn().await?;
        Ok(files::table
            .filter(files::project_id.eq(project_id))
            .order(files::id.asc())
            .select(FileRecord::as_select())
            .load(&mut conn)
            .await?)
    }

    async fn create_file(&self, file: NewFile) -> StorageResult<FileRecord> {
        let mut conn = self.conn().await?;
        Ok(diesel::insert_into(files::table)
            .values(&file)
            .returning(FileRecord::as_returning())
            .get_result(&mut conn)
            .await?)
    }

    async fn delete_file(&self, id: i32) -> StorageResult<()> {
        let mut conn = self.conn().await?;
        let deleted = diesel::delete(files::table.find(id))
            .execute(&mut conn)
            .await?;
        deleted_or_not_found(deleted, "File", id)
    }

    async fn list_events(&self, owner: i32) -> StorageResult<Vec<Event>> {
        let mut conn = self.conn().await?;
        Ok(events::table
            .filter(events::user_id.eq(owner))
            .order(events::id.asc())
            .select(Event::as_select())
            .load(&mut conn)
            .await?)
    }

    async fn get_event(&self, id: i32) -> StorageResult<Option<Event>> {
        let mut conn = self.conn().await?;
        Ok(events::table
            .find(id)
            .select(Event::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn create_event(&self, event: NewEvent) -> StorageResult<Event> {
        let mut conn = self.conn().await?;
        Ok(diesel::insert_into(events::table)
            .values(&event)
            .returning(Event::as_returning())
            .get_result(&mut conn)
            .await?)
    }

    async fn update_event(&self, id: i32, changes: EventChanges) -> StorageResult<Event> {
        if changes.is_empty() {
            return self
                .get_event(id)
                .await?
                .ok_or(StorageError::not_found("Event", id));
        }
        let mut conn = self.conn().await?;
        diesel::update(events::table.find(id))
            .set(&changes)
            .returning(Event::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?
            .ok_or(StorageError::not_found("Event", id))
    }

    async fn delete_event(&self, id: i32) -> StorageResult<()> {
        let mut conn = self.conn().await?;
        let deleted = diesel::delete(events::table.find(id))
            .execute(&mut conn)
            .await?;
        deleted_or_not_found(deleted, "Event", id)
    }

    async fn list_tracks(&self, owner: i32) -> StorageResult<Vec<Track>> {
        let mut conn = self.conn().await?;
        Ok(tracks::table
            .filter(tracks::user_id.eq(owner))
            .order(tracks::id.asc())
            .select(Track::as_select())
            .load(&mut conn)
            .await?)
    }

    async fn get_track(&self, id: i32) -> StorageResult<Option<Track>> {
        let mut conn = self.conn().await?;
        Ok(tracks::table
            .find(id)
            .select(Track::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn create_track(&self, track: NewTrack) -> StorageResult<Track> {
        let mut conn = self.conn().await?;
        Ok(diesel::insert_into(tracks::table)
            .values(&track)
            .returning(Track::as_returning())
            .get_result(&mut conn)
            .await?)
    }

    async fn delete_track(&self, id: i32) -> StorageResult<()> {
        let mut conn = self.conn().await?;
        let deleted = diesel::delete(tracks::table.find(id))
            .execute(&mut conn)
            .await?;
        deleted_or_not_found(deleted, "Track", id)
    }

    async fn get_settings(&self, user_id: i32) -> StorageResult<Option<Settings>> {
        let mut conn = self.conn().await?;
        Ok(settings::table
            .filter(settings::user_id.eq(user_id))
            .select(Settings::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn update_settings(
        &self,
        user_id: i32,
        changes: SettingsChanges,
    ) -> StorageResult<Settings> {
        let mut conn = self.conn().await?;
        conn.transaction::<_, StorageError, _>(move |conn| {
            async move {
                diesel::insert_into(settings::table)
                    .values(&NewSettings::defaults(user_id))
                    .on_conflict(settings::user_id)
                    .do_nothing()
                    .execute(conn)
                    .await?;

                let current = settings::table
                    .filter(settings::user_id.eq(user_id))
                    .select(Settings::as_select())
                    .for_update()
                    .first(conn)
                    .await?;
                if changes.is_empty() {
                    return Ok(current);
                }

                let updated = diesel::update(settings::table.find(current.id))
                    .set(&changes)
                    .returning(Settings::as_returning())
                    .get_result(conn)
                    .await?;
                Ok(updated)
            }
            .scope_boxed()
        })
        .await
    }
}
