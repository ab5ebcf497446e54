// flow-backend/src/storage/mod.rs
//! Data access layer.
//!
//! Handlers only ever talk to [`Storage`]. Two backends implement it with
//! identical observable behavior: [`MemStorage`] keeps everything in process
//! memory, [`PgStorage`] persists to PostgreSQL through diesel-async. The
//! backend is chosen once at startup from configuration.

mod memory;
mod postgres;
pub mod seed;

pub use memory::MemStorage;
pub use postgres::PgStorage;

use crate::models::{
    Event, EventChanges, FileRecord, NewEvent, NewFile, NewProject, NewTask, NewTimeEntry,
    NewTrack, NewUser, Project, ProjectChanges, Settings, SettingsChanges, Task, TaskChanges,
    TimeEntry, TimeEntryChanges, Track, User,
};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Pool error: {0}")]
    Pool(String),
}

impl StorageError {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        StorageError::NotFound { entity, id }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// One contract, two backends.
///
/// Getters return `Ok(None)` for a missing record; updates and deletes
/// return [`StorageError::NotFound`] and leave the store untouched. Lists
/// are ordered by id.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Short backend name reported by the health check.
    fn backend_name(&self) -> &'static str;

    async fn ping(&self) -> StorageResult<()>;

    // Users
    async fn has_users(&self) -> StorageResult<bool>;
    async fn get_user(&self, id: i32) -> StorageResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>>;
    /// Fails with [`StorageError::Conflict`] when the username is taken.
    async fn create_user(&self, user: NewUser) -> StorageResult<User>;

    // Projects
    async fn list_projects(&self, owner: i32) -> StorageResult<Vec<Project>>;
    async fn get_project(&self, id: i32) -> StorageResult<Option<Project>>;
    async fn create_project(&self, project: NewProject) -> StorageResult<Project>;
    async fn update_project(&self, id: i32, changes: ProjectChanges) -> StorageResult<Project>;
    /// Removes the time entries and tasks carrying this project id, then the
    /// project. Entries that only reference one of the removed tasks are kept.
    async fn delete_project(&self, id: i32) -> StorageResult<()>;

    // Tasks
    async fn list_tasks(&self, owner: i32) -> StorageResult<Vec<Task>>;
    async fn get_task(&self, id: i32) -> StorageResult<Option<Task>>;
    async fn list_tasks_by_project(&self, project_id: i32) -> StorageResult<Vec<Task>>;
    async fn create_task(&self, task: NewTask) -> StorageResult<Task>;
    async fn update_task(&self, id: i32, changes: TaskChanges) -> StorageResult<Task>;
    /// Removes the task's time entries, then the task.
    async fn delete_task(&self, id: i32) -> StorageResult<()>;

    // Time entries
    async fn list_time_entries(&self, owner: i32) -> StorageResult<Vec<TimeEntry>>;
    async fn get_time_entry(&self, id: i32) -> StorageResult<Option<TimeEntry>>;
    async fn list_time_entries_by_task(&self, task_id: i32) -> StorageResult<Vec<TimeEntry>>;
    async fn list_time_entries_by_project(&self, project_id: i32)
        -> StorageResult<Vec<TimeEntry>>;
    /// The owner's running entry (no end time). If several exist, the one
    /// started last wins.
    async fn current_time_entry(&self, owner: i32) -> StorageResult<Option<TimeEntry>>;
    /// Closes the owner's running entry (end = now, duration = now - start in
    /// whole seconds) and inserts the new one, atomically.
    async fn start_time_entry(&self, entry: NewTimeEntry) -> StorageResult<TimeEntry>;
    async fn update_time_entry(
        &self,
        id: i32,
        changes: TimeEntryChanges,
    ) -> StorageResult<TimeEntry>;
    async fn delete_time_entry(&self, id: i32) -> StorageResult<()>;

    // Files
    async fn list_files(&self, owner: i32) -> StorageResult<Vec<FileRecord>>;
    async fn get_file(&self, id: i32) -> StorageResult<Option<FileRecord>>;
    async fn list_files_by_task(&self, task_id: i32) -> StorageResult<Vec<FileRecord>>;
    async fn list_files_by_project(&self, project_id: i32) -> StorageResult<Vec<FileRecord>>;
    async fn create_file(&self, file: NewFile) -> StorageResult<FileRecord>;
    async fn delete_file(&self, id: i32) -> StorageResult<()>;

    // Events
    async fn list_events(&self, owner: i32) -> StorageResult<Vec<Event>>;
    async fn get_event(&self, id: i32) -> StorageResult<Option<Event>>;
    async fn create_event(&self, event: NewEvent) -> StorageResult<Event>;
    async fn update_event(&self, id: i32, changes: EventChanges) -> StorageResult<Event>;
    async fn delete_event(&self, id: i32) -> StorageResult<()>;

    // Tracks
    async fn list_tracks(&self, owner: i32) -> StorageResult<Vec<Track>>;
    async fn get_track(&self, id: i32) -> StorageResult<Option<Track>>;
    async fn create_track(&self, track: NewTrack) -> StorageResult<Track>;
    async fn delete_track(&self, id: i32) -> StorageResult<()>;

    // Settings
    async fn get_settings(&self, user_id: i32) -> StorageResult<Option<Settings>>;
    /// Upsert: a row with default values is created first if none exists.
    async fn update_settings(
        &self,
        user_id: i32,
        changes: SettingsChanges,
    ) -> StorageResult<Settings>;
}
