// flow-backend/src/handlers/mod.rs
pub mod analytics_handlers;
pub mod auth_handlers;
pub mod event_handlers;
pub mod file_handlers;
pub mod project_handlers;
pub mod settings_handlers;
pub mod spotify_handlers;
pub mod task_handlers;
pub mod time_entry_handlers;
pub mod track_handlers;

use crate::auth_utils::AuthenticatedUser;
use crate::error_handler::ServiceError;
use crate::models::{Event, FileRecord, Project, Task, TimeEntry, Track};
use crate::storage::{Storage, StorageError};

/// A record that belongs to exactly one user.
pub(crate) trait Owned {
    const ENTITY: &'static str;
    fn owner_id(&self) -> i32;
}

macro_rules! impl_owned {
    ($($ty:ty => $entity:literal),* $(,)?) => {
        $(impl Owned for $ty {
            const ENTITY: &'static str = $entity;
            fn owner_id(&self) -> i32 {
                self.user_id
            }
        })*
    };
}

impl_owned! {
    Project => "Project",
    Task => "Task",
    TimeEntry => "TimeEntry",
    FileRecord => "File",
    Event => "Event",
    Track => "Track",
}

/// Turns a lookup result into the caller's record. Someone else's record is
/// reported exactly like a missing one.
pub(crate) fn owned<T: Owned>(
    record: Option<T>,
    user: &AuthenticatedUser,
    id: i32,
) -> Result<T, ServiceError> {
    match record {
        Some(record) if record.owner_id() == user.id => Ok(record),
        _ => Err(StorageError::not_found(T::ENTITY, id).into()),
    }
}

/// Checks that the task and project a payload points at exist and belong to
/// the caller.
pub(crate) async fn ensure_references(
    storage: &dyn Storage,
    user: &AuthenticatedUser,
    task_id: Option<i32>,
    project_id: Option<i32>,
) -> Result<(), ServiceError> {
    if let Some(task_id) = task_id {
        owned(storage.get_task(task_id).await?, user, task_id)?;
    }
    if let Some(project_id) = project_id {
        owned(storage.get_project(project_id).await?, user, project_id)?;
    }
    Ok(())
}
