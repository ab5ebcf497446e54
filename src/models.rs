// flow-backend/src/models.rs
use crate::schema::{events, files, projects, settings, tasks, time_entries, tracks, users};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

/// Task states accepted by validation. `upcoming` is kept because the demo
/// dataset (and older clients) use it alongside the three workflow states.
pub const TASK_STATUSES: [&str; 4] = ["pending", "in-progress", "completed", "upcoming"];
pub const DEFAULT_TASK_STATUS: &str = "pending";
pub const COMPLETED_TASK_STATUS: &str = "completed";

pub const THEMES: [&str; 3] = ["light", "dark", "system"];
pub const DEFAULT_THEME: &str = "dark";
pub const DEFAULT_TRACK_SOURCE: &str = "spotify";

// Distinguishes an absent field (None) from an explicit JSON null (Some(None))
// for nullable columns in partial updates.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn validate_task_status(status: &str) -> Result<(), ValidationError> {
    if TASK_STATUSES.contains(&status) {
        Ok(())
    } else {
        let mut err = ValidationError::new("task_status");
        err.message = Some(
            format!(
                "status must be one of {}, got '{}'",
                TASK_STATUSES.join(", "),
                status
            )
            .into(),
        );
        Err(err)
    }
}

fn validate_theme(theme: &str) -> Result<(), ValidationError> {
    if THEMES.contains(&theme) {
        Ok(())
    } else {
        let mut err = ValidationError::new("theme");
        err.message = Some(format!("theme must be one of {}", THEMES.join(", ")).into());
        Err(err)
    }
}

fn validate_date_order(
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
) -> Result<(), ValidationError> {
    match end {
        Some(end) if end < start => {
            let mut err = ValidationError::new("date_order");
            err.message = Some("endDate cannot be before startDate".into());
            Err(err)
        }
        _ => Ok(()),
    }
}

// --- User Model ---
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub username: String,
    // Argon2 PHC string.
    #[serde(skip_serializing, default)]
    pub password: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
}

// --- Project Model ---
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = projects)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = projects)]
pub struct NewProject {
    pub user_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(AsChangeset, Deserialize, Validate, Debug, Clone, Default)]
#[diesel(table_name = projects)]
#[serde(rename_all = "camelCase")]
pub struct ProjectChanges {
    #[validate(length(min = 1, message = "name cannot be empty"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub color: Option<Option<String>>,
}

impl ProjectChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.color.is_none()
    }

    pub fn apply_to(self, project: &mut Project) {
        if let Some(name) = self.name {
            project.name = name;
        }
        if let Some(description) = self.description {
            project.description = description;
        }
        if let Some(color) = self.color {
            project.color = color;
        }
    }
}

// --- Task Model ---
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i32,
    pub user_id: i32,
    pub project_id: Option<i32>,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    /// Minutes.
    pub estimated_time: Option<i32>,
    /// Percent, 0 to 100.
    pub progress: i32,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = tasks)]
pub struct NewTask {
    pub user_id: i32,
    pub project_id: Option<i32>,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub estimated_time: Option<i32>,
    pub progress: i32,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(AsChangeset, Deserialize, Validate, Debug, Clone, Default)]
#[diesel(table_name = tasks)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_task_changes"))]
pub struct TaskChanges {
    #[serde(default, deserialize_with = "deserialize_some")]
    pub project_id: Option<Option<i32>>,
    #[validate(length(min = 1, message = "title cannot be empty"))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    #[validate(custom(function = "validate_task_status"))]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub estimated_time: Option<Option<i32>>,
    #[validate(range(min = 0, max = 100, message = "progress must be between 0 and 100"))]
    pub progress: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

fn validate_task_changes(changes: &TaskChanges) -> Result<(), ValidationError> {
    if let Some(Some(minutes)) = changes.estimated_time {
        if minutes < 0 {
            let mut err = ValidationError::new("estimated_time");
            err.message = Some("estimatedTime cannot be negative".into());
            return Err(err);
        }
    }
    Ok(())
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.project_id.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.estimated_time.is_none()
            && self.progress.is_none()
            && self.due_date.is_none()
    }

    pub fn apply_to(self, task: &mut Task) {
        if let Some(project_id) = self.project_id {
            task.project_id = project_id;
        }
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(estimated_time) = self.estimated_time {
            task.estimated_time = estimated_time;
        }
        if let Some(progress) = self.progress {
            task.progress = progress;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
    }
}

// --- TimeEntry Model ---
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = time_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: i32,
    pub user_id: i32,
    pub task_id: Option<i32>,
    pub project_id: Option<i32>,
    pub start_time: DateTime<Utc>,
    /// `None` while the entry is running.
    pub end_time: Option<DateTime<Utc>>,
    /// Seconds.
    pub duration: Option<i32>,
    pub description: Option<String>,
}

impl TimeEntry {
    pub fn is_running(&self) -> bool {
        self.end_time.is_none()
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = time_entries)]
pub struct NewTimeEntry {
    pub user_id: i32,
    pub task_id: Option<i32>,
    pub project_id: Option<i32>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<i32>,
    pub description: Option<String>,
}

/// Whole seconds between two instants, floored.
pub fn elapsed_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> i32 {
    let seconds = (end - start).num_milliseconds().div_euclid(1000);
    seconds.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

#[derive(AsChangeset, Deserialize, Validate, Debug, Clone, Default)]
#[diesel(table_name = time_entries)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_time_entry_changes"))]
pub struct TimeEntryChanges {
    #[serde(default, deserialize_with = "deserialize_some")]
    pub task_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub project_id: Option<Option<i32>>,
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub end_time: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub duration: Option<Option<i32>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
}

fn validate_time_entry_changes(changes: &TimeEntryChanges) -> Result<(), ValidationError> {
    if let Some(Some(seconds)) = changes.duration {
        if seconds < 0 {
            let mut err = ValidationError::new("duration");
            err.message = Some("duration cannot be negative".into());
            return Err(err);
        }
    }
    Ok(())
}

impl TimeEntryChanges {
    /// Closes an entry at `end_time` with the given duration.
    pub fn close(end_time: DateTime<Utc>, duration: i32) -> Self {
        TimeEntryChanges {
            end_time: Some(Some(end_time)),
            duration: Some(Some(duration)),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.task_id.is_none()
            && self.project_id.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.duration.is_none()
            && self.description.is_none()
    }

    pub fn apply_to(self, entry: &mut TimeEntry) {
        if let Some(task_id) = self.task_id {
            entry.task_id = task_id;
        }
        if let Some(project_id) = self.project_id {
            entry.project_id = project_id;
        }
        if let Some(start_time) = self.start_time {
            entry.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            entry.end_time = end_time;
        }
        if let Some(duration) = self.duration {
            entry.duration = duration;
        }
        if let Some(description) = self.description {
            entry.description = description;
        }
    }
}

// --- File Model ---
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = files)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: i32,
    pub user_id: i32,
    pub task_id: Option<i32>,
    pub project_id: Option<i32>,
    pub filename: String,
    pub path: String,
    /// Bytes.
    pub size: i64,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = files)]
pub struct NewFile {
    pub user_id: i32,
    pub task_id: Option<i32>,
    pub project_id: Option<i32>,
    pub filename: String,
    pub path: String,
    pub size: i64,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
}

// --- Event Model ---
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub all_day: bool,
    pub task_id: Option<i32>,
    pub project_id: Option<i32>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = events)]
pub struct NewEvent {
    pub user_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub all_day: bool,
    pub task_id: Option<i32>,
    pub project_id: Option<i32>,
}

#[derive(AsChangeset, Deserialize, Validate, Debug, Clone, Default)]
#[diesel(table_name = events)]
#[serde(rename_all = "camelCase")]
pub struct EventChanges {
    #[validate(length(min = 1, message = "title cannot be empty"))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub all_day: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub task_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub project_id: Option<Option<i32>>,
}

impl EventChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.all_day.is_none()
            && self.task_id.is_none()
            && self.project_id.is_none()
    }

    /// Checks the date range the event would have once these changes land.
    pub fn validate_against(&self, event: &Event) -> Result<(), ValidationError> {
        let start = self.start_date.unwrap_or(event.start_date);
        let end = match self.end_date {
            Some(end) => end,
            None => event.end_date,
        };
        validate_date_order(start, end)
    }

    pub fn apply_to(self, event: &mut Event) {
        if let Some(title) = self.title {
            event.title = title;
        }
        if let Some(description) = self.description {
            event.description = description;
        }
        if let Some(start_date) = self.start_date {
            event.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            event.end_date = end_date;
        }
        if let Some(all_day) = self.all_day {
            event.all_day = all_day;
        }
        if let Some(task_id) = self.task_id {
            event.task_id = task_id;
        }
        if let Some(project_id) = self.project_id {
            event.project_id = project_id;
        }
    }
}

// --- Track Model ---
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = tracks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: i32,
    pub user_id: i32,
    /// Identifier on the music provider's side.
    pub track_id: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub album_cover: Option<String>,
    pub duration: Option<i32>,
    pub source: String,
    pub added_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = tracks)]
pub struct NewTrack {
    pub user_id: i32,
    pub track_id: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub album_cover: Option<String>,
    pub duration: Option<i32>,
    pub source: String,
    pub added_at: DateTime<Utc>,
}

// --- Settings Model ---
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = settings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub id: i32,
    pub user_id: i32,
    pub theme: String,
    pub notifications_enabled: bool,
    pub minimize_to_tray: bool,
    pub preferences: serde_json::Value,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = settings)]
pub struct NewSettings {
    pub user_id: i32,
    pub theme: String,
    pub notifications_enabled: bool,
    pub minimize_to_tray: bool,
    pub preferences: serde_json::Value,
}

impl NewSettings {
    pub fn defaults(user_id: i32) -> Self {
        NewSettings {
            user_id,
            theme: DEFAULT_THEME.to_string(),
            notifications_enabled: true,
            minimize_to_tray: true,
            preferences: serde_json::json!({}),
        }
    }
}

#[derive(AsChangeset, Deserialize, Validate, Debug, Clone, Default)]
#[diesel(table_name = settings)]
#[serde(rename_all = "camelCase")]
pub struct SettingsChanges {
    #[validate(custom(function = "validate_theme"))]
    pub theme: Option<String>,
    pub notifications_enabled: Option<bool>,
    pub minimize_to_tray: Option<bool>,
    pub preferences: Option<serde_json::Value>,
}

impl SettingsChanges {
    pub fn is_empty(&self) -> bool {
        self.theme.is_none()
            && self.notifications_enabled.is_none()
            && self.minimize_to_tray.is_none()
            && self.preferences.is_none()
    }

    pub fn apply_to(self, settings: &mut Settings) {
        if let Some(theme) = self.theme {
            settings.theme = theme;
        }
        if let Some(notifications_enabled) = self.notifications_enabled {
            settings.notifications_enabled = notifications_enabled;
        }
        if let Some(minimize_to_tray) = self.minimize_to_tray {
            settings.minimize_to_tray = minimize_to_tray;
        }
        if let Some(preferences) = self.preferences {
            settings.preferences = preferences;
        }
    }
}

// --- PAYLOAD DTOs ---

#[derive(Deserialize, Validate, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    #[validate(length(min = 3, max = 64, message = "username must be 3 to 64 characters"))]
    pub username: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    #[validate(email(message = "email is not a valid address"))]
    pub email: Option<String>,
    #[validate(length(min = 2, message = "displayName must be at least 2 characters"))]
    pub display_name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Deserialize, Validate, Debug)]
pub struct LoginPayload {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Deserialize, Validate, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectPayload {
    #[validate(length(min = 1, message = "name cannot be empty"))]
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Deserialize, Validate, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskPayload {
    pub project_id: Option<i32>,
    #[validate(length(min = 1, message = "title cannot be empty"))]
    pub title: String,
    pub description: Option<String>,
    #[validate(custom(function = "validate_task_status"))]
    pub status: Option<String>,
    #[validate(range(min = 0, message = "estimatedTime cannot be negative"))]
    pub estimated_time: Option<i32>,
    #[validate(range(min = 0, max = 100, message = "progress must be between 0 and 100"))]
    pub progress: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Validate, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateTimeEntryPayload {
    pub task_id: Option<i32>,
    pub project_id: Option<i32>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    #[validate(range(min = 0, message = "duration cannot be negative"))]
    pub duration: Option<i32>,
    pub description: Option<String>,
}

#[derive(Deserialize, Validate, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateFilePayload {
    pub task_id: Option<i32>,
    pub project_id: Option<i32>,
    #[validate(length(min = 1, message = "filename cannot be empty"))]
    pub filename: String,
    #[validate(length(min = 1, message = "path cannot be empty"))]
    pub path: String,
    #[validate(range(min = 0, message = "size cannot be negative"))]
    pub size: i64,
    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "type cannot be empty"))]
    pub mime_type: String,
}

/// Body of the simulated upload endpoint; every field has a fallback.
#[derive(Deserialize, Validate, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UploadFilePayload {
    pub task_id: Option<i32>,
    pub project_id: Option<i32>,
    #[validate(length(min = 1, message = "filename cannot be empty"))]
    pub filename: Option<String>,
    #[validate(range(min = 0, message = "size cannot be negative"))]
    pub size: Option<i64>,
    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "type cannot be empty"))]
    pub mime_type: Option<String>,
}

#[derive(Deserialize, Validate, Debug)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_create_event"))]
pub struct CreateEventPayload {
    #[validate(length(min = 1, message = "title cannot be empty"))]
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub all_day: Option<bool>,
    pub task_id: Option<i32>,
    pub project_id: Option<i32>,
}

fn validate_create_event(payload: &CreateEventPayload) -> Result<(), ValidationError> {
    validate_date_order(payload.start_date, payload.end_date)
}

#[derive(Deserialize, Validate, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateTrackPayload {
    #[validate(length(min = 1, message = "trackId cannot be empty"))]
    pub track_id: String,
    #[validate(length(min = 1, message = "title cannot be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "artist cannot be empty"))]
    pub artist: String,
    pub album: Option<String>,
    pub album_cover: Option<String>,
    #[validate(range(min = 0, message = "duration cannot be negative"))]
    pub duration: Option<i32>,
    pub source: Option<String>,
}
