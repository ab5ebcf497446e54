// flow-backend/src/storage/memory.rs
use super::{Storage, StorageError, StorageResult};
use crate::models::{
    elapsed_seconds, Event, EventChanges, FileRecord, NewEvent, NewFile, NewProject,
    NewSettings, NewTask, NewTimeEntry, NewTrack, NewUser, Project, ProjectChanges, Settings,
    SettingsChanges, Task, TaskChanges, TimeEntry, TimeEntryChanges, Track, User,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

/// Last id handed out per table, mirroring a SERIAL column.
#[derive(Debug, Default)]
struct Sequences {
    users: i32,
    projects: i32,
    tasks: i32,
    time_entries: i32,
    files: i32,
    events: i32,
    tracks: i32,
    settings: i32,
}

fn next_id(sequence: &mut i32) -> i32 {
    *sequence += 1;
    *sequence
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    projects: BTreeMap<i32, Project>,
    tasks: BTreeMap<i32, Task>,
    time_entries: BTreeMap<i32, TimeEntry>,
    files: BTreeMap<i32, FileRecord>,
    events: BTreeMap<i32, Event>,
    tracks: BTreeMap<i32, Track>,
    settings: BTreeMap<i32, Settings>,
    sequences: Sequences,
}

fn select<T: Clone>(table: &BTreeMap<i32, T>, predicate: impl Fn(&T) -> bool) -> Vec<T> {
    table.values().filter(|row| predicate(row)).cloned().collect()
}

fn remove_or_not_found<T>(
    table: &mut BTreeMap<i32, T>,
    entity: &'static str,
    id: i32,
) -> StorageResult<()> {
    table
        .remove(&id)
        .map(|_| ())
        .ok_or(StorageError::not_found(entity, id))
}

impl Tables {
    fn open_entry_ids(&self, owner: i32) -> Vec<i32> {
        self.time_entries
            .values()
            .filter(|entry| entry.user_id == owner && entry.is_running())
            .map(|entry| entry.id)
            .collect()
    }

    fn settings_for(&self, user_id: i32) -> Option<&Settings> {
        self.settings.values().find(|row| row.user_id == user_id)
    }
}

/// Process-memory backend. All tables sit behind one lock, so every
/// operation (including the close-then-insert of a new time entry) is atomic.
#[derive(Debug, Default)]
pub struct MemStorage {
    tables: Mutex<Tables>,
}

impl MemStorage {
    /// An empty store; see [`crate::storage::seed`] for the demo dataset.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemStorage {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn has_users(&self) -> StorageResult<bool> {
        Ok(!self.tables.lock().await.users.is_empty())
    }

    async fn get_user(&self, id: i32) -> StorageResult<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> StorageResult<User> {
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StorageError::Conflict(format!(
                "Username '{}' already exists",
                user.username
            )));
        }
        let id = next_id(&mut tables.sequences.users);
        let created = User {
            id,
            username: user.username,
            password: user.password,
            email: user.email,
            display_name: user.display_name,
            avatar: user.avatar,
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn list_projects(&self, owner: i32) -> StorageResult<Vec<Project>> {
        let tables = self.tables.lock().await;
        Ok(select(&tables.projects, |p| p.user_id == owner))
    }

    async fn get_project(&self, id: i32) -> StorageResult<Option<Project>> {
        Ok(self.tables.lock().await.projects.get(&id).cloned())
    }

    async fn create_project(&self, project: NewProject) -> StorageResult<Project> {
        let mut tables = self.tables.lock().await;
        let id = next_id(&mut tables.sequences.projects);
        let created = Project {
            id,
            user_id: project.user_id,
            name: project.name,
            description: project.description,
            color: project.color,
        };
        tables.projects.insert(id, created.clone());
        Ok(created)
    }

    async fn update_project(&self, id: i32, changes: ProjectChanges) -> StorageResult<Project> {
        let mut tables = self.tables.lock().await;
        let project = tables
            .projects
            .get_mut(&id)
            .ok_or(StorageError::not_found("Project", id))?;
        changes.apply_to(project);
        Ok(project.clone())
    }

    async fn delete_project(&self, id: i32) -> StorageResult<()> {
        let mut tables = self.tables.lock().await;
        if !tables.projects.contains_key(&id) {
            return Err(StorageError::not_found("Project", id));
        }
        tables
            .time_entries
            .retain(|_, entry| entry.project_id != Some(id));
        tables.tasks.retain(|_, task| task.project_id != Some(id));
        tables.projects.remove(&id);
        Ok(())
    }

    async fn list_tasks(&self, owner: i32) -> StorageResult<Vec<Task>> {
        let tables = self.tables.lock().await;
        Ok(select(&tables.tasks, |t| t.user_id == owner))
    }

    async fn get_task(&self, id: i32) -> StorageResult<Option<Task>> {
        Ok(self.tables.lock().await.tasks.get(&id).cloned())
    }

    async fn list_tasks_by_project(&self, project_id: i32) -> StorageResult<Vec<Task>> {
        let tables = self.tables.lock().await;
        Ok(select(&tables.tasks, |t| t.project_id == Some(project_id)))
    }

    async fn create_task(&self, task: NewTask) -> StorageResult<Task> {
        let mut tables = self.tables.lock().await;
        let id = next_id(&mut tables.sequences.tasks);
        let created = Task {
            id,
            user_id: task.user_id,
            project_id: task.project_id,
            title: task.title,
            description: task.description,
            status: task.status,
            estimated_time: task.estimated_time,
            progress: task.progress,
            due_date: task.due_date,
            created_at: task.created_at,
        };
        tables.tasks.insert(id, created.clone());
        Ok(created)
    }

    async fn update_task(&self, id: i32, changes: TaskChanges) -> StorageResult<Task> {
        let mut tables = self.tables.lock().await;
        let task = tables
            .tasks
            .get_mut(&id)
            .ok_or(StorageError::not_found("Task", id))?;
        changes.apply_to(task);
        Ok(task.clone())
    }

    async fn delete_task(&self, id: i32) -> StorageResult<()> {
        let mut tables = self.tables.lock().await;
        if !tables.tasks.contains_key(&id) {
            return Err(StorageError::not_found("Task", id));
        }
        tables
            .time_entries
            .retain(|_, entry| entry.task_id != Some(id));
        tables.tasks.remove(&id);
        Ok(())
    }

    async fn list_time_entries(&self, owner: i32) -> StorageResult<Vec<TimeEntry>> {
        let tables = self.tables.lock().await;
        Ok(select(&tables.time_entries, |e| e.user_id == owner))
    }

    async fn get_time_entry(&self, id: i32) -> StorageResult<Option<TimeEntry>> {
        Ok(self.tables.lock().await.time_entries.get(&id).cloned())
    }

    async fn list_time_entries_by_task(&self, task_id: i32) -> StorageResult<Vec<TimeEntry>> {
        let tables = self.tables.lock().await;
        Ok(select(&tables.time_entries, |e| e.task_id == Some(task_id)))
    }

    async fn list_time_entries_by_project(
        &self,
        project_id: i32,
    ) -> StorageResult<Vec<TimeEntry>> {
        let tables = self.tables.lock().await;
        Ok(select(&tables.time_entries, |e| {
            e.project_id == Some(project_id)
        }))
    }

    async fn current_time_entry(&self, owner: i32) -> StorageResult<Option<TimeEntry>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .time_entries
            .values()
            .filter(|entry| entry.user_id == owner && entry.is_running())
            .max_by_key(|entry| (entry.start_time, entry.id))
            .cloned())
    }

    async fn start_time_entry(&self, entry: NewTimeEntry) -> StorageResult<TimeEntry> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        for open_id in tables.open_entry_ids(entry.user_id) {
            if let Some(open) = tables.time_entries.get_mut(&open_id) {
                open.end_time = Some(now);
                open.duration = Some(elapsed_seconds(open.start_time, now));
                log::debug!("Auto-closed time entry {} ({:?}s)", open.id, open.duration);
            }
        }

        let id = next_id(&mut tables.sequences.time_entries);
        let created = TimeEntry {
            id,
            user_id: entry.user_id,
            task_id: entry.task_id,
            project_id: entry.project_id,
            start_time: entry.start_time,
            end_time: entry.end_time,
            duration: entry.duration,
            description: entry.description,
        };
        tables.time_entries.insert(id, created.clone());
        Ok(created)
    }

    async fn update_time_entry(
        &self,
        id: i32,
        changes: TimeEntryChanges,
    ) -> StorageResult<TimeEntry> {
        let mut tables = self.tables.lock().await;
        let entry = tables
            .time_entries
            .get_mut(&id)
            .ok_or(StorageError::not_found("TimeEntry", id))?;
        changes.apply_to(entry);
        Ok(entry.clone())
    }

    async fn delete_time_entry(&self, id: i32) -> StorageResult<()> {
        let mut tables = self.tables.lock().await;
        remove_or_not_found(&mut tables.time_entries, "TimeEntry", id)
    }

    async fn list_files(&self, owner: i32) -> StorageResult<Vec<FileRecord>> {
        let tables = self.tables.lock().await;
        Ok(select(&tables.files, |f| f.user_id == owner))
    }

    async fn get_file(&self, id: i32) -> StorageResult<Option<FileRecord>> {
        Ok(self.tables.lock().await.files.get(&id).cloned())
    }

    async fn list_files_by_task(&self, task_id: i32) -> StorageResult<Vec<FileRecord>> {
        let tables = self.tables.lock().await;
        Ok(select(&tables.files, |f| f.task_id == Some(task_id)))
    }

    async fn list_files_by_project(&self, project_id: i32) -> StorageResult<Vec<FileRecord>> {
        let tables = self.tables.lock().await;
        Ok(select(&tables.files, |f| f.project_id == Some(project_id)))
    }

    async fn create_file(&self, file: NewFile) -> StorageResult<FileRecord> {
        let mut tables = self.tables.lock().await;
        let id = next_id(&mut tables.sequences.files);
        let created = FileRecord {
            id,
            user_id: file.user_id,
            task_id: file.task_id,
            project_id: file.project_id,
            filename: file.filename,
            path: file.path,
            size: file.size,
            mime_type: file.mime_type,
            uploaded_at: file.uploaded_at,
        };
        tables.files.insert(id, created.clone());
        Ok(created)
    }

    async fn delete_file(&self, id: i32) -> StorageResult<()> {
        let mut tables = self.tables.lock().await;
        remove_or_not_found(&mut tables.files, "File", id)
    }

    async fn list_events(&self, owner: i32) -> StorageResult<Vec<Event>> {
        let tables = self.tables.lock().await;
        Ok(select(&tables.events, |e| e.user_id == owner))
    }

    async fn get_event(&self, id: i32) -> StorageResult<Option<Event>> {
        Ok(self.tables.lock().await.events.get(&id).cloned())
    }

    async fn create_event(&self, event: NewEvent) -> StorageResult<Event> {
        let mut tables = self.tables.lock().await;
        let id = next_id(&mut tables.sequences.events);
        let created = Event {
            id,
            user_id: event.user_id,
            title: event.title,
            description: event.description,
            start_date: event.start_date,
            end_date: event.end_date,
            all_day: event.all_day,
            task_id: event.task_id,
            project_id: event.project_id,
        };
        tables.events.insert(id, created.clone());
        Ok(created)
    }

    async fn update_event(&self, id: i32, changes: EventChanges) -> StorageResult<Event> {
        let mut tables = self.tables.lock().await;
        let event = tables
            .events
            .get_mut(&id)
            .ok_or(StorageError::not_found("Event", id))?;
        changes.apply_to(event);
        Ok(event.clone())
    }

    async fn delete_event(&self, id: i32) -> StorageResult<()> {
        let mut tables = self.tables.lock().await;
        remove_or_not_found(&mut tables.events, "Event", id)
    }

    async fn list_tracks(&self, owner: i32) -> StorageResult<Vec<Track>> {
        let tables = self.tables.lock().await;
        Ok(select(&tables.tracks, |t| t.user_id == owner))
    }

    async fn get_track(&self, id: i32) -> StorageResult<Option<Track>> {
        Ok(self.tables.lock().await.tracks.get(&id).cloned())
    }

    async fn create_track(&self, track: NewTrack) -> StorageResult<Track> {
        let mut tables = self.tables.lock().await;
        let id = next_id(&mut tables.sequences.tracks);
        let created = Track {
            id,
            user_id: track.user_id,
            track_id: track.track_id,
            title: track.title,
            artist: track.artist,
            album: track.album,
            album_cover: track.album_cover,
            duration: track.duration,
            source: track.source,
            added_at: track.added_at,
        };
        tables.tracks.insert(id, created.clone());
        Ok(created)
    }

    async fn delete_track(&self, id: i32) -> StorageResult<()> {
        let mut tables = self.tables.lock().await;
        remove_or_not_found(&mut tables.tracks, "Track", id)
    }

    async fn get_settings(&self, user_id: i32) -> StorageResult<Option<Settings>> {
        Ok(self.tables.lock().await.settings_for(user_id).cloned())
    }

    async fn update_settings(
        &self,
        user_id: i32,
        changes: SettingsChanges,
    ) -> StorageResult<Settings> {
        let mut tables = self.tables.lock().await;
        let id = match tables.settings_for(user_id) {
            Some(existing) => existing.id,
            None => {
                let id = next_id(&mut tables.sequences.settings);
                let defaults = NewSettings::defaults(user_id);
                tables.settings.insert(
                    id,
                    Settings {
                        id,
                        user_id,
                        theme: defaults.theme,
                        notifications_enabled: defaults.notifications_enabled,
                        minimize_to_tray: defaults.minimize_to_tray,
                        preferences: defaults.preferences,
                    },
                );
                id
            }
        };
        let settings = tables
            .settings
            .get_mut(&id)
            .ok_or(StorageError::not_found("Settings", id))?;
        changes.apply_to(settings);
        Ok(settings.clone())
    }
}
