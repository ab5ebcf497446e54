// flow-backend/src/storage/seed.rs
//! Demo dataset loaded into a fresh store.

use super::{Storage, StorageResult};
use crate::models::{
    NewProject, NewTask, NewTimeEntry, NewUser, SettingsChanges, TimeEntryChanges,
};
use chrono::{DateTime, Duration, Utc};

pub const DEMO_USERNAME: &str = "demouser";
pub const DEMO_PASSWORD: &str = "password";

/// Seeds the demo dataset unless the store already has users.
///
/// Returns whether anything was written. `password_hash` is the hashed form
/// of [`DEMO_PASSWORD`].
pub async fn seed_if_empty(storage: &dyn Storage, password_hash: String) -> StorageResult<bool> {
    if storage.has_users().await? {
        log::info!("Store already has users, skipping demo data");
        return Ok(false);
    }
    seed_demo_data(storage, password_hash, Utc::now()).await?;
    Ok(true)
}

pub async fn seed_demo_data(
    storage: &dyn Storage,
    password_hash: String,
    now: DateTime<Utc>,
) -> StorageResult<()> {
    let tomorrow = now + Duration::days(1);
    let yesterday = now - Duration::days(1);

    let user = storage
        .create_user(NewUser {
            username: DEMO_USERNAME.to_string(),
            password: password_hash,
            email: Some("user@example.com".to_string()),
            display_name: Some("Demo User".to_string()),
            avatar: None,
        })
        .await?;

    let mut project_ids = Vec::with_capacity(3);
    for (name, description, color) in [
        (
            "Flow App UI/UX Design",
            "Design and implement the user interface for the Flow application",
            "#8B5CF6",
        ),
        ("Client Project", "Work for client X", "#EC4899"),
        ("Personal", "Personal tasks and activities", "#3B82F6"),
    ] {
        let project = storage
            .create_project(NewProject {
                user_id: user.id,
                name: name.to_string(),
                description: Some(description.to_string()),
                color: Some(color.to_string()),
            })
            .await?;
        project_ids.push(project.id);
    }

    let task_specs = [
        (
            "Implement Time Tracker UI",
            "Create the user interface for time tracking feature",
            project_ids[0],
            "in-progress",
            180,
            62,
            tomorrow,
            now,
        ),
        (
            "Create wireframes for dashboard",
            "Design wireframes for the main dashboard",
            project_ids[0],
            "pending",
            120,
            0,
            now,
            now,
        ),
        (
            "Client feedback meeting",
            "Discuss progress and get feedback from the client",
            project_ids[1],
            "upcoming",
            60,
            0,
            now,
            now,
        ),
        (
            "Research design trends",
            "Research current design trends for UI/UX",
            project_ids[0],
            "completed",
            90,
            100,
            yesterday,
            yesterday,
        ),
    ];

    let mut task_ids = Vec::with_capacity(task_specs.len());
    for (title, description, project_id, status, estimated, progress, due, created) in task_specs {
        let task = storage
            .create_task(NewTask {
                user_id: user.id,
                project_id: Some(project_id),
                title: title.to_string(),
                description: Some(description.to_string()),
                status: status.to_string(),
                estimated_time: Some(estimated),
                progress,
                due_date: Some(due),
                created_at: created,
            })
            .await?;
        task_ids.push(task.id);
    }

    let running = storage
        .start_time_entry(NewTimeEntry {
            user_id: user.id,
            task_id: Some(task_ids[0]),
            project_id: Some(project_ids[0]),
            start_time: now - Duration::minutes(90),
            end_time: None,
            duration: Some(5400),
            description: Some("Working on time tracker UI".to_string()),
        })
        .await?;

    storage
        .start_time_entry(NewTimeEntry {
            user_id: user.id,
            task_id: Some(task_ids[3]),
            project_id: Some(project_ids[0]),
            start_time: yesterday,
            end_time: Some(yesterday + Duration::minutes(75)),
            duration: Some(4500),
            description: Some("Completed research on design trends".to_string()),
        })
        .await?;

    // Inserting the finished entry auto-closed the running one; reopen it.
    storage
        .update_time_entry(
            running.id,
            TimeEntryChanges {
                end_time: Some(None),
                duration: Some(Some(5400)),
                ..Default::default()
            },
        )
        .await?;

    storage
        .update_settings(user.id, SettingsChanges::default())
        .await?;

    log::info!("Seeded demo data for user '{}' (id {})", DEMO_USERNAME, user.id);
    Ok(())
}
