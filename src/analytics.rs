// flow-backend/src/analytics.rs
//! Dashboard statistics computed from a user's tasks and time entries.
//!
//! Everything here is a pure function over records already loaded through
//! the storage layer, so both backends report identical numbers.

use crate::error_handler::ServiceError;
use crate::models::{Project, Task, TimeEntry, COMPLETED_TASK_STATUS};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQueryPeriod {
    pub period: Option<String>,
    #[serde(alias = "start_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(alias = "end_date")]
    pub end_date: Option<NaiveDate>,
}

/// Inclusive range of UTC calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        let day = instant.date_naive();
        self.start <= day && day <= self.end
    }
}

fn current_week(today: NaiveDate) -> DateRange {
    let week = today.week(Weekday::Mon);
    DateRange {
        start: week.first_day(),
        end: week.last_day(),
    }
}

pub fn calculate_date_range(
    query: &AnalyticsQueryPeriod,
    today: NaiveDate,
) -> Result<DateRange, ServiceError> {
    match (query.start_date, query.end_date) {
        (Some(start), Some(end)) => {
            if start > end {
                return Err(ServiceError::BadRequest(
                    "startDate cannot be after endDate".to_string(),
                ));
            }
            return Ok(DateRange { start, end });
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err(ServiceError::BadRequest(
                "startDate and endDate must be provided together".to_string(),
            ));
        }
        (None, None) => {}
    }

    match query.period.as_deref() {
        None | Some("this_week") => Ok(current_week(today)),
        Some("last_7_days") => Ok(DateRange {
            start: today - Duration::days(6),
            end: today,
        }),
        Some("this_month") => {
            let start = today - Duration::days(i64::from(today.day0()));
            let end = start
                .checked_add_months(Months::new(1))
                .and_then(|next| next.pred_opt())
                .ok_or_else(|| {
                    ServiceError::InternalServerError("Date out of range".to_string())
                })?;
            Ok(DateRange { start, end })
        }
        Some("last_30_days") => Ok(DateRange {
            start: today - Duration::days(29),
            end: today,
        }),
        Some(other) => Err(ServiceError::BadRequest(format!(
            "Invalid period specified: {}. Supported: this_week, last_7_days, this_month, last_30_days or provide startDate & endDate.",
            other
        ))),
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub upcoming_tasks: usize,
    pub tasks_due_today: usize,
    pub total_tracked_seconds: i64,
    pub active_entry_id: Option<i32>,
}

pub fn summary(tasks: &[Task], entries: &[TimeEntry], now: DateTime<Utc>) -> Summary {
    let today = now.date_naive();
    let is_completed = |task: &&Task| task.status == COMPLETED_TASK_STATUS;

    let active_entry_id = entries
        .iter()
        .filter(|entry| entry.is_running())
        .max_by_key(|entry| (entry.start_time, entry.id))
        .map(|entry| entry.id);

    Summary {
        total_tasks: tasks.len(),
        completed_tasks: tasks.iter().filter(is_completed).count(),
        upcoming_tasks: tasks
            .iter()
            .filter(|task| !is_completed(task))
            .filter(|task| task.due_date.is_some_and(|due| due > now))
            .count(),
        tasks_due_today: tasks
            .iter()
            .filter(|task| task.due_date.is_some_and(|due| due.date_naive() == today))
            .count(),
        total_tracked_seconds: entries
            .iter()
            .filter_map(|entry| entry.duration)
            .map(i64::from)
            .sum(),
        active_entry_id,
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeByProjectStat {
    pub project_id: i32,
    pub project_name: String,
    pub color: Option<String>,
    pub total_duration_seconds: i64,
}

/// Tracked seconds per project, largest first. An entry without its own
/// project counts toward its task's project.
pub fn time_by_project(
    projects: &[Project],
    tasks: &[Task],
    entries: &[TimeEntry],
    range: DateRange,
) -> Vec<TimeByProjectStat> {
    let task_projects: HashMap<i32, i32> = tasks
        .iter()
        .filter_map(|task| task.project_id.map(|project_id| (task.id, project_id)))
        .collect();

    let mut totals: HashMap<i32, i64> = HashMap::new();
    for entry in entries.iter().filter(|e| range.contains(e.start_time)) {
        let project_id = entry.project_id.or_else(|| {
            entry
                .task_id
                .and_then(|task_id| task_projects.get(&task_id).copied())
        });
        if let Some(project_id) = project_id {
            *totals.entry(project_id).or_default() += i64::from(entry.duration.unwrap_or(0));
        }
    }

    let mut stats: Vec<TimeByProjectStat> = projects
        .iter()
        .filter_map(|project| {
            totals.get(&project.id).map(|total| TimeByProjectStat {
                project_id: project.id,
                project_name: project.name.clone(),
                color: project.color.clone(),
                total_duration_seconds: *total,
            })
        })
        .collect();
    stats.sort_by(|a, b| {
        b.total_duration_seconds
            .cmp(&a.total_duration_seconds)
            .then(a.project_id.cmp(&b.project_id))
    });
    stats
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProductivityTrendPoint {
    pub date_point: NaiveDate,
    pub total_duration_seconds: i64,
}

/// Tracked seconds per UTC day, oldest first. Days without entries are omitted.
pub fn productivity_trend(entries: &[TimeEntry], range: DateRange) -> Vec<ProductivityTrendPoint> {
    let mut per_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for entry in entries.iter().filter(|e| range.contains(e.start_time)) {
        *per_day.entry(entry.start_time.date_naive()).or_default() +=
            i64::from(entry.duration.unwrap_or(0));
    }

    per_day
        .into_iter()
        .map(|(date_point, total_duration_seconds)| ProductivityTrendPoint {
            date_point,
            total_duration_seconds,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn task(id: i32, project_id: Option<i32>, status: &str, due: Option<DateTime<Utc>>) -> Task {
        Task {
            id,
            user_id: 1,
            project_id,
            title: format!("task {}", id),
            description: None,
            status: status.to_string(),
            estimated_time: None,
            progress: 0,
            due_date: due,
            created_at: at(2025, 1, 1, 0),
        }
    }

    fn entry(
        id: i32,
        task_id: Option<i32>,
        project_id: Option<i32>,
        start: DateTime<Utc>,
        duration: Option<i32>,
    ) -> TimeEntry {
        TimeEntry {
            id,
            user_id: 1,
            task_id,
            project_id,
            start_time: start,
            end_time: duration.map(|secs| start + Duration::seconds(i64::from(secs))),
            duration,
            description: None,
        }
    }

    fn project(id: i32, name: &str) -> Project {
        Project {
            id,
            user_id: 1,
            name: name.to_string(),
            description: None,
            color: None,
        }
    }

    fn query(period: Option<&str>, start: Option<NaiveDate>, end: Option<NaiveDate>) -> AnalyticsQueryPeriod {
        AnalyticsQueryPeriod {
            period: period.map(str::to_string),
            start_date: start,
            end_date: end,
        }
    }

    #[test]
    fn default_period_is_the_current_monday_week() {
        // 2025-06-12 is a Thursday.
        let range = calculate_date_range(&query(None, None, None), day(2025, 6, 12)).unwrap();
        assert_eq!(range.start, day(2025, 6, 9));
        assert_eq!(range.end, day(2025, 6, 15));
    }

    #[test]
    fn month_and_rolling_periods() {
        let today = day(2024, 12, 20);
        let month = calculate_date_range(&query(Some("this_month"), None, None), today).unwrap();
        assert_eq!(month, DateRange { start: day(2024, 12, 1), end: day(2024, 12, 31) });

        let leap = calculate_date_range(&query(Some("this_month"), None, None), day(2024, 2, 10))
            .unwrap();
        assert_eq!(leap.end, day(2024, 2, 29));

        let week = calculate_date_range(&query(Some("last_7_days"), None, None), today).unwrap();
        assert_eq!(week.start, day(2024, 12, 14));
        let thirty = calculate_date_range(&query(Some("last_30_days"), None, None), today).unwrap();
        assert_eq!(thirty.start, day(2024, 11, 21));
    }

    #[test]
    fn explicit_range_wins_and_is_checked() {
        let today = day(2025, 6, 12);
        let range = calculate_date_range(
            &query(Some("bogus"), Some(day(2025, 1, 1)), Some(day(2025, 1, 31))),
            today,
        )
        .unwrap();
        assert_eq!(range.end, day(2025, 1, 31));

        assert!(matches!(
            calculate_date_range(&query(None, Some(day(2025, 2, 1)), Some(day(2025, 1, 1))), today),
            Err(ServiceError::BadRequest(_))
        ));
        assert!(matches!(
            calculate_date_range(&query(None, Some(day(2025, 2, 1)), None), today),
            Err(ServiceError::BadRequest(_))
        ));
        assert!(matches!(
            calculate_date_range(&query(Some("fortnight"), None, None), today),
            Err(ServiceError::BadRequest(_))
        ));
    }

    #[test]
    fn summary_counts() {
        let now = at(2025, 6, 12, 9);
        let tasks = vec![
            task(1, None, "completed", Some(at(2025, 6, 20, 0))),
            task(2, None, "pending", Some(at(2025, 6, 12, 17))),
            task(3, None, "upcoming", Some(at(2025, 7, 1, 0))),
            task(4, None, "in-progress", Some(at(2025, 6, 1, 0))),
            task(5, None, "pending", None),
        ];
        let entries = vec![
            entry(1, Some(2), None, at(2025, 6, 11, 9), Some(3600)),
            entry(2, Some(3), None, at(2025, 6, 12, 8), None),
            entry(3, Some(3), None, at(2025, 6, 12, 7), None),
        ];

        let stats = summary(&tasks, &entries, now);
        assert_eq!(stats.total_tasks, 5);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.upcoming_tasks, 2);
        assert_eq!(stats.tasks_due_today, 1);
        assert_eq!(stats.total_tracked_seconds, 3600);
        assert_eq!(stats.active_entry_id, Some(2));
    }

    #[test]
    fn time_by_project_inherits_task_project_and_respects_range() {
        let projects = vec![project(1, "Work"), project(2, "Home"), project(3, "Idle")];
        let tasks = vec![task(10, Some(2), "pending", None)];
        let range = DateRange { start: day(2025, 6, 9), end: day(2025, 6, 15) };
        let entries = vec![
            entry(1, None, Some(1), at(2025, 6, 10, 9), Some(1800)),
            entry(2, Some(10), None, at(2025, 6, 10, 11), Some(3600)),
            entry(3, None, Some(1), at(2025, 6, 1, 9), Some(9999)),
            entry(4, None, None, at(2025, 6, 10, 9), Some(500)),
        ];

        let stats = time_by_project(&projects, &tasks, &entries, range);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].project_name, "Home");
        assert_eq!(stats[0].total_duration_seconds, 3600);
        assert_eq!(stats[1].project_id, 1);
        assert_eq!(stats[1].total_duration_seconds, 1800);
    }

    #[test]
    fn trend_groups_by_utc_day() {
        let range = DateRange { start: day(2025, 6, 9), end: day(2025, 6, 15) };
        let entries = vec![
            entry(1, None, None, at(2025, 6, 11, 23), Some(600)),
            entry(2, None, None, at(2025, 6, 10, 9), Some(60)),
            entry(3, None, None, at(2025, 6, 10, 10), Some(40)),
            entry(4, None, None, at(2025, 6, 16, 10), Some(40)),
        ];

        let trend = productivity_trend(&entries, range);
        assert_eq!(
            trend,
            vec![
                ProductivityTrendPoint { date_point: day(2025, 6, 10), total_duration_seconds: 100 },
                ProductivityTrendPoint { date_point: day(2025, 6, 11), total_duration_seconds: 600 },
            ]
        );
    }
}
