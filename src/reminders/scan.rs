//! Classify task rows into reminder groups and completion notices.
//!
//! Pure: takes the table snapshot and the current time, returns what to
//! send and which rows to stamp. No I/O.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::board::schema::{HeaderIndex, build_header_index, cell};
use crate::reminders::schedule::{ReminderSchedule, ReminderStage, StageStamps, parse_timestamp};

const UNKNOWN: &str = "Unknown";
const UNASSIGNED: &str = "Unassigned";

/// Trim, lowercase and collapse internal whitespace.
pub fn normalize_recruiter_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Record context shown next to each task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskContext {
    pub task_text: String,
    pub client: String,
    pub candidate: String,
    pub job: String,
}

/// An open task whose reminder stage is due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueTask {
    /// 1-based sheet row number captured during the scan.
    pub row_number: usize,
    pub row: Vec<String>,
    pub stage: ReminderStage,
    pub context: TaskContext,
}

/// Due tasks of one recruiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderGroup {
    /// Normalized recruiter name, also the directory lookup key.
    pub key: String,
    /// First raw spelling seen.
    pub recruiter: String,
    pub tasks: Vec<DueTask>,
}

impl ReminderGroup {
    pub fn subject(&self) -> String {
        format!("Task reminders ({})", self.tasks.len())
    }

    pub fn body(&self, schedule: &ReminderSchedule) -> String {
        let mut lines = vec![
            format!("Hi {},", self.recruiter),
            String::new(),
            "Pending tasks:".to_string(),
        ];
        lines.extend(self.tasks.iter().map(|task| {
            let c = &task.context;
            format!(
                "• [{}] {} — {} · {} · {}",
                schedule.label(task.stage),
                c.task_text,
                c.client,
                c.candidate,
                c.job
            )
        }));
        lines.push(String::new());
        lines.push("Please update the task status when complete.".to_string());
        lines.join("\n")
    }
}

/// A finished task not yet reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTask {
    pub row_number: usize,
    pub row: Vec<String>,
    pub recruiter: String,
    pub context: TaskContext,
}

pub fn completion_subject(tasks: &[CompletedTask]) -> String {
    format!("Tasks completed ({})", tasks.len())
}

pub fn completion_body(tasks: &[CompletedTask]) -> String {
    let mut lines = vec!["Completed tasks:".to_string()];
    lines.extend(tasks.iter().map(|task| {
        let c = &task.context;
        format!(
            "• {} — {} · {} · {} · {}",
            c.task_text, task.recruiter, c.client, c.candidate, c.job
        )
    }));
    lines.join("\n")
}

/// Everything one scan will send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPlan {
    /// Reminder groups in first-seen recruiter order.
    pub groups: Vec<ReminderGroup>,
    pub completed: Vec<CompletedTask>,
}

struct RowView<'a> {
    index: &'a HeaderIndex,
    row: &'a [String],
}

impl RowView<'_> {
    fn get(&self, key: &str) -> &str {
        self.index
            .get(key)
            .map(|&column| cell(self.row, column).trim())
            .unwrap_or("")
    }

    fn or_default<'s>(&'s self, key: &str, fallback: &'s str) -> &'s str {
        let value = self.get(key);
        if value.is_empty() { fallback } else { value }
    }

    fn context(&self) -> TaskContext {
        TaskContext {
            task_text: self.get("tasktext").to_string(),
            client: self.or_default("client", UNKNOWN).to_string(),
            candidate: self.or_default("candidate", UNKNOWN).to_string(),
            job: self.or_default("jobtitle", UNKNOWN).to_string(),
        }
    }

    fn stamps(&self) -> StageStamps {
        StageStamps {
            first: parse_timestamp(self.get("taskfirstnotifiedat")),
            second: parse_timestamp(self.get("tasksecondnotifiedat")),
            third: parse_timestamp(self.get("taskthirdnotifiedat")),
        }
    }
}

/// Classify every data row. `rows[i]` is sheet row `i + 2`.
pub fn plan_scan<S: AsRef<str>>(
    headers: &[S],
    rows: &[Vec<String>],
    now: DateTime<Utc>,
    schedule: &ReminderSchedule,
) -> ScanPlan {
    let index = build_header_index(headers);
    let mut plan = ScanPlan::default();
    let mut group_slots: HashMap<String, usize> = HashMap::new();

    for (i, row) in rows.iter().enumerate() {
        let view = RowView { index: &index, row };
        let row_number = i + 2;
        let status = view.get("taskstatus").to_lowercase();
        let task_text = view.get("tasktext");
        if task_text.is_empty() {
            continue;
        }

        match status.as_str() {
            "open" => {
                let Some(created) = parse_timestamp(view.get("taskcreatedat")) else {
                    continue;
                };
                let Some(stage) = schedule.due_stage(now, created, &view.stamps()) else {
                    continue;
                };
                let recruiter = view.get("recruiter");
                let key = normalize_recruiter_key(recruiter);
                if key.is_empty() {
                    continue;
                }

                let slot = *group_slots.entry(key.clone()).or_insert_with(|| {
                    plan.groups.push(ReminderGroup {
                        key,
                        recruiter: recruiter.to_string(),
                        tasks: Vec::new(),
                    });
                    plan.groups.len() - 1
                });
                plan.groups[slot].tasks.push(DueTask {
                    row_number,
                    row: row.clone(),
                    stage,
                    context: view.context(),
                });
            }
            "done" => {
                if view.get("taskcompletedat").is_empty()
                    || !view.get("taskcompletednotifiedat").is_empty()
                {
                    continue;
                }
                plan.completed.push(CompletedTask {
                    row_number,
                    row: row.clone(),
                    recruiter: view.or_default("recruiter", UNASSIGNED).to_string(),
                    context: view.context(),
                });
            }
            _ => {}
        }
    }

    plan
}

/// Copy of `row`, padded to the header width, with the given normalized
/// columns overwritten. Columns missing from the table are ignored.
pub fn stamp_row(
    index: &HeaderIndex,
    width: usize,
    row: &[String],
    stamps: &[(&str, &str)],
) -> Vec<String> {
    let mut updated: Vec<String> = row.iter().take(width).cloned().collect();
    updated.resize(width, String::new());
    for (column_key, value) in stamps {
        if let Some(&column) = index.get(*column_key)
            && column < width
        {
            updated[column] = value.to_string();
        }
    }
    updated
}
