use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Task variants, stored under the wire names the browser UI has always used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum TaskType {
    #[default]
    #[serde(rename = "regular task")]
    Regular,
    #[serde(rename = "periodic task")]
    Periodic,
    #[serde(rename = "reminder")]
    Reminder,
}

impl TaskType {
    pub fn parse(s: &str) -> TaskType {
        match s {
            "periodic task" => TaskType::Periodic,
            "reminder" => TaskType::Reminder,
            // Unknown variants in old records read as regular tasks
            _ => TaskType::Regular,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Due,
    Late,
    Done,
}

impl TaskStatus {
    fn parse(s: &str) -> Option<TaskStatus> {
        match s {
            "due" => Some(TaskStatus::Due),
            "late" => Some(TaskStatus::Late),
            "done" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

/// The sole persisted task entity. Serialized as the original JSON shape:
/// camelCase names, dates as `YYYY-MM-DD`, absent optionals omitted.
///
/// Deserialization is deliberately forgiving: the store has no schema
/// version, so numeric fields accept numbers or numeric strings, and
/// malformed dates or unknown enum strings read as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, deserialize_with = "de_id")]
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default, deserialize_with = "de_opt_date", skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDate>,
    #[serde(rename = "type", default, deserialize_with = "de_task_type")]
    pub kind: TaskType,
    #[serde(default, deserialize_with = "de_opt_status", skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(rename = "parentId", default, deserialize_with = "de_opt_i64", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    #[serde(rename = "endDate", default, deserialize_with = "de_opt_date", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de_opt_i64", skip_serializing_if = "Option::is_none")]
    pub frequency: Option<i64>,
}

impl Task {
    /// Normalize a task the way the entity constructor always has: assign a
    /// clock-derived id when none was supplied and recompute the status from
    /// the due date relative to the start of today.
    pub fn normalize(&mut self, today: NaiveDate) {
        if self.id == 0 {
            self.id = next_task_id();
        }
        self.status = match self.kind {
            TaskType::Reminder => None,
            _ => compute_status(self.status, self.due, today),
        };
    }

    pub fn normalized(mut self, today: NaiveDate) -> Task {
        self.normalize(today);
        self
    }

    /// True iff the due date is present and strictly before the start of
    /// today (day granularity, not time-of-day).
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due.is_some_and(|due| due < today)
    }

    /// Hard precondition for any save.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title is required".to_string());
        }
        Ok(())
    }

    /// The id of the periodic family this task belongs to. An orphaned child
    /// with a dangling parentId is treated as its own family head.
    pub fn family_id(&self) -> i64 {
        self.parent_id.unwrap_or(self.id)
    }

    pub fn in_family(&self, family_id: i64) -> bool {
        self.id == family_id || self.parent_id == Some(family_id)
    }

    /// A family head carries no parentId or points at itself.
    pub fn is_mother(&self) -> bool {
        self.parent_id.is_none() || self.parent_id == Some(self.id)
    }

    /// Copy the shared family fields from `from`. Status and desc are
    /// per-occurrence and must never travel through here.
    pub fn apply_group_properties(&mut self, from: &Task) {
        self.title = from.title.clone();
        self.frequency = from.frequency;
        self.end_date = from.end_date;
        self.kind = from.kind;
    }
}

/// Derived id for the `index`-th child occurrence of a family.
pub fn child_id(family_id: i64, index: i64) -> i64 {
    family_id * 1000 + index
}

/// Fresh task id from the millisecond clock.
pub fn next_task_id() -> i64 {
    Utc::now().timestamp_millis()
}

/// Replace the task with the same id, or append.
pub fn upsert(tasks: &mut Vec<Task>, task: Task) {
    match tasks.iter_mut().find(|t| t.id == task.id) {
        Some(slot) => *slot = task,
        None => tasks.push(task),
    }
}

fn compute_status(
    supplied: Option<TaskStatus>,
    due: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<TaskStatus> {
    // Planning tasks carry no status at all
    let due = due?;
    if supplied == Some(TaskStatus::Done) {
        return Some(TaskStatus::Done);
    }
    if due < today {
        return Some(TaskStatus::Late);
    }
    Some(supplied.unwrap_or(TaskStatus::Due))
}

/// Status counters over every task that has a status.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub done: usize,
    pub due: usize,
    pub late: usize,
}

impl TaskStats {
    pub fn calculate(tasks: &[Task]) -> TaskStats {
        let mut stats = TaskStats::default();
        for task in tasks {
            match task.status {
                Some(TaskStatus::Done) => stats.done += 1,
                Some(TaskStatus::Due) => stats.due += 1,
                Some(TaskStatus::Late) => stats.late += 1,
                None => continue,
            }
            stats.total += 1;
        }
        stats
    }
}

// ============================================================================
// Lenient field decoding
// ============================================================================

fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_i64).unwrap_or(0))
}

fn de_opt_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_i64))
}

/// Parse a `YYYY-MM-DD` day, tolerating a trailing time portion; some very
/// old records stored full ISO timestamps.
pub fn parse_day(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok()
}

fn de_opt_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(|v| v.as_str()).and_then(parse_day))
}

fn de_opt_status<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<TaskStatus>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(|v| v.as_str()).and_then(TaskStatus::parse))
}

fn de_task_type<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TaskType, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(|v| v.as_str())
        .map(TaskType::parse)
        .unwrap_or_default())
}

#[cfg(test)]
pub(crate) fn day(s: &str) -> NaiveDate {
    parse_day(s).unwrap()
}
