use chrono::{Days, NaiveDate};

use crate::task::{Task, TaskStatus, TaskType, child_id, next_task_id};

/// Perform a type transition when the submitted task's type differs from its
/// stored type. Returns the full replacement list: the converter owns the
/// authoritative output and callers persist it wholesale. `None` means no
/// conversion applies and the caller should fall back to a plain upsert.
pub fn convert(task: &Task, all: &[Task], today: NaiveDate) -> Option<Vec<Task>> {
    let original = all.iter().find(|t| t.id == task.id);

    // 1. To periodic (also covers a brand-new task created as periodic)
    if task.kind == TaskType::Periodic && original.is_none_or(|o| o.kind != TaskType::Periodic) {
        return Some(to_periodic(task, all, today));
    }

    // 2. From periodic: the whole family collapses into one task
    if let Some(original) = original {
        if original.kind == TaskType::Periodic && task.kind != TaskType::Periodic {
            return Some(from_periodic(task, original, all, today));
        }
    }

    // 3. To reminder: status is dropped
    if task.kind == TaskType::Reminder && original.is_some_and(|o| o.kind != TaskType::Reminder) {
        return Some(to_reminder(task, all));
    }

    // 4. From reminder: status is recomputed from scratch
    if task.kind != TaskType::Reminder && original.is_some_and(|o| o.kind == TaskType::Reminder) {
        return Some(from_reminder(task, all, today));
    }

    None
}

/// Expand a single task into a periodic family: the task becomes the mother
/// (`parentId = own id`) and children are generated every `frequency` days
/// from `due` until `endDate`. Children inherit the mother's fields apart
/// from id, due and status.
fn to_periodic(task: &Task, all: &[Task], today: NaiveDate) -> Vec<Task> {
    let mut result: Vec<Task> = all.iter().filter(|t| t.id != task.id).cloned().collect();

    let mut mother = task.clone();
    mother.parent_id = Some(mother.id);
    result.push(mother.clone().normalized(today));

    // A periodic task without a due date yields just the mother
    let (Some(start), Some(end), Some(frequency)) = (mother.due, mother.end_date, mother.frequency)
    else {
        return result;
    };
    if frequency < 1 {
        return result;
    }

    let mut current = start;
    let mut index = 1;
    loop {
        let Some(next) = current.checked_add_days(Days::new(frequency as u64)) else {
            break;
        };
        if next > end {
            break;
        }
        current = next;
        result.push(
            Task {
                id: child_id(mother.id, index),
                parent_id: Some(mother.id),
                due: Some(current),
                status: Some(TaskStatus::Due),
                ..mother.clone()
            }
            .normalized(today),
        );
        index += 1;
    }

    result
}

/// Collapse the whole family into one fresh non-periodic task. Title and
/// description come from the submitted task; the id is newly assigned.
fn from_periodic(task: &Task, original: &Task, all: &[Task], today: NaiveDate) -> Vec<Task> {
    let family_id = original.family_id();
    let mut result: Vec<Task> = all.iter().filter(|t| !t.in_family(family_id)).cloned().collect();

    result.push(
        Task {
            id: next_task_id(),
            parent_id: None,
            end_date: None,
            frequency: None,
            ..task.clone()
        }
        .normalized(today),
    );
    result
}

fn to_reminder(task: &Task, all: &[Task]) -> Vec<Task> {
    let mut result: Vec<Task> = all.iter().filter(|t| t.id != task.id).cloned().collect();
    result.push(Task {
        kind: TaskType::Reminder,
        status: None,
        ..task.clone()
    });
    result
}

fn from_reminder(task: &Task, all: &[Task], today: NaiveDate) -> Vec<Task> {
    let mut result: Vec<Task> = all.iter().filter(|t| t.id != task.id).cloned().collect();
    // No status hint: the entity normalization derives it from the due date
    result.push(
        Task {
            status: None,
            ..task.clone()
        }
        .normalized(today),
    );
    result
}
