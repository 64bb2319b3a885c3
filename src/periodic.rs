use chrono::{Days, NaiveDate};

use crate::convert;
use crate::task::{Task, TaskStatus, TaskType, child_id, upsert};

/// What the save pipeline should do with the list after the periodic rules
/// ran. `Replace` is terminal: a structural rewrite already folded the edit
/// in. `Continue` means no structural case fired and the list (with the edit
/// upserted) takes the generic path.
#[derive(Debug, PartialEq)]
pub enum Disposition {
    Replace(Vec<Task>),
    Continue(Vec<Task>),
}

impl Disposition {
    pub fn into_tasks(self) -> Vec<Task> {
        match self {
            Disposition::Replace(tasks) | Disposition::Continue(tasks) => tasks,
        }
    }
}

/// Saving a task that is periodic, or used to be, walks these cases in
/// order; the first match wins.
///
/// 1. The type changed (or a new task arrives already periodic): convert.
/// 2. A mother's end date moved: shrink or extend the family.
/// 3. A family member was edited: propagate the shared fields, and if the
///    end date moved through a child, reconcile against the mother's.
/// 4. Any other recurrence parameter changed: rebuild the family.
/// 5. Otherwise fall through to a plain save.
///
/// `snapshot` is the stored record before this edit, `None` for new tasks.
pub fn handle_save(
    task: Task,
    mut tasks: Vec<Task>,
    snapshot: Option<&Task>,
    today: NaiveDate,
) -> Disposition {
    let needs_conversion = match snapshot {
        Some(snapshot) => snapshot.kind != task.kind,
        None => task.kind == TaskType::Periodic,
    };
    if needs_conversion {
        if let Some(converted) = convert::convert(&task, &tasks, today) {
            return Disposition::Replace(converted);
        }
    }

    upsert(&mut tasks, task.clone());

    let Some(snapshot) = snapshot else {
        return Disposition::Continue(tasks);
    };

    // Change detection is keyed off the prior state: the snapshot itself for
    // a mother edit, the mother's stored record for a child edit.
    let original_mother = if snapshot.is_mother() {
        snapshot.clone()
    } else {
        tasks
            .iter()
            .find(|t| Some(t.id) == snapshot.parent_id)
            .cloned()
            .unwrap_or_else(|| snapshot.clone())
    };

    if task.kind == TaskType::Periodic && task.is_mother() && task.end_date != snapshot.end_date {
        return mother_end_date_change(&task, tasks, snapshot, today);
    }

    if task.kind == TaskType::Periodic {
        let family_id = original_mother.id;
        for member in tasks
            .iter_mut()
            .filter(|t| t.in_family(family_id) && t.kind == TaskType::Periodic)
        {
            member.apply_group_properties(&task);
        }
        if task.end_date != original_mother.end_date {
            return child_end_date_change(&task, tasks, &original_mother, today);
        }
        if parameters_changed(&task, &original_mother) {
            return rebuild_family(&task, tasks, &original_mother, today);
        }
        // Propagation may have touched siblings even without a structural
        // change (a title edit on a child for example)
        return Disposition::Replace(tasks);
    }

    Disposition::Continue(tasks)
}

/// Deleting any member of a periodic family removes the whole family.
pub fn delete_family(target: &Task, tasks: Vec<Task>) -> Vec<Task> {
    let family_id = target.family_id();
    tasks.into_iter().filter(|t| !t.in_family(family_id)).collect()
}

fn parameters_changed(task: &Task, original_mother: &Task) -> bool {
    task.title != original_mother.title
        || task.due != original_mother.due
        || task.end_date != original_mother.end_date
        || task.frequency != original_mother.frequency
}

fn mother_end_date_change(
    task: &Task,
    mut tasks: Vec<Task>,
    snapshot: &Task,
    today: NaiveDate,
) -> Disposition {
    let family_id = task.id;
    for member in tasks
        .iter_mut()
        .filter(|t| t.in_family(family_id) && t.kind == TaskType::Periodic)
    {
        member.apply_group_properties(task);
    }

    match (task.end_date, snapshot.end_date) {
        (Some(new_end), Some(old_end)) if new_end < old_end => {
            Disposition::Replace(shrink_family(tasks, family_id, new_end))
        }
        (Some(new_end), Some(old_end)) if new_end > old_end => {
            extend_family(task, tasks, family_id, today)
        }
        // One side failed to parse as a date: no structural change, but the
        // propagated fields still need persisting
        _ => Disposition::Replace(tasks),
    }
}

fn child_end_date_change(
    task: &Task,
    tasks: Vec<Task>,
    original_mother: &Task,
    today: NaiveDate,
) -> Disposition {
    let family_id = original_mother.id;
    match (task.end_date, original_mother.end_date) {
        (Some(new_end), Some(old_end)) if new_end < old_end => {
            Disposition::Replace(shrink_family(tasks, family_id, new_end))
        }
        (Some(new_end), Some(old_end)) if new_end > old_end => {
            extend_family(task, tasks, family_id, today)
        }
        _ => Disposition::Replace(tasks),
    }
}

/// Drop every family member due after the new end date. The mother survives
/// unconditionally so the family always keeps its head.
fn shrink_family(tasks: Vec<Task>, family_id: i64, new_end: NaiveDate) -> Vec<Task> {
    tasks
        .into_iter()
        .filter(|t| {
            t.id == family_id
                || !t.in_family(family_id)
                || t.due.is_none_or(|due| due <= new_end)
        })
        .collect()
}

/// Append new children after the family's latest due date, continuing the
/// child index sequence. Existing members are never regenerated.
fn extend_family(
    task: &Task,
    mut tasks: Vec<Task>,
    family_id: i64,
    today: NaiveDate,
) -> Disposition {
    let (latest, highest_index) = {
        let family = tasks.iter().filter(|t| t.in_family(family_id));
        let mut latest = None;
        let mut highest_index = 0;
        for member in family {
            latest = latest.max(member.due);
            if member.id != family_id {
                highest_index = highest_index.max(member.id - family_id * 1000);
            }
        }
        (latest, highest_index)
    };

    let (Some(latest), Some(new_end), Some(frequency)) = (latest, task.end_date, task.frequency)
    else {
        return Disposition::Replace(tasks);
    };
    if frequency < 1 {
        return Disposition::Replace(tasks);
    }

    let mut index = highest_index + 1;
    let mut current = latest;
    loop {
        let Some(next) = current.checked_add_days(Days::new(frequency as u64)) else {
            break;
        };
        if next > new_end {
            break;
        }
        current = next;
        tasks.push(
            Task {
                id: child_id(family_id, index),
                parent_id: Some(family_id),
                due: Some(current),
                status: Some(TaskStatus::Due),
                desc: String::new(),
                ..task.clone()
            }
            .normalized(today),
        );
        index += 1;
    }

    Disposition::Replace(tasks)
}

/// Regenerate the whole family from the mother's due date with the new
/// parameters. Occurrences whose due date survives the regeneration keep
/// their status and description; everything else starts out fresh.
fn rebuild_family(
    task: &Task,
    tasks: Vec<Task>,
    original_mother: &Task,
    today: NaiveDate,
) -> Disposition {
    let family_id = original_mother.id;

    let current_mother = tasks.iter().find(|t| t.id == family_id).cloned();
    let anchor = current_mother.as_ref().and_then(|m| m.due).or(original_mother.due);
    let (Some(anchor), Some(new_end), Some(frequency)) = (anchor, task.end_date, task.frequency)
    else {
        return Disposition::Continue(tasks);
    };
    if frequency < 1 {
        return Disposition::Continue(tasks);
    }

    let family: Vec<Task> = tasks.iter().filter(|t| t.in_family(family_id)).cloned().collect();
    let mut result: Vec<Task> = tasks.into_iter().filter(|t| !t.in_family(family_id)).collect();

    let mother = current_mother.as_ref().unwrap_or(original_mother);
    let mut current = anchor;
    let mut index = 0;
    while current <= new_end {
        let existing = family.iter().find(|t| t.due == Some(current));
        let (id, status, desc) = if index == 0 {
            (family_id, mother.status, mother.desc.clone())
        } else {
            (
                child_id(family_id, index),
                existing.map(|t| t.status).unwrap_or(Some(TaskStatus::Due)),
                existing.map(|t| t.desc.clone()).unwrap_or_default(),
            )
        };
        result.push(
            Task {
                id,
                title: task.title.clone(),
                desc,
                due: Some(current),
                kind: TaskType::Periodic,
                status,
                parent_id: Some(family_id),
                end_date: task.end_date,
                frequency: task.frequency,
            }
            .normalized(today),
        );
        index += 1;
        match current.checked_add_days(Days::new(frequency as u64)) {
            Some(next) => current = next,
            None => break,
        }
    }

    Disposition::Replace(result)
}
