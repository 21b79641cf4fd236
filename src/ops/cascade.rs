use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::todo::{DataSource, Todo, TodoList};
use crate::port::Confirmer;

/// Error type for task operations
#[derive(Debug, thiserror::Error)]
pub enum TodoError {
    #[error("todo not found: {0}")]
    NotFound(String),
    #[error("todo text is empty")]
    EmptyText,
}

/// Outcome of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The item and this many descendants were removed (count includes
    /// the item itself).
    Deleted(usize),
    /// The user declined; nothing was removed.
    Aborted,
}

// ---------------------------------------------------------------------------
// Creation and edits
// ---------------------------------------------------------------------------

/// Add a new item. Text is trimmed and must be non-empty; a parent, if
/// given, must already exist — edges are only created toward existing
/// items, which is what keeps the tree acyclic.
/// Returns the new item's id.
pub fn add_todo(
    list: &mut TodoList,
    text: &str,
    parent_id: Option<&str>,
    deadline: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<String, TodoError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TodoError::EmptyText);
    }
    if let Some(pid) = parent_id
        && !list.contains(pid)
    {
        return Err(TodoError::NotFound(pid.to_string()));
    }

    let mut todo = Todo::new(Uuid::new_v4().to_string(), text.to_string(), now);
    todo.deadline = deadline;
    todo.parent_id = parent_id.map(str::to_string);
    let id = todo.id.clone();

    list.data.push(todo);
    list.touch(now, DataSource::Manual);
    Ok(id)
}

/// Replace an item's label.
pub fn update_text(
    list: &mut TodoList,
    id: &str,
    new_text: &str,
    now: DateTime<Utc>,
) -> Result<(), TodoError> {
    let new_text = new_text.trim();
    if new_text.is_empty() {
        return Err(TodoError::EmptyText);
    }
    let todo = list
        .find_mut(id)
        .ok_or_else(|| TodoError::NotFound(id.to_string()))?;
    todo.text = new_text.to_string();
    list.touch(now, DataSource::Manual);
    Ok(())
}

/// Set or clear an item's deadline.
pub fn set_deadline(
    list: &mut TodoList,
    id: &str,
    deadline: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), TodoError> {
    let todo = list
        .find_mut(id)
        .ok_or_else(|| TodoError::NotFound(id.to_string()))?;
    todo.deadline = deadline;
    list.touch(now, DataSource::Manual);
    Ok(())
}

// ---------------------------------------------------------------------------
// Toggle cascade
// ---------------------------------------------------------------------------

/// Flip an item's completion state, cascading per the parent/child rules:
///
/// - Completing a parent with incomplete children asks whether to complete
///   them all; declining completes only the parent.
/// - Un-completing a parent whose children are all completed asks whether
///   to un-complete them all; declining touches only the parent. Mixed
///   child states never prompt on this path.
/// - Completing the last incomplete child of a parent offers to complete
///   the parent too.
///
/// Everything a confirmed cascade touches shares the same timestamp.
pub fn toggle_todo(
    list: &mut TodoList,
    id: &str,
    now: DateTime<Utc>,
    confirmer: &mut dyn Confirmer,
) -> Result<(), TodoError> {
    let target = !list
        .find(id)
        .ok_or_else(|| TodoError::NotFound(id.to_string()))?
        .completed;
    apply_toggle(list, id, target, now, confirmer);
    list.touch(now, DataSource::Manual);
    Ok(())
}

fn apply_toggle(
    list: &mut TodoList,
    id: &str,
    target: bool,
    now: DateTime<Utc>,
    confirmer: &mut dyn Confirmer,
) {
    let child_ids: Vec<String> = list.children_of(id).iter().map(|c| c.id.clone()).collect();

    if child_ids.is_empty() {
        set_completed(list, id, target, now);
        if target {
            offer_parent_completion(list, id, now, confirmer);
        }
        return;
    }

    let all_children_done = child_ids
        .iter()
        .all(|cid| list.find(cid).is_some_and(|c| c.completed));

    let cascade = if target == all_children_done {
        // Completing with all children done, or un-completing with mixed
        // children: unambiguous, no prompt, single-node action.
        false
    } else if target {
        // Completing over at least one incomplete child.
        let text = list.find(id).map(|t| t.text.clone()).unwrap_or_default();
        confirmer
            .confirm(&format!(
                "Complete \"{}\" and its {} subtasks?",
                text,
                child_ids.len()
            ))
            .is_confirmed()
    } else {
        // Un-completing while every child is completed.
        let text = list.find(id).map(|t| t.text.clone()).unwrap_or_default();
        confirmer
            .confirm(&format!(
                "Mark \"{}\" and its {} subtasks as not done?",
                text,
                child_ids.len()
            ))
            .is_confirmed()
    };

    set_completed(list, id, target, now);
    if cascade {
        for cid in &child_ids {
            set_completed(list, cid, target, now);
        }
    }
}

/// After completing a leaf: if every sibling is now completed, offer to
/// complete the parent as well.
fn offer_parent_completion(
    list: &mut TodoList,
    id: &str,
    now: DateTime<Utc>,
    confirmer: &mut dyn Confirmer,
) {
    let Some(parent_id) = list.find(id).and_then(|t| t.parent_id.clone()) else {
        return;
    };
    let Some(parent) = list.find(&parent_id) else {
        return;
    };
    if parent.completed {
        return;
    }
    let siblings = list.children_of(&parent_id);
    if siblings.is_empty() || !siblings.iter().all(|s| s.completed) {
        return;
    }
    let message = format!(
        "All subtasks of \"{}\" are done. Complete it as well?",
        parent.text
    );
    if confirmer.confirm(&message).is_confirmed() {
        apply_toggle(list, &parent_id, true, now, confirmer);
    }
}

fn set_completed(list: &mut TodoList, id: &str, completed: bool, now: DateTime<Utc>) {
    if let Some(todo) = list.find_mut(id) {
        todo.completed = completed;
        todo.completed_at = completed.then_some(now);
    }
}

// ---------------------------------------------------------------------------
// Delete cascade
// ---------------------------------------------------------------------------

/// Delete an item. An item with descendants prompts once for the whole
/// subtree; declining aborts the entire delete — there is no partial
/// removal. The cascade runs to full depth, so grandchildren are removed
/// with their parent rather than left as orphans.
pub fn delete_todo(
    list: &mut TodoList,
    id: &str,
    now: DateTime<Utc>,
    confirmer: &mut dyn Confirmer,
) -> Result<DeleteOutcome, TodoError> {
    let text = list
        .find(id)
        .ok_or_else(|| TodoError::NotFound(id.to_string()))?
        .text
        .clone();

    let descendants = list.descendants_of(id);
    if !descendants.is_empty() {
        let message = format!("Delete \"{}\" and its {} subtasks?", text, descendants.len());
        if !confirmer.confirm(&message).is_confirmed() {
            return Ok(DeleteOutcome::Aborted);
        }
    }

    let mut ids: HashSet<String> = descendants.into_iter().collect();
    ids.insert(id.to_string());
    let count = ids.len();
    list.remove_all(&ids);
    list.touch(now, DataSource::Manual);
    Ok(DeleteOutcome::Deleted(count))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
