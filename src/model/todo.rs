use std::collections::HashSet;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Provenance of the collection's most recent mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Manual,
    Import,
    Sync,
}

/// A single to-do item.
///
/// `parent_id` is a weak reference resolved by lookup in the owning
/// [`TodoList`], not a structural pointer. A parent id that resolves to
/// nothing demotes the item to a root; it never fails a read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Opaque unique identifier, immutable after creation.
    pub id: String,
    /// User-entered label, non-empty after trimming on creation.
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    /// Set exactly when `completed` flips to true, cleared when it flips back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Optional deadline used for urgency classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    /// Tree edge to another item's id; absent on roots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Todo {
    /// Create a new incomplete item with the given id and label.
    pub fn new(id: String, text: String, created_at: DateTime<Utc>) -> Self {
        Todo {
            id,
            text,
            completed: false,
            created_at,
            completed_at: None,
            deadline: None,
            parent_id: None,
        }
    }
}

/// The live collection: an insertion-ordered sequence of items plus the
/// timestamp and provenance of the last mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoList {
    pub data: Vec<Todo>,
    pub last_update: DateTime<Utc>,
    pub source: DataSource,
}

/// A node in the derived nested view. Borrows the flat collection; the
/// nesting is recomputed per read, never stored.
#[derive(Debug)]
pub struct TreeNode<'a> {
    pub todo: &'a Todo,
    pub children: Vec<TreeNode<'a>>,
}

impl TodoList {
    /// An empty collection stamped with the given time.
    pub fn new(now: DateTime<Utc>) -> Self {
        TodoList {
            data: Vec::new(),
            last_update: now,
            source: DataSource::Manual,
        }
    }

    /// Wrap a legacy bare array of items in the current document shape.
    pub fn from_legacy(data: Vec<Todo>, now: DateTime<Utc>) -> Self {
        TodoList {
            data,
            last_update: now,
            source: DataSource::Manual,
        }
    }

    /// Stamp a mutation: update time and provenance.
    pub fn touch(&mut self, now: DateTime<Utc>, source: DataSource) {
        self.last_update = now;
        self.source = source;
    }

    pub fn find(&self, id: &str) -> Option<&Todo> {
        self.data.iter().find(|t| t.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Todo> {
        self.data.iter_mut().find(|t| t.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Items with no parent, plus orphans whose parent id does not resolve.
    pub fn roots(&self) -> Vec<&Todo> {
        self.data
            .iter()
            .filter(|t| match &t.parent_id {
                None => true,
                Some(pid) => !self.contains(pid),
            })
            .collect()
    }

    /// Direct children of `id`, in insertion order.
    pub fn children_of(&self, id: &str) -> Vec<&Todo> {
        self.data
            .iter()
            .filter(|t| t.parent_id.as_deref() == Some(id))
            .collect()
    }

    /// Parent id → children, built once per read so tree construction is
    /// O(n) instead of a filter per node. Insertion order is preserved.
    fn child_index(&self) -> IndexMap<&str, Vec<&Todo>> {
        let mut index: IndexMap<&str, Vec<&Todo>> = IndexMap::new();
        for todo in &self.data {
            if let Some(pid) = &todo.parent_id {
                index.entry(pid.as_str()).or_default().push(todo);
            }
        }
        index
    }

    /// The nested view. Orphans surface as roots; a cyclic parent chain
    /// (which creation never produces, but persisted data may carry) is
    /// broken by the visited set and its members surface as roots too.
    pub fn tree(&self) -> Vec<TreeNode<'_>> {
        let index = self.child_index();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut nodes: Vec<TreeNode<'_>> = self
            .roots()
            .into_iter()
            .map(|t| build_node(t, &index, &mut visited))
            .collect();

        // Anything still unvisited sits on a cycle: detach to root.
        for todo in &self.data {
            if !visited.contains(todo.id.as_str()) {
                nodes.push(build_node(todo, &index, &mut visited));
            }
        }
        nodes
    }

    /// Ids of every descendant of `id`, full depth, in walk order.
    /// Guarded against cycles.
    pub fn descendants_of(&self, id: &str) -> Vec<String> {
        let index = self.child_index();
        let mut out = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(id);
        let mut stack: Vec<&str> = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(children) = index.get(current) {
                for child in children {
                    if visited.insert(child.id.as_str()) {
                        out.push(child.id.clone());
                        stack.push(child.id.as_str());
                    }
                }
            }
        }
        out
    }

    /// Remove every item whose id is in `ids`. Unrelated items keep their
    /// relative order.
    pub fn remove_all(&mut self, ids: &HashSet<String>) {
        self.data.retain(|t| !ids.contains(&t.id));
    }
}

fn build_node<'a>(
    todo: &'a Todo,
    index: &IndexMap<&str, Vec<&'a Todo>>,
    visited: &mut HashSet<&'a str>,
) -> TreeNode<'a> {
    visited.insert(todo.id.as_str());
    let mut children = Vec::new();
    if let Some(kids) = index.get(todo.id.as_str()) {
        for c in kids {
            if !visited.contains(c.id.as_str()) {
                children.push(build_node(c, index, visited));
            }
        }
    }
    TreeNode { todo, children }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn item(id: &str, parent: Option<&str>) -> Todo {
        let mut t = Todo::new(id.to_string(), format!("task {id}"), ts());
        t.parent_id = parent.map(str::to_string);
        t
    }

    fn list(items: Vec<Todo>) -> TodoList {
        TodoList {
            data: items,
            last_update: ts(),
            source: DataSource::Manual,
        }
    }

    #[test]
    fn roots_are_parentless_items() {
        let l = list(vec![item("a", None), item("b", Some("a")), item("c", None)]);
        let roots: Vec<&str> = l.roots().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(roots, vec!["a", "c"]);
    }

    #[test]
    fn orphan_becomes_root() {
        let l = list(vec![item("a", None), item("b", Some("gone"))]);
        let roots: Vec<&str> = l.roots().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(roots, vec!["a", "b"]);
    }

    #[test]
    fn tree_nests_children_in_insertion_order() {
        let l = list(vec![
            item("a", None),
            item("b", Some("a")),
            item("c", Some("a")),
            item("d", Some("c")),
        ]);
        let tree = l.tree();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].todo.id, "a");
        let kids: Vec<&str> = tree[0].children.iter().map(|n| n.todo.id.as_str()).collect();
        assert_eq!(kids, vec!["b", "c"]);
        assert_eq!(tree[0].children[1].children[0].todo.id, "d");
    }

    #[test]
    fn tree_survives_cyclic_edges() {
        // a → b → a can only arrive via hand-edited data; the walk must
        // terminate and both items must still be reachable.
        let l = list(vec![item("a", Some("b")), item("b", Some("a"))]);
        let tree = l.tree();

        fn walk<'a>(nodes: &[TreeNode<'a>], seen: &mut Vec<&'a str>) {
            for n in nodes {
                seen.push(n.todo.id.as_str());
                walk(&n.children, seen);
            }
        }
        let mut seen: Vec<&str> = Vec::new();
        walk(&tree, &mut seen);
        seen.sort_unstable();
        assert_eq!(seen, vec!["a", "b"]);
    }

    #[test]
    fn descendants_full_depth() {
        let l = list(vec![
            item("a", None),
            item("b", Some("a")),
            item("c", Some("b")),
            item("d", Some("c")),
            item("e", None),
        ]);
        let mut ids = l.descendants_of("a");
        ids.sort_unstable();
        assert_eq!(ids, vec!["b", "c", "d"]);
        assert!(l.descendants_of("e").is_empty());
    }

    #[test]
    fn descendants_cycle_guard_terminates() {
        let l = list(vec![item("a", Some("b")), item("b", Some("a"))]);
        assert_eq!(l.descendants_of("a"), vec!["b".to_string()]);
    }

    #[test]
    fn remove_all_keeps_unrelated_order() {
        let mut l = list(vec![item("a", None), item("b", None), item("c", None)]);
        let gone: HashSet<String> = ["b".to_string()].into_iter().collect();
        l.remove_all(&gone);
        let ids: Vec<&str> = l.data.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn serde_wire_shape_is_camel_case() {
        let mut t = item("a", Some("p"));
        t.completed = true;
        t.completed_at = Some(ts());
        let json = serde_json::to_value(&t).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("completedAt").is_some());
        assert!(json.get("parentId").is_some());
        // Absent options are omitted, matching the persisted documents.
        let bare = serde_json::to_value(item("b", None)).unwrap();
        assert!(bare.get("completedAt").is_none());
        assert!(bare.get("parentId").is_none());
    }

    #[test]
    fn source_tag_round_trips_lowercase() {
        let l = list(vec![]);
        let json = serde_json::to_value(&l).unwrap();
        assert_eq!(json["source"], "manual");
        let back: TodoList = serde_json::from_value(json).unwrap();
        assert_eq!(back.source, DataSource::Manual);
    }
}
