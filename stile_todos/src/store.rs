//! In-memory todo storage
//!
//! Stands in for the external collaborator the auth layer protects. Writes
//! take a short exclusive lock; nothing holds a lock across a request.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// A stored todo item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// The item's assigned id, unique for the life of the store
    pub id: u64,

    /// Display text
    pub title: String,

    /// Whether the item has been completed
    pub completed: bool,
}

/// A todo item as submitted by a client, before an id is assigned
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewTodo {
    /// Display text
    pub title: String,

    /// Whether the item has been completed
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    items: Vec<Todo>,
}

/// Concurrent in-memory store with monotonically assigned ids
///
/// Ids are never reused, so a deleted item's id keeps returning not-found.
#[derive(Debug, Default)]
pub struct TodoStore {
    inner: RwLock<Inner>,
}

impl TodoStore {
    /// Constructs an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All items, in insertion order
    #[must_use]
    pub fn list(&self) -> Vec<Todo> {
        self.inner.read().items.clone()
    }

    /// Looks up a single item by id
    #[must_use]
    pub fn find(&self, id: u64) -> Option<Todo> {
        self.inner
            .read()
            .items
            .iter()
            .find(|todo| todo.id == id)
            .cloned()
    }

    /// Adds an item, assigning it the next id
    pub fn add(&self, new: NewTodo) -> Todo {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let todo = Todo {
            id: inner.next_id,
            title: new.title,
            completed: new.completed,
        };
        inner.items.push(todo.clone());
        todo
    }

    /// Removes an item by id, reporting whether it existed
    pub fn remove(&self, id: u64) -> bool {
        let mut inner = self.inner.write();
        let before = inner.items.len();
        inner.items.retain(|todo| todo.id != id);
        inner.items.len() != before
    }
}
