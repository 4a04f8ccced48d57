//! The shared board: an append-only record log plus the category index
//! derived from it.
//!
//! The log is the source of truth. The index caches the newest message per
//! category so triggers don't rescan the log on every evaluation; any reader
//! may fall back to [`RecordLog::latest_by_scan`] and get the same answer.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::message::{Author, Category, Message};

/// Append-only, monotonically id'd sequence of messages.
#[derive(Debug)]
pub struct RecordLog {
    messages: Vec<Arc<Message>>,
    next_id: u64,
}

impl Default for RecordLog {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordLog {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            next_id: 1,
        }
    }

    /// Append a message, assigning the next id and the current time.
    pub fn append(&mut self, author: Author, category: Category, content: String) -> Arc<Message> {
        let message = Arc::new(Message {
            id: self.next_id,
            author,
            category,
            content,
            created_at: Utc::now(),
        });
        self.next_id += 1;
        self.messages.push(Arc::clone(&message));
        message
    }

    pub fn all(&self) -> &[Arc<Message>] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Newest message of `category`, found by walking the log backwards.
    pub fn latest_by_scan(&self, category: Category) -> Option<Arc<Message>> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.category == category)
            .cloned()
    }

    /// Every message written by `author`, oldest first.
    pub fn authored_by(&self, author: Author) -> impl Iterator<Item = &Arc<Message>> {
        self.messages.iter().filter(move |m| m.author == author)
    }
}

/// Cache of the most recent message per category.
#[derive(Debug, Default)]
pub struct CategoryIndex {
    latest: HashMap<Category, Arc<Message>>,
}

impl CategoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` as the latest of its category unless a newer one is
    /// already cached.
    pub fn update(&mut self, message: &Arc<Message>) {
        match self.latest.get(&message.category) {
            Some(current) if current.id >= message.id => {}
            _ => {
                self.latest.insert(message.category, Arc::clone(message));
            }
        }
    }

    pub fn lookup(&self, category: Category) -> Option<Arc<Message>> {
        self.latest.get(&category).cloned()
    }
}

/// A log and its index, mutated together.
///
/// [`Board::post`] is the only write path: it appends and updates the index
/// before returning, so no reader ever sees the two disagree.
#[derive(Debug, Default)]
pub struct Board {
    log: RecordLog,
    index: CategoryIndex,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&mut self, author: Author, category: Category, content: String) -> Arc<Message> {
        let message = self.log.append(author, category, content);
        self.index.update(&message);
        message
    }

    pub fn log(&self) -> &RecordLog {
        &self.log
    }

    pub fn index(&self) -> &CategoryIndex {
        &self.index
    }

    /// Newest message of `category`, from the index or, failing that, a scan.
    pub fn latest(&self, category: Category) -> Option<Arc<Message>> {
        self.index
            .lookup(category)
            .or_else(|| self.log.latest_by_scan(category))
    }

    /// The request this run was started with, if any.
    pub fn request(&self) -> Option<Arc<Message>> {
        self.latest(Category::Request)
    }
}
