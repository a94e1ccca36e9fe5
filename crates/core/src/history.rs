//! Undo/redo commands
//!
//! Every store mutation is wrapped in a [`Command`] and handed to a
//! [`History`] under a topic. [`CommandHistory`] is an in-process history
//! with one timeline per topic plus a global timeline across topics.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Reversible operation
pub trait Command: Send + Sync {
    fn execute(&self);
    fn undo(&self);
}

/// Command built from two closures
pub struct FnCommand<E, U> {
    execute: E,
    undo: U,
}

impl<E, U> FnCommand<E, U>
where
    E: Fn() + Send + Sync,
    U: Fn() + Send + Sync,
{
    pub fn new(execute: E, undo: U) -> Self {
        Self { execute, undo }
    }
}

impl<E, U> Command for FnCommand<E, U>
where
    E: Fn() + Send + Sync,
    U: Fn() + Send + Sync,
{
    fn execute(&self) {
        (self.execute)()
    }

    fn undo(&self) {
        (self.undo)()
    }
}

pub type HistoryListener = Arc<dyn Fn(&str) + Send + Sync>;

/// History collaborator
pub trait History: Send + Sync {
    /// Execute `command` and record it under `topic`
    fn register(&self, command: Arc<dyn Command>, topic: &str);

    /// Listen for history changes; the listener receives the topic
    fn on_history_change(&self, listener: HistoryListener);
}

/// Default maximum number of undoable commands per timeline
pub const MAX_HISTORY_SIZE: usize = 100;

#[derive(Clone)]
struct Entry {
    command: Arc<dyn Command>,
    topic: String,
}

#[derive(Default)]
struct Timeline {
    undo_stack: Vec<Entry>,
    redo_stack: Vec<Entry>,
}

impl Timeline {
    fn push(&mut self, entry: Entry, max_depth: usize) {
        self.redo_stack.clear();
        self.undo_stack.push(entry);
        if self.undo_stack.len() > max_depth {
            let excess = self.undo_stack.len() - max_depth;
            self.undo_stack.drain(..excess);
        }
    }
}

#[derive(Default)]
struct Timelines {
    global: Timeline,
    topics: HashMap<String, Timeline>,
}

/// In-process undo/redo history
///
/// Commands run outside the internal lock, so a command may call back into
/// code that reads the history.
pub struct CommandHistory {
    timelines: Mutex<Timelines>,
    listeners: Mutex<Vec<HistoryListener>>,
    max_depth: usize,
}

impl CommandHistory {
    pub fn new() -> Self {
        Self::with_max_depth(MAX_HISTORY_SIZE)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            timelines: Mutex::new(Timelines::default()),
            listeners: Mutex::new(Vec::new()),
            max_depth: max_depth.max(1),
        }
    }

    fn notify(&self, topic: &str) {
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener(topic);
        }
    }

    /// Undo the latest command of `topic`, or of any topic when `None`
    ///
    /// Returns false when there is nothing to undo.
    pub fn undo(&self, topic: Option<&str>) -> bool {
        let entry = {
            let mut timelines = self.timelines.lock();
            let entry = match topic {
                Some(topic) => timelines
                    .topics
                    .get_mut(topic)
                    .and_then(|t| t.undo_stack.pop()),
                None => timelines.global.undo_stack.pop(),
            };
            let Some(entry) = entry else {
                return false;
            };
            let Timelines { global, topics } = &mut *timelines;
            match topic {
                Some(_) => remove_last(&mut global.undo_stack, &entry),
                None => {
                    if let Some(t) = topics.get_mut(&entry.topic) {
                        remove_last(&mut t.undo_stack, &entry);
                    }
                }
            }
            global.redo_stack.push(entry.clone());
            topics
                .entry(entry.topic.clone())
                .or_default()
                .redo_stack
                .push(entry.clone());
            entry
        };
        entry.command.undo();
        self.notify(&entry.topic);
        true
    }

    /// Redo the latest undone command of `topic`, or of any topic when `None`
    pub fn redo(&self, topic: Option<&str>) -> bool {
        let entry = {
            let mut timelines = self.timelines.lock();
            let entry = match topic {
                Some(topic) => timelines
                    .topics
                    .get_mut(topic)
                    .and_then(|t| t.redo_stack.pop()),
                None => timelines.global.redo_stack.pop(),
            };
            let Some(entry) = entry else {
                return false;
            };
            let Timelines { global, topics } = &mut *timelines;
            match topic {
                Some(_) => remove_last(&mut global.redo_stack, &entry),
                None => {
                    if let Some(t) = topics.get_mut(&entry.topic) {
                        remove_last(&mut t.redo_stack, &entry);
                    }
                }
            }
            global.undo_stack.push(entry.clone());
            topics
                .entry(entry.topic.clone())
                .or_default()
                .undo_stack
                .push(entry.clone());
            entry
        };
        entry.command.execute();
        self.notify(&entry.topic);
        true
    }

    pub fn can_undo(&self, topic: Option<&str>) -> bool {
        let timelines = self.timelines.lock();
        match topic {
            Some(topic) => timelines
                .topics
                .get(topic)
                .is_some_and(|t| !t.undo_stack.is_empty()),
            None => !timelines.global.undo_stack.is_empty(),
        }
    }

    pub fn can_redo(&self, topic: Option<&str>) -> bool {
        let timelines = self.timelines.lock();
        match topic {
            Some(topic) => timelines
                .topics
                .get(topic)
                .is_some_and(|t| !t.redo_stack.is_empty()),
            None => !timelines.global.redo_stack.is_empty(),
        }
    }

    pub fn clear(&self) {
        *self.timelines.lock() = Timelines::default();
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Remove the most recent occurrence of `entry` from a stack
fn remove_last(stack: &mut Vec<Entry>, entry: &Entry) {
    if let Some(pos) = stack
        .iter()
        .rposition(|e| Arc::ptr_eq(&e.command, &entry.command))
    {
        stack.remove(pos);
    }
}

impl History for CommandHistory {
    fn register(&self, command: Arc<dyn Command>, topic: &str) {
        command.execute();
        {
            let mut timelines = self.timelines.lock();
            let entry = Entry {
                command,
                topic: topic.to_string(),
            };
            let max_depth = self.max_depth;
            timelines.global.push(entry.clone(), max_depth);
            timelines
                .topics
                .entry(topic.to_string())
                .or_default()
                .push(entry, max_depth);
        }
        self.notify(topic);
    }

    fn on_history_change(&self, listener: HistoryListener) {
        self.listeners.lock().push(listener);
    }
}
