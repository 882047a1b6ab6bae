//! Producer and topic registries

use core::cell::RefCell;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use heapless::{FnvIndexMap, String};

use crate::core::{TaskId, Topic};

/// Capacity of the thread map. Power of two, above the assignable id count.
const TASK_CAPACITY: usize = 256;

/// Registered topic capacity
const TOPIC_CAPACITY: usize = 16;

/// Stored name length; longer names are truncated at a character boundary.
pub const NAME_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
struct TaskRecord {
    id: TaskId,
    name: Option<String<NAME_CAPACITY>>,
}

struct Inner {
    tasks: FnvIndexMap<u32, TaskRecord, TASK_CAPACITY>,
    next: Option<TaskId>,
}

/// Mapping from host thread identity to producer id and optional name
///
/// Mutated once per producer at registration, read on every message when the
/// header carries a name. Ids are handed out in registration order starting
/// at [`TaskId::FIRST`]; once all 254 regular ids are spent, late producers
/// get [`TaskId::INVALID`] and their output vanishes at submission.
pub(crate) struct TaskRegistry<M: RawMutex> {
    inner: Mutex<M, RefCell<Inner>>,
}

impl<M: RawMutex> TaskRegistry<M> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                tasks: FnvIndexMap::new(),
                next: Some(TaskId::FIRST),
            })),
        }
    }

    /// Registers `thread_id`, idempotently. Returns the id and whether this
    /// call created the record.
    pub fn register(&self, thread_id: u32, name: Option<&str>) -> (TaskId, bool) {
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            if let Some(record) = inner.tasks.get(&thread_id) {
                return (record.id, false);
            }
            let Some(id) = inner.next else {
                return (TaskId::INVALID, false);
            };
            inner.next = id.next();
            let record = TaskRecord {
                id,
                name: name.map(truncated),
            };
            // the map outsizes the id space, insertion cannot fail
            let _ = unwrap!(inner.tasks.insert(thread_id, record).ok());
            (id, true)
        })
    }

    /// The id registered for `thread_id`, [`TaskId::INVALID`] if none.
    pub fn current(&self, thread_id: u32) -> TaskId {
        self.inner.lock(|cell| {
            cell.borrow()
                .tasks
                .get(&thread_id)
                .map_or(TaskId::INVALID, |record| record.id)
        })
    }

    pub fn name_of(&self, id: TaskId) -> Option<String<NAME_CAPACITY>> {
        self.inner.lock(|cell| {
            cell.borrow()
                .tasks
                .values()
                .find(|record| record.id == id)
                .and_then(|record| record.name.clone())
        })
    }
}

fn truncated(name: &str) -> String<NAME_CAPACITY> {
    let mut stored = String::new();
    for ch in name.chars() {
        if stored.push(ch).is_err() {
            break;
        }
    }
    stored
}

/// Mapping from topic to its message prefix
///
/// Messages sent for an unregistered topic are discarded before rendering.
pub(crate) struct TopicRegistry<M: RawMutex> {
    inner: Mutex<M, RefCell<FnvIndexMap<u8, &'static str, TOPIC_CAPACITY>>>,
}

impl<M: RawMutex> TopicRegistry<M> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(FnvIndexMap::new())),
        }
    }

    /// Registers `topic` with its prefix. Silently ignored once the topic
    /// table is full.
    pub fn register(&self, topic: Topic, prefix: &'static str) {
        self.inner.lock(|cell| {
            let _ = cell.borrow_mut().insert(topic.into_u8(), prefix);
        });
    }

    pub fn prefix_of(&self, topic: Topic) -> Option<&'static str> {
        self.inner
            .lock(|cell| cell.borrow().get(&topic.into_u8()).copied())
    }
}
