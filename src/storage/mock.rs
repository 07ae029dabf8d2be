use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{LoadedHistory, StorageBackend};
use crate::entry::EntryRecord;
use crate::error::StorageError;

/// In-memory backend for unit tests.
/// Counts `publish` calls and can be switched to fail them.
#[derive(Default)]
pub struct InMemoryBackend {
    initial: Mutex<LoadedHistory>,
    published: Arc<Mutex<Vec<(String, usize)>>>,
    publish_calls: Arc<AtomicUsize>,
    fail_publish: Arc<AtomicBool>,
}

/// Shared handles for inspecting a backend after it moved into a store.
#[derive(Clone)]
pub struct Probe {
    pub published: Arc<Mutex<Vec<(String, usize)>>>,
    pub publish_calls: Arc<AtomicUsize>,
    pub fail_publish: Arc<AtomicBool>,
}

#[allow(clippy::expect_used)]
impl Probe {
    pub fn publish_count(&self) -> usize {
        self.publish_calls.load(Ordering::Relaxed)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::Relaxed);
    }

    /// `(group, log length)` for every successful publish, in order.
    pub fn published(&self) -> Vec<(String, usize)> {
        self.published.lock().expect("lock poisoned").clone()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial(initial: LoadedHistory) -> Self {
        Self {
            initial: Mutex::new(initial),
            ..Self::default()
        }
    }

    pub fn probe(&self) -> Probe {
        Probe {
            published: Arc::clone(&self.published),
            publish_calls: Arc::clone(&self.publish_calls),
            fail_publish: Arc::clone(&self.fail_publish),
        }
    }
}

#[allow(clippy::expect_used)]
impl StorageBackend for InMemoryBackend {
    fn load(&mut self) -> Result<LoadedHistory, StorageError> {
        Ok(std::mem::take(
            &mut *self.initial.lock().expect("lock poisoned"),
        ))
    }

    fn publish(&self, group: &str, log: &[Arc<EntryRecord>]) -> Result<(), StorageError> {
        self.publish_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_publish.load(Ordering::Relaxed) {
            return Err(StorageError::io(
                format!("memory://{group}"),
                std::io::Error::other("injected failure"),
            ));
        }
        self.published
            .lock()
            .expect("lock poisoned")
            .push((group.to_string(), log.len()));
        Ok(())
    }
}
