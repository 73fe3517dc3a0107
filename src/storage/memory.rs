use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use super::{ObjectStore, StoredObject};
use crate::error::UploadError;

/// In-process store for tests and dry runs. Can be told to fail puts or deletes.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    next: AtomicU64,
    fail_puts: bool,
    fail_deletes: bool,
}

impl MemoryObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every `put` is rejected.
    #[must_use]
    pub fn failing_puts() -> Self {
        Self {
            fail_puts: true,
            ..Self::default()
        }
    }

    /// A store whose every `delete` is rejected.
    #[must_use]
    pub fn failing_deletes() -> Self {
        Self {
            fail_deletes: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.lock().contains_key(url)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        match self.objects.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        name: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<StoredObject, UploadError> {
        if self.fail_puts {
            return Err(UploadError::Rejected(format!("put of `{name}` refused")));
        }
        let seq = self.next.fetch_add(1, Ordering::Relaxed);
        let url = format!("memory://{seq}/{name}");
        self.lock().insert(url.clone(), bytes.to_vec());
        Ok(StoredObject { url })
    }

    async fn delete(&self, url: &str) -> Result<(), UploadError> {
        if self.fail_deletes {
            return Err(UploadError::Rejected(format!("delete of `{url}` refused")));
        }
        self.lock().remove(url);
        Ok(())
    }
}
