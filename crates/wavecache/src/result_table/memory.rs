use super::ResultBackend;
use crate::Result;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Session-scoped backend used when durable storage is unavailable.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl ResultBackend for MemoryBackend {
    fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.entries.lock().contains_key(id))
    }

    fn bulk_get(&self, ids: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        let entries = self.entries.lock();
        Ok(ids.iter().map(|id| entries.get(id).cloned()).collect())
    }

    fn bulk_put(&self, batch: Vec<(String, Vec<u8>)>) -> Result<()> {
        self.entries.lock().extend(batch);
        Ok(())
    }

    fn bulk_delete(&self, ids: &[String]) -> Result<()> {
        let mut entries = self.entries.lock();
        for id in ids {
            entries.remove(id);
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries.lock().clear();
        Ok(())
    }
}
