use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::{CitescopeError, Result};
use crate::models::WorkRecord;
use crate::storage::{RecordStore, StoredRecord};

/// In-process record store keyed by `(depth, id)`.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<BTreeMap<(u32, String), StoredRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<(u32, String), StoredRecord>>> {
        self.records
            .lock()
            .map_err(|_| CitescopeError::Storage("memory store lock poisoned".to_string()))
    }
}

impl RecordStore for MemoryRecordStore {
    fn put(&self, depth: u32, record: &WorkRecord) -> Result<()> {
        self.lock()?.insert(
            (depth, record.id.clone()),
            StoredRecord::new(depth, record.clone()),
        );
        Ok(())
    }

    fn get(&self, depth: u32, id: &str) -> Result<StoredRecord> {
        self.lock()?
            .get(&(depth, id.to_string()))
            .cloned()
            .ok_or_else(|| CitescopeError::RecordNotFound(format!("{id} (depth {depth})")))
    }

    fn list_depth(&self, depth: u32) -> Result<Vec<StoredRecord>> {
        Ok(self
            .lock()?
            .range((depth, String::new())..)
            .take_while(|((d, _), _)| *d == depth)
            .map(|(_, r)| r.clone())
            .collect())
    }

    fn depths(&self) -> Result<Vec<u32>> {
        let mut depths: Vec<u32> = self.lock()?.keys().map(|(d, _)| *d).collect();
        depths.dedup();
        Ok(depths)
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}
