// Path: crates/storage/src/memory.rs
//! An in-memory backend for tests and light embedding.

use crate::{Backend, Column, StorageError};
use std::collections::BTreeMap;

type ColumnMap = BTreeMap<Vec<u8>, Vec<u8>>;

/// A [`Backend`] holding everything in sorted in-memory maps.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    committed: BTreeMap<Column, ColumnMap>,
    // key -> Some(value) for staged puts, None for staged deletes.
    buffer: BTreeMap<(Column, Vec<u8>), Option<Vec<u8>>>,
}

impl MemoryBackend {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of staged, uncommitted operations.
    pub fn staged_len(&self) -> usize {
        self.buffer.len()
    }
}

impl Backend for MemoryBackend {
    fn put(&mut self, col: Column, key: &[u8], value: Vec<u8>) {
        self.buffer.insert((col, key.to_vec()), Some(value));
    }

    fn delete(&mut self, col: Column, key: &[u8]) {
        self.buffer.insert((col, key.to_vec()), None);
    }

    fn get(&self, col: Column, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        if let Some(staged) = self.buffer.get(&(col, key.to_vec())) {
            return Ok(staged.clone());
        }
        Ok(self
            .committed
            .get(&col)
            .and_then(|map| map.get(key))
            .cloned())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        for ((col, key), value) in std::mem::take(&mut self.buffer) {
            let map = self.committed.entry(col).or_default();
            match value {
                Some(v) => {
                    map.insert(key, v);
                }
                None => {
                    map.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn rollback(&mut self) {
        self.buffer.clear();
    }

    fn pairs(&self, col: Column) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let mut out: ColumnMap = self.committed.get(&col).cloned().unwrap_or_default();
        for ((c, key), value) in &self.buffer {
            if *c != col {
                continue;
            }
            match value {
                Some(v) => {
                    out.insert(key.clone(), v.clone());
                }
                None => {
                    out.remove(key);
                }
            }
        }
        Ok(out.into_iter().collect())
    }
}
