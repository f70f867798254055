// Path: crates/storage/src/redb_store.rs
//! A pure-Rust persistent backend over `redb`.

use crate::{Backend, Column, StorageError};
use redb::{Database, ReadableTable, TableDefinition};
use std::collections::BTreeMap;
use std::path::Path;

/// ---- Table definitions (one table per column) ----
const SERVICE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("SERVICE");
const AUTH: TableDefinition<&[u8], &[u8]> = TableDefinition::new("AUTH");
const RECENT: TableDefinition<&[u8], &[u8]> = TableDefinition::new("RECENT");
const VALIDATORS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("VALIDATORS");
const STATS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("STATS");

fn table_of(col: Column) -> TableDefinition<'static, &'static [u8], &'static [u8]> {
    match col {
        Column::Service => SERVICE,
        Column::Auth => AUTH,
        Column::Recent => RECENT,
        Column::Validators => VALIDATORS,
        Column::Stats => STATS,
    }
}

fn backend_err(e: impl std::fmt::Display) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// A [`Backend`] persisting each column to its own `redb` table. The staged
/// buffer is applied inside a single write transaction on `commit`, so a
/// crash mid-commit leaves the previous state intact.
pub struct RedbBackend {
    db: Database,
    buffer: BTreeMap<(Column, Vec<u8>), Option<Vec<u8>>>,
}

impl RedbBackend {
    /// Opens (or creates) a store at `path` and ensures all tables exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = Database::create(path).map_err(backend_err)?;
        {
            let w = db.begin_write().map_err(backend_err)?;
            for col in Column::ALL {
                w.open_table(table_of(col)).map_err(backend_err)?;
            }
            w.commit().map_err(backend_err)?;
        }
        Ok(Self {
            db,
            buffer: BTreeMap::new(),
        })
    }
}

impl Backend for RedbBackend {
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
        let read = self.db.begin_read().map_err(backend_err)?;
        let table = read.open_table(table_of(col)).map_err(backend_err)?;
        let value = table
            .get(key)
            .map_err(backend_err)?
            .map(|guard| guard.value().to_vec());
        Ok(value)
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        let staged = std::mem::take(&mut self.buffer);
        let count = staged.len();
        let write = self.db.begin_write().map_err(backend_err)?;
        {
            for ((col, key), value) in &staged {
                let mut table = write.open_table(table_of(*col)).map_err(backend_err)?;
                match value {
                    Some(v) => {
                        table
                            .insert(key.as_slice(), v.as_slice())
                            .map_err(backend_err)?;
                    }
                    None => {
                        table.remove(key.as_slice()).map_err(backend_err)?;
                    }
                }
            }
        }
        write.commit().map_err(backend_err)?;
        tracing::debug!(ops = count, "redb commit applied");
        Ok(())
    }

    fn rollback(&mut self) {
        self.buffer.clear();
    }

    fn pairs(&self, col: Column) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let read = self.db.begin_read().map_err(backend_err)?;
        let table = read.open_table(table_of(col)).map_err(backend_err)?;
        let mut out: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        for entry in table.iter().map_err(backend_err)? {
            let (k, v) = entry.map_err(backend_err)?;
            out.insert(k.value().to_vec(), v.value().to_vec());
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.redb");
        {
            let mut store = RedbBackend::open(&path).unwrap();
            store.put(Column::Service, b"svc", vec![1, 2, 3]);
            store.commit().unwrap();
        }
        let store = RedbBackend::open(&path).unwrap();
        assert_eq!(
            store.get(Column::Service, b"svc").unwrap(),
            Some(vec![1, 2, 3])
        );
    }

    #[test]
    fn rollback_discards_everything_staged() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RedbBackend::open(dir.path().join("store.redb")).unwrap();
        store.put(Column::Recent, b"k", vec![7]);
        store.rollback();
        store.commit().unwrap();
        assert_eq!(store.get(Column::Recent, b"k").unwrap(), None);
    }

    #[test]
    fn pairs_include_staged_edits() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RedbBackend::open(dir.path().join("store.redb")).unwrap();
        store.put(Column::Auth, b"a", vec![1]);
        store.commit().unwrap();
        store.put(Column::Auth, b"b", vec![2]);
        let pairs = store.pairs(Column::Auth).unwrap();
        assert_eq!(pairs.len(), 2);
    }
}
