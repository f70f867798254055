// Path: crates/storage/src/lib.rs
#![forbid(unsafe_code)]

//! Persistent storage backends for the JAM core.
//!
//! Consensus correctness never depends on a particular backend: the contract
//! is a handful of named columns with buffered writes and an atomic commit.
//! Reads observe buffered edits over committed state, so a transition can
//! stage its whole effect and either `commit` or `rollback` as one unit.

mod memory;
mod redb_store;

pub use memory::MemoryBackend;
pub use redb_store::RedbBackend;

use thiserror::Error;

/// The named columns of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    /// Service accounts, keyed by service id.
    Service,
    /// Authorization pools and queues, keyed by core index.
    Auth,
    /// Recent-history entries and the accumulation log.
    Recent,
    /// Validator sets and Safrole state.
    Validators,
    /// Activity statistics.
    Stats,
}

impl Column {
    /// All columns, in a fixed order.
    pub const ALL: [Column; 5] = [
        Column::Service,
        Column::Auth,
        Column::Recent,
        Column::Validators,
        Column::Stats,
    ];

    /// The column's stable on-disk name.
    pub fn name(self) -> &'static str {
        match self {
            Column::Service => "SERVICE",
            Column::Auth => "AUTH",
            Column::Recent => "RECENT",
            Column::Validators => "VALIDATORS",
            Column::Stats => "STATS",
        }
    }
}

/// Errors surfaced by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying store failed.
    #[error("Storage backend error: {0}")]
    Backend(String),
    /// The backend cannot enumerate pairs (e.g. a remote store).
    #[error("Pair iteration unsupported by this backend")]
    IterationUnsupported,
}

/// The two-phase column store contract.
///
/// `put` and `delete` only stage; nothing reaches durable state before
/// `commit`, and `commit` applies the whole buffer atomically or not at all.
pub trait Backend {
    /// Stages a write.
    fn put(&mut self, col: Column, key: &[u8], value: Vec<u8>);

    /// Stages a deletion.
    fn delete(&mut self, col: Column, key: &[u8]);

    /// Reads a value, reflecting staged edits over committed state.
    fn get(&self, col: Column, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Atomically applies the staged buffer.
    fn commit(&mut self) -> Result<(), StorageError>;

    /// Discards the staged buffer.
    fn rollback(&mut self);

    /// Enumerates the committed pairs of a column, staged edits included.
    /// Best-effort: backends may return [`StorageError::IterationUnsupported`].
    fn pairs(&self, col: Column) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError>;
}
