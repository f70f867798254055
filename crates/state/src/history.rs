// Path: crates/state/src/history.rs
//! Recent-block history (β).

use crate::mmr::MountainBelt;
use jam_types::codec::{Decode, Encode};
use jam_types::error::DecodeError;
use jam_types::{BandersnatchSignature, Hash};
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;
use std::collections::BTreeSet;

/// One remembered block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentBlock {
    /// Hash of the block's header.
    pub header_hash: Hash,
    /// The block's posterior state root, filled in by its child.
    pub state_root: Hash,
    /// The accumulation-log commitment as of this block.
    pub accumulation_root: Hash,
    /// Hashes of the work packages this block's guarantees reported.
    pub reported: BTreeSet<Hash>,
    /// The block's seal signature.
    #[serde(with = "BigArray")]
    pub seal: BandersnatchSignature,
}

impl Encode for RecentBlock {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.header_hash.encode_to(dest);
        self.state_root.encode_to(dest);
        self.accumulation_root.encode_to(dest);
        self.reported.encode_to(dest);
        self.seal.encode_to(dest);
    }
}

impl Decode for RecentBlock {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            header_hash: Decode::decode(input)?,
            state_root: Decode::decode(input)?,
            accumulation_root: Decode::decode(input)?,
            reported: Decode::decode(input)?,
            seal: Decode::decode(input)?,
        })
    }
}

/// The recent-history component (β): a bounded window of blocks plus the
/// accumulation-output belt.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecentHistory {
    /// The most recent blocks, oldest first, at most HD entries.
    pub blocks: Vec<RecentBlock>,
    /// The accumulation-output log across all history.
    pub belt: MountainBelt,
}

impl RecentHistory {
    /// Pushes a block, evicting the oldest past `depth` entries.
    pub fn push(&mut self, block: RecentBlock, depth: usize) {
        self.blocks.push(block);
        if self.blocks.len() > depth {
            let excess = self.blocks.len() - depth;
            self.blocks.drain(..excess);
        }
    }

    /// The most recent entry, if any.
    pub fn last_mut(&mut self) -> Option<&mut RecentBlock> {
        self.blocks.last_mut()
    }

    /// True when `hash` is a remembered header hash.
    pub fn contains_header(&self, hash: &Hash) -> bool {
        self.blocks.iter().any(|b| b.header_hash == *hash)
    }

    /// True when `hash` was reported as a package by any remembered block.
    pub fn contains_package(&self, hash: &Hash) -> bool {
        self.blocks.iter().any(|b| b.reported.contains(hash))
    }
}

impl Encode for RecentHistory {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.blocks.encode_to(dest);
        self.belt.encode_to(dest);
    }
}

impl Decode for RecentHistory {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            blocks: Decode::decode(input)?,
            belt: Decode::decode(input)?,
        })
    }
}
