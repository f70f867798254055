// Path: crates/state/src/mmr.rs
//! Merkle Mountain Range and the accumulation-output Mountain Belt.
//!
//! Both hash with Keccak-256 so the accumulation log stays provable by
//! Ethereum-side light clients; nothing else in the system uses Keccak.

use jam_crypto::keccak256;
use jam_types::codec::{Decode, Encode};
use jam_types::error::DecodeError;
use jam_types::{Hash, ServiceId};
use serde::{Deserialize, Serialize};

/// An append-only range of peaks. `peaks[i]`, when present, commits to
/// `2^i` leaves.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Mmr {
    /// The peak at each height, low to high.
    pub peaks: Vec<Option<Hash>>,
}

impl Mmr {
    /// An empty range.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a leaf, carrying full peaks upward.
    pub fn append(&mut self, leaf: Hash) {
        let mut carry = leaf;
        let mut pos = 0;
        loop {
            if pos == self.peaks.len() {
                self.peaks.push(Some(carry));
                return;
            }
            match self.peaks[pos].take() {
                None => {
                    self.peaks[pos] = Some(carry);
                    return;
                }
                Some(peak) => {
                    let mut data = Vec::with_capacity(64);
                    data.extend_from_slice(&peak);
                    data.extend_from_slice(&carry);
                    carry = keccak256(&data);
                    pos += 1;
                }
            }
        }
    }

    /// Folds the populated peaks into a single commitment.
    ///
    /// A single peak is its own commitment; further peaks fold left-to-right
    /// as `H("peak" ++ acc ++ next)`. An empty range commits to the zero
    /// hash.
    pub fn super_peak(&self) -> Hash {
        let mut populated = self.peaks.iter().flatten();
        let Some(first) = populated.next() else {
            return [0; 32];
        };
        populated.fold(*first, |acc, next| {
            let mut data = Vec::with_capacity(4 + 64);
            data.extend_from_slice(b"peak");
            data.extend_from_slice(&acc);
            data.extend_from_slice(next);
            keccak256(&data)
        })
    }

    /// The number of leaves appended so far.
    pub fn leaf_count(&self) -> u64 {
        self.peaks
            .iter()
            .enumerate()
            .map(|(i, p)| if p.is_some() { 1u64 << i } else { 0 })
            .sum()
    }
}

impl Encode for Mmr {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.peaks.encode_to(dest);
    }
}

impl Decode for Mmr {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            peaks: Decode::decode(input)?,
        })
    }
}

/// The accumulation-output log: an [`Mmr`] over tagged
/// `(service, output-hash)` leaves.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MountainBelt {
    /// The underlying range.
    pub mmr: Mmr,
}

impl MountainBelt {
    /// An empty belt.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one accumulation output.
    pub fn append(&mut self, service: ServiceId, output: &Hash) {
        let mut data = Vec::with_capacity(6 + 4 + 32);
        data.extend_from_slice(b"accout");
        data.extend_from_slice(&service.to_be_bytes());
        data.extend_from_slice(output);
        self.mmr.append(keccak256(&data));
    }

    /// The belt's current commitment.
    pub fn root(&self) -> Hash {
        self.mmr.super_peak()
    }
}

impl Encode for MountainBelt {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.mmr.encode_to(dest);
    }
}

impl Decode for MountainBelt {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            mmr: Decode::decode(input)?,
        })
    }
}
