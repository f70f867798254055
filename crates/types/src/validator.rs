// Path: crates/types/src/validator.rs
//! Validator key material.

use crate::codec::{Decode, Encode};
use crate::error::DecodeError;
use crate::{BandersnatchKey, Ed25519Key};
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;

/// The published key bundle of a single validator.
///
/// A validator vector of length V composes the active set; the position of a
/// key bundle within it is the validator index used by credentials,
/// assurances and judgments. An offending validator's entry is replaced by
/// [`ValidatorKey::zeroed`] wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorKey {
    /// Bandersnatch public key, used for seals, entropy VRF and tickets.
    pub bandersnatch: BandersnatchKey,
    /// Ed25519 public key, used for guarantees, assurances and judgments.
    pub ed25519: Ed25519Key,
    /// BLS public key, reserved for the finality commitment scheme.
    #[serde(with = "BigArray")]
    pub bls: [u8; 144],
    /// Free-form metadata, conventionally the validator's endpoint.
    #[serde(with = "BigArray")]
    pub metadata: [u8; 128],
}

impl ValidatorKey {
    /// The null key bundle substituted for offenders.
    pub fn zeroed() -> Self {
        Self {
            bandersnatch: [0; 32],
            ed25519: [0; 32],
            bls: [0; 144],
            metadata: [0; 128],
        }
    }

    /// True when every key field is zero.
    pub fn is_zeroed(&self) -> bool {
        self.bandersnatch == [0; 32] && self.ed25519 == [0; 32] && self.bls == [0; 144]
    }
}

impl Encode for ValidatorKey {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.bandersnatch.encode_to(dest);
        self.ed25519.encode_to(dest);
        self.bls.encode_to(dest);
        self.metadata.encode_to(dest);
    }
}

impl Decode for ValidatorKey {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            bandersnatch: Decode::decode(input)?,
            ed25519: Decode::decode(input)?,
            bls: Decode::decode(input)?,
            metadata: Decode::decode(input)?,
        })
    }
}
