// Path: crates/types/src/disputes.rs
//! Dispute extrinsics and the judgment component of state.

use crate::codec::{Decode, Encode};
use crate::error::DecodeError;
use crate::{Ed25519Key, Ed25519Signature, Hash};
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;
use std::collections::BTreeSet;

/// One validator's vote on the validity of a work report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgment {
    /// True for a `jam_valid` vote, false for `jam_invalid`.
    pub vote: bool,
    /// Index of the voting validator.
    pub validator_index: u16,
    /// Ed25519 signature over the vote domain and report hash.
    #[serde(with = "BigArray")]
    pub signature: Ed25519Signature,
}

impl Encode for Judgment {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.vote.encode_to(dest);
        self.validator_index.encode_to(dest);
        self.signature.encode_to(dest);
    }
}

impl Decode for Judgment {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            vote: Decode::decode(input)?,
            validator_index: Decode::decode(input)?,
            signature: Decode::decode(input)?,
        })
    }
}

/// A collected set of judgments over one work report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Hash of the judged work report.
    pub target: Hash,
    /// Epoch index the judging validator set was active in.
    pub age: u32,
    /// The votes, ordered by validator index.
    pub judgments: Vec<Judgment>,
}

impl Encode for Verdict {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.target.encode_to(dest);
        self.age.encode_to(dest);
        self.judgments.encode_to(dest);
    }
}

impl Decode for Verdict {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            target: Decode::decode(input)?,
            age: Decode::decode(input)?,
            judgments: Decode::decode(input)?,
        })
    }
}

/// Proof that a validator guaranteed a report later judged bad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Culprit {
    /// Hash of the offending report.
    pub target: Hash,
    /// Ed25519 key of the guaranteeing validator.
    pub key: Ed25519Key,
    /// The incriminating guarantee signature.
    #[serde(with = "BigArray")]
    pub signature: Ed25519Signature,
}

impl Encode for Culprit {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.target.encode_to(dest);
        self.key.encode_to(dest);
        self.signature.encode_to(dest);
    }
}

impl Decode for Culprit {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            target: Decode::decode(input)?,
            key: Decode::decode(input)?,
            signature: Decode::decode(input)?,
        })
    }
}

/// Proof that a validator judged against the final verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    /// Hash of the report the wrong vote was cast on.
    pub target: Hash,
    /// The vote the validator cast.
    pub vote: bool,
    /// Ed25519 key of the misjudging validator.
    pub key: Ed25519Key,
    /// The incriminating judgment signature.
    #[serde(with = "BigArray")]
    pub signature: Ed25519Signature,
}

impl Encode for Fault {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.target.encode_to(dest);
        self.vote.encode_to(dest);
        self.key.encode_to(dest);
        self.signature.encode_to(dest);
    }
}

impl Decode for Fault {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            target: Decode::decode(input)?,
            vote: Decode::decode(input)?,
            key: Decode::decode(input)?,
            signature: Decode::decode(input)?,
        })
    }
}

/// The dispute portion of a block's extrinsic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisputesExtrinsic {
    /// New verdicts, ordered by target hash.
    pub verdicts: Vec<Verdict>,
    /// New culprit proofs.
    pub culprits: Vec<Culprit>,
    /// New fault proofs.
    pub faults: Vec<Fault>,
}

impl DisputesExtrinsic {
    /// True when the extrinsic carries nothing.
    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty() && self.culprits.is_empty() && self.faults.is_empty()
    }
}

impl Encode for DisputesExtrinsic {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.verdicts.encode_to(dest);
        self.culprits.encode_to(dest);
        self.faults.encode_to(dest);
    }
}

impl Decode for DisputesExtrinsic {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            verdicts: Decode::decode(input)?,
            culprits: Decode::decode(input)?,
            faults: Decode::decode(input)?,
        })
    }
}

/// The judgment component (ψ) of the chain state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JudgmentState {
    /// Reports judged valid.
    pub good: BTreeSet<Hash>,
    /// Reports judged invalid.
    pub bad: BTreeSet<Hash>,
    /// Reports with contested, unresolved judgment.
    pub wonky: BTreeSet<Hash>,
    /// Ed25519 keys of validators found to have offended.
    pub offenders: BTreeSet<Ed25519Key>,
    /// Offenders surfaced in the current block, pending punishment.
    pub punish_set: BTreeSet<Ed25519Key>,
}

impl Encode for JudgmentState {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.good.encode_to(dest);
        self.bad.encode_to(dest);
        self.wonky.encode_to(dest);
        self.offenders.encode_to(dest);
        self.punish_set.encode_to(dest);
    }
}

impl Decode for JudgmentState {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            good: Decode::decode(input)?,
            bad: Decode::decode(input)?,
            wonky: Decode::decode(input)?,
            offenders: Decode::decode(input)?,
            punish_set: Decode::decode(input)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_exact;

    #[test]
    fn judgment_state_round_trips() {
        let mut state = JudgmentState::default();
        state.bad.insert([1; 32]);
        state.offenders.insert([2; 32]);
        assert_eq!(decode_exact::<JudgmentState>(&state.encode()).unwrap(), state);
    }
}
