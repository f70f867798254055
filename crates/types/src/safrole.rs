// Path: crates/types/src/safrole.rs
//! Safrole block-author election state.

use crate::codec::{Decode, Encode};
use crate::error::DecodeError;
use crate::validator::ValidatorKey;
use crate::{BandersnatchKey, Hash, RingRoot, RingVrfProof};
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;

/// An admitted seal-key candidate, derived from a ring-VRF output.
///
/// Tickets order lexicographically by identifier; the attempt index only
/// breaks exact identifier ties, which cannot occur for honestly generated
/// tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ticket {
    /// The VRF output identifying this ticket.
    pub id: Hash,
    /// The entry index used when generating the ticket, in `[0, N)`.
    pub attempt: u8,
}

impl Encode for Ticket {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.id.encode_to(dest);
        self.attempt.encode_to(dest);
    }
}

impl Decode for Ticket {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            id: Decode::decode(input)?,
            attempt: Decode::decode(input)?,
        })
    }
}

/// A ticket as submitted in the extrinsic: the attempt plus the ring proof.
/// The identifier is not on the wire; it is recovered from the proof during
/// verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketEnvelope {
    /// The entry index, in `[0, N)`.
    pub attempt: u8,
    /// The Bandersnatch ring-VRF proof over the epoch root.
    #[serde(with = "BigArray")]
    pub signature: RingVrfProof,
}

impl Encode for TicketEnvelope {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.attempt.encode_to(dest);
        self.signature.encode_to(dest);
    }
}

impl Decode for TicketEnvelope {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            attempt: Decode::decode(input)?,
            signature: Decode::decode(input)?,
        })
    }
}

/// The per-slot seal authorization table for one epoch.
///
/// Exactly one of the two modes holds at any time; either way the sequence
/// has one entry per slot of the epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SealKeys {
    /// Ticketed mode: the epoch closed with a saturated accumulator.
    Tickets(Vec<Ticket>),
    /// Fallback mode: entropy-keyed cycle over the validator set.
    Fallback(Vec<BandersnatchKey>),
}

impl SealKeys {
    /// The number of slots covered.
    pub fn len(&self) -> usize {
        match self {
            SealKeys::Tickets(t) => t.len(),
            SealKeys::Fallback(f) => f.len(),
        }
    }

    /// True when no slots are covered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True in ticketed mode.
    pub fn is_ticketed(&self) -> bool {
        matches!(self, SealKeys::Tickets(_))
    }
}

impl Encode for SealKeys {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        match self {
            SealKeys::Tickets(tickets) => {
                dest.push(0);
                tickets.encode_to(dest);
            }
            SealKeys::Fallback(keys) => {
                dest.push(1);
                keys.encode_to(dest);
            }
        }
    }
}

impl Decode for SealKeys {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        match u8::decode(input)? {
            0 => Ok(SealKeys::Tickets(Decode::decode(input)?)),
            1 => Ok(SealKeys::Fallback(Decode::decode(input)?)),
            other => Err(DecodeError::UnknownVariant(other)),
        }
    }
}

/// The Safrole component (γ) of the chain state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafroleState {
    /// The validator set taking office at the next epoch boundary.
    pub pending: Vec<ValidatorKey>,
    /// Ring commitment to `pending`, against which tickets are proven.
    #[serde(with = "BigArray")]
    pub epoch_root: RingRoot,
    /// Seal authorization per slot of the current epoch.
    pub seal_keys: SealKeys,
    /// Sorted ticket candidates for the next epoch, at most E entries.
    pub ticket_accumulator: Vec<Ticket>,
}

impl Encode for SafroleState {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.pending.encode_to(dest);
        self.epoch_root.encode_to(dest);
        self.seal_keys.encode_to(dest);
        self.ticket_accumulator.encode_to(dest);
    }
}

impl Decode for SafroleState {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            pending: Decode::decode(input)?,
            epoch_root: Decode::decode(input)?,
            seal_keys: Decode::decode(input)?,
            ticket_accumulator: Decode::decode(input)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_exact;

    #[test]
    fn tickets_order_by_identifier() {
        let a = Ticket { id: [1; 32], attempt: 1 };
        let b = Ticket { id: [2; 32], attempt: 0 };
        assert!(a < b);
    }

    #[test]
    fn seal_keys_round_trip() {
        let keys = SealKeys::Fallback(vec![[7; 32], [8; 32]]);
        assert_eq!(decode_exact::<SealKeys>(&keys.encode()).unwrap(), keys);
        let tickets = SealKeys::Tickets(vec![Ticket { id: [3; 32], attempt: 0 }]);
        assert_eq!(decode_exact::<SealKeys>(&tickets.encode()).unwrap(), tickets);
    }
}
