// Path: crates/types/src/block.rs
//! The block wire format: header and extrinsic.

use crate::codec::{Decode, Encode};
use crate::disputes::DisputesExtrinsic;
use crate::error::DecodeError;
use crate::safrole::{Ticket, TicketEnvelope};
use crate::work::{Assurance, Guarantee};
use crate::{BandersnatchKey, BandersnatchSignature, Ed25519Key, Hash, ServiceId, TimeSlot};
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;

/// Announcement of a new epoch, present exactly on epoch-boundary blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochMark {
    /// The entropy the new epoch's seal keys were (or will be) drawn from.
    pub entropy: Hash,
    /// Bandersnatch keys of the validator set taking office.
    pub validators: Vec<BandersnatchKey>,
}

impl Encode for EpochMark {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.entropy.encode_to(dest);
        self.validators.encode_to(dest);
    }
}

impl Decode for EpochMark {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            entropy: Decode::decode(input)?,
            validators: Decode::decode(input)?,
        })
    }
}

/// A block header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Hash of the parent header; the genesis marker for the first block.
    pub parent_hash: Hash,
    /// Posterior state root of the parent block.
    pub state_root: Hash,
    /// Hash of this block's serialized extrinsic.
    pub extrinsic_hash: Hash,
    /// The timeslot this block claims.
    pub timeslot: TimeSlot,
    /// Present iff the timeslot opens a new epoch.
    pub epoch_mark: Option<EpochMark>,
    /// Present iff this block closes the ticket submission window with a
    /// saturated accumulator: the epoch's winning tickets.
    pub winning_tickets: Option<Vec<Ticket>>,
    /// Ed25519 keys newly judged as offenders.
    pub offenders: Vec<Ed25519Key>,
    /// Index of the authoring validator.
    pub author_index: u16,
    /// Bandersnatch VRF signature feeding the entropy chain.
    #[serde(with = "BigArray")]
    pub vrf_signature: BandersnatchSignature,
    /// Bandersnatch seal over the unsealed header.
    #[serde(with = "BigArray")]
    pub seal: BandersnatchSignature,
}

impl Header {
    /// Encodes every field except the seal, in wire order. This is the
    /// payload the seal signature covers.
    pub fn encode_unsealed(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.parent_hash.encode_to(&mut out);
        self.state_root.encode_to(&mut out);
        self.extrinsic_hash.encode_to(&mut out);
        self.timeslot.encode_to(&mut out);
        self.epoch_mark.encode_to(&mut out);
        self.winning_tickets.encode_to(&mut out);
        self.offenders.encode_to(&mut out);
        self.author_index.encode_to(&mut out);
        self.vrf_signature.encode_to(&mut out);
        out
    }
}

impl Encode for Header {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        dest.extend_from_slice(&self.encode_unsealed());
        self.seal.encode_to(dest);
    }
}

impl Decode for Header {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            parent_hash: Decode::decode(input)?,
            state_root: Decode::decode(input)?,
            extrinsic_hash: Decode::decode(input)?,
            timeslot: Decode::decode(input)?,
            epoch_mark: Decode::decode(input)?,
            winning_tickets: Decode::decode(input)?,
            offenders: Decode::decode(input)?,
            author_index: Decode::decode(input)?,
            vrf_signature: Decode::decode(input)?,
            seal: Decode::decode(input)?,
        })
    }
}

/// A preimage provided for a soliciting service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preimage {
    /// The service that solicited the blob.
    pub requester: ServiceId,
    /// The blob itself.
    pub blob: Vec<u8>,
}

impl Encode for Preimage {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.requester.encode_to(dest);
        self.blob.encode_to(dest);
    }
}

impl Decode for Preimage {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            requester: Decode::decode(input)?,
            blob: Decode::decode(input)?,
        })
    }
}

/// The five extrinsic lanes of a block, in wire order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Extrinsic {
    /// Safrole ticket submissions.
    pub tickets: Vec<TicketEnvelope>,
    /// Preimage provisions.
    pub preimages: Vec<Preimage>,
    /// Guaranteed work reports.
    pub guarantees: Vec<Guarantee>,
    /// Availability assurances.
    pub assurances: Vec<Assurance>,
    /// Dispute verdicts, culprits and faults.
    pub disputes: DisputesExtrinsic,
}

impl Encode for Extrinsic {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.tickets.encode_to(dest);
        self.preimages.encode_to(dest);
        self.guarantees.encode_to(dest);
        self.assurances.encode_to(dest);
        self.disputes.encode_to(dest);
    }
}

impl Decode for Extrinsic {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            tickets: Decode::decode(input)?,
            preimages: Decode::decode(input)?,
            guarantees: Decode::decode(input)?,
            assurances: Decode::decode(input)?,
            disputes: Decode::decode(input)?,
        })
    }
}

/// A complete block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// The sealed header.
    pub header: Header,
    /// The extrinsic data.
    pub extrinsic: Extrinsic,
}

impl Encode for Block {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.header.encode_to(dest);
        self.extrinsic.encode_to(dest);
    }
}

impl Decode for Block {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            header: Decode::decode(input)?,
            extrinsic: Decode::decode(input)?,
        })
    }
}
