// Path: crates/types/src/service.rs
//! Service accounts and the preimage solicitation lifecycle.

use crate::codec::{Decode, Encode};
use crate::error::DecodeError;
use crate::params::ChainParams;
use crate::{Gas, Hash, ServiceId, TimeSlot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Format version written into the persisted account header.
pub const ACCOUNT_VERSION: u8 = 0;

/// Tag byte separating the identity prefix from the balance block in the
/// persisted account header.
pub const BALANCE_TAG: u8 = 0xEF;

/// The solicitation record for one `(hash, length)` preimage.
///
/// The appearance list advances through four phases keyed on timeslots:
/// `[]` solicited but unprovided, `[x]` provided at `x`, `[x, y]` forgotten
/// at `y`, `[x, y, z]` re-solicited and provided again at `z`. It never
/// grows past three entries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PreimageRequest {
    /// Timeslots at which the preimage's availability changed.
    pub appearances: Vec<TimeSlot>,
}

impl PreimageRequest {
    /// A fresh, unprovided solicitation.
    pub fn solicited() -> Self {
        Self::default()
    }

    /// True when the preimage is currently expected but not yet provided.
    pub fn is_unprovided(&self) -> bool {
        self.appearances.is_empty() || self.appearances.len() == 2
    }

    /// True when the preimage is currently available for lookup at `slot`.
    pub fn is_available(&self) -> bool {
        self.appearances.len() == 1 || self.appearances.len() == 3
    }
}

impl Encode for PreimageRequest {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.appearances.encode_to(dest);
    }
}

impl Decode for PreimageRequest {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            appearances: Decode::decode(input)?,
        })
    }
}

/// A balance movement queued by an accumulate invocation, settled after the
/// block's accumulation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredTransfer {
    /// The sending service.
    pub from: ServiceId,
    /// The receiving service.
    pub to: ServiceId,
    /// Amount in base units, already deducted from the sender.
    pub amount: u64,
    /// Opaque memo, fixed at the memo-size parameter.
    pub memo: Vec<u8>,
    /// Gas offered for the receiver's transfer notification.
    pub gas: Gas,
}

impl Encode for DeferredTransfer {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.from.encode_to(dest);
        self.to.encode_to(dest);
        self.amount.encode_to(dest);
        self.memo.encode_to(dest);
        self.gas.encode_to(dest);
    }
}

impl Decode for DeferredTransfer {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            from: Decode::decode(input)?,
            to: Decode::decode(input)?,
            amount: Decode::decode(input)?,
            memo: Decode::decode(input)?,
            gas: Decode::decode(input)?,
        })
    }
}

/// One on-chain service account (an entry of δ).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccount {
    /// Hash of the service's PVM code; the blob itself lives in `preimages`.
    pub code_hash: Hash,
    /// Free balance in base units.
    pub balance: u64,
    /// Minimum gas the accumulate invocation must be offered.
    pub min_acc_gas: Gas,
    /// Minimum gas an on-transfer invocation must be offered.
    pub min_memo_gas: Gas,
    /// Key-value storage owned by the service.
    #[serde(with = "crate::serde_util::map_as_pairs")]
    pub storage: BTreeMap<Vec<u8>, Vec<u8>>,
    /// Provided preimages, keyed by their Blake2b-256 hash.
    #[serde(with = "crate::serde_util::map_as_pairs")]
    pub preimages: BTreeMap<Hash, Vec<u8>>,
    /// Solicitations, keyed by `(hash, length)`.
    #[serde(with = "crate::serde_util::map_as_pairs")]
    pub requests: BTreeMap<(Hash, u32), PreimageRequest>,
    /// Octets chargeable to storage entries.
    pub storage_octets: u64,
    /// Number of storage entries.
    pub storage_items: u64,
    /// Octets chargeable to preimages and requests.
    pub preimage_octets: u64,
    /// Number of preimage requests.
    pub preimage_items: u64,
    /// Balance threshold discount granted by the registrar.
    pub gratis: u64,
    /// Timeslot at which the account was created.
    pub created_slot: TimeSlot,
    /// Timeslot of the most recent accumulation, zero if never accumulated.
    pub last_acc_slot: TimeSlot,
    /// The service that created this one; self for genesis services.
    pub parent: ServiceId,
}

impl ServiceAccount {
    /// A minimal account with the given code hash and balance.
    pub fn new(code_hash: Hash, balance: u64, created_slot: TimeSlot, parent: ServiceId) -> Self {
        Self {
            code_hash,
            balance,
            min_acc_gas: 0,
            min_memo_gas: 0,
            storage: BTreeMap::new(),
            preimages: BTreeMap::new(),
            requests: BTreeMap::new(),
            storage_octets: 0,
            storage_items: 0,
            preimage_octets: 0,
            preimage_items: 0,
            gratis: 0,
            created_slot,
            last_acc_slot: 0,
            parent,
        }
    }

    /// The minimum balance this account must retain, given its footprint.
    pub fn threshold_balance(&self, params: &ChainParams) -> u64 {
        let items = self.storage_items + self.preimage_items;
        let octets = self.storage_octets + self.preimage_octets;
        (params.balance_base
            + params.balance_per_item.saturating_mul(items)
            + params.balance_per_octet.saturating_mul(octets))
        .saturating_sub(self.gratis)
    }

    /// Recomputes the footprint counters from the maps. Used after bulk
    /// mutation; incremental paths maintain the counters directly.
    pub fn refresh_footprint(&mut self) {
        self.storage_items = self.storage.len() as u64;
        self.storage_octets = self
            .storage
            .iter()
            .map(|(k, v)| 34 + k.len() as u64 + v.len() as u64)
            .sum();
        self.preimage_items = 2 * self.requests.len() as u64;
        self.preimage_octets = self
            .requests
            .keys()
            .map(|(_, len)| 81 + u64::from(*len))
            .sum();
    }

    /// Serializes the fixed-size account header: version, truncated code
    /// hash, the balance tag and the seven u64 counters. Exactly 89 octets.
    pub fn encode_header(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(89);
        out.push(ACCOUNT_VERSION);
        out.extend_from_slice(&self.code_hash[..31]);
        out.push(BALANCE_TAG);
        out.extend_from_slice(&self.balance.to_le_bytes());
        out.extend_from_slice(&self.min_acc_gas.to_le_bytes());
        out.extend_from_slice(&self.min_memo_gas.to_le_bytes());
        out.extend_from_slice(&self.storage_octets.to_le_bytes());
        out.extend_from_slice(&self.storage_items.to_le_bytes());
        out.extend_from_slice(&self.preimage_octets.to_le_bytes());
        out.extend_from_slice(&self.preimage_items.to_le_bytes());
        out
    }
}

impl Encode for ServiceAccount {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        dest.extend_from_slice(&self.encode_header());
        // The header commits to the first 31 code-hash octets only; the tail
        // octet rides with the variable extensions to keep decoding lossless.
        dest.push(self.code_hash[31]);
        self.gratis.encode_to(dest);
        self.created_slot.encode_to(dest);
        self.last_acc_slot.encode_to(dest);
        self.parent.encode_to(dest);
        self.storage.encode_to(dest);
        self.preimages.encode_to(dest);
        self.requests.encode_to(dest);
    }
}

impl Decode for ServiceAccount {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let version = u8::decode(input)?;
        if version != ACCOUNT_VERSION {
            return Err(DecodeError::UnknownVariant(version));
        }
        let code_head: [u8; 31] = Decode::decode(input)?;
        let tag = u8::decode(input)?;
        if tag != BALANCE_TAG {
            return Err(DecodeError::UnknownVariant(tag));
        }
        let balance = u64::decode(input)?;
        let min_acc_gas = i64::decode(input)?;
        let min_memo_gas = i64::decode(input)?;
        let storage_octets = u64::decode(input)?;
        let storage_items = u64::decode(input)?;
        let preimage_octets = u64::decode(input)?;
        let preimage_items = u64::decode(input)?;
        let code_tail = u8::decode(input)?;
        let mut code_hash = [0u8; 32];
        code_hash[..31].copy_from_slice(&code_head);
        code_hash[31] = code_tail;
        Ok(Self {
            code_hash,
            balance,
            min_acc_gas,
            min_memo_gas,
            gratis: Decode::decode(input)?,
            created_slot: Decode::decode(input)?,
            last_acc_slot: Decode::decode(input)?,
            parent: Decode::decode(input)?,
            storage: Decode::decode(input)?,
            preimages: Decode::decode(input)?,
            requests: Decode::decode(input)?,
            storage_octets,
            storage_items,
            preimage_octets,
            preimage_items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_exact;

    fn sample() -> ServiceAccount {
        let mut acc = ServiceAccount::new([9; 32], 1_000, 4, 0);
        acc.storage.insert(vec![1, 2], vec![3, 4, 5]);
        acc.preimages.insert([1; 32], b"data".to_vec());
        acc.requests
            .insert(([1; 32], 4), PreimageRequest { appearances: vec![5] });
        acc.refresh_footprint();
        acc
    }

    #[test]
    fn header_is_89_octets() {
        let acc = sample();
        let header = acc.encode_header();
        assert_eq!(header.len(), 89);
        assert_eq!(header[0], ACCOUNT_VERSION);
        assert_eq!(header[32], BALANCE_TAG);
    }

    #[test]
    fn full_form_round_trips() {
        let acc = sample();
        assert_eq!(decode_exact::<ServiceAccount>(&acc.encode()).unwrap(), acc);
    }

    #[test]
    fn threshold_tracks_footprint() {
        let params = ChainParams::mainnet();
        let mut acc = ServiceAccount::new([0; 32], 0, 0, 0);
        let base = acc.threshold_balance(&params);
        assert_eq!(base, params.balance_base);
        acc.storage.insert(vec![0], vec![0; 10]);
        acc.refresh_footprint();
        assert!(acc.threshold_balance(&params) > base);
        acc.gratis = u64::MAX;
        assert_eq!(acc.threshold_balance(&params), 0);
    }

    #[test]
    fn request_lifecycle_phases() {
        let mut req = PreimageRequest::solicited();
        assert!(req.is_unprovided());
        req.appearances.push(5);
        assert!(req.is_available());
        req.appearances.push(9);
        assert!(req.is_unprovided());
        req.appearances.push(12);
        assert!(req.is_available());
    }
}
