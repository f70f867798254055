// Path: crates/types/src/params.rs
//! Protocol parameters.
//!
//! Every constant that must be identical across the nodes of one chain lives
//! in [`ChainParams`]. Nothing in the core reads a chain-variable value from
//! anywhere else; sub-transitions receive `&ChainParams` explicitly.

use serde::{Deserialize, Serialize};

/// The full parameter set of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParams {
    /// P: seconds per timeslot.
    pub slot_period: u32,
    /// E: timeslots per epoch.
    pub epoch_length: u32,
    /// Y: closing tail of an epoch in which ticket submission is rejected.
    pub ticket_tail: u32,
    /// C: number of cores.
    pub core_count: u16,
    /// V: number of validators.
    pub validator_count: u16,
    /// HD: number of recent blocks retained in history.
    pub history_depth: usize,
    /// L: maximum age in timeslots of a work report's lookup anchor.
    pub lookup_anchor_age: u32,
    /// D: timeslots before an unreferenced preimage request may be expunged.
    pub preimage_expiry: u32,

    /// G_A: gas allocated to accumulate a single work report.
    pub gas_accumulate_report: i64,
    /// G_I: gas allocated to a work package's is-authorized invocation.
    pub gas_is_authorized: i64,
    /// G_R: gas allocated to a work package's refine invocation.
    pub gas_refine: i64,
    /// G_T: total accumulation gas available in one block.
    pub gas_accumulate_total: i64,

    /// W_A: maximum size of an authorizer's code in octets.
    pub max_authorizer_code: usize,
    /// W_B: maximum size of an encoded work package with extrinsics and imports.
    pub max_package_size: usize,
    /// W_C: maximum size of service code in octets.
    pub max_service_code: usize,
    /// W_E: size of an erasure-coded piece in octets.
    pub erasure_piece_size: usize,
    /// W_G: size of a segment in octets (W_P * W_E).
    pub segment_size: usize,
    /// W_M: maximum imported segments per work package.
    pub max_imports: usize,
    /// W_X: maximum exported segments per work package.
    pub max_exports: usize,
    /// W_R: maximum total size of a work report's blobs in octets.
    pub max_report_size: usize,
    /// W_T: size of a deferred-transfer memo in octets.
    pub memo_size: usize,
    /// W_P: erasure-coded pieces per segment.
    pub pieces_per_segment: usize,

    /// I: maximum work items in a package, and digests in a report.
    pub max_work_items: usize,
    /// J: maximum dependencies in a work report's context.
    pub max_dependencies: usize,
    /// K: maximum tickets in a single block's extrinsic.
    pub max_tickets_per_block: usize,
    /// N: ticket attempts per validator per epoch.
    pub ticket_attempts: u8,
    /// O: maximum authorizers in a core's pool.
    pub auth_pool_size: usize,
    /// Q: slots in a core's authorization queue.
    pub auth_queue_size: usize,
    /// R: validator-to-core rotation period in timeslots.
    pub rotation_period: u32,
    /// S: maximum entries in the accumulation queue.
    pub max_accumulation_queue: usize,
    /// T: maximum extrinsics in a work package.
    pub max_package_extrinsics: usize,
    /// U: timeslots after which an unassured report times out.
    pub report_timeout: u32,

    /// BI: balance cost per state item.
    pub balance_per_item: u64,
    /// BL: balance cost per state octet.
    pub balance_per_octet: u64,
    /// BS: base balance cost of a service.
    pub balance_base: u64,
}

impl ChainParams {
    /// The mainnet-calibrated parameter set.
    pub fn mainnet() -> Self {
        Self {
            slot_period: 6,
            epoch_length: 600,
            ticket_tail: 500,
            core_count: 341,
            validator_count: 1023,
            history_depth: 8,
            lookup_anchor_age: 14_400,
            preimage_expiry: 19_200,
            gas_accumulate_report: 10_000_000,
            gas_is_authorized: 50_000_000,
            gas_refine: 5_000_000_000,
            gas_accumulate_total: 3_500_000_000,
            max_authorizer_code: 64_000,
            max_package_size: 13_794_305,
            max_service_code: 4_000_000,
            erasure_piece_size: 684,
            segment_size: 4104,
            max_imports: 3072,
            max_exports: 3072,
            max_report_size: 49_152,
            memo_size: 128,
            pieces_per_segment: 6,
            max_work_items: 16,
            max_dependencies: 8,
            max_tickets_per_block: 16,
            ticket_attempts: 2,
            auth_pool_size: 8,
            auth_queue_size: 80,
            rotation_period: 10,
            max_accumulation_queue: 1 << 16,
            max_package_extrinsics: 128,
            report_timeout: 5,
            balance_per_item: 10,
            balance_per_octet: 1,
            balance_base: 100,
        }
    }

    /// A small-footprint profile for tests: two cores, six validators,
    /// twelve-slot epochs. Gas and size limits stay at mainnet values, which
    /// are never the binding constraint in unit tests.
    pub fn tiny() -> Self {
        Self {
            epoch_length: 12,
            ticket_tail: 10,
            core_count: 2,
            validator_count: 6,
            max_tickets_per_block: 16,
            rotation_period: 4,
            ..Self::mainnet()
        }
    }

    /// The epoch index of a timeslot.
    pub fn epoch_of(&self, slot: u32) -> u32 {
        slot / self.epoch_length
    }

    /// The position of a timeslot within its epoch.
    pub fn slot_phase(&self, slot: u32) -> u32 {
        slot % self.epoch_length
    }

    /// True when `slot` opens a new epoch relative to `prev`.
    pub fn crosses_epoch(&self, prev: u32, slot: u32) -> bool {
        self.epoch_of(slot) > self.epoch_of(prev)
    }

    /// The assurance super-majority threshold, ⌈2V/3⌉ + 1.
    pub fn availability_threshold(&self) -> usize {
        (2 * self.validator_count as usize).div_ceil(3) + 1
    }
}

/// Domain-separation tags prefixed to signed payloads.
pub mod domains {
    /// Assurance of a work package's availability.
    pub const AVAILABLE: &[u8] = b"jam_available";
    /// BEEFY-style commitment to the accumulation log.
    pub const BEEFY: &[u8] = b"jam_beefy";
    /// The per-block entropy VRF.
    pub const ENTROPY: &[u8] = b"jam_entropy";
    /// Block seal under a fallback key.
    pub const FALLBACK_SEAL: &[u8] = b"jam_fallback_seal";
    /// Guarantee of a work report.
    pub const GUARANTEE: &[u8] = b"jam_guarantee";
    /// Announcement of intent to guarantee.
    pub const ANNOUNCE: &[u8] = b"jam_announce";
    /// Block seal under a ticketed key.
    pub const TICKET_SEAL: &[u8] = b"jam_ticket_seal";
    /// Audit announcement.
    pub const AUDIT: &[u8] = b"jam_audit";
    /// Judgment that a work report is valid.
    pub const VALID: &[u8] = b"jam_valid";
    /// Judgment that a work report is invalid.
    pub const INVALID: &[u8] = b"jam_invalid";
}
