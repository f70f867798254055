// Path: crates/types/src/work.rs
//! Work packages, work reports and their attestations.

use crate::codec::{Bits, Decode, Encode};
use crate::error::DecodeError;
use crate::{Ed25519Signature, Gas, Hash, ServiceId, TimeSlot};
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;
use std::collections::BTreeMap;

/// The execution context a work package was refined against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefineContext {
    /// Header hash of the anchor block.
    pub anchor: Hash,
    /// Posterior state root of the anchor block.
    pub state_root: Hash,
    /// Posterior accumulation root of the anchor block.
    pub accumulation_root: Hash,
    /// Header hash of the lookup anchor, used for historical preimage reads.
    pub lookup_anchor: Hash,
    /// Timeslot of the lookup anchor; must be within L of the present.
    pub lookup_slot: TimeSlot,
    /// Hashes of packages that must accumulate before this one.
    pub prerequisites: Vec<Hash>,
}

impl Encode for RefineContext {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.anchor.encode_to(dest);
        self.state_root.encode_to(dest);
        self.accumulation_root.encode_to(dest);
        self.lookup_anchor.encode_to(dest);
        self.lookup_slot.encode_to(dest);
        self.prerequisites.encode_to(dest);
    }
}

impl Decode for RefineContext {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            anchor: Decode::decode(input)?,
            state_root: Decode::decode(input)?,
            accumulation_root: Decode::decode(input)?,
            lookup_anchor: Decode::decode(input)?,
            lookup_slot: Decode::decode(input)?,
            prerequisites: Decode::decode(input)?,
        })
    }
}

/// One item of computation within a work package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// The service whose code refines and accumulates this item.
    pub service: ServiceId,
    /// Hash of the service code expected at refinement time.
    pub code_hash: Hash,
    /// Opaque input passed to refine.
    pub payload: Vec<u8>,
    /// Gas budget for the refine invocation.
    pub refine_gas: Gas,
    /// Gas budget for the accumulate invocation.
    pub accumulate_gas: Gas,
    /// Imported segments as (segment-root, index) pairs.
    pub imports: Vec<(Hash, u16)>,
    /// Extrinsic blobs as (hash, length) pairs.
    pub extrinsics: Vec<(Hash, u32)>,
    /// Number of segments the item exports.
    pub export_count: u16,
}

impl Encode for WorkItem {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.service.encode_to(dest);
        self.code_hash.encode_to(dest);
        self.payload.encode_to(dest);
        self.refine_gas.encode_to(dest);
        self.accumulate_gas.encode_to(dest);
        self.imports.encode_to(dest);
        self.extrinsics.encode_to(dest);
        self.export_count.encode_to(dest);
    }
}

impl Decode for WorkItem {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            service: Decode::decode(input)?,
            code_hash: Decode::decode(input)?,
            payload: Decode::decode(input)?,
            refine_gas: Decode::decode(input)?,
            accumulate_gas: Decode::decode(input)?,
            imports: Decode::decode(input)?,
            extrinsics: Decode::decode(input)?,
            export_count: Decode::decode(input)?,
        })
    }
}

/// A bundle of work items sharing an authorization and a refine context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkPackage {
    /// Authorization token checked by the authorizer's is-authorized logic.
    pub auth_token: Vec<u8>,
    /// The service hosting the authorizer code.
    pub auth_service: ServiceId,
    /// Hash of the authorizer code.
    pub auth_code_hash: Hash,
    /// Configuration blob for the authorizer.
    pub auth_config: Vec<u8>,
    /// The context this package was built against.
    pub context: RefineContext,
    /// The items to execute, at most I.
    pub items: Vec<WorkItem>,
}

impl Encode for WorkPackage {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.auth_token.encode_to(dest);
        self.auth_service.encode_to(dest);
        self.auth_code_hash.encode_to(dest);
        self.auth_config.encode_to(dest);
        self.context.encode_to(dest);
        self.items.encode_to(dest);
    }
}

impl Decode for WorkPackage {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            auth_token: Decode::decode(input)?,
            auth_service: Decode::decode(input)?,
            auth_code_hash: Decode::decode(input)?,
            auth_config: Decode::decode(input)?,
            context: Decode::decode(input)?,
            items: Decode::decode(input)?,
        })
    }
}

/// The outcome of refining one work item.
///
/// Error variants are containment-only: they mark the digest, never the
/// block. Their tags surface through [`WorkResult::error_tag`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkResult {
    /// Refinement succeeded with this output blob.
    Ok(Vec<u8>),
    /// The refine invocation exhausted its gas.
    OutOfGas,
    /// The refine invocation trapped.
    Panic,
    /// The item exported a different number of segments than declared.
    BadExportCount,
    /// An imported segment could not be resolved.
    BadImport,
    /// The service code preimage was unavailable.
    BadCode,
    /// The service code exceeded the maximum size.
    CodeTooLarge,
}

impl WorkResult {
    /// The successful output, if any.
    pub fn output(&self) -> Option<&[u8]> {
        match self {
            WorkResult::Ok(blob) => Some(blob),
            _ => None,
        }
    }

    /// The stable tag of the error variant, `None` for success.
    pub fn error_tag(&self) -> Option<&'static str> {
        match self {
            WorkResult::Ok(_) => None,
            WorkResult::OutOfGas => Some("out_of_gas"),
            WorkResult::Panic => Some("panic"),
            WorkResult::BadExportCount => Some("bad_export_count"),
            WorkResult::BadImport => Some("bad_import"),
            WorkResult::BadCode => Some("bad_code"),
            WorkResult::CodeTooLarge => Some("code_too_large"),
        }
    }
}

impl Encode for WorkResult {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        match self {
            WorkResult::Ok(blob) => {
                dest.push(0);
                blob.encode_to(dest);
            }
            WorkResult::OutOfGas => dest.push(1),
            WorkResult::Panic => dest.push(2),
            WorkResult::BadExportCount => dest.push(3),
            WorkResult::BadImport => dest.push(4),
            WorkResult::BadCode => dest.push(5),
            WorkResult::CodeTooLarge => dest.push(6),
        }
    }
}

impl Decode for WorkResult {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        match u8::decode(input)? {
            0 => Ok(WorkResult::Ok(Decode::decode(input)?)),
            1 => Ok(WorkResult::OutOfGas),
            2 => Ok(WorkResult::Panic),
            3 => Ok(WorkResult::BadExportCount),
            4 => Ok(WorkResult::BadImport),
            5 => Ok(WorkResult::BadCode),
            6 => Ok(WorkResult::CodeTooLarge),
            other => Err(DecodeError::UnknownVariant(other)),
        }
    }
}

/// The per-item result row of a work report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkDigest {
    /// The service that will accumulate this digest.
    pub service: ServiceId,
    /// Hash of the service code at refinement time.
    pub code_hash: Hash,
    /// Hash of the item's payload.
    pub payload_hash: Hash,
    /// Gas the accumulate invocation is entitled to.
    pub accumulate_gas: Gas,
    /// Gas actually consumed during refinement.
    pub gas_used: Gas,
    /// The refinement outcome.
    pub result: WorkResult,
}

impl Encode for WorkDigest {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.service.encode_to(dest);
        self.code_hash.encode_to(dest);
        self.payload_hash.encode_to(dest);
        self.accumulate_gas.encode_to(dest);
        self.gas_used.encode_to(dest);
        self.result.encode_to(dest);
    }
}

impl Decode for WorkDigest {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            service: Decode::decode(input)?,
            code_hash: Decode::decode(input)?,
            payload_hash: Decode::decode(input)?,
            accumulate_gas: Decode::decode(input)?,
            gas_used: Decode::decode(input)?,
            result: Decode::decode(input)?,
        })
    }
}

/// The signed claim that a work package was refined on a core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkReport {
    /// The refined work package.
    pub specification: WorkPackage,
    /// The context claimed at refinement; mirrors the package's.
    pub context: RefineContext,
    /// The core the package was refined on.
    pub core_index: u16,
    /// The authorizer consumed from the core's pool.
    pub authorizer_hash: Hash,
    /// Total refine gas consumed across items.
    pub gas_used: Gas,
    /// Output of the is-authorized invocation.
    pub trace: Vec<u8>,
    /// Exported segment roots, keyed by package hash.
    #[serde(with = "crate::serde_util::map_as_pairs")]
    pub segment_roots: BTreeMap<Hash, Hash>,
    /// Per-item results, at most I.
    pub digests: Vec<WorkDigest>,
}

impl Encode for WorkReport {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.specification.encode_to(dest);
        self.context.encode_to(dest);
        self.core_index.encode_to(dest);
        self.authorizer_hash.encode_to(dest);
        self.gas_used.encode_to(dest);
        self.trace.encode_to(dest);
        self.segment_roots.encode_to(dest);
        self.digests.encode_to(dest);
    }
}

impl Decode for WorkReport {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            specification: Decode::decode(input)?,
            context: Decode::decode(input)?,
            core_index: Decode::decode(input)?,
            authorizer_hash: Decode::decode(input)?,
            gas_used: Decode::decode(input)?,
            trace: Decode::decode(input)?,
            segment_roots: Decode::decode(input)?,
            digests: Decode::decode(input)?,
        })
    }
}

/// A single guarantor's signature over a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Index of the signing validator in the active set.
    pub validator_index: u16,
    /// Ed25519 signature over the guarantee domain and report hash.
    #[serde(with = "BigArray")]
    pub signature: Ed25519Signature,
}

impl Encode for Credential {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.validator_index.encode_to(dest);
        self.signature.encode_to(dest);
    }
}

impl Decode for Credential {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            validator_index: Decode::decode(input)?,
            signature: Decode::decode(input)?,
        })
    }
}

/// A guaranteed work report as carried in the extrinsic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guarantee {
    /// The report being attested.
    pub report: WorkReport,
    /// The timeslot the guarantors worked in.
    pub slot: TimeSlot,
    /// Two or three credentials with strictly increasing validator indices.
    pub credentials: Vec<Credential>,
}

impl Encode for Guarantee {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.report.encode_to(dest);
        self.slot.encode_to(dest);
        self.credentials.encode_to(dest);
    }
}

impl Decode for Guarantee {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            report: Decode::decode(input)?,
            slot: Decode::decode(input)?,
            credentials: Decode::decode(input)?,
        })
    }
}

/// A validator's availability attestation over all cores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assurance {
    /// Parent-block anchor the attestation is bound to.
    pub anchor: Hash,
    /// One bit per core: set when the validator holds its chunks.
    pub bitfield: Bits,
    /// Index of the attesting validator.
    pub validator_index: u16,
    /// Ed25519 signature over the availability domain, anchor and bitfield.
    #[serde(with = "BigArray")]
    pub signature: Ed25519Signature,
}

impl Encode for Assurance {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.anchor.encode_to(dest);
        self.bitfield.encode_to(dest);
        self.validator_index.encode_to(dest);
        self.signature.encode_to(dest);
    }
}

impl Decode for Assurance {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            anchor: Decode::decode(input)?,
            bitfield: Decode::decode(input)?,
            validator_index: Decode::decode(input)?,
            signature: Decode::decode(input)?,
        })
    }
}

/// A report admitted to a core, awaiting availability (an entry of ρ).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReport {
    /// The guaranteed report.
    pub report: WorkReport,
    /// The timeslot the guarantee entered state; drives the U timeout.
    pub admitted_at: TimeSlot,
}

impl Encode for PendingReport {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.report.encode_to(dest);
        self.admitted_at.encode_to(dest);
    }
}

impl Decode for PendingReport {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            report: Decode::decode(input)?,
            admitted_at: Decode::decode(input)?,
        })
    }
}
