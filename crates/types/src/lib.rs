// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # JAM Core Types
//!
//! Foundational crate for the JAM core: the canonical binary codec, the
//! protocol parameter set and every consensus data structure, along with the
//! error enums shared across the workspace.
//!
//! ## Architectural Role
//!
//! As the base crate, `jam-types` has minimal dependencies and is itself a
//! dependency of every other crate in the workspace. Field order in the
//! structures here is consensus-critical: the codec is positional and two
//! implementations disagreeing on a single field order diverge on every
//! hash. All `Encode`/`Decode` implementations are therefore written by
//! hand next to the type they serialize.

/// The block wire format: header, extrinsic lanes, block.
pub mod block;
/// The canonical, deterministic binary codec.
pub mod codec;
/// Dispute extrinsics and judgment state.
pub mod disputes;
/// Shared error types and the stable error-code trait.
pub mod error;
/// Protocol parameters and signing-domain tags.
pub mod params;
/// Privileged service assignments.
pub mod privileges;
/// Safrole tickets, seal keys and election state.
pub mod safrole;
/// Service accounts and preimage solicitations.
pub mod service;
/// Activity statistics.
pub mod statistics;
/// Validator key bundles.
pub mod validator;
/// Work packages, reports, guarantees and assurances.
pub mod work;

pub(crate) mod serde_util;

/// A 32-octet Blake2b-256 or Keccak-256 digest.
pub type Hash = [u8; 32];
/// A block timeslot index.
pub type TimeSlot = u32;
/// A service account identifier.
pub type ServiceId = u32;
/// An index into the core set, below C.
pub type CoreIndex = u16;
/// An index into the active validator set, below V.
pub type ValidatorIndex = u16;
/// A gas amount. Signed: metering may run one step past zero before the
/// out-of-gas condition is reported.
pub type Gas = i64;
/// An Ed25519 public key.
pub type Ed25519Key = [u8; 32];
/// An Ed25519 signature.
pub type Ed25519Signature = [u8; 64];
/// A Bandersnatch public key.
pub type BandersnatchKey = [u8; 32];
/// A Bandersnatch (VRF) signature.
pub type BandersnatchSignature = [u8; 96];
/// A Bandersnatch ring-VRF proof.
pub type RingVrfProof = [u8; 784];
/// A ring commitment over a validator set.
pub type RingRoot = [u8; 144];
