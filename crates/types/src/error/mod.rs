// Path: crates/types/src/error/mod.rs
//! Error types for the JAM core.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
///
/// The codes are part of the external interface: block consumers match on
/// them, so they never change once released.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors produced by the canonical codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The input ended before the value was complete.
    #[error("Unexpected end of input")]
    UnexpectedEof,
    /// A length prefix exceeds what the remaining input could possibly hold.
    #[error("Invalid length prefix: {0}")]
    InvalidLength(u64),
    /// A map or set was encoded with out-of-order or duplicate keys.
    #[error("Map keys not strictly increasing")]
    UnsortedMap,
    /// A discriminated union carried an index outside its variant range.
    #[error("Unknown variant discriminator: {0}")]
    UnknownVariant(u8),
    /// Bytes remained after a value that must span the whole input.
    #[error("{0} trailing byte(s) after value")]
    TrailingBytes(usize),
    /// A boolean byte was neither 0x00 nor 0x01.
    #[error("Invalid boolean byte: {0:#04x}")]
    InvalidBool(u8),
}

/// The single error surface of `apply(block)`.
///
/// Any sub-transition returning one of these aborts the whole block; the
/// prior state is retained untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The header failed a structural or chain-position check.
    #[error("Invalid header: {0}")]
    BadHeader(String),
    /// The seal or entropy VRF signature did not verify.
    #[error("Invalid seal: {0}")]
    BadSeal(String),
    /// An extrinsic failed structural validation.
    #[error("Invalid extrinsic: {0}")]
    BadExtrinsic(String),
    /// A guarantee was malformed or not admissible.
    #[error("Invalid guarantee: {0}")]
    BadGuarantee(String),
    /// An assurance was malformed or not admissible.
    #[error("Invalid assurance: {0}")]
    BadAssurance(String),
    /// A dispute verdict, culprit or fault was not admissible.
    #[error("Invalid dispute: {0}")]
    BadDispute(String),
    /// Tickets in the extrinsic were not strictly increasing by identifier.
    #[error("Tickets not sorted by identifier")]
    BadTicketOrder,
    /// A ticket's attempt index was outside the configured range.
    #[error("Ticket attempt out of range")]
    BadTicketAttempt,
    /// A ticket's ring-VRF proof failed verification.
    #[error("Ticket ring-VRF proof invalid")]
    BadTicketProof,
    /// A ticket was already present in the accumulator.
    #[error("Duplicate ticket")]
    DuplicateTicket,
    /// A ticket arrived inside the closed tail of the epoch.
    #[error("Ticket submitted outside the submission window")]
    UnexpectedTicket,
    /// Preimages were not sorted ascending by (service, hash) or not unique.
    #[error("Preimages not sorted or not unique")]
    PreimagesNotSortedUnique,
    /// A referenced service does not exist.
    #[error("Service {0} not found")]
    ServiceNotFound(u32),
    /// A preimage was provided without a matching open solicitation.
    #[error("Preimage was not solicited")]
    PreimageUnneeded,
    /// The outer PVM invocation itself misbehaved (not a contained guest trap).
    #[error("PVM panic")]
    PvmPanic,
    /// The outer PVM invocation exhausted its gas.
    #[error("PVM out of gas")]
    PvmOutOfGas,
    /// The outer PVM invocation faulted on memory.
    #[error("PVM page fault")]
    PvmFault,
    /// The state backend rejected the commit.
    #[error("State backend error: {0}")]
    StateBackend(String),
    /// A consensus value failed to decode.
    #[error("Codec error: {0}")]
    Codec(#[from] DecodeError),
}

impl ErrorCode for TransitionError {
    fn code(&self) -> &'static str {
        match self {
            Self::BadHeader(_) => "bad_header",
            Self::BadSeal(_) => "bad_seal",
            Self::BadExtrinsic(_) => "bad_extrinsic",
            Self::BadGuarantee(_) => "bad_guarantee",
            Self::BadAssurance(_) => "bad_assurance",
            Self::BadDispute(_) => "bad_dispute",
            Self::BadTicketOrder => "bad_ticket_order",
            Self::BadTicketAttempt => "bad_ticket_attempt",
            Self::BadTicketProof => "bad_ticket_proof",
            Self::DuplicateTicket => "duplicate_ticket",
            Self::UnexpectedTicket => "unexpected_ticket",
            Self::PreimagesNotSortedUnique => "preimages_not_sorted_unique",
            Self::ServiceNotFound(_) => "service_not_found",
            Self::PreimageUnneeded => "preimage_unneeded",
            Self::PvmPanic => "pvm_panic",
            Self::PvmOutOfGas => "pvm_oog",
            Self::PvmFault => "pvm_fault",
            Self::StateBackend(_) => "state_backend_error",
            Self::Codec(_) => "bad_extrinsic",
        }
    }
}

/// Errors from the black-boxed cryptographic delegates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The signature failed cryptographic verification.
    #[error("Signature verification failed")]
    VerificationFailed,
    /// The provided key material is malformed for the algorithm.
    #[error("Invalid cryptographic key: {0}")]
    InvalidKey(String),
    /// The provided proof or signature bytes are malformed.
    #[error("Invalid signature format: {0}")]
    InvalidSignature(String),
}

impl ErrorCode for CryptoError {
    fn code(&self) -> &'static str {
        match self {
            Self::VerificationFailed => "CRYPTO_VERIFICATION_FAILED",
            Self::InvalidKey(_) => "CRYPTO_INVALID_KEY",
            Self::InvalidSignature(_) => "CRYPTO_INVALID_SIGNATURE",
        }
    }
}

impl From<CryptoError> for TransitionError {
    fn from(e: CryptoError) -> Self {
        TransitionError::BadSeal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(TransitionError::BadTicketOrder.code(), "bad_ticket_order");
        assert_eq!(
            TransitionError::ServiceNotFound(9).code(),
            "service_not_found"
        );
        assert_eq!(
            TransitionError::StateBackend("io".into()).code(),
            "state_backend_error"
        );
        assert_eq!(
            TransitionError::Codec(DecodeError::UnexpectedEof).code(),
            "bad_extrinsic"
        );
    }
}
