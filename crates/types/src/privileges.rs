// Path: crates/types/src/privileges.rs
//! Privileged service assignments (χ).

use crate::codec::{Decode, Encode};
use crate::error::DecodeError;
use crate::{Gas, ServiceId};
use serde::{Deserialize, Serialize};

/// The privileged-service component (χ) of the chain state.
///
/// The staging set (ι) and authorization queue (φ) are separate state
/// components; the accumulate host environment bundles them with these
/// assignments into its partial state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrivilegedState {
    /// The service allowed to re-bless privileges and create gratis services.
    pub manager: ServiceId,
    /// Per core, the service allowed to reassign its authorization queue.
    pub assigners: Vec<ServiceId>,
    /// The service allowed to designate the next validator set.
    pub delegator: ServiceId,
    /// The service allowed to create services with reserved identifiers.
    pub registrar: ServiceId,
    /// Services accumulated every block with a guaranteed gas allowance.
    pub always_access: Vec<(ServiceId, Gas)>,
}

impl Encode for PrivilegedState {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.manager.encode_to(dest);
        self.assigners.encode_to(dest);
        self.delegator.encode_to(dest);
        self.registrar.encode_to(dest);
        self.always_access.encode_to(dest);
    }
}

impl Decode for PrivilegedState {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            manager: Decode::decode(input)?,
            assigners: Decode::decode(input)?,
            delegator: Decode::decode(input)?,
            registrar: Decode::decode(input)?,
            always_access: Decode::decode(input)?,
        })
    }
}
