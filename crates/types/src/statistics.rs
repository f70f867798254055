// Path: crates/types/src/statistics.rs
//! Activity statistics (π).

use crate::codec::{Decode, Encode};
use crate::error::DecodeError;
use crate::ServiceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-validator activity counters for one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidatorStats {
    /// Blocks authored.
    pub blocks: u32,
    /// Tickets introduced in authored blocks.
    pub tickets: u32,
    /// Preimages introduced in authored blocks.
    pub preimages: u32,
    /// Total octets of those preimages.
    pub preimage_octets: u32,
    /// Reports guaranteed.
    pub guarantees: u32,
    /// Availability assurances submitted.
    pub assurances: u32,
}

impl Encode for ValidatorStats {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.blocks.encode_to(dest);
        self.tickets.encode_to(dest);
        self.preimages.encode_to(dest);
        self.preimage_octets.encode_to(dest);
        self.guarantees.encode_to(dest);
        self.assurances.encode_to(dest);
    }
}

impl Decode for ValidatorStats {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            blocks: Decode::decode(input)?,
            tickets: Decode::decode(input)?,
            preimages: Decode::decode(input)?,
            preimage_octets: Decode::decode(input)?,
            guarantees: Decode::decode(input)?,
            assurances: Decode::decode(input)?,
        })
    }
}

/// Per-core activity counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CoreStats {
    /// Work reports processed to availability.
    pub reports: u32,
    /// Refine gas those reports consumed.
    pub gas_used: u64,
}

impl Encode for CoreStats {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.reports.encode_to(dest);
        self.gas_used.encode_to(dest);
    }
}

impl Decode for CoreStats {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            reports: Decode::decode(input)?,
            gas_used: Decode::decode(input)?,
        })
    }
}

/// Per-service activity counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    /// Successful accumulate invocations.
    pub accumulate_count: u32,
    /// Gas those invocations consumed.
    pub accumulate_gas: u64,
}

impl Encode for ServiceStats {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.accumulate_count.encode_to(dest);
        self.accumulate_gas.encode_to(dest);
    }
}

impl Decode for ServiceStats {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            accumulate_count: Decode::decode(input)?,
            accumulate_gas: Decode::decode(input)?,
        })
    }
}

/// The statistics component (π) of the chain state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Statistics {
    /// Counters for the epoch in progress, one entry per validator.
    pub current: Vec<ValidatorStats>,
    /// Final counters of the previous epoch.
    pub previous: Vec<ValidatorStats>,
    /// Counters per core.
    pub cores: Vec<CoreStats>,
    /// Counters per service touched since genesis.
    pub services: BTreeMap<ServiceId, ServiceStats>,
}

impl Statistics {
    /// Zeroed statistics sized for `validators` and `cores`.
    pub fn empty(validators: usize, cores: usize) -> Self {
        Self {
            current: vec![ValidatorStats::default(); validators],
            previous: vec![ValidatorStats::default(); validators],
            cores: vec![CoreStats::default(); cores],
            services: BTreeMap::new(),
        }
    }

    /// Rolls the epoch: current becomes previous, current resets.
    pub fn rotate_epoch(&mut self) {
        self.previous = std::mem::take(&mut self.current);
        self.current = vec![ValidatorStats::default(); self.previous.len()];
    }
}

impl Encode for Statistics {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.current.encode_to(dest);
        self.previous.encode_to(dest);
        self.cores.encode_to(dest);
        self.services.encode_to(dest);
    }
}

impl Decode for Statistics {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            current: Decode::decode(input)?,
            previous: Decode::decode(input)?,
            cores: Decode::decode(input)?,
            services: Decode::decode(input)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_rotation_swaps_and_resets() {
        let mut stats = Statistics::empty(3, 2);
        stats.current[1].blocks = 4;
        stats.rotate_epoch();
        assert_eq!(stats.previous[1].blocks, 4);
        assert_eq!(stats.current[1].blocks, 0);
        assert_eq!(stats.current.len(), 3);
    }
}
