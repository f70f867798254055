// Path: crates/state/src/serialize.rs
//! Canonical state serialization and the state-root commitment.

use crate::{ReadyRecord, State};
use jam_crypto::blake2b;
use jam_types::codec::{Decode, Encode};
use jam_types::error::DecodeError;
use jam_types::Hash;

impl Encode for State {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.auth_pools.encode_to(dest);
        self.recent.encode_to(dest);
        self.safrole.encode_to(dest);
        self.services.encode_to(dest);
        for entropy in &self.entropy {
            entropy.encode_to(dest);
        }
        self.staging_set.encode_to(dest);
        self.current_set.encode_to(dest);
        self.previous_set.encode_to(dest);
        self.reports.encode_to(dest);
        self.timeslot.encode_to(dest);
        self.auth_queues.encode_to(dest);
        self.privileges.encode_to(dest);
        self.statistics.encode_to(dest);
        self.ready.encode_to(dest);
        self.accumulated.encode_to(dest);
        self.last_outputs.encode_to(dest);
        self.judgments.encode_to(dest);
    }
}

impl Decode for State {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            auth_pools: Decode::decode(input)?,
            recent: Decode::decode(input)?,
            safrole: Decode::decode(input)?,
            services: Decode::decode(input)?,
            entropy: [
                Decode::decode(input)?,
                Decode::decode(input)?,
                Decode::decode(input)?,
                Decode::decode(input)?,
            ],
            staging_set: Decode::decode(input)?,
            current_set: Decode::decode(input)?,
            previous_set: Decode::decode(input)?,
            reports: Decode::decode(input)?,
            timeslot: Decode::decode(input)?,
            auth_queues: Decode::decode(input)?,
            privileges: Decode::decode(input)?,
            statistics: Decode::decode(input)?,
            ready: Vec::<ReadyRecord>::decode(input)?,
            accumulated: Decode::decode(input)?,
            last_outputs: Decode::decode(input)?,
            judgments: Decode::decode(input)?,
        })
    }
}

/// The Blake2b-256 commitment to the canonically serialized state.
pub fn state_root(state: &State) -> Hash {
    blake2b(&state.encode())
}
