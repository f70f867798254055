// Path: crates/stf/src/authorizations.rs
//! Authorization pool rotation (α′).

use jam_state::State;
use jam_types::params::ChainParams;
use jam_types::TimeSlot;

/// Advances each core's authorizer pool: the scheduled queue entry for this
/// slot joins the pool, which stays duplicate-free and keeps only its most
/// recent O entries. Consumed authorizers were already removed during
/// guarantee admission.
pub fn rotate(state: &mut State, params: &ChainParams, now: TimeSlot) {
    let slot_index = now as usize % params.auth_queue_size;
    for (pool, queue) in state.auth_pools.iter_mut().zip(state.auth_queues.iter()) {
        if let Some(head) = queue.get(slot_index) {
            pool.retain(|h| h != head);
            pool.push(*head);
        }
        if pool.len() > params.auth_pool_size {
            let excess = pool.len() - params.auth_pool_size;
            pool.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::small_state;

    #[test]
    fn queue_head_joins_and_pool_caps() {
        let mut state = small_state();
        let params = crate::tests_support::params();
        state.auth_queues[0][3 % params.auth_queue_size] = [9; 32];
        state.auth_pools[0] = (0..params.auth_pool_size as u8).map(|i| [i; 32]).collect();

        rotate(&mut state, &params, 3);

        assert_eq!(state.auth_pools[0].len(), params.auth_pool_size);
        assert_eq!(*state.auth_pools[0].last().unwrap(), [9; 32]);
        // The oldest entry fell off the front.
        assert_eq!(state.auth_pools[0][0], [1; 32]);
    }

    #[test]
    fn repeated_queue_head_does_not_duplicate() {
        let mut state = small_state();
        let params = crate::tests_support::params();
        // The genesis queues are all-zero; rotating twice over the same head
        // must keep a single pool entry.
        rotate(&mut state, &params, 0);
        rotate(&mut state, &params, 1);
        assert_eq!(state.auth_pools[0], vec![[0u8; 32]]);
    }
}
