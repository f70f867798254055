// Path: crates/stf/src/preimages.rs
//! Preimage provision (δ′).

use jam_crypto::blake2b;
use jam_state::State;
use jam_types::block::Preimage;
use jam_types::error::TransitionError;
use jam_types::{Hash, ServiceId, TimeSlot};

/// Validates and applies provided preimages.
///
/// One left-to-right pass enforces the ordering contract (service ids
/// non-decreasing, hashes strictly increasing within a service), that every
/// referenced service exists, and that each blob answers an open, unprovided
/// solicitation. Nothing mutates unless the whole extrinsic is valid.
pub fn apply(
    state: &mut State,
    preimages: &[Preimage],
    now: TimeSlot,
) -> Result<(), TransitionError> {
    let mut staged: Vec<(ServiceId, Hash, &Preimage)> = Vec::with_capacity(preimages.len());
    let mut last: Option<(ServiceId, Hash)> = None;

    for preimage in preimages {
        let hash = blake2b(&preimage.blob);
        if let Some((service, prev_hash)) = last {
            let ordered = preimage.requester > service
                || (preimage.requester == service && hash > prev_hash);
            if !ordered {
                return Err(TransitionError::PreimagesNotSortedUnique);
            }
        }
        last = Some((preimage.requester, hash));

        let account = state
            .services
            .get(&preimage.requester)
            .ok_or(TransitionError::ServiceNotFound(preimage.requester))?;
        let key = (hash, preimage.blob.len() as u32);
        let open = account
            .requests
            .get(&key)
            .is_some_and(|req| req.appearances.is_empty());
        if !open || account.preimages.contains_key(&hash) {
            return Err(TransitionError::PreimageUnneeded);
        }
        staged.push((preimage.requester, hash, preimage));
    }

    for (service, hash, preimage) in staged {
        let account = state
            .services
            .get_mut(&service)
            .expect("validated service exists");
        account.preimages.insert(hash, preimage.blob.clone());
        let key = (hash, preimage.blob.len() as u32);
        account
            .requests
            .get_mut(&key)
            .expect("validated request exists")
            .appearances
            .push(now);
    }
    Ok(())
}
