//! Deterministic hashing of the shadow state.

use crate::engine::ShadowEngine;

/// Computes the cryptographic digest of the shadow state.
///
/// Covers the persistent shadow model only: the logical clock, the three
/// interval maps, and the commit-variable tracker, each in canonical
/// address order. Per-thread transaction contexts (replay-transient) and
/// the report log are excluded.
///
/// Two engines fed the same trace must produce identical digests.
pub fn state_digest(engine: &ShadowEngine) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();

    hasher.update(&engine.global_time().to_le_bytes());

    // Domain separators keep an empty map distinguishable from a missing one.
    hasher.update(&[1]);
    for (range, state) in engine.states().iter() {
        hasher.update(&range.start.to_le_bytes());
        hasher.update(&range.size.to_le_bytes());
        hasher.update(&[state as u8]);
    }

    hasher.update(&[2]);
    for (range, time) in engine.modify_times().iter() {
        hasher.update(&range.start.to_le_bytes());
        hasher.update(&range.size.to_le_bytes());
        hasher.update(&time.to_le_bytes());
    }

    hasher.update(&[3]);
    for (range, ip) in engine.write_ips().iter() {
        hasher.update(&range.start.to_le_bytes());
        hasher.update(&range.size.to_le_bytes());
        hasher.update(&ip.to_le_bytes());
    }

    hasher.update(&[4]);
    for range in engine.commit_tracker().vars().iter() {
        hasher.update(&range.start.to_le_bytes());
        hasher.update(&range.size.to_le_bytes());
    }
    match engine.commit_tracker().commit_time() {
        Some(time) => {
            hasher.update(&[1]);
            hasher.update(&time.to_le_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }

    *hasher.finalize().as_bytes()
}
