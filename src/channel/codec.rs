//! Fixed-width slot encoding for candidate solutions

use crate::channel::layout::Slot;
use crate::graph::{CandidateSolution, Edge, SLOT_EDGES};

/// Copy the candidate's edges into a slot, padding the rest with
/// [`Edge::SENTINEL`].
pub fn encode(candidate: &CandidateSolution) -> Slot {
    let mut slot = [Edge::SENTINEL; SLOT_EDGES];
    for (dst, src) in slot.iter_mut().zip(candidate.edges()) {
        *dst = *src;
    }
    slot
}

/// Collect the real entries of a slot in position order.
///
/// Sentinels may appear anywhere; they are skipped rather than treated as a
/// terminator.
pub fn decode(slot: &Slot) -> CandidateSolution {
    let mut candidate = CandidateSolution::new();
    for edge in slot.iter().filter(|e| e.is_real()) {
        candidate.push(*edge);
    }
    candidate
}
