#![forbid(unsafe_code)]

use rand::rngs::{OsRng, StdRng};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};

use eirene_kernel_contracts::ph1dialogue::{DialoguePhase, DrawSeed};
use eirene_kernel_contracts::ph1session::{PoolKind, RotationSlot, SessionDialogueState};
use eirene_kernel_contracts::EmotionTag;

#[derive(Debug, PartialEq, Eq)]
pub enum SelectionError {
    EmptyCandidates,
}

impl std::fmt::Display for SelectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCandidates => write!(f, "cannot draw from an empty candidate pool"),
        }
    }
}

impl std::error::Error for SelectionError {}

/// One selection outcome. `reset` is true when the draw had to clear an
/// exhausted seen-set (or wrap a completed rotation) before it could serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Draw {
    pub index: usize,
    pub reset: bool,
}

/// Uniform draw that avoids items the session has already heard, keyed by
/// `(pool, emotion)`. When every index has been served the seen-set is
/// cleared and the draw retried once over the full pool, so short pools
/// repeat in a fresh cycle rather than starve. Without session state the
/// draw is plain uniform.
pub fn draw_from_pool(
    state: Option<&mut SessionDialogueState>,
    pool: PoolKind,
    emotion: EmotionTag,
    len: usize,
    rng: &mut StdRng,
) -> Result<Draw, SelectionError> {
    if len == 0 {
        return Err(SelectionError::EmptyCandidates);
    }
    let Some(state) = state else {
        return Ok(Draw {
            index: rng.gen_range(0..len),
            reset: false,
        });
    };
    let seen = state.seen.entry((pool, emotion)).or_default();
    // Indices past the current pool length are stale (the pack shrank);
    // they never count as unseen candidates.
    let mut unseen: Vec<usize> = (0..len).filter(|i| !seen.contains(&(*i as u16))).collect();
    let mut reset = false;
    if unseen.is_empty() {
        seen.clear();
        reset = true;
        unseen = (0..len).collect();
    }
    let index = unseen[rng.gen_range(0..unseen.len())];
    seen.insert(index as u16);
    Ok(Draw { index, reset })
}

/// Round-robin draw over a persisted shuffled order, keyed by
/// `(emotion, phase)`. Serves each index exactly once per cycle; a completed
/// cycle reshuffles and restarts with `reset = true`. A pool whose length no
/// longer matches the stored order is reshuffled silently. Without session
/// state the draw is plain uniform.
pub fn draw_rotated(
    state: Option<&mut SessionDialogueState>,
    emotion: EmotionTag,
    phase: DialoguePhase,
    len: usize,
    rng: &mut StdRng,
) -> Result<Draw, SelectionError> {
    if len == 0 {
        return Err(SelectionError::EmptyCandidates);
    }
    let Some(state) = state else {
        return Ok(Draw {
            index: rng.gen_range(0..len),
            reset: false,
        });
    };
    let slot = state.rotation.entry((emotion, phase)).or_default();
    let mut reset = false;
    if slot.order.len() != len {
        *slot = shuffled_slot(len, rng);
    } else if slot.index as usize >= slot.order.len() {
        *slot = shuffled_slot(len, rng);
        reset = true;
    }
    let index = slot.order[slot.index as usize] as usize;
    slot.index += 1;
    Ok(Draw { index, reset })
}

/// Draws `k` distinct indices, preferring ones the session has not heard.
/// When fewer than `k` unseen indices remain the shortfall is filled from
/// already-seen ones, so the count is exact whenever `k <= len`. Chosen
/// indices are recorded as seen.
pub fn sample_questions(
    state: Option<&mut SessionDialogueState>,
    emotion: EmotionTag,
    len: usize,
    k: usize,
    rng: &mut StdRng,
) -> Result<Vec<usize>, SelectionError> {
    if len == 0 || k == 0 {
        return Err(SelectionError::EmptyCandidates);
    }
    let k = k.min(len);
    let Some(state) = state else {
        let mut all: Vec<usize> = (0..len).collect();
        all.shuffle(rng);
        all.truncate(k);
        return Ok(all);
    };
    let seen = state.seen.entry((PoolKind::Question, emotion)).or_default();
    let mut unseen: Vec<usize> = (0..len).filter(|i| !seen.contains(&(*i as u16))).collect();
    let mut heard: Vec<usize> = (0..len).filter(|i| seen.contains(&(*i as u16))).collect();
    unseen.shuffle(rng);
    heard.shuffle(rng);
    let mut chosen: Vec<usize> = unseen.into_iter().take(k).collect();
    if chosen.len() < k {
        let shortfall = k - chosen.len();
        chosen.extend(heard.into_iter().take(shortfall));
    }
    for index in &chosen {
        seen.insert(*index as u16);
    }
    Ok(chosen)
}

/// Deterministic generator for one draw. Each call site derives its own seed
/// so replaying a request replays its randomness.
pub fn seeded_rng(seed: DrawSeed) -> StdRng {
    StdRng::seed_from_u64(seed.0)
}

/// Entropy-backed seed for hosts that have no session key to derive from.
pub fn entropy_draw_seed() -> DrawSeed {
    DrawSeed(OsRng.next_u64())
}

fn shuffled_slot(len: usize, rng: &mut StdRng) -> RotationSlot {
    let mut order: Vec<u16> = (0..len as u16).collect();
    order.shuffle(rng);
    RotationSlot { order, index: 0 }
}
