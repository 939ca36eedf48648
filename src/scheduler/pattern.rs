//! LED pattern generators
//!
//! Each pattern is a small stateful cursor that, given the number of
//! active hosts, produces the next desired on/off vector. Position `i` in
//! the vector belongs to the `i`-th active host in name order.
//!
//! Patterns are not synchronized; the leader engine calls `next` from its
//! single tick loop only.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::{SchedulerError, SchedulerResult};

/// Resample attempts the random pattern makes to avoid repeating a slot
const RANDOM_RESAMPLE_ATTEMPTS: usize = 5;

// ============================================================================
// Pattern Kind
// ============================================================================

/// Available pattern strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternKind {
    /// One lit slot moving forward and wrapping around
    Linear,
    /// One lit slot bouncing between both ends ("Knight Rider")
    Alternating,
    /// Binary counter, most significant bit on the first host
    Binary,
    /// Binary counter, least significant bit on the first host
    ReverseBinary,
    /// One lit slot chosen at random
    Random,
}

impl PatternKind {
    /// Get all pattern kinds
    pub fn all() -> Vec<Self> {
        vec![
            Self::Linear,
            Self::Alternating,
            Self::Binary,
            Self::ReverseBinary,
            Self::Random,
        ]
    }

    /// Get pattern ID as string
    pub fn id(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Alternating => "alternating",
            Self::Binary => "binary",
            Self::ReverseBinary => "reverse-binary",
            Self::Random => "random",
        }
    }

    /// Try to parse from string
    pub fn from_id(id: &str) -> SchedulerResult<Self> {
        match id.to_lowercase().as_str() {
            "linear" | "rotate" => Ok(Self::Linear),
            "alternating" | "knightrider" | "knight-rider" => Ok(Self::Alternating),
            "binary" => Ok(Self::Binary),
            "reverse-binary" | "reversebinary" | "reverse_binary" => Ok(Self::ReverseBinary),
            "random" => Ok(Self::Random),
            _ => Err(SchedulerError::unknown_pattern(id)),
        }
    }

    /// Build a fresh generator for this pattern
    pub fn build(&self) -> Box<dyn Schedule> {
        match self {
            Self::Linear => Box::new(Linear::new()),
            Self::Alternating => Box::new(Alternating::new()),
            Self::Binary => Box::new(Binary::new()),
            Self::ReverseBinary => Box::new(ReverseBinary::new()),
            Self::Random => Box::new(RandomSlot::new()),
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for PatternKind {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s)
    }
}

impl Default for PatternKind {
    fn default() -> Self {
        Self::Linear
    }
}

// ============================================================================
// Schedule trait
// ============================================================================

/// A stateful on/off pattern generator
pub trait Schedule: Send {
    /// Produce the next desired state vector.
    ///
    /// The result always has exactly `count` entries, even when `count`
    /// differs from the previous call.
    fn next(&mut self, count: usize) -> Vec<bool>;

    /// Which pattern this generator implements
    fn kind(&self) -> PatternKind;
}

/// Vector with a single lit slot
fn single_on(count: usize, index: usize) -> Vec<bool> {
    let mut states = vec![false; count];
    if let Some(slot) = states.get_mut(index) {
        *slot = true;
    }
    states
}

// ============================================================================
// Linear
// ============================================================================

/// Single lit slot advancing by one each call
#[derive(Debug, Default, Clone)]
pub struct Linear {
    index: usize,
}

impl Linear {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Schedule for Linear {
    fn next(&mut self, count: usize) -> Vec<bool> {
        if count == 0 {
            return Vec::new();
        }
        self.index = (self.index + 1) % count;
        single_on(count, self.index)
    }

    fn kind(&self) -> PatternKind {
        PatternKind::Linear
    }
}

// ============================================================================
// Alternating
// ============================================================================

/// Single lit slot sweeping 0 → count-1 → 0
#[derive(Debug, Clone)]
pub struct Alternating {
    index: usize,
    forward: bool,
}

impl Alternating {
    pub fn new() -> Self {
        Self {
            index: 0,
            forward: true,
        }
    }
}

impl Default for Alternating {
    fn default() -> Self {
        Self::new()
    }
}

impl Schedule for Alternating {
    fn next(&mut self, count: usize) -> Vec<bool> {
        match count {
            0 => return Vec::new(),
            1 => return vec![true],
            _ => {}
        }

        let last = count - 1;
        if self.index > last {
            // Membership shrank under the cursor; sweep back from the far end.
            self.index = last;
            self.forward = false;
        }

        let states = single_on(count, self.index);

        if self.forward {
            self.index += 1;
            if self.index >= last {
                self.index = last;
                self.forward = false;
            }
        } else {
            self.index = self.index.saturating_sub(1);
            if self.index == 0 {
                self.forward = true;
            }
        }

        states
    }

    fn kind(&self) -> PatternKind {
        PatternKind::Alternating
    }
}

// ============================================================================
// Binary counters
// ============================================================================

/// Wrapping counter shared by both binary patterns
#[derive(Debug, Default, Clone)]
struct BitCounter {
    value: u64,
}

impl BitCounter {
    /// Advance and return the new counter bits, least significant first
    fn advance(&mut self, count: usize) -> Vec<bool> {
        self.value = self.value.wrapping_add(1);
        if count < 64 {
            self.value &= (1u64 << count) - 1;
        }
        (0..count)
            .map(|bit| bit < 64 && (self.value >> bit) & 1 == 1)
            .collect()
    }
}

/// Binary counter with the most significant bit first
#[derive(Debug, Default, Clone)]
pub struct Binary {
    counter: BitCounter,
}

impl Binary {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Schedule for Binary {
    fn next(&mut self, count: usize) -> Vec<bool> {
        if count == 0 {
            return Vec::new();
        }
        let mut bits = self.counter.advance(count);
        bits.reverse();
        bits
    }

    fn kind(&self) -> PatternKind {
        PatternKind::Binary
    }
}

/// Binary counter with the least significant bit first
#[derive(Debug, Default, Clone)]
pub struct ReverseBinary {
    counter: BitCounter,
}

impl ReverseBinary {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Schedule for ReverseBinary {
    fn next(&mut self, count: usize) -> Vec<bool> {
        if count == 0 {
            return Vec::new();
        }
        self.counter.advance(count)
    }

    fn kind(&self) -> PatternKind {
        PatternKind::ReverseBinary
    }
}

// ============================================================================
// Random
// ============================================================================

/// Single lit slot chosen at random, trying not to repeat the previous one
#[derive(Debug, Clone)]
pub struct RandomSlot {
    rng: ChaCha8Rng,
    last: Option<usize>,
}

impl RandomSlot {
    pub fn new() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
            last: None,
        }
    }

    /// Deterministic generator for reproducible runs
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            last: None,
        }
    }
}

impl Default for RandomSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl Schedule for RandomSlot {
    fn next(&mut self, count: usize) -> Vec<bool> {
        if count == 0 {
            return Vec::new();
        }

        let mut index = self.rng.gen_range(0..count);
        for _ in 0..RANDOM_RESAMPLE_ATTEMPTS {
            if Some(index) != self.last {
                break;
            }
            index = self.rng.gen_range(0..count);
        }

        self.last = Some(index);
        single_on(count, index)
    }

    fn kind(&self) -> PatternKind {
        PatternKind::Random
    }
}

// ============================================================================
// Tests
// ============================================================================
