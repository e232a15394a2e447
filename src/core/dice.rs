//! Dice for all rules resolution
//!
//! Every random decision in the core goes through [`Dice`], which wraps a
//! serializable ChaCha RNG so a snapshot resumes with the exact same stream.
//! Tests can queue scripted results that are consumed before the RNG.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Result of a 2d6 roll, keeping both dice for the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roll2d6 {
    pub first: u32,
    pub second: u32,
}

impl Roll2d6 {
    pub fn total(&self) -> u32 {
        self.first + self.second
    }

    /// True when the roll meets or beats `target`
    pub fn succeeds(&self, target: i32) -> bool {
        self.total() as i32 >= target
    }
}

impl fmt::Display for Roll2d6 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}+{})", self.total(), self.first, self.second)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dice {
    rng: ChaCha12Rng,
    /// Values consumed before the RNG (test scripting)
    #[serde(default)]
    scripted: VecDeque<u32>,
    /// Number of dice thrown so far
    #[serde(default)]
    thrown: u64,
}

impl Dice {
    pub fn seeded(seed: u64) -> Self {
        Dice {
            rng: ChaCha12Rng::seed_from_u64(seed),
            scripted: VecDeque::new(),
            thrown: 0,
        }
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha12Rng::seed_from_u64(seed);
    }

    /// Queue results to be returned before falling back to the RNG.
    ///
    /// `d6` consumes one value per die; `pick(len)` consumes one value and
    /// reduces it modulo `len`.
    pub fn script(&mut self, values: &[u32]) {
        self.scripted.extend(values.iter().copied());
    }

    pub fn scripted_remaining(&self) -> usize {
        self.scripted.len()
    }

    pub fn clear_script(&mut self) {
        self.scripted.clear();
    }

    pub fn thrown(&self) -> u64 {
        self.thrown
    }

    pub fn d6(&mut self) -> u32 {
        self.thrown += 1;
        match self.scripted.pop_front() {
            Some(v) => v.clamp(1, 6),
            None => self.rng.gen_range(1..=6),
        }
    }

    pub fn roll_2d6(&mut self) -> Roll2d6 {
        let first = self.d6();
        let second = self.d6();
        Roll2d6 { first, second }
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    pub fn pick(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        self.thrown += 1;
        match self.scripted.pop_front() {
            Some(v) => v as usize % len.max(1),
            None => self.rng.gen_range(0..len.max(1)),
        }
    }
}

impl Default for Dice {
    fn default() -> Self {
        Dice::seeded(0)
    }
}
