//! Deterministic Random Number Generator
//!
//! Uses Xorshift128+ algorithm for fast, high-quality, deterministic
//! randomness. Given the same seed, produces identical sequences on all
//! platforms, which keeps mine layouts replayable from a board seed.

use sha2::{Digest, Sha256};

/// Deterministic PRNG using Xorshift128+ algorithm.
///
/// # Determinism Guarantee
///
/// Given the same seed, this RNG will produce the exact same sequence
/// of random numbers on any platform.
///
/// # Example
///
/// ```
/// use mineclash::core::rng::DeterministicRng;
///
/// let mut rng = DeterministicRng::new(12345);
/// let value = rng.next_u64();
/// assert_eq!(value, 6233086606872742541); // Always the same!
/// ```
#[derive(Clone, Debug)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// Uses SplitMix64 to initialize the internal state, ensuring
    /// good distribution even from weak seeds.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // State must never be all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a random integer in range [0, max).
    #[inline]
    pub fn next_index(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        // Simple modulo - slight bias for very large max, but acceptable
        // for grid-sized draws
        (self.next_u64() % max as u64) as usize
    }

    /// Sample `count` distinct indices from `[0, population)` without
    /// replacement.
    ///
    /// Partial Fisher-Yates over a scratch index table: unbiased and
    /// O(population) regardless of how many draws are requested. `count`
    /// is clamped to the population size.
    pub fn sample(&mut self, population: usize, count: usize) -> Vec<usize> {
        let count = count.min(population);
        let mut pool: Vec<usize> = (0..population).collect();
        let mut picked = Vec::with_capacity(count);

        let mut left = population;
        for _ in 0..count {
            let at = self.next_index(left);
            picked.push(pool[at]);
            pool[at] = pool[left - 1];
            left -= 1;
        }

        picked
    }

    /// Select a random element from a slice.
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            None
        } else {
            Some(&slice[self.next_index(slice.len())])
        }
    }
}

/// SplitMix64 for seed initialization.
/// Produces well-distributed values from sequential seeds.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive a per-board seed from match parameters.
///
/// Mixes entropy gathered at pairing time with the match id and the board
/// side, so the two boards of one match never share a layout and a replay
/// of the match only needs the two derived seeds.
pub fn derive_board_seed(entropy: u64, match_id: u64, side: u8) -> u64 {
    let mut hasher = Sha256::new();

    // Domain separator
    hasher.update(b"MINECLASH_SEED_V1");
    hasher.update(entropy.to_le_bytes());
    hasher.update(match_id.to_le_bytes());
    hasher.update([side]);

    let hash = hasher.finalize();

    // Take first 8 bytes as seed
    u64::from_le_bytes(hash[0..8].try_into().unwrap())
}

// =============================================================================
// TESTS
// =============================================================================
