// CLASSIFICATION: COMMUNITY
// Filename: rng.rs v0.1
// Author: Cohesix Codex
// Date Modified: 2026-10-17

/// Small deterministic Xorshift64 generator feeding simulated leaf values.
#[derive(Debug, Clone, Copy)]
pub struct TinyRng(u64);

impl TinyRng {
    /// Create a new RNG with the given `seed`. A zero seed is remapped
    /// since xorshift never leaves the all-zero state.
    pub const fn new(seed: u64) -> Self {
        if seed == 0 {
            Self(0x9e37_79b9_7f4a_7c15)
        } else {
            Self(seed)
        }
    }

    #[inline]
    fn step(&mut self) {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
    }

    /// Return the next `u64` value.
    pub fn next_u64(&mut self) -> u64 {
        self.step();
        self.0
    }

    /// Return the next `u32` value.
    pub fn next_u32(&mut self) -> u32 {
        self.step();
        (self.0 >> 32) as u32
    }

    /// Generate a float in the range [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Integer in `low..high`; returns `low` for an empty range.
    pub fn gen_range(&mut self, low: i64, high: i64) -> i64 {
        if high <= low {
            return low;
        }
        let span = high.abs_diff(low);
        low.wrapping_add((self.next_u64() % span) as i64)
    }

    /// Random boolean.
    pub fn next_bool(&mut self) -> bool {
        self.next_u32() & 1 == 1
    }
}
