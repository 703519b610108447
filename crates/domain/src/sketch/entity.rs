use serde::{Deserialize, Serialize};

use super::error::SketchError;

/// Modulus of the per-row universal hash: the largest prime below 2^32.
pub const HASH_PRIME: u64 = 4_294_967_291;

/// Maximum number of rows per sketch instance.
pub const MAX_DEPTH: usize = 8;

/// Default `(a, b)` coefficients, one pair per row.
pub const DEFAULT_HASH_PARAMS: [HashParams; MAX_DEPTH] = [
    HashParams::new(2_654_435_761, 805_306_457),
    HashParams::new(2_246_822_519, 1_610_612_741),
    HashParams::new(3_266_489_917, 402_653_189),
    HashParams::new(668_265_263, 201_326_611),
    HashParams::new(374_761_393, 1_000_000_009),
    HashParams::new(1_000_000_007, 998_244_353),
    HashParams::new(2_147_483_647, 3_037_000_493),
    HashParams::new(16_777_619, 4_294_967_279),
];

// ── Key ─────────────────────────────────────────────────────────────

/// 64-bit sketch key built from two 32-bit fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SketchKey(pub u64);

impl SketchKey {
    /// `low` occupies bits 0..32, `high` bits 32..64.
    pub fn pack(low: u32, high: u32) -> Self {
        Self(u64::from(low) | (u64::from(high) << 32))
    }

    pub fn low(self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }

    pub fn high(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

// ── Hash coefficients ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashParams {
    pub a: u64,
    pub b: u64,
}

impl HashParams {
    pub const fn new(a: u64, b: u64) -> Self {
        Self { a, b }
    }
}

// ── Sketch shape ────────────────────────────────────────────────────

/// Shape of one sketch instance. Fixed for the lifetime of the instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SketchParams {
    pub depth: usize,
    /// Cells per row; must be a power of two.
    pub width: usize,
    pub counter_bits: u8,
    /// Explicit per-row coefficients. Empty means the default table.
    pub hash_params: Vec<HashParams>,
}

impl Default for SketchParams {
    fn default() -> Self {
        Self {
            depth: 4,
            width: 16_384,
            counter_bits: 32,
            hash_params: Vec::new(),
        }
    }
}

impl SketchParams {
    pub fn validate(&self) -> Result<(), SketchError> {
        if self.depth == 0 {
            return Err(SketchError::ZeroDepth);
        }
        if self.depth > MAX_DEPTH {
            return Err(SketchError::DepthTooLarge {
                depth: self.depth,
                max: MAX_DEPTH,
            });
        }
        if !self.width.is_power_of_two() {
            return Err(SketchError::WidthNotPowerOfTwo { width: self.width });
        }
        if !(1..=32).contains(&self.counter_bits) {
            return Err(SketchError::CounterBits {
                bits: self.counter_bits,
            });
        }
        if !self.hash_params.is_empty() {
            if self.hash_params.len() != self.depth {
                return Err(SketchError::HashParamCount {
                    expected: self.depth,
                    got: self.hash_params.len(),
                });
            }
            if let Some(row) = self.hash_params.iter().position(|p| p.a % HASH_PRIME == 0) {
                return Err(SketchError::DegenerateHash { row });
            }
        }
        Ok(())
    }

    /// Coefficients actually used, one pair per row.
    pub fn resolved_hash_params(&self) -> Vec<HashParams> {
        if self.hash_params.is_empty() {
            DEFAULT_HASH_PARAMS.iter().copied().take(self.depth).collect()
        } else {
            self.hash_params.clone()
        }
    }

    /// Largest value a counter cell can hold.
    pub fn counter_max(&self) -> u32 {
        counter_max(self.counter_bits)
    }
}

/// `2^bits - 1`, for `bits` in 1..=32.
pub fn counter_max(bits: u8) -> u32 {
    let bits = u32::from(bits.clamp(1, 32));
    u32::MAX >> (32 - bits)
}

// ── Counter cell ────────────────────────────────────────────────────

/// Fixed-width unsigned counter that clamps at its maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct CounterCell(u32);

impl CounterCell {
    pub fn value(self) -> u32 {
        self.0
    }

    /// Increment by one, clamping at `max`. Returns `false` when the
    /// cell was already saturated.
    pub fn saturating_increment(&mut self, max: u32) -> bool {
        if self.0 >= max {
            return false;
        }
        self.0 += 1;
        true
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }
}
