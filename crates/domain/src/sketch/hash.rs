use super::entity::{HASH_PRIME, HashParams, SketchKey};

/// Universal hash `((a·(x mod P) + b) mod P) mod width` for one row.
///
/// Coefficients are reduced modulo `P` at construction so the product
/// always fits in 64 bits. The cost is the same for every key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowHash {
    a: u64,
    b: u64,
    mask: u64,
}

impl RowHash {
    /// `width` must be a power of two (checked by `SketchParams::validate`).
    pub fn new(params: HashParams, width: usize) -> Self {
        Self {
            a: params.a % HASH_PRIME,
            b: params.b % HASH_PRIME,
            mask: (width as u64).saturating_sub(1),
        }
    }

    pub fn index(&self, key: SketchKey) -> usize {
        let x = key.0 % HASH_PRIME;
        let h = (self.a * x + self.b) % HASH_PRIME;
        (h & self.mask) as usize
    }
}
