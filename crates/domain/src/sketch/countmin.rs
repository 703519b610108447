use super::entity::{SketchKey, SketchParams};
use super::error::SketchError;
use super::row::CountMinRow;

/// Count-Min sketch: `depth` independent rows of saturating counters.
///
/// Estimates never under-count. Over-counting is bounded by collisions,
/// which shrink as the width grows.
#[derive(Debug, Clone)]
pub struct CountMinSketch {
    rows: Vec<CountMinRow>,
    width: usize,
    /// Next cell (row-major) to zero during an incremental sweep.
    sweep_cursor: Option<usize>,
    saturations: u64,
}

impl CountMinSketch {
    pub fn new(params: &SketchParams) -> Result<Self, SketchError> {
        params.validate()?;
        let max = params.counter_max();
        let rows = params
            .resolved_hash_params()
            .into_iter()
            .map(|hp| CountMinRow::new(hp, params.width, max))
            .collect();

        Ok(Self {
            rows,
            width: params.width,
            sweep_cursor: None,
            saturations: 0,
        })
    }

    pub fn depth(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn insert(&mut self, key: SketchKey) {
        for row in &mut self.rows {
            if !row.insert(key) {
                self.saturations += 1;
            }
        }
    }

    /// Minimum across rows.
    pub fn query(&self, key: SketchKey) -> u32 {
        self.rows.iter().map(|r| r.query(key)).min().unwrap_or(0)
    }

    pub fn clear(&mut self) {
        for row in &mut self.rows {
            row.clear();
        }
        self.sweep_cursor = None;
    }

    /// Start an incremental clear from the first cell.
    pub fn begin_sweep(&mut self) {
        self.sweep_cursor = Some(0);
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweep_cursor.is_some()
    }

    /// Zero up to `budget` more cells of the running sweep.
    ///
    /// Returns `true` once every cell is zero (immediately if no sweep is
    /// running).
    pub fn clear_step(&mut self, budget: usize) -> bool {
        let Some(mut cursor) = self.sweep_cursor else {
            return true;
        };

        let total = self.rows.len() * self.width;
        let mut remaining = budget;
        while remaining > 0 && cursor < total {
            let row = cursor / self.width;
            let start = cursor % self.width;
            let end = (start + remaining).min(self.width);
            self.rows[row].clear_range(start, end);
            remaining -= end - start;
            cursor += end - start;
        }

        if cursor >= total {
            self.sweep_cursor = None;
            true
        } else {
            self.sweep_cursor = Some(cursor);
            false
        }
    }

    /// Finish any running sweep in one go.
    pub fn finish_sweep(&mut self) {
        if self.sweep_cursor.is_some() {
            self.clear();
        }
    }

    /// Insert attempts that hit an already saturated cell.
    pub fn saturations(&self) -> u64 {
        self.saturations
    }

    pub fn is_zeroed(&self) -> bool {
        self.rows.iter().all(CountMinRow::is_zeroed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(width: usize, bits: u8) -> CountMinSketch {
        CountMinSketch::new(&SketchParams {
            depth: 4,
            width,
            counter_bits: bits,
            hash_params: Vec::new(),
        })
        .unwrap()
    }

    #[test]
    fn never_under_estimates() {
        // Narrow sketch to force collisions.
        let mut s = small(16, 32);
        let mut truth = std::collections::HashMap::new();
        for i in 0..500u64 {
            let k = SketchKey(i % 37 * 7919);
            s.insert(k);
            *truth.entry(k).or_insert(0u32) += 1;
        }
        for (k, n) in truth {
            assert!(s.query(k) >= n, "key {k:?}");
        }
    }

    #[test]
    fn exact_without_collisions() {
        let mut s = small(4096, 32);
        let k = SketchKey::pack(1, 2);
        for _ in 0..10 {
            s.insert(k);
        }
        assert_eq!(s.query(k), 10);
    }

    #[test]
    fn cleared_sketch_reads_zero() {
        let mut s = small(64, 32);
        for i in 0..100 {
            s.insert(SketchKey(i));
        }
        s.clear();
        assert!(s.is_zeroed());
        assert_eq!(s.query(SketchKey(12_345)), 0);
        assert_eq!(s.query(SketchKey(3)), 0);
    }

    #[test]
    fn saturation_is_tolerated() {
        let mut s = small(64, 4);
        let k = SketchKey(9);
        for _ in 0..20 {
            s.insert(k);
        }
        assert_eq!(s.query(k), 15);
        assert_eq!(s.saturations(), 5 * 4);
    }

    #[test]
    fn incremental_sweep_clears_everything() {
        let mut s = small(64, 32);
        for i in 0..1000 {
            s.insert(SketchKey(i));
        }
        s.begin_sweep();
        let mut steps = 0;
        while !s.clear_step(10) {
            steps += 1;
        }
        // 4 rows × 64 cells in steps of 10
        assert_eq!(steps, 25);
        assert!(s.is_zeroed());
        assert!(!s.is_sweeping());
    }

    #[test]
    fn sweep_step_crosses_row_boundary() {
        let mut s = small(8, 32);
        for i in 0..64 {
            s.insert(SketchKey(i));
        }
        s.begin_sweep();
        assert!(!s.clear_step(12));
        assert!(!s.clear_step(12));
        assert!(s.clear_step(8));
        assert!(s.is_zeroed());
    }

    #[test]
    fn clear_step_without_sweep_is_done() {
        let mut s = small(8, 32);
        assert!(s.clear_step(1));
    }

    #[test]
    fn rejects_invalid_params() {
        let err = CountMinSketch::new(&SketchParams {
            width: 100,
            ..SketchParams::default()
        })
        .unwrap_err();
        assert_eq!(err, SketchError::WidthNotPowerOfTwo { width: 100 });
    }
}
