use super::entity::{CounterCell, HashParams, SketchKey};
use super::hash::RowHash;

/// One hash-indexed array of saturating counters.
#[derive(Debug, Clone)]
pub struct CountMinRow {
    cells: Vec<CounterCell>,
    hash: RowHash,
    counter_max: u32,
}

impl CountMinRow {
    pub fn new(params: HashParams, width: usize, counter_max: u32) -> Self {
        Self {
            cells: vec![CounterCell::default(); width],
            hash: RowHash::new(params, width),
            counter_max,
        }
    }

    pub fn width(&self) -> usize {
        self.cells.len()
    }

    /// Increment the key's cell. Returns `false` if it was saturated.
    pub fn insert(&mut self, key: SketchKey) -> bool {
        let idx = self.hash.index(key);
        self.cells[idx].saturating_increment(self.counter_max)
    }

    pub fn query(&self, key: SketchKey) -> u32 {
        self.cells[self.hash.index(key)].value()
    }

    pub fn clear(&mut self) {
        self.cells.fill(CounterCell::default());
    }

    /// Zero the cells in `start..end` (clamped to the row).
    pub fn clear_range(&mut self, start: usize, end: usize) {
        let end = end.min(self.cells.len());
        if start < end {
            self.cells[start..end].fill(CounterCell::default());
        }
    }

    pub fn is_zeroed(&self) -> bool {
        self.cells.iter().all(|c| c.value() == 0)
    }
}
