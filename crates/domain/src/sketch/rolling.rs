use serde::Serialize;

use super::countmin::CountMinSketch;
use super::entity::{SketchKey, SketchParams};
use super::error::SketchError;

const SLOTS: usize = 3;

/// Role of a slot in the three-way rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotRole {
    ActiveWrite,
    Query,
    Clearing,
}

/// Sliding-window sketch built from three rotating instances.
///
/// Inserts go to the ACTIVE-WRITE slot, queries read the QUERY slot (the
/// previous, completed window) and the CLEARING slot is zeroed a few
/// cells per insert. A window tick rotates
/// ACTIVE-WRITE → QUERY → CLEARING → ACTIVE-WRITE.
#[derive(Debug, Clone)]
pub struct RollingSketch {
    slots: [CountMinSketch; SLOTS],
    write: usize,
    clear_budget: usize,
    ticks: u64,
}

impl RollingSketch {
    pub fn new(params: &SketchParams, clear_budget: usize) -> Result<Self, SketchError> {
        if clear_budget == 0 {
            return Err(SketchError::ZeroClearBudget);
        }
        let first = CountMinSketch::new(params)?;
        Ok(Self {
            slots: [first.clone(), first.clone(), first],
            write: 0,
            clear_budget,
            ticks: 0,
        })
    }

    fn query_slot(&self) -> usize {
        (self.write + 1) % SLOTS
    }

    fn clearing_slot(&self) -> usize {
        (self.write + 2) % SLOTS
    }

    pub fn role_of(&self, slot: usize) -> SlotRole {
        if slot == self.write {
            SlotRole::ActiveWrite
        } else if slot == self.query_slot() {
            SlotRole::Query
        } else {
            SlotRole::Clearing
        }
    }

    /// Insert into the ACTIVE-WRITE slot and advance the background clear.
    pub fn insert(&mut self, key: SketchKey) {
        self.slots[self.write].insert(key);
        let clearing = self.clearing_slot();
        self.slots[clearing].clear_step(self.clear_budget);
    }

    /// Estimate from the last completed window.
    pub fn query(&self, key: SketchKey) -> u32 {
        self.slots[self.query_slot()].query(key)
    }

    /// Estimate from the window currently being filled.
    pub fn query_current(&self, key: SketchKey) -> u32 {
        self.slots[self.write].query(key)
    }

    /// Rotate roles by one step.
    ///
    /// The CLEARING slot is fully zeroed before it becomes ACTIVE-WRITE,
    /// and the old QUERY slot starts its sweep.
    pub fn tick(&mut self) {
        let clearing = self.clearing_slot();
        self.slots[clearing].finish_sweep();

        self.write = clearing;
        let next_clearing = self.clearing_slot();
        self.slots[next_clearing].begin_sweep();
        self.ticks += 1;
    }

    /// Apply `count` ticks. Three rotations already expire every slot,
    /// so larger gaps are capped.
    pub fn tick_many(&mut self, count: u64) {
        for _ in 0..count.min(SLOTS as u64) {
            self.tick();
        }
        self.ticks += count.saturating_sub(SLOTS as u64);
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn saturations(&self) -> u64 {
        self.slots.iter().map(CountMinSketch::saturations).sum()
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.clear();
        }
    }
}
