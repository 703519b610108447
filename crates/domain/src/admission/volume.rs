/// Byte-volume accumulator with a latched per-window verdict.
///
/// `observe` adds to the running total of the current window. At each
/// window boundary the verdict "running total > threshold" is latched and
/// the total restarts at zero, so `is_elevated` always describes the last
/// completed window.
#[derive(Debug, Clone)]
pub struct VolumeGate {
    threshold: u64,
    running: u64,
    elevated: bool,
    windows: u64,
}

impl VolumeGate {
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold,
            running: 0,
            elevated: false,
            windows: 0,
        }
    }

    pub fn observe(&mut self, bytes: u64) {
        self.running = self.running.saturating_add(bytes);
    }

    /// Verdict of the last completed window.
    pub fn is_elevated(&self) -> bool {
        self.elevated
    }

    /// Whether the window being filled already exceeds the threshold.
    pub fn exceeds_threshold(&self) -> bool {
        self.running > self.threshold
    }

    pub fn running_total(&self) -> u64 {
        self.running
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Close `count` windows. Windows after the first are empty, so a
    /// gap always latches "not elevated".
    pub fn close_windows(&mut self, count: u64) {
        if count == 0 {
            return;
        }
        self.elevated = count == 1 && self.exceeds_threshold();
        self.running = 0;
        self.windows += count;
    }

    pub fn windows_closed(&self) -> u64 {
        self.windows
    }
}
