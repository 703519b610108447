use std::time::Duration;

// ── Paths ──────────────────────────────────────────────────────────

pub const DEFAULT_CONFIG_PATH: &str = "/etc/floodgate/config.yaml";

// ── Pipeline sizing ────────────────────────────────────────────────

/// Link transfer unit in bytes.
pub const DEFAULT_CHUNK_WIDTH: usize = 64;

/// Frames buffered between two pipeline stages.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

// ── Metrics ────────────────────────────────────────────────────────

pub const METRICS_PREFIX: &str = "floodgate";

// ── Timeouts ───────────────────────────────────────────────────────

pub const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

// ── Replay ─────────────────────────────────────────────────────────

pub const DEFAULT_REPLAY_SECONDS: u64 = 3;
