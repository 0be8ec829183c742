//! Constants used throughout the guard

pub mod token;

/// Label placed in `blocked_by` when the emergency stop is engaged.
pub const EMERGENCY_STOP: &str = "EMERGENCY_STOP";

/// Label placed in `blocked_by` when the actual slippage exceeds the limit.
pub const SLIPPAGE_EXCEEDED: &str = "SLIPPAGE_EXCEEDED";

/// Default maximum accepted slippage (1%).
pub const DEFAULT_MAX_SLIPPAGE: f64 = 0.01;

/// Default risk score above which an asset blocks a transaction.
pub const DEFAULT_RISK_THRESHOLD: f64 = 0.7;

/// Default lifetime of a cached risk assessment, in milliseconds.
pub const DEFAULT_CACHE_TTL_MS: u64 = 60_000;

/// Default number of concurrent gateway fetches in a batch.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Default per-fetch timeout for the risk gateway, in milliseconds.
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 5_000;
