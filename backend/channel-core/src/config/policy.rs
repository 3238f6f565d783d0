//! Reconnection and heartbeat policies for the duplex connection.
//!
//! Both are fixed when the manager is constructed; nothing adjusts them per call.

use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use serde::{Deserialize, Serialize};

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_BASE_DELAY_MS: u64 = 3_000;
const DEFAULT_MAX_DELAY_MS: u64 = 30_000;
const DEFAULT_RANDOMIZATION_FACTOR: f64 = 0.5;
const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 25_000;
const DEFAULT_HEARTBEAT_TIMEOUT_MS: u64 = 60_000;
const RECONNECT_MULTIPLIER: f64 = 2.0;

// ============================================
// RECONNECT POLICY
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_randomization_factor")]
    pub randomization_factor: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            randomization_factor: default_randomization_factor(),
        }
    }
}

impl ReconnectPolicy {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Delay schedule for one reconnection cycle.
    ///
    /// Delays double from `base_delay`, each jittered by `randomization_factor`,
    /// and are clamped to `max_delay` after the jitter. The attempt limit is
    /// enforced by the caller, so the schedule itself never gives up.
    pub fn schedule(&self) -> ReconnectSchedule {
        ReconnectSchedule {
            backoff: ExponentialBackoff {
                current_interval: self.base_delay(),
                initial_interval: self.base_delay(),
                randomization_factor: self.randomization_factor,
                multiplier: RECONNECT_MULTIPLIER,
                max_interval: self.max_delay(),
                max_elapsed_time: None,
                ..Default::default()
            },
            cap: self.max_delay(),
        }
    }
}

/// Jittered exponential delays with a hard ceiling.
pub struct ReconnectSchedule {
    backoff: ExponentialBackoff,
    cap: Duration,
}

impl ReconnectSchedule {
    /// Delay before the next attempt, never above the cap.
    pub fn next_delay(&mut self) -> Duration {
        // ExponentialBackoff caps the interval before jitter, not the result
        self.backoff
            .next_backoff()
            .map_or(self.cap, |delay| delay.min(self.cap))
    }

    /// Start over from the base delay.
    pub fn reset(&mut self) {
        self.backoff.reset();
    }
}

// ============================================
// HEARTBEAT POLICY
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatPolicy {
    #[serde(default = "default_heartbeat_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for HeartbeatPolicy {
    fn default() -> Self {
        Self {
            interval_ms: default_heartbeat_interval_ms(),
            timeout_ms: default_heartbeat_timeout_ms(),
        }
    }
}

impl HeartbeatPolicy {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}
fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}
fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}
fn default_randomization_factor() -> f64 {
    DEFAULT_RANDOMIZATION_FACTOR
}
fn default_heartbeat_interval_ms() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL_MS
}
fn default_heartbeat_timeout_ms() -> u64 {
    DEFAULT_HEARTBEAT_TIMEOUT_MS
}
