use std::time::Duration;

use crate::config::TimerConfig;

pub mod manual;
pub mod realtime;

pub use manual::*;
pub use realtime::*;

/// Periods of the three repeating timers that drive an `Engine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerPeriods {
    pub simulation_base: Duration,
    pub metrics: Duration,
    pub clock: Duration,
}

impl TimerPeriods {
    pub fn from_config(config: &TimerConfig) -> Self {
        Self {
            simulation_base: Duration::from_millis(config.simulation_period_ms),
            metrics: Duration::from_millis(config.metrics_period_ms),
            clock: Duration::from_millis(config.clock_period_ms),
        }
    }

    /// Simulation tick period at the given speed multiplier.
    pub fn simulation(&self, speed_multiplier: u32) -> Duration {
        self.simulation_base / speed_multiplier.max(1)
    }
}

impl Default for TimerPeriods {
    fn default() -> Self {
        Self::from_config(&TimerConfig::default())
    }
}

/// Tick counts produced by one stretch of scheduling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub simulation_ticks: u64,
    pub metrics_ticks: u64,
    pub clock_ticks: u64,
    pub recoveries: u64,
}
