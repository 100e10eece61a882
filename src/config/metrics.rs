use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use super::Validate;
use crate::simulation::{DemandLevel, Metrics};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Values restored on reset and after incident recovery.
    pub baseline: Metrics,
    pub commute_bounds: Bounds,
    pub wait_bounds: Bounds,
    pub throughput_bounds: Bounds,
    pub efficiency_bounds: Bounds,
    /// Step scale for commute, wait and efficiency.
    pub drift: f64,
    /// Step scale for throughput.
    pub throughput_drift: f64,
    pub recovery_delay_seconds: u64,
    pub demand_multipliers: DemandMultipliers,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DemandMultipliers {
    pub light: f64,
    pub normal: f64,
    pub heavy: f64,
    pub rush: f64,
}

impl DemandMultipliers {
    pub fn for_level(&self, level: DemandLevel) -> f64 {
        match level {
            DemandLevel::Light => self.light,
            DemandLevel::Normal => self.normal,
            DemandLevel::Heavy => self.heavy,
            DemandLevel::Rush => self.rush,
        }
    }
}

impl Default for DemandMultipliers {
    fn default() -> Self {
        Self {
            light: 0.8,
            normal: 1.0,
            heavy: 1.3,
            rush: 1.6,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            baseline: Metrics::default(),
            commute_bounds: Bounds::new(8.0, 25.0),
            wait_bounds: Bounds::new(1.0, 6.0),
            throughput_bounds: Bounds::new(800.0, 2200.0),
            efficiency_bounds: Bounds::new(60.0, 95.0),
            drift: 0.02,
            throughput_drift: 20.0,
            recovery_delay_seconds: 30,
            demand_multipliers: DemandMultipliers::default(),
        }
    }
}

impl Validate for MetricsConfig {
    fn validate(&self) -> Result<()> {
        let named = [
            ("commute", self.commute_bounds, self.baseline.avg_commute_time),
            ("wait", self.wait_bounds, self.baseline.avg_wait_time),
            ("throughput", self.throughput_bounds, self.baseline.throughput),
            ("efficiency", self.efficiency_bounds, self.baseline.efficiency_percent),
        ];

        for (name, bounds, baseline) in named {
            if bounds.min > bounds.max {
                return Err(anyhow!("The {} bounds are inverted ({} > {})", name, bounds.min, bounds.max));
            }
            if !bounds.contains(baseline) {
                return Err(anyhow!("The {} baseline {} lies outside [{}, {}]", name, baseline, bounds.min, bounds.max));
            }
        }

        if self.drift < 0.0 || self.throughput_drift < 0.0 {
            return Err(anyhow!("Drift scales must be non-negative"));
        }

        let m = &self.demand_multipliers;
        if [m.light, m.normal, m.heavy, m.rush].iter().any(|&v| v <= 0.0) {
            return Err(anyhow!("Demand multipliers must be positive"));
        }

        Ok(())
    }
}
