use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use super::Validate;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl Validate for OptimizerConfig {
    fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(anyhow!("Optimizer base URL must be http(s), got '{}'", self.base_url));
        }

        if self.timeout_seconds == 0 {
            return Err(anyhow!("Optimizer timeout must be positive"));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Simulation tick period at speed 1; divided by the speed multiplier.
    pub simulation_period_ms: u64,
    pub metrics_period_ms: u64,
    pub clock_period_ms: u64,
    pub max_speed: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            simulation_period_ms: 1000,
            metrics_period_ms: 3000,
            clock_period_ms: 1000,
            max_speed: 10,
        }
    }
}

impl Validate for TimerConfig {
    fn validate(&self) -> Result<()> {
        if self.simulation_period_ms == 0 || self.metrics_period_ms == 0 || self.clock_period_ms == 0 {
            return Err(anyhow!("Timer periods must be positive"));
        }

        if self.max_speed == 0 {
            return Err(anyhow!("Maximum speed multiplier must be at least 1"));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IntersectionInfo {
    pub id: String,
    pub name: String,
}

impl IntersectionInfo {
    pub fn defaults() -> Vec<IntersectionInfo> {
        [
            ("main-oak", "Main St & Oak Ave"),
            ("park-first", "Park Rd & 1st St"),
            ("broadway-42", "Broadway & 42nd"),
            ("fifth-59", "5th Ave & 59th"),
        ]
        .iter()
        .map(|(id, name)| IntersectionInfo {
            id: id.to_string(),
            name: name.to_string(),
        })
        .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RandomConfig {
    pub seed: Option<u64>,
}
