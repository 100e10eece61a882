use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub mod signal;
pub mod traffic;
pub mod metrics;
pub mod runtime;

pub use signal::*;
pub use traffic::*;
pub use metrics::*;
pub use runtime::*;

/// Complete simulator configuration. Every section has defaults, so an empty
/// TOML document describes the stock dashboard intersection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub signal: SignalConfig,
    pub traffic: TrafficConfig,
    pub metrics: MetricsConfig,
    pub optimizer: OptimizerConfig,
    pub timers: TimerConfig,
    pub intersections: Vec<IntersectionInfo>,
    pub random: RandomConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            signal: SignalConfig::default(),
            traffic: TrafficConfig::default(),
            metrics: MetricsConfig::default(),
            optimizer: OptimizerConfig::default(),
            timers: TimerConfig::default(),
            intersections: IntersectionInfo::defaults(),
            random: RandomConfig::default(),
        }
    }
}

impl SimulatorConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: SimulatorConfig = toml::from_str(content)?;
        if config.intersections.is_empty() {
            config.intersections = IntersectionInfo::defaults();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn intersection_name(&self, id: &str) -> Option<&str> {
        self.intersections
            .iter()
            .find(|i| i.id == id)
            .map(|i| i.name.as_str())
    }
}

impl Validate for SimulatorConfig {
    fn validate(&self) -> Result<()> {
        self.signal.validate()?;
        self.traffic.validate()?;
        self.metrics.validate()?;
        self.optimizer.validate()?;
        self.timers.validate()?;

        if self.intersections.is_empty() {
            anyhow::bail!("At least one intersection must be defined");
        }
        for (i, intersection) in self.intersections.iter().enumerate() {
            if intersection.id.trim().is_empty() {
                anyhow::bail!("Intersection {} has an empty id", i);
            }
            if self.intersections[..i].iter().any(|other| other.id == intersection.id) {
                anyhow::bail!("Intersection id '{}' is defined twice", intersection.id);
            }
        }

        Ok(())
    }
}

pub trait Validate {
    fn validate(&self) -> Result<()>;
}
