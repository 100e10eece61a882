use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Uniform};

use super::DemandLevel;
use crate::config::MetricsConfig;
use crate::error::SimError;

/// Dashboard performance indicators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
    pub avg_commute_time: f64,
    pub throughput: f64,
    pub avg_wait_time: f64,
    pub efficiency_percent: f64,
    pub co2_savings_percent: f64,
    pub cycle_time_seconds: f64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            avg_commute_time: 12.3,
            throughput: 1247.0,
            avg_wait_time: 2.1,
            efficiency_percent: 87.0,
            co2_savings_percent: 15.2,
            cycle_time_seconds: 68.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentKind {
    Accident,
    Roadwork,
    Blocked,
}

impl IncidentKind {
    pub fn description(self) -> &'static str {
        match self {
            IncidentKind::Accident => "Traffic accident simulated - Increasing delays",
            IncidentKind::Roadwork => "Road work zone activated - Reduced capacity",
            IncidentKind::Blocked => "Lane blocked - Redirecting traffic",
        }
    }
}

impl FromStr for IncidentKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accident" => Ok(IncidentKind::Accident),
            "roadwork" => Ok(IncidentKind::Roadwork),
            "blocked" => Ok(IncidentKind::Blocked),
            _ => Err(SimError::UnknownIncident(s.to_string())),
        }
    }
}

pub struct MetricsEstimator {
    config: MetricsConfig,
    unit: Uniform<f64>,
    rng: StdRng,
    /// Scheduler times at which an incident's recovery is due.
    pending_recoveries: Vec<Duration>,
}

impl MetricsEstimator {
    pub fn new(config: &MetricsConfig, seed: Option<u64>) -> Self {
        let rng = if let Some(seed) = seed {
            StdRng::seed_from_u64(seed)
        } else {
            StdRng::from_entropy()
        };

        Self {
            config: config.clone(),
            unit: Uniform::new(-1.0, 1.0),
            rng,
            pending_recoveries: Vec::new(),
        }
    }

    pub fn baseline(&self) -> Metrics {
        self.config.baseline
    }

    pub fn demand_multiplier(&self, level: DemandLevel) -> f64 {
        self.config.demand_multipliers.for_level(level)
    }

    /// One bounded random-walk step of commute, wait, throughput and efficiency.
    pub fn apply_random_walk(&mut self, metrics: &mut Metrics, demand: DemandLevel) {
        let multiplier = self.demand_multiplier(demand);
        let drift = self.config.drift;

        let commute_step = self.unit.sample(&mut self.rng) * drift * multiplier;
        let wait_step = self.unit.sample(&mut self.rng) * drift * multiplier;
        let throughput_step = (self.unit.sample(&mut self.rng) * self.config.throughput_drift * multiplier).floor();
        let efficiency_step = self.unit.sample(&mut self.rng) * drift;

        metrics.avg_commute_time = self.config.commute_bounds.clamp(metrics.avg_commute_time + commute_step);
        metrics.avg_wait_time = self.config.wait_bounds.clamp(metrics.avg_wait_time + wait_step);
        metrics.throughput = self.config.throughput_bounds.clamp(metrics.throughput + throughput_step);
        metrics.efficiency_percent = self.config.efficiency_bounds.clamp(metrics.efficiency_percent + efficiency_step);
    }

    /// Applies the incident's one-shot delta and schedules a recovery `recovery_delay`
    /// after `now`. Deltas are not clamped; the next walk step brings values back in range.
    pub fn trigger_incident(&mut self, metrics: &mut Metrics, kind: IncidentKind, now: Duration) {
        match kind {
            IncidentKind::Accident => {
                metrics.avg_commute_time += 2.5;
                metrics.avg_wait_time += 1.2;
            }
            IncidentKind::Roadwork => {
                metrics.throughput *= 0.85;
                metrics.efficiency_percent -= 8.0;
            }
            IncidentKind::Blocked => {
                metrics.avg_wait_time += 0.8;
                metrics.efficiency_percent -= 5.0;
            }
        }

        let due = now + self.recovery_delay();
        self.pending_recoveries.push(due);
        log::info!("{} (recovery at {:.1}s)", kind.description(), due.as_secs_f64());
    }

    pub fn recovery_delay(&self) -> Duration {
        Duration::from_secs(self.config.recovery_delay_seconds)
    }

    pub fn next_recovery(&self) -> Option<Duration> {
        self.pending_recoveries.iter().min().copied()
    }

    /// Runs every recovery due at or before `now`. Each one is a hard reset to baseline,
    /// overwriting any drift since the incident. Returns how many fired.
    pub fn expire_recoveries(&mut self, metrics: &mut Metrics, now: Duration) -> usize {
        let before = self.pending_recoveries.len();
        self.pending_recoveries.retain(|&due| due > now);
        let fired = before - self.pending_recoveries.len();

        if fired > 0 {
            *metrics = self.config.baseline;
            log::info!("Incident recovered, metrics restored to baseline");
        }

        fired
    }

    /// Immediate return to baseline. Outstanding recoveries are dropped with it.
    pub fn reset(&mut self, metrics: &mut Metrics) {
        *metrics = self.config.baseline;
        self.pending_recoveries.clear();
    }
}
