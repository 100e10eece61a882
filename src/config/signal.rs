use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use super::Validate;
use crate::simulation::MAX_PHASE_SECONDS;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignalConfig {
    pub green_seconds: u32,
    pub yellow_seconds: u32,
    pub red_seconds: u32,
    /// Timer value of the very first north-south green after start-up.
    pub initial_phase_seconds: u32,
    /// Floors applied to optimizer-supplied durations.
    pub min_green_seconds: u32,
    pub min_yellow_seconds: u32,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            green_seconds: 35,
            yellow_seconds: 5,
            red_seconds: 30,
            initial_phase_seconds: 25,
            min_green_seconds: 10,
            min_yellow_seconds: 3,
        }
    }
}

impl Validate for SignalConfig {
    fn validate(&self) -> Result<()> {
        if self.green_seconds == 0 || self.yellow_seconds == 0 || self.red_seconds == 0 {
            return Err(anyhow!("Green, yellow and red durations must be positive"));
        }

        if self.initial_phase_seconds == 0 {
            return Err(anyhow!("Initial phase duration must be positive"));
        }

        if self.min_green_seconds == 0 || self.min_yellow_seconds == 0 {
            return Err(anyhow!("Minimum optimizer durations must be positive"));
        }

        let longest = [
            self.green_seconds,
            self.yellow_seconds,
            self.red_seconds,
            self.initial_phase_seconds,
            self.min_green_seconds,
            self.min_yellow_seconds,
        ]
        .into_iter()
        .max()
        .unwrap_or(0);
        if longest > MAX_PHASE_SECONDS {
            return Err(anyhow!("Signal durations must not exceed {} seconds, got {}", MAX_PHASE_SECONDS, longest));
        }

        Ok(())
    }
}
