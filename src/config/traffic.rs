use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use super::Validate;
use crate::simulation::VehicleKind;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrafficConfig {
    /// Chance per simulation tick that one vehicle enters.
    pub base_spawn_rate: f64,
    pub vehicle_types: Vec<VehicleTypeConfig>,
    pub zones: ZoneConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VehicleTypeConfig {
    pub kind: VehicleKind,
    pub weight: u32,
    /// Speed is drawn uniformly from `[min_speed, max_speed)`.
    pub min_speed: f64,
    pub max_speed: f64,
}

/// Positions along an approach, in the same units as `Vehicle::position`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ZoneConfig {
    pub despawn_position: f64,
    pub conflict_start: f64,
    pub conflict_end: f64,
    /// Vehicles past this point may clear the box on yellow.
    pub stop_line: f64,
    pub queue_start: f64,
    pub queue_end: f64,
    pub detection_start: f64,
    pub detection_end: f64,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            base_spawn_rate: 0.4,
            vehicle_types: vec![
                VehicleTypeConfig { kind: VehicleKind::Car, weight: 70, min_speed: 2.0, max_speed: 3.0 },
                VehicleTypeConfig { kind: VehicleKind::Truck, weight: 15, min_speed: 1.5, max_speed: 2.0 },
                VehicleTypeConfig { kind: VehicleKind::Bus, weight: 10, min_speed: 1.8, max_speed: 2.2 },
            ],
            zones: ZoneConfig::default(),
        }
    }
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            despawn_position: 120.0,
            conflict_start: 40.0,
            conflict_end: 60.0,
            stop_line: 50.0,
            queue_start: 30.0,
            queue_end: 60.0,
            detection_start: 35.0,
            detection_end: 65.0,
        }
    }
}

impl TrafficConfig {
    pub fn vehicle_type(&self, kind: VehicleKind) -> Option<&VehicleTypeConfig> {
        self.vehicle_types.iter().find(|vt| vt.kind == kind)
    }
}

impl Validate for TrafficConfig {
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.base_spawn_rate) {
            return Err(anyhow!("Base spawn rate must be in range [0, 1], got {}", self.base_spawn_rate));
        }

        if self.vehicle_types.is_empty() {
            return Err(anyhow!("At least one vehicle type must be defined"));
        }

        // Weights are relative; the stock table sums to 95 and is sampled over its own total.
        let total_weight: u32 = self.vehicle_types.iter().map(|vt| vt.weight).sum();
        if total_weight == 0 {
            return Err(anyhow!("Vehicle type weights must not all be zero"));
        }

        for (i, vehicle_type) in self.vehicle_types.iter().enumerate() {
            if self.vehicle_types[..i].iter().any(|other| other.kind == vehicle_type.kind) {
                return Err(anyhow!("Vehicle type '{}' is defined twice", vehicle_type.kind.as_str()));
            }

            if vehicle_type.min_speed <= 0.0 {
                return Err(anyhow!("Minimum speed for '{}' must be positive", vehicle_type.kind.as_str()));
            }

            if vehicle_type.min_speed >= vehicle_type.max_speed {
                return Err(anyhow!("Speed range for '{}' must be non-empty", vehicle_type.kind.as_str()));
            }
        }

        self.zones.validate()
    }
}

impl Validate for ZoneConfig {
    fn validate(&self) -> Result<()> {
        if self.conflict_start >= self.conflict_end {
            return Err(anyhow!("Conflict zone must start before it ends"));
        }

        if self.stop_line < self.conflict_start || self.stop_line > self.conflict_end {
            return Err(anyhow!("Stop line must lie inside the conflict zone"));
        }

        if self.queue_start >= self.queue_end || self.detection_start >= self.detection_end {
            return Err(anyhow!("Queue and detection zones must start before they end"));
        }

        if self.despawn_position <= self.conflict_end {
            return Err(anyhow!("Despawn position must lie beyond the conflict zone"));
        }

        Ok(())
    }
}
