use super::{Direction, PerDirection, QueueCounts, VehicleKind};
use crate::config::TrafficConfig;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

/// Decides whether a vehicle enters this tick, on which approach and of which kind.
///
/// The spawn chance is constant; traffic demand level only shapes the metrics drift.
/// Approaches are weighted by their share of the current queue depth.
pub struct DemandModel {
    base_rate: f64,
    type_weights: Vec<(VehicleKind, u32)>,
    rng: StdRng,
}

impl DemandModel {
    pub fn new(config: &TrafficConfig, seed: Option<u64>) -> Self {
        let rng = if let Some(seed) = seed {
            StdRng::seed_from_u64(seed)
        } else {
            StdRng::from_entropy()
        };

        Self {
            base_rate: config.base_spawn_rate,
            type_weights: config
                .vehicle_types
                .iter()
                .map(|vt| (vt.kind, vt.weight))
                .collect(),
            rng,
        }
    }

    pub fn spawn_probability(&self) -> f64 {
        self.base_rate
    }

    /// Share of total queue depth per approach, uniform when nothing is queued.
    pub fn direction_bias(queues: &QueueCounts) -> PerDirection<f64> {
        let total = queues.total();
        if total == 0 {
            return PerDirection::uniform(0.25);
        }

        let total = total as f64;
        PerDirection {
            north: queues.north as f64 / total,
            south: queues.south as f64 / total,
            east: queues.east as f64 / total,
            west: queues.west as f64 / total,
        }
    }

    pub fn choose_spawn(&mut self, queues: &QueueCounts) -> Option<(Direction, VehicleKind)> {
        if self.rng.gen::<f64>() >= self.base_rate {
            return None;
        }

        let bias = Self::direction_bias(queues);
        let direction = self.select_direction(&bias);
        let kind = self.select_vehicle_kind();
        Some((direction, kind))
    }

    pub fn select_direction(&mut self, bias: &PerDirection<f64>) -> Direction {
        let random_value = self.rng.gen::<f64>();
        let mut cumulative = 0.0;
        let mut fallback = Direction::North;

        for (direction, weight) in bias.iter() {
            if weight > 0.0 {
                fallback = direction;
            }
            cumulative += weight;
            if random_value < cumulative {
                return direction;
            }
        }

        // Rounding can leave the cumulative sum a hair under one
        fallback
    }

    /// Weighted pick over the configured table, drawn across the table's own total.
    pub fn select_vehicle_kind(&mut self) -> VehicleKind {
        let total_weight: u32 = self.type_weights.iter().map(|(_, w)| w).sum();
        if total_weight == 0 {
            return VehicleKind::Car;
        }

        let mut random_value = self.rng.gen_range(0..total_weight);
        for (kind, weight) in &self.type_weights {
            if random_value < *weight {
                return *kind;
            }
            random_value -= weight;
        }

        VehicleKind::Car
    }
}
