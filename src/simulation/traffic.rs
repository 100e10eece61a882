use super::{Direction, PhaseState, LightColor, SimulationState, Vehicle, VehicleId, VehicleKind, QueueCounts, Occupancy, DemandModel};
use crate::config::{TrafficConfig, VehicleTypeConfig, ZoneConfig};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

/// Owns vehicle motion along the four approaches, and the demand model that feeds it.
pub struct TrafficManager {
    vehicle_types: Vec<VehicleTypeConfig>,
    zones: ZoneConfig,
    demand_model: DemandModel,
    rng: StdRng,
}

impl TrafficManager {
    pub fn new(config: &TrafficConfig, seed: Option<u64>) -> Self {
        // Offset the demand model's stream so spawn decisions and speeds stay independent.
        let demand_model = DemandModel::new(config, seed.map(|s| s.wrapping_add(1)));

        let rng = if let Some(seed) = seed {
            StdRng::seed_from_u64(seed)
        } else {
            StdRng::from_entropy()
        };

        Self {
            vehicle_types: config.vehicle_types.clone(),
            zones: config.zones.clone(),
            demand_model,
            rng,
        }
    }

    pub fn zones(&self) -> &ZoneConfig {
        &self.zones
    }

    /// One simulation tick worth of traffic: move, despawn, recount, then maybe spawn.
    pub fn update(&mut self, state: &mut SimulationState) {
        let phase = state.signal.phase();
        let speed_multiplier = state.controls.speed_multiplier;

        self.advance(state, phase, speed_multiplier);
        self.recompute_queues(state);
        self.update_detection(state);

        if let Some((direction, kind)) = self.demand_model.choose_spawn(&state.queues) {
            self.spawn(state, direction, kind);
        }
    }

    /// Places a new vehicle at the entry edge of `direction`.
    pub fn spawn(&mut self, state: &mut SimulationState, direction: Direction, kind: VehicleKind) -> Vehicle {
        let speed = self.sample_speed(kind);
        let vehicle = Vehicle {
            id: VehicleId(state.next_vehicle_id),
            kind,
            direction,
            position: 0.0,
            speed,
            waiting: false,
        };
        state.next_vehicle_id += 1;

        log::debug!(
            "Spawned {} {} heading {} at {:.2}/tick",
            vehicle.kind.as_str(),
            vehicle.id.0,
            vehicle.direction.as_str(),
            vehicle.speed
        );

        state.add_vehicle(vehicle.clone());
        vehicle
    }

    fn sample_speed(&mut self, kind: VehicleKind) -> f64 {
        match self.vehicle_types.iter().find(|vt| vt.kind == kind) {
            Some(vt) => self.rng.gen_range(vt.min_speed..vt.max_speed),
            None => {
                log::warn!("No speed range configured for {}, using 2.0", kind.as_str());
                2.0
            }
        }
    }

    /// Moves every vehicle the signal lets through and drops those past the despawn line.
    pub fn advance(&self, state: &mut SimulationState, phase: PhaseState, speed_multiplier: u32) {
        let multiplier = speed_multiplier as f64;

        for vehicle in &mut state.vehicles {
            let can_move = can_move(vehicle, phase, &self.zones);
            vehicle.waiting = !can_move;
            if can_move {
                vehicle.position += vehicle.speed * multiplier;
            }
        }

        let despawn_position = self.zones.despawn_position;
        let before = state.vehicles.len();
        state.vehicles.retain(|v| v.position <= despawn_position);
        let removed = before - state.vehicles.len();

        if removed > 0 {
            state.total_despawned += removed as u64;
            log::debug!("Despawned {} vehicle(s), {} active", removed, state.vehicles.len());
        }
    }

    /// Rebuilds queue depth from the live vehicle set.
    pub fn recompute_queues(&self, state: &mut SimulationState) {
        let mut queues = QueueCounts::default();

        for vehicle in &state.vehicles {
            let in_queue_zone = vehicle.position > self.zones.queue_start
                && vehicle.position < self.zones.queue_end;
            if vehicle.waiting && in_queue_zone {
                *queues.get_mut(vehicle.direction) += 1;
            }
        }

        state.queues = queues;
    }

    /// Detector loops report any vehicle of their approach inside the detection zone.
    pub fn update_detection(&self, state: &mut SimulationState) {
        let mut occupancy = Occupancy::default();

        for vehicle in &state.vehicles {
            if vehicle.position > self.zones.detection_start && vehicle.position < self.zones.detection_end {
                *occupancy.get_mut(vehicle.direction) = true;
            }
        }

        state.occupancy = occupancy;
    }
}

/// Signal gating. Vehicles outside the conflict zone are not contending and always move.
/// Inside it a vehicle needs its axis on green, or its axis on yellow with the vehicle
/// already past the stop line.
pub fn can_move(vehicle: &Vehicle, phase: PhaseState, zones: &ZoneConfig) -> bool {
    let in_conflict_zone = vehicle.position > zones.conflict_start && vehicle.position < zones.conflict_end;
    if !in_conflict_zone {
        return true;
    }

    match phase.light_for(vehicle.direction.axis()) {
        LightColor::Green => true,
        LightColor::Yellow => vehicle.position > zones.stop_line,
        LightColor::Red => false,
    }
}
