use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SimError;

pub mod signal;
pub mod traffic;
pub mod demand;
pub mod metrics;

pub use signal::*;
pub use traffic::*;
pub use demand::*;
pub use metrics::*;

/// One of the four approaches into the intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    pub fn axis(self) -> Axis {
        match self {
            Direction::North | Direction::South => Axis::NorthSouth,
            Direction::East | Direction::West => Axis::EastWest,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        }
    }
}

/// The north-south or east-west pair of approaches. Axes alternate right-of-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    NorthSouth,
    EastWest,
}

impl Axis {
    pub fn short_label(self) -> &'static str {
        match self {
            Axis::NorthSouth => "N-S",
            Axis::EastWest => "E-W",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleKind {
    Car,
    Truck,
    Bus,
}

impl VehicleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VehicleKind::Car => "car",
            VehicleKind::Truck => "truck",
            VehicleKind::Bus => "bus",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub kind: VehicleKind,
    pub direction: Direction,
    /// Distance along the approach: 0 at the spawn edge, removed past the despawn threshold.
    pub position: f64,
    pub speed: f64,
    pub waiting: bool,
}

/// A value for each approach. Serializes as `{north, south, east, west}`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerDirection<T> {
    pub north: T,
    pub south: T,
    pub east: T,
    pub west: T,
}

impl<T: Copy> PerDirection<T> {
    pub fn uniform(value: T) -> Self {
        Self {
            north: value,
            south: value,
            east: value,
            west: value,
        }
    }

    pub fn get(&self, direction: Direction) -> T {
        match direction {
            Direction::North => self.north,
            Direction::South => self.south,
            Direction::East => self.east,
            Direction::West => self.west,
        }
    }

    pub fn get_mut(&mut self, direction: Direction) -> &mut T {
        match direction {
            Direction::North => &mut self.north,
            Direction::South => &mut self.south,
            Direction::East => &mut self.east,
            Direction::West => &mut self.west,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Direction, T)> + '_ {
        Direction::ALL.iter().map(move |&d| (d, self.get(d)))
    }
}

/// Waiting vehicles near the stop line, per approach.
pub type QueueCounts = PerDirection<u32>;
/// Whether a detector loop currently sees a vehicle, per approach.
pub type Occupancy = PerDirection<bool>;
/// Each approach's share of total queue depth, as sent to the optimizer.
pub type Densities = PerDirection<f64>;

impl QueueCounts {
    pub fn total(&self) -> u32 {
        self.north + self.south + self.east + self.west
    }

    /// Queue shares rounded to three decimals; the denominator never drops below one.
    pub fn densities(&self) -> Densities {
        let denominator = self.total().max(1) as f64;
        let share = |count: u32| (count as f64 / denominator * 1000.0).round() / 1000.0;
        Densities {
            north: share(self.north),
            south: share(self.south),
            east: share(self.east),
            west: share(self.west),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemandLevel {
    Light,
    #[default]
    Normal,
    Heavy,
    Rush,
}

impl FromStr for DemandLevel {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(DemandLevel::Light),
            "normal" => Ok(DemandLevel::Normal),
            "heavy" => Ok(DemandLevel::Heavy),
            "rush" => Ok(DemandLevel::Rush),
            _ => Err(SimError::UnknownDemandLevel(s.to_string())),
        }
    }
}

impl fmt::Display for DemandLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DemandLevel::Light => "light",
            DemandLevel::Normal => "normal",
            DemandLevel::Heavy => "heavy",
            DemandLevel::Rush => "rush",
        };
        f.write_str(name)
    }
}

/// Dashboard operating mode. Only reported, never consulted by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemMode {
    #[default]
    Ai,
    Advisory,
}

impl FromStr for SystemMode {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ai" => Ok(SystemMode::Ai),
            "advisory" => Ok(SystemMode::Advisory),
            _ => Err(SimError::UnknownMode(s.to_string())),
        }
    }
}

/// User-facing switches, mutated only through `Command`s.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Controls {
    pub running: bool,
    pub speed_multiplier: u32,
    pub demand: DemandLevel,
    pub emergency_active: bool,
    pub mode: SystemMode,
    pub intersection_id: String,
}

/// Everything the simulation owns. Engines receive it by `&mut` on each tick.
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub signal: PhaseClock,
    pub vehicles: Vec<Vehicle>,
    pub queues: QueueCounts,
    pub occupancy: Occupancy,
    pub metrics: Metrics,
    pub controls: Controls,
    pub next_vehicle_id: u64,
    pub total_spawned: u64,
    pub total_despawned: u64,
    pub ticks: u64,
}

impl SimulationState {
    pub fn new(signal: PhaseClock, metrics: Metrics, controls: Controls) -> Self {
        Self {
            signal,
            vehicles: Vec::new(),
            queues: QueueCounts::default(),
            occupancy: Occupancy::default(),
            metrics,
            controls,
            next_vehicle_id: 1,
            total_spawned: 0,
            total_despawned: 0,
            ticks: 0,
        }
    }

    pub fn add_vehicle(&mut self, vehicle: Vehicle) {
        self.vehicles.push(vehicle);
        self.total_spawned += 1;
    }

    pub fn get_vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    pub fn clear_vehicles(&mut self) {
        self.vehicles.clear();
        self.queues = QueueCounts::default();
        self.occupancy = Occupancy::default();
    }

    pub fn vehicle_counts(&self) -> std::collections::HashMap<VehicleKind, usize> {
        let mut counts = std::collections::HashMap::new();
        for vehicle in &self.vehicles {
            *counts.entry(vehicle.kind).or_insert(0) += 1;
        }
        counts
    }
}

/// Immutable view handed to the presentation layer after each tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntersectionSnapshot {
    pub intersection: String,
    pub mode: SystemMode,
    pub running: bool,
    pub emergency_active: bool,
    pub speed_multiplier: u32,
    pub demand: DemandLevel,
    pub phase: PhaseState,
    pub seconds_remaining: u32,
    pub ns_light: LightColor,
    pub ew_light: LightColor,
    pub ns_label: String,
    pub ew_label: String,
    pub timing: SignalTiming,
    pub signal_cycle_time_seconds: u32,
    pub queues: QueueCounts,
    pub occupancy: Occupancy,
    pub vehicles: Vec<Vehicle>,
    pub metrics: Metrics,
    pub wall_clock: Option<String>,
    pub ticks: u64,
    pub total_spawned: u64,
    pub total_despawned: u64,
}
