use anyhow::Result;
use chrono::{DateTime, Local};
use std::time::Duration;

use crate::config::{SimulatorConfig, Validate};
use crate::error::{OptimizerError, SimError};
use crate::input::Command;
use crate::simulation::{
    Axis, Controls, Densities, DemandLevel, IncidentKind, IntersectionSnapshot, LightColor,
    MetricsEstimator, PhaseClock, SimulationState, SystemMode, TimingPlan, TrafficManager,
};

/// Composes the phase clock, traffic model and metrics estimator over one owned
/// `SimulationState`. Schedulers call the `*_tick` methods; everything else arrives as a
/// `Command` or an optimizer plan.
pub struct Engine {
    state: SimulationState,
    traffic_manager: TrafficManager,
    metrics_estimator: MetricsEstimator,
    config: SimulatorConfig,
    wall_clock: Option<String>,
}

impl Engine {
    pub fn new(config: SimulatorConfig, seed: Option<u64>) -> Result<Self> {
        config.validate()?;

        let seed = seed.or(config.random.seed);
        let traffic_manager = TrafficManager::new(&config.traffic, seed);
        let metrics_estimator = MetricsEstimator::new(&config.metrics, seed.map(|s| s.wrapping_add(100)));

        let intersection_id = config
            .intersections
            .first()
            .map(|i| i.id.clone())
            .unwrap_or_default();

        let controls = Controls {
            running: true,
            speed_multiplier: 1,
            demand: DemandLevel::Normal,
            emergency_active: false,
            mode: SystemMode::Ai,
            intersection_id,
        };

        let state = SimulationState::new(
            PhaseClock::new(&config.signal),
            metrics_estimator.baseline(),
            controls,
        );

        Ok(Self {
            state,
            traffic_manager,
            metrics_estimator,
            config,
            wall_clock: None,
        })
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Whether simulation ticks currently have any effect.
    pub fn is_advancing(&self) -> bool {
        self.state.controls.running && !self.state.controls.emergency_active
    }

    /// Phase clock, then vehicles, then spawning. A no-op while paused or in emergency.
    pub fn simulation_tick(&mut self) -> bool {
        if !self.is_advancing() {
            return false;
        }

        self.state.signal.tick();
        self.traffic_manager.update(&mut self.state);
        self.state.ticks += 1;
        true
    }

    pub fn metrics_tick(&mut self) -> bool {
        if !self.is_advancing() {
            return false;
        }

        let demand = self.state.controls.demand;
        self.metrics_estimator.apply_random_walk(&mut self.state.metrics, demand);
        true
    }

    pub fn clock_tick(&mut self, now: DateTime<Local>) {
        self.wall_clock = Some(now.format("%B %-d, %Y %I:%M %p").to_string());
    }

    pub fn recovery_delay(&self) -> Duration {
        self.metrics_estimator.recovery_delay()
    }

    pub fn next_recovery(&self) -> Option<Duration> {
        self.metrics_estimator.next_recovery()
    }

    pub fn expire_recoveries(&mut self, now: Duration) -> usize {
        self.metrics_estimator.expire_recoveries(&mut self.state.metrics, now)
    }

    /// Applies a presentation-layer command. `now` is the scheduler's elapsed time and is
    /// only used to schedule incident recovery.
    pub fn apply(&mut self, command: Command, now: Duration) -> Result<(), SimError> {
        match command {
            Command::SelectIntersection(id) => self.select_intersection(&id)?,
            Command::SetMode(mode) => {
                self.state.controls.mode = mode;
                log::info!("System mode: {:?}", mode);
            }
            Command::SetGreen(seconds) => self.state.signal.set_green(seconds)?,
            Command::SetYellow(seconds) => self.state.signal.set_yellow(seconds)?,
            Command::SetRed(seconds) => self.state.signal.set_red(seconds)?,
            Command::SetSpeed(speed) => self.set_speed(speed)?,
            Command::Play => self.set_running(true),
            Command::Pause => self.set_running(false),
            Command::Reset => self.reset(),
            Command::SetDemand(level) => {
                self.state.controls.demand = level;
                log::info!("Traffic demand: {}", level);
            }
            Command::ToggleEmergency => {
                self.toggle_emergency();
            }
            Command::TriggerIncident(kind) => self.trigger_incident(kind, now),
        }
        Ok(())
    }

    pub fn set_running(&mut self, running: bool) {
        self.state.controls.running = running;
        log::info!("Simulation {}", if running { "running" } else { "paused" });
    }

    pub fn set_speed(&mut self, speed: u32) -> Result<(), SimError> {
        let max = self.config.timers.max_speed;
        if speed == 0 || speed > max {
            return Err(SimError::InvalidSpeed { value: speed as i64, max });
        }
        self.state.controls.speed_multiplier = speed;
        log::info!("Simulation speed: {}x", speed);
        Ok(())
    }

    pub fn select_intersection(&mut self, id: &str) -> Result<(), SimError> {
        let name = self
            .config
            .intersection_name(id)
            .ok_or_else(|| SimError::UnknownIntersection(id.to_string()))?;
        log::info!("Live Traffic Simulation - {}", name);
        self.state.controls.intersection_id = id.to_string();
        Ok(())
    }

    /// Flips the emergency override. While active, lights show all-stop and the phase
    /// clock and vehicles freeze in place.
    pub fn toggle_emergency(&mut self) -> bool {
        let active = !self.state.controls.emergency_active;
        self.state.controls.emergency_active = active;
        if active {
            log::warn!("Emergency Override Activated - All signals RED");
        } else {
            log::info!("Emergency Override Deactivated - Resuming normal operation");
        }
        active
    }

    pub fn trigger_incident(&mut self, kind: IncidentKind, now: Duration) {
        self.metrics_estimator.trigger_incident(&mut self.state.metrics, kind, now);
    }

    /// Clears vehicles, restarts the signal cycle and restores baseline metrics.
    pub fn reset(&mut self) {
        self.state.clear_vehicles();
        self.state.signal.reset();
        self.metrics_estimator.reset(&mut self.state.metrics);
        log::info!("Simulation reset");
    }

    /// Current queue densities together with the timing epoch they were taken under.
    pub fn optimization_request(&self) -> (Densities, u64) {
        (self.state.queues.densities(), self.state.signal.epoch())
    }

    /// Applies an optimizer plan, unless the timing has changed since the request was made.
    pub fn apply_optimization(&mut self, plan: Option<TimingPlan>, sent_epoch: u64) -> Result<(), OptimizerError> {
        let current = self.state.signal.epoch();
        if current != sent_epoch {
            return Err(OptimizerError::Stale { sent: sent_epoch, current });
        }

        match plan {
            Some(plan) => self.state.signal.apply_timing_plan(&plan),
            None => log::warn!("Optimizer response carried no phase plan, timing unchanged"),
        }
        Ok(())
    }

    pub fn snapshot(&self) -> IntersectionSnapshot {
        let state = &self.state;
        let controls = &state.controls;
        let phase = state.signal.phase();

        let (ns_light, ew_light, ns_label, ew_label) = if controls.emergency_active {
            let label = "Emergency - All Stop".to_string();
            (LightColor::Red, LightColor::Red, label.clone(), label)
        } else {
            let ns = phase.light_for(Axis::NorthSouth);
            let ew = phase.light_for(Axis::EastWest);
            (
                ns,
                ew,
                format!("{} {}", Axis::NorthSouth.short_label(), ns.as_str()),
                format!("{} {}", Axis::EastWest.short_label(), ew.as_str()),
            )
        };

        let intersection = self
            .config
            .intersection_name(&controls.intersection_id)
            .unwrap_or(controls.intersection_id.as_str())
            .to_string();

        IntersectionSnapshot {
            intersection,
            mode: controls.mode,
            running: controls.running,
            emergency_active: controls.emergency_active,
            speed_multiplier: controls.speed_multiplier,
            demand: controls.demand,
            phase,
            seconds_remaining: state.signal.seconds_remaining(),
            ns_light,
            ew_light,
            ns_label,
            ew_label,
            timing: state.signal.timing(),
            signal_cycle_time_seconds: state.signal.cycle_time_seconds(),
            queues: state.queues,
            occupancy: state.occupancy,
            vehicles: state.vehicles.clone(),
            metrics: state.metrics,
            wall_clock: self.wall_clock.clone(),
            ticks: state.ticks,
            total_spawned: state.total_spawned,
            total_despawned: state.total_despawned,
        }
    }
}
