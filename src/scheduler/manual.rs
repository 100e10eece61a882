use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use std::time::Duration;

use super::{TickReport, TimerPeriods};
use crate::engine::Engine;
use crate::error::SimError;
use crate::input::Command;
use crate::simulation::{IncidentKind, IntersectionSnapshot};

type Subscriber = Box<dyn FnMut(&IntersectionSnapshot) + Send>;

/// Drives an `Engine` on virtual time. Nothing sleeps: `advance_by_seconds` fires every
/// timer that falls due in the window, in deadline order.
pub struct ManualScheduler {
    engine: Engine,
    periods: TimerPeriods,
    now: Duration,
    next_simulation: Duration,
    next_metrics: Duration,
    next_clock: Duration,
    clock_origin: DateTime<Local>,
    subscribers: Vec<Subscriber>,
}

impl ManualScheduler {
    pub fn new(engine: Engine) -> Self {
        let periods = TimerPeriods::from_config(&engine.config().timers);
        let speed = engine.state().controls.speed_multiplier;

        Self {
            next_simulation: periods.simulation(speed),
            next_metrics: periods.metrics,
            next_clock: periods.clock,
            engine,
            periods,
            now: Duration::ZERO,
            clock_origin: Local::now(),
            subscribers: Vec::new(),
        }
    }

    /// Pins the wall-clock display to start from `origin` instead of the real time.
    pub fn with_clock_origin(mut self, origin: DateTime<Local>) -> Self {
        self.clock_origin = origin;
        self
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn snapshot(&self) -> IntersectionSnapshot {
        self.engine.snapshot()
    }

    /// Registers a callback invoked with a fresh snapshot after every simulation tick.
    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&IntersectionSnapshot) + Send + 'static,
    {
        self.subscribers.push(Box::new(subscriber));
    }

    pub fn advance_by_seconds(&mut self, seconds: f64) -> Result<TickReport> {
        let window = Duration::try_from_secs_f64(seconds)
            .with_context(|| format!("Cannot advance by {} seconds", seconds))?;
        self.advance_by(window)
    }

    pub fn advance_by(&mut self, window: Duration) -> Result<TickReport> {
        let target = self
            .now
            .checked_add(window)
            .ok_or_else(|| anyhow!("Advancing {:?} past {:?} overflows the scheduler clock", window, self.now))?;
        let mut report = TickReport::default();

        loop {
            let next_recovery = self.engine.next_recovery().unwrap_or(Duration::MAX);
            let next = self
                .next_simulation
                .min(self.next_metrics)
                .min(self.next_clock)
                .min(next_recovery);
            if next > target {
                break;
            }
            self.now = next;

            if self.next_simulation == next {
                self.engine.simulation_tick();
                report.simulation_ticks += 1;
                let speed = self.engine.state().controls.speed_multiplier;
                self.next_simulation = self.next_simulation.saturating_add(self.periods.simulation(speed));
                self.publish();
            }

            if self.next_metrics == next {
                self.engine.metrics_tick();
                report.metrics_ticks += 1;
                self.next_metrics = self.next_metrics.saturating_add(self.periods.metrics);
            }

            if self.next_clock == next {
                let wall = chrono::Duration::from_std(next)
                    .ok()
                    .and_then(|offset| self.clock_origin.checked_add_signed(offset))
                    .unwrap_or(self.clock_origin);
                self.engine.clock_tick(wall);
                report.clock_ticks += 1;
                self.next_clock = self.next_clock.saturating_add(self.periods.clock);
            }

            // Recoveries run last so a drift step due at the same instant cannot land on top
            report.recoveries += self.engine.expire_recoveries(next) as u64;
        }

        self.now = target;
        Ok(report)
    }

    /// Applies a command. A speed change cancels the pending simulation tick and restarts
    /// the timer at the new period; vehicle state is untouched.
    pub fn apply(&mut self, command: Command) -> Result<(), SimError> {
        match command {
            Command::SetSpeed(speed) => self.set_speed(speed),
            other => self.engine.apply(other, self.now),
        }
    }

    pub fn set_speed(&mut self, speed: u32) -> Result<(), SimError> {
        self.engine.set_speed(speed)?;
        self.next_simulation = self.now.saturating_add(self.periods.simulation(speed));
        Ok(())
    }

    pub fn trigger_incident(&mut self, kind: IncidentKind) {
        self.engine.trigger_incident(kind, self.now);
    }

    fn publish(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.engine.snapshot();
        for subscriber in &mut self.subscribers {
            subscriber(&snapshot);
        }
    }
}
