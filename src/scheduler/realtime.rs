use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use super::TimerPeriods;
use crate::engine::Engine;
use crate::error::{OptimizerError, SimError};
use crate::input::Command;
use crate::optimizer::OptimizerClient;
use crate::simulation::IntersectionSnapshot;

/// Runs an `Engine` on tokio timers. All mutation goes through the engine mutex, so an
/// optimizer plan is swapped in whole between ticks, never halfway through one.
pub struct DriverHandle {
    engine: Arc<Mutex<Engine>>,
    speed_tx: watch::Sender<u32>,
    shutdown_tx: watch::Sender<bool>,
    snapshots: watch::Receiver<IntersectionSnapshot>,
    started: Instant,
    task: JoinHandle<()>,
}

impl DriverHandle {
    /// Starts the timers on the current tokio runtime.
    pub fn spawn(engine: Engine) -> Self {
        let periods = TimerPeriods::from_config(&engine.config().timers);
        let speed = engine.state().controls.speed_multiplier;
        let (snapshot_tx, snapshots) = watch::channel(engine.snapshot());
        let (speed_tx, speed_rx) = watch::channel(speed);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let engine = Arc::new(Mutex::new(engine));
        let started = Instant::now();

        let task = tokio::spawn(run(
            Arc::clone(&engine),
            periods,
            started,
            speed_rx,
            shutdown_rx,
            snapshot_tx,
        ));

        log::info!("Realtime driver started at {}x", speed);

        Self {
            engine,
            speed_tx,
            shutdown_tx,
            snapshots,
            started,
            task,
        }
    }

    pub fn engine(&self) -> Arc<Mutex<Engine>> {
        Arc::clone(&self.engine)
    }

    /// Receiver that always holds the snapshot from the latest simulation tick.
    pub fn snapshots(&self) -> watch::Receiver<IntersectionSnapshot> {
        self.snapshots.clone()
    }

    pub async fn snapshot(&self) -> IntersectionSnapshot {
        self.engine.lock().await.snapshot()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub async fn apply(&self, command: Command) -> Result<(), SimError> {
        match command {
            Command::SetSpeed(speed) => {
                self.engine.lock().await.set_speed(speed)?;
                // The run loop rebuilds its simulation interval on this signal
                let _ = self.speed_tx.send(speed);
                Ok(())
            }
            Command::TriggerIncident(kind) => {
                let now = self.elapsed();
                let delay = {
                    let mut engine = self.engine.lock().await;
                    engine.trigger_incident(kind, now);
                    engine.recovery_delay()
                };

                let engine = Arc::clone(&self.engine);
                let started = self.started;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    engine.lock().await.expire_recoveries(started.elapsed());
                });
                Ok(())
            }
            other => {
                let now = self.elapsed();
                self.engine.lock().await.apply(other, now)
            }
        }
    }

    /// One optimizer round trip. The engine lock is not held while the request is in
    /// flight; the plan is dropped if timing changed in the meantime.
    pub async fn optimize(&self, client: &OptimizerClient) -> Result<(), OptimizerError> {
        let (densities, epoch) = self.engine.lock().await.optimization_request();
        let plan = client.request_plan(&densities).await?;
        self.engine.lock().await.apply_optimization(plan, epoch)
    }

    /// Fire-and-forget variant of `optimize`. Failures are logged and otherwise ignored.
    pub fn spawn_optimize(&self, client: Arc<OptimizerClient>) -> JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move {
            let (densities, epoch) = engine.lock().await.optimization_request();
            let result = match client.request_plan(&densities).await {
                Ok(plan) => engine.lock().await.apply_optimization(plan, epoch),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                log::error!("Optimization error: {}", e);
            }
        })
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            log::error!("Driver task ended abnormally: {}", e);
        }
        log::info!("Realtime driver stopped");
    }
}

fn repeating(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn run(
    engine: Arc<Mutex<Engine>>,
    periods: TimerPeriods,
    started: Instant,
    mut speed_rx: watch::Receiver<u32>,
    mut shutdown_rx: watch::Receiver<bool>,
    snapshot_tx: watch::Sender<IntersectionSnapshot>,
) {
    let speed = *speed_rx.borrow();
    let mut simulation = repeating(periods.simulation(speed));
    let mut metrics = repeating(periods.metrics);
    let mut clock = repeating(periods.clock);

    loop {
        tokio::select! {
            _ = simulation.tick() => {
                let mut guard = engine.lock().await;
                guard.simulation_tick();
                guard.expire_recoveries(started.elapsed());
                let _ = snapshot_tx.send(guard.snapshot());
            }
            _ = metrics.tick() => {
                engine.lock().await.metrics_tick();
            }
            _ = clock.tick() => {
                let mut guard = engine.lock().await;
                guard.clock_tick(Local::now());
                guard.expire_recoveries(started.elapsed());
            }
            changed = speed_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let speed = *speed_rx.borrow_and_update();
                simulation = repeating(periods.simulation(speed));
                log::debug!("Simulation timer restarted at {:?}", periods.simulation(speed));
            }
            _ = shutdown_rx.changed() => break,
        }
    }
}
