use serde::{Deserialize, Serialize};

use super::Axis;
use crate::config::SignalConfig;
use crate::error::SimError;

/// Longest phase duration accepted from a slider or an optimizer plan.
pub const MAX_PHASE_SECONDS: u32 = 3600;

/// The four signal phases. Exactly one is active; the cycle order is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseState {
    NsGreen,
    NsYellow,
    EwGreen,
    EwYellow,
}

impl PhaseState {
    pub fn next(self) -> PhaseState {
        match self {
            PhaseState::NsGreen => PhaseState::NsYellow,
            PhaseState::NsYellow => PhaseState::EwGreen,
            PhaseState::EwGreen => PhaseState::EwYellow,
            PhaseState::EwYellow => PhaseState::NsGreen,
        }
    }

    /// The axis that currently holds right-of-way.
    pub fn axis(self) -> Axis {
        match self {
            PhaseState::NsGreen | PhaseState::NsYellow => Axis::NorthSouth,
            PhaseState::EwGreen | PhaseState::EwYellow => Axis::EastWest,
        }
    }

    pub fn is_yellow(self) -> bool {
        matches!(self, PhaseState::NsYellow | PhaseState::EwYellow)
    }

    /// Light shown to `axis`. The axis without right-of-way is always red.
    pub fn light_for(self, axis: Axis) -> LightColor {
        if self.axis() != axis {
            LightColor::Red
        } else if self.is_yellow() {
            LightColor::Yellow
        } else {
            LightColor::Green
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PhaseState::NsGreen => "ns-green",
            PhaseState::NsYellow => "ns-yellow",
            PhaseState::EwGreen => "ew-green",
            PhaseState::EwYellow => "ew-yellow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightColor {
    Red,
    Yellow,
    Green,
}

impl LightColor {
    pub fn as_str(self) -> &'static str {
        match self {
            LightColor::Red => "Red",
            LightColor::Yellow => "Yellow",
            LightColor::Green => "Green",
        }
    }
}

/// Phase durations in whole seconds. `red` only feeds the displayed cycle time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalTiming {
    pub green: u32,
    pub yellow: u32,
    pub red: u32,
    pub ew_green_override: Option<u32>,
    pub ew_yellow_override: Option<u32>,
}

impl SignalTiming {
    /// Seconds the timer is seeded with when `phase` is entered.
    pub fn duration_for(&self, phase: PhaseState) -> u32 {
        match phase {
            PhaseState::NsGreen => self.green,
            PhaseState::NsYellow => self.yellow,
            PhaseState::EwGreen => self.ew_green_override.unwrap_or(self.green),
            PhaseState::EwYellow => self.ew_yellow_override.unwrap_or(self.yellow),
        }
    }

    pub fn cycle_time_seconds(&self) -> u32 {
        self.green
            .saturating_add(self.yellow)
            .saturating_add(self.red)
            .saturating_mul(2)
    }
}

/// A timing override from the optimizer. Absent fields keep the current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimingPlan {
    pub ns_green: Option<u32>,
    pub ns_yellow: Option<u32>,
    pub ew_green: Option<u32>,
    pub ew_yellow: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseTick {
    pub phase: PhaseState,
    pub seconds_remaining: u32,
}

/// Timed state machine over the four phases.
///
/// `seconds_remaining` is at least one between calls: a decrement that reaches zero
/// moves to the next phase and reseeds the timer inside the same `tick`.
///
/// Every change to the durations bumps `epoch`, which lets an optimizer response that
/// was requested against older timing be recognised and dropped.
#[derive(Debug, Clone)]
pub struct PhaseClock {
    phase: PhaseState,
    seconds_remaining: u32,
    timing: SignalTiming,
    min_green: u32,
    min_yellow: u32,
    epoch: u64,
}

impl PhaseClock {
    pub fn new(config: &SignalConfig) -> Self {
        Self {
            phase: PhaseState::NsGreen,
            seconds_remaining: config.initial_phase_seconds.max(1),
            timing: SignalTiming {
                green: config.green_seconds.max(1),
                yellow: config.yellow_seconds.max(1),
                red: config.red_seconds.max(1),
                ew_green_override: None,
                ew_yellow_override: None,
            },
            min_green: config.min_green_seconds.min(MAX_PHASE_SECONDS),
            min_yellow: config.min_yellow_seconds.min(MAX_PHASE_SECONDS),
            epoch: 0,
        }
    }

    pub fn phase(&self) -> PhaseState {
        self.phase
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    pub fn timing(&self) -> SignalTiming {
        self.timing
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn cycle_time_seconds(&self) -> u32 {
        self.timing.cycle_time_seconds()
    }

    pub fn tick(&mut self) -> PhaseTick {
        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);

        if self.seconds_remaining == 0 {
            let previous = self.phase;
            self.phase = self.phase.next();
            self.seconds_remaining = self.timing.duration_for(self.phase);
            log::debug!(
                "Phase {} -> {} ({}s)",
                previous.as_str(),
                self.phase.as_str(),
                self.seconds_remaining
            );
        }

        PhaseTick {
            phase: self.phase,
            seconds_remaining: self.seconds_remaining,
        }
    }

    /// Swaps in an optimizer plan. Supplied values are clamped between the configured
    /// minimums and `MAX_PHASE_SECONDS`, missing ones keep their previous value, and the
    /// running phase restarts with its new duration.
    pub fn apply_timing_plan(&mut self, plan: &TimingPlan) {
        let mut timing = self.timing;

        if let Some(green) = plan.ns_green {
            timing.green = green.clamp(self.min_green, MAX_PHASE_SECONDS);
        }
        if let Some(yellow) = plan.ns_yellow {
            timing.yellow = yellow.clamp(self.min_yellow, MAX_PHASE_SECONDS);
        }
        if let Some(green) = plan.ew_green {
            timing.ew_green_override = Some(green.clamp(self.min_green, MAX_PHASE_SECONDS));
        }
        if let Some(yellow) = plan.ew_yellow {
            timing.ew_yellow_override = Some(yellow.clamp(self.min_yellow, MAX_PHASE_SECONDS));
        }

        self.timing = timing;
        self.seconds_remaining = self.timing.duration_for(self.phase);
        self.epoch += 1;

        log::info!(
            "Applied timing plan: NS {}s/{}s, EW {}s/{}s, cycle {}s",
            timing.duration_for(PhaseState::NsGreen),
            timing.duration_for(PhaseState::NsYellow),
            timing.duration_for(PhaseState::EwGreen),
            timing.duration_for(PhaseState::EwYellow),
            timing.cycle_time_seconds()
        );
    }

    /// User override of all three durations, each within `1..=MAX_PHASE_SECONDS`. Takes
    /// effect at the next transition.
    pub fn set_manual_timing(&mut self, green: u32, yellow: u32, red: u32) -> Result<(), SimError> {
        let timing = SignalTiming {
            green: positive("green", green)?,
            yellow: positive("yellow", yellow)?,
            red: positive("red", red)?,
            ..self.timing
        };
        self.timing = timing;
        self.epoch += 1;
        Ok(())
    }

    pub fn set_green(&mut self, seconds: u32) -> Result<(), SimError> {
        self.set_manual_timing(seconds, self.timing.yellow, self.timing.red)
    }

    pub fn set_yellow(&mut self, seconds: u32) -> Result<(), SimError> {
        self.set_manual_timing(self.timing.green, seconds, self.timing.red)
    }

    pub fn set_red(&mut self, seconds: u32) -> Result<(), SimError> {
        self.set_manual_timing(self.timing.green, self.timing.yellow, seconds)
    }

    /// Back to north-south green with a full green interval. Timing values are kept.
    pub fn reset(&mut self) {
        self.phase = PhaseState::NsGreen;
        self.seconds_remaining = self.timing.duration_for(PhaseState::NsGreen);
        self.epoch += 1;
    }
}

fn positive(field: &'static str, seconds: u32) -> Result<u32, SimError> {
    if seconds == 0 || seconds > MAX_PHASE_SECONDS {
        return Err(SimError::InvalidDuration { field, value: seconds as i64 });
    }
    Ok(seconds)
}
