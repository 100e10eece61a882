use signal_sim::{
    config::SignalConfig,
    simulation::{Axis, LightColor, PhaseClock, PhaseState, SignalTiming, TimingPlan, MAX_PHASE_SECONDS},
    SimError,
};
use anyhow::Result;

fn short_cycle() -> SignalConfig {
    SignalConfig {
        green_seconds: 4,
        yellow_seconds: 2,
        red_seconds: 3,
        initial_phase_seconds: 4,
        ..SignalConfig::default()
    }
}

/// Phases only ever change to their cycle successor, and every phase is visited
#[test]
fn test_phase_sequence_follows_cycle() -> Result<()> {
    let mut clock = PhaseClock::new(&short_cycle());
    let mut previous = clock.phase();
    let mut visited = vec![previous];

    for _ in 0..1000 {
        let tick = clock.tick();
        if tick.phase != previous {
            assert_eq!(tick.phase, previous.next(), "Phase skipped from {:?}", previous);
            visited.push(tick.phase);
            previous = tick.phase;
        }
    }

    let expected = [
        PhaseState::NsGreen,
        PhaseState::NsYellow,
        PhaseState::EwGreen,
        PhaseState::EwYellow,
    ];
    for (i, phase) in visited.iter().enumerate() {
        assert_eq!(*phase, expected[i % 4], "Unexpected phase at transition {}", i);
    }
    // 1000 ticks over a 12 second cycle
    assert!(visited.len() > 300, "Only {} transitions", visited.len());

    println!("✓ {} transitions followed the fixed cycle", visited.len());
    Ok(())
}

#[test]
fn test_axes_never_share_right_of_way() -> Result<()> {
    let mut clock = PhaseClock::new(&short_cycle());

    for _ in 0..1000 {
        let phase = clock.tick().phase;
        let ns = phase.light_for(Axis::NorthSouth);
        let ew = phase.light_for(Axis::EastWest);

        assert!(!(ns == LightColor::Green && ew == LightColor::Green), "Both axes green in {:?}", phase);
        assert!(!(ns == LightColor::Yellow && ew == LightColor::Yellow), "Both axes yellow in {:?}", phase);
        assert!(ns == LightColor::Red || ew == LightColor::Red, "Neither axis red in {:?}", phase);
    }

    println!("✓ Mutual exclusion held for 1000 ticks");
    Ok(())
}

#[test]
fn test_timer_never_reaches_zero_after_tick() -> Result<()> {
    let mut clock = PhaseClock::new(&SignalConfig {
        green_seconds: 1,
        yellow_seconds: 1,
        red_seconds: 1,
        initial_phase_seconds: 1,
        ..SignalConfig::default()
    });

    for i in 0..1000 {
        let tick = clock.tick();
        assert!(tick.seconds_remaining >= 1, "Timer hit zero at tick {}", i);
    }
    Ok(())
}

#[test]
fn test_timer_reseeds_with_entering_phase_duration() -> Result<()> {
    let mut clock = PhaseClock::new(&short_cycle());
    assert_eq!(clock.phase(), PhaseState::NsGreen);
    assert_eq!(clock.seconds_remaining(), 4);

    for _ in 0..3 {
        clock.tick();
    }
    assert_eq!(clock.phase(), PhaseState::NsGreen);
    assert_eq!(clock.seconds_remaining(), 1);

    let tick = clock.tick();
    assert_eq!(tick.phase, PhaseState::NsYellow);
    assert_eq!(tick.seconds_remaining, 2);

    clock.tick();
    let tick = clock.tick();
    assert_eq!(tick.phase, PhaseState::EwGreen);
    assert_eq!(tick.seconds_remaining, 4);
    Ok(())
}

#[test]
fn test_default_signal_starts_mid_green() -> Result<()> {
    let clock = PhaseClock::new(&SignalConfig::default());
    assert_eq!(clock.phase(), PhaseState::NsGreen);
    assert_eq!(clock.seconds_remaining(), 25);
    assert_eq!(clock.cycle_time_seconds(), 140);
    Ok(())
}

#[test]
fn test_timing_plan_clamps_to_minimums() -> Result<()> {
    let mut clock = PhaseClock::new(&SignalConfig::default());
    clock.apply_timing_plan(&TimingPlan {
        ns_green: Some(2),
        ns_yellow: Some(1),
        ..TimingPlan::default()
    });

    let timing = clock.timing();
    assert_eq!(timing.green, 10);
    assert_eq!(timing.yellow, 3);
    assert_eq!(timing.red, 30, "Red is not part of a timing plan");
    // The running NS green restarts with its new duration
    assert_eq!(clock.seconds_remaining(), 10);

    println!("✓ Timing plan clamped to green=10 yellow=3");
    Ok(())
}

#[test]
fn test_timing_plan_keeps_missing_fields() -> Result<()> {
    let mut clock = PhaseClock::new(&SignalConfig::default());
    clock.apply_timing_plan(&TimingPlan {
        ew_green: Some(22),
        ..TimingPlan::default()
    });

    let timing = clock.timing();
    assert_eq!(timing.green, 35);
    assert_eq!(timing.yellow, 5);
    assert_eq!(timing.ew_green_override, Some(22));
    assert_eq!(timing.ew_yellow_override, None);

    clock.apply_timing_plan(&TimingPlan::default());
    assert_eq!(clock.timing(), timing);
    Ok(())
}

#[test]
fn test_east_west_overrides_seed_east_west_phases() -> Result<()> {
    let mut clock = PhaseClock::new(&short_cycle());
    clock.apply_timing_plan(&TimingPlan {
        ns_green: Some(12),
        ns_yellow: Some(4),
        ew_green: Some(20),
        ew_yellow: Some(6),
    });
    assert_eq!(clock.seconds_remaining(), 12);

    let mut seeded = Vec::new();
    let mut previous = clock.phase();
    for _ in 0..200 {
        let tick = clock.tick();
        if tick.phase != previous {
            seeded.push((tick.phase, tick.seconds_remaining));
            previous = tick.phase;
        }
    }

    assert_eq!(seeded[0], (PhaseState::NsYellow, 4));
    assert_eq!(seeded[1], (PhaseState::EwGreen, 20));
    assert_eq!(seeded[2], (PhaseState::EwYellow, 6));
    assert_eq!(seeded[3], (PhaseState::NsGreen, 12));
    Ok(())
}

#[test]
fn test_plan_resets_timer_of_active_phase() -> Result<()> {
    let mut clock = PhaseClock::new(&short_cycle());
    // Walk into EW green
    while clock.phase() != PhaseState::EwGreen {
        clock.tick();
    }
    clock.tick();
    assert_eq!(clock.seconds_remaining(), 3);

    clock.apply_timing_plan(&TimingPlan {
        ew_green: Some(15),
        ..TimingPlan::default()
    });
    assert_eq!(clock.phase(), PhaseState::EwGreen);
    assert_eq!(clock.seconds_remaining(), 15);
    Ok(())
}

#[test]
fn test_manual_timing_updates_cycle_time() -> Result<()> {
    let mut clock = PhaseClock::new(&SignalConfig::default());
    assert_eq!(clock.cycle_time_seconds(), 2 * (35 + 5 + 30));

    clock.set_manual_timing(20, 4, 25)?;
    assert_eq!(clock.cycle_time_seconds(), 2 * (20 + 4 + 25));

    clock.set_red(10)?;
    assert_eq!(clock.cycle_time_seconds(), 2 * (20 + 4 + 10));

    // Manual timing does not interrupt the running phase
    assert_eq!(clock.seconds_remaining(), 25);
    Ok(())
}

#[test]
fn test_manual_timing_rejects_zero() -> Result<()> {
    let mut clock = PhaseClock::new(&SignalConfig::default());
    let before = clock.timing();

    assert_eq!(
        clock.set_manual_timing(0, 5, 30),
        Err(SimError::InvalidDuration { field: "green", value: 0 })
    );
    assert!(clock.set_yellow(0).is_err());
    assert_eq!(clock.timing(), before, "Rejected input must not change timing");
    Ok(())
}

#[test]
fn test_timing_changes_bump_epoch() -> Result<()> {
    let mut clock = PhaseClock::new(&SignalConfig::default());
    let start = clock.epoch();

    clock.tick();
    assert_eq!(clock.epoch(), start, "Ticking is not a timing change");

    clock.set_green(30)?;
    clock.apply_timing_plan(&TimingPlan::default());
    clock.reset();
    assert_eq!(clock.epoch(), start + 3);
    Ok(())
}

#[test]
fn test_durations_have_a_ceiling() -> Result<()> {
    let mut clock = PhaseClock::new(&SignalConfig::default());

    assert_eq!(
        clock.set_manual_timing(MAX_PHASE_SECONDS + 1, 5, 30),
        Err(SimError::InvalidDuration { field: "green", value: (MAX_PHASE_SECONDS + 1) as i64 })
    );
    assert!(clock.set_red(u32::MAX).is_err());

    clock.apply_timing_plan(&TimingPlan {
        ns_green: Some(u32::MAX),
        ns_yellow: Some(u32::MAX),
        ..TimingPlan::default()
    });
    assert_eq!(clock.timing().green, MAX_PHASE_SECONDS);
    assert_eq!(clock.timing().yellow, MAX_PHASE_SECONDS);
    assert_eq!(clock.seconds_remaining(), MAX_PHASE_SECONDS);
    Ok(())
}

#[test]
fn test_cycle_time_saturates() -> Result<()> {
    let timing = SignalTiming {
        green: u32::MAX,
        yellow: u32::MAX,
        red: 1,
        ew_green_override: None,
        ew_yellow_override: None,
    };
    assert_eq!(timing.cycle_time_seconds(), u32::MAX);
    Ok(())
}
