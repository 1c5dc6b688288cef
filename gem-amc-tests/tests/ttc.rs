use gem_amc::{
    Amc,
    config::Builder,
    error::Error,
    scan::{GTH_SHIFT_STEPS, PhaseScanConfig, ScanEvent, ScanOutcome, ScanReport},
};
use gem_amc_protocol::{Register, ttc::TtcCounter};
use gem_amc_tests::{SimBus, fast_config};

fn amc(bus: SimBus) -> Amc<SimBus> {
    let _ = env_logger::builder().is_test(true).try_init();
    Amc::new(bus, fast_config())
}

fn bc0_scan(shift_out_of_lock_first: bool) -> PhaseScanConfig {
    PhaseScanConfig {
        shift_out_of_lock_first,
        use_bc0_locked: true,
        do_scan: false,
    }
}

fn pll_scan(shift_out_of_lock_first: bool) -> PhaseScanConfig {
    PhaseScanConfig {
        shift_out_of_lock_first,
        use_bc0_locked: false,
        do_scan: false,
    }
}

fn run(amc: &mut Amc<SimBus>, scan: PhaseScanConfig) -> ScanReport {
    amc.ttc().phase_shift(scan).unwrap()
}

/// Every effective shift moves the GTH by one step with wraparound, and the
/// MMCM by at most one step.
fn assert_shift_continuity(bus: &SimBus, start: (u8, u16)) {
    let mut previous = start;
    for &(gth, mmcm) in bus.shift_history() {
        assert!(gth < GTH_SHIFT_STEPS);
        let forward = (previous.0 + 1) % GTH_SHIFT_STEPS;
        let reverse = (previous.0 + GTH_SHIFT_STEPS - 1) % GTH_SHIFT_STEPS;
        assert!(
            gth == forward || gth == reverse,
            "{} -> {}",
            previous.0,
            gth
        );
        let steps = [previous.1, previous.1.wrapping_add(1), previous.1.wrapping_sub(1)];
        assert!(steps.contains(&mmcm));
        previous = (gth, mmcm);
    }
}

#[test]
fn bc0_lock_after_unlock_reverses_and_accepts() {
    let mut bus = SimBus::new();
    bus.signal(Register::TtcBc0Locked, |n| u32::from(n >= 150));
    let mut amc = amc(bus);

    let report = run(&mut amc, bc0_scan(true));

    assert!(report.is_locked());
    assert_eq!(report.error_message(), None);
    assert_eq!(
        report.events,
        vec![
            ScanEvent::FirstUnlock {
                iteration: 100,
                bad_streak: 101
            },
            ScanEvent::NextLock { iteration: 150 },
            ScanEvent::Reversed {
                iteration: 349,
                good_streak: 200
            },
            ScanEvent::BestLock {
                iteration: 449,
                good_streak: 300
            },
        ]
    );
    assert_eq!(report.iterations, 450);
    assert!(report.state.best_lock_found);
    assert_eq!(report.locks.len(), 1);

    let bus = amc.bus_mut();
    assert_eq!(bus.writes_to(Register::TtcMmcmReset), vec![1]);
    // Direction registers flipped once, both of them.
    assert_eq!(bus.writes_to(Register::TtcPaManualShiftDir), vec![1, 0]);
    assert_eq!(bus.writes_to(Register::TtcPaGthManualShiftDir), vec![0, 1]);
    assert_eq!(report.state.gth_shift, bus.gth_shift());
    assert_eq!(report.state.mmcm_shift, bus.mmcm_shift());
}

#[test]
fn lock_point_reports_phase() {
    let mut bus = SimBus::new();
    bus.set(Register::TtcBc0Locked, 1);
    bus.set(Register::TtcPmPhaseMean, 1000);
    let mut amc = amc(bus);

    let report = run(&mut amc, bc0_scan(false));
    match report.outcome {
        ScanOutcome::Locked(lock) => {
            assert_eq!(lock.iteration, 299);
            assert_eq!(lock.phase_counts, 1000);
            assert!((lock.phase_ns - 18.60119).abs() < 1e-9);
        }
        ScanOutcome::LockNotFound => panic!("expected a lock"),
    }
}

#[test]
fn pll_lock_policy_thresholds() {
    let mut bus = SimBus::new();
    bus.set(Register::TtcPhaseLocked, 1);
    let mut amc = amc(bus);

    let report = run(&mut amc, pll_scan(false));

    assert_eq!(
        report.events,
        vec![
            ScanEvent::NextLock { iteration: 0 },
            ScanEvent::Reversed {
                iteration: 49,
                good_streak: 50
            },
            ScanEvent::BestLock {
                iteration: 74,
                good_streak: 75
            },
        ]
    );
    assert_eq!(report.iterations, 75);
    // Ten relock attempts per shift and before the first shift, plus the
    // one of the configuration.
    assert_eq!(
        amc.bus_mut().writes_to(Register::TtcPaManualPllReset).len(),
        75 * 10 + 10 + 1
    );
}

#[test]
fn pll_partial_lock_counts_as_unlocked() {
    let mut bus = SimBus::new();
    // One in ten relocks fails.
    bus.signal(Register::TtcPhaseLocked, |n| u32::from(n % 10 != 9));
    let mut amc = amc(bus);

    let report = run(&mut amc, pll_scan(false));
    assert!(!report.is_locked());
    assert_eq!(report.iterations, 11520);
}

#[test]
fn pll_homing_after_fixed_number_of_shifts() {
    let mut bus = SimBus::new();
    // Ten reads per sample, the first sample is taken before shifting. Lock
    // region from shift 600 with a dropout every 40 shifts.
    bus.signal(Register::TtcPhaseLocked, |n| {
        let sample = (n / 10).saturating_sub(1);
        u32::from(sample >= 600 && (sample - 600) % 40 != 39)
    });
    let mut amc = amc(bus);

    let report = run(&mut amc, pll_scan(true));

    assert_eq!(
        report.events,
        vec![
            ScanEvent::FirstUnlock {
                iteration: 500,
                bad_streak: 501
            },
            ScanEvent::NextLock { iteration: 600 },
            ScanEvent::HomingComplete { iteration: 1600 },
        ]
    );
    assert_eq!(report.iterations, 1601);
    assert_eq!(report.state.shifts_since_lock, 1000);
    assert!(report.is_locked());
}

#[test]
fn bc0_homing_after_good_samples() {
    let mut bus = SimBus::new();
    bus.signal(Register::TtcBc0Locked, |n| {
        u32::from(n >= 120 && (n - 120) % 150 != 149)
    });
    let mut amc = amc(bus);

    let report = run(&mut amc, bc0_scan(true));

    assert_eq!(
        report.events,
        vec![
            ScanEvent::FirstUnlock {
                iteration: 100,
                bad_streak: 101
            },
            ScanEvent::NextLock { iteration: 120 },
            ScanEvent::HomingComplete { iteration: 2051 },
        ]
    );
    assert_eq!(report.state.good_since_lock, 1920);
}

#[test]
fn relapse_while_reversing_returns_to_forward() {
    let mut bus = SimBus::new();
    // 210 good samples, one bad, then good forever.
    bus.signal(Register::TtcBc0Locked, |n| u32::from(n != 210));
    let mut amc = amc(bus);

    let report = run(&mut amc, bc0_scan(false));

    assert_eq!(
        report.events,
        vec![
            ScanEvent::NextLock { iteration: 0 },
            ScanEvent::Reversed {
                iteration: 199,
                good_streak: 200
            },
            ScanEvent::ReversalAborted { iteration: 210 },
            ScanEvent::Reversed {
                iteration: 410,
                good_streak: 200
            },
            ScanEvent::BestLock {
                iteration: 510,
                good_streak: 300
            },
        ]
    );
    assert_eq!(
        amc.bus_mut().writes_to(Register::TtcPaGthManualShiftDir),
        vec![0, 1, 0, 1]
    );
}

#[test]
fn lock_not_found_is_a_report() {
    let mut bus = SimBus::new();
    // Every PLL relock succeeds, but BC0 never locks.
    bus.set(Register::TtcPhaseLocked, 1);
    let mut amc = amc(bus);

    let report = run(&mut amc, bc0_scan(false));

    assert_eq!(report.outcome, ScanOutcome::LockNotFound);
    assert_eq!(report.error_message(), Some("Unable to find lock"));
    assert_eq!(report.iterations, 11520);
    assert!(report.locks.is_empty());
    assert!(amc.bus_mut().writes_to(Register::TtcMmcmReset).is_empty());
}

#[test]
fn bc0_scan_relocks_pll_every_shift() {
    let mut bus = SimBus::new();
    bus.set(Register::TtcBc0Locked, 1);
    let mut amc = amc(bus);

    let report = run(&mut amc, bc0_scan(false));

    // The PLL never relocks, the lock comes from BC0 alone.
    assert!(report.is_locked());
    assert_eq!(report.iterations, 300);
    let bus = amc.bus_mut();
    // One relock per shift and one before the first shift, plus the
    // configuration write.
    assert_eq!(
        bus.writes_to(Register::TtcPaManualPllReset).len(),
        300 + 1 + 1
    );
    assert_eq!(bus.reads_of(Register::TtcPhaseLocked), 301);
    assert_eq!(bus.reads_of(Register::TtcBc0Locked), 300);
}

#[test]
fn bc0_survey_relocks_pll_ten_times_per_shift() {
    let mut bus = SimBus::new();
    bus.set(Register::TtcBc0Locked, 1);
    let mut amc = amc(bus);

    let report = run(
        &mut amc,
        PhaseScanConfig {
            shift_out_of_lock_first: false,
            use_bc0_locked: true,
            do_scan: true,
        },
    );

    assert_eq!(report.iterations, 23040);
    assert_eq!(
        amc.bus_mut().writes_to(Register::TtcPaManualPllReset).len(),
        23040 * 10 + 10 + 1
    );
}

#[test]
fn shifters_wrap_in_both_directions() {
    let start = (36, 0xfffe);
    let mut bus = SimBus::new().with_shift_position(start.0, start.1);
    bus.set(Register::TtcBc0Locked, 1);
    let mut amc = amc(bus);

    let report = run(&mut amc, bc0_scan(false));
    assert!(report.is_locked());

    let bus = amc.bus_mut();
    assert_shift_continuity(bus, start);
    let history = bus.shift_history();
    // Forward over 39 -> 0 and the MMCM over 0xffff -> 0, then back over 0 -> 39.
    assert!(history.windows(2).any(|w| w[0].0 == 39 && w[1].0 == 0));
    assert!(history.windows(2).any(|w| w[0].0 == 0 && w[1].0 == 39));
    assert!(history.iter().any(|(_, mmcm)| *mmcm == 0xffff));
    assert!(history.iter().any(|(_, mmcm)| *mmcm == 0x0000));
    assert_eq!(report.state.gth_shift, bus.gth_shift());
    assert_eq!(report.state.mmcm_shift, bus.mmcm_shift());
}

#[test]
fn pll_scan_keeps_shift_counters_in_step() {
    // The first shift moves the MMCM over 0xffff -> 0.
    let start = (1, 0xffff);
    let mut bus = SimBus::new().with_shift_position(start.0, start.1);
    bus.set(Register::TtcPhaseLocked, 1);
    let mut amc = amc(bus);

    let report = run(&mut amc, pll_scan(false));

    let bus = amc.bus_mut();
    assert_shift_continuity(bus, start);
    assert_eq!(bus.shift_history()[0], (2, 0));
    assert_eq!(report.state.mmcm_shift, bus.mmcm_shift());
    assert_eq!(report.state.gth_shift, bus.gth_shift());
}

#[test]
fn configuration_readback_mismatch_aborts() {
    let mut bus = SimBus::new();
    bus.stick(Register::TtcPaManualOverride, 0);
    let mut amc = amc(bus);

    match amc.ttc().phase_shift(bc0_scan(false)) {
        Err(Error::ReadbackMismatch {
            register,
            expected,
            got,
        }) => {
            assert_eq!(register, Register::TtcPaManualOverride);
            assert_eq!((expected, got), (1, 0));
        }
        other => panic!("expected a readback mismatch, got {:?}", other),
    }
    assert!(
        amc.bus_mut()
            .writes_to(Register::TtcPaGthManualShiftEn)
            .is_empty()
    );
}

#[test]
fn automatic_phase_alignment_must_be_disabled() {
    let mut bus = SimBus::new();
    // Readback right after the write succeeds; the final check does not.
    bus.script(Register::TtcDisablePhaseAlignment, [1, 0]);
    let mut amc = amc(bus);

    let result = amc.ttc().phase_shift(bc0_scan(false));
    assert!(matches!(result, Err(Error::PhaseAlignmentStillEnabled)));
    assert!(
        amc.bus_mut()
            .writes_to(Register::TtcPaGthManualShiftEn)
            .is_empty()
    );
}

#[test]
fn dropped_gth_strobes_are_repeated() {
    let mut bus = SimBus::new();
    bus.set(Register::TtcBc0Locked, 1);
    bus.drop_gth_strobes(3);
    let mut amc = amc(bus);

    let report = run(&mut amc, bc0_scan(false));

    assert!(report.is_locked());
    assert_eq!(report.iterations, 300);
    let bus = amc.bus_mut();
    assert_eq!(bus.writes_to(Register::TtcPaGthManualShiftEn).len(), 303);
    assert_eq!(bus.shift_history().len(), 300);
}

#[test]
fn frozen_gth_counter_fails_after_bounded_retries() {
    let mut bus = SimBus::new().with_shift_position(5, 0);
    bus.freeze_gth();
    let config = Builder::new()
        .config_settle(std::time::Duration::ZERO)
        .max_gth_shift_retries(7)
        .build();
    let mut amc = Amc::new(bus, config);

    match amc.ttc().phase_shift(bc0_scan(false)) {
        Err(Error::GthShiftNotConverged {
            expected,
            got,
            attempts,
        }) => {
            assert_eq!(expected, 6);
            assert_eq!(got, 5);
            assert_eq!(attempts, 7);
        }
        other => panic!("expected non-convergence, got {:?}", other),
    }
    // The first strobe plus seven repeats.
    assert_eq!(
        amc.bus_mut().writes_to(Register::TtcPaGthManualShiftEn).len(),
        8
    );
}

#[test]
fn bus_failure_aborts_scan() {
    let mut bus = SimBus::new();
    bus.fail_reads_of(Register::TtcPmPhaseMean);
    let mut amc = amc(bus);

    assert!(matches!(
        amc.ttc().phase_shift(bc0_scan(false)),
        Err(Error::Bus(_))
    ));
}

#[test]
fn survey_records_every_lock_region() {
    let mut bus = SimBus::new();
    bus.set(Register::TtcBc0Locked, 1);
    let mut amc = amc(bus);

    let report = run(
        &mut amc,
        PhaseScanConfig {
            shift_out_of_lock_first: false,
            use_bc0_locked: true,
            do_scan: true,
        },
    );

    assert_eq!(report.iterations, 23040);
    assert_eq!(report.locks.len(), 23040 / 300);
    assert!(report.locks.windows(2).all(|w| w[1].iteration - w[0].iteration == 300));
    match report.outcome {
        ScanOutcome::Locked(lock) => assert_eq!(lock.iteration, 76 * 300 - 1),
        ScanOutcome::LockNotFound => panic!("expected a lock"),
    }
    assert_eq!(amc.bus_mut().writes_to(Register::TtcMmcmReset), vec![1]);
}

#[test]
fn pll_survey_starts_over_after_homing() {
    let mut bus = SimBus::new();
    // Ten reads per sample, the first sample is taken before shifting. Two
    // lock regions, each behind more than 500 unlocked shifts and with a
    // dropout every 40 shifts so the scan never reverses.
    bus.signal(Register::TtcPhaseLocked, |n| {
        let shift = (n / 10).saturating_sub(1);
        let locked = match shift {
            0..=500 => false,
            501..=1501 => (shift - 501) % 40 != 39,
            1502..=2002 => false,
            _ => (shift - 2003) % 40 != 39,
        };
        u32::from(locked)
    });
    let mut amc = amc(bus);

    let report = run(
        &mut amc,
        PhaseScanConfig {
            shift_out_of_lock_first: true,
            use_bc0_locked: false,
            do_scan: true,
        },
    );

    assert_eq!(
        report.events,
        vec![
            ScanEvent::FirstUnlock {
                iteration: 500,
                bad_streak: 501
            },
            ScanEvent::NextLock { iteration: 501 },
            ScanEvent::HomingComplete { iteration: 1501 },
            ScanEvent::FirstUnlock {
                iteration: 2002,
                bad_streak: 501
            },
            ScanEvent::NextLock { iteration: 2003 },
            ScanEvent::HomingComplete { iteration: 3003 },
        ]
    );
    assert_eq!(report.iterations, 23040);
    let iterations: Vec<u32> = report.locks.iter().map(|lock| lock.iteration).collect();
    assert_eq!(iterations, vec![1501, 3003]);

    // Without a third unlocked stretch the search state stays as reset after
    // the second lock.
    assert!(!report.state.first_unlock_found);
    assert!(!report.state.next_lock_found);
    assert!(!report.state.best_lock_found);
    assert_eq!(report.state.shifts_since_lock, 0);
    assert_eq!(report.state.good_since_lock, 0);
    assert_eq!(amc.bus_mut().writes_to(Register::TtcPaGthManualShiftDir), vec![0]);
}

#[test]
fn housekeeping_registers() {
    let mut bus = SimBus::new();
    bus.set(Register::TtcBc0Locked, 1);
    bus.set(Register::TtcCounterResync, 4);
    bus.set(Register::TtcL1aId, 0x1234);
    bus.set(Register::TtcL1aRate, 100_000);
    bus.set(Register::TtcGthPmPhaseMean, 77);
    let mut amc = amc(bus);
    let mut ttc = amc.ttc();

    assert!(ttc.status().unwrap());
    assert_eq!(ttc.counter(TtcCounter::Resync).unwrap(), 4);
    assert_eq!(ttc.l1a_id().unwrap(), 0x1234);
    assert_eq!(ttc.l1a_rate().unwrap(), 100_000);
    assert_eq!(ttc.gth_phase_mean().unwrap(), 77);

    ttc.counter_reset().unwrap();
    assert!(ttc.all_counters().unwrap().iter().all(|(_, v)| *v == 0));
}

#[test]
fn pll_lock_check_counts_relocks() {
    let mut bus = SimBus::new();
    bus.signal(Register::TtcPhaseLocked, |n| u32::from(n % 3 != 0));
    let mut amc = amc(bus);

    let sample = amc.ttc().check_pll_lock(9).unwrap();
    assert_eq!(sample.attempted, 9);
    assert_eq!(sample.locked, 6);
    assert!(!sample.all_locked());
    assert_eq!(
        amc.bus_mut().writes_to(Register::TtcPaManualPllReset).len(),
        9
    );
}
