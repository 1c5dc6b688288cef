//! Alignment of the TTC clock phase.
//!
//! The recovered TTC clock passes two phase shifters: the GTH transceiver
//! phase interpolator (40 fine steps) and the MMCM (65536 coarse steps). With
//! manual override enabled every GTH shift strobe advances the interpolator by
//! one step, and at seven fixed positions of the interpolator the MMCM follows
//! by one step (see [`MMCM_SHIFT_TABLE`]).
//!
//! The scanner walks both shifters while sampling a lock signal, either the
//! BC0 lock of the TTC decoder or repeated PLL relocks, until it sits well
//! inside a region of stable lock. The PLL is relocked at every shift in
//! both cases; with the BC0 lock selected the relock count is only logged.
//!
//!
//! 1. Optionally walk out of the current lock region first, until the lock
//!    has been lost for a number of consecutive shifts.
//! 2. Walk forward until the lock signal is good for a number of consecutive
//!    shifts, then reverse and accept the phase once the streak has grown
//!    further. A bad sample while reversing returns to the forward search.
//! 3. Independently of the reversal, accept the phase once enough shifts have
//!    passed since the lock came back.
//!
//! In survey mode the scanner records the accepted phase and starts over,
//! looking for further lock regions over the whole shift range.
use std::ops::ControlFlow;

use gem_amc_protocol::{Register, ttc::phase_to_ns};

use crate::{
    RegisterBus,
    config::{Config, settle},
    error::Error,
    pll::{PllLockProbe, PllLockSample},
};

/// Number of steps of the GTH phase interpolator.
pub const GTH_SHIFT_STEPS: u8 = 40;

/// Positions of the GTH interpolator at which the MMCM shifts along.
///
/// Indexed with the position following the current one, wrapping around.
pub const MMCM_SHIFT_TABLE: [bool; GTH_SHIFT_STEPS as usize] = {
    let mut table = [false; GTH_SHIFT_STEPS as usize];
    let coupled = [3, 9, 15, 20, 26, 32, 38];
    let mut i = 0;
    while i < coupled.len() {
        table[coupled[i]] = true;
        i += 1;
    }
    table
};

/// PLL relock attempts per sample when the PLL lock is used.
pub const PLL_LOCK_READ_ATTEMPTS: u32 = 10;

const MAX_SHIFTS: u32 = 7680 + 7680 / 2;
const MAX_SHIFTS_SURVEY: u32 = 23040;

/// Manual shift configuration, written and verified in this order.
const MANUAL_SHIFT_SETUP: [(Register, u32); 12] = [
    (Register::TtcDisablePhaseAlignment, 0x1),
    (Register::TtcPaDisableGthPhaseTracking, 0x1),
    (Register::TtcPaManualOverride, 0x1),
    (Register::TtcPaManualShiftDir, 0x1),
    (Register::TtcPaGthManualOverride, 0x1),
    (Register::TtcPaGthManualShiftDir, 0x0),
    (Register::TtcPaGthManualShiftStep, 0x1),
    (Register::TtcPaGthManualSelOverride, 0x1),
    (Register::TtcPaGthManualCombined, 0x1),
    (Register::TtcGthTxDlyBypass, 0x1),
    (Register::TtcPaManualPllReset, 0x1),
    (Register::TtcCntReset, 0x1),
];

/// Options of a phase alignment scan.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PhaseScanConfig {
    /// Walk out of the current lock region before searching for a lock.
    pub shift_out_of_lock_first: bool,
    /// Use the BC0 lock of the TTC decoder instead of PLL relocks.
    pub use_bc0_locked: bool,
    /// Survey mode: keep searching for further lock regions after each lock.
    pub do_scan: bool,
}

impl PhaseScanConfig {
    /// PLL relock attempts per shift.
    pub fn lock_sample_attempts(&self) -> u32 {
        if !self.use_bc0_locked || self.do_scan {
            PLL_LOCK_READ_ATTEMPTS
        } else {
            1
        }
    }

    pub fn max_shift_iterations(&self) -> u32 {
        if self.do_scan {
            MAX_SHIFTS_SURVEY
        } else {
            MAX_SHIFTS
        }
    }

    pub fn lock_policy(&self) -> LockPolicy {
        if self.use_bc0_locked {
            LockPolicy::BC0_LOCKED
        } else {
            LockPolicy::PLL_LOCKED
        }
    }
}

/// When the scan considers the phase homed after the lock came back.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Homing {
    /// After this many good samples since the lock came back.
    GoodSamples(u32),
    /// After this many shifts since the lock came back.
    Shifts(u32),
}

/// Thresholds of a lock detection policy.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LockPolicy {
    /// Bad samples in a row, beyond which the lock region has been left.
    pub unlock_threshold: u32,
    /// Good samples in a row at which the direction is reversed.
    pub reverse_at: u32,
    /// Good samples in a row at which the phase is accepted while reversing.
    pub best_lock_at: u32,
    pub homing: Homing,
}

impl LockPolicy {
    pub const BC0_LOCKED: LockPolicy = LockPolicy {
        unlock_threshold: 100,
        reverse_at: 200,
        best_lock_at: 300,
        homing: Homing::GoodSamples(1920),
    };

    pub const PLL_LOCKED: LockPolicy = LockPolicy {
        unlock_threshold: 500,
        reverse_at: 50,
        best_lock_at: 75,
        homing: Homing::Shifts(1000),
    };
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    /// Value of `PA_MANUAL_SHIFT_DIR` for this direction.
    fn mmcm_register_value(self) -> u32 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => 0,
        }
    }

    /// Value of `PA_GTH_MANUAL_SHIFT_DIR` for this direction.
    fn gth_register_value(self) -> u32 {
        match self {
            Direction::Forward => 0,
            Direction::Reverse => 1,
        }
    }

    fn signum(self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }
}

/// The GTH position after one shift in `direction`.
pub fn next_gth_shift(current: u8, direction: Direction) -> u8 {
    match direction {
        Direction::Forward => (current + 1) % GTH_SHIFT_STEPS,
        Direction::Reverse => (current + GTH_SHIFT_STEPS - 1) % GTH_SHIFT_STEPS,
    }
}

/// The MMCM position after one shift in `direction`.
pub fn next_mmcm_shift(current: u16, direction: Direction) -> u16 {
    match direction {
        Direction::Forward => current.wrapping_add(1),
        Direction::Reverse => current.wrapping_sub(1),
    }
}

/// Whether the MMCM shifts along when the GTH arrives at `gth_shift`.
pub fn mmcm_shift_due(gth_shift: u8) -> bool {
    MMCM_SHIFT_TABLE[(gth_shift as usize + 1) % GTH_SHIFT_STEPS as usize]
}

/// Progress of a scan.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PhaseScanState {
    pub gth_shift: u8,
    pub mmcm_shift: u16,
    pub direction: Direction,
    pub good_streak: u32,
    pub bad_streak: u32,
    /// Shifts since the lock came back
    pub shifts_since_lock: u32,
    /// Good samples since the lock came back
    pub good_since_lock: u32,
    /// Net number of shifts, forward minus reverse
    pub total_shift: i64,
    pub phase_counts: u32,
    pub phase_ns: f64,
    pub first_unlock_found: bool,
    pub next_lock_found: bool,
    pub best_lock_found: bool,
}

/// A phase at which the scan found a stable lock.
#[derive(Clone, Debug, PartialEq)]
pub struct LockPoint {
    pub iteration: u32,
    pub gth_shift: u8,
    pub mmcm_shift: u16,
    pub phase_counts: u32,
    pub phase_ns: f64,
}

/// Milestones of a scan, with the iteration they happened in.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScanEvent {
    FirstUnlock { iteration: u32, bad_streak: u32 },
    NextLock { iteration: u32 },
    Reversed { iteration: u32, good_streak: u32 },
    ReversalAborted { iteration: u32 },
    BestLock { iteration: u32, good_streak: u32 },
    HomingComplete { iteration: u32 },
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScanOutcome {
    Locked(LockPoint),
    LockNotFound,
}

/// Result of a completed scan.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanReport {
    pub outcome: ScanOutcome,
    /// Shift iterations performed
    pub iterations: u32,
    pub state: PhaseScanState,
    /// Every accepted phase; more than one only in survey mode
    pub locks: Vec<LockPoint>,
    pub events: Vec<ScanEvent>,
}

impl ScanReport {
    pub fn is_locked(&self) -> bool {
        matches!(self.outcome, ScanOutcome::Locked(_))
    }

    /// The error string reported to remote callers for a failed scan.
    pub fn error_message(&self) -> Option<&'static str> {
        match self.outcome {
            ScanOutcome::Locked(_) => None,
            ScanOutcome::LockNotFound => Some("Unable to find lock"),
        }
    }
}

/// Writes the manual shift configuration and verifies every write.
///
/// Fails if a register does not read back as written or if automatic phase
/// alignment is not disabled afterwards.
pub fn configure_manual_shift<B: RegisterBus + ?Sized>(
    bus: &mut B,
    config: &Config,
) -> Result<(), Error> {
    for (register, value) in MANUAL_SHIFT_SETUP {
        bus.write(register, value)?;
        settle(config.config_settle);
        let readback = bus.read(register)?;
        if readback != value {
            let error = Error::ReadbackMismatch {
                register,
                expected: value,
                got: readback,
            };
            log::error!("Phase shift configuration: {}", error);
            return Err(error);
        }
    }

    if bus.read(Register::TtcDisablePhaseAlignment)? == 0x0 {
        log::error!("Phase shift configuration: automatic phase alignment is still enabled");
        return Err(Error::PhaseAlignmentStillEnabled);
    }
    Ok(())
}

/// Runs a phase alignment scan on one card.
pub struct PhaseScanner<'a, B: RegisterBus + ?Sized> {
    bus: &'a mut B,
    config: &'a Config,
    scan: PhaseScanConfig,
    policy: LockPolicy,
    state: PhaseScanState,
    locks: Vec<LockPoint>,
    events: Vec<ScanEvent>,
}

impl<'a, B: RegisterBus + ?Sized> PhaseScanner<'a, B> {
    pub fn new(bus: &'a mut B, config: &'a Config, scan: PhaseScanConfig) -> PhaseScanner<'a, B> {
        PhaseScanner {
            bus,
            config,
            scan,
            policy: scan.lock_policy(),
            state: PhaseScanState::default(),
            locks: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Configures manual shifting and scans until a lock is accepted or the
    /// shift range is exhausted.
    ///
    /// On success the MMCM is reset at the accepted phase.
    pub fn run(mut self) -> Result<ScanReport, Error> {
        log::info!(
            "Starting phase shifting procedure: shift_out_of_lock_first={}, use_bc0_locked={}, do_scan={}",
            self.scan.shift_out_of_lock_first,
            self.scan.use_bc0_locked,
            self.scan.do_scan
        );
        configure_manual_shift(self.bus, self.config)?;

        let attempts = self.scan.lock_sample_attempts();
        let max_iterations = self.scan.max_shift_iterations();

        self.state.mmcm_shift = self.bus.read(Register::TtcPaManualShiftCnt)? as u16;
        self.state.gth_shift =
            (self.bus.read(Register::TtcPaManualGthShiftCnt)? % GTH_SHIFT_STEPS as u32) as u8;
        let initial = PllLockProbe::new(&mut *self.bus, self.config.pll_settle).sample(attempts)?;
        log::debug!(
            "PLL lock count before shifting = {}/{}",
            initial.locked,
            initial.attempted
        );

        let mut iterations = 0;
        for i in 0..max_iterations {
            iterations = i + 1;
            if self.shift(i, attempts)?.is_break() {
                break;
            }
        }

        let outcome = match self.locks.last() {
            Some(lock) => {
                self.bus.write(Register::TtcMmcmReset, 0x1)?;
                log::info!(
                    "Lock was found: phase count {}, phase {}ns",
                    lock.phase_counts,
                    lock.phase_ns
                );
                ScanOutcome::Locked(lock.clone())
            }
            None => {
                log::error!("Unable to find lock after {} shifts", iterations);
                ScanOutcome::LockNotFound
            }
        };

        Ok(ScanReport {
            outcome,
            iterations,
            state: self.state,
            locks: self.locks,
            events: self.events,
        })
    }

    /// One iteration: shift, sample the lock and apply the policy.
    fn shift(&mut self, i: u32, attempts: u32) -> Result<ControlFlow<()>, Error> {
        self.bus.write(Register::TtcCntReset, 0x1)?;
        self.bus.write(Register::TtcPaGthManualShiftEn, 0x1)?;

        let direction = self.state.direction;
        let expected_gth = next_gth_shift(self.state.gth_shift, direction);
        match (direction, expected_gth) {
            (Direction::Forward, 0) => log::debug!("Normal GTH shift rollover 39->0"),
            (Direction::Reverse, 39) => log::debug!("Reversed GTH shift rollover 0->39"),
            _ => {}
        }
        self.state.gth_shift = expected_gth;
        self.converge_gth_shift(expected_gth)?;

        if mmcm_shift_due(expected_gth) {
            self.state.mmcm_shift = next_mmcm_shift(self.state.mmcm_shift, direction);
            let reported = self.bus.read(Register::TtcPaManualShiftCnt)?;
            if reported != self.state.mmcm_shift as u32 {
                log::warn!(
                    "Reported MMCM shift count doesn't match the expected MMCM shift count. Expected shift cnt = {}, card returned {}",
                    self.state.mmcm_shift,
                    reported
                );
            }
        }

        let (pll, locked) = self.sample_lock(attempts)?;

        let phase = self.bus.read(Register::TtcPmPhaseMean)?;
        let gth_phase = self.bus.read(Register::TtcGthPmPhaseMean)?;
        self.state.phase_counts = phase;
        self.state.phase_ns = phase_to_ns(phase);
        log::debug!(
            "GTH shift #{}: mmcm shift cnt = {}, mmcm phase counts = {}, mmcm phase = {}ns, gth phase counts = {}, gth phase = {}ns, PLL lock count = {}, locked = {}",
            i,
            self.state.mmcm_shift,
            phase,
            self.state.phase_ns,
            gth_phase,
            phase_to_ns(gth_phase),
            pll.locked,
            locked
        );

        if self.apply_policy(i, locked)?.is_break() {
            return Ok(ControlFlow::Break(()));
        }

        if self.state.next_lock_found {
            self.state.shifts_since_lock += 1;
        }
        self.state.total_shift += self.state.direction.signum();
        Ok(ControlFlow::Continue(()))
    }

    /// Repeats GTH shifts until the hardware counter reports `expected`.
    fn converge_gth_shift(&mut self, expected: u8) -> Result<(), Error> {
        let mut reported = self.bus.read(Register::TtcPaManualGthShiftCnt)?;
        let mut attempts = 0;
        while reported != expected as u32 {
            if attempts == self.config.max_gth_shift_retries {
                let error = Error::GthShiftNotConverged {
                    expected,
                    got: reported,
                    attempts,
                };
                log::error!("{}", error);
                return Err(error);
            }
            log::warn!(
                "Repeating a GTH PI shift because the shift count doesn't match the expected value. Expected shift cnt = {}, card returned {}",
                expected,
                reported
            );
            self.bus.write(Register::TtcPaGthManualShiftEn, 0x1)?;
            reported = self.bus.read(Register::TtcPaManualGthShiftCnt)?;
            attempts += 1;
        }
        Ok(())
    }

    /// Relocks the PLL `attempts` times. The lock decision comes from the BC0
    /// lock bit if selected, otherwise from the relocks.
    fn sample_lock(&mut self, attempts: u32) -> Result<(PllLockSample, bool), Error> {
        let sample = PllLockProbe::new(&mut *self.bus, self.config.pll_settle).sample(attempts)?;
        let locked = if self.scan.use_bc0_locked {
            self.bus.read(Register::TtcBc0Locked)? != 0
        } else {
            sample.all_locked()
        };
        Ok((sample, locked))
    }

    fn apply_policy(&mut self, i: u32, locked: bool) -> Result<ControlFlow<()>, Error> {
        self.update_streaks(locked);

        if self.scan.shift_out_of_lock_first && !self.state.first_unlock_found {
            if self.state.bad_streak > self.policy.unlock_threshold {
                self.state.first_unlock_found = true;
                self.events.push(ScanEvent::FirstUnlock {
                    iteration: i,
                    bad_streak: self.state.bad_streak,
                });
                log::info!(
                    "{} unlocks found after {} shifts: mmcm phase count = {}, mmcm phase ns = {}ns",
                    self.policy.unlock_threshold,
                    i + 1,
                    self.state.phase_counts,
                    self.state.phase_ns
                );
            }
            return Ok(ControlFlow::Continue(()));
        }

        if locked {
            if !self.state.next_lock_found {
                self.state.next_lock_found = true;
                self.events.push(ScanEvent::NextLock { iteration: i });
                log::info!(
                    "Found next lock after {} shifts: bad locks {}, mmcm phase count = {}, mmcm phase ns = {}ns",
                    i + 1,
                    self.state.bad_streak,
                    self.state.phase_counts,
                    self.state.phase_ns
                );
            }
            self.state.good_since_lock += 1;
        } else if self.state.next_lock_found {
            log::debug!(
                "Unexpected unlock after {} shifts: mmcm phase count = {}, mmcm phase ns = {}ns",
                i + 1,
                self.state.phase_counts,
                self.state.phase_ns
            );
        }

        match self.state.direction {
            Direction::Reverse if self.state.bad_streak > 0 => {
                log::debug!(
                    "Bad lock found: phase count = {}, phase ns = {}ns, returning to normal search",
                    self.state.phase_counts,
                    self.state.phase_ns
                );
                self.set_direction(Direction::Forward)?;
                self.state.good_streak = 0;
                self.events.push(ScanEvent::ReversalAborted { iteration: i });
            }
            Direction::Forward if self.state.good_streak == self.policy.reverse_at => {
                log::info!(
                    "{} consecutive good locks found: phase count = {}, phase ns = {}ns, reversing scan direction",
                    self.policy.reverse_at,
                    self.state.phase_counts,
                    self.state.phase_ns
                );
                self.set_direction(Direction::Reverse)?;
                self.events.push(ScanEvent::Reversed {
                    iteration: i,
                    good_streak: self.state.good_streak,
                });
            }
            _ => {}
        }

        if self.state.direction == Direction::Reverse
            && self.state.good_streak == self.policy.best_lock_at
        {
            log::info!(
                "Best lock found after reversing: phase count = {}, phase ns = {}ns",
                self.state.phase_counts,
                self.state.phase_ns
            );
            self.events.push(ScanEvent::BestLock {
                iteration: i,
                good_streak: self.state.good_streak,
            });
            return self.accept_lock(i);
        }

        let homed = self.state.next_lock_found
            && match self.policy.homing {
                Homing::GoodSamples(n) => locked && self.state.good_since_lock == n,
                Homing::Shifts(n) => self.state.shifts_since_lock == n,
            };
        if homed {
            log::info!(
                "Finished homing after first good lock: good locks {}, shifts {}",
                self.state.good_since_lock,
                self.state.shifts_since_lock
            );
            self.events.push(ScanEvent::HomingComplete { iteration: i });
            return self.accept_lock(i);
        }

        Ok(ControlFlow::Continue(()))
    }

    fn update_streaks(&mut self, locked: bool) {
        if locked {
            self.state.bad_streak = 0;
            self.state.good_streak += 1;
        } else {
            self.state.bad_streak += 1;
            self.state.good_streak = 0;
        }
    }

    /// Records the current phase. Ends the scan, or in survey mode starts
    /// over looking for the next lock region.
    fn accept_lock(&mut self, i: u32) -> Result<ControlFlow<()>, Error> {
        self.state.best_lock_found = true;
        self.locks.push(LockPoint {
            iteration: i,
            gth_shift: self.state.gth_shift,
            mmcm_shift: self.state.mmcm_shift,
            phase_counts: self.state.phase_counts,
            phase_ns: self.state.phase_ns,
        });
        if !self.scan.do_scan {
            return Ok(ControlFlow::Break(()));
        }

        if self.state.direction != Direction::Forward {
            self.set_direction(Direction::Forward)?;
        }
        self.state.good_streak = 0;
        self.state.bad_streak = 0;
        self.state.shifts_since_lock = 0;
        self.state.good_since_lock = 0;
        self.state.first_unlock_found = false;
        self.state.next_lock_found = false;
        self.state.best_lock_found = false;
        Ok(ControlFlow::Continue(()))
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), Error> {
        self.bus
            .write(Register::TtcPaManualShiftDir, direction.mmcm_register_value())?;
        self.bus
            .write(Register::TtcPaGthManualShiftDir, direction.gth_register_value())?;
        self.state.direction = direction;
        Ok(())
    }
}

#[test]
fn mmcm_shift_table_positions() {
    let positions: Vec<usize> = MMCM_SHIFT_TABLE
        .iter()
        .enumerate()
        .filter(|(_, due)| **due)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(positions, vec![3, 9, 15, 20, 26, 32, 38]);
}

#[test]
fn mmcm_shift_lookup_wraps_after_last_position() {
    assert!(mmcm_shift_due(2));
    assert!(mmcm_shift_due(37));
    assert!(!mmcm_shift_due(38));
    // The position after 39 is 0.
    assert!(!mmcm_shift_due(39));
    assert_eq!((0..GTH_SHIFT_STEPS).filter(|g| mmcm_shift_due(*g)).count(), 7);
}

#[test]
fn gth_shift_wraps_at_boundary() {
    assert_eq!(next_gth_shift(39, Direction::Forward), 0);
    assert_eq!(next_gth_shift(0, Direction::Reverse), 39);
    assert_eq!(next_gth_shift(17, Direction::Forward), 18);
    assert_eq!(next_gth_shift(17, Direction::Reverse), 16);
    for g in 0..GTH_SHIFT_STEPS {
        for dir in [Direction::Forward, Direction::Reverse] {
            assert!(next_gth_shift(g, dir) < GTH_SHIFT_STEPS);
        }
    }
}

#[test]
fn mmcm_shift_wraps_at_boundary() {
    assert_eq!(next_mmcm_shift(0xffff, Direction::Forward), 0);
    assert_eq!(next_mmcm_shift(0, Direction::Reverse), 0xffff);
    assert_eq!(next_mmcm_shift(100, Direction::Reverse), 99);
}

#[test]
fn parameters_follow_scan_options() {
    let bc0 = PhaseScanConfig {
        use_bc0_locked: true,
        ..Default::default()
    };
    assert_eq!(bc0.lock_sample_attempts(), 1);
    assert_eq!(bc0.max_shift_iterations(), 11520);
    assert_eq!(bc0.lock_policy(), LockPolicy::BC0_LOCKED);

    let pll = PhaseScanConfig::default();
    assert_eq!(pll.lock_sample_attempts(), 10);
    assert_eq!(pll.lock_policy(), LockPolicy::PLL_LOCKED);

    let survey = PhaseScanConfig {
        use_bc0_locked: true,
        do_scan: true,
        ..Default::default()
    };
    assert_eq!(survey.lock_sample_attempts(), 10);
    assert_eq!(survey.max_shift_iterations(), 23040);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::MemoryBus;
    use std::time::Duration;

    fn quiet_config() -> Config {
        crate::config::Builder::new()
            .config_settle(Duration::ZERO)
            .pll_settle(Duration::ZERO)
            .build()
    }

    #[test]
    fn configuration_writes_in_order() {
        let mut bus = MemoryBus::new();
        configure_manual_shift(&mut bus, &quiet_config()).unwrap();
        let written: Vec<(Register, u32)> = bus.writes().to_vec();
        assert_eq!(written, MANUAL_SHIFT_SETUP.to_vec());
    }

    #[test]
    fn configuration_stops_at_first_mismatch() {
        let mut bus = MemoryBus::new();
        // The readback of the fourth register returns 0 although 1 was written.
        bus.script(Register::TtcPaManualShiftDir, [0]);
        match configure_manual_shift(&mut bus, &quiet_config()) {
            Err(Error::ReadbackMismatch {
                register,
                expected,
                got,
            }) => {
                assert_eq!(register, Register::TtcPaManualShiftDir);
                assert_eq!(expected, 1);
                assert_eq!(got, 0);
            }
            other => panic!("expected ReadbackMismatch, got {:?}", other),
        }
        assert_eq!(bus.writes().len(), 4);
    }

    #[test]
    fn configuration_checks_phase_alignment_disabled() {
        let mut bus = MemoryBus::new();
        // Readback after the write passes, the final check does not.
        bus.script(Register::TtcDisablePhaseAlignment, [1, 0]);
        assert!(matches!(
            configure_manual_shift(&mut bus, &quiet_config()),
            Err(Error::PhaseAlignmentStillEnabled)
        ));
    }
}
