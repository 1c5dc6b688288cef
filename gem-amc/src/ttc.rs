//! The TTC block: housekeeping registers and clock phase alignment.
use std::io;

use gem_amc_protocol::{Register, ttc::TtcCounter};

use crate::{
    RegisterBus,
    config::Config,
    error::Error,
    pll::{PllLockProbe, PllLockSample},
    scan::{PhaseScanConfig, PhaseScanner, ScanReport},
};

/// The TTC block of one card.
pub struct Ttc<'a, B: RegisterBus + ?Sized> {
    bus: &'a mut B,
    config: &'a Config,
}

impl<'a, B: RegisterBus + ?Sized> Ttc<'a, B> {
    pub fn new(bus: &'a mut B, config: &'a Config) -> Ttc<'a, B> {
        Ttc { bus, config }
    }

    /// Resets the MMCM, keeping the current phase.
    pub fn mmcm_reset(&mut self) -> io::Result<()> {
        log::info!("Resetting the TTC MMCM");
        self.bus.write(Register::TtcMmcmReset, 0x1)
    }

    /// Resets the TTC command and error counters.
    pub fn counter_reset(&mut self) -> io::Result<()> {
        self.bus.write(Register::TtcCntReset, 0x1)
    }

    pub fn l1a_enable(&mut self) -> io::Result<bool> {
        Ok(self.bus.read(Register::TtcL1aEnable)? != 0)
    }

    pub fn set_l1a_enable(&mut self, enable: bool) -> io::Result<()> {
        log::info!("{} L1A", if enable { "Enabling" } else { "Disabling" });
        self.bus.write(Register::TtcL1aEnable, u32::from(enable))
    }

    /// Whether the TTC decoder is locked to BC0.
    pub fn status(&mut self) -> io::Result<bool> {
        Ok(self.bus.read(Register::TtcBc0Locked)? != 0)
    }

    /// Number of single or double bit errors seen by the TTC decoder.
    pub fn error_count(&mut self, single: bool) -> io::Result<u32> {
        let register = if single {
            Register::TtcSingleErrorCnt
        } else {
            Register::TtcDoubleErrorCnt
        };
        self.bus.read(register)
    }

    pub fn counter(&mut self, counter: TtcCounter) -> io::Result<u32> {
        self.bus.read(counter.register())
    }

    /// All command counters in [`TtcCounter::ALL`] order.
    pub fn all_counters(&mut self) -> io::Result<Vec<(TtcCounter, u32)>> {
        TtcCounter::ALL
            .into_iter()
            .map(|counter| self.counter(counter).map(|value| (counter, value)))
            .collect()
    }

    pub fn l1a_id(&mut self) -> io::Result<u32> {
        self.bus.read(Register::TtcL1aId)
    }

    pub fn l1a_rate(&mut self) -> io::Result<u32> {
        self.bus.read(Register::TtcL1aRate)
    }

    /// Mean MMCM phase in raw counts.
    pub fn mmcm_phase_mean(&mut self) -> io::Result<u32> {
        self.bus.read(Register::TtcPmPhaseMean)
    }

    /// Mean GTH phase in raw counts.
    pub fn gth_phase_mean(&mut self) -> io::Result<u32> {
        self.bus.read(Register::TtcGthPmPhaseMean)
    }

    /// Resets the PLL `attempts` times and counts the relocks.
    pub fn check_pll_lock(&mut self, attempts: u32) -> io::Result<PllLockSample> {
        let sample = PllLockProbe::new(&mut *self.bus, self.config.pll_settle).sample(attempts)?;
        log::info!(
            "PLL locked {} times out of {} attempts",
            sample.locked,
            sample.attempted
        );
        Ok(sample)
    }

    /// Aligns the TTC clock phase, see [`PhaseScanner`].
    ///
    /// Not finding a lock is reported in the returned [`ScanReport`]; errors
    /// are reserved for configuration failures and bus faults.
    pub fn phase_shift(&mut self, scan: PhaseScanConfig) -> Result<ScanReport, Error> {
        PhaseScanner::new(&mut *self.bus, self.config, scan).run()
    }
}
