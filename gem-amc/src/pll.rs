use std::{io, time::Duration};

use gem_amc_protocol::Register;

use crate::{RegisterBus, config::settle};

/// Result of a series of PLL relock attempts.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PllLockSample {
    /// Attempts after which the PLL reported lock
    pub locked: u32,
    pub attempted: u32,
}

impl PllLockSample {
    /// The PLL locked after every attempt.
    pub fn all_locked(&self) -> bool {
        self.locked == self.attempted
    }
}

/// Probes the TTC PLL by resetting it and checking whether it locks again.
pub struct PllLockProbe<'a, B: RegisterBus + ?Sized> {
    bus: &'a mut B,
    settle_time: Duration,
}

impl<'a, B: RegisterBus + ?Sized> PllLockProbe<'a, B> {
    pub fn new(bus: &'a mut B, settle_time: Duration) -> PllLockProbe<'a, B> {
        PllLockProbe { bus, settle_time }
    }

    /// Resets the PLL `attempts` times and counts how often it locked.
    pub fn sample(&mut self, attempts: u32) -> io::Result<PllLockSample> {
        log::debug!("Checking PLL lock with {} attempted relocks", attempts);
        let mut locked = 0;
        for _ in 0..attempts {
            self.bus.write(Register::TtcPaManualPllReset, 0x1)?;
            settle(self.settle_time);
            if self.bus.read(Register::TtcPhaseLocked)? != 0 {
                locked += 1;
            }
        }
        Ok(PllLockSample {
            locked,
            attempted: attempts,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::MemoryBus;

    #[test]
    fn counts_locked_attempts() {
        let mut bus = MemoryBus::new();
        bus.script(Register::TtcPhaseLocked, [1, 0, 1, 1, 0]);
        let sample = PllLockProbe::new(&mut bus, Duration::ZERO).sample(5).unwrap();
        assert_eq!(
            sample,
            PllLockSample {
                locked: 3,
                attempted: 5
            }
        );
        assert!(!sample.all_locked());
        let resets = bus
            .writes()
            .iter()
            .filter(|(reg, _)| *reg == Register::TtcPaManualPllReset)
            .count();
        assert_eq!(resets, 5);
    }

    #[test]
    fn any_non_zero_status_is_locked() {
        let mut bus = MemoryBus::new();
        bus.set(Register::TtcPhaseLocked, 0x2);
        let sample = PllLockProbe::new(&mut bus, Duration::ZERO).sample(10).unwrap();
        assert!(sample.all_locked());
        assert_eq!(sample.locked, 10);
    }

    #[test]
    fn zero_attempts() {
        let mut bus = MemoryBus::new();
        let sample = PllLockProbe::new(&mut bus, Duration::ZERO).sample(0).unwrap();
        assert_eq!(sample.locked, 0);
        assert!(bus.writes().is_empty());
    }

    #[test]
    fn never_exceeds_attempts() {
        for attempts in [1, 3, 10, 25] {
            let mut bus = MemoryBus::new();
            bus.script(Register::TtcPhaseLocked, (0..attempts).map(|i| i % 2));
            let sample = PllLockProbe::new(&mut bus, Duration::ZERO)
                .sample(attempts)
                .unwrap();
            assert!(sample.locked <= sample.attempted);
            assert_eq!(sample.attempted, attempts);
        }
    }
}
