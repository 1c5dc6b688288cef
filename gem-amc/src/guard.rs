//! Scoped save and restore of a register.
//!
//! The SCA ADC monitoring runs in the background and shares the manual
//! control registers with every SCA transaction. It must be switched off for
//! the duration of a transaction and switched back to exactly its previous
//! state afterwards; a lost restore leaves the monitoring disabled for good.
use std::{
    io,
    ops::{Deref, DerefMut},
};

use gem_amc_protocol::Register;

use crate::RegisterBus;

/// Value of the monitoring mask that switches off all ADC monitoring.
pub const MONITORING_DISABLED: u32 = 0xffff_ffff;

/// Holds a register at a temporary value and restores the saved value when
/// released or dropped.
///
/// [`release`](RegisterGuard::release) reports a failing restore to the caller.
/// When the guard is dropped without being released, e.g. because the guarded
/// operation returned early with an error, the restore still happens and a
/// failure is logged.
pub struct RegisterGuard<'a, B: RegisterBus + ?Sized> {
    bus: &'a mut B,
    register: Register,
    saved: u32,
    released: bool,
}

impl<'a, B: RegisterBus + ?Sized> RegisterGuard<'a, B> {
    /// Saves the current value of `register` and writes `value` to it.
    pub fn acquire(bus: &'a mut B, register: Register, value: u32) -> io::Result<Self> {
        let saved = bus.read(register)?;
        log::trace!("Saved {}=0x{:08x}, writing 0x{:08x}", register, saved, value);
        bus.write(register, value)?;
        Ok(RegisterGuard {
            bus,
            register,
            saved,
            released: false,
        })
    }

    /// Disables the SCA ADC monitoring until the guard is released.
    pub fn monitoring_off(bus: &'a mut B) -> io::Result<Self> {
        Self::acquire(bus, Register::ScaMonitoringOff, MONITORING_DISABLED)
    }

    /// The value the register held before the guard was acquired.
    pub fn saved(&self) -> u32 {
        self.saved
    }

    /// Restores the saved value.
    pub fn release(mut self) -> io::Result<()> {
        self.released = true;
        self.bus.write(self.register, self.saved)
    }
}

impl<B: RegisterBus + ?Sized> Deref for RegisterGuard<'_, B> {
    type Target = B;

    fn deref(&self) -> &B {
        self.bus
    }
}

impl<B: RegisterBus + ?Sized> DerefMut for RegisterGuard<'_, B> {
    fn deref_mut(&mut self) -> &mut B {
        self.bus
    }
}

impl<B: RegisterBus + ?Sized> Drop for RegisterGuard<'_, B> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.bus.write(self.register, self.saved) {
            log::error!(
                "Failed to restore {} to 0x{:08x}: {}",
                self.register,
                self.saved,
                e
            );
        }
    }
}

/// Runs `f` with `register` held at `value`, restoring it on every exit path.
pub fn with_register<B, T>(
    bus: &mut B,
    register: Register,
    value: u32,
    f: impl FnOnce(&mut B) -> io::Result<T>,
) -> io::Result<T>
where
    B: RegisterBus + ?Sized,
{
    let mut guard = RegisterGuard::acquire(bus, register, value)?;
    let result = f(&mut *guard)?;
    guard.release()?;
    Ok(result)
}

/// Runs `f` with the SCA ADC monitoring switched off.
pub fn with_monitoring_off<B, T>(
    bus: &mut B,
    f: impl FnOnce(&mut B) -> io::Result<T>,
) -> io::Result<T>
where
    B: RegisterBus + ?Sized,
{
    with_register(bus, Register::ScaMonitoringOff, MONITORING_DISABLED, f)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::MemoryBus;

    #[test]
    fn restores_after_success() {
        let mut bus = MemoryBus::new();
        bus.set(Register::ScaMonitoringOff, 0x0000_00f0);
        let value = with_monitoring_off(&mut bus, |bus| {
            assert_eq!(bus.read(Register::ScaMonitoringOff)?, MONITORING_DISABLED);
            Ok(42)
        })
        .unwrap();
        assert_eq!(value, 42);
        assert_eq!(bus.get(Register::ScaMonitoringOff), 0x0000_00f0);
    }

    #[test]
    fn restores_after_error() {
        let mut bus = MemoryBus::new();
        bus.set(Register::ScaMonitoringOff, 0x3);
        let result: io::Result<()> =
            with_monitoring_off(&mut bus, |_| Err(io::Error::other("inner failure")));
        assert!(result.is_err());
        assert_eq!(bus.get(Register::ScaMonitoringOff), 0x3);
    }

    #[test]
    fn restores_exactly_once() {
        let mut bus = MemoryBus::new();
        bus.set(Register::ScaResetEnableMask, 0x7);
        let guard = RegisterGuard::acquire(&mut bus, Register::ScaResetEnableMask, 0x1).unwrap();
        assert_eq!(guard.saved(), 0x7);
        guard.release().unwrap();
        let restores = bus
            .writes()
            .iter()
            .filter(|(reg, value)| *reg == Register::ScaResetEnableMask && *value == 0x7)
            .count();
        assert_eq!(restores, 1);
    }

    #[test]
    fn acquire_failure_leaves_register_untouched() {
        let mut bus = MemoryBus::new();
        bus.set(Register::ScaMonitoringOff, 0x5);
        bus.fail_reads_of(Register::ScaMonitoringOff);
        assert!(RegisterGuard::monitoring_off(&mut bus).is_err());
        assert!(bus.writes().is_empty());
    }
}
