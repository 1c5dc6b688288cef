//! # GEM AMC Control Library
//!
//! This crate drives the slow-control (SCA) and timing (TTC) blocks of a GEM
//! AMC card through its register interface.
//!
//! ## Overview
//!
//! Everything in this crate is expressed as reads and writes of named
//! registers. The transport that carries them is abstracted by the
//! [`RegisterBus`] trait, so the same procedures run against a memory-mapped
//! card, a remote register server or a simulation.
//!
//! ## Architecture
//!
//! - **[`RegisterBus`] Trait**: synchronous access to the registers listed in
//!   [`gem_amc_protocol::Register`]
//! - **[`Amc`]**: owns a bus and the [`config::Config`] and hands out the blocks below
//! - **[`sca::Sca`]**: SCA transactions on the CTRL, I2C, GPIO and ADC channels,
//!   including the multi-link reply collection
//! - **[`ttc::Ttc`]**: TTC housekeeping and the clock phase alignment scan
//!   ([`scan::PhaseScanner`])
//! - **[`guard::RegisterGuard`]**: scoped disabling of the SCA ADC monitoring
//!
//! ## Basic Usage
//!
//! ```ignore
//! use gem_amc::{Amc, scan::PhaseScanConfig};
//! use gem_amc_protocol::LinkMask;
//!
//! let mut amc = Amc::new(my_bus, Default::default());
//!
//! let chip_ids = amc.sca().read_chip_id(LinkMask::ALL, false)?;
//! let report = amc.ttc().phase_shift(PhaseScanConfig {
//!     shift_out_of_lock_first: true,
//!     use_bc0_locked: true,
//!     do_scan: false,
//! })?;
//! if let Some(msg) = report.error_message() {
//!     eprintln!("{}", msg);
//! }
//! ```
//!
//! ## Error Handling
//!
//! SCA operations only fail when the bus fails and return [`std::io::Result`].
//! The phase alignment scan returns [`error::Error`] for aborts (readback
//! mismatches, a safety check, a GTH shift counter that does not converge).
//! Not finding a lock is a regular outcome of the scan, reported in its
//! [`scan::ScanReport`].
//!
//! ## Logging
//!
//! This crate uses the `log` crate. Procedure milestones are logged at info
//! level, per-shift details of the scan at debug level and recoverable
//! hardware disagreements as warnings.
//!
//! ## Thread Model
//!
//! All operations are blocking and expect exclusive access to the bus; callers
//! that share a card between threads must serialize access themselves.
use std::io;

use gem_amc_protocol::Register;

pub mod amc;
pub use amc::Amc;
pub mod config;
pub mod error;
pub mod guard;
pub mod pll;
pub mod sca;
pub mod scan;
pub mod ttc;

#[cfg(test)]
mod testing;

/// Synchronous register access to one AMC card.
///
/// Implementors translate a [`Register`] into whatever their transport needs
/// (an address in a mapped window, a name sent to a remote server, ...).
/// Each call is a complete transaction; there are no guarantees across calls.
pub trait RegisterBus {
    /// Read the current value of a register.
    fn read(&mut self, register: Register) -> io::Result<u32>;

    /// Write a value to a register.
    fn write(&mut self, register: Register, value: u32) -> io::Result<()>;
}

impl<B: RegisterBus + ?Sized> RegisterBus for &mut B {
    fn read(&mut self, register: Register) -> io::Result<u32> {
        (**self).read(register)
    }

    fn write(&mut self, register: Register, value: u32) -> io::Result<()> {
        (**self).write(register, value)
    }
}

impl<B: RegisterBus + ?Sized> RegisterBus for Box<B> {
    fn read(&mut self, register: Register) -> io::Result<u32> {
        (**self).read(register)
    }

    fn write(&mut self, register: Register, value: u32) -> io::Result<()> {
        (**self).write(register, value)
    }
}
