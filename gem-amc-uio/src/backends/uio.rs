//! # UIO Backend
//!
//! Register access through the memory-mapped firmware register window that
//! the Linux UIO subsystem exposes as `/dev/uioN`.
//!
//! Every [`Register`] is resolved against an [`AddressTable`] when the backend
//! is created, so a missing or misplaced register is reported before any
//! hardware access.
//!
//! ## Example Usage
//!
//! ```ignore
//! use gem_amc::{Amc, config::Config};
//!
//! let table = AddressTable::load("gem_amc_address_table.txt")?;
//! let bus = UioBackend::new("/dev/uio0", &table, 0, 0x0100_0000)?;
//! let mut amc = Amc::new(bus, Config::default());
//! let locked = amc.ttc().status()?;
//! ```
use std::{
    collections::HashMap,
    fs::OpenOptions,
    io,
    num::NonZero,
    path::Path,
    ptr::{NonNull, read_volatile, write_volatile},
};

use gem_amc::RegisterBus;
use gem_amc_protocol::Register;
use nix::sys::mman::{MapFlags, ProtFlags, mmap, munmap};

use super::address_table::{AddressEntry, AddressTable};

/// A register resolved to its word in the mapped window.
#[derive(Copy, Clone, Debug)]
struct Location {
    word: usize,
    mask: u32,
    shift: u32,
}

/// Register bus on a UIO device
pub struct UioBackend {
    registers: *mut u32,
    map_size: usize,
    locations: HashMap<Register, Location>,
}

fn resolve(
    table: &AddressTable,
    base_address: usize,
    map_size: usize,
) -> io::Result<HashMap<Register, Location>> {
    let mut locations = HashMap::new();
    for register in Register::all() {
        let entry = table.get(register.path()).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is missing from the address table", register),
            )
        })?;
        let AddressEntry { address, mask } = entry;
        let offset = address
            .checked_sub(base_address)
            .filter(|offset| offset + 4 <= map_size)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "{} at 0x{:08x} is outside the mapped window 0x{:08x}..0x{:08x}",
                        register,
                        address,
                        base_address,
                        base_address + map_size
                    ),
                )
            })?;
        log::trace!(
            "Register {} at offset 0x{:x}, mask 0x{:08x}",
            register,
            offset,
            mask
        );
        locations.insert(
            register,
            Location {
                word: offset / 4,
                mask,
                shift: entry.shift(),
            },
        );
    }
    Ok(locations)
}

impl UioBackend {
    /// Maps `map_size` bytes of the UIO device at `path`.
    ///
    /// `base_address` is the address of the first mapped byte in the
    /// address table.
    pub fn new(
        path: impl AsRef<Path>,
        table: &AddressTable,
        base_address: usize,
        map_size: usize,
    ) -> io::Result<UioBackend> {
        let locations = resolve(table, base_address, map_size)?;
        log::debug!("Resolved {} registers", locations.len());

        let device_path = path.as_ref();
        log::debug!("Opening UIO device: {}", device_path.display());
        let file = OpenOptions::new().read(true).write(true).open(device_path)?;

        let length = NonZero::new(map_size)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "map size is zero"))?;
        let registers = unsafe {
            log::debug!("Mapping UIO memory (size=0x{:x})", map_size);
            let ptr = mmap(
                None,
                length,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                file,
                0,
            )?;
            log::info!("UIO memory mapped successfully");
            ptr.as_ptr() as *mut u32
        };
        Ok(UioBackend {
            registers,
            map_size,
            locations,
        })
    }

    fn locate(&self, register: Register) -> io::Result<Location> {
        self.locations.get(&register).copied().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not mapped", register),
            )
        })
    }
}

impl Drop for UioBackend {
    fn drop(&mut self) {
        if let Some(ptr) = NonNull::new(self.registers) {
            unsafe {
                let _ = munmap(ptr.cast(), self.map_size);
            }
        }
    }
}

impl RegisterBus for UioBackend {
    fn read(&mut self, register: Register) -> io::Result<u32> {
        let location = self.locate(register)?;
        // Safety: `resolve` only admits words inside the mapped window.
        let word = unsafe { read_volatile(self.registers.add(location.word)) };
        let value = (word & location.mask) >> location.shift;
        log::trace!("read {} = 0x{:08x}", register, value);
        Ok(value)
    }

    fn write(&mut self, register: Register, value: u32) -> io::Result<()> {
        let location = self.locate(register)?;
        log::trace!("write {} = 0x{:08x}", register, value);
        let field = value.checked_shl(location.shift).unwrap_or(0) & location.mask;
        if field >> location.shift != value {
            log::warn!(
                "Value 0x{:08x} does not fit {} (mask 0x{:08x})",
                value,
                register,
                location.mask
            );
        }
        unsafe {
            let ptr = self.registers.add(location.word);
            let word = if location.mask == u32::MAX {
                field
            } else {
                (read_volatile(ptr) & !location.mask) | field
            };
            write_volatile(ptr, word);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fmt::Write;

    fn full_table(base: usize) -> String {
        let mut text = String::new();
        for (i, register) in Register::all().enumerate() {
            writeln!(text, "{} 0x{:x} 0xffffffff", register.path(), base + 4 * i).unwrap();
        }
        text
    }

    #[test]
    fn resolves_every_register() {
        let table = AddressTable::parse(&full_table(0x1000)).unwrap();
        let locations = resolve(&table, 0x1000, 0x1000).unwrap();
        assert_eq!(locations.len(), Register::all().count());
        assert_eq!(locations[&Register::ScaLinkEnableMask].word, 0);
    }

    #[test]
    fn missing_register_is_reported() {
        let text: String = full_table(0)
            .lines()
            .filter(|line| !line.starts_with("GEM_AMC.TTC.L1A_RATE "))
            .map(|line| format!("{}\n", line))
            .collect();
        let table = AddressTable::parse(&text).unwrap();
        let error = resolve(&table, 0, 0x1000).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::NotFound);
        assert!(error.to_string().contains("GEM_AMC.TTC.L1A_RATE"));
    }

    #[test]
    fn register_outside_window_is_reported() {
        let table = AddressTable::parse(&full_table(0x1000)).unwrap();
        assert!(resolve(&table, 0x2000, 0x1000).is_err());
        assert!(resolve(&table, 0x1000, 8).is_err());
    }
}
