//! # Address Table
//!
//! Maps register paths to a byte address and a bit mask. The table is a text
//! file with one register per line:
//!
//! ```text
//! # path                                              address     mask
//! GEM_AMC.TTC.CTRL.L1A_ENABLE                         0x00300000  0x00000001
//! GEM_AMC.TTC.STATUS.CLK.PA_MANUAL_SHIFT_CNT          0x00300040  0xffff0000
//! ```
//!
//! Numbers are hexadecimal with a `0x` prefix or decimal. Everything after a
//! `#` is ignored.
use std::{collections::HashMap, fs, io, path::Path};

/// Location of one register.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AddressEntry {
    pub address: usize,
    pub mask: u32,
}

impl AddressEntry {
    /// Number of bits the register value is shifted within its word.
    pub fn shift(&self) -> u32 {
        self.mask.trailing_zeros()
    }
}

#[derive(Debug, Default)]
pub struct AddressTable {
    entries: HashMap<String, AddressEntry>,
}

fn parse_number(text: &str) -> Option<u64> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16).ok(),
        None => text.replace('_', "").parse().ok(),
    }
}

fn invalid(line: usize, message: impl std::fmt::Display) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("address table line {}: {}", line, message),
    )
}

impl AddressTable {
    pub fn load(path: impl AsRef<Path>) -> io::Result<AddressTable> {
        let path = path.as_ref();
        log::debug!("Loading address table from {}", path.display());
        let table = Self::parse(&fs::read_to_string(path)?)?;
        log::info!(
            "Loaded {} registers from {}",
            table.entries.len(),
            path.display()
        );
        Ok(table)
    }

    pub fn parse(text: &str) -> io::Result<AddressTable> {
        let mut entries = HashMap::new();
        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;
            let content = line.split('#').next().unwrap_or_default().trim();
            if content.is_empty() {
                continue;
            }

            let fields: Vec<&str> = content.split_whitespace().collect();
            let &[path, address, mask] = fields.as_slice() else {
                return Err(invalid(
                    line_number,
                    format!("expected '<path> <address> <mask>', got '{}'", content),
                ));
            };
            let address = parse_number(address)
                .ok_or_else(|| invalid(line_number, format!("invalid address '{}'", address)))?;
            let mask = parse_number(mask)
                .and_then(|m| u32::try_from(m).ok())
                .filter(|m| *m != 0)
                .ok_or_else(|| invalid(line_number, format!("invalid mask '{}'", mask)))?;
            if address % 4 != 0 {
                return Err(invalid(
                    line_number,
                    format!("address 0x{:x} is not word aligned", address),
                ));
            }
            let address = usize::try_from(address)
                .map_err(|_| invalid(line_number, "address out of range"))?;

            if entries
                .insert(path.to_string(), AddressEntry { address, mask })
                .is_some()
            {
                return Err(invalid(line_number, format!("duplicate register {}", path)));
            }
        }
        Ok(AddressTable { entries })
    }

    pub fn get(&self, path: &str) -> Option<AddressEntry> {
        self.entries.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_entries_and_comments() {
        let table = AddressTable::parse(
            "# header\n\
             GEM_AMC.TTC.CTRL.L1A_ENABLE 0x0030_0000 0x1\n\
             \n\
             GEM_AMC.TTC.L1A_ID 3145796 0xffffffff # decimal address\n",
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get("GEM_AMC.TTC.CTRL.L1A_ENABLE"),
            Some(AddressEntry {
                address: 0x30_0000,
                mask: 0x1
            })
        );
        assert_eq!(
            table.get("GEM_AMC.TTC.L1A_ID").map(|e| e.address),
            Some(0x30_0044)
        );
        assert_eq!(table.get("GEM_AMC.TTC.L1A_RATE"), None);
    }

    #[test]
    fn shift_follows_mask() {
        let entry = AddressEntry {
            address: 0,
            mask: 0xffff_0000,
        };
        assert_eq!(entry.shift(), 16);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(AddressTable::parse("A 0x0").is_err());
        assert!(AddressTable::parse("A 0x0 0x0").is_err());
        assert!(AddressTable::parse("A 0x2 0x1").is_err());
        assert!(AddressTable::parse("A zz 0x1").is_err());
        assert!(AddressTable::parse("A 0x0 0x1ffffffff").is_err());
        assert!(AddressTable::parse("A 0x0 0x1\nA 0x4 0x1").is_err());
    }

    #[test]
    fn error_names_line() {
        let error = AddressTable::parse("A 0x0 0x1\nB 0x4").unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
        assert!(error.to_string().contains("line 2"));
    }
}
