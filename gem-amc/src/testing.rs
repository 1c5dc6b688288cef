use std::collections::{HashMap, HashSet, VecDeque};
use std::io;

use gem_amc_protocol::Register;

use crate::RegisterBus;

/// Plain register memory with a write log, scripted reads and injectable faults.
#[derive(Default)]
pub struct MemoryBus {
    registers: HashMap<Register, u32>,
    scripted: HashMap<Register, VecDeque<u32>>,
    failing_reads: HashSet<Register>,
    writes: Vec<(Register, u32)>,
}

impl MemoryBus {
    pub fn new() -> MemoryBus {
        MemoryBus::default()
    }

    pub fn set(&mut self, register: Register, value: u32) {
        self.registers.insert(register, value);
    }

    pub fn get(&self, register: Register) -> u32 {
        self.registers.get(&register).copied().unwrap_or(0)
    }

    /// Successive reads of `register` return `values` before falling back to memory.
    pub fn script(&mut self, register: Register, values: impl IntoIterator<Item = u32>) {
        self.scripted
            .entry(register)
            .or_default()
            .extend(values);
    }

    pub fn fail_reads_of(&mut self, register: Register) {
        self.failing_reads.insert(register);
    }

    pub fn writes(&self) -> &[(Register, u32)] {
        &self.writes
    }
}

impl RegisterBus for MemoryBus {
    fn read(&mut self, register: Register) -> io::Result<u32> {
        if self.failing_reads.contains(&register) {
            return Err(io::Error::other(format!("read of {} failed", register)));
        }
        if let Some(value) = self.scripted.get_mut(&register).and_then(|s| s.pop_front()) {
            return Ok(value);
        }
        Ok(self.get(register))
    }

    fn write(&mut self, register: Register, value: u32) -> io::Result<()> {
        self.writes.push((register, value));
        self.registers.insert(register, value);
        Ok(())
    }
}
