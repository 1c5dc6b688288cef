//! Simulated GEM AMC register file for integration tests.
//!
//! [`SimBus`] keeps every register in memory and models the parts of the
//! firmware that the control procedures depend on:
//!
//! - SCA execute strobes record the transaction and fill the reply register of
//!   every enabled link, in register byte order
//! - GTH shift strobes advance the GTH and MMCM shift counters in the
//!   direction selected by `PA_GTH_MANUAL_SHIFT_DIR`
//! - counter reset clears the TTC command counters
//! - lock signals (`BC0.LOCKED`, `PHASE_LOCKED`) follow a script keyed by the
//!   number of reads
//!
//! Faults can be injected: stuck registers, scripted reads, dropped or frozen
//! GTH strobes and failing reads.
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;

use gem_amc::RegisterBus;
use gem_amc::scan::{GTH_SHIFT_STEPS, MMCM_SHIFT_TABLE};
use gem_amc_protocol::{Link, LinkMask, Register, format_sca_data, ttc::TtcCounter};

/// Value of reply registers that no transaction has written.
pub const STALE_REPLY: u32 = 0xdead_beef;

/// One SCA command as seen by the firmware.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ScaTransaction {
    pub mask: u32,
    pub channel: u8,
    pub command: u8,
    pub length: u8,
    /// Payload in wire order
    pub data: u32,
    /// Payload as written to the data register
    pub raw_data: u32,
    /// `MONITORING_OFF` at the time of execution
    pub monitoring: u32,
}

type Responder = Box<dyn FnMut(&ScaTransaction, Link) -> u32>;
type Signal = Box<dyn FnMut(u64) -> u32>;

pub struct SimBus {
    registers: HashMap<Register, u32>,
    scripted: HashMap<Register, VecDeque<u32>>,
    signals: HashMap<Register, Signal>,
    read_counts: HashMap<Register, u64>,
    stuck: HashMap<Register, u32>,
    failing_reads: HashSet<Register>,
    responder: Responder,
    dropped_gth_strobes: u32,
    gth_frozen: bool,
    writes: Vec<(Register, u32)>,
    transactions: Vec<ScaTransaction>,
    shift_history: Vec<(u8, u16)>,
}

impl Default for SimBus {
    fn default() -> Self {
        let mut registers = HashMap::new();
        for link in Link::all() {
            registers.insert(Register::ScaReplyData(link), STALE_REPLY);
        }
        SimBus {
            registers,
            scripted: HashMap::new(),
            signals: HashMap::new(),
            read_counts: HashMap::new(),
            stuck: HashMap::new(),
            failing_reads: HashSet::new(),
            responder: Box::new(default_reply),
            dropped_gth_strobes: 0,
            gth_frozen: false,
            writes: Vec::new(),
            transactions: Vec::new(),
            shift_history: Vec::new(),
        }
    }
}

/// Encodes command and link so tests can tell replies apart.
pub fn default_reply(transaction: &ScaTransaction, link: Link) -> u32 {
    0x00a0_0000 | (transaction.command as u32) << 8 | (link.index() as u32 + 1)
}

impl SimBus {
    pub fn new() -> SimBus {
        SimBus::default()
    }

    pub fn set(&mut self, register: Register, value: u32) {
        self.registers.insert(register, value);
    }

    pub fn get(&self, register: Register) -> u32 {
        self.registers.get(&register).copied().unwrap_or(0)
    }

    /// Starts the shifters at the given positions.
    pub fn with_shift_position(mut self, gth: u8, mmcm: u16) -> SimBus {
        self.set(Register::TtcPaManualGthShiftCnt, gth as u32);
        self.set(Register::TtcPaManualShiftCnt, mmcm as u32);
        self
    }

    /// Replies of enabled links are produced by `responder`, in wire order.
    pub fn respond_with(&mut self, responder: impl FnMut(&ScaTransaction, Link) -> u32 + 'static) {
        self.responder = Box::new(responder);
    }

    /// Reads of `register` return `signal(n)` for the n-th read, starting at 0.
    pub fn signal(&mut self, register: Register, signal: impl FnMut(u64) -> u32 + 'static) {
        self.signals.insert(register, Box::new(signal));
    }

    /// Successive reads of `register` return `values` before anything else.
    pub fn script(&mut self, register: Register, values: impl IntoIterator<Item = u32>) {
        self.scripted.entry(register).or_default().extend(values);
    }

    /// Writes to `register` are ignored and reads return `value`.
    pub fn stick(&mut self, register: Register, value: u32) {
        self.stuck.insert(register, value);
    }

    pub fn fail_reads_of(&mut self, register: Register) {
        self.failing_reads.insert(register);
    }

    /// The next `count` GTH shift strobes have no effect.
    pub fn drop_gth_strobes(&mut self, count: u32) {
        self.dropped_gth_strobes = count;
    }

    /// No GTH shift strobe has any effect.
    pub fn freeze_gth(&mut self) {
        self.gth_frozen = true;
    }

    pub fn writes(&self) -> &[(Register, u32)] {
        &self.writes
    }

    pub fn writes_to(&self, register: Register) -> Vec<u32> {
        self.writes
            .iter()
            .filter(|(r, _)| *r == register)
            .map(|(_, v)| *v)
            .collect()
    }

    pub fn reads_of(&self, register: Register) -> u64 {
        self.read_counts.get(&register).copied().unwrap_or(0)
    }

    pub fn transactions(&self) -> &[ScaTransaction] {
        &self.transactions
    }

    /// Positions of both shifters after every effective GTH strobe.
    pub fn shift_history(&self) -> &[(u8, u16)] {
        &self.shift_history
    }

    pub fn gth_shift(&self) -> u8 {
        self.get(Register::TtcPaManualGthShiftCnt) as u8
    }

    pub fn mmcm_shift(&self) -> u16 {
        self.get(Register::TtcPaManualShiftCnt) as u16
    }

    fn execute_sca(&mut self) {
        let raw_data = self.get(Register::ScaCmdData);
        let transaction = ScaTransaction {
            mask: self.get(Register::ScaLinkEnableMask),
            channel: self.get(Register::ScaCmdChannel) as u8,
            command: self.get(Register::ScaCmdCommand) as u8,
            length: self.get(Register::ScaCmdLength) as u8,
            data: format_sca_data(raw_data),
            raw_data,
            monitoring: self.get(Register::ScaMonitoringOff),
        };
        log::trace!("Simulated SCA transaction {:x?}", transaction);
        for link in LinkMask::new(transaction.mask as u16).links() {
            let reply = (self.responder)(&transaction, link);
            self.registers
                .insert(Register::ScaReplyData(link), format_sca_data(reply));
        }
        self.transactions.push(transaction);
    }

    fn shift_gth(&mut self) {
        if self.gth_frozen {
            return;
        }
        if self.dropped_gth_strobes > 0 {
            self.dropped_gth_strobes -= 1;
            return;
        }
        let reverse = self.get(Register::TtcPaGthManualShiftDir) == 1;
        let gth = self.gth_shift() % GTH_SHIFT_STEPS;
        let gth = if reverse {
            (gth + GTH_SHIFT_STEPS - 1) % GTH_SHIFT_STEPS
        } else {
            (gth + 1) % GTH_SHIFT_STEPS
        };
        let mut mmcm = self.mmcm_shift();
        if MMCM_SHIFT_TABLE[(gth as usize + 1) % GTH_SHIFT_STEPS as usize] {
            mmcm = if reverse {
                mmcm.wrapping_sub(1)
            } else {
                mmcm.wrapping_add(1)
            };
        }
        self.set(Register::TtcPaManualGthShiftCnt, gth as u32);
        self.set(Register::TtcPaManualShiftCnt, mmcm as u32);
        self.shift_history.push((gth, mmcm));
    }

    fn reset_counters(&mut self) {
        for counter in TtcCounter::ALL {
            self.set(counter.register(), 0);
        }
        self.set(Register::TtcSingleErrorCnt, 0);
        self.set(Register::TtcDoubleErrorCnt, 0);
    }
}

impl RegisterBus for SimBus {
    fn read(&mut self, register: Register) -> io::Result<u32> {
        let count = self.read_counts.entry(register).or_insert(0);
        let n = *count;
        *count += 1;

        if self.failing_reads.contains(&register) {
            return Err(io::Error::other(format!("read of {} failed", register)));
        }
        if let Some(value) = self.stuck.get(&register) {
            return Ok(*value);
        }
        if let Some(value) = self.scripted.get_mut(&register).and_then(|s| s.pop_front()) {
            return Ok(value);
        }
        if let Some(signal) = self.signals.get_mut(&register) {
            return Ok(signal(n));
        }
        Ok(self.get(register))
    }

    fn write(&mut self, register: Register, value: u32) -> io::Result<()> {
        self.writes.push((register, value));
        if self.stuck.contains_key(&register) {
            return Ok(());
        }
        self.registers.insert(register, value);
        match register {
            Register::ScaCmdExecute if value == 1 => self.execute_sca(),
            Register::TtcPaGthManualShiftEn if value == 1 => self.shift_gth(),
            Register::TtcCntReset if value == 1 => self.reset_counters(),
            _ => {}
        }
        Ok(())
    }
}

/// Config without settle times.
pub fn fast_config() -> gem_amc::config::Config {
    gem_amc::config::Builder::new()
        .config_settle(std::time::Duration::ZERO)
        .pll_settle(std::time::Duration::ZERO)
        .build()
}

#[test]
fn gth_strobe_follows_direction() {
    let mut bus = SimBus::new().with_shift_position(39, 10);
    bus.write(Register::TtcPaGthManualShiftEn, 1).unwrap();
    assert_eq!(bus.gth_shift(), 0);
    bus.write(Register::TtcPaGthManualShiftDir, 1).unwrap();
    bus.write(Register::TtcPaGthManualShiftEn, 1).unwrap();
    assert_eq!(bus.gth_shift(), 39);
    assert_eq!(bus.mmcm_shift(), 10);
}

#[test]
fn sca_execute_fills_enabled_replies() {
    let mut bus = SimBus::new();
    bus.write(Register::ScaLinkEnableMask, 0b10).unwrap();
    bus.write(Register::ScaCmdCommand, 0x42).unwrap();
    bus.write(Register::ScaCmdExecute, 1).unwrap();
    let one = Link::new(1).unwrap();
    let zero = Link::new(0).unwrap();
    assert_eq!(
        format_sca_data(bus.get(Register::ScaReplyData(one))),
        0x00a0_4202
    );
    assert_eq!(bus.get(Register::ScaReplyData(zero)), STALE_REPLY);
}
