//! Command counters and phase units of the TTC block.
use std::fmt::Display;

use crate::error::CodeError;
use crate::register::Register;

/// Nanoseconds per count of the phase monitor registers.
pub const PHASE_NS_PER_COUNT: f64 = 0.01860119;

/// Converts a phase monitor reading to nanoseconds.
pub fn phase_to_ns(counts: u32) -> f64 {
    counts as f64 * PHASE_NS_PER_COUNT
}

/// The TTC commands counted by the firmware.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TtcCounter {
    L1a,
    Bc0,
    Ec0,
    Resync,
    Oc0,
    HardReset,
    Calpulse,
    Start,
    Stop,
    TestSync,
}

impl TtcCounter {
    pub const ALL: [TtcCounter; 10] = [
        TtcCounter::L1a,
        TtcCounter::Bc0,
        TtcCounter::Ec0,
        TtcCounter::Resync,
        TtcCounter::Oc0,
        TtcCounter::HardReset,
        TtcCounter::Calpulse,
        TtcCounter::Start,
        TtcCounter::Stop,
        TtcCounter::TestSync,
    ];

    /// The selector used by remote callers, `1..=10`.
    pub const fn code(&self) -> u8 {
        match self {
            TtcCounter::L1a => 0x1,
            TtcCounter::Bc0 => 0x2,
            TtcCounter::Ec0 => 0x3,
            TtcCounter::Resync => 0x4,
            TtcCounter::Oc0 => 0x5,
            TtcCounter::HardReset => 0x6,
            TtcCounter::Calpulse => 0x7,
            TtcCounter::Start => 0x8,
            TtcCounter::Stop => 0x9,
            TtcCounter::TestSync => 0xa,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            TtcCounter::L1a => "L1A",
            TtcCounter::Bc0 => "BC0",
            TtcCounter::Ec0 => "EC0",
            TtcCounter::Resync => "RESYNC",
            TtcCounter::Oc0 => "OC0",
            TtcCounter::HardReset => "HARD_RESET",
            TtcCounter::Calpulse => "CALPULSE",
            TtcCounter::Start => "START",
            TtcCounter::Stop => "STOP",
            TtcCounter::TestSync => "TEST_SYNC",
        }
    }

    pub const fn register(&self) -> Register {
        match self {
            TtcCounter::L1a => Register::TtcCounterL1a,
            TtcCounter::Bc0 => Register::TtcCounterBc0,
            TtcCounter::Ec0 => Register::TtcCounterEc0,
            TtcCounter::Resync => Register::TtcCounterResync,
            TtcCounter::Oc0 => Register::TtcCounterOc0,
            TtcCounter::HardReset => Register::TtcCounterHardReset,
            TtcCounter::Calpulse => Register::TtcCounterCalpulse,
            TtcCounter::Start => Register::TtcCounterStart,
            TtcCounter::Stop => Register::TtcCounterStop,
            TtcCounter::TestSync => Register::TtcCounterTestSync,
        }
    }
}

impl TryFrom<u8> for TtcCounter {
    type Error = CodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        TtcCounter::ALL
            .into_iter()
            .find(|counter| counter.code() == value)
            .ok_or(CodeError::new("TTC counter", value))
    }
}

impl Display for TtcCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[test]
fn counter_codes() {
    assert_eq!(TtcCounter::try_from(1), Ok(TtcCounter::L1a));
    assert_eq!(TtcCounter::try_from(10), Ok(TtcCounter::TestSync));
    assert!(TtcCounter::try_from(0).is_err());
    assert!(TtcCounter::try_from(11).is_err());
    for counter in TtcCounter::ALL {
        assert!(counter.register().path().ends_with(counter.name()));
    }
}

#[test]
fn phase_conversion() {
    assert_eq!(phase_to_ns(0), 0.0);
    assert!((phase_to_ns(1000) - 18.60119).abs() < 1e-9);
}
