use std::{error::Error as StdError, fmt::Display, io};

use gem_amc_protocol::Register;

/// Errors that abort a TTC or SCA procedure.
#[derive(Debug)]
pub enum Error {
    /// The register bus failed.
    Bus(io::Error),
    /// A configuration write did not read back as written.
    ReadbackMismatch {
        register: Register,
        expected: u32,
        got: u32,
    },
    /// Automatic phase alignment is still active after switching to manual shifting.
    PhaseAlignmentStillEnabled,
    /// The GTH shift counter did not reach the expected value after repeated shifts.
    GthShiftNotConverged { expected: u8, got: u32, attempts: u32 },
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error::Bus(value)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Bus(error) => write!(f, "{}", error),
            Error::ReadbackMismatch {
                register,
                expected,
                got,
            } => write!(
                f,
                "Readback of {} failed, value is {}, expected {}",
                register, got, expected
            ),
            Error::PhaseAlignmentStillEnabled => {
                write!(f, "Automatic phase alignment is not disabled")
            }
            Error::GthShiftNotConverged {
                expected,
                got,
                attempts,
            } => write!(
                f,
                "GTH shift count is {} after {} repeated shifts, expected {}",
                got, attempts, expected
            ),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Bus(error) => Some(error),
            _ => None,
        }
    }
}
