use std::{error::Error, fmt::Display};

/// A numeric code that does not name a known channel, command or counter.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CodeError {
    kind: &'static str,
    code: u8,
}

impl CodeError {
    pub(crate) const fn new(kind: &'static str, code: u8) -> CodeError {
        CodeError { kind, code }
    }

    /// The rejected code
    pub fn code(&self) -> u8 {
        self.code
    }
}

impl Display for CodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid {} 0x{:02x}", self.kind, self.code)
    }
}

impl Error for CodeError {}
