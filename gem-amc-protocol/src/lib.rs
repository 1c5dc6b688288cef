//! # GEM AMC Protocol Library
//!
//! Definitions shared by everything that talks to the slow-control (SCA) and
//! timing (TTC) blocks of a GEM AMC card through its register interface.
//!
//! ## Overview
//!
//! - [`Register`]: every register the control software touches, with the exact
//!   dotted path under which it appears in the firmware address table
//! - [`Link`], [`LinkMask`] and [`ScaReply`]: addressing of the 12 optohybrid
//!   links and the per-link reply of an SCA transaction
//! - [`sca`]: channel and command codes of the GBT-SCA ASIC
//! - [`ttc`]: TTC command counters and phase monitor units
//! - [`format_sca_data`]: the byte order conversion between SCA wire data and
//!   the register format
//!
//! ## Data Format
//!
//! ```
//! use gem_amc_protocol::format_sca_data;
//!
//! // SCA data travels as two 16-bit halves, LSB first; the firmware keeps
//! // the word byte-reversed.
//! assert_eq!(format_sca_data(0x1234_5678), 0x7856_3412);
//! assert_eq!(format_sca_data(format_sca_data(0xdead_beef)), 0xdead_beef);
//! ```
//!
//! ## Link Masks
//!
//! ```
//! use gem_amc_protocol::{LinkMask, Register};
//!
//! let mask = LinkMask::new(0b101);
//! let replies: Vec<&str> = mask.links().map(|l| Register::ScaReplyData(l).path()).collect();
//! assert_eq!(replies[1], "GEM_AMC.SLOW_CONTROL.SCA.MANUAL_CONTROL.SCA_REPLY_OH2.SCA_RPY_DATA");
//! ```
//!
//! ## Error Handling
//!
//! Conversions from raw codes return [`error::CodeError`] for values that do not
//! name a known channel, command or counter.

pub mod codec;
pub use codec::format_sca_data;
pub mod error;
pub mod link;
pub use link::*;
pub mod register;
pub use register::Register;
pub mod sca;
pub mod ttc;
