//! # GEM AMC Control Tool
//!
//! Command line access to the SCA and TTC blocks of a GEM AMC card whose
//! firmware registers are exposed through the Linux UIO subsystem.
//!
//! ## Overview
//!
//! This crate drives [`gem_amc`] with a concrete register bus: the firmware
//! register window is memory mapped from `/dev/uioN` and register paths are
//! resolved through a text address table. Each subcommand runs one SCA or TTC
//! operation and prints its result.
pub mod backends;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};
use clap_num::maybe_hex;
use env_logger::Env;
use gem_amc::{
    Amc,
    config::Builder,
    scan::{PhaseScanConfig, ScanOutcome},
    sca::log_adc_reply,
};
use gem_amc_protocol::{
    LinkMask, ScaReply,
    sca::{AdcChannel, CtrlCommand, GpioCommand, I2cChannel, I2cCommand},
    ttc::{TtcCounter, phase_to_ns},
};

use crate::backends::{address_table::AddressTable, uio::UioBackend};

const UIO_NAME: &str = "gem_amc";

#[derive(Subcommand, Eq, PartialEq, Clone)]
enum Command {
    /// Reset the SCA modules of the links in the mask
    ScaModuleReset,
    /// Read the SCA chip IDs
    ScaChipId {
        /// The SCAs are version 1
        #[arg(long)]
        v1: bool,
    },
    /// Read the SCA SEU counters
    ScaSeu {
        /// Clear the counters before reading
        #[arg(long)]
        reset: bool,
    },
    /// Clear the SCA SEU counters
    ScaSeuReset,
    /// Enable or disable the SCA reset on TTC HardReset
    ScaHardResetEnable {
        #[arg(action = ArgAction::Set)]
        enable: bool,
    },
    /// Send a command on the SCA CTRL channel
    ScaCtrl {
        #[arg(value_parser = maybe_hex::<u8>)]
        command: u8,
        #[arg(long, default_value = "1")]
        len: u8,
        #[arg(long, value_parser = maybe_hex::<u32>, default_value = "0")]
        data: u32,
    },
    /// Send a command on the SCA GPIO channel
    ScaGpio {
        #[arg(value_parser = maybe_hex::<u8>)]
        command: u8,
        #[arg(long, default_value = "4")]
        len: u8,
        #[arg(long, value_parser = maybe_hex::<u32>, default_value = "0")]
        data: u32,
    },
    /// Send a command to an SCA I2C master
    ScaI2c {
        /// The SCA channel of the master, 0x03 to 0x12
        #[arg(value_parser = maybe_hex::<u8>)]
        channel: u8,
        #[arg(value_parser = maybe_hex::<u8>)]
        command: u8,
        #[arg(long, default_value = "1")]
        len: u8,
        #[arg(long, value_parser = maybe_hex::<u32>, default_value = "0")]
        data: u32,
    },
    /// Convert one input of the SCA ADC
    ScaAdc {
        #[arg(value_parser = maybe_hex::<u8>)]
        channel: u8,
    },
    /// Align the TTC clock phase
    TtcPhaseShift {
        #[arg(long)]
        shift_out_of_lock_first: bool,
        #[arg(long)]
        use_bc0_locked: bool,
        /// Survey all lock regions instead of stopping at the first
        #[arg(long)]
        do_scan: bool,
    },
    /// Count how often the TTC PLL relocks after a reset
    TtcPllLock {
        #[arg(long, default_value = "10")]
        read_attempts: u32,
    },
    /// Reset the TTC MMCM
    TtcMmcmReset,
    /// Reset the TTC counters
    TtcCounterReset,
    /// Show or set the L1A enable
    TtcL1aEnable {
        #[arg(action = ArgAction::Set)]
        enable: Option<bool>,
    },
    /// Show whether the TTC decoder is locked to BC0
    TtcStatus,
    /// Show the TTC decoder error count
    TtcErrorCount {
        /// Single instead of double bit errors
        #[arg(long)]
        single: bool,
    },
    /// Show a TTC command counter, or all of them
    TtcCounter {
        /// Counter code 1 (L1A) to 10 (TEST_SYNC)
        code: Option<u8>,
    },
    /// Show the L1A ID
    TtcL1aId,
    /// Show the L1A rate
    TtcL1aRate,
    /// Show the mean MMCM and GTH phase
    TtcPhaseMean,
}

#[derive(Parser)]
#[command(about = "Slow control and TTC operations on a GEM AMC", long_about=None)]
struct Args {
    /// The UIO device; detected by its name when omitted
    #[arg(short, long)]
    uio: Option<PathBuf>,

    /// Register address table
    #[arg(short, long)]
    address_table: PathBuf,

    /// Address of the first mapped byte
    #[arg(long, value_parser = maybe_hex::<usize>, default_value = "0")]
    base_address: usize,

    #[arg(long, value_parser = maybe_hex::<usize>, default_value = "0x01000000")]
    map_size: usize,

    /// Wait between a configuration write and its readback, in microseconds
    #[arg(long, default_value = "250")]
    settle_us: u64,

    /// Wait between a PLL reset and its lock check, in microseconds
    #[arg(long, default_value = "100")]
    pll_settle_us: u64,

    #[arg(long, default_value = "100")]
    max_gth_retries: u32,

    /// Optohybrid links to address
    #[arg(short, long, value_parser = maybe_hex::<u16>, default_value = "0xfff")]
    oh_mask: u16,

    #[clap(subcommand)]
    command: Command,
}

/// Attempts to find the UIO device of the register window by its name
fn uio_device_path(name: &str) -> Option<PathBuf> {
    let uio_class_path = Path::new("/sys/class/uio");
    for entry in uio_class_path.read_dir().ok()? {
        let mut path = entry.ok()?.path();
        log::debug!("Looking at UIO path {}", path.display());
        path.push("name");
        let uio_name = match std::fs::read_to_string(&path) {
            Ok(uio_name) => uio_name,
            Err(_) => continue,
        };
        log::debug!("UIO has name {}", uio_name.trim());
        if uio_name.trim() == name {
            // This will be something like 'uio2'
            let uio_indexed_name = path.parent()?.file_name()?;
            return Some(Path::new("/dev").join(uio_indexed_name));
        }
    }
    None
}

fn print_reply(reply: &ScaReply, mask: LinkMask) {
    for (link, value) in reply.iter_masked(mask) {
        println!("{}: 0x{:08x}", link, value);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let uio_path = match args.uio.clone().or_else(|| uio_device_path(UIO_NAME)) {
        Some(path) => path,
        None => {
            println!(
                "No UIO device named {} could be detected. Use --uio <path> to specify the device.",
                UIO_NAME
            );
            return Ok(());
        }
    };
    log::info!("Using UIO device {}", uio_path.display());

    let table = AddressTable::load(&args.address_table)?;
    let bus = UioBackend::new(&uio_path, &table, args.base_address, args.map_size)?;
    let config = Builder::new()
        .config_settle(Duration::from_micros(args.settle_us))
        .pll_settle(Duration::from_micros(args.pll_settle_us))
        .max_gth_shift_retries(args.max_gth_retries)
        .build();
    let mut amc = Amc::new(bus, config);
    let mask = LinkMask::new(args.oh_mask);
    log::debug!("Link mask {}", mask);

    match args.command {
        Command::ScaModuleReset => amc.sca().module_reset(mask)?,
        Command::ScaChipId { v1 } => {
            let ids = amc.sca().read_chip_id(mask, v1)?;
            for (link, id) in ids.iter_masked(mask) {
                println!("{}: 0x{:06x}", link, id & 0x00ff_ffff);
            }
        }
        Command::ScaSeu { reset } => print_reply(&amc.sca().read_seu_counter(mask, reset)?, mask),
        Command::ScaSeuReset => amc.sca().reset_seu_counter(mask)?,
        Command::ScaHardResetEnable { enable } => amc.sca().hard_reset_enable(enable)?,
        Command::ScaCtrl { command, len, data } => {
            let command = CtrlCommand::from(command);
            if let Some(reply) = amc.sca().ctrl_command(command, mask, len, data)? {
                print_reply(&reply, mask);
            }
        }
        Command::ScaGpio { command, len, data } => {
            let command = GpioCommand::try_from(command)?;
            print_reply(&amc.sca().gpio_command(command, len, data, mask)?, mask);
        }
        Command::ScaI2c {
            channel,
            command,
            len,
            data,
        } => {
            let channel = I2cChannel::try_from(channel)?;
            let command = I2cCommand::try_from(command)?;
            amc.sca().i2c_command(channel, command, len, data, mask)?;
        }
        Command::ScaAdc { channel } => {
            let channel = AdcChannel::try_from(channel)?;
            let reply = amc.sca().adc_command(channel, mask)?;
            log_adc_reply(channel, &reply, mask);
            print_reply(&reply, mask);
        }
        Command::TtcPhaseShift {
            shift_out_of_lock_first,
            use_bc0_locked,
            do_scan,
        } => {
            let report = amc.ttc().phase_shift(PhaseScanConfig {
                shift_out_of_lock_first,
                use_bc0_locked,
                do_scan,
            })?;
            for lock in &report.locks {
                println!(
                    "Lock at shift {}: GTH {}, MMCM {}, phase {} ({:.3}ns)",
                    lock.iteration,
                    lock.gth_shift,
                    lock.mmcm_shift,
                    lock.phase_counts,
                    lock.phase_ns
                );
            }
            if let ScanOutcome::LockNotFound = report.outcome {
                return Err(report.error_message().unwrap_or("Unable to find lock").into());
            }
        }
        Command::TtcPllLock { read_attempts } => {
            let sample = amc.ttc().check_pll_lock(read_attempts)?;
            println!("{}/{}", sample.locked, sample.attempted);
        }
        Command::TtcMmcmReset => amc.ttc().mmcm_reset()?,
        Command::TtcCounterReset => amc.ttc().counter_reset()?,
        Command::TtcL1aEnable { enable } => match enable {
            Some(enable) => amc.ttc().set_l1a_enable(enable)?,
            None => println!("{}", amc.ttc().l1a_enable()?),
        },
        Command::TtcStatus => println!("BC0 locked: {}", amc.ttc().status()?),
        Command::TtcErrorCount { single } => println!("{}", amc.ttc().error_count(single)?),
        Command::TtcCounter { code } => {
            match code.map(TtcCounter::try_from).and_then(Result::ok) {
                Some(counter) => println!("{}: {}", counter, amc.ttc().counter(counter)?),
                None => {
                    for (counter, value) in amc.ttc().all_counters()? {
                        println!("{}: {}", counter, value);
                    }
                }
            }
        }
        Command::TtcL1aId => println!("{}", amc.ttc().l1a_id()?),
        Command::TtcL1aRate => println!("{}", amc.ttc().l1a_rate()?),
        Command::TtcPhaseMean => {
            let mut ttc = amc.ttc();
            let mmcm = ttc.mmcm_phase_mean()?;
            let gth = ttc.gth_phase_mean()?;
            println!("MMCM: {} ({:.3}ns)", mmcm, phase_to_ns(mmcm));
            println!("GTH: {} ({:.3}ns)", gth, phase_to_ns(gth));
        }
    }
    Ok(())
}
