//! SCA transactions through the manual control registers.
//!
//! A transaction writes the link mask, channel, command, length and payload of
//! an SCA command and pulses the execute bit. The firmware sends the command to
//! every enabled optohybrid and stores each reply in a per-link register.
//! Payload and replies are byte-reversed on the way (see
//! [`format_sca_data`]).
use std::io;

use gem_amc_protocol::{
    LinkMask, Register, ScaReply, format_sca_data,
    link::NUM_LINKS,
    sca::{
        AdcChannel, AdcCommand, CtrlCommand, GpioCommand, I2cChannel, I2cCommand, ScaChannel,
        ScaCommand,
    },
};

use crate::{RegisterBus, guard::with_monitoring_off};

/// Issues an SCA command without collecting replies.
pub fn send<B: RegisterBus + ?Sized>(
    bus: &mut B,
    command: ScaCommand,
    mask: LinkMask,
) -> io::Result<()> {
    log::trace!("SCA command: {}, mask={}", command, mask);
    bus.write(Register::ScaLinkEnableMask, mask.bits() as u32)?;
    bus.write(Register::ScaCmdChannel, command.channel as u32)?;
    bus.write(Register::ScaCmdCommand, command.opcode as u32)?;
    bus.write(Register::ScaCmdLength, command.length as u32)?;
    bus.write(Register::ScaCmdData, format_sca_data(command.payload))?;
    bus.write(Register::ScaCmdExecute, 0x1)
}

/// Issues an SCA command and reads the reply of every link enabled in `mask`.
///
/// Slots of disabled links are `0`.
pub fn send_with_reply<B: RegisterBus + ?Sized>(
    bus: &mut B,
    command: ScaCommand,
    mask: LinkMask,
) -> io::Result<ScaReply> {
    send(bus, command, mask)?;

    let mut reply = [0u32; NUM_LINKS];
    for link in mask.links() {
        reply[link.index()] = format_sca_data(bus.read(Register::ScaReplyData(link))?);
    }
    log::trace!("SCA reply: {:08x?}", reply);
    Ok(ScaReply::new(reply))
}

/// The SCA block of one card.
pub struct Sca<'a, B: RegisterBus + ?Sized> {
    bus: &'a mut B,
}

impl<'a, B: RegisterBus + ?Sized> Sca<'a, B> {
    pub fn new(bus: &'a mut B) -> Sca<'a, B> {
        Sca { bus }
    }

    /// Issues a raw SCA command, see [`send`].
    pub fn send(&mut self, command: ScaCommand, mask: LinkMask) -> io::Result<()> {
        send(self.bus, command, mask)
    }

    /// Issues a raw SCA command and collects the replies, see [`send_with_reply`].
    pub fn send_with_reply(&mut self, command: ScaCommand, mask: LinkMask) -> io::Result<ScaReply> {
        send_with_reply(self.bus, command, mask)
    }

    /// Executes a command of the CTRL channel with the ADC monitoring disabled.
    ///
    /// Exactly one transaction is issued per call. Chip ID reads go to the ADC
    /// channel and SEU counter access to the JTAG channel, both with a fixed
    /// length and payload. Control register writes return `None`. A command
    /// outside the CTRL command set is replaced by a `GET_DATA` read.
    pub fn ctrl_command(
        &mut self,
        command: CtrlCommand,
        mask: LinkMask,
        length: u8,
        data: u32,
    ) -> io::Result<Option<ScaReply>> {
        let code = command.code();
        let ctrl = |opcode| ScaCommand::new(ScaChannel::Ctrl.into(), opcode, length, data);
        with_monitoring_off(self.bus, |bus| match command {
            CtrlCommand::ReadIdV1 | CtrlCommand::ReadIdV2 => {
                let command = ScaCommand::new(ScaChannel::Adc.into(), code, 0x1, 0x1);
                send_with_reply(bus, command, mask).map(Some)
            }
            CtrlCommand::ReadSeu | CtrlCommand::ClearSeu => {
                let command = ScaCommand::new(ScaChannel::Jtag.into(), code, 0x1, 0x0);
                send_with_reply(bus, command, mask).map(Some)
            }
            CtrlCommand::WriteCrb | CtrlCommand::WriteCrc | CtrlCommand::WriteCrd => {
                send(bus, ctrl(code), mask).map(|_| None)
            }
            CtrlCommand::ReadCrb
            | CtrlCommand::ReadCrc
            | CtrlCommand::ReadCrd
            | CtrlCommand::GetData => send_with_reply(bus, ctrl(code), mask).map(Some),
            CtrlCommand::Other(_) => {
                log::warn!("{}, reading GET_DATA instead", command);
                send_with_reply(bus, ctrl(CtrlCommand::GetData.code()), mask).map(Some)
            }
        })
    }

    /// Executes a command on one of the I2C masters with the ADC monitoring
    /// disabled. The master is enabled by the command itself.
    ///
    /// No reply is collected.
    pub fn i2c_command(
        &mut self,
        channel: I2cChannel,
        command: I2cCommand,
        length: u8,
        data: u32,
        mask: LinkMask,
    ) -> io::Result<()> {
        let command = ScaCommand::new(channel.code(), command as u8, length, data);
        with_monitoring_off(self.bus, |bus| send(bus, command, mask))
    }

    /// Executes a command of the GPIO channel with the ADC monitoring disabled.
    pub fn gpio_command(
        &mut self,
        command: GpioCommand,
        length: u8,
        data: u32,
        mask: LinkMask,
    ) -> io::Result<ScaReply> {
        let command = ScaCommand::new(ScaChannel::Gpio.into(), command as u8, length, data);
        with_monitoring_off(self.bus, |bus| send_with_reply(bus, command, mask))
    }

    /// Converts one ADC input on every enabled link.
    ///
    /// Selects the input on the multiplexer, enables the current sink for the
    /// temperature inputs and starts the conversion, whose reply is the result.
    pub fn adc_command(&mut self, channel: AdcChannel, mask: LinkMask) -> io::Result<ScaReply> {
        log::debug!("Reading {} on links {}", channel, mask);
        let adc = |opcode: AdcCommand, payload| {
            ScaCommand::new(ScaChannel::Adc.into(), opcode as u8, 0x4, payload)
        };
        with_monitoring_off(self.bus, |bus| {
            send(bus, adc(AdcCommand::WriteMux, channel.code() as u32), mask)?;
            if channel.is_temperature() {
                send(bus, adc(AdcCommand::WriteCurrent, channel.current_sink_mask()), mask)?;
            }
            send_with_reply(bus, adc(AdcCommand::Go, 0x1), mask)
        })
    }

    /// Reads the chip ID of the SCA on every enabled link.
    ///
    /// The ID occupies the lower 24 bits of each reply.
    pub fn read_chip_id(&mut self, mask: LinkMask, sca_v1: bool) -> io::Result<ScaReply> {
        let command = if sca_v1 {
            CtrlCommand::ReadIdV1
        } else {
            CtrlCommand::ReadIdV2
        };
        self.ctrl_reply(command, mask)
    }

    /// Reads the SEU counter, optionally clearing it first.
    pub fn read_seu_counter(&mut self, mask: LinkMask, reset: bool) -> io::Result<ScaReply> {
        if reset {
            self.reset_seu_counter(mask)?;
        }
        self.ctrl_reply(CtrlCommand::ReadSeu, mask)
    }

    pub fn reset_seu_counter(&mut self, mask: LinkMask) -> io::Result<()> {
        self.ctrl_reply(CtrlCommand::ClearSeu, mask).map(|_| ())
    }

    /// Resets the SCA modules of the links in `mask`.
    ///
    /// The reset enable mask is restored afterwards.
    pub fn module_reset(&mut self, mask: LinkMask) -> io::Result<()> {
        log::info!("Resetting SCA modules on links {}", mask);
        crate::guard::with_register(
            self.bus,
            Register::ScaResetEnableMask,
            mask.bits() as u32,
            |bus| bus.write(Register::ScaModuleReset, 0x1),
        )
    }

    /// Enables or disables the SCA reset on a TTC HardReset command.
    pub fn hard_reset_enable(&mut self, enable: bool) -> io::Result<()> {
        self.bus.write(Register::ScaTtcHardResetEn, u32::from(enable))
    }

    fn ctrl_reply(&mut self, command: CtrlCommand, mask: LinkMask) -> io::Result<ScaReply> {
        Ok(self.ctrl_command(command, mask, 0x1, 0x0)?.unwrap_or_default())
    }
}

/// Logs every non-zero reply of an ADC conversion.
pub fn log_adc_reply(channel: AdcChannel, reply: &ScaReply, mask: LinkMask) {
    let description = channel.description().unwrap_or("Value");
    for (link, value) in reply.iter_masked(mask).filter(|(_, v)| *v != 0) {
        log::info!("{} for {}, {} = {}", description, link, channel, value);
    }
}

