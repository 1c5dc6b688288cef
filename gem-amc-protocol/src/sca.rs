//! Channel and command codes of the GBT-SCA ASIC.
use std::fmt::Display;

use crate::error::CodeError;

/// SCA channels reachable through the manual control registers.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScaChannel {
    Ctrl = 0x00,
    Spi = 0x01,
    Gpio = 0x02,
    Jtag = 0x13,
    Adc = 0x14,
    Dac = 0x15,
}

impl From<ScaChannel> for u8 {
    fn from(value: ScaChannel) -> Self {
        value as u8
    }
}

/// One SCA command, sent to the SCA of every enabled link.
///
/// `length` is the payload length in bytes as announced to the SCA; it is not
/// checked against `payload`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ScaCommand {
    pub channel: u8,
    pub opcode: u8,
    pub length: u8,
    /// Payload in wire order
    pub payload: u32,
}

impl ScaCommand {
    pub const fn new(channel: u8, opcode: u8, length: u8, payload: u32) -> ScaCommand {
        ScaCommand {
            channel,
            opcode,
            length,
            payload,
        }
    }
}

impl Display for ScaCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "channel=0x{:02x}, opcode=0x{:02x}, length={}, payload=0x{:08x}",
            self.channel, self.opcode, self.length, self.payload
        )
    }
}

/// Commands of the CTRL channel.
///
/// Chip ID reads are served by the ADC channel and SEU counter access by the
/// JTAG channel; the control register commands address the CTRL channel itself.
/// Codes that are not part of the CTRL command set are kept as
/// [`CtrlCommand::Other`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CtrlCommand {
    ReadIdV1,
    ReadIdV2,
    ReadSeu,
    ClearSeu,
    WriteCrb,
    WriteCrc,
    WriteCrd,
    ReadCrb,
    ReadCrc,
    ReadCrd,
    GetData,
    Other(u8),
}

impl CtrlCommand {
    pub const fn code(&self) -> u8 {
        match self {
            CtrlCommand::ReadIdV1 => 0x91,
            CtrlCommand::ReadIdV2 => 0xd1,
            CtrlCommand::ReadSeu => 0xf1,
            CtrlCommand::ClearSeu => 0xf0,
            CtrlCommand::WriteCrb => 0x02,
            CtrlCommand::WriteCrc => 0x04,
            CtrlCommand::WriteCrd => 0x06,
            CtrlCommand::ReadCrb => 0x03,
            CtrlCommand::ReadCrc => 0x05,
            CtrlCommand::ReadCrd => 0x07,
            CtrlCommand::GetData => 0x01,
            CtrlCommand::Other(code) => *code,
        }
    }
}

impl From<u8> for CtrlCommand {
    fn from(value: u8) -> Self {
        match value {
            0x91 => CtrlCommand::ReadIdV1,
            0xd1 => CtrlCommand::ReadIdV2,
            0xf1 => CtrlCommand::ReadSeu,
            0xf0 => CtrlCommand::ClearSeu,
            0x02 => CtrlCommand::WriteCrb,
            0x04 => CtrlCommand::WriteCrc,
            0x06 => CtrlCommand::WriteCrd,
            0x03 => CtrlCommand::ReadCrb,
            0x05 => CtrlCommand::ReadCrc,
            0x07 => CtrlCommand::ReadCrd,
            0x01 => CtrlCommand::GetData,
            other => CtrlCommand::Other(other),
        }
    }
}

impl Display for CtrlCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CtrlCommand::Other(code) => write!(f, "unknown CTRL command 0x{:02x}", code),
            known => write!(f, "{:?} (0x{:02x})", known, known.code()),
        }
    }
}

/// Commands of the ADC channel.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AdcCommand {
    Go = 0x02,
    WriteGain = 0x10,
    ReadGain = 0x11,
    ReadData = 0x21,
    ReadRaw = 0x31,
    ReadOffset = 0x41,
    WriteMux = 0x50,
    ReadMux = 0x51,
    WriteCurrent = 0x60,
    ReadCurrent = 0x61,
}

/// Commands of the GPIO channel.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GpioCommand {
    ReadDataIn = 0x01,
    WriteDataOut = 0x10,
    ReadDataOut = 0x11,
    WriteDirection = 0x20,
    ReadDirection = 0x21,
    WriteIntEnable = 0x60,
    ReadIntEnable = 0x61,
}

impl TryFrom<u8> for GpioCommand {
    type Error = CodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0x01 => GpioCommand::ReadDataIn,
            0x10 => GpioCommand::WriteDataOut,
            0x11 => GpioCommand::ReadDataOut,
            0x20 => GpioCommand::WriteDirection,
            0x21 => GpioCommand::ReadDirection,
            0x60 => GpioCommand::WriteIntEnable,
            0x61 => GpioCommand::ReadIntEnable,
            other => return Err(CodeError::new("GPIO command", other)),
        })
    }
}

/// Commands of the I2C channels.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum I2cCommand {
    ReadStatus = 0x11,
    WriteMask = 0x20,
    ReadMask = 0x21,
    WriteCtrl = 0x30,
    ReadCtrl = 0x31,
    WriteData0 = 0x40,
    ReadData0 = 0x41,
    WriteData1 = 0x50,
    ReadData1 = 0x51,
    WriteData2 = 0x60,
    ReadData2 = 0x61,
    WriteData3 = 0x70,
    ReadData3 = 0x71,
    SingleByteWrite7Bit = 0x82,
    SingleByteRead7Bit = 0x86,
    SingleByteWrite10Bit = 0x8a,
    SingleByteRead10Bit = 0x8e,
    MultiByteWrite7Bit = 0xda,
    MultiByteRead7Bit = 0xde,
    MultiByteWrite10Bit = 0xe2,
    MultiByteRead10Bit = 0xe6,
}

impl TryFrom<u8> for I2cCommand {
    type Error = CodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0x11 => I2cCommand::ReadStatus,
            0x20 => I2cCommand::WriteMask,
            0x21 => I2cCommand::ReadMask,
            0x30 => I2cCommand::WriteCtrl,
            0x31 => I2cCommand::ReadCtrl,
            0x40 => I2cCommand::WriteData0,
            0x41 => I2cCommand::ReadData0,
            0x50 => I2cCommand::WriteData1,
            0x51 => I2cCommand::ReadData1,
            0x60 => I2cCommand::WriteData2,
            0x61 => I2cCommand::ReadData2,
            0x70 => I2cCommand::WriteData3,
            0x71 => I2cCommand::ReadData3,
            0x82 => I2cCommand::SingleByteWrite7Bit,
            0x86 => I2cCommand::SingleByteRead7Bit,
            0x8a => I2cCommand::SingleByteWrite10Bit,
            0x8e => I2cCommand::SingleByteRead10Bit,
            0xda => I2cCommand::MultiByteWrite7Bit,
            0xde => I2cCommand::MultiByteRead7Bit,
            0xe2 => I2cCommand::MultiByteWrite10Bit,
            0xe6 => I2cCommand::MultiByteRead10Bit,
            other => return Err(CodeError::new("I2C command", other)),
        })
    }
}

/// One of the 16 I2C masters of the SCA, channels `0x03..=0x12`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct I2cChannel(u8);

impl I2cChannel {
    const FIRST: u8 = 0x03;
    const COUNT: u8 = 16;

    /// The I2C master with index `0..16`.
    pub const fn new(index: u8) -> Option<I2cChannel> {
        if index < Self::COUNT {
            Some(I2cChannel(Self::FIRST + index))
        } else {
            None
        }
    }

    /// The SCA channel number.
    pub const fn code(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for I2cChannel {
    type Error = CodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::FIRST..Self::FIRST + Self::COUNT).contains(&value) {
            Ok(I2cChannel(value))
        } else {
            Err(CodeError::new("I2C channel", value))
        }
    }
}

/// An input of the SCA ADC multiplexer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct AdcChannel(u8);

impl AdcChannel {
    pub const TEMPERATURE_00: AdcChannel = AdcChannel(0x00);
    pub const TEMPERATURE_04: AdcChannel = AdcChannel(0x04);
    pub const TEMPERATURE_07: AdcChannel = AdcChannel(0x07);
    pub const TEMPERATURE_08: AdcChannel = AdcChannel(0x08);
    pub const PROM_POWER: AdcChannel = AdcChannel(0x0e);
    pub const FPGA_IO_POWER: AdcChannel = AdcChannel(0x0f);
    pub const FPGA_CORE_VOLTAGE: AdcChannel = AdcChannel(0x11);
    pub const VTRX3_RSSI: AdcChannel = AdcChannel(0x12);
    pub const VTRX2_RSSI: AdcChannel = AdcChannel(0x13);
    pub const VTRX1_RSSI: AdcChannel = AdcChannel(0x15);
    pub const GBTX_SCA_POWER: AdcChannel = AdcChannel(0x18);
    pub const FPGA_MGT_VOLTAGE_1B: AdcChannel = AdcChannel(0x1b);
    pub const FPGA_MGT_VOLTAGE_1E: AdcChannel = AdcChannel(0x1e);
    pub const SCA_TEMPERATURE: AdcChannel = AdcChannel(0x1f);

    /// Channels wired to temperature sensors. These need the current sink of
    /// the input enabled before a conversion.
    pub const TEMPERATURE: [AdcChannel; 5] = [
        Self::TEMPERATURE_00,
        Self::TEMPERATURE_04,
        Self::TEMPERATURE_07,
        Self::TEMPERATURE_08,
        Self::SCA_TEMPERATURE,
    ];

    pub const VOLTAGE: [AdcChannel; 6] = [
        Self::FPGA_MGT_VOLTAGE_1B,
        Self::FPGA_MGT_VOLTAGE_1E,
        Self::FPGA_CORE_VOLTAGE,
        Self::PROM_POWER,
        Self::GBTX_SCA_POWER,
        Self::FPGA_IO_POWER,
    ];

    pub const SIGNAL_STRENGTH: [AdcChannel; 3] =
        [Self::VTRX1_RSSI, Self::VTRX2_RSSI, Self::VTRX3_RSSI];

    const NUM_INPUTS: u8 = 32;

    pub const fn new(input: u8) -> Option<AdcChannel> {
        if input < Self::NUM_INPUTS {
            Some(AdcChannel(input))
        } else {
            None
        }
    }

    pub const fn code(&self) -> u8 {
        self.0
    }

    pub const fn is_temperature(&self) -> bool {
        matches!(self.0, 0x00 | 0x04 | 0x07 | 0x08 | 0x1f)
    }

    /// The mask selecting this input in the current sink register.
    pub const fn current_sink_mask(&self) -> u32 {
        1 << self.0
    }

    /// What the input is connected to on the optohybrid, if known.
    pub fn description(&self) -> Option<&'static str> {
        Some(match self.0 {
            0x00 | 0x04 | 0x07 | 0x08 => "Temperature",
            0x1f => "Internal SCA temperature",
            0x1b | 0x1e => "FPGA MGT voltage",
            0x11 => "FPGA core voltage",
            0x0e => "PROM power voltage",
            0x18 => "Power for GBTX and SCA",
            0x0f => "FPGA I/O power",
            0x15 => "Signal strength of VTRX1",
            0x13 => "Signal strength of VTRX2",
            0x12 => "Signal strength of VTRX3",
            _ => return None,
        })
    }
}

impl TryFrom<u8> for AdcChannel {
    type Error = CodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        AdcChannel::new(value).ok_or(CodeError::new("ADC channel", value))
    }
}

impl Display for AdcChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SCA-ADC channel 0x{:02x}", self.0)
    }
}
