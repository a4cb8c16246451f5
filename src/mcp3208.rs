#![allow(clippy::unusual_byte_groupings)]

use embedded_hal::spi::SpiDevice;

use crate::bus::BusFormat;
use crate::config::{Config, FrameFormat};

/// Largest value a conversion can produce.
pub const MAX_SAMPLE: u16 = 0x0fff;

const SAMPLE_MASK: u16 = MAX_SAMPLE;
const CHANNEL_MASK: u8 = 0b111;

/// The eight analog inputs.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    Ch0 = 0,
    Ch1 = 1,
    Ch2 = 2,
    Ch3 = 3,
    Ch4 = 4,
    Ch5 = 5,
    Ch6 = 6,
    Ch7 = 7,
}

impl Channel {
    pub const ALL: [Channel; 8] = [
        Channel::Ch0,
        Channel::Ch1,
        Channel::Ch2,
        Channel::Ch3,
        Channel::Ch4,
        Channel::Ch5,
        Channel::Ch6,
        Channel::Ch7,
    ];

    /// The following channel, wrapping from 7 back to 0.
    pub fn next(self) -> Self {
        Self::from(self as u8 + 1)
    }
}

/// Only the low three bits are used, anything above is silently dropped.
impl From<u8> for Channel {
    fn from(channel: u8) -> Self {
        Self::ALL[usize::from(channel & CHANNEL_MASK)]
    }
}

/// How the selected input is measured.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputMode {
    /// Against ground.
    SingleEnded,
    /// Against the neighbouring input of the pair (CH0/CH1, CH2/CH3, ...).
    Differential,
}

/// Word layout used to talk to the converter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WireFormat {
    /// Two 10 bit words inside one software select frame.
    ///
    /// ```text
    /// clock: 1 2 3 4 5 6 7 8 9   10  | 11 .. 20
    /// tx:    0 1 S c c c x x x   x   | 0  .. 0
    /// rx:    - - - - - - - 0 B11 B10 | B9 .. B0
    /// ```
    ///
    /// The leading zero, start bit `1`, mode bit `S` and channel `ccc` are
    /// followed by padding that covers the sample period, so the result ends
    /// exactly in the last bit of the second word.
    WideWord,
    /// A single 12 bit word, framed by the peripheral.
    ///
    /// ```text
    /// tx: 0 0 0 0 0 0 1 S c c c x
    /// ```
    NarrowWord,
}

impl WireFormat {
    const WIDE_START: u16 = 0b1_0_000_0000;
    const WIDE_SINGLE_ENDED: u16 = 0b0_1_000_0000;
    const WIDE_CHANNEL_SHIFT: u16 = 4;

    const NARROW_START: u16 = 0b10_0000;
    const NARROW_SINGLE_ENDED: u16 = 0b01_0000;
    const NARROW_CHANNEL_SHIFT: u16 = 1;

    /// Word width the bus has to be configured with.
    pub fn data_bits(self) -> u8 {
        match self {
            WireFormat::WideWord => 10,
            WireFormat::NarrowWord => 12,
        }
    }

    /// Command word selecting `channel`, which is masked to its low 3 bits.
    pub fn encode(self, channel: u8, mode: InputMode) -> u16 {
        let channel = u16::from(channel & CHANNEL_MASK);
        let single_ended = mode == InputMode::SingleEnded;

        match self {
            WireFormat::WideWord => {
                let mut command = Self::WIDE_START | channel << Self::WIDE_CHANNEL_SHIFT;
                if single_ended {
                    command |= Self::WIDE_SINGLE_ENDED;
                }
                command
            }
            WireFormat::NarrowWord => {
                let mut command = Self::NARROW_START | channel << Self::NARROW_CHANNEL_SHIFT;
                if single_ended {
                    command |= Self::NARROW_SINGLE_ENDED;
                }
                command
            }
        }
    }

    /// Number of words in one conversion.
    pub fn words(self) -> usize {
        match self {
            WireFormat::WideWord => 2,
            WireFormat::NarrowWord => 1,
        }
    }

    /// Extracts the sample from the received words, `None` if fewer than
    /// [`Self::words`] were received. Bits above the 12 bit result are
    /// discarded, garbage there never yields an out of range value.
    pub fn decode(self, received: &[u16]) -> Option<u16> {
        match (self, received) {
            (WireFormat::WideWord, [first, second, ..]) => Some(self.sample(*first, *second)),
            (WireFormat::NarrowWord, [word, ..]) => Some(self.sample(*word, 0)),
            _ => None,
        }
    }

    /// Whether a bus programmed with `bus` shifts words of the right width.
    pub fn check(self, bus: &BusFormat) -> Result<(), WordWidthMismatch> {
        if bus.data_bits != self.data_bits() {
            return Err(WordWidthMismatch {
                expected: self.data_bits(),
                configured: bus.data_bits,
            });
        }
        Ok(())
    }

    fn sample(self, first: u16, second: u16) -> u16 {
        match self {
            WireFormat::WideWord => (first << 10).wrapping_add(second) & SAMPLE_MASK,
            WireFormat::NarrowWord => first & SAMPLE_MASK,
        }
    }
}

impl Config {
    /// Bus settings for talking to the converter in `format`: the matching
    /// word width on a Motorola frame.
    pub fn for_wire_format(self, format: WireFormat) -> Self {
        self.data_bits(format.data_bits())
            .frame_format(FrameFormat::Motorola)
    }
}

/// MCP3208 driver.
///
/// For [`WireFormat::WideWord`] hand it a [`crate::ManualSelect`], for
/// [`WireFormat::NarrowWord`] a [`crate::HardwareSelect`], on a bus
/// configured with [`Config::for_wire_format`].
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mcp3208<SPI> {
    spi: SPI,
    format: WireFormat,
}

/// The bus was configured with a word width that does not match the
/// [`WireFormat`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WordWidthMismatch {
    pub expected: u8,
    pub configured: u8,
}

impl<SPI: SpiDevice<u16>> Mcp3208<SPI> {
    /// The bus behind `spi` must shift [`WireFormat::data_bits`] wide words,
    /// any other width decodes to garbage. Use [`Self::checked`] to verify
    /// against the programmed [`BusFormat`].
    pub fn new(spi: SPI, format: WireFormat) -> Self {
        Self { spi, format }
    }

    /// Like [`Self::new`], but rejects a bus programmed with the wrong word
    /// width.
    pub fn checked(
        spi: SPI,
        format: WireFormat,
        bus: &BusFormat,
    ) -> Result<Self, WordWidthMismatch> {
        format.check(bus)?;
        Ok(Self::new(spi, format))
    }

    pub fn wide_word(spi: SPI) -> Self {
        Self::new(spi, WireFormat::WideWord)
    }

    pub fn narrow_word(spi: SPI) -> Self {
        Self::new(spi, WireFormat::NarrowWord)
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Single ended conversion of `channel`.
    ///
    /// Only the low three bits of `channel` are used, 8 reads channel 0.
    pub fn read_channel(&mut self, channel: u8) -> Result<u16, SPI::Error> {
        self.read_with_mode(channel, InputMode::SingleEnded)
    }

    pub fn read(&mut self, channel: Channel) -> Result<u16, SPI::Error> {
        self.read_with_mode(channel as u8, InputMode::SingleEnded)
    }

    /// Pseudo differential conversion of `channel` against its pair partner.
    pub fn read_differential(&mut self, channel: Channel) -> Result<u16, SPI::Error> {
        self.read_with_mode(channel as u8, InputMode::Differential)
    }

    pub fn read_with_mode(&mut self, channel: u8, mode: InputMode) -> Result<u16, SPI::Error> {
        let command = self.format.encode(channel, mode);
        let mut received = [0_u16; 2];

        match self.format {
            WireFormat::WideWord => self.spi.transfer(&mut received, &[command, 0])?,
            WireFormat::NarrowWord => {
                received[0] = command;
                self.spi.transfer_in_place(&mut received[..1])?;
            }
        }

        let sample = self.format.sample(received[0], received[1]);

        #[cfg(feature = "defmt")]
        defmt::trace!(
            "ch={=u8} command={=u16:#x} value={=u16}",
            channel & CHANNEL_MASK,
            command,
            sample
        );

        Ok(sample)
    }

    pub fn release(self) -> SPI {
        self.spi
    }
}
