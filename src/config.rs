use derive_try_from_primitive::TryFromPrimitive;
use embedded_hal::spi::{Mode, MODE_0};
use fugit::HertzU32;

use crate::register::{resets, SPI0_BASE, SPI1_BASE};

/// Smallest word the peripheral can shift.
pub const MIN_DATA_BITS: u8 = 4;
/// Largest word the peripheral can shift.
pub const MAX_DATA_BITS: u8 = 16;

/// The two SSP instances of the chip.
#[repr(u8)]
#[derive(TryFromPrimitive, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusId {
    Spi0 = 0,
    Spi1 = 1,
}

impl BusId {
    pub fn from_index(index: u8) -> Result<Self, ConfigError> {
        Self::try_from(index).map_err(ConfigError::InvalidBus)
    }

    /// Physical address of the peripheral's register block.
    pub fn base_address(self) -> usize {
        match self {
            BusId::Spi0 => SPI0_BASE,
            BusId::Spi1 => SPI1_BASE,
        }
    }

    pub(crate) fn reset_bits(self) -> u32 {
        match self {
            BusId::Spi0 => resets::SPI0_BITS,
            BusId::Spi1 => resets::SPI1_BITS,
        }
    }
}

/// Frame protocol, the value of the FRF field.
#[repr(u8)]
#[derive(TryFromPrimitive, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameFormat {
    /// Motorola SPI. With the select pin routed to the peripheral it is
    /// pulsed between words when the clock phase is zero.
    Motorola = 0b00,
    /// TI synchronous serial, a one-clock frame pulse precedes every word.
    TexasInstruments = 0b01,
    /// National Microwire, half-duplex command/response framing.
    NationalMicrowire = 0b10,
}

impl FrameFormat {
    pub fn from_bits(bits: u8) -> Result<Self, ConfigError> {
        Self::try_from(bits).map_err(ConfigError::InvalidFrameFormat)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    MsbFirst,
    /// Not supported by the peripheral, rejected by [`Config::validate`].
    LsbFirst,
}

/// Wire settings for [`crate::SpiController::configure`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Upper bound for the serial clock, the programmed rate is never faster.
    pub baud_rate: HertzU32,
    /// Word width in bits, 4 to 16.
    pub data_bits: u8,
    pub mode: Mode,
    pub bit_order: BitOrder,
    pub frame_format: FrameFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            baud_rate: HertzU32::MHz(1),
            data_bits: 8,
            mode: MODE_0,
            bit_order: BitOrder::MsbFirst,
            frame_format: FrameFormat::Motorola,
        }
    }
}

impl Config {
    pub const fn baud_rate(mut self, baud_rate: HertzU32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub const fn data_bits(mut self, data_bits: u8) -> Self {
        self.data_bits = data_bits;
        self
    }

    pub const fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub const fn bit_order(mut self, bit_order: BitOrder) -> Self {
        self.bit_order = bit_order;
        self
    }

    pub const fn frame_format(mut self, frame_format: FrameFormat) -> Self {
        self.frame_format = frame_format;
        self
    }

    /// Checks everything that does not depend on the input clock.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_DATA_BITS..=MAX_DATA_BITS).contains(&self.data_bits) {
            return Err(ConfigError::InvalidDataBits(self.data_bits));
        }
        if self.bit_order != BitOrder::MsbFirst {
            return Err(ConfigError::UnsupportedBitOrder);
        }
        Ok(())
    }
}

/// Result of the two stage clock divider search.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockDivider {
    /// Even value in 2..=254, programmed into CPSR.
    pub prescale: u32,
    /// Value in 1..=256, programmed into CR0.SCR as `postdiv - 1`.
    pub postdiv: u32,
}

impl ClockDivider {
    /// Finds the divider pair giving the fastest clock that does not exceed
    /// `baud_rate`. Ties go to the smaller prescaler.
    pub fn search(peripheral_clock: HertzU32, baud_rate: HertzU32) -> Result<Self, ConfigError> {
        let freq_in = peripheral_clock.raw();
        let baud = baud_rate.raw();

        if baud > freq_in {
            return Err(ConfigError::BaudRateTooHigh {
                requested: baud_rate,
                limit: peripheral_clock,
            });
        }
        if baud == 0 {
            return Err(ConfigError::BaudRateTooLow { requested: baud_rate });
        }

        let mut best: Option<(Self, u32)> = None;
        for prescale in (2..=254u32).step_by(2) {
            // smallest post divider keeping prescale * postdiv * baud >= freq_in
            let step = u64::from(prescale) * u64::from(baud);
            let postdiv = ((u64::from(freq_in) + step - 1) / step).max(1);
            if postdiv > 256 {
                continue;
            }

            let divider = Self {
                prescale,
                postdiv: postdiv as u32,
            };
            let rate = divider.rate(peripheral_clock).raw();
            if best.map_or(true, |(_, best_rate)| rate > best_rate) {
                best = Some((divider, rate));
            }
        }

        best.map(|(divider, _)| divider)
            .ok_or(ConfigError::BaudRateTooLow { requested: baud_rate })
    }

    pub fn rate(&self, peripheral_clock: HertzU32) -> HertzU32 {
        HertzU32::from_raw(peripheral_clock.raw() / (self.prescale * self.postdiv))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    InvalidBus(u8),
    InvalidDataBits(u8),
    InvalidFrameFormat(u8),
    UnsupportedBitOrder,
    BaudRateTooHigh {
        requested: HertzU32,
        limit: HertzU32,
    },
    /// Even the largest divider pair runs the clock faster than requested.
    BaudRateTooLow {
        requested: HertzU32,
    },
    /// The reset controller never acknowledged the release of the block.
    ResetTimeout,
}
