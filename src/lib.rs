//! Driver for the Microchip MCP3208 8 channel, 12 bit ADC, talking through a
//! PL022 synchronous serial port such as the ones on the RP2040.
//!
//! The crate has two halves:
//!
//! - [`SpiController`] resets and programs the serial port (clock divider,
//!   word width, clock mode, frame format) and shifts 4 to 16 bit words through
//!   its FIFOs. All register accesses go through [`RegisterBlock`], so the
//!   controller runs against [`MmioBlock`] on the target and against fakes in
//!   tests.
//! - [`Mcp3208`] encodes the converter's channel select command, runs it over
//!   any [`embedded_hal::spi::SpiDevice`] and decodes the 12 bit result.
//!
//! Which select strategy to use depends on the [`WireFormat`]:
//!
//! ```ignore
//! use fugit::HertzU32;
//! use mcp3208::{BusId, Config, ManualSelect, Mcp3208, MmioBlock, SpiController, WireFormat};
//!
//! let (regs, resets) = unsafe { (MmioBlock::spi(BusId::Spi0), MmioBlock::resets()) };
//! let mut spi = SpiController::new(BusId::Spi0, regs, resets, HertzU32::MHz(125));
//! spi.configure(&Config::default().for_wire_format(WireFormat::WideWord))?;
//!
//! // chip select on a plain GPIO output
//! let device = ManualSelect::new(spi, cs_pin, delay)?;
//! let mut adc = Mcp3208::wide_word(device);
//!
//! let value = adc.read_channel(5)?;
//! ```
//!
//! Out of range channel numbers are not rejected, only their low three bits
//! are used.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod bus;
pub mod config;
pub mod mcp3208;
pub mod register;

pub use bus::{
    BusError, BusFormat, HardwareSelect, ManualSelect, ManualSelectError, MmioBlock,
    RegisterBlock, SpiController, DEFAULT_SETTLE_NS,
};
pub use config::{BitOrder, BusId, ClockDivider, Config, ConfigError, FrameFormat};
pub use mcp3208::{Channel, InputMode, Mcp3208, WireFormat, WordWidthMismatch, MAX_SAMPLE};
