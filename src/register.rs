#![allow(clippy::unusual_byte_groupings)]

//! Register map of the PL022 synchronous serial port and of the reset
//! controller that gates it, as laid out on the RP2040.
//!
//! Offsets are in bytes from the start of the respective block.

pub const SPI0_BASE: usize = 0x4003_c000;
pub const SPI1_BASE: usize = 0x4004_0000;
pub const RESETS_BASE: usize = 0x4000_c000;

pub mod ssp {
    /// SSPCR0, control register 0
    pub const CR0: usize = 0x000;
    pub mod cr0 {
        use core::ops::Range;

        /// Data size select, holds `bits - 1`
        pub const DSS: Range<usize> = 0..4;
        /// Frame format
        pub const FRF: Range<usize> = 4..6;
        /// Clock polarity (Motorola format only)
        pub const SPO: usize = 6;
        /// Clock phase (Motorola format only)
        pub const SPH: usize = 7;
        /// Serial clock rate, holds `postdiv - 1`
        pub const SCR: Range<usize> = 8..16;

        pub const DSS_BITS: u32 = 0x0000_000f;
        pub const FRF_BITS: u32 = 0x0000_0030;
        pub const SPO_BITS: u32 = 0x0000_0040;
        pub const SPH_BITS: u32 = 0x0000_0080;
        pub const SCR_BITS: u32 = 0x0000_ff00;
    }

    /// SSPCR1, control register 1
    pub const CR1: usize = 0x004;
    pub mod cr1 {
        /// Synchronous serial port enable
        pub const SSE_BITS: u32 = 0b0010;
    }

    /// SSPDR, receive FIFO on read, transmit FIFO on write
    pub const DR: usize = 0x008;
    pub const DR_BITS: u32 = 0x0000_ffff;

    /// SSPSR, status register
    pub const SR: usize = 0x00c;
    pub mod sr {
        /// Transmit FIFO not full
        pub const TNF_BITS: u32 = 0b0_0010;
        /// Receive FIFO not empty
        pub const RNE_BITS: u32 = 0b0_0100;
        /// Busy shifting a frame or transmit FIFO not empty
        pub const BSY_BITS: u32 = 0b1_0000;
    }

    /// SSPCPSR, clock prescale register
    pub const CPSR: usize = 0x010;
    pub mod cpsr {
        use core::ops::Range;

        pub const CPSDVSR: Range<usize> = 0..8;
        pub const CPSDVSR_BITS: u32 = 0x0000_00ff;
    }

    /// SSPDMACR, DMA control register
    pub const DMACR: usize = 0x024;
    pub mod dmacr {
        pub const RXDMAE_BITS: u32 = 0b01;
        pub const TXDMAE_BITS: u32 = 0b10;
    }

    /// Depth of both the transmit and the receive FIFO, in words
    pub const FIFO_DEPTH: usize = 8;
}

pub mod resets {
    /// RESET, a set bit holds the matching block in reset
    pub const RESET: usize = 0x0;
    /// RESET_DONE, a set bit means the matching block is out of reset
    pub const RESET_DONE: usize = 0x8;

    pub const SPI0_BITS: u32 = 1 << 16;
    pub const SPI1_BITS: u32 = 1 << 17;
}
