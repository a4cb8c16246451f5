mod controller;
#[cfg(test)]
pub(crate) mod fake;
mod hardware_select;
mod manual_select;
mod mmio;

pub use self::controller::BusError;
pub use self::controller::BusFormat;
pub use self::controller::SpiController;
pub use self::hardware_select::HardwareSelect;
pub use self::manual_select::ManualSelect;
pub use self::manual_select::ManualSelectError;
pub use self::manual_select::DEFAULT_SETTLE_NS;
pub use self::mmio::MmioBlock;

/// Access to a block of 32 bit memory mapped registers.
///
/// Reads take `&mut self` because reading a FIFO register pops it.
pub trait RegisterBlock {
    /// Reads the register at byte `offset` and keeps only the bits in `mask`.
    fn read_masked(&mut self, offset: usize, mask: u32) -> u32;

    /// Replaces the bits selected by `mask` with the matching bits of `value`.
    ///
    /// A full mask must be a plain store without a prior read, otherwise a
    /// write to a FIFO register would pop a word.
    fn write_masked(&mut self, offset: usize, value: u32, mask: u32);

    #[inline]
    fn read(&mut self, offset: usize) -> u32 {
        self.read_masked(offset, u32::MAX)
    }

    #[inline]
    fn write(&mut self, offset: usize, value: u32) {
        self.write_masked(offset, value, u32::MAX)
    }

    #[inline]
    fn set_bits(&mut self, offset: usize, bits: u32) {
        self.write_masked(offset, bits, bits)
    }

    #[inline]
    fn clear_bits(&mut self, offset: usize, bits: u32) {
        self.write_masked(offset, 0, bits)
    }
}

impl<T: RegisterBlock + ?Sized> RegisterBlock for &mut T {
    #[inline]
    fn read_masked(&mut self, offset: usize, mask: u32) -> u32 {
        T::read_masked(self, offset, mask)
    }

    #[inline]
    fn write_masked(&mut self, offset: usize, value: u32, mask: u32) {
        T::write_masked(self, offset, value, mask)
    }
}
