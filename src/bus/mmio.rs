use core::ptr;

use crate::bus::RegisterBlock;
use crate::config::BusId;
use crate::register::RESETS_BASE;

/// [`RegisterBlock`] backed by volatile accesses to physical memory.
#[derive(Debug)]
pub struct MmioBlock {
    base: *mut u32,
}

impl MmioBlock {
    /// # Safety
    ///
    /// `base` must point at a register block that stays mapped for the
    /// lifetime of the returned value, and nothing else may access it
    /// concurrently.
    pub const unsafe fn new(base: *mut u32) -> Self {
        Self { base }
    }

    /// # Safety
    ///
    /// The caller must be the only owner of the peripheral, see [`Self::new`].
    pub unsafe fn spi(id: BusId) -> Self {
        // SAFETY: forwarded to the caller
        unsafe { Self::new(id.base_address() as *mut u32) }
    }

    /// # Safety
    ///
    /// The caller must be the only one driving the reset controller.
    pub unsafe fn resets() -> Self {
        // SAFETY: forwarded to the caller
        unsafe { Self::new(RESETS_BASE as *mut u32) }
    }

    #[inline]
    fn register(&self, offset: usize) -> *mut u32 {
        self.base.wrapping_add(offset / 4)
    }
}

impl RegisterBlock for MmioBlock {
    #[inline]
    fn read_masked(&mut self, offset: usize, mask: u32) -> u32 {
        // SAFETY: validity of the block is guaranteed by the constructor
        unsafe { ptr::read_volatile(self.register(offset)) & mask }
    }

    #[inline]
    fn write_masked(&mut self, offset: usize, value: u32, mask: u32) {
        let register = self.register(offset);
        // SAFETY: validity of the block is guaranteed by the constructor
        unsafe {
            let value = if mask == u32::MAX {
                value
            } else {
                (ptr::read_volatile(register) & !mask) | (value & mask)
            };
            ptr::write_volatile(register, value);
        }
    }
}
