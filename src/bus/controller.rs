use core::convert::Infallible;

use bit_field::BitField;
use embedded_hal::spi::{self, ErrorKind, ErrorType, Mode, Phase, Polarity, SpiBus};
use fugit::HertzU32;

use crate::bus::RegisterBlock;
use crate::config::{BitOrder, BusId, ClockDivider, Config, ConfigError, FrameFormat};
use crate::register::{resets, ssp};

/// Settings the peripheral was last programmed with.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusFormat {
    /// Achieved serial clock, never above the requested one.
    pub baud_rate: HertzU32,
    pub data_bits: u8,
    pub mode: Mode,
    pub bit_order: BitOrder,
    pub frame_format: FrameFormat,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// A FIFO or the busy flag did not change within the poll limit.
    Timeout,
}

impl spi::Error for BusError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Owns one PL022 instance and the reset line that gates it.
///
/// Waits on hardware are unbounded unless a poll limit is set with
/// [`SpiController::with_poll_limit`].
#[derive(Debug)]
pub struct SpiController<Regs, Resets> {
    id: BusId,
    regs: Regs,
    resets: Resets,
    peripheral_clock: HertzU32,
    poll_limit: Option<u32>,
    format: Option<BusFormat>,
}

impl<Regs: RegisterBlock, Resets: RegisterBlock> SpiController<Regs, Resets> {
    /// `peripheral_clock` is the frequency feeding the block (`clk_peri`).
    pub fn new(id: BusId, regs: Regs, resets: Resets, peripheral_clock: HertzU32) -> Self {
        Self {
            id,
            regs,
            resets,
            peripheral_clock,
            poll_limit: None,
            format: None,
        }
    }

    /// Gives up on a hardware wait after `polls` unsuccessful status reads.
    pub fn with_poll_limit(mut self, polls: u32) -> Self {
        self.poll_limit = Some(polls);
        self
    }

    pub fn id(&self) -> BusId {
        self.id
    }

    /// `None` until [`Self::configure`] succeeded.
    pub fn format(&self) -> Option<BusFormat> {
        self.format
    }

    /// Resets the block and programs it from scratch.
    ///
    /// Every parameter is checked before the first register access. Returns
    /// the achieved baud rate.
    pub fn configure(&mut self, config: &Config) -> Result<HertzU32, ConfigError> {
        config.validate()?;
        let divider = ClockDivider::search(self.peripheral_clock, config.baud_rate)?;

        self.format = None;
        self.reset();
        self.unreset()?;

        let baud_rate = self.set_divider(divider);
        self.set_format(config);

        // DREQ is harmless while no DMA channel listens
        self.regs.set_bits(
            ssp::DMACR,
            ssp::dmacr::TXDMAE_BITS | ssp::dmacr::RXDMAE_BITS,
        );
        self.regs.set_bits(ssp::CR1, ssp::cr1::SSE_BITS);

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "{} configured: {} Hz requested, {} Hz achieved, {} bit words",
            self.id,
            config.baud_rate.raw(),
            baud_rate.raw(),
            config.data_bits,
        );

        self.format = Some(BusFormat {
            baud_rate,
            data_bits: config.data_bits,
            mode: config.mode,
            bit_order: config.bit_order,
            frame_format: config.frame_format,
        });
        Ok(baud_rate)
    }

    /// Disables the block and holds it in reset.
    pub fn deinit(&mut self) {
        self.regs.clear_bits(ssp::CR1, ssp::cr1::SSE_BITS);
        self.regs.clear_bits(
            ssp::DMACR,
            ssp::dmacr::TXDMAE_BITS | ssp::dmacr::RXDMAE_BITS,
        );
        self.reset();
        self.format = None;
    }

    /// Effective serial clock, computed from the divider registers.
    pub fn baud_rate(&mut self) -> HertzU32 {
        let prescale = self.regs.read(ssp::CPSR).get_bits(ssp::cpsr::CPSDVSR);
        let postdiv = self.regs.read(ssp::CR0).get_bits(ssp::cr0::SCR) + 1;
        if prescale == 0 {
            // divider never programmed, the block is not clocking
            return HertzU32::from_raw(0);
        }
        HertzU32::from_raw(self.peripheral_clock.raw() / (prescale * postdiv))
    }

    pub fn is_busy(&mut self) -> bool {
        self.regs.read_masked(ssp::SR, ssp::sr::BSY_BITS) != 0
    }

    pub fn release(self) -> (Regs, Resets) {
        (self.regs, self.resets)
    }

    fn reset(&mut self) {
        self.resets.set_bits(resets::RESET, self.id.reset_bits());
    }

    fn unreset(&mut self) -> Result<(), ConfigError> {
        self.resets.clear_bits(resets::RESET, self.id.reset_bits());
        self.wait(Self::poll_reset_done)
            .map_err(|_| ConfigError::ResetTimeout)
    }

    fn poll_reset_done(&mut self) -> nb::Result<(), Infallible> {
        let bits = self.id.reset_bits();
        if self.resets.read_masked(resets::RESET_DONE, bits) == bits {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    fn set_divider(&mut self, divider: ClockDivider) -> HertzU32 {
        let mut cpsr: u32 = 0;
        cpsr.set_bits(ssp::cpsr::CPSDVSR, divider.prescale);
        self.regs.write(ssp::CPSR, cpsr);

        let mut cr0: u32 = 0;
        cr0.set_bits(ssp::cr0::SCR, divider.postdiv - 1);
        self.regs.write_masked(ssp::CR0, cr0, ssp::cr0::SCR_BITS);

        divider.rate(self.peripheral_clock)
    }

    fn set_format(&mut self, config: &Config) {
        let mut cr0: u32 = 0;
        cr0.set_bits(ssp::cr0::DSS, u32::from(config.data_bits - 1))
            .set_bits(ssp::cr0::FRF, config.frame_format as u32)
            .set_bit(ssp::cr0::SPO, config.mode.polarity == Polarity::IdleHigh)
            .set_bit(
                ssp::cr0::SPH,
                config.mode.phase == Phase::CaptureOnSecondTransition,
            );

        let enabled = self.regs.read_masked(ssp::CR1, ssp::cr1::SSE_BITS);
        self.regs.clear_bits(ssp::CR1, ssp::cr1::SSE_BITS);
        self.regs.write_masked(
            ssp::CR0,
            cr0,
            ssp::cr0::DSS_BITS | ssp::cr0::FRF_BITS | ssp::cr0::SPO_BITS | ssp::cr0::SPH_BITS,
        );
        if enabled != 0 {
            self.regs.set_bits(ssp::CR1, enabled);
        }
    }

    fn wait<T>(
        &mut self,
        mut poll: impl FnMut(&mut Self) -> nb::Result<T, Infallible>,
    ) -> Result<T, BusError> {
        match self.poll_limit {
            None => nb::block!(poll(self)).map_err(|never| match never {}),
            Some(limit) => {
                for _ in 0..limit {
                    match poll(self) {
                        Ok(value) => return Ok(value),
                        Err(nb::Error::WouldBlock) => {}
                        Err(nb::Error::Other(never)) => match never {},
                    }
                }
                Err(BusError::Timeout)
            }
        }
    }

    fn try_send(&mut self, word: u16) -> nb::Result<(), Infallible> {
        if self.regs.read_masked(ssp::SR, ssp::sr::TNF_BITS) == 0 {
            return Err(nb::Error::WouldBlock);
        }
        self.regs.write(ssp::DR, u32::from(word));
        Ok(())
    }

    fn try_receive(&mut self) -> nb::Result<u16, Infallible> {
        if self.regs.read_masked(ssp::SR, ssp::sr::RNE_BITS) == 0 {
            return Err(nb::Error::WouldBlock);
        }
        Ok(self.regs.read_masked(ssp::DR, ssp::DR_BITS) as u16)
    }

    fn poll_idle(&mut self) -> nb::Result<(), Infallible> {
        if self.is_busy() {
            Err(nb::Error::WouldBlock)
        } else {
            Ok(())
        }
    }

    /// Full duplex exchange of `words.len()` words.
    ///
    /// Never lets more than a FIFO's worth of words be in flight, so the
    /// receive FIFO cannot overrun while the transmit side runs ahead.
    fn exchange(&mut self, mut words: Words<'_>) -> Result<(), BusError> {
        // leftovers of an aborted exchange would shift every received word
        while let Ok(_stale) = self.try_receive() {
            #[cfg(feature = "defmt")]
            defmt::trace!("dropped stale word {=u16:#x}", _stale);
        }

        let len = words.len();
        let (mut sent, mut received) = (0, 0);
        let mut idle_polls = 0;

        while sent < len || received < len {
            let mut progress = false;

            if sent < len && sent.saturating_sub(received) < ssp::FIFO_DEPTH {
                if let Ok(()) = self.try_send(words.outgoing(sent)) {
                    sent += 1;
                    progress = true;
                }
            }
            if received < len {
                if let Ok(word) = self.try_receive() {
                    words.incoming(received, word);
                    received += 1;
                    progress = true;
                }
            }

            if progress {
                idle_polls = 0;
            } else {
                idle_polls += 1;
                if matches!(self.poll_limit, Some(limit) if idle_polls >= limit) {
                    return Err(BusError::Timeout);
                }
            }
        }

        Ok(())
    }
}

/// Source and destination of one [`SpiController::exchange`].
enum Words<'a> {
    Read(&'a mut [u16]),
    Write(&'a [u16]),
    Transfer(&'a mut [u16], &'a [u16]),
    InPlace(&'a mut [u16]),
}

impl Words<'_> {
    fn len(&self) -> usize {
        match self {
            Words::Read(read) => read.len(),
            Words::Write(write) => write.len(),
            Words::Transfer(read, write) => read.len().max(write.len()),
            Words::InPlace(words) => words.len(),
        }
    }

    fn outgoing(&self, index: usize) -> u16 {
        match self {
            Words::Read(_) => 0,
            Words::Write(write) | Words::Transfer(_, write) => {
                write.get(index).copied().unwrap_or(0)
            }
            Words::InPlace(words) => words[index],
        }
    }

    fn incoming(&mut self, index: usize, word: u16) {
        match self {
            Words::Write(_) => {}
            Words::Read(read) | Words::Transfer(read, _) => {
                if let Some(slot) = read.get_mut(index) {
                    *slot = word;
                }
            }
            // a word is always sent before its slot is overwritten
            Words::InPlace(words) => words[index] = word,
        }
    }
}

impl<Regs, Resets> ErrorType for SpiController<Regs, Resets> {
    type Error = BusError;
}

impl<Regs: RegisterBlock, Resets: RegisterBlock> SpiBus<u16> for SpiController<Regs, Resets> {
    fn read(&mut self, words: &mut [u16]) -> Result<(), BusError> {
        self.exchange(Words::Read(words))
    }

    fn write(&mut self, words: &[u16]) -> Result<(), BusError> {
        self.exchange(Words::Write(words))
    }

    fn transfer(&mut self, read: &mut [u16], write: &[u16]) -> Result<(), BusError> {
        self.exchange(Words::Transfer(read, write))
    }

    fn transfer_in_place(&mut self, words: &mut [u16]) -> Result<(), BusError> {
        self.exchange(Words::InPlace(words))
    }

    fn flush(&mut self) -> Result<(), BusError> {
        self.wait(Self::poll_idle)
    }
}
