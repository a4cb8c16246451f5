use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::{self, ErrorKind, ErrorType, Operation, SpiBus, SpiDevice};

/// Settling time around each select edge, about three instruction cycles at
/// 125 MHz.
pub const DEFAULT_SETTLE_NS: u32 = 24;

/// Frames every transaction with a software driven, active low select line.
///
/// Requires four connection wires:
///
/// - MISO
/// - MOSI
/// - SCK
/// - CS (plain GPIO output)
///
/// The line goes low before the first clock edge and high again only after
/// the bus has been flushed, with a settling delay on both sides of each edge.
pub struct ManualSelect<Bus, ChipSelect, Delay> {
    bus: Bus,
    cs: ChipSelect,
    delay: Delay,
    settle_ns: u32,
}

impl<Bus, ChipSelect: OutputPin, Delay: DelayNs> ManualSelect<Bus, ChipSelect, Delay> {
    /// Takes over the select pin and parks it deasserted.
    pub fn new(bus: Bus, mut cs: ChipSelect, delay: Delay) -> Result<Self, ChipSelect::Error> {
        cs.set_high()?;
        Ok(Self {
            bus,
            cs,
            delay,
            settle_ns: DEFAULT_SETTLE_NS,
        })
    }

    pub fn with_settle_ns(mut self, settle_ns: u32) -> Self {
        self.settle_ns = settle_ns;
        self
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    pub fn release(self) -> (Bus, ChipSelect, Delay) {
        (self.bus, self.cs, self.delay)
    }

    fn select(&mut self) -> Result<(), ChipSelect::Error> {
        self.delay.delay_ns(self.settle_ns);
        self.cs.set_low()?;
        self.delay.delay_ns(self.settle_ns);

        #[cfg(feature = "defmt")]
        defmt::trace!("select asserted");
        Ok(())
    }

    fn deselect(&mut self) -> Result<(), ChipSelect::Error> {
        self.delay.delay_ns(self.settle_ns);
        self.cs.set_high()?;
        self.delay.delay_ns(self.settle_ns);

        #[cfg(feature = "defmt")]
        defmt::trace!("select deasserted");
        Ok(())
    }
}

impl<Bus, ChipSelect, Delay> ErrorType for ManualSelect<Bus, ChipSelect, Delay>
where
    Bus: ErrorType,
    ChipSelect: OutputPin,
{
    type Error = ManualSelectError<Bus::Error, ChipSelect::Error>;
}

impl<Word, Bus, ChipSelect, Delay> SpiDevice<Word> for ManualSelect<Bus, ChipSelect, Delay>
where
    Word: Copy + 'static,
    Bus: SpiBus<Word>,
    ChipSelect: OutputPin,
    Delay: DelayNs,
{
    fn transaction(&mut self, operations: &mut [Operation<'_, Word>]) -> Result<(), Self::Error> {
        self.select().map_err(ManualSelectError::ChipSelect)?;

        let result = operations.iter_mut().try_for_each(|operation| match operation {
            Operation::Read(words) => self.bus.read(words),
            Operation::Write(words) => self.bus.write(words),
            Operation::Transfer(read, write) => self.bus.transfer(read, write),
            Operation::TransferInPlace(words) => self.bus.transfer_in_place(words),
            Operation::DelayNs(ns) => {
                self.bus.flush()?;
                self.delay.delay_ns(*ns);
                Ok(())
            }
        });

        // the line must stay low until the last word has left the shifter
        let flushed = self.bus.flush();
        let deselected = self.deselect();

        result.map_err(ManualSelectError::Spi)?;
        flushed.map_err(ManualSelectError::Spi)?;
        deselected.map_err(ManualSelectError::ChipSelect)?;

        Ok(())
    }
}

// Must use map_err, ambiguity prevents From from being implemented
pub enum ManualSelectError<SpiError, ChipSelectError> {
    Spi(SpiError),
    ChipSelect(ChipSelectError),
}

impl<SpiError, ChipSelectError> fmt::Debug for ManualSelectError<SpiError, ChipSelectError>
where
    SpiError: fmt::Debug,
    ChipSelectError: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Spi(error) => f.debug_tuple("Spi").field(error).finish(),
            Self::ChipSelect(error) => f.debug_tuple("ChipSelect").field(error).finish(),
        }
    }
}

impl<SpiError, ChipSelectError> spi::Error for ManualSelectError<SpiError, ChipSelectError>
where
    SpiError: spi::Error,
    ChipSelectError: fmt::Debug,
{
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Spi(error) => error.kind(),
            Self::ChipSelect(_) => ErrorKind::ChipSelectFault,
        }
    }
}

#[cfg(test)]
mod test {
    use embedded_hal::spi::{Operation, SpiDevice};
    use embedded_hal_mock::eh1::delay::{
        CheckedDelay, NoopDelay, Transaction as DelayTransaction,
    };
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    use super::{ManualSelect, DEFAULT_SETTLE_NS};

    #[test]
    fn test_select_brackets_transfer() {
        let cs_pin = PinMock::new(&[
            // parked high on construction
            PinTransaction::set(PinState::High),
            // asserted for the transaction
            PinTransaction::set(PinState::Low),
            // released once the bus is flushed
            PinTransaction::set(PinState::High),
        ]);
        let expectations = [
            SpiTransaction::transfer(vec![0x1d0_u16, 0x000], vec![0x003, 0x0ff]),
            SpiTransaction::flush(),
        ];
        let bus = SpiMock::new(&expectations);

        let mut device = ManualSelect::new(bus, cs_pin, NoopDelay::new()).unwrap();

        let mut rx = [0_u16; 2];
        device.transfer(&mut rx, &[0x1d0, 0x000]).unwrap();
        assert_eq!(rx, [0x003, 0x0ff]);

        let (mut bus, mut cs_pin, _) = device.release();
        bus.done();
        cs_pin.done();
    }

    #[test]
    fn test_delay_operation_flushes_first() {
        let cs_pin = PinMock::new(&[
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        let expectations = [
            SpiTransaction::write_vec(vec![0x3a_u16]),
            SpiTransaction::flush(),
            SpiTransaction::read(0x155),
            SpiTransaction::flush(),
        ];
        let bus = SpiMock::new(&expectations);

        let mut device = ManualSelect::new(bus, cs_pin, NoopDelay::new())
            .unwrap()
            .with_settle_ns(100);

        let mut rx = [0_u16; 1];
        device
            .transaction(&mut [
                Operation::Write(&[0x3a_u16]),
                Operation::DelayNs(1_000),
                Operation::Read(&mut rx),
            ])
            .unwrap();
        assert_eq!(rx, [0x155]);

        let (mut bus, mut cs_pin, _) = device.release();
        bus.done();
        cs_pin.done();
    }

    #[test]
    fn test_settle_delay_around_each_edge() {
        let cs_pin = PinMock::new(&[
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        let expectations = [SpiTransaction::write(0x3a_u16), SpiTransaction::flush()];
        let bus = SpiMock::new(&expectations);
        let delay = CheckedDelay::new(&[
            // before and after the falling edge
            DelayTransaction::delay_ns(DEFAULT_SETTLE_NS),
            DelayTransaction::delay_ns(DEFAULT_SETTLE_NS),
            // before and after the rising edge
            DelayTransaction::delay_ns(DEFAULT_SETTLE_NS),
            DelayTransaction::delay_ns(DEFAULT_SETTLE_NS),
        ]);

        let mut device = ManualSelect::new(bus, cs_pin, delay).unwrap();
        device.write(&[0x3a_u16]).unwrap();

        let (mut bus, mut cs_pin, mut delay) = device.release();
        bus.done();
        cs_pin.done();
        delay.done();
    }

    #[test]
    fn test_custom_settle_delay_with_inner_delay() {
        let cs_pin = PinMock::new(&[
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        let expectations = [
            SpiTransaction::write(0x3a_u16),
            SpiTransaction::flush(),
            SpiTransaction::write(0x00_u16),
            SpiTransaction::flush(),
        ];
        let bus = SpiMock::new(&expectations);
        let delay = CheckedDelay::new(&[
            DelayTransaction::delay_ns(100),
            DelayTransaction::delay_ns(100),
            DelayTransaction::delay_ns(1_000),
            DelayTransaction::delay_ns(100),
            DelayTransaction::delay_ns(100),
        ]);

        let mut device = ManualSelect::new(bus, cs_pin, delay)
            .unwrap()
            .with_settle_ns(100);
        device
            .transaction(&mut [
                Operation::Write(&[0x3a_u16]),
                Operation::DelayNs(1_000),
                Operation::Write(&[0x00_u16]),
            ])
            .unwrap();

        let (mut bus, mut cs_pin, mut delay) = device.release();
        bus.done();
        cs_pin.done();
        delay.done();
    }
}
