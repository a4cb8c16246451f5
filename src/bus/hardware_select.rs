use embedded_hal::spi::{ErrorType, Operation, SpiBus, SpiDevice};

/// For frame formats where the peripheral drives its own select pin.
///
/// The pin has to be routed to the SPI function; this wrapper never touches
/// it and only makes sure the transaction is flushed before returning.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HardwareSelect<Bus> {
    bus: Bus,
}

impl<Bus> HardwareSelect<Bus> {
    pub fn new(bus: Bus) -> Self {
        Self { bus }
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    pub fn release(self) -> Bus {
        self.bus
    }
}

impl<Bus: ErrorType> ErrorType for HardwareSelect<Bus> {
    type Error = Bus::Error;
}

impl<Word, Bus> SpiDevice<Word> for HardwareSelect<Bus>
where
    Word: Copy + 'static,
    Bus: SpiBus<Word>,
{
    fn transaction(&mut self, operations: &mut [Operation<'_, Word>]) -> Result<(), Self::Error> {
        for operation in operations {
            match operation {
                Operation::Read(words) => self.bus.read(words)?,
                Operation::Write(words) => self.bus.write(words)?,
                Operation::Transfer(read, write) => self.bus.transfer(read, write)?,
                Operation::TransferInPlace(words) => self.bus.transfer_in_place(words)?,
                // no delay provider, the gap is left to the frame format
                Operation::DelayNs(_) => self.bus.flush()?,
            }
        }

        self.bus.flush()
    }
}
