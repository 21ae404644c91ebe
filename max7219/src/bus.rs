//! Module describing the [`BusDriver`] trait and the implementations for bit-banged GPIO pins and
//! hardware SPI.

use embedded_hal_1::delay::DelayNs;
use embedded_hal_1::digital::{OutputPin, PinState};
use embedded_hal_1::spi::SpiBus;

/// SPI mode the MAX7219 expects: clock idles low, data is sampled on the rising edge.
pub const SPI_MODE: embedded_hal_1::spi::Mode = embedded_hal_1::spi::MODE_0;

/// Fastest serial clock in the MAX7219 datasheet (fCLK, 10MHz).  Configure the SPI peripheral at
/// or below this.
pub const SPI_FREQUENCY_HZ: u32 = 10_000_000;

/// Minimum CLK high and CLK low time (tCH, tCL) from the datasheet
const CLOCK_HALF_PERIOD_NS: u32 = 50;

/// This trait represents some low-level implementation of the MAX7219 serial interface, likely in
/// terms of some platform-specific HAL.
///
/// The MAX7219 takes 16-bit words, a register address byte followed by a data byte, shifted in MSB
/// first on DIN while CS is held low.  Words are only acted upon when CS goes high again.  When
/// several chips are daisy chained, several words are shifted through the chain between one fall
/// and one rise of CS; that sequencing lives in [`crate::chain`], so implementations of this trait
/// only deal with one word at a time.
pub trait BusDriver {
    type Error;

    /// Put the bus lines in their idle state, with CS high.
    fn reset(&mut self) -> Result<(), Self::Error>;

    /// Pull CS low to start a frame.
    fn select(&mut self) -> Result<(), Self::Error>;

    /// Shift out one word: the register address, then the data byte, both MSB first.
    fn transfer_word_pair(&mut self, register: u8, value: u8) -> Result<(), Self::Error>;

    /// Bring CS high once every word of the frame is out, so every chip in the chain latches the
    /// word it is holding.
    fn latch(&mut self) -> Result<(), Self::Error>;
}

/// Implementation of [`BusDriver`] which bit-bangs three GPIO output pins.
///
/// Any pins implementing the `embedded-hal` [`OutputPin`] trait with a common error type will do.
/// `Delay` paces the clock; the MAX7219 only needs 50ns per clock phase, so on slow MCUs a no-op
/// delay is fine.
pub struct BitBangingBusDriver<Clk, Din, Cs, Delay> {
    clock: Clk,
    data: Din,
    chip_select: Cs,
    delay: Delay,
    half_period_ns: u32,
}

impl<Clk, Din, Cs, Delay> BitBangingBusDriver<Clk, Din, Cs, Delay>
where
    Clk: OutputPin,
    Din: OutputPin<Error = Clk::Error>,
    Cs: OutputPin<Error = Clk::Error>,
    Delay: DelayNs,
{
    pub fn new(clock: Clk, data: Din, chip_select: Cs, delay: Delay) -> Self {
        Self {
            clock,
            data,
            chip_select,
            delay,
            half_period_ns: CLOCK_HALF_PERIOD_NS,
        }
    }

    /// Stretch each clock phase to `half_period_ns` nanoseconds, for long wires or level shifters
    /// that can't keep up with the datasheet timing.
    pub fn with_half_period_ns(mut self, half_period_ns: u32) -> Self {
        self.half_period_ns = half_period_ns;
        self
    }

    /// Give back the pins and delay
    pub fn release(self) -> (Clk, Din, Cs, Delay) {
        (self.clock, self.data, self.chip_select, self.delay)
    }

    /// Shift the byte value out on the DIN pin, MSB first.  DIN is set while CLK is low, and the
    /// MAX7219 reads it on the rising edge of CLK.
    fn shift_byte_out(&mut self, b: u8) -> Result<(), Clk::Error> {
        for bit in (0..8).rev() {
            let value = (b >> bit) & 1 != 0;

            self.data.set_state(PinState::from(value))?;
            self.delay.delay_ns(self.half_period_ns);

            self.clock.set_high()?;
            self.delay.delay_ns(self.half_period_ns);
            self.clock.set_low()?;
        }

        Ok(())
    }
}

impl<Clk, Din, Cs, Delay> BusDriver for BitBangingBusDriver<Clk, Din, Cs, Delay>
where
    Clk: OutputPin,
    Din: OutputPin<Error = Clk::Error>,
    Cs: OutputPin<Error = Clk::Error>,
    Delay: DelayNs,
{
    type Error = Clk::Error;

    fn reset(&mut self) -> Result<(), Self::Error> {
        self.chip_select.set_high()?;
        self.clock.set_low()
    }

    fn select(&mut self) -> Result<(), Self::Error> {
        self.chip_select.set_low()
    }

    fn transfer_word_pair(&mut self, register: u8, value: u8) -> Result<(), Self::Error> {
        #[cfg(feature = "defmt")]
        defmt::trace!("word = {=u8:x} {=u8:x}", register, value);

        self.shift_byte_out(register)?;
        self.shift_byte_out(value)
    }

    fn latch(&mut self) -> Result<(), Self::Error> {
        self.chip_select.set_high()
    }
}

/// Failure in one of the two peripherals used by [`SpiBusDriver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiBusError<SpiError, PinError> {
    /// The SPI bus failed to transfer
    Spi(SpiError),
    /// The chip select pin could not be set
    Pin(PinError),
}

/// Implementation of [`BusDriver`] on top of a hardware SPI peripheral, with chip select on a
/// separate GPIO pin.
///
/// CS is driven by hand rather than through `SpiDevice`, because it has to stay low across all of
/// the words in a daisy-chain frame.  The bus must be configured with [`SPI_MODE`], MSB first, at
/// no more than [`SPI_FREQUENCY_HZ`].
pub struct SpiBusDriver<Spi, Cs> {
    spi: Spi,
    chip_select: Cs,
}

impl<Spi: SpiBus, Cs: OutputPin> SpiBusDriver<Spi, Cs> {
    pub fn new(spi: Spi, chip_select: Cs) -> Self {
        Self { spi, chip_select }
    }

    /// Give back the SPI bus and chip select pin
    pub fn release(self) -> (Spi, Cs) {
        (self.spi, self.chip_select)
    }
}

impl<Spi: SpiBus, Cs: OutputPin> BusDriver for SpiBusDriver<Spi, Cs> {
    type Error = SpiBusError<Spi::Error, Cs::Error>;

    fn reset(&mut self) -> Result<(), Self::Error> {
        self.chip_select.set_high().map_err(SpiBusError::Pin)
    }

    fn select(&mut self) -> Result<(), Self::Error> {
        self.chip_select.set_low().map_err(SpiBusError::Pin)
    }

    fn transfer_word_pair(&mut self, register: u8, value: u8) -> Result<(), Self::Error> {
        #[cfg(feature = "defmt")]
        defmt::trace!("word = {=u8:x} {=u8:x}", register, value);

        self.spi.write(&[register, value]).map_err(SpiBusError::Spi)
    }

    fn latch(&mut self) -> Result<(), Self::Error> {
        // Writes may still be queued in the peripheral's FIFO.  CS goes high even if the flush
        // fails, otherwise the next frame would be shifted in on top of this one.
        let flushed = self.spi.flush().map_err(SpiBusError::Spi);
        let raised = self.chip_select.set_high().map_err(SpiBusError::Pin);

        flushed.and(raised)
    }
}

#[cfg(all(feature = "embassy-rp", feature = "embassy-time"))]
mod embassy_rp_bus_driver {
    use embassy_rp::gpio;

    /// [`super::BitBangingBusDriver`] on Embassy RP HAL pins for the RP2040, paced by
    /// `embassy-time`.
    pub type EmbassyRpBusDriver<'a, ClockPin, DataPin, CsPin> = super::BitBangingBusDriver<
        gpio::Output<'a, ClockPin>,
        gpio::Output<'a, DataPin>,
        gpio::Output<'a, CsPin>,
        embassy_time::Delay,
    >;

    impl<'a, ClockPin: gpio::Pin, DataPin: gpio::Pin, CsPin: gpio::Pin>
        EmbassyRpBusDriver<'a, ClockPin, DataPin, CsPin>
    {
        /// Take ownership of the three pins, starting out in the idle state
        pub fn from_embassy_rp_pins(clock: ClockPin, data: DataPin, chip_select: CsPin) -> Self {
            Self::new(
                gpio::Output::new(clock, gpio::Level::Low),
                gpio::Output::new(data, gpio::Level::Low),
                gpio::Output::new(chip_select, gpio::Level::High),
                embassy_time::Delay,
            )
        }
    }
}

#[cfg(all(feature = "embassy-rp", feature = "embassy-time"))]
pub use embassy_rp_bus_driver::EmbassyRpBusDriver;
