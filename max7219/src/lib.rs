#![cfg_attr(not(test), no_std)]

mod bus;
mod chain;
mod font;
mod layout;

pub use bus::*;
pub use chain::{ChainLength, DIGITS_PER_CHIP};
pub use font::{encode, glyph, DOT_MASK};
pub use layout::{logical_len, logical_offset, Justify, Layout, Placement};

use embedded_hal_1::delay::DelayNs;
use embedded_hal_1::digital::OutputPin;
use embedded_hal_1::spi::SpiBus;

/// Brightness passed to [`Max7219::set_brightness`] by [`Max7219::init`]
pub const MAX_BRIGHTNESS: u8 = 0x0f;

pub struct Max7219Builder {
    chain_length: ChainLength,
}

impl Max7219Builder {
    /// Number of chips daisy chained on the bus.  Defaults to one.
    pub fn with_chain_length(self, chain_length: ChainLength) -> Self {
        Self { chain_length }
    }

    /// Use an arbitrary [`BusDriver`] implementation; nothing more needs to be specified!
    pub fn with_bus_driver<D: BusDriver>(self, driver: D) -> Max7219Builder1<D> {
        Max7219Builder1 {
            driver,
            chain_length: self.chain_length,
        }
    }

    /// Use the bit-banging driver, with any `embedded-hal` output pins for CLK, DIN and CS, and a
    /// delay to pace the clock.
    pub fn with_bit_banging_pins<Clk, Din, Cs, Delay>(
        self,
        clock: Clk,
        data: Din,
        chip_select: Cs,
        delay: Delay,
    ) -> Max7219Builder1<BitBangingBusDriver<Clk, Din, Cs, Delay>>
    where
        Clk: OutputPin,
        Din: OutputPin<Error = Clk::Error>,
        Cs: OutputPin<Error = Clk::Error>,
        Delay: DelayNs,
    {
        self.with_bus_driver(BitBangingBusDriver::new(clock, data, chip_select, delay))
    }

    /// Use a hardware SPI bus, with chip select on a separate GPIO pin.
    ///
    /// See [`SpiBusDriver`] for how the bus needs to be configured.
    pub fn with_spi<Spi: SpiBus, Cs: OutputPin>(
        self,
        spi: Spi,
        chip_select: Cs,
    ) -> Max7219Builder1<SpiBusDriver<Spi, Cs>> {
        self.with_bus_driver(SpiBusDriver::new(spi, chip_select))
    }

    /// Use a bit-banging driver talking to the specified Embassy RP HAL pins
    #[cfg(all(feature = "embassy-rp", feature = "embassy-time"))]
    pub fn with_embassy_rp_pins<
        'a,
        ClockPin: embassy_rp::gpio::Pin,
        DataPin: embassy_rp::gpio::Pin,
        CsPin: embassy_rp::gpio::Pin,
    >(
        self,
        clock: ClockPin,
        data: DataPin,
        chip_select: CsPin,
    ) -> Max7219Builder1<EmbassyRpBusDriver<'a, ClockPin, DataPin, CsPin>> {
        self.with_bus_driver(EmbassyRpBusDriver::from_embassy_rp_pins(
            clock,
            data,
            chip_select,
        ))
    }
}

pub struct Max7219Builder1<D: BusDriver> {
    driver: D,
    chain_length: ChainLength,
}

impl<D: BusDriver> Max7219Builder1<D> {
    /// Number of chips daisy chained on the bus.  Defaults to one.
    pub fn with_chain_length(self, chain_length: ChainLength) -> Self {
        Self {
            chain_length,
            ..self
        }
    }

    /// Construct the [`Max7219`] instance using the selected driver.
    ///
    /// Nothing is sent to the chips until [`Max7219::init`] is called.
    pub fn build(self) -> Max7219<D> {
        Max7219::new(self.driver, self.chain_length)
    }
}

/// Driver for a daisy chain of MAX7219 LED controllers, each wired to 8 7-segment digits.
///
/// The digits of the whole chain are numbered from `0`, the right-most digit of the first chip,
/// up to `8 * chips - 1`.  Digit `8` is the right-most digit of the second chip, and so on.
///
/// The implementation is generalized over the implementation of the underlying bus, behind the
/// [`BusDriver`] trait, so the same code can drive the chips through bit-banged GPIO or a
/// hardware SPI peripheral.
///
/// The most straightforward way to instantiate this driver is using [`Self::builder`], for
/// example with the `embassy-rp` HAL and `embassy-time` for the RP2040:
///
/// ```
/// # #[cfg(all(feature = "embassy-time", feature = "embassy-rp"))]
/// # {
/// let p = embassy_rp::init(Default::default());
/// let mut display = max7219::Max7219::builder()
///     .with_embassy_rp_pins(p.PIN_6, p.PIN_7, p.PIN_8)
///     .with_chain_length(max7219::ChainLength::new(2).unwrap())
///     .build();
/// display.init().unwrap();
/// display.display_text("HELLO", max7219::Justify::Left).unwrap();
/// # }
/// ```
///
/// Every operation blocks until its frames are on the wire.  The driver owns the bus, so sharing
/// one chain between tasks needs a mutex around the whole driver.
pub struct Max7219<Driver> {
    driver: Driver,
    chain_length: ChainLength,
}

impl Max7219<()> {
    /// Return a builder pattern implementation to ease some of the type parameter complexity
    /// around creating the bus driver.
    ///
    /// This is not required; you can always instantiate the driver with [`Max7219::new`], but you
    /// might have to type more angle brackets to do so.
    pub fn builder() -> Max7219Builder {
        Max7219Builder {
            chain_length: ChainLength::SINGLE,
        }
    }
}

impl<Driver: BusDriver> Max7219<Driver> {
    pub fn new(driver: Driver, chain_length: ChainLength) -> Self {
        Self {
            driver,
            chain_length,
        }
    }

    /// Number of chips in the chain
    pub fn chain_length(&self) -> ChainLength {
        self.chain_length
    }

    /// Number of digits across all chips in the chain
    pub fn digit_count(&self) -> usize {
        self.chain_length.digits()
    }

    /// Give back the bus driver
    pub fn release(self) -> Driver {
        self.driver
    }

    /// Bring every chip in the chain out of its power-on state: scanning all 8 digits, no BCD
    /// decoding, out of shutdown and display test, blank, and at full brightness.
    pub fn init(&mut self) -> Result<(), Driver::Error> {
        self.driver.reset()?;

        self.broadcast_command(WriteCommand::ScanAllDigits)?;
        self.broadcast_command(WriteCommand::DisableDecode)?;
        self.wake()?;
        self.set_display_test(false)?;
        self.clear()?;
        self.set_brightness(MAX_BRIGHTNESS)
    }

    /// Set the brightness of every chip.
    ///
    /// The brightness is a value from 0 (lowest brightness) to 15 (highest brightness).  Only the
    /// low 4 bits are used.
    pub fn set_brightness(&mut self, brightness: u8) -> Result<(), Driver::Error> {
        self.broadcast_command(WriteCommand::SetBrightness { brightness })
    }

    /// Blank every digit on every chip
    pub fn clear(&mut self) -> Result<(), Driver::Error> {
        for digit in 0..DIGITS_PER_CHIP as u8 {
            self.broadcast_command(WriteCommand::WriteDigit {
                digit,
                segment_mask: 0x00,
            })?;
        }

        Ok(())
    }

    /// Turn off every chip's display.  Digit contents are kept and reappear after [`Self::wake`].
    pub fn shutdown(&mut self) -> Result<(), Driver::Error> {
        self.broadcast_command(WriteCommand::Shutdown)
    }

    /// Leave shutdown mode
    pub fn wake(&mut self) -> Result<(), Driver::Error> {
        self.broadcast_command(WriteCommand::Wake)
    }

    /// With `on` set, light every segment of every digit regardless of contents
    pub fn set_display_test(&mut self, on: bool) -> Result<(), Driver::Error> {
        self.broadcast_command(WriteCommand::DisplayTest { on })
    }

    /// Set the digit at `position` to the value `mask`.
    ///
    /// `mask` is a bitmask with the decimal point in the most significant bit and segments A
    /// through G in the rest, see [`encode`].  Only the chip which owns `position` is written.
    pub fn display_mask(&mut self, position: usize, mask: u8) -> Result<(), Driver::Error> {
        let chip_index = position / DIGITS_PER_CHIP;
        let digit = (position % DIGITS_PER_CHIP) as u8;

        self.write_command_to_chip(
            chip_index,
            WriteCommand::WriteDigit {
                digit,
                segment_mask: mask,
            },
        )
    }

    /// Draw `character` on the digit at `position`, lighting the decimal point if `dot` is set.
    ///
    /// Chars the font doesn't have come out blank.  `position` must be less than
    /// [`Self::digit_count`]; beyond that nothing is written to any chip.
    pub fn display_char(
        &mut self,
        position: usize,
        character: char,
        dot: bool,
    ) -> Result<(), Driver::Error> {
        self.display_mask(position, font::encode(character, dot))
    }

    /// Draw `text` across the whole chain.
    ///
    /// A `.` is folded into the decimal point of the char before it.  Text which doesn't fit is
    /// cut off at the end for [`Justify::Left`] or at the start for [`Justify::Right`].  Digits
    /// not covered by the text are left as they are, so call [`Self::clear`] first if needed.
    pub fn display_text(&mut self, text: &str, justify: Justify) -> Result<(), Driver::Error> {
        #[cfg(feature = "defmt")]
        defmt::debug!("display_text {=str} {}", text, justify);

        for placement in Layout::new(text, justify, self.digit_count()) {
            self.display_char(placement.position, placement.character, placement.dot)?;
        }

        Ok(())
    }

    /// Apply the command to every chip in the chain
    fn broadcast_command(&mut self, command: WriteCommand) -> Result<(), Driver::Error> {
        let (register, value) = command.encode();

        chain::broadcast(&mut self.driver, self.chain_length, register, value)
    }

    /// Apply the command to one chip, leaving the others alone
    fn write_command_to_chip(
        &mut self,
        chip_index: usize,
        command: WriteCommand,
    ) -> Result<(), Driver::Error> {
        let (register, value) = command.encode();

        chain::write(
            &mut self.driver,
            self.chain_length,
            chip_index,
            register,
            value,
        )
    }
}

/// The MAX7219 register map.  Every word sent to the chip is a register address followed by a
/// data byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::VariantArray, strum::FromRepr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Register {
    /// Passes through the chip without effect; used to pad daisy chain frames
    NoOp = 0x00,
    Digit0 = 0x01,
    Digit1 = 0x02,
    Digit2 = 0x03,
    Digit3 = 0x04,
    Digit4 = 0x05,
    Digit5 = 0x06,
    Digit6 = 0x07,
    Digit7 = 0x08,
    DecodeMode = 0x09,
    Intensity = 0x0a,
    ScanLimit = 0x0b,
    Shutdown = 0x0c,
    DisplayTest = 0x0f,
}

impl Register {
    const DIGITS: [Register; DIGITS_PER_CHIP] = [
        Register::Digit0,
        Register::Digit1,
        Register::Digit2,
        Register::Digit3,
        Register::Digit4,
        Register::Digit5,
        Register::Digit6,
        Register::Digit7,
    ];

    /// Data register for `digit` (0 to 7) of a chip.  Digit 0 is the right-most.
    pub fn digit(digit: u8) -> Self {
        Self::DIGITS[digit as usize % DIGITS_PER_CHIP]
    }

    /// Address byte sent on the wire
    pub fn addr(self) -> u8 {
        self as u8
    }
}

/// Represents the commands sent to the MAX7219 as Rust enums for greater readability.
enum WriteCommand {
    /// Display all 8 digits.  The scan limit register holds the index of the last digit scanned.
    ScanAllDigits,

    /// Treat digit data as raw segments rather than Code B BCD
    DisableDecode,

    /// Enter shutdown mode.  The display is blanked but digit data is kept.
    Shutdown,

    /// Return to normal operation
    Wake,

    /// Light every LED, or go back to showing the digit data
    DisplayTest { on: bool },

    SetBrightness {
        /// Brightness, in a range from 0 to 15.  If `brightness` is larger than this range it will
        /// be set to the value `brightness` mod 16.
        brightness: u8,
    },

    /// Set the segments of one digit
    WriteDigit {
        /// Digit on the chip, from 0 (right-most) to 7
        digit: u8,

        /// The bit mask controlling which segments on the display are illuminated
        segment_mask: u8,
    },
}

impl WriteCommand {
    /// Convert this command into the register and data byte to send to the controller.
    fn encode(&self) -> (Register, u8) {
        match self {
            WriteCommand::ScanAllDigits => (Register::ScanLimit, 0x07),
            WriteCommand::DisableDecode => (Register::DecodeMode, 0x00),
            WriteCommand::Shutdown => (Register::Shutdown, 0x00),
            WriteCommand::Wake => (Register::Shutdown, 0x01),
            WriteCommand::DisplayTest { on } => (Register::DisplayTest, *on as u8),
            WriteCommand::SetBrightness { brightness } => {
                (Register::Intensity, brightness & 0b0000_1111)
            }
            WriteCommand::WriteDigit {
                digit,
                segment_mask,
            } => {
                debug_assert!((*digit as usize) < DIGITS_PER_CHIP);
                (Register::digit(*digit), *segment_mask)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bus::test::{BusFault, RecordingBus, NOOP};
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::Mock as PinMock;
    use embedded_hal_mock::eh1::spi::Mock as SpiMock;
    use std::vec::Vec;
    use strum::VariantArray;

    fn display(chips: u8) -> Max7219<RecordingBus> {
        Max7219::builder()
            .with_bus_driver(RecordingBus::default())
            .with_chain_length(ChainLength::new(chips).unwrap())
            .build()
    }

    fn frames(display: &Max7219<RecordingBus>) -> &[Vec<(u8, u8)>] {
        &display.driver.frames
    }

    #[test]
    fn register_addresses() {
        for register in Register::VARIANTS {
            assert_eq!(Some(*register), Register::from_repr(register.addr()));
        }

        for digit in 0..8 {
            assert_eq!(digit + 1, Register::digit(digit).addr());
        }
    }

    #[test]
    fn builder_defaults_to_one_chip() {
        let display = Max7219::builder()
            .with_bus_driver(RecordingBus::default())
            .build();

        assert_eq!(ChainLength::SINGLE, display.chain_length());
        assert_eq!(8, display.digit_count());
    }

    #[test]
    fn builder_chain_length_before_or_after_the_bus() {
        let three = ChainLength::new(3).unwrap();

        let before = Max7219::builder()
            .with_chain_length(three)
            .with_bus_driver(RecordingBus::default())
            .build();
        let after = Max7219::builder()
            .with_bus_driver(RecordingBus::default())
            .with_chain_length(three)
            .build();

        assert_eq!(24, before.digit_count());
        assert_eq!(24, after.digit_count());
    }

    #[test]
    fn builder_wires_up_the_built_in_drivers() {
        // Building doesn't touch the bus, so the mocks expect nothing
        let mut clock = PinMock::new(&[]);
        let mut data = PinMock::new(&[]);
        let mut cs = PinMock::new(&[]);

        let display = Max7219::builder()
            .with_bit_banging_pins(clock.clone(), data.clone(), cs.clone(), NoopDelay::new())
            .build();
        drop(display.release());

        let mut spi = SpiMock::new(&[]);
        let display = Max7219::builder().with_spi(spi.clone(), cs.clone()).build();
        drop(display.release());

        clock.done();
        data.done();
        cs.done();
        spi.done();
    }

    #[test]
    fn init_sequence() {
        let mut display = display(2);
        display.init().unwrap();

        let mut expected = vec![
            vec![(0x0b, 0x07); 2],
            vec![(0x09, 0x00); 2],
            vec![(0x0c, 0x01); 2],
            vec![(0x0f, 0x00); 2],
        ];
        for register in 0x01..=0x08 {
            expected.push(vec![(register, 0x00); 2]);
        }
        expected.push(vec![(0x0a, 0x0f); 2]);

        assert_eq!(1, display.driver.resets);
        assert_eq!(frames(&display), expected);
    }

    #[test]
    fn brightness_is_masked() {
        let mut display = display(1);
        display.set_brightness(7).unwrap();
        display.set_brightness(0x1f).unwrap();

        assert_eq!(frames(&display), [vec![(0x0a, 0x07)], vec![(0x0a, 0x0f)]]);
    }

    #[test]
    fn clear_blanks_every_digit_on_every_chip() {
        let mut display = display(3);

        display.clear().unwrap();
        let first: Vec<_> = frames(&display).to_vec();

        display.clear().unwrap();
        let second = &frames(&display)[first.len()..];

        assert_eq!(8, first.len());
        assert_eq!(first, second);

        for (frame, register) in first.iter().zip(1u8..) {
            assert_eq!(frame, &vec![(register, 0x00); 3]);
        }
    }

    #[test]
    fn shutdown_and_display_test() {
        let mut display = display(2);
        display.shutdown().unwrap();
        display.wake().unwrap();
        display.set_display_test(true).unwrap();
        display.set_display_test(false).unwrap();

        assert_eq!(
            frames(&display),
            [
                vec![(0x0c, 0x00); 2],
                vec![(0x0c, 0x01); 2],
                vec![(0x0f, 0x01); 2],
                vec![(0x0f, 0x00); 2],
            ]
        );
    }

    #[test]
    fn display_char_addresses_one_chip() {
        // Position 9 is the second digit from the right on the second chip
        let mut display = display(2);
        display.display_char(9, 'A', false).unwrap();

        assert_eq!(frames(&display), [vec![NOOP, (0x02, 0x77)]]);
    }

    #[test]
    fn display_char_on_first_of_three_chips() {
        let mut display = display(3);
        display.display_char(7, '8', true).unwrap();

        assert_eq!(frames(&display), [vec![(0x08, 0xff), NOOP, NOOP]]);
    }

    #[test]
    fn display_char_unknown_is_blank() {
        let mut display = display(1);
        display.display_char(0, 'W', false).unwrap();
        display.display_char(1, 'W', true).unwrap();

        assert_eq!(frames(&display), [vec![(0x01, 0x00)], vec![(0x02, 0x80)]]);
    }

    #[test]
    fn display_mask_is_raw() {
        let mut display = display(2);
        display.display_mask(15, 0b1010_1010).unwrap();

        assert_eq!(frames(&display), [vec![NOOP, (0x08, 0b1010_1010)]]);
    }

    #[test]
    fn display_text_right_justified() {
        let mut display = display(1);
        display.display_text("1.2.3", Justify::Right).unwrap();

        assert_eq!(
            frames(&display),
            [
                vec![(0x03, 0b1011_0000)],
                vec![(0x02, 0b1110_1101)],
                vec![(0x01, 0b0111_1001)],
            ]
        );
    }

    #[test]
    fn display_text_truncates_to_the_last_digits() {
        let mut display = display(1);
        display.display_text("12345678901", Justify::Right).unwrap();

        let frames = frames(&display);
        assert_eq!(8, frames.len());

        // '4' on the left-most digit, '1' on the right-most
        assert_eq!(frames[0], [(0x08, font::encode('4', false))]);
        assert_eq!(frames[7], [(0x01, font::encode('1', false))]);
    }

    #[test]
    fn display_text_across_chips() {
        let mut display = display(2);
        display.display_text("HELLO", Justify::Left).unwrap();

        let frames = frames(&display);
        assert_eq!(5, frames.len());

        // All of it lands on the left-most 5 digits, which belong to the second chip
        for (frame, register) in frames.iter().zip([0x08, 0x07, 0x06, 0x05, 0x04]) {
            assert_eq!(NOOP, frame[0]);
            assert_eq!(register, frame[1].0);
        }

        assert_eq!(font::encode('H', false), frames[0][1].1);
        assert_eq!(font::encode('O', false), frames[4][1].1);
    }

    #[test]
    fn bus_errors_are_returned() {
        let mut display = Max7219::new(
            RecordingBus {
                fail_after: Some(0),
                ..Default::default()
            },
            ChainLength::SINGLE,
        );

        assert_eq!(Err(BusFault), display.display_char(0, '1', false));
        assert_eq!(Err(BusFault), display.display_text("12", Justify::Left));
        assert_eq!(Err(BusFault), display.init());
    }
}
