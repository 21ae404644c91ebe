//! Addressing individual chips in a daisy chain of MAX7219s.
//!
//! The chips in a chain are wired DOUT to DIN, so every word shifted into the first chip pushes
//! the word it was holding out to the next one.  When chip select rises, every chip latches the
//! word it holds at that moment.  There is no per-chip address on the wire; instead each frame is
//! exactly one word per chip, and the chips which should be left alone receive a no-op word.
use core::num::NonZeroU8;

use crate::{BusDriver, Register};

/// Number of digits driven by each chip
pub const DIGITS_PER_CHIP: usize = 8;

/// Data byte sent along with [`Register::NoOp`]
const NO_OP_DATA: u8 = 0x00;

/// The number of MAX7219 chips daisy chained on one bus.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChainLength(NonZeroU8);

impl ChainLength {
    /// A single chip, no chaining
    pub const SINGLE: Self = Self(NonZeroU8::MIN);

    /// Returns `None` if `chips` is zero
    pub const fn new(chips: u8) -> Option<Self> {
        match NonZeroU8::new(chips) {
            Some(chips) => Some(Self(chips)),
            None => None,
        }
    }

    /// Number of chips in the chain
    pub const fn chips(&self) -> usize {
        self.0.get() as usize
    }

    /// Number of digits across the whole chain
    pub const fn digits(&self) -> usize {
        self.chips() * DIGITS_PER_CHIP
    }
}

impl Default for ChainLength {
    fn default() -> Self {
        Self::SINGLE
    }
}

/// Send one frame which writes `value` to `register` on the chip at `chip_index`, and a no-op to
/// every other chip.
///
/// The first word sent ends up furthest down the chain, so `chip_index` words of padding go out
/// before the real word and the rest of the padding after it.  A `chip_index` past the end of
/// the chain produces a frame of nothing but no-ops.
pub fn write<D: BusDriver>(
    driver: &mut D,
    chain: ChainLength,
    chip_index: usize,
    register: Register,
    value: u8,
) -> Result<(), D::Error> {
    #[cfg(feature = "defmt")]
    defmt::trace!(
        "write chip {=usize}/{=usize}: {} = {=u8:x}",
        chip_index,
        chain.chips(),
        register,
        value
    );

    send_frame(driver, chain, |index| {
        if index == chip_index {
            (register, value)
        } else {
            (Register::NoOp, NO_OP_DATA)
        }
    })
}

/// Send one frame which writes `value` to `register` on every chip in the chain.
pub fn broadcast<D: BusDriver>(
    driver: &mut D,
    chain: ChainLength,
    register: Register,
    value: u8,
) -> Result<(), D::Error> {
    #[cfg(feature = "defmt")]
    defmt::trace!(
        "broadcast to {=usize} chips: {} = {=u8:x}",
        chain.chips(),
        register,
        value
    );

    send_frame(driver, chain, |_| (register, value))
}

/// Shift one word per chip out between a single select and latch.
///
/// If a transfer fails, the words already in the chain are no longer where they should be, so a
/// whole chain's worth of no-ops is shifted in behind them before latching.  Every chip then
/// latches a no-op rather than a word meant for another chip.  The latch is attempted even if
/// that flush fails too, so the bus isn't left selected; the first error is the one reported.
fn send_frame<D: BusDriver>(
    driver: &mut D,
    chain: ChainLength,
    word_for: impl Fn(usize) -> (Register, u8),
) -> Result<(), D::Error> {
    driver.select()?;

    let transferred = (0..chain.chips()).try_for_each(|index| {
        let (register, value) = word_for(index);
        driver.transfer_word_pair(register.addr(), value)
    });

    if transferred.is_err() {
        #[cfg(feature = "defmt")]
        defmt::debug!("transfer failed, flushing the chain with no-ops");

        for _ in 0..chain.chips() {
            // Already failing; the first error is the one to report
            let _ = driver.transfer_word_pair(Register::NoOp.addr(), NO_OP_DATA);
        }
    }

    let latched = driver.latch();

    transferred.and(latched)
}
