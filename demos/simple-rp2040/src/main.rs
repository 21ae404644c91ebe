//! Example of driving two chained MAX7219s on an RP2040 board like the Pi Pico, bit-banging the
//! bus on plain GPIO pins

#![no_std]
#![no_main]

use core::fmt::Write;

use defmt::*;
use embassy_executor::Spawner;
use embassy_time::Timer;
use heapless::String;
use max7219::{ChainLength, Justify, Max7219};
use {defmt_rtt as _, panic_probe as _};

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    // CLK on GPIO 6, DIN on GPIO 7, CS on GPIO 8
    let mut display = Max7219::builder()
        .with_embassy_rp_pins(p.PIN_6, p.PIN_7, p.PIN_8)
        .with_chain_length(unwrap!(ChainLength::new(2)))
        .build();
    unwrap!(display.init());

    unwrap!(display.display_text("HELLO", Justify::Left));
    Timer::after_secs(2).await;
    unwrap!(display.clear());

    let mut text: String<32> = String::new();
    let mut hundredths: u32 = 0;

    loop {
        // Count up in seconds with two decimal places.  The text only ever gets longer, so there
        // is nothing left over to clear on the left.
        text.clear();
        unwrap!(write!(text, "{}.{:02}", hundredths / 100, hundredths % 100).map_err(|_| ()));

        debug!("showing {=str}", text.as_str());

        unwrap!(display.display_text(&text, Justify::Right));

        hundredths = hundredths.wrapping_add(1);
        Timer::after_millis(10).await;
    }
}
