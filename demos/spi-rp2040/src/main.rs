//! Example of driving a single MAX7219 from the SPI0 peripheral of an RP2040 board like the Pi
//! Pico

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::spi::{Config, Phase, Polarity, Spi};
use embassy_time::Timer;
use embedded_hal_1::spi;
use max7219::{Justify, Max7219};
use {defmt_rtt as _, panic_probe as _};

const MESSAGES: &[&str] = &["HELLO", "3.14159", "-12.5", "#$%&'()*", "...", "LONG ENOUGH TO SCROLL"];

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    // The peripheral shifts MSB first, which is what the MAX7219 wants
    let mut config = Config::default();
    config.frequency = max7219::SPI_FREQUENCY_HZ;
    config.phase = match max7219::SPI_MODE.phase {
        spi::Phase::CaptureOnFirstTransition => Phase::CaptureOnFirstTransition,
        spi::Phase::CaptureOnSecondTransition => Phase::CaptureOnSecondTransition,
    };
    config.polarity = match max7219::SPI_MODE.polarity {
        spi::Polarity::IdleLow => Polarity::IdleLow,
        spi::Polarity::IdleHigh => Polarity::IdleHigh,
    };

    // SCK on GPIO 18, MOSI (DIN) on GPIO 19, CS on GPIO 17
    let spi = Spi::new_blocking_txonly(p.SPI0, p.PIN_18, p.PIN_19, config);
    let cs = Output::new(p.PIN_17, Level::High);

    let mut display = Max7219::builder().with_spi(spi, cs).build();
    unwrap!(display.init());

    let mut brightness = 0u8;

    loop {
        for message in MESSAGES {
            info!("showing {=str}", *message);

            for justify in [Justify::Left, Justify::Right] {
                unwrap!(display.clear());
                unwrap!(display.display_text(message, justify));
                Timer::after_secs(1).await;
            }
        }

        brightness = (brightness + 4) % (max7219::MAX_BRIGHTNESS + 1);
        unwrap!(display.set_brightness(brightness));
    }
}
