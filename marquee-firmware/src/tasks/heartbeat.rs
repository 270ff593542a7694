//! Liveness blinker
//!
//! Toggles the heartbeat LED every 500 ms whatever the network is doing.

use defmt::*;
use embassy_rp::gpio::Output;
use embassy_time::{Duration, Ticker};

use marquee_drivers::indicator::{GpioIndicator, Heartbeat, HEARTBEAT_PERIOD_MS};

/// Log a liveness line every this many beats (one minute)
const LOG_EVERY: u32 = 120;

#[embassy_executor::task]
pub async fn heartbeat_task(led: GpioIndicator<Output<'static>>) {
    info!("Heartbeat task started");

    let mut heartbeat = Heartbeat::new(led);
    let mut ticker = Ticker::every(Duration::from_millis(HEARTBEAT_PERIOD_MS));

    loop {
        ticker.next().await;
        heartbeat.beat();

        if heartbeat.beats() % LOG_EVERY == 0 {
            trace!("Heartbeat {}", heartbeat.beats());
        }
    }
}
