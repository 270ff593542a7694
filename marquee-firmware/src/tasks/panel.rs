//! HUB75 refresh task
//!
//! Scans the front frame onto the panel forever. It never waits on the
//! animation side; flips land between refresh passes.

use defmt::*;
use embassy_rp::peripherals::PIO1;
use embassy_time::Timer;

use marquee_hal_rp2040::Hub75;

use crate::channels::{FRONT_FRAME, PANEL_HEIGHT, PANEL_WIDTH};

/// Refresh retry delay after a driver error
const RETRY_DELAY_MS: u64 = 1000;

pub type Panel = Hub75<'static, PIO1, 0>;

#[embassy_executor::task]
pub async fn panel_task(mut panel: Panel) {
    info!("Panel task started");
    let timing = *panel.timing();
    info!(
        "HUB75: {} planes, ~{} Hz refresh",
        timing.planes,
        timing.refresh_hz(PANEL_WIDTH, PANEL_HEIGHT / 2)
    );

    loop {
        let error = panel.run(&FRONT_FRAME).await;
        error!("Panel refresh stopped: {:?}", error);
        Timer::after_millis(RETRY_DELAY_MS).await;
    }
}
