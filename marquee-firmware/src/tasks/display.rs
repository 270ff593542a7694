//! Banner animation task
//!
//! Takes one banner at a time from the shared queue and plays its full
//! scroll cycle. Cycle faults are reported here and never end the loop.

use defmt::*;
use embassy_time::Delay;

use marquee_core::animation::{Animator, CycleReport, Phase};
use marquee_core::{BannerSource, Message};
use marquee_display::{DisplayError, PanelSurface};

use crate::channels::{Banners, Frame, PANEL_HEIGHT, PANEL_WIDTH};
use crate::platform::{EmbassyClock, HeapFence};

/// Surface drawing into the shared front frame
pub type BannerSurface = PanelSurface<&'static Frame, PANEL_WIDTH, PANEL_HEIGHT>;

pub type BannerAnimator = Animator<BannerSurface, Delay, EmbassyClock, HeapFence>;

#[embassy_executor::task]
pub async fn display_task(mut animator: BannerAnimator, banners: &'static Banners) {
    info!("Display task started");

    if let Err(e) = animator.rest() {
        warn!("Initial clear failed: {:?}", e);
    }

    animator.run(banners, log_cycle).await
}

fn log_cycle(message: &Message, report: &CycleReport<DisplayError>) {
    let text = message.text.as_str();
    if report.is_clean() {
        debug!(
            "Shown '{}': {} lines, {:?}, {} steps, held={}",
            text,
            report.lines,
            report.policy,
            report.steps,
            report.entered(Phase::Hold)
        );
    } else {
        warn!(
            "Cycle for '{}' failed: outcome={:?} rest={:?} phases={:?}",
            text,
            report.outcome,
            report.rest,
            report.phases.as_slice()
        );
    }
}
