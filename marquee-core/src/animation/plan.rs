use core::iter::Rev;
use core::ops::RangeInclusive;

use crate::config::AnimationConfig;

/// Pixels past the top edge the block travels before a scroll-out ends
pub const EXIT_MARGIN: i32 = 2;

/// Animation phases of one display cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Waiting for the next message
    Idle,
    /// Message taken and laid out
    Loaded,
    /// Scrolling up from the bottom edge to the centered offset
    ScrollIn,
    /// Static at the centered offset
    Hold,
    /// Scrolling up from center until fully off screen
    ScrollOut,
    /// Single bottom-to-top crawl for content taller than the panel
    Continuous,
    /// Solid background frame shown after the text has left
    PostHold,
}

/// Rendering policy picked from content height
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Policy {
    /// Scroll in, hold centered, scroll out
    Centered,
    /// One continuous scroll with no pause
    Continuous,
}

/// Vertical offsets of one cycle
///
/// Offsets are the y coordinate of the first line's top edge. Every scroll
/// moves exactly one pixel per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CyclePlan {
    pub policy: Policy,
    /// First offset drawn (just below the bottom edge)
    pub start_y: i32,
    /// Offset at which a centered block holds
    pub center_y: i32,
    /// Scrolling stops once the offset reaches this value
    pub end_y: i32,
}

impl CyclePlan {
    /// Plan a cycle for a block of `total_height` on a panel of `display_height`
    pub fn new(total_height: i32, display_height: i32) -> Self {
        let policy = if total_height > display_height {
            Policy::Continuous
        } else {
            Policy::Centered
        };

        Self {
            policy,
            start_y: display_height,
            center_y: (display_height - total_height) / 2,
            end_y: -(total_height + EXIT_MARGIN),
        }
    }

    /// Offsets drawn while scrolling in; the centered offset itself is the hold frame
    pub fn scroll_in(&self) -> Rev<RangeInclusive<i32>> {
        descend(self.start_y, self.center_y)
    }

    /// Offsets drawn while scrolling out, starting at the centered offset
    pub fn scroll_out(&self) -> Rev<RangeInclusive<i32>> {
        descend(self.center_y, self.end_y)
    }

    /// Offsets drawn by the continuous crawl
    pub fn continuous(&self) -> Rev<RangeInclusive<i32>> {
        descend(self.start_y, self.end_y)
    }
}

/// `from, from - 1, ...` while the value stays above `until`
fn descend(from: i32, until: i32) -> Rev<RangeInclusive<i32>> {
    (until.saturating_add(1)..=from).rev()
}

/// Cycle timing in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timing {
    /// Target period of one scroll step
    pub step_interval_ms: u32,
    /// Shortest sleep between steps, never below 1
    pub min_step_delay_ms: u32,
    /// Time a centered block stays still
    pub hold_ms: u32,
    /// Time the solid background frame is shown; 0 skips the phase
    pub post_scroll_ms: u32,
}

impl Timing {
    /// Sleep after a step whose drawing took `draw_cost_ms`
    ///
    /// The interval absorbs the draw cost so scroll speed stays constant.
    pub fn step_delay(&self, draw_cost_ms: u64) -> u32 {
        let floor = self.min_step_delay_ms.max(1);
        let remaining = (self.step_interval_ms as u64).saturating_sub(draw_cost_ms);
        remaining.max(floor as u64) as u32
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::from(&AnimationConfig::default())
    }
}

impl From<&AnimationConfig> for Timing {
    fn from(config: &AnimationConfig) -> Self {
        Self {
            step_interval_ms: config.step_interval_ms,
            min_step_delay_ms: config.min_step_delay_ms.max(1),
            hold_ms: config.hold_s as u32 * 1000,
            post_scroll_ms: config.post_scroll_s as u32 * 1000,
        }
    }
}
