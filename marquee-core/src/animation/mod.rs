//! Banner animation engine
//!
//! One message at a time is taken from a banner source and driven through
//! its cycle:
//!
//! ```text
//! Idle -> Loaded -> ScrollIn -> Hold -> ScrollOut -> [PostHold] -> Idle
//!                \-> Continuous ---------------------> [PostHold] -> Idle
//! ```
//!
//! Messages short enough to fit are centered and held; taller ones crawl
//! through in a single continuous scroll. A cycle always runs to completion
//! (or failure) before the next message is considered, and always ends with
//! the panel back at the rest color.

mod engine;
mod frame;
mod guard;
mod plan;

pub use engine::{Animator, CycleReport, MAX_PHASES};
pub use frame::FrameStyle;
pub use guard::ReclaimGuard;
pub use plan::{CyclePlan, Phase, Policy, Timing, EXIT_MARGIN};
