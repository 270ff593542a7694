//! Hardware abstraction traits
//!
//! These traits define the interface between the banner logic and the
//! board-specific implementations living in the driver, display and
//! firmware crates.

pub mod clock;
pub mod indicator;
pub mod reclaim;
pub mod session;
pub mod surface;

pub use clock::Clock;
pub use indicator::Indicator;
pub use reclaim::{NoReclaim, Reclaimer};
pub use session::{LinkControl, MessagingSession, SessionEvent};
pub use surface::Surface;
