//! Embassy async tasks
//!
//! Each task runs independently; the network and display sides only meet
//! in the banner queue and the front frame buffer.

pub mod display;
pub mod heartbeat;
pub mod network;
pub mod panel;
pub mod wifi;

pub use display::display_task;
pub use heartbeat::heartbeat_task;
pub use network::{network_task, NetworkContext};
pub use panel::panel_task;
pub use wifi::{cyw43_task, net_task};
