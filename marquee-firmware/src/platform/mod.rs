//! Board implementations of the core traits
//!
//! - `EmbassyClock`: `Clock` on the embassy time driver
//! - `HeapFence`: `Reclaimer` fencing the global heap during scrolls
//! - `WifiLink`: `LinkControl` over the CYW43439 and embassy-net
//! - `TcpTransport`: MQTT `Transport` over an embassy-net TCP socket

pub mod clock;
pub mod heap;
pub mod tcp;
pub mod wifi;

pub use clock::EmbassyClock;
pub use heap::{FencedHeap, HeapFence};
pub use tcp::TcpTransport;
pub use wifi::WifiLink;
