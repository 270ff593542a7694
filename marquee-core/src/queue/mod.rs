//! Banner hand-off between the network and display activities
//!
//! The network side is the only producer and the animation engine the only
//! consumer. Two interchangeable transports are provided:
//!
//! - [`MessageQueue`]: unbounded FIFO, every message is shown once in
//!   arrival order
//! - [`StatusCell`]: single slot, the latest status wins and repeats of the
//!   current text are ignored

mod fifo;
mod status;

use alloc::string::String;

use crate::color::Rgb;

pub use fifo::MessageQueue;
pub use status::StatusCell;

/// One banner to display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    /// Background color chosen by the producer
    pub color: Rgb,
}

impl Message {
    pub fn new(text: impl Into<String>, color: Rgb) -> Self {
        Self {
            text: text.into(),
            color,
        }
    }
}

/// Producer side of a banner transport
pub trait BannerSink {
    /// Hand a message to the display side; never blocks and never fails
    fn post(&self, message: Message);
}

/// Consumer side of a banner transport
#[allow(async_fn_in_trait)]
pub trait BannerSource {
    /// Wait until a message is available and take it
    async fn next(&self) -> Message;
}

impl<T: BannerSink + ?Sized> BannerSink for &T {
    fn post(&self, message: Message) {
        (**self).post(message)
    }
}
