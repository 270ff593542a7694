//! Byte stream to the broker

use embedded_io_async::{Read, Write};

/// Reconnectable byte stream
///
/// `open` resolves the broker and establishes a fresh stream; any previous
/// stream must already be closed.
#[allow(async_fn_in_trait)]
pub trait Transport: Read + Write {
    /// Establish the stream
    async fn open(&mut self) -> Result<(), Self::Error>;

    /// Tear the stream down; never fails
    async fn close(&mut self);
}
