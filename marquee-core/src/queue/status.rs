use alloc::string::String;
use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;

use super::{BannerSink, BannerSource, Message};

/// Single-slot, latest-wins banner hand-off
///
/// A newer post replaces one the display has not picked up yet. Posting
/// the text that was posted last is ignored, so a status that keeps being
/// reported does not replay.
pub struct StatusCell<M: RawMutex> {
    latest: Signal<M, Message>,
    last_text: Mutex<M, RefCell<Option<String>>>,
}

impl<M: RawMutex> StatusCell<M> {
    /// Create an empty cell (usable in a `static`)
    pub const fn new() -> Self {
        Self {
            latest: Signal::new(),
            last_text: Mutex::new(RefCell::new(None)),
        }
    }

    /// Replace the pending status; returns false if the text repeats the last post
    pub fn update(&self, message: Message) -> bool {
        let fresh = self.last_text.lock(|last| {
            let mut last = last.borrow_mut();
            if last.as_deref() == Some(message.text.as_str()) {
                false
            } else {
                *last = Some(message.text.clone());
                true
            }
        });
        if fresh {
            self.latest.signal(message);
        }
        fresh
    }

    /// Take the pending status without waiting
    pub fn try_take(&self) -> Option<Message> {
        self.latest.try_take()
    }

    pub fn is_pending(&self) -> bool {
        self.latest.signaled()
    }
}

impl<M: RawMutex> Default for StatusCell<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> BannerSink for StatusCell<M> {
    fn post(&self, message: Message) {
        self.update(message);
    }
}

impl<M: RawMutex> BannerSource for StatusCell<M> {
    async fn next(&self) -> Message {
        self.latest.wait().await
    }
}
