use alloc::collections::VecDeque;
use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;

use super::{BannerSink, BannerSource, Message};

/// Unbounded single-producer/single-consumer FIFO of banners
///
/// With `CriticalSectionRawMutex` the queue is safe to share between the
/// two RP2040 cores. Entries are never mutated, reordered or replayed.
pub struct MessageQueue<M: RawMutex> {
    entries: Mutex<M, RefCell<VecDeque<Message>>>,
    /// Raised on every enqueue so a waiting consumer wakes up
    ready: Signal<M, ()>,
}

impl<M: RawMutex> MessageQueue<M> {
    /// Create an empty queue (usable in a `static`)
    pub const fn new() -> Self {
        Self {
            entries: Mutex::new(RefCell::new(VecDeque::new())),
            ready: Signal::new(),
        }
    }

    /// Append a message to the tail
    pub fn enqueue(&self, message: Message) {
        self.entries
            .lock(|entries| entries.borrow_mut().push_back(message));
        self.ready.signal(());
    }

    /// Remove and return the head, or `None` if the queue is empty
    pub fn try_dequeue(&self) -> Option<Message> {
        self.entries.lock(|entries| entries.borrow_mut().pop_front())
    }

    /// Wait for the head entry and remove it
    pub async fn dequeue(&self) -> Message {
        loop {
            if let Some(message) = self.try_dequeue() {
                return message;
            }
            // A signal raised between the check and this wait stays latched
            self.ready.wait().await;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock(|entries| entries.borrow().is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.lock(|entries| entries.borrow().len())
    }
}

impl<M: RawMutex> Default for MessageQueue<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> BannerSink for MessageQueue<M> {
    fn post(&self, message: Message) {
        self.enqueue(message);
    }
}

impl<M: RawMutex> BannerSource for MessageQueue<M> {
    async fn next(&self) -> Message {
        self.dequeue().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use alloc::format;
    use alloc::vec::Vec;
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use proptest::prelude::*;

    type Queue = MessageQueue<CriticalSectionRawMutex>;

    #[test]
    fn test_empty_queue() {
        let queue = Queue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.try_dequeue(), None);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let queue = Queue::new();
        queue.enqueue(Message::new("Same", Rgb::BLUE));
        queue.enqueue(Message::new("Same", Rgb::BLUE));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.try_dequeue().unwrap().text, "Same");
        assert_eq!(queue.try_dequeue().unwrap().text, "Same");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_dequeue_after_enqueue_does_not_wait() {
        let queue = Queue::new();
        queue.enqueue(Message::new("first", Rgb::RED));
        queue.enqueue(Message::new("second", Rgb::GREEN));

        let first = block_on(queue.dequeue());
        let second = block_on(queue.next());
        assert_eq!(first.text, "first");
        assert_eq!(second.color, Rgb::GREEN);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_cross_thread_fifo() {
        static QUEUE: Queue = Queue::new();
        const COUNT: usize = 200;

        let producer = std::thread::spawn(|| {
            for i in 0..COUNT {
                QUEUE.enqueue(Message::new(format!("msg {}", i), Rgb::BLUE));
            }
        });

        let received: Vec<Message> = (0..COUNT).map(|_| block_on(QUEUE.dequeue())).collect();
        producer.join().unwrap();

        for (i, message) in received.iter().enumerate() {
            assert_eq!(message.text, format!("msg {}", i));
        }
        assert!(QUEUE.is_empty());
    }

    proptest! {
        #[test]
        fn prop_fifo_without_loss_or_duplication(
            ops in proptest::collection::vec(proptest::option::of("[a-z]{0,8}"), 0..64),
        ) {
            // Some(text) enqueues, None dequeues
            let queue = Queue::new();
            let mut enqueued = Vec::new();
            let mut dequeued = Vec::new();

            for op in ops {
                match op {
                    Some(text) => {
                        enqueued.push(text.clone());
                        queue.enqueue(Message::new(text, Rgb::BLACK));
                    }
                    None => {
                        if let Some(message) = queue.try_dequeue() {
                            dequeued.push(message.text);
                        }
                    }
                }
            }
            while let Some(message) = queue.try_dequeue() {
                dequeued.push(message.text);
            }

            prop_assert_eq!(dequeued, enqueued);
        }
    }
}
