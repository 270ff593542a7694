//! Supervisor event handlers
//!
//! Every handler is synchronous: it updates the connection state, posts
//! the matching banner and tells the caller what to do next. Waiting and
//! I/O belong to the runner.

use alloc::string::String;

use marquee_protocol::topic;

use super::banners::Status;
use super::classify::KeywordTable;
use super::state::{ConnectionEvent, ConnectionState};
use crate::color::{Palette, Rgb};
use crate::config::{BannerConfig, NetworkConfig, ReconnectPolicy};
use crate::queue::{BannerSink, Message};

/// Reaction to a failed connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FailurePolicy {
    /// Post a retry banner and try again after `delay_ms`
    Backoff { delay_ms: u32 },
    /// Post a failure banner and restart once `grace_ms` has passed
    Restart { grace_ms: u32 },
}

impl FailurePolicy {
    pub fn from_config(config: &BannerConfig) -> Self {
        match config.reconnect.policy {
            ReconnectPolicy::Backoff => FailurePolicy::Backoff {
                delay_ms: config.backoff_ms(),
            },
            ReconnectPolicy::Restart => FailurePolicy::Restart {
                grace_ms: config.backoff_ms(),
            },
        }
    }
}

/// What the runner does after a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Directive {
    /// Wait this long, then attempt again
    RetryAfter(u32),
    /// Stop supervising; the device restarts after `grace_ms`
    Restart { grace_ms: u32 },
}

/// Why an inbound message produced no banner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Discard {
    /// Payload is not valid UTF-8
    InvalidUtf8,
    /// Payload is empty or whitespace only
    Empty,
    /// Topic does not match the subscribed filter
    TopicMismatch,
}

/// Subscription parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionParams<'a> {
    /// Topic filter subscribed after every connect
    pub filter: &'a str,
    pub qos: u8,
    /// Pause after every link transition
    pub link_settle_ms: u32,
}

impl<'a> From<&'a NetworkConfig> for SessionParams<'a> {
    fn from(config: &'a NetworkConfig) -> Self {
        Self {
            filter: config.topic.as_str(),
            qos: config.qos,
            link_settle_ms: config.link_settle_ms,
        }
    }
}

/// Connection bookkeeping and banner production
pub struct Supervisor<'a, B: BannerSink> {
    sink: B,
    palette: &'a Palette,
    keywords: &'a KeywordTable,
    params: SessionParams<'a>,
    policy: FailurePolicy,
    state: ConnectionState,
    retries: u32,
    link_up: bool,
}

impl<'a, B: BannerSink> Supervisor<'a, B> {
    pub fn new(
        sink: B,
        palette: &'a Palette,
        keywords: &'a KeywordTable,
        params: SessionParams<'a>,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            sink,
            palette,
            keywords,
            params,
            policy,
            state: ConnectionState::Disconnected,
            retries: 0,
            link_up: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Failed attempts since the last established session
    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn params(&self) -> SessionParams<'a> {
        self.params
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn link_up(&self) -> bool {
        self.link_up
    }

    fn announce(&self, status: Status) {
        self.sink.post(status.message(self.palette));
    }

    fn apply(&mut self, event: ConnectionEvent) {
        self.state = self.state.transition(event);
    }

    /// Post the boot banner
    pub fn announce_boot(&self) {
        self.announce(Status::Booting);
    }

    /// Record the link state
    ///
    /// Returns true on a transition, which is also when a banner is posted.
    pub fn on_link(&mut self, up: bool) -> bool {
        if up == self.link_up {
            return false;
        }
        self.link_up = up;
        self.announce(if up {
            Status::WifiConnected
        } else {
            Status::WifiLost
        });
        true
    }

    /// A connection attempt begins
    pub fn on_attempt(&mut self) {
        self.apply(ConnectionEvent::Attempt);
    }

    /// The subscription was confirmed
    pub fn on_established(&mut self) {
        self.apply(ConnectionEvent::Established);
        self.retries = 0;
        self.announce(Status::MqttReady);
    }

    /// The attempt failed at some stage
    pub fn on_failure(&mut self) -> Directive {
        self.apply(ConnectionEvent::Failed);
        self.retries = self.retries.saturating_add(1);
        match self.policy {
            FailurePolicy::Backoff { delay_ms } => {
                self.announce(Status::NetRetry);
                Directive::RetryAfter(delay_ms)
            }
            FailurePolicy::Restart { grace_ms } => {
                self.announce(Status::ConnectionFailed);
                Directive::Restart { grace_ms }
            }
        }
    }

    /// The established session dropped
    pub fn on_lost(&mut self) {
        self.apply(ConnectionEvent::Lost);
    }

    /// Turn an inbound publish into a banner
    ///
    /// Returns the chosen background color. Retained messages are shown
    /// like any other, so the retained flag never reaches this point.
    pub fn on_inbound(&mut self, topic: &str, payload: &[u8]) -> Result<Rgb, Discard> {
        if !topic::matches(self.params.filter, topic) {
            return Err(Discard::TopicMismatch);
        }
        let text = core::str::from_utf8(payload).map_err(|_| Discard::InvalidUtf8)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(Discard::Empty);
        }

        let color = self.keywords.classify(text);
        self.sink.post(Message::new(String::from(text), color));
        Ok(color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeywordConfig;
    use crate::queue::MessageQueue;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    const PARAMS: SessionParams<'static> = SessionParams {
        filter: "personal/ucfnaps/led/#",
        qos: 1,
        link_settle_ms: 1000,
    };

    fn fixtures() -> (Palette, KeywordTable) {
        let palette = Palette::default();
        let keywords = KeywordTable::from_config(&KeywordConfig::default(), &palette).unwrap();
        (palette, keywords)
    }

    fn texts(queue: &MessageQueue<NoopRawMutex>) -> std::vec::Vec<String> {
        let mut out = std::vec::Vec::new();
        while let Some(message) = queue.try_dequeue() {
            out.push(message.text);
        }
        out
    }

    #[test]
    fn test_inbound_is_classified_and_queued() {
        let (palette, keywords) = fixtures();
        let queue = MessageQueue::<NoopRawMutex>::new();
        let mut sup = Supervisor::new(
            &queue,
            &palette,
            &keywords,
            PARAMS,
            FailurePolicy::Backoff { delay_ms: 5000 },
        );

        let color = sup
            .on_inbound("personal/ucfnaps/led/news", b"News: hello")
            .unwrap();
        assert_eq!(color, Rgb::RED);

        let message = queue.try_dequeue().unwrap();
        assert_eq!(message.text, "News: hello");
        assert_eq!(message.color, Rgb::RED);
    }

    #[test]
    fn test_invalid_utf8_is_discarded() {
        let (palette, keywords) = fixtures();
        let queue = MessageQueue::<NoopRawMutex>::new();
        let mut sup = Supervisor::new(
            &queue,
            &palette,
            &keywords,
            PARAMS,
            FailurePolicy::Backoff { delay_ms: 5000 },
        );

        assert_eq!(
            sup.on_inbound("personal/ucfnaps/led/x", &[0xff, 0xfe]),
            Err(Discard::InvalidUtf8)
        );
        assert_eq!(
            sup.on_inbound("personal/ucfnaps/led/x", b"  "),
            Err(Discard::Empty)
        );
        assert_eq!(
            sup.on_inbound("other/led/x", b"News"),
            Err(Discard::TopicMismatch)
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_link_banners_only_on_transition() {
        let (palette, keywords) = fixtures();
        let queue = MessageQueue::<NoopRawMutex>::new();
        let mut sup = Supervisor::new(
            &queue,
            &palette,
            &keywords,
            PARAMS,
            FailurePolicy::Backoff { delay_ms: 5000 },
        );

        assert!(sup.on_link(true));
        assert!(!sup.on_link(true));
        assert!(sup.on_link(false));
        assert!(!sup.on_link(false));
        assert_eq!(texts(&queue), ["WiFi Connected", "WiFi Lost"]);
    }

    #[test]
    fn test_backoff_policy() {
        let (palette, keywords) = fixtures();
        let queue = MessageQueue::<NoopRawMutex>::new();
        let mut sup = Supervisor::new(
            &queue,
            &palette,
            &keywords,
            PARAMS,
            FailurePolicy::Backoff { delay_ms: 5000 },
        );

        sup.on_attempt();
        assert_eq!(sup.state(), ConnectionState::Connecting);
        assert_eq!(sup.on_failure(), Directive::RetryAfter(5000));
        assert_eq!(sup.state(), ConnectionState::Disconnected);
        assert_eq!(sup.retries(), 1);

        sup.on_attempt();
        sup.on_established();
        assert_eq!(sup.state(), ConnectionState::Connected);
        assert_eq!(sup.retries(), 0);

        sup.on_lost();
        assert_eq!(sup.state(), ConnectionState::Disconnected);
        assert_eq!(texts(&queue), ["Net Retry...", "MQTT Ready"]);
    }

    #[test]
    fn test_restart_policy() {
        let (palette, keywords) = fixtures();
        let queue = MessageQueue::<NoopRawMutex>::new();
        let mut sup = Supervisor::new(
            &queue,
            &palette,
            &keywords,
            PARAMS,
            FailurePolicy::Restart { grace_ms: 3000 },
        );

        sup.on_attempt();
        assert_eq!(sup.on_failure(), Directive::Restart { grace_ms: 3000 });
        let message = queue.try_dequeue().unwrap();
        assert_eq!(message.text, "Connection Failed");
        assert_eq!(message.color, Rgb::RED);
    }

    #[test]
    fn test_policy_from_config() {
        let mut config = BannerConfig::default();
        assert_eq!(
            FailurePolicy::from_config(&config),
            FailurePolicy::Backoff { delay_ms: 5000 }
        );
        config.reconnect.policy = ReconnectPolicy::Restart;
        config.reconnect.backoff_s = 2;
        assert_eq!(
            FailurePolicy::from_config(&config),
            FailurePolicy::Restart { grace_ms: 2000 }
        );
    }
}
