//! MQTT 3.1.1 subscribe-only client
//!
//! One session per [`MqttSession::connect`]: every connect closes the old
//! stream, opens a new one and starts a clean session. Keep-alive runs
//! inside [`MqttSession::poll`], so the caller only has to keep polling.

use embassy_futures::select::{select, Either};
use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{Read, Write};
use heapless::Deque;
use marquee_core::config::NetworkConfig;
use marquee_core::traits::{Clock, MessagingSession, SessionEvent};
use marquee_protocol::messages::{CONNACK_ACCEPTED, SUBACK_FAILURE};
use marquee_protocol::{ClientPacket, PacketError, PacketParser, RawPacket, ServerPacket};

use super::transport::Transport;

/// Receive buffer size (one TCP read)
pub const RX_BUFFER_SIZE: usize = 256;

/// Transmit buffer size (largest packet we send is CONNECT)
pub const TX_BUFFER_SIZE: usize = 256;

/// Publishes held while waiting for CONNACK or SUBACK
pub const STASH_DEPTH: usize = 4;

/// Session errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionError<E> {
    /// The transport failed
    Transport(E),
    /// The broker sent something we cannot parse
    Protocol(PacketError),
    /// CONNACK or SUBACK carried a failure code
    Refused(u8),
    /// No CONNACK/SUBACK/PINGRESP in time
    Timeout,
    /// More publishes arrived ahead of an acknowledgement than fit the stash
    Overflow,
    /// The stream ended or no session is open
    Closed,
}

impl<E> From<PacketError> for SessionError<E> {
    fn from(e: PacketError) -> Self {
        SessionError::Protocol(e)
    }
}

/// Session parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MqttOptions<'a> {
    pub client_id: &'a str,
    pub username: Option<&'a str>,
    pub password: Option<&'a [u8]>,
    /// 0 disables keep-alive
    pub keep_alive_s: u16,
    /// Wait for CONNACK and SUBACK
    pub ack_timeout_ms: u32,
    /// Longest a poll waits before reporting Idle
    pub tick_ms: u32,
}

impl<'a> MqttOptions<'a> {
    pub fn new(client_id: &'a str) -> Self {
        Self {
            client_id,
            username: None,
            password: None,
            keep_alive_s: 60,
            ack_timeout_ms: 10_000,
            tick_ms: 1000,
        }
    }

    fn keep_alive_ms(&self) -> u64 {
        self.keep_alive_s as u64 * 1000
    }
}

impl<'a> From<&'a NetworkConfig> for MqttOptions<'a> {
    fn from(config: &'a NetworkConfig) -> Self {
        let non_empty = |s: &'a str| (!s.is_empty()).then_some(s);
        Self {
            username: non_empty(config.username.as_str()),
            password: non_empty(config.mqtt_password.as_str()).map(str::as_bytes),
            keep_alive_s: config.keep_alive_s,
            ..Self::new(config.client_id.as_str())
        }
    }
}

/// MQTT client bound to a transport, a delay and a clock
pub struct MqttSession<'a, T, D, C> {
    transport: T,
    delay: D,
    clock: C,
    options: MqttOptions<'a>,
    parser: PacketParser,
    rx: [u8; RX_BUFFER_SIZE],
    rx_start: usize,
    rx_end: usize,
    tx: [u8; TX_BUFFER_SIZE],
    /// Publish handed out by the last poll
    inbound: Option<RawPacket>,
    /// Publishes that arrived while waiting for an acknowledgement, oldest first
    stashed: Deque<RawPacket, STASH_DEPTH>,
    next_packet_id: u16,
    last_tx_ms: u64,
    ping_sent_ms: Option<u64>,
    connected: bool,
}

impl<'a, T, D, C> MqttSession<'a, T, D, C>
where
    T: Transport,
    D: DelayNs,
    C: Clock,
{
    pub fn new(transport: T, delay: D, clock: C, options: MqttOptions<'a>) -> Self {
        Self {
            transport,
            delay,
            clock,
            options,
            parser: PacketParser::new(),
            rx: [0; RX_BUFFER_SIZE],
            rx_start: 0,
            rx_end: 0,
            tx: [0; TX_BUFFER_SIZE],
            inbound: None,
            stashed: Deque::new(),
            next_packet_id: 1,
            last_tx_ms: 0,
            ping_sent_ms: None,
            connected: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send DISCONNECT (best effort) and close the stream
    pub async fn disconnect(&mut self) {
        if self.connected {
            let _ = self.send(ClientPacket::Disconnect).await;
        }
        self.drop_session().await;
    }

    async fn drop_session(&mut self) {
        self.connected = false;
        self.transport.close().await;
        self.parser.reset();
        self.rx_start = 0;
        self.rx_end = 0;
        self.inbound = None;
        self.stashed.clear();
        self.ping_sent_ms = None;
    }

    fn packet_id(&mut self) -> u16 {
        let id = self.next_packet_id;
        // Packet identifiers are non-zero
        self.next_packet_id = self.next_packet_id.checked_add(1).unwrap_or(1);
        id
    }

    async fn send(&mut self, packet: ClientPacket<'_>) -> Result<(), SessionError<T::Error>> {
        let len = packet.encode(&mut self.tx)?;
        let written = match self.transport.write_all(&self.tx[..len]).await {
            Ok(()) => self.transport.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            self.connected = false;
            return Err(SessionError::Transport(e));
        }
        self.last_tx_ms = self.clock.now_ms();
        Ok(())
    }

    /// Read until a packet completes or `deadline_ms` passes
    async fn read_packet(
        &mut self,
        deadline_ms: u64,
    ) -> Result<Option<RawPacket>, SessionError<T::Error>> {
        loop {
            while self.rx_start < self.rx_end {
                let (used, result) = self.parser.feed_bytes(&self.rx[self.rx_start..self.rx_end]);
                self.rx_start += used;
                match result {
                    Ok(Some(packet)) => return Ok(Some(packet)),
                    Ok(None) => {}
                    // Oversized packets are skipped whole
                    Err(PacketError::PacketTooLarge) => {}
                    Err(e) => {
                        self.connected = false;
                        return Err(SessionError::Protocol(e));
                    }
                }
            }

            let now = self.clock.now_ms();
            if now >= deadline_ms {
                return Ok(None);
            }
            let wait = (deadline_ms - now).min(u32::MAX as u64) as u32;

            match select(
                self.transport.read(&mut self.rx),
                self.delay.delay_ms(wait),
            )
            .await
            {
                Either::First(Ok(0)) => {
                    self.connected = false;
                    return Err(SessionError::Closed);
                }
                Either::First(Ok(n)) => {
                    self.rx_start = 0;
                    self.rx_end = n;
                }
                Either::First(Err(e)) => {
                    self.connected = false;
                    return Err(SessionError::Transport(e));
                }
                Either::Second(()) => return Ok(None),
            }
        }
    }

    /// Wait for the packet `want` accepts, stashing any publish seen meanwhile
    async fn await_ack<F>(&mut self, mut want: F) -> Result<u8, SessionError<T::Error>>
    where
        F: FnMut(&ServerPacket<'_>) -> Option<u8>,
    {
        let deadline = self.clock.now_ms() + self.options.ack_timeout_ms as u64;
        loop {
            let packet = match self.read_packet(deadline).await? {
                Some(packet) => packet,
                None => {
                    self.connected = false;
                    return Err(SessionError::Timeout);
                }
            };

            let publish_id = match ServerPacket::decode(&packet) {
                Ok(ServerPacket::Publish { packet_id, .. }) => packet_id,
                Ok(other) => match want(&other) {
                    Some(code) => return Ok(code),
                    None => continue,
                },
                Err(PacketError::UnexpectedPacket(_)) | Err(PacketError::InvalidUtf8) => continue,
                Err(e) => return Err(SessionError::Protocol(e)),
            };
            // Only acknowledge what fits the stash
            if self.stashed.is_full() {
                self.connected = false;
                return Err(SessionError::Overflow);
            }
            if let Some(packet_id) = publish_id {
                self.send(ClientPacket::PubAck { packet_id }).await?;
            }
            let _ = self.stashed.push_back(packet);
        }
    }

    /// Send PINGREQ when due; fail if the last one went unanswered
    async fn keep_alive(&mut self) -> Result<(), SessionError<T::Error>> {
        let interval = self.options.keep_alive_ms();
        if interval == 0 {
            return Ok(());
        }
        let now = self.clock.now_ms();
        if let Some(sent) = self.ping_sent_ms {
            if now.saturating_sub(sent) >= interval {
                self.connected = false;
                return Err(SessionError::Timeout);
            }
        } else if now.saturating_sub(self.last_tx_ms) >= interval / 2 {
            self.send(ClientPacket::PingReq).await?;
            self.ping_sent_ms = Some(now);
        }
        Ok(())
    }

    /// Next instant keep-alive needs attention
    fn keep_alive_deadline(&self) -> u64 {
        let interval = self.options.keep_alive_ms();
        if interval == 0 {
            return u64::MAX;
        }
        match self.ping_sent_ms {
            Some(sent) => sent + interval,
            None => self.last_tx_ms + interval / 2,
        }
    }
}

impl<'a, T, D, C> MessagingSession for MqttSession<'a, T, D, C>
where
    T: Transport,
    D: DelayNs,
    C: Clock,
{
    type Error = SessionError<T::Error>;

    async fn connect(&mut self) -> Result<(), Self::Error> {
        self.drop_session().await;
        self.transport
            .open()
            .await
            .map_err(SessionError::Transport)?;

        let options = self.options;
        self.send(ClientPacket::Connect {
            client_id: options.client_id,
            keep_alive_s: options.keep_alive_s,
            clean_session: true,
            username: options.username,
            password: options.password,
        })
        .await?;

        let code = self
            .await_ack(|packet| match packet {
                ServerPacket::ConnAck { return_code, .. } => Some(*return_code),
                _ => None,
            })
            .await?;
        if code != CONNACK_ACCEPTED {
            self.drop_session().await;
            return Err(SessionError::Refused(code));
        }

        self.connected = true;
        Ok(())
    }

    async fn subscribe(&mut self, filter: &str, qos: u8) -> Result<(), Self::Error> {
        if !self.connected {
            return Err(SessionError::Closed);
        }
        let packet_id = self.packet_id();
        self.send(ClientPacket::Subscribe {
            packet_id,
            filter,
            qos,
        })
        .await?;

        let code = self
            .await_ack(|packet| match packet {
                ServerPacket::SubAck {
                    packet_id: id,
                    return_code,
                } if *id == packet_id => Some(*return_code),
                _ => None,
            })
            .await?;
        if code == SUBACK_FAILURE {
            return Err(SessionError::Refused(code));
        }
        Ok(())
    }

    async fn poll(&mut self) -> Result<SessionEvent<'_>, Self::Error> {
        if !self.connected {
            return Err(SessionError::Closed);
        }

        if let Some(packet) = self.stashed.pop_front() {
            self.inbound = Some(packet);
        } else {
            let tick_deadline = self.clock.now_ms() + self.options.tick_ms as u64;
            loop {
                self.keep_alive().await?;

                let deadline = tick_deadline.min(self.keep_alive_deadline());
                let packet = match self.read_packet(deadline).await? {
                    Some(packet) => packet,
                    None => {
                        if self.clock.now_ms() >= tick_deadline {
                            return Ok(SessionEvent::Idle);
                        }
                        continue;
                    }
                };

                let publish_id = match ServerPacket::decode(&packet) {
                    Ok(ServerPacket::Publish { packet_id, .. }) => packet_id,
                    Ok(ServerPacket::PingResp) => {
                        self.ping_sent_ms = None;
                        continue;
                    }
                    // Late acknowledgements
                    Ok(_) => continue,
                    Err(PacketError::UnexpectedPacket(_)) | Err(PacketError::InvalidUtf8) => {
                        continue
                    }
                    Err(e) => {
                        self.connected = false;
                        return Err(SessionError::Protocol(e));
                    }
                };
                if let Some(packet_id) = publish_id {
                    self.send(ClientPacket::PubAck { packet_id }).await?;
                }
                self.inbound = Some(packet);
                break;
            }
        }

        match self.inbound.as_ref().map(ServerPacket::decode) {
            Some(Ok(ServerPacket::Publish {
                topic,
                payload,
                retain,
                ..
            })) => Ok(SessionEvent::Message {
                topic,
                payload,
                retained: retain,
            }),
            _ => Err(SessionError::Protocol(PacketError::Malformed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use embassy_futures::block_on;
    use embedded_io::ErrorKind;
    use embedded_io_async::ErrorType;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::vec::Vec;

    #[derive(Clone, Default)]
    struct FakeTime(Rc<Cell<u64>>);

    impl Clock for FakeTime {
        fn now_ms(&self) -> u64 {
            self.0.get()
        }
    }

    struct FakeDelay(FakeTime);

    impl DelayNs for FakeDelay {
        async fn delay_ns(&mut self, ns: u32) {
            let t = &self.0 .0;
            t.set(t.get() + ns as u64 / 1_000_000);
        }

        async fn delay_ms(&mut self, ms: u32) {
            let t = &self.0 .0;
            t.set(t.get() + ms as u64);
        }
    }

    /// Scripted broker; reads park forever once the script runs dry
    #[derive(Default)]
    struct MockBroker {
        script: VecDeque<Vec<u8>>,
        written: Vec<u8>,
        opens: u32,
        closes: u32,
        fail_open: bool,
    }

    impl MockBroker {
        fn with(chunks: &[&[u8]]) -> Self {
            Self {
                script: chunks.iter().map(|c| c.to_vec()).collect(),
                ..Default::default()
            }
        }
    }

    impl ErrorType for MockBroker {
        type Error = ErrorKind;
    }

    impl Read for MockBroker {
        async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
            match self.script.pop_front() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None => core::future::pending().await,
            }
        }
    }

    impl Write for MockBroker {
        async fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }
    }

    impl Transport for MockBroker {
        async fn open(&mut self) -> Result<(), ErrorKind> {
            self.opens += 1;
            if self.fail_open {
                Err(ErrorKind::ConnectionRefused)
            } else {
                Ok(())
            }
        }

        async fn close(&mut self) {
            self.closes += 1;
        }
    }

    const CONNACK_OK: &[u8] = &[0x20, 0x02, 0x00, 0x00];
    const SUBACK_OK: &[u8] = &[0x90, 0x03, 0x00, 0x01, 0x01];

    fn session(broker: MockBroker) -> (MqttSession<'static, MockBroker, FakeDelay, FakeTime>, FakeTime) {
        let time = FakeTime::default();
        let mut options = MqttOptions::new("marquee");
        options.keep_alive_s = 10;
        let session = MqttSession::new(broker, FakeDelay(time.clone()), time.clone(), options);
        (session, time)
    }

    #[test]
    fn test_connect_and_subscribe() {
        let (mut session, _) = session(MockBroker::with(&[CONNACK_OK, SUBACK_OK]));
        block_on(session.connect()).unwrap();
        assert!(session.is_connected());
        block_on(session.subscribe("a/#", 1)).unwrap();

        let written = &session.transport().written;
        assert_eq!(written[0], 0x10);
        // SUBSCRIBE follows the 21-byte CONNECT
        assert_eq!(&written[21..], &[0x82, 8, 0, 1, 0, 3, b'a', b'/', b'#', 1]);
    }

    #[test]
    fn test_connect_refused() {
        let (mut session, _) = session(MockBroker::with(&[&[0x20, 0x02, 0x00, 0x05]]));
        assert_eq!(block_on(session.connect()), Err(SessionError::Refused(5)));
        assert!(!session.is_connected());
    }

    #[test]
    fn test_connect_times_out() {
        let (mut session, time) = session(MockBroker::default());
        assert_eq!(block_on(session.connect()), Err(SessionError::Timeout));
        assert!(time.now_ms() >= 10_000);
    }

    #[test]
    fn test_open_failure_is_transport_error() {
        let mut broker = MockBroker::default();
        broker.fail_open = true;
        let (mut session, _) = session(broker);
        assert_eq!(
            block_on(session.connect()),
            Err(SessionError::Transport(ErrorKind::ConnectionRefused))
        );
    }

    #[test]
    fn test_subscription_rejected() {
        let (mut session, _) = session(MockBroker::with(&[CONNACK_OK, &[0x90, 0x03, 0x00, 0x01, 0x80]]));
        block_on(session.connect()).unwrap();
        assert_eq!(
            block_on(session.subscribe("a/#", 1)),
            Err(SessionError::Refused(SUBACK_FAILURE))
        );
    }

    #[test]
    fn test_qos1_publish_is_acked() {
        // PUBLISH qos 1, topic "t", id 7, payload "News"
        let publish: &[u8] = &[0x32, 0x09, 0, 1, b't', 0, 7, b'N', b'e', b'w', b's'];
        let (mut session, _) = session(MockBroker::with(&[CONNACK_OK, SUBACK_OK, publish]));
        block_on(session.connect()).unwrap();
        block_on(session.subscribe("t", 1)).unwrap();
        let before = session.transport().written.len();

        match block_on(session.poll()).unwrap() {
            SessionEvent::Message {
                topic,
                payload,
                retained,
            } => {
                assert_eq!(topic, "t");
                assert_eq!(payload, b"News");
                assert!(!retained);
            }
            SessionEvent::Idle => panic!("expected a message"),
        }
        assert_eq!(&session.transport().written[before..], &[0x40, 0x02, 0, 7]);
    }

    #[test]
    fn test_publish_split_across_reads() {
        let (mut session, _) = session(MockBroker::with(&[
            CONNACK_OK,
            &[0x31, 0x05, 0, 1],
            &[b'x', b'h', b'i'],
        ]));
        block_on(session.connect()).unwrap();

        match block_on(session.poll()).unwrap() {
            SessionEvent::Message {
                topic, retained, ..
            } => {
                assert_eq!(topic, "x");
                assert!(retained);
            }
            SessionEvent::Idle => panic!("expected a message"),
        }
    }

    #[test]
    fn test_publish_before_suback_is_kept() {
        let retained: &[u8] = &[0x31, 0x04, 0, 1, b't', b'!'];
        let (mut session, _) = session(MockBroker::with(&[CONNACK_OK, retained, SUBACK_OK]));
        block_on(session.connect()).unwrap();
        block_on(session.subscribe("t", 1)).unwrap();

        match block_on(session.poll()).unwrap() {
            SessionEvent::Message { payload, .. } => assert_eq!(payload, b"!"),
            SessionEvent::Idle => panic!("expected the stashed message"),
        }
    }

    #[test]
    fn test_publishes_before_suback_keep_order() {
        let first: &[u8] = &[0x31, 0x04, 0, 1, b't', b'A'];
        let second: &[u8] = &[0x31, 0x04, 0, 1, b't', b'B'];
        let (mut session, _) =
            session(MockBroker::with(&[CONNACK_OK, first, second, SUBACK_OK]));
        block_on(session.connect()).unwrap();
        block_on(session.subscribe("t", 1)).unwrap();

        let mut payloads = Vec::new();
        for _ in 0..3 {
            match block_on(session.poll()).unwrap() {
                SessionEvent::Message { payload, .. } => payloads.push(payload.to_vec()),
                SessionEvent::Idle => break,
            }
        }
        assert_eq!(payloads, [b"A".to_vec(), b"B".to_vec()]);
    }

    #[test]
    fn test_stash_overflow_fails_subscribe() {
        // QoS 1 publishes with ids 1..=5; the fifth is refused, not acked
        let publishes: Vec<Vec<u8>> = (1..=5u8)
            .map(|id| std::vec![0x33, 0x06, 0, 1, b't', 0, id, b'x'])
            .collect();
        let mut chunks: Vec<&[u8]> = std::vec![CONNACK_OK];
        chunks.extend(publishes.iter().map(|p| p.as_slice()));
        chunks.push(SUBACK_OK);
        let (mut session, _) = session(MockBroker::with(&chunks));
        block_on(session.connect()).unwrap();

        assert_eq!(
            block_on(session.subscribe("t", 1)),
            Err(SessionError::Overflow)
        );
        let written = &session.transport().written;
        let pubacks = written.windows(2).filter(|w| *w == [0x40, 0x02]).count();
        assert_eq!(pubacks, STASH_DEPTH);
        assert!(!session.is_connected());
    }

    #[test]
    fn test_idle_then_ping() {
        let (mut session, time) = session(MockBroker::with(&[CONNACK_OK]));
        block_on(session.connect()).unwrap();
        let after_connect = session.transport().written.len();

        // Quiet line: each poll is one liveness tick
        for _ in 0..4 {
            assert_eq!(block_on(session.poll()), Ok(SessionEvent::Idle));
        }
        assert_eq!(time.now_ms(), 4000);
        assert_eq!(session.transport().written.len(), after_connect);

        // Half the keep-alive interval has passed
        assert_eq!(block_on(session.poll()), Ok(SessionEvent::Idle));
        assert_eq!(block_on(session.poll()), Ok(SessionEvent::Idle));
        assert_eq!(&session.transport().written[after_connect..], &[0xC0, 0x00]);
    }

    #[test]
    fn test_missing_pingresp_times_out() {
        let (mut session, _) = session(MockBroker::with(&[CONNACK_OK]));
        block_on(session.connect()).unwrap();

        let mut outcome = Ok(SessionEvent::Idle);
        for _ in 0..20 {
            outcome = block_on(session.poll()).map(|_| SessionEvent::Idle);
            if outcome.is_err() {
                break;
            }
        }
        assert_eq!(outcome, Err(SessionError::Timeout));
        assert_eq!(block_on(session.poll()), Err(SessionError::Closed));
    }

    #[test]
    fn test_pingresp_clears_timeout() {
        let (mut session, time) = session(MockBroker::with(&[CONNACK_OK]));
        block_on(session.connect()).unwrap();
        for _ in 0..6 {
            let _ = block_on(session.poll());
        }
        assert!(session.ping_sent_ms.is_some());

        session.transport.script.push_back(std::vec![0xD0, 0x00]);
        assert_eq!(block_on(session.poll()), Ok(SessionEvent::Idle));
        assert!(session.ping_sent_ms.is_none());
        assert!(time.now_ms() > 6000);
    }

    #[test]
    fn test_closed_stream() {
        let (mut session, _) = session(MockBroker::with(&[CONNACK_OK, &[]]));
        block_on(session.connect()).unwrap();
        assert_eq!(block_on(session.poll()), Err(SessionError::Closed));
        assert!(!session.is_connected());
    }

    #[test]
    fn test_reconnect_closes_previous_stream() {
        let (mut session, _) = session(MockBroker::with(&[CONNACK_OK, CONNACK_OK]));
        block_on(session.connect()).unwrap();
        block_on(session.connect()).unwrap();
        assert_eq!(session.transport().opens, 2);
        assert_eq!(session.transport().closes, 2);
    }

    #[test]
    fn test_options_from_config() {
        let mut config = NetworkConfig::default();
        let options = MqttOptions::from(&config);
        assert_eq!(options.client_id, "marquee");
        assert_eq!(options.username, None);
        assert_eq!(options.password, None);

        config.username.push_str("user").unwrap();
        config.mqtt_password.push_str("pw").unwrap();
        let options = MqttOptions::from(&config);
        assert_eq!(options.username, Some("user"));
        assert_eq!(options.password, Some(&b"pw"[..]));
    }
}
