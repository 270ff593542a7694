//! Broker stream over an embassy-net TCP socket

use core::net::Ipv4Addr;

use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::{ConnectError, Error as TcpError, TcpSocket};
use embassy_net::{IpAddress, IpEndpoint, Stack};
use embassy_time::Duration;
use embedded_io_async::{ErrorKind, ErrorType, Read, Write};

use marquee_drivers::mqtt::Transport;

/// Socket inactivity limit; keep-alive traffic comes well within it
const SOCKET_TIMEOUT: Duration = Duration::from_secs(120);

/// Transport errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Broker host name did not resolve
    Dns,
    /// TCP connect failed
    Connect(ConnectError),
    /// Read or write on an open socket failed
    Io(TcpError),
}

impl embedded_io_async::Error for TransportError {
    fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Dns => ErrorKind::AddrNotAvailable,
            TransportError::Connect(ConnectError::ConnectionReset) => ErrorKind::ConnectionReset,
            TransportError::Connect(ConnectError::TimedOut) => ErrorKind::TimedOut,
            TransportError::Connect(_) => ErrorKind::ConnectionRefused,
            TransportError::Io(_) => ErrorKind::ConnectionReset,
        }
    }
}

/// Reconnectable TCP stream to `host:port`
pub struct TcpTransport<'a> {
    socket: TcpSocket<'a>,
    stack: Stack<'a>,
    host: &'a str,
    port: u16,
}

impl<'a> TcpTransport<'a> {
    pub fn new(
        stack: Stack<'a>,
        rx_buffer: &'a mut [u8],
        tx_buffer: &'a mut [u8],
        host: &'a str,
        port: u16,
    ) -> Self {
        Self {
            socket: TcpSocket::new(stack, rx_buffer, tx_buffer),
            stack,
            host,
            port,
        }
    }

    /// IPv4 literals skip DNS
    async fn resolve(&self) -> Result<IpAddress, TransportError> {
        if let Ok(ip) = self.host.parse::<Ipv4Addr>() {
            return Ok(IpAddress::Ipv4(ip));
        }
        let addresses = self
            .stack
            .dns_query(self.host, DnsQueryType::A)
            .await
            .map_err(|_| TransportError::Dns)?;
        addresses.first().copied().ok_or(TransportError::Dns)
    }
}

impl ErrorType for TcpTransport<'_> {
    type Error = TransportError;
}

impl Read for TcpTransport<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.socket.read(buf).await.map_err(TransportError::Io)
    }
}

impl Write for TcpTransport<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.socket.write(buf).await.map_err(TransportError::Io)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.socket.flush().await.map_err(TransportError::Io)
    }
}

impl Transport for TcpTransport<'_> {
    async fn open(&mut self) -> Result<(), Self::Error> {
        let address = self.resolve().await?;
        self.socket.set_timeout(Some(SOCKET_TIMEOUT));
        self.socket
            .connect(IpEndpoint::new(address, self.port))
            .await
            .map_err(TransportError::Connect)
    }

    async fn close(&mut self) {
        // Reset rather than FIN: the session is abandoned either way
        self.socket.abort();
        let _ = self.socket.flush().await;
    }
}
