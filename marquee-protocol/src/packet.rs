//! Fixed header, remaining length and streaming packet parsing.
//!
//! Packet format:
//! - HEADER (1 byte): packet type in the high nibble, flags in the low nibble
//! - REMAINING LENGTH (1-4 bytes): little-endian base-128 varint, the high
//!   bit of each byte marks a continuation
//! - BODY (REMAINING LENGTH bytes): variable header plus payload

use heapless::Vec;

/// Largest body the parser keeps; longer packets are skipped
pub const MAX_BODY_SIZE: usize = 1024;

/// Largest value a remaining length field can carry (4 bytes)
pub const MAX_REMAINING_LENGTH: usize = 268_435_455;

// Control packet types (high nibble of the fixed header)
pub const CONNECT: u8 = 1;
pub const CONNACK: u8 = 2;
pub const PUBLISH: u8 = 3;
pub const PUBACK: u8 = 4;
pub const SUBSCRIBE: u8 = 8;
pub const SUBACK: u8 = 9;
pub const PINGREQ: u8 = 12;
pub const PINGRESP: u8 = 13;
pub const DISCONNECT: u8 = 14;

/// Errors that can occur during packet parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    /// Buffer too small for encoding
    BufferTooSmall,
    /// Packet body exceeds [`MAX_BODY_SIZE`]; it was skipped
    PacketTooLarge,
    /// Remaining length used more than 4 bytes
    InvalidLength,
    /// Body does not match the layout of its packet type
    Malformed,
    /// String field is not valid UTF-8
    InvalidUtf8,
    /// Packet type a client never receives
    UnexpectedPacket(u8),
}

/// One complete packet as read from the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    /// First byte of the fixed header
    pub header: u8,
    /// Everything after the remaining length
    pub body: Vec<u8, MAX_BODY_SIZE>,
}

impl RawPacket {
    /// Create a packet from its header byte and body
    pub fn new(header: u8, body: &[u8]) -> Result<Self, PacketError> {
        let mut vec = Vec::new();
        vec.extend_from_slice(body)
            .map_err(|_| PacketError::PacketTooLarge)?;
        Ok(Self { header, body: vec })
    }

    /// Control packet type (1-14)
    pub fn packet_type(&self) -> u8 {
        self.header >> 4
    }

    /// Type-specific flags
    pub fn flags(&self) -> u8 {
        self.header & 0x0F
    }
}

/// Encode a remaining length into `buffer`
///
/// Returns the number of bytes written (1-4).
pub fn encode_remaining_length(mut length: usize, buffer: &mut [u8]) -> Result<usize, PacketError> {
    if length > MAX_REMAINING_LENGTH {
        return Err(PacketError::InvalidLength);
    }

    let mut written = 0;
    loop {
        let mut byte = (length % 128) as u8;
        length /= 128;
        if length > 0 {
            byte |= 0x80;
        }
        *buffer.get_mut(written).ok_or(PacketError::BufferTooSmall)? = byte;
        written += 1;
        if length == 0 {
            return Ok(written);
        }
    }
}

/// State machine for parsing incoming packets
#[derive(Debug, Clone)]
pub struct PacketParser {
    state: ParseState,
    header: u8,
    remaining: usize,
    multiplier: usize,
    length_bytes: u8,
    body: Vec<u8, MAX_BODY_SIZE>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Waiting for the fixed header byte
    WaitingForHeader,
    /// Reading remaining length bytes
    ReadingLength,
    /// Reading body bytes
    ReadingBody,
    /// Dropping the body of an oversized packet
    Skipping,
}

impl Default for PacketParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketParser {
    /// Create a new packet parser
    pub fn new() -> Self {
        Self {
            state: ParseState::WaitingForHeader,
            header: 0,
            remaining: 0,
            multiplier: 1,
            length_bytes: 0,
            body: Vec::new(),
        }
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.state = ParseState::WaitingForHeader;
        self.header = 0;
        self.remaining = 0;
        self.multiplier = 1;
        self.length_bytes = 0;
        self.body.clear();
    }

    /// Whether the parser sits between packets
    pub fn is_idle(&self) -> bool {
        self.state == ParseState::WaitingForHeader
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(packet))` when a packet is complete, `Ok(None)` when
    /// more bytes are needed. An oversized packet is consumed in full and then
    /// reported as [`PacketError::PacketTooLarge`], leaving the parser in sync.
    pub fn feed(&mut self, byte: u8) -> Result<Option<RawPacket>, PacketError> {
        match self.state {
            ParseState::WaitingForHeader => {
                self.header = byte;
                self.remaining = 0;
                self.multiplier = 1;
                self.length_bytes = 0;
                self.body.clear();
                self.state = ParseState::ReadingLength;
                Ok(None)
            }
            ParseState::ReadingLength => {
                self.remaining += (byte & 0x7F) as usize * self.multiplier;
                self.multiplier *= 128;
                self.length_bytes += 1;

                if byte & 0x80 != 0 {
                    if self.length_bytes == 4 {
                        self.reset();
                        return Err(PacketError::InvalidLength);
                    }
                    return Ok(None);
                }

                if self.remaining == 0 {
                    return Ok(Some(self.finish()));
                }
                self.state = if self.remaining > MAX_BODY_SIZE {
                    ParseState::Skipping
                } else {
                    ParseState::ReadingBody
                };
                Ok(None)
            }
            ParseState::ReadingBody => {
                // Cannot overflow: remaining was checked against capacity
                let _ = self.body.push(byte);
                if self.body.len() == self.remaining {
                    return Ok(Some(self.finish()));
                }
                Ok(None)
            }
            ParseState::Skipping => {
                self.remaining -= 1;
                if self.remaining == 0 {
                    self.reset();
                    return Err(PacketError::PacketTooLarge);
                }
                Ok(None)
            }
        }
    }

    /// Feed bytes until a packet completes
    ///
    /// Returns the packet (if any) and how many bytes were consumed. Bytes
    /// after a complete packet are left for the next call.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> (usize, Result<Option<RawPacket>, PacketError>) {
        for (i, &byte) in bytes.iter().enumerate() {
            match self.feed(byte) {
                Ok(None) => {}
                other => return (i + 1, other),
            }
        }
        (bytes.len(), Ok(None))
    }

    fn finish(&mut self) -> RawPacket {
        let packet = RawPacket {
            header: self.header,
            body: self.body.clone(),
        };
        self.reset();
        packet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_remaining_length_boundaries() {
        let mut buffer = [0u8; 4];
        assert_eq!(encode_remaining_length(0, &mut buffer), Ok(1));
        assert_eq!(buffer[0], 0x00);

        assert_eq!(encode_remaining_length(127, &mut buffer), Ok(1));
        assert_eq!(buffer[0], 0x7F);

        assert_eq!(encode_remaining_length(128, &mut buffer), Ok(2));
        assert_eq!(&buffer[..2], &[0x80, 0x01]);

        assert_eq!(encode_remaining_length(16_383, &mut buffer), Ok(2));
        assert_eq!(&buffer[..2], &[0xFF, 0x7F]);

        assert_eq!(encode_remaining_length(MAX_REMAINING_LENGTH, &mut buffer), Ok(4));
        assert_eq!(buffer, [0xFF, 0xFF, 0xFF, 0x7F]);

        assert_eq!(
            encode_remaining_length(MAX_REMAINING_LENGTH + 1, &mut buffer),
            Err(PacketError::InvalidLength)
        );
    }

    #[test]
    fn test_parse_pingresp() {
        let mut parser = PacketParser::new();
        let (used, result) = parser.feed_bytes(&[0xD0, 0x00, 0xD0]);
        let packet = result.unwrap().unwrap();
        assert_eq!(used, 2);
        assert_eq!(packet.packet_type(), PINGRESP);
        assert!(packet.body.is_empty());
        // The third byte starts the next packet
        assert!(parser.is_idle());
    }

    #[test]
    fn test_parse_connack_split_across_reads() {
        let mut parser = PacketParser::new();
        assert_eq!(parser.feed_bytes(&[0x20]), (1, Ok(None)));
        assert_eq!(parser.feed_bytes(&[0x02, 0x00]), (2, Ok(None)));
        let (_, result) = parser.feed_bytes(&[0x00]);
        let packet = result.unwrap().unwrap();
        assert_eq!(packet.packet_type(), CONNACK);
        assert_eq!(packet.body.as_slice(), &[0x00, 0x00]);
    }

    #[test]
    fn test_oversized_packet_is_skipped() {
        let mut parser = PacketParser::new();
        let mut length = [0u8; 4];
        let n = encode_remaining_length(MAX_BODY_SIZE + 1, &mut length).unwrap();

        assert_eq!(parser.feed(0x30), Ok(None));
        for &b in &length[..n] {
            assert_eq!(parser.feed(b), Ok(None));
        }
        for _ in 0..MAX_BODY_SIZE {
            assert_eq!(parser.feed(0x41), Ok(None));
        }
        assert_eq!(parser.feed(0x41), Err(PacketError::PacketTooLarge));

        // Still in sync
        let (_, result) = parser.feed_bytes(&[0xD0, 0x00]);
        assert_eq!(result.unwrap().unwrap().packet_type(), PINGRESP);
    }

    #[test]
    fn test_five_byte_length_rejected() {
        let mut parser = PacketParser::new();
        let (_, result) = parser.feed_bytes(&[0x30, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(result, Err(PacketError::InvalidLength));
        assert!(parser.is_idle());
    }

    #[test]
    fn test_flags() {
        let packet = RawPacket::new(0x3B, &[]).unwrap();
        assert_eq!(packet.packet_type(), PUBLISH);
        assert_eq!(packet.flags(), 0x0B);
    }

    proptest! {
        #[test]
        fn prop_parser_recovers_body(body in proptest::collection::vec(any::<u8>(), 0..MAX_BODY_SIZE)) {
            let mut wire = std::vec![0x30u8];
            let mut length = [0u8; 4];
            let n = encode_remaining_length(body.len(), &mut length).unwrap();
            wire.extend_from_slice(&length[..n]);
            wire.extend_from_slice(&body);

            let mut parser = PacketParser::new();
            let (used, result) = parser.feed_bytes(&wire);
            let packet = result.unwrap().unwrap();
            prop_assert_eq!(used, wire.len());
            prop_assert_eq!(packet.body.as_slice(), body.as_slice());
        }
    }
}
