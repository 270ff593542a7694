//! Control packets exchanged with the broker
//!
//! Packets are divided into two categories:
//! - Client → Broker: CONNECT, SUBSCRIBE, PUBACK, PINGREQ, DISCONNECT
//! - Broker → Client: CONNACK, SUBACK, PUBLISH, PUBACK, PINGRESP

use crate::packet::{
    encode_remaining_length, PacketError, RawPacket, CONNACK, CONNECT, DISCONNECT, PINGREQ,
    PINGRESP, PUBACK, PUBLISH, SUBACK, SUBSCRIBE,
};

/// Protocol level for MQTT 3.1.1
pub const PROTOCOL_LEVEL: u8 = 4;

/// CONNACK return code for an accepted connection
pub const CONNACK_ACCEPTED: u8 = 0x00;

/// SUBACK return code for a rejected subscription
pub const SUBACK_FAILURE: u8 = 0x80;

// CONNECT flag bits
const FLAG_CLEAN_SESSION: u8 = 0x02;
const FLAG_PASSWORD: u8 = 0x40;
const FLAG_USERNAME: u8 = 0x80;

/// Packets sent by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClientPacket<'a> {
    /// Open a session
    Connect {
        client_id: &'a str,
        keep_alive_s: u16,
        clean_session: bool,
        username: Option<&'a str>,
        password: Option<&'a [u8]>,
    },
    /// Subscribe to one topic filter
    Subscribe {
        packet_id: u16,
        filter: &'a str,
        qos: u8,
    },
    /// Acknowledge a QoS 1 publish
    PubAck { packet_id: u16 },
    /// Keep-alive probe
    PingReq,
    /// Close the session cleanly
    Disconnect,
}

impl<'a> ClientPacket<'a> {
    /// Encode this packet into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, PacketError> {
        let mut w = Writer::new(buffer);
        match *self {
            ClientPacket::Connect {
                client_id,
                keep_alive_s,
                clean_session,
                username,
                password,
            } => {
                let mut flags = 0;
                if clean_session {
                    flags |= FLAG_CLEAN_SESSION;
                }
                // A password is only sent together with a user name
                let password = username.and(password);
                if username.is_some() {
                    flags |= FLAG_USERNAME;
                }
                if password.is_some() {
                    flags |= FLAG_PASSWORD;
                }

                let mut remaining = 10 + 2 + client_id.len();
                if let Some(user) = username {
                    remaining += 2 + user.len();
                }
                if let Some(pass) = password {
                    remaining += 2 + pass.len();
                }

                w.fixed_header(CONNECT << 4, remaining)?;
                w.string("MQTT")?;
                w.u8(PROTOCOL_LEVEL)?;
                w.u8(flags)?;
                w.u16(keep_alive_s)?;
                w.string(client_id)?;
                if let Some(user) = username {
                    w.string(user)?;
                }
                if let Some(pass) = password {
                    w.binary(pass)?;
                }
            }
            ClientPacket::Subscribe {
                packet_id,
                filter,
                qos,
            } => {
                if qos > 1 {
                    return Err(PacketError::Malformed);
                }
                // Reserved flags for SUBSCRIBE are 0b0010
                w.fixed_header(SUBSCRIBE << 4 | 0x02, 2 + 2 + filter.len() + 1)?;
                w.u16(packet_id)?;
                w.string(filter)?;
                w.u8(qos)?;
            }
            ClientPacket::PubAck { packet_id } => {
                w.fixed_header(PUBACK << 4, 2)?;
                w.u16(packet_id)?;
            }
            ClientPacket::PingReq => w.fixed_header(PINGREQ << 4, 0)?,
            ClientPacket::Disconnect => w.fixed_header(DISCONNECT << 4, 0)?,
        }
        Ok(w.pos)
    }
}

/// Packets received from the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServerPacket<'a> {
    ConnAck {
        session_present: bool,
        return_code: u8,
    },
    SubAck {
        packet_id: u16,
        /// Granted QoS, or [`SUBACK_FAILURE`]
        return_code: u8,
    },
    Publish {
        topic: &'a str,
        /// Present for QoS 1
        packet_id: Option<u16>,
        qos: u8,
        retain: bool,
        dup: bool,
        payload: &'a [u8],
    },
    PubAck { packet_id: u16 },
    PingResp,
}

impl<'a> ServerPacket<'a> {
    /// Decode a packet received from the broker
    pub fn decode(packet: &'a RawPacket) -> Result<Self, PacketError> {
        let body = packet.body.as_slice();
        let mut r = Reader::new(body);

        match packet.packet_type() {
            CONNACK => {
                if body.len() != 2 {
                    return Err(PacketError::Malformed);
                }
                Ok(ServerPacket::ConnAck {
                    session_present: body[0] & 0x01 != 0,
                    return_code: body[1],
                })
            }
            SUBACK => {
                let packet_id = r.u16()?;
                let return_code = r.u8()?;
                Ok(ServerPacket::SubAck {
                    packet_id,
                    return_code,
                })
            }
            PUBLISH => {
                let flags = packet.flags();
                let qos = (flags >> 1) & 0x03;
                if qos == 3 {
                    return Err(PacketError::Malformed);
                }
                let topic = r.string()?;
                let packet_id = if qos > 0 { Some(r.u16()?) } else { None };
                Ok(ServerPacket::Publish {
                    topic,
                    packet_id,
                    qos,
                    retain: flags & 0x01 != 0,
                    dup: flags & 0x08 != 0,
                    payload: r.rest(),
                })
            }
            PUBACK => Ok(ServerPacket::PubAck {
                packet_id: r.u16()?,
            }),
            PINGRESP => Ok(ServerPacket::PingResp),
            other => Err(PacketError::UnexpectedPacket(other)),
        }
    }
}

/// Bounds-checked big-endian writer
struct Writer<'b> {
    buffer: &'b mut [u8],
    pos: usize,
}

impl<'b> Writer<'b> {
    fn new(buffer: &'b mut [u8]) -> Self {
        Self { buffer, pos: 0 }
    }

    fn fixed_header(&mut self, header: u8, remaining: usize) -> Result<(), PacketError> {
        self.u8(header)?;
        let tail = self
            .buffer
            .get_mut(self.pos..)
            .ok_or(PacketError::BufferTooSmall)?;
        self.pos += encode_remaining_length(remaining, tail)?;
        Ok(())
    }

    fn u8(&mut self, value: u8) -> Result<(), PacketError> {
        self.bytes(&[value])
    }

    fn u16(&mut self, value: u16) -> Result<(), PacketError> {
        self.bytes(&value.to_be_bytes())
    }

    fn string(&mut self, value: &str) -> Result<(), PacketError> {
        self.binary(value.as_bytes())
    }

    /// Two-byte length prefix followed by the data
    fn binary(&mut self, value: &[u8]) -> Result<(), PacketError> {
        let len = u16::try_from(value.len()).map_err(|_| PacketError::Malformed)?;
        self.u16(len)?;
        self.bytes(value)
    }

    fn bytes(&mut self, value: &[u8]) -> Result<(), PacketError> {
        let end = self.pos + value.len();
        self.buffer
            .get_mut(self.pos..end)
            .ok_or(PacketError::BufferTooSmall)?
            .copy_from_slice(value);
        self.pos = end;
        Ok(())
    }
}

/// Bounds-checked big-endian reader
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], PacketError> {
        let slice = self
            .data
            .get(self.pos..self.pos + n)
            .ok_or(PacketError::Malformed)?;
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, PacketError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, PacketError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn string(&mut self) -> Result<&'a str, PacketError> {
        let len = self.u16()? as usize;
        core::str::from_utf8(self.take(len)?).map_err(|_| PacketError::InvalidUtf8)
    }

    fn rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos..];
        self.pos = self.data.len();
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_connect_anonymous() {
        let packet = ClientPacket::Connect {
            client_id: "abc",
            keep_alive_s: 60,
            clean_session: true,
            username: None,
            password: None,
        };
        let mut buffer = [0u8; 64];
        let len = packet.encode(&mut buffer).unwrap();

        assert_eq!(
            &buffer[..len],
            &[
                0x10, 15, // fixed header
                0, 4, b'M', b'Q', b'T', b'T', // protocol name
                4,    // level
                0x02, // clean session
                0, 60, // keep alive
                0, 3, b'a', b'b', b'c', // client id
            ]
        );
    }

    #[test]
    fn test_encode_connect_with_credentials() {
        let packet = ClientPacket::Connect {
            client_id: "m",
            keep_alive_s: 30,
            clean_session: true,
            username: Some("u"),
            password: Some(b"pw"),
        };
        let mut buffer = [0u8; 64];
        let len = packet.encode(&mut buffer).unwrap();

        assert_eq!(buffer[1] as usize, len - 2);
        assert_eq!(buffer[9], 0x02 | 0x80 | 0x40);
        assert_eq!(&buffer[len - 7..len], &[0, 1, b'u', 0, 2, b'p', b'w']);
    }

    #[test]
    fn test_password_without_username_is_dropped() {
        let packet = ClientPacket::Connect {
            client_id: "m",
            keep_alive_s: 30,
            clean_session: true,
            username: None,
            password: Some(b"pw"),
        };
        let mut buffer = [0u8; 64];
        let len = packet.encode(&mut buffer).unwrap();
        assert_eq!(len, 15);
        assert_eq!(buffer[9], 0x02);
    }

    #[test]
    fn test_encode_subscribe() {
        let packet = ClientPacket::Subscribe {
            packet_id: 1,
            filter: "a/#",
            qos: 1,
        };
        let mut buffer = [0u8; 16];
        let len = packet.encode(&mut buffer).unwrap();
        assert_eq!(&buffer[..len], &[0x82, 8, 0, 1, 0, 3, b'a', b'/', b'#', 1]);

        let invalid = ClientPacket::Subscribe {
            packet_id: 1,
            filter: "a",
            qos: 2,
        };
        assert_eq!(invalid.encode(&mut buffer), Err(PacketError::Malformed));
    }

    #[test]
    fn test_encode_short_packets() {
        let mut buffer = [0u8; 4];
        assert_eq!(ClientPacket::PingReq.encode(&mut buffer), Ok(2));
        assert_eq!(&buffer[..2], &[0xC0, 0x00]);

        assert_eq!(ClientPacket::Disconnect.encode(&mut buffer), Ok(2));
        assert_eq!(&buffer[..2], &[0xE0, 0x00]);

        assert_eq!(
            ClientPacket::PubAck { packet_id: 0x1234 }.encode(&mut buffer),
            Ok(4)
        );
        assert_eq!(buffer, [0x40, 0x02, 0x12, 0x34]);
    }

    #[test]
    fn test_buffer_too_small() {
        let mut buffer = [0u8; 8];
        let packet = ClientPacket::Subscribe {
            packet_id: 1,
            filter: "personal/ucfnaps/led/#",
            qos: 1,
        };
        assert_eq!(packet.encode(&mut buffer), Err(PacketError::BufferTooSmall));
    }

    #[test]
    fn test_decode_connack() {
        let raw = RawPacket::new(0x20, &[0x01, 0x05]).unwrap();
        assert_eq!(
            ServerPacket::decode(&raw),
            Ok(ServerPacket::ConnAck {
                session_present: true,
                return_code: 5
            })
        );

        let short = RawPacket::new(0x20, &[0x00]).unwrap();
        assert_eq!(ServerPacket::decode(&short), Err(PacketError::Malformed));
    }

    #[test]
    fn test_decode_suback() {
        let raw = RawPacket::new(0x90, &[0x00, 0x07, SUBACK_FAILURE]).unwrap();
        assert_eq!(
            ServerPacket::decode(&raw),
            Ok(ServerPacket::SubAck {
                packet_id: 7,
                return_code: SUBACK_FAILURE
            })
        );
    }

    #[test]
    fn test_decode_publish_qos0_retained() {
        let raw = RawPacket::new(0x31, &[0, 3, b'a', b'/', b'b', b'h', b'i']).unwrap();
        assert_eq!(
            ServerPacket::decode(&raw),
            Ok(ServerPacket::Publish {
                topic: "a/b",
                packet_id: None,
                qos: 0,
                retain: true,
                dup: false,
                payload: b"hi",
            })
        );
    }

    #[test]
    fn test_decode_publish_qos1() {
        let raw = RawPacket::new(0x3A, &[0, 1, b't', 0x00, 0x2A, 0xff, 0xfe]).unwrap();
        match ServerPacket::decode(&raw).unwrap() {
            ServerPacket::Publish {
                topic,
                packet_id,
                qos,
                dup,
                payload,
                ..
            } => {
                assert_eq!(topic, "t");
                assert_eq!(packet_id, Some(42));
                assert_eq!(qos, 1);
                assert!(dup);
                // Payload bytes are passed through undecoded
                assert_eq!(payload, &[0xff, 0xfe]);
            }
            other => panic!("Wrong packet: {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_bad_publish() {
        let qos3 = RawPacket::new(0x36, &[0, 1, b't']).unwrap();
        assert_eq!(ServerPacket::decode(&qos3), Err(PacketError::Malformed));

        let truncated = RawPacket::new(0x30, &[0, 9, b't']).unwrap();
        assert_eq!(ServerPacket::decode(&truncated), Err(PacketError::Malformed));

        let bad_topic = RawPacket::new(0x30, &[0, 1, 0xff]).unwrap();
        assert_eq!(ServerPacket::decode(&bad_topic), Err(PacketError::InvalidUtf8));
    }

    #[test]
    fn test_decode_unexpected() {
        let raw = RawPacket::new(0x10, &[]).unwrap();
        assert_eq!(
            ServerPacket::decode(&raw),
            Err(PacketError::UnexpectedPacket(CONNECT))
        );
        let ping = RawPacket::new(0xD0, &[]).unwrap();
        assert_eq!(ServerPacket::decode(&ping), Ok(ServerPacket::PingResp));
    }
}
