//! Packet definitions and the byte-level codec.
//!
//! Every packet is `first byte | remaining length (one byte) | body`. The
//! single-byte remaining length caps a packet body at 255 bytes; encoders
//! refuse anything larger instead of truncating.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::{
    CLEAN_SESSION, CONNACK, CONNECT, DISCONNECT, GRANTED_QOS, KEEP_ALIVE_SECS,
    MAX_REMAINING_LENGTH, PROTOCOL_LEVEL, PROTOCOL_NAME, PUBLISH, REQUESTED_QOS, RETAIN_FLAG,
    SUBACK, SUBSCRIBE,
};
use crate::utils::error::{Error, Result};

/// Packet kind as identified by the first byte of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Connect,
    ConnAck,
    Publish,
    Subscribe,
    SubAck,
    Disconnect,
    Other(u8),
}

impl PacketKind {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            CONNECT => PacketKind::Connect,
            CONNACK => PacketKind::ConnAck,
            b if b == PUBLISH || b == PUBLISH | RETAIN_FLAG => PacketKind::Publish,
            SUBSCRIBE => PacketKind::Subscribe,
            SUBACK => PacketKind::SubAck,
            DISCONNECT => PacketKind::Disconnect,
            other => PacketKind::Other(other),
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketKind::Connect => f.write_str("CONNECT"),
            PacketKind::ConnAck => f.write_str("CONNACK"),
            PacketKind::Publish => f.write_str("PUBLISH"),
            PacketKind::Subscribe => f.write_str("SUBSCRIBE"),
            PacketKind::SubAck => f.write_str("SUBACK"),
            PacketKind::Disconnect => f.write_str("DISCONNECT"),
            PacketKind::Other(b) => write!(f, "0x{b:02x}"),
        }
    }
}

/// The two-byte fixed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedHeader {
    pub kind: PacketKind,
    /// Low nibble of the first byte.
    pub flags: u8,
    pub remaining_length: usize,
}

impl FixedHeader {
    /// Total packet size, header included.
    pub fn packet_len(&self) -> usize {
        2 + self.remaining_length
    }
}

/// Reads the packet kind and remaining length from the first two bytes.
pub fn decode_header(buf: &[u8]) -> Result<FixedHeader> {
    if buf.len() < 2 {
        return Err(Error::TruncatedPacket {
            needed: 2,
            available: buf.len(),
        });
    }

    Ok(FixedHeader {
        kind: PacketKind::from_byte(buf[0]),
        flags: buf[0] & 0x0F,
        remaining_length: buf[1] as usize,
    })
}

/// CONNECT packet. Only the client identifier is retained; protocol level,
/// flags and keep-alive are fixed on encode and skipped on decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connect {
    pub client_id: String,
}

/// PUBLISH packet at QoS 0. The value has no length prefix: it runs to the
/// end of the packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish {
    pub topic: String,
    pub value: String,
    pub retain: bool,
}

/// SUBSCRIBE packet carrying a single topic filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscribe {
    pub topic: String,
    pub packet_id: u16,
}

/// SUBACK packet; the granted QoS is always 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubAck {
    pub packet_id: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Connect(Connect),
    /// Always return code 0.
    ConnAck,
    Publish(Publish),
    Subscribe(Subscribe),
    SubAck(SubAck),
    Disconnect,
}

impl Packet {
    pub fn connect(client_id: impl Into<String>) -> Self {
        Packet::Connect(Connect {
            client_id: client_id.into(),
        })
    }

    pub fn publish(topic: impl Into<String>, value: impl Into<String>, retain: bool) -> Self {
        Packet::Publish(Publish {
            topic: topic.into(),
            value: value.into(),
            retain,
        })
    }

    pub fn subscribe(topic: impl Into<String>, packet_id: u16) -> Self {
        Packet::Subscribe(Subscribe {
            topic: topic.into(),
            packet_id,
        })
    }

    pub fn suback(packet_id: u16) -> Self {
        Packet::SubAck(SubAck { packet_id })
    }

    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::Connect(_) => PacketKind::Connect,
            Packet::ConnAck => PacketKind::ConnAck,
            Packet::Publish(_) => PacketKind::Publish,
            Packet::Subscribe(_) => PacketKind::Subscribe,
            Packet::SubAck(_) => PacketKind::SubAck,
            Packet::Disconnect => PacketKind::Disconnect,
        }
    }

    /// Decodes one packet from the start of `buf`.
    ///
    /// An empty buffer is a peer that closed the stream and yields `Ok(None)`.
    /// Bytes past the declared remaining length are ignored.
    pub fn decode(buf: &[u8]) -> Result<Option<Packet>> {
        if buf.is_empty() {
            return Ok(None);
        }

        let header = decode_header(buf)?;
        if buf.len() < header.packet_len() {
            return Err(Error::TruncatedPacket {
                needed: header.packet_len(),
                available: buf.len(),
            });
        }

        let mut body = Body::new(&buf[2..header.packet_len()]);
        let packet = match header.kind {
            PacketKind::Connect => {
                let name = body.string("protocol name")?;
                if name != PROTOCOL_NAME {
                    return Err(Error::MalformedPacket(format!(
                        "unknown protocol name {name:?}"
                    )));
                }
                let _level = body.u8("protocol level")?;
                let _flags = body.u8("connect flags")?;
                let _keep_alive = body.u16("keep alive")?;
                Packet::Connect(Connect {
                    client_id: body.string("client id")?,
                })
            }
            PacketKind::ConnAck => {
                let _ack_flags = body.u8("acknowledge flags")?;
                let _code = body.u8("return code")?;
                Packet::ConnAck
            }
            PacketKind::Publish => Packet::Publish(Publish {
                topic: body.string("topic")?,
                value: body.rest("value")?,
                retain: header.flags & RETAIN_FLAG != 0,
            }),
            PacketKind::Subscribe => {
                let packet_id = body.u16("packet id")?;
                let topic = body.string("topic filter")?;
                let _qos = body.u8("requested qos")?;
                Packet::Subscribe(Subscribe { topic, packet_id })
            }
            PacketKind::SubAck => {
                let packet_id = body.u16("packet id")?;
                let _granted = body.u8("granted qos")?;
                Packet::SubAck(SubAck { packet_id })
            }
            PacketKind::Disconnect => Packet::Disconnect,
            PacketKind::Other(byte) => return Err(Error::UnsupportedPacket(byte)),
        };

        Ok(Some(packet))
    }

    /// Encodes the packet into its exact wire representation.
    pub fn encode(&self) -> Result<Bytes> {
        match self {
            Packet::Connect(connect) => {
                let client_id = ascii("client id", &connect.client_id)?;
                let remaining = 2 + PROTOCOL_NAME.len() + 1 + 1 + 2 + 2 + client_id.len();
                let mut out = start(CONNECT, remaining)?;
                put_string(&mut out, PROTOCOL_NAME.as_bytes());
                out.put_u8(PROTOCOL_LEVEL);
                out.put_u8(CLEAN_SESSION);
                out.put_u16(KEEP_ALIVE_SECS);
                put_string(&mut out, client_id);
                Ok(out.freeze())
            }
            Packet::ConnAck => {
                let mut out = start(CONNACK, 2)?;
                out.put_u8(0);
                out.put_u8(0);
                Ok(out.freeze())
            }
            Packet::Publish(publish) => {
                let topic = ascii("topic", &publish.topic)?;
                let value = ascii("value", &publish.value)?;
                let first = if publish.retain {
                    PUBLISH | RETAIN_FLAG
                } else {
                    PUBLISH
                };
                let mut out = start(first, 2 + topic.len() + value.len())?;
                put_string(&mut out, topic);
                out.put_slice(value);
                Ok(out.freeze())
            }
            Packet::Subscribe(subscribe) => {
                let topic = ascii("topic filter", &subscribe.topic)?;
                let mut out = start(SUBSCRIBE, 2 + 2 + topic.len() + 1)?;
                out.put_u16(subscribe.packet_id);
                put_string(&mut out, topic);
                out.put_u8(REQUESTED_QOS);
                Ok(out.freeze())
            }
            Packet::SubAck(suback) => {
                let mut out = start(SUBACK, 3)?;
                out.put_u16(suback.packet_id);
                out.put_u8(GRANTED_QOS);
                Ok(out.freeze())
            }
            Packet::Disconnect => Ok(start(DISCONNECT, 0)?.freeze()),
        }
    }
}

fn ascii<'a>(field: &str, text: &'a str) -> Result<&'a [u8]> {
    if text.is_ascii() {
        Ok(text.as_bytes())
    } else {
        Err(Error::MalformedPacket(format!("{field} is not ASCII")))
    }
}

/// Allocates the output buffer and writes the fixed header.
fn start(first: u8, remaining_length: usize) -> Result<BytesMut> {
    if remaining_length > MAX_REMAINING_LENGTH {
        return Err(Error::PayloadTooLarge { remaining_length });
    }
    let mut out = BytesMut::with_capacity(2 + remaining_length);
    out.put_u8(first);
    out.put_u8(remaining_length as u8);
    Ok(out)
}

// Callers have already bounded the total length to 255, so the prefix fits.
fn put_string(out: &mut BytesMut, text: &[u8]) {
    out.put_u16(text.len() as u16);
    out.put_slice(text);
}

/// Cursor over a packet body.
struct Body<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Body<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, field: &str, len: usize) -> Result<&'a [u8]> {
        let end = self.pos + len;
        if end > self.buf.len() {
            return Err(Error::MalformedPacket(format!(
                "{field} runs past the end of the packet"
            )));
        }
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn u8(&mut self, field: &str) -> Result<u8> {
        Ok(self.take(field, 1)?[0])
    }

    fn u16(&mut self, field: &str) -> Result<u16> {
        let bytes = self.take(field, 2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn string(&mut self, field: &str) -> Result<String> {
        let len = self.u16(field)? as usize;
        let bytes = self.take(field, len)?;
        text(field, bytes)
    }

    fn rest(&mut self, field: &str) -> Result<String> {
        let bytes = &self.buf[self.pos..];
        self.pos = self.buf.len();
        text(field, bytes)
    }
}

fn text(field: &str, bytes: &[u8]) -> Result<String> {
    match std::str::from_utf8(bytes) {
        Ok(s) if s.is_ascii() => Ok(s.to_string()),
        _ => Err(Error::MalformedPacket(format!("{field} is not ASCII"))),
    }
}
