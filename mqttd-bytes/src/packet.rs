//! MQTT control packets and the dispatcher that decodes them.
//!
//! [`read_packet`] reads one packet from a connection: the fixed header first,
//! then the packet itself through [`dispatch`], which selects a decoder from the
//! packet type. The result is a [`Packet`].
//!
//! CONNECT is the only packet type a decoder exists for right now.

use std::fmt;
use std::io::Read;

use crate::{ByteCursor, Config, Error, FixedHeader};

mod connect;

pub use connect::{
    decode_connect, verify_protocol, ConnectFlags, ConnectSession, WillProperties,
    PROTOCOL_LEVEL, PROTOCOL_NAME,
};

/// MQTT Control Packet
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Packet {
    Connect(Box<ConnectSession>),
}

/// MQTT packet types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    /// Connection request
    Connect = 1,
    /// Connect acknowledgment
    ConnAck,
    /// Publish message
    Publish,
    /// Publish acknowledgment (QoS 1)
    PubAck,
    /// Publish received (QoS 2 delivery part 1)
    PubRec,
    /// Publish release (QoS 2 delivery part 2)
    PubRel,
    /// Publish complete (QoS 2 delivery part 3)
    PubComp,
    /// Subscribe request
    Subscribe,
    /// Subscribe acknowledgment
    SubAck,
    /// Unsubscribe request
    Unsubscribe,
    /// Unsubscribe acknowledgment
    UnsubAck,
    /// PING request
    PingReq,
    /// PING response
    PingResp,
    /// Disconnect notification
    Disconnect,
    /// Authentication exchange
    Auth,
}

impl PacketType {
    /// The flag bits every packet of this type carries in its fixed header
    ///
    /// PUBLISH has no fixed flags; its flags hold DUP, QoS and RETAIN.
    pub const fn reserved_flags(self) -> u8 {
        match self {
            PacketType::PubRel | PacketType::Subscribe | PacketType::Unsubscribe => 0b0010,
            _ => 0,
        }
    }

    /// Name of the packet type as written in the protocol
    pub const fn name(self) -> &'static str {
        match self {
            PacketType::Connect => "CONNECT",
            PacketType::ConnAck => "CONNACK",
            PacketType::Publish => "PUBLISH",
            PacketType::PubAck => "PUBACK",
            PacketType::PubRec => "PUBREC",
            PacketType::PubRel => "PUBREL",
            PacketType::PubComp => "PUBCOMP",
            PacketType::Subscribe => "SUBSCRIBE",
            PacketType::SubAck => "SUBACK",
            PacketType::Unsubscribe => "UNSUBSCRIBE",
            PacketType::UnsubAck => "UNSUBACK",
            PacketType::PingReq => "PINGREQ",
            PacketType::PingResp => "PINGRESP",
            PacketType::Disconnect => "DISCONNECT",
            PacketType::Auth => "AUTH",
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for PacketType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(PacketType::Connect),
            2 => Ok(PacketType::ConnAck),
            3 => Ok(PacketType::Publish),
            4 => Ok(PacketType::PubAck),
            5 => Ok(PacketType::PubRec),
            6 => Ok(PacketType::PubRel),
            7 => Ok(PacketType::PubComp),
            8 => Ok(PacketType::Subscribe),
            9 => Ok(PacketType::SubAck),
            10 => Ok(PacketType::Unsubscribe),
            11 => Ok(PacketType::UnsubAck),
            12 => Ok(PacketType::PingReq),
            13 => Ok(PacketType::PingResp),
            14 => Ok(PacketType::Disconnect),
            15 => Ok(PacketType::Auth),
            x => Err(Error::InvalidPacketType(x)),
        }
    }
}

/// Decodes the packet that follows a fixed header of type `packet_type`.
///
/// The budget of `cursor` must already be set to the remaining length of the packet.
pub fn dispatch<R: Read>(
    packet_type: PacketType,
    cursor: &mut ByteCursor<R>,
) -> Result<Packet, Error> {
    match packet_type {
        PacketType::Connect => {
            let session = decode_connect(cursor)?;
            Ok(Packet::Connect(Box::new(session)))
        }
        PacketType::ConnAck
        | PacketType::Publish
        | PacketType::PubAck
        | PacketType::PubRec
        | PacketType::PubRel
        | PacketType::PubComp
        | PacketType::Subscribe
        | PacketType::SubAck
        | PacketType::Unsubscribe
        | PacketType::UnsubAck
        | PacketType::PingReq
        | PacketType::PingResp
        | PacketType::Disconnect
        | PacketType::Auth => {
            log::warn!("No decoder for {packet_type} packets");
            Err(Error::Unimplemented(packet_type))
        }
    }
}

/// Reads a complete packet from a connection.
///
/// Packets larger than the maximum packet size of `config` are rejected before
/// their body is read. A packet must be consumed completely by its decoder.
pub fn read_packet<R: Read>(cursor: &mut ByteCursor<R>, config: &Config) -> Result<Packet, Error> {
    let fixed_header = FixedHeader::read(cursor)?;
    fixed_header.check_size(config.max_packet_size())?;
    let packet_type = fixed_header.validate()?;

    let packet = dispatch(packet_type, cursor)?;
    match cursor.remaining_length() {
        0 => Ok(packet),
        unread => Err(Error::TrailingBytes(unread)),
    }
}
