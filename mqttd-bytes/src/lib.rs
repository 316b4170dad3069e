//! MQTT protocol deserialization for brokers
//!
//! This crate decodes MQTT 5.0 control packets as a broker receives them.
//! Bytes are pulled from a connection through a [`ByteCursor`], which limits
//! every read to the remaining length of the packet being decoded.
//!
//! ```
//! # use mqttd_bytes::{read_packet, ByteCursor, Config, Packet};
//! let bytes = [
//!     0x10, 0x0D, // fixed header
//!     0x00, 0x04, b'M', b'Q', b'T', b'T', 0x05, 0x02, 0x00, 0x3C, 0x00, // variable header
//!     0x00, 0x00, // empty client identifier
//! ];
//! let mut cursor = ByteCursor::new(&bytes[..]);
//! let packet = read_packet(&mut cursor, &Config::default()).unwrap();
//! let Packet::Connect(session) = packet else {
//!     unreachable!()
//! };
//! assert_eq!(session.keep_alive, 60);
//! assert!(session.needs_assigned_id());
//! ```
//!
//! Only CONNECT packets are decoded so far. Every other packet type is
//! rejected with [`Error::Unimplemented`].

mod codec;
mod config;
mod cursor;
mod error;
mod header;
mod packet;
mod parse;
mod property;

pub use codec::Codec;
pub use config::{defaults, Config};
pub use cursor::ByteCursor;
pub use error::Error;
pub use header::{FixedHeader, MAX_FIXED_HEADER_LEN};
pub use packet::*;
pub use parse::{
    read_mqtt_bytes, read_mqtt_string, read_mqtt_string_pair, read_u16, read_u32,
    write_mqtt_bytes, write_mqtt_string, VarInt, VARINT_MAX,
};
pub use property::{
    parse_properties, read_properties, PropertyContext, PropertyMap, PropertyShape,
    PropertyType, PropertyValue, UserProperty,
};

/// Quality of Service levels for packet delivery.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd)]
#[allow(clippy::enum_variant_names)]
pub enum QoS {
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl Default for QoS {
    fn default() -> Self {
        Self::AtMostOnce
    }
}

impl TryFrom<u8> for QoS {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            qos => Err(Error::InvalidQoS(qos)),
        }
    }
}
