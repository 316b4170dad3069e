use crate::{PacketType, PropertyContext, PropertyType};

/// Error during deserialization of a packet
///
/// Every variant is terminal for the packet being decoded. The caller decides
/// whether the connection gets closed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Packet budget exhausted, no more bytes can be read for this packet")]
    Exhausted,
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed variable byte integer")]
    MalformedVarInt,
    #[error("Got invalid protocol `{0}` expected `MQTT`")]
    InvalidProtocol(String),
    #[error("This broker only supports MQTT v5.0, got protocol level {0}")]
    InvalidProtocolLevel(u8),
    #[error("Invalid packet type = {0}")]
    InvalidPacketType(u8),
    #[error("Invalid fixed header flags {flags:#06b} for packet type {packet_type}")]
    InvalidHeaderFlags { packet_type: PacketType, flags: u8 },
    #[error("Invalid reserved bit in connect flags")]
    ReservedBitSet,
    #[error("Invalid QoS level = {0}")]
    InvalidQoS(u8),
    #[error("Will Flag is false but Will Retain is {retain} and Will QoS is {qos}")]
    InvalidWillFlags { retain: bool, qos: u8 },
    #[error("Properties are not valid for {0} packets")]
    PropertiesNotAllowed(PacketType),
    #[error("No matching case for code: {0}")]
    InvalidPropertyType(u8),
    #[error("invalid property identifier {property} for packet type {context}")]
    InvalidPropertyForContext {
        property: u8,
        context: PropertyContext,
    },
    #[error("Property {0:?} appears more than once")]
    DuplicateProperty(PropertyType),
    #[error("Invalid value {value} for property {property:?}")]
    InvalidPropertyValue { property: PropertyType, value: u32 },
    #[error("Property {0:?} holds a value of the wrong type")]
    PropertyShapeMismatch(PropertyType),
    #[error("Properties declared {expected} bytes but {consumed} bytes were read")]
    PropertyLengthMismatch { expected: usize, consumed: usize },
    #[error("Cannot set authentication data without an authentication method")]
    AuthDataWithoutMethod,
    #[error("String is not UTF-8 encoded = {0}")]
    Utf8Encoding(#[from] std::str::Utf8Error),
    #[error("Packet has {0} unread bytes after decoding")]
    TrailingBytes(usize),
    #[error("Handling of {0} packets is not implemented")]
    Unimplemented(PacketType),
    #[error("Value {0} is too large for a variable byte integer")]
    VarIntTooLarge(usize),
    #[error("Max Payload size of {max:?} has been exceeded by packet of {pkt_size:?} bytes")]
    PayloadSizeLimitExceeded { pkt_size: u32, max: u32 },
    /// More bytes required to frame packet. Argument
    /// implies minimum additional bytes required to
    /// proceed further
    #[error("Insufficient number of bytes to frame packet, {0} more bytes required")]
    InsufficientBytes(usize),
}
