//! Module for working with MQTT properties
//!
//! A property table is a Variable Byte Integer length followed by a sequence of
//! properties. Each property is a one byte identifier and a value whose shape is
//! fixed by the identifier. Which identifiers may appear depends on the packet
//! that carries the table, see [`PropertyType::contexts`].

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;

use bytes::Bytes;

use crate::parse::*;
use crate::{ByteCursor, Error, PacketType};

/// The place a property table was read from
///
/// This is the packet type for tables in a variable header. The will
/// properties in the payload of a CONNECT packet follow their own rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyContext {
    /// Will properties of a CONNECT payload
    Will,
    /// Properties in the variable header of a packet
    Packet(PacketType),
}

impl From<PacketType> for PropertyContext {
    fn from(packet_type: PacketType) -> Self {
        PropertyContext::Packet(packet_type)
    }
}

impl fmt::Display for PropertyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyContext::Will => f.write_str("WILL"),
            PropertyContext::Packet(packet_type) => write!(f, "{packet_type}"),
        }
    }
}

/// Identifiers of the different properties used in MQTT 5.0
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyType {
    PayloadFormatIndicator = 0x01,
    MessageExpiryInterval = 0x02,
    ContentType = 0x03,
    ResponseTopic = 0x08,
    CorrelationData = 0x09,
    SubscriptionIdentifier = 0x0B,
    SessionExpiryInterval = 0x11,
    AssignedClientIdentifier = 0x12,
    ServerKeepAlive = 0x13,
    AuthenticationMethod = 0x15,
    AuthenticationData = 0x16,
    RequestProblemInformation = 0x17,
    WillDelayInterval = 0x18,
    RequestResponseInformation = 0x19,
    ResponseInformation = 0x1A,
    ServerReference = 0x1C,
    ReasonString = 0x1F,
    ReceiveMaximum = 0x21,
    TopicAliasMaximum = 0x22,
    TopicAlias = 0x23,
    MaximumQos = 0x24,
    RetainAvailable = 0x25,
    UserProperty = 0x26,
    MaximumPacketSize = 0x27,
    WildcardSubscriptionAvailable = 0x28,
    SubscriptionIdentifierAvailable = 0x29,
    SharedSubscriptionAvailable = 0x2A,
}

impl TryFrom<u8> for PropertyType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let property = match value {
            0x01 => PropertyType::PayloadFormatIndicator,
            0x02 => PropertyType::MessageExpiryInterval,
            0x03 => PropertyType::ContentType,
            0x08 => PropertyType::ResponseTopic,
            0x09 => PropertyType::CorrelationData,
            0x0B => PropertyType::SubscriptionIdentifier,
            0x11 => PropertyType::SessionExpiryInterval,
            0x12 => PropertyType::AssignedClientIdentifier,
            0x13 => PropertyType::ServerKeepAlive,
            0x15 => PropertyType::AuthenticationMethod,
            0x16 => PropertyType::AuthenticationData,
            0x17 => PropertyType::RequestProblemInformation,
            0x18 => PropertyType::WillDelayInterval,
            0x19 => PropertyType::RequestResponseInformation,
            0x1A => PropertyType::ResponseInformation,
            0x1C => PropertyType::ServerReference,
            0x1F => PropertyType::ReasonString,
            0x21 => PropertyType::ReceiveMaximum,
            0x22 => PropertyType::TopicAliasMaximum,
            0x23 => PropertyType::TopicAlias,
            0x24 => PropertyType::MaximumQos,
            0x25 => PropertyType::RetainAvailable,
            0x26 => PropertyType::UserProperty,
            0x27 => PropertyType::MaximumPacketSize,
            0x28 => PropertyType::WildcardSubscriptionAvailable,
            0x29 => PropertyType::SubscriptionIdentifierAvailable,
            0x2A => PropertyType::SharedSubscriptionAvailable,
            num => return Err(Error::InvalidPropertyType(num)),
        };

        Ok(property)
    }
}

/// Wire encoding of a property value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyShape {
    Byte,
    TwoByteInteger,
    FourByteInteger,
    VariableByteInteger,
    Utf8String,
    BinaryData,
    Utf8StringPair,
}

const WILL: PropertyContext = PropertyContext::Will;
const CONNECT: PropertyContext = PropertyContext::Packet(PacketType::Connect);
const CONNACK: PropertyContext = PropertyContext::Packet(PacketType::ConnAck);
const PUBLISH: PropertyContext = PropertyContext::Packet(PacketType::Publish);
const PUBACK: PropertyContext = PropertyContext::Packet(PacketType::PubAck);
const PUBREC: PropertyContext = PropertyContext::Packet(PacketType::PubRec);
const PUBREL: PropertyContext = PropertyContext::Packet(PacketType::PubRel);
const PUBCOMP: PropertyContext = PropertyContext::Packet(PacketType::PubComp);
const SUBSCRIBE: PropertyContext = PropertyContext::Packet(PacketType::Subscribe);
const SUBACK: PropertyContext = PropertyContext::Packet(PacketType::SubAck);
const UNSUBSCRIBE: PropertyContext = PropertyContext::Packet(PacketType::Unsubscribe);
const UNSUBACK: PropertyContext = PropertyContext::Packet(PacketType::UnsubAck);
const DISCONNECT: PropertyContext = PropertyContext::Packet(PacketType::Disconnect);
const AUTH: PropertyContext = PropertyContext::Packet(PacketType::Auth);

impl PropertyType {
    /// How the value of this property is encoded
    pub const fn shape(self) -> PropertyShape {
        match self {
            PropertyType::PayloadFormatIndicator
            | PropertyType::RequestProblemInformation
            | PropertyType::RequestResponseInformation
            | PropertyType::MaximumQos
            | PropertyType::RetainAvailable
            | PropertyType::WildcardSubscriptionAvailable
            | PropertyType::SubscriptionIdentifierAvailable
            | PropertyType::SharedSubscriptionAvailable => PropertyShape::Byte,
            PropertyType::ServerKeepAlive
            | PropertyType::ReceiveMaximum
            | PropertyType::TopicAliasMaximum
            | PropertyType::TopicAlias => PropertyShape::TwoByteInteger,
            PropertyType::MessageExpiryInterval
            | PropertyType::SessionExpiryInterval
            | PropertyType::WillDelayInterval
            | PropertyType::MaximumPacketSize => PropertyShape::FourByteInteger,
            PropertyType::SubscriptionIdentifier => PropertyShape::VariableByteInteger,
            PropertyType::ContentType
            | PropertyType::ResponseTopic
            | PropertyType::AssignedClientIdentifier
            | PropertyType::AuthenticationMethod
            | PropertyType::ResponseInformation
            | PropertyType::ServerReference
            | PropertyType::ReasonString => PropertyShape::Utf8String,
            PropertyType::CorrelationData | PropertyType::AuthenticationData => {
                PropertyShape::BinaryData
            }
            PropertyType::UserProperty => PropertyShape::Utf8StringPair,
        }
    }

    /// The places this property may legally appear in
    pub fn contexts(self) -> &'static [PropertyContext] {
        match self {
            PropertyType::PayloadFormatIndicator
            | PropertyType::MessageExpiryInterval
            | PropertyType::ContentType
            | PropertyType::ResponseTopic
            | PropertyType::CorrelationData => &[PUBLISH, WILL],
            PropertyType::SubscriptionIdentifier => &[PUBLISH, SUBSCRIBE],
            PropertyType::SessionExpiryInterval => &[CONNECT, CONNACK, DISCONNECT],
            PropertyType::AssignedClientIdentifier
            | PropertyType::ServerKeepAlive
            | PropertyType::ResponseInformation
            | PropertyType::MaximumQos
            | PropertyType::RetainAvailable
            | PropertyType::WildcardSubscriptionAvailable
            | PropertyType::SubscriptionIdentifierAvailable
            | PropertyType::SharedSubscriptionAvailable => &[CONNACK],
            PropertyType::AuthenticationMethod | PropertyType::AuthenticationData => {
                &[CONNECT, CONNACK, AUTH]
            }
            PropertyType::RequestProblemInformation
            | PropertyType::RequestResponseInformation => &[CONNECT],
            PropertyType::WillDelayInterval => &[WILL],
            PropertyType::ServerReference => &[CONNACK, DISCONNECT],
            PropertyType::ReasonString => &[
                CONNACK, PUBACK, PUBREC, PUBREL, PUBCOMP, SUBACK, UNSUBACK, DISCONNECT, AUTH,
            ],
            PropertyType::ReceiveMaximum
            | PropertyType::TopicAliasMaximum
            | PropertyType::MaximumPacketSize => &[CONNECT, CONNACK],
            PropertyType::TopicAlias => &[PUBLISH],
            PropertyType::UserProperty => &[
                CONNECT,
                CONNACK,
                PUBLISH,
                WILL,
                PUBACK,
                PUBREC,
                PUBREL,
                PUBCOMP,
                SUBSCRIBE,
                SUBACK,
                UNSUBSCRIBE,
                UNSUBACK,
                DISCONNECT,
                AUTH,
            ],
        }
    }

    /// Whether this property may appear in the given context
    pub fn is_allowed_in(self, context: PropertyContext) -> bool {
        self.contexts().contains(&context)
    }
}

/// A user defined name and value pair
///
/// User properties may appear any number of times in a property table,
/// and their order is preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProperty {
    pub name: String,
    pub value: String,
}

impl UserProperty {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The decoded value of a single property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Byte(u8),
    TwoByteInteger(u16),
    FourByteInteger(u32),
    VariableByteInteger(VarInt),
    Utf8String(String),
    BinaryData(Bytes),
    Utf8StringPair(UserProperty),
}

impl PropertyValue {
    /// The wire encoding this value is read from
    pub fn shape(&self) -> PropertyShape {
        match self {
            PropertyValue::Byte(_) => PropertyShape::Byte,
            PropertyValue::TwoByteInteger(_) => PropertyShape::TwoByteInteger,
            PropertyValue::FourByteInteger(_) => PropertyShape::FourByteInteger,
            PropertyValue::VariableByteInteger(_) => PropertyShape::VariableByteInteger,
            PropertyValue::Utf8String(_) => PropertyShape::Utf8String,
            PropertyValue::BinaryData(_) => PropertyShape::BinaryData,
            PropertyValue::Utf8StringPair(_) => PropertyShape::Utf8StringPair,
        }
    }

    fn read<R: Read>(shape: PropertyShape, cursor: &mut ByteCursor<R>) -> Result<Self, Error> {
        let value = match shape {
            PropertyShape::Byte => PropertyValue::Byte(cursor.read_byte()?),
            PropertyShape::TwoByteInteger => PropertyValue::TwoByteInteger(read_u16(cursor)?),
            PropertyShape::FourByteInteger => PropertyValue::FourByteInteger(read_u32(cursor)?),
            PropertyShape::VariableByteInteger => {
                PropertyValue::VariableByteInteger(VarInt::read(cursor)?)
            }
            PropertyShape::Utf8String => PropertyValue::Utf8String(read_mqtt_string(cursor)?),
            PropertyShape::BinaryData => PropertyValue::BinaryData(read_mqtt_bytes(cursor)?),
            PropertyShape::Utf8StringPair => {
                let (name, value) = read_mqtt_string_pair(cursor)?;
                PropertyValue::Utf8StringPair(UserProperty { name, value })
            }
        };

        Ok(value)
    }
}

/// The properties of a single property table
///
/// Every property except [`PropertyType::UserProperty`] appears at most once and
/// is kept in a map. User properties are kept apart, in the order they were read.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PropertyMap {
    values: BTreeMap<PropertyType, PropertyValue>,
    user_properties: Vec<UserProperty>,
}

impl PropertyMap {
    /// Create a new empty [PropertyMap]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a property.
    ///
    /// User properties are appended to the user property list. Any other
    /// property must not be present yet.
    ///
    /// # Errors
    /// [`Error::PropertyShapeMismatch`] when the value is not encoded the way the
    /// identifier demands, [`Error::DuplicateProperty`] when the identifier is
    /// already present.
    pub fn insert(&mut self, property: PropertyType, value: PropertyValue) -> Result<(), Error> {
        if value.shape() != property.shape() {
            return Err(Error::PropertyShapeMismatch(property));
        }

        if let PropertyValue::Utf8StringPair(pair) = value {
            self.user_properties.push(pair);
            return Ok(());
        }

        if self.values.contains_key(&property) {
            return Err(Error::DuplicateProperty(property));
        }

        self.values.insert(property, value);
        Ok(())
    }

    /// Appends a user property
    pub fn add_user_property(&mut self, user_property: UserProperty) {
        self.user_properties.push(user_property);
    }

    pub fn get(&self, property: PropertyType) -> Option<&PropertyValue> {
        self.values.get(&property)
    }

    pub fn contains(&self, property: PropertyType) -> bool {
        self.values.contains_key(&property)
    }

    /// Number of properties in the map, not counting user properties
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when neither properties nor user properties are present
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.user_properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PropertyType, &PropertyValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    pub fn user_properties(&self) -> &[UserProperty] {
        &self.user_properties
    }

    /// Takes the user properties out of the map
    pub fn take_user_properties(&mut self) -> Vec<UserProperty> {
        std::mem::take(&mut self.user_properties)
    }

    pub fn byte(&self, property: PropertyType) -> Result<Option<u8>, Error> {
        match self.get(property) {
            None => Ok(None),
            Some(PropertyValue::Byte(v)) => Ok(Some(*v)),
            Some(_) => Err(Error::PropertyShapeMismatch(property)),
        }
    }

    pub fn two_byte_integer(&self, property: PropertyType) -> Result<Option<u16>, Error> {
        match self.get(property) {
            None => Ok(None),
            Some(PropertyValue::TwoByteInteger(v)) => Ok(Some(*v)),
            Some(_) => Err(Error::PropertyShapeMismatch(property)),
        }
    }

    pub fn four_byte_integer(&self, property: PropertyType) -> Result<Option<u32>, Error> {
        match self.get(property) {
            None => Ok(None),
            Some(PropertyValue::FourByteInteger(v)) => Ok(Some(*v)),
            Some(_) => Err(Error::PropertyShapeMismatch(property)),
        }
    }

    pub fn variable_byte_integer(&self, property: PropertyType) -> Result<Option<VarInt>, Error> {
        match self.get(property) {
            None => Ok(None),
            Some(PropertyValue::VariableByteInteger(v)) => Ok(Some(*v)),
            Some(_) => Err(Error::PropertyShapeMismatch(property)),
        }
    }

    pub fn string(&self, property: PropertyType) -> Result<Option<&str>, Error> {
        match self.get(property) {
            None => Ok(None),
            Some(PropertyValue::Utf8String(v)) => Ok(Some(v.as_str())),
            Some(_) => Err(Error::PropertyShapeMismatch(property)),
        }
    }

    pub fn binary(&self, property: PropertyType) -> Result<Option<Bytes>, Error> {
        match self.get(property) {
            None => Ok(None),
            Some(PropertyValue::BinaryData(v)) => Ok(Some(v.clone())),
            Some(_) => Err(Error::PropertyShapeMismatch(property)),
        }
    }
}

/// Reads a property table: the property length followed by the properties.
pub fn read_properties<R: Read>(
    cursor: &mut ByteCursor<R>,
    context: PropertyContext,
) -> Result<PropertyMap, Error> {
    let property_length = VarInt::read(cursor)?;
    parse_properties(cursor, property_length.value(), context)
}

/// Parses `property_length` bytes of properties.
///
/// Every identifier must be legal for `context`. The properties must end
/// exactly at `property_length`; a property that runs past it is an error.
pub fn parse_properties<R: Read>(
    cursor: &mut ByteCursor<R>,
    property_length: usize,
    context: PropertyContext,
) -> Result<PropertyMap, Error> {
    if let PropertyContext::Packet(
        packet_type @ (PacketType::PingReq | PacketType::PingResp),
    ) = context
    {
        return Err(Error::PropertiesNotAllowed(packet_type));
    }

    let mut properties = PropertyMap::new();
    let mut consumed = 0;
    while consumed < property_length {
        let before = cursor.remaining_length();

        let identifier = cursor.read_byte()?;
        let property_type = PropertyType::try_from(identifier)?;
        if !property_type.is_allowed_in(context) {
            return Err(Error::InvalidPropertyForContext {
                property: identifier,
                context,
            });
        }

        let value = PropertyValue::read(property_type.shape(), cursor)?;
        if let PropertyValue::VariableByteInteger(id) = value {
            // subscription identifiers start at 1
            if id.value() == 0 {
                return Err(Error::InvalidPropertyValue {
                    property: property_type,
                    value: 0,
                });
            }
        }

        log::trace!("Property {property_type:?} in {context} = {value:?}");
        properties.insert(property_type, value)?;
        consumed += before - cursor.remaining_length();
    }

    if consumed != property_length {
        return Err(Error::PropertyLengthMismatch {
            expected: property_length,
            consumed,
        });
    }

    Ok(properties)
}
