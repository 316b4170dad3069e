use std::io::Read;

use bytes::Bytes;

use crate::config::defaults;
use crate::parse::*;
use crate::property::{read_properties, PropertyMap, PropertyType, UserProperty};
use crate::{ByteCursor, Error, PacketType, QoS};

mod will;

pub use will::WillProperties;

/// Protocol name every CONNECT packet starts with
pub const PROTOCOL_NAME: &str = "MQTT";
/// Protocol level of MQTT 5.0
pub const PROTOCOL_LEVEL: u8 = 5;

/// Flags byte of the CONNECT variable header
///
/// ```text
///   7          6          5           4  3       2          1             0
/// +----------+----------+-----------+--------+----------+-------------+----------+
/// | Username | Password | Will      | Will   | Will     | Clean       | Reserved |
/// | Flag     | Flag     | Retain    | QoS    | Flag     | Start       |          |
/// +----------+----------+-----------+--------+----------+-------------+----------+
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConnectFlags {
    pub user_name: bool,
    pub password: bool,
    pub will_retain: bool,
    pub will_qos: QoS,
    pub will_flag: bool,
    pub clean_start: bool,
}

impl TryFrom<u8> for ConnectFlags {
    type Error = Error;

    /// Parses the flags byte.
    ///
    /// The reserved bit must be 0, the will QoS must not be 3 and a will
    /// QoS or will retain flag requires the will flag.
    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        if byte & 0b0000_0001 != 0 {
            return Err(Error::ReservedBitSet);
        }

        let will_qos = QoS::try_from((byte >> 3) & 0b11)?;
        let will_retain = byte & 0b0010_0000 != 0;
        let will_flag = byte & 0b0000_0100 != 0;
        if !will_flag && (will_retain || will_qos != QoS::AtMostOnce) {
            return Err(Error::InvalidWillFlags {
                retain: will_retain,
                qos: will_qos as u8,
            });
        }

        Ok(ConnectFlags {
            user_name: byte & 0b1000_0000 != 0,
            password: byte & 0b0100_0000 != 0,
            will_retain,
            will_qos,
            will_flag,
            clean_start: byte & 0b0000_0010 != 0,
        })
    }
}

impl From<ConnectFlags> for u8 {
    fn from(flags: ConnectFlags) -> u8 {
        ((flags.user_name as u8) << 7)
            | ((flags.password as u8) << 6)
            | ((flags.will_retain as u8) << 5)
            | ((flags.will_qos as u8) << 3)
            | ((flags.will_flag as u8) << 2)
            | ((flags.clean_start as u8) << 1)
    }
}

/// Session requested by a client through a CONNECT packet
///
/// Properties absent from the packet have their protocol default values,
/// see [`crate::defaults`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectSession {
    /// Maximum interval in seconds between two control packets of the client
    pub keep_alive: u16,
    pub flags: ConnectFlags,
    pub session_expiry_interval: u32,
    pub receive_maximum: u16,
    /// Largest packet the client accepts. `None` when the client sets no limit.
    pub max_packet_size: Option<u32>,
    pub topic_alias_maximum: u16,
    pub request_response_info: bool,
    pub request_problem_info: bool,
    pub auth_method: Option<String>,
    pub auth_data: Option<Bytes>,
    pub user_properties: Vec<UserProperty>,
    /// Client Identifier, may be empty
    pub client_id: String,
    /// Present when the will flag is set
    pub will: Option<WillProperties>,
    pub username: Option<String>,
    pub password: Option<Bytes>,
}

impl Default for ConnectSession {
    fn default() -> Self {
        Self {
            keep_alive: 0,
            flags: ConnectFlags::default(),
            session_expiry_interval: defaults::SESSION_EXPIRY_INTERVAL,
            receive_maximum: defaults::RECEIVE_MAXIMUM,
            max_packet_size: None,
            topic_alias_maximum: defaults::TOPIC_ALIAS_MAXIMUM,
            request_response_info: defaults::REQUEST_RESPONSE_INFORMATION,
            request_problem_info: defaults::REQUEST_PROBLEM_INFORMATION,
            auth_method: None,
            auth_data: None,
            user_properties: Vec::new(),
            client_id: String::new(),
            will: None,
            username: None,
            password: None,
        }
    }
}

impl ConnectSession {
    /// Copies the CONNECT properties into the session.
    ///
    /// Properties that are absent leave the current values untouched.
    pub fn apply_properties(&mut self, mut properties: PropertyMap) -> Result<(), Error> {
        if let Some(interval) = properties.four_byte_integer(PropertyType::SessionExpiryInterval)? {
            self.session_expiry_interval = interval;
        }

        if let Some(receive_maximum) = properties.two_byte_integer(PropertyType::ReceiveMaximum)? {
            if receive_maximum == 0 {
                return Err(Error::InvalidPropertyValue {
                    property: PropertyType::ReceiveMaximum,
                    value: 0,
                });
            }
            self.receive_maximum = receive_maximum;
        }

        if let Some(size) = properties.four_byte_integer(PropertyType::MaximumPacketSize)? {
            if size == 0 {
                return Err(Error::InvalidPropertyValue {
                    property: PropertyType::MaximumPacketSize,
                    value: 0,
                });
            }
            self.max_packet_size = Some(size);
        }

        if let Some(maximum) = properties.two_byte_integer(PropertyType::TopicAliasMaximum)? {
            self.topic_alias_maximum = maximum;
        }

        if let Some(request) = flag(&properties, PropertyType::RequestResponseInformation)? {
            self.request_response_info = request;
        }

        if let Some(request) = flag(&properties, PropertyType::RequestProblemInformation)? {
            self.request_problem_info = request;
        }

        if let Some(method) = properties.string(PropertyType::AuthenticationMethod)? {
            self.auth_method = Some(method.to_owned());
        }

        if let Some(data) = properties.binary(PropertyType::AuthenticationData)? {
            self.auth_data = Some(data);
        }

        if self.auth_data.is_some() && self.auth_method.is_none() {
            return Err(Error::AuthDataWithoutMethod);
        }

        self.user_properties = properties.take_user_properties();
        Ok(())
    }

    /// True when the client left it to the broker to pick a Client Identifier
    pub fn needs_assigned_id(&self) -> bool {
        self.client_id.is_empty()
    }

    /// Sets a Client Identifier chosen by the broker.
    ///
    /// The broker has to report it back in the CONNACK packet.
    pub fn assign_client_id(&mut self, client_id: impl Into<String>) {
        self.client_id = client_id.into();
    }
}

/// A byte property that holds 0 or 1
fn flag(properties: &PropertyMap, property: PropertyType) -> Result<Option<bool>, Error> {
    match properties.byte(property)? {
        None => Ok(None),
        Some(0) => Ok(Some(false)),
        Some(1) => Ok(Some(true)),
        Some(value) => Err(Error::InvalidPropertyValue {
            property,
            value: value.into(),
        }),
    }
}

/// Reads the protocol name and checks that it is `MQTT`
pub fn verify_protocol<R: Read>(cursor: &mut ByteCursor<R>) -> Result<(), Error> {
    let protocol_name = read_mqtt_string(cursor)?;
    if protocol_name != PROTOCOL_NAME {
        return Err(Error::InvalidProtocol(protocol_name));
    }

    Ok(())
}

/// Decodes the variable header and payload of a CONNECT packet.
///
/// The budget of `cursor` must be the remaining length of the packet.
pub fn decode_connect<R: Read>(cursor: &mut ByteCursor<R>) -> Result<ConnectSession, Error> {
    verify_protocol(cursor)?;

    let protocol_level = cursor.read_byte()?;
    if protocol_level != PROTOCOL_LEVEL {
        return Err(Error::InvalidProtocolLevel(protocol_level));
    }

    let flags = ConnectFlags::try_from(cursor.read_byte()?)?;
    let keep_alive = read_u16(cursor)?;

    let mut session = ConnectSession {
        keep_alive,
        flags,
        ..ConnectSession::default()
    };
    let properties = read_properties(cursor, PacketType::Connect.into())?;
    session.apply_properties(properties)?;

    session.client_id = read_mqtt_string(cursor)?;
    if flags.will_flag {
        session.will = Some(WillProperties::read(cursor)?);
    }

    if flags.user_name {
        session.username = Some(read_mqtt_string(cursor)?);
    }

    if flags.password {
        session.password = Some(read_mqtt_bytes(cursor)?);
    }

    log::debug!(
        "CONNECT: client id = {:?}, keep alive = {}, clean start = {}, will = {}",
        session.client_id,
        session.keep_alive,
        flags.clean_start,
        flags.will_flag
    );
    Ok(session)
}
