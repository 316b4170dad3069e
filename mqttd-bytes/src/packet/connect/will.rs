use std::io::Read;

use bytes::Bytes;

use crate::config::defaults;
use crate::parse::*;
use crate::property::{read_properties, PropertyContext, PropertyMap, PropertyType, UserProperty};
use crate::{ByteCursor, Error};

/// Will message that the broker publishes on behalf of a client
/// once its network connection closes without a DISCONNECT.
///
/// QoS and retain flag of the will are part of [`super::ConnectFlags`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WillProperties {
    /// Seconds to wait before the will is published
    pub will_delay_interval: u32,
    /// 0 for unspecified bytes, 1 for UTF-8 encoded character data
    pub payload_format_indicator: u8,
    pub message_expiry_interval: u32,
    pub content_type: Option<String>,
    pub response_topic: Option<String>,
    pub correlation_data: Option<Bytes>,
    pub user_properties: Vec<UserProperty>,
    pub topic: String,
    pub payload: Bytes,
}

impl Default for WillProperties {
    fn default() -> Self {
        Self {
            will_delay_interval: defaults::WILL_DELAY_INTERVAL,
            payload_format_indicator: defaults::PAYLOAD_FORMAT_INDICATOR,
            message_expiry_interval: defaults::MESSAGE_EXPIRY_INTERVAL,
            content_type: None,
            response_topic: None,
            correlation_data: None,
            user_properties: Vec::new(),
            topic: String::new(),
            payload: Bytes::new(),
        }
    }
}

impl WillProperties {
    /// Builds a will from its property table. Topic and payload are left empty.
    ///
    /// Absent properties keep their default values.
    pub fn from_properties(mut properties: PropertyMap) -> Result<Self, Error> {
        let mut will = WillProperties::default();

        if let Some(delay) = properties.four_byte_integer(PropertyType::WillDelayInterval)? {
            will.will_delay_interval = delay;
        }

        if let Some(indicator) = properties.byte(PropertyType::PayloadFormatIndicator)? {
            if indicator > 1 {
                return Err(Error::InvalidPropertyValue {
                    property: PropertyType::PayloadFormatIndicator,
                    value: indicator.into(),
                });
            }
            will.payload_format_indicator = indicator;
        }

        if let Some(expiry) = properties.four_byte_integer(PropertyType::MessageExpiryInterval)? {
            will.message_expiry_interval = expiry;
        }

        will.content_type = properties
            .string(PropertyType::ContentType)?
            .map(str::to_owned);
        will.response_topic = properties
            .string(PropertyType::ResponseTopic)?
            .map(str::to_owned);
        will.correlation_data = properties.binary(PropertyType::CorrelationData)?;
        will.user_properties = properties.take_user_properties();

        Ok(will)
    }

    /// Reads the will properties, will topic and will payload of a CONNECT payload
    pub fn read<R: Read>(cursor: &mut ByteCursor<R>) -> Result<Self, Error> {
        let properties = read_properties(cursor, PropertyContext::Will)?;
        let mut will = Self::from_properties(properties)?;
        will.topic = read_mqtt_string(cursor)?;
        will.payload = read_mqtt_bytes(cursor)?;

        Ok(will)
    }
}

#[cfg(test)]
mod tests {
    use bytes::{BufMut, BytesMut};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::property::PropertyValue;
    use crate::VarInt;

    #[test]
    fn defaults_without_properties() {
        let will = WillProperties::from_properties(PropertyMap::new()).unwrap();
        assert_eq!(will, WillProperties::default());
        assert_eq!(will.will_delay_interval, 0);
        assert_eq!(will.payload_format_indicator, 0);
        assert_eq!(will.message_expiry_interval, 0);
    }

    #[test]
    fn all_properties() {
        let mut properties = PropertyMap::new();
        #[rustfmt::skip]
        let values = [
            (PropertyType::WillDelayInterval, PropertyValue::FourByteInteger(30)),
            (PropertyType::PayloadFormatIndicator, PropertyValue::Byte(1)),
            (PropertyType::MessageExpiryInterval, PropertyValue::FourByteInteger(3600)),
            (PropertyType::ContentType, PropertyValue::Utf8String("text/plain".into())),
            (PropertyType::ResponseTopic, PropertyValue::Utf8String("replies".into())),
            (PropertyType::CorrelationData, PropertyValue::BinaryData(Bytes::from_static(b"42"))),
        ];
        for (property, value) in values {
            properties.insert(property, value).unwrap();
        }
        properties.add_user_property(UserProperty::new("a", "b"));

        let will = WillProperties::from_properties(properties).unwrap();
        assert_eq!(
            will,
            WillProperties {
                will_delay_interval: 30,
                payload_format_indicator: 1,
                message_expiry_interval: 3600,
                content_type: Some("text/plain".to_owned()),
                response_topic: Some("replies".to_owned()),
                correlation_data: Some(Bytes::from_static(b"42")),
                user_properties: vec![UserProperty::new("a", "b")],
                topic: String::new(),
                payload: Bytes::new(),
            }
        );
    }

    #[test]
    fn payload_format_indicator_is_zero_or_one() {
        let mut properties = PropertyMap::new();
        properties
            .insert(PropertyType::PayloadFormatIndicator, PropertyValue::Byte(2))
            .unwrap();
        assert!(matches!(
            WillProperties::from_properties(properties),
            Err(Error::InvalidPropertyValue {
                property: PropertyType::PayloadFormatIndicator,
                value: 2
            })
        ));
    }

    #[test]
    fn read_will() {
        let mut stream = BytesMut::new();
        let mut properties = BytesMut::new();
        properties.put_u8(0x18);
        properties.put_u32(10);
        VarInt::new(properties.len()).unwrap().write(&mut stream);
        stream.extend_from_slice(&properties);
        write_mqtt_string(&mut stream, "clients/gone");
        write_mqtt_bytes(&mut stream, b"bye");

        let mut cursor = ByteCursor::with_remaining_length(&stream[..], stream.len());
        let will = WillProperties::read(&mut cursor).unwrap();
        assert_eq!(will.will_delay_interval, 10);
        assert_eq!(will.topic, "clients/gone");
        assert_eq!(will.payload, Bytes::from_static(b"bye"));
        assert_eq!(cursor.remaining_length(), 0);
    }

    #[test]
    fn read_will_rejects_connect_properties() {
        let mut stream = BytesMut::new();
        // session expiry interval is not a will property
        stream.extend_from_slice(&[0x05, 0x11, 0x00, 0x00, 0x00, 0x01]);
        write_mqtt_string(&mut stream, "t");
        write_mqtt_bytes(&mut stream, b"");

        let mut cursor = ByteCursor::with_remaining_length(&stream[..], stream.len());
        assert!(matches!(
            WillProperties::read(&mut cursor),
            Err(Error::InvalidPropertyForContext {
                property: 0x11,
                context: PropertyContext::Will
            })
        ));
    }
}
