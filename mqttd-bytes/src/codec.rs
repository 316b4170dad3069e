use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::{read_packet, ByteCursor, Config, Error, FixedHeader, Packet};

/// A type that implements the [Decoder] trait for MQTT packets sent by clients.
///
/// A packet is decoded only once all of its bytes arrived.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    config: Config,
}

impl Codec {
    /// Creates a new codec with the given decoder settings
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Decoder for Codec {
    type Item = Packet;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let fixed_header = match FixedHeader::check(&src[..], self.config.max_packet_size()) {
            Ok(fixed_header) => fixed_header,
            Err(Error::InsufficientBytes(b)) => {
                // Get more packets to construct the incomplete packet
                src.reserve(b);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let frame = src.split_to(fixed_header.packet_size()).freeze();
        let mut cursor = ByteCursor::new(frame.reader());
        read_packet(&mut cursor, &self.config).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use futures_util::StreamExt;
    use pretty_assertions::assert_eq;
    use tokio_util::codec::{Decoder, FramedRead};

    use super::Codec;
    use crate::packet::tests::connect_packet;
    use crate::parse::write_mqtt_string;
    use crate::{Config, Error, Packet, PacketType};

    fn client_id(packet: Packet) -> String {
        let Packet::Connect(session) = packet;
        session.client_id
    }

    fn payload(client_id: &str) -> BytesMut {
        let mut payload = BytesMut::new();
        write_mqtt_string(&mut payload, client_id);
        payload
    }

    #[test]
    fn waits_for_complete_packet() {
        let packet = connect_packet(0x02, 60, &[], &payload("partial"));
        let mut codec = Codec::default();

        let mut buf = BytesMut::new();
        buf.extend_from_slice(&packet[..1]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(&packet[1..10]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 10);

        buf.extend_from_slice(&packet[10..]);
        let packet = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(client_id(packet), "partial");
        assert!(buf.is_empty());
    }

    #[test]
    fn incoming_max_packet_size_check() {
        let packet = connect_packet(0x02, 60, &[], &payload(&"x".repeat(100)));
        let mut codec = Codec::new(Config::new().with_max_packet_size(100));

        let mut buf = BytesMut::from(&packet[..]);
        match codec.decode(&mut buf) {
            Err(Error::PayloadSizeLimitExceeded {
                pkt_size: 115,
                max: 100,
            }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn unimplemented_packet_is_consumed() {
        let mut buf = BytesMut::from(&[0xC0, 0x00][..]);
        buf.extend_from_slice(&connect_packet(0x00, 0, &[], &payload("next")));

        let mut codec = Codec::default();
        assert!(matches!(
            codec.decode(&mut buf),
            Err(Error::Unimplemented(PacketType::PingReq))
        ));
        let packet = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(client_id(packet), "next");
    }

    #[tokio::test]
    async fn framed_stream() {
        let mut stream = BytesMut::new();
        for id in ["a", "b", "c"] {
            stream.extend_from_slice(&connect_packet(0x02, 60, &[], &payload(id)));
        }

        let mut framed = FramedRead::new(&stream[..], Codec::default());
        let mut ids = vec![];
        while let Some(packet) = framed.next().await {
            ids.push(client_id(packet.unwrap()));
        }

        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn framed_stream_reports_malformed_packet() {
        let mut stream = BytesMut::new();
        stream.extend_from_slice(&connect_packet(0x01, 60, &[], &payload("bad")));

        let mut framed = FramedRead::new(&stream[..], Codec::default());
        assert!(matches!(
            framed.next().await,
            Some(Err(Error::ReservedBitSet))
        ));
    }
}
