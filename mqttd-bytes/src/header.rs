//! Functionality for dealing with fixed headers of MQTT packets.

use std::io::{ErrorKind, Read};

use bytes::{BufMut, BytesMut};

use crate::parse::*;
use crate::{ByteCursor, Error, PacketType, QoS};

/// A fixed header never takes more than 5 bytes: the control field and
/// a variable byte integer of at most 4 bytes.
pub const MAX_FIXED_HEADER_LEN: usize = 5;

/// Fixed header of an MQTT Control Packet
///
/// See [specification](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901021).
///
/// ```text
///           7                          3                          0
///           +--------------------------+--------------------------+
/// byte 1    | MQTT Control Packet Type |   Flags for each type    |
///           +--------------------------+--------------------------+
/// bytes 2.. |            Remaining Length (1 to 4 bytes)          |
///           +-----------------------------------------------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd)]
pub struct FixedHeader {
    /// Contains the packet type and several flags
    pub control_field: u8,
    /// Remaining length of the packet.
    ///
    /// This does not include the fixed header bytes.
    /// It represents the variable header + payload.
    pub remaining_len: VarInt,
}

impl FixedHeader {
    /// Creates the fixed header of a packet, using the flags that the protocol
    /// mandates for its type.
    ///
    /// PUBLISH packets carry their own flags, see [`FixedHeader::publish`].
    pub fn new(packet_type: PacketType, remaining_len: VarInt) -> FixedHeader {
        FixedHeader {
            control_field: ((packet_type as u8) << 4) | packet_type.reserved_flags(),
            remaining_len,
        }
    }

    /// Creates the fixed header of a PUBLISH packet
    pub fn publish(dup: bool, qos: QoS, retain: bool, remaining_len: VarInt) -> FixedHeader {
        let flags = ((dup as u8) << 3) | ((qos as u8) << 1) | retain as u8;
        FixedHeader {
            control_field: ((PacketType::Publish as u8) << 4) | flags,
            remaining_len,
        }
    }

    /// Parse the [PacketType] from the control field
    pub fn packet_type(&self) -> Result<PacketType, Error> {
        PacketType::try_from(self.control_field >> 4)
    }

    /// Get the flag bits from the control field
    #[inline]
    pub fn flags(&self) -> u8 {
        self.control_field & 0x0F
    }

    /// DUP flag of a PUBLISH packet
    #[inline]
    pub fn dup(&self) -> bool {
        (self.flags() & 0b1000) != 0
    }

    /// QoS level of a PUBLISH packet
    pub fn qos(&self) -> Result<QoS, Error> {
        QoS::try_from((self.flags() & 0b0110) >> 1)
    }

    /// RETAIN flag of a PUBLISH packet
    #[inline]
    pub fn retain(&self) -> bool {
        (self.flags() & 0b0001) != 0
    }

    /// Checks the flag bits against the packet type and returns the type.
    ///
    /// PUBLISH may use any flags as long as the QoS is valid. Every other type
    /// has a fixed flag nibble.
    pub fn validate(&self) -> Result<PacketType, Error> {
        let packet_type = self.packet_type()?;
        match packet_type {
            PacketType::Publish => {
                self.qos()?;
            }
            _ if self.flags() != packet_type.reserved_flags() => {
                return Err(Error::InvalidHeaderFlags {
                    packet_type,
                    flags: self.flags(),
                });
            }
            _ => (),
        }

        Ok(packet_type)
    }

    /// Returns the size of the fixed header
    #[inline]
    pub fn size(&self) -> usize {
        1 + self.remaining_len.length()
    }

    /// Returns the size of full packet (fixed header + variable header + payload)
    #[inline]
    pub fn packet_size(&self) -> usize {
        self.size() + self.remaining_len.value()
    }

    /// Reads the fixed header of the next packet from a connection.
    ///
    /// The budget of the cursor is limited to the size of a fixed header while
    /// it is parsed, and afterwards set to the remaining length of the packet.
    pub fn read<R: Read>(cursor: &mut ByteCursor<R>) -> Result<Self, Error> {
        cursor.set_remaining_length(MAX_FIXED_HEADER_LEN);
        let fixed_header = Self::parse(cursor)?;
        cursor.set_remaining_length(fixed_header.remaining_len.value());

        log::debug!(
            "Fixed header: control field = {:#010b}, remaining length = {}",
            fixed_header.control_field,
            fixed_header.remaining_len.value()
        );
        Ok(fixed_header)
    }

    /// Checks if the stream has enough bytes to frame a packet and returns fixed header
    /// only if a packet can be framed with existing bytes in the `stream`.
    ///
    /// The stream itself is not advanced.
    pub fn check(stream: &[u8], max_packet_size: u32) -> Result<Self, Error> {
        let mut cursor = ByteCursor::with_remaining_length(stream, MAX_FIXED_HEADER_LEN);
        let fixed_header = match Self::parse(&mut cursor) {
            Ok(header) => header,
            Err(Error::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                let required = if stream.is_empty() { 2 } else { 1 };
                return Err(Error::InsufficientBytes(required));
            }
            Err(e) => return Err(e),
        };

        // Don't let rogue connections attack with huge payloads.
        // Disconnect them before reading all that data
        fixed_header.check_size(max_packet_size)?;

        let frame_length = fixed_header.packet_size();
        if stream.len() < frame_length {
            return Err(Error::InsufficientBytes(frame_length - stream.len()));
        }

        Ok(fixed_header)
    }

    /// Rejects packets larger than `max_packet_size` bytes in total
    pub fn check_size(&self, max_packet_size: u32) -> Result<(), Error> {
        if self.packet_size() > max_packet_size as usize {
            log::warn!(
                "Packet of {} bytes exceeds the maximum packet size of {max_packet_size}",
                self.packet_size()
            );
            return Err(Error::PayloadSizeLimitExceeded {
                pkt_size: self.packet_size() as u32,
                max: max_packet_size,
            });
        }

        Ok(())
    }

    /// Writes the fixed header and returns the number of bytes written
    pub fn write(&self, stream: &mut BytesMut) -> usize {
        stream.put_u8(self.control_field);
        self.remaining_len.write(stream);
        self.size()
    }

    fn parse<R: Read>(cursor: &mut ByteCursor<R>) -> Result<Self, Error> {
        let control_field = cursor.read_byte()?;
        let remaining_len = VarInt::read(cursor)?;

        Ok(Self {
            control_field,
            remaining_len,
        })
    }
}
