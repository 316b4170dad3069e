//! Decoder configuration and protocol defaults

/// Values the protocol assigns to properties that are absent from a packet
pub mod defaults {
    /// Largest packet the decoder accepts unless configured otherwise, in bytes
    pub const MAX_PACKET_SIZE: u32 = 65_536;

    pub const SESSION_EXPIRY_INTERVAL: u32 = 0;
    /// The largest value of a two byte integer
    pub const RECEIVE_MAXIMUM: u16 = u16::MAX;
    pub const TOPIC_ALIAS_MAXIMUM: u16 = 0;
    pub const REQUEST_RESPONSE_INFORMATION: bool = false;
    pub const REQUEST_PROBLEM_INFORMATION: bool = true;
    pub const WILL_DELAY_INTERVAL: u32 = 0;
    pub const PAYLOAD_FORMAT_INDICATOR: u8 = 0;
    /// Zero means the will message is published without an expiry interval
    pub const MESSAGE_EXPIRY_INTERVAL: u32 = 0;
}

/// Settings of a packet decoder
///
/// ```
/// # use mqttd_bytes::Config;
/// let config = Config::new().with_max_packet_size(1024);
/// assert_eq!(config.max_packet_size(), 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Maximum size of an incoming packet, fixed header included
    max_packet_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_packet_size: defaults::MAX_PACKET_SIZE,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum size of an incoming packet
    ///
    /// Larger packets are rejected as soon as their fixed header is read.
    pub fn with_max_packet_size(mut self, max_packet_size: u32) -> Self {
        self.max_packet_size = max_packet_size;
        self
    }

    /// Maximum packet size
    pub fn max_packet_size(&self) -> u32 {
        self.max_packet_size
    }
}
