use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChannelError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The payload does not fit into a single datagram - sequenced channels do not fragment
    #[error("payload of {payload_len} bytes exceeds the maximum of {max_payload_len} bytes per datagram")]
    PayloadTooLarge { payload_len: usize, max_payload_len: usize },

    #[error("datagram of {datagram_len} bytes is too short for a channel header")]
    MalformedHeader { datagram_len: usize },

    #[error("sequence distance {distance} exceeds the reorder window of {window}")]
    SequenceGapExceeded { distance: i16, window: u16 },

    #[error("unknown channel id {0}")]
    UnknownChannel(u8),
}
