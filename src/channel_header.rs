use bytes::{Buf, BufMut};
use crate::error::ChannelError;
use crate::sequence_number::SequenceNumber;

/// The header in front of every datagram payload on a sequenced channel (network byte order):
///
/// ```ascii
/// 0: sequence number (u16)
/// 2: application payload
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelHeader {
    pub sequence: SequenceNumber,
}

impl ChannelHeader {
    pub const SERIALIZED_LEN: usize = size_of::<u16>();

    pub fn ser(&self, buf: &mut impl BufMut) {
        buf.put_u16(self.sequence.to_raw());
    }

    pub fn deser(buf: &mut impl Buf) -> Result<Self, ChannelError> {
        if buf.remaining() < Self::SERIALIZED_LEN {
            return Err(ChannelError::MalformedHeader { datagram_len: buf.remaining() });
        }

        Ok(ChannelHeader {
            sequence: SequenceNumber::from_raw(buf.get_u16()),
        })
    }
}
