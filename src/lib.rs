//! Sequenced channels on top of UDP: messages on a channel are delivered in the order they were
//!  sent, but lost messages are not re-sent. This is for data where only the newest state
//!  matters, or where a late message is worthless anyway - game state, telemetry, media
//!  control - but where applying messages out of order would be wrong.
//!
//! ## Wire format
//!
//! Every message is sent in a single datagram, there is no fragmentation:
//!
//! ```ascii
//! 0: channel id (u8) - connection-level, see [end_point::ConnectionEndPoint]
//! 1: sequence number (u16 BE), wrapping around to 0 after 65535
//! 3: payload
//! ```
//!
//! Sequence numbers are compared with wrap-around arithmetic: a sequence number is ahead of
//!  another if it follows it by at most 32767.
//!
//! ## Receiving
//!
//! Each channel tracks the next sequence number it expects. A datagram carrying that number is
//!  delivered immediately, without copying, as a view into the receive buffer. Datagrams that
//!  are ahead (but inside the configured reorder window) are copied and held back until the
//!  gap before them is closed. Everything else is dropped: stale datagrams, duplicates, and
//!  datagrams too far ahead (unless the channel is configured to skip ahead instead).
//!
//! Released messages are therefore [buffers::memory_pointer::MemoryPointer]s, which are either
//!  a borrowed view into the datagram or an owned buffer that was allocated for reordering.
//!
//! ## Buffers
//!
//! Outgoing datagrams are assembled in pooled buffers from a [buffers::memory_manager::MemoryManager]
//!  that is shared by all channels, and returned to the pool after sending.

pub mod buffers;
pub mod channel_header;
pub mod config;
pub mod connection;
pub mod end_point;
pub mod error;
pub mod message_dispatcher;
mod reorder_buffer;
pub mod safe_converter;
pub mod send_socket;
pub mod sequence_number;
pub mod sequenced_channel;

#[cfg(test)] mod test_util;
