use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;
use crate::error::ChannelError;

/// The part of a connection that its channels need to know about. The connection itself
///  (handshake, heartbeat, socket) lives outside this crate; channels get a shared handle for
///  diagnostics.
pub struct ConnectionHandle {
    peer_addr: SocketAddr,
    protocol_violations: AtomicU64,
}

impl ConnectionHandle {
    pub fn new(peer_addr: SocketAddr) -> ConnectionHandle {
        ConnectionHandle {
            peer_addr,
            protocol_violations: AtomicU64::new(0),
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Record a datagram that no correct peer would have sent. The datagram is dropped by the
    ///  caller; this is for diagnostics only.
    pub fn report_protocol_violation(&self, channel_id: Option<u8>, error: &ChannelError) {
        warn!("protocol violation from {:?} on channel {:?}: {} - dropping datagram", self.peer_addr, channel_id, error);
        self.protocol_violations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn protocol_violations(&self) -> u64 {
        self.protocol_violations.load(Ordering::Relaxed)
    }
}
