use std::net::SocketAddr;
use std::sync::Arc;
use rustc_hash::FxHashMap;
use tracing::{debug, span, trace, Instrument, Level};
use crate::buffers::memory_manager::MemoryManager;
use crate::buffers::memory_pointer::MemoryPointer;
use crate::config::SocketConfig;
use crate::connection::ConnectionHandle;
use crate::error::{ChannelError, Result};
use crate::message_dispatcher::MessageDispatcher;
use crate::send_socket::SendSocket;
use crate::sequenced_channel::SequencedChannel;

/// ConnectionEndPoint is where the channels of a single connection come together: it routes
///  incoming datagrams to their channel based on a one-byte channel id prefix, hands released
///  messages to the application, and has an API for application code to send messages.
///
/// Datagrams are `channel id (u8) | sequence number (u16, BE) | payload`.
pub struct ConnectionEndPoint {
    connection: Arc<ConnectionHandle>,
    memory_manager: Arc<MemoryManager>,
    send_socket: Arc<dyn SendSocket>,
    message_dispatcher: Arc<dyn MessageDispatcher>,
    channels: FxHashMap<u8, SequencedChannel>,
}

impl ConnectionEndPoint {
    pub fn new(
        config: &SocketConfig,
        peer_addr: SocketAddr,
        memory_manager: Arc<MemoryManager>,
        send_socket: Arc<dyn SendSocket>,
        message_dispatcher: Arc<dyn MessageDispatcher>,
    ) -> anyhow::Result<ConnectionEndPoint> {
        config.validate()?;

        debug!("initializing end point for {:?} with channels {:?}", peer_addr, config.channel_ids);

        let connection = Arc::new(ConnectionHandle::new(peer_addr));
        let channels = config.channel_ids.iter()
            .map(|&id| (id, SequencedChannel::new(config.get_effective_channel_config(id), connection.clone(), memory_manager.clone())))
            .collect();

        Ok(ConnectionEndPoint {
            connection,
            memory_manager,
            send_socket,
            message_dispatcher,
            channels,
        })
    }

    pub fn connection(&self) -> &Arc<ConnectionHandle> {
        &self.connection
    }

    pub fn channel(&self, channel_id: u8) -> Option<&SequencedChannel> {
        self.channels.get(&channel_id)
    }

    pub async fn send_message(&mut self, channel_id: u8, payload: &[u8]) -> Result<()> {
        let channel = self.channels.get_mut(&channel_id)
            .ok_or(ChannelError::UnknownChannel(channel_id))?;

        let buf = channel.create_outgoing_message_with_prefix(&[channel_id], payload)?;
        self.send_socket.do_send_datagram(self.connection.peer_addr(), buf.as_ref()).await;
        self.memory_manager.release_pooled(buf);
        Ok(())
    }

    /// Handle a datagram received from this end point's peer. Messages that become deliverable
    ///  are passed to the [MessageDispatcher] in order before this returns.
    pub async fn on_datagram(&mut self, datagram: &[u8]) {
        let span = span!(Level::TRACE, "datagram_received", peer_addr = ?self.connection.peer_addr(), len = datagram.len());
        self.do_on_datagram(datagram)
            .instrument(span)
            .await
    }

    async fn do_on_datagram(&mut self, datagram: &[u8]) {
        let Some((&channel_id, channel_datagram)) = datagram.split_first() else {
            self.connection.report_protocol_violation(None, &ChannelError::MalformedHeader { datagram_len: 0 });
            return;
        };

        let Some(channel) = self.channels.get_mut(&channel_id) else {
            self.connection.report_protocol_violation(None, &ChannelError::UnknownChannel(channel_id));
            return;
        };

        let released = channel.handle_incoming_datagram(channel_datagram);
        trace!("{} message(s) released on channel {}", released.len(), channel_id);

        let peer_addr = self.connection.peer_addr();
        for msg in released {
            self.message_dispatcher.on_message(peer_addr, channel_id, msg.as_ref()).await;
            if let MemoryPointer::Allocated(buf) = msg {
                self.memory_manager.release_standalone(buf);
            }
        }
    }
}
