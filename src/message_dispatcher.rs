use async_trait::async_trait;
#[cfg(test)] use mockall::automock;
use std::net::SocketAddr;


/// Application-side receiver of messages, called once per released message in delivery order
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessageDispatcher: Send + Sync + 'static {
    async fn on_message(&self, peer_addr: SocketAddr, channel_id: u8, msg_buf: &[u8]);
}
