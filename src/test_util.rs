//! Helpers shared by the unit tests of several modules

use std::net::SocketAddr;
use std::sync::Arc;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use crate::buffers::memory_manager::MemoryManager;
use crate::config::{EffectiveChannelConfig, GapPolicy, SocketConfig};
use crate::connection::ConnectionHandle;
use crate::sequenced_channel::SequencedChannel;

/// deterministic pseudo-random content, different for different seeds
pub fn random_payload(len: usize, seed: u64) -> Vec<u8> {
    let mut result = vec![0u8; len];
    StdRng::seed_from_u64(seed).fill_bytes(&mut result);
    result
}

pub fn test_config() -> SocketConfig {
    SocketConfig::default_ipv4()
}

pub fn stub_connection() -> Arc<ConnectionHandle> {
    Arc::new(ConnectionHandle::new(SocketAddr::from(([127, 0, 0, 1], 9876))))
}

pub fn memory_manager() -> Arc<MemoryManager> {
    Arc::new(MemoryManager::new(&test_config().memory).unwrap())
}

pub fn channel_config(reorder_window: u16, gap_policy: GapPolicy) -> EffectiveChannelConfig {
    EffectiveChannelConfig {
        channel_id: 0,
        max_payload_len: 1048,
        reorder_window,
        gap_policy,
    }
}

/// a pair of channels as they would exist on both sides of the same connection, sharing a
///  memory manager
pub fn channel_pair(reorder_window: u16, gap_policy: GapPolicy) -> (SequencedChannel, SequencedChannel, Arc<MemoryManager>) {
    let memory_manager = memory_manager();
    let client = SequencedChannel::new(channel_config(reorder_window, gap_policy), stub_connection(), memory_manager.clone());
    let server = SequencedChannel::new(channel_config(reorder_window, gap_policy), stub_connection(), memory_manager.clone());
    (client, server, memory_manager)
}
