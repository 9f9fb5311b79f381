use anyhow::bail;
use rustc_hash::FxHashMap;
use crate::channel_header::ChannelHeader;
use crate::sequence_number::SequenceNumber;

pub struct SocketConfig {
    /// This is the number of bytes a single channel datagram (channel header plus payload) may
    ///  have. Sequenced channels never fragment, so this is the hard upper bound for message
    ///  size, and it must be supported by every network route between the peers.
    ///
    /// NB: This is the budget *after* any outer connection-level header was stripped
    pub minimum_mtu: usize,

    pub memory: MemoryConfig,

    pub default_channel_config: ChannelConfig,
    pub specific_channel_configs: FxHashMap<u8, ChannelConfig>,

    /// The channels that are created for every connection, symmetrically on both peers
    pub channel_ids: Vec<u8>,
}

impl SocketConfig {
    pub fn default_ipv4() -> SocketConfig {
        SocketConfig {
            minimum_mtu: 1050,
            memory: MemoryConfig {
                min_size_class: 64,
                max_size_class: 2048,
                max_pooled_per_class: 1024,
            },
            default_channel_config: ChannelConfig {
                reorder_window: 64,
                gap_policy: GapPolicy::Drop,
            },
            specific_channel_configs: FxHashMap::default(),
            channel_ids: vec![0],
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.minimum_mtu <= ChannelHeader::SERIALIZED_LEN {
            bail!("minimum MTU {} leaves no room for a payload", self.minimum_mtu);
        }
        if self.minimum_mtu > u16::MAX as usize {
            bail!("minimum MTU {} exceeds the maximum UDP payload", self.minimum_mtu);
        }

        self.memory.validate()?;

        for config in std::iter::once(&self.default_channel_config).chain(self.specific_channel_configs.values()) {
            config.validate()?;
        }

        if self.channel_ids.is_empty() {
            bail!("at least one channel must be configured");
        }
        for (i, id) in self.channel_ids.iter().enumerate() {
            if self.channel_ids[..i].contains(id) {
                bail!("duplicate channel id {}", id);
            }
        }

        Ok(())
    }

    pub fn get_effective_channel_config(&self, channel_id: u8) -> EffectiveChannelConfig {
        let raw = self.specific_channel_configs.get(&channel_id)
            .unwrap_or(&self.default_channel_config);

        EffectiveChannelConfig {
            channel_id,
            max_payload_len: self.minimum_mtu.saturating_sub(ChannelHeader::SERIALIZED_LEN),
            reorder_window: raw.reorder_window,
            gap_policy: raw.gap_policy,
        }
    }
}

pub struct MemoryConfig {
    /// The smallest bucket - smaller requests are rounded up to this
    pub min_size_class: usize,
    /// The biggest bucket. Requests above this are served with unpooled buffers
    pub max_size_class: usize,
    /// This is the number of buffers that are retained per bucket - buffers in excess of this
    ///  number are discarded when they are returned.
    pub max_pooled_per_class: usize,
}

impl MemoryConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.min_size_class.is_power_of_two() || !self.max_size_class.is_power_of_two() {
            bail!("size classes must be powers of two");
        }
        if self.min_size_class > self.max_size_class {
            bail!("minimum size class {} is bigger than maximum size class {}", self.min_size_class, self.max_size_class);
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GapPolicy {
    /// Datagrams too far ahead of the next expected sequence number are discarded
    Drop,
    /// Missing sequence numbers are given up on: everything buffered is released, and the
    ///  channel continues after the far-ahead datagram
    SkipAhead,
}

#[derive(Clone, Debug)]
pub struct ChannelConfig {
    /// The maximum distance ahead of the next expected sequence number that is buffered
    pub reorder_window: u16,
    pub gap_policy: GapPolicy,
}

impl ChannelConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.reorder_window == 0 {
            bail!("reorder window must not be empty");
        }
        if self.reorder_window > SequenceNumber::MAX_FORWARD_DISTANCE {
            bail!("reorder window {} is not less than half the sequence number space", self.reorder_window);
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct EffectiveChannelConfig {
    pub channel_id: u8,
    pub max_payload_len: usize,
    pub reorder_window: u16,
    pub gap_policy: GapPolicy,
}
