use std::sync::Arc;
use bytes::BufMut;
use tracing::{debug, trace};
use crate::buffers::memory_manager::MemoryManager;
use crate::buffers::memory_pointer::MemoryPointer;
use crate::buffers::pooled_buf::PooledBuf;
use crate::channel_header::ChannelHeader;
use crate::config::{EffectiveChannelConfig, GapPolicy};
use crate::connection::ConnectionHandle;
use crate::error::{ChannelError, Result};
use crate::reorder_buffer::ReorderBuffer;
use crate::sequence_number::SequenceNumber;
use crate::safe_converter::{PrecheckedCast, SafeCast};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub sent: u64,
    /// in-order messages released as views into the datagram they arrived in
    pub released_direct: u64,
    /// messages released from the reorder buffer
    pub released_buffered: u64,
    /// messages currently waiting in the reorder buffer
    pub buffered: u64,
    pub duplicates: u64,
    pub stale: u64,
    pub malformed: u64,
    pub gaps_exceeded: u64,
    /// sequence numbers that were given up on without ever arriving
    pub skipped: u64,
}

enum Admission {
    InOrder,
    Stale,
    Duplicate,
    Future(u16),
}

/// A sequenced channel delivers messages in the order they were sent, but it does not ask for
///  lost messages to be re-sent. Messages that arrive early are held back until the gap before
///  them is closed, and messages that arrive late are discarded.
///
/// There is one instance per (connection, channel id), and both directions share it: an
///  outgoing sequence counter for framing messages, and incoming state for putting received
///  datagrams back in order.
///
/// A channel is plain mutable state without internal synchronization. The transport is expected
///  to serialize processing per connection, or to wrap the channel in a single lock.
pub struct SequencedChannel {
    config: EffectiveChannelConfig,
    connection: Arc<ConnectionHandle>,
    memory_manager: Arc<MemoryManager>,

    next_outgoing_sequence: SequenceNumber,

    /// the sequence number whose arrival releases the next message(s)
    next_expected_sequence: SequenceNumber,
    reorder_buffer: ReorderBuffer,

    stats: ChannelStats,
}

impl SequencedChannel {
    pub fn new(
        config: EffectiveChannelConfig,
        connection: Arc<ConnectionHandle>,
        memory_manager: Arc<MemoryManager>,
    ) -> SequencedChannel {
        debug!("initializing sequenced channel {} for {:?}", config.channel_id, connection.peer_addr());

        let reorder_buffer = ReorderBuffer::new(config.reorder_window);
        SequencedChannel {
            config,
            connection,
            memory_manager,
            next_outgoing_sequence: SequenceNumber::ZERO,
            next_expected_sequence: SequenceNumber::ZERO,
            reorder_buffer,
            stats: ChannelStats::default(),
        }
    }

    pub fn channel_id(&self) -> u8 {
        self.config.channel_id
    }

    pub fn max_payload_len(&self) -> usize {
        self.config.max_payload_len
    }

    pub fn next_outgoing_sequence(&self) -> SequenceNumber {
        self.next_outgoing_sequence
    }

    pub fn next_expected_sequence(&self) -> SequenceNumber {
        self.next_expected_sequence
    }

    pub fn num_buffered(&self) -> usize {
        self.reorder_buffer.len()
    }

    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            buffered: self.reorder_buffer.len().safe_cast(),
            ..self.stats.clone()
        }
    }

    /// Frame a payload as the next message on this channel. The returned buffer is owned by the
    ///  caller, who is expected to send it and then return it via
    ///  [MemoryManager::release_pooled].
    pub fn create_outgoing_message(&mut self, payload: &[u8]) -> Result<PooledBuf> {
        self.create_outgoing_message_with_prefix(&[], payload)
    }

    /// Same as [SequencedChannel::create_outgoing_message], but writes `prefix` in front of the
    ///  channel header. This is for outer headers of the connection layer, and it is not counted
    ///  against the channel's payload limit.
    pub fn create_outgoing_message_with_prefix(&mut self, prefix: &[u8], payload: &[u8]) -> Result<PooledBuf> {
        if payload.len() > self.config.max_payload_len {
            debug!("payload of {} bytes on channel {} exceeds the maximum of {} bytes", payload.len(), self.config.channel_id, self.config.max_payload_len);
            return Err(ChannelError::PayloadTooLarge {
                payload_len: payload.len(),
                max_payload_len: self.config.max_payload_len,
            });
        }

        let mut buf = self.memory_manager.acquire_pooled(prefix.len() + ChannelHeader::SERIALIZED_LEN + payload.len());
        buf.put_slice(prefix);
        ChannelHeader { sequence: self.next_outgoing_sequence }
            .ser(&mut buf);
        buf.put_slice(payload);

        trace!("framed message #{} with {} bytes on channel {}", self.next_outgoing_sequence, payload.len(), self.config.channel_id);
        self.next_outgoing_sequence = self.next_outgoing_sequence.next();
        self.stats.sent += 1;

        Ok(buf)
    }

    /// Handle a datagram (channel header and payload) received on this channel, returning the
    ///  messages that become deliverable in the order they must be delivered.
    ///
    /// If the datagram carries the next expected message, it is released as a zero-copy view,
    ///  followed by any buffered messages that directly follow it. If it is ahead of the next
    ///  expected message, its payload is copied to a standalone buffer and held back. Everything
    ///  else is discarded.
    ///
    /// This never fails - a malformed or hostile datagram can only cause that datagram to be
    ///  dropped.
    pub fn handle_incoming_datagram<'a>(&mut self, datagram: &'a [u8]) -> Vec<MemoryPointer<'a>> {
        let mut parse_buf = datagram;
        let header = match ChannelHeader::deser(&mut parse_buf) {
            Ok(header) => header,
            Err(e) => {
                self.stats.malformed += 1;
                self.connection.report_protocol_violation(Some(self.config.channel_id), &e);
                return Vec::new();
            }
        };
        let payload: &'a [u8] = parse_buf;

        trace!("received message #{} with {} bytes on channel {} from {:?}, next expected #{}", header.sequence, payload.len(), self.config.channel_id, self.connection.peer_addr(), self.next_expected_sequence);

        match self.admit(header.sequence) {
            Ok(Admission::InOrder) => {
                let mut released = vec![MemoryPointer::Direct(payload)];
                self.stats.released_direct += 1;
                self.next_expected_sequence = self.next_expected_sequence.next();
                self.release_contiguous(&mut released);
                released
            }
            Ok(Admission::Stale) => {
                debug!("message #{} on channel {} is behind the next expected #{} - dropping", header.sequence, self.config.channel_id, self.next_expected_sequence);
                self.stats.stale += 1;
                Vec::new()
            }
            Ok(Admission::Duplicate) => {
                debug!("message #{} on channel {} is buffered already - dropping duplicate", header.sequence, self.config.channel_id);
                self.stats.duplicates += 1;
                Vec::new()
            }
            Ok(Admission::Future(distance)) => {
                debug!("message #{} on channel {} arrived ahead of #{} - buffering", header.sequence, self.config.channel_id, self.next_expected_sequence);
                let mut buf = self.memory_manager.acquire_standalone(payload.len());
                buf.extend_from_slice(payload);

                // admission checked that the slot is free
                if let Err(buf) = self.reorder_buffer.insert(distance, buf) {
                    self.memory_manager.release_standalone(buf);
                }
                Vec::new()
            }
            Err(e) => {
                self.stats.gaps_exceeded += 1;
                match self.config.gap_policy {
                    GapPolicy::Drop => {
                        debug!("message #{} on channel {}: {} - dropping", header.sequence, self.config.channel_id, e);
                        Vec::new()
                    }
                    GapPolicy::SkipAhead => {
                        debug!("message #{} on channel {}: {} - skipping ahead", header.sequence, self.config.channel_id, e);
                        self.skip_ahead(header.sequence, payload)
                    }
                }
            }
        }
    }

    fn admit(&self, sequence: SequenceNumber) -> Result<Admission> {
        let distance = sequence.distance_from(self.next_expected_sequence);

        if distance == 0 {
            return Ok(Admission::InOrder);
        }
        if distance < 0 {
            return Ok(Admission::Stale);
        }

        let distance = distance as u16;
        if distance > self.reorder_buffer.window() {
            return Err(ChannelError::SequenceGapExceeded {
                distance: distance as i16,
                window: self.reorder_buffer.window(),
            });
        }
        if self.reorder_buffer.contains(distance) {
            return Ok(Admission::Duplicate);
        }
        Ok(Admission::Future(distance))
    }

    /// Called after `next_expected_sequence` moved forward: releases the run of buffered
    ///  messages starting there
    fn release_contiguous<'a>(&mut self, released: &mut Vec<MemoryPointer<'a>>) {
        while let Some(buf) = self.reorder_buffer.advance() {
            trace!("releasing buffered message #{} on channel {}", self.next_expected_sequence, self.config.channel_id);
            released.push(MemoryPointer::Allocated(buf));
            self.stats.released_buffered += 1;
            self.next_expected_sequence = self.next_expected_sequence.next();
        }
    }

    /// Give up on all missing messages before `sequence`: buffered messages are released in
    ///  order, followed by the new message, and the channel continues after it.
    fn skip_ahead<'a>(&mut self, sequence: SequenceNumber, payload: &'a [u8]) -> Vec<MemoryPointer<'a>> {
        let distance = sequence.distance_from(self.next_expected_sequence) as u16;

        let drained = self.reorder_buffer.drain();
        let num_skipped = distance - <usize as PrecheckedCast<u16>>::prechecked_cast(drained.len());

        let mut released = drained.into_iter()
            .map(|(_, buf)| MemoryPointer::Allocated(buf))
            .collect::<Vec<_>>();
        let num_released: u64 = released.len().safe_cast();
        self.stats.released_buffered += num_released;
        released.push(MemoryPointer::Direct(payload));
        self.stats.released_direct += 1;

        debug!("channel {}: skipped {} missing message(s) before #{}", self.config.channel_id, num_skipped, sequence);
        self.stats.skipped += <u16 as SafeCast<u64>>::safe_cast(num_skipped);
        self.next_expected_sequence = sequence.next();

        released
    }
}

impl Drop for SequencedChannel {
    fn drop(&mut self) {
        let buffered = self.reorder_buffer.drain();
        if !buffered.is_empty() {
            debug!("closing channel {} with {} undelivered message(s)", self.config.channel_id, buffered.len());
        }
        for (_, buf) in buffered {
            self.memory_manager.release_standalone(buf);
        }
    }
}
