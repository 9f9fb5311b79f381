use std::collections::VecDeque;
use crate::buffers::owned_buf::OwnedBuf;
use crate::safe_converter::SafeCast;

/// Messages that arrived ahead of the next expected sequence number, keyed by their distance
///  from it. Slot `i` holds the message with sequence number `next_expected + 1 + i`, so the
///  buffer never holds a message at or behind the next expected one.
///
/// Valid distances are `1 ..= window`, which bounds the buffer's size.
pub struct ReorderBuffer {
    window: u16,
    slots: VecDeque<Option<OwnedBuf>>,
    num_buffered: usize,
}

impl ReorderBuffer {
    pub fn new(window: u16) -> ReorderBuffer {
        ReorderBuffer {
            window,
            slots: VecDeque::with_capacity(window.safe_cast()),
            num_buffered: 0,
        }
    }

    pub fn window(&self) -> u16 {
        self.window
    }

    /// the number of messages currently held
    pub fn len(&self) -> usize {
        self.num_buffered
    }

    pub fn is_empty(&self) -> bool {
        self.num_buffered == 0
    }

    pub fn contains(&self, distance: u16) -> bool {
        distance >= 1 && matches!(self.slots.get((distance - 1).safe_cast()), Some(Some(_)))
    }

    /// Store a message at the given distance from the next expected sequence number. If there is
    ///  a message in that slot already, the new one is handed back.
    pub fn insert(&mut self, distance: u16, buf: OwnedBuf) -> Result<(), OwnedBuf> {
        assert!(distance >= 1 && distance <= self.window, "distance {} is outside the reorder window {}", distance, self.window);

        let index: usize = (distance - 1).safe_cast();
        while self.slots.len() <= index {
            self.slots.push_back(None);
        }

        let slot = &mut self.slots[index];
        if slot.is_some() {
            return Err(buf);
        }
        *slot = Some(buf);
        self.num_buffered += 1;
        Ok(())
    }

    /// Call this after the next expected sequence number moved forward by one. This shifts all
    ///  slots by one and returns the message for the *new* next expected sequence number, if it
    ///  was buffered.
    pub fn advance(&mut self) -> Option<OwnedBuf> {
        let result = self.slots.pop_front().flatten();
        if result.is_some() {
            self.num_buffered -= 1;
        }
        result
    }

    /// Remove all buffered messages, returning them in sequence order together with their
    ///  distance from the next expected sequence number
    pub fn drain(&mut self) -> Vec<(u16, OwnedBuf)> {
        let result = self.slots.drain(..)
            .enumerate()
            .filter_map(|(index, slot)| slot.map(|buf| ((index + 1) as u16, buf)))
            .collect::<Vec<_>>();
        self.num_buffered = 0;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn buf(data: &[u8]) -> OwnedBuf {
        let mut result = OwnedBuf::with_capacity(data.len());
        result.extend_from_slice(data);
        result
    }

    #[test]
    fn test_insert_contains() {
        let mut reorder = ReorderBuffer::new(4);
        assert!(reorder.is_empty());

        reorder.insert(2, buf(b"b")).unwrap();
        assert!(!reorder.contains(0));
        assert!(!reorder.contains(1));
        assert!(reorder.contains(2));
        assert!(!reorder.contains(3));
        assert_eq!(reorder.len(), 1);
    }

    #[test]
    fn test_insert_occupied() {
        let mut reorder = ReorderBuffer::new(4);
        reorder.insert(1, buf(b"first")).unwrap();
        assert_eq!(reorder.insert(1, buf(b"second")), Err(buf(b"second")));
        assert_eq!(reorder.len(), 1);
        assert_eq!(reorder.advance(), Some(buf(b"first")));
    }

    #[rstest]
    #[case::zero(0)]
    #[case::beyond_window(5)]
    #[should_panic]
    fn test_insert_outside_window(#[case] distance: u16) {
        let mut reorder = ReorderBuffer::new(4);
        let _ = reorder.insert(distance, buf(b"x"));
    }

    #[test]
    fn test_advance() {
        let mut reorder = ReorderBuffer::new(4);
        reorder.insert(1, buf(b"a")).unwrap();
        reorder.insert(3, buf(b"c")).unwrap();

        assert_eq!(reorder.advance(), Some(buf(b"a")));
        assert_eq!(reorder.advance(), None);
        // 'c' is now the next expected one
        assert_eq!(reorder.advance(), Some(buf(b"c")));
        assert!(reorder.is_empty());
        assert_eq!(reorder.advance(), None);
    }

    #[test]
    fn test_drain() {
        let mut reorder = ReorderBuffer::new(8);
        reorder.insert(5, buf(b"e")).unwrap();
        reorder.insert(2, buf(b"b")).unwrap();
        reorder.insert(3, buf(b"c")).unwrap();

        assert_eq!(reorder.drain(), vec![(2, buf(b"b")), (3, buf(b"c")), (5, buf(b"e"))]);
        assert!(reorder.is_empty());
        assert!(!reorder.contains(2));
    }
}
