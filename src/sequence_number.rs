use std::fmt::{Display, Formatter};
use std::ops::{Add, AddAssign};

/// A per-channel, per-direction message counter. It is 16 bits wide on the wire and wraps
///  around, so ordering is only meaningful *relative* to some reference point: a sequence number
///  is considered 'ahead' of another if it is less than half the number space in front of it.
///
/// NB: This is why `SequenceNumber` deliberately does not implement `Ord`
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct SequenceNumber(u16);

impl Display for SequenceNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl SequenceNumber {
    pub const ZERO: SequenceNumber = SequenceNumber(0);
    pub const MAX: SequenceNumber = SequenceNumber(u16::MAX);

    /// The biggest distance that can be told apart from a 'negative' one
    pub const MAX_FORWARD_DISTANCE: u16 = i16::MAX as u16;

    pub fn from_raw(value: u16) -> Self {
        Self(value)
    }

    pub fn to_raw(&self) -> u16 {
        self.0
    }

    pub fn next(&self) -> SequenceNumber {
        SequenceNumber(self.0.wrapping_add(1))
    }

    /// wrap-aware signed distance from `reference` to `self`: positive if `self` is ahead,
    ///  negative if it is behind, 0 if they are equal
    pub fn distance_from(&self, reference: SequenceNumber) -> i16 {
        self.0.wrapping_sub(reference.0) as i16
    }
}

impl Add<u16> for SequenceNumber {
    type Output = SequenceNumber;

    fn add(self, rhs: u16) -> Self::Output {
        SequenceNumber(self.0.wrapping_add(rhs))
    }
}

impl AddAssign<u16> for SequenceNumber {
    fn add_assign(&mut self, rhs: u16) {
        self.0 = self.0.wrapping_add(rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::zero(0, 1)]
    #[case::regular(1234, 1235)]
    #[case::wrap(u16::MAX, 0)]
    fn test_next(#[case] raw: u16, #[case] expected: u16) {
        assert_eq!(SequenceNumber::from_raw(raw).next(), SequenceNumber::from_raw(expected));
    }

    #[rstest]
    #[case::equal(5, 5, 0)]
    #[case::ahead(7, 5, 2)]
    #[case::behind(5, 7, -2)]
    #[case::ahead_wrapped(0, u16::MAX, 1)]
    #[case::ahead_wrapped_far(10, 65530, 16)]
    #[case::behind_wrapped(u16::MAX, 0, -1)]
    #[case::max_forward(32767, 0, 32767)]
    #[case::half_is_behind(32768, 0, -32768)]
    fn test_distance_from(#[case] seq: u16, #[case] reference: u16, #[case] expected: i16) {
        assert_eq!(SequenceNumber::from_raw(seq).distance_from(SequenceNumber::from_raw(reference)), expected);
    }

    #[rstest]
    #[case::simple(3, 4, 7)]
    #[case::wrap(65535, 2, 1)]
    fn test_add(#[case] raw: u16, #[case] rhs: u16, #[case] expected: u16) {
        assert_eq!(SequenceNumber::from_raw(raw) + rhs, SequenceNumber::from_raw(expected));

        let mut seq = SequenceNumber::from_raw(raw);
        seq += rhs;
        assert_eq!(seq, SequenceNumber::from_raw(expected));
    }
}
