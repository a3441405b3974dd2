//! Fixed-width bitmaps as returned by the `EVIOCGBIT` / `EVIOCGKEY` family.
//!
//! The kernel packs bit `n` into byte `n / 8`, bit `n % 8`. [`BitSet`] keeps
//! that byte layout so backends can hand their ioctl buffers over unchanged.

use std::fmt;

#[derive(Clone, Default, PartialEq, Eq)]
pub struct BitSet {
    bytes: Vec<u8>,
}

impl BitSet {
    /// Empty bitmap able to hold `bits` bits.
    pub fn with_capacity(bits: usize) -> Self {
        Self {
            bytes: vec![0; bits.div_ceil(8)],
        }
    }

    /// Wrap a kernel-layout byte buffer.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Build a bitmap of at least `bits` bits with the given codes set.
    pub fn from_codes(bits: usize, codes: impl IntoIterator<Item = u16>) -> Self {
        let mut set = Self::with_capacity(bits);
        for code in codes {
            set.insert(code);
        }
        set
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Capacity in bits.
    pub fn capacity(&self) -> usize {
        self.bytes.len() * 8
    }

    pub fn contains(&self, code: u16) -> bool {
        let code = code as usize;
        self.bytes
            .get(code / 8)
            .is_some_and(|byte| byte & (1 << (code % 8)) != 0)
    }

    /// Set `code`, growing the bitmap when needed.
    pub fn insert(&mut self, code: u16) {
        let idx = code as usize / 8;
        if idx >= self.bytes.len() {
            self.bytes.resize(idx + 1, 0);
        }
        self.bytes[idx] |= 1 << (code % 8);
    }

    pub fn remove(&mut self, code: u16) {
        if let Some(byte) = self.bytes.get_mut(code as usize / 8) {
            *byte &= !(1 << (code % 8));
        }
    }

    /// `true` if any code in `range` is set.
    pub fn any_in(&self, range: std::ops::Range<u16>) -> bool {
        range.into_iter().any(|code| self.contains(code))
    }

    /// Bitwise OR of `other` into `self`.
    pub fn union_with(&mut self, other: &BitSet) {
        if other.bytes.len() > self.bytes.len() {
            self.bytes.resize(other.bytes.len(), 0);
        }
        for (dst, src) in self.bytes.iter_mut().zip(&other.bytes) {
            *dst |= *src;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.iter().all(|b| *b == 0)
    }

    /// Set codes in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.bytes.iter().enumerate().flat_map(|(i, byte)| {
            (0..8u16)
                .filter(move |bit| byte & (1 << bit) != 0)
                .map(move |bit| (i as u16) * 8 + bit)
        })
    }
}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_byte_layout() {
        let set = BitSet::from_bytes(&[0b0000_0010, 0, 0b1000_0000]);
        assert!(set.contains(1));
        assert!(set.contains(23));
        assert!(!set.contains(0));
        assert!(!set.contains(400));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 23]);
    }

    #[test]
    fn union_grows_to_widest_operand() {
        let mut a = BitSet::from_codes(8, [3]);
        let b = BitSet::from_codes(64, [3, 40]);
        a.union_with(&b);
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![3, 40]);
    }

    #[test]
    fn range_query_is_half_open() {
        let set = BitSet::from_codes(16, [8]);
        assert!(set.any_in(0..9));
        assert!(!set.any_in(0..8));
        assert!(!set.any_in(9..16));
    }
}
