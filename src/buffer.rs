//! Fixed-capacity receive buffer.
//!
//! [`RecvBuffer`] holds the bytes that have been read but not yet consumed by
//! the parser. Reads land in the [`write_window`](RecvBuffer::write_window)
//! suffix, the parser sees the [`parse_window`](RecvBuffer::parse_window)
//! prefix, and [`consume`](RecvBuffer::consume) compacts the unconsumed tail
//! back to offset zero. The allocation never grows.

/// Fixed-capacity byte buffer with an unparsed prefix.
#[derive(Debug)]
pub struct RecvBuffer {
    data: Box<[u8]>,
    unparsed_len: usize,
}

impl RecvBuffer {
    /// Allocate a zeroed buffer of `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity].into_boxed_slice(),
            unparsed_len: 0,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize { self.data.len() }

    /// Number of received bytes not yet consumed.
    #[must_use]
    pub fn unparsed_len(&self) -> usize { self.unparsed_len }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.unparsed_len == 0 }

    /// Whether no space is left for another read.
    #[must_use]
    pub fn is_full(&self) -> bool { self.unparsed_len == self.data.len() }

    /// Unused suffix that the next read fills.
    pub fn write_window(&mut self) -> &mut [u8] { &mut self.data[self.unparsed_len..] }

    /// Bytes received but not yet consumed, in arrival order.
    #[must_use]
    pub fn parse_window(&self) -> &[u8] { &self.data[..self.unparsed_len] }

    /// Mark `n` bytes of the write window as filled.
    ///
    /// `n` is clamped to the free space.
    pub fn commit(&mut self, n: usize) {
        debug_assert!(
            n <= self.data.len() - self.unparsed_len,
            "commit past the write window"
        );
        self.unparsed_len = (self.unparsed_len + n).min(self.data.len());
    }

    /// Drop the first `k` unparsed bytes and move the remainder to the front.
    ///
    /// `k` is clamped to the unparsed length.
    pub fn consume(&mut self, k: usize) {
        let k = k.min(self.unparsed_len);
        if k == 0 {
            return;
        }
        self.data.copy_within(k..self.unparsed_len, 0);
        self.unparsed_len -= k;
    }

    /// Forget all unparsed bytes.
    pub fn clear(&mut self) { self.unparsed_len = 0; }
}

#[cfg(test)]
mod tests {
    use proptest::{collection::vec, prelude::*};
    use rstest::rstest;

    use super::*;

    fn fill(buffer: &mut RecvBuffer, bytes: &[u8]) {
        buffer.write_window()[..bytes.len()].copy_from_slice(bytes);
        buffer.commit(bytes.len());
    }

    #[test]
    fn windows_partition_the_buffer() {
        let mut buffer = RecvBuffer::with_capacity(8);
        assert_eq!(buffer.write_window().len(), 8);
        fill(&mut buffer, b"abc");
        assert_eq!(buffer.parse_window(), b"abc");
        assert_eq!(buffer.write_window().len(), 5);
        fill(&mut buffer, b"defgh");
        assert!(buffer.is_full());
        assert!(buffer.write_window().is_empty());
    }

    #[rstest]
    #[case(0, b"abcdef".as_slice())]
    #[case(2, b"cdef".as_slice())]
    #[case(6, b"".as_slice())]
    #[case(9, b"".as_slice())]
    fn consume_keeps_the_tail(#[case] k: usize, #[case] expected: &[u8]) {
        let mut buffer = RecvBuffer::with_capacity(16);
        fill(&mut buffer, b"abcdef");
        buffer.consume(k);
        assert_eq!(buffer.parse_window(), expected);
        assert_eq!(buffer.write_window().len(), 16 - expected.len());
    }

    #[test]
    fn clear_empties_the_buffer() {
        let mut buffer = RecvBuffer::with_capacity(4);
        fill(&mut buffer, b"xy");
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 4);
    }

    proptest! {
        #[test]
        fn compaction_preserves_unconsumed_bytes(
            steps in vec((vec(any::<u8>(), 0..12), any::<prop::sample::Index>()), 1..32),
        ) {
            let mut buffer = RecvBuffer::with_capacity(32);
            let mut reference: Vec<u8> = Vec::new();
            let mut consumed = 0;
            for (chunk, cut) in steps {
                let room = buffer.write_window().len();
                let chunk = &chunk[..chunk.len().min(room)];
                fill(&mut buffer, chunk);
                reference.extend_from_slice(chunk);

                let k = cut.index(buffer.unparsed_len() + 1);
                buffer.consume(k);
                consumed += k;
                prop_assert_eq!(buffer.parse_window(), &reference[consumed..]);
            }
        }
    }
}
