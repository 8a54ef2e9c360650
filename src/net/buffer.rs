//! Per-connection read buffer.
//!
//! Bytes are read into the free tail, the parser consumes a prefix, and the
//! remainder is shifted to the front. The buffer doubles when full and stops
//! at a hard limit instead of truncating.

use thiserror::Error;

/// The buffer is at its limit and still holds no complete unit.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("request exceeds the {limit}-byte read buffer")]
pub struct CapacityExceeded {
    pub limit: usize,
}

#[derive(Debug)]
pub struct ReadBuffer {
    buf: Vec<u8>,
    len: usize,
    max: usize,
}

impl ReadBuffer {
    /// `initial` is clamped to `1..=max`.
    pub fn new(initial: usize, max: usize) -> Self {
        let max = max.max(1);
        Self {
            buf: vec![0; initial.clamp(1, max)],
            len: 0,
            max,
        }
    }

    /// Bytes read but not yet consumed.
    pub fn filled(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Free space to read into, growing the buffer if it is full.
    pub fn spare_mut(&mut self) -> Result<&mut [u8], CapacityExceeded> {
        if self.len == self.buf.len() {
            if self.buf.len() >= self.max {
                return Err(CapacityExceeded { limit: self.max });
            }
            let grown = (self.buf.len() * 2).min(self.max);
            tracing::trace!(from = self.buf.len(), to = grown, "Growing read buffer");
            self.buf.resize(grown, 0);
        }
        Ok(&mut self.buf[self.len..])
    }

    /// Mark `n` bytes of the spare region as filled.
    pub fn advance(&mut self, n: usize) {
        self.len = (self.len + n).min(self.buf.len());
    }

    /// Drop the first `n` filled bytes and shift the rest to the front.
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.len);
        self.buf.copy_within(n..self.len, 0);
        self.len -= n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(buffer: &mut ReadBuffer, data: &[u8]) {
        let spare = buffer.spare_mut().unwrap();
        spare[..data.len()].copy_from_slice(data);
        buffer.advance(data.len());
    }

    #[test]
    fn consume_shifts_remainder_to_front() {
        let mut buffer = ReadBuffer::new(16, 64);
        fill(&mut buffer, b"GET / HTTP/1.1\r\n");
        buffer.consume(5);
        assert_eq!(buffer.filled(), b"HTTP/1.1\r\n");
        assert_eq!(buffer.spare_mut().unwrap().len(), 6);
    }

    #[test]
    fn grows_when_full() {
        let mut buffer = ReadBuffer::new(4, 16);
        fill(&mut buffer, b"abcd");
        assert_eq!(buffer.spare_mut().unwrap().len(), 4);
        assert_eq!(buffer.capacity(), 8);
        fill(&mut buffer, b"efgh");
        assert_eq!(buffer.spare_mut().unwrap().len(), 8);
        assert_eq!(buffer.filled(), b"abcdefgh");
    }

    #[test]
    fn refuses_to_grow_past_limit() {
        let mut buffer = ReadBuffer::new(4, 6);
        fill(&mut buffer, b"abcd");
        fill(&mut buffer, b"ef");
        assert_eq!(buffer.capacity(), 6);
        assert_eq!(buffer.spare_mut().unwrap_err(), CapacityExceeded { limit: 6 });

        buffer.consume(2);
        assert_eq!(buffer.spare_mut().unwrap().len(), 2);
    }
}
