//! Fixed-capacity byte ring holding length-prefixed records.
//!
//! Record layout: `[u16 little-endian length][length bytes of payload]`.
//! The queue itself is not synchronized; `Console` wraps it in a
//! critical-section mutex.

use core::fmt;

use crate::config::RECORD_HEADER_SIZE;

/// A push needed more room than the ring had free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InsufficientSpace {
    pub needed: usize,
    pub free: usize,
}

impl fmt::Display for InsufficientSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "need {} bytes, {} free", self.needed, self.free)
    }
}

/// The byte stream no longer lines up with record boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Fewer than two bytes were left where a header was expected.
    ShortHeader { available: usize },
    /// Header length is zero or larger than the caller's buffer.
    BadLength { len: u16, max: usize },
    /// The header promised more payload than the ring holds.
    ShortPayload { expected: usize, available: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::ShortHeader { available } => {
                write!(f, "short header ({available} bytes left)")
            }
            FrameError::BadLength { len, max } => write!(f, "invalid length {len} (max {max})"),
            FrameError::ShortPayload {
                expected,
                available,
            } => write!(f, "short payload ({available} of {expected} bytes)"),
        }
    }
}

/// Bounded FIFO of bytes with all-or-nothing pushes.
pub struct MessageQueue<const CAP: usize> {
    buf: [u8; CAP],
    /// Index of the oldest byte.
    head: usize,
    /// Bytes currently stored.
    len: usize,
}

impl<const CAP: usize> MessageQueue<CAP> {
    pub const fn new() -> Self {
        Self {
            buf: [0; CAP],
            head: 0,
            len: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        CAP
    }

    pub const fn used(&self) -> usize {
        self.len
    }

    pub const fn free(&self) -> usize {
        CAP - self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drop everything. O(1).
    pub fn reset(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Append `bytes` only if all of them fit.
    pub fn push(&mut self, bytes: &[u8]) -> Result<(), InsufficientSpace> {
        self.ensure_free(bytes.len())?;
        self.write_tail(bytes);
        Ok(())
    }

    /// Append a `[len][payload]` record as a single all-or-nothing push.
    ///
    /// A torn header would desynchronize every read after it, so the space
    /// check covers header and payload together.
    pub fn push_record(&mut self, payload: &[u8]) -> Result<(), InsufficientSpace> {
        let len = u16::try_from(payload.len()).map_err(|_| InsufficientSpace {
            needed: payload.len() + RECORD_HEADER_SIZE,
            free: self.free(),
        })?;
        self.ensure_free(payload.len() + RECORD_HEADER_SIZE)?;
        self.write_tail(&len.to_le_bytes());
        self.write_tail(payload);
        Ok(())
    }

    /// Remove up to `out.len()` bytes from the head. Returns how many were copied.
    pub fn pop(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.len);
        let first = n.min(CAP - self.head);
        out[..first].copy_from_slice(&self.buf[self.head..self.head + first]);
        out[first..n].copy_from_slice(&self.buf[..n - first]);
        self.advance(n);
        n
    }

    /// Pop one record into `out`, returning the payload length.
    ///
    /// `None` means the queue is empty. On `FrameError` the bytes read so far
    /// are gone and the stream should be considered lost.
    pub fn pop_record(&mut self, out: &mut [u8]) -> Option<Result<usize, FrameError>> {
        if self.is_empty() {
            return None;
        }

        let mut header = [0u8; RECORD_HEADER_SIZE];
        let got = self.pop(&mut header);
        if got != RECORD_HEADER_SIZE {
            return Some(Err(FrameError::ShortHeader { available: got }));
        }

        let len = u16::from_le_bytes(header);
        if len == 0 || usize::from(len) > out.len() {
            return Some(Err(FrameError::BadLength {
                len,
                max: out.len(),
            }));
        }

        let expected = usize::from(len);
        let got = self.pop(&mut out[..expected]);
        if got != expected {
            return Some(Err(FrameError::ShortPayload {
                expected,
                available: got,
            }));
        }

        Some(Ok(expected))
    }

    fn ensure_free(&self, needed: usize) -> Result<(), InsufficientSpace> {
        if needed > self.free() {
            return Err(InsufficientSpace {
                needed,
                free: self.free(),
            });
        }
        Ok(())
    }

    /// Caller has checked that `bytes` fits.
    fn write_tail(&mut self, bytes: &[u8]) {
        let tail = (self.head + self.len) % CAP.max(1);
        let first = bytes.len().min(CAP - tail);
        self.buf[tail..tail + first].copy_from_slice(&bytes[..first]);
        self.buf[..bytes.len() - first].copy_from_slice(&bytes[first..]);
        self.len += bytes.len();
    }

    fn advance(&mut self, n: usize) {
        self.len -= n;
        self.head = if self.len == 0 {
            0
        } else {
            (self.head + n) % CAP
        };
    }
}

impl<const CAP: usize> Default for MessageQueue<CAP> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_accounting<const CAP: usize>(q: &MessageQueue<CAP>) {
        assert_eq!(q.used() + q.free(), q.capacity());
    }

    #[test]
    fn new_queue_is_empty() {
        let q: MessageQueue<64> = MessageQueue::new();
        assert!(q.is_empty());
        assert_eq!(q.capacity(), 64);
        assert_eq!(q.used(), 0);
        assert_eq!(q.free(), 64);
    }

    #[test]
    fn push_then_pop_preserves_bytes() {
        let mut q: MessageQueue<16> = MessageQueue::new();
        q.push(b"hello").unwrap();
        assert_eq!(q.used(), 5);

        let mut out = [0u8; 8];
        let n = q.pop(&mut out);
        assert_eq!(&out[..n], b"hello");
        assert!(q.is_empty());
    }

    #[test]
    fn pop_is_bounded_by_output_buffer() {
        let mut q: MessageQueue<16> = MessageQueue::new();
        q.push(b"abcdef").unwrap();

        let mut out = [0u8; 4];
        assert_eq!(q.pop(&mut out), 4);
        assert_eq!(&out, b"abcd");
        assert_eq!(q.used(), 2);
    }

    #[test]
    fn rejected_push_leaves_queue_untouched() {
        let mut q: MessageQueue<8> = MessageQueue::new();
        q.push(b"12345").unwrap();

        let err = q.push(b"6789").unwrap_err();
        assert_eq!(err, InsufficientSpace { needed: 4, free: 3 });
        assert_eq!(q.used(), 5);
        assert_eq!(q.free(), 3);

        let mut out = [0u8; 8];
        let n = q.pop(&mut out);
        assert_eq!(&out[..n], b"12345");
    }

    #[test]
    fn push_fills_to_exact_capacity() {
        let mut q: MessageQueue<4> = MessageQueue::new();
        q.push(b"wxyz").unwrap();
        assert_eq!(q.free(), 0);
        assert!(q.push(b"!").is_err());
    }

    #[test]
    fn writes_wrap_around_the_end() {
        let mut q: MessageQueue<8> = MessageQueue::new();
        let mut out = [0u8; 8];

        q.push(b"abcdef").unwrap();
        assert_eq!(q.pop(&mut out[..4]), 4);
        // head=4, len=2; this write straddles the end of the array
        q.push(b"ghijk").unwrap();
        assert_accounting(&q);

        let n = q.pop(&mut out);
        assert_eq!(&out[..n], b"efghijk");
    }

    #[test]
    fn reset_discards_everything() {
        let mut q: MessageQueue<32> = MessageQueue::new();
        q.push_record(b"one").unwrap();
        q.push_record(b"two").unwrap();
        q.reset();
        assert!(q.is_empty());
        assert_eq!(q.free(), 32);
        assert!(q.pop_record(&mut [0u8; 16]).is_none());
    }

    #[test]
    fn record_is_length_prefixed_little_endian() {
        let mut q: MessageQueue<16> = MessageQueue::new();
        q.push_record(b"hi").unwrap();

        let mut raw = [0u8; 4];
        assert_eq!(q.pop(&mut raw), 4);
        assert_eq!(raw, [0x02, 0x00, b'h', b'i']);
    }

    #[test]
    fn record_push_needs_room_for_header() {
        let mut q: MessageQueue<6> = MessageQueue::new();
        let err = q.push_record(b"12345").unwrap_err();
        assert_eq!(err, InsufficientSpace { needed: 7, free: 6 });
        assert!(q.is_empty());

        q.push_record(b"1234").unwrap();
        assert_eq!(q.free(), 0);
    }

    #[test]
    fn records_pop_in_fifo_order() {
        let mut q: MessageQueue<64> = MessageQueue::new();
        q.push_record(b"first").unwrap();
        q.push_record(b"second").unwrap();
        q.push_record(b"third").unwrap();

        let mut out = [0u8; 16];
        for expected in [&b"first"[..], b"second", b"third"] {
            let n = q.pop_record(&mut out).unwrap().unwrap();
            assert_eq!(&out[..n], expected);
            assert_accounting(&q);
        }
        assert!(q.pop_record(&mut out).is_none());
    }

    #[test]
    fn record_wrapping_across_boundary() {
        let mut q: MessageQueue<12> = MessageQueue::new();
        let mut out = [0u8; 12];

        q.push_record(b"abc").unwrap(); // 0..5
        q.push_record(b"de").unwrap(); // 5..9
        q.pop_record(&mut out).unwrap().unwrap();
        q.push_record(b"uvwxyz").unwrap(); // header at 9..11, payload wraps

        let n = q.pop_record(&mut out).unwrap().unwrap();
        assert_eq!(&out[..n], b"de");
        let n = q.pop_record(&mut out).unwrap().unwrap();
        assert_eq!(&out[..n], b"uvwxyz");
        assert!(q.is_empty());
    }

    #[test]
    fn oversized_header_is_a_frame_error() {
        let mut q: MessageQueue<1024> = MessageQueue::new();
        q.push(&600u16.to_le_bytes()).unwrap();
        q.push(&[0xAA; 600]).unwrap();

        let mut out = [0u8; 512];
        assert_eq!(
            q.pop_record(&mut out),
            Some(Err(FrameError::BadLength { len: 600, max: 512 }))
        );
    }

    #[test]
    fn zero_length_header_is_a_frame_error() {
        let mut q: MessageQueue<16> = MessageQueue::new();
        q.push(&[0, 0]).unwrap();
        assert_eq!(
            q.pop_record(&mut [0u8; 8]),
            Some(Err(FrameError::BadLength { len: 0, max: 8 }))
        );
    }

    #[test]
    fn truncated_stream_is_a_frame_error() {
        let mut q: MessageQueue<16> = MessageQueue::new();
        q.push(&[7]).unwrap();
        assert_eq!(
            q.pop_record(&mut [0u8; 8]),
            Some(Err(FrameError::ShortHeader { available: 1 }))
        );

        q.push(&5u16.to_le_bytes()).unwrap();
        q.push(b"ab").unwrap();
        assert_eq!(
            q.pop_record(&mut [0u8; 8]),
            Some(Err(FrameError::ShortPayload {
                expected: 5,
                available: 2
            }))
        );
    }

    #[test]
    fn accounting_holds_through_mixed_operations() {
        let mut q: MessageQueue<37> = MessageQueue::new();
        let mut out = [0u8; 37];
        let mut n = 0u8;

        for round in 0..200usize {
            let size = 1 + round % 9;
            let payload = [n; 9];
            let _ = q.push_record(&payload[..size]);
            assert_accounting(&q);
            n = n.wrapping_add(1);

            if round % 3 == 0 {
                let _ = q.pop_record(&mut out);
                assert_accounting(&q);
            }
            if round % 50 == 49 {
                q.reset();
                assert_accounting(&q);
            }
        }
    }
}
