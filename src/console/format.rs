//! Bounded `core::fmt` rendering for the formatted send path.

use core::fmt;

use heapless::Vec;

/// Fixed-size render target that truncates instead of failing.
///
/// Output is cut at the last UTF-8 character boundary that fits, so the
/// rendered bytes are always valid text.
pub struct FormatBuffer<const N: usize> {
    bytes: Vec<u8, N>,
    truncated: bool,
}

impl<const N: usize> FormatBuffer<N> {
    pub const fn new() -> Self {
        Self {
            bytes: Vec::new(),
            truncated: false,
        }
    }

    /// Render `args`, keeping at most `N` bytes.
    pub fn render(args: fmt::Arguments<'_>) -> Self {
        let mut buf = Self::new();
        // write_str never errors; a Display impl that does just ends the render
        let _ = fmt::write(&mut buf, args);
        buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_str(&self) -> &str {
        // Only whole `str` prefixes cut on char boundaries are ever stored.
        core::str::from_utf8(&self.bytes).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether any output was dropped for lack of room.
    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

impl<const N: usize> Default for FormatBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Write for FormatBuffer<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = N - self.bytes.len();
        let take = if s.len() <= room {
            s.len()
        } else {
            self.truncated = true;
            floor_char_boundary(s, room)
        };
        // `take` never exceeds the remaining capacity
        let _ = self.bytes.extend_from_slice(&s.as_bytes()[..take]);
        Ok(())
    }
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    let mut i = index.min(s.len());
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;

    #[test]
    fn renders_format_arguments() {
        let buf: FormatBuffer<32> = FormatBuffer::render(format_args!("Temp: {}.{} C", 21, 5));
        assert_eq!(buf.as_str(), "Temp: 21.5 C");
        assert!(!buf.truncated());
    }

    #[test]
    fn exact_fit_is_not_truncated() {
        let buf: FormatBuffer<5> = FormatBuffer::render(format_args!("{}", "12345"));
        assert_eq!(buf.len(), 5);
        assert!(!buf.truncated());
    }

    #[test]
    fn one_byte_over_is_truncated_to_capacity() {
        let buf: FormatBuffer<5> = FormatBuffer::render(format_args!("{}", "123456"));
        assert_eq!(buf.as_bytes(), b"12345");
        assert!(buf.truncated());
    }

    #[test]
    fn truncation_spans_multiple_writes() {
        let buf: FormatBuffer<8> =
            FormatBuffer::render(format_args!("{}-{}-{}", "abcd", "efgh", "ijkl"));
        assert_eq!(buf.as_str(), "abcd-efg");
        assert!(buf.truncated());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // 'é' is two bytes; only one byte of room is left after "abc"
        let buf: FormatBuffer<4> = FormatBuffer::render(format_args!("abcé"));
        assert_eq!(buf.as_str(), "abc");
        assert!(buf.truncated());
    }

    #[test]
    fn writes_after_full_are_ignored() {
        let mut buf: FormatBuffer<3> = FormatBuffer::new();
        buf.write_str("xyz").unwrap();
        buf.write_str("more").unwrap();
        assert_eq!(buf.as_str(), "xyz");
        assert!(buf.truncated());
    }

    #[test]
    fn empty_render_is_empty() {
        let buf: FormatBuffer<8> = FormatBuffer::render(format_args!(""));
        assert!(buf.is_empty());
    }
}
