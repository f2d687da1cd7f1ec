// Bounded byte-buffer reader
//
// All format decoders go through this cursor. Reads past the end of the
// buffer return `None` instead of panicking, so a truncated upload can
// never take down the request pipeline.

/// Bounded random-access reader over a borrowed byte buffer.
///
/// Purely functional: the cursor holds no position state, every read names
/// its offset. A read succeeds only if `offset + width` fits in the buffer.
#[derive(Debug, Clone, Copy)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Total buffer length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read a single byte at `offset`.
    pub fn u8(&self, offset: usize) -> Option<u8> {
        self.data.get(offset).copied()
    }

    /// Borrow `len` bytes starting at `offset`.
    pub fn bytes(&self, offset: usize, len: usize) -> Option<&'a [u8]> {
        self.data.get(offset..offset.checked_add(len)?)
    }

    /// Read a big-endian `u16` at `offset`.
    pub fn u16_be(&self, offset: usize) -> Option<u16> {
        self.bytes(offset, 2)?
            .try_into()
            .ok()
            .map(u16::from_be_bytes)
    }

    /// Read a little-endian `u16` at `offset`.
    pub fn u16_le(&self, offset: usize) -> Option<u16> {
        self.bytes(offset, 2)?
            .try_into()
            .ok()
            .map(u16::from_le_bytes)
    }

    /// Read a big-endian `u32` at `offset`.
    pub fn u32_be(&self, offset: usize) -> Option<u32> {
        self.bytes(offset, 4)?
            .try_into()
            .ok()
            .map(u32::from_be_bytes)
    }

    /// Read a little-endian `u32` at `offset`.
    pub fn u32_le(&self, offset: usize) -> Option<u32> {
        self.bytes(offset, 4)?
            .try_into()
            .ok()
            .map(u32::from_le_bytes)
    }

    /// True if the first bytes of the buffer equal `prefix`.
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.data.starts_with(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_within_bounds() {
        let cur = ByteCursor::new(&[0x12, 0x34, 0x56, 0x78]);
        assert_eq!(cur.u8(0), Some(0x12));
        assert_eq!(cur.u16_be(0), Some(0x1234));
        assert_eq!(cur.u16_le(0), Some(0x3412));
        assert_eq!(cur.u32_be(0), Some(0x1234_5678));
        assert_eq!(cur.u32_le(0), Some(0x7856_3412));
    }

    #[test]
    fn reads_past_end_are_absent() {
        let cur = ByteCursor::new(&[0x01, 0x02, 0x03]);
        assert_eq!(cur.u8(3), None);
        assert_eq!(cur.u16_be(2), None);
        assert_eq!(cur.u32_be(0), None);
        assert_eq!(cur.u32_le(1), None);
    }

    #[test]
    fn offset_overflow_is_absent() {
        let cur = ByteCursor::new(&[0xFF; 8]);
        assert_eq!(cur.u16_be(usize::MAX), None);
        assert_eq!(cur.bytes(usize::MAX, 4), None);
    }

    #[test]
    fn empty_buffer() {
        let cur = ByteCursor::new(&[]);
        assert!(cur.is_empty());
        assert_eq!(cur.len(), 0);
        assert_eq!(cur.u8(0), None);
    }
}
