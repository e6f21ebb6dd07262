//! Byte-level encoding primitives.
//!
//! All multi-byte integers are big-endian. Variable-length fields carry an
//! explicit length prefix: regular strings use an `i16` byte length (with
//! `-1` reserved as the "absent" sentinel where a field is optional), while
//! short strings and state blobs use a single `u8` length.

use thiserror::Error;

/// Errors produced while decoding a packet body. Any of these is a protocol
/// violation and drops the offending connection; none may cross the tick.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("unknown packet tag {0}")]
    UnknownTag(u8),
    #[error("packet body truncated")]
    Truncated,
    #[error("invalid length prefix {0}")]
    BadLength(i32),
    #[error("invalid utf-8 in string field")]
    BadUtf8,
    #[error("invalid enum discriminant {value} for {field}")]
    BadEnum { field: &'static str, value: u8 },
    #[error("{0} trailing bytes after packet body")]
    TrailingBytes(usize),
}

/// Growable output buffer with fixed-width put operations.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn put_bool(&mut self, value: bool) {
        self.buf.push(value as u8);
    }

    pub fn put_i16(&mut self, value: i16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// String with an `i16` byte-length prefix.
    pub fn put_string(&mut self, value: &str) {
        self.put_i16(value.len() as i16);
        self.buf.extend_from_slice(value.as_bytes());
    }

    /// Optional string; `None` is encoded as the `-1` length sentinel.
    pub fn put_opt_string(&mut self, value: Option<&str>) {
        match value {
            Some(s) => self.put_string(s),
            None => self.put_i16(-1),
        }
    }

    /// Short string with a `u8` byte-length prefix.
    pub fn put_short_string(&mut self, value: &str) {
        self.put_u8(value.len() as u8);
        self.buf.extend_from_slice(value.as_bytes());
    }

    /// Blob with a `u8` byte-length prefix.
    pub fn put_blob(&mut self, bytes: &[u8]) {
        self.put_u8(bytes.len() as u8);
        self.buf.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Cursor over a received packet body.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < count {
            return Err(WireError::Truncated);
        }
        let slice = &self.buf[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    pub fn get_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    pub fn get_bool(&mut self) -> Result<bool, WireError> {
        Ok(self.get_u8()? == 1)
    }

    pub fn get_i16(&mut self) -> Result<i16, WireError> {
        let bytes = self.take(2)?;
        Ok(i16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn get_i32(&mut self) -> Result<i32, WireError> {
        let bytes = self.take(4)?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn get_i64(&mut self) -> Result<i64, WireError> {
        let bytes = self.take(8)?;
        let mut out = [0u8; 8];
        out.copy_from_slice(bytes);
        Ok(i64::from_be_bytes(out))
    }

    pub fn get_f32(&mut self) -> Result<f32, WireError> {
        let bytes = self.take(4)?;
        Ok(f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn get_bytes(&mut self, count: usize) -> Result<Vec<u8>, WireError> {
        Ok(self.take(count)?.to_vec())
    }

    pub fn get_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn get_string(&mut self) -> Result<String, WireError> {
        let len = self.get_i16()?;
        if len < 0 {
            return Err(WireError::BadLength(len as i32));
        }
        self.read_utf8(len as usize)
    }

    pub fn get_opt_string(&mut self) -> Result<Option<String>, WireError> {
        let len = self.get_i16()?;
        if len == -1 {
            return Ok(None);
        }
        if len < 0 {
            return Err(WireError::BadLength(len as i32));
        }
        Ok(Some(self.read_utf8(len as usize)?))
    }

    pub fn get_short_string(&mut self) -> Result<String, WireError> {
        let len = self.get_u8()?;
        self.read_utf8(len as usize)
    }

    pub fn get_blob(&mut self) -> Result<Vec<u8>, WireError> {
        let len = self.get_u8()?;
        self.get_bytes(len as usize)
    }

    /// Fails if any bytes are left unconsumed; a well-formed body is read
    /// exactly to its end.
    pub fn finish(self) -> Result<(), WireError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(WireError::TrailingBytes(n)),
        }
    }

    fn read_utf8(&mut self, len: usize) -> Result<String, WireError> {
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| WireError::BadUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_roundtrip_big_endian() {
        let mut w = Writer::new();
        w.put_u8(0xab);
        w.put_i16(-2);
        w.put_i32(0x01020304);
        w.put_i64(-1);
        w.put_f32(1.5);
        let bytes = w.into_bytes();
        assert_eq!(&bytes[1..3], &[0xff, 0xfe]);

        let mut r = Reader::new(&bytes);
        assert_eq!(r.get_u8().unwrap(), 0xab);
        assert_eq!(r.get_i16().unwrap(), -2);
        assert_eq!(r.get_i32().unwrap(), 0x01020304);
        assert_eq!(r.get_i64().unwrap(), -1);
        assert_eq!(r.get_f32().unwrap(), 1.5);
        r.finish().unwrap();
    }

    #[test]
    fn strings_roundtrip() {
        let mut w = Writer::new();
        w.put_string("hello");
        w.put_string("");
        w.put_short_string("ok");
        let bytes = w.into_bytes();

        let mut r = Reader::new(&bytes);
        assert_eq!(r.get_string().unwrap(), "hello");
        assert_eq!(r.get_string().unwrap(), "");
        assert_eq!(r.get_short_string().unwrap(), "ok");
        r.finish().unwrap();
    }

    #[test]
    fn optional_string_sentinel() {
        let mut w = Writer::new();
        w.put_opt_string(None);
        w.put_opt_string(Some("name"));
        let bytes = w.into_bytes();
        assert_eq!(&bytes[0..2], &[0xff, 0xff]);

        let mut r = Reader::new(&bytes);
        assert_eq!(r.get_opt_string().unwrap(), None);
        assert_eq!(r.get_opt_string().unwrap(), Some("name".to_string()));
    }

    #[test]
    fn truncated_read_is_an_error() {
        let mut r = Reader::new(&[0x00, 0x01]);
        assert_eq!(r.get_i32(), Err(WireError::Truncated));
    }

    #[test]
    fn trailing_bytes_are_an_error() {
        let r = Reader::new(&[0x00]);
        assert_eq!(r.finish(), Err(WireError::TrailingBytes(1)));
    }

    #[test]
    fn negative_string_length_rejected() {
        let mut w = Writer::new();
        w.put_i16(-5);
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        assert_eq!(r.get_string(), Err(WireError::BadLength(-5)));
    }
}
