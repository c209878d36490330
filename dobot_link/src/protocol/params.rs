//! Little-endian parameter marshaling.
//!
//! Every command payload on this protocol is a flat little-endian struct, so
//! instead of one hand-written pack/unpack per field the typed wrappers share
//! these two adapters. Reads are checked: a response that is shorter than the
//! caller expects surfaces as a protocol error rather than a panic.

use crate::errors::DobotError;

/// Builds a command payload field by field.
#[derive(Debug, Default)]
pub struct ParamWriter {
    buf: Vec<u8>,
}

impl ParamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_u8(mut self, v: u8) -> Self {
        self.buf.push(v);
        self
    }

    pub fn put_bool(self, v: bool) -> Self {
        self.put_u8(v as u8)
    }

    pub fn put_u16(mut self, v: u16) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn put_u32(mut self, v: u32) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn put_u64(mut self, v: u64) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn put_f32(mut self, v: f32) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// String bytes followed by a terminating NUL, as the firmware expects
    /// for serial numbers, names and WiFi credentials.
    pub fn put_cstr(mut self, s: &str) -> Self {
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
        self
    }

    pub fn into_params(self) -> Vec<u8> {
        self.buf
    }
}

/// Walks a response payload front to back.
#[derive(Debug)]
pub struct ParamReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ParamReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DobotError> {
        if self.buf.len() - self.pos < n {
            return Err(DobotError::Protocol(format!(
                "response payload too short: needed {} more bytes, {} left",
                n,
                self.buf.len() - self.pos
            )));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn u8(&mut self) -> Result<u8, DobotError> {
        Ok(self.take(1)?[0])
    }

    pub fn bool(&mut self) -> Result<bool, DobotError> {
        Ok(self.u8()? != 0)
    }

    pub fn u16(&mut self) -> Result<u16, DobotError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self) -> Result<u32, DobotError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u64(&mut self) -> Result<u64, DobotError> {
        let b = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_le_bytes(raw))
    }

    pub fn f32(&mut self) -> Result<f32, DobotError> {
        let b = self.take(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Remainder of the payload up to the first NUL, as UTF-8 (lossy).
    pub fn cstr(&mut self) -> String {
        let rest = &self.buf[self.pos..];
        let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        self.pos = self.buf.len();
        String::from_utf8_lossy(&rest[..end]).into_owned()
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_reader_round_trip() {
        let params = ParamWriter::new()
            .put_u8(7)
            .put_bool(true)
            .put_u16(0x1234)
            .put_u32(0xDEAD_BEEF)
            .put_u64(42)
            .put_f32(1.5)
            .into_params();

        let mut r = ParamReader::new(&params);
        assert_eq!(r.u8().unwrap(), 7);
        assert!(r.bool().unwrap());
        assert_eq!(r.u16().unwrap(), 0x1234);
        assert_eq!(r.u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(r.u64().unwrap(), 42);
        assert_eq!(r.f32().unwrap(), 1.5);
        assert!(r.remaining().is_empty());
    }

    #[test]
    fn short_read_is_a_protocol_error() {
        let mut r = ParamReader::new(&[1, 2, 3]);
        assert!(matches!(r.u64(), Err(DobotError::Protocol(_))));
    }

    #[test]
    fn cstr_stops_at_nul() {
        let params = ParamWriter::new().put_cstr("dobot").into_params();
        let mut r = ParamReader::new(&params);
        assert_eq!(r.cstr(), "dobot");

        let mut r = ParamReader::new(b"no-terminator");
        assert_eq!(r.cstr(), "no-terminator");
    }
}
