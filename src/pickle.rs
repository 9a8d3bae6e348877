//! Binary "pickle" codec primitives.
//!
//! Every multi-byte integer is big-endian. Variable-length buffers carry a
//! `u32` length prefix; fixed-width fields (ratchet parts) are written raw.
//! A pickled structure always begins with a `u32` format version written by
//! its owning type, not by this module.

use crate::Error;

/// Growable encoder for pickle data.
#[derive(Default)]
pub struct PickleBuffer {
    buf: Vec<u8>,
}

impl PickleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(if value { 1 } else { 0 });
    }

    /// Write a `u32` length prefix followed by the raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_u32(bytes.len() as u32);
        self.buf.extend_from_slice(bytes);
    }

    /// Write raw bytes with no length prefix. The reader must know the width.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

/// Bounds-checked decoder over an immutable byte slice.
///
/// Every read either advances the cursor or fails with
/// [`Error::CorruptedPickle`]; no read ever inspects bytes past the end of
/// the slice, and a failed read leaves no partial value behind.
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn is_at_end(&self) -> bool {
        self.pos == self.buf.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        let end = self.pos.checked_add(n).ok_or(Error::CorruptedPickle)?;
        let bytes = self.buf.get(self.pos..end).ok_or(Error::CorruptedPickle)?;
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        let bytes = self.take(4)?;
        let mut value = 0u32;
        for &byte in bytes {
            value = (value << 8) | u32::from(byte);
        }
        Ok(value)
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, Error> {
        Ok(self.take(1)?[0] != 0)
    }

    /// Read a `u32` length prefix and then that many raw bytes.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], Error> {
        let len = self.read_u32()?;
        self.take(len as usize)
    }

    /// Read exactly `n` raw bytes with no length prefix.
    pub fn read_raw(&mut self, n: usize) -> Result<&'a [u8], Error> {
        self.take(n)
    }
}
