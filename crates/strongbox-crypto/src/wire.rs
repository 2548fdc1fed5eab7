//! Binary framing shared by every blob format
//!
//! - Lengths are unsigned 32-bit big-endian.
//! - Every top-level blob starts with a one-byte mode tag.
//! - The optional key-id section is one flag byte (0 = absent) followed, when
//!   present, by a length-prefixed UTF-8 key-set id.
//!
//! Reads are bounds checked and report truncation as [`CryptoError::Format`].

use crate::{keys::KeySetId, modes::WireMode, CryptoError, Result};
use bytes::{BufMut, BytesMut};

/// Builds a blob field by field
pub struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    pub fn new() -> Self {
        Self { buf: BytesMut::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn put_mode<M: WireMode>(&mut self, mode: M) {
        self.buf.put_u8(mode.to_wire());
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    /// Write a u32 length prefix followed by the bytes
    pub fn put_length_prefixed(&mut self, bytes: &[u8]) -> Result<()> {
        let len = u32::try_from(bytes.len()).map_err(|_| {
            CryptoError::Format(format!("field of {} bytes exceeds u32 length prefix", bytes.len()))
        })?;
        self.buf.put_u32(len);
        self.buf.put_slice(bytes);
        Ok(())
    }

    /// Write the key-id section
    pub fn put_key_id(&mut self, key_id: Option<&KeySetId>) -> Result<()> {
        self.put_key_id_section(&KeyIdSection::from_key_id(key_id))
    }

    /// Write a key-id section exactly as it was read
    pub fn put_key_id_section(&mut self, section: &KeyIdSection) -> Result<()> {
        match section {
            KeyIdSection::Present(bytes) => {
                self.buf.put_u8(1);
                self.put_length_prefixed(bytes)
            }
            KeyIdSection::Absent => {
                self.buf.put_u8(0);
                Ok(())
            }
        }
    }

    /// Write bytes with no framing (always the last field)
    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

impl Default for WireWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw outcome of reading a key-id section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyIdSection {
    Absent,
    Present(Vec<u8>),
}

impl KeyIdSection {
    pub fn from_key_id(key_id: Option<&KeySetId>) -> Self {
        match key_id {
            Some(id) => Self::Present(id.as_str().as_bytes().to_vec()),
            None => Self::Absent,
        }
    }

    /// Interpret the section as a key-set id
    ///
    /// Absent sections and bytes that are not a valid id are both `NotFound`.
    pub fn into_key_id(self) -> Result<KeySetId> {
        match self {
            Self::Absent => Err(CryptoError::NotFound("blob carries no key-set id".into())),
            Self::Present(bytes) => String::from_utf8(bytes)
                .ok()
                .and_then(|s| s.parse::<KeySetId>().ok())
                .ok_or_else(|| CryptoError::NotFound("embedded key-set id is invalid".into())),
        }
    }
}

/// Reads a blob field by field
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(CryptoError::Format(format!(
                "truncated blob reading {}: need {} bytes at offset {}, have {}",
                what,
                n,
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    pub fn read_u32(&mut self, what: &str) -> Result<u32> {
        let bytes = self.take(4, what)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_mode<M: WireMode>(&mut self) -> Result<M> {
        let tag = self.read_u8("mode tag")?;
        M::decode_tag(tag)
    }

    pub fn read_length_prefixed(&mut self, what: &str) -> Result<&'a [u8]> {
        let len = self.read_u32(what)? as usize;
        self.take(len, what)
    }

    pub fn read_key_id_section(&mut self) -> Result<KeyIdSection> {
        match self.read_u8("key-id flag")? {
            0 => Ok(KeyIdSection::Absent),
            _ => Ok(KeyIdSection::Present(self.read_length_prefixed("key id")?.to_vec())),
        }
    }

    /// Everything after the current position
    pub fn read_rest(&mut self) -> &'a [u8] {
        let out = &self.buf[self.pos..];
        self.pos = self.buf.len();
        out
    }
}
