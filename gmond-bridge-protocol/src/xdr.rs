//! ## gmond-bridge-protocol::xdr
//! The subset of XDR (RFC 4506) gmetric messages are built from: 32-bit
//! big-endian integers, booleans, and variable-length strings padded with
//! zeros to a four byte boundary.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::ProtocolError;

/// Number of zero bytes needed after `len` bytes of opaque data.
#[inline]
pub fn padding(len: usize) -> usize {
    (4 - len % 4) % 4
}

/// Appends XDR-encoded values to a growable buffer.
#[derive(Debug, Default)]
pub struct XdrWriter {
    buf: BytesMut,
}

impl XdrWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn put_u32(&mut self, value: u32) -> &mut Self {
        self.buf.put_u32(value);
        self
    }

    pub fn put_bool(&mut self, value: bool) -> &mut Self {
        self.put_u32(u32::from(value))
    }

    pub fn put_string(&mut self, value: &str) -> &mut Self {
        self.put_opaque(value.as_bytes())
    }

    /// Variable-length opaque data: length prefix, bytes, zero padding.
    pub fn put_opaque(&mut self, data: &[u8]) -> &mut Self {
        self.buf.put_u32(data.len() as u32);
        self.buf.put_slice(data);
        self.buf.put_bytes(0, padding(data.len()));
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Reads XDR values from a borrowed slice.
#[derive(Debug, Clone, Copy)]
pub struct XdrReader<'a> {
    data: &'a [u8],
}

impl<'a> XdrReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.remaining()
    }

    fn ensure(&self, needed: usize) -> Result<(), ProtocolError> {
        if self.data.remaining() < needed {
            return Err(ProtocolError::Truncated {
                needed,
                remaining: self.data.remaining(),
            });
        }
        Ok(())
    }

    pub fn get_u32(&mut self) -> Result<u32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.data.get_u32())
    }

    pub fn get_bool(&mut self) -> Result<bool, ProtocolError> {
        match self.get_u32()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ProtocolError::InvalidBool(other)),
        }
    }

    pub fn get_opaque(&mut self) -> Result<&'a [u8], ProtocolError> {
        let len = self.get_u32()? as usize;
        let padded = len + padding(len);
        self.ensure(padded)?;
        let (value, rest) = self.data.split_at(len);
        self.data = &rest[padding(len)..];
        Ok(value)
    }

    pub fn get_string(&mut self) -> Result<String, ProtocolError> {
        let raw = self.get_opaque()?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| ProtocolError::InvalidUtf8)
    }
}
