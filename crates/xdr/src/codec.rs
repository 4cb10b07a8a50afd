//! XDR primitive encoding (RFC 4506).
//!
//! The encoding rules used by every wire type:
//!
//! - integers are big-endian; `bool` is a `u32` restricted to 0/1
//! - fixed-length opaque data is written verbatim (lengths here are
//!   multiples of 4, so no padding arises)
//! - variable-length opaque data and vectors carry a `u32` length prefix;
//!   opaque payloads are zero-padded to a 4-byte boundary
//! - decoding is strict: unknown discriminants, out-of-range lengths and
//!   trailing bytes are all errors

use std::io::{Read, Write};

use thiserror::Error;

/// Maximum element count accepted for any variable-length vector.
///
/// Generous compared to real traffic; exists so a hostile length prefix
/// cannot drive a huge allocation.
pub const MAX_VEC_LEN: u32 = 1 << 20;

/// Maximum byte length accepted for any variable-length opaque field.
pub const MAX_OPAQUE_LEN: u32 = 1 << 24;

/// Errors from XDR encoding or decoding.
#[derive(Debug, Error)]
pub enum XdrError {
    /// Underlying I/O failure (short reads surface here).
    #[error("xdr io: {0}")]
    Io(#[from] std::io::Error),

    /// A decoded field holds a value the type does not admit.
    #[error("invalid xdr value: {0}")]
    InvalidValue(&'static str),

    /// A length prefix exceeds the admissible bound.
    #[error("xdr length limit exceeded")]
    LengthLimitExceeded,

    /// An enum or union discriminant is not part of the schema.
    #[error("unknown xdr discriminant {0}")]
    UnknownDiscriminant(u32),

    /// Decoding succeeded but bytes remain in the buffer.
    #[error("trailing bytes after xdr value")]
    TrailingBytes,
}

/// A type with a canonical XDR encoding.
pub trait WriteXdr {
    /// Serialize into `w`.
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError>;

    /// Serialize to a fresh byte vector.
    fn to_xdr(&self) -> Result<Vec<u8>, XdrError> {
        let mut buf = Vec::new();
        self.write_xdr(&mut buf)?;
        Ok(buf)
    }
}

/// A type decodable from its canonical XDR encoding.
pub trait ReadXdr: Sized {
    /// Deserialize from `r`.
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError>;

    /// Deserialize from `bytes`, requiring the whole buffer be consumed.
    fn from_xdr(bytes: &[u8]) -> Result<Self, XdrError> {
        let mut cursor = bytes;
        let value = Self::read_xdr(&mut cursor)?;
        if !cursor.is_empty() {
            return Err(XdrError::TrailingBytes);
        }
        Ok(value)
    }
}

// =============================================================================
// Primitives
// =============================================================================

impl WriteXdr for u32 {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        w.write_all(&self.to_be_bytes())?;
        Ok(())
    }
}

impl ReadXdr for u32 {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        let mut buf = [0u8; 4];
        r.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }
}

impl WriteXdr for u64 {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        w.write_all(&self.to_be_bytes())?;
        Ok(())
    }
}

impl ReadXdr for u64 {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        let mut buf = [0u8; 8];
        r.read_exact(&mut buf)?;
        Ok(u64::from_be_bytes(buf))
    }
}

impl WriteXdr for i64 {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        w.write_all(&self.to_be_bytes())?;
        Ok(())
    }
}

impl ReadXdr for i64 {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        let mut buf = [0u8; 8];
        r.read_exact(&mut buf)?;
        Ok(i64::from_be_bytes(buf))
    }
}

impl WriteXdr for bool {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        (*self as u32).write_xdr(w)
    }
}

impl ReadXdr for bool {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        match u32::read_xdr(r)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(XdrError::InvalidValue("bool out of range")),
        }
    }
}

impl WriteXdr for [u8; 32] {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        w.write_all(self)?;
        Ok(())
    }
}

impl ReadXdr for [u8; 32] {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        let mut buf = [0u8; 32];
        r.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl WriteXdr for [u8; 64] {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        w.write_all(self)?;
        Ok(())
    }
}

impl ReadXdr for [u8; 64] {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        let mut buf = [0u8; 64];
        r.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// Write variable-length opaque data: length prefix, bytes, zero padding to
/// a 4-byte boundary.
pub fn write_var_opaque(w: &mut dyn Write, bytes: &[u8]) -> Result<(), XdrError> {
    let len = u32::try_from(bytes.len()).map_err(|_| XdrError::LengthLimitExceeded)?;
    if len > MAX_OPAQUE_LEN {
        return Err(XdrError::LengthLimitExceeded);
    }
    len.write_xdr(w)?;
    w.write_all(bytes)?;
    let pad = (4 - bytes.len() % 4) % 4;
    w.write_all(&[0u8; 3][..pad])?;
    Ok(())
}

/// Read variable-length opaque data written by [`write_var_opaque`].
pub fn read_var_opaque(r: &mut dyn Read) -> Result<Vec<u8>, XdrError> {
    let len = u32::read_xdr(r)?;
    if len > MAX_OPAQUE_LEN {
        return Err(XdrError::LengthLimitExceeded);
    }
    let mut bytes = vec![0u8; len as usize];
    r.read_exact(&mut bytes)?;
    let pad = (4 - len as usize % 4) % 4;
    if pad > 0 {
        let mut padding = [0u8; 3];
        r.read_exact(&mut padding[..pad])?;
        if padding[..pad].iter().any(|b| *b != 0) {
            return Err(XdrError::InvalidValue("nonzero opaque padding"));
        }
    }
    Ok(bytes)
}

impl<T: WriteXdr> WriteXdr for Vec<T> {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        let len = u32::try_from(self.len()).map_err(|_| XdrError::LengthLimitExceeded)?;
        if len > MAX_VEC_LEN {
            return Err(XdrError::LengthLimitExceeded);
        }
        len.write_xdr(w)?;
        for item in self {
            item.write_xdr(w)?;
        }
        Ok(())
    }
}

impl<T: ReadXdr> ReadXdr for Vec<T> {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        let len = u32::read_xdr(r)?;
        if len > MAX_VEC_LEN {
            return Err(XdrError::LengthLimitExceeded);
        }
        let mut items = Vec::with_capacity(len.min(1024) as usize);
        for _ in 0..len {
            items.push(T::read_xdr(r)?);
        }
        Ok(items)
    }
}

impl<T: WriteXdr> WriteXdr for Option<T> {
    fn write_xdr(&self, w: &mut dyn Write) -> Result<(), XdrError> {
        match self {
            Some(value) => {
                true.write_xdr(w)?;
                value.write_xdr(w)
            }
            None => false.write_xdr(w),
        }
    }
}

impl<T: ReadXdr> ReadXdr for Option<T> {
    fn read_xdr(r: &mut dyn Read) -> Result<Self, XdrError> {
        if bool::read_xdr(r)? {
            Ok(Some(T::read_xdr(r)?))
        } else {
            Ok(None)
        }
    }
}
