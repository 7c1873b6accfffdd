//! Basic deserializer.
//!
//! The ReadBytes/BoxBytes/FromBytes traits are defined here, plus the
//! FromBytes implementations for the primitive integer types.
//!
use std::convert::TryInto;
use std::io::{self, ErrorKind::UnexpectedEof};

use auto_impl::auto_impl;

use crate::types::FourCC;

/// Byte reader in a stream.
#[auto_impl(&mut, Box)]
pub trait ReadBytes: BoxBytes {
    /// Read an exact number of bytes, return a reference to the buffer.
    fn read(&mut self, amount: u64) -> io::Result<&[u8]>;
    /// Skip some bytes in the input.
    fn skip(&mut self, amount: u64) -> io::Result<()>;
    /// How much data is left?
    fn left(&self) -> u64;
}

/// Positioning and box metadata. The version/flags/fourcc methods only
/// mean something on a box reader; they have defaults.
#[auto_impl(&mut, Box)]
pub trait BoxBytes {
    /// Get current position in the stream.
    fn pos(&self) -> u64;
    /// Seek to a position in the stream.
    fn seek(&mut self, pos: u64) -> io::Result<()>;
    /// Size of the stream (or of the box, for a box reader).
    fn size(&self) -> u64;
    /// Get version metadata.
    fn version(&self) -> u8 {
        0
    }
    /// Get flags metadata.
    fn flags(&self) -> u32 {
        0
    }
    /// Get the FourCC of the box we are in.
    fn fourcc(&self) -> FourCC {
        FourCC::new(b"root")
    }
    /// Streamed (non-seekable, progressive) source?
    fn is_streamed(&self) -> bool {
        false
    }
}

/// Trait to deserialize a type.
pub trait FromBytes {
    fn from_bytes<R: ReadBytes + ?Sized>(bytes: &mut R) -> io::Result<Self>
    where
        Self: Sized;
    fn min_size() -> usize;
}

// Convenience macro to implement FromBytes for integer types.
macro_rules! def_from_bytes {
    ($type:ident) => {
        impl FromBytes for $type {
            fn from_bytes<R: ReadBytes + ?Sized>(bytes: &mut R) -> io::Result<Self> {
                let sz = std::mem::size_of::<$type>();
                let data = bytes.read(sz as u64)?;
                let data = data.try_into().map_err(|_| UnexpectedEof)?;
                Ok($type::from_be_bytes(data))
            }
            fn min_size() -> usize {
                std::mem::size_of::<$type>()
            }
        }
    };
}

def_from_bytes!(u8);
def_from_bytes!(u16);
def_from_bytes!(i16);
def_from_bytes!(u32);
def_from_bytes!(i32);
def_from_bytes!(u64);
def_from_bytes!(i64);

/// Read a version byte and the 24 bits of flags of a "full box".
pub(crate) fn read_version_flags<R: ReadBytes + ?Sized>(stream: &mut R) -> io::Result<(u8, u32)> {
    let vflags = u32::from_bytes(stream)?;
    Ok(((vflags >> 24) as u8, vflags & 0x00ffffff))
}

/// Check that `count` entries of `entry_size` bytes fit in what is left of the stream.
///
/// Done before allocating anything for an entry table.
pub(crate) fn check_entries<R: ReadBytes + ?Sized>(
    stream: &R,
    count: u64,
    entry_size: u64,
) -> crate::error::Result<usize> {
    let available = stream.left();
    match count.checked_mul(entry_size) {
        Some(n) if n <= available && count <= usize::MAX as u64 => Ok(count as usize),
        _ => Err(crate::error::Error::Allocation {
            fourcc: stream.fourcc(),
            count,
            entry_size,
            available,
        }),
    }
}
