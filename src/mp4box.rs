//! Box header and the size-limited box reader.
use std::io;

use crate::serialize::{read_version_flags, BoxBytes, FromBytes, ReadBytes};
use crate::types::FourCC;

/// Header of one box.
#[derive(Debug, Clone)]
pub struct BoxHeader {
    pub fourcc:      FourCC,
    /// Absolute offset of the first byte of the box (the size field).
    pub offset:      u64,
    /// 8, or 16 with an extended size.
    pub header_size: u64,
    /// Payload size, after clamping to the enclosing scope.
    pub size:        u64,
}

/// What reading a header in a scope produced.
#[derive(Debug)]
pub(crate) enum Header {
    Box(BoxHeader),
    /// The header was inconsistent. The rest of the scope cannot be trusted.
    Malformed(String),
}

impl BoxHeader {
    /// Read a box header from a stream that has `scope_left` bytes left
    /// in the enclosing box (including the header itself).
    ///
    /// size == 1: a 64-bit size follows. size == 0: the box
    /// extends to the end of the enclosing scope. A size larger than the
    /// scope is clamped to the scope.
    pub(crate) fn read<R: ReadBytes + ?Sized>(stream: &mut R, scope_left: u64) -> io::Result<Header> {
        let offset = stream.pos();
        let size32 = u32::from_bytes(stream)?;
        let fourcc = FourCC::from_bytes(stream)?;
        let mut header_size = 8;

        let total = match size32 {
            0 => scope_left,
            1 => {
                if scope_left < 16 {
                    return Ok(Header::Malformed(format!("{}: truncated extended size", fourcc)));
                }
                header_size = 16;
                u64::from_bytes(stream)?
            },
            n => n as u64,
        };
        if total < header_size {
            return Ok(Header::Malformed(format!("{}: box size {} too small", fourcc, total)));
        }
        let size = std::cmp::min(total, scope_left) - header_size;
        if total > scope_left {
            log::debug!("{}: size {} clamped to {}", fourcc, total, scope_left);
        }

        Ok(Header::Box(BoxHeader {
            fourcc,
            offset,
            header_size,
            size,
        }))
    }

    /// Absolute offset just past the end of the box.
    pub fn end(&self) -> u64 {
        self.offset + self.header_size + self.size
    }
}

/// Limited reader that reads no further than the box size.
///
/// When it is dropped, whatever the handler did not consume is skipped,
/// so the parent stream is always positioned at the next sibling.
pub struct BoxReader<'a> {
    pub(crate) header: BoxHeader,
    pub(crate) depth:  usize,
    version:           u8,
    flags:             u32,
    consumed:          u64,
    inner:             &'a mut dyn ReadBytes,
}

impl<'a> BoxReader<'a> {
    pub(crate) fn new(stream: &'a mut dyn ReadBytes, header: BoxHeader, depth: usize) -> BoxReader<'a> {
        log::trace!("BoxReader {} at {} size {} depth {}", header.fourcc, header.offset, header.size, depth);
        BoxReader {
            header,
            depth,
            version: 0,
            flags: 0,
            consumed: 0,
            inner: stream,
        }
    }

    /// Read the version and flags of a "full box".
    pub(crate) fn read_full(&mut self) -> io::Result<()> {
        let (version, flags) = read_version_flags(self)?;
        self.version = version;
        self.flags = flags;
        Ok(())
    }

    /// Start of the payload.
    pub(crate) fn start(&self) -> u64 {
        self.header.offset + self.header.header_size
    }
}

impl Drop for BoxReader<'_> {
    fn drop(&mut self) {
        let left = self.left();
        if left > 0 {
            log::trace!("BoxReader {} drop: skipping {}", self.header.fourcc, left);
            let end = self.header.end();
            if self.inner.seek(end).is_err() {
                if let Err(e) = self.inner.skip(left) {
                    log::warn!("{}: cannot skip to end of box at {}: {}", self.header.fourcc, end, e);
                }
            }
        }
    }
}

impl ReadBytes for BoxReader<'_> {
    #[inline]
    fn read(&mut self, amount: u64) -> io::Result<&[u8]> {
        if self.consumed + amount > self.header.size {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        let res = self.inner.read(amount)?;
        self.consumed += amount;
        Ok(res)
    }

    #[inline]
    fn skip(&mut self, amount: u64) -> io::Result<()> {
        if self.consumed + amount > self.header.size {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        self.inner.skip(amount)?;
        self.consumed += amount;
        Ok(())
    }

    #[inline]
    fn left(&self) -> u64 {
        self.header.size.saturating_sub(self.consumed)
    }
}

impl BoxBytes for BoxReader<'_> {
    #[inline]
    fn pos(&self) -> u64 {
        self.start() + self.consumed
    }

    fn seek(&mut self, pos: u64) -> io::Result<()> {
        let start = self.start();
        if pos < start || pos > start + self.header.size {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        self.inner.seek(pos)?;
        self.consumed = pos - start;
        Ok(())
    }

    #[inline]
    fn size(&self) -> u64 {
        self.header.size
    }

    fn version(&self) -> u8 {
        self.version
    }

    fn flags(&self) -> u32 {
        self.flags
    }

    fn fourcc(&self) -> FourCC {
        self.header.fourcc
    }

    fn is_streamed(&self) -> bool {
        self.inner.is_streamed()
    }
}
