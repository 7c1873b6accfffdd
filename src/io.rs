//! Byte cursors over a media source.
//!
//! `Mp4File` maps a file into memory, `MemFile` wraps a buffer. Both
//! implement `ReadBytes`, so the box walker and the packet reader can use
//! either one.
use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;
use std::sync::Arc;

use memmap::{Mmap, MmapOptions};

use crate::serialize::{BoxBytes, ReadBytes};

pub struct Mp4File {
    mmap:  Option<Arc<Mmap>>,
    pos:   u64,
    size:  u64,
}

impl Mp4File {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Mp4File> {
        let file = fs::File::open(path.as_ref())?;
        let size = file.metadata()?.len();
        // Mapping a zero-length file fails, so don't.
        let mmap = if size > 0 {
            Some(Arc::new(unsafe { MmapOptions::new().map(&file)? }))
        } else {
            None
        };
        Ok(Mp4File {
            mmap,
            pos: 0,
            size,
        })
    }

    fn data(&self) -> &[u8] {
        match self.mmap.as_ref() {
            Some(mmap) => &mmap[..],
            None => &[],
        }
    }
}

impl ReadBytes for Mp4File {
    #[inline]
    fn read(&mut self, amount: u64) -> io::Result<&[u8]> {
        if self.pos + amount > self.size {
            return Err(ioerr!(UnexpectedEof, "tried to read past eof"));
        }
        let pos = self.pos as usize;
        self.pos += amount;
        Ok(&self.data()[pos..pos + amount as usize])
    }

    #[inline]
    fn skip(&mut self, amount: u64) -> io::Result<()> {
        if self.pos + amount > self.size {
            return Err(ioerr!(UnexpectedEof, "tried to seek past eof"));
        }
        self.pos += amount;
        Ok(())
    }

    #[inline]
    fn left(&self) -> u64 {
        self.size.saturating_sub(self.pos)
    }
}

impl BoxBytes for Mp4File {
    #[inline]
    fn pos(&self) -> u64 {
        self.pos
    }

    #[inline]
    fn seek(&mut self, pos: u64) -> io::Result<()> {
        if pos > self.size {
            return Err(io::Error::new(ErrorKind::UnexpectedEof, "tried to seek past eof"));
        }
        self.pos = pos;
        Ok(())
    }

    #[inline]
    fn size(&self) -> u64 {
        self.size
    }
}

/// In-memory source.
///
/// A `MemFile` can be flagged as streamed. The packet reader then orders
/// samples by file position and the box walker stops the header walk as
/// soon as it has seen both `moov` and `mdat`, which is how a progressive
/// (non-seekable) input is handled.
#[derive(Clone)]
pub struct MemFile {
    data:     Arc<Vec<u8>>,
    pos:      u64,
    streamed: bool,
}

impl MemFile {
    pub fn new(data: Vec<u8>) -> MemFile {
        MemFile {
            data: Arc::new(data),
            pos: 0,
            streamed: false,
        }
    }

    pub fn streamed(data: Vec<u8>) -> MemFile {
        MemFile {
            streamed: true,
            ..MemFile::new(data)
        }
    }
}

impl ReadBytes for MemFile {
    fn read(&mut self, amount: u64) -> io::Result<&[u8]> {
        if self.pos + amount > self.data.len() as u64 {
            return Err(ioerr!(UnexpectedEof, "tried to read past end of buffer"));
        }
        let pos = self.pos as usize;
        self.pos += amount;
        Ok(&self.data[pos..pos + amount as usize])
    }

    fn skip(&mut self, amount: u64) -> io::Result<()> {
        if self.pos + amount > self.data.len() as u64 {
            return Err(ioerr!(UnexpectedEof, "tried to skip past end of buffer"));
        }
        self.pos += amount;
        Ok(())
    }

    fn left(&self) -> u64 {
        (self.data.len() as u64).saturating_sub(self.pos)
    }
}

impl BoxBytes for MemFile {
    fn pos(&self) -> u64 {
        self.pos
    }

    fn seek(&mut self, pos: u64) -> io::Result<()> {
        if pos > self.data.len() as u64 {
            return Err(ioerr!(UnexpectedEof, "tried to seek past end of buffer"));
        }
        self.pos = pos;
        Ok(())
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn is_streamed(&self) -> bool {
        self.streamed
    }
}

/// Read `size` bytes at `pos` into a new buffer.
pub(crate) fn read_at<R: ReadBytes + ?Sized>(stream: &mut R, pos: u64, size: u64) -> io::Result<Vec<u8>> {
    stream.seek(pos)?;
    Ok(stream.read(size)?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn memfile_bounds() {
        let mut f = MemFile::new(vec![1, 2, 3, 4]);
        assert_eq!(f.read(2).unwrap(), &[1, 2]);
        assert_eq!(f.left(), 2);
        assert!(f.read(3).is_err());
        f.seek(1).unwrap();
        assert_eq!(f.read(3).unwrap(), &[2, 3, 4]);
        assert!(!f.is_streamed());
        assert!(MemFile::streamed(vec![]).is_streamed());
    }

    #[test]
    fn mp4file_reads_mapped_data() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"0123456789").unwrap();
        tmp.flush().unwrap();
        let mut f = Mp4File::open(tmp.path()).unwrap();
        assert_eq!(f.size(), 10);
        assert_eq!(read_at(&mut f, 4, 3).unwrap(), b"456".to_vec());
        assert_eq!(f.pos(), 7);
        assert!(f.skip(4).is_err());
    }
}
