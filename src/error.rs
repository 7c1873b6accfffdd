//! Error types.
//!
//! Box-level errors abort only the box they were raised in; the walker logs
//! them and carries on with the next sibling. File-level errors (`NoMovie`,
//! `NoTracks`, a failing cursor) abort `Demuxer::open`.
use std::io;

use thiserror::Error;

use crate::types::FourCC;

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Size or type inconsistency inside a box.
    #[error("{fourcc}: malformed box: {reason}")]
    MalformedBox { fourcc: FourCC, reason: String },

    /// Box version we do not know how to parse.
    #[error("{fourcc}: unsupported version {version}")]
    UnsupportedVersion { fourcc: FourCC, version: u8 },

    /// An entry count that cannot possibly fit in the box.
    #[error("{fourcc}: {count} entries of {entry_size} bytes do not fit in {available} bytes")]
    Allocation {
        fourcc:     FourCC,
        count:      u64,
        entry_size: u64,
        available:  u64,
    },

    /// The sample tables of a track contradict each other. The track is dropped.
    #[error("track {track_id}: inconsistent sample tables: {reason}")]
    InconsistentTrackTables { track_id: u32, reason: String },

    /// Track fragment that cannot be tied to a track-extends record.
    #[error("track fragment: {0}")]
    CorruptExtendedHeader(String),

    #[error("no movie header (moov) found")]
    NoMovie,

    #[error("no usable tracks found")]
    NoTracks,

    /// Sample lives in a data reference that could not be opened.
    #[error("track {track_id}: sample at {pos}: data reference not resolved")]
    UnresolvedDataRef { track_id: u32, pos: u64 },

    #[error("track {0}: no such track")]
    NoSuchTrack(u32),

    #[error("track {track_id}: no sample {sample}")]
    NoSuchSample { track_id: u32, sample: usize },

    #[error("track {track_id}: cannot seek to {timestamp}")]
    SeekFailed { track_id: u32, timestamp: i64 },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn malformed(fourcc: FourCC, reason: impl Into<String>) -> Error {
        Error::MalformedBox {
            fourcc,
            reason: reason.into(),
        }
    }

    pub(crate) fn inconsistent(track_id: u32, reason: impl Into<String>) -> Error {
        Error::InconsistentTrackTables {
            track_id,
            reason: reason.into(),
        }
    }

    /// Is this a failure of the underlying cursor, rather than of the box data?
    ///
    /// A read past the end of a size-limited box reader shows up as
    /// `UnexpectedEof`; that means the box content was short, not that
    /// the file is unreadable.
    pub(crate) fn is_fatal(&self) -> bool {
        match self {
            Error::Io(e) => e.kind() != io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}
