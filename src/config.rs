//! Reader configuration.
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Options for opening a movie. Passed explicitly to the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    /// Maximum box nesting depth. Deeper boxes are skipped.
    pub max_depth:            usize,
    /// Between samples in the primary file whose decode times are at most
    /// this far apart (in microseconds), the one at the lower file offset
    /// is read first.
    pub interleave_window_us: i64,
    /// Open files referenced by alias data references.
    pub follow_external_refs: bool,
    /// Read chapter titles after the header.
    pub read_chapters:        bool,
    /// Read the start timecode of tmcd tracks.
    pub read_timecode:        bool,
}

impl Default for ReaderOptions {
    fn default() -> ReaderOptions {
        ReaderOptions {
            max_depth:            64,
            interleave_window_us: 0,
            follow_external_refs: true,
            read_chapters:        true,
            read_timecode:        true,
        }
    }
}

impl ReaderOptions {
    /// Load options from a JSON file. Missing fields get their default.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<ReaderOptions> {
        let data = fs::read(path.as_ref())?;
        let opts = serde_json::from_slice(&data)
            .map_err(|e| ioerr!(InvalidData, "{}: {}", path.as_ref().display(), e))?;
        Ok(opts)
    }
}
