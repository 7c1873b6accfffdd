use serde::Serialize;

/// Where the bytes of a sample live.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataRefHandle {
    /// The file that contains the movie header.
    Primary,
    /// An externally referenced file, by index in the demuxer's source table.
    External(usize),
    /// A data reference that could not be opened.
    Unresolved,
}

impl Default for DataRefHandle {
    fn default() -> DataRefHandle {
        DataRefHandle::Primary
    }
}

/// Information about one sample: one entry of a track's sample index.
#[derive(Clone, Copy, Default, Debug, PartialEq, Serialize)]
pub struct SampleInfo {
    // File position.
    pub pos:      u64,
    // Decode time, in the track's time scale.
    pub dts:      i64,
    // Size.
    pub size:     u32,
    // Samples since the last keyframe (0 on a keyframe).
    pub distance: u32,
    // is it a sync sample
    pub is_sync:  bool,
    // what chunk (0-based) is it in. Each trun counts as one chunk.
    pub chunk:    u32,
    // which file.
    pub source:   DataRefHandle,
}
