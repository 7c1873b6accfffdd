use crate::boxes::prelude::*;

/// 8.6.1.3 Composition Time to Sample Box (ISO/IEC 14496-12:2015(E))
#[derive(Debug, Default)]
pub struct CompositionOffsetBox {
    pub entries: Vec<CompositionOffsetEntry>,
}

/// Composition offset entry.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct CompositionOffsetEntry {
    pub count:  u32,
    pub offset: i32,
}

impl FromBox for CompositionOffsetBox {
    // Version 0 offsets are unsigned in the standard, but writers put
    // negative values in there anyway, so they are always read as signed.
    fn from_box(stream: &mut BoxReader<'_>) -> Result<CompositionOffsetBox> {
        stream.read_full()?;
        let count = u32::from_bytes(stream)?;
        let count = check_entries(stream, count as u64, 8)?;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(CompositionOffsetEntry {
                count:  u32::from_bytes(stream)?,
                offset: i32::from_bytes(stream)?,
            });
        }
        Ok(CompositionOffsetBox { entries })
    }
}

impl CompositionOffsetBox {
    /// The amount all decode times must be lowered by so that no
    /// presentation time ends up before its decode time.
    pub fn dts_shift(&self) -> i64 {
        self.entries
            .iter()
            .map(|e| -(e.offset as i64))
            .max()
            .unwrap_or(0)
            .max(0)
    }
}

/// Cursor in the ctts runs, kept per track while playing.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct CompositionCursor {
    index:  usize,
    sample: u32,
}

impl CompositionCursor {
    /// Offset of the current sample, then move on to the next.
    /// `None` once the table is exhausted.
    pub fn next(&mut self, entries: &[CompositionOffsetEntry]) -> Option<i32> {
        while self.index < entries.len() && self.sample >= entries[self.index].count {
            self.index += 1;
            self.sample = 0;
        }
        match entries.get(self.index) {
            Some(entry) => {
                self.sample += 1;
                Some(entry.offset)
            },
            None => None,
        }
    }

    /// Position the cursor at sample `sample` (0-based).
    pub fn seek(entries: &[CompositionOffsetEntry], sample: usize) -> CompositionCursor {
        let mut first = 0u64;
        for (index, entry) in entries.iter().enumerate() {
            let next = first + entry.count as u64;
            if next > sample as u64 {
                return CompositionCursor {
                    index,
                    sample: (sample as u64 - first) as u32,
                };
            }
            first = next;
        }
        CompositionCursor {
            index: entries.len(),
            sample: 0,
        }
    }
}

pub(crate) fn read_ctts(_movie: &mut MovieContext, track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    let track = match track {
        Some(track) => track,
        None => return Ok(()),
    };
    let ctts = CompositionOffsetBox::from_box(stream)?;
    track.dts_shift = ctts.dts_shift();
    log::debug!("track {}: ctts entries {} dts shift {}", track.track_id, ctts.entries.len(), track.dts_shift);
    track.ctts = ctts.entries;
    Ok(())
}
