use crate::boxes::prelude::*;

/// 8.6.2 Sync Sample Box (ISO/IEC 14496-12:2015(E))
///
/// Also used for the QuickTime partial sync sample box, `stps`,
/// which has the same layout.
#[derive(Debug, Default)]
pub struct SyncSampleBox {
    /// 1-based sample numbers.
    pub entries: Vec<u32>,
}

impl FromBox for SyncSampleBox {
    fn from_box(stream: &mut BoxReader<'_>) -> Result<SyncSampleBox> {
        stream.read_full()?;
        let count = u32::from_bytes(stream)?;
        let count = check_entries(stream, count as u64, 4)?;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(u32::from_bytes(stream)?);
        }
        Ok(SyncSampleBox { entries })
    }
}

/// Cursor over a sorted list of 1-based sample numbers.
pub struct SampleNumbers<'a> {
    entries: &'a [u32],
    index:   usize,
}

impl<'a> SampleNumbers<'a> {
    pub fn new(entries: &'a [u32]) -> SampleNumbers<'a> {
        SampleNumbers { entries, index: 0 }
    }

    /// Is `sample` (1-based) in the list? Must be called with increasing numbers.
    pub fn contains(&mut self, sample: u32) -> bool {
        while self.index < self.entries.len() && self.entries[self.index] < sample {
            self.index += 1;
        }
        if self.index < self.entries.len() && self.entries[self.index] == sample {
            self.index += 1;
            return true;
        }
        false
    }
}

pub(crate) fn read_stss(_movie: &mut MovieContext, track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    let track = match track {
        Some(track) => track,
        None => return Ok(()),
    };
    let partial = stream.fourcc() == FourCC::new(b"stps");
    let b = SyncSampleBox::from_box(stream)?;
    log::debug!("track {}: {} {} entries", track.track_id, stream.fourcc(), b.entries.len());
    if partial {
        track.partial_sync = b.entries;
    } else {
        track.sync_samples = b.entries;
    }
    Ok(())
}
