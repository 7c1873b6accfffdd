use crate::boxes::prelude::*;

/// 8.6.6 Edit List Box (ISO/IEC 14496-12:2015(E))
#[derive(Debug, Default)]
pub struct EditListBox {
    pub entries: Vec<EditListEntry>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct EditListEntry {
    /// In the movie time scale.
    pub segment_duration: u64,
    /// In the media time scale. -1 is an empty edit.
    pub media_time:       i64,
    /// 16.16 fixed point.
    pub media_rate:       i32,
}

impl EditListEntry {
    pub fn is_empty_edit(&self) -> bool {
        self.media_time == -1
    }
}

impl FromBox for EditListBox {
    fn from_box(stream: &mut BoxReader<'_>) -> Result<EditListBox> {
        stream.read_full()?;
        let version = stream.version();
        if version > 1 {
            return Err(Error::UnsupportedVersion { fourcc: stream.fourcc(), version });
        }
        let entry_size = if version == 1 { 20 } else { 12 };
        let count = u32::from_bytes(stream)?;
        let count = check_entries(stream, count as u64, entry_size)?;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let (segment_duration, media_time) = if version == 1 {
                (u64::from_bytes(stream)?, i64::from_bytes(stream)?)
            } else {
                (u32::from_bytes(stream)? as u64, i32::from_bytes(stream)? as i64)
            };
            entries.push(EditListEntry {
                segment_duration,
                media_time,
                media_rate: i32::from_bytes(stream)?,
            });
        }
        Ok(EditListBox { entries })
    }
}

pub(crate) fn read_elst(_movie: &mut MovieContext, track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    let track = match track {
        Some(track) => track,
        None => return Ok(()),
    };
    let elst = EditListBox::from_box(stream)?;
    log::debug!("track {}: {} edit list entries", track.track_id, elst.entries.len());
    track.edits = elst.entries;
    Ok(())
}
