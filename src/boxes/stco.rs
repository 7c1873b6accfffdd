use crate::boxes::prelude::*;

/// 8.7.5 Chunk Offset Box (ISO/IEC 14496-12:2015(E))
///
/// Both `stco` (32 bit offsets) and `co64` (64 bit offsets).
#[derive(Debug, Default)]
pub struct ChunkOffsetBox {
    pub entries: Vec<u64>,
}

impl FromBox for ChunkOffsetBox {
    fn from_box(stream: &mut BoxReader<'_>) -> Result<ChunkOffsetBox> {
        stream.read_full()?;
        let large = stream.fourcc() == FourCC::new(b"co64");
        let entry_size = if large { 8 } else { 4 };
        let count = u32::from_bytes(stream)?;
        let count = check_entries(stream, count as u64, entry_size)?;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let offset = if large {
                u64::from_bytes(stream)?
            } else {
                u32::from_bytes(stream)? as u64
            };
            entries.push(offset);
        }
        Ok(ChunkOffsetBox { entries })
    }
}

pub(crate) fn read_stco(_movie: &mut MovieContext, track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    let track = match track {
        Some(track) => track,
        None => return Ok(()),
    };
    let stco = ChunkOffsetBox::from_box(stream)?;
    log::debug!("track {}: {} chunks", track.track_id, stco.entries.len());
    track.chunk_offsets = stco.entries;
    Ok(())
}
