use crate::boxes::prelude::*;

/// 8.7.4 Sample To Chunk Box (ISO/IEC 14496-12:2015(E))
#[derive(Debug, Default)]
pub struct SampleToChunkBox {
    pub entries: Vec<SampleToChunkEntry>,
}

/// Entry in SampleToChunkBox.
///
/// `first_chunk` and `sample_description_index` are 1-based, as stored.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SampleToChunkEntry {
    pub first_chunk:              u32,
    pub samples_per_chunk:        u32,
    pub sample_description_index: u32,
}

impl FromBox for SampleToChunkBox {
    fn from_box(stream: &mut BoxReader<'_>) -> Result<SampleToChunkBox> {
        stream.read_full()?;
        let count = u32::from_bytes(stream)?;
        let count = check_entries(stream, count as u64, 12)?;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(SampleToChunkEntry {
                first_chunk:              u32::from_bytes(stream)?,
                samples_per_chunk:        u32::from_bytes(stream)?,
                sample_description_index: u32::from_bytes(stream)?,
            });
        }
        Ok(SampleToChunkBox { entries })
    }
}

/// Walks the chunks in order and returns the stsc group each one is in.
///
/// Chunks before the first group's `first_chunk` belong to the first group.
pub struct ChunkGroups<'a> {
    entries: &'a [SampleToChunkEntry],
    index:   usize,
}

impl<'a> ChunkGroups<'a> {
    pub fn new(entries: &'a [SampleToChunkEntry]) -> ChunkGroups<'a> {
        ChunkGroups { entries, index: 0 }
    }

    /// Group for chunk number `chunk` (1-based). Must be called with
    /// increasing chunk numbers.
    pub fn group(&mut self, chunk: u32) -> Option<&'a SampleToChunkEntry> {
        while self.index + 1 < self.entries.len() && chunk >= self.entries[self.index + 1].first_chunk {
            self.index += 1;
        }
        self.entries.get(self.index)
    }
}

/// Total number of samples the table describes for `chunk_count` chunks.
pub fn total_samples(entries: &[SampleToChunkEntry], chunk_count: usize) -> u64 {
    let mut groups = ChunkGroups::new(entries);
    (1..=chunk_count as u32)
        .map(|chunk| groups.group(chunk).map(|g| g.samples_per_chunk as u64).unwrap_or(0))
        .sum()
}

pub(crate) fn read_stsc(_movie: &mut MovieContext, track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    let track = match track {
        Some(track) => track,
        None => return Ok(()),
    };
    let stsc = SampleToChunkBox::from_box(stream)?;
    log::debug!("track {}: stsc entries {}", track.track_id, stsc.entries.len());
    track.stsc = stsc.entries;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(first_chunk: u32, samples_per_chunk: u32) -> SampleToChunkEntry {
        SampleToChunkEntry { first_chunk, samples_per_chunk, sample_description_index: 1 }
    }

    #[test]
    fn groups_partition_chunks() {
        let entries = vec![e(1, 3), e(3, 2), e(4, 5)];
        let mut groups = ChunkGroups::new(&entries);
        let v: Vec<_> = (1..=5).map(|c| groups.group(c).unwrap().samples_per_chunk).collect();
        assert_eq!(v, vec![3, 3, 2, 5, 5]);
        assert_eq!(total_samples(&entries, 5), 18);
    }

    #[test]
    fn no_groups() {
        assert_eq!(total_samples(&[], 4), 0);
        assert!(ChunkGroups::new(&[]).group(1).is_none());
    }
}
