use crate::boxes::prelude::*;

/// 8.6.1.2 Decoding Time to Sample Box (ISO/IEC 14496-12:2015(E))
#[derive(Debug, Default)]
pub struct TimeToSampleBox {
    pub entries: Vec<TimeToSampleEntry>,
}

/// Entry in TimeToSampleBox.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TimeToSampleEntry {
    pub count:  u32,
    pub delta:  u32,
}

impl FromBox for TimeToSampleBox {
    fn from_box(stream: &mut BoxReader<'_>) -> Result<TimeToSampleBox> {
        stream.read_full()?;
        let count = u32::from_bytes(stream)?;
        let count = check_entries(stream, count as u64, 8)?;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(TimeToSampleEntry {
                count: u32::from_bytes(stream)?,
                delta: u32::from_bytes(stream)?,
            });
        }
        Ok(TimeToSampleBox { entries })
    }
}

impl TimeToSampleBox {
    /// Return an iterator that iterates over every sample.
    pub fn iter(&self) -> TimeToSampleIterator<'_> {
        TimeToSampleIterator::new(&self.entries)
    }
}

/// Lazy run cursor over the stts runs.
///
/// Yields (duration, decode time) per sample. After the last run is
/// exhausted it keeps repeating the last duration, so that a table that
/// is a bit short still gives every sample a timestamp.
#[derive(Clone)]
pub struct TimeToSampleIterator<'a> {
    entries:    &'a [TimeToSampleEntry],
    index:      usize,
    in_run:     u32,
    cumulative: i64,
}

impl<'a> TimeToSampleIterator<'a> {
    pub fn new(entries: &'a [TimeToSampleEntry]) -> TimeToSampleIterator<'a> {
        TimeToSampleIterator {
            entries,
            index: 0,
            in_run: 0,
            cumulative: 0,
        }
    }

    /// Start decode time (default 0).
    pub fn start_at(mut self, dts: i64) -> Self {
        self.cumulative = dts;
        self
    }
}

impl<'a> Iterator for TimeToSampleIterator<'a> {
    type Item = (u32, i64);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        // Skip empty runs, but never move past the last one.
        while self.index + 1 < self.entries.len() && self.in_run >= self.entries[self.index].count {
            self.index += 1;
            self.in_run = 0;
        }
        let delta = self.entries.get(self.index)?.delta;
        self.in_run = self.in_run.saturating_add(1);
        let dts = self.cumulative;
        self.cumulative += delta as i64;
        Some((delta, dts))
    }
}

pub(crate) fn read_stts(_movie: &mut MovieContext, track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    let track = match track {
        Some(track) => track,
        None => return Ok(()),
    };
    let stts = TimeToSampleBox::from_box(stream)?;
    log::debug!("track {}: stts entries {}", track.track_id, stts.entries.len());
    track.stts = stts.entries;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(count: u32, delta: u32) -> TimeToSampleEntry {
        TimeToSampleEntry { count, delta }
    }

    #[test]
    fn iterates_runs_lazily() {
        let entries = vec![e(2, 10), e(0, 99), e(1, 20)];
        let v: Vec<_> = TimeToSampleIterator::new(&entries).take(5).collect();
        assert_eq!(v, vec![(10, 0), (10, 10), (20, 20), (20, 40), (20, 60)]);
    }

    #[test]
    fn empty_table_yields_nothing() {
        let entries = vec![];
        assert_eq!(TimeToSampleIterator::new(&entries).next(), None);
    }
}
