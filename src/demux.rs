//! Opening a movie and reading its samples in decode order.
//!
//! `Demuxer::open` walks the box tree once, builds the sample index of
//! every track, and then hands out packets one at a time, always the
//! sample with the earliest decode time over all tracks. Fragmented
//! files get their fragments appended to the index as the walk finds
//! them; on a streamed source the walk stops after the first `moov` and
//! `mdat` and resumes when the index runs dry.
use std::path::{Path, PathBuf};

use crate::chapters::{self, Chapter};
use crate::config::ReaderOptions;
use crate::dataref::{DataRefResolver, FsResolver};
use crate::error::{Error, Result};
use crate::io::{read_at, Mp4File};
use crate::metadata::Metadata;
use crate::movie::MovieContext;
use crate::sample_info::{DataRefHandle, SampleInfo};
use crate::serialize::ReadBytes;
use crate::timecode;
use crate::track::Track;
use crate::types::{rescale, FourCC};
use crate::walker;

/// One sample, with its timing in the time scale of its track.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub track_id:    u32,
    /// Position of the track in `Demuxer::tracks()`.
    pub track_index: usize,
    pub dts:         i64,
    pub pts:         i64,
    pub duration:    i64,
    pub is_sync:     bool,
    /// File position of the payload.
    pub pos:         u64,
    pub data:        Vec<u8>,
}

/// How `Demuxer::seek` picks a sample.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeekFlags {
    /// Take the last sample at or before the timestamp, instead of the
    /// first one at or after it.
    pub backward: bool,
    /// Any sample, not only sync samples.
    pub any:      bool,
}

/// Demuxer over one movie.
pub struct Demuxer {
    movie:    MovieContext,
    source:   Box<dyn ReadBytes>,
    streamed: bool,
}

impl std::fmt::Debug for Demuxer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Demuxer").field("streamed", &self.streamed).finish_non_exhaustive()
    }
}

impl Demuxer {
    /// Open a file with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Demuxer> {
        Demuxer::open_with(path, ReaderOptions::default())
    }

    /// Open a file. External data references are looked up next to it.
    pub fn open_with(path: impl AsRef<Path>, options: ReaderOptions) -> Result<Demuxer> {
        let path = path.as_ref();
        let file = Mp4File::open(path)?;
        Demuxer::with_resolver(Box::new(file), options, Box::new(FsResolver), Some(path.to_path_buf()))
    }

    /// Open a movie from any byte source. External data references stay
    /// unresolved, since there is no path to resolve them against.
    pub fn from_source<R: ReadBytes + 'static>(source: R, options: ReaderOptions) -> Result<Demuxer> {
        Demuxer::with_resolver(Box::new(source), options, Box::new(FsResolver), None)
    }

    /// Open a movie with a custom data reference resolver.
    pub fn with_resolver(
        mut source: Box<dyn ReadBytes>,
        options: ReaderOptions,
        resolver: Box<dyn DataRefResolver>,
        src_path: Option<PathBuf>,
    ) -> Result<Demuxer> {
        let streamed = source.is_streamed();
        let mut movie = MovieContext::new(options, resolver, src_path);

        walker::read_boxes(&mut movie, None, &mut *source, 0)?;
        if !movie.found_moov {
            log::error!("moov box not found, file broken");
            return Err(Error::NoMovie);
        }
        if movie.tracks.is_empty() {
            return Err(Error::NoTracks);
        }
        log::debug!("header walk done at {}", source.pos());

        let mut demuxer = Demuxer {
            movie,
            source,
            streamed,
        };
        if !streamed {
            if demuxer.movie.options.read_chapters {
                demuxer.read_chapters();
            }
            if demuxer.movie.options.read_timecode {
                demuxer.read_timecode();
            }
        }
        demuxer.finish_chapters();
        Ok(demuxer)
    }

    // QuickTime chapter track, referenced from a tref/chap box.
    fn read_chapters(&mut self) {
        let id = match self.movie.chapter_track {
            Some(id) if id > 0 => id,
            _ => return,
        };
        let MovieContext {
            tracks,
            externals,
            chapters: movie_chapters,
            ..
        } = &mut self.movie;
        let track = match tracks.iter_mut().find(|t| t.id == id) {
            Some(track) => track,
            None => {
                log::error!("referenced chapter track {} not found", id);
                return;
            },
        };
        track.discard = true;
        let source = &mut *self.source;
        let found = chapters::read_chapter_track(track, |sample| {
            read_sample_data(source, externals, id, sample)
        });
        if !found.is_empty() {
            *movie_chapters = found;
        }
    }

    // Start timecode from tmcd tracks.
    fn read_timecode(&mut self) {
        let MovieContext {
            tracks,
            externals,
            metadata,
            ..
        } = &mut self.movie;
        for track in tracks.iter().filter(|t| t.codec == FourCC::new(b"tmcd")) {
            let (params, first) = match (track.timecode.as_ref(), track.samples().first()) {
                (Some(params), Some(first)) => (params, first),
                _ => continue,
            };
            let sample = SampleInfo { size: 4, ..*first };
            let data = match read_sample_data(&mut *self.source, externals, track.id, &sample) {
                Ok(data) => data,
                Err(e) => {
                    log::error!("track {}: error reading timecode: {}", track.id, e);
                    continue;
                },
            };
            let frame_num = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
            match timecode::timecode_string(params, frame_num) {
                Some(tc) => {
                    log::debug!("track {}: timecode {}", track.id, tc);
                    metadata.set_str("timecode", tc);
                },
                None => log::error!("track {}: invalid timecode parameters {:?}", track.id, params),
            }
        }
    }

    // The last chapter of a chpl list ends with the movie.
    fn finish_chapters(&mut self) {
        let timescale = self.movie.timescale as i64;
        let duration = self.movie.duration.min(i64::MAX as u64) as i64;
        if let Some(last) = self.movie.chapters.last_mut() {
            if last.end.is_none() && timescale > 0 {
                last.end = Some(rescale(duration, 1_000_000, timescale));
            }
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.movie.tracks
    }

    pub fn track(&self, id: u32) -> Option<&Track> {
        self.movie.tracks.iter().find(|t| t.id == id)
    }

    /// Movie level metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.movie.metadata
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.movie.chapters
    }

    /// Movie time scale, from mvhd.
    pub fn timescale(&self) -> u32 {
        self.movie.timescale
    }

    /// Movie duration in movie time scale units.
    pub fn duration(&self) -> u64 {
        self.movie.duration
    }

    pub fn is_streamed(&self) -> bool {
        self.streamed
    }

    fn track_index(&self, id: u32) -> Result<usize> {
        self.movie
            .tracks
            .iter()
            .position(|t| t.id == id)
            .ok_or(Error::NoSuchTrack(id))
    }

    /// Payload of sample `n` (0-based) of a track.
    pub fn read_sample(&mut self, track_id: u32, n: usize) -> Result<Vec<u8>> {
        let idx = self.track_index(track_id)?;
        let sample = match self.movie.tracks[idx].samples().get(n) {
            Some(sample) => *sample,
            None => return Err(Error::NoSuchSample { track_id, sample: n }),
        };
        read_sample_data(&mut *self.source, &mut self.movie.externals, track_id, &sample)
    }

    // Track whose next sample is to be read next.
    fn next_track(&self) -> Option<usize> {
        let window = self.movie.options.interleave_window_us;
        let mut best: Option<(usize, i64, &SampleInfo)> = None;

        for (idx, track) in self.movie.tracks.iter().enumerate() {
            if track.discard {
                continue;
            }
            let sample = match track.samples().get(track.current) {
                Some(sample) => sample,
                None => continue,
            };
            let dts = rescale(sample.dts, 1_000_000, track.timescale.max(1) as i64);
            log::trace!("track {}, sample {}, dts {}", track.id, track.current, dts);

            let better = match best {
                None => true,
                Some((_, best_dts, best_sample)) => {
                    if self.streamed {
                        sample.pos < best_sample.pos
                    } else if sample.source == best_sample.source {
                        if (best_dts - dts).abs() <= window {
                            sample.pos < best_sample.pos
                        } else {
                            dts < best_dts
                        }
                    } else if dts != best_dts {
                        dts < best_dts
                    } else {
                        sample.source == DataRefHandle::Primary
                    }
                },
            };
            if better {
                best = Some((idx, dts, sample));
            }
        }
        best.map(|(idx, _, _)| idx)
    }

    // Parse on from where the header walk stopped, for the next fragments.
    fn resume(&mut self) -> Result<bool> {
        let pos = match self.movie.resume_at.take() {
            Some(pos) if self.streamed => pos,
            _ => return Ok(false),
        };
        if pos >= self.source.size() {
            return Ok(false);
        }
        log::debug!("reading fragments from offset {}", pos);
        let before: usize = self.movie.tracks.iter().map(|t| t.samples().len()).sum();
        self.source.seek(pos)?;
        self.movie.found_mdat = false;
        walker::read_boxes(&mut self.movie, None, &mut *self.source, 0)?;
        let after: usize = self.movie.tracks.iter().map(|t| t.samples().len()).sum();
        Ok(after > before || self.movie.resume_at.is_some())
    }

    /// Read the next packet. `None` at the end of the movie.
    pub fn read_packet(&mut self) -> Result<Option<Packet>> {
        let idx = loop {
            match self.next_track() {
                Some(idx) => break idx,
                None => {
                    if !self.resume()? {
                        return Ok(None);
                    }
                },
            }
        };

        let track = &mut self.movie.tracks[idx];
        let n = track.current;
        let sample = track.index[n];
        track.current += 1;

        let dts = sample.dts;
        let pts = match track.ctts_cursor.next(&track.ctts) {
            Some(offset) => dts + track.dts_shift + offset as i64,
            None => dts,
        };
        let next_dts = track.index.get(n + 1).map(|s| s.dts).unwrap_or(track.duration);
        let track_id = track.id;

        let data = read_sample_data(&mut *self.source, &mut self.movie.externals, track_id, &sample)?;
        Ok(Some(Packet {
            track_id,
            track_index: idx,
            dts,
            pts,
            duration: next_dts - dts,
            is_sync: sample.is_sync,
            pos: sample.pos,
            data,
        }))
    }

    /// Position `track_id` at the sample for `timestamp` (in the track's
    /// time scale), and every other track at the same point in time.
    ///
    /// Returns the sample number picked for `track_id`.
    pub fn seek(&mut self, track_id: u32, timestamp: i64, flags: SeekFlags) -> Result<usize> {
        let idx = self.track_index(track_id)?;
        let sample = seek_track(&mut self.movie.tracks[idx], timestamp, flags)?;
        let found = self.movie.tracks[idx].index[sample].dts;
        let timescale = self.movie.tracks[idx].timescale.max(1) as i64;

        for (i, other) in self.movie.tracks.iter_mut().enumerate() {
            if i == idx {
                continue;
            }
            let ts = rescale(found, other.timescale.max(1) as i64, timescale);
            if let Err(e) = seek_track(other, ts, flags) {
                log::debug!("track {}: {}", other.id, e);
            }
        }
        Ok(sample)
    }
}

// Sample to seek to in a sorted index. Without `any`, walks from the
// timestamp position to the nearest sync sample in the seek direction.
fn search_timestamp(index: &[SampleInfo], timestamp: i64, flags: SeekFlags) -> Option<usize> {
    let mut m = if flags.backward {
        index.partition_point(|s| s.dts <= timestamp).checked_sub(1)?
    } else {
        let m = index.partition_point(|s| s.dts < timestamp);
        if m >= index.len() {
            return None;
        }
        m
    };
    if !flags.any {
        while !index[m].is_sync {
            if flags.backward {
                m = m.checked_sub(1)?;
            } else {
                m += 1;
                if m >= index.len() {
                    return None;
                }
            }
        }
    }
    Some(m)
}

fn seek_track(track: &mut Track, timestamp: i64, flags: SeekFlags) -> Result<usize> {
    let index = track.samples();
    let sample = match search_timestamp(index, timestamp, flags) {
        Some(sample) => sample,
        None if !index.is_empty() && timestamp < index[0].dts => 0,
        None => {
            return Err(Error::SeekFailed {
                track_id: track.id,
                timestamp,
            })
        },
    };
    log::debug!("track {}: timestamp {}, sample {}", track.id, timestamp, sample);
    track.set_current(sample);
    Ok(sample)
}

// Read the payload of a sample from the file it lives in.
fn read_sample_data(
    primary: &mut dyn ReadBytes,
    externals: &mut [Box<dyn ReadBytes>],
    track_id: u32,
    sample: &SampleInfo,
) -> Result<Vec<u8>> {
    let stream: &mut dyn ReadBytes = match sample.source {
        DataRefHandle::Primary => primary,
        DataRefHandle::External(idx) if idx < externals.len() => &mut *externals[idx],
        _ => {
            return Err(Error::UnresolvedDataRef {
                track_id,
                pos: sample.pos,
            })
        },
    };
    read_at(stream, sample.pos, sample.size as u64).map_err(|e| {
        log::error!("track {}, offset {}: partial file", track_id, sample.pos);
        Error::Io(e)
    })
}

/// How likely it is that `buf`, the start of a file, is a QuickTime or
/// ISO media file. 0 to 100.
pub fn probe(buf: &[u8]) -> u32 {
    let mut score = 0;
    let mut offset = 0usize;
    while offset + 8 <= buf.len() {
        let tag = [buf[offset + 4], buf[offset + 5], buf[offset + 6], buf[offset + 7]];
        match &tag {
            b"jP  " | b"moov" | b"mdat" | b"pnot" | b"udta" | b"ftyp" => return 100,
            b"ediw" | b"wide" | b"free" | b"junk" | b"pict" => return 95,
            b"skip" | b"uuid" | b"prfl" | &[0x82, 0x82, 0x7f, 0x7d] => {
                let size = u32::from_be_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]]);
                if size < 8 {
                    return score;
                }
                offset += size as usize;
                score = 50;
            },
            _ => return score,
        }
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(dts: i64, is_sync: bool) -> SampleInfo {
        SampleInfo {
            dts,
            is_sync,
            ..SampleInfo::default()
        }
    }

    #[test]
    fn probe_scores() {
        assert_eq!(probe(b"\x00\x00\x00\x18ftypisom"), 100);
        assert_eq!(probe(b"\x00\x00\x00\x08free"), 95);
        assert_eq!(probe(b"\x00\x00\x00\x08skip\x00\x00\x00\x08moov"), 100);
        assert_eq!(probe(b"\x00\x00\x00\x08skip\x00\x00"), 50);
        assert_eq!(probe(b"\x00\x00\x00\x08RIFF"), 0);
        assert_eq!(probe(b"\x00\x00\x00\x00skip\x00\x00\x00\x08moov"), 0);
    }

    #[test]
    fn timestamp_search() {
        let index = vec![
            sample(0, true),
            sample(10, false),
            sample(20, false),
            sample(30, true),
            sample(40, false),
        ];
        let back = SeekFlags { backward: true, any: false };
        let fwd = SeekFlags::default();
        let any = SeekFlags { backward: true, any: true };
        assert_eq!(search_timestamp(&index, 25, back), Some(0));
        assert_eq!(search_timestamp(&index, 25, fwd), Some(3));
        assert_eq!(search_timestamp(&index, 25, any), Some(2));
        assert_eq!(search_timestamp(&index, 30, back), Some(3));
        assert_eq!(search_timestamp(&index, 35, fwd), None);
        assert_eq!(search_timestamp(&index, -5, back), None);
    }

    #[test]
    fn seek_before_first_sample_clamps() {
        let mut track = Track {
            id: 1,
            timescale: 10,
            ..Track::default()
        };
        track.index = vec![sample(5, true), sample(10, true)];
        let back = SeekFlags { backward: true, any: false };
        assert_eq!(seek_track(&mut track, 0, back).unwrap(), 0);
        assert_eq!(seek_track(&mut track, 12, back).unwrap(), 1);
        assert_eq!(track.current, 1);
        assert!(matches!(
            seek_track(&mut track, 20, SeekFlags::default()),
            Err(Error::SeekFailed { track_id: 1, timestamp: 20 })
        ));
    }
}
