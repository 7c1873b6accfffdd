//! Per-track state: the table accumulator used while walking a `trak`,
//! and the finished track with its sample index.
use serde::Serialize;

use crate::boxes::ctts::{CompositionCursor, CompositionOffsetEntry};
use crate::boxes::dref::DataReference;
use crate::boxes::elst::EditListEntry;
use crate::boxes::stsc::SampleToChunkEntry;
use crate::boxes::stsd::{AudioParams, SampleDescription, TimecodeParams};
use crate::boxes::stts::TimeToSampleEntry;
use crate::error::{Error, Result};
use crate::index;
use crate::metadata::Metadata;
use crate::sample_info::{DataRefHandle, SampleInfo};
use crate::types::*;

/// Raw tables of one track, filled in by the box handlers while the
/// walker is inside its `trak` box.
#[derive(Debug, Default)]
pub(crate) struct TrackContext {
    pub track_id:       u32,
    pub media_type:     MediaType,
    pub timescale:      u32,
    /// From mdhd, in `timescale` units.
    pub duration:       u64,
    pub language:       Option<String>,
    pub display_width:  u32,
    pub display_height: u32,
    pub chunk_offsets:  Vec<u64>,
    pub stts:           Vec<TimeToSampleEntry>,
    pub ctts:           Vec<CompositionOffsetEntry>,
    pub stsc:           Vec<SampleToChunkEntry>,
    /// Constant sample size, or 0.
    pub sample_size:    u32,
    pub sample_sizes:   Vec<u32>,
    pub sample_count:   u32,
    pub sync_samples:   Vec<u32>,
    pub partial_sync:   Vec<u32>,
    pub edits:          Vec<EditListEntry>,
    /// `None` if there was no dref box at all.
    pub drefs:          Option<Vec<DataReference>>,
    /// Data reference index (1-based) of each sample description.
    pub dref_ids:       Vec<u32>,
    pub description:    Option<SampleDescription>,
    pub dts_shift:      i64,
    pub metadata:       Metadata,
}

impl TrackContext {
    /// `index` is the position in the track table, used as id if the
    /// track has no (or a zero) track id in its header.
    pub fn new(index: usize) -> TrackContext {
        TrackContext {
            track_id: index as u32 + 1,
            ..TrackContext::default()
        }
    }
}

/// One track of the movie, with its sample index.
#[derive(Debug, Default, Serialize)]
pub struct Track {
    pub id:             u32,
    pub media_type:     MediaType,
    /// Sample description format.
    pub codec:          FourCC,
    pub timescale:      u32,
    /// In `timescale` units. Grows with every movie fragment.
    pub duration:       i64,
    pub nb_frames:      u64,
    pub language:       Option<String>,
    pub width:          u32,
    pub height:         u32,
    pub audio:          Option<AudioParams>,
    pub timecode:       Option<TimecodeParams>,
    /// Average bitrate in bits per second.
    pub bitrate:        Option<u64>,
    pub avg_frame_rate: Option<(u64, u64)>,
    pub r_frame_rate:   Option<(u64, u64)>,
    /// Samples per packet, for audio with a constant frame duration.
    pub frame_size:     Option<u32>,
    pub metadata:       Metadata,
    /// Not played back (a chapter track, for example).
    pub discard:        bool,

    #[serde(skip)]
    pub(crate) index:       Vec<SampleInfo>,
    #[serde(skip)]
    pub(crate) ctts:        Vec<CompositionOffsetEntry>,
    #[serde(skip)]
    pub(crate) dts_shift:   i64,
    /// Data source of each sample description.
    #[serde(skip)]
    pub(crate) sources:     Vec<DataRefHandle>,
    /// Next sample to be read.
    #[serde(skip)]
    pub(crate) current:     usize,
    #[serde(skip)]
    pub(crate) ctts_cursor: CompositionCursor,
    /// Chunks so far; every fragment run counts as one.
    #[serde(skip)]
    pub(crate) chunk_count: u32,
}

impl Track {
    /// Run the index builder over the tables and fill in the derived values.
    ///
    /// The raw tables are consumed; only the composition offsets, the
    /// dts shift and the data sources are kept, for playback and fragments.
    pub(crate) fn build(mut ctx: TrackContext, movie_timescale: u32, sources: Vec<DataRefHandle>) -> Result<Track> {
        if ctx.timescale == 0 {
            let ts = if movie_timescale > 0 { movie_timescale } else { 1 };
            log::warn!("track {}: invalid media time scale 0, using {}", ctx.track_id, ts);
            ctx.timescale = ts;
        }

        let mut nb_frames = 0u64;
        let mut stts_duration = 0u64;
        for e in &ctx.stts {
            nb_frames += e.count as u64;
            stts_duration = (e.count as u64)
                .checked_mul(e.delta as u64)
                .and_then(|d| stts_duration.checked_add(d))
                .ok_or_else(|| Error::inconsistent(ctx.track_id, "stts duration overflows"))?;
        }

        let built = index::build_index(&mut ctx, movie_timescale, &sources)?;
        let desc = ctx.description.take().unwrap_or_default();

        let duration = if stts_duration > 0 { stts_duration } else { ctx.duration };
        let duration = duration.min(i64::MAX as u64) as i64;
        let timescale = ctx.timescale;

        let (width, height) = if desc.width > 0 && desc.height > 0 {
            (desc.width as u32, desc.height as u32)
        } else {
            (ctx.display_width, ctx.display_height)
        };

        let mut track = Track {
            id: ctx.track_id,
            media_type: ctx.media_type,
            codec: desc.format,
            timescale,
            duration,
            nb_frames,
            language: ctx.language.take(),
            width,
            height,
            audio: desc.audio,
            timecode: desc.timecode,
            metadata: std::mem::take(&mut ctx.metadata),
            index: built.entries,
            ctts: std::mem::take(&mut ctx.ctts),
            dts_shift: ctx.dts_shift,
            sources,
            chunk_count: ctx.chunk_offsets.len() as u32,
            ..Track::default()
        };

        if duration > 0 {
            track.bitrate = Some((built.bytes as u128 * 8 * timescale as u128 / duration as u128) as u64);
        }
        if track.media_type == MediaType::Video {
            if duration > 0 {
                track.avg_frame_rate = (timescale as u64)
                    .checked_mul(nb_frames)
                    .and_then(|n| reduce(n, duration as u64));
            }
            let stts = &ctx.stts;
            if stts.len() == 1 || (stts.len() == 2 && stts[1].count == 1) {
                track.r_frame_rate = reduce(timescale as u64, stts[0].delta as u64);
            }
        }
        if track.media_type == MediaType::Audio && ctx.stts.len() == 1 && ctx.stts[0].delta > 1 {
            track.frame_size = Some(ctx.stts[0].delta);
        }

        log::debug!(
            "track {}: {} samples, duration {}, bitrate {:?}",
            track.id,
            track.index.len(),
            track.duration,
            track.bitrate
        );
        Ok(track)
    }

    /// The sample index.
    pub fn samples(&self) -> &[SampleInfo] {
        &self.index
    }

    /// Data source for sample description `sdi` (1-based).
    pub(crate) fn source_for(&self, sdi: u32) -> DataRefHandle {
        source_for(&self.sources, sdi)
    }

    /// Position the playback cursor at sample `sample`.
    pub(crate) fn set_current(&mut self, sample: usize) {
        self.current = sample;
        self.ctts_cursor = CompositionCursor::seek(&self.ctts, sample);
    }
}

/// An index out of range (a broken stsc) falls back to the first description.
pub(crate) fn source_for(sources: &[DataRefHandle], sdi: u32) -> DataRefHandle {
    let idx = sdi.saturating_sub(1) as usize;
    sources
        .get(idx)
        .or_else(|| sources.first())
        .copied()
        .unwrap_or_default()
}
