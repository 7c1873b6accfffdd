//! Sample index builder.
//!
//! Turns the raw sample tables of a track (chunk offsets, sample to chunk,
//! sizes, decode times, sync samples, edit list) into one flat list of
//! samples in decode order.
use crate::boxes::stsc::{total_samples, ChunkGroups};
use crate::boxes::stss::SampleNumbers;
use crate::boxes::stts::TimeToSampleIterator;
use crate::error::{Error, Result};
use crate::sample_info::SampleInfo;
use crate::track::{source_for, TrackContext};
use crate::types::*;

// Upper bound on the samples in one logical frame of chunked audio.
const AUDIO_FRAME_SAMPLES: u32 = 1920;

/// Output of the index builder.
#[derive(Debug, Default)]
pub(crate) struct BuiltIndex {
    pub entries: Vec<SampleInfo>,
    /// Sum of all sample sizes.
    pub bytes:   u64,
}

/// Decode time origin and presentation offset implied by the edit list.
///
/// An empty edit at the start moves the origin back by its duration. The
/// first non-empty edit gives the media time presentation starts at.
fn edit_offsets(ctx: &TrackContext, movie_timescale: u32) -> (i64, i64) {
    let mut origin = 0;
    let mut time_offset = None;

    if ctx.edits.len() > 2 {
        log::warn!(
            "track {}: {} edit list entries, only the leading empty edit and the first media edit are used",
            ctx.track_id,
            ctx.edits.len()
        );
    }
    for (i, edit) in ctx.edits.iter().enumerate() {
        if edit.is_empty_edit() {
            if i > 0 {
                log::warn!("track {}: empty edit after the first entry, ignored", ctx.track_id);
                break;
            }
            let duration = edit.segment_duration.min(i64::MAX as u64) as i64;
            origin -= rescale(duration, ctx.timescale as i64, movie_timescale as i64);
        } else if time_offset.is_none() {
            time_offset = Some(edit.media_time);
        }
    }
    (origin, time_offset.unwrap_or(0))
}

/// Check that the tables describe the same samples.
///
/// Returns the number of samples, or `None` if the track simply has no
/// samples.
fn sample_total(ctx: &TrackContext) -> Result<Option<u64>> {
    let chunks = ctx.chunk_offsets.len();
    let id = ctx.track_id;
    let count = ctx.sample_count as u64;

    if chunks == 0 {
        if count > 0 {
            return Err(Error::inconsistent(id, format!("{} samples but no chunks", count)));
        }
        return Ok(None);
    }
    if ctx.stts.is_empty() || ctx.stsc.is_empty() {
        if count > 0 {
            return Err(Error::inconsistent(id, "chunks and samples but no stts or stsc"));
        }
        return Ok(None);
    }
    if ctx.sample_size == 0 && count == 0 {
        return Err(Error::inconsistent(id, "chunks but no sample sizes"));
    }

    let derived = total_samples(&ctx.stsc, chunks);
    if count > 0 && derived != count {
        return Err(Error::inconsistent(
            id,
            format!("stsc describes {} samples, stsz {}", derived, count),
        ));
    }
    let timed: u64 = ctx.stts.iter().map(|e| e.count as u64).sum();
    if timed != derived {
        log::warn!("track {}: stts has {} samples, stsc {}", id, timed, derived);
    }
    Ok(Some(derived))
}

/// Build the sample index of a track.
///
/// `sources` is the data source of each sample description.
pub(crate) fn build_index(
    ctx: &mut TrackContext,
    movie_timescale: u32,
    sources: &[crate::sample_info::DataRefHandle],
) -> Result<BuiltIndex> {
    let total = match sample_total(ctx)? {
        Some(total) => total,
        None => return Ok(BuiltIndex::default()),
    };

    let (origin, mut time_offset) = edit_offsets(ctx, movie_timescale);

    // A single long first sample absorbs the offset, no need for a gap.
    if ctx.media_type != MediaType::Audio && time_offset > 0 {
        if let Some(first) = ctx.stts.first_mut() {
            if first.count == 1 && first.delta as i64 > time_offset {
                first.delta -= time_offset as u32;
                time_offset = 0;
            }
        }
    }
    let dts0 = origin - time_offset;
    log::debug!(
        "track {}: origin {} time offset {} dts shift {}",
        ctx.track_id,
        origin,
        time_offset,
        ctx.dts_shift
    );

    let chunked_audio = ctx.media_type == MediaType::Audio && ctx.stts.len() == 1 && ctx.stts[0].delta == 1;
    // Chunked audio has no composition offsets, so no shift.
    if chunked_audio {
        build_chunked_audio(ctx, dts0, sources)
    } else {
        build_samples(ctx, dts0 - ctx.dts_shift, total, sources)
    }
}

// One entry per sample.
fn build_samples(
    ctx: &TrackContext,
    dts0: i64,
    total: u64,
    sources: &[crate::sample_info::DataRefHandle],
) -> Result<BuiltIndex> {
    if ctx.sample_size == 0 && (ctx.sample_sizes.len() as u64) < total {
        return Err(Error::inconsistent(
            ctx.track_id,
            format!("{} sample sizes for {} samples", ctx.sample_sizes.len(), total),
        ));
    }
    let mut entries = Vec::with_capacity(std::cmp::min(total, 1 << 20) as usize);
    let mut bytes = 0u64;
    let mut groups = ChunkGroups::new(&ctx.stsc);
    let mut sync = SampleNumbers::new(&ctx.sync_samples);
    let mut partial = SampleNumbers::new(&ctx.partial_sync);
    let mut times = TimeToSampleIterator::new(&ctx.stts).start_at(dts0);
    let all_sync = ctx.sync_samples.is_empty();
    let mut sample = 0usize;
    let mut distance = 0u32;

    for (chunk, &offset) in ctx.chunk_offsets.iter().enumerate() {
        let group = match groups.group(chunk as u32 + 1) {
            Some(group) => group,
            None => break,
        };
        let source = source_for(sources, group.sample_description_index);
        let mut pos = offset;

        for _ in 0..group.samples_per_chunk {
            let size = if ctx.sample_size > 0 {
                ctx.sample_size
            } else {
                ctx.sample_sizes[sample]
            };
            let number = sample as u32 + 1;
            // stss first; stps only if stss did not mark it.
            let is_sync = all_sync || sync.contains(number) || partial.contains(number);
            if is_sync {
                distance = 0;
            }
            let dts = match times.next() {
                Some((_, dts)) => dts,
                None => break,
            };
            entries.push(SampleInfo {
                pos,
                dts,
                size,
                distance,
                is_sync,
                chunk: chunk as u32,
                source,
            });
            distance += 1;
            pos += size as u64;
            bytes += size as u64;
            sample += 1;
        }
    }

    Ok(BuiltIndex { entries, bytes })
}

// Uncompressed (or constant frame size) audio: one entry for a group
// of samples instead of one per sample.
fn build_chunked_audio(
    ctx: &TrackContext,
    dts0: i64,
    sources: &[crate::sample_info::DataRefHandle],
) -> Result<BuiltIndex> {
    let (spf, bpf) = match ctx.description.as_ref().and_then(|d| d.audio.as_ref()) {
        Some(audio) => (audio.samples_per_frame, audio.bytes_per_frame),
        None => (0, 0),
    };
    let mut entries = Vec::new();
    let mut bytes = 0u64;
    let mut groups = ChunkGroups::new(&ctx.stsc);
    let mut dts = dts0;

    for (chunk, &offset) in ctx.chunk_offsets.iter().enumerate() {
        let group = match groups.group(chunk as u32 + 1) {
            Some(group) => group,
            None => break,
        };
        let source = source_for(sources, group.sample_description_index);
        let mut left = group.samples_per_chunk;
        if spf > 1 && left % spf != 0 {
            return Err(Error::inconsistent(
                ctx.track_id,
                format!("chunk {} has {} samples, not a multiple of {}", chunk + 1, left, spf),
            ));
        }
        let mut pos = offset;

        while left > 0 {
            let (samples, size) = if spf >= 160 {
                // gsm
                (spf, bpf)
            } else if spf > 1 {
                let samples = std::cmp::min(AUDIO_FRAME_SAMPLES / spf * spf, left);
                (samples, samples / spf * bpf)
            } else {
                let samples = std::cmp::min(AUDIO_FRAME_SAMPLES, left);
                (samples, samples * ctx.sample_size)
            };
            entries.push(SampleInfo {
                pos,
                dts,
                size,
                distance: 0,
                is_sync: true,
                chunk: chunk as u32,
                source,
            });
            pos += size as u64;
            bytes += size as u64;
            dts += samples as i64;
            left -= samples;
        }
    }

    Ok(BuiltIndex { entries, bytes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxes::elst::EditListEntry;
    use crate::boxes::stsc::SampleToChunkEntry;
    use crate::boxes::stsd::{AudioParams, SampleDescription};
    use crate::boxes::stts::TimeToSampleEntry;
    use crate::sample_info::DataRefHandle;
    use assert_matches::assert_matches;

    fn stsc(first_chunk: u32, samples_per_chunk: u32) -> SampleToChunkEntry {
        SampleToChunkEntry { first_chunk, samples_per_chunk, sample_description_index: 1 }
    }

    fn stts(count: u32, delta: u32) -> TimeToSampleEntry {
        TimeToSampleEntry { count, delta }
    }

    fn base() -> TrackContext {
        TrackContext {
            track_id: 1,
            media_type: MediaType::Video,
            timescale: 1000,
            chunk_offsets: vec![1000, 2000],
            stsc: vec![stsc(1, 3)],
            sample_size: 188,
            sample_count: 6,
            stts: vec![stts(6, 10)],
            ..TrackContext::default()
        }
    }

    fn build(ctx: &mut TrackContext) -> Result<BuiltIndex> {
        build_index(ctx, 1000, &[DataRefHandle::Primary])
    }

    #[test]
    fn two_chunks_constant_size() {
        let idx = build(&mut base()).unwrap();
        let pos: Vec<_> = idx.entries.iter().map(|e| e.pos).collect();
        let dts: Vec<_> = idx.entries.iter().map(|e| e.dts).collect();
        assert_eq!(pos, vec![1000, 1188, 1376, 2000, 2188, 2376]);
        assert_eq!(dts, vec![0, 10, 20, 30, 40, 50]);
        assert!(idx.entries.iter().all(|e| e.is_sync && e.distance == 0));
        assert_eq!(idx.bytes, 6 * 188);
    }

    #[test]
    fn sync_samples_and_distance() {
        let mut ctx = base();
        ctx.sync_samples = vec![1, 4];
        let idx = build(&mut ctx).unwrap();
        let sync: Vec<_> = idx.entries.iter().map(|e| e.is_sync).collect();
        let dist: Vec<_> = idx.entries.iter().map(|e| e.distance).collect();
        assert_eq!(sync, vec![true, false, false, true, false, false]);
        assert_eq!(dist, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn partial_sync_only_when_stss_misses() {
        let mut ctx = base();
        ctx.sync_samples = vec![1];
        ctx.partial_sync = vec![1, 3];
        let idx = build(&mut ctx).unwrap();
        let sync: Vec<_> = idx.entries.iter().map(|e| e.is_sync).collect();
        assert_eq!(sync, vec![true, false, true, false, false, false]);
    }

    #[test]
    fn constant_runs_give_multiples() {
        let mut ctx = base();
        ctx.chunk_offsets = vec![0];
        ctx.stsc = vec![stsc(1, 50)];
        ctx.sample_count = 50;
        ctx.stts = vec![stts(50, 1001)];
        let idx = build(&mut ctx).unwrap();
        assert_eq!(idx.entries.len(), 50);
        assert!(idx.entries.iter().enumerate().all(|(i, e)| e.dts == i as i64 * 1001));
    }

    #[test]
    fn empty_edit_shifts_back() {
        let mut ctx = base();
        ctx.edits = vec![
            EditListEntry { segment_duration: 500, media_time: -1, media_rate: 0x10000 },
            EditListEntry { segment_duration: 60, media_time: 0, media_rate: 0x10000 },
        ];
        let idx = build(&mut ctx).unwrap();
        assert_eq!(idx.entries[0].dts, -500);
        assert_eq!(idx.entries[5].dts, -450);
    }

    #[test]
    fn long_edit_list_keeps_leading_edits() {
        let mut ctx = base();
        ctx.edits = vec![
            EditListEntry { segment_duration: 500, media_time: -1, media_rate: 0x10000 },
            EditListEntry { segment_duration: 30, media_time: 50, media_rate: 0x10000 },
            EditListEntry { segment_duration: 30, media_time: 0, media_rate: 0x10000 },
        ];
        let idx = build(&mut ctx).unwrap();
        assert_eq!(idx.entries[0].dts, -550);
        assert_eq!(idx.entries[1].dts, -540);
    }

    #[test]
    fn media_time_offset() {
        let mut ctx = base();
        ctx.edits = vec![EditListEntry { segment_duration: 60, media_time: 20, media_rate: 0x10000 }];
        let idx = build(&mut ctx).unwrap();
        assert_eq!(idx.entries[0].dts, -20);

        // One long first sample takes the offset.
        let mut ctx = base();
        ctx.stts = vec![stts(1, 50), stts(5, 10)];
        ctx.edits = vec![EditListEntry { segment_duration: 60, media_time: 20, media_rate: 0x10000 }];
        let idx = build(&mut ctx).unwrap();
        assert_eq!(idx.entries[0].dts, 0);
        assert_eq!(idx.entries[1].dts, 30);
        assert_eq!(ctx.stts[0].delta, 30);
    }

    #[test]
    fn dts_shift_lowers_origin() {
        let mut ctx = base();
        ctx.dts_shift = 10;
        let idx = build(&mut ctx).unwrap();
        assert_eq!(idx.entries[0].dts, -10);
    }

    #[test]
    fn chunk_groups_round_trip() {
        let mut ctx = base();
        ctx.chunk_offsets = vec![0, 100, 200, 300];
        ctx.stsc = vec![stsc(1, 2), stsc(3, 1)];
        ctx.sample_count = 6;
        let idx = build(&mut ctx).unwrap();
        let mut per_chunk = vec![0; 4];
        for e in &idx.entries {
            per_chunk[e.chunk as usize] += 1;
        }
        assert_eq!(per_chunk, vec![2, 2, 1, 1]);
    }

    #[test]
    fn inconsistent_counts() {
        let mut ctx = base();
        ctx.sample_count = 7;
        assert_matches!(build(&mut ctx), Err(Error::InconsistentTrackTables { track_id: 1, .. }));

        let mut ctx = base();
        ctx.stts.clear();
        assert_matches!(build(&mut ctx), Err(Error::InconsistentTrackTables { .. }));

        let mut ctx = base();
        ctx.stts.clear();
        ctx.sample_count = 0;
        assert_eq!(build(&mut ctx).unwrap().entries.len(), 0);
    }

    #[test]
    fn per_sample_sizes() {
        let mut ctx = base();
        ctx.sample_size = 0;
        ctx.sample_sizes = vec![10, 20, 30, 40, 50, 60];
        let idx = build(&mut ctx).unwrap();
        let pos: Vec<_> = idx.entries.iter().map(|e| e.pos).collect();
        assert_eq!(pos, vec![1000, 1010, 1030, 2000, 2040, 2090]);
    }

    #[test]
    fn chunked_pcm_audio() {
        let mut ctx = base();
        ctx.media_type = MediaType::Audio;
        ctx.chunk_offsets = vec![0, 10000];
        ctx.stsc = vec![stsc(1, 2000)];
        ctx.sample_count = 4000;
        ctx.stts = vec![stts(4000, 1)];
        ctx.sample_size = 4;
        let idx = build(&mut ctx).unwrap();
        let v: Vec<_> = idx.entries.iter().map(|e| (e.pos, e.dts, e.size)).collect();
        assert_eq!(
            v,
            vec![(0, 0, 7680), (7680, 1920, 320), (10000, 2000, 7680), (17680, 3920, 320)]
        );
        assert!(idx.entries.iter().all(|e| e.is_sync));
    }

    #[test]
    fn chunked_audio_ignores_dts_shift() {
        let mut ctx = base();
        ctx.media_type = MediaType::Audio;
        ctx.chunk_offsets = vec![0];
        ctx.stsc = vec![stsc(1, 100)];
        ctx.sample_count = 100;
        ctx.stts = vec![stts(100, 1)];
        ctx.sample_size = 2;
        ctx.dts_shift = 10;
        let idx = build(&mut ctx).unwrap();
        assert_eq!(idx.entries.len(), 1);
        assert_eq!(idx.entries[0].dts, 0);
    }

    #[test]
    fn chunked_framed_audio() {
        let mut ctx = base();
        ctx.media_type = MediaType::Audio;
        ctx.chunk_offsets = vec![0];
        ctx.stsc = vec![stsc(1, 128)];
        ctx.sample_count = 128;
        ctx.stts = vec![stts(128, 1)];
        ctx.sample_size = 0;
        ctx.sample_sizes = vec![];
        ctx.description = Some(SampleDescription {
            audio: Some(AudioParams {
                channels: 1,
                samples_per_frame: 64,
                bytes_per_frame: 34,
                ..AudioParams::default()
            }),
            ..SampleDescription::default()
        });
        let idx = build(&mut ctx).unwrap();
        assert_eq!(idx.entries.len(), 1);
        assert_eq!((idx.entries[0].size, idx.bytes), (68, 68));

        ctx.stsc = vec![stsc(1, 100)];
        ctx.sample_count = 100;
        assert_matches!(build(&mut ctx), Err(Error::InconsistentTrackTables { .. }));
    }
}
