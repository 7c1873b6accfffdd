//! Movie fragments.
//!
//! A `moof` box records its offset, `tfhd` sets up the defaults for one
//! track fragment, and every `trun` appends its samples to the index of
//! the track that already exists. Nothing is rebuilt.
use crate::boxes::ctts::CompositionOffsetEntry;
use crate::boxes::tfhd::TrackFragmentHeaderBox;
use crate::boxes::trex::TrackExtendsBox;
use crate::boxes::trun::TrackRunBox;
use crate::error::{Error, Result};
use crate::sample_info::SampleInfo;
use crate::track::Track;
use crate::types::MediaType;

// sample_depends_on == 2: this sample does not depend on others.
const SAMPLE_DEPENDS_ON_NONE: u32 = 0x0200_0000;

/// State of the track fragment being parsed.
#[derive(Debug, Default, Clone)]
pub(crate) struct FragmentContext {
    /// Start of the current `moof`, then the end of the last run's data.
    pub moof_offset:      u64,
    /// `None` when there is no valid track fragment header.
    pub track_id:         Option<u32>,
    pub base_data_offset: u64,
    pub stsd_id:          u32,
    pub duration:         u32,
    pub size:             u32,
    pub flags:            u32,
}

/// Set up the fragment defaults from a `tfhd`, falling back to the `trex`
/// of the track.
pub(crate) fn start_track_fragment(
    frag: &mut FragmentContext,
    trex: &[TrackExtendsBox],
    tfhd: &TrackFragmentHeaderBox,
) -> Result<()> {
    frag.track_id = None;
    if tfhd.track_id == 0 {
        return Err(Error::CorruptExtendedHeader("tfhd: track id 0".to_string()));
    }
    let trex = match trex.iter().find(|t| t.track_id == tfhd.track_id) {
        Some(trex) => trex,
        None => {
            return Err(Error::CorruptExtendedHeader(format!(
                "tfhd: no trex for track {}",
                tfhd.track_id
            )))
        },
    };
    frag.track_id = Some(tfhd.track_id);
    frag.base_data_offset = tfhd.base_data_offset.unwrap_or(frag.moof_offset);
    frag.stsd_id = tfhd
        .sample_description_index
        .unwrap_or(trex.default_sample_description_index);
    frag.duration = tfhd.default_sample_duration.unwrap_or(trex.default_sample_duration);
    frag.size = tfhd.default_sample_size.unwrap_or(trex.default_sample_size);
    frag.flags = tfhd.default_sample_flags.unwrap_or(trex.default_sample_flags);
    Ok(())
}

fn push_ctts(ctts: &mut Vec<CompositionOffsetEntry>, count: u32, offset: i32) {
    if count == 0 {
        return;
    }
    match ctts.last_mut() {
        Some(last) if last.offset == offset => last.count += count,
        _ => ctts.push(CompositionOffsetEntry { count, offset }),
    }
}

/// Append the samples of a `trun` to the index of `track`.
pub(crate) fn append_run(track: &mut Track, frag: &mut FragmentContext, trun: &TrackRunBox) {
    let stsd_count = std::cmp::max(track.sources.len(), 1) as u32;
    if frag.stsd_id == 0 || frag.stsd_id > stsd_count {
        log::debug!("track {}: trun for sample description {}, skipping", track.id, frag.stsd_id);
        return;
    }
    let count = trun.entries.len();
    if count == 0 {
        return;
    }

    // Keep the composition offsets in step with the index, in both directions.
    let has_cts = trun.has_composition_offsets();
    if has_cts {
        let covered: u64 = track.ctts.iter().map(|e| e.count as u64).sum();
        let missing = (track.index.len() as u64).saturating_sub(covered);
        push_ctts(&mut track.ctts, missing as u32, 0);
    }

    let source = track.source_for(frag.stsd_id);
    let audio = track.media_type == MediaType::Audio;
    let chunk = track.chunk_count;
    let mut dts = track.duration;
    let base = frag.base_data_offset as i64 + trun.data_offset.unwrap_or(0) as i64;
    let mut offset = base.max(0) as u64;
    let mut distance = 0;

    track.index.reserve(count);
    for (i, entry) in trun.entries.iter().enumerate() {
        let size = entry.sample_size.unwrap_or(frag.size);
        let duration = entry.sample_duration.unwrap_or(frag.duration);
        let first_flags = if i == 0 { trun.first_sample_flags } else { None };
        let flags = entry.sample_flags.or(first_flags).unwrap_or(frag.flags);
        if let Some(cto) = entry.sample_composition_time_offset {
            push_ctts(&mut track.ctts, 1, cto);
        }

        let is_sync = audio || (first_flags.is_some() && flags == 0) || flags & SAMPLE_DEPENDS_ON_NONE != 0;
        if is_sync {
            distance = 0;
        }
        track.index.push(SampleInfo {
            pos: offset,
            dts,
            size,
            distance,
            is_sync,
            chunk,
            source,
        });
        distance += 1;
        dts += duration as i64;
        offset += size as u64;
    }
    if !has_cts && !track.ctts.is_empty() {
        push_ctts(&mut track.ctts, count as u32, 0);
    }

    frag.moof_offset = offset;
    track.duration = dts;
    track.nb_frames += count as u64;
    track.chunk_count += 1;
}
