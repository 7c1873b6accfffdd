//
// ISO/IEC 14496-12:2015(E)
// 8.8.8 Track Fragment Run Box
//

use crate::boxes::prelude::*;
use crate::boxes::tfhd::b_then;
use crate::fragment;

//  aligned(8) class TrackRunBox
//  extends FullBox(‘trun’, version, tr_flags) {
//      unsigned int(32) sample_count;
//      // the following are optional fields
//      signed int(32) data_offset;
//      unsigned int(32) first_sample_flags;
//      // all fields in the following array are optional
//      {
//          unsigned int(32) sample_duration;
//          unsigned int(32) sample_size;
//          unsigned int(32) sample_flags
//          if (version == 0)
//              { unsigned int(32) sample_composition_time_offset; }
//          else
//              { signed int(32) sample_composition_time_offset; }
//      }[ sample_count ]
//  }

// Runs without per-sample fields take no space in the box, so the
// entry count cannot be checked against the box size.
const MAX_IMPLICIT_ENTRIES: u64 = 1 << 20;

/// 8.8.8 Track Fragment Run Box (ISO/IEC 14496-12:2015(E))
#[derive(Debug, Default)]
pub struct TrackRunBox {
    pub flags:              u32,
    pub data_offset:        Option<i32>,
    pub first_sample_flags: Option<u32>,
    pub entries:            Vec<TrackRunEntry>,
}

/// 8.8.8 Track Fragment Run Sample Entry (ISO/IEC 14496-12:2015(E))
#[derive(Debug, Default, Clone, Copy)]
pub struct TrackRunEntry {
    pub sample_duration:                Option<u32>,
    pub sample_size:                    Option<u32>,
    pub sample_flags:                   Option<u32>,
    pub sample_composition_time_offset: Option<i32>,
}

impl TrackRunBox {
    pub fn has_composition_offsets(&self) -> bool {
        self.flags & 0x0800 > 0
    }
}

impl FromBox for TrackRunBox {
    fn from_box(stream: &mut BoxReader<'_>) -> Result<TrackRunBox> {
        stream.read_full()?;
        let flags = stream.flags();

        let sample_count = u32::from_bytes(stream)?;
        let data_offset = b_then((flags & 0x01) > 0, || i32::from_bytes(stream)).transpose()?;
        let first_sample_flags = b_then((flags & 0x04) > 0, || u32::from_bytes(stream)).transpose()?;

        let do_sample_dur = (flags & 0x0100) > 0;
        let do_sample_size = (flags & 0x0200) > 0;
        let do_sample_flags = (flags & 0x0400) > 0;
        let do_sample_comp = (flags & 0x0800) > 0;

        let entry_size = 4 * (do_sample_dur as u64 + do_sample_size as u64 + do_sample_flags as u64 + do_sample_comp as u64);
        let count = if entry_size == 0 {
            if sample_count as u64 > MAX_IMPLICIT_ENTRIES {
                return Err(Error::Allocation {
                    fourcc: stream.fourcc(),
                    count: sample_count as u64,
                    entry_size,
                    available: stream.left(),
                });
            }
            sample_count as usize
        } else {
            check_entries(stream, sample_count as u64, entry_size)?
        };

        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let sample_duration = b_then(do_sample_dur, || u32::from_bytes(stream)).transpose()?;
            let sample_size = b_then(do_sample_size, || u32::from_bytes(stream)).transpose()?;
            let sample_flags = b_then(do_sample_flags, || u32::from_bytes(stream)).transpose()?;
            let sample_composition_time_offset = if do_sample_comp {
                if stream.version() == 0 {
                    Some(std::cmp::min(u32::from_bytes(stream)?, 0x7fffffff) as i32)
                } else {
                    Some(i32::from_bytes(stream)?)
                }
            } else {
                None
            };
            entries.push(TrackRunEntry {
                sample_duration,
                sample_size,
                sample_flags,
                sample_composition_time_offset,
            });
        }

        Ok(TrackRunBox {
            flags,
            data_offset,
            first_sample_flags,
            entries,
        })
    }
}

pub(crate) fn read_trun(movie: &mut MovieContext, _track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    let track_id = match movie.fragment.track_id {
        Some(id) => id,
        None => {
            log::debug!("trun: no valid track fragment header, skipping");
            return Ok(());
        },
    };
    let track = match movie.tracks.iter_mut().find(|t| t.id == track_id) {
        Some(track) => track,
        None => {
            return Err(Error::CorruptExtendedHeader(format!(
                "trun: no track with id {}",
                track_id
            )))
        },
    };
    let trun = TrackRunBox::from_box(stream)?;
    log::debug!("trun: track {} {} entries", track_id, trun.entries.len());
    fragment::append_run(track, &mut movie.fragment, &trun);
    Ok(())
}
