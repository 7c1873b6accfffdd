//
// ISO/IEC 14496-12:2015(E)
// 8.8.7 Track Fragment Header Box
//

use crate::boxes::prelude::*;
use crate::fragment;

//  aligned(8) class TrackFragmentHeaderBox extends FullBox(‘tfhd’, 0, tf_flags){
//      unsigned int(32) track_ID;
//      // all the following are optional fields
//      unsigned int(64) base_data_offset;
//      unsigned int(32) sample_description_index;
//      unsigned int(32) default_sample_duration;
//      unsigned int(32) default_sample_size;
//      unsigned int(32) default_sample_flags
//  }

/// 8.8.7 Track Fragment Header Box (ISO/IEC 14496-12:2015(E))
#[derive(Debug, Default)]
pub struct TrackFragmentHeaderBox {
    pub track_id:                 u32,
    pub base_data_offset:         Option<u64>,
    pub sample_description_index: Option<u32>,
    pub default_sample_duration:  Option<u32>,
    pub default_sample_size:      Option<u32>,
    pub default_sample_flags:     Option<u32>,
}

// as long as we don't have bool.then().
pub(crate) fn b_then<T>(flag: bool, closure: impl FnOnce() -> T) -> Option<T> {
    if flag {
        Some(closure())
    } else {
        None
    }
}

impl FromBox for TrackFragmentHeaderBox {
    fn from_box(stream: &mut BoxReader<'_>) -> Result<TrackFragmentHeaderBox> {
        stream.read_full()?;
        let flags = stream.flags();

        let track_id = u32::from_bytes(stream)?;
        let base_data_offset = b_then((flags & 0x01) > 0, || u64::from_bytes(stream)).transpose()?;
        let sample_description_index = b_then((flags & 0x02) > 0, || u32::from_bytes(stream)).transpose()?;
        let default_sample_duration = b_then((flags & 0x08) > 0, || u32::from_bytes(stream)).transpose()?;
        let default_sample_size = b_then((flags & 0x10) > 0, || u32::from_bytes(stream)).transpose()?;
        let default_sample_flags = b_then((flags & 0x20) > 0, || u32::from_bytes(stream)).transpose()?;

        Ok(TrackFragmentHeaderBox {
            track_id,
            base_data_offset,
            sample_description_index,
            default_sample_duration,
            default_sample_size,
            default_sample_flags,
        })
    }
}

pub(crate) fn read_tfhd(movie: &mut MovieContext, _track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    let tfhd = TrackFragmentHeaderBox::from_box(stream)?;
    log::debug!("tfhd: {:?}", tfhd);
    fragment::start_track_fragment(&mut movie.fragment, &movie.trex, &tfhd)
}
