use crate::boxes::prelude::*;

/// 8.8.3 Track Extends Box (ISO/IEC 14496-12:2015(E))
///
/// Per-track defaults for the samples in movie fragments.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TrackExtendsBox {
    pub track_id:                         u32,
    pub default_sample_description_index: u32,
    pub default_sample_duration:          u32,
    pub default_sample_size:              u32,
    pub default_sample_flags:             u32,
}

impl FromBox for TrackExtendsBox {
    fn from_box(stream: &mut BoxReader<'_>) -> Result<TrackExtendsBox> {
        stream.read_full()?;
        Ok(TrackExtendsBox {
            track_id:                         u32::from_bytes(stream)?,
            default_sample_description_index: u32::from_bytes(stream)?,
            default_sample_duration:          u32::from_bytes(stream)?,
            default_sample_size:              u32::from_bytes(stream)?,
            default_sample_flags:             u32::from_bytes(stream)?,
        })
    }
}

pub(crate) fn read_trex(movie: &mut MovieContext, _track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    let trex = TrackExtendsBox::from_box(stream)?;
    log::debug!("trex: {:?}", trex);
    movie.trex.push(trex);
    Ok(())
}
