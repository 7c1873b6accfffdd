//! File type, movie, track and media headers, and the handler box.
use crate::boxes::prelude::*;

// Version 0 has 32 bit times and duration, version 1 64 bit.
fn read_time<R: ReadBytes + ?Sized>(stream: &mut R, version: u8) -> Result<u64> {
    Ok(if version == 1 {
        u64::from_bytes(stream)?
    } else {
        u32::from_bytes(stream)? as u64
    })
}

fn check_version(stream: &BoxReader<'_>, max: u8) -> Result<()> {
    let version = stream.version();
    if version > max {
        return Err(Error::UnsupportedVersion { fourcc: stream.fourcc(), version });
    }
    Ok(())
}

/// 4.3 File Type Box (ISO/IEC 14496-12:2015(E))
#[derive(Debug, Default)]
pub struct FileTypeBox {
    pub major_brand:       FourCC,
    pub minor_version:     u32,
    pub compatible_brands: Vec<FourCC>,
}

impl FromBox for FileTypeBox {
    fn from_box(stream: &mut BoxReader<'_>) -> Result<FileTypeBox> {
        let major_brand = FourCC::from_bytes(stream)?;
        let minor_version = u32::from_bytes(stream)?;
        let mut compatible_brands = Vec::new();
        while stream.left() >= 4 {
            compatible_brands.push(FourCC::from_bytes(stream)?);
        }
        Ok(FileTypeBox {
            major_brand,
            minor_version,
            compatible_brands,
        })
    }
}

pub(crate) fn read_ftyp(movie: &mut MovieContext, _track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    let ftyp = FileTypeBox::from_box(stream)?;
    if ftyp.major_brand != FourCC::new(b"qt  ") {
        movie.isom = true;
    }
    log::debug!("ftyp: major brand {} isom {}", ftyp.major_brand, movie.isom);
    let brands: String = ftyp.compatible_brands.iter().map(|b| b.to_string()).collect();
    movie.metadata.set_str("major_brand", ftyp.major_brand.to_string());
    movie.metadata.set_str("minor_version", ftyp.minor_version.to_string());
    movie.metadata.set_str("compatible_brands", brands);
    Ok(())
}

/// 8.2.2 Movie Header Box (ISO/IEC 14496-12:2015(E))
#[derive(Debug, Default)]
pub struct MovieHeaderBox {
    pub creation_time:     MacTime,
    pub modification_time: MacTime,
    pub timescale:         u32,
    pub duration:          u64,
}

impl FromBox for MovieHeaderBox {
    fn from_box(stream: &mut BoxReader<'_>) -> Result<MovieHeaderBox> {
        stream.read_full()?;
        check_version(stream, 1)?;
        let version = stream.version();
        Ok(MovieHeaderBox {
            creation_time:     MacTime(read_time(stream, version)?),
            modification_time: MacTime(read_time(stream, version)?),
            timescale:         u32::from_bytes(stream)?,
            duration:          read_time(stream, version)?,
        })
    }
}

pub(crate) fn read_mvhd(movie: &mut MovieContext, _track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    let mvhd = MovieHeaderBox::from_box(stream)?;
    log::debug!("mvhd: timescale {} duration {} created {:?}", mvhd.timescale, mvhd.duration, mvhd.creation_time);
    movie.timescale = mvhd.timescale;
    movie.duration = mvhd.duration;
    if let Some(time) = mvhd.creation_time.to_utc_string() {
        movie.metadata.set_str("creation_time", time);
    }
    Ok(())
}

/// 8.3.2 Track Header Box (ISO/IEC 14496-12:2015(E))
#[derive(Debug, Default)]
pub struct TrackHeaderBox {
    pub track_id: u32,
    pub duration: u64,
    /// Display size, integer part of the 16.16 values.
    pub width:    u32,
    pub height:   u32,
}

impl FromBox for TrackHeaderBox {
    fn from_box(stream: &mut BoxReader<'_>) -> Result<TrackHeaderBox> {
        stream.read_full()?;
        check_version(stream, 1)?;
        let version = stream.version();
        let _creation_time = read_time(stream, version)?;
        let _modification_time = read_time(stream, version)?;
        let track_id = u32::from_bytes(stream)?;
        stream.skip(4)?;
        let duration = read_time(stream, version)?;
        // reserved, layer, alternate group, volume, reserved, matrix.
        stream.skip(8 + 8 + 36)?;
        let width = u32::from_bytes(stream)? >> 16;
        let height = u32::from_bytes(stream)? >> 16;
        Ok(TrackHeaderBox {
            track_id,
            duration,
            width,
            height,
        })
    }
}

pub(crate) fn read_tkhd(_movie: &mut MovieContext, track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    let track = match track {
        Some(track) => track,
        None => return Ok(()),
    };
    let tkhd = TrackHeaderBox::from_box(stream)?;
    log::debug!("tkhd: track id {} display {}x{}", tkhd.track_id, tkhd.width, tkhd.height);
    track.track_id = tkhd.track_id;
    track.display_width = tkhd.width;
    track.display_height = tkhd.height;
    Ok(())
}

/// 8.4.2 Media Header Box (ISO/IEC 14496-12:2015(E))
#[derive(Debug, Default)]
pub struct MediaHeaderBox {
    pub timescale: u32,
    pub duration:  u64,
    pub language:  IsoLanguageCode,
}

impl FromBox for MediaHeaderBox {
    fn from_box(stream: &mut BoxReader<'_>) -> Result<MediaHeaderBox> {
        stream.read_full()?;
        check_version(stream, 1)?;
        let version = stream.version();
        let _creation_time = read_time(stream, version)?;
        let _modification_time = read_time(stream, version)?;
        Ok(MediaHeaderBox {
            timescale: u32::from_bytes(stream)?,
            duration:  read_time(stream, version)?,
            language:  IsoLanguageCode::from_bytes(stream)?,
        })
    }
}

pub(crate) fn read_mdhd(_movie: &mut MovieContext, track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    let track = match track {
        Some(track) => track,
        None => return Ok(()),
    };
    let mdhd = MediaHeaderBox::from_box(stream)?;
    log::debug!("track {}: mdhd timescale {} duration {} language {}", track.track_id, mdhd.timescale, mdhd.duration, mdhd.language);
    track.timescale = mdhd.timescale;
    track.duration = mdhd.duration;
    if let Some(lang) = mdhd.language.to_iso639() {
        track.metadata.set_str("language", lang.as_str());
        track.language = Some(lang);
    }
    Ok(())
}

/// 8.4.3 Handler Reference Box (ISO/IEC 14496-12:2015(E))
///
/// In QuickTime files the `pre_defined` field is the component type
/// (`mhlr` / `dhlr`); we only look at the subtype.
#[derive(Debug, Default)]
pub struct HandlerBox {
    pub component_type: FourCC,
    pub handler_type:   FourCC,
}

impl FromBox for HandlerBox {
    fn from_box(stream: &mut BoxReader<'_>) -> Result<HandlerBox> {
        stream.read_full()?;
        Ok(HandlerBox {
            component_type: FourCC::from_bytes(stream)?,
            handler_type:   FourCC::from_bytes(stream)?,
        })
    }
}

pub(crate) fn read_hdlr(_movie: &mut MovieContext, track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    let track = match track {
        Some(track) => track,
        None => return Ok(()),
    };
    let hdlr = HandlerBox::from_box(stream)?;
    log::debug!("track {}: hdlr {} {}", track.track_id, hdlr.component_type, hdlr.handler_type);
    match &hdlr.handler_type.to_bytes() {
        b"vide" => track.media_type = MediaType::Video,
        b"soun" => track.media_type = MediaType::Audio,
        b"subp" => track.media_type = MediaType::Subtitle,
        _ => {},
    }
    Ok(())
}
