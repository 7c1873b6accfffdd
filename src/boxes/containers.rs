//! Boxes that only contain other boxes.
use crate::boxes::prelude::*;
use crate::walker::read_boxes;

/// Plain container: walk the children.
pub(crate) fn read_container(movie: &mut MovieContext, track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    let depth = stream.depth;
    read_boxes(movie, track, stream, depth)
}

pub(crate) fn read_moov(movie: &mut MovieContext, track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    if movie.found_moov {
        log::warn!("found a second moov box at {}, ignoring it", stream.header.offset);
        return Ok(());
    }
    read_container(movie, track, stream)?;
    movie.found_moov = true;
    Ok(())
}

/// A track. Its tables are collected in a fresh context, which is
/// turned into a track with a sample index at the end of the box.
pub(crate) fn read_trak(movie: &mut MovieContext, _track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    let mut ctx = TrackContext::new(movie.tracks.len());
    read_container(movie, Some(&mut ctx), stream)?;
    if ctx.track_id == 0 {
        ctx.track_id = movie.tracks.len() as u32 + 1;
    }
    movie.finish_track(ctx)
}

pub(crate) fn read_moof(movie: &mut MovieContext, _track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    log::debug!("moof at {}", stream.header.offset);
    movie.fragment.moof_offset = stream.header.offset;
    movie.fragment.track_id = None;
    read_container(movie, None, stream)
}

/// `meta` is a full box in ISO files and a plain container in QuickTime
/// files. Either way its content starts with a `hdlr`, so look for that.
pub(crate) fn read_meta(movie: &mut MovieContext, track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    let start = stream.start();
    while stream.left() >= 8 {
        let tag = FourCC::from_bytes(stream)?;
        let pos = stream.pos();
        if tag == FourCC::new(b"hdlr") && pos >= start + 8 {
            stream.seek(pos - 8)?;
            return read_container(movie, track, stream);
        }
    }
    Ok(())
}

/// iTunes metadata list. The items inside are metadata tags.
pub(crate) fn read_ilst(movie: &mut MovieContext, track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    let saved = movie.in_ilst;
    movie.in_ilst = true;
    let res = read_container(movie, track, stream);
    movie.in_ilst = saved;
    res
}
