use crate::boxes::prelude::*;

/// Media data. We only note that we have seen it; the samples are
/// addressed through the index.
pub(crate) fn read_mdat(movie: &mut MovieContext, _track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    if stream.size() == 0 {
        return Ok(());
    }
    log::debug!("mdat at {} size {}", stream.header.offset, stream.size());
    movie.found_mdat = true;
    Ok(())
}

/// QuickTime `wide` placeholder. Old writers put a zero-sized `mdat`
/// header in it and let the media data run on behind it.
pub(crate) fn read_wide(movie: &mut MovieContext, track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    if stream.left() < 8 {
        return Ok(());
    }
    if u32::from_bytes(stream)? != 0 {
        return Ok(());
    }
    if FourCC::from_bytes(stream)? != FourCC::new(b"mdat") {
        return Ok(());
    }
    if stream.left() > 0 {
        log::debug!("wide: contains mdat");
        return read_mdat(movie, track, stream);
    }
    Ok(())
}

/// Compressed movie header. We have no zlib, so all we can do is say so.
pub(crate) fn read_cmov(_movie: &mut MovieContext, _track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    log::warn!("cmov at {}: compressed movie headers are not supported, skipping", stream.header.offset);
    Ok(())
}

/// `tref/chap`: the track that holds the chapter titles.
pub(crate) fn read_chap(movie: &mut MovieContext, _track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    if stream.left() < 4 {
        return Ok(());
    }
    let id = u32::from_bytes(stream)?;
    log::debug!("chapter track {}", id);
    movie.chapter_track = Some(id);
    Ok(())
}
