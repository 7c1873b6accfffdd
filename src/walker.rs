//! Recursive walk over the box tree.
use crate::dispatch;
use crate::error::Result;
use crate::movie::MovieContext;
use crate::mp4box::{BoxHeader, BoxReader, Header};
use crate::serialize::ReadBytes;
use crate::track::TrackContext;

/// Walk the boxes in `stream` until it is exhausted.
///
/// `stream` is either the top level source (depth 0) or the reader of a
/// container box. Every box is handed to its handler; unread payload is
/// skipped when the box reader is dropped. A handler error that is not
/// a failure of the source is logged and the walk goes on with the next
/// box.
pub(crate) fn read_boxes(
    movie: &mut MovieContext,
    mut track: Option<&mut TrackContext>,
    stream: &mut dyn ReadBytes,
    depth: usize,
) -> Result<()> {
    let parent = stream.fourcc();

    while stream.left() >= 8 {
        let scope_left = stream.left();
        let header = match BoxHeader::read(stream, scope_left)? {
            Header::Box(header) => header,
            Header::Malformed(reason) => {
                log::warn!("{}: {}, skipping rest of {}", parent, reason, parent);
                break;
            },
        };
        let fourcc = header.fourcc;
        let end = header.end();

        {
            let mut reader = BoxReader::new(stream, header, depth + 1);
            if depth >= movie.options.max_depth {
                log::warn!("{}: nested too deep ({}), skipping", fourcc, depth);
            } else if let Some(handler) = dispatch::lookup(parent, fourcc) {
                if let Err(e) = handler(movie, track.as_deref_mut(), &mut reader) {
                    if e.is_fatal() {
                        return Err(e);
                    }
                    log::warn!("{}: {}, skipping", fourcc, e);
                }
            } else {
                log::trace!("{}: no handler, skipping", fourcc);
            }
        }

        if depth == 0 && stream.is_streamed() && movie.found_moov && movie.found_mdat {
            log::debug!("found moov and mdat, stopping header walk at {}", end);
            movie.resume_at = Some(end);
            break;
        }
    }
    Ok(())
}
