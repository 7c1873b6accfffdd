//! Debug helpers.
//!
use std::io::{self, Write};

use crate::mp4box::{BoxHeader, BoxReader, Header};
use crate::serialize::{BoxBytes, FromBytes, ReadBytes};
use crate::track::Track;
use crate::types::FourCC;

// Boxes whose payload is a list of boxes.
const CONTAINERS: &[&[u8; 4]] = &[
    b"moov", b"trak", b"mdia", b"minf", b"stbl", b"dinf", b"edts", b"mvex", b"moof", b"traf", b"tref", b"udta",
    b"wave", b"tapt", b"ilst", b"meta",
];

fn is_container(fourcc: FourCC) -> bool {
    CONTAINERS.iter().any(|c| FourCC::new(c) == fourcc)
}

fn dump_level<W: Write>(stream: &mut dyn ReadBytes, out: &mut W, depth: usize, max_depth: usize) -> io::Result<()> {
    while stream.left() >= 8 {
        let scope_left = stream.left();
        let header = match BoxHeader::read(stream, scope_left)? {
            Header::Box(header) => header,
            Header::Malformed(reason) => {
                writeln!(out, "{:indent$}malformed: {}", "", reason, indent = depth * 2)?;
                break;
            },
        };
        writeln!(
            out,
            "{:indent$}{} @{} size {}",
            "",
            header.fourcc,
            header.offset,
            header.header_size + header.size,
            indent = depth * 2
        )?;
        let fourcc = header.fourcc;
        let mut reader = BoxReader::new(stream, header, depth + 1);
        if is_container(fourcc) && depth < max_depth {
            // ISO meta is a full box, QuickTime meta is not.
            if fourcc == FourCC::new(b"meta") && reader.left() >= 4 {
                if u32::from_bytes(&mut reader)? != 0 {
                    let start = reader.start();
                    reader.seek(start)?;
                }
            }
            dump_level(&mut reader, out, depth + 1, max_depth)?;
        }
    }
    Ok(())
}

/// Print the box tree.
pub fn dump_boxes<W: Write>(stream: &mut dyn ReadBytes, out: &mut W, max_depth: usize) -> io::Result<()> {
    dump_level(stream, out, 0, max_depth)
}

/// Print the sample index of a track. `first` and `last` are 1-based,
/// `last` 0 means up to the end.
pub fn dump_track_samples<W: Write>(track: &Track, out: &mut W, first: usize, last: usize) -> io::Result<()> {
    let first = std::cmp::max(1, first);
    let timescale = track.timescale.max(1) as f64;

    writeln!(
        out,
        "{} {:>8}  {:>10}  {:>6}  {:>10}  {:>5}  {:>4}  {:>7}  {:>8}",
        " ", "#", "filepos", "size", "dtime", "sync", "dist", "chunkno", "source"
    )?;
    let mut next_pos = None;
    for (i, sample) in track.samples().iter().enumerate().skip(first - 1) {
        let idx = i + 1;
        if last > 0 && idx > last {
            break;
        }
        let dtime = sample.dts as f64 / timescale;
        let is_sync = if sample.is_sync { "sync" } else { "" };
        let jump = if next_pos.is_some() && next_pos != Some(sample.pos) { "+" } else { " " };
        next_pos = Some(sample.pos + sample.size as u64);
        writeln!(
            out,
            "{} {:>8}  {:>10}  {:>6}  {:>10.3}  {:>5}  {:>4}  {:>7}  {:>8}",
            jump,
            idx,
            sample.pos,
            sample.size,
            dtime,
            is_sync,
            sample.distance,
            sample.chunk,
            format!("{:?}", sample.source)
        )?;
    }
    Ok(())
}
