//! Box type to handler table.
use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::boxes::*;
use crate::error::Result;
use crate::movie::MovieContext;
use crate::mp4box::BoxReader;
use crate::track::TrackContext;
use crate::types::FourCC;

/// A box handler. Table boxes get the track they are in, if any.
pub(crate) type BoxHandler = fn(&mut MovieContext, Option<&mut TrackContext>, &mut BoxReader<'_>) -> Result<()>;

static HANDLERS: Lazy<HashMap<FourCC, BoxHandler>> = Lazy::new(|| {
    let table: &[(&[u8; 4], BoxHandler)] = &[
        // containers
        (b"dinf", containers::read_container),
        (b"edts", containers::read_container),
        (b"mdia", containers::read_container),
        (b"minf", containers::read_container),
        (b"mvex", containers::read_container),
        (b"stbl", containers::read_container),
        (b"tapt", containers::read_container),
        (b"traf", containers::read_container),
        (b"tref", containers::read_container),
        (b"udta", containers::read_container),
        (b"wave", containers::read_container),
        (b"ilst", containers::read_ilst),
        (b"meta", containers::read_meta),
        (b"moof", containers::read_moof),
        (b"moov", containers::read_moov),
        (b"trak", containers::read_trak),
        // movie and track headers
        (b"ftyp", headers::read_ftyp),
        (b"hdlr", headers::read_hdlr),
        (b"mdhd", headers::read_mdhd),
        (b"mvhd", headers::read_mvhd),
        (b"tkhd", headers::read_tkhd),
        // sample tables
        (b"co64", stco::read_stco),
        (b"ctts", ctts::read_ctts),
        (b"dref", dref::read_dref),
        (b"elst", elst::read_elst),
        (b"stco", stco::read_stco),
        (b"stps", stss::read_stss),
        (b"stsc", stsc::read_stsc),
        (b"stsd", stsd::read_stsd),
        (b"stss", stss::read_stss),
        (b"stsz", stsz::read_stsz),
        (b"stts", stts::read_stts),
        (b"stz2", stsz::read_stsz),
        // fragments
        (b"tfhd", tfhd::read_tfhd),
        (b"trex", trex::read_trex),
        (b"trun", trun::read_trun),
        // other
        (b"chap", misc::read_chap),
        (b"chpl", udta::read_chpl),
        (b"cmov", misc::read_cmov),
        (b"keys", udta::read_keys),
        (b"mdat", misc::read_mdat),
        (b"wide", misc::read_wide),
    ];
    table.iter().map(|(tag, handler)| (FourCC::new(tag), *handler)).collect()
});

/// Find the handler for a box of type `fourcc` inside a box of type `parent`.
///
/// Boxes without a handler of their own inside `udta` or `ilst` are
/// metadata items.
pub(crate) fn lookup(parent: FourCC, fourcc: FourCC) -> Option<BoxHandler> {
    if let Some(handler) = HANDLERS.get(&fourcc) {
        return Some(*handler);
    }
    if parent == FourCC::new(b"udta") || parent == FourCC::new(b"ilst") {
        return Some(udta::read_metadata_item);
    }
    None
}
