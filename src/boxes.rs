//! Box handlers, one module per box family.
//!
//! Every handler has the same signature (see `dispatch::BoxHandler`).
//! Table boxes are parsed into a struct through `FromBox` and then
//! stored in the track they are in; outside a track they are ignored.
use crate::error::Result;
use crate::mp4box::BoxReader;

pub(crate) mod prelude;

pub mod containers;
pub mod ctts;
pub mod dref;
pub mod elst;
pub mod headers;
pub mod misc;
pub mod stco;
pub mod stsc;
pub mod stsd;
pub mod stss;
pub mod stsz;
pub mod stts;
pub mod tfhd;
pub mod trex;
pub mod trun;
pub mod udta;

/// Parse a box body from a box reader.
pub(crate) trait FromBox: Sized {
    fn from_box(stream: &mut BoxReader<'_>) -> Result<Self>;
}
