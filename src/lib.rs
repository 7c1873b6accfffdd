//! QuickTime / ISO base media (MP4) demuxer.
//!
//! The box tree is walked once when a file is opened. The sample tables
//! of every track (stts, stsc, stsz, stco, stss, ctts, elst) are turned
//! into a flat sample index, movie fragments are appended to it, and
//! `Demuxer::read_packet` hands out the samples of all tracks in decode
//! order.
//!
//! ```no_run
//! use mp4demux::Demuxer;
//!
//! let mut demuxer = Demuxer::open("movie.mp4")?;
//! for track in demuxer.tracks() {
//!     println!("{} {} {}", track.id, track.media_type, track.codec);
//! }
//! while let Some(pkt) = demuxer.read_packet()? {
//!     println!("{} {} {}", pkt.track_id, pkt.dts, pkt.data.len());
//! }
//! # Ok::<(), mp4demux::Error>(())
//! ```
#[macro_use]
mod ioerr;
pub mod serialize;
mod bitreader;
pub mod boxes;
pub mod chapters;
pub mod config;
pub mod dataref;
pub mod debug;
pub mod demux;
mod dispatch;
pub mod error;
mod fragment;
mod index;
pub mod io;
pub mod metadata;
mod movie;
pub mod mp4box;
pub mod sample_info;
pub mod timecode;
pub mod track;
pub mod types;
mod walker;

pub use crate::chapters::Chapter;
pub use crate::config::ReaderOptions;
pub use crate::dataref::{DataRefResolver, FsResolver};
pub use crate::demux::{probe, Demuxer, Packet, SeekFlags};
pub use crate::error::{Error, Result};
pub use crate::metadata::{MetaTag, MetaValue, Metadata};
pub use crate::sample_info::{DataRefHandle, SampleInfo};
pub use crate::track::Track;
