//! Chapters: Nero `chpl` lists and QuickTime chapter tracks.
use serde::Serialize;

use crate::error::Result;
use crate::sample_info::SampleInfo;
use crate::track::Track;
use crate::types::rescale;

/// One chapter. Times are in microseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chapter {
    pub id:    u32,
    pub start: i64,
    pub end:   Option<i64>,
    pub title: String,
}

fn utf16_title(data: &[u8], big_endian: bool) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|c| if big_endian { u16::from_be_bytes([c[0], c[1]]) } else { u16::from_le_bytes([c[0], c[1]]) })
        .take_while(|&u| u != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

/// Decode the title in a chapter track sample: a 16-bit length followed
/// by the text, UTF-16 if it starts with a byte order mark, else UTF-8.
///
/// `None` if the length does not fit in the sample.
pub(crate) fn sample_title(data: &[u8]) -> Option<String> {
    if data.len() < 2 {
        return None;
    }
    let len = u16::from_be_bytes([data[0], data[1]]) as usize;
    if len > data.len() - 2 {
        return None;
    }
    let text = &data[2..2 + len];
    let title = match text {
        [0xfe, 0xff, rest @ ..] => utf16_title(rest, true),
        [0xff, 0xfe, rest @ ..] => utf16_title(rest, false),
        _ => {
            let end = text.iter().position(|&b| b == 0).unwrap_or(text.len());
            String::from_utf8_lossy(&text[..end]).into_owned()
        },
    };
    Some(title)
}

/// Read the chapters of a QuickTime chapter track.
///
/// `read` fetches the payload of a sample. A sample whose title does not
/// fit is skipped; a sample that cannot be read ends the list.
pub(crate) fn read_chapter_track<F>(track: &Track, mut read: F) -> Vec<Chapter>
where
    F: FnMut(&SampleInfo) -> Result<Vec<u8>>,
{
    let timescale = track.timescale.max(1) as i64;
    let samples = track.samples();
    let mut chapters = Vec::new();

    for (i, sample) in samples.iter().enumerate() {
        let end = samples.get(i + 1).map(|s| s.dts).unwrap_or(track.duration);
        let data = match read(sample) {
            Ok(data) => data,
            Err(e) => {
                log::error!("track {}: chapter {} not found in file: {}", track.id, i, e);
                break;
            },
        };
        let title = match sample_title(&data) {
            Some(title) => title,
            None => continue,
        };
        chapters.push(Chapter {
            id: i as u32,
            start: rescale(sample.dts, 1_000_000, timescale),
            end: Some(rescale(end, 1_000_000, timescale)),
            title,
        });
    }
    log::debug!("track {}: {} chapters", track.id, chapters.len());
    chapters
}
