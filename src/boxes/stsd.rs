use serde::Serialize;

use crate::boxes::prelude::*;
use crate::mp4box::{BoxHeader, Header};
use crate::walker::read_boxes;

/// What we keep of the first entry of the sample description box.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SampleDescription {
    pub format:   FourCC,
    pub width:    u16,
    pub height:   u16,
    pub audio:    Option<AudioParams>,
    pub timecode: Option<TimecodeParams>,
}

/// Audio sample entry, QuickTime version 1/2 extensions included.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct AudioParams {
    pub version:           u16,
    pub channels:          u32,
    pub bits_per_sample:   u32,
    pub sample_rate:       f64,
    pub samples_per_frame: u32,
    pub bytes_per_frame:   u32,
    /// lpcm format flags (version 2 only).
    pub lpcm_flags:        u32,
}

/// Timecode sample entry (`tmcd`).
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct TimecodeParams {
    pub flags:      u32,
    pub drop_frame: bool,
    pub fps:        u8,
}

// Bytes per sample of the uncompressed audio formats.
fn pcm_bytes_per_sample(format: FourCC, bits: u32) -> Option<u32> {
    let n = match &format.to_bytes() {
        b"raw " | b"ulaw" | b"alaw" => 1,
        b"twos" | b"sowt" => {
            if bits == 8 {
                1
            } else {
                2
            }
        },
        b"in24" => 3,
        b"in32" | b"fl32" => 4,
        b"fl64" => 8,
        b"lpcm" => bits / 8,
        _ => return None,
    };
    if n > 0 {
        Some(n)
    } else {
        None
    }
}

fn read_video(entry: &mut BoxReader<'_>, desc: &mut SampleDescription) -> Result<()> {
    // version, revision, vendor, temporal and spatial quality.
    entry.skip(16)?;
    desc.width = u16::from_bytes(entry)?;
    desc.height = u16::from_bytes(entry)?;
    // resolution, data size, frame count, compressor name, depth, color table id.
    entry.skip(50)?;
    Ok(())
}

fn read_audio(entry: &mut BoxReader<'_>, isom: bool, track: &TrackContext, desc: &mut SampleDescription) -> Result<u32> {
    let version = u16::from_bytes(entry)?;
    // revision, vendor.
    entry.skip(6)?;
    let mut audio = AudioParams {
        version,
        channels: u16::from_bytes(entry)? as u32,
        bits_per_sample: u16::from_bytes(entry)? as u32,
        ..AudioParams::default()
    };
    // compression id, packet size.
    entry.skip(4)?;
    audio.sample_rate = (u32::from_bytes(entry)? >> 16) as f64;

    if !isom {
        match version {
            1 => {
                audio.samples_per_frame = u32::from_bytes(entry)?;
                let _bytes_per_packet = u32::from_bytes(entry)?;
                audio.bytes_per_frame = u32::from_bytes(entry)?;
                let _bytes_per_sample = u32::from_bytes(entry)?;
            },
            2 => {
                let _struct_size = u32::from_bytes(entry)?;
                audio.sample_rate = f64::from_bits(u64::from_bytes(entry)?);
                audio.channels = u32::from_bytes(entry)?;
                let _always_7f000000 = u32::from_bytes(entry)?;
                audio.bits_per_sample = u32::from_bytes(entry)?;
                audio.lpcm_flags = u32::from_bytes(entry)?;
                audio.bytes_per_frame = u32::from_bytes(entry)?;
                audio.samples_per_frame = u32::from_bytes(entry)?;
            },
            _ => {},
        }
    }

    let ch = audio.channels;
    match &desc.format.to_bytes() {
        b"MAC3" => {
            audio.samples_per_frame = 6;
            audio.bytes_per_frame = 2 * ch;
        },
        b"MAC6" => {
            audio.samples_per_frame = 6;
            audio.bytes_per_frame = ch;
        },
        b"ima4" => {
            audio.samples_per_frame = 64;
            audio.bytes_per_frame = 34 * ch;
        },
        b"agsm" => {
            audio.samples_per_frame = 160;
            audio.bytes_per_frame = 33;
        },
        _ => {},
    }

    let mut sample_size = 0;
    if let Some(bytes) = pcm_bytes_per_sample(desc.format, audio.bits_per_sample) {
        audio.bits_per_sample = bytes * 8;
        sample_size = bytes * ch;
    }
    if audio.sample_rate == 0.0 && track.timescale > 1 {
        audio.sample_rate = track.timescale as f64;
    }
    desc.audio = Some(audio);
    Ok(sample_size)
}

fn read_timecode(entry: &mut BoxReader<'_>, desc: &mut SampleDescription) -> Result<()> {
    let _reserved = u32::from_bytes(entry)?;
    let flags = u32::from_bytes(entry)?;
    let _timescale = u32::from_bytes(entry)?;
    let _frame_duration = u32::from_bytes(entry)?;
    let fps = u8::from_bytes(entry)?;
    desc.timecode = Some(TimecodeParams {
        flags,
        drop_frame: flags & 0x0001 != 0,
        fps,
    });
    Ok(())
}

fn read_entry(movie: &mut MovieContext, track: &mut TrackContext, entry: &mut BoxReader<'_>) -> Result<()> {
    let format = entry.header.fourcc;
    if entry.left() < 8 {
        return Err(Error::malformed(FourCC::new(b"stsd"), format!("{}: entry too small", format)));
    }
    // reserved.
    entry.skip(6)?;
    let dref_id = match u16::from_bytes(entry)? {
        0 => 1,
        n => n as u32,
    };
    track.dref_ids.push(dref_id);

    if let Some(desc) = track.description.as_ref() {
        if desc.format != format {
            log::warn!(
                "track {}: multiple sample descriptions ({} and {}), only the first is used",
                track.track_id,
                desc.format,
                format
            );
        }
        return Ok(());
    }

    let mut desc = SampleDescription {
        format,
        ..SampleDescription::default()
    };
    if format == FourCC::new(b"tmcd") {
        read_timecode(entry, &mut desc)?;
    } else {
        match track.media_type {
            MediaType::Video => read_video(entry, &mut desc)?,
            MediaType::Audio => {
                let sample_size = read_audio(entry, movie.isom, track, &mut desc)?;
                if sample_size > 0 {
                    track.sample_size = sample_size;
                }
            },
            _ => {},
        }
    }
    log::debug!("track {}: sample description {:?}", track.track_id, desc);
    track.description = Some(desc);

    // Extension boxes (esds, avcC, wave, ...).
    if entry.left() >= 8 {
        let depth = entry.depth;
        read_boxes(movie, Some(track), entry, depth)?;
    }
    Ok(())
}

/// 8.5.2 Sample Description Box (ISO/IEC 14496-12:2015(E))
pub(crate) fn read_stsd(movie: &mut MovieContext, track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    let track = match track {
        Some(track) => track,
        None => return Ok(()),
    };
    stream.read_full()?;
    let count = u32::from_bytes(stream)?;
    let count = check_entries(stream, count as u64, 16)?;
    for _ in 0..count {
        let left = stream.left();
        let header = match BoxHeader::read(stream, left)? {
            Header::Box(header) => header,
            Header::Malformed(reason) => return Err(Error::malformed(FourCC::new(b"stsd"), reason)),
        };
        let depth = stream.depth + 1;
        let mut entry = BoxReader::new(stream, header, depth);
        read_entry(movie, track, &mut entry)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm_sizes() {
        assert_eq!(pcm_bytes_per_sample(FourCC::new(b"twos"), 16), Some(2));
        assert_eq!(pcm_bytes_per_sample(FourCC::new(b"twos"), 8), Some(1));
        assert_eq!(pcm_bytes_per_sample(FourCC::new(b"in24"), 0), Some(3));
        assert_eq!(pcm_bytes_per_sample(FourCC::new(b"lpcm"), 0), None);
        assert_eq!(pcm_bytes_per_sample(FourCC::new(b"mp4a"), 16), None);
    }
}
