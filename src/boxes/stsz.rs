use crate::bitreader::BitReader;
use crate::boxes::prelude::*;

/// 8.7.3 Sample Size Boxes (ISO/IEC 14496-12:2015(E))
///
/// Both the regular `stsz` and the compact `stz2` variant, which packs
/// the sizes in 4, 8 or 16 bit fields (32 is accepted as well).
#[derive(Debug, Default)]
pub struct SampleSizeBox {
    /// Constant size of all samples, or 0.
    pub sample_size:  u32,
    pub sample_count: u32,
    /// Per-sample sizes, empty when `sample_size` is constant.
    pub entries:      Vec<u32>,
}

impl FromBox for SampleSizeBox {
    fn from_box(stream: &mut BoxReader<'_>) -> Result<SampleSizeBox> {
        stream.read_full()?;
        let fourcc = stream.fourcc();
        let (sample_size, field_size) = if fourcc == FourCC::new(b"stz2") {
            // 24 bits reserved, then the field size.
            let v = u32::from_bytes(stream)?;
            (0, (v & 0xff) as u8)
        } else {
            (u32::from_bytes(stream)?, 32)
        };
        let sample_count = u32::from_bytes(stream)?;

        let mut entries = Vec::new();
        if sample_size == 0 && sample_count > 0 {
            if ![4u8, 8, 16, 32].contains(&field_size) {
                return Err(Error::malformed(fourcc, format!("invalid sample field size {}", field_size)));
            }
            let num_bytes = (sample_count as u64 * field_size as u64 + 7) / 8;
            if num_bytes > stream.left() {
                return Err(Error::Allocation {
                    fourcc,
                    count: sample_count as u64,
                    entry_size: field_size as u64,
                    available: stream.left(),
                });
            }
            let data = stream.read(num_bytes)?;
            let mut bits = BitReader::new(data);
            entries.reserve(sample_count as usize);
            for _ in 0..sample_count {
                entries.push(bits.read_bits(field_size)?);
            }
        }

        Ok(SampleSizeBox {
            sample_size,
            sample_count,
            entries,
        })
    }
}

pub(crate) fn read_stsz(_movie: &mut MovieContext, track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    let track = match track {
        Some(track) => track,
        None => return Ok(()),
    };
    let stsz = SampleSizeBox::from_box(stream)?;
    log::debug!(
        "track {}: {} sample_size {} sample_count {}",
        track.track_id,
        stream.fourcc(),
        stsz.sample_size,
        stsz.sample_count
    );
    // The sample description may already have set a size (uncompressed audio).
    if track.sample_size == 0 {
        track.sample_size = stsz.sample_size;
    }
    track.sample_count = stsz.sample_count;
    track.sample_sizes = stsz.entries;
    Ok(())
}
