use crate::boxes::prelude::*;

/// 8.7.2 Data Reference Box (ISO/IEC 14496-12:2015(E))
#[derive(Debug, Default)]
pub struct DataReferenceBox {
    pub entries: Vec<DataReference>,
}

/// One data reference: `url `, `urn `, or a QuickTime `alis` record.
#[derive(Debug, Clone, PartialEq)]
pub struct DataReference {
    pub fourcc: FourCC,
    /// Parsed Macintosh alias, if this is an `alis` entry that has one.
    pub alias:  Option<AliasRecord>,
}

/// The parts of a Macintosh alias record that are needed to find the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasRecord {
    pub volume:    String,
    pub filename:  String,
    /// Directory levels from the alias (the movie) up to the common ancestor.
    pub nlvl_from: u16,
    /// Directory levels from the common ancestor down to the target.
    pub nlvl_to:   u16,
    /// Absolute path, volume prefix stripped, `/` separated.
    pub path:      Option<String>,
    pub dir:       Option<String>,
}

// Read a pascal-style string in a fixed size field.
fn fixed_string(stream: &mut BoxReader<'_>, field: u64) -> Result<String> {
    let len = u8::from_bytes(stream)? as u64;
    let data = stream.read(field)?;
    let len = std::cmp::min(len, field) as usize;
    Ok(decode_mac(&data[..len]))
}

fn alias_path(data: &[u8], volume: &str) -> String {
    let mut data = data;
    while let Some((&0, rest)) = data.split_last() {
        data = rest;
    }
    let path = decode_mac(data);
    let path = match path.strip_prefix(volume) {
        Some(rest) if !rest.is_empty() => rest,
        _ => &path,
    };
    path.replace(':', "/")
}

impl AliasRecord {
    fn from_box(stream: &mut BoxReader<'_>, next: u64) -> Result<AliasRecord> {
        stream.skip(10)?;
        let volume = fixed_string(stream, 27)?;
        stream.skip(12)?;
        let filename = fixed_string(stream, 63)?;
        stream.skip(16)?;
        let nlvl_from = u16::from_bytes(stream)?;
        let nlvl_to = u16::from_bytes(stream)?;
        stream.skip(16)?;
        log::debug!("alias: volume {:?} filename {:?} nlvl from {} to {}", volume, filename, nlvl_from, nlvl_to);

        let mut alias = AliasRecord {
            volume,
            filename,
            nlvl_from,
            nlvl_to,
            ..AliasRecord::default()
        };

        while stream.pos() + 4 <= next {
            let rtype = i16::from_bytes(stream)?;
            if rtype == -1 {
                break;
            }
            let mut len = u16::from_bytes(stream)? as u64;
            if len & 1 != 0 {
                len += 1;
            }
            match rtype {
                2 => {
                    let data = stream.read(len)?;
                    let path = alias_path(data, &alias.volume);
                    log::debug!("alias: path {:?}", path);
                    alias.path = Some(path);
                },
                0 => {
                    let data = stream.read(len)?;
                    let dir = alias_path(data, "");
                    log::debug!("alias: dir {:?}", dir);
                    alias.dir = Some(dir);
                },
                _ => stream.skip(len)?,
            }
        }
        Ok(alias)
    }
}

impl FromBox for DataReferenceBox {
    fn from_box(stream: &mut BoxReader<'_>) -> Result<DataReferenceBox> {
        stream.read_full()?;
        let count = u32::from_bytes(stream)?;
        let count = check_entries(stream, count as u64, 12)?;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let start = stream.pos();
            let size = u32::from_bytes(stream)? as u64;
            if size < 12 {
                return Err(Error::malformed(stream.fourcc(), format!("entry size {} too small", size)));
            }
            let next = start + size;
            let fourcc = FourCC::from_bytes(stream)?;
            let _vflags = u32::from_bytes(stream)?;
            let alias = if fourcc == FourCC::new(b"alis") && size > 150 {
                Some(AliasRecord::from_box(stream, next)?)
            } else {
                None
            };
            entries.push(DataReference { fourcc, alias });
            stream.seek(next)?;
        }
        Ok(DataReferenceBox { entries })
    }
}

pub(crate) fn read_dref(_movie: &mut MovieContext, track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    let track = match track {
        Some(track) => track,
        None => return Ok(()),
    };
    let dref = DataReferenceBox::from_box(stream)?;
    log::debug!("track {}: {} data references", track.track_id, dref.entries.len());
    track.drefs = Some(dref.entries);
    Ok(())
}
