//! User data: QuickTime `udta` strings, iTunes `ilst` items, the `keys`
//! table of `mdta` metadata and Nero chapters (`chpl`).
use crate::boxes::prelude::*;
use crate::chapters::Chapter;
use crate::metadata::{MetaTag, MetaValue, Metadata};

// Tag to metadata key.
const TAGS: &[(&[u8; 4], &str)] = &[
    (b"aART", "album_artist"),
    (b"cprt", "copyright"),
    (b"desc", "description"),
    (b"ldes", "synopsis"),
    (b"tvsh", "show"),
    (b"tven", "episode_id"),
    (b"tvnn", "network"),
    (b"catg", "category"),
    (b"covr", "cover"),
    (b"gnre", "genre"),
    (b"trkn", "track"),
    (b"name", "reel_name"),
    (b"\xa9ART", "artist"),
    (b"\xa9PRD", "product"),
    (b"\xa9alb", "album"),
    (b"\xa9aut", "author"),
    (b"\xa9cmt", "comment"),
    (b"\xa9cpy", "copyright"),
    (b"\xa9day", "date"),
    (b"\xa9enc", "encoder"),
    (b"\xa9swr", "encoder"),
    (b"\xa9fmt", "original_format"),
    (b"\xa9gen", "genre"),
    (b"\xa9inf", "comment"),
    (b"\xa9nam", "title"),
    (b"\xa9too", "encoder"),
    (b"\xa9wrt", "composer"),
    (b"\xa9des", "description"),
    (b"\xa9lyr", "lyrics"),
];

fn known_key(tag: FourCC) -> Option<&'static str> {
    TAGS.iter()
        .find(|(t, _)| FourCC::new(t) == tag)
        .map(|(_, key)| *key)
}

// Type of the value in an iTunes `data` atom.
#[derive(Debug, Clone, Copy, PartialEq)]
enum DataType {
    Utf8,
    Mac,
    Int,
    Float,
    Bytes,
}

impl DataType {
    fn from_u32(n: u32) -> DataType {
        match n {
            1 => DataType::Utf8,
            3 => DataType::Mac,
            21 | 22 => DataType::Int,
            23 | 24 => DataType::Float,
            _ => DataType::Bytes,
        }
    }
}

// Read a big-endian signed integer of 1 to 4 bytes.
fn read_int(stream: &mut BoxReader<'_>, size: u64) -> Result<Option<i64>> {
    let v = match size {
        1 => u8::from_bytes(stream)? as i8 as i64,
        2 => i16::from_bytes(stream)? as i64,
        3 => {
            let b = stream.read(3)?;
            let n = ((b[0] as i32) << 24 | (b[1] as i32) << 16 | (b[2] as i32) << 8) >> 8;
            n as i64
        },
        4 => i32::from_bytes(stream)? as i64,
        _ => {
            log::debug!("{}: unsupported int size {}", stream.fourcc(), size);
            return Ok(None);
        },
    };
    Ok(Some(v))
}

fn read_float(stream: &mut BoxReader<'_>, size: u64) -> Result<Option<f64>> {
    let v = match size {
        4 => f32::from_bits(u32::from_bytes(stream)?) as f64,
        8 => f64::from_bits(u64::from_bytes(stream)?),
        _ => {
            log::debug!("{}: unsupported float size {}", stream.fourcc(), size);
            return Ok(None);
        },
    };
    Ok(Some(v))
}

// The value of one item, after its header.
struct Item {
    data_type: DataType,
    raw_type:  u32,
    size:      u64,
    language:  Option<String>,
}

// iTunes item: a `data` atom with a type and a locale.
fn read_data_atom(stream: &mut BoxReader<'_>) -> Result<Option<Item>> {
    if stream.left() < 16 {
        return Ok(None);
    }
    let data_size = u32::from_bytes(stream)? as u64;
    if FourCC::from_bytes(stream)? != FourCC::new(b"data") {
        return Ok(None);
    }
    let raw_type = u32::from_bytes(stream)?;
    // locale
    stream.skip(4)?;
    let size = data_size.saturating_sub(16).min(stream.left());
    Ok(Some(Item {
        data_type: DataType::from_u32(raw_type),
        raw_type,
        size,
        language: None,
    }))
}

// Classic QuickTime user data string: length, language, text. Anything
// that does not look like that is kept as raw bytes.
fn read_udta_string(stream: &mut BoxReader<'_>) -> Result<Item> {
    let bytes = |stream: &BoxReader<'_>| Item {
        data_type: DataType::Bytes,
        raw_type:  0,
        size:      stream.left(),
        language:  None,
    };
    if stream.left() <= 4 {
        return Ok(bytes(stream));
    }
    let pos = stream.pos();
    let size = u16::from_bytes(stream)? as u64;
    let langcode = u16::from_bytes(stream)?;
    let language = IsoLanguageCode(langcode).to_iso639();
    if language.is_none() || size > stream.left() {
        stream.seek(pos)?;
        return Ok(bytes(stream));
    }
    let data_type = if langcode < 0x800 { DataType::Mac } else { DataType::Utf8 };
    Ok(Item {
        data_type,
        raw_type: 0,
        size,
        language: language.filter(|l| l != "und"),
    })
}

fn set_cover(dest: &mut Metadata, data: Vec<u8>, raw_type: u32) {
    let mime = match raw_type {
        13 => Some("image/jpeg"),
        14 => Some("image/png"),
        27 => Some("image/bmp"),
        n if n == FourCC::new(b"PNGf").0 => Some("image/png"),
        _ => None,
    };
    let tag = dest.set("cover", MetaValue::Bytes(data));
    if let Some(mime) = mime {
        tag.attrs.push(("mime".to_string(), mime.to_string()));
    }
}

fn set_value(dest: &mut Metadata, key: &str, item: &Item, stream: &mut BoxReader<'_>) -> Result<Option<()>> {
    let value = match item.data_type {
        DataType::Int => match read_int(stream, item.size)? {
            Some(n) => MetaValue::Int(n),
            None => return Ok(None),
        },
        DataType::Float => match read_float(stream, item.size)? {
            Some(n) => MetaValue::Float(n),
            None => return Ok(None),
        },
        DataType::Mac => MetaValue::String(decode_mac(stream.read(item.size)?)),
        DataType::Utf8 => {
            let data = stream.read(item.size)?;
            let data = match data.iter().position(|&b| b == 0) {
                Some(nul) => &data[..nul],
                None => data,
            };
            MetaValue::String(String::from_utf8_lossy(data).into_owned())
        },
        DataType::Bytes => MetaValue::Bytes(stream.read(item.size)?.to_vec()),
    };
    let tag: &mut MetaTag = dest.set(key, value);
    if let Some(lang) = item.language.as_ref() {
        tag.attrs.push(("language".to_string(), lang.clone()));
    }
    Ok(Some(()))
}

/// One metadata item inside `udta` or `ilst`.
///
/// Items go to the track they are in, or to the movie.
pub(crate) fn read_metadata_item(movie: &mut MovieContext, track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    let tag = stream.fourcc();

    let item = if movie.in_ilst {
        match read_data_atom(stream)? {
            Some(item) => item,
            None => return Ok(()),
        }
    } else {
        read_udta_string(stream)?
    };

    // Items in an `ilst` that goes with a `keys` box are named by index.
    let key = match known_key(tag) {
        Some(key) => key.to_string(),
        None => match (tag.0 as usize).checked_sub(1).and_then(|i| movie.keys.get(i)) {
            Some(key) if movie.in_ilst => key.clone(),
            _ => {
                log::trace!("{}: unknown metadata item, skipping", tag);
                return Ok(());
            },
        },
    };

    let dest = match track {
        Some(track) => &mut track.metadata,
        None => &mut movie.metadata,
    };

    match &tag.to_bytes() {
        b"covr" => {
            let data = stream.read(item.size)?.to_vec();
            set_cover(dest, data, item.raw_type);
        },
        b"trkn" if item.size >= 6 => {
            stream.skip(2)?;
            let n = u16::from_bytes(stream)?;
            let total = u16::from_bytes(stream)?;
            let s = if total > 0 { format!("{}/{}", n, total) } else { n.to_string() };
            dest.set_str("track", s);
        },
        b"gnre" if item.size >= 2 => {
            let genre = u16::from_bytes(stream)?;
            dest.set("genre", MetaValue::Int(genre as i64));
        },
        _ => {
            if set_value(dest, &key, &item, stream)?.is_none() {
                return Ok(());
            }
        },
    }
    log::debug!("metadata: {} ({})", key, tag);
    Ok(())
}

/// `keys` box: names for the items in the `ilst` next to it.
pub(crate) fn read_keys(movie: &mut MovieContext, _track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    stream.read_full()?;
    let count = u32::from_bytes(stream)?;
    let count = check_entries(stream, count as u64, 8)?;
    let mut keys = Vec::with_capacity(count);
    for _ in 0..count {
        let size = u32::from_bytes(stream)? as u64;
        // namespace, normally 'mdta'
        stream.skip(4)?;
        if size < 8 || size - 8 > stream.left() {
            log::warn!("keys: entry size {} out of range", size);
            break;
        }
        let name = stream.read(size - 8)?;
        keys.push(String::from_utf8_lossy(name).into_owned());
    }
    log::debug!("keys: {:?}", keys);
    movie.keys = keys;
    Ok(())
}

/// Nero chapter list.
pub(crate) fn read_chpl(movie: &mut MovieContext, _track: Option<&mut TrackContext>, stream: &mut BoxReader<'_>) -> Result<()> {
    if stream.left() < 5 {
        return Ok(());
    }
    stream.read_full()?;
    if stream.version() != 0 {
        stream.skip(4)?;
    }
    let count = u8::from_bytes(stream)?;

    let mut chapters = Vec::with_capacity(count as usize);
    for id in 0..count as u32 {
        if stream.left() < 9 {
            break;
        }
        let start = i64::from_bytes(stream)?;
        let len = u8::from_bytes(stream)? as u64;
        if len > stream.left() {
            break;
        }
        let title = String::from_utf8_lossy(stream.read(len)?).into_owned();
        chapters.push(Chapter {
            id,
            // 100 ns units.
            start: start / 10,
            end: None,
            title,
        });
    }
    for i in 1..chapters.len() {
        chapters[i - 1].end = Some(chapters[i].start);
    }
    log::debug!("chpl: {} chapters", chapters.len());
    movie.chapters = chapters;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReaderOptions;
    use crate::dataref::FsResolver;
    use crate::io::MemFile;
    use crate::mp4box::{BoxHeader, Header};

    fn movie() -> MovieContext {
        MovieContext::new(ReaderOptions::default(), Box::new(FsResolver), None)
    }

    fn mkbox(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut v = (payload.len() as u32 + 8).to_be_bytes().to_vec();
        v.extend_from_slice(tag);
        v.extend_from_slice(payload);
        v
    }

    fn data_atom(data_type: u32, value: &[u8]) -> Vec<u8> {
        let mut p = data_type.to_be_bytes().to_vec();
        p.extend_from_slice(&[0; 4]);
        p.extend_from_slice(value);
        mkbox(b"data", &p)
    }

    fn run(
        movie: &mut MovieContext,
        track: Option<&mut TrackContext>,
        data: Vec<u8>,
        handler: fn(&mut MovieContext, Option<&mut TrackContext>, &mut BoxReader<'_>) -> Result<()>,
    ) {
        let len = data.len() as u64;
        let mut f = MemFile::new(data);
        let header = match BoxHeader::read(&mut f, len).unwrap() {
            Header::Box(h) => h,
            h => panic!("{:?}", h),
        };
        let mut reader = BoxReader::new(&mut f, header, 1);
        handler(movie, track, &mut reader).unwrap();
    }

    #[test]
    fn ilst_items() {
        let mut m = movie();
        m.in_ilst = true;
        run(&mut m, None, mkbox(b"\xa9nam", &data_atom(1, b"A Title")), read_metadata_item);
        run(&mut m, None, mkbox(b"tmpo", &data_atom(21, &[0, 120])), read_metadata_item);
        run(&mut m, None, mkbox(b"trkn", &data_atom(0, &[0, 0, 0, 3, 0, 12, 0, 0])), read_metadata_item);
        run(&mut m, None, mkbox(b"covr", &data_atom(14, &[0x89, b'P', b'N', b'G'])), read_metadata_item);
        assert_eq!(m.metadata.get_str("title"), Some("A Title"));
        // not a known tag, no keys.
        assert!(m.metadata.get("tmpo").is_none());
        assert_eq!(m.metadata.get_str("track"), Some("3/12"));
        let cover = m.metadata.get("cover").unwrap();
        assert_eq!(cover.value, MetaValue::Bytes(vec![0x89, b'P', b'N', b'G']));
        assert_eq!(cover.attr("mime"), Some("image/png"));
    }

    #[test]
    fn keys_name_ilst_items() {
        let mut m = movie();
        let mut keys = vec![0, 0, 0, 0, 0, 0, 0, 2];
        for name in &[&b"com.apple.quicktime.title"[..], &b"com.example.rating"[..]] {
            keys.extend_from_slice(&(name.len() as u32 + 8).to_be_bytes());
            keys.extend_from_slice(b"mdta");
            keys.extend_from_slice(name);
        }
        run(&mut m, None, mkbox(b"keys", &keys), read_keys);
        assert_eq!(m.keys.len(), 2);

        m.in_ilst = true;
        run(&mut m, None, mkbox(&[0, 0, 0, 1], &data_atom(1, b"Keyed")), read_metadata_item);
        run(&mut m, None, mkbox(&[0, 0, 0, 2], &data_atom(23, &1.5f32.to_bits().to_be_bytes())), read_metadata_item);
        run(&mut m, None, mkbox(&[0, 0, 0, 3], &data_atom(1, b"nope")), read_metadata_item);
        assert_eq!(m.metadata.get_str("com.apple.quicktime.title"), Some("Keyed"));
        assert_eq!(m.metadata.get("com.example.rating").unwrap().value, MetaValue::Float(1.5));
        assert_eq!(m.metadata.len(), 2);
    }

    #[test]
    fn quicktime_udta_string_goes_to_track() {
        let mut m = movie();
        let mut track = TrackContext::new(0);
        // 'e' = 5, 'n' = 14, 'g' = 7
        let eng: u16 = (5 << 10) | (14 << 5) | 7;
        let mut p = 5u16.to_be_bytes().to_vec();
        p.extend_from_slice(&eng.to_be_bytes());
        p.extend_from_slice(b"hello");
        run(&mut m, Some(&mut track), mkbox(b"\xa9cmt", &p), read_metadata_item);
        let tag = track.metadata.get("comment").unwrap();
        assert_eq!(tag.value.as_str(), Some("hello"));
        assert_eq!(tag.attr("language"), Some("eng"));
        assert!(m.metadata.is_empty());
    }

    #[test]
    fn mac_language_string_is_mac_roman() {
        let mut m = movie();
        let mut track = TrackContext::new(0);
        // Mac language code 0 is English.
        let mut p = 4u16.to_be_bytes().to_vec();
        p.extend_from_slice(&0u16.to_be_bytes());
        p.extend_from_slice(b"Caf\x8e");
        run(&mut m, Some(&mut track), mkbox(b"\xa9cmt", &p), read_metadata_item);
        let tag = track.metadata.get("comment").unwrap();
        assert_eq!(tag.value.as_str(), Some("Caf\u{e9}"));
        assert_eq!(tag.attr("language"), Some("eng"));
    }

    #[test]
    fn nero_chapters() {
        let mut p = vec![1, 0, 0, 0, 0, 0, 0, 0, 2];
        p.extend_from_slice(&0u64.to_be_bytes());
        p.push(5);
        p.extend_from_slice(b"Intro");
        p.extend_from_slice(&600_000_000u64.to_be_bytes());
        p.push(4);
        p.extend_from_slice(b"Main");
        let mut m = movie();
        run(&mut m, None, mkbox(b"chpl", &p), read_chpl);
        assert_eq!(m.chapters.len(), 2);
        assert_eq!(m.chapters[0].title, "Intro");
        assert_eq!(m.chapters[0].end, Some(60_000_000));
        assert_eq!(m.chapters[1].start, 60_000_000);
        assert_eq!(m.chapters[1].end, None);
    }
}
