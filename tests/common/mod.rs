//! Builds small movies in memory.
#![allow(dead_code)]

pub fn mkbox(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = (payload.len() as u32 + 8).to_be_bytes().to_vec();
    v.extend_from_slice(tag);
    v.extend_from_slice(payload);
    v
}

pub fn full_box(tag: &[u8; 4], version: u8, flags: u32, payload: &[u8]) -> Vec<u8> {
    let mut p = ((version as u32) << 24 | flags).to_be_bytes().to_vec();
    p.extend_from_slice(payload);
    mkbox(tag, &p)
}

pub fn cat(parts: &[Vec<u8>]) -> Vec<u8> {
    parts.concat()
}

fn be32(v: &[u32]) -> Vec<u8> {
    v.iter().flat_map(|n| n.to_be_bytes().to_vec()).collect()
}

pub fn ftyp() -> Vec<u8> {
    mkbox(b"ftyp", b"isom\x00\x00\x02\x00isom")
}

pub fn mvhd(timescale: u32, duration: u32) -> Vec<u8> {
    full_box(b"mvhd", 0, 0, &be32(&[0, 0, timescale, duration]))
}

pub fn tkhd(track_id: u32) -> Vec<u8> {
    let mut p = be32(&[0, 0, track_id, 0, 0]);
    p.extend_from_slice(&[0; 52]);
    p.extend_from_slice(&be32(&[320 << 16, 240 << 16]));
    full_box(b"tkhd", 0, 0, &p)
}

pub fn mdhd(timescale: u32, duration: u32) -> Vec<u8> {
    let mut p = be32(&[0, 0, timescale, duration]);
    // 'und'
    p.extend_from_slice(&[0x55, 0xc4, 0, 0]);
    full_box(b"mdhd", 0, 0, &p)
}

pub fn hdlr(handler: &[u8; 4]) -> Vec<u8> {
    let mut p = vec![0; 4];
    p.extend_from_slice(handler);
    p.extend_from_slice(&[0; 13]);
    full_box(b"hdlr", 0, 0, &p)
}

fn sample_entry(format: &[u8; 4], handler: &[u8; 4]) -> Vec<u8> {
    // reserved, data reference index 1.
    let mut p = vec![0, 0, 0, 0, 0, 0, 0, 1];
    match handler {
        b"vide" => {
            p.extend_from_slice(&[0; 16]);
            p.extend_from_slice(&[1, 64, 0, 240]);
            p.extend_from_slice(&[0; 50]);
        },
        b"soun" => {
            p.extend_from_slice(&[0; 8]);
            // 2 channels, 16 bits.
            p.extend_from_slice(&[0, 2, 0, 16, 0, 0, 0, 0]);
            p.extend_from_slice(&be32(&[48000 << 16]));
        },
        b"tmcd" => {
            // reserved, flags, time scale, frame duration, frames per second.
            p.extend_from_slice(&be32(&[0, 0, 2500, 100]));
            p.extend_from_slice(&[25, 0, 0, 0]);
        },
        _ => {},
    }
    mkbox(format, &p)
}

pub fn stsd(format: &[u8; 4], handler: &[u8; 4]) -> Vec<u8> {
    let mut p = be32(&[1]);
    p.extend(sample_entry(format, handler));
    full_box(b"stsd", 0, 0, &p)
}

pub fn stts(runs: &[(u32, u32)]) -> Vec<u8> {
    let mut v = vec![runs.len() as u32];
    for &(count, delta) in runs {
        v.push(count);
        v.push(delta);
    }
    full_box(b"stts", 0, 0, &be32(&v))
}

pub fn ctts(runs: &[(u32, i32)]) -> Vec<u8> {
    let mut v = vec![runs.len() as u32];
    for &(count, offset) in runs {
        v.push(count);
        v.push(offset as u32);
    }
    full_box(b"ctts", 0, 0, &be32(&v))
}

pub fn stsc(entries: &[(u32, u32)]) -> Vec<u8> {
    let mut v = vec![entries.len() as u32];
    for &(first_chunk, samples_per_chunk) in entries {
        v.extend_from_slice(&[first_chunk, samples_per_chunk, 1]);
    }
    full_box(b"stsc", 0, 0, &be32(&v))
}

pub fn stsz(sizes: &[u32]) -> Vec<u8> {
    let mut v = vec![0, sizes.len() as u32];
    v.extend_from_slice(sizes);
    full_box(b"stsz", 0, 0, &be32(&v))
}

pub fn stco(offsets: &[u32]) -> Vec<u8> {
    let mut v = vec![offsets.len() as u32];
    v.extend_from_slice(offsets);
    full_box(b"stco", 0, 0, &be32(&v))
}

pub fn stss(samples: &[u32]) -> Vec<u8> {
    let mut v = vec![samples.len() as u32];
    v.extend_from_slice(samples);
    full_box(b"stss", 0, 0, &be32(&v))
}

pub fn elst(entries: &[(u32, i32)]) -> Vec<u8> {
    let mut v = vec![entries.len() as u32];
    for &(duration, media_time) in entries {
        v.extend_from_slice(&[duration, media_time as u32, 0x10000]);
    }
    let elst = full_box(b"elst", 0, 0, &be32(&v));
    mkbox(b"edts", &elst)
}

/// A Macintosh alias data reference to `filename`, one directory level
/// up and down from the movie.
pub fn alias_dref(volume: &str, filename: &str, path: &str) -> Vec<u8> {
    let mut p = vec![0; 10];
    let mut vol = vec![volume.len() as u8];
    vol.extend_from_slice(volume.as_bytes());
    vol.resize(28, 0);
    p.extend(vol);
    p.extend_from_slice(&[0; 12]);
    let mut name = vec![filename.len() as u8];
    name.extend_from_slice(filename.as_bytes());
    name.resize(64, 0);
    p.extend(name);
    p.extend_from_slice(&[0; 16]);
    // nlvl_from, nlvl_to
    p.extend_from_slice(&[0, 1, 0, 1]);
    p.extend_from_slice(&[0; 16]);
    // absolute path record
    let mut path = path.as_bytes().to_vec();
    p.extend_from_slice(&2u16.to_be_bytes());
    p.extend_from_slice(&(path.len() as u16).to_be_bytes());
    if path.len() % 2 == 1 {
        path.push(0);
    }
    p.extend(path);
    p.extend_from_slice(&[0xff, 0xff, 0, 0]);

    let alis = full_box(b"alis", 0, 0, &p);
    let mut d = be32(&[1]);
    d.extend(alis);
    mkbox(b"dinf", &full_box(b"dref", 0, 0, &d))
}

/// Tables of one track.
#[derive(Clone)]
pub struct TrackDef {
    pub id:        u32,
    pub handler:   [u8; 4],
    pub format:    [u8; 4],
    pub timescale: u32,
    pub stts:      Vec<(u32, u32)>,
    pub stsc:      Vec<(u32, u32)>,
    pub sizes:     Vec<u32>,
    pub chunks:    Vec<u32>,
    pub stss:      Option<Vec<u32>>,
    pub ctts:      Option<Vec<(u32, i32)>>,
    pub edits:     Option<Vec<(u32, i32)>>,
    /// Extra boxes in the `minf` (a `dinf`, say).
    pub minf:      Vec<u8>,
    /// Extra boxes in the `trak` (a `tref`, say).
    pub trak:      Vec<u8>,
}

impl TrackDef {
    pub fn new(id: u32, handler: &[u8; 4], format: &[u8; 4], timescale: u32) -> TrackDef {
        TrackDef {
            id,
            handler: *handler,
            format: *format,
            timescale,
            stts: Vec::new(),
            stsc: Vec::new(),
            sizes: Vec::new(),
            chunks: Vec::new(),
            stss: None,
            ctts: None,
            edits: None,
            minf: Vec::new(),
            trak: Vec::new(),
        }
    }
}

pub fn trak(def: &TrackDef) -> Vec<u8> {
    let mut stbl = cat(&[
        stsd(&def.format, &def.handler),
        stts(&def.stts),
        stsc(&def.stsc),
        stsz(&def.sizes),
        stco(&def.chunks),
    ]);
    if let Some(s) = def.stss.as_ref() {
        stbl.extend(stss(s));
    }
    if let Some(c) = def.ctts.as_ref() {
        stbl.extend(ctts(c));
    }
    let duration: u32 = def.stts.iter().map(|(c, d)| c * d).sum();
    let mut minf = def.minf.clone();
    minf.extend(mkbox(b"stbl", &stbl));
    let mdia = cat(&[
        mdhd(def.timescale, duration),
        hdlr(&def.handler),
        mkbox(b"minf", &minf),
    ]);
    let mut t = tkhd(def.id);
    if let Some(e) = def.edits.as_ref() {
        t.extend(elst(e));
    }
    t.extend(mkbox(b"mdia", &mdia));
    t.extend_from_slice(&def.trak);
    mkbox(b"trak", &t)
}

pub fn moov(timescale: u32, duration: u32, tracks: &[TrackDef], extra: &[u8]) -> Vec<u8> {
    let mut p = mvhd(timescale, duration);
    for t in tracks {
        p.extend(trak(t));
    }
    p.extend_from_slice(extra);
    mkbox(b"moov", &p)
}

/// Offset of the first payload byte of an mdat that follows `ftyp()`.
pub const MDAT_DATA: u32 = 20 + 8;

/// `ftyp`, `mdat` with `data`, then the movie box.
pub fn movie_file(data: &[u8], moov: Vec<u8>) -> Vec<u8> {
    cat(&[ftyp(), mkbox(b"mdat", data), moov])
}
