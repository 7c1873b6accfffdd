//! Common types used while parsing boxes.
//!
//! FourCC, IsoLanguageCode, MacTime, MediaType, and a few integer
//! helpers for time base arithmetic.
//!
use std::fmt::{Debug, Display};
use std::io;

use chrono::{TimeZone, Utc};
use serde::Serialize;

use crate::serialize::{FromBytes, ReadBytes};

/// FourCC is the 4-byte name of any box. Usually this is four bytes
/// of ASCII characters, but it could be anything.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FourCC(pub u32);

impl FourCC {
    pub const fn new(tag: &[u8; 4]) -> FourCC {
        FourCC(u32::from_be_bytes(*tag))
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl FromBytes for FourCC {
    fn from_bytes<R: ReadBytes + ?Sized>(stream: &mut R) -> io::Result<FourCC> {
        Ok(FourCC(u32::from_bytes(stream)?))
    }
    fn min_size() -> usize {
        4
    }
}

fn fmt_fourcc(fourcc: u32) -> String {
    let c = fourcc.to_be_bytes();
    // 0xa9 is the copyright sign that starts the iTunes tags.
    if c.iter().any(|&b| (b < 32 || b > 126) && b != 0xa9) {
        return format!("0x{:08x}", fourcc);
    }
    c.iter()
        .map(|&b| if b == 0xa9 { '©' } else { b as char })
        .collect()
}

impl Display for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", fmt_fourcc(self.0))
    }
}

impl Debug for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "\"{}\"", fmt_fourcc(self.0))
    }
}

impl Serialize for FourCC {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&fmt_fourcc(self.0))
    }
}

/// A 16-bit value containing 3 5-bit values that are interpreted as letters,
/// so that we get a 3-character county code. Such as "eng", "ger", "dut" etc.
///
/// Values below 0x400 are old Macintosh language codes.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct IsoLanguageCode(pub u16);

// Macintosh language codes 0..=11, by index.
const MAC_LANGUAGES: [&str; 12] = [
    "eng", "fra", "ger", "ita", "dut", "swe", "spa", "dan", "por", "nor", "heb", "jpn",
];

impl IsoLanguageCode {
    /// Decode to an ISO 639-2/T code, if this is a valid language code.
    pub fn to_iso639(&self) -> Option<String> {
        let code = self.0;
        if code < 0x400 {
            let lang = MAC_LANGUAGES.get(code as usize).copied().unwrap_or("und");
            return Some(lang.to_string());
        }
        if code == 0x7fff {
            return None;
        }
        let mut s = String::with_capacity(3);
        for shift in &[10, 5, 0] {
            let c = ((code >> shift) & 0x1f) as u8;
            if c == 0 || c > 26 {
                return None;
            }
            s.push((c + 0x60) as char);
        }
        Some(s)
    }
}

impl FromBytes for IsoLanguageCode {
    fn from_bytes<R: ReadBytes + ?Sized>(stream: &mut R) -> io::Result<IsoLanguageCode> {
        Ok(IsoLanguageCode(u16::from_bytes(stream)?))
    }
    fn min_size() -> usize {
        2
    }
}

impl Display for IsoLanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.to_iso639() {
            Some(lang) => write!(f, "{}", lang),
            None => write!(f, "und"),
        }
    }
}

impl Debug for IsoLanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

/// Time is measured in seconds since 01-01-1904 00:00:00
#[derive(Clone, Copy, Default)]
pub struct MacTime(pub u64);

// TZ=UTC date +%s -d "1904-01-01 00:00:00"
const OFFSET_TO_UNIX: i64 = 2082844800;

impl MacTime {
    pub fn to_unixtime(&self) -> i64 {
        (self.0 as i64).saturating_sub(OFFSET_TO_UNIX)
    }

    /// Formatted as `YYYY-MM-DD HH:MM:SS` in UTC. `None` for a zero timestamp.
    pub fn to_utc_string(&self) -> Option<String> {
        if self.0 == 0 {
            return None;
        }
        Utc.timestamp_opt(self.to_unixtime(), 0)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

impl Debug for MacTime {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.to_utc_string() {
            Some(s) => write!(f, "{:?}", s),
            None => write!(f, "-"),
        }
    }
}

/// What kind of media a track carries, from the `hdlr` box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Audio,
    Subtitle,
    Data,
}

impl Default for MediaType {
    fn default() -> MediaType {
        MediaType::Data
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            MediaType::Video => "video",
            MediaType::Audio => "audio",
            MediaType::Subtitle => "subtitle",
            MediaType::Data => "data",
        };
        write!(f, "{}", s)
    }
}

/// Decode a string in the classic Mac OS Roman encoding.
pub(crate) fn decode_mac(data: &[u8]) -> String {
    let (text, _) = encoding_rs::MACINTOSH.decode_without_bom_handling(data);
    text.into_owned()
}

/// `a * b / c`, rounded to the nearest integer (halfway away from zero).
pub fn rescale(a: i64, b: i64, c: i64) -> i64 {
    if c == 0 {
        return 0;
    }
    let n = a as i128 * b as i128;
    let c = c as i128;
    let r = if (n < 0) != (c < 0) {
        (n - c / 2) / c
    } else {
        (n + c / 2) / c
    };
    r.max(i64::MIN as i128).min(i64::MAX as i128) as i64
}

pub fn gcd(a: u64, b: u64) -> u64 {
    let (mut a, mut b) = (a, b);
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Reduce a fraction. `None` if the denominator is zero.
pub fn reduce(num: u64, den: u64) -> Option<(u64, u64)> {
    if den == 0 {
        return None;
    }
    let g = gcd(num, den).max(1);
    Some((num / g, den / g))
}
