//! Key/value metadata of a movie or a track.
//!
//! Values are typed (string, integer, float, raw bytes) and can carry
//! attributes, such as the language of a string or the mime type of
//! cover art.
use serde::ser::{Serialize, SerializeMap, Serializer};

#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    String(String),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetaValue::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl std::fmt::Display for MetaValue {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            MetaValue::String(s) => write!(f, "{}", s),
            MetaValue::Int(n) => write!(f, "{}", n),
            MetaValue::Float(n) => write!(f, "{}", n),
            MetaValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

// Raw bytes (cover art) are not dumped into JSON, only their size.
impl Serialize for MetaValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetaValue::String(s) => serializer.serialize_str(s),
            MetaValue::Int(n) => serializer.serialize_i64(*n),
            MetaValue::Float(n) => serializer.serialize_f64(*n),
            MetaValue::Bytes(b) => serializer.serialize_str(&format!("<{} bytes>", b.len())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetaTag {
    pub key:   String,
    pub value: MetaValue,
    pub attrs: Vec<(String, String)>,
}

impl MetaTag {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Ordered set of tags. Setting an existing key replaces its value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    tags: Vec<MetaTag>,
}

impl Metadata {
    pub fn set(&mut self, key: &str, value: MetaValue) -> &mut MetaTag {
        match self.tags.iter().position(|t| t.key == key) {
            Some(idx) => {
                let tag = &mut self.tags[idx];
                tag.value = value;
                tag.attrs.clear();
                tag
            },
            None => {
                self.tags.push(MetaTag {
                    key: key.to_string(),
                    value,
                    attrs: Vec::new(),
                });
                let last = self.tags.len() - 1;
                &mut self.tags[last]
            },
        }
    }

    pub fn set_str(&mut self, key: &str, value: impl Into<String>) {
        self.set(key, MetaValue::String(value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&MetaTag> {
        self.tags.iter().find(|t| t.key == key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|t| t.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetaTag> {
        self.tags.iter()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tags.len()))?;
        for tag in &self.tags {
            map.serialize_entry(&tag.key, &tag.value)?;
        }
        map.end()
    }
}
