//! Opening the files that alias data references point to.
use std::path::{Path, PathBuf};

use crate::boxes::dref::AliasRecord;
use crate::io::Mp4File;
use crate::serialize::ReadBytes;

/// Opens the target of an alias data reference.
pub trait DataRefResolver {
    /// `src` is the path of the file with the movie header, if known.
    fn open(&self, src: Option<&Path>, alias: &AliasRecord) -> Option<Box<dyn ReadBytes>>;
}

/// Resolver that looks for the target on the local filesystem.
///
/// Only paths relative to the movie are tried. The absolute path of the
/// alias is never opened as is.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsResolver;

impl FsResolver {
    /// Candidate paths, in the order they are tried.
    pub fn candidates(src: &Path, alias: &AliasRecord) -> Vec<PathBuf> {
        let dir = src.parent().unwrap_or_else(|| Path::new(""));
        let mut v = Vec::new();

        if alias.nlvl_from > 0 && alias.nlvl_to > 0 {
            if let Some(path) = alias.path.as_ref() {
                let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
                let keep = alias.nlvl_to as usize;
                if parts.len() >= keep {
                    let mut p = dir.to_path_buf();
                    for _ in 1..alias.nlvl_from {
                        p.push("..");
                    }
                    for part in &parts[parts.len() - keep..] {
                        p.push(part);
                    }
                    v.push(p);
                }
            }
        }
        if !alias.filename.is_empty() && !alias.filename.contains('/') {
            v.push(dir.join(&alias.filename));
        }
        v
    }
}

impl DataRefResolver for FsResolver {
    fn open(&self, src: Option<&Path>, alias: &AliasRecord) -> Option<Box<dyn ReadBytes>> {
        let src = src?;
        for path in FsResolver::candidates(src, alias) {
            match Mp4File::open(&path) {
                Ok(file) => {
                    log::debug!("data reference: opened {:?}", path);
                    return Some(Box::new(file));
                },
                Err(e) => log::debug!("data reference: {:?}: {}", path, e),
            }
        }
        None
    }
}
