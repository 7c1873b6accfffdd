//! State of the header walk.
use std::path::PathBuf;

use crate::boxes::trex::TrackExtendsBox;
use crate::chapters::Chapter;
use crate::config::ReaderOptions;
use crate::dataref::DataRefResolver;
use crate::error::Error;
use crate::fragment::FragmentContext;
use crate::metadata::Metadata;
use crate::sample_info::DataRefHandle;
use crate::serialize::ReadBytes;
use crate::track::{Track, TrackContext};

/// Everything the box handlers know about the movie.
pub(crate) struct MovieContext {
    pub options:       ReaderOptions,
    pub timescale:     u32,
    pub duration:      u64,
    pub found_moov:    bool,
    pub found_mdat:    bool,
    /// Not a QuickTime file (major brand other than `qt  `).
    pub isom:          bool,
    /// Set while walking an `ilst`.
    pub in_ilst:       bool,
    /// Key names from a `keys` box, for `ilst` items that use an index.
    pub keys:          Vec<String>,
    pub trex:          Vec<TrackExtendsBox>,
    pub fragment:      FragmentContext,
    pub tracks:        Vec<Track>,
    pub metadata:      Metadata,
    pub chapters:      Vec<Chapter>,
    pub chapter_track: Option<u32>,
    pub resolver:      Box<dyn DataRefResolver>,
    pub src_path:      Option<PathBuf>,
    /// Opened external data references.
    pub externals:     Vec<Box<dyn ReadBytes>>,
    /// Where the header walk stopped early on a streamed source.
    pub resume_at:     Option<u64>,
}

impl MovieContext {
    pub fn new(options: ReaderOptions, resolver: Box<dyn DataRefResolver>, src_path: Option<PathBuf>) -> MovieContext {
        MovieContext {
            options,
            timescale: 0,
            duration: 0,
            found_moov: false,
            found_mdat: false,
            isom: false,
            in_ilst: false,
            keys: Vec::new(),
            trex: Vec::new(),
            fragment: FragmentContext::default(),
            tracks: Vec::new(),
            metadata: Metadata::default(),
            chapters: Vec::new(),
            chapter_track: None,
            resolver,
            src_path,
            externals: Vec::new(),
            resume_at: None,
        }
    }

    // Data source for each sample description of the track.
    fn resolve_sources(&mut self, ctx: &TrackContext) -> Vec<DataRefHandle> {
        let drefs = match ctx.drefs.as_ref() {
            Some(drefs) => drefs,
            None => return vec![DataRefHandle::Primary; ctx.dref_ids.len()],
        };
        let mut sources = Vec::with_capacity(ctx.dref_ids.len());
        for &id in &ctx.dref_ids {
            let dref = match drefs.get(id.saturating_sub(1) as usize) {
                Some(dref) => dref,
                None => {
                    log::warn!("track {}: data reference {} does not exist", ctx.track_id, id);
                    sources.push(DataRefHandle::Unresolved);
                    continue;
                },
            };
            let alias = match dref.alias.as_ref() {
                Some(alias) if alias.path.is_some() => alias,
                _ => {
                    sources.push(DataRefHandle::Primary);
                    continue;
                },
            };
            if !self.options.follow_external_refs {
                log::info!("track {}: not following data reference {:?}", ctx.track_id, alias.path);
                sources.push(DataRefHandle::Unresolved);
                continue;
            }
            match self.resolver.open(self.src_path.as_deref(), alias) {
                Some(file) => {
                    self.externals.push(file);
                    sources.push(DataRefHandle::External(self.externals.len() - 1));
                },
                None => {
                    log::warn!(
                        "track {}: error opening alias: path {:?}, dir {:?}, filename {:?}, volume {:?}, nlvl_from {}, nlvl_to {}",
                        ctx.track_id,
                        alias.path,
                        alias.dir,
                        alias.filename,
                        alias.volume,
                        alias.nlvl_from,
                        alias.nlvl_to
                    );
                    sources.push(DataRefHandle::Unresolved);
                },
            }
        }
        sources
    }

    /// End of a `trak` box: build the index and add the track.
    ///
    /// A track with inconsistent tables is dropped; the others are not affected.
    pub fn finish_track(&mut self, ctx: TrackContext) -> crate::error::Result<()> {
        let sources = self.resolve_sources(&ctx);
        let id = ctx.track_id;
        match Track::build(ctx, self.timescale, sources) {
            Ok(track) => {
                if self.tracks.iter().any(|t| t.id == track.id) {
                    log::warn!("track {}: duplicate track id", track.id);
                }
                self.tracks.push(track);
                Ok(())
            },
            Err(e @ Error::InconsistentTrackTables { .. }) => {
                log::error!("track {}: dropped: {}", id, e);
                Ok(())
            },
            Err(e) => Err(e),
        }
    }
}
