use std::io::{self, BufWriter, Write};

use anyhow::{anyhow, Result};
use clap;
use serde::Serialize;
use structopt::StructOpt;

use mp4demux::debug;
use mp4demux::io::Mp4File;
use mp4demux::{Chapter, Demuxer, Metadata, ReaderOptions, Track};

#[derive(StructOpt, Debug)]
#[structopt(setting = clap::AppSettings::VersionlessSubcommands)]
pub struct MainOpts {
    #[structopt(long)]
    /// Log options (like RUST_LOG; trace, debug, info etc)
    pub log:    Option<String>,
    #[structopt(long)]
    /// Reader options, in a JSON file.
    pub config: Option<String>,
    #[structopt(subcommand)]
    pub cmd:    Command,
}

#[derive(StructOpt, Debug)]
#[structopt(rename_all = "kebab-case")]
pub enum Command {
    #[structopt(display_order = 1)]
    /// Tracks and metadata.
    Info(InfoOpts),

    #[structopt(display_order = 2)]
    /// Dump the box tree.
    Boxes(BoxesOpts),

    #[structopt(display_order = 3)]
    /// Dump the sample index of a track.
    Samples(SamplesOpts),

    #[structopt(display_order = 4)]
    /// List packets in read order.
    Packets(PacketsOpts),

    #[structopt(display_order = 5)]
    /// Write the raw samples of a track to stdout.
    Extract(ExtractOpts),
}

#[derive(StructOpt, Debug)]
pub struct InfoOpts {
    #[structopt(short, long)]
    /// Select track.
    pub track: Option<u32>,

    #[structopt(short, long)]
    /// Output in JSON
    pub json: bool,

    /// Input filename.
    pub input: String,
}

#[derive(StructOpt, Debug)]
pub struct BoxesOpts {
    #[structopt(long, default_value = "64")]
    /// Maximum depth.
    pub depth: usize,

    /// Input filename.
    pub input: String,
}

#[derive(StructOpt, Debug)]
pub struct SamplesOpts {
    #[structopt(short, long)]
    /// Select a track.
    pub track: u32,

    #[structopt(long, default_value = "1")]
    /// First sample to dump.
    pub from: usize,

    #[structopt(long, default_value = "0")]
    /// Last sample to dump.
    pub to: usize,

    /// Input filename.
    pub input: String,
}

#[derive(StructOpt, Debug)]
pub struct PacketsOpts {
    #[structopt(long, default_value = "0")]
    /// Stop after this many packets (0: no limit).
    pub limit: usize,

    /// Input filename.
    pub input: String,
}

#[derive(StructOpt, Debug)]
pub struct ExtractOpts {
    #[structopt(short, long)]
    /// Select a track.
    pub track: u32,

    /// Input filename.
    pub input: String,
}

#[derive(Serialize)]
struct Info<'a> {
    timescale: u32,
    duration:  u64,
    metadata:  &'a Metadata,
    chapters:  &'a [Chapter],
    tracks:    Vec<&'a Track>,
}

fn main() -> Result<()> {
    let opts = MainOpts::from_args();

    let mut builder = env_logger::Builder::new();
    if let Some(ref log_opts) = opts.log {
        builder.parse_filters(log_opts);
    } else if let Ok(ref log_opts) = std::env::var("RUST_LOG") {
        builder.parse_filters(log_opts);
    } else {
        builder.parse_filters("info");
    }
    builder.init();

    let options = match opts.config {
        Some(ref path) => ReaderOptions::from_json_file(path)?,
        None => ReaderOptions::default(),
    };

    match opts.cmd {
        Command::Info(opts) => info(opts, options),
        Command::Boxes(opts) => boxes(opts),
        Command::Samples(opts) => samples(opts, options),
        Command::Packets(opts) => packets(opts, options),
        Command::Extract(opts) => extract(opts, options),
    }
}

fn short(track: &Track) {
    println!(
        "{}. type [{}], codec {}, timescale {}, duration {}, frames {}, lang {}{}",
        track.id,
        track.media_type,
        track.codec,
        track.timescale,
        track.duration,
        track.nb_frames,
        track.language.as_deref().unwrap_or("und"),
        if track.discard { ", discard" } else { "" },
    );
}

fn info(opts: InfoOpts, options: ReaderOptions) -> Result<()> {
    let demuxer = Demuxer::open_with(&opts.input, options)?;

    let tracks: Vec<&Track> = match opts.track {
        Some(id) => match demuxer.track(id) {
            Some(track) => vec![track],
            None => return Err(anyhow!("info: track id {} not found", id)),
        },
        None => demuxer.tracks().iter().collect(),
    };

    if opts.json {
        let info = Info {
            timescale: demuxer.timescale(),
            duration: demuxer.duration(),
            metadata: demuxer.metadata(),
            chapters: demuxer.chapters(),
            tracks,
        };
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    for tag in demuxer.metadata().iter() {
        println!("{}: {}", tag.key, tag.value);
    }
    for chapter in demuxer.chapters() {
        println!("chapter {}: {} {:?} {}", chapter.id, chapter.start, chapter.end, chapter.title);
    }
    for track in tracks {
        short(track);
    }
    Ok(())
}

fn boxes(opts: BoxesOpts) -> Result<()> {
    let mut reader = Mp4File::open(&opts.input)?;
    let stdout = io::stdout();
    let mut handle = BufWriter::with_capacity(128000, stdout.lock());
    debug::dump_boxes(&mut reader, &mut handle, opts.depth)?;
    handle.flush()?;
    Ok(())
}

fn samples(opts: SamplesOpts, options: ReaderOptions) -> Result<()> {
    let demuxer = Demuxer::open_with(&opts.input, options)?;
    let track = match demuxer.track(opts.track) {
        Some(track) => track,
        None => return Err(anyhow!("samples: track id {} not found", opts.track)),
    };
    let stdout = io::stdout();
    let mut handle = BufWriter::with_capacity(128000, stdout.lock());
    debug::dump_track_samples(track, &mut handle, opts.from, opts.to)?;
    handle.flush()?;
    Ok(())
}

fn packets(opts: PacketsOpts, options: ReaderOptions) -> Result<()> {
    let mut demuxer = Demuxer::open_with(&opts.input, options)?;
    let stdout = io::stdout();
    let mut handle = BufWriter::with_capacity(128000, stdout.lock());

    let mut count = 0;
    while let Some(pkt) = demuxer.read_packet()? {
        writeln!(
            handle,
            "track {} dts {} pts {} duration {} size {} pos {}{}",
            pkt.track_id,
            pkt.dts,
            pkt.pts,
            pkt.duration,
            pkt.data.len(),
            pkt.pos,
            if pkt.is_sync { " sync" } else { "" }
        )?;
        count += 1;
        if opts.limit > 0 && count >= opts.limit {
            break;
        }
    }
    handle.flush()?;
    Ok(())
}

fn extract(opts: ExtractOpts, options: ReaderOptions) -> Result<()> {
    let mut demuxer = Demuxer::open_with(&opts.input, options)?;
    let count = match demuxer.track(opts.track) {
        Some(track) => track.samples().len(),
        None => return Err(anyhow!("extract: track id {} not found", opts.track)),
    };

    let stdout = io::stdout();
    let mut handle = BufWriter::with_capacity(128000, stdout.lock());
    for n in 0..count {
        let data = demuxer.read_sample(opts.track, n)?;
        handle.write_all(&data)?;
    }
    handle.flush()?;
    Ok(())
}
