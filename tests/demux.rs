mod common;

use assert_matches::assert_matches;

use common::*;
use mp4demux::io::MemFile;
use mp4demux::types::MediaType;
use mp4demux::{DataRefHandle, Demuxer, Error, Packet, ReaderOptions, SeekFlags};

fn open(data: Vec<u8>) -> Demuxer {
    Demuxer::from_source(MemFile::new(data), ReaderOptions::default()).unwrap()
}

fn read_all(demuxer: &mut Demuxer) -> Vec<Packet> {
    let mut packets = Vec::new();
    while let Some(pkt) = demuxer.read_packet().unwrap() {
        packets.push(pkt);
    }
    packets
}

// Video at 1000 Hz, audio at 8000 Hz, both 10 samples per second, two
// chunks each, interleaved V A V A in the mdat.
fn av_movie() -> Vec<u8> {
    let mut video = TrackDef::new(1, b"vide", b"avc1", 1000);
    video.stts = vec![(4, 100)];
    video.stsc = vec![(1, 2)];
    video.sizes = vec![4; 4];
    video.chunks = vec![MDAT_DATA, MDAT_DATA + 16];
    video.stss = Some(vec![1, 3]);

    let mut audio = TrackDef::new(2, b"soun", b"mp4a", 8000);
    audio.stts = vec![(4, 800)];
    audio.stsc = vec![(1, 2)];
    audio.sizes = vec![4; 4];
    audio.chunks = vec![MDAT_DATA + 8, MDAT_DATA + 24];

    let mut data = Vec::new();
    for chunk in 0..2u8 {
        for n in 0..2u8 {
            data.extend_from_slice(&[0x10 | (chunk * 2 + n); 4]);
        }
        for n in 0..2u8 {
            data.extend_from_slice(&[0x20 | (chunk * 2 + n); 4]);
        }
    }
    movie_file(&data, moov(1000, 400, &[video, audio], &[]))
}

#[test]
fn track_properties() {
    let demuxer = open(av_movie());
    assert_eq!(demuxer.timescale(), 1000);
    assert_eq!(demuxer.duration(), 400);
    assert_eq!(demuxer.metadata().get_str("major_brand"), Some("isom"));
    assert_eq!(demuxer.tracks().len(), 2);

    let video = demuxer.track(1).unwrap();
    assert_eq!(video.media_type, MediaType::Video);
    assert_eq!(video.codec.to_string(), "avc1");
    assert_eq!((video.width, video.height), (320, 240));
    assert_eq!(video.duration, 400);
    assert_eq!(video.nb_frames, 4);
    assert_eq!(video.r_frame_rate, Some((10, 1)));

    let audio = demuxer.track(2).unwrap();
    assert_eq!(audio.media_type, MediaType::Audio);
    let params = audio.audio.as_ref().unwrap();
    assert_eq!((params.channels, params.sample_rate), (2, 48000.0));
    assert_eq!(audio.frame_size, Some(800));
}

#[test]
fn packets_interleave_by_decode_time() {
    let mut demuxer = open(av_movie());
    let packets = read_all(&mut demuxer);
    let order: Vec<(u32, u8)> = packets.iter().map(|p| (p.track_id, p.data[0])).collect();
    assert_eq!(
        order,
        vec![
            (1, 0x10),
            (2, 0x20),
            (1, 0x11),
            (2, 0x21),
            (1, 0x12),
            (2, 0x22),
            (1, 0x13),
            (2, 0x23),
        ]
    );

    let v3 = &packets[6];
    assert_eq!((v3.dts, v3.pts, v3.duration), (300, 300, 100));
    assert_eq!(v3.pos, MDAT_DATA as u64 + 20);
    assert_eq!(v3.track_index, 0);
    assert!(!v3.is_sync);
    assert!(packets[4].is_sync);

    let a3 = &packets[7];
    assert_eq!((a3.dts, a3.duration), (2400, 800));
    assert!(a3.is_sync);
    assert_eq!(a3.data, vec![0x23; 4]);

    assert_matches!(demuxer.read_packet(), Ok(None));
}

#[test]
fn read_single_sample() {
    let mut demuxer = open(av_movie());
    assert_eq!(demuxer.read_sample(2, 1).unwrap(), vec![0x21; 4]);
    assert_matches!(demuxer.read_sample(9, 0), Err(Error::NoSuchTrack(9)));
    assert_matches!(
        demuxer.read_sample(2, 99),
        Err(Error::NoSuchSample { track_id: 2, sample: 99 })
    );
}

#[test]
fn seek_to_sync_samples() {
    let mut video = TrackDef::new(1, b"vide", b"avc1", 1000);
    video.stts = vec![(6, 100)];
    video.stsc = vec![(1, 3)];
    video.sizes = vec![4; 6];
    video.chunks = vec![MDAT_DATA, MDAT_DATA + 12];
    video.stss = Some(vec![1, 4]);
    let data: Vec<u8> = (0..24).collect();
    let mut demuxer = open(movie_file(&data, moov(1000, 600, &[video], &[])));

    let samples = demuxer.track(1).unwrap().samples();
    let distances: Vec<u32> = samples.iter().map(|s| s.distance).collect();
    assert_eq!(distances, vec![0, 1, 2, 0, 1, 2]);

    let back = SeekFlags { backward: true, any: false };
    assert_eq!(demuxer.seek(1, 250, back).unwrap(), 0);
    assert_eq!(demuxer.read_packet().unwrap().unwrap().dts, 0);

    assert_eq!(demuxer.seek(1, 250, SeekFlags::default()).unwrap(), 3);
    let pkt = demuxer.read_packet().unwrap().unwrap();
    assert_eq!((pkt.dts, pkt.is_sync, pkt.data[0]), (300, true, 12));

    let any = SeekFlags { backward: true, any: true };
    assert_eq!(demuxer.seek(1, 250, any).unwrap(), 2);

    assert_matches!(
        demuxer.seek(1, 1000, SeekFlags::default()),
        Err(Error::SeekFailed { track_id: 1, timestamp: 1000 })
    );
}

#[test]
fn seek_moves_other_tracks() {
    let mut demuxer = open(av_movie());
    let back = SeekFlags { backward: true, any: true };
    assert_eq!(demuxer.seek(1, 200, back).unwrap(), 2);
    let packets = read_all(&mut demuxer);
    let order: Vec<(u32, i64)> = packets.iter().map(|p| (p.track_id, p.dts)).collect();
    assert_eq!(order, vec![(1, 200), (2, 1600), (1, 300), (2, 2400)]);
}

#[test]
fn composition_offsets() {
    let mut video = TrackDef::new(1, b"vide", b"avc1", 1000);
    video.stts = vec![(4, 100)];
    video.stsc = vec![(1, 4)];
    video.sizes = vec![2; 4];
    video.chunks = vec![MDAT_DATA];
    video.ctts = Some(vec![(1, 0), (1, 200), (2, -100)]);
    let mut demuxer = open(movie_file(&[0; 8], moov(1000, 400, &[video], &[])));

    let times: Vec<(i64, i64)> = read_all(&mut demuxer).iter().map(|p| (p.dts, p.pts)).collect();
    assert_eq!(times, vec![(-100, 0), (0, 300), (100, 100), (200, 200)]);

    // the composition cursor follows a seek.
    let any = SeekFlags { backward: true, any: true };
    assert_eq!(demuxer.seek(1, 0, any).unwrap(), 1);
    let pkt = demuxer.read_packet().unwrap().unwrap();
    assert_eq!((pkt.dts, pkt.pts), (0, 300));
}

#[test]
fn empty_edit_delays_track() {
    let mut video = TrackDef::new(1, b"vide", b"avc1", 1000);
    video.stts = vec![(2, 100)];
    video.stsc = vec![(1, 2)];
    video.sizes = vec![2; 2];
    video.chunks = vec![MDAT_DATA];
    video.edits = Some(vec![(500, -1), (200, 0)]);
    let demuxer = open(movie_file(&[0; 4], moov(1000, 700, &[video], &[])));

    let dts: Vec<i64> = demuxer.track(1).unwrap().samples().iter().map(|s| s.dts).collect();
    assert_eq!(dts, vec![-500, -400]);
}

#[test]
fn no_movie_box() {
    let data = movie_file(&[0; 16], Vec::new());
    assert_matches!(
        Demuxer::from_source(MemFile::new(data), ReaderOptions::default()),
        Err(Error::NoMovie)
    );
}

#[test]
fn inconsistent_track_is_dropped() {
    let mut good = TrackDef::new(1, b"vide", b"avc1", 1000);
    good.stts = vec![(2, 100)];
    good.stsc = vec![(1, 2)];
    good.sizes = vec![2; 2];
    good.chunks = vec![MDAT_DATA];

    // two chunks of two samples, but only three sizes.
    let mut bad = TrackDef::new(2, b"soun", b"mp4a", 8000);
    bad.stts = vec![(3, 800)];
    bad.stsc = vec![(1, 2)];
    bad.sizes = vec![1; 3];
    bad.chunks = vec![MDAT_DATA, MDAT_DATA + 2];

    let demuxer = open(movie_file(&[0; 4], moov(1000, 200, &[good, bad.clone()], &[])));
    let ids: Vec<u32> = demuxer.tracks().iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1]);

    assert_matches!(
        Demuxer::from_source(
            MemFile::new(movie_file(&[0; 4], moov(1000, 200, &[bad], &[]))),
            ReaderOptions::default()
        ),
        Err(Error::NoTracks)
    );
}

#[test]
fn external_data_reference() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ext.dat"), b"AAAABBBB").unwrap();

    let mut video = TrackDef::new(1, b"vide", b"avc1", 1000);
    video.stts = vec![(2, 100)];
    video.stsc = vec![(1, 2)];
    video.sizes = vec![4; 2];
    video.chunks = vec![0];
    video.minf = alias_dref("Media", "ext.dat", "Media:clips:ext.dat");
    let file = movie_file(&[0; 8], moov(1000, 200, &[video], &[]));
    let path = dir.path().join("movie.mov");
    std::fs::write(&path, &file).unwrap();

    let mut demuxer = Demuxer::open(&path).unwrap();
    assert_eq!(demuxer.track(1).unwrap().samples()[0].source, DataRefHandle::External(0));
    let data: Vec<Vec<u8>> = read_all(&mut demuxer).into_iter().map(|p| p.data).collect();
    assert_eq!(data, vec![b"AAAA".to_vec(), b"BBBB".to_vec()]);

    let options = ReaderOptions {
        follow_external_refs: false,
        ..ReaderOptions::default()
    };
    let mut demuxer = Demuxer::open_with(&path, options).unwrap();
    assert_matches!(
        demuxer.read_packet(),
        Err(Error::UnresolvedDataRef { track_id: 1, pos: 0 })
    );
}

#[test]
fn chapter_track() {
    let mut video = TrackDef::new(1, b"vide", b"avc1", 1000);
    video.stts = vec![(1, 9000)];
    video.stsc = vec![(1, 1)];
    video.sizes = vec![4];
    video.chunks = vec![MDAT_DATA];
    video.trak = mkbox(b"tref", &mkbox(b"chap", &2u32.to_be_bytes()));

    let mut text = TrackDef::new(2, b"text", b"text", 1000);
    text.stts = vec![(1, 4000), (1, 5000)];
    text.stsc = vec![(1, 2)];
    text.sizes = vec![7, 6];
    text.chunks = vec![MDAT_DATA + 4];

    let mut data = vec![0xaa; 4];
    data.extend_from_slice(b"\x00\x05Intro\x00\x04Main");
    let mut demuxer = open(movie_file(&data, moov(1000, 9000, &[video, text], &[])));

    let chapters: Vec<(u32, i64, Option<i64>, &str)> = demuxer
        .chapters()
        .iter()
        .map(|c| (c.id, c.start, c.end, c.title.as_str()))
        .collect();
    assert_eq!(
        chapters,
        vec![(0, 0, Some(4_000_000), "Intro"), (1, 4_000_000, Some(9_000_000), "Main")]
    );
    assert!(demuxer.track(2).unwrap().discard);

    let tracks: Vec<u32> = read_all(&mut demuxer).iter().map(|p| p.track_id).collect();
    assert_eq!(tracks, vec![1]);
}

#[test]
fn start_timecode() {
    let mut tmcd = TrackDef::new(1, b"tmcd", b"tmcd", 2500);
    tmcd.stts = vec![(1, 100)];
    tmcd.stsc = vec![(1, 1)];
    tmcd.sizes = vec![4];
    tmcd.chunks = vec![MDAT_DATA];
    // one hour at 25 fps.
    let data = (25u32 * 3600).to_be_bytes();
    let demuxer = open(movie_file(&data, moov(1000, 40, &[tmcd], &[])));
    assert_eq!(demuxer.metadata().get_str("timecode"), Some("01:00:00:00"));
}

fn one_sample_track() -> TrackDef {
    let mut video = TrackDef::new(1, b"vide", b"avc1", 1000);
    video.stts = vec![(1, 9000)];
    video.stsc = vec![(1, 1)];
    video.sizes = vec![4];
    video.chunks = vec![MDAT_DATA];
    video
}

#[test]
fn nero_chapters() {
    let mut chpl = vec![0; 4];
    chpl.push(2);
    chpl.extend_from_slice(&0i64.to_be_bytes());
    chpl.push(3);
    chpl.extend_from_slice(b"One");
    // 100 ns units.
    chpl.extend_from_slice(&20_000_000i64.to_be_bytes());
    chpl.push(3);
    chpl.extend_from_slice(b"Two");
    let udta = mkbox(b"udta", &full_box(b"chpl", 1, 0, &chpl));

    let demuxer = open(movie_file(&[0; 4], moov(1000, 9000, &[one_sample_track()], &udta)));
    let chapters: Vec<(u32, i64, Option<i64>, &str)> = demuxer
        .chapters()
        .iter()
        .map(|c| (c.id, c.start, c.end, c.title.as_str()))
        .collect();
    assert_eq!(
        chapters,
        vec![(0, 0, Some(2_000_000), "One"), (1, 2_000_000, Some(9_000_000), "Two")]
    );
}

#[test]
fn movie_metadata() {
    // QuickTime user data string: size, language, text.
    let mut nam = 5u16.to_be_bytes().to_vec();
    nam.extend_from_slice(&[0x55, 0xc4]);
    nam.extend_from_slice(b"Title");
    let nam = mkbox(b"\xa9nam", &nam);

    // iTunes list: a utf-8 data atom, and a track number.
    let mut data = 1u32.to_be_bytes().to_vec();
    data.extend_from_slice(&[0; 4]);
    data.extend_from_slice(b"Artist");
    let art = mkbox(b"\xa9ART", &mkbox(b"data", &data));
    let mut data = 0u32.to_be_bytes().to_vec();
    data.extend_from_slice(&[0; 4]);
    data.extend_from_slice(&[0, 0, 0, 3, 0, 12, 0, 0]);
    let trkn = mkbox(b"trkn", &mkbox(b"data", &data));
    let ilst = mkbox(b"ilst", &cat(&[art, trkn]));
    let mut meta = vec![0; 4];
    meta.extend(hdlr(b"mdir"));
    meta.extend(ilst);
    let meta = mkbox(b"meta", &meta);

    let udta = mkbox(b"udta", &cat(&[nam, meta]));
    let demuxer = open(movie_file(&[0; 4], moov(1000, 9000, &[one_sample_track()], &udta)));
    let metadata = demuxer.metadata();
    assert_eq!(metadata.get_str("title"), Some("Title"));
    assert_eq!(metadata.get("title").unwrap().attr("language"), None);
    assert_eq!(metadata.get_str("artist"), Some("Artist"));
    assert_eq!(metadata.get_str("track"), Some("3/12"));
}
