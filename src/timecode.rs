//! SMPTE timecode from a `tmcd` track.
use crate::boxes::stsd::TimecodeParams;

// tmcd flag: hours wrap at 24.
const FLAG_24_HOUR_MAX: u32 = 0x02;

// Drop-frame timecode skips frame numbers 0 and 1 (times the rate factor)
// at the start of every minute except every tenth one.
fn drop_frame_adjust(frame_num: i64, fps: i64) -> i64 {
    let factor = fps / 30;
    let d = frame_num / (17982 * factor);
    let m = frame_num % (17982 * factor);
    frame_num + 18 * factor * d + 2 * factor * ((m - 2) / (1798 * factor))
}

/// Format frame number `frame_num` as `HH:MM:SS:FF`, or `HH:MM:SS;FF`
/// for drop frame.
///
/// `None` if the rate is not one of 24, 25, 30, 50 or 60, or if drop
/// frame is asked for at a rate other than 30 or 60.
pub fn framenum_to_timecode(frame_num: u32, drop: bool, fps: u32, wrap_24h: bool) -> Option<String> {
    if ![24, 25, 30, 50, 60].contains(&fps) {
        return None;
    }
    if drop && fps != 30 && fps != 60 {
        return None;
    }
    let fps = fps as i64;
    let mut frame_num = frame_num as i64;
    if drop {
        frame_num = drop_frame_adjust(frame_num, fps);
    }
    let frames = frame_num % fps;
    let secs = (frame_num / fps) % 60;
    let mins = (frame_num / (60 * fps)) % 60;
    let mut hours = frame_num / (3600 * fps);
    if wrap_24h {
        hours %= 24;
    }
    Some(format!(
        "{:02}:{:02}:{:02}{}{:02}",
        hours,
        mins,
        secs,
        if drop { ';' } else { ':' },
        frames
    ))
}

/// Timecode string for the first sample of a timecode track.
pub(crate) fn timecode_string(params: &TimecodeParams, frame_num: u32) -> Option<String> {
    framenum_to_timecode(
        frame_num,
        params.drop_frame,
        params.fps as u32,
        params.flags & FLAG_24_HOUR_MAX != 0,
    )
}
