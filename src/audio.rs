//! Audio extraction
//!
//! Turns chroma frames into a progression: frames are averaged over each
//! caller-supplied segment (typically one per measure), normalized by the
//! loudest bin, and thresholded into a pitch-class set voiced in one octave.

use crate::chord::{Chord, ChordDuration};
use crate::chroma::ChromaExtractor;
use crate::harman::ExtractError;
use crate::pitch::SEMITONES;
use crate::progression::Progression;

/// Normalized chroma level a pitch class must exceed to be kept.
pub const CHROMA_THRESHOLD: f32 = 0.35;

/// MIDI number that pitch class 0 is voiced at (C4).
pub const PC_BASE_MIDI: u8 = 60;

/// Pitch classes whose averaged, max-normalized level exceeds
/// [`CHROMA_THRESHOLD`]. An empty slice yields none.
pub fn segment_pitch_classes(frames: &[[f32; SEMITONES]]) -> Vec<u8> {
    if frames.is_empty() {
        return Vec::new();
    }

    let mut mean = [0.0f32; SEMITONES];
    for frame in frames {
        for (m, v) in mean.iter_mut().zip(frame) {
            *m += v;
        }
    }
    let n = frames.len() as f32;
    mean.iter_mut().for_each(|m| *m /= n);

    let max = mean.iter().copied().fold(0.0f32, f32::max);
    if max > 0.0 {
        mean.iter_mut().for_each(|m| *m /= max);
    }

    (0u8..)
        .zip(mean)
        .filter(|&(_, level)| level > CHROMA_THRESHOLD)
        .map(|(pc, _)| pc)
        .collect()
}

/// Build a progression from chroma frames, one chord per pair of consecutive
/// `segment_times` (seconds). Durations are in seconds, measured on the frame
/// grid.
pub fn extract_progression_from_chroma(
    frames: &[[f32; SEMITONES]],
    frame_rate: f64,
    segment_times: &[f64],
    bpm: f64,
    name: impl Into<String>,
) -> Result<Progression, ExtractError> {
    let bounds: Vec<usize> = segment_times
        .iter()
        .map(|&t| (t * frame_rate).max(0.0) as usize)
        .collect();

    let mut chords = Vec::with_capacity(bounds.len().saturating_sub(1));
    let mut durations = Vec::with_capacity(bounds.len().saturating_sub(1));

    for pair in bounds.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        let lo = start.min(frames.len());
        let hi = end.clamp(lo, frames.len());
        let segment = &frames[lo..hi];

        let midi_nums: Vec<u8> = segment_pitch_classes(segment)
            .into_iter()
            .map(|pc| PC_BASE_MIDI + pc)
            .collect();
        chords.push(Chord::from_midi_numbers(&midi_nums)?);
        durations.push(ChordDuration::Seconds(
            end.saturating_sub(start) as f64 / frame_rate,
        ));
    }

    Ok(Progression::builder(chords)
        .durations(durations)
        .bpm(bpm)
        .name(name)
        .build()?)
}

/// Compute chroma for `signal` and extract a progression over `segment_times`.
pub fn extract_progression_from_signal(
    extractor: &ChromaExtractor,
    signal: &[f32],
    segment_times: &[f64],
    bpm: f64,
    name: impl Into<String>,
) -> Result<Progression, ExtractError> {
    let frames = extractor.extract(signal)?;
    extract_progression_from_chroma(&frames, extractor.frame_rate(), segment_times, bpm, name)
}
