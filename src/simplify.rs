//! Harmony simplification
//!
//! Reduces polyphonic MIDI to its harmonic skeleton before labeling: very short
//! notes are dropped, repeated notes are joined, and note boundaries are
//! quantized to a beat grid. Beat values are fractions of a whole note, so
//! `1.0 / 4.0` is a quarter note.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::midi::{MidiNote, MidiScore};

/// Simplification parameters, as fractions of a whole note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplifyConfig {
    /// Notes shorter than this are dropped.
    pub shortest_note: f64,
    /// Window in which repeated pitches are joined.
    pub smooth_beat: f64,
    /// Grid that note boundaries snap to.
    pub quantize_beat: f64,
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        SimplifyConfig {
            shortest_note: 1.0 / 64.0,
            smooth_beat: 1.0,
            quantize_beat: 1.0 / 2.0,
        }
    }
}

/// Round `x` to the closest multiple of `target`, ties to even.
///
/// `round_to_target(0.25, 1.13) == 1.25`
pub fn round_to_target(target: f64, x: f64) -> f64 {
    let y = 1.0 / target;
    (x * y).round_ties_even() / y
}

/// Snap every time to the closest multiple of `beat`.
pub fn quantize_times(times: &[f64], beat: f64) -> Vec<f64> {
    times.iter().map(|&t| round_to_target(beat, t)).collect()
}

/// Notes at least `shortest_duration` seconds long.
pub fn drop_short_notes(notes: &[MidiNote], shortest_duration: f64) -> Vec<MidiNote> {
    notes
        .iter()
        .filter(|n| n.duration() >= shortest_duration)
        .copied()
        .collect()
}

/// Join repeated pitches that fall within the same `step_size` window.
///
/// Windows tile the span of the notes from the earliest start. Within a window,
/// the first note of a pitch is extended to the end of its last repetition and
/// the repetitions are removed.
pub fn smooth_notes(notes: &[MidiNote], step_size: f64) -> Vec<MidiNote> {
    if notes.is_empty() || step_size <= 0.0 {
        return notes.to_vec();
    }

    let first = notes.iter().map(|n| n.start).fold(f64::INFINITY, f64::min);
    let stop = notes.iter().map(|n| n.end).fold(f64::NEG_INFINITY, f64::max) + step_size;

    let mut steps = Vec::new();
    let mut k = 0.0;
    while first + k * step_size < stop {
        steps.push(first + k * step_size);
        k += 1.0;
    }

    let mut smoothed = notes.to_vec();
    let mut alive = vec![true; notes.len()];

    for window in steps.windows(2) {
        let (lo, hi) = (window[0], window[1]);

        let mut by_pitch: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
        for (ix, note) in smoothed.iter().enumerate() {
            if alive[ix] && note.start >= lo && note.end < hi {
                by_pitch.entry(note.pitch).or_default().push(ix);
            }
        }

        for ixs in by_pitch.values().filter(|ixs| ixs.len() > 1) {
            let (head, rest) = (ixs[0], &ixs[1..]);
            if let Some(&last) = rest.last() {
                smoothed[head].end = smoothed[last].end;
            }
            for &ix in rest {
                alive[ix] = false;
            }
        }
    }

    smoothed
        .into_iter()
        .zip(alive)
        .filter_map(|(note, keep)| keep.then_some(note))
        .collect()
}

/// Simplify a score to its essential harmonic content.
///
/// Durations are derived from the first tempo; later tempo changes are
/// ignored with a warning.
pub fn simplify_harmony(score: &MidiScore, config: &SimplifyConfig) -> MidiScore {
    if score.tempos.len() > 1 {
        warn!("MIDI has tempo changes but a constant BPM is assumed when simplifying");
    }

    let bpm = score.initial_bpm();
    let whole_note_dur = 60.0 / bpm * 4.0;

    let shortest_dur = whole_note_dur * config.shortest_note;
    let smooth_dur = whole_note_dur * config.smooth_beat;
    let quantize_dur = whole_note_dur * config.quantize_beat;

    let cleaned = drop_short_notes(&score.notes, shortest_dur);
    let smoothed = smooth_notes(&cleaned, smooth_dur);
    let mut notes = drop_short_notes(&smoothed, shortest_dur * 4.0);

    for note in &mut notes {
        note.start = round_to_target(quantize_dur, note.start);
        note.end = round_to_target(quantize_dur, note.end);

        if note.start == note.end {
            note.end += quantize_dur;
        }
    }

    debug!(
        "Simplified {} notes to {} at {bpm} bpm",
        score.notes.len(),
        notes.len()
    );

    let mut simplified = MidiScore::from_notes(notes);
    simplified.tempos = score.tempos.clone();
    simplified
}
