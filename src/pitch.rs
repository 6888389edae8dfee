//! Pitch
//!
//! Conversions between MIDI note numbers, note names, pitch classes and
//! equal-tempered frequencies (A4 = 440 Hz).

use thiserror::Error;

/// Number of pitch classes in an octave.
pub const SEMITONES: usize = 12;

/// Reference pitch for A4 in Hz.
pub const A4_FREQ: f64 = 440.0;

/// MIDI number of A4.
const A4_MIDI: i32 = 69;

/// Highest valid MIDI note number.
pub const MAX_MIDI_NUM: u8 = 127;

/// Pitch-class names, sharps only, indexed by pitch class.
pub const NOTE_NAMES: [&str; SEMITONES] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Canonical note name of every MIDI number, C-1 through G9.
#[rustfmt::skip]
pub const MIDI_NOTES: [&str; 128] = [
    "C-1", "C#-1", "D-1", "D#-1", "E-1", "F-1", "F#-1", "G-1", "G#-1", "A-1", "A#-1", "B-1",
    "C0", "C#0", "D0", "D#0", "E0", "F0", "F#0", "G0", "G#0", "A0", "A#0", "B0",
    "C1", "C#1", "D1", "D#1", "E1", "F1", "F#1", "G1", "G#1", "A1", "A#1", "B1",
    "C2", "C#2", "D2", "D#2", "E2", "F2", "F#2", "G2", "G#2", "A2", "A#2", "B2",
    "C3", "C#3", "D3", "D#3", "E3", "F3", "F#3", "G3", "G#3", "A3", "A#3", "B3",
    "C4", "C#4", "D4", "D#4", "E4", "F4", "F#4", "G4", "G#4", "A4", "A#4", "B4",
    "C5", "C#5", "D5", "D#5", "E5", "F5", "F#5", "G5", "G#5", "A5", "A#5", "B5",
    "C6", "C#6", "D6", "D#6", "E6", "F6", "F#6", "G6", "G#6", "A6", "A#6", "B6",
    "C7", "C#7", "D7", "D#7", "E7", "F7", "F#7", "G7", "G#7", "A7", "A#7", "B7",
    "C8", "C#8", "D8", "D#8", "E8", "F8", "F#8", "G8", "G#8", "A8", "A#8", "B8",
    "C9", "C#9", "D9", "D#9", "E9", "F9", "F#9", "G9",
];

/// Errors raised when converting notes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoteError {
    /// A MIDI note number outside `0..=127`.
    #[error("invalid midi note number: {num}")]
    MidiOutOfRange {
        /// The rejected number.
        num: i64,
    },

    /// A note name that could not be parsed.
    #[error("invalid note name `{name}`")]
    InvalidNoteName {
        /// The rejected name.
        name: String,
    },
}

/// Check that `num` is a representable MIDI note number.
pub fn validate_midi_num(num: i64) -> Result<u8, NoteError> {
    if (0..=i64::from(MAX_MIDI_NUM)).contains(&num) {
        Ok(num as u8)
    } else {
        Err(NoteError::MidiOutOfRange { num })
    }
}

/// Canonical note name of a MIDI number, e.g. 60 -> "C4".
pub fn midi_to_note(num: u8) -> Result<&'static str, NoteError> {
    MIDI_NOTES
        .get(num as usize)
        .copied()
        .ok_or(NoteError::MidiOutOfRange { num: num.into() })
}

/// MIDI number of a note name, e.g. "C4" -> 60.
///
/// Accepts a pitch letter, an optional `#` or `b`, and a signed octave.
pub fn note_to_midi(note: &str) -> Result<u8, NoteError> {
    let invalid = || NoteError::InvalidNoteName {
        name: note.to_string(),
    };

    let mut chars = note.chars();
    let letter = chars.next().ok_or_else(invalid)?;
    let natural: i64 = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return Err(invalid()),
    };

    let rest = chars.as_str();
    let (shift, octave_str) = match rest.chars().next() {
        Some('#') => (1, &rest[1..]),
        Some('b') => (-1, &rest[1..]),
        _ => (0, rest),
    };
    let octave: i8 = octave_str.parse().map_err(|_| invalid())?;

    let num = (i64::from(octave) + 1) * SEMITONES as i64 + natural + shift;
    validate_midi_num(num).map_err(|_| invalid())
}

/// Pitch class of a MIDI number.
#[inline]
pub fn pitch_class_of_midi(num: u8) -> u8 {
    num % SEMITONES as u8
}

/// Pitch class of a note name, e.g. "A4" -> 9.
pub fn pitch_class_of_note(note: &str) -> Result<u8, NoteError> {
    note_to_midi(note).map(pitch_class_of_midi)
}

/// Drop the octave of a note name, e.g. "A#4" -> "A#".
pub fn note_name_of(note: &str) -> Result<&'static str, NoteError> {
    let pc = pitch_class_of_note(note)?;
    Ok(NOTE_NAMES[pc as usize])
}

/// Octave of a note name, e.g. "C-1" -> -1.
pub fn octave_of_note(note: &str) -> Result<i8, NoteError> {
    let num = note_to_midi(note)?;
    Ok((num / SEMITONES as u8) as i8 - 1)
}

/// The note a half step above `note`.
pub fn increment_note(note: &str) -> Result<&'static str, NoteError> {
    let num = note_to_midi(note)?;
    midi_to_note(num.saturating_add(1))
}

/// Equal-tempered frequency of a MIDI number, in Hz.
pub fn freq_from_midi_num(num: u8) -> f64 {
    A4_FREQ * 2f64.powf((i32::from(num) - A4_MIDI) as f64 / SEMITONES as f64)
}

/// Equal-tempered frequency of a note name, in Hz.
pub fn freq_from_note(note: &str) -> Result<f64, NoteError> {
    note_to_midi(note).map(freq_from_midi_num)
}

/// The fundamental plus `n` harmonic overtones of `freq`.
pub fn harmonic_overtones(freq: f64, n: usize) -> Vec<f64> {
    (1..=n + 1).map(|i| i as f64 * freq).collect()
}

/// Note names from `low` to `high`, both inclusive.
pub fn note_list(low: u8, high: u8) -> &'static [&'static str] {
    let high = high.min(MAX_MIDI_NUM) as usize;
    let low = low as usize;
    if low > high {
        return &[];
    }
    &MIDI_NOTES[low..=high]
}

/// Parse a chord string such as `"60-48_62-50"` into `[[60, 48], [62, 50]]`.
///
/// Chords that fail to parse are dropped rather than reported.
pub fn midi_nums_list_from_str(midi_nums_str: &str) -> Vec<Vec<u8>> {
    midi_nums_str
        .split('_')
        .filter_map(|group| {
            group
                .split('-')
                .map(|n| n.parse::<u8>().ok().filter(|n| *n <= MAX_MIDI_NUM))
                .collect::<Option<Vec<u8>>>()
        })
        .collect()
}

/// Note names of a single chord string, e.g. `"60-48"` -> `["C4", "C3"]`.
pub fn notes_from_midi_nums_str(midi_nums_str: &str) -> Result<Vec<&'static str>, NoteError> {
    midi_nums_str
        .split('-')
        .map(|s| {
            let num: i64 = s.parse().map_err(|_| NoteError::InvalidNoteName {
                name: s.to_string(),
            })?;
            midi_to_note(validate_midi_num(num)?)
        })
        .collect()
}

/// Note names of every chord in a progression string.
pub fn notes_list_from_midi_nums_str(
    midi_nums_str: &str,
) -> Result<Vec<Vec<&'static str>>, NoteError> {
    midi_nums_str
        .split('_')
        .map(notes_from_midi_nums_str)
        .collect()
}
