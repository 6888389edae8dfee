//! Templates
//!
//! A template is an indicator vector over pitch classes: index `i` is `1` when
//! pitch class `i` is present. Pitch-class templates have twelve slots; the
//! rotation helpers work for any length.

use std::fmt;

use serde::Serialize;

use crate::circular;
use crate::pitch::{self, NoteError, SEMITONES};

/// Binary pitch-class indicator vector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Template(Vec<u8>);

impl Template {
    /// Build from raw bits. Any non-zero value counts as `1`.
    pub fn from_bits(bits: &[u8]) -> Self {
        Template(bits.iter().map(|&b| u8::from(b != 0)).collect())
    }

    /// Parse a string of `0`/`1` characters, e.g. `"100010010000"`.
    ///
    /// Returns `None` when any other character is present.
    pub fn from_bit_str(s: &str) -> Option<Self> {
        s.chars()
            .map(|c| match c {
                '0' => Some(0),
                '1' => Some(1),
                _ => None,
            })
            .collect::<Option<Vec<u8>>>()
            .map(Template)
    }

    /// Twelve-slot template of a set of pitch classes, e.g. `[0, 4, 7]`.
    pub fn from_pitch_classes<I: IntoIterator<Item = u8>>(pcs: I) -> Self {
        let mut bits = vec![0; SEMITONES];
        for pc in pcs {
            bits[pc as usize % SEMITONES] = 1;
        }
        Template(bits)
    }

    /// Twelve-slot template of MIDI numbers; octaves collapse.
    pub fn from_midi_nums(nums: &[u8]) -> Self {
        Self::from_pitch_classes(nums.iter().map(|&n| pitch::pitch_class_of_midi(n)))
    }

    /// Twelve-slot template of note names.
    pub fn from_notes<S: AsRef<str>>(notes: &[S]) -> Result<Self, NoteError> {
        let pcs = notes
            .iter()
            .map(|n| pitch::pitch_class_of_note(n.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_pitch_classes(pcs))
    }

    /// The raw bits.
    pub fn bits(&self) -> &[u8] {
        &self.0
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the zero-length template.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of `1` slots.
    pub fn ones(&self) -> usize {
        self.0.iter().filter(|&&b| b == 1).count()
    }

    /// Indices of the `1` slots.
    pub fn one_indices(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|&(_, &b)| b == 1)
            .map(|(i, _)| i)
            .collect()
    }

    /// Is slot `ix` set?
    #[inline]
    pub fn is_set(&self, ix: usize) -> bool {
        self.0.get(ix).is_some_and(|&b| b == 1)
    }

    /// Shift right by one slot.
    pub fn shift_by_one(&self) -> Self {
        Template(circular::shift_by_one(&self.0))
    }

    /// Shift right by `n` slots.
    pub fn rotate(&self, n: usize) -> Self {
        let mut bits = self.0.clone();
        if !bits.is_empty() {
            let n = n % bits.len();
            bits.rotate_right(n);
        }
        Template(bits)
    }

    /// Every distinct rotation of this template.
    pub fn rotations(&self) -> Vec<Template> {
        circular::all_rotations(&self.0)
            .into_iter()
            .map(Template)
            .collect()
    }

    /// Is `other` some rotation of this template?
    pub fn is_rotation_of(&self, other: &Template) -> bool {
        circular::is_circular_match(&self.0, &other.0)
    }

    /// Slots set in both templates, without rotating either.
    pub fn n_common_ones(&self, other: &Template) -> usize {
        self.0
            .iter()
            .zip(&other.0)
            .filter(|&(&a, &b)| a == 1 && b == 1)
            .count()
    }

    /// The largest number of shared `1` slots over every rotation of `self`.
    pub fn max_common_ones(&self, other: &Template) -> usize {
        (0..self.len().max(1))
            .map(|n| self.rotate(n).n_common_ones(other))
            .max()
            .unwrap_or(0)
    }

    /// Render as a `0`/`1` string.
    pub fn to_bit_string(&self) -> String {
        self.0.iter().map(|b| if *b == 1 { '1' } else { '0' }).collect()
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_bit_string())
    }
}

impl From<Vec<u8>> for Template {
    fn from(bits: Vec<u8>) -> Self {
        Template::from_bits(&bits)
    }
}
