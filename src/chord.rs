//! Chord
//!
//! A voiced chord: sorted, de-duplicated MIDI numbers plus everything derived
//! from them. Derived fields are computed once at construction; changing the
//! notes means building a new chord.

use std::fmt;

use rand::Rng;
use serde::Serialize;

use crate::classifier::ChordClassifier;
use crate::pitch::{self, NoteError};
use crate::template::Template;
use crate::type_templates::ChordType;

/// Random chord identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ChordId(pub u64);

impl ChordId {
    /// Draw a fresh id from `rng`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        ChordId(rng.gen())
    }
}

impl fmt::Display for ChordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// How long a chord lasts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChordDuration {
    /// Absolute length in seconds.
    Seconds(f64),
    /// Symbolic beat-subdivision notation, e.g. `"1m"` for one measure.
    Notation(String),
}

impl Default for ChordDuration {
    fn default() -> Self {
        ChordDuration::Notation("1m".to_string())
    }
}

impl fmt::Display for ChordDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChordDuration::Seconds(s) => write!(f, "{s}s"),
            ChordDuration::Notation(n) => f.write_str(n),
        }
    }
}

/// A voiced chord.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chord {
    id: ChordId,
    midi_nums: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<ChordDuration>,
    #[serde(rename = "type")]
    chord_type: ChordType,
    notes: Vec<&'static str>,
    template: Template,
}

impl Chord {
    /// Build from MIDI numbers, classified against the built-in table.
    ///
    /// Fails if any number is outside `0..=127`.
    pub fn from_midi_numbers(nums: &[u8]) -> Result<Self, NoteError> {
        Self::from_midi_numbers_with(&ChordClassifier::standard(), nums, &mut rand::thread_rng())
    }

    /// Build from note names, classified against the built-in table.
    pub fn from_note_names<S: AsRef<str>>(notes: &[S]) -> Result<Self, NoteError> {
        let nums = notes
            .iter()
            .map(|n| pitch::note_to_midi(n.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_midi_numbers(&nums)
    }

    /// Build from MIDI numbers with an explicit classifier and id source.
    pub fn from_midi_numbers_with<R: Rng + ?Sized>(
        classifier: &ChordClassifier<'_>,
        nums: &[u8],
        rng: &mut R,
    ) -> Result<Self, NoteError> {
        Self::build(classifier, nums, ChordId::random(rng))
    }

    /// Build with a caller-chosen id.
    pub fn with_id(
        classifier: &ChordClassifier<'_>,
        nums: &[u8],
        id: ChordId,
    ) -> Result<Self, NoteError> {
        Self::build(classifier, nums, id)
    }

    fn build(classifier: &ChordClassifier<'_>, nums: &[u8], id: ChordId) -> Result<Self, NoteError> {
        let mut midi_nums = nums.to_vec();
        midi_nums.sort_unstable();
        midi_nums.dedup();

        let notes = midi_nums
            .iter()
            .map(|&n| pitch::midi_to_note(n))
            .collect::<Result<Vec<_>, _>>()?;
        let template = Template::from_midi_nums(&midi_nums);
        let chord_type = classifier.classify_template(&template);

        Ok(Chord {
            id,
            midi_nums,
            duration: None,
            chord_type,
            notes,
            template,
        })
    }

    /// The same chord with a duration attached.
    pub fn with_duration(mut self, duration: ChordDuration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Identifier.
    pub fn id(&self) -> ChordId {
        self.id
    }

    /// Sorted, unique MIDI numbers.
    pub fn midi_nums(&self) -> &[u8] {
        &self.midi_nums
    }

    /// Canonical note names, parallel to [`Chord::midi_nums`].
    pub fn notes(&self) -> &[&'static str] {
        &self.notes
    }

    /// Classified chord type; [`ChordType::EMPTY`] when nothing matched.
    pub fn chord_type(&self) -> ChordType {
        self.chord_type
    }

    /// Pitch-class template.
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Duration, when one was attached.
    pub fn duration(&self) -> Option<&ChordDuration> {
        self.duration.as_ref()
    }

    /// True when the chord has no notes.
    pub fn is_empty(&self) -> bool {
        self.midi_nums.is_empty()
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Chord {} [{}]", self.chord_type, self.notes.join(" "))
    }
}
