//! Chord classifier
//!
//! Names a set of notes by the first chord type, in table order, whose template
//! is a rotation of the notes' pitch-class template. Precedence is table order
//! only; partial or best-fit matches are never reported.

use tracing::debug;

use crate::pitch::NoteError;
use crate::template::Template;
use crate::type_templates::{ChordType, TemplateError, TemplateTable};

/// Exact rotation-matching classifier over a [`TemplateTable`].
#[derive(Debug, Clone, Copy)]
pub struct ChordClassifier<'t> {
    table: &'t TemplateTable,
}

impl ChordClassifier<'static> {
    /// Classifier over the built-in table.
    pub fn standard() -> Self {
        ChordClassifier::new(TemplateTable::standard())
    }
}

impl Default for ChordClassifier<'static> {
    fn default() -> Self {
        Self::standard()
    }
}

impl<'t> ChordClassifier<'t> {
    /// Classifier over `table`.
    pub fn new(table: &'t TemplateTable) -> Self {
        ChordClassifier { table }
    }

    /// The table being matched against.
    pub fn table(&self) -> &'t TemplateTable {
        self.table
    }

    /// First chord type whose template is a rotation of `template`, or
    /// [`ChordType::EMPTY`].
    pub fn classify_template(&self, template: &Template) -> ChordType {
        let found = self
            .table
            .iter()
            .find(|entry| entry.template.is_rotation_of(template))
            .map(|entry| entry.chord_type);

        match found {
            Some(chord_type) => chord_type,
            None => {
                debug!("No type template matched template {template}");
                ChordType::EMPTY
            }
        }
    }

    /// Classify MIDI note numbers.
    pub fn classify_midi_nums(&self, nums: &[u8]) -> ChordType {
        self.classify_template(&Template::from_midi_nums(nums))
    }

    /// Classify note names, e.g. `["C4", "E4", "G4"]` -> "major chord".
    pub fn classify_notes<S: AsRef<str>>(&self, notes: &[S]) -> Result<ChordType, NoteError> {
        Ok(self.classify_template(&Template::from_notes(notes)?))
    }

    /// Classify each chord of a list of note-name chords.
    pub fn classify_many<S: AsRef<str>>(
        &self,
        notes_list: &[Vec<S>],
    ) -> Result<Vec<ChordType>, NoteError> {
        notes_list.iter().map(|n| self.classify_notes(n)).collect()
    }

    /// Does some rotation of `notes` fit the named chord type?
    pub fn notes_match_type<S: AsRef<str>>(
        &self,
        notes: &[S],
        name: &str,
    ) -> Result<bool, ClassifyError> {
        let entry = self.table.by_name(name)?;
        let template = Template::from_notes(notes)?;
        Ok(entry.template.is_rotation_of(&template))
    }
}

/// Errors from queries that name a chord type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    /// The notes could not be read.
    #[error(transparent)]
    Note(#[from] NoteError),

    /// The chord type name is not in the table.
    #[error(transparent)]
    Template(#[from] TemplateError),
}
