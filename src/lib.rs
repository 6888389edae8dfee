//! # chord_progressions
//!
//! Chord-type classification, constrained chord progression generation, and
//! chord extraction from MIDI (HarmAn) and audio chroma.
//!
//! ## Example
//! ```rust
//! use chord_progressions::{Chord, ChordClassifier, Harman, MidiNote, SolveParams, Solver};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! fn run() -> Result<(), Box<dyn std::error::Error>> {
//!     // 1) Classify a set of notes
//!     let classifier = ChordClassifier::standard();
//!     let kind = classifier.classify_notes(&["C4", "E4", "G4"])?;
//!     assert_eq!(kind.name, "major chord");
//!
//!     // 2) Generate four chords sharing at least half their notes with each neighbour
//!     let solver = Solver::builder().build();
//!     let mut rng = StdRng::seed_from_u64(7);
//!     let chords: Vec<Chord> = solver.select_chords(
//!         &SolveParams {
//!             n_chords: 4,
//!             pct_notes_common: 0.5,
//!             allowed_chord_types: &["major chord", "minor chord"],
//!             ..SolveParams::default()
//!         },
//!         &mut rng,
//!     )?;
//!     assert_eq!(chords.len(), 4);
//!
//!     // 3) Label a sustained triad
//!     let notes = [
//!         MidiNote::new(0.0, 2.0, 60),
//!         MidiNote::new(0.0, 2.0, 64),
//!         MidiNote::new(0.0, 2.0, 67),
//!     ];
//!     let spans = Harman::default().label_notes(&notes)?;
//!     assert_eq!(spans[0].label, "major chord");
//!
//!     Ok(())
//! }
//! # run().unwrap();
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rust_2018_idioms)]
#![deny(clippy::all)]

/// Pitch and note-name conversions.
pub use pitch::NoteError;

/// Pitch-class templates and the chord type table.
pub use template::Template;
pub use type_templates::{ChordType, TableEntry, TemplateError, TemplateTable};

/// Classification and chords.
pub use chord::{Chord, ChordDuration, ChordId};
pub use classifier::{ChordClassifier, ClassifyError};

/// Progression generation.
pub use progression::{ChordRecord, Locks, Progression, ProgressionBuilder, ProgressionError};
pub use rhythm::DurationBounds;
pub use solver::{SolveParams, Solver, SolverBuilder, SolverConfig, SolverError};

/// Symbolic extraction.
pub use harman::{
    ExtractError, Harman, HarmanBuilder, HarmanConfig, LabeledSegment, MinimalSegment,
    NoteEvent, PartitionPoint,
};
pub use midi::{MidiNote, MidiScore, TempoChange};
pub use simplify::SimplifyConfig;

/// Audio extraction.
pub use chroma::{ChromaError, ChromaExtractor, ChromaExtractorBuilder};

/// Pitch utilities.
pub mod pitch;

/// Rotation matching of cyclic sequences.
pub mod circular;

/// Pitch-class templates.
pub mod template;

/// The chord type table.
pub mod type_templates;

/// Chord type classification.
pub mod classifier;

/// Chord value type.
pub mod chord;

/// Chord progressions.
pub mod progression;

/// Constrained chord generation.
pub mod solver;

/// MIDI loading.
pub mod midi;

/// MIDI harmony simplification.
pub mod simplify;

/// HarmAn segmentation and labeling.
pub mod harman;

/// Parallel labeling of many files.
pub mod batch;

/// Chromagram computation.
pub mod chroma;

/// Progression extraction from chroma.
pub mod audio;

/// Euclidean rhythms and durations.
pub mod rhythm;
