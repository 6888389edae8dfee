//! Progression
//!
//! An ordered list of chords with per-slot durations and locks, plus a tempo
//! and a name. Locked slots survive re-solving verbatim.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::chord::{Chord, ChordDuration, ChordId};
use crate::rhythm::{DurationBounds, RhythmError};
use crate::solver::{
    SolveParams, Solver, SolverError, DEFAULT_NOTE_RANGE_HIGH, DEFAULT_NOTE_RANGE_LOW,
};

/// Tempo used when none is given.
pub const DEFAULT_BPM: f64 = 120.0;

/// Errors raised while building or re-solving a progression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProgressionError {
    /// A per-slot list does not have one entry per chord.
    #[error("{field} has length {actual}, expected {expected}")]
    LengthMismatch {
        /// Which list is off.
        field: &'static str,
        /// Number of chords.
        expected: usize,
        /// Length supplied.
        actual: usize,
    },

    /// A lock string contained something other than `0` or `1`.
    #[error("invalid lock string `{locks}`")]
    InvalidLocks {
        /// The rejected input.
        locks: String,
    },

    /// Solving new chords failed.
    #[error(transparent)]
    Solver(#[from] SolverError),

    /// Chord durations could not be drawn.
    #[error(transparent)]
    Rhythm(#[from] RhythmError),
}

/// One lock flag per chord slot; `true` keeps the chord on re-solve.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Locks(Vec<bool>);

impl Locks {
    /// `n` open slots.
    pub fn all_open(n: usize) -> Self {
        Locks(vec![false; n])
    }

    /// `n` locked slots.
    pub fn all_locked(n: usize) -> Self {
        Locks(vec![true; n])
    }

    /// Parse a bitstring such as `"0110"`.
    pub fn parse(s: &str) -> Result<Self, ProgressionError> {
        s.chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                _ => Err(ProgressionError::InvalidLocks {
                    locks: s.to_string(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Locks)
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True with no slots.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Is slot `ix` locked? Slots past the end are open.
    pub fn is_locked(&self, ix: usize) -> bool {
        self.0.get(ix).copied().unwrap_or(false)
    }

    /// Indices of the open slots, ascending.
    pub fn open_indices(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|&(_, &locked)| !locked)
            .map(|(ix, _)| ix)
            .collect()
    }

    /// Append a slot.
    pub fn push(&mut self, locked: bool) {
        self.0.push(locked);
    }
}

impl fmt::Display for Locks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &locked in &self.0 {
            f.write_str(if locked { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl FromStr for Locks {
    type Err = ProgressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locks::parse(s)
    }
}

impl From<Vec<bool>> for Locks {
    fn from(flags: Vec<bool>) -> Self {
        Locks(flags)
    }
}

impl Serialize for Locks {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Flat per-slot record handed to external writers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChordRecord<'a> {
    /// Chord identifier.
    pub id: ChordId,
    /// Slot index.
    pub ix: usize,
    /// Chord type name.
    #[serde(rename = "type")]
    pub chord_type: &'static str,
    /// Chord type id.
    pub type_id: usize,
    /// Note names.
    pub notes: &'a [&'static str],
    /// MIDI numbers.
    pub midi_nums: &'a [u8],
    /// Slot duration.
    pub duration: &'a ChordDuration,
    /// Whether the slot is locked.
    pub locked: bool,
}

/// A chord progression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progression {
    name: String,
    bpm: f64,
    chords: Vec<Chord>,
    durations: Vec<ChordDuration>,
    locks: Locks,
}

impl Progression {
    /// Progression over `chords` with default durations, no locks, and the default tempo.
    pub fn new(chords: Vec<Chord>) -> Self {
        let n = chords.len();
        Progression {
            name: String::new(),
            bpm: DEFAULT_BPM,
            chords,
            durations: vec![ChordDuration::default(); n],
            locks: Locks::all_open(n),
        }
    }

    /// Return a builder.
    pub fn builder(chords: Vec<Chord>) -> ProgressionBuilder {
        ProgressionBuilder::new(chords)
    }

    /// Solve a fresh progression and give each chord a random duration in
    /// seconds drawn from `bounds`.
    ///
    /// Locks in `params` carry over when they cover every chord.
    pub fn generate<R: Rng + ?Sized>(
        solver: &Solver<'_>,
        params: &SolveParams<'_>,
        bounds: &DurationBounds,
        rng: &mut R,
    ) -> Result<Progression, ProgressionError> {
        let chords = solver.select_chords(params, rng)?;
        let durations = bounds
            .sample(chords.len(), rng)?
            .into_iter()
            .map(ChordDuration::Seconds)
            .collect();
        let locks = params
            .locks
            .filter(|locks| locks.len() == chords.len())
            .cloned()
            .unwrap_or_else(|| Locks::all_open(chords.len()));

        Progression::builder(chords)
            .durations(durations)
            .locks(locks)
            .build()
    }

    /// Name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tempo in beats per minute.
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Chords in order.
    pub fn chords(&self) -> &[Chord] {
        &self.chords
    }

    /// Per-slot durations.
    pub fn durations(&self) -> &[ChordDuration] {
        &self.durations
    }

    /// Per-slot locks.
    pub fn locks(&self) -> &Locks {
        &self.locks
    }

    /// Number of chords.
    pub fn len(&self) -> usize {
        self.chords.len()
    }

    /// True with no chords.
    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }

    /// Iterate over the chords.
    pub fn iter(&self) -> std::slice::Iter<'_, Chord> {
        self.chords.iter()
    }

    /// A progression of the same length, keeping locked chords and re-solving
    /// the open slots with no shared-note requirement over the default range.
    pub fn get_new_solution<R: Rng + ?Sized>(
        &self,
        solver: &Solver<'_>,
        rng: &mut R,
    ) -> Result<Progression, ProgressionError> {
        let params = SolveParams {
            n_chords: self.len(),
            pct_notes_common: 0.0,
            note_range_low: DEFAULT_NOTE_RANGE_LOW,
            note_range_high: DEFAULT_NOTE_RANGE_HIGH,
            existing_chords: &self.chords,
            locks: Some(&self.locks),
            ..SolveParams::default()
        };
        let chords = solver.select_chords(&params, rng)?;

        Ok(Progression {
            chords,
            ..self.clone()
        })
    }

    /// This progression with one freshly solved chord appended.
    ///
    /// Every existing chord is kept; the new slot is open and uses the default
    /// duration.
    pub fn with_added_chord<R: Rng + ?Sized>(
        &self,
        solver: &Solver<'_>,
        rng: &mut R,
    ) -> Result<Progression, ProgressionError> {
        let n_chords = self.len() + 1;
        let mut solve_locks = Locks::all_locked(self.len());
        solve_locks.push(false);

        let params = SolveParams {
            n_chords,
            pct_notes_common: 0.0,
            existing_chords: &self.chords,
            locks: Some(&solve_locks),
            ..SolveParams::default()
        };
        let chords = solver.select_chords(&params, rng)?;

        let mut durations = self.durations.clone();
        durations.push(ChordDuration::default());
        let mut locks = self.locks.clone();
        locks.push(false);

        Ok(Progression {
            name: self.name.clone(),
            bpm: self.bpm,
            chords,
            durations,
            locks,
        })
    }

    /// Per-slot records for external writers.
    pub fn records(&self) -> Vec<ChordRecord<'_>> {
        self.chords
            .iter()
            .zip(&self.durations)
            .enumerate()
            .map(|(ix, (chord, duration))| ChordRecord {
                id: chord.id(),
                ix,
                chord_type: chord.chord_type().name,
                type_id: chord.chord_type().id,
                notes: chord.notes(),
                midi_nums: chord.midi_nums(),
                duration,
                locked: self.locks.is_locked(ix),
            })
            .collect()
    }

    /// Render [`Progression::records`] as a JSON array.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.records())
    }
}

impl<'a> IntoIterator for &'a Progression {
    type Item = &'a Chord;
    type IntoIter = std::slice::Iter<'a, Chord>;

    fn into_iter(self) -> Self::IntoIter {
        self.chords.iter()
    }
}

/// Builder for [`Progression`], validating per-slot lengths.
#[derive(Debug, Clone)]
pub struct ProgressionBuilder {
    chords: Vec<Chord>,
    durations: Option<Vec<ChordDuration>>,
    locks: Option<Locks>,
    bpm: f64,
    name: String,
}

impl ProgressionBuilder {
    /// Start from `chords`.
    pub fn new(chords: Vec<Chord>) -> Self {
        ProgressionBuilder {
            chords,
            durations: None,
            locks: None,
            bpm: DEFAULT_BPM,
            name: String::new(),
        }
    }

    /// Set per-slot durations.
    pub fn durations(mut self, durations: Vec<ChordDuration>) -> Self {
        self.durations = Some(durations);
        self
    }

    /// Set per-slot locks.
    pub fn locks(mut self, locks: Locks) -> Self {
        self.locks = Some(locks);
        self
    }

    /// Set the tempo.
    pub fn bpm(mut self, bpm: f64) -> Self {
        self.bpm = bpm;
        self
    }

    /// Set the name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Build, checking that durations and locks match the chord count.
    pub fn build(self) -> Result<Progression, ProgressionError> {
        let n = self.chords.len();

        let durations = self
            .durations
            .unwrap_or_else(|| vec![ChordDuration::default(); n]);
        if durations.len() != n {
            return Err(ProgressionError::LengthMismatch {
                field: "durations",
                expected: n,
                actual: durations.len(),
            });
        }

        let locks = self.locks.unwrap_or_else(|| Locks::all_open(n));
        if locks.len() != n {
            return Err(ProgressionError::LengthMismatch {
                field: "locks",
                expected: n,
                actual: locks.len(),
            });
        }

        Ok(Progression {
            name: self.name,
            bpm: self.bpm,
            chords: self.chords,
            durations,
            locks,
        })
    }
}
