//! Progression solver
//!
//! Fills the open slots of a progression with randomly chosen chord types,
//! rotations and voicings so that every new chord shares enough pitch classes
//! with its neighbours. Locked slots are returned untouched.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::chord::Chord;
use crate::classifier::ChordClassifier;
use crate::pitch::{self, NoteError, MAX_MIDI_NUM, SEMITONES};
use crate::progression::Locks;
use crate::template::Template;
use crate::type_templates::{ChordType, TemplateError, TemplateTable};

/// Lowest note of the default voicing range (C4).
pub const DEFAULT_NOTE_RANGE_LOW: u8 = 60;

/// Highest note of the default voicing range (C8).
pub const DEFAULT_NOTE_RANGE_HIGH: u8 = 108;

/// Errors raised while solving.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    /// Every allowed chord type was rejected for a slot.
    #[error("no chord type meets the constraints at index {index}")]
    Unsatisfiable {
        /// The slot that could not be filled.
        index: usize,
    },

    /// The chosen type has no rotation that fits the neighbours.
    #[error("no rotation of `{chord_type}` fits the neighbours of index {index}")]
    NoRotations {
        /// The slot that could not be filled.
        index: usize,
        /// The chord type whose rotations were tried.
        chord_type: String,
    },

    /// No spaced voicing was found within the retry budget.
    #[error("no spaced voicing found after {attempts} attempts")]
    VoicingAttemptsExhausted {
        /// Attempts made.
        attempts: usize,
    },

    /// The note range is inverted, out of MIDI bounds, or narrower than an octave.
    #[error("invalid note range {low}..={high}")]
    InvalidRange {
        /// Requested lowest note.
        low: u8,
        /// Requested highest note.
        high: u8,
    },

    /// The shared-note threshold must lie in `[0, 1]`.
    #[error("pct_notes_common must be within [0, 1], got {value}")]
    InvalidThreshold {
        /// The rejected threshold.
        value: f64,
    },

    /// An allowed chord type name is not in the table.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// An existing chord or note could not be read.
    #[error(transparent)]
    Note(#[from] NoteError),
}

/// Tunable limits of the solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Fewest pitch classes a chosen type may have.
    pub n_notes_min: usize,
    /// Most pitch classes a chosen type may have.
    pub n_notes_max: usize,
    /// Notes below this MIDI number must be spread apart (E3).
    pub spacing_cutoff: u8,
    /// Minimum gap in semitones between consecutive low notes.
    pub min_spacing: u8,
    /// Voicing draws before giving up on a slot.
    pub max_voicing_attempts: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            n_notes_min: 1,
            n_notes_max: 12,
            spacing_cutoff: 52,
            min_spacing: 4,
            max_voicing_attempts: 1000,
        }
    }
}

/// Builder for [`Solver`].
#[derive(Debug, Clone, Default)]
pub struct SolverBuilder {
    config: SolverConfig,
}

impl SolverBuilder {
    /// Start from the default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the allowed range of pitch-class counts.
    pub fn n_notes(mut self, min: usize, max: usize) -> Self {
        self.config.n_notes_min = min;
        self.config.n_notes_max = max;
        self
    }

    /// Set the low-register spacing rule.
    pub fn spacing(mut self, cutoff: u8, min_spacing: u8) -> Self {
        self.config.spacing_cutoff = cutoff;
        self.config.min_spacing = min_spacing;
        self
    }

    /// Set the voicing retry budget.
    pub fn max_voicing_attempts(mut self, attempts: usize) -> Self {
        self.config.max_voicing_attempts = attempts.max(1);
        self
    }

    /// Build a solver over the built-in table.
    pub fn build(self) -> Solver<'static> {
        Solver {
            config: self.config,
            classifier: ChordClassifier::standard(),
        }
    }

    /// Build a solver over a caller-supplied table.
    pub fn build_with_table(self, table: &TemplateTable) -> Solver<'_> {
        Solver {
            config: self.config,
            classifier: ChordClassifier::new(table),
        }
    }
}

/// What to solve for.
#[derive(Debug, Clone)]
pub struct SolveParams<'a> {
    /// Number of chords in the result.
    pub n_chords: usize,
    /// Minimum fraction of pitch classes shared with each neighbour.
    pub pct_notes_common: f64,
    /// Lowest MIDI number a voicing may use.
    pub note_range_low: u8,
    /// Highest MIDI number a voicing may use.
    pub note_range_high: u8,
    /// Chord type names to draw from; empty means every type.
    pub allowed_chord_types: &'a [&'a str],
    /// Chords already in place, indexed like the result.
    pub existing_chords: &'a [Chord],
    /// Which slots to keep; `None` leaves every slot open.
    pub locks: Option<&'a Locks>,
}

impl Default for SolveParams<'_> {
    fn default() -> Self {
        SolveParams {
            n_chords: 5,
            pct_notes_common: 0.0,
            note_range_low: DEFAULT_NOTE_RANGE_LOW,
            note_range_high: DEFAULT_NOTE_RANGE_HIGH,
            allowed_chord_types: &[],
            existing_chords: &[],
            locks: None,
        }
    }
}

/// Constraint-satisfying chord generator.
#[derive(Debug, Clone)]
pub struct Solver<'t> {
    config: SolverConfig,
    classifier: ChordClassifier<'t>,
}

impl Default for Solver<'static> {
    fn default() -> Self {
        SolverBuilder::new().build()
    }
}

impl<'t> Solver<'t> {
    /// Return a builder.
    pub fn builder() -> SolverBuilder {
        SolverBuilder::new()
    }

    /// Active limits.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// The classifier used to label new chords.
    pub fn classifier(&self) -> &ChordClassifier<'t> {
        &self.classifier
    }

    /// Produce `params.n_chords` chords.
    ///
    /// Open slots are filled left to right; each one looks at the chord
    /// already chosen before it and the existing chord after it. A `locks`
    /// string of the wrong length is treated as fully locked.
    pub fn select_chords<R: Rng + ?Sized>(
        &self,
        params: &SolveParams<'_>,
        rng: &mut R,
    ) -> Result<Vec<Chord>, SolverError> {
        validate_params(params)?;

        let n_chords = params.n_chords;
        let allowed = self.resolve_allowed(params.allowed_chord_types)?;

        let locks = match params.locks {
            None => Locks::all_open(n_chords),
            Some(locks) if locks.len() == n_chords => locks.clone(),
            Some(locks) => {
                error!(
                    "`locks` has length {} but n_chords is {n_chords}. Falling back to all locks.",
                    locks.len()
                );
                Locks::all_locked(n_chords)
            }
        };
        debug!("Locks: {locks}");

        let mut rotations: Vec<Option<Template>> = (0..n_chords)
            .map(|ix| {
                params
                    .existing_chords
                    .get(ix)
                    .map(|c| c.template().clone())
                    .filter(|t| t.ones() > 0)
            })
            .collect();
        let mut voicings: Vec<Option<Vec<u8>>> = vec![None; n_chords];

        let open_ixs = locks.open_indices();
        debug!("Indexes to fill: {open_ixs:?}");

        for ix in open_ixs {
            let preceding = ix.checked_sub(1).and_then(|p| rotations[p].clone());
            let succeeding = rotations.get(ix + 1).cloned().flatten();

            let (chord_type, template) = self
                .choose_template(
                    &allowed,
                    params.pct_notes_common,
                    preceding.as_ref(),
                    succeeding.as_ref(),
                    rng,
                )
                .ok_or(SolverError::Unsatisfiable { index: ix })?;

            let possible = self.possible_rotations(
                &template,
                &[preceding.as_ref(), succeeding.as_ref()],
                params.pct_notes_common,
            );
            let rotation = match possible.choose(rng) {
                Some(rotation) => rotation.clone(),
                None => {
                    warn!("No possible rotations of {chord_type} at index {ix}");
                    return Err(SolverError::NoRotations {
                        index: ix,
                        chord_type: chord_type.name.to_string(),
                    });
                }
            };

            let voicing =
                self.select_voicing(&rotation, params.note_range_low, params.note_range_high, rng)?;
            debug!("Selected for ix {ix}: ( {voicing:?}, {chord_type} )");

            rotations[ix] = Some(rotation);
            voicings[ix] = Some(voicing);
        }

        (0..n_chords)
            .map(|ix| -> Result<Chord, SolverError> {
                match (&voicings[ix], params.existing_chords.get(ix)) {
                    (Some(voicing), _) => {
                        Ok(Chord::from_midi_numbers_with(&self.classifier, voicing, rng)?)
                    }
                    (None, Some(existing)) => Ok(existing.clone()),
                    (None, None) => Ok(Chord::from_midi_numbers_with(&self.classifier, &[], rng)?),
                }
            })
            .collect()
    }

    /// Does `template` fit between the given neighbours?
    ///
    /// Its pitch-class count must lie within the configured bounds, and for each
    /// neighbour the best rotational overlap must pass [`high_enough_match`].
    pub fn template_meets_constraints(
        &self,
        template: &Template,
        pct_notes_common: f64,
        preceding: Option<&Template>,
        succeeding: Option<&Template>,
    ) -> bool {
        let n_notes = template.ones();
        if n_notes < self.config.n_notes_min || n_notes > self.config.n_notes_max {
            return false;
        }

        [preceding, succeeding].into_iter().flatten().all(|neighbor| {
            let overlap = template.max_common_ones(neighbor);
            high_enough_match(overlap, n_notes, neighbor.ones(), pct_notes_common)
        })
    }

    /// Rotations of `template` that fit the present neighbours.
    ///
    /// Rotations fitting every neighbour are preferred; when none does, any
    /// rotation fitting at least one neighbour is accepted. With no neighbours
    /// every rotation is possible.
    pub fn possible_rotations(
        &self,
        template: &Template,
        neighbors: &[Option<&Template>],
        pct_notes_common: f64,
    ) -> Vec<Template> {
        let present: Vec<&Template> = neighbors.iter().flatten().copied().collect();
        if present.is_empty() {
            return template.rotations();
        }

        let fits = |rotation: &Template, neighbor: &Template| {
            high_enough_match(
                rotation.n_common_ones(neighbor),
                rotation.ones(),
                neighbor.ones(),
                pct_notes_common,
            )
        };

        let rotations = template.rotations();
        let fit_all: Vec<Template> = rotations
            .iter()
            .filter(|r| present.iter().all(|n| fits(r, n)))
            .cloned()
            .collect();
        if !fit_all.is_empty() {
            return fit_all;
        }

        rotations
            .into_iter()
            .filter(|r| present.iter().any(|n| fits(r, n)))
            .collect()
    }

    /// Place a pitch-class rotation into `[low, high]`.
    ///
    /// Each pitch class gets one randomly chosen octave; draws repeat until the
    /// low register is spaced, up to the configured retry budget. A pitch class
    /// with no MIDI number in `[low, high]` is a [`SolverError::InvalidRange`].
    pub fn select_voicing<R: Rng + ?Sized>(
        &self,
        rotation: &Template,
        low: u8,
        high: u8,
        rng: &mut R,
    ) -> Result<Vec<u8>, SolverError> {
        let top = high.min(MAX_MIDI_NUM);
        let options: Vec<Vec<u8>> = rotation
            .one_indices()
            .into_iter()
            .map(|pc| {
                (low..=top)
                    .filter(|n| *n as usize % SEMITONES == pc)
                    .collect::<Vec<u8>>()
            })
            .collect();
        if options.iter().any(Vec::is_empty) {
            return Err(SolverError::InvalidRange { low, high });
        }

        for _ in 0..self.config.max_voicing_attempts {
            let mut voicing: Vec<u8> = options
                .iter()
                .filter_map(|opts| opts.choose(rng).copied())
                .collect();
            voicing.sort_unstable();

            if self.is_voicing_spaced(&voicing) {
                return Ok(voicing);
            }
        }

        Err(SolverError::VoicingAttemptsExhausted {
            attempts: self.config.max_voicing_attempts,
        })
    }

    /// Are consecutive notes below the spacing cutoff far enough apart?
    pub fn is_voicing_spaced(&self, voicing: &[u8]) -> bool {
        let mut low_notes: Vec<u8> = voicing
            .iter()
            .copied()
            .filter(|&n| n < self.config.spacing_cutoff)
            .collect();
        low_notes.sort_unstable();

        low_notes
            .windows(2)
            .all(|w| w[1] - w[0] >= self.config.min_spacing)
    }

    fn resolve_allowed(&self, names: &[&str]) -> Result<Vec<(ChordType, Template)>, SolverError> {
        let table = self.classifier.table();
        if names.is_empty() {
            return Ok(table
                .iter()
                .skip(1)
                .map(|e| (e.chord_type, e.template.clone()))
                .collect());
        }

        names
            .iter()
            .map(|name| {
                let entry = table.by_name(name)?;
                Ok((entry.chord_type, entry.template.clone()))
            })
            .collect()
    }

    fn choose_template<R: Rng + ?Sized>(
        &self,
        allowed: &[(ChordType, Template)],
        pct_notes_common: f64,
        preceding: Option<&Template>,
        succeeding: Option<&Template>,
        rng: &mut R,
    ) -> Option<(ChordType, Template)> {
        let mut pool = allowed.to_vec();

        while !pool.is_empty() {
            let ix = rng.gen_range(0..pool.len());
            let (chord_type, template) = pool.swap_remove(ix);
            if self.template_meets_constraints(&template, pct_notes_common, preceding, succeeding) {
                return Some((chord_type, template));
            }
        }

        warn!("No chord types meet constraints.");
        None
    }
}

/// Does `num` reach `thresh` as a fraction of either denominator?
///
/// A zero denominator never matches.
pub fn high_enough_match(num: usize, denom_1: usize, denom_2: usize, thresh: f64) -> bool {
    if denom_1 == 0 || denom_2 == 0 {
        return false;
    }

    let pct_1 = num as f64 / denom_1 as f64;
    let pct_2 = num as f64 / denom_2 as f64;

    pct_1 >= thresh || pct_2 >= thresh
}

/// Re-voice `notes` randomly within `[low, high]`, keeping their pitch classes.
///
/// A MIDI number is not reused while another option exists. A pitch class with
/// no option in range keeps its original note.
pub fn shuffle_voicing<S: AsRef<str>, R: Rng + ?Sized>(
    notes: &[S],
    low: u8,
    high: u8,
    rng: &mut R,
) -> Result<Vec<&'static str>, NoteError> {
    let mut voicing: Vec<u8> = Vec::with_capacity(notes.len());

    for note in notes {
        let original = pitch::note_to_midi(note.as_ref())?;
        let pc = pitch::pitch_class_of_midi(original);

        let mut opts: Vec<u8> = (low..=high.min(MAX_MIDI_NUM))
            .filter(|n| pitch::pitch_class_of_midi(*n) == pc)
            .collect();
        opts.shuffle(rng);

        let choice = opts
            .iter()
            .copied()
            .find(|opt| !voicing.contains(opt))
            .or_else(|| opts.last().copied())
            .unwrap_or(original);
        voicing.push(choice);
    }

    voicing.sort_unstable();
    voicing.into_iter().map(pitch::midi_to_note).collect()
}

fn validate_params(params: &SolveParams<'_>) -> Result<(), SolverError> {
    let pct = params.pct_notes_common;
    if !(0.0..=1.0).contains(&pct) {
        return Err(SolverError::InvalidThreshold { value: pct });
    }

    let (low, high) = (params.note_range_low, params.note_range_high);
    if low > high || high > MAX_MIDI_NUM || usize::from(high - low) + 1 < SEMITONES {
        return Err(SolverError::InvalidRange { low, high });
    }

    Ok(())
}
