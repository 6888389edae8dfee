//! HarmAn chord labeling
//!
//! Segments a note stream into chord spans and labels each span, after Pardo &
//! Birmingham, "Algorithms for Chordal Analysis" (CMJ 2002).
//!
//! The stream is cut into *partition points* wherever the set of sounding notes
//! changes. Consecutive points bound *minimal segments*, each scored against
//! every rotation of every candidate chord template. A single greedy pass then
//! merges minimal segments into spans for as long as merging scores at least as
//! well as splitting.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::chord::{Chord, ChordDuration};
use crate::chroma::ChromaError;
use crate::classifier::ChordClassifier;
use crate::midi::{self, MidiNote, MidiScore};
use crate::pitch::{self, NoteError, SEMITONES};
use crate::progression::{Progression, ProgressionError};
use crate::simplify::{self, SimplifyConfig};
use crate::template::Template;
use crate::type_templates::{ChordType, TemplateTable};

/// Errors raised while extracting chords from symbolic input.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A span with no minimal segments reached labeling.
    #[error("empty segment {start}..{end}")]
    EmptySegment {
        /// First minimal segment of the span.
        start: usize,
        /// One past the last minimal segment of the span.
        end: usize,
    },

    /// No chord type has a note count inside the configured bounds.
    #[error("no template labels with between {min} and {max} notes")]
    NoTemplateLabels {
        /// Configured minimum.
        min: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The input could not be parsed as MIDI.
    #[error("malformed MIDI: {reason}")]
    MalformedMidi {
        /// Parser message.
        reason: String,
    },

    /// The input file could not be read.
    #[error("failed reading {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A note is outside the MIDI range.
    #[error(transparent)]
    Note(#[from] NoteError),

    /// The extracted chords could not form a progression.
    #[error(transparent)]
    Progression(#[from] ProgressionError),

    /// Chroma features could not be computed.
    #[error(transparent)]
    Chroma(#[from] ChromaError),
}

/// Bounds on the chord types used as labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarmanConfig {
    /// Fewest pitch classes a label template may have.
    pub min_num_notes: usize,
    /// Most pitch classes a label template may have.
    pub max_num_notes: usize,
}

impl Default for HarmanConfig {
    fn default() -> Self {
        HarmanConfig {
            min_num_notes: 3,
            max_num_notes: 6,
        }
    }
}

/// Builder for [`Harman`].
#[derive(Debug, Clone, Default)]
pub struct HarmanBuilder {
    config: HarmanConfig,
}

impl HarmanBuilder {
    /// Start from the default bounds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn config(mut self, config: HarmanConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the allowed label sizes.
    pub fn num_notes(mut self, min: usize, max: usize) -> Self {
        self.config.min_num_notes = min;
        self.config.max_num_notes = max;
        self
    }

    /// Build over the built-in table.
    pub fn build(self) -> Harman<'static> {
        self.build_with_table(TemplateTable::standard())
    }

    /// Build over a caller-supplied table.
    pub fn build_with_table(self, table: &TemplateTable) -> Harman<'_> {
        let labels =
            TemplateLabels::new(table, self.config.min_num_notes, self.config.max_num_notes);
        Harman {
            config: self.config,
            table,
            labels,
        }
    }
}

/// One candidate label and its distinct rotations.
#[derive(Debug, Clone)]
pub struct TemplateLabel {
    /// The chord type.
    pub chord_type: ChordType,
    /// Every distinct rotation of its template.
    pub rotations: Vec<Template>,
}

/// Candidate labels in table order.
#[derive(Debug, Clone, Default)]
pub struct TemplateLabels {
    labels: Vec<TemplateLabel>,
}

impl TemplateLabels {
    /// Chord types of `table` whose note count lies in `[min, max]`.
    pub fn new(table: &TemplateTable, min: usize, max: usize) -> Self {
        let labels = table
            .iter()
            .filter(|e| (min..=max).contains(&e.template.ones()))
            .map(|e| TemplateLabel {
                chord_type: e.chord_type,
                rotations: e.template.rotations(),
            })
            .collect();
        TemplateLabels { labels }
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True with no labels.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterate over the labels.
    pub fn iter(&self) -> std::slice::Iter<'_, TemplateLabel> {
        self.labels.iter()
    }

    /// Best rotation score of each label, parallel to [`TemplateLabels::iter`].
    pub fn scores(&self, pc_weights: &[u32; SEMITONES]) -> Vec<i64> {
        self.labels
            .iter()
            .map(|label| {
                label
                    .rotations
                    .iter()
                    .map(|rotation| template_score(pc_weights, rotation))
                    .max()
                    .unwrap_or(i64::MIN)
            })
            .collect()
    }
}

/// Score weighted pitch classes against one template.
///
/// `P - (M + N)`: the weight on template members, less the weight on
/// non-members and the number of members with no weight at all.
pub fn template_score(pc_weights: &[u32; SEMITONES], template: &Template) -> i64 {
    let mut positive = 0i64;
    let mut negative = 0i64;

    for (pc, &weight) in pc_weights.iter().enumerate() {
        if weight == 0 {
            continue;
        }
        if template.is_set(pc) {
            positive += i64::from(weight);
        } else {
            negative += i64::from(weight);
        }
    }

    let misses = template
        .one_indices()
        .into_iter()
        .filter(|&pc| pc_weights.get(pc).copied().unwrap_or(0) == 0)
        .count() as i64;

    positive - (misses + negative)
}

/// A note starting or ending.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NoteEvent {
    /// Seconds.
    pub time: f64,
    /// MIDI number.
    pub pitch: u8,
    /// `true` for a start, `false` for an end.
    pub is_onset: bool,
}

/// Turn notes into onset and offset events sorted by time.
///
/// Notes that end before they start are skipped.
pub fn parse_events(notes: &[MidiNote]) -> Vec<NoteEvent> {
    let mut events: Vec<NoteEvent> = notes
        .iter()
        .filter(|n| {
            let ordered = n.start <= n.end;
            if !ordered {
                debug!(
                    "Skipping note {} ending at {} before its start {}",
                    n.pitch, n.end, n.start
                );
            }
            ordered
        })
        .flat_map(|n| {
            [
                NoteEvent {
                    time: n.start,
                    pitch: n.pitch,
                    is_onset: true,
                },
                NoteEvent {
                    time: n.end,
                    pitch: n.pitch,
                    is_onset: false,
                },
            ]
        })
        .collect();
    events.sort_by(|a, b| a.time.total_cmp(&b.time));
    events
}

/// A time at which notes start or stop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionPoint {
    /// Seconds.
    pub time: f64,
    /// Notes starting here.
    pub onsets: Vec<u8>,
    /// Notes ending here.
    pub offsets: Vec<u8>,
}

impl PartitionPoint {
    fn new(time: f64) -> Self {
        PartitionPoint {
            time,
            onsets: Vec::new(),
            offsets: Vec::new(),
        }
    }

    fn add_event(&mut self, event: &NoteEvent) {
        if event.is_onset {
            self.onsets.push(event.pitch);
        } else {
            self.offsets.push(event.pitch);
        }
    }
}

/// Coalesce time-sorted events into partition points.
///
/// Events merge only when their times are exactly equal.
pub fn partition_points(events: &[NoteEvent]) -> Vec<PartitionPoint> {
    let mut points: Vec<PartitionPoint> = Vec::new();

    for event in events {
        match points.last_mut() {
            Some(point) if point.time == event.time => point.add_event(event),
            _ => {
                let mut point = PartitionPoint::new(event.time);
                point.add_event(event);
                points.push(point);
            }
        }
    }

    debug!("--- {} partition points ---", points.len());
    for (ix, p) in points.iter().enumerate() {
        debug!("  p{ix} time {} onsets {:?} offsets {:?}", p.time, p.onsets, p.offsets);
    }

    points
}

/// The interval between two consecutive partition points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinimalSegment {
    /// Seconds.
    pub start: f64,
    /// Seconds.
    pub end: f64,
    /// Sounding notes, one entry per sounding voice.
    pub midi_nums: Vec<u8>,
}

impl MinimalSegment {
    /// Occurrences of each pitch class.
    pub fn pitch_class_weights(&self) -> [u32; SEMITONES] {
        let mut weights = [0u32; SEMITONES];
        for &n in &self.midi_nums {
            weights[usize::from(pitch::pitch_class_of_midi(n))] += 1;
        }
        weights
    }

    /// Occurrences of each MIDI number.
    pub fn note_occurrences(&self) -> BTreeMap<u8, usize> {
        let mut counts = BTreeMap::new();
        for &n in &self.midi_nums {
            *counts.entry(n).or_insert(0) += 1;
        }
        counts
    }

    /// Best rotation score of each label.
    pub fn template_scores(&self, labels: &TemplateLabels) -> Vec<(ChordType, i64)> {
        labels
            .iter()
            .map(|l| l.chord_type)
            .zip(labels.scores(&self.pitch_class_weights()))
            .collect()
    }

    /// True when nothing sounds.
    pub fn is_rest(&self) -> bool {
        self.midi_nums.is_empty()
    }
}

/// Derive the sounding notes between each pair of consecutive points.
///
/// Each segment carries its predecessor's notes, adds the new onsets and
/// removes one instance per offset.
pub fn minimal_segments(points: &[PartitionPoint]) -> Vec<MinimalSegment> {
    let Some(first) = points.first() else {
        return Vec::new();
    };

    let mut segments = Vec::with_capacity(points.len().saturating_sub(1));
    let mut sounding = first.onsets.clone();
    let mut start = first.time;

    for point in &points[1..] {
        segments.push(MinimalSegment {
            start,
            end: point.time,
            midi_nums: sounding.clone(),
        });

        sounding.extend_from_slice(&point.onsets);
        for &off in &point.offsets {
            match sounding.iter().position(|&n| n == off) {
                Some(ix) => {
                    sounding.remove(ix);
                }
                None => debug!("Offset {off} at {} has no sounding note", point.time),
            }
        }
        start = point.time;
    }

    debug!("--- {} minimal segments ---", segments.len());
    segments
}

/// One labeled chord span.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledSegment {
    /// First minimal segment.
    pub start_segment: usize,
    /// Partition point ending the span.
    pub end_segment: usize,
    /// Seconds.
    pub start_time: f64,
    /// Seconds.
    pub end_time: f64,
    /// `end_time - start_time`.
    pub duration: f64,
    /// Chord type id of the label.
    pub label_id: usize,
    /// Chord type name of the label.
    pub label: &'static str,
    /// Summed best-rotation score of the label.
    pub score: i64,
    /// Distinct MIDI numbers in the span, ascending.
    pub midi_nums: Vec<u8>,
    /// Note names parallel to `midi_nums`.
    pub notes: Vec<&'static str>,
    /// Occurrences of each MIDI number summed over the minimal segments.
    pub note_counts: BTreeMap<u8, usize>,
}

impl LabeledSegment {
    /// The span's notes as a chord, with its own classification.
    pub fn chord(&self) -> Result<Chord, NoteError> {
        Chord::from_midi_numbers(&self.midi_nums)
    }
}

#[derive(Debug, Clone, Copy)]
struct SpanLabel {
    score: i64,
    chord_type: ChordType,
}

#[derive(Debug)]
struct GraphNode {
    point: usize,
    time: f64,
}

#[derive(Debug)]
struct GraphEdge {
    from: usize,
    to: usize,
    label: SpanLabel,
    note_counts: BTreeMap<u8, usize>,
}

/// Nodes are partition points, edges are committed spans.
#[derive(Debug, Default)]
struct SegmentGraph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

impl SegmentGraph {
    fn add_node(&mut self, point: usize, time: f64) -> usize {
        self.nodes.push(GraphNode { point, time });
        self.nodes.len() - 1
    }

    fn add_edge(&mut self, from: usize, to: usize, label: SpanLabel, note_counts: BTreeMap<u8, usize>) {
        self.edges.push(GraphEdge {
            from,
            to,
            label,
            note_counts,
        });
    }

    fn into_rows(self) -> Result<Vec<LabeledSegment>, NoteError> {
        let SegmentGraph { nodes, edges } = self;

        edges
            .into_iter()
            .map(|edge| -> Result<LabeledSegment, NoteError> {
                let (from, to) = (&nodes[edge.from], &nodes[edge.to]);
                let midi_nums: Vec<u8> = edge.note_counts.keys().copied().collect();
                let notes = midi_nums
                    .iter()
                    .map(|&n| pitch::midi_to_note(n))
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(LabeledSegment {
                    start_segment: from.point,
                    end_segment: to.point,
                    start_time: from.time,
                    end_time: to.time,
                    duration: to.time - from.time,
                    label_id: edge.label.chord_type.id,
                    label: edge.label.chord_type.name,
                    score: edge.label.score,
                    midi_nums,
                    notes,
                    note_counts: edge.note_counts,
                })
            })
            .collect()
    }
}

/// Symbolic chord extractor.
#[derive(Debug, Clone)]
pub struct Harman<'t> {
    config: HarmanConfig,
    table: &'t TemplateTable,
    labels: TemplateLabels,
}

impl Default for Harman<'static> {
    fn default() -> Self {
        HarmanBuilder::new().build()
    }
}

impl<'t> Harman<'t> {
    /// Return a builder.
    pub fn builder() -> HarmanBuilder {
        HarmanBuilder::new()
    }

    /// Active bounds.
    pub fn config(&self) -> &HarmanConfig {
        &self.config
    }

    /// Candidate labels.
    pub fn labels(&self) -> &TemplateLabels {
        &self.labels
    }

    /// Label a stream of note events. Events need not be sorted.
    ///
    /// Fewer than two distinct event times yield no spans.
    pub fn label_events(&self, events: &[NoteEvent]) -> Result<Vec<LabeledSegment>, ExtractError> {
        let mut events = events.to_vec();
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        for e in &events {
            pitch::validate_midi_num(i64::from(e.pitch))?;
        }

        let points = partition_points(&events);
        let segments = minimal_segments(&points);
        self.segment_and_label(&points, &segments)
    }

    /// Label timed notes.
    pub fn label_notes(&self, notes: &[MidiNote]) -> Result<Vec<LabeledSegment>, ExtractError> {
        self.label_events(&parse_events(notes))
    }

    /// Label every note of a parsed score.
    pub fn label_score(&self, score: &MidiScore) -> Result<Vec<LabeledSegment>, ExtractError> {
        self.label_notes(&score.notes)
    }

    /// Load and label a MIDI file; `None` when the file cannot be read or labeled.
    pub fn label_file(&self, path: impl AsRef<Path>) -> Option<Vec<LabeledSegment>> {
        let path = path.as_ref();
        debug!("Labeling {}", path.display());

        let labeled = midi::load_midi_file(path).and_then(|score| self.label_score(&score));
        match labeled {
            Ok(rows) => Some(rows),
            Err(e) => {
                error!("Failed for {}: {e}", path.display());
                None
            }
        }
    }

    /// Load a MIDI file, simplify its harmony and label it as a progression.
    ///
    /// Durations are in seconds; the tempo is the file's first positive tempo.
    pub fn extract_progression_from_midi(
        &self,
        path: impl AsRef<Path>,
        config: &SimplifyConfig,
    ) -> Result<Progression, ExtractError> {
        let path = path.as_ref();
        let score = midi::load_midi_file(path)?;
        let simplified = simplify::simplify_harmony(&score, config);
        let rows = self.label_score(&simplified)?;

        let bpm = score
            .tempos
            .iter()
            .map(|t| t.bpm)
            .find(|&bpm| bpm > 0.0)
            .unwrap_or_else(|| score.initial_bpm());

        let progression = self.progression_from_segments(&rows, bpm, path.display().to_string())?;
        info!(
            "Extracted {} chords from {}",
            progression.len(),
            path.display()
        );
        Ok(progression)
    }

    /// Build a progression from labeled spans, one chord per span.
    pub fn progression_from_segments(
        &self,
        rows: &[LabeledSegment],
        bpm: f64,
        name: impl Into<String>,
    ) -> Result<Progression, ExtractError> {
        let classifier = ChordClassifier::new(self.table);
        let mut rng = rand::thread_rng();

        let chords = rows
            .iter()
            .map(|row| Chord::from_midi_numbers_with(&classifier, &row.midi_nums, &mut rng))
            .collect::<Result<Vec<_>, _>>()?;
        let durations = rows
            .iter()
            .map(|row| ChordDuration::Seconds(row.duration))
            .collect();

        Ok(Progression::builder(chords)
            .durations(durations)
            .bpm(bpm)
            .name(name)
            .build()?)
    }

    fn segment_and_label(
        &self,
        points: &[PartitionPoint],
        segments: &[MinimalSegment],
    ) -> Result<Vec<LabeledSegment>, ExtractError> {
        if points.len() < 2 {
            debug!("Fewer than two partition points, nothing to label");
            return Ok(Vec::new());
        }
        if self.labels.is_empty() {
            return Err(ExtractError::NoTemplateLabels {
                min: self.config.min_num_notes,
                max: self.config.max_num_notes,
            });
        }

        let scores: Vec<Vec<i64>> = segments
            .iter()
            .map(|s| self.labels.scores(&s.pitch_class_weights()))
            .collect();

        debug!("--- Segmentation ---");
        let final_ix = points.len() - 1;
        let mut graph = SegmentGraph::default();

        let mut ui = 0;
        let mut u_node = graph.add_node(0, points[0].time);

        for vi in 1..final_ix {
            let uv_counts = span_note_counts(&segments[ui..vi]);
            if uv_counts.is_empty() {
                debug!("  {vi}/{final_ix} - Continue: No notes in segment");
                continue;
            }

            let uv = self.span_label(&scores, ui, vi)?;
            let vw = self.span_label(&scores, vi, vi + 1)?;
            let uw = self.span_label(&scores, ui, vi + 1)?;

            if uw.score < uv.score + vw.score {
                debug!(
                    "  {vi}/{final_ix} - New: {} ({}) < {} ({}) + {} ({})",
                    uw.chord_type, uw.score, uv.chord_type, uv.score, vw.chord_type, vw.score
                );
                let v_node = graph.add_node(vi, points[vi].time);
                graph.add_edge(u_node, v_node, uv, uv_counts);
                ui = vi;
                u_node = v_node;
            } else {
                debug!(
                    "  {vi}/{final_ix} - Continue: {} ({}) >= {} ({}) + {} ({})",
                    uw.chord_type, uw.score, uv.chord_type, uv.score, vw.chord_type, vw.score
                );
            }
        }

        let final_label = self.span_label(&scores, ui, final_ix)?;
        let final_counts = span_note_counts(&segments[ui..final_ix]);
        let final_node = graph.add_node(final_ix, points[final_ix].time);
        graph.add_edge(u_node, final_node, final_label, final_counts);

        debug!("--- {} segments ---", graph.edges.len());
        Ok(graph.into_rows()?)
    }

    /// Best label of minimal segments `start..end`; ties go to table order.
    fn span_label(&self, scores: &[Vec<i64>], start: usize, end: usize) -> Result<SpanLabel, ExtractError> {
        let span = scores
            .get(start..end)
            .filter(|s| !s.is_empty())
            .ok_or(ExtractError::EmptySegment { start, end })?;

        let mut totals = vec![0i64; self.labels.len()];
        for segment_scores in span {
            for (total, score) in totals.iter_mut().zip(segment_scores) {
                *total += score;
            }
        }

        let mut best: Option<SpanLabel> = None;
        for (label, &score) in self.labels.iter().zip(&totals) {
            let better = match best {
                Some(b) => score > b.score,
                None => true,
            };
            if better {
                best = Some(SpanLabel {
                    score,
                    chord_type: label.chord_type,
                });
            }
        }

        best.ok_or(ExtractError::NoTemplateLabels {
            min: self.config.min_num_notes,
            max: self.config.max_num_notes,
        })
    }
}

fn span_note_counts(segments: &[MinimalSegment]) -> BTreeMap<u8, usize> {
    let mut counts = BTreeMap::new();
    for segment in segments {
        for (n, c) in segment.note_occurrences() {
            *counts.entry(n).or_insert(0) += c;
        }
    }
    counts
}
