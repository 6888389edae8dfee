//! MIDI loading
//!
//! Reads a Standard MIDI File with `midly` and flattens every non-drum track
//! into timed notes. Tick positions are converted to seconds through the
//! file's tempo map.

use std::collections::{HashMap, VecDeque};
use std::path::Path;

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use serde::Serialize;
use tracing::debug;

use crate::harman::ExtractError;
use crate::progression::DEFAULT_BPM;

/// General MIDI percussion channel (channel 10, zero-based).
pub const DRUM_CHANNEL: u8 = 9;

const DEFAULT_US_PER_BEAT: f64 = 500_000.0;

/// A note with absolute start and end times in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MidiNote {
    /// Onset in seconds.
    pub start: f64,
    /// Release in seconds.
    pub end: f64,
    /// MIDI note number.
    pub pitch: u8,
    /// Onset velocity.
    pub velocity: u8,
}

impl MidiNote {
    /// A note of velocity 100.
    pub fn new(start: f64, end: f64, pitch: u8) -> Self {
        MidiNote {
            start,
            end,
            pitch,
            velocity: 100,
        }
    }

    /// `end - start`.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// A tempo in effect from `time` onwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TempoChange {
    /// Seconds from the start of the file.
    pub time: f64,
    /// Beats per minute.
    pub bpm: f64,
}

/// Notes and tempo changes of one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MidiScore {
    /// Notes sorted by start time, then pitch.
    pub notes: Vec<MidiNote>,
    /// Tempo changes sorted by time; never empty.
    pub tempos: Vec<TempoChange>,
}

impl MidiScore {
    /// Score at the default tempo.
    pub fn from_notes(mut notes: Vec<MidiNote>) -> Self {
        sort_notes(&mut notes);
        MidiScore {
            notes,
            tempos: vec![TempoChange {
                time: 0.0,
                bpm: DEFAULT_BPM,
            }],
        }
    }

    /// Tempo of the first tempo change.
    pub fn initial_bpm(&self) -> f64 {
        self.tempos.first().map_or(DEFAULT_BPM, |t| t.bpm)
    }
}

/// Read and parse a MIDI file.
pub fn load_midi_file(path: impl AsRef<Path>) -> Result<MidiScore, ExtractError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_midi_bytes(&bytes)
}

/// Parse an in-memory MIDI file.
///
/// Note-ons with velocity 0 end a note. Offs pair with the earliest open on of
/// the same key and channel; unmatched ons and offs are dropped, as are notes
/// on the drum channel.
pub fn parse_midi_bytes(bytes: &[u8]) -> Result<MidiScore, ExtractError> {
    let smf = Smf::parse(bytes).map_err(|e| ExtractError::MalformedMidi {
        reason: e.to_string(),
    })?;
    let clock = TickClock::new(smf.header.timing, &smf.tracks);

    let mut notes = Vec::new();
    for (track_ix, track) in smf.tracks.iter().enumerate() {
        let mut tick: u64 = 0;
        let mut open: HashMap<(u8, u8), VecDeque<(f64, u8)>> = HashMap::new();

        for event in track {
            tick += u64::from(event.delta.as_int());

            let TrackEventKind::Midi { channel, message } = event.kind else {
                continue;
            };
            let channel = channel.as_int();
            if channel == DRUM_CHANNEL {
                continue;
            }
            let time = clock.seconds_at(tick);

            match message {
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                    open.entry((channel, key.as_int()))
                        .or_default()
                        .push_back((time, vel.as_int()));
                }
                MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                    let pitch = key.as_int();
                    match open.get_mut(&(channel, pitch)).and_then(VecDeque::pop_front) {
                        Some((start, velocity)) if time > start => notes.push(MidiNote {
                            start,
                            end: time,
                            pitch,
                            velocity,
                        }),
                        Some(_) => debug!("Dropping zero-length note {pitch} in track {track_ix}"),
                        None => debug!("Note off without note on: {pitch} in track {track_ix}"),
                    }
                }
                _ => {}
            }
        }

        let unterminated: usize = open.values().map(VecDeque::len).sum();
        if unterminated > 0 {
            debug!("Dropping {unterminated} unterminated notes in track {track_ix}");
        }
    }

    sort_notes(&mut notes);
    debug!("Parsed {} notes from {} tracks", notes.len(), smf.tracks.len());

    Ok(MidiScore {
        notes,
        tempos: clock.tempo_changes(),
    })
}

fn sort_notes(notes: &mut [MidiNote]) {
    notes.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.pitch.cmp(&b.pitch)));
}

#[derive(Debug, Clone, Copy)]
struct TempoPoint {
    tick: u64,
    seconds: f64,
    us_per_beat: f64,
}

enum TickClock {
    Metrical {
        ticks_per_beat: f64,
        points: Vec<TempoPoint>,
    },
    Timecode {
        ticks_per_second: f64,
    },
}

impl TickClock {
    fn new(timing: Timing, tracks: &[Vec<TrackEvent<'_>>]) -> Self {
        let ticks_per_beat = match timing {
            Timing::Metrical(tpb) => f64::from(tpb.as_int().max(1)),
            Timing::Timecode(fps, subframes) => {
                return TickClock::Timecode {
                    ticks_per_second: (f64::from(fps.as_f32()) * f64::from(subframes)).max(1.0),
                };
            }
        };

        let mut tempo_events: Vec<(u64, f64)> = Vec::new();
        for track in tracks {
            let mut tick: u64 = 0;
            for event in track {
                tick += u64::from(event.delta.as_int());
                if let TrackEventKind::Meta(MetaMessage::Tempo(us)) = event.kind {
                    tempo_events.push((tick, f64::from(us.as_int())));
                }
            }
        }
        tempo_events.sort_by_key(|&(tick, _)| tick);

        let mut points = vec![TempoPoint {
            tick: 0,
            seconds: 0.0,
            us_per_beat: DEFAULT_US_PER_BEAT,
        }];
        for (tick, us_per_beat) in tempo_events {
            let Some(last) = points.last_mut() else {
                continue;
            };
            if last.tick == tick {
                last.us_per_beat = us_per_beat;
                continue;
            }
            let seconds = last.seconds
                + (tick - last.tick) as f64 * last.us_per_beat / 1_000_000.0 / ticks_per_beat;
            points.push(TempoPoint {
                tick,
                seconds,
                us_per_beat,
            });
        }

        TickClock::Metrical {
            ticks_per_beat,
            points,
        }
    }

    fn seconds_at(&self, tick: u64) -> f64 {
        match self {
            TickClock::Timecode { ticks_per_second } => tick as f64 / ticks_per_second,
            TickClock::Metrical {
                ticks_per_beat,
                points,
            } => {
                let ix = points.partition_point(|p| p.tick <= tick).saturating_sub(1);
                let p = points[ix];
                p.seconds + (tick - p.tick) as f64 * p.us_per_beat / 1_000_000.0 / ticks_per_beat
            }
        }
    }

    fn tempo_changes(&self) -> Vec<TempoChange> {
        match self {
            TickClock::Timecode { .. } => vec![TempoChange {
                time: 0.0,
                bpm: DEFAULT_BPM,
            }],
            TickClock::Metrical { points, .. } => points
                .iter()
                .map(|p| TempoChange {
                    time: p.seconds,
                    bpm: 60_000_000.0 / p.us_per_beat,
                })
                .collect(),
        }
    }
}
