//! Integration tests for note, MIDI number and frequency conversions.

use chord_progressions::pitch::{
    self, freq_from_midi_num, freq_from_note, harmonic_overtones, increment_note,
    midi_nums_list_from_str, midi_to_note, note_list, note_name_of, note_to_midi,
    notes_from_midi_nums_str, notes_list_from_midi_nums_str, octave_of_note,
    pitch_class_of_note,
};
use chord_progressions::NoteError;

#[test]
fn test_midi_note_round_trip() {
    for num in 0..=127u8 {
        let note = midi_to_note(num).unwrap();
        assert_eq!(note_to_midi(note).unwrap(), num, "round trip failed for {note}");
    }
}

#[test]
fn test_known_notes() {
    assert_eq!(midi_to_note(0).unwrap(), "C-1");
    assert_eq!(midi_to_note(60).unwrap(), "C4");
    assert_eq!(midi_to_note(69).unwrap(), "A4");
    assert_eq!(midi_to_note(127).unwrap(), "G9");

    assert_eq!(note_to_midi("C4").unwrap(), 60);
    assert_eq!(note_to_midi("Db4").unwrap(), 61);
    assert_eq!(note_to_midi("C#4").unwrap(), 61);
    assert_eq!(note_to_midi("B-1").unwrap(), 11);
}

#[test]
fn test_out_of_range_midi_is_an_error() {
    assert_eq!(
        midi_to_note(128),
        Err(NoteError::MidiOutOfRange { num: 128 })
    );
    assert!(pitch::validate_midi_num(-1).is_err());
    assert!(pitch::validate_midi_num(128).is_err());
    assert_eq!(pitch::validate_midi_num(127).unwrap(), 127);
}

#[test]
fn test_invalid_note_names() {
    for bad in [
        "",
        "H4",
        "C",
        "C#x",
        "Ab10",
        "Cb-1",
        "C127",
        "C999999999999999999",
        "B-99999999999999999999",
    ] {
        assert!(
            matches!(note_to_midi(bad), Err(NoteError::InvalidNoteName { .. })),
            "`{bad}` should not parse"
        );
    }
}

#[test]
fn test_note_parts() {
    assert_eq!(note_name_of("A#4").unwrap(), "A#");
    assert_eq!(note_name_of("Bb2").unwrap(), "A#");
    assert_eq!(octave_of_note("C-1").unwrap(), -1);
    assert_eq!(octave_of_note("G9").unwrap(), 9);
    assert_eq!(pitch_class_of_note("A4").unwrap(), 9);
    assert_eq!(increment_note("B3").unwrap(), "C4");
}

#[test]
fn test_frequencies() {
    assert!((freq_from_midi_num(69) - 440.0).abs() < 1e-9);
    assert!((freq_from_note("A5").unwrap() - 880.0).abs() < 1e-9);
    assert!((freq_from_note("C4").unwrap() - 261.6256).abs() < 1e-3);

    assert_eq!(harmonic_overtones(100.0, 2), vec![100.0, 200.0, 300.0]);
}

#[test]
fn test_note_list() {
    assert_eq!(note_list(60, 62), &["C4", "C#4", "D4"]);
    assert_eq!(note_list(126, 200), &["F#9", "G9"]);
    assert!(note_list(62, 60).is_empty());
}

#[test]
fn test_midi_nums_strings() {
    assert_eq!(
        midi_nums_list_from_str("60-48_62-50"),
        vec![vec![60, 48], vec![62, 50]]
    );
    assert_eq!(midi_nums_list_from_str("60-48_a"), vec![vec![60, 48]]);
    assert_eq!(midi_nums_list_from_str("60-48_62-500"), vec![vec![60, 48]]);

    assert_eq!(notes_from_midi_nums_str("60-48").unwrap(), vec!["C4", "C3"]);
    assert_eq!(
        notes_list_from_midi_nums_str("60-64_57").unwrap(),
        vec![vec!["C4", "E4"], vec!["A3"]]
    );
    assert!(notes_from_midi_nums_str("60-128").is_err());
}
