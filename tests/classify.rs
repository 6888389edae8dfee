//! Integration tests for rotation matching, the chord type table and classification.

use chord_progressions::circular::{all_rotations, is_circular_match, shift_by_one};
use chord_progressions::rhythm::euclidean_sequence;
use chord_progressions::{
    Chord, ChordClassifier, ChordType, ClassifyError, Template, TemplateError, TemplateTable,
};
use lazy_static::lazy_static;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

lazy_static! {
    static ref CLASSIFIER: ChordClassifier<'static> = ChordClassifier::standard();
    static ref TRIADS: Vec<(Vec<&'static str>, &'static str)> = vec![
        (vec!["C4", "E4", "G4"], "major chord"),
        (vec!["E4", "G4", "C5"], "major chord"),
        (vec!["G2", "C4", "E5"], "major chord"),
        (vec!["A3", "C4", "E4"], "minor chord"),
        (vec!["C4", "Eb4", "G4"], "minor chord"),
        (vec!["C4", "Eb4", "Gb4"], "diminished chord"),
        (vec!["C4", "G4", "A4"], "incomplete minor-seventh chord"),
    ];
}

#[test]
fn test_circular_match() {
    assert!(is_circular_match(&[1, 0, 0], &[0, 1, 0]));
    assert!(is_circular_match(&[1, 1, 0, 1], &[1, 1, 1, 0]));
    assert!(!is_circular_match(&[1, 1, 0, 0], &[1, 0, 1, 0]));
    assert!(!is_circular_match(&[1, 0], &[1, 0, 0]));
    assert!(is_circular_match::<u8>(&[], &[]));
}

#[test]
fn test_euclidean_sequences_match_known_rhythms() {
    let cases: &[(usize, usize, &[u8])] = &[
        (4, 3, &[1, 0, 1, 1]),
        (5, 2, &[1, 0, 1, 0, 0]),
        (5, 3, &[1, 0, 1, 0, 1]),
        (6, 5, &[1, 0, 1, 1, 1, 1]),
        (7, 3, &[1, 0, 1, 0, 1, 0, 0]),
        (7, 5, &[1, 0, 1, 1, 0, 1, 1]),
        (8, 3, &[1, 0, 0, 1, 0, 0, 1, 0]),
        (8, 5, &[1, 0, 1, 1, 0, 1, 1, 0]),
        (8, 7, &[1, 0, 1, 1, 1, 1, 1, 1]),
        (9, 4, &[1, 0, 1, 0, 1, 0, 1, 0, 0]),
        (9, 5, &[1, 0, 1, 0, 1, 0, 1, 0, 1]),
        (11, 4, &[1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0]),
        (11, 5, &[1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 0]),
        (12, 5, &[1, 0, 0, 1, 0, 1, 0, 0, 1, 0, 1, 0]),
        (13, 5, &[1, 0, 0, 1, 0, 1, 0, 0, 1, 0, 1, 0, 0]),
        (16, 5, &[1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 0]),
    ];

    for &(n, k, expected) in cases {
        let seq = euclidean_sequence(n, k).unwrap();
        assert!(
            is_circular_match(&seq, expected),
            "E({k}, {n}) = {seq:?} is not a rotation of {expected:?}"
        );
    }
}

#[test]
fn test_rotations() {
    assert_eq!(shift_by_one(&[1, 2, 3]), vec![3, 1, 2]);

    let major = Template::from_bit_str("100010010000").unwrap();
    let rotations = major.rotations();
    assert_eq!(rotations.len(), 12);
    assert!(rotations.iter().all(|r| r.is_rotation_of(&major)));

    let whole_tone = [1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0];
    assert_eq!(all_rotations(&whole_tone).len(), 2);

    let augmented = Template::from_pitch_classes([0, 4, 8]);
    assert_eq!(augmented.rotations().len(), 4);
}

#[test]
fn test_template_overlap() {
    let t1 = Template::from_bits(&[1, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0]);
    let ones = Template::from_bits(&[1; 12]);
    let zeros = Template::from_bits(&[0; 12]);
    let whole_tone = Template::from_bits(&[1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0]);
    let whole_tone_2 = Template::from_bits(&[0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1]);

    assert_eq!(t1.max_common_ones(&t1.rotate(5)), 3);
    assert_eq!(t1.max_common_ones(&ones), 3);
    assert_eq!(t1.max_common_ones(&zeros), 0);
    assert_eq!(ones.max_common_ones(&zeros), 0);
    assert_eq!(t1.max_common_ones(&whole_tone), 2);
    assert_eq!(whole_tone.max_common_ones(&whole_tone_2), 6);

    assert_eq!(t1.n_common_ones(&whole_tone), 1);
    assert_eq!(t1.one_indices(), vec![0, 3, 7]);
    assert_eq!(t1.to_bit_string(), "100100010000");
}

#[test]
fn test_template_from_notes_collapses_octaves() {
    let template = Template::from_notes(&["C-1", "A4", "G9"]).unwrap();
    assert_eq!(template.bits(), &[1, 0, 0, 0, 0, 0, 0, 1, 0, 1, 0, 0]);

    let doubled = Template::from_notes(&["C3", "C4", "C5"]).unwrap();
    assert_eq!(doubled.ones(), 1);
}

#[test]
fn test_standard_table() {
    let table = TemplateTable::standard();
    assert_eq!(table.len(), 192);

    let empty = table.get(0).unwrap();
    assert!(empty.chord_type.is_empty());
    assert!(empty.template.is_empty());

    assert_eq!(table.id_of("major chord").unwrap(), 63);
    assert_eq!(table.id_of("minor chord").unwrap(), 59);
    assert_eq!(
        table.by_name("major chord").unwrap().template.to_bit_string(),
        "100010010000"
    );

    let types = table.types_from_id_str("59_63").unwrap();
    assert_eq!(
        types.iter().map(|t| t.name).collect::<Vec<_>>(),
        vec!["minor chord", "major chord"]
    );
    assert_eq!(table.types_from_id_str("_63").unwrap()[0], ChordType::EMPTY);

    assert!(matches!(
        table.id_of("not a chord"),
        Err(TemplateError::UnknownChordType { .. })
    ));
    assert!(matches!(
        table.get(500),
        Err(TemplateError::UnknownChordTypeId { id: 500 })
    ));
    assert_eq!(table.all_types().len(), 191);
}

#[test]
fn test_custom_table_validation() {
    let table = TemplateTable::from_entries(&[("", ""), ("power chord", "100000010000")]).unwrap();
    let classifier = ChordClassifier::new(&table);
    assert_eq!(
        classifier.classify_notes(&["G2", "D3", "G3"]).unwrap().name,
        "power chord"
    );
    assert!(classifier.classify_notes(&["C4", "E4", "G4"]).unwrap().is_empty());

    assert_eq!(
        TemplateTable::from_entries(&[("power chord", "100000010000")]).unwrap_err(),
        TemplateError::MissingEmptyType
    );
    assert!(matches!(
        TemplateTable::from_entries(&[("", ""), ("short", "1001")]),
        Err(TemplateError::InvalidTemplateString { .. })
    ));
    assert!(matches!(
        TemplateTable::from_entries(&[("", ""), ("a", "100000000000"), ("a", "110000000000")]),
        Err(TemplateError::DuplicateChordType { .. })
    ));
}

#[test]
fn test_classify_triads() {
    for (notes, expected) in TRIADS.iter() {
        let chord_type = CLASSIFIER.classify_notes(notes).unwrap();
        assert_eq!(chord_type.name, *expected, "misclassified {notes:?}");
    }
}

#[test]
fn test_classification_ignores_order_and_octave() {
    let a = CLASSIFIER.classify_notes(&["C4", "E4", "G4", "B4"]).unwrap();
    let b = CLASSIFIER.classify_notes(&["B1", "G6", "E2", "C3", "C5"]).unwrap();
    assert_eq!(a, b);
    assert!(!a.is_empty());
}

#[test]
fn test_unclassifiable_is_empty_type() {
    assert_eq!(CLASSIFIER.classify_midi_nums(&[]), ChordType::EMPTY);
    assert!(CLASSIFIER.classify_template(&Template::from_bits(&[1, 0, 1])).is_empty());
}

#[test]
fn test_notes_match_type() {
    assert!(CLASSIFIER.notes_match_type(&["A3", "C4", "E4"], "minor chord").unwrap());
    assert!(!CLASSIFIER.notes_match_type(&["A3", "C#4", "E4"], "minor chord").unwrap());
    assert!(matches!(
        CLASSIFIER.notes_match_type(&["C4"], "no such chord"),
        Err(ClassifyError::Template(_))
    ));
    assert!(matches!(
        CLASSIFIER.notes_match_type(&["X4"], "minor chord"),
        Err(ClassifyError::Note(_))
    ));
}

#[test]
fn test_classify_many() {
    let chords = vec![vec!["C4", "E4", "G4"], vec!["A3", "C4", "E4"]];
    let types = CLASSIFIER.classify_many(&chords).unwrap();
    assert_eq!(types[0].name, "major chord");
    assert_eq!(types[1].name, "minor chord");
}

#[test]
fn test_chord_construction() {
    let chord = Chord::from_midi_numbers(&[67, 60, 64, 60]).unwrap();
    assert_eq!(chord.midi_nums(), &[60, 64, 67]);
    assert_eq!(chord.notes(), &["C4", "E4", "G4"]);
    assert_eq!(chord.chord_type().name, "major chord");
    assert_eq!(chord.template().to_bit_string(), "100010010000");

    let same = Chord::from_note_names(&["G4", "C4", "E4"]).unwrap();
    assert_eq!(same.midi_nums(), chord.midi_nums());
    assert_ne!(same.id(), chord.id());

    assert!(Chord::from_midi_numbers(&[60, 128]).is_err());
    assert!(Chord::from_note_names(&["C4", "Q4"]).is_err());

    let empty = Chord::from_midi_numbers(&[]).unwrap();
    assert!(empty.is_empty());
    assert!(empty.chord_type().is_empty());
}

#[test]
fn test_concurrent_classification() {
    let inputs: Vec<Vec<u8>> = (0..12u8)
        .flat_map(|root| {
            [
                vec![48 + root, 52 + root, 55 + root],
                vec![48 + root, 51 + root, 55 + root],
            ]
        })
        .collect();

    let names: Vec<&str> = inputs
        .par_iter()
        .map(|nums| CLASSIFIER.classify_midi_nums(nums).name)
        .collect();

    for (ix, name) in names.iter().enumerate() {
        let expected = if ix % 2 == 0 { "major chord" } else { "minor chord" };
        assert_eq!(*name, expected);
    }
}
