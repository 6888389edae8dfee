//! Integration tests for constrained chord generation.

use chord_progressions::solver::{high_enough_match, shuffle_voicing};
use chord_progressions::{
    pitch, Chord, ChordClassifier, Locks, SolveParams, Solver, SolverError, Template,
    TemplateError,
};
use rand::{rngs::StdRng, SeedableRng};

fn template_of(notes: &[&str]) -> Template {
    Template::from_notes(notes).unwrap()
}

fn existing_chords() -> Vec<Chord> {
    vec![
        Chord::from_note_names(&["C4", "E4", "G4"]).unwrap(),
        Chord::from_note_names(&["A3", "C4", "E4"]).unwrap(),
        Chord::from_note_names(&["F3", "A3", "C4"]).unwrap(),
        Chord::from_note_names(&["G3", "B3", "D4"]).unwrap(),
    ]
}

#[test]
fn test_high_enough_match() {
    assert!(!high_enough_match(0, 0, 3, 0.5));
    assert!(!high_enough_match(1, 3, 0, 0.0));
    assert!(high_enough_match(2, 3, 4, 0.5));
    assert!(!high_enough_match(1, 3, 4, 0.5));
    assert!(high_enough_match(1, 2, 4, 0.5));
    assert!(high_enough_match(0, 3, 4, 0.0));
}

#[test]
fn test_template_meets_constraints() {
    let solver = Solver::default();
    let t1 = Template::from_bits(&[1; 12]);
    let t2 = Template::from_bits(&[0, 1, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0]);
    let t3 = Template::from_bits(&[1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    let t4 = template_of(&["E2", "B2", "F#3", "G#3", "C#5", "A#5"]);
    let t5 = template_of(&["E4", "F#4", "A4", "C5", "D5"]);

    assert!(solver.template_meets_constraints(&t2, 1.0, Some(&t1), None));
    assert!(solver.template_meets_constraints(&t3, 1.0, Some(&t1), None));
    assert!(solver.template_meets_constraints(&t3, 1.0, Some(&t2), None));
    assert!(solver.template_meets_constraints(&t4, 1.0, Some(&t5), None));

    let major = template_of(&["C4", "E4", "G4"]);
    let tritone = template_of(&["C4", "F#4"]);
    assert!(!solver.template_meets_constraints(&tritone, 1.0, Some(&major), None));
    assert!(!solver.template_meets_constraints(&major, 1.0, None, Some(&tritone)));
    assert!(solver.template_meets_constraints(&major, 1.0, None, None));
}

#[test]
fn test_template_note_count_bounds() {
    let solver = Solver::builder().n_notes(4, 12).build();
    let major = template_of(&["C4", "E4", "G4"]);
    let seventh = template_of(&["C4", "E4", "G4", "B4"]);

    assert!(!solver.template_meets_constraints(&major, 0.0, None, None));
    assert!(solver.template_meets_constraints(&seventh, 0.0, None, None));
}

#[test]
fn test_possible_rotations() {
    let solver = Solver::default();
    let template = Template::from_bits(&[0, 1, 0, 1]);
    let preceding = Template::from_bits(&[0, 1, 1, 0]);
    let succeeding = Template::from_bits(&[1, 0, 0, 1]);

    let rotations =
        solver.possible_rotations(&template, &[Some(&preceding), Some(&succeeding)], 1.0);
    assert!(rotations.is_empty());

    let major = template_of(&["C4", "E4", "G4"]);
    assert_eq!(solver.possible_rotations(&major, &[None, None], 1.0).len(), 12);

    let neighbor = template_of(&["C4", "E4", "G4"]);
    let fitting = solver.possible_rotations(&major, &[Some(&neighbor), None], 1.0);
    assert_eq!(fitting, vec![major.clone()]);
}

#[test]
fn test_voicing_spacing() {
    let solver = Solver::default();

    assert!(solver.is_voicing_spaced(&[]));
    assert!(solver.is_voicing_spaced(&[40, 44, 60, 61]));
    assert!(!solver.is_voicing_spaced(&[40, 42, 60]));
    assert!(solver.is_voicing_spaced(&[50, 52, 53]));
    assert!(!solver.is_voicing_spaced(&[45, 48, 51]));
}

#[test]
fn test_select_voicing_realizes_rotation() {
    let solver = Solver::default();
    let mut rng = StdRng::seed_from_u64(3);
    let rotation = template_of(&["D4", "F#4", "A4"]);

    for _ in 0..20 {
        let voicing = solver.select_voicing(&rotation, 36, 84, &mut rng).unwrap();
        assert_eq!(voicing.len(), 3);
        assert!(voicing.iter().all(|n| (36..=84).contains(n)));
        assert_eq!(Template::from_midi_nums(&voicing), rotation);
        assert!(solver.is_voicing_spaced(&voicing));
    }
}

#[test]
fn test_select_voicing_rejects_unplaceable_pitch_classes() {
    let solver = Solver::default();
    let mut rng = StdRng::seed_from_u64(3);
    let major = template_of(&["C4", "E4", "G4"]);

    assert_eq!(
        solver.select_voicing(&major, 61, 62, &mut rng),
        Err(SolverError::InvalidRange { low: 61, high: 62 })
    );
    assert_eq!(
        solver.select_voicing(&major, 60, 66, &mut rng),
        Err(SolverError::InvalidRange { low: 60, high: 66 })
    );
    assert_eq!(
        solver.select_voicing(&major, 60, 67, &mut rng).unwrap(),
        vec![60, 64, 67]
    );
}

#[test]
fn test_select_chords_invariants() {
    let solver = Solver::default();
    let classifier = ChordClassifier::standard();
    let mut rng = StdRng::seed_from_u64(42);

    let params = SolveParams {
        n_chords: 8,
        pct_notes_common: 0.5,
        note_range_low: 40,
        note_range_high: 84,
        ..SolveParams::default()
    };
    let chords = solver.select_chords(&params, &mut rng).unwrap();

    assert_eq!(chords.len(), 8);
    for chord in &chords {
        assert!(!chord.is_empty());
        assert!(chord.midi_nums().iter().all(|n| (40..=84).contains(n)));
        assert_eq!(classifier.classify_notes(chord.notes()).unwrap(), chord.chord_type());
        assert!(solver.is_voicing_spaced(chord.midi_nums()));
    }

    for pair in chords.windows(2) {
        let (prev, next) = (pair[0].template(), pair[1].template());
        assert!(
            high_enough_match(next.n_common_ones(prev), next.ones(), prev.ones(), 0.5),
            "{} does not share enough notes with {}",
            pair[1],
            pair[0]
        );
    }
}

#[test]
fn test_select_chords_allowed_types() {
    let solver = Solver::default();
    let classifier = ChordClassifier::standard();
    let mut rng = StdRng::seed_from_u64(7);
    let allowed = ["major chord", "minor chord"];

    let params = SolveParams {
        n_chords: 6,
        pct_notes_common: 0.5,
        allowed_chord_types: &allowed,
        ..SolveParams::default()
    };
    let chords = solver.select_chords(&params, &mut rng).unwrap();

    assert_eq!(chords.len(), 6);
    for chord in &chords {
        let fits = allowed
            .iter()
            .any(|name| classifier.notes_match_type(chord.notes(), name).unwrap());
        assert!(fits, "{chord} is not an allowed type");
        assert!(allowed.contains(&chord.chord_type().name));
    }
}

#[test]
fn test_select_chords_is_reproducible() {
    let solver = Solver::default();
    let params = SolveParams {
        n_chords: 4,
        ..SolveParams::default()
    };

    let a = solver
        .select_chords(&params, &mut StdRng::seed_from_u64(11))
        .unwrap();
    let b = solver
        .select_chords(&params, &mut StdRng::seed_from_u64(11))
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_locked_chords_are_preserved() {
    let solver = Solver::default();
    let mut rng = StdRng::seed_from_u64(5);
    let existing = existing_chords();
    let locks = Locks::parse("1010").unwrap();

    let params = SolveParams {
        n_chords: 4,
        existing_chords: &existing,
        locks: Some(&locks),
        ..SolveParams::default()
    };
    let chords = solver.select_chords(&params, &mut rng).unwrap();

    assert_eq!(chords.len(), 4);
    assert_eq!(chords[0], existing[0]);
    assert_eq!(chords[2], existing[2]);
    assert_ne!(chords[1].id(), existing[1].id());
    assert_ne!(chords[3].id(), existing[3].id());
}

#[test]
fn test_wrong_length_locks_fall_back_to_all_locked() {
    let solver = Solver::default();
    let mut rng = StdRng::seed_from_u64(5);
    let existing = existing_chords();
    let locks = Locks::parse("10").unwrap();

    let params = SolveParams {
        n_chords: 4,
        existing_chords: &existing,
        locks: Some(&locks),
        ..SolveParams::default()
    };
    let chords = solver.select_chords(&params, &mut rng).unwrap();
    assert_eq!(chords, existing);
}

#[test]
fn test_unsatisfiable_constraints() {
    let solver = Solver::default();
    let mut rng = StdRng::seed_from_u64(1);
    let existing = vec![Chord::from_note_names(&["C4", "E4", "G4"]).unwrap()];
    let locks = Locks::parse("10").unwrap();

    let params = SolveParams {
        n_chords: 2,
        pct_notes_common: 1.0,
        allowed_chord_types: &["tritone"],
        existing_chords: &existing,
        locks: Some(&locks),
        ..SolveParams::default()
    };
    assert_eq!(
        solver.select_chords(&params, &mut rng),
        Err(SolverError::Unsatisfiable { index: 1 })
    );

    let picky = Solver::builder().n_notes(4, 12).build();
    let params = SolveParams {
        n_chords: 1,
        allowed_chord_types: &["major chord"],
        ..SolveParams::default()
    };
    assert_eq!(
        picky.select_chords(&params, &mut rng),
        Err(SolverError::Unsatisfiable { index: 0 })
    );
}

#[test]
fn test_voicing_attempts_are_bounded() {
    let solver = Solver::builder()
        .spacing(127, 12)
        .max_voicing_attempts(5)
        .build();
    let mut rng = StdRng::seed_from_u64(9);

    let params = SolveParams {
        n_chords: 1,
        note_range_low: 60,
        note_range_high: 71,
        allowed_chord_types: &["semitone"],
        ..SolveParams::default()
    };
    assert_eq!(
        solver.select_chords(&params, &mut rng),
        Err(SolverError::VoicingAttemptsExhausted { attempts: 5 })
    );
}

#[test]
fn test_invalid_parameters() {
    let solver = Solver::default();
    let mut rng = StdRng::seed_from_u64(0);

    let narrow = SolveParams {
        note_range_low: 60,
        note_range_high: 65,
        ..SolveParams::default()
    };
    assert_eq!(
        solver.select_chords(&narrow, &mut rng),
        Err(SolverError::InvalidRange { low: 60, high: 65 })
    );

    let inverted = SolveParams {
        note_range_low: 90,
        note_range_high: 60,
        ..SolveParams::default()
    };
    assert!(matches!(
        solver.select_chords(&inverted, &mut rng),
        Err(SolverError::InvalidRange { .. })
    ));

    let pct = SolveParams {
        pct_notes_common: 1.5,
        ..SolveParams::default()
    };
    assert_eq!(
        solver.select_chords(&pct, &mut rng),
        Err(SolverError::InvalidThreshold { value: 1.5 })
    );

    let unknown = SolveParams {
        allowed_chord_types: &["no such chord"],
        ..SolveParams::default()
    };
    assert!(matches!(
        solver.select_chords(&unknown, &mut rng),
        Err(SolverError::Template(TemplateError::UnknownChordType { .. }))
    ));
}

#[test]
fn test_zero_chords() {
    let solver = Solver::default();
    let params = SolveParams {
        n_chords: 0,
        ..SolveParams::default()
    };
    assert!(solver
        .select_chords(&params, &mut StdRng::seed_from_u64(0))
        .unwrap()
        .is_empty());
}

#[test]
fn test_shuffle_voicing() {
    let mut rng = StdRng::seed_from_u64(21);
    let notes = ["C4", "E4", "G4"];

    let shuffled = shuffle_voicing(&notes, 48, 72, &mut rng).unwrap();
    assert_eq!(shuffled.len(), 3);

    let mut pcs: Vec<u8> = shuffled
        .iter()
        .map(|n| pitch::pitch_class_of_note(n).unwrap())
        .collect();
    pcs.sort_unstable();
    assert_eq!(pcs, vec![0, 4, 7]);

    let nums: Vec<u8> = shuffled
        .iter()
        .map(|n| pitch::note_to_midi(n).unwrap())
        .collect();
    assert!(nums.iter().all(|n| (48..=72).contains(n)));
    assert!(nums.windows(2).all(|w| w[0] <= w[1]));

    let out_of_range = shuffle_voicing(&["C4"], 61, 62, &mut rng).unwrap();
    assert_eq!(out_of_range, vec!["C4"]);
}
