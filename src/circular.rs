//! Circular matching
//!
//! Rotation equivalence between fixed-length sequences. Chord inversions and
//! transpositions of a pitch-class template are exactly its cyclic rotations.

/// Does some cyclic rotation of `a` equal `b`?
///
/// Sequences of different lengths never match.
pub fn is_circular_match<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    if a.is_empty() {
        return true;
    }

    // `a` is a rotation of `b` iff it is a window of `b` doubled
    let doubled: Vec<&T> = b.iter().chain(b.iter()).collect();
    doubled
        .windows(a.len())
        .any(|window| window.iter().zip(a).all(|(x, y)| *x == y))
}

/// Shift a sequence right by one element, e.g. `[1, 2, 3]` -> `[3, 1, 2]`.
pub fn shift_by_one<T: Clone>(seq: &[T]) -> Vec<T> {
    let mut shifted = seq.to_vec();
    if !shifted.is_empty() {
        shifted.rotate_right(1);
    }
    shifted
}

/// All distinct rotations of `seq`, in order of increasing right shift.
///
/// Symmetric sequences collapse, so a whole-tone scale yields only two.
pub fn all_rotations<T: Clone + PartialEq>(seq: &[T]) -> Vec<Vec<T>> {
    let mut rotations: Vec<Vec<T>> = Vec::with_capacity(seq.len().max(1));
    let mut current = seq.to_vec();
    for _ in 0..seq.len().max(1) {
        if !rotations.contains(&current) {
            rotations.push(current.clone());
        }
        current = shift_by_one(&current);
    }
    rotations
}
