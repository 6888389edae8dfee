//! Batch labeling
//!
//! Labels many MIDI files in parallel with `rayon`. Files are independent, so
//! each worker runs its own segmentation against the shared, read-only table.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::info;

use crate::harman::{Harman, LabeledSegment};

/// Labels of one file; `None` when it could not be read or labeled.
pub type FileLabels = (PathBuf, Option<Vec<LabeledSegment>>);

/// Label every file in `paths`, preserving input order.
pub fn label_files<P>(harman: &Harman<'_>, paths: &[P]) -> Vec<FileLabels>
where
    P: AsRef<Path> + Sync,
{
    let results: Vec<FileLabels> = paths
        .par_iter()
        .map(|path| {
            let path = path.as_ref();
            (path.to_path_buf(), harman.label_file(path))
        })
        .collect();

    let failed = results.iter().filter(|(_, labels)| labels.is_none()).count();
    info!(
        "Labeled {} of {} files",
        results.len() - failed,
        results.len()
    );

    results
}
