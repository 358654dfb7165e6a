use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

/// Each mass point becomes its own DAG, so a scan is kept to a sane size.
pub const MAX_MASS_POINTS: usize = 1000;

#[derive(Debug, Error, PartialEq)]
pub enum MassRangeError {
    #[error("mass range values must be finite numbers")]
    NotFinite,
    #[error("mass step must be > 0, got {0}")]
    NonPositiveStep(f64),
    #[error("end mass {end} is below start mass {start}")]
    Reversed { start: f64, end: f64 },
    #[error("mass range has more than {MAX_MASS_POINTS} points")]
    TooManyPoints,
}

/// Directory shared by the outputs and the logs of one batch,
/// e.g. `ggh_4tau_mass8_13TeV/05_Oct_15`.
pub fn subdir(channel: &str, energy: u32, mass: &str, date: NaiveDate) -> PathBuf {
    Path::new(&format!("{channel}_mass{mass}_{energy}TeV")).join(date.format("%d_%b_%y").to_string())
}

/// Default name of a generator output file when the user gave none.
pub fn output_filename(channel: &str, mass: &str, energy: u32, n_events: u64, fmt: &str) -> String {
    format!("{channel}_mass{mass}_{energy}TeV_n{n_events}.{fmt}")
}

/// Strip directories and the extension from `name`, then add the seed.
pub fn seeded_filename(name: &str, seed: u32, fmt: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{stem}_seed{seed}.{fmt}")
}

/// Inclusive range of mass points. A small tolerance keeps the end point
/// when the step doesn't divide the range exactly in binary.
pub fn mass_points(start: f64, end: f64, step: f64) -> Result<Vec<f64>, MassRangeError> {
    if ![start, end, step].iter().all(|x| x.is_finite()) {
        return Err(MassRangeError::NotFinite);
    }
    if step <= 0.0 {
        return Err(MassRangeError::NonPositiveStep(step));
    }
    if end < start {
        return Err(MassRangeError::Reversed { start, end });
    }
    let count = ((end - start) / step + 1e-9).floor();
    if count + 1.0 > MAX_MASS_POINTS as f64 {
        return Err(MassRangeError::TooManyPoints);
    }
    let count = count as usize;
    Ok((0..=count).map(|i| start + step * i as f64).collect())
}

/// Mass label used in file and directory names.
pub fn mass_label(mass: f64) -> String {
    let rounded = (mass * 1e6).round() / 1e6;
    rounded.to_string()
}
