use std::path::PathBuf;

use serde::Serialize;

use super::args::ProgramArgs;

/// Inclusive mass scan, in GeV.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassRange {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

/// What the user asked the submitter to do.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// First and last job id. The id doubles as the generator seed.
    pub job_ids: (u32, u32),
    /// Final destination of the outputs, generated when `None`.
    pub output_dir: Option<String>,
    pub executable: PathBuf,
    pub mass_range: Option<MassRange>,
    /// Arguments for the generator itself.
    pub program_args: ProgramArgs,
    pub dry_run: bool,
}

/// Files written for one mass point.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub mass: String,
    pub output_dir: String,
    pub log_dir: PathBuf,
    pub descriptor: PathBuf,
    pub dag: PathBuf,
    pub status_file: PathBuf,
    pub jobs: usize,
    /// Cluster id handed back by the scheduler, `None` on a dry run.
    pub cluster: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReport {
    pub channel: String,
    pub batches: Vec<BatchReport>,
}

/// `<source> <destination>` pair for staging files on the worker node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyPair {
    pub source: String,
    pub destination: String,
}

/// What a job does once it lands on the execute node.
#[derive(Debug, Clone)]
pub struct WorkerRequest {
    pub copy_to_local: Vec<CopyPair>,
    pub copy_from_local: Vec<CopyPair>,
    pub executable: String,
    pub args: Vec<String>,
}
