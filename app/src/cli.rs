use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use domain::model::vo::{job::MassRange, CopyPair, ProgramArgs, SubmitRequest, WorkerRequest};

/// Everything after this flag belongs to the program being run, so it must
/// come after all other options.
pub const PROGRAM_ARGS_FLAG: &str = "--args";

#[derive(Debug, Parser)]
#[command(name = "mcsub", version, about = "Submit Monte Carlo generator jobs to HTCondor")]
pub struct Cli {
    /// Display debug messages
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submit a range of jobs, one DAG per mass point.
    ///
    /// Generator options go after `--args`, e.g.
    /// `mcsub submit 1 10 --args --card mycard.cmnd --mass 8 -n 10000 --hepmc`
    Submit(SubmitArgs),
    /// Fill in the job descriptor, optionally submitting it as a single job
    Render(RenderArgs),
    /// Parse parameter cards and print the settings they produce
    Card(CardArgs),
    /// Run one job on the execute node. Written into the descriptor by `submit`.
    RunJob(RunJobArgs),
}

#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// First job id. Ids seed the generator, so never reuse one
    pub start_id: u32,

    /// Last job id (inclusive)
    pub end_id: u32,

    /// Directory for the outputs. Generated from the channel, energy, mass
    /// and date when omitted
    #[arg(long = "out-dir")]
    pub output_dir: Option<String>,

    /// Executable to run
    #[arg(long, default_value = "generateMC.exe")]
    pub exe: PathBuf,

    /// Mass scan; overrides any --mass in the program args
    #[arg(long, num_args = 3, value_names = ["START", "END", "STEP"])]
    pub mass_range: Option<Vec<f64>>,

    /// Set up all files but don't submit
    #[arg(long)]
    pub dry: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    #[arg(skip)]
    pub program_args: Vec<String>,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Template to render, the configured one by default
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Directory for the scheduler's stdout/stderr/log files
    #[arg(long)]
    pub log_dir: String,

    /// Base name of the stdout/stderr/log files
    #[arg(long, default_value = "$(JOB)")]
    pub log_file: String,

    /// Expand $(cluster) with this value
    #[arg(long)]
    pub cluster: Option<u64>,

    /// Expand $(process) with this value
    #[arg(long)]
    pub process: Option<u64>,

    /// Expand $(opts) with this string
    #[arg(long, allow_hyphen_values = true)]
    pub opts: Option<String>,

    /// Write the descriptor here instead of printing it
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Submit the written descriptor as a single job
    #[arg(long, requires = "output")]
    pub submit: bool,
}

#[derive(Debug, Args)]
pub struct CardArgs {
    /// Cards in the order the generator reads them
    #[arg(required = true)]
    pub cards: Vec<PathBuf>,

    /// Put the configured common card first
    #[arg(long)]
    pub with_common: bool,

    /// Fail unless some card switches a physics process on
    #[arg(long)]
    pub require_process: bool,

    /// Print the settings as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct RunJobArgs {
    /// File to copy into the scratch area before running
    #[arg(long, num_args = 2, value_names = ["SOURCE", "DEST"], action = ArgAction::Append)]
    pub copy_to_local: Vec<String>,

    /// File to copy out of the scratch area after running
    #[arg(long, num_args = 2, value_names = ["SOURCE", "DEST"], action = ArgAction::Append)]
    pub copy_from_local: Vec<String>,

    /// Name of the executable inside the scratch area
    #[arg(long, default_value = "mc.exe")]
    pub exe: String,

    #[arg(skip)]
    pub program_args: Vec<String>,
}

impl Cli {
    /// Parse `argv`, routing whatever follows `--args` to the program.
    pub fn parse_with_program_args<I>(argv: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let (argv, program_args) = split_program_args(argv);
        let mut cli = Self::parse_from(argv);
        match &mut cli.command {
            Command::Submit(args) => args.program_args = program_args,
            Command::RunJob(args) => args.program_args = program_args,
            Command::Render(_) | Command::Card(_) => (),
        }
        cli
    }
}

pub fn split_program_args<I>(argv: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    let mut argv: Vec<String> = argv.into_iter().collect();
    match argv.iter().position(|arg| arg == PROGRAM_ARGS_FLAG) {
        Some(at) => {
            let program_args = argv.split_off(at + 1);
            argv.pop();
            (argv, program_args)
        }
        None => (argv, vec![]),
    }
}

impl From<SubmitArgs> for SubmitRequest {
    fn from(args: SubmitArgs) -> Self {
        Self {
            job_ids: (args.start_id, args.end_id),
            output_dir: args.output_dir,
            executable: args.exe,
            mass_range: args.mass_range.map(|range| MassRange {
                start: range[0],
                end: range[1],
                step: range[2],
            }),
            program_args: ProgramArgs::new(args.program_args),
            dry_run: args.dry,
        }
    }
}

impl RunJobArgs {
    pub fn into_request(self) -> WorkerRequest {
        WorkerRequest {
            copy_to_local: pairs(self.copy_to_local),
            copy_from_local: pairs(self.copy_from_local),
            executable: self.exe,
            args: self.program_args,
        }
    }
}

fn pairs(flat: Vec<String>) -> Vec<CopyPair> {
    flat.chunks_exact(2)
        .map(|pair| CopyPair {
            source: pair[0].clone(),
            destination: pair[1].clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_owned).collect()
    }

    #[test]
    fn program_args_are_split_off() {
        let cli = Cli::parse_with_program_args(argv(
            "mcsub submit 1 10 --dry --mass-range 2 8 2 --args --card my.cmnd --mass 4 -n 100 --hepmc",
        ));
        let Command::Submit(args) = cli.command else {
            panic!("expected submit");
        };
        assert!(args.dry);
        assert_eq!(args.program_args, argv("--card my.cmnd --mass 4 -n 100 --hepmc"));

        let request = SubmitRequest::from(args);
        assert_eq!(request.job_ids, (1, 10));
        assert_eq!(
            request.mass_range,
            Some(MassRange {
                start: 2.0,
                end: 8.0,
                step: 2.0
            })
        );
        assert_eq!(request.program_args.value("--card"), Some("my.cmnd"));
        assert_eq!(request.executable, PathBuf::from("generateMC.exe"));
    }

    #[test]
    fn run_job_pairs() {
        let cli = Cli::parse_with_program_args(argv(
            "mcsub run-job --copy-to-local /hdfs/a.cmnd input_cards/a.cmnd \
             --copy-to-local /storage/gen.exe mc.exe \
             --copy-from-local out.hepmc.gz /hdfs/out \
             --exe mc.exe --args --card input_cards/a.cmnd --seed 3",
        ));
        let Command::RunJob(args) = cli.command else {
            panic!("expected run-job");
        };
        let request = args.into_request();
        assert_eq!(
            request.copy_to_local,
            vec![
                CopyPair {
                    source: "/hdfs/a.cmnd".to_owned(),
                    destination: "input_cards/a.cmnd".to_owned()
                },
                CopyPair {
                    source: "/storage/gen.exe".to_owned(),
                    destination: "mc.exe".to_owned()
                },
            ]
        );
        assert_eq!(request.copy_from_local.len(), 1);
        assert_eq!(request.args, argv("--card input_cards/a.cmnd --seed 3"));
    }

    #[test]
    fn no_program_args() {
        let (argv, program) = split_program_args(argv("mcsub card a.cmnd"));
        assert_eq!(argv.len(), 3);
        assert!(program.is_empty());
    }

    #[test]
    fn submitting_a_rendered_descriptor_needs_a_file() {
        assert!(Cli::try_parse_from(argv("mcsub render --log-dir /logs --submit")).is_err());
        let cli = Cli::try_parse_from(argv("mcsub render --log-dir /logs -o job.condor --submit"))
            .unwrap();
        let Command::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert!(args.submit);
        assert_eq!(args.output, Some(PathBuf::from("job.condor")));
    }
}
