use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Local, NaiveDate};
use dep_inj::DepInj;
use domain::{
    model::{
        entity::{
            descriptor, CardStack, Dag, DagNode, DescriptorTemplate, JobDescriptor, ParameterCard,
        },
        vo::{
            job::{BatchReport, MassRange},
            naming, ProgramArgs, SubmitReport, SubmitRequest,
        },
    },
    service::{JobScheduler, SubmitService},
};
use typed_builder::TypedBuilder;

use crate::worker::flags;

/// Generator output formats that are shipped back from the worker.
const OUTPUT_FORMATS: [&str; 3] = ["hepmc", "root", "lhe"];
const DEFAULT_ENERGY: u32 = 13;
/// Mass the generator falls back to when `--mass` isn't given.
const DEFAULT_MASS: &str = "8";
/// Where the cards land on the worker, relative to its scratch dir.
const CARD_DIR: &str = "input_cards";

#[derive(DepInj, TypedBuilder)]
#[target(SubmitServiceImpl)]
pub struct SubmitServiceState {
    template: DescriptorTemplate,
    /// Card with beams, tune and seeding shared by every run.
    common_card: PathBuf,
    /// Scheduler stdout/stderr/log files go under here.
    log_root: String,
    /// Default home of the outputs when the user gives no directory.
    output_root: String,
    /// Descriptor, DAG, status file and executable copy go under here.
    job_root: PathBuf,
    /// Program the descriptor runs on the execute node. Replaces a relative
    /// `executable` in the template.
    wrapper: PathBuf,
    #[builder(default = "mc.exe".to_owned())]
    remote_exe: String,
    #[builder(default = 30)]
    status_interval: u32,
}

/// Everything that stays the same across the mass points of one submission.
struct Batch<'a> {
    channel: &'a str,
    card_name: &'a str,
    card_path: &'a Path,
    common_card_path: &'a Path,
    energy: u32,
    n_events: u64,
    date: NaiveDate,
    stamp: &'a str,
}

#[async_trait::async_trait]
impl<Deps> SubmitService for SubmitServiceImpl<Deps>
where
    Deps: AsRef<SubmitServiceState> + JobScheduler + Send + Sync,
{
    async fn submit(&self, request: SubmitRequest) -> anyhow::Result<SubmitReport> {
        tracing::info!(">>> Creating jobs");
        check_request(&request)?;

        let mut args = request.program_args.clone();
        let card = args
            .value("--card")
            .context("You did not specify an input card (--card)")?
            .to_owned();
        let card_path = PathBuf::from(&card);
        if !card_path.is_file() {
            anyhow::bail!("Input card {card} does not exist");
        }
        let card_name = file_name(&card_path)?;
        let channel = card_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .context("Input card has no file name")?;
        self.load_cards(&card_path, &card_name).await?;

        if !args.contains("--zip") {
            args.push("--zip");
        }
        let energy = match args.value("--energy") {
            Some(e) => e.parse().with_context(|| format!("Invalid --energy {e}"))?,
            None => DEFAULT_ENERGY,
        };
        let n_events = number_of_events(&args)?;
        if !args.contains("--hepmc") {
            tracing::warn!("You didn't specify --hepmc in your program args. No HepMC file will be produced.");
        }

        let masses = match request.mass_range {
            Some(MassRange { start, end, step }) => naming::mass_points(start, end, step)?
                .into_iter()
                .map(naming::mass_label)
                .collect(),
            None => vec![args.value("--mass").unwrap_or(DEFAULT_MASS).to_owned()],
        };

        let now = Local::now();
        let stamp = now.format("%H%M%S").to_string();
        let common_card_path = tokio::fs::canonicalize(&self.common_card).await?;
        let card_path = tokio::fs::canonicalize(&card_path).await?;
        let batch = Batch {
            channel: &channel,
            card_name: &card_name,
            card_path: &card_path,
            common_card_path: &common_card_path,
            energy,
            n_events,
            date: now.date_naive(),
            stamp: &stamp,
        };

        let mut report = SubmitReport {
            channel: channel.clone(),
            batches: Vec::with_capacity(masses.len()),
        };
        for mass in masses {
            let mut mass_args = args.clone();
            if request.mass_range.is_some() {
                mass_args.set_or_push("--mass", mass.as_str());
            }
            let mut batch_report = self.prepare(&batch, &request, &mass, &mass_args).await?;

            if request.dry_run {
                tracing::warn!(dag = %batch_report.dag.display(), "Dry run - not submitting jobs");
            } else {
                let cluster = self
                    .prj_ref()
                    .submit_dag(&batch_report.dag)
                    .await
                    .with_context(|| format!("Failed to submit {}", batch_report.dag.display()))?;
                tracing::info!(%cluster, status = %batch_report.status_file.display(), "Submitted DAG");
                batch_report.cluster = Some(cluster);
            }
            tracing::info!(log_dir = %batch_report.log_dir.display(), "Scheduler log files");
            report.batches.push(batch_report);
        }

        if report.batches.len() > 1 {
            let status_files: Vec<String> = report
                .batches
                .iter()
                .map(|b| b.status_file.display().to_string())
                .collect();
            tracing::info!("Check all statuses with: {}", status_files.join(" "));
        }
        Ok(report)
    }
}

impl<Deps> SubmitServiceImpl<Deps>
where
    Deps: AsRef<SubmitServiceState> + Send + Sync,
{
    /// Read both cards the worker will get. The common card alone never
    /// switches a process on, so the user's card is expected to.
    async fn load_cards(&self, card_path: &Path, card_name: &str) -> anyhow::Result<CardStack> {
        let mut stack = CardStack::default();
        for (name, path) in [
            (file_name(&self.common_card)?, self.common_card.as_path()),
            (card_name.to_owned(), card_path),
        ] {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Cannot read card {}", path.display()))?;
            let card = ParameterCard::parse(&text)
                .with_context(|| format!("Cannot parse card {}", path.display()))?;
            stack.push(name, card);
        }
        stack.validate_beams()?;
        if !stack.selects_processes() {
            tracing::warn!(card = %card_name, "No physics process is switched on by the input cards");
        }
        Ok(stack)
    }

    async fn prepare(
        &self,
        batch: &Batch<'_>,
        request: &SubmitRequest,
        mass: &str,
        args: &ProgramArgs,
    ) -> anyhow::Result<BatchReport> {
        let subdir = naming::subdir(batch.channel, batch.energy, mass, batch.date);
        let output_dir = match &request.output_dir {
            Some(dir) => absolute(dir)?,
            None => absolute(&format!("{}/{}", self.output_root, subdir.display()))?,
        };
        // DAGMan and the scheduler resolve paths from the DAG's own folder
        let log_dir = Path::new(&self.log_root).join(&subdir).join("logs");
        let job_dir = self.job_root.join(&subdir);
        check_create_dir(&log_dir).await?;
        check_create_dir(&job_dir).await?;
        let log_dir = tokio::fs::canonicalize(&log_dir).await?;
        let job_dir = tokio::fs::canonicalize(&job_dir).await?;
        let stem = job_dir.join(format!("py8_{}", batch.stamp));

        // Jobs run from a private copy so rebuilding doesn't touch queued work
        let sandbox_exe = job_dir.join(file_name(&request.executable)?);
        tokio::fs::copy(&request.executable, &sandbox_exe)
            .await
            .with_context(|| format!("Cannot copy executable to {}", sandbox_exe.display()))?;

        let descriptor = stem.with_extension("condor");
        let log_dir_str = log_dir.to_string_lossy();
        tokio::fs::write(&descriptor, self.render_descriptor(&log_dir_str)?).await?;
        tracing::info!(file = %descriptor.display(), "Condor job file");

        let status_file = stem.with_extension("status");
        let mut dag = Dag::default();
        dag.comment(format!("DAG for channel {}", batch.channel))
            .comment(format!("Outputting to {output_dir}"));
        let (first, last) = request.job_ids;
        for job_id in first..=last {
            let opts = self.job_opts(batch, mass, args, job_id, &sandbox_exe, &output_dir)?;
            tracing::debug!(job_id, opts = %opts.join(" "), "Job options");
            dag.add_node(DagNode {
                name: format!("{job_id}_{}", batch.channel),
                submit_file: descriptor.clone(),
                vars: vec![("opts".to_owned(), opts.join(" "))],
            })?;
        }
        dag.status_file(&status_file, self.status_interval);

        let dag_path = stem.with_extension("dag");
        tokio::fs::write(&dag_path, dag.to_string()).await?;
        tracing::info!(file = %dag_path.display(), "DAG file");

        Ok(BatchReport {
            mass: mass.to_owned(),
            output_dir,
            log_dir,
            descriptor,
            dag: dag_path,
            status_file,
            jobs: dag.nodes.len(),
            cluster: None,
        })
    }

    fn render_descriptor(&self, log_dir: &str) -> anyhow::Result<String> {
        let text = self.template.render(log_dir, "$(JOB)");
        let job = JobDescriptor::parse(&text).context("Descriptor template is not valid")?;
        if Path::new(&job.executable).is_absolute() {
            return Ok(text);
        }
        Ok(descriptor::set_value(
            &text,
            "executable",
            &self.wrapper.to_string_lossy(),
        ))
    }

    /// Arguments of the worker wrapper for one job: stage the cards and the
    /// executable in, run it seeded with `job_id`, stage the outputs out.
    fn job_opts(
        &self,
        batch: &Batch<'_>,
        mass: &str,
        args: &ProgramArgs,
        job_id: u32,
        sandbox_exe: &Path,
        output_dir: &str,
    ) -> anyhow::Result<Vec<String>> {
        let mut exe_args = args.clone();
        exe_args.set_or_push("--card", format!("{CARD_DIR}/{}", batch.card_name));
        exe_args.set_or_push("--seed", job_id.to_string());

        let mut out_files = Vec::new();
        for fmt in OUTPUT_FORMATS {
            let flag = format!("--{fmt}");
            if !exe_args.contains(&flag) {
                continue;
            }
            let given = exe_args.value(&flag).map(str::to_owned).unwrap_or_else(|| {
                naming::output_filename(batch.channel, mass, batch.energy, batch.n_events, fmt)
            });
            let name = naming::seeded_filename(&given, job_id, fmt);
            exe_args.set(&flag, name.as_str())?;
            out_files.push(if exe_args.contains("--zip") {
                format!("{name}.gz")
            } else {
                name
            });
        }

        let common_name = file_name(batch.common_card_path)?;
        let mut opts = vec![
            flags::COPY_TO_LOCAL.to_owned(),
            batch.card_path.display().to_string(),
            format!("{CARD_DIR}/{}", batch.card_name),
            flags::COPY_TO_LOCAL.to_owned(),
            batch.common_card_path.display().to_string(),
            format!("{CARD_DIR}/{common_name}"),
            flags::COPY_TO_LOCAL.to_owned(),
            sandbox_exe.display().to_string(),
            self.remote_exe.clone(),
            flags::EXE.to_owned(),
            self.remote_exe.clone(),
        ];
        for out in out_files {
            opts.extend([flags::COPY_FROM_LOCAL.to_owned(), out, output_dir.to_owned()]);
        }
        opts.push(flags::ARGS.to_owned());
        opts.extend(exe_args.into_inner());

        if let Some(bad) = opts.iter().find(|o| o.is_empty() || o.contains(char::is_whitespace)) {
            anyhow::bail!("Job argument `{bad}` is empty or contains whitespace");
        }
        Ok(opts)
    }
}

fn check_request(request: &SubmitRequest) -> anyhow::Result<()> {
    if !request.executable.is_file() {
        anyhow::bail!("Executable {} does not exist", request.executable.display());
    }
    let (first, last) = request.job_ids;
    if first < 1 {
        anyhow::bail!("The first job id must be >= 1");
    }
    if last < first {
        anyhow::bail!("The last job id must be >= the first");
    }
    if let Some(MassRange { start, end, step }) = request.mass_range {
        if [start, end, step].iter().any(|x| !x.is_finite()) {
            anyhow::bail!("Mass range values must be finite numbers");
        }
        if [start, end, step].iter().any(|x| *x <= 0.0) {
            anyhow::bail!("You cannot have a mass or mass step <= 0");
        }
        if end < start {
            anyhow::bail!("You cannot have endMass < startMass");
        }
    }
    Ok(())
}

fn number_of_events(args: &ProgramArgs) -> anyhow::Result<u64> {
    let Some(n) = args.value("--number").or_else(|| args.value("-n")) else {
        tracing::warn!("Number of events per job not specified - assuming 1");
        return Ok(1);
    };
    n.parse().with_context(|| format!("Invalid number of events {n}"))
}

/// Paths in the job options are used on the worker, so relative ones are
/// anchored at the submitting directory.
fn absolute(path: &str) -> anyhow::Result<String> {
    if Path::new(path).is_absolute() {
        return Ok(path.to_owned());
    }
    let dir = std::env::current_dir().context("Cannot read the current directory")?;
    Ok(dir.join(path).to_string_lossy().into_owned())
}

fn file_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))
}

/// Create `dir` unless it exists; a plain file in the way is an error.
async fn check_create_dir(dir: &Path) -> anyhow::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    if dir.exists() {
        anyhow::bail!(
            "Cannot create directory {}, already exists as a file object",
            dir.display()
        );
    }
    tokio::fs::create_dir_all(dir).await?;
    tracing::debug!(dir = %dir.display(), "Making dir");
    Ok(())
}
