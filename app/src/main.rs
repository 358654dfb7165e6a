mod cli;
mod config;
mod infrastructure;
mod inspect;

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use colored::Colorize;
use domain::service::{JobScheduler, SubmitService, WorkerService};
use tracing_subscriber::EnvFilter;

use self::cli::{CardArgs, Cli, Command, RenderArgs, SubmitArgs};
use self::config::SubmitConfig;
use self::infrastructure::ioc::{Container, BUILTIN_TEMPLATE};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse_with_program_args(std::env::args());
    init_logger(cli.verbose).with_context(|| "Failed to initialize logger".red())?;

    let config = SubmitConfig::load().with_context(|| "Failed to load config".red())?;
    tracing::debug!("{config:?}");

    match cli.command {
        Command::Submit(args) => {
            let container = build_container(&config).await?;
            submit(&container, args).await.with_context(|| "Submission failed".red())?;
        }
        Command::Render(args) => render(&config, args).await?,
        Command::Card(args) => card(&config, args).await?,
        Command::RunJob(args) => {
            let container = build_container(&config).await?;
            let code = container
                .run(args.into_request())
                .await
                .with_context(|| "Job failed".red())?;
            tracing::info!("Exit code: {code}");
            return Ok(ExitCode::from(inspect::exit_status(code)));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn init_logger(verbose: bool) -> anyhow::Result<()> {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

async fn build_container(config: &SubmitConfig) -> anyhow::Result<Container> {
    Container::new(config)
        .await
        .with_context(|| "Cannot build IOC container".red())
}

async fn submit(container: &Container, args: SubmitArgs) -> anyhow::Result<()> {
    let json = args.json;
    let report = container.submit(args.into()).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    for batch in &report.batches {
        match &batch.cluster {
            Some(cluster) => println!(
                "{} mass {}: {} jobs in cluster {cluster}, status in {}",
                report.channel,
                batch.mass,
                batch.jobs,
                batch.status_file.display()
            ),
            None => println!(
                "{} mass {}: {} jobs prepared in {} (not submitted)",
                report.channel,
                batch.mass,
                batch.jobs,
                batch.dag.display()
            ),
        }
    }
    Ok(())
}

async fn render(config: &SubmitConfig, args: RenderArgs) -> anyhow::Result<()> {
    let template = match args.template.as_ref().or(config.template_path.as_ref()) {
        Some(path) => read(path).await?,
        None => BUILTIN_TEMPLATE.to_owned(),
    };
    let wrapper = std::env::current_exe().context("Cannot locate the mcsub executable")?;
    let rendered = inspect::render_descriptor(&template, &wrapper, &args)?;

    let Some(output) = &args.output else {
        print!("{rendered}");
        return Ok(());
    };
    tokio::fs::write(output, &rendered)
        .await
        .with_context(|| format!("Cannot write {}", output.display()))?;
    tracing::info!(file = %output.display(), "Condor job file");

    if args.submit {
        let container = build_container(config).await?;
        let cluster = container
            .submit_job(output)
            .await
            .with_context(|| "Submission failed".red())?;
        println!("Submitted {} to cluster {cluster}", output.display());
    }
    Ok(())
}

async fn card(config: &SubmitConfig, args: CardArgs) -> anyhow::Result<()> {
    let mut cards = Vec::new();
    for path in inspect::card_paths(&config.common_card, &args) {
        cards.push((path.display().to_string(), read(&path).await?));
    }
    let settings = inspect::effective_settings(&cards, args.require_process)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }
    for setting in settings {
        println!("{} = {}  ({})", setting.key, setting.value.as_str(), setting.source);
    }
    Ok(())
}

async fn read(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Cannot read {}", path.display()))
}
