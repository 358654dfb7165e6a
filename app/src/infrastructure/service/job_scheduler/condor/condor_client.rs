use std::path::Path;

use anyhow::Context;
use dep_inj::DepInj;
use domain::service::JobScheduler;

use super::CondorSubmission;
use crate::infrastructure::command::MaybeSsh;

#[derive(DepInj)]
#[target(CondorClient)]
pub struct CondorClientState {
    /// Extra options for `condor_submit_dag`, e.g. `-maxjobs 200`.
    dag_args: Vec<String>,
}

impl CondorClientState {
    pub fn new(dag_args: Vec<String>) -> Self {
        Self { dag_args }
    }
}

#[async_trait::async_trait]
impl<Deps> JobScheduler for CondorClient<Deps>
where
    Deps: AsRef<CondorClientState> + MaybeSsh + Send + Sync,
{
    async fn submit_dag(&self, dag_path: &Path) -> anyhow::Result<String> {
        let mut args = self.dag_args.clone();
        args.push(absolute(dag_path).await?);
        self.run_submit("condor_submit_dag", dag_path, &args).await
    }

    async fn submit_job(&self, descriptor_path: &Path) -> anyhow::Result<String> {
        let args = [absolute(descriptor_path).await?];
        self.run_submit("condor_submit", descriptor_path, &args).await
    }
}

impl<Deps> CondorClient<Deps>
where
    Deps: AsRef<CondorClientState> + MaybeSsh + Send + Sync,
{
    /// Run a submit command next to the submitted file, so relative paths in
    /// it resolve the same way on a remote submit host.
    async fn run_submit(&self, cmd: &str, file: &Path, args: &[String]) -> anyhow::Result<String> {
        let parent = file.parent().filter(|p| !p.as_os_str().is_empty());
        let dir = absolute(parent.unwrap_or(Path::new("."))).await?;
        let out = if self.prj_ref().is_ssh() {
            self.prj_ref()
                .command("cd")
                .arg(shell_quote(&dir))
                .arg(";")
                .arg(cmd)
                .args(args.iter().map(|arg| shell_quote(arg)))
                .output()
                .await?
        } else {
            self.prj_ref().command(cmd).args(args).current_dir(&dir).output().await?
        };
        tracing::debug!(stdout = %String::from_utf8_lossy(&out.stdout), "{cmd}");
        if !out.status.success() {
            anyhow::bail!(
                "Exit Status not 0 for {cmd}. real: {}, stderr: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr)
            )
        }
        let submission = CondorSubmission::parse(&out.stdout)
            .with_context(|| format!("Unexpected output from {cmd}"))?;
        tracing::info!(jobs = submission.jobs, cluster = %submission.cluster, "{cmd}");
        Ok(submission.cluster)
    }
}

async fn absolute(path: &Path) -> anyhow::Result<String> {
    let path = tokio::fs::canonicalize(path)
        .await
        .with_context(|| format!("Cannot resolve {}", path.display()))?;
    Ok(path.to_string_lossy().into_owned())
}

/// Quote `arg` for the remote shell that ssh hands the command line to.
fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}
