use std::path::{Path, PathBuf};

use anyhow::Context;
use dep_inj::DepInj;
use domain::service::{ProgramLauncher, StorageClient};
use rustix::fs::Mode;
use tokio::process::Command;
use walkdir::WalkDir;

#[derive(DepInj)]
#[target(WorkerNode)]
pub struct WorkerNodeState {
    /// Paths under this mount are moved with `hadoop fs` rather than copied.
    hdfs_mount: String,
}

impl WorkerNodeState {
    pub fn new(hdfs_mount: impl Into<String>) -> Self {
        Self {
            hdfs_mount: hdfs_mount.into(),
        }
    }

    /// Path inside HDFS when `path` lives under the mount.
    fn hdfs_path<'a>(&self, path: &'a str) -> Option<&'a str> {
        path.strip_prefix(self.hdfs_mount.as_str())
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
    }
}

#[async_trait::async_trait]
impl<Deps> StorageClient for WorkerNode<Deps>
where
    Deps: AsRef<WorkerNodeState> + Send + Sync,
{
    async fn fetch(&self, source: &str, destination: &Path) -> anyhow::Result<()> {
        if let Some(hdfs) = self.hdfs_path(source) {
            return hadoop(&["-copyToLocal", hdfs, &destination.to_string_lossy()]).await;
        }
        copy_local(PathBuf::from(source), destination.to_path_buf()).await
    }

    async fn store(&self, source: &Path, destination: &str) -> anyhow::Result<()> {
        if let Some(hdfs) = self.hdfs_path(destination) {
            return hadoop(&["-copyFromLocal", "-f", &source.to_string_lossy(), hdfs]).await;
        }
        let mut destination = PathBuf::from(destination);
        if destination.is_dir() {
            if let Some(name) = source.file_name() {
                destination.push(name);
            }
        }
        copy_local(source.to_path_buf(), destination).await
    }
}

#[async_trait::async_trait]
impl<Deps> ProgramLauncher for WorkerNode<Deps>
where
    Deps: AsRef<WorkerNodeState> + Send + Sync,
{
    async fn make_executable(&self, path: &Path) -> anyhow::Result<()> {
        let mode = Mode::RUSR | Mode::XUSR | Mode::RGRP | Mode::XGRP | Mode::ROTH | Mode::XOTH;
        rustix::fs::chmod(path, mode)
            .with_context(|| format!("Cannot chmod {}", path.display()))?;
        Ok(())
    }

    async fn launch(
        &self,
        program: &Path,
        args: &[String],
        work_dir: &Path,
    ) -> anyhow::Result<i32> {
        let status = Command::new(program)
            .args(args)
            .current_dir(work_dir)
            .status()
            .await
            .with_context(|| format!("Cannot run {}", program.display()))?;
        // killed by a signal: report it the way a shell would
        Ok(status.code().unwrap_or(128))
    }
}

async fn hadoop(args: &[&str]) -> anyhow::Result<()> {
    let out = Command::new("hadoop").arg("fs").args(args).output().await?;
    if !out.status.success() {
        anyhow::bail!(
            "Exit Status not 0 for hadoop fs {}. real: {}, stderr: {}",
            args.join(" "),
            out.status,
            String::from_utf8_lossy(&out.stderr)
        )
    }
    Ok(())
}

/// Copy a file, or a directory tree.
async fn copy_local(source: PathBuf, destination: PathBuf) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        if source.is_file() {
            std::fs::copy(&source, &destination)?;
            return Ok(());
        }
        if !source.is_dir() {
            anyhow::bail!("{} does not exist", source.display());
        }
        for entry in WalkDir::new(&source) {
            let entry = entry?;
            let target = destination.join(entry.path().strip_prefix(&source)?);
            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&target)?;
            } else {
                std::fs::copy(entry.path(), &target)?;
            }
        }
        Ok(())
    })
    .await?
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    struct Deps(WorkerNodeState);

    impl AsRef<WorkerNodeState> for Deps {
        fn as_ref(&self) -> &WorkerNodeState {
            &self.0
        }
    }

    fn deps() -> Deps {
        Deps(WorkerNodeState::new("/hdfs"))
    }

    #[test]
    fn hdfs_prefix_is_stripped() {
        let state = WorkerNodeState::new("/hdfs");
        assert_eq!(state.hdfs_path("/hdfs/user/me/a.hepmc"), Some("/user/me/a.hepmc"));
        assert_eq!(state.hdfs_path("/hdfsx/user"), None);
        assert_eq!(state.hdfs_path("/storage/me"), None);
    }

    #[tokio::test]
    async fn copies_files_and_trees() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("cards");
        std::fs::create_dir_all(src.join("sub")).unwrap();
        std::fs::write(src.join("a.cmnd"), "Tune:pp = 18\n").unwrap();
        std::fs::write(src.join("sub/b.cmnd"), "Beams:idA = 2212\n").unwrap();

        let deps = deps();
        let node = WorkerNode::inj_ref(&deps);
        let dst = dir.path().join("scratch/input_cards");
        node.fetch(&src.to_string_lossy(), &dst).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(dst.join("sub/b.cmnd")).unwrap(),
            "Beams:idA = 2212\n"
        );

        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();
        node.store(&src.join("a.cmnd"), &out.to_string_lossy()).await.unwrap();
        assert!(out.join("a.cmnd").is_file());

        assert!(node.fetch("/nowhere/at/all", &dst).await.is_err());
    }

    #[tokio::test]
    async fn launch_returns_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("mc.exe");
        std::fs::write(&script, "#!/bin/sh\ntouch ran\nexit 3\n").unwrap();

        let deps = deps();
        let node = WorkerNode::inj_ref(&deps);
        node.make_executable(&script).await.unwrap();
        let mode = std::fs::metadata(&script).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o555);

        let code = node.launch(&script, &[], dir.path()).await.unwrap();
        assert_eq!(code, 3);
        assert!(dir.path().join("ran").is_file());
    }
}
