use std::path::PathBuf;

use anyhow::Context;
use dep_inj::DepInj;
use domain::{
    model::vo::WorkerRequest,
    service::{ProgramLauncher, StorageClient, WorkerService},
};

/// Command line flags of the worker wrapper, shared with the submitter that
/// writes them into each job's options.
pub mod flags {
    pub const COPY_TO_LOCAL: &str = "--copy-to-local";
    pub const COPY_FROM_LOCAL: &str = "--copy-from-local";
    pub const EXE: &str = "--exe";
    pub const ARGS: &str = "--args";
}

#[derive(DepInj)]
#[target(WorkerServiceImpl)]
pub struct WorkerServiceState {
    /// Private area on the execute node, keeps the scheduler from shipping
    /// everything back to the submit node.
    scratch_dir: PathBuf,
}

impl WorkerServiceState {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
        }
    }
}

#[async_trait::async_trait]
impl<Deps> WorkerService for WorkerServiceImpl<Deps>
where
    Deps: AsRef<WorkerServiceState> + StorageClient + ProgramLauncher + Send + Sync,
{
    async fn run(&self, request: WorkerRequest) -> anyhow::Result<i32> {
        tokio::fs::create_dir(&self.scratch_dir)
            .await
            .with_context(|| format!("Cannot create scratch dir {}", self.scratch_dir.display()))?;
        // the program runs inside the scratch dir, so relative paths would resolve twice
        let scratch = tokio::fs::canonicalize(&self.scratch_dir).await?;

        for pair in &request.copy_to_local {
            let destination = scratch.join(&pair.destination);
            if let Some(parent) = destination.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tracing::info!(source = %pair.source, destination = %destination.display(), "Copy to local");
            self.prj_ref()
                .fetch(&pair.source, &destination)
                .await
                .with_context(|| format!("Cannot fetch {}", pair.source))?;
        }

        let exe = scratch.join(&request.executable);
        self.prj_ref().make_executable(&exe).await?;
        tracing::info!(exe = %exe.display(), args = %request.args.join(" "), "Running program");
        let code = self.prj_ref().launch(&exe, &request.args, &scratch).await?;
        if code != 0 {
            tracing::error!(code, "Program exited with non-zero status");
        }

        for pair in &request.copy_from_local {
            let source = scratch.join(&pair.source);
            tracing::info!(source = %source.display(), destination = %pair.destination, "Copy from local");
            let stored = self.prj_ref().store(&source, &pair.destination).await;
            match stored {
                Ok(()) => (),
                // a failed program usually leaves no outputs, keep its code
                Err(e) if code != 0 => tracing::warn!("Cannot store {}: {e:#}", source.display()),
                Err(e) => return Err(e.context(format!("Cannot store {}", source.display()))),
            }
        }

        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use domain::model::vo::CopyPair;
    use mockall::mock;

    use super::*;

    mock! {
        Storage {}

        #[async_trait::async_trait]
        impl StorageClient for Storage {
            async fn fetch(&self, source: &str, destination: &Path) -> anyhow::Result<()>;
            async fn store(&self, source: &Path, destination: &str) -> anyhow::Result<()>;
        }
    }

    mock! {
        Launcher {}

        #[async_trait::async_trait]
        impl ProgramLauncher for Launcher {
            async fn make_executable(&self, path: &Path) -> anyhow::Result<()>;
            async fn launch(&self, program: &Path, args: &[String], work_dir: &Path)
                -> anyhow::Result<i32>;
        }
    }

    struct TestDeps {
        state: WorkerServiceState,
        storage: MockStorage,
        launcher: MockLauncher,
    }

    impl AsRef<WorkerServiceState> for TestDeps {
        fn as_ref(&self) -> &WorkerServiceState {
            &self.state
        }
    }

    #[async_trait::async_trait]
    impl StorageClient for TestDeps {
        async fn fetch(&self, source: &str, destination: &Path) -> anyhow::Result<()> {
            self.storage.fetch(source, destination).await
        }

        async fn store(&self, source: &Path, destination: &str) -> anyhow::Result<()> {
            self.storage.store(source, destination).await
        }
    }

    #[async_trait::async_trait]
    impl ProgramLauncher for TestDeps {
        async fn make_executable(&self, path: &Path) -> anyhow::Result<()> {
            self.launcher.make_executable(path).await
        }

        async fn launch(
            &self,
            program: &Path,
            args: &[String],
            work_dir: &Path,
        ) -> anyhow::Result<i32> {
            self.launcher.launch(program, args, work_dir).await
        }
    }

    fn pair(source: &str, destination: &str) -> CopyPair {
        CopyPair {
            source: source.to_owned(),
            destination: destination.to_owned(),
        }
    }

    fn request() -> WorkerRequest {
        WorkerRequest {
            copy_to_local: vec![
                pair("/hdfs/user/me/cards/ggh.cmnd", "input_cards/ggh.cmnd"),
                pair("/storage/me/generateMC.exe", "mc.exe"),
            ],
            copy_from_local: vec![pair("out_seed1.hepmc.gz", "/hdfs/user/me/out")],
            executable: "mc.exe".to_owned(),
            args: vec!["--card".to_owned(), "input_cards/ggh.cmnd".to_owned()],
        }
    }

    #[tokio::test]
    async fn stages_runs_and_collects() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().canonicalize().unwrap().join("scratch");
        let fetched = std::sync::Arc::new(Mutex::new(Vec::new()));

        let mut storage = MockStorage::new();
        let log = fetched.clone();
        storage.expect_fetch().times(2).returning(move |source, destination| {
            log.lock().unwrap().push((source.to_owned(), destination.to_path_buf()));
            Ok(())
        });
        let scratch_clone = scratch.clone();
        storage.expect_store().times(1).returning(move |source, destination| {
            assert_eq!(source, scratch_clone.join("out_seed1.hepmc.gz"));
            assert_eq!(destination, "/hdfs/user/me/out");
            Ok(())
        });

        let mut launcher = MockLauncher::new();
        launcher.expect_make_executable().times(1).returning(|_| Ok(()));
        let scratch_clone = scratch.clone();
        launcher.expect_launch().times(1).returning(move |program, args, work_dir| {
            assert_eq!(program, scratch_clone.join("mc.exe"));
            assert_eq!(args, ["--card", "input_cards/ggh.cmnd"]);
            assert_eq!(work_dir, scratch_clone);
            Ok(0)
        });

        let deps = TestDeps {
            state: WorkerServiceState::new(&scratch),
            storage,
            launcher,
        };
        let code = WorkerServiceImpl::inj_ref(&deps).run(request()).await.unwrap();
        assert_eq!(code, 0);
        assert!(scratch.join("input_cards").is_dir());

        let fetched = fetched.lock().unwrap();
        assert_eq!(fetched[0].0, "/hdfs/user/me/cards/ggh.cmnd");
        assert_eq!(fetched[0].1, scratch.join("input_cards/ggh.cmnd"));
        assert_eq!(fetched[1].1, scratch.join("mc.exe"));
    }

    #[tokio::test]
    async fn program_exit_code_wins_over_missing_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = MockStorage::new();
        storage.expect_fetch().returning(|_, _| Ok(()));
        storage
            .expect_store()
            .returning(|_, _| Err(anyhow::anyhow!("no such file")));
        let mut launcher = MockLauncher::new();
        launcher.expect_make_executable().returning(|_| Ok(()));
        launcher.expect_launch().returning(|_, _, _| Ok(3));

        let deps = TestDeps {
            state: WorkerServiceState::new(dir.path().join("scratch")),
            storage,
            launcher,
        };
        let code = WorkerServiceImpl::inj_ref(&deps).run(request()).await.unwrap();
        assert_eq!(code, 3);
    }

    #[tokio::test]
    async fn relative_scratch_dir_is_resolved_before_launch() {
        let _cwd = crate::test_support::lock_cwd();
        let dir = tempfile::tempdir().unwrap();
        let cwd = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let scratch = std::env::current_dir().unwrap().join("scratch");

        let mut storage = MockStorage::new();
        storage.expect_fetch().returning(|_, destination| {
            assert!(destination.is_absolute());
            Ok(())
        });
        storage.expect_store().returning(|source, _| {
            assert!(source.is_absolute());
            Ok(())
        });
        let mut launcher = MockLauncher::new();
        launcher.expect_make_executable().returning(|_| Ok(()));
        let expected = scratch.clone();
        launcher.expect_launch().times(1).returning(move |program, _, work_dir| {
            assert_eq!(work_dir, expected);
            assert_eq!(program, expected.join("mc.exe"));
            Ok(0)
        });

        let deps = TestDeps {
            state: WorkerServiceState::new("scratch"),
            storage,
            launcher,
        };
        let result = WorkerServiceImpl::inj_ref(&deps).run(request()).await;
        std::env::set_current_dir(cwd).unwrap();
        assert_eq!(result.unwrap(), 0);
        assert!(scratch.is_dir());
    }

    #[tokio::test]
    async fn store_failure_after_success_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = MockStorage::new();
        storage.expect_fetch().returning(|_, _| Ok(()));
        storage
            .expect_store()
            .returning(|_, _| Err(anyhow::anyhow!("hadoop exited with 255")));
        let mut launcher = MockLauncher::new();
        launcher.expect_make_executable().returning(|_| Ok(()));
        launcher.expect_launch().returning(|_, _, _| Ok(0));

        let deps = TestDeps {
            state: WorkerServiceState::new(dir.path().join("scratch")),
            storage,
            launcher,
        };
        let err = WorkerServiceImpl::inj_ref(&deps).run(request()).await.unwrap_err();
        assert!(format!("{err:#}").contains("hadoop exited with 255"));
    }

    #[tokio::test]
    async fn existing_scratch_dir_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let deps = TestDeps {
            state: WorkerServiceState::new(dir.path()),
            storage: MockStorage::new(),
            launcher: MockLauncher::new(),
        };
        assert!(WorkerServiceImpl::inj_ref(&deps).run(request()).await.is_err());
    }
}
