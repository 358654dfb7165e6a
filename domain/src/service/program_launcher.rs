use std::path::Path;

#[async_trait::async_trait]
pub trait ProgramLauncher {
    async fn make_executable(&self, path: &Path) -> anyhow::Result<()>;
    /// Run `program` inside `work_dir` and return its exit code untouched.
    async fn launch(&self, program: &Path, args: &[String], work_dir: &Path)
        -> anyhow::Result<i32>;
}
