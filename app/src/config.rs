use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::*;

/// Settings of the submitter, read from `mcsub.yaml` and `MCSUB__*` variables.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitConfig {
    /// Scheduler log files go under `<log_root>/<subdir>/logs`.
    #[serde(default = "SubmitConfig::default_log_root")]
    pub log_root: String,

    /// Default output area, `<output_root>/<subdir>`.
    #[serde(default = "SubmitConfig::default_output_root")]
    pub output_root: String,

    /// Descriptor, DAG and status files go under `<job_root>/<subdir>`.
    #[serde(default = "SubmitConfig::default_job_root")]
    pub job_root: PathBuf,

    /// Descriptor template. The built-in one is used when unset.
    #[serde(default)]
    pub template_path: Option<PathBuf>,

    #[serde(default = "SubmitConfig::default_common_card")]
    pub common_card: PathBuf,

    /// Name of the executable once copied to the worker.
    #[serde(default = "SubmitConfig::default_remote_exe")]
    pub remote_exe: String,

    /// Seconds between rewrites of the DAG node status file.
    #[serde(default = "SubmitConfig::default_status_interval")]
    pub status_interval: u32,

    /// Submit through `ssh` on this host instead of locally.
    #[serde(default)]
    pub submit_host: Option<SubmitHostConfig>,

    /// Extra `condor_submit_dag` options, e.g. `["-maxjobs", "200"]`.
    #[serde(default)]
    pub dag_args: Vec<String>,

    /// Worker scratch directory, relative to the job's sandbox.
    #[serde(default = "SubmitConfig::default_scratch_dir")]
    pub scratch_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitHostConfig {
    pub host: String,

    pub username: String,

    #[serde(default = "SubmitHostConfig::default_port")]
    pub port: u16,
}

impl SubmitConfig {
    /// Layered configuration: optional file (`MCSUB_CONFIG` or `mcsub.yaml`),
    /// then environment overrides such as `MCSUB__LOG_ROOT`.
    pub fn load() -> anyhow::Result<Self> {
        let file = std::env::var("MCSUB_CONFIG").unwrap_or_else(|_| "mcsub".to_owned());
        let config = Config::builder()
            .add_source(File::with_name(&file).required(false))
            .add_source(Environment::with_prefix("MCSUB").prefix_separator("__").separator("__"))
            .build()?;
        let mut config: Self = config.try_deserialize()?;
        let user = current_user();
        config.log_root = config.log_root.replace("{user}", &user);
        config.output_root = config.output_root.replace("{user}", &user);
        Ok(config)
    }

    pub fn default_log_root() -> String {
        "/storage/{user}/NMSSMPheno/Pythia8".to_owned()
    }

    pub fn default_output_root() -> String {
        "/hdfs/user/{user}/NMSSMPheno/Pythia8".to_owned()
    }

    pub fn default_job_root() -> PathBuf {
        PathBuf::from("jobs")
    }

    pub fn default_common_card() -> PathBuf {
        PathBuf::from("input_cards/common_pp.cmnd")
    }

    pub fn default_remote_exe() -> String {
        "mc.exe".to_owned()
    }

    pub fn default_status_interval() -> u32 {
        30
    }

    pub fn default_scratch_dir() -> PathBuf {
        PathBuf::from("scratch")
    }
}

impl SubmitHostConfig {
    pub fn default_port() -> u16 {
        22
    }
}

pub fn current_user() -> String {
    ["LOGNAME", "USER"]
        .into_iter()
        .find_map(|key| std::env::var(key).ok())
        .unwrap_or_else(|| "nobody".to_owned())
}

#[cfg(test)]
mod tests {
    use config::FileFormat;
    use indoc::indoc;

    use super::*;

    #[test]
    fn defaults_fill_missing_keys() {
        let config: SubmitConfig = Config::builder()
            .add_source(File::from_str("log_root: /tmp/logs", FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.log_root, "/tmp/logs");
        assert_eq!(config.remote_exe, "mc.exe");
        assert_eq!(config.status_interval, 30);
        assert!(config.submit_host.is_none());
        assert!(config.template_path.is_none());
    }

    #[test]
    fn submit_host() {
        let yaml = indoc! {"
            submit_host:
              host: submit.example.org
              username: me
        "};
        let config: SubmitConfig = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        let host = config.submit_host.unwrap();
        assert_eq!(host.port, 22);
        assert_eq!(host.username, "me");
    }
}
