use std::sync::OnceLock;

use anyhow::Context;
use regex::Regex;

/// What `condor_submit` / `condor_submit_dag` report on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CondorSubmission {
    pub jobs: u32,
    pub cluster: String,
}

impl CondorSubmission {
    pub fn parse(stdout: &[u8]) -> anyhow::Result<Self> {
        static SUBMITTED: OnceLock<Regex> = OnceLock::new();
        let re = SUBMITTED
            .get_or_init(|| Regex::new(r"(\d+) job\(s\) submitted to cluster (\d+)\.").unwrap());
        let text = String::from_utf8_lossy(stdout);
        let caps = re.captures(&text).context("Id parse error")?;
        Ok(Self {
            jobs: caps[1].parse()?,
            cluster: caps[2].to_owned(),
        })
    }
}
