use std::fmt;
use std::str::FromStr;

use strum::{Display, EnumString};
use thiserror::Error;

/// Placeholder for the directory holding the scheduler's stdout/stderr/log files.
pub const LOG_DIR_PLACEHOLDER: &str = "SEDLOGDIR";
/// Placeholder for the base name shared by the stdout/stderr/log files.
pub const LOG_FILE_PLACEHOLDER: &str = "SEDLOGFILE";

/// HTCondor execution environment of a job.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Universe {
    #[default]
    Vanilla,
    Standard,
    Scheduler,
    Local,
    Grid,
    Java,
    Vm,
    Parallel,
    Docker,
    Container,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("line {line}: expected `key = value`, got `{text}`")]
    MalformedLine { line: usize, text: String },
    #[error("missing required key `{0}`")]
    MissingKey(&'static str),
    #[error("`{key}` is not an integer: `{value}`")]
    InvalidInteger { key: &'static str, value: String },
    #[error("`{key}` is not a boolean: `{value}`")]
    InvalidBoolean { key: &'static str, value: String },
    #[error("unknown universe `{0}`")]
    UnknownUniverse(String),
}

/// Raw submit description with the log placeholders still in place.
#[derive(Debug, Clone)]
pub struct DescriptorTemplate {
    text: String,
}

impl DescriptorTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Substitute the log placeholders. Scheduler macros such as `$(cluster)`
    /// and `$(opts)` are left for HTCondor to fill in.
    pub fn render(&self, log_dir: &str, log_file: &str) -> String {
        self.text
            .replace(LOG_DIR_PLACEHOLDER, log_dir)
            .replace(LOG_FILE_PLACEHOLDER, log_file)
    }
}

/// Values HTCondor would substitute for one queued job.
#[derive(Debug, Clone, Default)]
pub struct JobMacros<'a> {
    pub cluster: u64,
    pub process: u64,
    pub opts: &'a str,
}

/// Expand the per-job macros locally, the same way the scheduler does at
/// match time. Used for previews.
pub fn expand_macros(text: &str, macros: &JobMacros) -> String {
    text.replace("$(cluster)", &macros.cluster.to_string())
        .replace("$(Cluster)", &macros.cluster.to_string())
        .replace("$(process)", &macros.process.to_string())
        .replace("$(Process)", &macros.process.to_string())
        .replace("$(opts)", macros.opts)
}

/// Replace the value of `key` on its first line, leaving every other line
/// untouched. The key is inserted at the top when the text lacks it.
pub fn set_value(text: &str, key: &str, value: &str) -> String {
    let mut replaced = false;
    let mut out = String::with_capacity(text.len() + value.len());
    for line in text.lines() {
        let is_key = !line.trim_start().starts_with('#')
            && line
                .split_once('=')
                .is_some_and(|(k, _)| k.trim().eq_ignore_ascii_case(key));
        if is_key && !replaced {
            replaced = true;
            out.push_str(&format!("{key} = {value}"));
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    if !replaced {
        out.insert_str(0, &format!("{key} = {value}\n"));
    }
    out
}

/// A submit description file as a typed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    pub executable: String,
    pub universe: Universe,
    pub output: String,
    pub error: String,
    pub log: String,
    pub request_cpus: u32,
    pub request_memory: String,
    pub request_disk: String,
    pub accounting_group: Option<String>,
    pub account_group_user: Option<String>,
    pub getenv: bool,
    pub arguments: String,
    /// Keys this record doesn't model, in file order.
    pub extra: Vec<(String, String)>,
    /// Argument of the trailing `queue` statement, if any.
    pub queue: Option<String>,
}

impl JobDescriptor {
    pub fn parse(text: &str) -> Result<Self, DescriptorError> {
        let mut executable = None;
        let mut universe = Universe::default();
        let mut output = None;
        let mut error = None;
        let mut log = None;
        let mut request_cpus = 1;
        let mut request_memory = String::new();
        let mut request_disk = String::new();
        let mut accounting_group = None;
        let mut account_group_user = None;
        let mut getenv = false;
        let mut arguments = String::new();
        let mut extra = Vec::new();
        let mut queue = None;

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(rest) = strip_queue(line) {
                queue = Some(rest.to_owned());
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(DescriptorError::MalformedLine {
                    line: index + 1,
                    text: line.to_owned(),
                });
            };
            let value = value.trim().to_owned();
            match key.trim().to_lowercase().as_str() {
                "executable" => executable = Some(value),
                "universe" => {
                    universe = Universe::from_str(&value)
                        .map_err(|_| DescriptorError::UnknownUniverse(value))?
                }
                "output" => output = Some(value),
                "error" => error = Some(value),
                "log" => log = Some(value),
                "request_cpus" => {
                    request_cpus = value.parse().map_err(|_| DescriptorError::InvalidInteger {
                        key: "request_cpus",
                        value,
                    })?
                }
                "request_memory" => request_memory = value,
                "request_disk" => request_disk = value,
                "accounting_group" => accounting_group = Some(value),
                "account_group_user" => account_group_user = Some(value),
                "getenv" => getenv = parse_bool("getenv", value)?,
                "arguments" => arguments = value,
                _ => extra.push((key.trim().to_owned(), value)),
            }
        }

        Ok(Self {
            executable: executable.ok_or(DescriptorError::MissingKey("executable"))?,
            universe,
            output: output.ok_or(DescriptorError::MissingKey("output"))?,
            error: error.ok_or(DescriptorError::MissingKey("error"))?,
            log: log.ok_or(DescriptorError::MissingKey("log"))?,
            request_cpus,
            request_memory,
            request_disk,
            accounting_group,
            account_group_user,
            getenv,
            arguments,
            extra,
            queue,
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.extra
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

fn strip_queue(line: &str) -> Option<&str> {
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    word.eq_ignore_ascii_case("queue").then(|| rest.trim())
}

fn parse_bool(key: &'static str, value: String) -> Result<bool, DescriptorError> {
    match value.to_lowercase().as_str() {
        "true" | "t" | "yes" | "1" => Ok(true),
        "false" | "f" | "no" | "0" => Ok(false),
        _ => Err(DescriptorError::InvalidBoolean { key, value }),
    }
}

impl fmt::Display for JobDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "executable = {}", self.executable)?;
        writeln!(f, "universe = {}", self.universe)?;
        writeln!(f, "output = {}", self.output)?;
        writeln!(f, "error = {}", self.error)?;
        writeln!(f, "log = {}", self.log)?;
        writeln!(f, "getenv = {}", self.getenv)?;
        writeln!(f, "request_cpus = {}", self.request_cpus)?;
        if !self.request_memory.is_empty() {
            writeln!(f, "request_memory = {}", self.request_memory)?;
        }
        if !self.request_disk.is_empty() {
            writeln!(f, "request_disk = {}", self.request_disk)?;
        }
        if let Some(group) = &self.accounting_group {
            writeln!(f, "accounting_group = {group}")?;
        }
        if let Some(user) = &self.account_group_user {
            writeln!(f, "account_group_user = {user}")?;
        }
        for (key, value) in &self.extra {
            writeln!(f, "{key} = {value}")?;
        }
        writeln!(f, "arguments = {}", self.arguments)?;
        match self.queue.as_deref() {
            Some("") => writeln!(f, "queue"),
            Some(n) => writeln!(f, "queue {n}"),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    const TEMPLATE: &str = include_str!("../../../../HTCondor/mcJob.condor");

    fn rendered(log_dir: &str, log_file: &str, cluster: u64, process: u64) -> JobDescriptor {
        let text = DescriptorTemplate::new(TEMPLATE).render(log_dir, log_file);
        let text = expand_macros(
            &text,
            &JobMacros {
                cluster,
                process,
                opts: "--exe mc.exe --args --seed 3",
            },
        );
        JobDescriptor::parse(&text).unwrap()
    }

    #[test]
    fn log_paths_are_plain_concatenation() {
        let cases = [
            ("/storage/me/logs", "3_ggh", 123, 0),
            ("logs", "$(JOB)", 7, 42),
            ("/tmp/a b", "x.y", 0, 9_999),
        ];
        for (log_dir, log_file, cluster, process) in cases {
            let job = rendered(log_dir, log_file, cluster, process);
            let stem = format!("{log_dir}/{log_file}.{cluster}.{process}");
            assert_eq!(job.output, format!("{stem}.out"));
            assert_eq!(job.error, format!("{stem}.err"));
            assert_eq!(job.log, format!("{stem}.log"));
        }
    }

    #[test]
    fn opts_pass_through_unchanged() {
        let opts = r#"--copyToLocal 'a b' c --args --hepmc x_seed1.hepmc \n $HOME"#;
        let text = DescriptorTemplate::new("executable = e\noutput = o\nerror = e\nlog = l\narguments = $(opts)\n")
            .render("d", "f");
        let text = expand_macros(&text, &JobMacros { opts, ..Default::default() });
        assert_eq!(JobDescriptor::parse(&text).unwrap().arguments, opts);
    }

    #[test]
    fn render_leaves_scheduler_macros() {
        let text = DescriptorTemplate::new(TEMPLATE).render("/logs", "job");
        assert!(!text.contains(LOG_DIR_PLACEHOLDER));
        assert!(!text.contains(LOG_FILE_PLACEHOLDER));
        assert!(text.contains("/logs/job.$(cluster).$(process).out"));
        assert!(text.contains("$(opts)"));
    }

    #[test]
    fn shipped_template_fields() {
        let job = JobDescriptor::parse(TEMPLATE).unwrap();
        assert_eq!(job.universe, Universe::Vanilla);
        assert_eq!(job.request_cpus, 1);
        assert_eq!(job.request_memory, "100MB");
        assert_eq!(job.request_disk, "2GB");
        assert!(job.getenv);
        assert_eq!(job.arguments, "run-job $(opts)");
        assert_eq!(job.account_group_user.as_deref(), Some("$ENV(LOGNAME)"));
        assert_eq!(job.queue.as_deref(), Some(""));
    }

    #[test]
    fn parse_errors() {
        let missing = indoc! {"
            universe = vanilla
            output = o
            error = e
            log = l
        "};
        assert_eq!(
            JobDescriptor::parse(missing),
            Err(DescriptorError::MissingKey("executable"))
        );

        let bad = "executable = a\nuniverse = moon\n";
        assert_eq!(
            JobDescriptor::parse(bad),
            Err(DescriptorError::UnknownUniverse("moon".to_owned()))
        );

        let garbage = "executable = a\njust words\n";
        assert!(matches!(
            JobDescriptor::parse(garbage),
            Err(DescriptorError::MalformedLine { line: 2, .. })
        ));
    }

    #[test]
    fn display_round_trips() {
        let text = indoc! {"
            Executable = run.sh
            Universe = Docker
            output = o
            error = e
            log = l
            getenv = True
            request_cpus = 4
            docker_image = centos:7
            arguments = -n 10
            queue 5
        "};
        let job = JobDescriptor::parse(text).unwrap();
        assert_eq!(job.universe, Universe::Docker);
        assert_eq!(job.get("DOCKER_IMAGE"), Some("centos:7"));
        assert_eq!(job.queue.as_deref(), Some("5"));
        assert_eq!(JobDescriptor::parse(&job.to_string()).unwrap(), job);
    }

    #[test]
    fn set_value_keeps_other_lines() {
        let text = set_value(TEMPLATE, "executable", "/opt/mcsub/bin/mcsub");
        assert_eq!(text.lines().count(), TEMPLATE.lines().count());
        for (before, after) in TEMPLATE.lines().zip(text.lines()) {
            if !before.starts_with("executable") {
                assert_eq!(before, after);
            }
        }
        let job = JobDescriptor::parse(&text).unwrap();
        assert_eq!(job.executable, "/opt/mcsub/bin/mcsub");

        let text = set_value("# executable = old\noutput = o\n", "Executable", "e");
        assert_eq!(text, "Executable = e\n# executable = old\noutput = o\n");
    }
}
