use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DagError {
    #[error("node `{0}` already exists")]
    DuplicateNode(String),
    #[error("node name `{0}` must be non-empty and free of whitespace")]
    InvalidName(String),
    #[error("value of `{key}` for node `{node}` contains a double quote")]
    QuotedValue { node: String, key: String },
}

/// One `JOB` entry and its `VARS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DagNode {
    pub name: String,
    pub submit_file: PathBuf,
    pub vars: Vec<(String, String)>,
}

/// A DAGMan input file.
#[derive(Debug, Clone, Default)]
pub struct Dag {
    pub comments: Vec<String>,
    pub nodes: Vec<DagNode>,
    pub node_status_file: Option<(PathBuf, u32)>,
}

impl Dag {
    pub fn comment(&mut self, text: impl Into<String>) -> &mut Self {
        self.comments.push(text.into());
        self
    }

    pub fn add_node(&mut self, node: DagNode) -> Result<(), DagError> {
        if node.name.is_empty() || node.name.contains(char::is_whitespace) {
            return Err(DagError::InvalidName(node.name));
        }
        if self.nodes.iter().any(|n| n.name == node.name) {
            return Err(DagError::DuplicateNode(node.name));
        }
        if let Some((key, _)) = node.vars.iter().find(|(_, v)| v.contains('"')) {
            return Err(DagError::QuotedValue {
                node: node.name.clone(),
                key: key.clone(),
            });
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Ask DAGMan to rewrite a status file every `interval` seconds.
    pub fn status_file(&mut self, path: impl Into<PathBuf>, interval: u32) -> &mut Self {
        self.node_status_file = Some((path.into(), interval));
        self
    }
}

impl fmt::Display for Dag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for comment in &self.comments {
            writeln!(f, "# {comment}")?;
        }
        for node in &self.nodes {
            writeln!(f, "JOB {} {}", node.name, node.submit_file.display())?;
            if !node.vars.is_empty() {
                write!(f, "VARS {}", node.name)?;
                for (key, value) in &node.vars {
                    write!(f, " {key}=\"{value}\"")?;
                }
                writeln!(f)?;
            }
        }
        if let Some((path, interval)) = &self.node_status_file {
            writeln!(f, "NODE_STATUS_FILE {} {interval}", path.display())?;
        }
        Ok(())
    }
}
