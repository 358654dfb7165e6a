use tokio::process::Command;

use crate::config::SubmitHostConfig;

#[derive(Debug, Clone)]
pub struct SshConfig {
    pub port: String,
    pub username_host: String,
}

/// An ssh proxy for command. It's transparent if not using ssh.
pub trait MaybeSsh {
    fn command(&self, cmd: &str) -> Command;
    fn is_ssh(&self) -> bool;
}

impl<Ctx> MaybeSsh for Ctx
where
    Ctx: AsRef<Option<SshConfig>>,
{
    fn command(&self, cmd: &str) -> Command {
        let Some(ssh) = self.as_ref() else {
            return Command::new(cmd);
        };

        let mut command = Command::new("ssh");
        command.args(["-p", &ssh.port, &ssh.username_host, cmd]);
        command
    }

    fn is_ssh(&self) -> bool {
        self.as_ref().is_some()
    }
}

impl SshConfig {
    pub fn new(config: &SubmitHostConfig) -> Self {
        let SubmitHostConfig {
            host,
            username,
            port,
        } = config;

        Self {
            port: port.to_string(),
            username_host: format!("{username}@{host}"),
        }
    }
}
