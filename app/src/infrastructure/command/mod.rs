mod ssh_proxy;

pub use self::ssh_proxy::{MaybeSsh, SshConfig};
