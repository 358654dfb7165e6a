use service::{submit::SubmitServiceState, worker::WorkerServiceState};
use typed_builder::TypedBuilder;

use crate::infrastructure::{
    command::SshConfig,
    service::{job_scheduler::CondorClientState, worker_node::WorkerNodeState},
};

#[derive(derive_more::AsRef, TypedBuilder)]
pub struct Container {
    #[as_ref]
    pub(super) ssh_config: Option<SshConfig>,

    #[as_ref]
    pub(super) condor: CondorClientState,

    #[as_ref]
    pub(super) worker_node: WorkerNodeState,

    #[as_ref]
    pub(super) submit: SubmitServiceState,

    #[as_ref]
    pub(super) worker: WorkerServiceState,
}
