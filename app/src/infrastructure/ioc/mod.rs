mod boilerplate;
mod container;

use anyhow::Context;
use domain::model::entity::DescriptorTemplate;
use service::prelude::*;

use crate::{
    config::SubmitConfig,
    infrastructure::{
        command::SshConfig,
        service::{job_scheduler::CondorClientState, worker_node::WorkerNodeState},
    },
};

pub use self::container::Container;

pub const BUILTIN_TEMPLATE: &str = include_str!("../../../../HTCondor/mcJob.condor");
const HDFS_MOUNT: &str = "/hdfs";

impl Container {
    pub async fn new(config: &SubmitConfig) -> anyhow::Result<Self> {
        let ssh_config = config.submit_host.as_ref().map(SshConfig::new);

        let template = match &config.template_path {
            Some(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Cannot read template {}", path.display()))?,
            None => BUILTIN_TEMPLATE.to_owned(),
        };

        let wrapper = std::env::current_exe().context("Cannot locate the mcsub executable")?;

        let submit = SubmitServiceState::builder()
            .template(DescriptorTemplate::new(template))
            .common_card(config.common_card.clone())
            .log_root(config.log_root.clone())
            .output_root(config.output_root.clone())
            .job_root(config.job_root.clone())
            .wrapper(wrapper)
            .remote_exe(config.remote_exe.clone())
            .status_interval(config.status_interval)
            .build();

        let container = Container::builder()
            .ssh_config(ssh_config)
            .condor(CondorClientState::new(config.dag_args.clone()))
            .worker_node(WorkerNodeState::new(HDFS_MOUNT))
            .submit(submit)
            .worker(WorkerServiceState::new(config.scratch_dir.clone()))
            .build();

        Ok(container)
    }
}
