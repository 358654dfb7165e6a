mod job_scheduler;
mod program_launcher;
mod storage_client;
mod submit_service;
mod worker_service;

#[rustfmt::skip]
pub use self::{
    job_scheduler::JobScheduler,
    program_launcher::ProgramLauncher,
    storage_client::StorageClient,
    submit_service::SubmitService,
    worker_service::WorkerService,
};
