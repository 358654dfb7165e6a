pub mod args;
pub mod job;
pub mod naming;

#[rustfmt::skip]
pub use self::{
    args::ProgramArgs,
    job::{CopyPair, SubmitRequest, SubmitReport, WorkerRequest},
};
