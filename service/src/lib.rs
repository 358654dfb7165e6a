pub mod submit;
pub mod worker;

pub mod prelude {
    #[rustfmt::skip]
    pub use super::{
        submit::{SubmitServiceImpl, SubmitServiceState},
        worker::{WorkerServiceImpl, WorkerServiceState},
    };
}
