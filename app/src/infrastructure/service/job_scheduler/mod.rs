pub mod condor;

#[rustfmt::skip]
pub use self::condor::{
    CondorClient, CondorClientState, CondorSubmission,
};
