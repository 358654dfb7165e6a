pub mod condor_client;
pub mod models;

#[rustfmt::skip]
pub use self::{
    condor_client::*,
    models::*,
};
