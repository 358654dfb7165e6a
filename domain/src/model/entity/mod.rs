pub mod card;
pub mod dag;
pub mod descriptor;

#[rustfmt::skip]
pub use self::{
    card::{CardStack, ParameterCard},
    dag::{Dag, DagNode},
    descriptor::{DescriptorTemplate, JobDescriptor, Universe},
};
