pub mod policy;
pub mod workflow;
