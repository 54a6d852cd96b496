pub mod optimize;
pub mod plan;
pub mod workflow;
