pub mod job_scheduler;
pub mod worker_node;
