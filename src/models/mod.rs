pub mod job;
pub mod label;
pub mod print_job;
