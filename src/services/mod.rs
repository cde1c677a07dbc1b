pub mod agent;
pub mod client;
pub mod printer;
pub mod producer;
pub mod queue;
pub mod storage;
