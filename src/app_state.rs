use std::sync::Arc;

use crate::config::ServerConfig;
use crate::services::{printer::Printer, producer::JobProducer, queue::JobStore, storage::LabelStorage};

/// Shared queue server state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub queue: Arc<JobStore>,
    pub producer: Arc<JobProducer>,
}

impl AppState {
    pub fn new(config: ServerConfig, queue: Arc<JobStore>) -> Self {
        Self {
            config: Arc::new(config),
            producer: Arc::new(JobProducer::new(queue.clone())),
            queue,
        }
    }

    pub fn remote_printing(&self) -> bool {
        self.config.remote_printing
    }
}

/// State for the print agent's local operator interface.
#[derive(Clone)]
pub struct AgentState {
    pub storage: Arc<LabelStorage>,
    pub printer: Arc<dyn Printer>,
}

impl AgentState {
    pub fn new(storage: Arc<LabelStorage>, printer: Arc<dyn Printer>) -> Self {
        Self { storage, printer }
    }
}
