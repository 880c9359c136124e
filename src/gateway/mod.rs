//! The orchestrator façade and its builder

mod builder;
mod orchestrator;
mod prompts;

pub use builder::{Assay, OrchestratorBuilder};
pub use orchestrator::{
    OnProgress, Orchestrator, REVIEW_PROGRESS, REVIEW_TEMPERATURE, SUGGESTION_MAX_TOKENS,
    SUGGESTION_STOP,
};
