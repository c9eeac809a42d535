//! Per-turn RAG orchestration: rewrite, retrieve, assemble, complete.

use thiserror::Error;

use crate::completion::CompletionError;
use crate::retrieval::RetrievalError;

pub mod orchestrator;
pub mod prompt;
pub mod rewrite;

pub use orchestrator::{ChatPipeline, SourceLink, TurnOutcome};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("question must not be empty")]
    EmptyQuestion,
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),
    #[error("completion failed: {0}")]
    Completion(#[from] CompletionError),
}
