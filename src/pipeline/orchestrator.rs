//! Per-turn session orchestration.
//!
//! A turn runs start to finish: sanitize the question, optionally rewrite
//! it against the recent transcript window, retrieve similar chunks, build
//! the prompt, invoke the completion model, and only then append the turn
//! to the transcript. Any failure short-circuits before the append, so a
//! failed turn never leaves a spurious assistant entry behind.

use serde::Serialize;

use crate::completion::Completer;
use crate::documents::DocumentStage;
use crate::history::Turn;
use crate::retrieval::ChunkRetriever;
use crate::session::Session;

use super::prompt::{assemble, strip_apostrophes};
use super::rewrite::QueryRewriter;
use super::PipelineError;

/// Citation link for the best-ranked chunk's source document.
#[derive(Debug, Clone, Serialize)]
pub struct SourceLink {
    pub relative_path: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub answer: String,
    pub source: Option<SourceLink>,
}

pub struct ChatPipeline {
    retriever: ChunkRetriever,
    completer: Completer,
    rewriter: QueryRewriter,
    documents: DocumentStage,
    top_k: usize,
    slide_window: usize,
    single_shot: bool,
}

impl ChatPipeline {
    pub fn new(
        retriever: ChunkRetriever,
        completer: Completer,
        rewriter: QueryRewriter,
        documents: DocumentStage,
        top_k: usize,
        slide_window: usize,
        single_shot: bool,
    ) -> Self {
        Self {
            retriever,
            completer,
            rewriter,
            documents,
            top_k,
            slide_window,
            single_shot,
        }
    }

    pub async fn run_turn(
        &self,
        session: &mut Session,
        question: &str,
        model_id: &str,
    ) -> Result<TurnOutcome, PipelineError> {
        let question = strip_apostrophes(question.trim());
        if question.is_empty() {
            return Err(PipelineError::EmptyQuestion);
        }
        self.completer.ensure_model(model_id)?;

        let use_history = session.use_history && !self.single_shot;
        let window = if use_history {
            session.transcript.recent_window(self.slide_window)
        } else {
            Vec::new()
        };

        // With retrieval-augmentation off the model answers from the
        // question alone; rewriting exists only to sharpen the retrieval
        // query, so it is skipped along with the similarity call.
        let (context, source) = if session.use_rag {
            self.fetch_context(session, &window, &question).await?
        } else {
            (String::new(), None)
        };

        let prompt = assemble(&context, &window, &question);
        tracing::debug!(session = %session.id, model = %model_id, "invoking completion");
        let answer = strip_apostrophes(self.completer.complete(model_id, &prompt).await?.trim());

        if !self.single_shot {
            session.transcript.append(Turn::user(question));
            session.transcript.append(Turn::assistant(answer.clone()));
        }

        Ok(TurnOutcome { answer, source })
    }

    async fn fetch_context(
        &self,
        session: &Session,
        window: &[String],
        question: &str,
    ) -> Result<(String, Option<SourceLink>), PipelineError> {
        // Rewriting against an empty window is a wasted remote call.
        let retrieval_query = if window.is_empty() {
            question.to_string()
        } else {
            tracing::debug!(session = %session.id, "summarizing question with history");
            match self.rewriter.rewrite(&self.completer, window, question).await {
                Ok(rewritten) if !rewritten.trim().is_empty() => rewritten,
                Ok(_) => question.to_string(),
                // Policy: a failed rewrite only degrades retrieval quality,
                // so fall back to the raw question and keep the turn alive.
                Err(err) => {
                    tracing::warn!(session = %session.id, "query rewrite failed, using raw question: {}", err);
                    question.to_string()
                }
            }
        };

        tracing::debug!(session = %session.id, query = %retrieval_query, "retrieving context");
        let chunks = self.retriever.retrieve(&retrieval_query, self.top_k).await?;

        let context = strip_apostrophes(
            &chunks
                .iter()
                .map(|chunk| chunk.text.as_str())
                .collect::<String>(),
        );

        let source = match chunks.first() {
            Some(best) => match self.documents.signed_url(&best.source_path).await {
                Ok(url) => Some(SourceLink {
                    relative_path: best.source_path.clone(),
                    url,
                }),
                // The citation link is auxiliary; the answer still stands.
                Err(err) => {
                    tracing::warn!("failed to sign source link: {}", err);
                    None
                }
            },
            None => None,
        };

        Ok((context, source))
    }
}
