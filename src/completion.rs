//! Completion invoker.
//!
//! One bound round trip to the warehouse's hosted completion function.
//! Fail-fast, single attempt; the answer text comes back verbatim and any
//! sanitization is the caller's job.

use std::sync::Arc;

use thiserror::Error;

use crate::warehouse::{GatewayError, SqlGateway, Statement};

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("model not supported: {0}")]
    UnknownModel(String),
    #[error("prompt must not be empty")]
    EmptyPrompt,
    #[error("completion returned no rows")]
    EmptyResponse,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Clone)]
pub struct Completer {
    gateway: Arc<dyn SqlGateway>,
    function: String,
    models: Vec<String>,
}

impl Completer {
    pub fn new(gateway: Arc<dyn SqlGateway>, function: String, models: Vec<String>) -> Self {
        Self {
            gateway,
            function,
            models,
        }
    }

    pub fn ensure_model(&self, model_id: &str) -> Result<(), CompletionError> {
        if self.models.iter().any(|m| m == model_id) {
            Ok(())
        } else {
            Err(CompletionError::UnknownModel(model_id.to_string()))
        }
    }

    pub async fn complete(&self, model_id: &str, prompt: &str) -> Result<String, CompletionError> {
        self.ensure_model(model_id)?;
        if prompt.trim().is_empty() {
            return Err(CompletionError::EmptyPrompt);
        }

        let sql = format!("SELECT {}(?, ?) AS response", self.function);
        let statement = Statement::new(sql).bind_text(model_id).bind_text(prompt);

        let rows = self.gateway.execute(statement).await?;
        let answer = rows
            .first()
            .and_then(|row| row.first())
            .and_then(|v| v.as_str())
            .ok_or(CompletionError::EmptyResponse)?;

        Ok(answer.to_string())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::warehouse::testing::ScriptedGateway;
    use crate::warehouse::Bind;

    fn completer(gateway: Arc<ScriptedGateway>) -> Completer {
        Completer::new(
            gateway,
            "SNOWFLAKE.CORTEX.COMPLETE".to_string(),
            vec!["mixtral-8x7b".to_string(), "llama3-8b".to_string()],
        )
    }

    #[tokio::test]
    async fn answer_text_is_returned_verbatim() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_rows(vec![vec![json!("The warranty is 'two' years.")]]);

        let answer = completer(gateway.clone())
            .complete("mixtral-8x7b", "Question: ...")
            .await
            .unwrap();

        // No quote stripping here; that belongs to the caller.
        assert_eq!(answer, "The warranty is 'two' years.");
        let calls = gateway.calls();
        assert_eq!(
            calls[0].binds[0],
            Bind::Text("mixtral-8x7b".to_string())
        );
    }

    #[tokio::test]
    async fn unknown_model_is_rejected_without_a_call() {
        let gateway = Arc::new(ScriptedGateway::new());
        let err = completer(gateway.clone())
            .complete("gpt-17", "hi")
            .await
            .unwrap_err();

        assert!(matches!(err, CompletionError::UnknownModel(_)));
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected() {
        let gateway = Arc::new(ScriptedGateway::new());
        let err = completer(gateway)
            .complete("llama3-8b", "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::EmptyPrompt));
    }

    #[tokio::test]
    async fn remote_failure_surfaces_as_gateway_error() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_error("network unreachable");

        let err = completer(gateway)
            .complete("llama3-8b", "prompt")
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Gateway(_)));
    }
}
