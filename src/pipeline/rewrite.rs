//! History-aware query rewriting.
//!
//! Folds the recent transcript window and the new question into a single
//! standalone natural-language query via one completion call with the
//! fixed orchestration model. Callers skip this entirely when the window
//! is empty; rewriting against nothing is a wasted remote call.

use crate::completion::{Completer, CompletionError};

use super::prompt::strip_apostrophes;

pub struct QueryRewriter {
    model: String,
}

impl QueryRewriter {
    pub fn new(model: String) -> Self {
        Self { model }
    }

    pub async fn rewrite(
        &self,
        completer: &Completer,
        history: &[String],
        question: &str,
    ) -> Result<String, CompletionError> {
        let prompt = rewrite_prompt(history, question);
        let raw = completer.complete(&self.model, &prompt).await?;
        Ok(strip_apostrophes(raw.trim()))
    }
}

fn rewrite_prompt(history: &[String], question: &str) -> String {
    format!(
        "Based on the chat history below and the question, generate a query that extends the question \
         with the chat history provided. The query should be in natural language.\n\
         Answer with only the query. Do not add any explanation.\n\
         \n\
         <chat_history>\n{}\n</chat_history>\n\
         <question>\n{}\n</question>",
        history.join("\n"),
        question
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::warehouse::testing::ScriptedGateway;

    fn completer(gateway: Arc<ScriptedGateway>) -> Completer {
        Completer::new(
            gateway,
            "SNOWFLAKE.CORTEX.COMPLETE".to_string(),
            vec!["mixtral-8x7b".to_string()],
        )
    }

    #[tokio::test]
    async fn rewrite_embeds_history_and_question() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_rows(vec![vec![json!("warranty period for the premium bike")]]);

        let rewriter = QueryRewriter::new("mixtral-8x7b".to_string());
        let history = vec![
            "Tell me about the premium bike".to_string(),
            "It is our flagship model.".to_string(),
        ];
        let rewritten = rewriter
            .rewrite(&completer(gateway.clone()), &history, "what about its warranty?")
            .await
            .unwrap();

        assert_eq!(rewritten, "warranty period for the premium bike");

        let calls = gateway.calls();
        let sent = match &calls[0].binds[1] {
            crate::warehouse::Bind::Text(text) => text.clone(),
            other => panic!("unexpected bind: {other:?}"),
        };
        assert!(sent.contains("<chat_history>\nTell me about the premium bike"));
        assert!(sent.contains("<question>\nwhat about its warranty?\n</question>"));
        assert!(sent.contains("Answer with only the query"));
    }

    #[tokio::test]
    async fn rewrite_output_is_sanitized() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_rows(vec![vec![json!("  the bike's warranty terms \n")]]);

        let rewriter = QueryRewriter::new("mixtral-8x7b".to_string());
        let rewritten = rewriter
            .rewrite(&completer(gateway), &["h".to_string()], "q")
            .await
            .unwrap();

        assert_eq!(rewritten, "the bikes warranty terms");
    }
}
