//! Similarity retriever.
//!
//! Embedding and cosine ranking are delegated to the warehouse's built-in
//! functions; this module only parameterizes the ranked query and shapes
//! the rows it gets back.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::warehouse::{GatewayError, SqlGateway, Statement};

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("retrieval query must not be empty")]
    EmptyQuery,
    #[error("top_k must be at least 1, got {0}")]
    InvalidTopK(usize),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// One ranked chunk. Ordering by descending `similarity` is the contract of
/// the retrieval query itself.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkResult {
    pub text: String,
    pub source_path: String,
    pub similarity: f64,
}

#[derive(Clone)]
pub struct ChunkRetriever {
    gateway: Arc<dyn SqlGateway>,
    chunk_table: String,
    embedding_function: String,
    embedding_model: String,
}

impl ChunkRetriever {
    pub fn new(
        gateway: Arc<dyn SqlGateway>,
        chunk_table: String,
        embedding_function: String,
        embedding_model: String,
    ) -> Self {
        Self {
            gateway,
            chunk_table,
            embedding_function,
            embedding_model,
        }
    }

    pub async fn retrieve(
        &self,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<ChunkResult>, RetrievalError> {
        if query_text.trim().is_empty() {
            return Err(RetrievalError::EmptyQuery);
        }
        if top_k == 0 {
            return Err(RetrievalError::InvalidTopK(top_k));
        }

        // Table and function names come from trusted config; the query text
        // and limit are bound.
        let sql = format!(
            "WITH results AS ( \
               SELECT relative_path, \
                      VECTOR_COSINE_SIMILARITY({table}.chunk_vec, {embed}(?, ?)) AS similarity, \
                      chunk \
               FROM {table} \
               ORDER BY similarity DESC \
               LIMIT ?) \
             SELECT chunk, relative_path, similarity FROM results",
            table = self.chunk_table,
            embed = self.embedding_function,
        );

        let statement = Statement::new(sql)
            .bind_text(self.embedding_model.clone())
            .bind_text(query_text)
            .bind_int(top_k as i64);

        let rows = self.gateway.execute(statement).await?;
        tracing::debug!(chunks = rows.len(), "retrieval query returned");

        // LIMIT already bounds the query; the take guards against a
        // misbehaving collaborator handing back more.
        Ok(rows.into_iter().take(top_k).map(row_to_chunk).collect())
    }
}

fn row_to_chunk(row: Vec<Value>) -> ChunkResult {
    ChunkResult {
        text: text_at(&row, 0),
        source_path: text_at(&row, 1),
        similarity: number_at(&row, 2),
    }
}

fn text_at(row: &[Value], index: usize) -> String {
    row.get(index)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

// The wire format carries numbers as strings; accept either.
fn number_at(row: &[Value], index: usize) -> f64 {
    match row.get(index) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::warehouse::testing::ScriptedGateway;
    use crate::warehouse::Bind;

    fn retriever(gateway: Arc<ScriptedGateway>) -> ChunkRetriever {
        ChunkRetriever::new(
            gateway,
            "docs_chunks_table".to_string(),
            "SNOWFLAKE.CORTEX.EMBED_TEXT_768".to_string(),
            "e5-base-v2".to_string(),
        )
    }

    #[tokio::test]
    async fn returns_at_most_top_k_ordered_rows() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_rows(vec![
            vec![json!("chunk a"), json!("manual.pdf"), json!("0.91")],
            vec![json!("chunk b"), json!("manual.pdf"), json!(0.80)],
            vec![json!("chunk c"), json!("faq.pdf"), json!("0.42")],
        ]);

        let chunks = retriever(gateway.clone())
            .retrieve("warranty period", 3)
            .await
            .unwrap();

        assert_eq!(chunks.len(), 3);
        assert!(chunks.windows(2).all(|w| w[0].similarity >= w[1].similarity));
        assert_eq!(chunks[0].text, "chunk a");
        assert_eq!(chunks[2].source_path, "faq.pdf");
    }

    #[tokio::test]
    async fn binds_model_query_and_limit() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_rows(vec![]);

        retriever(gateway.clone()).retrieve("lubricant", 3).await.unwrap();

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].sql.contains("VECTOR_COSINE_SIMILARITY"));
        assert_eq!(
            calls[0].binds,
            vec![
                Bind::Text("e5-base-v2".to_string()),
                Bind::Text("lubricant".to_string()),
                Bind::Int(3),
            ]
        );
    }

    #[tokio::test]
    async fn empty_result_set_is_not_an_error() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_rows(vec![]);

        let chunks = retriever(gateway).retrieve("nothing similar", 3).await.unwrap();
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn invalid_inputs_are_rejected_before_any_call() {
        let gateway = Arc::new(ScriptedGateway::new());
        let retriever = retriever(gateway.clone());

        assert!(matches!(
            retriever.retrieve("  ", 3).await,
            Err(RetrievalError::EmptyQuery)
        ));
        assert!(matches!(
            retriever.retrieve("fine", 0).await,
            Err(RetrievalError::InvalidTopK(0))
        ));
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn gateway_failure_is_distinguishable_from_no_matches() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_error("quota exceeded");

        let err = retriever(gateway).retrieve("anything", 3).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Gateway(_)));
    }
}
