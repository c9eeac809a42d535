//! Warehouse boundary.
//!
//! Everything the service asks of the data warehouse goes through
//! [`SqlGateway`] as a bound-parameter statement. The production
//! implementation is [`http::HttpGateway`]; tests script the trait.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod http;

pub use http::HttpGateway;

/// One result row as returned by the warehouse, column order preserved.
pub type Row = Vec<Value>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to establish warehouse session: {0}")]
    Connect(String),
    #[error("warehouse request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("statement rejected: {0}")]
    Statement(String),
}

/// A bind value travelling with a statement. The wire protocol carries all
/// binds as typed strings.
#[derive(Debug, Clone, PartialEq)]
pub enum Bind {
    Text(String),
    Int(i64),
}

/// A SQL statement plus its positional binds. External input is never
/// interpolated into the SQL text; it always rides in `binds`.
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub binds: Vec<Bind>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            binds: Vec::new(),
        }
    }

    pub fn bind_text(mut self, value: impl Into<String>) -> Self {
        self.binds.push(Bind::Text(value.into()));
        self
    }

    pub fn bind_int(mut self, value: i64) -> Self {
        self.binds.push(Bind::Int(value));
        self
    }
}

#[async_trait]
pub trait SqlGateway: Send + Sync {
    /// Executes one statement and returns its rows. An empty result set is
    /// a valid outcome, not an error.
    async fn execute(&self, statement: Statement) -> Result<Vec<Row>, GatewayError>;
}
