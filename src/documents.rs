//! Staged source documents: listing for the sidebar and time-limited
//! signed URLs for citation links.

use std::sync::Arc;

use crate::core::config::SIGNED_URL_EXPIRY_SECS;
use crate::warehouse::{GatewayError, SqlGateway, Statement};

#[derive(Clone)]
pub struct DocumentStage {
    gateway: Arc<dyn SqlGateway>,
    stage: String,
}

impl DocumentStage {
    pub fn new(gateway: Arc<dyn SqlGateway>, stage: String) -> Self {
        Self { gateway, stage }
    }

    /// Names of all documents currently on the stage.
    pub async fn list(&self) -> Result<Vec<String>, GatewayError> {
        let statement = Statement::new(format!("LS @{}", self.stage));
        let rows = self.gateway.execute(statement).await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| row.first().and_then(|v| v.as_str()).map(str::to_string))
            .collect())
    }

    /// Signed URL for one staged document. The stage name is trusted
    /// config; the relative path may echo warehouse data, so it is bound.
    pub async fn signed_url(&self, relative_path: &str) -> Result<String, GatewayError> {
        let sql = format!(
            "SELECT GET_PRESIGNED_URL(@{}, ?, ?) AS url_link",
            self.stage
        );
        let statement = Statement::new(sql)
            .bind_text(relative_path)
            .bind_int(SIGNED_URL_EXPIRY_SECS);

        let rows = self.gateway.execute(statement).await?;
        rows.first()
            .and_then(|row| row.first())
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                GatewayError::Statement("presigned URL lookup returned no rows".to_string())
            })
    }
}
