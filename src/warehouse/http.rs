//! SQL-over-HTTP gateway.
//!
//! Logs in once with the configured credentials, keeps the session token
//! for the lifetime of the process, and posts each statement with its
//! binds to the warehouse's statement endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};

use crate::core::config::WarehouseConfig;

use super::{Bind, GatewayError, Row, SqlGateway, Statement};

pub struct HttpGateway {
    client: Client,
    base_url: String,
    token: String,
    database: String,
    schema: String,
    compute: String,
    role: String,
}

impl HttpGateway {
    /// Establishes the warehouse session. A failure here is fatal for the
    /// process; there is no retry.
    pub async fn connect(
        config: &WarehouseConfig,
        timeout: std::time::Duration,
    ) -> Result<Self, GatewayError> {
        let base_url = format!("https://{}.snowflakecomputing.com", config.account);
        let client = Client::builder().timeout(timeout).build()?;

        let login = json!({
            "data": {
                "ACCOUNT_NAME": config.account,
                "LOGIN_NAME": config.user,
                "PASSWORD": config.password,
            }
        });

        let res = client
            .post(format!("{}/session/v1/login-request", base_url))
            .json(&login)
            .send()
            .await
            .map_err(|e| GatewayError::Connect(e.to_string()))?;

        if !res.status().is_success() {
            return Err(GatewayError::Connect(format!(
                "login rejected with status {}",
                res.status()
            )));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| GatewayError::Connect(e.to_string()))?;

        if !payload["success"].as_bool().unwrap_or(false) {
            let message = payload["message"].as_str().unwrap_or("unknown login failure");
            return Err(GatewayError::Connect(message.to_string()));
        }

        let token = payload["data"]["token"]
            .as_str()
            .ok_or_else(|| GatewayError::Connect("login response carried no token".to_string()))?
            .to_string();

        tracing::info!(account = %config.account, "warehouse session established");

        Ok(Self {
            client,
            base_url,
            token,
            database: config.database.clone(),
            schema: config.schema.clone(),
            compute: config.compute.clone(),
            role: config.role.clone(),
        })
    }

    /// Best-effort remote session teardown at shutdown.
    pub async fn close(&self) {
        let url = format!("{}/session?delete=true", self.base_url);
        let result = self
            .client
            .post(url)
            .header("Authorization", self.auth_header())
            .send()
            .await;
        if let Err(err) = result {
            tracing::warn!("failed to close warehouse session: {}", err);
        }
    }

    fn auth_header(&self) -> String {
        format!("Snowflake Token=\"{}\"", self.token)
    }

    fn bindings(binds: &[Bind]) -> Value {
        let mut map = Map::new();
        for (i, bind) in binds.iter().enumerate() {
            let (kind, value) = match bind {
                Bind::Text(v) => ("TEXT", v.clone()),
                Bind::Int(v) => ("FIXED", v.to_string()),
            };
            map.insert(
                (i + 1).to_string(),
                json!({ "type": kind, "value": value }),
            );
        }
        Value::Object(map)
    }
}

#[async_trait]
impl SqlGateway for HttpGateway {
    async fn execute(&self, statement: Statement) -> Result<Vec<Row>, GatewayError> {
        let body = json!({
            "statement": statement.sql,
            "bindings": Self::bindings(&statement.binds),
            "database": self.database,
            "schema": self.schema,
            "warehouse": self.compute,
            "role": self.role,
        });

        let res = self
            .client
            .post(format!("{}/api/v2/statements", self.base_url))
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(GatewayError::Statement(format!("{}: {}", status, text)));
        }

        let payload: Value = res.json().await?;
        let rows = payload["data"]
            .as_array()
            .map(|data| {
                data.iter()
                    .filter_map(|row| row.as_array().cloned())
                    .collect()
            })
            .unwrap_or_default();

        Ok(rows)
    }
}
