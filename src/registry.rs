use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::AppError;

/// One configured remote MCP tool server.
///
/// Identity is `id`; it is fixed once created (edits replace every other
/// field but never the id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Tool advertised by a server in its `tools/list` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
}

/// Connectivity check against a single server.
///
/// Split out of [`McpRegistry`] so the sequential test runner can be
/// exercised with scripted responses.
pub trait ConnectionTest {
    fn test_connection(
        &self,
        server: &ServerConfig,
    ) -> impl Future<Output = Result<Vec<ToolDescriptor>, AppError>> + Send;
}

/// Owner of the authoritative server list and its persistence and
/// connectivity operations.
pub struct McpRegistry {
    db: Arc<Database>,
    http: reqwest::Client,
}

impl McpRegistry {
    pub fn new(db: Arc<Database>, request_timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self { db, http })
    }

    /// Snapshot of all servers in registration order.
    pub fn servers(&self) -> Result<IndexMap<String, ServerConfig>, AppError> {
        self.db.list_servers()
    }

    pub fn set_status(&self, id: &str, enabled: bool) -> Result<(), AppError> {
        self.db.set_server_status(id, enabled)
    }

    pub fn upsert(&self, server: &ServerConfig) -> Result<(), AppError> {
        self.db.upsert_server(server)
    }

    pub fn remove(&self, id: &str) -> Result<(), AppError> {
        self.db.remove_server(id)
    }
}

impl ConnectionTest for McpRegistry {
    /// JSON-RPC `tools/list` against the server endpoint.
    async fn test_connection(
        &self,
        server: &ServerConfig,
    ) -> Result<Vec<ToolDescriptor>, AppError> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/list",
            "params": {}
        });

        let mut request = self.http.post(&server.url).json(&body);
        if let Some(key) = server.api_key.as_deref().filter(|k| !k.is_empty()) {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?.error_for_status()?;
        let payload: serde_json::Value = response.json().await?;

        if let Some(error) = payload.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown server error");
            return Err(AppError::Server(message.to_string()));
        }

        let tools = payload
            .pointer("/result/tools")
            .and_then(|t| t.as_array())
            .map(|tools| {
                tools
                    .iter()
                    .filter_map(|tool| tool.get("name").and_then(|n| n.as_str()))
                    .map(|name| ToolDescriptor {
                        name: name.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(tools)
    }
}

/// Result of testing one server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    Passed { id: String, tools: Vec<String> },
    Failed { id: String, message: String },
}

impl TestOutcome {
    /// One line of the aggregated report.
    pub fn summary_line(&self) -> String {
        match self {
            Self::Passed { id, tools } => {
                format!("✓ {}: {} tools found ({})", id, tools.len(), tools.join(", "))
            }
            Self::Failed { id, message } => format!("✗ {id}: {message}"),
        }
    }
}

/// Test the enabled servers one at a time, in registration order.
///
/// Each iteration fully awaits before the next starts; a failing server is
/// recorded and never aborts the rest of the run. `progress` fires with the
/// server id just before its test begins.
pub async fn test_all<T, F>(
    tester: &T,
    servers: &[ServerConfig],
    mut progress: F,
) -> Vec<TestOutcome>
where
    T: ConnectionTest,
    F: FnMut(&str),
{
    let mut outcomes = Vec::new();
    for server in servers.iter().filter(|s| s.enabled) {
        progress(&server.id);
        match tester.test_connection(server).await {
            Ok(tools) => outcomes.push(TestOutcome::Passed {
                id: server.id.clone(),
                tools: tools.into_iter().map(|t| t.name).collect(),
            }),
            Err(e) => outcomes.push(TestOutcome::Failed {
                id: server.id.clone(),
                message: e.to_string(),
            }),
        }
    }
    outcomes
}
