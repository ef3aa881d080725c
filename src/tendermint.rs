use async_trait::async_trait;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::chain::{AbciResponse, Connector, NodeSession, NodeStatus};
use crate::endpoint::Endpoint;
use crate::error::RpcError;

/// Opens JSON-RPC sessions against Tendermint RPC nodes
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

#[async_trait]
impl Connector for HttpConnector {
    type Session = HttpSession;

    async fn open(&self, endpoint: &Endpoint, timeout: Duration) -> Result<HttpSession, RpcError> {
        HttpSession::new(endpoint, timeout)
    }
}

/// Tendermint RPC session over HTTP POST.
///
/// Each session owns its own client and connection pool; dropping the session
/// releases them.
pub struct HttpSession {
    client: reqwest::Client,
    endpoint: String,
    url: String,
    timeout: Duration,
    next_id: AtomicU64,
}

impl HttpSession {
    pub fn new(endpoint: &Endpoint, timeout: Duration) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(concat!("findaccount/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| RpcError::Client {
                endpoint: endpoint.to_string(),
                source,
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            url: endpoint.http_url(),
            timeout,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &'static str, params: Value) -> Result<T, RpcError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(method, e))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(method, e))?;

        // Nodes report some JSON-RPC errors with a 5xx status, so try the body first
        let envelope: JsonRpcResponse<T> = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(RpcError::Malformed {
                    method,
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(RpcError::Status {
                    method,
                    status: status.as_u16(),
                })
            }
        };

        if let Some(error) = envelope.error {
            return Err(RpcError::Remote {
                method,
                code: error.code,
                message: error.describe(),
            });
        }
        envelope.result.ok_or_else(|| RpcError::Malformed {
            method,
            reason: "missing result".to_string(),
        })
    }

    fn transport_error(&self, method: &'static str, source: reqwest::Error) -> RpcError {
        if source.is_timeout() {
            RpcError::Timeout {
                endpoint: self.endpoint.clone(),
                method,
                secs: self.timeout.as_secs(),
            }
        } else {
            RpcError::Transport {
                endpoint: self.endpoint.clone(),
                method,
                source,
            }
        }
    }
}

#[async_trait]
impl NodeSession for HttpSession {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn status(&self) -> Result<NodeStatus, RpcError> {
        let result: StatusResult = self.call("status", json!({})).await?;
        Ok(NodeStatus {
            network: result.node_info.network,
            latest_block_height: parse_height(&result.sync_info.latest_block_height),
            catching_up: result.sync_info.catching_up,
        })
    }

    async fn abci_query(&self, path: &str, data: Vec<u8>) -> Result<AbciResponse, RpcError> {
        let params = json!({
            "path": path,
            "data": hex::encode(data),
            "prove": false,
        });
        let result: AbciQueryResult = self.call("abci_query", params).await?;
        let response = result.response;

        let value = match response.value.as_deref() {
            None | Some("") => Vec::new(),
            Some(encoded) => base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| RpcError::Malformed {
                    method: "abci_query",
                    reason: format!("value is not base64: {e}"),
                })?,
        };

        Ok(AbciResponse {
            code: response.code,
            log: response.log,
            value,
            height: parse_height(&response.height),
        })
    }
}

fn parse_height(height: &str) -> u64 {
    height.parse().unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl JsonRpcError {
    fn describe(&self) -> String {
        match &self.data {
            Some(Value::String(data)) if !data.is_empty() => format!("{} ({})", self.message, data),
            Some(Value::Null) | None => self.message.clone(),
            Some(Value::String(_)) => self.message.clone(),
            Some(data) => format!("{} ({})", self.message, data),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusResult {
    #[serde(default)]
    node_info: NodeInfo,
    sync_info: SyncInfo,
}

#[derive(Debug, Default, Deserialize)]
struct NodeInfo {
    #[serde(default)]
    network: String,
}

#[derive(Debug, Deserialize)]
struct SyncInfo {
    #[serde(default)]
    latest_block_height: String,
    catching_up: bool,
}

#[derive(Debug, Deserialize)]
struct AbciQueryResult {
    response: AbciResponseBody,
}

#[derive(Debug, Deserialize)]
struct AbciResponseBody {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    log: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    height: String,
}
