use async_trait::async_trait;
use std::time::Duration;

use crate::endpoint::Endpoint;
use crate::error::RpcError;

/// Node self-reported status
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeStatus {
    /// Chain id the node is serving
    pub network: String,
    pub latest_block_height: u64,
    pub catching_up: bool,
}

/// Raw result of an ABCI state query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbciResponse {
    pub code: u32,
    pub log: String,
    /// Protobuf encoded response, empty when the node had nothing to return
    pub value: Vec<u8>,
    pub height: u64,
}

impl AbciResponse {
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

/// An open session against one RPC node - implement this per transport
#[async_trait]
pub trait NodeSession: Send + Sync {
    /// Normalized endpoint this session is bound to
    fn endpoint(&self) -> &str;

    /// Query node status
    async fn status(&self) -> Result<NodeStatus, RpcError>;

    /// Run a read-only query against application state
    async fn abci_query(&self, path: &str, data: Vec<u8>) -> Result<AbciResponse, RpcError>;
}

/// Opens sessions against endpoints
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Session: NodeSession + 'static;

    async fn open(&self, endpoint: &Endpoint, timeout: Duration) -> Result<Self::Session, RpcError>;
}
