use thiserror::Error;

/// Errors surfaced by an account lookup.
///
/// `InvalidEncoding` is fatal to the whole invocation. `NoLiveEndpoint` and
/// `QueryFailed` are scoped to a single network and normally end up as the
/// error text of that network's [`ChainResult`](crate::ChainResult).
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("invalid bech32 encoding for '{input}': {reason}")]
    InvalidEncoding { input: String, reason: String },

    #[error("could not connect to any endpoints for {network}: {source}")]
    NoLiveEndpoint {
        network: String,
        #[source]
        source: EndpointError,
    },

    #[error("{query} query failed: {source}")]
    QueryFailed {
        query: &'static str,
        #[source]
        source: QueryError,
    },
}

impl LookupError {
    pub(crate) fn invalid_encoding(input: &str, reason: impl ToString) -> Self {
        Self::InvalidEncoding {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Why a single endpoint candidate was not accepted.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("no rpc endpoints registered")]
    NoCandidates,

    #[error("unknown protocol in endpoint '{0}'")]
    UnknownScheme(String),

    #[error("malformed endpoint '{0}'")]
    Malformed(String),

    #[error("node at {0} is still catching up")]
    CatchingUp(String),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Transport level failures talking to a Tendermint RPC node.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("could not build http client for {endpoint}: {source}")]
    Client {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} request to {endpoint} timed out after {secs}s")]
    Timeout {
        endpoint: String,
        method: &'static str,
        secs: u64,
    },

    #[error("{method} returned http status {status}")]
    Status { method: &'static str, status: u16 },

    #[error("{method} returned rpc error {code}: {message}")]
    Remote {
        method: &'static str,
        code: i64,
        message: String,
    },

    #[error("malformed {method} response: {reason}")]
    Malformed { method: &'static str, reason: String },
}

/// Failure of a single state query.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("could not decode {message}: {source}")]
    Decode {
        message: &'static str,
        #[source]
        source: prost::DecodeError,
    },

    #[error("{path} returned code {code}: {log}")]
    Abci { path: String, code: u32, log: String },

    #[error("could not derive operator address: {0}")]
    OperatorAddress(String),
}
