use std::fmt;
use std::time::Duration;

use crate::chain::{Connector, NodeSession};
use crate::config::{EndpointOrder, LookupConfig};
use crate::error::{EndpointError, LookupError, RpcError};

/// Transport schemes a Tendermint RPC endpoint may be registered with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Https,
    Http,
    /// Plain streaming socket, served over HTTP by the node
    Tcp,
}

impl Scheme {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "https" => Some(Self::Https),
            "http" => Some(Self::Http),
            "tcp" => Some(Self::Tcp),
            _ => None,
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Self::Https => 443,
            Self::Http => 80,
            Self::Tcp => 26657,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Https => "https",
            Self::Http => "http",
            Self::Tcp => "tcp",
        }
    }
}

/// A normalized endpoint URI, always carrying an explicit scheme and port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    scheme: Scheme,
    uri: String,
}

impl Endpoint {
    /// Normalize an endpoint candidate.
    ///
    /// Trailing slashes are trimmed and the scheme's default port is inserted
    /// when none is given. A candidate without a scheme is accepted only if it
    /// names a port, and is then treated as `tcp`.
    pub fn parse(candidate: &str) -> Result<Self, EndpointError> {
        let candidate = candidate.trim();

        let (scheme, rest) = match candidate.split_once("://") {
            Some((scheme, rest)) => {
                let scheme = Scheme::parse(scheme)
                    .ok_or_else(|| EndpointError::UnknownScheme(candidate.to_string()))?;
                (scheme, rest.trim_end_matches('/'))
            }
            None => {
                let rest = candidate.trim_end_matches('/');
                if !has_port(split_authority(rest).0) {
                    return Err(EndpointError::UnknownScheme(candidate.to_string()));
                }
                (Scheme::Tcp, rest)
            }
        };

        let (authority, path) = split_authority(rest);
        if authority.is_empty() || authority.starts_with(':') {
            return Err(EndpointError::Malformed(candidate.to_string()));
        }

        let uri = if has_port(authority) {
            format!("{}://{}{}", scheme.as_str(), authority, path)
        } else {
            format!("{}://{}:{}{}", scheme.as_str(), authority, scheme.default_port(), path)
        };

        Ok(Self { scheme, uri })
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn as_str(&self) -> &str {
        &self.uri
    }

    /// URL to send HTTP requests to; `tcp` endpoints speak plain HTTP
    pub fn http_url(&self) -> String {
        match self.scheme {
            Scheme::Tcp => format!("http{}", &self.uri[3..]),
            _ => self.uri.clone(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

fn split_authority(rest: &str) -> (&str, &str) {
    match rest.find(|c: char| matches!(c, '/' | '?' | '#')) {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    }
}

fn has_port(authority: &str) -> bool {
    authority
        .rsplit_once(':')
        .map(|(_, port)| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

/// Picks a live, synced endpoint out of a network's candidates
pub struct EndpointSelector<C> {
    connector: C,
    timeout: Duration,
    order: EndpointOrder,
}

impl<C: Connector> EndpointSelector<C> {
    pub fn new(connector: C, config: &LookupConfig) -> Self {
        Self {
            connector,
            timeout: config.probe_timeout,
            order: config.endpoint_order,
        }
    }

    /// Try candidates in the configured order and return the first accepted session.
    ///
    /// On exhaustion the error wraps the last candidate's failure.
    pub async fn select(&self, candidates: &[String], network: &str) -> Result<C::Session, LookupError> {
        let mut last_err = EndpointError::NoCandidates;

        for i in self.order.indices(candidates.len()) {
            let candidate = &candidates[i];
            match self.probe(candidate).await {
                Ok(session) => {
                    tracing::debug!(network, endpoint = %session.endpoint(), "selected endpoint");
                    return Ok(session);
                }
                Err(e) => {
                    tracing::warn!(network, endpoint = %candidate, error = %e, "endpoint rejected");
                    last_err = e;
                }
            }
        }

        Err(LookupError::NoLiveEndpoint {
            network: network.to_string(),
            source: last_err,
        })
    }

    /// Open a session on one candidate and accept it only if the node is caught up.
    ///
    /// Unsupported candidates fail before any network call is made.
    pub async fn probe(&self, candidate: &str) -> Result<C::Session, EndpointError> {
        let endpoint = Endpoint::parse(candidate)?;

        let attempt = async {
            let session = self.connector.open(&endpoint, self.timeout).await?;
            let status = session.status().await?;
            Ok::<_, RpcError>((session, status))
        };
        let (session, status) = tokio::time::timeout(self.timeout, attempt)
            .await
            .map_err(|_| RpcError::Timeout {
                endpoint: endpoint.to_string(),
                method: "status",
                secs: self.timeout.as_secs(),
            })??;

        if status.catching_up {
            return Err(EndpointError::CatchingUp(endpoint.to_string()));
        }
        Ok(session)
    }
}
