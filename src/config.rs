use std::time::Duration;

/// Per-attempt bound on opening a session and reading node status
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Order in which a network's endpoint candidates are tried
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EndpointOrder {
    /// Most recently registered first; hand-curated endpoints are appended last
    #[default]
    LastRegisteredFirst,
    /// Registration order
    Registered,
}

impl EndpointOrder {
    /// Candidate indices in trial order
    pub fn indices(self, len: usize) -> Vec<usize> {
        match self {
            Self::LastRegisteredFirst => (0..len).rev().collect(),
            Self::Registered => (0..len).collect(),
        }
    }
}

/// Tunables for a lookup run
#[derive(Debug, Clone)]
pub struct LookupConfig {
    pub probe_timeout: Duration,
    pub endpoint_order: EndpointOrder,
    /// Overall bound for a multi-network run. Networks still pending when it
    /// expires are reported as timed out.
    pub deadline: Option<Duration>,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            endpoint_order: EndpointOrder::default(),
            deadline: None,
        }
    }
}

impl LookupConfig {
    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    pub fn with_endpoint_order(mut self, endpoint_order: EndpointOrder) -> Self {
        self.endpoint_order = endpoint_order;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}
