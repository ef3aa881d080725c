mod chain;
mod codec;
mod config;
mod derive;
mod endpoint;
mod error;
mod orchestrator;
mod proto;
mod query;
mod registry;
mod report;
mod tendermint;
mod types;

pub use chain::{AbciResponse, Connector, NodeSession, NodeStatus};
pub use codec::{convert, decode, encode};
pub use config::{EndpointOrder, LookupConfig, DEFAULT_PROBE_TIMEOUT};
pub use derive::{derive, derive_custom};
pub use endpoint::{Endpoint, EndpointSelector, Scheme};
pub use error::{EndpointError, LookupError, QueryError, RpcError};
pub use orchestrator::{AccountFinder, CustomNetwork};
pub use query::AccountQuerier;
pub use registry::{ChainRegistry, NetworkRecord};
pub use report::{csv_header, render_table, to_csv};
pub use tendermint::{HttpConnector, HttpSession};
pub use types::{Balance, ChainResult, Coin, DerivedAddress};

use anyhow::Result;

/// Find `address` on every network of the embedded registry
pub async fn find_accounts(address: &str) -> Result<Vec<ChainResult>> {
    let registry = ChainRegistry::load()?;
    let results = AccountFinder::new(&LookupConfig::default())
        .run(address, &registry)
        .await?;
    Ok(results)
}
