use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::chain::Connector;
use crate::config::LookupConfig;
use crate::derive::{derive, derive_custom};
use crate::endpoint::EndpointSelector;
use crate::error::LookupError;
use crate::query::AccountQuerier;
use crate::registry::{ChainRegistry, NetworkRecord};
use crate::tendermint::HttpConnector;
use crate::types::ChainResult;

/// A network defined by the caller instead of the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomNetwork {
    pub name: String,
    pub rpc: String,
    pub prefix: String,
}

/// Looks an account up on every network of a registry concurrently
pub struct AccountFinder<C> {
    selector: Arc<EndpointSelector<C>>,
    deadline: Option<Duration>,
}

impl AccountFinder<HttpConnector> {
    pub fn new(config: &LookupConfig) -> Self {
        Self::with_connector(HttpConnector, config)
    }
}

impl<C: Connector> AccountFinder<C> {
    pub fn with_connector(connector: C, config: &LookupConfig) -> Self {
        Self {
            selector: Arc::new(EndpointSelector::new(connector, config)),
            deadline: config.deadline,
        }
    }

    /// Derive `source` for every registry network and query each one.
    ///
    /// Only a malformed `source` fails the call. Every network that received
    /// a derived address yields exactly one result, sorted by network name.
    pub async fn run(&self, source: &str, registry: &ChainRegistry) -> Result<Vec<ChainResult>, LookupError> {
        let derived = derive(source, registry)?;
        let started = Instant::now();
        let expires = self
            .deadline
            .map(|deadline| (tokio::time::Instant::now() + deadline, deadline));

        tracing::info!(networks = derived.len(), "starting lookup");

        let (tx, mut rx) = mpsc::channel(derived.len().max(1));
        // Networks whose unit has not reported yet, with the data for a fallback row
        let mut pending = BTreeMap::new();

        for target in derived {
            let Some(record) = registry.get(&target.network) else {
                continue;
            };
            let record = record.clone();
            pending.insert(
                record.name.clone(),
                (target.address.clone(), record.explorer_link().to_string()),
            );

            let selector = Arc::clone(&self.selector);
            let tx = tx.clone();
            tokio::spawn(async move {
                let lookup = lookup_network(&selector, &record, &target.address);
                let result = match expires {
                    Some((at, deadline)) => match tokio::time::timeout_at(at, lookup).await {
                        Ok(result) => result,
                        Err(_) => {
                            tracing::warn!(network = %record.name, "lookup timed out");
                            ChainResult::failed(
                                &record.name,
                                &target.address,
                                record.explorer_link(),
                                format!("timed out after {}s", deadline.as_secs_f32()),
                            )
                        }
                    },
                    None => lookup.await,
                };
                // The receiver is held until every sender is dropped
                let _ = tx.send(result).await;
            });
        }
        drop(tx);

        let mut results = Vec::with_capacity(pending.len());
        while let Some(result) = rx.recv().await {
            pending.remove(&result.chain);
            results.push(result);
        }
        // A unit that panicked never reports; still emit its row
        for (chain, (address, link)) in pending {
            tracing::warn!(network = %chain, "lookup task ended without a result");
            results.push(ChainResult::failed(&chain, &address, &link, "lookup task aborted"));
        }

        results.sort_by(|a, b| a.chain.cmp(&b.chain));
        tracing::info!(
            networks = results.len(),
            ok = results.iter().filter(|r| r.is_ok()).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "lookup finished"
        );
        Ok(results)
    }

    /// Query a single caller-defined network through its one endpoint.
    ///
    /// There is nothing to fail over to, so a connection failure fails the call.
    /// Both query errors are reported in the result.
    pub async fn run_custom(&self, source: &str, network: &CustomNetwork) -> Result<ChainResult, LookupError> {
        let target = derive_custom(source, &network.name, &network.prefix)?;
        let session = self
            .selector
            .probe(&network.rpc)
            .await
            .map_err(|source| LookupError::NoLiveEndpoint {
                network: network.name.clone(),
                source,
            })?;

        let querier = AccountQuerier::new(&session);
        let (balance, validator) = tokio::join!(
            querier.balance(&target.address),
            querier.validator(&target.address, &network.prefix)
        );

        let mut result = ChainResult {
            chain: network.name.clone(),
            address: target.address.clone(),
            ..Default::default()
        };
        let mut errors = Vec::new();
        match balance {
            Ok(balance) => {
                result.has_balance = balance.has_balance();
                result.coins = balance.summary();
            }
            Err(e) => errors.push(e.to_string()),
        }
        match validator {
            Ok(moniker) => result.validator = moniker,
            Err(e) => errors.push(e.to_string()),
        }
        result.error = errors.join("; ");
        Ok(result)
    }
}

/// Select an endpoint for one network and run both queries against it
async fn lookup_network<C: Connector>(
    selector: &EndpointSelector<C>,
    record: &NetworkRecord,
    address: &str,
) -> ChainResult {
    let link = record.explorer_link();
    let session = match selector.select(&record.rpc, &record.name).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(network = %record.name, error = %e, "no live endpoint");
            return ChainResult::failed(&record.name, address, link, e);
        }
    };

    let querier = AccountQuerier::new(&session);
    let (balance, validator) = tokio::join!(
        querier.balance(address),
        querier.validator(address, &record.prefix)
    );

    let mut result = ChainResult {
        chain: record.name.clone(),
        address: address.to_string(),
        link: link.to_string(),
        ..Default::default()
    };
    match balance {
        Ok(balance) => {
            result.has_balance = balance.has_balance();
            result.coins = balance.summary();
        }
        Err(e) => {
            tracing::warn!(network = %record.name, error = %e, "balance query failed");
            result.error = e.to_string();
        }
    }
    // Validator lookup is best effort here
    match validator {
        Ok(moniker) => result.validator = moniker,
        Err(e) => tracing::debug!(network = %record.name, error = %e, "validator query failed"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::fake::{FakeConnector, FakeNode};
    use crate::error::EndpointError;
    use crate::proto::{
        Coin, Description, QueryAllBalancesResponse, QueryValidatorResponse, Validator,
        BANK_ALL_BALANCES_PATH, STAKING_VALIDATOR_PATH,
    };
    use prost::Message;
    use std::collections::HashSet;

    const SOURCE: &str = "cosmos1qqqsyqcyq5rqwzqfpg9scrgwpugpzysnrk363e";

    fn record(name: &str, prefix: &str, rpc: &[&str]) -> NetworkRecord {
        NetworkRecord {
            name: name.to_string(),
            prefix: prefix.to_string(),
            rpc: rpc.iter().map(|s| s.to_string()).collect(),
            explorer: Some(format!("https://www.mintscan.io/{name}")),
        }
    }

    fn balance(amount: &str, denom: &str) -> Vec<u8> {
        QueryAllBalancesResponse {
            balances: vec![Coin {
                denom: denom.to_string(),
                amount: amount.to_string(),
            }],
        }
        .encode_to_vec()
    }

    fn validator(moniker: &str) -> Vec<u8> {
        QueryValidatorResponse {
            validator: Some(Validator {
                description: Some(Description {
                    moniker: moniker.to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
        }
        .encode_to_vec()
    }

    fn registry() -> ChainRegistry {
        ChainRegistry::from_records(vec![
            record("osmosis", "osmo", &["https://osmo-a.example.com", "https://osmo-b.example.com"]),
            record("cosmoshub", "cosmos", &["https://cosmos.example.com"]),
            record("juno", "juno", &["https://juno.example.com"]),
            record("stargaze", "stars", &["https://stars.example.com"]),
        ])
    }

    fn finder(connector: FakeConnector) -> AccountFinder<FakeConnector> {
        AccountFinder::with_connector(connector, &LookupConfig::default())
    }

    #[tokio::test]
    async fn test_one_result_per_network_sorted() {
        let connector = FakeConnector::new([
            (
                "https://cosmos.example.com:443",
                FakeNode::live()
                    .respond(BANK_ALL_BALANCES_PATH, balance("1500", "uatom"))
                    .respond(STAKING_VALIDATOR_PATH, validator("Polkachu")),
            ),
            ("https://osmo-a.example.com:443", FakeNode::live()),
            ("https://osmo-b.example.com:443", FakeNode::syncing()),
            ("https://stars.example.com:443", FakeNode::syncing()),
        ]);

        let results = finder(connector).run(SOURCE, &registry()).await.unwrap();

        let names: Vec<_> = results.iter().map(|r| r.chain.as_str()).collect();
        assert_eq!(names, vec!["cosmoshub", "juno", "osmosis", "stargaze"]);

        let cosmos = &results[0];
        assert_eq!(cosmos.address, SOURCE);
        assert!(cosmos.has_balance);
        assert_eq!(cosmos.coins, "1500uatom");
        assert_eq!(cosmos.validator, "Polkachu");
        assert!(cosmos.is_ok());
        assert_eq!(cosmos.link, "https://www.mintscan.io/cosmoshub");

        let juno = &results[1];
        assert!(juno.error.starts_with("could not connect to any endpoints for juno"));
        assert!(!juno.has_balance);
        assert_eq!(juno.address, "juno1qqqsyqcyq5rqwzqfpg9scrgwpugpzysn4yjpk9");

        let osmosis = &results[2];
        assert_eq!(osmosis.address, "osmo1qqqsyqcyq5rqwzqfpg9scrgwpugpzysntdz28t");
        assert!(osmosis.is_ok());
        assert!(!osmosis.has_balance);
        assert!(osmosis.coins.is_empty());

        assert!(results[3].error.contains("catching up"));
    }

    #[tokio::test]
    async fn test_total_failure_still_reports_every_network() {
        let registry = registry();
        let results = finder(FakeConnector::default()).run(SOURCE, &registry).await.unwrap();

        assert_eq!(results.len(), registry.len());
        let names: HashSet<_> = results.iter().map(|r| r.chain.clone()).collect();
        assert_eq!(names.len(), registry.len());
        assert!(registry.iter().all(|r| names.contains(&r.name)));
        assert!(results.iter().all(|r| !r.error.is_empty()));
    }

    #[tokio::test]
    async fn test_query_failures_are_scoped() {
        let connector = FakeConnector::new([(
            "https://cosmos.example.com:443",
            FakeNode::live()
                .fail(BANK_ALL_BALANCES_PATH, "pruned")
                .respond(STAKING_VALIDATOR_PATH, validator("Polkachu")),
        ), (
            "https://juno.example.com:443",
            FakeNode::live()
                .respond(BANK_ALL_BALANCES_PATH, balance("7", "ujuno"))
                .fail(STAKING_VALIDATOR_PATH, "staking unavailable"),
        )]);
        let registry = ChainRegistry::from_records(vec![
            record("cosmoshub", "cosmos", &["https://cosmos.example.com"]),
            record("juno", "juno", &["https://juno.example.com"]),
        ]);

        let results = finder(connector).run(SOURCE, &registry).await.unwrap();

        let cosmos = &results[0];
        assert!(cosmos.error.contains("balance query failed"));
        assert_eq!(cosmos.validator, "Polkachu");

        let juno = &results[1];
        assert!(juno.is_ok());
        assert!(juno.validator.is_empty());
        assert_eq!(juno.coins, "7ujuno");
    }

    #[tokio::test]
    async fn test_invalid_source_makes_no_network_calls() {
        let connector = FakeConnector::new([("https://cosmos.example.com:443", FakeNode::live())]);
        let finder = finder(connector.clone());

        let err = finder
            .run("cosmos1qqqsyqcyq5rqwzqfpg9scrgwpugpzysnrk363q", &registry())
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::InvalidEncoding { .. }));
        assert!(connector.opened().is_empty());
    }

    #[tokio::test]
    async fn test_networks_with_bad_prefix_are_not_queried() {
        let registry = ChainRegistry::from_records(vec![
            record("cosmoshub", "cosmos", &["https://cosmos.example.com"]),
            record("broken", "", &["https://broken.example.com"]),
        ]);
        let connector = FakeConnector::new([("https://cosmos.example.com:443", FakeNode::live())]);

        let results = finder(connector.clone()).run(SOURCE, &registry).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chain, "cosmoshub");
        assert_eq!(connector.opened(), vec!["https://cosmos.example.com:443".to_string()]);
    }

    #[tokio::test]
    async fn test_deadline_reports_pending_networks_as_timed_out() {
        let connector = FakeConnector::new([
            ("https://cosmos.example.com:443", FakeNode::live()),
            (
                "https://juno.example.com:443",
                FakeNode::live().delayed(Duration::from_secs(30)),
            ),
        ]);
        let registry = ChainRegistry::from_records(vec![
            record("cosmoshub", "cosmos", &["https://cosmos.example.com"]),
            record("juno", "juno", &["https://juno.example.com"]),
        ]);
        let config = LookupConfig::default().with_deadline(Duration::from_millis(200));
        let finder = AccountFinder::with_connector(connector, &config);

        let started = Instant::now();
        let results = finder.run(SOURCE, &registry).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert_eq!(results[1].chain, "juno");
        assert!(results[1].error.starts_with("timed out after"));
        assert_eq!(results[1].link, "https://www.mintscan.io/juno");
    }

    #[tokio::test]
    async fn test_custom_network() {
        let connector = FakeConnector::new([(
            "http://localhost:26657",
            FakeNode::live()
                .respond(BANK_ALL_BALANCES_PATH, balance("42", "ustake"))
                .respond(STAKING_VALIDATOR_PATH, validator("local-val")),
        )]);
        let network = CustomNetwork {
            name: "localnet".to_string(),
            rpc: "http://localhost:26657/".to_string(),
            prefix: "osmo".to_string(),
        };

        let result = finder(connector.clone()).run_custom(SOURCE, &network).await.unwrap();
        assert_eq!(result.chain, "localnet");
        assert_eq!(result.address, "osmo1qqqsyqcyq5rqwzqfpg9scrgwpugpzysntdz28t");
        assert_eq!(result.coins, "42ustake");
        assert_eq!(result.validator, "local-val");
        assert!(result.is_ok());
        assert!(result.link.is_empty());
        assert_eq!(connector.opened().len(), 1);
    }

    #[tokio::test]
    async fn test_custom_network_surfaces_validator_failure() {
        let connector = FakeConnector::new([(
            "http://localhost:26657",
            FakeNode::live().fail(STAKING_VALIDATOR_PATH, "staking unavailable"),
        )]);
        let network = CustomNetwork {
            name: "localnet".to_string(),
            rpc: "http://localhost:26657".to_string(),
            prefix: "cosmos".to_string(),
        };

        let result = finder(connector).run_custom(SOURCE, &network).await.unwrap();
        assert!(result.error.contains("validator query failed"));
        assert!(!result.has_balance);
    }

    #[tokio::test]
    async fn test_custom_network_connection_failure_is_fatal() {
        let network = CustomNetwork {
            name: "localnet".to_string(),
            rpc: "http://localhost:26657".to_string(),
            prefix: "cosmos".to_string(),
        };

        let err = finder(FakeConnector::default())
            .run_custom(SOURCE, &network)
            .await
            .unwrap_err();
        match err {
            LookupError::NoLiveEndpoint { network, source } => {
                assert_eq!(network, "localnet");
                assert!(matches!(source, EndpointError::Rpc(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_end_to_end_over_http() {
        use mockito::{Matcher, Server};
        use serde_json::json;

        let mut server = Server::new_async().await;
        let status = server
            .mock("POST", "/")
            .match_body(Matcher::Regex(r#""method"\s*:\s*"status""#.to_string()))
            .with_status(200)
            .with_body(
                json!({
                    "jsonrpc": "2.0", "id": 1,
                    "result": {
                        "node_info": { "network": "osmosis-1" },
                        "sync_info": { "latest_block_height": "100", "catching_up": false }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
        let balances = server
            .mock("POST", "/")
            .match_body(Matcher::Regex("AllBalances".to_string()))
            .with_status(200)
            .with_body(
                json!({
                    "jsonrpc": "2.0", "id": 2,
                    "result": { "response": { "code": 0, "log": "", "value": "Cg0KBXVvc21vEgQxNTAw", "height": "100" } }
                })
                .to_string(),
            )
            .create_async()
            .await;
        let validator = server
            .mock("POST", "/")
            .match_body(Matcher::Regex("staking".to_string()))
            .with_status(200)
            .with_body(
                json!({
                    "jsonrpc": "2.0", "id": 3,
                    "result": { "response": { "code": 5, "log": "validator does not exist", "value": null, "height": "100" } }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let registry = ChainRegistry::from_records(vec![
            record("osmosis", "osmo", &[server.url().as_str()]),
            record("dead", "dead", &["ws://dead.example.com"]),
        ]);
        let results = AccountFinder::new(&LookupConfig::default())
            .run(SOURCE, &registry)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].error.contains("unknown protocol"));
        let osmosis = &results[1];
        assert!(osmosis.is_ok(), "{}", osmosis.error);
        assert!(osmosis.has_balance);
        assert_eq!(osmosis.coins, "1500uosmo");
        assert!(osmosis.validator.is_empty());

        status.assert_async().await;
        balances.assert_async().await;
        validator.assert_async().await;
    }
}
