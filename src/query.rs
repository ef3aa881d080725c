use prost::Message;

use crate::chain::NodeSession;
use crate::codec;
use crate::error::{LookupError, QueryError};
use crate::proto::{
    QueryAllBalancesRequest, QueryAllBalancesResponse, QueryValidatorRequest,
    QueryValidatorResponse, BANK_ALL_BALANCES_PATH, STAKING_VALIDATOR_PATH,
};
use crate::types::Balance;

/// Account state queries against one live node
pub struct AccountQuerier<'a, S: ?Sized> {
    session: &'a S,
}

impl<'a, S: NodeSession + ?Sized> AccountQuerier<'a, S> {
    pub fn new(session: &'a S) -> Self {
        Self { session }
    }

    /// All balances held by `address`. An empty response is an empty balance.
    pub async fn balance(&self, address: &str) -> Result<Balance, LookupError> {
        let request = QueryAllBalancesRequest {
            address: address.to_string(),
        };
        let response = self
            .session
            .abci_query(BANK_ALL_BALANCES_PATH, request.encode_to_vec())
            .await
            .map_err(|e| failed("balance", e.into()))?;

        if !response.is_ok() {
            return Err(failed(
                "balance",
                QueryError::Abci {
                    path: BANK_ALL_BALANCES_PATH.to_string(),
                    code: response.code,
                    log: response.log,
                },
            ));
        }
        if response.value.is_empty() {
            return Ok(Balance::default());
        }

        let decoded = QueryAllBalancesResponse::decode(response.value.as_slice()).map_err(|source| {
            failed(
                "balance",
                QueryError::Decode {
                    message: "QueryAllBalancesResponse",
                    source,
                },
            )
        })?;
        Ok(Balance::new(decoded.balances.into_iter().map(Into::into).collect()))
    }

    /// Moniker of the validator operated by `address`, empty if it operates none.
    ///
    /// `prefix` is the network's account prefix; the operator address uses
    /// `<prefix>valoper`.
    pub async fn validator(&self, address: &str, prefix: &str) -> Result<String, LookupError> {
        let operator = codec::convert(address, &format!("{prefix}valoper"))
            .map_err(|e| failed("validator", QueryError::OperatorAddress(e.to_string())))?;

        let request = QueryValidatorRequest {
            validator_addr: operator.clone(),
        };
        let response = self
            .session
            .abci_query(STAKING_VALIDATOR_PATH, request.encode_to_vec())
            .await
            .map_err(|e| failed("validator", e.into()))?;

        if response.value.is_empty() {
            // Unknown validators come back as a non-zero code with no value
            if !response.is_ok() {
                tracing::trace!(operator = %operator, code = response.code, log = %response.log, "no validator record");
            }
            return Ok(String::new());
        }
        if !response.is_ok() {
            return Err(failed(
                "validator",
                QueryError::Abci {
                    path: STAKING_VALIDATOR_PATH.to_string(),
                    code: response.code,
                    log: response.log,
                },
            ));
        }

        let decoded = QueryValidatorResponse::decode(response.value.as_slice()).map_err(|source| {
            failed(
                "validator",
                QueryError::Decode {
                    message: "QueryValidatorResponse",
                    source,
                },
            )
        })?;
        Ok(decoded
            .validator
            .map(|v| v.moniker().to_string())
            .unwrap_or_default())
    }
}

fn failed(query: &'static str, source: QueryError) -> LookupError {
    LookupError::QueryFailed { query, source }
}
