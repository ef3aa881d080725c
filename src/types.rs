use serde::{Deserialize, Serialize};
use std::fmt;

/// A single denomination amount held by an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// All balances of an account on one network
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub coins: Vec<Coin>,
}

impl Balance {
    pub fn new(coins: Vec<Coin>) -> Self {
        Self { coins }
    }

    pub fn has_balance(&self) -> bool {
        !self.coins.is_empty()
    }

    /// Coin list in the usual `<amount><denom>,<amount><denom>` form
    pub fn summary(&self) -> String {
        self.coins
            .iter()
            .map(Coin::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// An account address re-encoded for one network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedAddress {
    pub network: String,
    pub address: String,
}

/// Outcome of looking up one account on one network
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainResult {
    pub chain: String,
    pub address: String,
    /// Validator moniker, empty when the account is not a validator
    pub validator: String,
    pub has_balance: bool,
    pub coins: String,
    /// Empty on success
    pub error: String,
    pub link: String,
}

impl ChainResult {
    /// A result for a network that could not be queried at all
    pub fn failed(chain: &str, address: &str, link: &str, error: impl ToString) -> Self {
        Self {
            chain: chain.to_string(),
            address: address.to_string(),
            error: error.to_string(),
            link: link.to_string(),
            ..Default::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_empty()
    }
}
