use prost::Message;

// Only the fields read here are declared; the decoder skips the rest.

pub const BANK_ALL_BALANCES_PATH: &str = "/cosmos.bank.v1beta1.Query/AllBalances";
pub const STAKING_VALIDATOR_PATH: &str = "/cosmos.staking.v1beta1.Query/Validator";

#[derive(Clone, PartialEq, Message)]
pub struct Coin {
    #[prost(string, tag = "1")]
    pub denom: String,
    #[prost(string, tag = "2")]
    pub amount: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct QueryAllBalancesRequest {
    #[prost(string, tag = "1")]
    pub address: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct QueryAllBalancesResponse {
    #[prost(message, repeated, tag = "1")]
    pub balances: Vec<Coin>,
}

#[derive(Clone, PartialEq, Message)]
pub struct QueryValidatorRequest {
    #[prost(string, tag = "1")]
    pub validator_addr: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct QueryValidatorResponse {
    #[prost(message, optional, tag = "1")]
    pub validator: Option<Validator>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Validator {
    #[prost(string, tag = "1")]
    pub operator_address: String,
    #[prost(bool, tag = "3")]
    pub jailed: bool,
    #[prost(int32, tag = "4")]
    pub status: i32,
    #[prost(string, tag = "5")]
    pub tokens: String,
    #[prost(message, optional, tag = "7")]
    pub description: Option<Description>,
}

impl Validator {
    pub fn moniker(&self) -> &str {
        self.description
            .as_ref()
            .map(|d| d.moniker.as_str())
            .unwrap_or_default()
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct Description {
    #[prost(string, tag = "1")]
    pub moniker: String,
    #[prost(string, tag = "2")]
    pub identity: String,
    #[prost(string, tag = "3")]
    pub website: String,
    #[prost(string, tag = "4")]
    pub security_contact: String,
    #[prost(string, tag = "5")]
    pub details: String,
}

impl From<Coin> for crate::types::Coin {
    fn from(coin: Coin) -> Self {
        Self {
            denom: coin.denom,
            amount: coin.amount,
        }
    }
}
