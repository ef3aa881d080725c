use crate::codec;
use crate::error::LookupError;
use crate::registry::ChainRegistry;
use crate::types::DerivedAddress;

/// Re-encode `source` under the prefix of every network in `registry`.
///
/// A malformed source address fails the whole derivation. A network whose
/// registered prefix cannot be encoded is logged and left out.
pub fn derive(source: &str, registry: &ChainRegistry) -> Result<Vec<DerivedAddress>, LookupError> {
    let (_, payload) = codec::decode(source)?;

    let derived = registry
        .iter()
        .filter_map(|record| match codec::encode(&record.prefix, &payload) {
            Ok(address) => Some(DerivedAddress {
                network: record.name.clone(),
                address,
            }),
            Err(e) => {
                tracing::warn!(network = %record.name, prefix = %record.prefix, error = %e, "skipping network");
                None
            }
        })
        .collect();

    Ok(derived)
}

/// Single-target variant for a network defined by the caller.
///
/// Unlike [`derive`], a bad prefix is an error here since it is the only target.
pub fn derive_custom(source: &str, network: &str, prefix: &str) -> Result<DerivedAddress, LookupError> {
    let (_, payload) = codec::decode(source)?;
    Ok(DerivedAddress {
        network: network.to_string(),
        address: codec::encode(prefix, &payload)?,
    })
}
