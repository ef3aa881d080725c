use bech32::primitives::decode::CheckedHrpstring;
use bech32::{Bech32, Hrp};

use crate::error::LookupError;

/// Decode a bech32 address into its prefix and raw payload bytes.
///
/// Only the original bech32 checksum is accepted; account addresses are never
/// bech32m.
pub fn decode(address: &str) -> Result<(String, Vec<u8>), LookupError> {
    let checked = CheckedHrpstring::new::<Bech32>(address)
        .map_err(|e| LookupError::invalid_encoding(address, e))?;
    let prefix = checked.hrp().to_string().to_ascii_lowercase();
    Ok((prefix, checked.byte_iter().collect()))
}

/// Encode raw payload bytes as a bech32 address under `prefix`.
pub fn encode(prefix: &str, payload: &[u8]) -> Result<String, LookupError> {
    let hrp = Hrp::parse(prefix).map_err(|e| LookupError::invalid_encoding(prefix, e))?;
    bech32::encode::<Bech32>(hrp, payload).map_err(|e| LookupError::invalid_encoding(prefix, e))
}

/// Re-encode `address` under another prefix.
pub fn convert(address: &str, prefix: &str) -> Result<String, LookupError> {
    let (_, payload) = decode(address)?;
    encode(prefix, &payload)
}
