use crate::types::ChainResult;

pub fn csv_header() -> &'static str {
    "chain,address,validator,has balance,coins,error"
}

/// One CSV line; the validator moniker is always quoted since monikers are free text
pub fn to_csv(result: &ChainResult) -> String {
    format!(
        "{},{},{},{},{},{}",
        csv_field(&result.chain),
        csv_field(&result.address),
        quote(&result.validator),
        result.has_balance,
        csv_field(&result.coins),
        csv_field(&result.error),
    )
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        quote(value)
    } else {
        value.to_string()
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Aligned table for terminals
pub fn render_table(results: &[ChainResult]) -> String {
    let chain_width = results
        .iter()
        .map(|r| r.chain.len())
        .max()
        .unwrap_or(0)
        .max("Chain".len());
    let address_width = results
        .iter()
        .map(|r| r.address.len())
        .max()
        .unwrap_or(0)
        .max("Address".len());

    let mut out = String::new();
    out.push_str(&format!(
        "{:chain_width$} | {:address_width$} | {}\n",
        "Chain", "Address", "Details"
    ));
    out.push_str(&"=".repeat(chain_width + address_width + 20));
    out.push('\n');

    for result in results {
        let details = if !result.error.is_empty() {
            format!("error: {}", result.error)
        } else {
            let mut parts = Vec::new();
            if result.has_balance {
                parts.push(result.coins.clone());
            } else {
                parts.push("no balance".to_string());
            }
            if !result.validator.is_empty() {
                parts.push(format!("validator {}", result.validator));
            }
            if !result.link.is_empty() {
                parts.push(result.link.clone());
            }
            parts.join(" | ")
        };
        out.push_str(&format!(
            "{:chain_width$} | {:address_width$} | {}\n",
            result.chain, result.address, details
        ));
    }
    out
}
