use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// Metadata for one network of the federation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NetworkRecord {
    pub name: String,
    /// Bech32 human-readable prefix used for account addresses
    pub prefix: String,
    /// RPC endpoint candidates in registration order
    pub rpc: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer: Option<String>,
}

impl NetworkRecord {
    pub fn explorer_link(&self) -> &str {
        self.explorer.as_deref().unwrap_or_default()
    }
}

/// Per-network record in cosmos chain-registry `chain.json` layout
#[derive(Debug, Clone, Deserialize)]
struct ChainInfo {
    #[serde(default)]
    bech32_prefix: String,
    #[serde(default)]
    apis: Apis,
    #[serde(default)]
    explorers: Vec<Explorer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Apis {
    #[serde(default)]
    rpc: Vec<Rpc>,
}

#[derive(Debug, Clone, Deserialize)]
struct Rpc {
    address: String,
}

#[derive(Debug, Clone, Deserialize)]
struct Explorer {
    url: Option<String>,
}

impl ChainInfo {
    fn into_record(self, name: &str) -> NetworkRecord {
        NetworkRecord {
            name: name.to_string(),
            prefix: self.bech32_prefix,
            rpc: self.apis.rpc.into_iter().map(|r| r.address).collect(),
            explorer: self.explorers.into_iter().find_map(|e| e.url),
        }
    }
}

/// Layout of the embedded registry file
#[derive(Debug, Deserialize)]
struct RegistryFile {
    chains: BTreeMap<String, ChainInfo>,
    #[serde(default)]
    additional: HashMap<String, Vec<String>>,
}

/// Read-only mapping from network name to its record.
///
/// Records without any RPC endpoint are never stored: nothing could be
/// queried for them.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    networks: BTreeMap<String, NetworkRecord>,
}

impl ChainRegistry {
    /// Load the registry embedded in the binary, with its supplemental endpoints applied
    pub fn load() -> Result<Self> {
        Self::from_json_str(include_str!("../registry.json"))
    }

    /// Parse a registry in the embedded file format
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: RegistryFile =
            serde_json::from_str(json).context("Could not parse registry file")?;
        let registry = Self::from_records(
            file.chains
                .into_iter()
                .map(|(name, info)| info.into_record(&name)),
        );
        Ok(registry.with_additional_endpoints(&file.additional))
    }

    /// Supplemental endpoints shipped with the embedded registry
    pub fn embedded_additional_endpoints() -> Result<HashMap<String, Vec<String>>> {
        let file: RegistryFile = serde_json::from_str(include_str!("../registry.json"))
            .context("Could not parse registry file")?;
        Ok(file.additional)
    }

    /// Load a directory in cosmos chain-registry layout (`<name>/chain.json`).
    ///
    /// Entries starting with `_` or `.` are skipped, as are files that cannot be
    /// read or parsed.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir)
            .with_context(|| format!("Could not read registry directory {}", dir.display()))?;

        let mut records = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('_') || name.starts_with('.') {
                continue;
            }

            let path = entry.path().join("chain.json");
            let contents = match fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(e) => {
                    tracing::warn!(network = %name, error = %e, "skipping unreadable chain.json");
                    continue;
                }
            };
            match serde_json::from_str::<ChainInfo>(&contents) {
                Ok(info) => records.push(info.into_record(&name)),
                Err(e) => {
                    tracing::warn!(network = %name, error = %e, "skipping malformed chain.json");
                }
            }
        }

        Ok(Self::from_records(records))
    }

    /// Build a registry from explicit records, dropping any without endpoints
    pub fn from_records(records: impl IntoIterator<Item = NetworkRecord>) -> Self {
        let networks = records
            .into_iter()
            .filter(|record| !record.rpc.is_empty())
            .map(|record| (record.name.clone(), record))
            .collect();
        Self { networks }
    }

    /// Append extra endpoints after the registered ones of each named network
    pub fn with_additional_endpoints(mut self, additional: &HashMap<String, Vec<String>>) -> Self {
        for (name, endpoints) in additional {
            match self.networks.get_mut(name) {
                Some(record) => record.rpc.extend(endpoints.iter().cloned()),
                None => {
                    tracing::debug!(network = %name, "not in registry, skipping additional endpoints");
                }
            }
        }
        self
    }

    /// Get a specific network record
    pub fn get(&self, name: &str) -> Option<&NetworkRecord> {
        self.networks.get(name)
    }

    /// Records ordered by network name
    pub fn iter(&self) -> impl Iterator<Item = &NetworkRecord> {
        self.networks.values()
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}
