// 🧩 Config Assembler - Emulator configuration document
// Wraps the two mappings and the server parameters; no validation beyond shape

use crate::mapping::{SignalMapping, SlaveMapping};
use crate::settings::ServerSettings;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// CONFIG DOCUMENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEntry {
    pub host: String,
    pub port: u16,
    /// `[hours, minutes, seconds]`
    pub period: [u32; 3],
    pub slaves: SlaveMapping,
}

/// Top-level document handed to the emulator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub signals: SignalMapping,
    pub servers: IndexMap<String, ServerEntry>,
}

impl Config {
    /// Pretty JSON with 4-space indent; non-ASCII text is written as-is
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)
            .context("Failed to serialize config")?;
        String::from_utf8(buf).context("Serialized config is not UTF-8")
    }

    pub fn from_json(json: &str) -> Result<Config> {
        serde_json::from_str(json).context("Failed to parse config JSON")
    }

    /// SHA-256 of the compact JSON form, for comparing runs from the logs
    pub fn fingerprint(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self).context("Failed to serialize config")?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(format!("{:x}", hasher.finalize()))
    }

    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }
}

// ============================================================================
// CONFIG ASSEMBLER
// ============================================================================

pub struct ConfigAssembler<'a> {
    server: &'a ServerSettings,
}

impl<'a> ConfigAssembler<'a> {
    pub fn new(server: &'a ServerSettings) -> Self {
        ConfigAssembler { server }
    }

    pub fn assemble(&self, signals: SignalMapping, slaves: SlaveMapping) -> Config {
        let mut servers = IndexMap::new();
        servers.insert(
            self.server.name.clone(),
            ServerEntry {
                host: self.server.host.clone(),
                port: self.server.port,
                period: self.server.period.as_triple(),
                slaves,
            },
        );

        Config { signals, servers }
    }
}

// ============================================================================
// TESTS
// ============================================================================
