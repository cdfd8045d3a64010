// 🗺️ Mapping Builder - Signal and slave mappings for one asset subset
//
// signals: code → { type, base: [data file, code] }
// slaves:  device name → { slaveID, holdings: address → code }

use crate::error::{MappingError, SchemaError};
use crate::records::{ResolvedSignal, Table};
use crate::settings::{Settings, ALL_ASSETS};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ============================================================================
// MAPPING TYPES
// ============================================================================

/// Where the emulator reads a signal's values: `[data file, column]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource(pub String, pub String);

impl DataSource {
    pub fn file(&self) -> &str {
        &self.0
    }

    pub fn column(&self) -> &str {
        &self.1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalEntry {
    #[serde(rename = "type")]
    pub value_type: String,
    pub base: DataSource,
}

/// Register address → signal code
pub type Holdings = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaveEntry {
    #[serde(rename = "slaveID")]
    pub slave_id: u32,
    pub holdings: Holdings,
}

/// Signal code → type and data source
pub type SignalMapping = IndexMap<String, SignalEntry>;

/// Device name (possibly aggregated) → slave id and registers
pub type SlaveMapping = IndexMap<String, SlaveEntry>;

/// Header of the companion data file: one column per resolved code
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignalTemplate {
    pub columns: Vec<String>,
}

impl SignalTemplate {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Everything built from one subset
#[derive(Debug, Clone, PartialEq)]
pub struct AssetMappings {
    pub signals: SignalMapping,
    pub slaves: SlaveMapping,
    pub template: SignalTemplate,
}

// ============================================================================
// MAPPING BUILDER
// ============================================================================

pub struct MappingBuilder<'a> {
    settings: &'a Settings,
}

impl<'a> MappingBuilder<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        MappingBuilder { settings }
    }

    /// Build both mappings and the template for one subset
    ///
    /// Fails with a `SchemaError` when the subset has no code column, and on a
    /// missing or non-integer slave id.
    pub fn build(
        &self,
        asset: &str,
        signals: &Table<ResolvedSignal>,
    ) -> Result<AssetMappings, MappingError> {
        let code_column = &self.settings.columns.code;
        if !signals.has_column(code_column) {
            return Err(SchemaError::missing_column(asset, code_column).into());
        }

        let mappings = AssetMappings {
            signals: self.create_signal_mapping(signals),
            slaves: self.create_slave_mapping(signals)?,
            template: self.create_template(signals),
        };

        debug!(
            "Mappings for '{}' created ({} signals, {} slave entries)",
            asset,
            mappings.signals.len(),
            mappings.slaves.len()
        );
        Ok(mappings)
    }

    /// Data file a row's values live in
    fn data_file(&self, row: &ResolvedSignal) -> String {
        let suffix = if self.settings.split.data_by_asset {
            row.asset.as_deref().unwrap_or(&self.settings.unassigned_asset)
        } else {
            ALL_ASSETS
        };
        self.settings.data_file_for(suffix)
    }

    fn create_signal_mapping(&self, signals: &Table<ResolvedSignal>) -> SignalMapping {
        signals
            .iter()
            .map(|row| {
                let entry = SignalEntry {
                    value_type: row
                        .value_type
                        .clone()
                        .unwrap_or_else(|| self.settings.default_value_type.clone()),
                    base: DataSource(self.data_file(row), row.code.clone()),
                };
                (row.code.clone(), entry)
            })
            .collect()
    }

    fn create_slave_mapping(
        &self,
        signals: &Table<ResolvedSignal>,
    ) -> Result<SlaveMapping, MappingError> {
        let mut by_device: IndexMap<&str, Vec<&ResolvedSignal>> = IndexMap::new();
        for row in signals {
            by_device.entry(row.device.as_str()).or_default().push(row);
        }

        let mut mapping = SlaveMapping::new();
        for (device, rows) in by_device {
            let slave_id = Self::slave_id(device, rows[0])?;

            let mut holdings = Holdings::new();
            for row in rows {
                if let Some(previous) = holdings.insert(row.address.clone(), row.code.clone()) {
                    warn!(
                        "Device '{}' maps register {} twice ('{}' replaced by '{}')",
                        device, row.address, previous, row.code
                    );
                }
            }

            mapping.insert(device.to_string(), SlaveEntry { slave_id, holdings });
        }

        Ok(mapping)
    }

    fn slave_id(device: &str, row: &ResolvedSignal) -> Result<u32, MappingError> {
        let value = row
            .common_address
            .as_deref()
            .ok_or_else(|| MappingError::MissingSlaveId {
                device: device.to_string(),
            })?;

        value.parse::<u32>().map_err(|_| MappingError::InvalidSlaveId {
            device: device.to_string(),
            value: value.to_string(),
        })
    }

    fn create_template(&self, signals: &Table<ResolvedSignal>) -> SignalTemplate {
        SignalTemplate {
            columns: signals.iter().map(|row| row.code.clone()).collect(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
