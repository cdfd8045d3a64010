// 🏭 Signal Pipeline
// join → filter → resolve → aggregate → normalize → partition → map
// Each stage is a pure function of its input table plus the shared settings

use crate::aggregation::DeviceNameAggregator;
use crate::config::{Config, ConfigAssembler};
use crate::error::MappingError;
use crate::filter::SignalFilter;
use crate::join::RecordJoiner;
use crate::mapping::{MappingBuilder, SignalTemplate};
use crate::normalize::TypeNormalizer;
use crate::partition::{AssetPartitioner, AssetSubset};
use crate::records::{DeviceRow, ResolvedSignal, SignalRow, Table};
use crate::resolver::{CodeResolver, RegisterCollision};
use crate::settings::Settings;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ============================================================================
// RESULTS
// ============================================================================

/// What gets written for one subset
#[derive(Debug, Clone, PartialEq)]
pub struct AssetArtifacts {
    pub config: Config,
    pub template: SignalTemplate,
}

/// Result of one subset; a failure here does not affect the others
#[derive(Debug, Clone)]
pub struct AssetOutcome {
    pub asset: String,
    pub rows: usize,
    pub result: Result<AssetArtifacts, MappingError>,
}

/// Row counts of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub signals_loaded: usize,
    pub devices_loaded: usize,
    pub unmatched: usize,
    pub filtered: usize,
    pub collisions: usize,
    pub duplicates_removed: usize,
    pub unresolved: usize,
    pub types_filled: usize,
    pub resolved: usize,
    pub subsets: usize,
    pub failed_subsets: usize,
}

impl PipelineReport {
    pub fn summary(&self) -> String {
        format!(
            "Signals: {} loaded, {} emulated, {} resolved ({} collisions, \
             {} duplicates removed, {} unresolved, {} unmatched); \
             {} value types filled; {} subsets ({} failed)",
            self.signals_loaded,
            self.filtered,
            self.resolved,
            self.collisions,
            self.duplicates_removed,
            self.unresolved,
            self.unmatched,
            self.types_filled,
            self.subsets,
            self.failed_subsets
        )
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Final table before partitioning
    pub resolved: Table<ResolvedSignal>,
    pub collisions: Vec<RegisterCollision>,
    pub outcomes: Vec<AssetOutcome>,
    pub report: PipelineReport,
}

impl PipelineOutput {
    pub fn has_failures(&self) -> bool {
        self.report.failed_subsets > 0
    }

    pub fn outcome(&self, asset: &str) -> Option<&AssetOutcome> {
        self.outcomes.iter().find(|o| o.asset == asset)
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct SignalPipeline<'a> {
    settings: &'a Settings,
}

impl<'a> SignalPipeline<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        SignalPipeline { settings }
    }

    pub fn run(&self, signals: &Table<SignalRow>, devices: &Table<DeviceRow>) -> PipelineOutput {
        let settings = self.settings;
        let mut report = PipelineReport {
            signals_loaded: signals.len(),
            devices_loaded: devices.len(),
            ..PipelineReport::default()
        };

        let merged = RecordJoiner::new(settings).merge(signals, devices);
        report.unmatched = merged.iter().filter(|r| !r.has_device()).count();

        let filtered = SignalFilter::new(settings).apply(&merged);
        report.filtered = filtered.len();

        let resolution = CodeResolver::from_settings(settings).resolve(&filtered);
        report.collisions = resolution.collisions.len();
        report.duplicates_removed = resolution.duplicates_removed;
        report.unresolved = resolution.unresolved;

        let aggregated = DeviceNameAggregator::new().concatenate(&resolution.table);

        let normalized = TypeNormalizer::new(settings).fill_missing(&aggregated);
        report.types_filled = normalized.filled;
        report.resolved = normalized.table.len();

        let subsets = AssetPartitioner::new(settings).divide(&normalized.table);
        report.subsets = subsets.len();

        let outcomes: Vec<AssetOutcome> = subsets.iter().map(|s| self.build_subset(s)).collect();
        report.failed_subsets = outcomes.iter().filter(|o| o.result.is_err()).count();

        PipelineOutput {
            resolved: normalized.table,
            collisions: resolution.collisions,
            outcomes,
            report,
        }
    }

    fn build_subset(&self, subset: &AssetSubset) -> AssetOutcome {
        if subset.shadows_combined() {
            return AssetOutcome {
                asset: subset.asset.clone(),
                rows: subset.signals.len(),
                result: Err(MappingError::ReservedAssetName {
                    asset: subset.asset.clone(),
                }),
            };
        }

        let result = MappingBuilder::new(self.settings)
            .build(&subset.asset, &subset.signals)
            .map(|mappings| {
                let config = ConfigAssembler::new(&self.settings.server)
                    .assemble(mappings.signals, mappings.slaves);
                debug!("Config for asset '{}' generated", subset.asset);
                AssetArtifacts {
                    config,
                    template: mappings.template,
                }
            });

        if let Ok(artifacts) = &result {
            info!(
                "Asset '{}': {} signals",
                subset.asset,
                artifacts.config.signal_count()
            );
        }

        AssetOutcome {
            asset: subset.asset.clone(),
            rows: subset.signals.len(),
            result,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{SplitSettings, ALL_ASSETS};

    fn signal(
        line: usize,
        device: &str,
        code: &str,
        address: Option<&str>,
        value_type: Option<&str>,
        asset: &str,
    ) -> SignalRow {
        SignalRow {
            line,
            device: Some(device.to_string()),
            code: Some(code.to_string()),
            signal_type: Some("Сигнал".to_string()),
            address: address.map(str::to_string),
            value_type: value_type.map(str::to_string),
            asset: Some(asset.to_string()),
        }
    }

    fn device(key: &str, gateway: &str, common_address: &str) -> DeviceRow {
        DeviceRow {
            line: 2,
            gateway: Some(gateway.to_string()),
            device_key: Some(key.to_string()),
            common_address: Some(common_address.to_string()),
        }
    }

    fn signal_columns() -> Vec<String> {
        ["device", "code", "signal_type", "address", "value_type", "asset"]
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    fn device_columns() -> Vec<String> {
        ["gateway", "code", "common_address"].iter().map(|c| c.to_string()).collect()
    }

    fn inventory() -> (Table<SignalRow>, Table<DeviceRow>) {
        let mut command = signal(7, "Sensor A", "cmd", Some("300"), None, "pump");
        command.signal_type = Some("Команда".to_string());

        let signals = Table::new(
            signal_columns(),
            vec![
                signal(2, "Sensor A", "t1", Some("100"), Some("hint"), "pump"),
                signal(3, "Sensor B", "t2", Some("100"), None, "pump"),
                signal(4, "Hygro", "humid", Some("200"), None, "boiler"),
                signal(5, "Sensor A", "noaddr", None, None, "pump"),
                signal(6, "Ghost", "lost", Some("1"), None, "boiler"),
                command,
            ],
        );
        let devices = Table::new(
            device_columns(),
            vec![
                device("Sensor A", "GW1", "5"),
                device("Sensor B", "GW1", "5"),
                device("Hygro", "GW2", "6"),
            ],
        );
        (signals, devices)
    }

    #[test]
    fn test_end_to_end() {
        let settings = Settings::default();
        let (signals, devices) = inventory();

        let output = SignalPipeline::new(&settings).run(&signals, &devices);

        let codes: Vec<&str> = output.resolved.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["2_signals_GW1_100", "humid_GW2"]);

        let report = &output.report;
        assert_eq!(report.signals_loaded, 6);
        assert_eq!(report.unmatched, 1);
        assert_eq!(report.filtered, 4);
        assert_eq!(report.collisions, 1);
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(report.unresolved, 1);
        assert_eq!(report.types_filled, 2);
        assert_eq!(report.subsets, 3);
        assert!(!output.has_failures());
    }

    #[test]
    fn test_collapsed_group_keeps_last_row() {
        let settings = Settings::default();
        let (signals, devices) = inventory();

        let output = SignalPipeline::new(&settings).run(&signals, &devices);
        let composite = &output.resolved.rows()[0];

        // Last row of the group (t2) had no value type, so it was backfilled
        assert_eq!(composite.source_code.as_deref(), Some("t2"));
        assert_eq!(composite.value_type.as_deref(), Some("hfloat"));
        assert_eq!(composite.device, "Sensor B");
    }

    #[test]
    fn test_per_asset_configs() {
        let settings = Settings::default();
        let (signals, devices) = inventory();

        let output = SignalPipeline::new(&settings).run(&signals, &devices);

        let pump = output.outcome("pump").unwrap().result.as_ref().unwrap();
        assert_eq!(pump.template.columns, vec!["2_signals_GW1_100"]);
        let server = &pump.config.servers["Test"];
        assert_eq!(server.slaves["Sensor B"].slave_id, 5);
        assert_eq!(server.slaves["Sensor B"].holdings["100"], "2_signals_GW1_100");

        let boiler = output.outcome("boiler").unwrap().result.as_ref().unwrap();
        assert_eq!(boiler.config.signals["humid_GW2"].base.file(), "data_boiler.csv");

        let all = output.outcome(ALL_ASSETS).unwrap().result.as_ref().unwrap();
        assert_eq!(all.config.signal_count(), 2);
    }

    #[test]
    fn test_no_split_single_subset() {
        let settings = Settings {
            split: SplitSettings { config_by_asset: false, data_by_asset: false },
            ..Settings::default()
        };
        let (signals, devices) = inventory();

        let output = SignalPipeline::new(&settings).run(&signals, &devices);

        assert_eq!(output.outcomes.len(), 1);
        let all = output.outcomes[0].result.as_ref().unwrap();
        assert!(all
            .config
            .signals
            .values()
            .all(|e| e.base.file() == "data_all_assets.csv"));
    }

    #[test]
    fn test_failed_subset_is_isolated() {
        let settings = Settings::default();
        let signals = Table::new(
            signal_columns(),
            vec![
                signal(2, "Good", "a", Some("1"), None, "pump"),
                signal(3, "Bad", "b", Some("2"), None, "boiler"),
            ],
        );
        let devices = Table::new(
            device_columns(),
            vec![device("Good", "GW1", "1"), device("Bad", "GW1", "x1")],
        );

        let output = SignalPipeline::new(&settings).run(&signals, &devices);

        assert!(output.has_failures());
        assert!(output.outcome("pump").unwrap().result.is_ok());
        assert!(output.outcome("boiler").unwrap().result.is_err());
        // The combined subset contains the bad slave as well
        assert!(output.outcome(ALL_ASSETS).unwrap().result.is_err());
        assert_eq!(output.report.failed_subsets, 2);
    }

    #[test]
    fn test_asset_named_all_assets_fails_its_subset() {
        let settings = Settings::default();
        let signals = Table::new(
            signal_columns(),
            vec![
                signal(2, "Good", "a", Some("1"), None, "pump"),
                signal(3, "Odd", "b", Some("2"), None, ALL_ASSETS),
            ],
        );
        let devices = Table::new(
            device_columns(),
            vec![device("Good", "GW1", "1"), device("Odd", "GW1", "2")],
        );

        let output = SignalPipeline::new(&settings).run(&signals, &devices);

        assert_eq!(output.outcomes.len(), 3);
        let combined = output.outcomes[0].result.as_ref().unwrap();
        assert_eq!(combined.config.signal_count(), 2);
        assert!(output.outcome("pump").unwrap().result.is_ok());
        assert_eq!(
            output.outcomes[2].result.as_ref().unwrap_err(),
            &MappingError::ReservedAssetName { asset: ALL_ASSETS.to_string() }
        );
        assert_eq!(output.outcomes[2].rows, 1);
        assert_eq!(output.report.failed_subsets, 1);
    }

    #[test]
    fn test_empty_inputs() {
        let settings = Settings::default();
        let signals = Table::new(signal_columns(), vec![]);
        let devices = Table::new(device_columns(), vec![]);

        let output = SignalPipeline::new(&settings).run(&signals, &devices);

        assert_eq!(output.outcomes.len(), 1);
        let all = output.outcomes[0].result.as_ref().unwrap();
        assert!(all.config.signals.is_empty());
        assert!(all.template.is_empty());
    }
}
