// ⚙️ Settings - One immutable run configuration
// Built once at startup (CLI + environment) and passed by reference into every stage

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Subset name that always holds the full resolved table
pub const ALL_ASSETS: &str = "all_assets";

// ============================================================================
// COLUMN NAMES
// ============================================================================

/// Header names of both input sheets
///
/// Every identifier can be overridden; the defaults match the inventory template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNames {
    /// Device column in the signals sheet (join key, later the device name)
    pub device: String,
    pub code: String,
    pub signal_type: String,
    /// Register address within a slave
    pub address: String,
    pub value_type: String,
    pub asset: String,

    pub gateway: String,
    /// Device key column in the devices sheet (renamed to `device` when joining)
    pub device_key: String,
    /// Protocol slave id
    pub common_address: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        ColumnNames {
            device: "device".to_string(),
            code: "code".to_string(),
            signal_type: "signal_type".to_string(),
            address: "address".to_string(),
            value_type: "value_type".to_string(),
            asset: "asset".to_string(),
            gateway: "gateway".to_string(),
            device_key: "code".to_string(),
            common_address: "common_address".to_string(),
        }
    }
}

impl ColumnNames {
    /// Columns the signals sheet must carry
    pub fn required_signal_columns(&self) -> [&str; 4] {
        [&self.device, &self.code, &self.signal_type, &self.address]
    }

    /// Columns the devices sheet must carry
    pub fn required_device_columns(&self) -> [&str; 3] {
        [&self.gateway, &self.device_key, &self.common_address]
    }
}

// ============================================================================
// SERVER
// ============================================================================

/// Emulator polling period, emitted as `[hours, minutes, seconds]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl Period {
    pub fn new(hours: u32, minutes: u32, seconds: u32) -> Self {
        Period { hours, minutes, seconds }
    }

    pub fn as_triple(&self) -> [u32; 3] {
        [self.hours, self.minutes, self.seconds]
    }
}

impl Default for Period {
    fn default() -> Self {
        Period::new(0, 10, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Key of the server entry in the generated config
    pub name: String,
    pub host: String,
    pub port: u16,
    pub period: Period,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            name: "Test".to_string(),
            host: "0.0.0.0".to_string(),
            port: 502,
            period: Period::default(),
        }
    }
}

// ============================================================================
// SPLITTING & RETENTION
// ============================================================================

/// Whether outputs are produced per asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSettings {
    /// One config JSON per asset instead of a combined one
    pub config_by_asset: bool,
    /// One data template per asset instead of a combined one
    pub data_by_asset: bool,
}

impl SplitSettings {
    /// Partitioning runs when either output is split
    pub fn any(&self) -> bool {
        self.config_by_asset || self.data_by_asset
    }
}

impl Default for SplitSettings {
    fn default() -> Self {
        SplitSettings {
            config_by_asset: true,
            data_by_asset: true,
        }
    }
}

/// Which row survives when several rows resolve to the same code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionPolicy {
    First,
    #[default]
    Last,
}

impl RetentionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetentionPolicy::First => "first",
            RetentionPolicy::Last => "last",
        }
    }
}

impl fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetentionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first" => Ok(RetentionPolicy::First),
            "last" => Ok(RetentionPolicy::Last),
            other => Err(format!(
                "unknown retention policy '{}' (expected 'first' or 'last')",
                other
            )),
        }
    }
}

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,

    /// Workbook directory name under `input_dir`
    pub list_of_signals_name: String,
    pub signals_sheet: String,
    pub devices_sheet: String,

    /// Stem of the data template files (`{stem}_{asset}.{ext}`)
    pub data_file_name: String,
    pub data_file_extension: String,
    /// Stem of the config files (`{stem}_{asset}.json`)
    pub config_file_name: String,

    pub columns: ColumnNames,

    /// Only rows of this signal type are emulated
    pub target_signal_type: String,
    /// Backfill for rows without a value type
    pub default_value_type: String,
    /// Subset name for rows without an asset
    pub unassigned_asset: String,

    pub split: SplitSettings,
    pub retention: RetentionPolicy,
    pub server: ServerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            input_dir: PathBuf::from("input_files"),
            output_dir: PathBuf::from("output_files"),
            list_of_signals_name: String::new(),
            signals_sheet: "signals".to_string(),
            devices_sheet: "devices".to_string(),
            data_file_name: "data".to_string(),
            data_file_extension: "csv".to_string(),
            config_file_name: "config".to_string(),
            columns: ColumnNames::default(),
            target_signal_type: "Сигнал".to_string(),
            default_value_type: "hfloat".to_string(),
            unassigned_asset: "no_asset".to_string(),
            split: SplitSettings::default(),
            retention: RetentionPolicy::default(),
            server: ServerSettings::default(),
        }
    }
}

impl Settings {
    /// Directory holding one CSV per sheet
    pub fn workbook_dir(&self) -> PathBuf {
        self.input_dir.join(&self.list_of_signals_name)
    }

    pub fn signals_file(&self) -> PathBuf {
        self.workbook_dir().join(format!("{}.csv", self.signals_sheet))
    }

    pub fn devices_file(&self) -> PathBuf {
        self.workbook_dir().join(format!("{}.csv", self.devices_sheet))
    }

    /// File name (no directory) of the data template for a suffix
    pub fn data_file_for(&self, suffix: &str) -> String {
        format!(
            "{}_{}.{}",
            self.data_file_name,
            file_name_part(suffix),
            self.data_file_extension
        )
    }

    pub fn config_file_for(&self, asset: &str) -> String {
        format!("{}_{}.json", self.config_file_name, file_name_part(asset))
    }
}

/// Asset value made safe for a file name
///
/// Path separators, characters Windows rejects and control characters become `_`,
/// so `Pump 1/2` is written as `Pump 1_2`.
pub fn file_name_part(asset: &str) -> String {
    asset
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_defaults_match_inventory_template() {
        let settings = Settings::default();

        assert_eq!(settings.columns.device, "device");
        assert_eq!(settings.columns.device_key, "code");
        assert_eq!(settings.default_value_type, "hfloat");
        assert_eq!(settings.server.port, 502);
        assert_eq!(settings.server.period.as_triple(), [0, 10, 0]);
        assert_eq!(settings.retention, RetentionPolicy::Last);
        assert!(settings.split.any());
    }

    #[test]
    fn test_file_names() {
        let settings = Settings {
            list_of_signals_name: "plant".to_string(),
            ..Settings::default()
        };

        assert_eq!(
            settings.signals_file(),
            Path::new("input_files").join("plant").join("signals.csv")
        );
        assert_eq!(settings.data_file_for("pump_1"), "data_pump_1.csv");
        assert_eq!(settings.config_file_for(ALL_ASSETS), "config_all_assets.json");
    }

    #[test]
    fn test_asset_with_path_separator_stays_in_output_dir() {
        let settings = Settings::default();

        assert_eq!(settings.config_file_for("Pump 1/2"), "config_Pump 1_2.json");
        assert_eq!(settings.data_file_for("a\\b:c"), "data_a_b_c.csv");
        assert_eq!(file_name_part("Котёл 3"), "Котёл 3");
    }

    #[test]
    fn test_retention_policy_parse() {
        assert_eq!("first".parse::<RetentionPolicy>(), Ok(RetentionPolicy::First));
        assert_eq!(" LAST ".parse::<RetentionPolicy>(), Ok(RetentionPolicy::Last));
        assert!("middle".parse::<RetentionPolicy>().is_err());
    }

    #[test]
    fn test_split_any() {
        let none = SplitSettings { config_by_asset: false, data_by_asset: false };
        let data_only = SplitSettings { config_by_asset: false, data_by_asset: true };

        assert!(!none.any());
        assert!(data_only.any());
    }
}
