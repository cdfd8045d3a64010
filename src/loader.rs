// 📂 Data Loader - Signals and devices sheets → typed tables
// The workbook is exported as one CSV per sheet; headers are matched by configured name

use crate::error::SchemaError;
use crate::records::{DeviceRow, SignalRow, Table};
use crate::settings::{ColumnNames, Settings};
use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

// ============================================================================
// HEADER INDEX
// ============================================================================

/// Position of every header cell, keyed by trimmed name
struct HeaderIndex {
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    fn new(headers: &StringRecord) -> Self {
        let positions = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim_start_matches('\u{feff}').trim().to_string(), i))
            .collect();
        HeaderIndex { positions }
    }

    fn optional(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    fn required(&self, table: &str, column: &str) -> Result<usize, SchemaError> {
        self.optional(column)
            .ok_or_else(|| SchemaError::missing_column(table, column))
    }
}

/// Cell text, with blank cells read as absent
fn cell(record: &StringRecord, index: Option<usize>) -> Option<String> {
    let value = record.get(index?)?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

// ============================================================================
// DATA LOADER
// ============================================================================

pub struct DataLoader<'a> {
    columns: &'a ColumnNames,
}

impl<'a> DataLoader<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        DataLoader {
            columns: &settings.columns,
        }
    }

    /// Load the signals sheet from a CSV file
    pub fn load_signals(&self, path: &Path) -> Result<Table<SignalRow>> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open signals sheet: {}", path.display()))?;
        let table = self
            .read_signals(file)
            .with_context(|| format!("Failed to load signals from {}", path.display()))?;

        info!("Loaded signals sheet {} ({} rows)", path.display(), table.len());
        Ok(table)
    }

    /// Load the devices sheet from a CSV file
    pub fn load_devices(&self, path: &Path) -> Result<Table<DeviceRow>> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open devices sheet: {}", path.display()))?;
        let table = self
            .read_devices(file)
            .with_context(|| format!("Failed to load devices from {}", path.display()))?;

        info!("Loaded devices sheet {} ({} rows)", path.display(), table.len());
        Ok(table)
    }

    pub fn read_signals<R: Read>(&self, reader: R) -> Result<Table<SignalRow>> {
        let cols = self.columns;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = HeaderIndex::new(reader.headers().context("Failed to read header row")?);
        let device = headers.required("signals", &cols.device)?;
        let code = headers.required("signals", &cols.code)?;
        let signal_type = headers.required("signals", &cols.signal_type)?;
        let address = headers.required("signals", &cols.address)?;
        let value_type = headers.optional(&cols.value_type);
        let asset = headers.optional(&cols.asset);

        let mut columns: Vec<String> = cols
            .required_signal_columns()
            .iter()
            .map(|c| c.to_string())
            .collect();
        if value_type.is_some() {
            columns.push(cols.value_type.clone());
        }
        if asset.is_some() {
            columns.push(cols.asset.clone());
        }

        let mut rows = Vec::new();
        for (i, result) in reader.records().enumerate() {
            let line = i + 2; // 1-indexed + header row
            let record = result.with_context(|| format!("Failed to parse CSV line {}", line))?;

            rows.push(SignalRow {
                line,
                device: cell(&record, Some(device)),
                code: cell(&record, Some(code)),
                signal_type: cell(&record, Some(signal_type)),
                address: cell(&record, Some(address)),
                value_type: cell(&record, value_type),
                asset: cell(&record, asset),
            });
        }

        Ok(Table::new(columns, rows))
    }

    pub fn read_devices<R: Read>(&self, reader: R) -> Result<Table<DeviceRow>> {
        let cols = self.columns;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = HeaderIndex::new(reader.headers().context("Failed to read header row")?);
        let gateway = headers.required("devices", &cols.gateway)?;
        let device_key = headers.required("devices", &cols.device_key)?;
        let common_address = headers.required("devices", &cols.common_address)?;

        let columns = cols
            .required_device_columns()
            .iter()
            .map(|c| c.to_string())
            .collect();

        let mut rows = Vec::new();
        for (i, result) in reader.records().enumerate() {
            let line = i + 2;
            let record = result.with_context(|| format!("Failed to parse CSV line {}", line))?;

            rows.push(DeviceRow {
                line,
                gateway: cell(&record, Some(gateway)),
                device_key: cell(&record, Some(device_key)),
                common_address: cell(&record, Some(common_address)),
            });
        }

        Ok(Table::new(columns, rows))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_signals_with_blank_cells() {
        let settings = Settings::default();
        let loader = DataLoader::new(&settings);
        let csv = "device,code,signal_type,address,value_type,asset\n\
                   D1,temp,Сигнал,100,,pump\n\
                   D2,humid,Сигнал,  ,hint,\n";

        let table = loader.read_signals(csv.as_bytes()).unwrap();

        assert_eq!(table.len(), 2);
        assert!(table.has_column("value_type"));
        assert!(table.has_column("asset"));

        let first = &table.rows()[0];
        assert_eq!(first.line, 2);
        assert_eq!(first.code.as_deref(), Some("temp"));
        assert_eq!(first.value_type, None);

        let second = &table.rows()[1];
        assert_eq!(second.address, None);
        assert_eq!(second.asset, None);
    }

    #[test]
    fn test_read_signals_optional_columns_absent() {
        let settings = Settings::default();
        let loader = DataLoader::new(&settings);
        let csv = "signal_type,code,device,address\nСигнал,t1,D1,1\n";

        let table = loader.read_signals(csv.as_bytes()).unwrap();

        assert!(!table.has_column("value_type"));
        assert!(!table.has_column("asset"));
        assert_eq!(table.rows()[0].device.as_deref(), Some("D1"));
        assert_eq!(table.rows()[0].value_type, None);
    }

    #[test]
    fn test_read_signals_missing_required_column() {
        let settings = Settings::default();
        let loader = DataLoader::new(&settings);
        let csv = "device,signal_type,address\nD1,Сигнал,100\n";

        let err = loader.read_signals(csv.as_bytes()).unwrap_err();
        let schema = err.downcast_ref::<SchemaError>().unwrap();

        assert_eq!(schema, &SchemaError::missing_column("signals", "code"));
    }

    #[test]
    fn test_read_devices_custom_key_column() {
        let mut settings = Settings::default();
        settings.columns.device_key = "device_code".to_string();
        let loader = DataLoader::new(&settings);
        let csv = "gateway,device_code,common_address\nGW1,D1,5\n";

        let table = loader.read_devices(csv.as_bytes()).unwrap();

        assert_eq!(table.rows()[0].device_key.as_deref(), Some("D1"));
        assert_eq!(table.rows()[0].common_address.as_deref(), Some("5"));
    }

    #[test]
    fn test_load_signals_from_file() {
        let settings = Settings::default();
        let loader = DataLoader::new(&settings);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "\u{feff}device,code,signal_type,address").unwrap();
        writeln!(file, "D1,t1,Сигнал,100").unwrap();

        let table = loader.load_signals(file.path()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].device.as_deref(), Some("D1"));
    }

    #[test]
    fn test_load_missing_file() {
        let settings = Settings::default();
        let loader = DataLoader::new(&settings);

        let result = loader.load_devices(Path::new("/nonexistent/devices.csv"));
        assert!(result.is_err());
    }
}
