// 🔗 Record Joiner - Left join of signals onto devices
// Every signal row survives; unmatched rows carry no device fields

use crate::records::{DeviceRow, MergedRow, SignalRow, Table};
use crate::settings::Settings;
use std::collections::HashMap;
use tracing::{debug, warn};

pub struct RecordJoiner<'a> {
    settings: &'a Settings,
}

impl<'a> RecordJoiner<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        RecordJoiner { settings }
    }

    /// Join on the device key
    ///
    /// The devices sheet's key column is renamed to the signals sheet's device
    /// column, so the merged schema carries it once. When a key repeats in the
    /// devices sheet the first row wins, which keeps the output exactly as long
    /// as the signals table.
    pub fn merge(
        &self,
        signals: &Table<SignalRow>,
        devices: &Table<DeviceRow>,
    ) -> Table<MergedRow> {
        let cols = &self.settings.columns;

        let mut by_key: HashMap<&str, &DeviceRow> = HashMap::new();
        let mut repeated_keys = 0;
        for device in devices {
            let Some(key) = device.device_key.as_deref() else {
                continue;
            };
            if by_key.contains_key(key) {
                repeated_keys += 1;
            } else {
                by_key.insert(key, device);
            }
        }
        if repeated_keys > 0 {
            warn!(
                "Devices sheet repeats {} device key(s) in column '{}'; first occurrence used",
                repeated_keys, cols.device_key
            );
        }

        let rows: Vec<MergedRow> = signals
            .iter()
            .map(|signal| {
                let device = signal
                    .device
                    .as_deref()
                    .and_then(|key| by_key.get(key).copied());
                MergedRow::from_signal(signal, device)
            })
            .collect();

        let unmatched = rows.iter().filter(|r| !r.has_device()).count();
        if unmatched > 0 {
            warn!("{} signal row(s) have no matching device", unmatched);
        }

        let mut columns = signals.columns().to_vec();
        for column in devices.columns() {
            let renamed = if column == &cols.device_key { &cols.device } else { column };
            if !columns.contains(renamed) {
                columns.push(renamed.clone());
            }
        }

        debug!("Signals and devices joined ({} rows)", rows.len());
        Table::new(columns, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_signal(line: usize, device: Option<&str>, code: &str) -> SignalRow {
        SignalRow {
            line,
            device: device.map(str::to_string),
            code: Some(code.to_string()),
            signal_type: Some("Сигнал".to_string()),
            address: Some("100".to_string()),
            value_type: None,
            asset: None,
        }
    }

    fn create_test_device(key: &str, gateway: &str, common_address: &str) -> DeviceRow {
        DeviceRow {
            line: 2,
            gateway: Some(gateway.to_string()),
            device_key: Some(key.to_string()),
            common_address: Some(common_address.to_string()),
        }
    }

    fn signal_columns() -> Vec<String> {
        ["device", "code", "signal_type", "address"].iter().map(|c| c.to_string()).collect()
    }

    fn device_columns() -> Vec<String> {
        ["gateway", "code", "common_address"].iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_left_join_keeps_every_signal() {
        let settings = Settings::default();
        let joiner = RecordJoiner::new(&settings);

        let signals = Table::new(
            signal_columns(),
            vec![
                create_test_signal(2, Some("D1"), "t1"),
                create_test_signal(3, Some("UNKNOWN"), "t2"),
                create_test_signal(4, None, "t3"),
            ],
        );
        let devices = Table::new(device_columns(), vec![create_test_device("D1", "GW1", "5")]);

        let merged = joiner.merge(&signals, &devices);

        assert_eq!(merged.len(), signals.len());
        assert_eq!(merged.rows()[0].gateway.as_deref(), Some("GW1"));
        assert_eq!(merged.rows()[0].common_address.as_deref(), Some("5"));
        assert!(merged.rows()[1].gateway.is_none());
        assert!(merged.rows()[2].common_address.is_none());
    }

    #[test]
    fn test_repeated_device_key_does_not_multiply_rows() {
        let settings = Settings::default();
        let joiner = RecordJoiner::new(&settings);

        let signals = Table::new(signal_columns(), vec![create_test_signal(2, Some("D1"), "t1")]);
        let devices = Table::new(
            device_columns(),
            vec![
                create_test_device("D1", "GW1", "5"),
                create_test_device("D1", "GW9", "9"),
            ],
        );

        let merged = joiner.merge(&signals, &devices);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged.rows()[0].gateway.as_deref(), Some("GW1"));
    }

    #[test]
    fn test_device_key_column_is_renamed() {
        let settings = Settings::default();
        let joiner = RecordJoiner::new(&settings);

        let signals = Table::new(signal_columns(), vec![]);
        let devices = Table::new(device_columns(), vec![]);

        let merged = joiner.merge(&signals, &devices);

        assert_eq!(
            merged.columns(),
            &["device", "code", "signal_type", "address", "gateway", "common_address"]
        );
    }

    #[test]
    fn test_empty_devices_sheet() {
        let settings = Settings::default();
        let joiner = RecordJoiner::new(&settings);

        let signals = Table::new(
            signal_columns(),
            vec![create_test_signal(2, Some("D1"), "t1"), create_test_signal(3, Some("D2"), "t2")],
        );
        let devices = Table::new(device_columns(), vec![]);

        let merged = joiner.merge(&signals, &devices);
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().all(|r| !r.has_device()));
    }
}
