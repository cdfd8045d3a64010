// 🏷️ Device Name Aggregator - One name per slave
// Devices wired to the same slave id are listed together: "Sensor A, Sensor B"

use crate::records::{ResolvedSignal, Table};
use indexmap::IndexMap;
use tracing::debug;

/// Separator between device names of one slave
pub const NAME_SEPARATOR: &str = ", ";

pub struct DeviceNameAggregator;

impl DeviceNameAggregator {
    pub fn new() -> Self {
        DeviceNameAggregator
    }

    /// Replace each row's device with the distinct device names of its slave
    ///
    /// Names keep first-seen order. Rows without a slave id keep their own name.
    pub fn concatenate(&self, signals: &Table<ResolvedSignal>) -> Table<ResolvedSignal> {
        let mut names: IndexMap<&str, Vec<&str>> = IndexMap::new();
        for row in signals {
            if let Some(slave) = row.common_address.as_deref() {
                let slave_names = names.entry(slave).or_default();
                if !slave_names.contains(&row.device.as_str()) {
                    slave_names.push(row.device.as_str());
                }
            }
        }

        let joined: IndexMap<&str, String> = names
            .iter()
            .map(|(slave, devices)| (*slave, devices.join(NAME_SEPARATOR)))
            .collect();

        let rows: Vec<ResolvedSignal> = signals
            .iter()
            .map(|row| {
                let mut row = row.clone();
                if let Some(name) = row.common_address.as_deref().and_then(|s| joined.get(s)) {
                    row.device = name.clone();
                }
                row
            })
            .collect();

        let shared = names.values().filter(|d| d.len() > 1).count();
        debug!(
            "Device names aggregated ({} slaves, {} shared by several devices)",
            names.len(),
            shared
        );

        signals.with_rows(rows)
    }
}

impl Default for DeviceNameAggregator {
    fn default() -> Self {
        Self::new()
    }
}
