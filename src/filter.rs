// 🧹 Signal Filter - Keep only emulated signals that have a register

use crate::records::{MergedRow, Table};
use crate::settings::Settings;
use tracing::debug;

pub struct SignalFilter<'a> {
    settings: &'a Settings,
}

impl<'a> SignalFilter<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        SignalFilter { settings }
    }

    /// Does this row describe an emulated signal?
    pub fn matches(&self, row: &MergedRow) -> bool {
        row.signal_type.as_deref() == Some(self.settings.target_signal_type.as_str())
            && row.address.is_some()
    }

    /// Rows of the target type with an address, in their original order
    pub fn apply(&self, merged: &Table<MergedRow>) -> Table<MergedRow> {
        let rows: Vec<MergedRow> = merged
            .iter()
            .filter(|row| self.matches(row))
            .cloned()
            .collect();

        debug!(
            "Kept {} of {} rows of type '{}' with an address",
            rows.len(),
            merged.len(),
            self.settings.target_signal_type
        );
        merged.with_rows(rows)
    }
}
