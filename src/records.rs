// 📋 Records - Typed rows of the signal inventory
// Every stage consumes one Table and returns a new one; nothing is mutated in place

use serde::{Deserialize, Serialize};

// ============================================================================
// TABLE
// ============================================================================

/// Ordered rows plus the column names the source header carried
///
/// Rows are typed, so the column list only records *presence*: it is what lets a
/// stage reject a table that never had, say, a code column.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<R> {
    columns: Vec<String>,
    rows: Vec<R>,
}

impl<R> Table<R> {
    pub fn new(columns: Vec<String>, rows: Vec<R>) -> Self {
        Table { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// New table with the same columns and different rows
    pub fn with_rows<S>(&self, rows: Vec<S>) -> Table<S> {
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }
}

impl<'a, R> IntoIterator for &'a Table<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

// ============================================================================
// INPUT ROWS
// ============================================================================

/// One row of the signals sheet
///
/// All cells are text; an empty cell is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignalRow {
    /// Line in the source file (header = 1)
    pub line: usize,
    pub device: Option<String>,
    pub code: Option<String>,
    pub signal_type: Option<String>,
    pub address: Option<String>,
    pub value_type: Option<String>,
    pub asset: Option<String>,
}

/// One row of the devices sheet
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceRow {
    pub line: usize,
    pub gateway: Option<String>,
    pub device_key: Option<String>,
    /// Protocol slave id, integer-valued but kept as text
    pub common_address: Option<String>,
}

// ============================================================================
// MERGED ROW (after join)
// ============================================================================

/// Signal row with its device's fields attached
///
/// `gateway` and `common_address` stay `None` when no device matched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MergedRow {
    pub line: usize,
    pub device: Option<String>,
    pub code: Option<String>,
    pub signal_type: Option<String>,
    pub address: Option<String>,
    pub value_type: Option<String>,
    pub asset: Option<String>,
    pub gateway: Option<String>,
    pub common_address: Option<String>,
}

impl MergedRow {
    pub fn from_signal(signal: &SignalRow, device: Option<&DeviceRow>) -> Self {
        MergedRow {
            line: signal.line,
            device: signal.device.clone(),
            code: signal.code.clone(),
            signal_type: signal.signal_type.clone(),
            address: signal.address.clone(),
            value_type: signal.value_type.clone(),
            asset: signal.asset.clone(),
            gateway: device.and_then(|d| d.gateway.clone()),
            common_address: device.and_then(|d| d.common_address.clone()),
        }
    }

    pub fn has_device(&self) -> bool {
        self.gateway.is_some() || self.common_address.is_some()
    }
}

// ============================================================================
// RESOLVED SIGNAL
// ============================================================================

/// A signal with its final, table-unique code
///
/// `device` starts as the row's own device name and becomes the comma-joined
/// list of every device sharing the slave once names are aggregated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSignal {
    pub line: usize,
    pub code: String,
    /// Code from the sheet before rewriting
    pub source_code: Option<String>,
    pub device: String,
    pub gateway: String,
    pub signal_type: Option<String>,
    pub address: String,
    pub common_address: Option<String>,
    pub value_type: Option<String>,
    pub asset: Option<String>,
}

// ============================================================================
// TESTS
// ============================================================================
