// 🩹 Type Normalizer - Backfill missing value types

use crate::records::{ResolvedSignal, Table};
use crate::settings::Settings;
use tracing::{info, warn};

/// Normalized table plus how many rows were repaired
#[derive(Debug, Clone)]
pub struct Normalized {
    pub table: Table<ResolvedSignal>,
    pub filled: usize,
}

pub struct TypeNormalizer<'a> {
    settings: &'a Settings,
}

impl<'a> TypeNormalizer<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        TypeNormalizer { settings }
    }

    /// Set the default value type wherever it is missing
    pub fn fill_missing(&self, signals: &Table<ResolvedSignal>) -> Normalized {
        let column = &self.settings.columns.value_type;
        let default_type = &self.settings.default_value_type;

        let filled = signals.iter().filter(|r| r.value_type.is_none()).count();
        if filled == 0 {
            info!("No missing values in column '{}'", column);
            return Normalized {
                table: signals.clone(),
                filled,
            };
        }

        warn!("Column '{}' is missing values in {} rows", column, filled);
        let rows = signals
            .iter()
            .map(|row| {
                let mut row = row.clone();
                row.value_type.get_or_insert_with(|| default_type.clone());
                row
            })
            .collect();
        info!("{} signals set to type {}", filled, default_type);

        Normalized {
            table: signals.with_rows(rows),
            filled,
        }
    }
}
