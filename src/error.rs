// ❗ Errors - Structured failures of the mapping stages
// I/O and orchestration use anyhow; these are the errors callers match on

use thiserror::Error;

/// Input table does not have the shape a stage requires
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("{table} table is missing required column '{column}'")]
    MissingColumn { table: String, column: String },
}

impl SchemaError {
    pub fn missing_column(table: &str, column: &str) -> Self {
        SchemaError::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

/// Failure while building the mappings of one asset subset
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("device '{device}' has no common address (slave id)")]
    MissingSlaveId { device: String },

    #[error("device '{device}' has non-integer slave id '{value}'")]
    InvalidSlaveId { device: String, value: String },

    #[error("asset name '{asset}' is reserved for the combined output")]
    ReservedAssetName { asset: String },
}
