// Signal Mapper - Core Library
// Turns a signal inventory into collision-free codes and Modbus emulator configs

pub mod settings;
pub mod error;
pub mod records;
pub mod loader;
pub mod join;        // Signals ⋈ devices
pub mod filter;      // Emulated signal type only
pub mod resolver;    // Register collisions + de-duplication
pub mod aggregation; // Device names per slave
pub mod normalize;   // Value type backfill
pub mod partition;   // Per-asset subsets
pub mod mapping;
pub mod config;
pub mod output;
pub mod pipeline;

// Re-export commonly used types
pub use settings::{
    file_name_part, ColumnNames, Period, RetentionPolicy, ServerSettings, Settings,
    SplitSettings, ALL_ASSETS,
};
pub use error::{MappingError, SchemaError};
pub use records::{DeviceRow, MergedRow, ResolvedSignal, SignalRow, Table};
pub use loader::DataLoader;
pub use join::RecordJoiner;
pub use filter::SignalFilter;
pub use resolver::{CodeResolver, RegisterCollision, Resolution};
pub use aggregation::{DeviceNameAggregator, NAME_SEPARATOR};
pub use normalize::{Normalized, TypeNormalizer};
pub use partition::{AssetPartitioner, AssetSubset};
pub use mapping::{
    AssetMappings, DataSource, Holdings, MappingBuilder, SignalEntry, SignalMapping,
    SignalTemplate, SlaveEntry, SlaveMapping,
};
pub use config::{Config, ConfigAssembler, ServerEntry};
pub use output::OutputWriter;
pub use pipeline::{AssetArtifacts, AssetOutcome, PipelineOutput, PipelineReport, SignalPipeline};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
