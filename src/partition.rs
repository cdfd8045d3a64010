// 🗂️ Asset Partitioner - One subset per asset, plus the combined table

use crate::records::{ResolvedSignal, Table};
use crate::settings::{Settings, ALL_ASSETS};
use indexmap::IndexMap;
use tracing::{debug, warn};

/// Rows of one output subset
#[derive(Debug, Clone)]
pub struct AssetSubset {
    /// Asset value, or `all_assets` for the combined table
    pub asset: String,
    pub signals: Table<ResolvedSignal>,
    combined: bool,
}

impl AssetSubset {
    /// The full table, as opposed to one asset's rows
    pub fn is_combined(&self) -> bool {
        self.combined
    }

    /// A per-asset subset whose name would overwrite the combined files
    pub fn shadows_combined(&self) -> bool {
        !self.combined && self.asset == ALL_ASSETS
    }
}

pub struct AssetPartitioner<'a> {
    settings: &'a Settings,
}

impl<'a> AssetPartitioner<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        AssetPartitioner { settings }
    }

    /// Asset a row belongs to; rows without one share the unassigned subset
    pub fn asset_of<'r>(&'r self, row: &'r ResolvedSignal) -> &'r str {
        row.asset.as_deref().unwrap_or(&self.settings.unassigned_asset)
    }

    /// `all_assets` first, then (when either output is split) each asset in first-seen order
    pub fn divide(&self, signals: &Table<ResolvedSignal>) -> Vec<AssetSubset> {
        let mut subsets = vec![AssetSubset {
            asset: ALL_ASSETS.to_string(),
            signals: signals.clone(),
            combined: true,
        }];

        if !self.settings.split.any() {
            debug!("Asset splitting disabled; single '{}' subset", ALL_ASSETS);
            return subsets;
        }

        let mut by_asset: IndexMap<&str, Vec<ResolvedSignal>> = IndexMap::new();
        for row in signals {
            by_asset.entry(self.asset_of(row)).or_default().push(row.clone());
        }

        if by_asset.contains_key(ALL_ASSETS) {
            warn!(
                "An asset is literally named '{}'; its subset cannot be written per asset",
                ALL_ASSETS
            );
        }

        debug!("Signals divided into {} assets", by_asset.len());
        subsets.extend(by_asset.into_iter().map(|(asset, rows)| AssetSubset {
            asset: asset.to_string(),
            signals: signals.with_rows(rows),
            combined: false,
        }));
        subsets
    }
}
