// 💾 Output Writer - Config JSON and data templates on disk
//
// Split flag off → only the all_assets file is written
// Split flag on  → only the per-asset files are written

use crate::config::Config;
use crate::mapping::SignalTemplate;
use crate::pipeline::{AssetArtifacts, AssetOutcome};
use crate::settings::{Settings, ALL_ASSETS};
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, error, info};

pub struct OutputWriter<'a> {
    settings: &'a Settings,
}

impl<'a> OutputWriter<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        OutputWriter { settings }
    }

    /// Whether a subset gets its own file under the given split flag
    fn should_write(split: bool, asset: &str) -> bool {
        if split {
            asset != ALL_ASSETS
        } else {
            asset == ALL_ASSETS
        }
    }

    fn ensure_output_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.settings.output_dir).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                self.settings.output_dir.display()
            )
        })
    }

    /// Write `{config}_{asset}.json`; `None` when this subset is not written
    pub fn write_config(&self, asset: &str, config: &Config) -> Result<Option<PathBuf>> {
        if !Self::should_write(self.settings.split.config_by_asset, asset) {
            debug!("Config for '{}' not written (split setting)", asset);
            return Ok(None);
        }
        self.ensure_output_dir()?;

        let path = self.settings.output_dir.join(self.settings.config_file_for(asset));
        let json = config.to_json_pretty()?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;

        info!(
            "Config saved: {} ({} signals, sha256 {})",
            path.display(),
            config.signal_count(),
            config.fingerprint()?
        );
        Ok(Some(path))
    }

    /// Write the data template: a header row of codes, or an empty file
    pub fn write_template(
        &self,
        asset: &str,
        template: &SignalTemplate,
    ) -> Result<Option<PathBuf>> {
        if !Self::should_write(self.settings.split.data_by_asset, asset) {
            debug!("Data template for '{}' not written (split setting)", asset);
            return Ok(None);
        }
        self.ensure_output_dir()?;

        let path = self.settings.output_dir.join(self.settings.data_file_for(asset));
        if template.is_empty() {
            fs::write(&path, "")
                .with_context(|| format!("Failed to write data template: {}", path.display()))?;
        } else {
            let mut writer = csv::Writer::from_path(&path)
                .with_context(|| format!("Failed to create data template: {}", path.display()))?;
            writer.write_record(&template.columns)?;
            writer.flush()?;
        }

        info!("Data template saved: {} ({} columns)", path.display(), template.columns.len());
        Ok(Some(path))
    }

    /// Write both files of a subset; returns the paths actually written
    pub fn write_artifacts(
        &self,
        asset: &str,
        artifacts: &AssetArtifacts,
    ) -> Result<Vec<PathBuf>> {
        let written = [
            self.write_config(asset, &artifacts.config)?,
            self.write_template(asset, &artifacts.template)?,
        ];
        Ok(written.into_iter().flatten().collect())
    }

    /// Write every successful subset; returns how many subsets failed
    ///
    /// A subset fails when its mappings could not be built or its files could not be
    /// written. Either way the remaining subsets are still written.
    pub fn write_outcomes(&self, outcomes: &[AssetOutcome]) -> usize {
        let mut failed = 0;
        for outcome in outcomes {
            let artifacts = match &outcome.result {
                Ok(artifacts) => artifacts,
                Err(e) => {
                    error!("Asset '{}' ({} signals): {}", outcome.asset, outcome.rows, e);
                    failed += 1;
                    continue;
                }
            };

            if let Err(e) = self.write_artifacts(&outcome.asset, artifacts) {
                error!("Asset '{}': {:#}", outcome.asset, e);
                failed += 1;
            }
        }
        failed
    }
}
