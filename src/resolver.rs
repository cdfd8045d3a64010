// 🔍 Code Resolver - Collision-safe signal codes
// Signals packed into one register share one composite code; lone signals get a gateway suffix
//
// Rules:
//   N >= 2 rows with the same (address, common_address) → "{N}_signals_{gateway}_{address}"
//   a lone row with code C                              → "{C}_{gateway}"
// followed by de-duplication on the rewritten code.

use crate::records::{MergedRow, ResolvedSignal, Table};
use crate::settings::{RetentionPolicy, Settings};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

// ============================================================================
// COLLISION REPORT
// ============================================================================

/// Several sheet rows that point at the same physical register
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterCollision {
    pub address: String,
    pub common_address: String,

    /// Number of rows sharing the register
    pub size: usize,

    /// Codes as written in the sheet
    pub original_codes: Vec<String>,

    /// Composite code(s) the group resolved to (one per gateway)
    pub codes: Vec<String>,
}

impl RegisterCollision {
    pub fn reason(&self) -> String {
        format!(
            "Register {} on slave {}: {} signals [{}] → {}",
            self.address,
            self.common_address,
            self.size,
            self.original_codes.join(", "),
            self.codes.join(", ")
        )
    }
}

// ============================================================================
// RESOLUTION RESULT
// ============================================================================

#[derive(Debug, Clone)]
pub struct Resolution {
    /// One row per unique code
    pub table: Table<ResolvedSignal>,

    pub collisions: Vec<RegisterCollision>,

    /// Rows dropped because another row kept their code
    pub duplicates_removed: usize,

    /// Rows without a gateway, or lone rows without a code
    pub unresolved: usize,
}

// ============================================================================
// CODE RESOLVER
// ============================================================================

pub struct CodeResolver {
    /// Which row survives for a repeated code
    pub retention: RetentionPolicy,
}

impl CodeResolver {
    pub fn new(retention: RetentionPolicy) -> Self {
        CodeResolver { retention }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.retention)
    }

    /// Register key of a row; rows without a slave id never collide
    fn register_key(row: &MergedRow) -> Option<(&str, &str)> {
        Some((row.address.as_deref()?, row.common_address.as_deref()?))
    }

    /// Rewrite codes and drop duplicates
    pub fn resolve(&self, signals: &Table<MergedRow>) -> Resolution {
        // Row indices by (address, common_address), in first-seen order
        let mut groups: IndexMap<(&str, &str), Vec<usize>> = IndexMap::new();
        for (i, row) in signals.iter().enumerate() {
            if let Some(key) = Self::register_key(row) {
                groups.entry(key).or_default().push(i);
            }
        }

        let mut unresolved = 0;
        let mut codes: Vec<Option<String>> = Vec::with_capacity(signals.len());
        let mut rewritten: Vec<ResolvedSignal> = Vec::with_capacity(signals.len());
        for row in signals {
            let size = Self::register_key(row)
                .and_then(|key| groups.get(&key))
                .map_or(1, |group| group.len());

            match self.rewrite(row, size) {
                Some(resolved) => {
                    codes.push(Some(resolved.code.clone()));
                    rewritten.push(resolved);
                }
                None => {
                    codes.push(None);
                    unresolved += 1;
                }
            }
        }
        if unresolved > 0 {
            warn!(
                "{} signal row(s) could not be resolved (no gateway, or no code); skipped",
                unresolved
            );
        }

        let collisions = Self::collisions(signals.rows(), &groups, &codes);
        for collision in &collisions {
            debug!("{}", collision.reason());
        }

        let before = rewritten.len();
        let unique = self.deduplicate(rewritten);
        let duplicates_removed = before - unique.len();

        debug!(
            "Resolved {} unique codes ({} collision groups, {} duplicates removed, keep {})",
            unique.len(),
            collisions.len(),
            duplicates_removed,
            self.retention
        );

        Resolution {
            table: signals.with_rows(unique),
            collisions,
            duplicates_removed,
            unresolved,
        }
    }

    /// New code for one row, given the size of its register group
    fn rewrite(&self, row: &MergedRow, group_size: usize) -> Option<ResolvedSignal> {
        let gateway = row.gateway.as_deref()?;
        let address = row.address.as_deref()?;
        let device = row.device.as_deref()?;

        let code = if group_size > 1 {
            format!("{}_signals_{}_{}", group_size, gateway, address)
        } else {
            format!("{}_{}", row.code.as_deref()?, gateway)
        };

        Some(ResolvedSignal {
            line: row.line,
            code,
            source_code: row.code.clone(),
            device: device.to_string(),
            gateway: gateway.to_string(),
            signal_type: row.signal_type.clone(),
            address: address.to_string(),
            common_address: row.common_address.clone(),
            value_type: row.value_type.clone(),
            asset: row.asset.clone(),
        })
    }

    /// Keep one row per code, chosen by the retention policy
    ///
    /// Survivors stay at their own position in the input order.
    fn deduplicate(&self, rows: Vec<ResolvedSignal>) -> Vec<ResolvedSignal> {
        let mut keep: HashMap<&str, usize> = HashMap::new();
        for (i, row) in rows.iter().enumerate() {
            match self.retention {
                RetentionPolicy::First => {
                    keep.entry(row.code.as_str()).or_insert(i);
                }
                RetentionPolicy::Last => {
                    keep.insert(row.code.as_str(), i);
                }
            }
        }
        let kept: HashSet<usize> = keep.into_values().collect();

        rows.into_iter()
            .enumerate()
            .filter(|(i, _)| kept.contains(i))
            .map(|(_, row)| row)
            .collect()
    }

    fn collisions(
        rows: &[MergedRow],
        groups: &IndexMap<(&str, &str), Vec<usize>>,
        codes: &[Option<String>],
    ) -> Vec<RegisterCollision> {
        groups
            .iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(&(address, common_address), members)| {
                let mut resolved: Vec<String> = Vec::new();
                for code in members.iter().filter_map(|&i| codes[i].as_ref()) {
                    if !resolved.contains(code) {
                        resolved.push(code.clone());
                    }
                }

                RegisterCollision {
                    address: address.to_string(),
                    common_address: common_address.to_string(),
                    size: members.len(),
                    original_codes: members.iter().filter_map(|&i| rows[i].code.clone()).collect(),
                    codes: resolved,
                }
            })
            .collect()
    }
}

impl Default for CodeResolver {
    fn default() -> Self {
        Self::new(RetentionPolicy::default())
    }
}

// ============================================================================
// TESTS
// ============================================================================
