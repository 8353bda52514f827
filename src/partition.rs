//! Partition tables: contiguous key ranges mapped to targets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::BackendError;
use crate::key::label_hash;

/// A contiguous, inclusive range of partition keys mapped to one or more targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionRule {
    /// First key of the range.
    pub start: char,
    /// Last key of the range (inclusive).
    pub end: char,
    /// Targets (IPv4 addresses or hostnames) served for every key in the range.
    #[serde(alias = "ips")]
    pub targets: Vec<String>,
}

impl PartitionRule {
    /// Create a rule for `start..=end`.
    pub fn new(start: char, end: char, targets: &[&str]) -> Self {
        Self {
            start,
            end,
            targets: targets.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn validate(&self) -> Result<(), BackendError> {
        if self.start > self.end {
            return Err(BackendError::Config(format!(
                "partition range '{}'..'{}' is empty (start > end)",
                self.start, self.end
            )));
        }
        if self.targets.is_empty() {
            return Err(BackendError::Config(format!(
                "partition range '{}'..'{}' has no targets",
                self.start, self.end
            )));
        }
        if self.targets.iter().any(|t| t.trim().is_empty()) {
            return Err(BackendError::Config(format!(
                "partition range '{}'..'{}' has a blank target",
                self.start, self.end
            )));
        }
        Ok(())
    }
}

/// How one target is picked when a key maps to several.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSelection {
    /// Always the first target.
    #[default]
    First,
    /// Target indexed by a stable hash of the query label.
    LabelHash,
}

impl TargetSelection {
    /// Pick a target for `label` from a non-empty target list.
    pub fn select<'a>(&self, targets: &'a [String], label: &str) -> Option<&'a str> {
        let index = match self {
            TargetSelection::First => 0,
            TargetSelection::LabelHash if targets.is_empty() => return None,
            TargetSelection::LabelHash => (label_hash(label) % targets.len() as u64) as usize,
        };
        targets.get(index).map(String::as_str)
    }
}

/// Mapping from partition key to targets, expanded from [`PartitionRule`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionTable {
    entries: BTreeMap<char, Vec<String>>,
}

impl PartitionTable {
    /// Expand `rules` into a table.
    ///
    /// Every rule must have `start <= end` and at least one target. Two rules
    /// claiming the same key are rejected.
    pub fn build(rules: &[PartitionRule]) -> Result<Self, BackendError> {
        let mut entries: BTreeMap<char, Vec<String>> = BTreeMap::new();
        let mut owner: BTreeMap<char, usize> = BTreeMap::new();

        for (index, rule) in rules.iter().enumerate() {
            rule.validate()?;

            for key in rule.start..=rule.end {
                if let Some(previous) = owner.insert(key, index) {
                    return Err(BackendError::Config(format!(
                        "partition key '{}' is claimed by rule {} ('{}'..'{}') and rule {} ('{}'..'{}')",
                        key,
                        previous,
                        rules[previous].start,
                        rules[previous].end,
                        index,
                        rule.start,
                        rule.end
                    )));
                }
                entries.insert(key, rule.targets.clone());
            }

            debug!(
                start = %rule.start,
                end = %rule.end,
                targets = rule.targets.len(),
                "expanded partition rule"
            );
        }

        Ok(Self { entries })
    }

    /// Targets for `key`, if the key is partitioned.
    pub fn get(&self, key: char) -> Option<&[String]> {
        self.entries.get(&key).map(Vec::as_slice)
    }

    /// Number of keys in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no key is partitioned.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All keys in code-point order.
    pub fn keys(&self) -> impl Iterator<Item = char> + '_ {
        self.entries.keys().copied()
    }

    /// All `(key, targets)` pairs in code-point order.
    pub fn iter(&self) -> impl Iterator<Item = (char, &[String])> + '_ {
        self.entries.iter().map(|(k, v)| (*k, v.as_slice()))
    }
}
