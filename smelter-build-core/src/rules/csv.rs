//! CSV side tables for rule catalog generation
//!
//! Two CSVs accompany the rul files: a comma-delimited type table mapping
//! qualified rule ids to platform rule types, and a semicolon-delimited
//! membership table stating, per checker tool, which rules belong to the
//! shipped ruleset.

use std::collections::HashMap;
use std::path::Path;

use super::RuleType;
use crate::error::{BuildError, BuildResult};

/// Rule type lookup loaded from the per-language type CSV
///
/// Rows carry the qualified rule id (e.g. `FF_rule_ULV`) in the third column
/// and the type in the fourth; lookup matches a `_<id>` suffix.
#[derive(Debug, Default)]
pub struct TypeMap {
    entries: Vec<(String, RuleType)>,
}

impl TypeMap {
    /// Load a type CSV; returns an error when the file cannot be read
    pub fn load(path: &Path) -> BuildResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| BuildError::Catalog(format!("cannot read type CSV {}: {}", path.display(), e)))?;

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record
                .map_err(|e| BuildError::Catalog(format!("bad row in {}: {}", path.display(), e)))?;
            let (Some(qualified), Some(type_str)) = (record.get(2), record.get(3)) else {
                continue;
            };
            if let Ok(rule_type) = type_str.parse::<RuleType>() {
                entries.push((qualified.to_string(), rule_type));
            }
        }
        Ok(Self { entries })
    }

    /// Look up the type for a bare rule id
    pub fn lookup(&self, id: &str) -> Option<RuleType> {
        let suffix = format!("_{}", id);
        self.entries
            .iter()
            .rev()
            .find(|(qualified, _)| qualified.ends_with(&suffix))
            .map(|(_, t)| *t)
    }
}

/// Ruleset membership loaded from the semicolon-delimited rules CSV
///
/// The table has a `toolId` row key and one column per tool alias; a value
/// of `1` includes the rule in that tool's shipped ruleset.
#[derive(Debug, Default)]
pub struct MembershipTable {
    by_rule: HashMap<String, HashMap<String, i64>>,
}

impl MembershipTable {
    /// Load a membership CSV
    pub fn load(path: &Path) -> BuildResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| {
                BuildError::Catalog(format!("cannot read rules CSV {}: {}", path.display(), e))
            })?;

        let headers = reader
            .headers()
            .map_err(|e| BuildError::Catalog(format!("bad header in {}: {}", path.display(), e)))?
            .clone();
        let tool_id_col = headers.iter().position(|h| h == "toolId").ok_or_else(|| {
            BuildError::Catalog(format!("no toolId column in {}", path.display()))
        })?;

        let mut by_rule = HashMap::new();
        for record in reader.records() {
            let record = record
                .map_err(|e| BuildError::Catalog(format!("bad row in {}: {}", path.display(), e)))?;
            let Some(rule_id) = record.get(tool_id_col) else {
                continue;
            };
            let mut row = HashMap::new();
            for (header, value) in headers.iter().zip(record.iter()) {
                if let Ok(n) = value.parse::<i64>() {
                    row.insert(header.to_string(), n);
                }
            }
            by_rule.insert(rule_id.to_string(), row);
        }
        Ok(Self { by_rule })
    }

    /// Whether the rule belongs to the given tool's shipped ruleset
    pub fn included(&self, tool_alias: &str, rule_id: &str) -> bool {
        self.by_rule
            .get(rule_id)
            .and_then(|row| row.get(tool_alias))
            .is_some_and(|n| *n == 1)
    }
}
