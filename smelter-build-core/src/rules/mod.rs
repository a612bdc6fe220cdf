//! Rule catalog transformation
//!
//! Reads the analyzer rule definition files ("rul files"), resolves
//! per-language configuration overrides, filters and sorts the rules, and
//! emits the two platform catalogs: the full rule catalog (`rules.xml`) and
//! the default quality profile.

pub mod catalog;
pub mod csv;
pub mod rul;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use catalog::{CatalogGenerator, LanguageCatalog};
pub use rul::{ParsedRule, RulFile};

/// Rule priority (severity) in the platform's taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    /// Informational
    Info,
    /// Minor issue
    Minor,
    /// Major issue
    Major,
    /// Critical issue
    Critical,
    /// Blocker issue
    Blocker,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Info
    }
}

impl FromStr for Priority {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INFO" => Ok(Priority::Info),
            "MINOR" => Ok(Priority::Minor),
            "MAJOR" => Ok(Priority::Major),
            "CRITICAL" => Ok(Priority::Critical),
            "BLOCKER" => Ok(Priority::Blocker),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Info => write!(f, "INFO"),
            Priority::Minor => write!(f, "MINOR"),
            Priority::Major => write!(f, "MAJOR"),
            Priority::Critical => write!(f, "CRITICAL"),
            Priority::Blocker => write!(f, "BLOCKER"),
        }
    }
}

/// Platform rule type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleType {
    /// Maintainability issue
    CodeSmell,
    /// Security issue
    Vulnerability,
    /// Reliability issue
    Bug,
}

impl FromStr for RuleType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CODE_SMELL" => Ok(RuleType::CodeSmell),
            "VULNERABILITY" => Ok(RuleType::Vulnerability),
            "BUG" => Ok(RuleType::Bug),
            _ => Err(()),
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleType::CodeSmell => write!(f, "CODE_SMELL"),
            RuleType::Vulnerability => write!(f, "VULNERABILITY"),
            RuleType::Bug => write!(f, "BUG"),
        }
    }
}

/// A fully resolved rule ready for catalog emission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDef {
    /// Bare rule id as it appears in the rul file (prefix stripped)
    pub id: String,
    /// Catalog key (`MET_<id>` for metric-tool rules)
    pub key: String,
    /// Display name
    pub name: String,
    /// HTML description
    pub description: String,
    /// Severity
    pub priority: Priority,
    /// Platform rule type, when the type CSV provides one
    pub rule_type: Option<RuleType>,
    /// Whether the rule comes from a metric tool (threshold violation)
    pub metric: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_parsing() {
        assert_eq!("critical".parse::<Priority>().unwrap(), Priority::Critical);
        assert_eq!("INFO".parse::<Priority>().unwrap(), Priority::Info);
        assert!("urgent".parse::<Priority>().is_err());
        assert_eq!(Priority::default(), Priority::Info);
    }

    #[test]
    fn test_priority_display_is_uppercase() {
        assert_eq!(Priority::Blocker.to_string(), "BLOCKER");
        assert_eq!(Priority::Minor.to_string(), "MINOR");
    }

    #[test]
    fn test_rule_type_round_trip() {
        for s in ["CODE_SMELL", "VULNERABILITY", "BUG"] {
            assert_eq!(s.parse::<RuleType>().unwrap().to_string(), s);
        }
        assert!("SMELL".parse::<RuleType>().is_err());
    }
}
