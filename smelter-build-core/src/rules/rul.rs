//! Rule definition ("rul") file parsing
//!
//! A rul file describes the rules of one analyzer tool. Each `Metric`
//! element carries one or more named `Configuration` children; the
//! configuration named after the requested language overrides the one named
//! `Default`. Documents may or may not carry an XML namespace; matching is
//! done on local names only.

use roxmltree::{Document, Node};

use super::Priority;
use crate::error::{BuildError, BuildResult};

/// A rule parsed from a rul file, before catalog-level filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRule {
    /// Bare rule id (the part after `TOOL_` when the id is qualified)
    pub id: String,
    /// English display name
    pub name: String,
    /// English HTML description, when the file provides one
    pub description: Option<String>,
    /// Severity resolved from the `Priority` setting
    pub priority: Priority,
}

/// A parsed rul file: the tool it describes and its visible, enabled rules
#[derive(Debug, Clone)]
pub struct RulFile {
    /// Tool id from the `ToolDescription` section
    pub tool: String,
    /// Rules that passed the enabled/visible/group filters
    pub rules: Vec<ParsedRule>,
}

/// Parse a rul document for the given language
///
/// Returns only rules that are enabled and visible in the resolved
/// configuration and are not group entries. Rules without a resolvable
/// configuration are skipped.
pub fn parse_rul(xml: &str, language: &str) -> BuildResult<RulFile> {
    let doc = Document::parse(xml)
        .map_err(|e| BuildError::Catalog(format!("invalid rul document: {}", e)))?;
    let root = doc.root_element();

    let tool = tool_description(root).unwrap_or_default();
    let mut rules = Vec::new();

    for metric in children(root, "Metric") {
        let Some(raw_id) = metric.attribute("id") else {
            continue;
        };
        // Qualified ids look like "TOOL_RuleName"; the catalog uses the bare part.
        let id = match raw_id.split_once('_') {
            Some((_, rest)) => rest,
            None => raw_id,
        };

        let lang_conf = children(metric, "Configuration")
            .find(|c| c.attribute("name") == Some(language));
        let default_conf = children(metric, "Configuration")
            .find(|c| c.attribute("name") == Some("Default"));
        let Some(resolved) = lang_conf.or(default_conf) else {
            continue;
        };

        let enabled = child_text(resolved, "Enabled") == Some("true");
        let visible = child_text(resolved, "Visible").map_or(true, |v| v == "true");
        let group = default_conf
            .and_then(|c| child_text(c, "Group"))
            .map_or(false, |g| g == "true");
        if !enabled || !visible || group {
            continue;
        }

        let (name, description) = name_and_description(resolved, default_conf);
        let Some(name) = name else {
            continue;
        };
        let priority = priority(resolved, default_conf);

        rules.push(ParsedRule {
            id: id.to_string(),
            name,
            description,
            priority,
        });
    }

    Ok(RulFile { tool, rules })
}

fn tool_description(root: Node) -> Option<String> {
    let tool_desc = children(root, "ToolDescription").next()?;
    let conf = children(tool_desc, "Configuration").next()?;
    child_text(conf, "ToolDescriptionItem").map(str::to_string)
}

/// English display name and description, with fallback to the `Default`
/// configuration when the resolved one omits them
fn name_and_description(
    resolved: Node,
    default_conf: Option<Node>,
) -> (Option<String>, Option<String>) {
    let resolved_eng = english(resolved);
    let default_eng = default_conf.and_then(english);

    let name = resolved_eng
        .and_then(|l| child_text(l, "DisplayName"))
        .or_else(|| default_eng.and_then(|l| child_text(l, "DisplayName")))
        .map(str::to_string);

    let description = resolved_eng
        .and_then(|l| child_text(l, "HelpText").or_else(|| child_text(l, "Description")))
        .or_else(|| default_eng.and_then(|l| child_text(l, "HelpText")))
        .map(str::to_string);

    (name, description)
}

/// Severity from the `Priority` setting of the resolved configuration; the
/// `Default` configuration is consulted only when the resolved one carries no
/// settings at all
fn priority(resolved: Node, default_conf: Option<Node>) -> Priority {
    match priority_setting(resolved) {
        PrioritySetting::Found(p) => p,
        PrioritySetting::OtherSettings => Priority::Info,
        PrioritySetting::NoSettings => match default_conf.map(priority_setting) {
            Some(PrioritySetting::Found(p)) => p,
            _ => Priority::Info,
        },
    }
}

enum PrioritySetting {
    Found(Priority),
    OtherSettings,
    NoSettings,
}

fn priority_setting(conf: Node) -> PrioritySetting {
    let mut saw_setting = false;
    for settings in children(conf, "Settings") {
        for setting in children(settings, "Setting") {
            saw_setting = true;
            if setting.attribute("name") == Some("Priority") {
                if let Some(text) = setting.text() {
                    return PrioritySetting::Found(text.parse().unwrap_or_default());
                }
            }
        }
    }
    if saw_setting {
        PrioritySetting::OtherSettings
    } else {
        PrioritySetting::NoSettings
    }
}

fn english<'a>(conf: Node<'a, 'a>) -> Option<Node<'a, 'a>> {
    children(conf, "Language").find(|l| l.attribute("lang") == Some("eng"))
}

fn children<'a>(
    node: Node<'a, 'a>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'a>> + 'a {
    node.children().filter(move |c| c.is_element() && c.tag_name().name() == name)
}

fn child_text<'a>(node: Node<'a, 'a>, name: &str) -> Option<&'a str> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
        .and_then(|c| c.text())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rul(metrics: &str) -> String {
        format!(
            r#"<Rul>
  <ToolDescription>
    <Configuration name="Default">
      <ToolDescriptionItem name="Description">FaultFinder</ToolDescriptionItem>
    </Configuration>
  </ToolDescription>
  {}
</Rul>"#,
            metrics
        )
    }

    fn metric(id: &str, body: &str) -> String {
        format!(r#"<Metric id="{}">{}</Metric>"#, id, body)
    }

    const ENABLED_DEFAULT: &str = r#"
      <Configuration name="Default">
        <Enabled>true</Enabled>
        <Language lang="eng">
          <DisplayName>Unused local variable</DisplayName>
          <HelpText>Remove the unused variable.</HelpText>
        </Language>
        <Settings>
          <Setting name="Priority">Minor</Setting>
        </Settings>
      </Configuration>"#;

    #[test]
    fn test_parses_tool_and_enabled_rule() {
        let xml = rul(&metric("FF_ULV", ENABLED_DEFAULT));
        let file = parse_rul(&xml, "java").unwrap();

        assert_eq!(file.tool, "FaultFinder");
        assert_eq!(file.rules.len(), 1);
        let rule = &file.rules[0];
        assert_eq!(rule.id, "ULV");
        assert_eq!(rule.name, "Unused local variable");
        assert_eq!(rule.description.as_deref(), Some("Remove the unused variable."));
        assert_eq!(rule.priority, Priority::Minor);
    }

    #[test]
    fn test_namespaced_document_parses() {
        let xml = rul(&metric("FF_ULV", ENABLED_DEFAULT))
            .replace("<Rul>", r#"<Rul xmlns="http://example.org/rul">"#);
        let file = parse_rul(&xml, "java").unwrap();
        assert_eq!(file.tool, "FaultFinder");
        assert_eq!(file.rules.len(), 1);
    }

    #[test]
    fn test_disabled_rule_excluded() {
        let body = ENABLED_DEFAULT.replace("<Enabled>true</Enabled>", "<Enabled>false</Enabled>");
        let xml = rul(&metric("FF_ULV", &body));
        assert!(parse_rul(&xml, "java").unwrap().rules.is_empty());
    }

    #[test]
    fn test_language_override_wins_over_default() {
        let body = format!(
            r#"{}
      <Configuration name="java">
        <Enabled>false</Enabled>
      </Configuration>"#,
            ENABLED_DEFAULT
        );
        let xml = rul(&metric("FF_ULV", &body));
        // Disabled for java, still enabled for every other language
        assert!(parse_rul(&xml, "java").unwrap().rules.is_empty());
        assert_eq!(parse_rul(&xml, "cpp").unwrap().rules.len(), 1);
    }

    #[test]
    fn test_language_override_reenables_rule() {
        let body = r#"
      <Configuration name="Default">
        <Enabled>false</Enabled>
        <Language lang="eng">
          <DisplayName>Long function</DisplayName>
          <HelpText>Split it up.</HelpText>
        </Language>
      </Configuration>
      <Configuration name="python">
        <Enabled>true</Enabled>
        <Language lang="eng">
          <DisplayName>Long function</DisplayName>
        </Language>
      </Configuration>"#;
        let xml = rul(&metric("FF_LF", body));
        let file = parse_rul(&xml, "python").unwrap();
        assert_eq!(file.rules.len(), 1);
        assert_eq!(file.rules[0].name, "Long function");
    }

    #[test]
    fn test_invisible_rule_excluded_and_visibility_defaults_to_true() {
        let hidden = ENABLED_DEFAULT
            .replace("<Enabled>true</Enabled>", "<Enabled>true</Enabled><Visible>false</Visible>");
        let xml = rul(&format!(
            "{}{}",
            metric("FF_HIDDEN", &hidden),
            metric("FF_SHOWN", ENABLED_DEFAULT)
        ));
        let file = parse_rul(&xml, "java").unwrap();
        assert_eq!(file.rules.len(), 1);
        assert_eq!(file.rules[0].id, "SHOWN");
    }

    #[test]
    fn test_group_rules_excluded() {
        let grouped = ENABLED_DEFAULT
            .replace("<Enabled>true</Enabled>", "<Enabled>true</Enabled><Group>true</Group>");
        let xml = rul(&metric("FF_GRP", &grouped));
        assert!(parse_rul(&xml, "java").unwrap().rules.is_empty());
    }

    #[test]
    fn test_name_falls_back_to_default_configuration() {
        let body = format!(
            r#"{}
      <Configuration name="java">
        <Enabled>true</Enabled>
        <Language lang="eng">
          <HelpText>Java-specific help.</HelpText>
        </Language>
      </Configuration>"#,
            ENABLED_DEFAULT
        );
        let xml = rul(&metric("FF_ULV", &body));
        let file = parse_rul(&xml, "java").unwrap();
        assert_eq!(file.rules[0].name, "Unused local variable");
        assert_eq!(file.rules[0].description.as_deref(), Some("Java-specific help."));
    }

    #[test]
    fn test_description_falls_back_through_description_element() {
        let body = r#"
      <Configuration name="Default">
        <Enabled>true</Enabled>
        <Language lang="eng">
          <DisplayName>Magic number</DisplayName>
          <Description>Inline constant.</Description>
        </Language>
      </Configuration>"#;
        let xml = rul(&metric("FF_MN", body));
        let file = parse_rul(&xml, "java").unwrap();
        assert_eq!(file.rules[0].description.as_deref(), Some("Inline constant."));
    }

    #[test]
    fn test_priority_defaults_to_info_and_falls_back_to_default() {
        let no_settings = r#"
      <Configuration name="Default">
        <Enabled>true</Enabled>
        <Language lang="eng">
          <DisplayName>A</DisplayName>
        </Language>
        <Settings>
          <Setting name="Priority">Blocker</Setting>
        </Settings>
      </Configuration>
      <Configuration name="java">
        <Enabled>true</Enabled>
        <Language lang="eng">
          <DisplayName>A</DisplayName>
        </Language>
      </Configuration>"#;
        let xml = rul(&metric("FF_A", no_settings));
        // java config has no settings, so Default's Blocker applies
        assert_eq!(parse_rul(&xml, "java").unwrap().rules[0].priority, Priority::Blocker);

        let bare = r#"
      <Configuration name="Default">
        <Enabled>true</Enabled>
        <Language lang="eng">
          <DisplayName>B</DisplayName>
        </Language>
      </Configuration>"#;
        let xml = rul(&metric("FF_B", bare));
        assert_eq!(parse_rul(&xml, "java").unwrap().rules[0].priority, Priority::Info);
    }

    #[test]
    fn test_unqualified_id_kept_as_is() {
        let xml = rul(&metric("LOC", ENABLED_DEFAULT));
        assert_eq!(parse_rul(&xml, "java").unwrap().rules[0].id, "LOC");
    }

    #[test]
    fn test_invalid_document_is_catalog_error() {
        let err = parse_rul("<unclosed", "java").unwrap_err();
        assert!(matches!(err, BuildError::Catalog(_)));
    }
}
