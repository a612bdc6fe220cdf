//! Catalog assembly and XML emission
//!
//! Combines parsed rul files with the CSV side tables into per-language rule
//! lists, and emits the two platform documents: the full rule catalog and the
//! default quality profile.

use std::path::Path;

use colored::Colorize;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::csv::{MembershipTable, TypeMap};
use super::rul::{parse_rul, RulFile};
use super::RuleDef;
use crate::config::{RuleLanguageConfig, RulesConfig};
use crate::error::{BuildError, BuildResult};

/// Name suffix for metric threshold rules
const METRIC_NAME_SUFFIX: &str = "Metric Threshold Violation";
/// Key prefix for metric threshold rules
const METRIC_KEY_PREFIX: &str = "MET_";

/// All emitted rules for one language
#[derive(Debug, Clone)]
pub struct LanguageCatalog {
    /// Platform language key (profile `language` element)
    pub language_key: String,
    /// Rules in emission order: grouped per rul file, sorted by id within
    pub rules: Vec<RuleDef>,
}

/// Builds language catalogs according to the project rule settings
#[derive(Debug)]
pub struct CatalogGenerator<'a> {
    cfg: &'a RulesConfig,
}

impl<'a> CatalogGenerator<'a> {
    /// Create a generator over the project rule settings
    pub fn new(cfg: &'a RulesConfig) -> Self {
        Self { cfg }
    }

    /// Whether the tool produces metric threshold rules
    pub fn is_metric_tool(&self, tool: &str) -> bool {
        self.cfg.metric_tools.iter().any(|t| t == tool)
    }

    /// Build the catalog for one language
    ///
    /// `tools_dir` holds the rul files and the membership CSV; the type CSV
    /// is resolved against `project_root`. A missing type CSV degrades to
    /// untyped rules with a warning.
    pub fn build_language(
        &self,
        lang: &RuleLanguageConfig,
        tools_dir: &Path,
        project_root: &Path,
    ) -> BuildResult<LanguageCatalog> {
        let config_name = lang
            .config_name
            .clone()
            .unwrap_or_else(|| lang.dir.to_lowercase());

        let type_map = match &lang.type_csv {
            Some(rel) => {
                let path = project_root.join(rel);
                if path.is_file() {
                    Some(TypeMap::load(&path)?)
                } else {
                    println!(
                        "  {} no type CSV for {} ({})",
                        "⚠".bright_yellow(),
                        lang.key,
                        path.display()
                    );
                    None
                }
            },
            None => None,
        };

        let membership = match &lang.membership_csv {
            Some(name) => Some(MembershipTable::load(&tools_dir.join(name))?),
            None => None,
        };

        let mut rules = Vec::new();
        for rul_name in &lang.rul_files {
            let path = tools_dir.join(rul_name);
            let xml = std::fs::read_to_string(&path).map_err(|e| {
                BuildError::Catalog(format!("cannot read {}: {}", path.display(), e))
            })?;
            let file = parse_rul(&xml, &config_name)?;
            rules.extend(self.resolve_file(&file, membership.as_ref(), type_map.as_ref()));
        }

        Ok(LanguageCatalog {
            language_key: lang.key.clone(),
            rules,
        })
    }

    /// Apply catalog-level filtering and key/name transforms to one rul file
    fn resolve_file(
        &self,
        file: &RulFile,
        membership: Option<&MembershipTable>,
        type_map: Option<&TypeMap>,
    ) -> Vec<RuleDef> {
        let metric = self.is_metric_tool(&file.tool);
        let alias = self.cfg.tool_aliases.get(&file.tool);
        let heading = format!("<h3>{}</h3>", file.tool);

        let mut defs = Vec::new();
        for rule in &file.rules {
            if self.cfg.ignored.iter().any(|i| i == &rule.id) {
                continue;
            }

            // Checker rules must be listed in the shipped ruleset table.
            if !metric {
                if let Some(table) = membership {
                    match alias {
                        Some(alias) if table.included(alias, &rule.id) => {},
                        _ => continue,
                    }
                }
            }

            let description = match &rule.description {
                None => heading.clone(),
                Some(d) if alias.is_some() => format!("{}{}", heading, d),
                Some(d) => d.clone(),
            };

            let (key, name) = if metric {
                (
                    format!("{}{}", METRIC_KEY_PREFIX, rule.id),
                    format!("{} ({}) {}", rule.name, rule.id, METRIC_NAME_SUFFIX),
                )
            } else {
                (rule.id.clone(), rule.name.clone())
            };

            let rule_type = if metric {
                None
            } else {
                type_map.and_then(|m| m.lookup(&rule.id))
            };

            defs.push(RuleDef {
                id: rule.id.clone(),
                key,
                name,
                description,
                priority: rule.priority,
                rule_type,
                metric,
            });
        }

        defs.sort_by(|a, b| a.id.cmp(&b.id));
        defs
    }

    /// Emit the full rule catalog document
    pub fn rules_xml(&self, catalog: &LanguageCatalog) -> BuildResult<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        write_decl(&mut writer)?;
        write_start(&mut writer, "rules")?;
        for rule in &catalog.rules {
            write_start(&mut writer, "rule")?;
            write_text_element(&mut writer, "key", &rule.key)?;
            write_text_element(&mut writer, "name", &rule.name)?;
            write_text_element(&mut writer, "description", &rule.description)?;
            if let Some(rule_type) = rule.rule_type {
                write_text_element(&mut writer, "type", &rule_type.to_string())?;
            }
            write_text_element(&mut writer, "severity", &rule.priority.to_string())?;
            write_text_element(&mut writer, "tag", &self.cfg.tag)?;
            write_end(&mut writer, "rule")?;
        }
        write_end(&mut writer, "rules")?;
        into_string(writer)
    }

    /// Emit the default quality profile document
    ///
    /// Metric rules appear only when their id is in the default-active set.
    pub fn profile_xml(&self, catalog: &LanguageCatalog) -> BuildResult<String> {
        let repository_key = format!("{}_{}", self.cfg.repository_prefix, catalog.language_key);

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        write_decl(&mut writer)?;
        write_start(&mut writer, "profile")?;
        write_text_element(&mut writer, "name", &self.cfg.profile_name)?;
        write_text_element(&mut writer, "language", &catalog.language_key)?;
        write_start(&mut writer, "rules")?;
        for rule in &catalog.rules {
            if rule.metric && !self.cfg.default_active.iter().any(|a| a == &rule.id) {
                continue;
            }
            write_start(&mut writer, "rule")?;
            write_text_element(&mut writer, "repositoryKey", &repository_key)?;
            write_text_element(&mut writer, "key", &rule.key)?;
            write_text_element(&mut writer, "priority", &rule.priority.to_string())?;
            write_end(&mut writer, "rule")?;
        }
        write_end(&mut writer, "rules")?;
        write_end(&mut writer, "profile")?;
        into_string(writer)
    }

    /// Filename of the generated profile document
    pub fn profile_filename(&self) -> String {
        format!("{}_default_profile.xml", self.cfg.profile_name.replace(' ', "_"))
    }

    /// Write both catalog documents into an analyzer resource directory
    pub fn write_outputs(&self, catalog: &LanguageCatalog, resource_dir: &Path) -> BuildResult<()> {
        std::fs::create_dir_all(resource_dir)?;
        std::fs::write(resource_dir.join("rules.xml"), self.rules_xml(catalog)?)?;
        std::fs::write(
            resource_dir.join(self.profile_filename()),
            self.profile_xml(catalog)?,
        )?;
        Ok(())
    }
}

fn xml_err<E: std::fmt::Display>(e: E) -> BuildError {
    BuildError::Catalog(format!("xml write failed: {}", e))
}

fn write_decl(writer: &mut Writer<Vec<u8>>) -> BuildResult<()> {
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(xml_err)
}

fn write_start(writer: &mut Writer<Vec<u8>>, name: &str) -> BuildResult<()> {
    writer.write_event(Event::Start(BytesStart::new(name))).map_err(xml_err)
}

fn write_end(writer: &mut Writer<Vec<u8>>, name: &str) -> BuildResult<()> {
    writer.write_event(Event::End(BytesEnd::new(name))).map_err(xml_err)
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> BuildResult<()> {
    write_start(writer, name)?;
    writer.write_event(Event::Text(BytesText::new(text))).map_err(xml_err)?;
    write_end(writer, name)
}

fn into_string(writer: Writer<Vec<u8>>) -> BuildResult<String> {
    String::from_utf8(writer.into_inner())
        .map_err(|e| BuildError::Catalog(format!("generated XML is not UTF-8: {}", e)))
}
