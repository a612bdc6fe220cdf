//! Configuration management for the Smelter build system
//!
//! A project that is built and packaged by Smelter carries a `smelter.toml`
//! at its root describing the buildable modules, the rule catalog sources and
//! the integration harness settings. Build-invocation options that change per
//! run (module selection, clean, dist, dry-run) live in [`BuildConfig`] and
//! are filled in from the CLI.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BuildError, BuildResult};

/// Metric ids that are active in the generated default quality profile when
/// the project does not configure its own set.
pub const DEFAULT_ACTIVE_METRICS: &[&str] = &[
    "LOC", "LLOC", "NUMPAR", "NOS", "CLOC", "DLOC", "McCC", "NLE", "CCO", "CI", "CLLC", "NII",
    "NOI", "NLA", "NLM", "NLPM", "TLOC", "TLLOC", "TNOS", "AD", "WMC", "CBO", "RFC", "DIR", "NOC",
    "LCOM5", "CE", "CLLOC",
];

/// Build configuration settings for a single pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Whether to enable verbose output
    pub verbose: bool,
    /// Show commands without executing them
    pub dry_run: bool,
    /// Trace all external commands being executed
    pub trace_commands: bool,
    /// Build directory override (relative paths resolve against the root)
    pub build_dir: Option<PathBuf>,
    /// Remove module targets and the build directory before building
    pub clean: bool,
    /// Assemble the package tree and produce a tar.gz distribution
    pub dist: bool,
    /// Which modules to build
    pub selection: ModuleSelection,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            dry_run: false,
            trace_commands: false,
            build_dir: None,
            clean: false,
            dist: false,
            selection: ModuleSelection::default(),
        }
    }
}

/// Selection of optional modules for a build run
///
/// Core and analyzer-base modules are always built; analyzers and the GUI
/// module are opt-in. `all` (implied by `dist`) selects everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleSelection {
    /// Build every configured module
    pub all: bool,
    /// Build the GUI module (dashboard, users guide, help)
    pub gui: bool,
    /// Analyzer languages to build (e.g. "cpp", "java")
    pub analyzers: BTreeSet<String>,
}

impl ModuleSelection {
    /// Selection that builds everything
    pub fn everything() -> Self {
        Self {
            all: true,
            ..Self::default()
        }
    }

    /// Add an analyzer language to the selection
    pub fn with_analyzer(mut self, language: &str) -> Self {
        self.analyzers.insert(language.to_string());
        self
    }

    /// Whether the GUI module is selected
    pub fn wants_gui(&self) -> bool {
        self.all || self.gui
    }

    /// Whether the analyzer for `language` is selected
    pub fn wants_analyzer(&self, language: &str) -> bool {
        self.all || self.analyzers.contains(language)
    }
}

/// Kind of a buildable module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// Platform core plugin, always built first
    Core,
    /// Shared analyzer base, always built second
    Base,
    /// GUI plugin (dashboard, clone view, users guide)
    Gui,
    /// Per-language analyzer plugin
    Analyzer,
}

/// A buildable module of the plugin project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Module name, used in log output and as the build selector
    pub name: String,
    /// Path to the module directory, relative to the project root
    pub path: PathBuf,
    /// Module kind, controls build ordering and selection
    pub kind: ModuleKind,
    /// Analyzer language (analyzer modules only)
    #[serde(default)]
    pub language: Option<String>,
}

/// A helper artifact installed into the build tool's local repository before
/// any module build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrereqArtifact {
    /// Group identifier
    pub group: String,
    /// Artifact identifier
    pub artifact: String,
    /// Artifact version
    pub version: String,
    /// Jar file path, relative to the project root
    pub file: PathBuf,
}

/// Users-guide generation settings for the GUI module
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersGuideConfig {
    /// Directory the generator command runs in, relative to the project root
    pub dir: PathBuf,
    /// Generator command and arguments
    pub command: Vec<String>,
    /// Generated HTML file, relative to the project root
    pub output: PathBuf,
    /// Destination the generated file is copied to, relative to the root
    pub dest: PathBuf,
}

/// Settings for rule catalog generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Tag attached to every emitted rule
    #[serde(default = "default_rule_tag")]
    pub tag: String,
    /// Repository key prefix; the per-language repository is
    /// `<prefix>_<language_key>`
    #[serde(default = "default_repository_prefix")]
    pub repository_prefix: String,
    /// Display name of the generated default quality profile
    #[serde(default = "default_profile_name")]
    pub profile_name: String,
    /// Tool ids whose rules are metric thresholds rather than checker rules
    #[serde(default = "default_metric_tools")]
    pub metric_tools: Vec<String>,
    /// Rule ids excluded from both outputs
    #[serde(default)]
    pub ignored: Vec<String>,
    /// Metric ids active in the default profile
    #[serde(default = "default_active_metrics")]
    pub default_active: Vec<String>,
    /// Analyzer distribution directory holding the per-language tool trees,
    /// relative to the project root
    #[serde(default)]
    pub analyzer_dir: Option<PathBuf>,
    /// Checker tool name to membership-CSV column alias
    #[serde(default)]
    pub tool_aliases: BTreeMap<String, String>,
    /// Per-language catalog sources
    #[serde(default)]
    pub languages: Vec<RuleLanguageConfig>,
}

fn default_rule_tag() -> String {
    "smelter".to_string()
}

fn default_repository_prefix() -> String {
    "Smelter".to_string()
}

fn default_profile_name() -> String {
    "Smelter way".to_string()
}

fn default_metric_tools() -> Vec<String> {
    vec!["MET".to_string(), "DCF".to_string()]
}

fn default_active_metrics() -> Vec<String> {
    DEFAULT_ACTIVE_METRICS.iter().map(|s| s.to_string()).collect()
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            tag: default_rule_tag(),
            repository_prefix: default_repository_prefix(),
            profile_name: default_profile_name(),
            metric_tools: default_metric_tools(),
            analyzer_dir: None,
            ignored: Vec::new(),
            default_active: default_active_metrics(),
            tool_aliases: BTreeMap::new(),
            languages: Vec::new(),
        }
    }
}

/// Rule catalog sources for one language
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleLanguageConfig {
    /// Language directory name in the analyzer distribution (e.g. "CPP")
    pub dir: String,
    /// Platform language key used in the profile (e.g. "cpp", "cs", "py")
    pub key: String,
    /// Name of the analyzer module receiving the generated catalogs
    pub module: String,
    /// Tools directory under the language dir; `{platform}` expands to the
    /// host platform name
    #[serde(default = "default_tools_dir")]
    pub tools_dir: String,
    /// Configuration name matched inside rul files; defaults to the
    /// lowercased language dir
    #[serde(default)]
    pub config_name: Option<String>,
    /// Rule definition files to read, in order
    pub rul_files: Vec<String>,
    /// Membership CSV filename (empty disables the membership filter)
    #[serde(default)]
    pub membership_csv: Option<String>,
    /// Rule type CSV, relative to the project root
    #[serde(default)]
    pub type_csv: Option<PathBuf>,
}

fn default_tools_dir() -> String {
    "Tools".to_string()
}

/// Integration harness settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Server version downloaded by default
    pub server_version: String,
    /// Scanner version downloaded by default
    pub scanner_version: String,
    /// Server distribution URL; `{version}` expands to the version string
    pub server_url: String,
    /// Scanner distribution URL; `{version}` expands to the version string
    pub scanner_url: String,
    /// Readiness endpoint path on the server
    #[serde(default = "default_status_path")]
    pub status_path: String,
    /// Server HTTP port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum readiness poll attempts
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// Seconds to wait between poll attempts
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,
    /// Sample project scanned during the harness run
    pub project_dir: PathBuf,
    /// Working directory for downloads and extraction, relative to the root
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    /// Server start command, relative to the extracted server directory
    #[serde(default = "default_server_start")]
    pub server_start: Vec<String>,
    /// Scanner executable, relative to the extracted scanner directory
    #[serde(default = "default_scanner_bin")]
    pub scanner_bin: String,
    /// Expected golden measures file, relative to the project root
    #[serde(default)]
    pub expected_measures: Option<PathBuf>,
    /// Component key the sample project is scanned as, used to fetch its
    /// measures back from the server
    #[serde(default)]
    pub component: Option<String>,
}

fn default_status_path() -> String {
    "/api/system/status".to_string()
}

fn default_port() -> u16 {
    9000
}

fn default_attempts() -> u32 {
    30
}

fn default_wait_secs() -> u64 {
    10
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("itest")
}

fn default_server_start() -> Vec<String> {
    vec!["bin/linux-x86-64/server.sh".to_string(), "console".to_string()]
}

fn default_scanner_bin() -> String {
    "bin/scanner".to_string()
}

/// Project configuration loaded from `smelter.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Name of the assembled package directory and archive
    pub package_name: String,
    /// External build tool command
    #[serde(default = "default_build_tool")]
    pub build_tool: String,
    /// Default build directory, relative to the project root
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,
    /// Files copied into the package `doc/` directory, relative to the root
    #[serde(default)]
    pub doc_files: Vec<PathBuf>,
    /// Pre-installed helper artifacts
    #[serde(default)]
    pub prereqs: Vec<PrereqArtifact>,
    /// Buildable modules
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,
    /// Users-guide generation (GUI builds only)
    #[serde(default)]
    pub usersguide: Option<UsersGuideConfig>,
    /// Rule catalog generation settings
    #[serde(default)]
    pub rules: RulesConfig,
    /// Integration harness settings
    #[serde(default)]
    pub harness: Option<HarnessConfig>,
}

fn default_build_tool() -> String {
    "mvn".to_string()
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("build")
}

impl ProjectConfig {
    /// Load the project configuration from `<root>/smelter.toml`
    pub fn load(root: &Path) -> BuildResult<Self> {
        let path = root.join("smelter.toml");
        if !path.exists() {
            return Err(BuildError::Workspace(format!(
                "smelter.toml not found in {}",
                root.display()
            )));
        }
        let content = std::fs::read_to_string(&path)?;
        Self::parse(&content)
    }

    /// Parse a configuration document
    pub fn parse(content: &str) -> BuildResult<Self> {
        toml::from_str(content)
            .map_err(|e| BuildError::Workspace(format!("invalid smelter.toml: {}", e)))
    }

    /// Modules of the given kind, in configuration order
    pub fn modules_of_kind(&self, kind: ModuleKind) -> Vec<&ModuleConfig> {
        self.modules.iter().filter(|m| m.kind == kind).collect()
    }

    /// The analyzer module for a language, if configured
    pub fn analyzer_for(&self, language: &str) -> Option<&ModuleConfig> {
        self.modules
            .iter()
            .find(|m| m.kind == ModuleKind::Analyzer && m.language.as_deref() == Some(language))
    }

    /// All configured analyzer languages, in configuration order
    pub fn analyzer_languages(&self) -> Vec<&str> {
        self.modules
            .iter()
            .filter(|m| m.kind == ModuleKind::Analyzer)
            .filter_map(|m| m.language.as_deref())
            .collect()
    }

    /// Find a module by name
    pub fn module(&self, name: &str) -> Option<&ModuleConfig> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Write a commented sample configuration to `path`
    pub fn init_sample(path: &Path) -> BuildResult<()> {
        std::fs::write(path, SAMPLE_CONFIG)?;
        Ok(())
    }
}

const SAMPLE_CONFIG: &str = r#"# Smelter project configuration
package_name = "smelter-plugins-1.0.0"
build_tool = "mvn"
build_dir = "build"
doc_files = ["README.md", "doc/UG.html"]

[[modules]]
name = "core-plugin"
path = "src/core-plugin"
kind = "core"

[[modules]]
name = "analyzer-base"
path = "src/analyzers/analyzer-base"
kind = "base"

[[modules]]
name = "gui-plugin"
path = "src/gui-plugin"
kind = "gui"

[[modules]]
name = "analyzer-java"
path = "src/analyzers/analyzer-java"
kind = "analyzer"
language = "java"

[rules]
tag = "smelter"
repository_prefix = "Smelter"
profile_name = "Smelter way"
metric_tools = ["MET", "DCF"]
analyzer_dir = "analyzer-dist"
ignored = ["NCR"]

[rules.tool_aliases]
Cppcheck = "CPPCHECK"
PMD = "PMD"
Pylint = "PYLINT"

[[rules.languages]]
dir = "Java"
key = "java"
module = "analyzer-java"
tools_dir = "{platform}Tools"
rul_files = ["MET.rul", "DCF.rul", "PMD.rul"]
membership_csv = "rules_java.csv"
type_csv = "rules/java-types.csv"

[harness]
server_version = "7.2.1"
scanner_version = "3.2.0"
server_url = "https://downloads.example.org/server/server-{version}.zip"
scanner_url = "https://downloads.example.org/scanner/scanner-{version}.zip"
project_dir = "test/sample-project"
expected_measures = "test/sample-project/expected-measures.json"
component = "smelter-sample"
"#;
