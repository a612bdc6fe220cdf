//! Build pipeline orchestration
//!
//! [`BuildSystem`] drives the whole pipeline: prerequisite installation,
//! per-module builds through the external build tool, rule catalog
//! generation, users-guide generation, package assembly and the tar.gz
//! distribution archive.

use std::path::{Path, PathBuf};
use std::time::Instant;

use colored::Colorize;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::config::{BuildConfig, ModuleConfig, ModuleKind, ProjectConfig};
use crate::error::{BuildError, BuildResult};
use crate::rules::catalog::CatalogGenerator;
use crate::tools::CommandRunner;

/// Results of a pipeline run
#[derive(Debug)]
pub struct BuildResults {
    /// Whether the run completed without errors
    pub success: bool,
    /// Artifacts produced by the run (package tree, archive)
    pub artifacts: Vec<PathBuf>,
    /// Non-fatal problems encountered along the way
    pub warnings: Vec<String>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

/// Main build system for plugin projects
#[derive(Debug)]
pub struct BuildSystem {
    root: PathBuf,
    project: ProjectConfig,
    config: BuildConfig,
    runner: CommandRunner,
}

impl BuildSystem {
    /// Create a build system for the project at `root`
    pub fn new(root: PathBuf) -> BuildResult<Self> {
        let root = root
            .canonicalize()
            .map_err(|e| BuildError::Workspace(format!("invalid project root: {}", e)))?;
        let project = ProjectConfig::load(&root)?;
        Ok(Self {
            root,
            project,
            config: BuildConfig::default(),
            runner: CommandRunner::new(false, false),
        })
    }

    /// Create a build system by walking up from the current directory until a
    /// `smelter.toml` is found
    pub fn for_current_dir() -> BuildResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| BuildError::Workspace(format!("cannot determine current dir: {}", e)))?;
        let root = crate::detect_project_root(&cwd)?;
        Self::new(root)
    }

    /// Replace the run configuration
    pub fn set_config(&mut self, config: BuildConfig) {
        self.runner = CommandRunner::new(config.dry_run, config.trace_commands);
        self.config = config;
    }

    /// Project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loaded project configuration
    pub fn project(&self) -> &ProjectConfig {
        &self.project
    }

    /// Command runner, exposing the planned command history
    pub fn runner(&self) -> &CommandRunner {
        &self.runner
    }

    /// Effective build directory for this run
    pub fn build_dir(&self) -> PathBuf {
        let dir = self.config.build_dir.as_ref().unwrap_or(&self.project.build_dir);
        if dir.is_absolute() {
            dir.clone()
        } else {
            self.root.join(dir)
        }
    }

    /// Remove build outputs: runs the build tool's clean goal per module and
    /// deletes the build directory
    pub fn clean(&mut self) -> BuildResult<()> {
        println!("{} Cleaning build outputs...", "🧹".bright_blue());

        let modules: Vec<ModuleConfig> = self.project.modules.clone();
        for module in &modules {
            let pom = self.root.join(&module.path).join("pom.xml");
            if !pom.exists() && !self.config.dry_run {
                continue;
            }
            let pom_str = pom.display().to_string();
            let tool = self.project.build_tool.clone();
            self.runner.run(&tool, &["-f", &pom_str, "clean"], Some(&self.root))?;
        }

        let build_dir = self.build_dir();
        if build_dir.exists() && !self.config.dry_run {
            std::fs::remove_dir_all(&build_dir)?;
        }

        println!("{} Clean complete", "✅".bright_green());
        Ok(())
    }

    /// Install helper artifacts into the build tool's local repository
    pub fn install_prerequisites(&mut self) -> BuildResult<()> {
        if self.project.prereqs.is_empty() {
            return Ok(());
        }
        println!("{} Installing prerequisite artifacts...", "📦".bright_blue());

        let prereqs = self.project.prereqs.clone();
        let tool = self.project.build_tool.clone();
        for prereq in &prereqs {
            let file = self.root.join(&prereq.file);
            if !file.exists() && !self.config.dry_run {
                return Err(BuildError::Build(format!(
                    "prerequisite artifact not found: {}",
                    file.display()
                )));
            }
            let file_arg = format!("-Dfile={}", file.display());
            let group_arg = format!("-DgroupId={}", prereq.group);
            let artifact_arg = format!("-DartifactId={}", prereq.artifact);
            let version_arg = format!("-Dversion={}", prereq.version);
            self.runner.run(
                &tool,
                &[
                    "install:install-file",
                    &file_arg,
                    &group_arg,
                    &artifact_arg,
                    &version_arg,
                    "-Dpackaging=jar",
                ],
                Some(&self.root),
            )?;
        }
        Ok(())
    }

    /// Run the full pipeline for the configured module selection
    ///
    /// Order is fixed: prerequisites, core, analyzer base, GUI (with the
    /// users guide generated first), then the selected analyzers in
    /// alphabetical language order. With `dist` set the package tree and
    /// archive are assembled afterwards.
    pub fn build_all(&mut self) -> BuildResult<BuildResults> {
        let start = Instant::now();
        let mut warnings = Vec::new();
        let mut artifacts = Vec::new();

        self.check_module_dirs()?;

        if self.config.clean {
            self.clean()?;
        }

        self.install_prerequisites()?;

        for module in self.modules_of_kind_owned(ModuleKind::Core) {
            self.build_module(&module)?;
        }
        for module in self.modules_of_kind_owned(ModuleKind::Base) {
            self.build_module(&module)?;
        }

        if self.config.selection.wants_gui() {
            // Generator failures are fatal; only the copy step is tolerated
            self.generate_usersguide(&mut warnings)?;
            for module in self.modules_of_kind_owned(ModuleKind::Gui) {
                self.build_module(&module)?;
            }
        }

        let mut analyzers = self.modules_of_kind_owned(ModuleKind::Analyzer);
        analyzers.sort_by(|a, b| a.language.cmp(&b.language));
        for module in analyzers {
            let selected = module
                .language
                .as_deref()
                .is_some_and(|lang| self.config.selection.wants_analyzer(lang));
            if !selected {
                continue;
            }
            // The platform key ("cs", "py") need not equal the analyzer
            // language name, so resolve by the owning module.
            let lang_key = self
                .project
                .rules
                .languages
                .iter()
                .find(|l| l.module == module.name)
                .map(|l| l.key.clone());
            if let Some(key) = lang_key {
                self.generate_rule_catalogs_for(&key, None, &mut warnings)?;
            }
            self.build_module(&module)?;
        }

        if self.config.dist {
            let package_dir = self.assemble_package(&mut warnings)?;
            let archive = self.create_dist(&package_dir)?;
            artifacts.push(package_dir);
            artifacts.push(archive);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        println!(
            "{} Build finished in {:.1}s",
            "✅".bright_green(),
            duration_ms as f64 / 1000.0
        );

        Ok(BuildResults {
            success: true,
            artifacts,
            warnings,
            duration_ms,
        })
    }

    fn modules_of_kind_owned(&self, kind: ModuleKind) -> Vec<ModuleConfig> {
        self.project.modules_of_kind(kind).into_iter().cloned().collect()
    }

    /// Verify every configured module directory exists before the first
    /// command runs; dry runs plan against hypothetical trees
    fn check_module_dirs(&self) -> BuildResult<()> {
        if self.config.dry_run {
            return Ok(());
        }
        for module in &self.project.modules {
            let dir = self.root.join(&module.path);
            if !dir.is_dir() {
                return Err(BuildError::Workspace(format!(
                    "module {} directory missing: {}",
                    module.name,
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    /// Build one module through the external build tool
    pub fn build_module(&mut self, module: &ModuleConfig) -> BuildResult<()> {
        println!("{} Building {}...", "🔨".bright_blue(), module.name.bright_cyan());
        let pom = self.root.join(&module.path).join("pom.xml");
        if !pom.exists() && !self.config.dry_run {
            return Err(BuildError::Build(format!(
                "module {} has no pom.xml at {}",
                module.name,
                pom.display()
            )));
        }
        let pom_str = pom.display().to_string();
        let tool = self.project.build_tool.clone();
        self.runner
            .run(&tool, &["-f", &pom_str, "clean", "install"], Some(&self.root))
            .map_err(|e| BuildError::Build(format!("module {}: {}", module.name, e)))
    }

    /// Generate the users guide and copy it to its configured destination
    ///
    /// A failing copy is a warning, not an error: the guide is shipped
    /// documentation, not a build input.
    fn generate_usersguide(&mut self, warnings: &mut Vec<String>) -> BuildResult<()> {
        let Some(ug) = self.project.usersguide.clone() else {
            return Ok(());
        };
        if ug.command.is_empty() {
            return Ok(());
        }
        println!("{} Generating users guide...", "📖".bright_blue());

        let cwd = self.root.join(&ug.dir);
        let args: Vec<&str> = ug.command[1..].iter().map(String::as_str).collect();
        self.runner.run(&ug.command[0], &args, Some(&cwd))?;

        if self.config.dry_run {
            return Ok(());
        }

        let output = self.root.join(&ug.output);
        let dest = self.root.join(&ug.dest);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if let Err(e) = std::fs::copy(&output, &dest) {
            let msg = format!("could not copy users guide to {}: {}", dest.display(), e);
            println!("  {} {}", "⚠".bright_yellow(), msg);
            warnings.push(msg);
        }
        Ok(())
    }

    /// Generate rule catalogs for every configured language
    pub fn generate_rule_catalogs(
        &mut self,
        analyzer_dir: Option<&Path>,
        warnings: &mut Vec<String>,
    ) -> BuildResult<()> {
        let languages: Vec<String> =
            self.project.rules.languages.iter().map(|l| l.key.clone()).collect();
        for key in languages {
            self.generate_rule_catalogs_for(&key, analyzer_dir, warnings)?;
        }
        Ok(())
    }

    /// Generate the rule catalog and default profile for one language and
    /// place them in the receiving module's resource directory
    pub fn generate_rule_catalogs_for(
        &mut self,
        language: &str,
        analyzer_dir: Option<&Path>,
        warnings: &mut Vec<String>,
    ) -> BuildResult<()> {
        let Some(lang) = self.project.rules.languages.iter().find(|l| l.key == language).cloned()
        else {
            // Analyzers without catalog sources build without generation
            return Ok(());
        };

        let base = match analyzer_dir {
            Some(dir) => dir.to_path_buf(),
            None => match &self.project.rules.analyzer_dir {
                Some(dir) => self.root.join(dir),
                None => {
                    let msg = format!(
                        "no analyzer directory configured, skipping {} rule catalogs",
                        language
                    );
                    println!("  {} {}", "⚠".bright_yellow(), msg);
                    warnings.push(msg);
                    return Ok(());
                },
            },
        };

        println!(
            "{} Generating rule catalogs for {}...",
            "📋".bright_blue(),
            language.bright_cyan()
        );

        let tools_dir = base
            .join(&lang.dir)
            .join(lang.tools_dir.replace("{platform}", host_platform()));

        if self.config.dry_run {
            println!("  would read rul files from {}", tools_dir.display());
            return Ok(());
        }

        let generator = CatalogGenerator::new(&self.project.rules);
        let catalog = generator.build_language(&lang, &tools_dir, &self.root)?;

        let module = self.project.module(&lang.module).ok_or_else(|| {
            BuildError::Catalog(format!(
                "rule language {} names unknown module {}",
                language, lang.module
            ))
        })?;
        let resource_dir = self.root.join(&module.path).join("src/main/resources");
        generator.write_outputs(&catalog, &resource_dir)?;

        println!(
            "  {} {} rules written to {}",
            "✓".bright_green(),
            catalog.rules.len(),
            resource_dir.display()
        );
        Ok(())
    }

    /// Assemble the package tree under the build directory
    ///
    /// The tree is `<build_dir>/<package_name>/` with `doc/` holding the
    /// configured documentation files and `plugins/` holding every module
    /// jar. Missing doc files and jar-less modules are warnings.
    pub fn assemble_package(&mut self, warnings: &mut Vec<String>) -> BuildResult<PathBuf> {
        let package_dir = self.build_dir().join(&self.project.package_name);
        println!(
            "{} Assembling package at {}...",
            "📦".bright_blue(),
            package_dir.display()
        );

        if self.config.dry_run {
            println!("  would assemble doc/ and plugins/ under the package tree");
            return Ok(package_dir);
        }

        if package_dir.exists() {
            std::fs::remove_dir_all(&package_dir)?;
        }
        let doc_dir = package_dir.join("doc");
        let plugins_dir = package_dir.join("plugins");
        std::fs::create_dir_all(&doc_dir)?;
        std::fs::create_dir_all(&plugins_dir)?;

        for doc in &self.project.doc_files {
            let src = self.root.join(doc);
            let name = src.file_name().ok_or_else(|| {
                BuildError::Build(format!("doc file has no filename: {}", src.display()))
            })?;
            if let Err(e) = std::fs::copy(&src, doc_dir.join(name)) {
                let msg = format!("could not copy doc file {}: {}", src.display(), e);
                println!("  {} {}", "⚠".bright_yellow(), msg);
                warnings.push(msg);
            }
        }

        for module in &self.project.modules {
            let pattern = self.root.join(&module.path).join("target").join("*.jar");
            let pattern_str = pattern.display().to_string();
            let mut copied = 0usize;
            for entry in glob::glob(&pattern_str)
                .map_err(|e| BuildError::Build(format!("bad glob pattern {}: {}", pattern_str, e)))?
            {
                let jar = entry.map_err(|e| BuildError::Build(e.to_string()))?;
                // Helper archives (sources, javadoc) stay out of the package
                let stem = jar.file_name().and_then(|n| n.to_str()).unwrap_or("");
                if stem.ends_with("-sources.jar") || stem.ends_with("-javadoc.jar") {
                    continue;
                }
                std::fs::copy(&jar, plugins_dir.join(jar.file_name().unwrap_or_default()))?;
                copied += 1;
            }
            if copied == 0 {
                let msg = format!("no jar found for module {}", module.name);
                println!("  {} {}", "⚠".bright_yellow(), msg);
                warnings.push(msg);
            }
        }

        Ok(package_dir)
    }

    /// Create the tar.gz distribution archive next to the package tree
    ///
    /// Archive entries are prefixed with the package name so extraction
    /// recreates the packaged directory.
    pub fn create_dist(&mut self, package_dir: &Path) -> BuildResult<PathBuf> {
        let archive_path = self.build_dir().join(format!("{}.tar.gz", self.project.package_name));
        println!(
            "{} Creating distribution {}...",
            "🗜".bright_blue(),
            archive_path.display()
        );

        if self.config.dry_run {
            return Ok(archive_path);
        }

        let file = std::fs::File::create(&archive_path)?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder.append_dir_all(&self.project.package_name, package_dir)?;
        let encoder = builder
            .into_inner()
            .map_err(|e| BuildError::Build(format!("archive write failed: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| BuildError::Build(format!("archive write failed: {}", e)))?;

        println!("{} Distribution ready: {}", "✅".bright_green(), archive_path.display());
        Ok(archive_path)
    }
}

/// Host platform directory name used in analyzer tool trees
pub fn host_platform() -> &'static str {
    if cfg!(target_os = "windows") {
        "Windows"
    } else if cfg!(target_os = "macos") {
        "OSX"
    } else {
        "Linux"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModuleSelection;

    fn project_with_modules(dir: &Path) -> PathBuf {
        let root = dir.join("proj");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(
            root.join("smelter.toml"),
            r#"
package_name = "pkg-1.0"
build_tool = "mvn"

[[modules]]
name = "core"
path = "src/core"
kind = "core"

[[modules]]
name = "base"
path = "src/base"
kind = "base"

[[modules]]
name = "gui"
path = "src/gui"
kind = "gui"

[[modules]]
name = "analyzer-java"
path = "src/java"
kind = "analyzer"
language = "java"

[[modules]]
name = "analyzer-cpp"
path = "src/cpp"
kind = "analyzer"
language = "cpp"
"#,
        )
        .unwrap();
        root
    }

    fn dry_run_system(root: PathBuf, selection: ModuleSelection) -> BuildSystem {
        let mut system = BuildSystem::new(root).unwrap();
        system.set_config(BuildConfig {
            dry_run: true,
            selection,
            ..BuildConfig::default()
        });
        system
    }

    #[test]
    fn test_default_build_order_skips_optional_modules() {
        let dir = tempfile::tempdir().unwrap();
        let root = project_with_modules(dir.path());
        let mut system = dry_run_system(root, ModuleSelection::default());

        let results = system.build_all().unwrap();
        assert!(results.success);

        let built: Vec<String> = system
            .runner()
            .history()
            .iter()
            .map(|c| c.args[1].clone())
            .collect();
        assert_eq!(built.len(), 2);
        assert!(built[0].ends_with("src/core/pom.xml"));
        assert!(built[1].ends_with("src/base/pom.xml"));
    }

    #[test]
    fn test_full_build_order_core_base_gui_analyzers() {
        let dir = tempfile::tempdir().unwrap();
        let root = project_with_modules(dir.path());
        let mut system = dry_run_system(root, ModuleSelection::everything());

        system.build_all().unwrap();

        let poms: Vec<String> = system
            .runner()
            .history()
            .iter()
            .map(|c| c.args[1].clone())
            .collect();
        assert_eq!(poms.len(), 5);
        assert!(poms[0].ends_with("src/core/pom.xml"));
        assert!(poms[1].ends_with("src/base/pom.xml"));
        assert!(poms[2].ends_with("src/gui/pom.xml"));
        // Analyzers follow in alphabetical language order
        assert!(poms[3].ends_with("src/cpp/pom.xml"));
        assert!(poms[4].ends_with("src/java/pom.xml"));
    }

    #[test]
    fn test_analyzer_selection_builds_only_selected() {
        let dir = tempfile::tempdir().unwrap();
        let root = project_with_modules(dir.path());
        let selection = ModuleSelection::default().with_analyzer("cpp");
        let mut system = dry_run_system(root, selection);

        system.build_all().unwrap();

        let poms: Vec<String> = system
            .runner()
            .history()
            .iter()
            .map(|c| c.args[1].clone())
            .collect();
        assert_eq!(poms.len(), 3);
        assert!(poms[2].ends_with("src/cpp/pom.xml"));
    }

    #[test]
    fn test_clean_runs_clean_goal_per_module() {
        let dir = tempfile::tempdir().unwrap();
        let root = project_with_modules(dir.path());
        let mut system = dry_run_system(root, ModuleSelection::default());

        system.clean().unwrap();
        let history = system.runner().history();
        assert_eq!(history.len(), 5);
        assert!(history.iter().all(|c| c.program == "mvn" && c.args.last().unwrap() == "clean"));
    }

    #[test]
    fn test_build_dir_override() {
        let dir = tempfile::tempdir().unwrap();
        let root = project_with_modules(dir.path());
        let mut system = BuildSystem::new(root.clone()).unwrap();
        assert!(system.build_dir().ends_with("build"));

        system.set_config(BuildConfig {
            build_dir: Some(PathBuf::from("out")),
            ..BuildConfig::default()
        });
        assert!(system.build_dir().ends_with("out"));
    }

    #[test]
    fn test_missing_module_dir_fails_before_any_command() {
        let dir = tempfile::tempdir().unwrap();
        let root = project_with_modules(dir.path());
        let mut system = BuildSystem::new(root).unwrap();

        let err = system.build_all().unwrap_err();
        assert!(matches!(err, BuildError::Workspace(_)));
        assert!(system.runner().history().is_empty());
    }

    #[test]
    fn test_missing_root_is_workspace_error() {
        let err = BuildSystem::new(PathBuf::from("/definitely/not/a/dir")).unwrap_err();
        assert!(matches!(err, BuildError::Workspace(_)));
    }

    // Project whose builds actually run, using `true` as the build tool
    fn runnable_project(dir: &Path, extra: &str) -> PathBuf {
        let root = dir.join("proj");
        for module in ["src/core", "src/base", "src/gui", "src/csharp"] {
            std::fs::create_dir_all(root.join(module)).unwrap();
            std::fs::write(root.join(module).join("pom.xml"), "<project/>").unwrap();
        }
        std::fs::write(
            root.join("smelter.toml"),
            format!(
                r#"
package_name = "pkg-1.0"
build_tool = "true"

[[modules]]
name = "core"
path = "src/core"
kind = "core"

[[modules]]
name = "base"
path = "src/base"
kind = "base"

[[modules]]
name = "gui"
path = "src/gui"
kind = "gui"

[[modules]]
name = "analyzer-csharp"
path = "src/csharp"
kind = "analyzer"
language = "csharp"

{extra}
"#
            ),
        )
        .unwrap();
        root
    }

    const MET_RUL: &str = r#"<Rul>
  <ToolDescription>
    <Configuration name="Default">
      <ToolDescriptionItem name="Description">MET</ToolDescriptionItem>
    </Configuration>
  </ToolDescription>
  <Metric id="LOC">
    <Configuration name="Default">
      <Enabled>true</Enabled>
      <Language lang="eng">
        <DisplayName>Lines of code</DisplayName>
        <HelpText>Total lines.</HelpText>
      </Language>
    </Configuration>
  </Metric>
</Rul>"#;

    #[test]
    fn test_build_generates_catalogs_when_key_differs_from_language() {
        let dir = tempfile::tempdir().unwrap();
        let root = runnable_project(
            dir.path(),
            r#"
[rules]
analyzer_dir = "dist"

[[rules.languages]]
dir = "CSharp"
key = "cs"
module = "analyzer-csharp"
rul_files = ["MET.rul"]
"#,
        );
        let tools = root.join("dist/CSharp/Tools");
        std::fs::create_dir_all(&tools).unwrap();
        std::fs::write(tools.join("MET.rul"), MET_RUL).unwrap();

        let mut system = BuildSystem::new(root.clone()).unwrap();
        system.set_config(BuildConfig {
            selection: ModuleSelection::default().with_analyzer("csharp"),
            ..BuildConfig::default()
        });
        system.build_all().unwrap();

        // The "cs" platform key still maps to the csharp analyzer module
        let resources = root.join("src/csharp/src/main/resources");
        let rules = std::fs::read_to_string(resources.join("rules.xml")).unwrap();
        assert!(rules.contains("<key>MET_LOC</key>"));
        let profile =
            std::fs::read_to_string(resources.join("Smelter_way_default_profile.xml")).unwrap();
        assert!(profile.contains("<repositoryKey>Smelter_cs</repositoryKey>"));
    }

    #[test]
    fn test_failed_usersguide_generation_aborts_build() {
        let dir = tempfile::tempdir().unwrap();
        let root = runnable_project(
            dir.path(),
            r#"
[usersguide]
dir = "."
command = ["false"]
output = "guide/UG.html"
dest = "doc/UG.html"
"#,
        );
        let mut system = BuildSystem::new(root).unwrap();
        system.set_config(BuildConfig {
            selection: ModuleSelection {
                gui: true,
                ..ModuleSelection::default()
            },
            ..BuildConfig::default()
        });

        let err = system.build_all().unwrap_err();
        assert!(matches!(err, BuildError::Build(_)));
        // The GUI module build never starts
        assert!(!system
            .runner()
            .history()
            .iter()
            .any(|c| c.render().contains("src/gui/pom.xml")));
    }

    #[test]
    fn test_usersguide_copy_failure_is_only_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let root = runnable_project(
            dir.path(),
            r#"
[usersguide]
dir = "."
command = ["true"]
output = "guide/UG.html"
dest = "doc/UG.html"
"#,
        );
        let mut system = BuildSystem::new(root).unwrap();
        system.set_config(BuildConfig {
            selection: ModuleSelection {
                gui: true,
                ..ModuleSelection::default()
            },
            ..BuildConfig::default()
        });

        let results = system.build_all().unwrap();
        assert!(results.warnings.iter().any(|w| w.contains("users guide")));
        assert!(system
            .runner()
            .history()
            .iter()
            .any(|c| c.render().contains("src/gui/pom.xml")));
    }

    #[test]
    fn test_assemble_package_collects_jars_and_docs() {
        let dir = tempfile::tempdir().unwrap();
        let root = project_with_modules(dir.path());
        std::fs::write(root.join("README.md"), "docs").unwrap();
        for module in ["src/core", "src/base"] {
            let target = root.join(module).join("target");
            std::fs::create_dir_all(&target).unwrap();
            std::fs::write(target.join("plugin.jar"), "jar").unwrap();
            std::fs::write(target.join("plugin-sources.jar"), "src jar").unwrap();
        }

        let mut system = BuildSystem::new(root).unwrap();
        let mut project = system.project().clone();
        project.doc_files = vec![PathBuf::from("README.md"), PathBuf::from("missing.txt")];
        system.project = project;

        let mut warnings = Vec::new();
        let package_dir = system.assemble_package(&mut warnings).unwrap();

        assert!(package_dir.join("doc/README.md").is_file());
        assert!(package_dir.join("plugins/plugin.jar").is_file());
        assert!(!package_dir.join("plugins/plugin-sources.jar").exists());
        // missing doc file + three jar-less modules
        assert_eq!(warnings.len(), 4);
    }

    #[test]
    fn test_create_dist_writes_archive() {
        let dir = tempfile::tempdir().unwrap();
        let root = project_with_modules(dir.path());
        let mut system = BuildSystem::new(root).unwrap();

        let package_dir = system.build_dir().join("pkg-1.0");
        std::fs::create_dir_all(package_dir.join("plugins")).unwrap();
        std::fs::write(package_dir.join("plugins/a.jar"), "jar").unwrap();

        let archive = system.create_dist(&package_dir).unwrap();
        assert!(archive.is_file());
        assert!(archive.ends_with("pkg-1.0.tar.gz"));
    }
}
