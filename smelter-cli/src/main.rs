//! smelter: build and verification tool for Smelter analyzer plugins
//!
//! Wraps the external build tool into a single pipeline: module builds in
//! dependency order, rule catalog generation, package assembly, tar.gz
//! distributions and an end-to-end integration run against a real server.

use std::path::PathBuf;
use std::process::exit;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;

use smelter_build_core::config::HarnessConfig;
use smelter_build_core::harness::TestHarness;
use smelter_build_core::{validate, BuildConfig, BuildSystem, ModuleSelection, ProjectConfig};

#[derive(Parser)]
#[command(name = "smelter")]
#[command(about = "Build and verification tool for Smelter analyzer plugins")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Show what would be done without executing commands
    #[arg(long, global = true)]
    dry_run: bool,

    /// Print every external command before running it
    #[arg(long, global = true)]
    trace_commands: bool,

    /// Project root (defaults to walking up from the current directory)
    #[arg(long, global = true, env = "SMELTER_PROJECT_ROOT")]
    project_root: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Colored human-readable output
    Human,
    /// Machine-readable JSON (reports only)
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Build plugin modules
    Build {
        /// Build every module
        #[arg(long)]
        all: bool,
        /// Build the C/C++ analyzer
        #[arg(long)]
        cpp: bool,
        /// Build the C# analyzer
        #[arg(long)]
        csharp: bool,
        /// Build the GUI plugin
        #[arg(long)]
        gui: bool,
        /// Build the Java analyzer
        #[arg(long)]
        java: bool,
        /// Build the Python analyzer
        #[arg(long)]
        python: bool,
        /// Build the RPG analyzer
        #[arg(long)]
        rpg: bool,
        /// Override the build directory
        #[arg(long)]
        builddir: Option<PathBuf>,
        /// Clean before building
        #[arg(long)]
        clean: bool,
        /// Assemble the package tree and tar.gz distribution (implies --all)
        #[arg(long)]
        dist: bool,
    },

    /// Remove build outputs
    Clean,

    /// Generate rule catalogs and default quality profiles
    Rules {
        /// Analyzer distribution directory holding the per-language tools
        #[arg(long)]
        analyzer_dir: Option<PathBuf>,
        /// Generate for a single language key only
        #[arg(long)]
        language: Option<String>,
    },

    /// Run the end-to-end integration test
    Itest {
        /// Server version to download
        #[arg(long)]
        server_version: Option<String>,
        /// Scanner version to download
        #[arg(long)]
        scanner_version: Option<String>,
        /// Sample project to scan (overrides the configured one)
        #[arg(long)]
        project: Option<PathBuf>,
        /// Skip building the plugins first
        #[arg(long)]
        skip_build: bool,
        /// Leave the server running after the test
        #[arg(long)]
        keep_server: bool,
        /// Override the readiness poll attempt count
        #[arg(long)]
        attempts: Option<u32>,
        /// Override the seconds between readiness polls
        #[arg(long)]
        wait: Option<u64>,
    },

    /// Compare measured values against a golden expectation file
    Validate {
        /// Golden expectation file
        #[arg(long)]
        expected: PathBuf,
        /// Measured values file
        #[arg(long, conflicts_with = "url", required_unless_present = "url")]
        measured: Option<PathBuf>,
        /// Fetch measures from a running server instead of a file
        #[arg(long, requires = "component")]
        url: Option<String>,
        /// Component key to fetch measures for
        #[arg(long)]
        component: Option<String>,
    },

    /// Check external tools and set up a project
    Setup {
        /// Check that required external tools are available
        #[arg(long)]
        check: bool,
        /// Write a sample smelter.toml into the current directory
        #[arg(long)]
        init_config: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if !atty::is(atty::Stream::Stdout) {
        colored::control::set_override(false);
    }

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "❌".bright_red(), e);
        exit(1);
    }
}

fn build_system(cli: &Cli) -> Result<BuildSystem> {
    let system = match &cli.project_root {
        Some(root) => BuildSystem::new(root.clone())?,
        None => BuildSystem::for_current_dir()?,
    };
    Ok(system)
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Build {
            all,
            cpp,
            csharp,
            gui,
            java,
            python,
            rpg,
            builddir,
            clean,
            dist,
        } => {
            let mut selection = ModuleSelection {
                all: *all || *dist,
                gui: *gui,
                ..ModuleSelection::default()
            };
            for (flag, language) in [
                (cpp, "cpp"),
                (csharp, "csharp"),
                (java, "java"),
                (python, "python"),
                (rpg, "rpg"),
            ] {
                if *flag {
                    selection = selection.with_analyzer(language);
                }
            }

            let mut system = build_system(cli)?;
            system.set_config(BuildConfig {
                verbose: cli.verbose,
                dry_run: cli.dry_run,
                trace_commands: cli.trace_commands,
                build_dir: builddir.clone(),
                clean: *clean,
                dist: *dist,
                selection,
            });

            let results = system.build_all()?;
            if !results.warnings.is_empty() {
                println!(
                    "{} finished with {} warning(s)",
                    "⚠".bright_yellow(),
                    results.warnings.len()
                );
            }
            Ok(())
        },

        Commands::Clean => {
            let mut system = build_system(cli)?;
            system.set_config(BuildConfig {
                dry_run: cli.dry_run,
                trace_commands: cli.trace_commands,
                ..BuildConfig::default()
            });
            system.clean()?;
            Ok(())
        },

        Commands::Rules {
            analyzer_dir,
            language,
        } => {
            let mut system = build_system(cli)?;
            system.set_config(BuildConfig {
                verbose: cli.verbose,
                dry_run: cli.dry_run,
                trace_commands: cli.trace_commands,
                ..BuildConfig::default()
            });

            let mut warnings = Vec::new();
            match language {
                Some(key) => system.generate_rule_catalogs_for(
                    key,
                    analyzer_dir.as_deref(),
                    &mut warnings,
                )?,
                None => system.generate_rule_catalogs(analyzer_dir.as_deref(), &mut warnings)?,
            }
            if !warnings.is_empty() {
                println!(
                    "{} finished with {} warning(s)",
                    "⚠".bright_yellow(),
                    warnings.len()
                );
            }
            Ok(())
        },

        Commands::Itest {
            server_version,
            scanner_version,
            project,
            skip_build,
            keep_server,
            attempts,
            wait,
        } => {
            let mut system = build_system(cli)?;
            system.set_config(BuildConfig {
                verbose: cli.verbose,
                dry_run: cli.dry_run,
                trace_commands: cli.trace_commands,
                dist: true,
                selection: ModuleSelection::everything(),
                ..BuildConfig::default()
            });

            let mut harness_config = system
                .project()
                .harness
                .clone()
                .context("no [harness] section in smelter.toml")?;
            if let Some(v) = server_version {
                harness_config.server_version = v.clone();
            }
            if let Some(v) = scanner_version {
                harness_config.scanner_version = v.clone();
            }
            if let Some(p) = project {
                harness_config.project_dir = p.clone();
            }
            if let Some(a) = attempts {
                harness_config.attempts = *a;
            }
            if let Some(w) = wait {
                harness_config.wait_secs = *w;
            }

            if !*skip_build {
                // dist is set, so this also assembles the package tree
                system.build_all()?;
            }
            let plugins_dir =
                system.build_dir().join(&system.project().package_name).join("plugins");
            if !plugins_dir.is_dir() && !cli.dry_run {
                bail!("no built plugins at {}", plugins_dir.display());
            }

            run_itest(cli, &system, harness_config, &plugins_dir, *keep_server)
        },

        Commands::Validate {
            expected,
            measured,
            url,
            component,
        } => {
            let root = cli
                .project_root
                .clone()
                .or_else(|| std::env::current_dir().ok())
                .context("cannot determine project root")?;

            let report = match (measured, url) {
                (Some(measured), _) => validate::validate_files(&root, expected, measured)?,
                (None, Some(url)) => {
                    let component = component.as_deref().context("--url requires --component")?;
                    validate::validate_against_server(&root, expected, url, component)?
                },
                (None, None) => unreachable!("clap enforces measured or url"),
            };
            print_report(cli, &report)?;
            if report.has_errors() {
                exit(1);
            }
            Ok(())
        },

        Commands::Setup { check, init_config } => {
            if *init_config {
                let path = std::env::current_dir()?.join("smelter.toml");
                if path.exists() {
                    bail!("{} already exists", path.display());
                }
                ProjectConfig::init_sample(&path)?;
                println!("{} wrote {}", "✅".bright_green(), path.display());
            }
            if *check || !*init_config {
                let build_tool = match build_system(cli) {
                    Ok(system) => system.project().build_tool.clone(),
                    Err(_) => "mvn".to_string(),
                };
                smelter_build_core::tools::ToolManager::new(&build_tool).print_status()?;
            }
            Ok(())
        },
    }
}

fn run_itest(
    cli: &Cli,
    system: &BuildSystem,
    config: HarnessConfig,
    plugins_dir: &std::path::Path,
    keep_server: bool,
) -> Result<()> {
    println!("{} Running integration test...", "🧪".bright_blue());
    if cli.dry_run {
        println!("  would fetch server {} and scanner {}", config.server_version, config.scanner_version);
        println!("  would install plugins from {}", plugins_dir.display());
        return Ok(());
    }

    let expected = config.expected_measures.clone().map(|p| system.root().join(p));
    let component = config.component.clone();
    let harness = TestHarness::new(system.root(), config.clone(), cli.verbose);

    let server_root = harness.fetch_distribution(&config.server_url, &config.server_version)?;
    let scanner_root = harness.fetch_distribution(&config.scanner_url, &config.scanner_version)?;
    harness.install_plugins(plugins_dir, &server_root)?;

    let mut server = harness.start_server(&server_root)?;
    let outcome = harness.wait_until_ready().and_then(|()| harness.run_scanner(&scanner_root));

    // Measures must be fetched while the server is still up
    let report = match (&outcome, &expected, &component) {
        (Ok(()), Some(expected), Some(component)) => Some(validate::validate_against_server(
            system.root(),
            expected,
            &harness.server_base_url(),
            component,
        )),
        _ => None,
    };

    if keep_server {
        let pid = server.detach();
        println!("  {} server left running (pid {})", "⚠".bright_yellow(), pid);
    } else {
        server.stop()?;
    }
    outcome?;

    if let Some(report) = report {
        let report = report?;
        print_report(cli, &report)?;
        if report.has_errors() {
            exit(1);
        }
    }

    println!("{} Integration test passed", "✅".bright_green());
    Ok(())
}

fn print_report(cli: &Cli, report: &smelter_build_core::CheckReport) -> Result<()> {
    match cli.output {
        OutputFormat::Human => report.print_human(),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}
