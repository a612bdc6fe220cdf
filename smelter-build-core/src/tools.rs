//! External tool detection and command execution
//!
//! All subprocess invocations of the pipeline go through [`CommandRunner`],
//! which honors dry-run and trace modes and records every planned command so
//! the invocation order can be inspected (and asserted on in tests).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use colored::Colorize;

use crate::error::{BuildError, BuildResult};

/// Information about an external tool
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name of the tool/command
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// Installation command or instructions
    pub install_command: String,
    /// Whether this tool is required for basic functionality
    pub required: bool,
    /// Which smelter commands need this tool
    pub used_by: Vec<String>,
}

/// Tool detection result
#[derive(Debug)]
pub struct ToolStatus {
    /// Whether the tool is available on PATH
    pub available: bool,
    /// Resolved path if available
    pub path: Option<PathBuf>,
}

/// Tool manager for detecting external dependencies
#[derive(Debug)]
pub struct ToolManager {
    tools: BTreeMap<String, ToolInfo>,
}

impl ToolManager {
    /// Create a tool manager with the default tool definitions
    pub fn new(build_tool: &str) -> Self {
        let mut tools = BTreeMap::new();

        tools.insert(
            build_tool.to_string(),
            ToolInfo {
                name: build_tool.to_string(),
                description: "Module build tool".to_string(),
                install_command: "Install Apache Maven (or configure build_tool in smelter.toml)"
                    .to_string(),
                required: true,
                used_by: vec!["build", "dist", "itest"].into_iter().map(String::from).collect(),
            },
        );

        tools.insert(
            "java".to_string(),
            ToolInfo {
                name: "java".to_string(),
                description: "Java runtime for the analysis server and scanner".to_string(),
                install_command: "Install a JDK, e.g. via your package manager".to_string(),
                required: false,
                used_by: vec!["itest"].into_iter().map(String::from).collect(),
            },
        );

        tools.insert(
            "python3".to_string(),
            ToolInfo {
                name: "python3".to_string(),
                description: "Python interpreter for users-guide generation".to_string(),
                install_command: "Install Python from https://python.org".to_string(),
                required: false,
                used_by: vec!["build --gui"].into_iter().map(String::from).collect(),
            },
        );

        tools.insert(
            "git".to_string(),
            ToolInfo {
                name: "git".to_string(),
                description: "Version control system".to_string(),
                install_command: "Install Git from https://git-scm.com/".to_string(),
                required: false,
                used_by: vec!["setup"].into_iter().map(String::from).collect(),
            },
        );

        Self { tools }
    }

    /// Check a single tool
    pub fn check_tool(&self, name: &str) -> ToolStatus {
        match which::which(name) {
            Ok(path) => ToolStatus {
                available: true,
                path: Some(path),
            },
            Err(_) => ToolStatus {
                available: false,
                path: None,
            },
        }
    }

    /// Check all registered tools, returning `(info, status)` pairs
    pub fn check_all(&self) -> Vec<(&ToolInfo, ToolStatus)> {
        self.tools.values().map(|info| (info, self.check_tool(&info.name))).collect()
    }

    /// Print a status table and return an error if a required tool is missing
    pub fn print_status(&self) -> BuildResult<()> {
        let mut missing_required = Vec::new();

        println!("{} External tool status:", "🔧".bright_blue());
        for (info, status) in self.check_all() {
            if status.available {
                let path = status.path.map(|p| p.display().to_string()).unwrap_or_default();
                println!(
                    "  {} {} - {} ({})",
                    "✓".bright_green(),
                    info.name,
                    info.description,
                    path
                );
            } else {
                let marker = if info.required { "✗".bright_red() } else { "⚠".bright_yellow() };
                println!("  {} {} - {}", marker, info.name, info.description);
                println!("      install: {}", info.install_command);
                if info.required {
                    missing_required.push(info.name.clone());
                }
            }
        }

        if missing_required.is_empty() {
            Ok(())
        } else {
            Err(BuildError::Tool(format!(
                "required tools missing: {}",
                missing_required.join(", ")
            )))
        }
    }
}

/// A command planned or executed by the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCommand {
    /// Program name
    pub program: String,
    /// Arguments in order
    pub args: Vec<String>,
    /// Working directory, if not the process cwd
    pub cwd: Option<PathBuf>,
}

impl PlannedCommand {
    /// Render the command as a shell-like string
    pub fn render(&self) -> String {
        let mut s = self.program.clone();
        for arg in &self.args {
            s.push(' ');
            s.push_str(arg);
        }
        s
    }
}

/// Executes external commands, honoring dry-run and trace modes
#[derive(Debug)]
pub struct CommandRunner {
    /// Plan commands without executing them
    pub dry_run: bool,
    /// Print each command before running it
    pub trace: bool,
    history: Vec<PlannedCommand>,
}

impl CommandRunner {
    /// Create a runner
    pub fn new(dry_run: bool, trace: bool) -> Self {
        Self {
            dry_run,
            trace,
            history: Vec::new(),
        }
    }

    /// Run a command to completion, failing on a non-zero exit status
    pub fn run(&mut self, program: &str, args: &[&str], cwd: Option<&Path>) -> BuildResult<()> {
        let planned = PlannedCommand {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            cwd: cwd.map(Path::to_path_buf),
        };

        if self.trace || self.dry_run {
            println!("  {} {}", "$".bright_cyan(), planned.render());
        }
        self.history.push(planned);

        if self.dry_run {
            return Ok(());
        }

        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let status = cmd
            .status()
            .map_err(|e| BuildError::Tool(format!("failed to execute {}: {}", program, e)))?;

        if !status.success() {
            return Err(BuildError::Build(format!(
                "{} exited with {}",
                program,
                status.code().map_or_else(|| "signal".to_string(), |c| c.to_string())
            )));
        }
        Ok(())
    }

    /// Commands planned or executed so far, in order
    pub fn history(&self) -> &[PlannedCommand] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planned_command_render() {
        let cmd = PlannedCommand {
            program: "mvn".to_string(),
            args: vec!["-f".to_string(), "src/core/pom.xml".to_string(), "install".to_string()],
            cwd: None,
        };
        assert_eq!(cmd.render(), "mvn -f src/core/pom.xml install");
    }

    #[test]
    fn test_dry_run_records_without_executing() {
        let mut runner = CommandRunner::new(true, false);
        runner
            .run("definitely-not-a-real-binary", &["--flag"], None)
            .expect("dry run never executes");
        runner.run("mvn", &["clean"], None).unwrap();

        let history = runner.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].program, "definitely-not-a-real-binary");
        assert_eq!(history[1].render(), "mvn clean");
    }

    #[test]
    fn test_missing_tool_is_tool_error() {
        let mut runner = CommandRunner::new(false, false);
        let err = runner.run("smelter-nonexistent-tool-xyz", &[], None).unwrap_err();
        assert!(matches!(err, BuildError::Tool(_)));
    }

    #[test]
    fn test_tool_manager_registers_build_tool() {
        let manager = ToolManager::new("mvn");
        let all = manager.check_all();
        assert!(all.iter().any(|(info, _)| info.name == "mvn" && info.required));
        assert!(all.iter().any(|(info, _)| info.name == "java" && !info.required));
    }
}
