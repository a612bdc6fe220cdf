//! Integration test harness
//!
//! Drives a full end-to-end verification run: download the analysis server
//! and scanner distributions, extract them, install the freshly built
//! plugins, start the server, wait for it to report ready, and scan the
//! sample project. Measure comparison against the golden file lives in
//! [`crate::validate`].

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use colored::Colorize;

use crate::config::HarnessConfig;
use crate::error::{BuildError, BuildResult};

/// Expand a `{version}` placeholder in a distribution URL template
pub fn expand_url(template: &str, version: &str) -> String {
    template.replace("{version}", version)
}

/// A running analysis server process
///
/// The process is killed on drop if [`stop`](ServerHandle::stop) was not
/// called.
#[derive(Debug)]
pub struct ServerHandle {
    child: Child,
    stopped: bool,
}

impl ServerHandle {
    /// Stop the server process
    pub fn stop(&mut self) -> BuildResult<()> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;
        self.child
            .kill()
            .map_err(|e| BuildError::Harness(format!("failed to stop server: {}", e)))?;
        self.child
            .wait()
            .map_err(|e| BuildError::Harness(format!("failed to reap server: {}", e)))?;
        Ok(())
    }

    /// Leave the server running, returning its pid
    pub fn detach(mut self) -> u32 {
        self.stopped = true;
        self.child.id()
    }

    /// Process id of the server
    pub fn pid(&self) -> u32 {
        self.child.id()
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if !self.stopped {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Integration harness over one server/scanner pair
pub struct TestHarness {
    config: HarnessConfig,
    root: PathBuf,
    work_dir: PathBuf,
    verbose: bool,
}

impl TestHarness {
    /// Create a harness rooted at the project directory
    pub fn new(root: &Path, config: HarnessConfig, verbose: bool) -> Self {
        let work_dir = if config.work_dir.is_absolute() {
            config.work_dir.clone()
        } else {
            root.join(&config.work_dir)
        };
        Self {
            config,
            root: root.to_path_buf(),
            work_dir,
            verbose,
        }
    }

    /// Harness working directory (downloads and extracted trees)
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Base URL of the server under test
    pub fn server_base_url(&self) -> String {
        format!("http://localhost:{}", self.config.port)
    }

    /// Download a distribution archive unless it is already present
    pub fn download(&self, url: &str, dest: &Path) -> BuildResult<()> {
        if dest.exists() {
            println!("  {} {} already downloaded", "✓".bright_green(), dest.display());
            return Ok(());
        }
        println!("  {} downloading {}...", "⬇".bright_blue(), url);

        std::fs::create_dir_all(&self.work_dir)?;
        let mut response = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .and_then(|c| c.get(url).send())
            .map_err(|e| BuildError::Harness(format!("download of {} failed: {}", url, e)))?;
        if !response.status().is_success() {
            return Err(BuildError::Harness(format!(
                "download of {} failed: HTTP {}",
                url,
                response.status()
            )));
        }

        // Stream to a temp name first so an aborted download is not mistaken
        // for a finished archive next run.
        let partial = dest.with_extension("part");
        let mut file = std::fs::File::create(&partial)?;
        response
            .copy_to(&mut file)
            .map_err(|e| BuildError::Harness(format!("download of {} failed: {}", url, e)))?;
        file.flush()?;
        std::fs::rename(&partial, dest)?;
        Ok(())
    }

    /// Extract a zip archive into `dest`
    pub fn extract_zip(&self, archive: &Path, dest: &Path) -> BuildResult<()> {
        println!("  {} extracting {}...", "📂".bright_blue(), archive.display());
        let file = std::fs::File::open(archive)?;
        let mut zip = zip::ZipArchive::new(file)
            .map_err(|e| BuildError::Harness(format!("bad archive {}: {}", archive.display(), e)))?;
        std::fs::create_dir_all(dest)?;
        zip.extract(dest)
            .map_err(|e| BuildError::Harness(format!("extraction of {} failed: {}", archive.display(), e)))?;
        Ok(())
    }

    /// Download and extract one distribution, returning its root directory
    ///
    /// Zip distributions contain a single top-level directory; that directory
    /// is the returned root.
    pub fn fetch_distribution(&self, url_template: &str, version: &str) -> BuildResult<PathBuf> {
        let url = expand_url(url_template, version);
        let archive_name = url
            .rsplit('/')
            .next()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| BuildError::Harness(format!("cannot derive filename from {}", url)))?;
        let archive = self.work_dir.join(archive_name);
        self.download(&url, &archive)?;

        let extract_dir = self.work_dir.join(format!("{}.d", archive_name));
        if !extract_dir.exists() {
            self.extract_zip(&archive, &extract_dir)?;
        }
        single_subdir(&extract_dir)
    }

    /// Copy built plugin jars into the server's plugin directory
    pub fn install_plugins(&self, plugins_src: &Path, server_root: &Path) -> BuildResult<()> {
        let dest = server_plugins_dir(server_root);
        println!(
            "  {} installing plugins into {}...",
            "🔌".bright_blue(),
            dest.display()
        );
        std::fs::create_dir_all(&dest)?;

        let options = fs_extra::dir::CopyOptions::new().content_only(true).overwrite(true);
        fs_extra::dir::copy(plugins_src, &dest, &options)
            .map_err(|e| BuildError::Harness(format!("plugin install failed: {}", e)))?;
        Ok(())
    }

    /// Start the server process
    pub fn start_server(&self, server_root: &Path) -> BuildResult<ServerHandle> {
        let start = &self.config.server_start;
        if start.is_empty() {
            return Err(BuildError::Harness("empty server start command".to_string()));
        }
        let program = server_root.join(&start[0]);
        println!("  {} starting server: {}", "🚀".bright_blue(), program.display());

        let mut cmd = Command::new(&program);
        cmd.args(&start[1..]).current_dir(server_root);
        if !self.verbose {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
        let child = cmd
            .spawn()
            .map_err(|e| BuildError::Harness(format!("failed to start server: {}", e)))?;
        Ok(ServerHandle {
            child,
            stopped: false,
        })
    }

    /// Poll the readiness endpoint until the server reports UP
    ///
    /// Gives up after the configured number of attempts with the configured
    /// wait between them.
    pub fn wait_until_ready(&self) -> BuildResult<()> {
        let url = format!("{}{}", self.server_base_url(), self.config.status_path);
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| BuildError::Harness(e.to_string()))?;

        for attempt in 1..=self.config.attempts {
            match client.get(&url).send().and_then(|r| r.json::<serde_json::Value>()) {
                Ok(body) if body.get("status").and_then(|s| s.as_str()) == Some("UP") => {
                    println!("  {} server is up (attempt {})", "✓".bright_green(), attempt);
                    return Ok(());
                },
                Ok(body) => {
                    if self.verbose {
                        println!("  server not ready yet: {}", body);
                    }
                },
                Err(e) => {
                    if self.verbose {
                        println!("  server not reachable yet: {}", e);
                    }
                },
            }
            if attempt < self.config.attempts {
                std::thread::sleep(Duration::from_secs(self.config.wait_secs));
            }
        }

        Err(BuildError::Harness(format!(
            "server did not become ready after {} attempts ({}s apart)",
            self.config.attempts, self.config.wait_secs
        )))
    }

    /// Run the scanner over the sample project
    ///
    /// The scanner is executed in the sample project directory and picks up
    /// the project's own scanner configuration.
    pub fn run_scanner(&self, scanner_root: &Path) -> BuildResult<()> {
        let scanner = scanner_root.join(&self.config.scanner_bin);
        let project_dir = if self.config.project_dir.is_absolute() {
            self.config.project_dir.clone()
        } else {
            self.root.join(&self.config.project_dir)
        };
        println!(
            "  {} scanning {}...",
            "🔍".bright_blue(),
            project_dir.display()
        );

        let status = Command::new(&scanner)
            .current_dir(&project_dir)
            .status()
            .map_err(|e| BuildError::Harness(format!("failed to run scanner: {}", e)))?;
        if !status.success() {
            return Err(BuildError::Harness(format!(
                "scanner exited with {}",
                status.code().map_or_else(|| "signal".to_string(), |c| c.to_string())
            )));
        }
        Ok(())
    }
}

/// Plugin directory inside an extracted server distribution
fn server_plugins_dir(server_root: &Path) -> PathBuf {
    server_root.join("extensions").join("plugins")
}

/// The single directory inside an extraction target
fn single_subdir(dir: &Path) -> BuildResult<PathBuf> {
    let mut dirs = Vec::new();
    for entry in walkdir::WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| BuildError::Harness(e.to_string()))?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }
    match dirs.len() {
        1 => Ok(dirs.remove(0)),
        0 => Err(BuildError::Harness(format!(
            "no directory found inside {}",
            dir.display()
        ))),
        _ => Err(BuildError::Harness(format!(
            "expected a single directory inside {}, found {}",
            dir.display(),
            dirs.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn harness(root: &Path) -> TestHarness {
        let config: HarnessConfig = toml::from_str(
            r#"
server_version = "7.2.1"
scanner_version = "3.2.0"
server_url = "https://example.org/server-{version}.zip"
scanner_url = "https://example.org/scanner-{version}.zip"
project_dir = "sample"
"#,
        )
        .unwrap();
        TestHarness::new(root, config, false)
    }

    #[test]
    fn test_expand_url() {
        assert_eq!(
            expand_url("https://example.org/server-{version}.zip", "7.2.1"),
            "https://example.org/server-7.2.1.zip"
        );
        assert_eq!(expand_url("https://example.org/fixed.zip", "7.2.1"), "https://example.org/fixed.zip");
    }

    #[test]
    fn test_server_base_url_uses_configured_port() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(dir.path());
        assert_eq!(h.server_base_url(), "http://localhost:9000");
    }

    #[test]
    fn test_work_dir_resolves_against_root() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(dir.path());
        assert_eq!(h.work_dir(), dir.path().join("itest"));
    }

    #[test]
    fn test_extract_zip_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("dist.zip");

        let file = std::fs::File::create(&archive_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        writer.add_directory("server-7.2.1/", options).unwrap();
        writer.start_file("server-7.2.1/bin/run.sh", options).unwrap();
        writer.write_all(b"#!/bin/sh\n").unwrap();
        writer.finish().unwrap();

        let h = harness(dir.path());
        let dest = dir.path().join("out");
        h.extract_zip(&archive_path, &dest).unwrap();
        assert!(dest.join("server-7.2.1/bin/run.sh").is_file());

        let root = single_subdir(&dest).unwrap();
        assert!(root.ends_with("server-7.2.1"));
    }

    #[test]
    fn test_single_subdir_rejects_ambiguity() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        std::fs::create_dir(dir.path().join("b")).unwrap();
        assert!(single_subdir(dir.path()).is_err());

        let empty = tempfile::tempdir().unwrap();
        assert!(single_subdir(empty.path()).is_err());
    }

    #[test]
    fn test_install_plugins_copies_jars() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("plugins");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("core.jar"), "jar").unwrap();
        std::fs::write(src.join("java.jar"), "jar").unwrap();

        let server_root = dir.path().join("server-7.2.1");
        std::fs::create_dir_all(&server_root).unwrap();

        let h = harness(dir.path());
        h.install_plugins(&src, &server_root).unwrap();
        assert!(server_root.join("extensions/plugins/core.jar").is_file());
        assert!(server_root.join("extensions/plugins/java.jar").is_file());
    }

    #[test]
    fn test_download_skips_existing_archive() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("cached.zip");
        std::fs::write(&dest, "cached").unwrap();

        let h = harness(dir.path());
        // The URL is unreachable; an existing file must short-circuit.
        h.download("http://127.0.0.1:1/cached.zip", &dest).unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "cached");
    }
}
