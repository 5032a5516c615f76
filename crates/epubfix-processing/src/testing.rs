//! Scripted [`FixerTool`] that imitates `epub-fix` on disk without running it.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use epubfix_core::constants::{FIXED_SUFFIX, REPORT_SUFFIX};
use epubfix_core::naming::{epub3_file_name, epub_stem, ToolVersion};

use crate::error::ToolError;
use crate::tool::{FixerTool, ToolOutput};

/// How the scripted tool behaves. Every flag defaults to the happy path for an
/// EPUB 3 input with tool version 1.1.
#[derive(Debug, Clone)]
pub struct Script {
    pub version: ToolVersion,
    pub analysis_output: String,
    pub analysis_fails: bool,
    pub convert_writes_output: bool,
    pub fix_exit_code: i32,
    pub fix_writes_fixed: bool,
    pub fix_writes_report: bool,
    /// Analysis fails the way `EpubFixCli` reports an exceeded timeout.
    pub analysis_times_out: bool,
    pub fix_times_out: bool,
    /// Sleep before the fix step does anything.
    pub fix_delay: Duration,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            version: ToolVersion { major: 1, minor: 1 },
            analysis_output: "EPUB version detected: 3.0".to_string(),
            analysis_fails: false,
            convert_writes_output: true,
            fix_exit_code: 0,
            fix_writes_fixed: true,
            fix_writes_report: true,
            analysis_times_out: false,
            fix_times_out: false,
            fix_delay: Duration::ZERO,
        }
    }
}

impl Script {
    pub fn epub2() -> Self {
        Self {
            analysis_output: "EPUB version detected: 2.0".to_string(),
            ..Self::default()
        }
    }
}

pub struct ScriptedTool {
    script: Script,
    calls: Mutex<Vec<&'static str>>,
}

impl ScriptedTool {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Modes invoked so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, mode: &'static str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(mode);
        }
    }

    fn ok(stdout: &str) -> ToolOutput {
        ToolOutput {
            code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    fn sibling(input: &Path, name: String) -> std::path::PathBuf {
        input.parent().unwrap_or_else(|| Path::new(".")).join(name)
    }

    fn timed_out() -> ToolError {
        ToolError::TimedOut {
            binary: "epub-fix".to_string(),
            secs: 1,
        }
    }

    fn file_name(input: &Path) -> &str {
        input.file_name().and_then(|n| n.to_str()).unwrap_or("input.epub")
    }
}

#[async_trait]
impl FixerTool for ScriptedTool {
    async fn version(&self) -> ToolVersion {
        self.record("version");
        self.script.version
    }

    async fn analyze(&self, _input: &Path) -> Result<ToolOutput, ToolError> {
        self.record("analyze");
        if self.script.analysis_times_out {
            return Err(Self::timed_out());
        }
        if self.script.analysis_fails {
            return Err(ToolError::Failed {
                binary: "epub-fix".to_string(),
                code: Some(2),
                output: ToolOutput {
                    code: Some(2),
                    stdout: String::new(),
                    stderr: "unreadable container".to_string(),
                },
            });
        }
        Ok(Self::ok(&self.script.analysis_output))
    }

    async fn convert(&self, input: &Path) -> Result<ToolOutput, ToolError> {
        self.record("convert");
        if self.script.convert_writes_output {
            let target = Self::sibling(input, epub3_file_name(Self::file_name(input)));
            tokio::fs::write(&target, b"converted")
                .await
                .map_err(|_| ToolError::InvalidPath(target.clone()))?;
        }
        Ok(Self::ok("Converting EPUB 2.0 to EPUB 3.0\nDone"))
    }

    async fn fix(&self, input: &Path) -> Result<ToolOutput, ToolError> {
        self.record("fix");
        if !self.script.fix_delay.is_zero() {
            tokio::time::sleep(self.script.fix_delay).await;
        }
        if self.script.fix_times_out {
            return Err(Self::timed_out());
        }
        if self.script.fix_exit_code != 0 {
            return Err(ToolError::Failed {
                binary: "epub-fix".to_string(),
                code: Some(self.script.fix_exit_code),
                output: ToolOutput {
                    code: Some(self.script.fix_exit_code),
                    stdout: String::new(),
                    stderr: "fatal: package document missing".to_string(),
                },
            });
        }

        let stem = epub_stem(Self::file_name(input)).to_string();
        if self.script.fix_writes_fixed {
            let target = Self::sibling(input, format!("{}{}", stem, FIXED_SUFFIX));
            tokio::fs::write(&target, b"fixed")
                .await
                .map_err(|_| ToolError::InvalidPath(target.clone()))?;
        }
        if self.script.fix_writes_report {
            let target = Self::sibling(input, format!("{}{}", stem, REPORT_SUFFIX));
            tokio::fs::write(
                &target,
                b"<html><body><h1>Accessibility Report</h1><a href=\"details.html\">details</a></body></html>",
            )
            .await
            .map_err(|_| ToolError::InvalidPath(target.clone()))?;
        }
        Ok(Self::ok("Fixed 3 issues"))
    }
}
