//! Metadata extraction and hit classification

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::frontier::Frontier;
use crate::util::{CommandTemplate, relative_to};

const LOG_TARGET: &str = "scanner";

pub const DEFAULT_EXTRACT_COMMAND: &str = "exiftool {file}";

pub const DEFAULT_EXTRACT_TIMEOUT: Duration = Duration::from_secs(30);

/// Marker of a location tag in extractor output
pub const LOCATION_TAG: &str = "GPS";

/// Marker of a coordinate expressed in degrees
pub const DEGREE_MARKER: &str = "deg";

/// A file is a hit only when both markers are present: the tag name alone
/// shows up in files that carry no coordinates.
pub fn is_hit(extracted: &str) -> bool {
    extracted.contains(LOCATION_TAG) && extracted.contains(DEGREE_MARKER)
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Extractor invocation with a `{file}` placeholder
    pub command: CommandTemplate,
    pub timeout: Duration,
}

/// Outcome of scanning one repository
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub files: u64,
    pub skipped: u64,
    pub hits: u64,
}

#[derive(Debug, Clone)]
pub struct MetadataScanner {
    config: ScanConfig,
}

impl MetadataScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Run the extractor on one file and return its standard output
    pub async fn extract(&self, file: &Path) -> Result<String> {
        let path = file.to_str().context("file path is not valid UTF-8")?;
        let output = self.config.command.output(&[("file", path)], self.config.timeout).await?;
        if !output.status.success() {
            bail!("{} exited with {}", self.config.command.program(), output.status);
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Scan every file of a checked-out repository and record hits.
    ///
    /// Files the extractor cannot handle are skipped. Stored paths are
    /// relative to `root`, the repository's working tree.
    pub async fn scan<F: Frontier>(
        &self,
        frontier: &F,
        repository: &str,
        root: &Path,
        files: &[PathBuf],
    ) -> Result<ScanReport> {
        let mut report = ScanReport::default();

        for file in files {
            report.files += 1;

            let extracted = match self.extract(file).await {
                Ok(text) => text,
                Err(e) => {
                    log::debug!(target: LOG_TARGET, "Skipping {}: {e:#}", file.display());
                    report.skipped += 1;
                    continue;
                }
            };

            if !is_hit(&extracted) {
                continue;
            }

            let Some(rel) = relative_to(root, file) else {
                log::warn!(target: LOG_TARGET, "{} is outside {}", file.display(), root.display());
                continue;
            };
            if frontier.record_hit(repository, &rel).await? {
                log::info!(target: LOG_TARGET, "Hit: {repository} {rel}");
                report.hits += 1;
            }
        }

        Ok(report)
    }
}
