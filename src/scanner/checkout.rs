//! Repository acquisition and itemization
//!
//! Each worker checks repositories out into its own hidden, uniquely named
//! directory. The directory is removed when the [`Checkout`] is dropped, so
//! every exit path (failure, cancellation, panic unwind) cleans up.

use anyhow::{Context, Result, bail};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::util::{CommandTemplate, is_vcs_dir};

const LOG_TARGET: &str = "checkout";

pub const DEFAULT_CHECKOUT_COMMAND: &str =
    "git clone --depth 1 --single-branch --no-tags --quiet https://github.com/{repo}.git {dest}";

pub const DEFAULT_CHECKOUT_TIMEOUT: Duration = Duration::from_secs(300);

/// Name of the working tree inside the scoped directory
const TREE_DIR: &str = "tree";

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Checkout tool invocation with `{repo}` and `{dest}` placeholders
    pub command: CommandTemplate,
    /// Parent of the per-worker scoped directories
    pub work_dir: PathBuf,
    pub timeout: Duration,
}

/// A worker-scoped checkout location
#[derive(Debug)]
pub struct Checkout {
    dir: TempDir,
    root: PathBuf,
}

impl Checkout {
    /// Create a fresh hidden directory for `worker` under the work dir
    pub fn create(config: &CheckoutConfig, worker: usize) -> Result<Self> {
        fs::create_dir_all(&config.work_dir)
            .with_context(|| format!("could not create work directory '{}'", config.work_dir.display()))?;

        let dir = tempfile::Builder::new()
            .prefix(&format!(".geoleak-w{worker}-"))
            .tempdir_in(&config.work_dir)
            .with_context(|| format!("could not create checkout directory in '{}'", config.work_dir.display()))?;
        let root = dir.path().join(TREE_DIR);

        Ok(Self { dir, root })
    }

    /// Root of the materialized working tree; item paths are under it
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Materialize `repository` and list its regular files.
    ///
    /// Fails if the checkout tool cannot run or exits non-zero. Version-control
    /// metadata directories are removed before the tree is enumerated.
    pub async fn acquire(&self, config: &CheckoutConfig, repository: &str) -> Result<Vec<PathBuf>> {
        let dest = self.root.to_str().context("checkout path is not valid UTF-8")?;
        let output = config
            .command
            .output(&[("repo", repository), ("dest", dest)], config.timeout)
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("checkout of {repository} exited with {}: {}", output.status, stderr.trim());
        }
        if !self.root.is_dir() {
            bail!("checkout of {repository} produced no working tree");
        }

        remove_vcs_dirs(&self.root)?;
        itemize(&self.root)
    }

    /// Remove the scoped directory now, reporting failures.
    ///
    /// A directory that is already gone is not an error.
    pub fn cleanup(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("could not remove '{}'", path.display())),
        }
    }
}

/// Delete every version-control metadata directory below `root`
fn remove_vcs_dirs(root: &Path) -> Result<()> {
    let mut walker = WalkDir::new(root).min_depth(1).into_iter();
    while let Some(entry) = walker.next() {
        let entry = entry.with_context(|| format!("could not read '{}'", root.display()))?;
        if entry.file_type().is_dir() && entry.file_name().to_str().is_some_and(is_vcs_dir) {
            walker.skip_current_dir();
            fs::remove_dir_all(entry.path())
                .with_context(|| format!("could not remove '{}'", entry.path().display()))?;
            log::debug!(target: LOG_TARGET, "Removed {}", entry.path().display());
        }
    }
    Ok(())
}

/// Every regular file below `root`; directories and symlinks are excluded
fn itemize(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("could not read '{}'", root.display()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
