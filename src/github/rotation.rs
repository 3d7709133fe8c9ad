//! Network identity rotation
//!
//! Recovers from remote rate limits by moving the crawler to a different
//! egress address. The [`ApiClient`](super::ApiClient) serializes calls, so
//! implementations never see concurrent rotations.

use anyhow::{Context, Result, bail};
use std::future::Future;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

const LOG_TARGET: &str = "rotation";

const ROTATE_TIMEOUT: Duration = Duration::from_secs(120);

/// How many times the new egress address is polled after a reconnect
const ADDRESS_CHECKS: u32 = 5;

pub trait IdentityRotator: Send + Sync {
    /// Switch to a new egress identity and confirm it is in effect
    fn rotate(&self) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Debug, Clone)]
pub struct RotationConfig {
    /// Reconnect command, e.g. `["protonvpn-cli", "connect", "--random"]`
    pub command: Vec<String>,
    /// Service echoing the caller's public address as plain text
    pub ip_check_url: Option<String>,
    /// Pause between address checks
    pub settle: Duration,
}

/// Rotates by running an external reconnect command (typically a VPN client)
pub struct CommandRotator {
    config: RotationConfig,
    client: reqwest::Client,
}

impl CommandRotator {
    pub fn new(config: RotationConfig) -> Result<Self> {
        if config.command.is_empty() {
            bail!("rotation command is empty");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { config, client })
    }

    async fn reconnect(&self) -> Result<()> {
        let (program, args) = self.config.command.split_first().context("rotation command is empty")?;
        let child = Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("could not spawn '{program}'"))?;

        let output = tokio::time::timeout(ROTATE_TIMEOUT, child.wait_with_output())
            .await
            .with_context(|| format!("'{}' timed out", self.config.command.join(" ")))?
            .with_context(|| format!("'{}' failed to run", self.config.command.join(" ")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("'{}' exited with {}: {}", self.config.command.join(" "), output.status, stderr.trim());
        }
        Ok(())
    }

    async fn current_address(&self, url: &str) -> Result<String> {
        let body = self.client.get(url).send().await?.error_for_status()?.text().await?;
        Ok(body.trim().to_string())
    }

    /// Poll the echo service until it reports an address other than `previous`
    async fn confirm_address(&self, url: &str, previous: &str) -> Result<()> {
        for _ in 0..ADDRESS_CHECKS {
            match self.current_address(url).await {
                Ok(address) if address != previous => {
                    log::info!(target: LOG_TARGET, "Egress address is now {address} (was {previous})");
                    return Ok(());
                }
                Ok(address) => log::debug!(target: LOG_TARGET, "Egress address still {address}"),
                Err(e) => log::debug!(target: LOG_TARGET, "Address check failed: {e}"),
            }
            tokio::time::sleep(self.config.settle).await;
        }

        bail!("egress address did not change after reconnect")
    }
}

impl IdentityRotator for CommandRotator {
    async fn rotate(&self) -> Result<()> {
        log::info!(target: LOG_TARGET, "Rotating network identity");
        let Some(url) = &self.config.ip_check_url else {
            self.reconnect().await?;
            tokio::time::sleep(self.config.settle).await;
            return Ok(());
        };

        // Baseline the new address must differ from
        let previous = self
            .current_address(url)
            .await
            .context("could not determine egress address before reconnect")?;
        self.reconnect().await?;
        self.confirm_address(url, &previous).await
    }
}

/// Fallback when no reconnect command is configured: wait out the limit
#[derive(Debug, Clone)]
pub struct BackoffRotator {
    delay: Duration,
}

impl BackoffRotator {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl IdentityRotator for BackoffRotator {
    async fn rotate(&self) -> Result<()> {
        log::info!(target: LOG_TARGET, "No rotation command configured, backing off for {:?}", self.delay);
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Rotator chosen at startup from configuration
pub enum Rotator {
    Command(CommandRotator),
    Backoff(BackoffRotator),
}

impl Rotator {
    pub fn from_config(config: Option<RotationConfig>, backoff: Duration) -> Result<Self> {
        match config {
            Some(config) => Ok(Rotator::Command(CommandRotator::new(config)?)),
            None => Ok(Rotator::Backoff(BackoffRotator::new(backoff))),
        }
    }
}

impl IdentityRotator for Rotator {
    async fn rotate(&self) -> Result<()> {
        match self {
            Rotator::Command(r) => r.rotate().await,
            Rotator::Backoff(r) => r.rotate().await,
        }
    }
}
