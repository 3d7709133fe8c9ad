use anyhow::{Context, Result, bail};
use std::fmt;
use std::process::{Output, Stdio};
use std::str::FromStr;
use std::time::Duration;
use tokio::process::Command;

/// An external command line with `{name}` placeholders.
///
/// The template is split on whitespace into an argument vector; placeholders
/// are substituted per argument, so substituted values never split into
/// several arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    args: Vec<String>,
}

impl CommandTemplate {
    pub fn program(&self) -> &str {
        &self.args[0]
    }

    /// Argument vector with every `{key}` replaced by its value
    pub fn render(&self, vars: &[(&str, &str)]) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                vars.iter().fold(arg.clone(), |acc, (key, value)| {
                    acc.replace(&format!("{{{key}}}"), value)
                })
            })
            .collect()
    }

    /// Run the rendered command, capturing stdout and stderr.
    ///
    /// The child is killed if the timeout expires or the returned future is
    /// dropped. A non-zero exit status is not an error here.
    pub async fn output(&self, vars: &[(&str, &str)], timeout: Duration) -> Result<Output> {
        let argv = self.render(vars);
        let child = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("could not spawn '{}'", argv[0]))?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.with_context(|| format!("'{}' failed to run", argv.join(" "))),
            Err(_) => bail!("'{}' timed out after {} seconds", argv.join(" "), timeout.as_secs()),
        }
    }
}

impl FromStr for CommandTemplate {
    type Err = anyhow::Error;

    fn from_str(template: &str) -> Result<Self> {
        let args: Vec<String> = template.split_whitespace().map(str::to_string).collect();
        if args.is_empty() {
            bail!("command template is empty");
        }
        Ok(Self { args })
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args.join(" "))
    }
}
