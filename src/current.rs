//! The plugin set currently packaged, read from a nix evaluation

use crate::error::{PlugupError, PlugupResult};
use crate::plugin::{AccessToken, Plugin, PluginDesc};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Source of the currently known plugins and their resolved state
#[async_trait]
pub trait CurrentPlugins: Send + Sync {
    /// Known plugins paired with the description they were built from
    async fn current_plugins(
        &self,
        token: Option<&AccessToken>,
    ) -> PlugupResult<Vec<(PluginDesc, Plugin)>>;
}

/// Evaluates a nix expression against a nixpkgs checkout
#[derive(Debug, Clone)]
pub struct NixEvaluator {
    expr: String,
    nixpkgs: PathBuf,
}

impl NixEvaluator {
    /// Evaluate `expr` with `localpkgs` pointing at `nixpkgs`
    pub fn new(expr: impl Into<String>, nixpkgs: impl Into<PathBuf>) -> Self {
        Self {
            expr: expr.into(),
            nixpkgs: nixpkgs.into(),
        }
    }

    async fn eval(&self) -> PlugupResult<String> {
        let nix_path = format!("localpkgs={}", self.nixpkgs.display());
        let args = [
            "eval",
            "--extra-experimental-features",
            "nix-command",
            "--impure",
            "--json",
            "--expr",
            self.expr.as_str(),
            "--nix-path",
            nix_path.as_str(),
        ];
        let command = format!("nix {}", args.join(" "));
        debug!("Running command: {}", command);

        let output = Command::new("nix")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| PlugupError::command_failed(&command, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PlugupError::command_exec(command, stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl CurrentPlugins for NixEvaluator {
    async fn current_plugins(
        &self,
        token: Option<&AccessToken>,
    ) -> PlugupResult<Vec<(PluginDesc, Plugin)>> {
        if self.expr.trim().is_empty() {
            debug!("No plugin expression configured, starting from an empty set");
            return Ok(Vec::new());
        }

        let stdout = self.eval().await?;
        parse_current(&stdout, token)
    }
}

#[derive(Debug, Deserialize)]
struct Attr {
    pname: String,
    version: String,
    #[serde(rename = "homePage")]
    home_page: String,
    checksum: Checksum,
}

#[derive(Debug, Deserialize)]
struct Checksum {
    rev: String,
    submodules: bool,
    sha256: String,
}

fn parse_current(
    json: &str,
    token: Option<&AccessToken>,
) -> PlugupResult<Vec<(PluginDesc, Plugin)>> {
    let attrs: BTreeMap<String, Attr> = serde_json::from_str(json)
        .map_err(|e| PlugupError::malformed("nix eval", format!("unexpected output: {e}")))?;
    let version_date = Regex::new(r"\d\d\d\d-\d\d?-\d\d?")
        .map_err(|e| PlugupError::Internal(e.to_string()))?;

    attrs
        .into_iter()
        .map(|(name, attr)| {
            let date = version_date
                .find(&attr.version)
                .ok_or_else(|| {
                    PlugupError::malformed(&name, format!("cannot parse version: {}", attr.version))
                })
                .and_then(|m| parse_day(&name, m.as_str()))?;

            let desc = PluginDesc::from_spec(&format!("{} as {}", attr.home_page, name), token)?;
            let plugin = Plugin::new(
                attr.pname,
                attr.checksum.rev,
                attr.checksum.submodules,
                attr.checksum.sha256,
                Some(date),
            );
            Ok((desc, plugin))
        })
        .collect()
}

fn parse_day(context: &str, day: &str) -> PlugupResult<DateTime<FixedOffset>> {
    let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| PlugupError::malformed(context, format!("bad version date {day}: {e}")))?;
    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(|| {
        PlugupError::malformed(context, format!("bad version date {day}"))
    })?;
    Ok(Utc.from_utc_datetime(&midnight).fixed_offset())
}
