//! Source hashing through `nix-prefetch-git` and `nix-prefetch-url`

use super::{GitPrefetch, Prefetcher};
use crate::error::{PlugupError, PlugupResult};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Prefetcher that shells out to the nix prefetch tools
#[derive(Debug, Clone, Default)]
pub struct NixPrefetcher;

impl NixPrefetcher {
    /// Create a new prefetcher
    pub fn new() -> Self {
        Self
    }

    /// Run a tool and return its stdout
    async fn exec(&self, program: &str, args: &[&str]) -> PlugupResult<String> {
        let command = format!("{} {}", program, args.join(" "));
        debug!("Running {}", command);

        let output = Command::new(program)
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
impl Prefetcher for NixPrefetcher {
    async fn prefetch_git(&self, uri: &str, rev: Option<&str>) -> PlugupResult<GitPrefetch> {
        let mut args = vec!["--quiet", "--fetch-submodules", uri];
        if let Some(rev) = rev {
            args.push(rev);
        }

        let stdout = self.exec("nix-prefetch-git", &args).await?;
        parse_git_prefetch(&stdout)
    }

    async fn prefetch_archive(&self, url: &str) -> PlugupResult<String> {
        let stdout = self.exec("nix-prefetch-url", &["--unpack", url]).await?;
        parse_archive_hash(url, &stdout)
    }
}

fn parse_git_prefetch(stdout: &str) -> PlugupResult<GitPrefetch> {
    serde_json::from_str(stdout)
        .map_err(|e| PlugupError::malformed("nix-prefetch-git", format!("unexpected output: {e}")))
}

fn parse_archive_hash(url: &str, stdout: &str) -> PlugupResult<String> {
    let hash = stdout.trim();
    if hash.is_empty() || hash.contains(char::is_whitespace) {
        return Err(PlugupError::malformed(
            format!("nix-prefetch-url {url}"),
            format!("unexpected output '{hash}'"),
        ));
    }
    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_git_metadata() {
        let stdout = r#"{
  "url": "https://gitlab.com/a/b",
  "rev": "0123abcd",
  "date": "2024-03-04T05:06:07+01:00",
  "path": "/nix/store/xyz-b",
  "sha256": "0abc",
  "hash": "sha256-xyz=",
  "fetchLFS": false,
  "fetchSubmodules": true,
  "deepClone": false,
  "leaveDotGit": false
}"#;
        let meta = parse_git_prefetch(stdout).unwrap();
        assert_eq!(meta.rev, "0123abcd");
        assert_eq!(meta.date, "2024-03-04T05:06:07+01:00");
        assert_eq!(meta.sha256, "0abc");
    }

    #[test]
    fn rejects_non_json_git_output() {
        let err = parse_git_prefetch("error: fatal").unwrap_err();
        assert!(matches!(err, PlugupError::MalformedUpstream { .. }));
    }

    #[test]
    fn archive_hash_is_trimmed() {
        assert_eq!(parse_archive_hash("u", "1abc\n").unwrap(), "1abc");
        assert!(parse_archive_hash("u", "\n").is_err());
        assert!(parse_archive_hash("u", "path is /nix/store\n").is_err());
    }

    #[tokio::test]
    async fn missing_tool_is_command_failure() {
        let err = NixPrefetcher::new()
            .exec("plugup-definitely-missing-tool", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, PlugupError::CommandFailed { .. }));
    }
}
