//! Staging and committing updated files with `git`

use crate::error::{PlugupError, PlugupResult};
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::debug;

/// A git working tree
#[derive(Debug, Clone)]
pub struct GitRepo {
    root: PathBuf,
}

impl GitRepo {
    /// Find the working tree containing `dir`
    pub async fn discover(dir: &Path) -> PlugupResult<Self> {
        let output = git(dir, &["rev-parse", "--show-toplevel"]).await?;
        if !output.status.success() {
            return Err(PlugupError::NotInGitRepo(dir.to_path_buf()));
        }

        let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!("Using git repository at {}", root);
        Ok(Self {
            root: PathBuf::from(root),
        })
    }

    /// Top-level directory of the working tree
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stage `files` and commit them with `message`.
    ///
    /// Returns false without committing when the staged tree matches `HEAD`.
    pub async fn commit(&self, message: &str, files: &[PathBuf]) -> PlugupResult<bool> {
        let mut add = vec!["add".to_string(), "--".to_string()];
        for file in files {
            let absolute = std::path::absolute(file)
                .map_err(|e| PlugupError::io(format!("resolving {}", file.display()), e))?;
            add.push(absolute.display().to_string());
        }
        let add: Vec<&str> = add.iter().map(String::as_str).collect();
        self.checked(&add).await?;

        let diff = git(&self.root, &["diff", "--cached", "--quiet", "HEAD"]).await?;
        match diff.status.code() {
            Some(0) => return Ok(false),
            Some(1) => {}
            _ => {
                return Err(PlugupError::command_exec(
                    "git diff --cached --quiet HEAD",
                    String::from_utf8_lossy(&diff.stderr).trim(),
                ))
            }
        }

        self.checked(&["commit", "--quiet", "-m", message]).await?;
        Ok(true)
    }

    async fn checked(&self, args: &[&str]) -> PlugupResult<()> {
        let output = git(&self.root, args).await?;
        if !output.status.success() {
            return Err(PlugupError::command_exec(
                format!("git {}", args.join(" ")),
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }
        Ok(())
    }
}

async fn git(dir: &Path, args: &[&str]) -> PlugupResult<Output> {
    debug!("Running git {} in {}", args.join(" "), dir.display());
    Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| PlugupError::command_failed(format!("git {}", args.join(" ")), e))
}
