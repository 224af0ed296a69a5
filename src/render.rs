//! Rendering resolved plugins into the generated nix file

use crate::error::PlugupResult;
use crate::persist::write_atomic;
use crate::plugin::{Plugin, PluginDesc};
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

/// Turns the resolved plugin list into the build description
pub trait Renderer: Send + Sync {
    /// Render `plugins`, already sorted by normalized name
    fn render(&self, plugins: &[(PluginDesc, Plugin)]) -> PlugupResult<String>;

    /// Render and atomically replace `path`
    fn write(&self, plugins: &[(PluginDesc, Plugin)], path: &Path) -> PlugupResult<()> {
        let content = self.render(plugins)?;
        write_atomic(path, &content)?;
        info!("Updated {} with {} plugins", path.display(), plugins.len());
        Ok(())
    }
}

/// Nix overlay with one derivation per plugin
#[derive(Debug, Clone)]
pub struct NixRenderer {
    builder: String,
}

impl NixRenderer {
    /// Renderer using the `build<Editor>Plugin` builder of `editor`
    pub fn for_editor(editor: &str) -> Self {
        let mut chars = editor.chars();
        let capitalized: String = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        Self {
            builder: format!("build{capitalized}Plugin"),
        }
    }
}

impl Renderer for NixRenderer {
    fn render(&self, plugins: &[(PluginDesc, Plugin)]) -> PlugupResult<String> {
        let mut out = String::new();
        out.push_str("# GENERATED by plugup. Do not edit!\n");
        let _ = writeln!(out, "{{ lib, {}, fetchFromGitHub, fetchgit }}:", self.builder);
        out.push_str("\nfinal: prev:\n{\n");

        for (desc, plugin) in plugins {
            let _ = write!(
                out,
                r#"
  {name} = {builder} {{
    pname = "{pname}";
    version = "{version}";
    src = {src};
    meta.homepage = "{homepage}";
    meta.hydraPlatforms = [ ];
  }};
"#,
                name = plugin.normalized_name(),
                builder = self.builder,
                pname = plugin.name,
                version = plugin.version()?,
                src = desc.repo.as_build_expression(plugin),
                homepage = desc.repo.uri(),
            );
        }

        out.push_str("\n}\n");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use tempfile::TempDir;

    fn resolved() -> Vec<(PluginDesc, Plugin)> {
        let date = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .unwrap();
        vec![(
            PluginDesc::from_record("foo/bar.nvim", "HEAD", "", None),
            Plugin::new("bar.nvim", "abc123", false, "sha-xyz", Some(date)),
        )]
    }

    #[test]
    fn builder_follows_editor() {
        assert_eq!(NixRenderer::for_editor("kakoune").builder, "buildKakounePlugin");
    }

    #[test]
    fn renders_derivation() {
        let nix = NixRenderer::for_editor("vim").render(&resolved()).unwrap();
        assert!(nix.starts_with("# GENERATED by plugup"));
        assert!(nix.contains("{ lib, buildVimPlugin, fetchFromGitHub, fetchgit }:"));
        assert!(nix.contains("  bar-nvim = buildVimPlugin {\n    pname = \"bar.nvim\";"));
        assert!(nix.contains("version = \"2024-01-01\";"));
        assert!(nix.contains("src = fetchFromGitHub {"));
        assert!(nix.contains("meta.homepage = \"https://github.com/foo/bar.nvim/\";"));
    }

    #[test]
    fn undated_plugin_cannot_be_rendered() {
        let plugins = vec![(
            PluginDesc::from_record("foo/bar", "HEAD", "", None),
            Plugin::new("bar", "abc", false, "sha", None),
        )];
        assert!(NixRenderer::for_editor("vim").render(&plugins).is_err());
    }

    #[test]
    fn write_replaces_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("generated.nix");
        std::fs::write(&path, "old").unwrap();

        NixRenderer::for_editor("vim").write(&resolved(), &path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("bar-nvim"));
    }
}
