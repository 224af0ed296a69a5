//! CLI command implementations

pub mod add;
pub mod update;

pub use add::execute as add;
pub use update::execute as update;

use crate::cli::args::CommonArgs;
use crate::config::Config;
use crate::current::NixEvaluator;
use crate::plugin::AccessToken;
use crate::render::NixRenderer;
use crate::ui::UiContext;
use crate::updater::{Editor, RunOptions};
use crate::upstream::FetchContext;
use std::sync::Arc;
use tracing::info_span;

/// Per-run options from the command line, falling back to the config file
fn run_options(common: &CommonArgs, config: &Config) -> RunOptions {
    let editor = &config.editor;
    RunOptions {
        input: common.input_names.clone().unwrap_or_else(|| editor.input_path()),
        output: common.out.clone().unwrap_or_else(|| editor.output_path()),
        deprecated: editor.deprecated_path(),
        nixpkgs: common.nixpkgs.clone(),
        proc: common.proc.unwrap_or(config.fetch.proc).max(1),
        token: common.github_token.clone().and_then(AccessToken::new),
        autocommit: !common.no_commit,
    }
}

/// Updater wired to the network, nix and the terminal
fn editor(common: &CommonArgs, config: &Config, ui: &UiContext) -> Editor {
    let span = info_span!("plugup", editor = %config.editor.name);
    let ctx = FetchContext::system(&config.fetch).with_span(span);
    let current = NixEvaluator::new(config.editor.get_plugins.clone(), common.nixpkgs.clone());

    Editor::new(
        config.editor.clone(),
        ctx,
        Arc::new(current),
        Arc::new(NixRenderer::for_editor(&config.editor.name)),
        ui.clone(),
    )
}
