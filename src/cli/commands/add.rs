//! Add command - declare and package new plugins

use super::{editor, run_options};
use crate::cli::args::{AddArgs, CommonArgs};
use crate::config::Config;
use crate::error::PlugupResult;
use crate::ui::{self, UiContext};

/// Execute the add command
pub async fn execute(args: AddArgs, common: &CommonArgs, config: &Config) -> PlugupResult<()> {
    let ctx = UiContext::detect();
    let opts = run_options(common, config);

    ui::section(&ctx, &format!("Adding to {}", config.editor.attr_path()));
    editor(common, config, &ctx).add(&opts, &args.plugins).await?;
    ui::step_ok(&ctx, &format!("Added {} plugin(s)", args.plugins.len()));
    Ok(())
}
