//! Update command - refresh all or some plugins

use super::{editor, run_options};
use crate::cli::args::{CommonArgs, UpdateArgs};
use crate::config::Config;
use crate::error::PlugupResult;
use crate::ui::{self, UiContext};

/// Execute the update command
pub async fn execute(args: UpdateArgs, common: &CommonArgs, config: &Config) -> PlugupResult<()> {
    let ctx = UiContext::detect();
    let opts = run_options(common, config);

    ui::section(&ctx, &format!("Updating {}", config.editor.attr_path()));
    let redirects = editor(common, config, &ctx).update(&opts, &args.names).await?;

    if redirects.is_empty() {
        ui::step_ok(&ctx, "Plugins are up to date");
    } else {
        ui::step_ok_detail(
            &ctx,
            "Plugins are up to date",
            &format!("{} repositories moved", redirects.len()),
        );
    }
    Ok(())
}
