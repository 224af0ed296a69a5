//! Progress indicators with CI fallback

use super::context::UiContext;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress bar for a batch of plugin resolutions.
///
/// Draws an indicatif bar in interactive mode; in CI it stays hidden and
/// per-plugin progress is left to the log.
pub struct FetchProgress {
    bar: Option<ProgressBar>,
}

impl FetchProgress {
    /// Start a bar counting `total` plugins
    pub fn new(ctx: &UiContext, total: u64) -> Self {
        if !ctx.use_fancy_output() {
            return Self { bar: None };
        }

        let bar = ProgressBar::new(total);
        // Keeps the default style if the template is rejected
        if let Ok(style) = ProgressStyle::default_bar()
            .template("  {spinner:.cyan} Fetching  {bar:20.cyan/dim} {pos}/{len}  {elapsed:.dim}")
        {
            bar.set_style(
                style
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                    .progress_chars("━╸─"),
            );
        }
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar: Some(bar) }
    }

    /// Handle for the orchestrator to tick
    pub fn bar(&self) -> Option<ProgressBar> {
        self.bar.clone()
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}
