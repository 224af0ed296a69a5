//! Terminal output
//!
//! Styled status lines and a fetch progress bar, with plain fallbacks for
//! CI and other non-interactive environments.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{section, step_error_detail, step_info, step_ok, step_ok_detail, step_warn_hint};
pub use progress::FetchProgress;
