//! Terminal output for the panelcache CLI
//!
//! Uses `cliclack` for styled steps and spinners, with plain line output
//! when stdout is not a terminal or a CI environment is detected.
//!
//! # Example
//!
//! ```rust,ignore
//! use panelcache::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Fetching panel.html...");
//! spinner.stop("Fetched panel.html");
//!
//! ui::key_value(&ctx, "images", "3");
//! ```

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{intro, key_value, outro_success, remark, section, step_ok_detail, step_warn_hint};
pub use progress::{ResolveBar, TaskSpinner};
