//! Terminal output
//!
//! Uses `cliclack` and `indicatif` on an interactive terminal, with a plain
//! fallback for pipes and CI.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{
    key_value, remark, section, step_error_detail, step_info, step_ok, step_ok_detail,
    step_warn_hint,
};
pub use progress::{TaskSpinner, WarmProgress};
