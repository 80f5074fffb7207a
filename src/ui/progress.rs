//! Spinners and progress bars with plain fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner for a single long-running step
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    fancy: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            fancy: ctx.use_fancy_output(),
        }
    }

    pub fn start(&mut self, message: &str) {
        if self.fancy {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    pub fn stop(&mut self, message: &str) {
        match self.spinner.take() {
            Some(spinner) => spinner.stop(message),
            None => println!("{} {}", style("[OK]").green(), message),
        }
    }

    pub fn stop_error(&mut self, message: &str) {
        match self.spinner.take() {
            Some(spinner) => spinner.error(message),
            None => println!("{} {}", style("[FAIL]").red(), message),
        }
    }
}

/// Progress of `cache warm`: one tick per component class
pub struct WarmProgress {
    bar: Option<ProgressBar>,
}

impl WarmProgress {
    pub fn new(ctx: &UiContext, total: usize) -> Self {
        let bar = ctx.use_fancy_output().then(|| {
            let bar = ProgressBar::new(total as u64);
            if let Ok(bar_style) = ProgressStyle::default_bar()
                .template("  {spinner:.cyan} Loading markup  {bar:20.cyan/dim} {pos}/{len} {msg:.dim}")
            {
                bar.set_style(
                    bar_style
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .progress_chars("━╸─"),
                );
            }
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        });
        Self { bar }
    }

    /// Record that `class` was loaded
    pub fn loaded(&self, class: &str) {
        match &self.bar {
            Some(bar) => {
                bar.set_message(class.to_string());
                bar.inc(1);
            }
            None => println!("  {} {}", style("[OK]").green(), class),
        }
    }

    /// Record that loading `class` failed
    pub fn failed(&self, class: &str, error: &str) {
        match &self.bar {
            Some(bar) => {
                bar.println(format!("  {} {}: {}", style("✗").red(), class, error));
                bar.inc(1);
            }
            None => println!("  {} {}: {}", style("[FAIL]").red(), class, error),
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}
