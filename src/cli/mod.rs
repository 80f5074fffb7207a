//! Command line interface

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, OutputFormat};

use crate::markup::ContainerInfo;
use args::ContainerArgs;

impl ContainerArgs {
    /// Container info for `class_name` with these options applied
    pub fn container(&self, class_name: &str, markup_type: &str) -> ContainerInfo {
        let mut container = ContainerInfo::new(class_name).with_markup_type(markup_type);
        if let Some(style) = &self.style {
            container = container.with_style(style);
        }
        if let Some(locale) = &self.locale {
            container = container.with_locale(locale);
        }
        if let Some(variation) = &self.variation {
            container = container.with_variation(variation);
        }
        container
    }
}
