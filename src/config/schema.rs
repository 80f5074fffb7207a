//! Configuration schema for trellis
//!
//! Configuration is stored at `~/.config/trellis/config.toml`, optionally
//! overlaid by a project-local `.trellis.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Markup parser settings
    pub markup: MarkupConfig,

    /// Markup cache settings
    pub cache: CacheConfig,

    /// Where markup templates live
    pub resources: ResourcesConfig,

    /// Component class hierarchy
    pub components: Vec<ComponentConfig>,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Markup parser settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkupConfig {
    /// Remove `<!-- ... -->` comments from raw markup
    pub strip_comments: bool,

    /// Collapse runs of spaces/tabs and blank lines
    pub compress_whitespace: bool,

    /// Remove the `xmlns:wicket` declaration from the `<html>` tag
    pub strip_wicket_tags: bool,

    /// Encoding assumed when the markup has no xml declaration
    pub default_encoding: String,

    /// Treat every link as if it were inside `<wicket:link>`
    pub automatic_linking: bool,

    /// Template file extension (markup type)
    pub extension: String,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            strip_comments: false,
            compress_whitespace: false,
            strip_wicket_tags: false,
            default_encoding: "UTF-8".to_string(),
            automatic_linking: false,
            extension: "html".to_string(),
        }
    }
}

/// Markup cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache parsed markup (disabled = every lookup parses)
    pub enabled: bool,

    /// Watch template files and evict on change
    pub watch: bool,

    /// Poll interval of the modification watcher
    pub poll_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            watch: true,
            poll_interval_ms: 1000,
        }
    }
}

/// Markup resource roots
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
    /// Directories searched for templates, in order
    pub roots: Vec<PathBuf>,
}

/// A component class declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// Fully qualified class name, e.g. `shop.catalog.ProductPage`
    pub name: String,

    /// Superclass name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// Component kind: page, panel, border or container
    #[serde(default = "default_kind")]
    pub kind: String,
}

fn default_kind() -> String {
    "container".to_string()
}
