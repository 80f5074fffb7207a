//! Trellis - component markup loading, parsing and caching
//!
//! Loads HTML templates bound to component classes, parses them through a
//! filter chain, merges inherited markup and caches the result with
//! file-watch invalidation.

pub mod autolink;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod factory;
pub mod markup;
pub mod parser;
pub mod ui;
pub mod watch;

pub use cache::{CacheEntry, MarkupCache};
pub use error::{TrellisError, TrellisResult};
pub use markup::{ContainerInfo, Markup};
