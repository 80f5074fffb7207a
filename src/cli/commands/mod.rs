//! CLI command implementations

pub mod cache;
pub mod completions;
pub mod config;
pub mod inspect;
pub mod parse;
pub mod watch;

pub use cache::execute as cache;
pub use completions::execute as completions;
pub use config::execute as config;
pub use inspect::execute as inspect;
pub use parse::execute as parse;
pub use watch::execute as watch;
