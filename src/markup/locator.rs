//! Locating template files for a component class
//!
//! Candidates are tried with styles as the outer loop and locales as the
//! inner loop, most specific first:
//!
//! | Style | Locale | Candidate |
//! |-------|--------|-----------|
//! | `variation_style` | `de_CH` | `Home_blue_dark_de_CH.html` |
//! | `variation_style` | `de` | `Home_blue_dark_de.html` |
//! | ... | | |
//! | none | none | `Home.html` |

use super::resource::{ComponentClass, ContainerInfo};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Finds template files under a list of resource roots
#[derive(Debug, Clone, Default)]
pub struct ResourceLocator {
    roots: Vec<PathBuf>,
}

impl ResourceLocator {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Locate the template of `class` for `container`
    pub fn locate(&self, class: &ComponentClass, container: &ContainerInfo) -> Option<PathBuf> {
        let base = class.resource_path();
        let candidates = candidate_names(&base, container);

        for root in &self.roots {
            for candidate in &candidates {
                let path = root.join(candidate);
                if path.is_file() {
                    debug!("Located markup for {}: {}", class.name, path.display());
                    return Some(path);
                }
            }
        }
        None
    }
}

/// All candidate relative paths in lookup order
pub fn candidate_names(base: &Path, container: &ContainerInfo) -> Vec<PathBuf> {
    let styles = style_suffixes(container);
    let locales = locale_suffixes(container.locale.as_deref());
    let stem = base.to_string_lossy();

    let mut names = Vec::with_capacity(styles.len() * locales.len());
    for style in &styles {
        for locale in &locales {
            names.push(PathBuf::from(format!(
                "{}{}{}.{}",
                stem, style, locale, container.markup_type
            )));
        }
    }
    names
}

fn style_suffixes(container: &ContainerInfo) -> Vec<String> {
    let mut out = Vec::new();
    match (&container.variation, &container.style) {
        (Some(variation), Some(style)) => {
            out.push(format!("_{}_{}", variation, style));
            out.push(format!("_{}", style));
        }
        (Some(variation), None) => out.push(format!("_{}", variation)),
        (None, Some(style)) => out.push(format!("_{}", style)),
        (None, None) => {}
    }
    out.push(String::new());
    out
}

fn locale_suffixes(locale: Option<&str>) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(locale) = locale.filter(|l| !l.is_empty()) {
        let parts: Vec<&str> = locale.split('_').collect();
        for len in (1..=parts.len()).rev() {
            out.push(format!("_{}", parts[..len].join("_")));
        }
    }
    out.push(String::new());
    out
}
