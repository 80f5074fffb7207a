//! Component classes, container info and markup resource streams

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What kind of component a class is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Page,
    Panel,
    Border,
    Container,
}

impl ComponentKind {
    /// Parse a kind name; unknown names fall back to `Container`
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "page" => Self::Page,
            "panel" => Self::Panel,
            "border" => Self::Border,
            _ => Self::Container,
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Page => "page",
            Self::Panel => "panel",
            Self::Border => "border",
            Self::Container => "container",
        };
        write!(f, "{}", name)
    }
}

/// A component class: a dotted name with an optional superclass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentClass {
    pub name: String,
    pub extends: Option<String>,
    pub kind: ComponentKind,
}

impl ComponentClass {
    pub fn new(name: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            name: name.into(),
            extends: None,
            kind,
        }
    }

    pub fn extending(mut self, base: impl Into<String>) -> Self {
        self.extends = Some(base.into());
        self
    }

    /// `shop.catalog.ProductPage` -> `shop.catalog`
    pub fn package(&self) -> &str {
        self.name.rsplit_once('.').map(|(pkg, _)| pkg).unwrap_or("")
    }

    /// `shop.catalog.ProductPage` -> `ProductPage`
    pub fn simple_name(&self) -> &str {
        self.name
            .rsplit_once('.')
            .map(|(_, simple)| simple)
            .unwrap_or(&self.name)
    }

    /// `shop.catalog.ProductPage` -> `shop/catalog/ProductPage`
    pub fn resource_path(&self) -> PathBuf {
        self.name.split('.').collect()
    }

    pub fn is_page(&self) -> bool {
        self.kind == ComponentKind::Page
    }
}

/// The component instance that is asking for markup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainerInfo {
    /// Runtime class of the container
    pub class_name: String,
    pub style: Option<String>,
    /// e.g. `de_CH`
    pub locale: Option<String>,
    pub variation: Option<String>,
    /// Markup type / file extension, e.g. `html`
    pub markup_type: String,
}

impl ContainerInfo {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            style: None,
            locale: None,
            variation: None,
            markup_type: "html".to_string(),
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_variation(mut self, variation: impl Into<String>) -> Self {
        self.variation = Some(variation.into());
        self
    }

    pub fn with_markup_type(mut self, markup_type: impl Into<String>) -> Self {
        self.markup_type = markup_type.into();
        self
    }
}

/// A located markup resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupResourceStream {
    /// Physical file backing the markup
    pub location: PathBuf,
    /// The container the markup was requested for
    pub container: ContainerInfo,
    /// Class whose template this file is (may be an ancestor of the container class)
    pub markup_class: ComponentClass,
    /// Cache key; `None` when caching is disabled
    pub cache_key: Option<String>,
    /// Resource of the inherited (base) markup this one was merged with
    pub base: Option<Arc<MarkupResourceStream>>,
}

impl MarkupResourceStream {
    pub fn new(location: PathBuf, container: ContainerInfo, markup_class: ComponentClass) -> Self {
        Self {
            location,
            container,
            markup_class,
            cache_key: None,
            base: None,
        }
    }

    /// Location as used for the primary cache index
    pub fn location_as_string(&self) -> String {
        self.location.display().to_string()
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn base_markup_resource(&self) -> Option<&Arc<MarkupResourceStream>> {
        self.base.as_ref()
    }
}

impl fmt::Display for MarkupResourceStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({})",
            self.location.display(),
            self.cache_key.as_deref().unwrap_or("uncached")
        )
    }
}
