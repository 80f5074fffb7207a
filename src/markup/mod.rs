//! Parsed markup
//!
//! A `Markup` is an immutable sequence of raw text and component tags,
//! tied to the resource it was read from. Once parsed it is shared through
//! the cache as `Arc<Markup>`.

pub mod inherit;
pub mod locator;
pub mod resource;
pub mod tag;

pub use locator::ResourceLocator;
pub use resource::{ComponentClass, ComponentKind, ContainerInfo, MarkupResourceStream};
pub use tag::{Attributes, ComponentTag, TagType, XmlTag};

use crate::error::TrellisResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Default namespace for framework tags and attributes
pub const WICKET_NAMESPACE: &str = "wicket";

/// One element of parsed markup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkupElement {
    /// Text passed through unchanged
    Raw { text: String },
    /// A tag relevant to components
    Tag(ComponentTag),
}

impl MarkupElement {
    pub fn raw(text: impl Into<String>) -> Self {
        Self::Raw { text: text.into() }
    }

    pub fn as_tag(&self) -> Option<&ComponentTag> {
        match self {
            Self::Tag(tag) => Some(tag),
            Self::Raw { .. } => None,
        }
    }

    pub fn to_markup(&self) -> String {
        match self {
            Self::Raw { text } => text.clone(),
            Self::Tag(tag) => tag.to_markup(),
        }
    }
}

/// Parsed markup of one template (possibly merged with its base markup)
#[derive(Debug, Clone)]
pub struct Markup {
    elements: Vec<MarkupElement>,
    resource: Option<Arc<MarkupResourceStream>>,
    wicket_namespace: String,
    encoding: Option<String>,
    xml_declaration: Option<String>,
    loaded_at: DateTime<Utc>,
}

impl Markup {
    pub fn new(resource: Option<Arc<MarkupResourceStream>>) -> Self {
        Self {
            elements: Vec::new(),
            resource,
            wicket_namespace: WICKET_NAMESPACE.to_string(),
            encoding: None,
            xml_declaration: None,
            loaded_at: Utc::now(),
        }
    }

    /// Append an element; adjacent raw text is coalesced
    pub fn add(&mut self, element: MarkupElement) {
        if let MarkupElement::Raw { text } = &element {
            if text.is_empty() {
                return;
            }
            if let Some(MarkupElement::Raw { text: last }) = self.elements.last_mut() {
                last.push_str(text);
                return;
            }
        }
        self.elements.push(element);
    }

    pub fn add_raw(&mut self, text: impl Into<String>) {
        self.add(MarkupElement::raw(text));
    }

    pub fn elements(&self) -> &[MarkupElement] {
        &self.elements
    }

    pub fn get(&self, index: usize) -> Option<&MarkupElement> {
        self.elements.get(index)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn tags(&self) -> impl Iterator<Item = &ComponentTag> {
        self.elements.iter().filter_map(MarkupElement::as_tag)
    }

    pub fn resource(&self) -> Option<&Arc<MarkupResourceStream>> {
        self.resource.as_ref()
    }

    pub(crate) fn set_resource(&mut self, resource: Option<Arc<MarkupResourceStream>>) {
        self.resource = resource;
    }

    /// Location of the backing resource, if any
    pub fn location_as_string(&self) -> Option<String> {
        self.resource.as_ref().map(|r| r.location_as_string())
    }

    pub fn wicket_namespace(&self) -> &str {
        &self.wicket_namespace
    }

    pub(crate) fn set_wicket_namespace(&mut self, namespace: impl Into<String>) {
        self.wicket_namespace = namespace.into();
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    pub(crate) fn set_encoding(&mut self, encoding: Option<String>) {
        self.encoding = encoding;
    }

    pub fn xml_declaration(&self) -> Option<&str> {
        self.xml_declaration.as_deref()
    }

    pub(crate) fn set_xml_declaration(&mut self, declaration: Option<String>) {
        self.xml_declaration = declaration;
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Index of the open tag of the component with the given id
    pub fn find_component_index(&self, id: &str) -> Option<usize> {
        self.elements.iter().position(|e| {
            e.as_tag()
                .is_some_and(|t| !t.is_close() && t.id.as_deref() == Some(id))
        })
    }

    /// Index of the first `<ns:name>` open (or open-close) tag
    pub fn find_wicket_tag(&self, name: &str) -> Option<usize> {
        let ns = &self.wicket_namespace;
        self.elements.iter().position(|e| {
            e.as_tag()
                .is_some_and(|t| !t.is_close() && t.is_wicket_tag(ns, name))
        })
    }

    /// Merge inherited markup into its base; see [`inherit::merge`]
    pub fn merged(derived: &Markup, base: &Markup) -> TrellisResult<Markup> {
        inherit::merge(derived, base)
    }

    /// Component ids in document order, framework-generated ids excluded
    pub fn component_ids(&self) -> Vec<&str> {
        self.tags()
            .filter(|t| !t.is_close())
            .filter_map(|t| t.id.as_deref())
            .filter(|id| !id.starts_with('_'))
            .collect()
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in &self.elements {
            f.write_str(&element.to_markup())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str, id: &str, tag_type: TagType) -> MarkupElement {
        let mut tag = ComponentTag::new(XmlTag::synthetic(name, None, tag_type, 0));
        tag.id = Some(id.to_string());
        tag.modified = true;
        MarkupElement::Tag(tag)
    }

    #[test]
    fn raw_text_is_coalesced() {
        let mut markup = Markup::new(None);
        markup.add_raw("<p>");
        markup.add_raw("hello");
        markup.add_raw("");
        assert_eq!(markup.len(), 1);
        assert_eq!(markup.to_string(), "<p>hello");
    }

    #[test]
    fn finds_components() {
        let mut markup = Markup::new(None);
        markup.add_raw("<body>");
        markup.add(component("span", "name", TagType::Open));
        markup.add_raw("x");
        markup.add(component("span", "name", TagType::Close));
        markup.add(component("head", "_header", TagType::OpenClose));

        assert_eq!(markup.find_component_index("name"), Some(1));
        assert_eq!(markup.find_component_index("missing"), None);
        assert_eq!(markup.component_ids(), vec!["name"]);
        assert_eq!(markup.to_string(), "<body><span>x</span><head/>");
    }

    #[test]
    fn no_resource_has_no_location() {
        let markup = Markup::new(None);
        assert!(markup.location_as_string().is_none());
        assert_eq!(markup.wicket_namespace(), WICKET_NAMESPACE);
    }
}
