//! Expands `<span wicket:id="x"/>` into `<span wicket:id="x"></span>`
//!
//! Browsers do not accept the short form for elements that need a body, so
//! component tags of those elements are rewritten as an open tag followed by
//! a synthetic close tag.

use super::{FilterContext, FilterResult, MarkupFilter};
use crate::error::TrellisResult;
use crate::markup::{ComponentTag, TagType, XmlTag};

/// Elements that must be written as an open/close pair
const REQUIRES_CLOSE_TAG: &[&str] = &[
    "a", "b", "button", "div", "em", "form", "h1", "h2", "h3", "h4", "h5", "h6", "i", "label",
    "li", "ol", "option", "p", "script", "select", "span", "strong", "style", "table", "td",
    "textarea", "th", "title", "tr", "ul",
];

#[derive(Debug, Default)]
pub struct TagTypeHandler;

impl TagTypeHandler {
    pub fn new() -> Self {
        Self
    }

    fn requires_close_tag(tag: &ComponentTag) -> bool {
        tag.namespace().is_none()
            && REQUIRES_CLOSE_TAG.contains(&tag.name().to_ascii_lowercase().as_str())
    }
}

impl MarkupFilter for TagTypeHandler {
    fn name(&self) -> &'static str {
        "tag-type-handler"
    }

    fn process(
        &mut self,
        mut tag: ComponentTag,
        _ctx: &mut FilterContext,
    ) -> TrellisResult<FilterResult> {
        if !tag.is_open_close() || tag.id.is_none() || !Self::requires_close_tag(&tag) {
            return Ok(FilterResult::Keep(tag));
        }

        tag.xml.tag_type = TagType::Open;
        tag.modified = true;

        let mut close = ComponentTag::new(XmlTag::synthetic(
            &tag.xml.name,
            tag.namespace(),
            TagType::Close,
            tag.xml.end(),
        ));
        close.xml.line = tag.xml.line;
        close.xml.column = tag.xml.column;
        close.open_tag_id = tag.id.clone();
        close.modified = true;

        Ok(FilterResult::Replace(vec![tag, close]))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::run;
    use super::super::{FilterChain, WicketTagIdentifier};
    use super::*;

    fn chain() -> FilterChain {
        let mut chain = FilterChain::new();
        chain.push(Box::new(WicketTagIdentifier::new()));
        chain.push(Box::new(TagTypeHandler::new()));
        chain
    }

    #[test]
    fn expands_component_span() {
        let tags = run(&mut chain(), "<span wicket:id=\"label\"/>").unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].to_markup(), "<span wicket:id=\"label\">");
        assert_eq!(tags[1].to_markup(), "</span>");
        assert_eq!(tags[1].open_tag_id.as_deref(), Some("label"));
        assert_eq!(tags[1].xml.pos, tags[0].xml.end());
    }

    #[test]
    fn leaves_void_elements_alone() {
        let tags = run(&mut chain(), "<input wicket:id=\"field\"/><br/>").unwrap();
        assert_eq!(tags.len(), 2);
        assert!(tags.iter().all(|t| t.is_open_close()));
    }

    #[test]
    fn leaves_plain_html_alone() {
        let tags = run(&mut chain(), "<span/>").unwrap();
        assert_eq!(tags.len(), 1);
        assert!(!tags[0].modified);
    }
}
