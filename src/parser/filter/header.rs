//! Header section handling for page markup
//!
//! Pages always get a `_header` component so that panels can contribute to
//! `<head>`. If the page has no `<head>`, one is inserted in front of
//! `<body>`.

use super::{FilterContext, FilterResult, MarkupFilter};
use crate::error::TrellisResult;
use crate::markup::{ComponentTag, MarkupElement, TagType, XmlTag};

pub const HEADER_ID: &str = "_header";

#[derive(Debug, Default)]
pub struct HtmlHeaderSectionHandler {
    found_head: bool,
    done: bool,
}

impl HtmlHeaderSectionHandler {
    pub fn new() -> Self {
        Self::default()
    }

    fn synthetic_head(tag_type: TagType, anchor: &ComponentTag) -> ComponentTag {
        let mut head = ComponentTag::new(XmlTag::synthetic("head", None, tag_type, anchor.xml.pos));
        head.xml.line = anchor.xml.line;
        head.xml.column = anchor.xml.column;
        head.modified = true;
        match tag_type {
            TagType::Close => head.open_tag_id = Some(HEADER_ID.to_string()),
            _ => head.id = Some(HEADER_ID.to_string()),
        }
        head
    }
}

impl MarkupFilter for HtmlHeaderSectionHandler {
    fn name(&self) -> &'static str {
        "html-header-section-handler"
    }

    fn process(
        &mut self,
        mut tag: ComponentTag,
        ctx: &mut FilterContext,
    ) -> TrellisResult<FilterResult> {
        if self.done || tag.is_close() {
            return Ok(FilterResult::Keep(tag));
        }

        if tag.is_html("head") {
            self.found_head = true;
            if tag.id.is_none() {
                tag.id = Some(HEADER_ID.to_string());
            }
        } else if tag.is_html("body") {
            self.done = true;
            if !self.found_head {
                ctx.auto_add
                    .push(MarkupElement::Tag(Self::synthetic_head(TagType::Open, &tag)));
                ctx.auto_add
                    .push(MarkupElement::Tag(Self::synthetic_head(TagType::Close, &tag)));
            }
        }

        Ok(FilterResult::Keep(tag))
    }
}
