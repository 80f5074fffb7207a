//! Markup filters
//!
//! Every tag produced by the XML pull parser passes through the filter
//! chain in order. A filter may keep the tag (possibly modified), replace it
//! with several tags, or discard it together with the raw text in front of it.

mod body;
mod header;
mod html;
mod identifier;
mod link;
mod remove;
mod tag_type;

pub use body::{BodyOnLoadHandler, BODY_ID};
pub use header::{HtmlHeaderSectionHandler, HEADER_ID};
pub use html::HtmlHandler;
pub use identifier::WicketTagIdentifier;
pub use link::{WicketLinkTagHandler, AUTOLINK_ID};
pub use remove::WicketRemoveTagHandler;
pub use tag_type::TagTypeHandler;

use crate::error::{TrellisError, TrellisResult};
use crate::markup::{ComponentTag, MarkupElement};

/// What a filter did with a tag
#[derive(Debug)]
pub enum FilterResult {
    /// Pass the tag on to the next filter
    Keep(ComponentTag),
    /// Replace the tag with several tags, each passed on to the next filter
    Replace(Vec<ComponentTag>),
    /// Drop the tag along with any raw text since the previous element
    Discard,
}

/// State shared by all filters while one document is parsed
#[derive(Debug)]
pub struct FilterContext {
    /// Location of the markup, for error messages
    pub location: String,
    /// Current framework namespace (`wicket` unless redeclared on `<html>`)
    pub namespace: String,
    /// Elements to insert in front of the current tag
    pub auto_add: Vec<MarkupElement>,
}

impl FilterContext {
    pub fn new(location: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            namespace: namespace.into(),
            auto_add: Vec::new(),
        }
    }

    /// Parse error positioned at `tag`
    pub fn error(&self, tag: &ComponentTag, message: impl Into<String>) -> TrellisError {
        TrellisError::parse(&self.location, tag.xml.line, tag.xml.column, message)
    }
}

/// A stage of the markup filter chain
pub trait MarkupFilter: Send {
    /// Short name for logging
    fn name(&self) -> &'static str;

    /// Process one tag
    fn process(&mut self, tag: ComponentTag, ctx: &mut FilterContext)
        -> TrellisResult<FilterResult>;

    /// Called once the input is exhausted
    fn finish(&mut self, _ctx: &mut FilterContext) -> TrellisResult<()> {
        Ok(())
    }
}

/// Output of the chain for one input tag
#[derive(Debug)]
pub enum Processed {
    Tag(ComponentTag),
    /// A discarded tag ending at the given byte offset
    Discarded { end: usize },
}

/// Ordered list of filters
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn MarkupFilter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: Box<dyn MarkupFilter>) {
        self.filters.push(filter);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run one tag through every filter
    pub fn process(
        &mut self,
        tag: ComponentTag,
        ctx: &mut FilterContext,
    ) -> TrellisResult<Vec<Processed>> {
        let mut current = vec![Processed::Tag(tag)];

        for filter in &mut self.filters {
            let mut next = Vec::with_capacity(current.len());
            for item in current {
                match item {
                    Processed::Tag(tag) => {
                        let end = tag.xml.end();
                        match filter.process(tag, ctx)? {
                            FilterResult::Keep(tag) => next.push(Processed::Tag(tag)),
                            FilterResult::Replace(tags) => {
                                next.extend(tags.into_iter().map(Processed::Tag))
                            }
                            FilterResult::Discard => next.push(Processed::Discarded { end }),
                        }
                    }
                    discarded => next.push(discarded),
                }
            }
            current = next;
        }

        Ok(current)
    }

    pub fn finish(&mut self, ctx: &mut FilterContext) -> TrellisResult<()> {
        for filter in &mut self.filters {
            filter.finish(ctx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::markup::{TagType, XmlTag};
    use crate::parser::xml::XmlPullParser;

    /// Tokenize `input` into component tags without any filtering
    pub fn component_tags(input: &str) -> Vec<ComponentTag> {
        let mut parser = XmlPullParser::new(input, "test.html");
        let mut out = Vec::new();
        while let Some(tag) = parser.next_tag().unwrap() {
            out.push(ComponentTag::new(tag));
        }
        out
    }

    /// Run `input` through a chain, collecting surviving tags
    pub fn run(chain: &mut FilterChain, input: &str) -> TrellisResult<Vec<ComponentTag>> {
        let mut ctx = FilterContext::new("test.html", "wicket");
        let mut out = Vec::new();
        for tag in component_tags(input) {
            for processed in chain.process(tag, &mut ctx)? {
                if let Processed::Tag(tag) = processed {
                    out.push(tag);
                }
            }
        }
        chain.finish(&mut ctx)?;
        Ok(out)
    }

    pub fn synthetic(name: &str, tag_type: TagType) -> ComponentTag {
        ComponentTag::new(XmlTag::synthetic(name, None, tag_type, 0))
    }
}
