//! Automatic linking inside `<wicket:link>` regions
//!
//! Relative `href`/`src` attributes of links, images and scripts inside a
//! `<wicket:link>` region are turned into `_autolink_` components so they
//! can later be resolved against the component's package. A region may opt
//! out with `autolink="false"`; with automatic linking enabled every link in
//! the document is treated as if it were inside a region.

use super::{FilterContext, FilterResult, MarkupFilter};
use crate::error::TrellisResult;
use crate::markup::ComponentTag;

/// Component id given to automatically linked tags
pub const AUTOLINK_ID: &str = "_autolink_";

/// Tag name and the attribute that carries its link
const LINK_ATTRIBUTES: &[(&str, &str)] = &[
    ("a", "href"),
    ("link", "href"),
    ("img", "src"),
    ("script", "src"),
];

#[derive(Debug)]
pub struct WicketLinkTagHandler {
    automatic_linking: bool,
    regions: Vec<bool>,
}

impl WicketLinkTagHandler {
    pub fn new(automatic_linking: bool) -> Self {
        Self {
            automatic_linking,
            regions: Vec::new(),
        }
    }

    fn enabled(&self) -> bool {
        self.regions
            .last()
            .copied()
            .unwrap_or(self.automatic_linking)
    }

    /// The link attribute of a tag that is eligible for automatic linking
    fn link_attribute(tag: &ComponentTag) -> Option<&'static str> {
        if tag.namespace().is_some() {
            return None;
        }
        LINK_ATTRIBUTES
            .iter()
            .find(|(name, _)| tag.name().eq_ignore_ascii_case(name))
            .map(|(_, attribute)| *attribute)
    }
}

/// Only relative links are resolved: no scheme, no fragment-only links
pub fn is_relative_link(value: &str) -> bool {
    !value.is_empty() && !value.contains(':') && !value.starts_with('#')
}

impl MarkupFilter for WicketLinkTagHandler {
    fn name(&self) -> &'static str {
        "wicket-link-tag-handler"
    }

    fn process(
        &mut self,
        mut tag: ComponentTag,
        ctx: &mut FilterContext,
    ) -> TrellisResult<FilterResult> {
        if tag.is_wicket_tag(&ctx.namespace, "link") {
            if tag.is_open() {
                let enabled = tag
                    .attributes()
                    .get("autolink")
                    .map(|v| !v.eq_ignore_ascii_case("false"))
                    .unwrap_or(true);
                self.regions.push(enabled);
            } else if tag.is_close() {
                self.regions.pop();
            }
            return Ok(FilterResult::Keep(tag));
        }

        if tag.is_close() || tag.id.is_some() || !self.enabled() {
            return Ok(FilterResult::Keep(tag));
        }

        let linked = Self::link_attribute(&tag)
            .and_then(|attribute| tag.attributes().get(attribute))
            .is_some_and(is_relative_link);
        if linked {
            tag.id = Some(AUTOLINK_ID.to_string());
            tag.autolink = true;
        }

        Ok(FilterResult::Keep(tag))
    }
}
