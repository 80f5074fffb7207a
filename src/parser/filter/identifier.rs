//! Identifies component tags: `wicket:id` attributes and framework tags

use super::{FilterContext, FilterResult, MarkupFilter};
use crate::error::TrellisResult;
use crate::markup::ComponentTag;

/// Framework tag names understood inside the wicket namespace
const KNOWN_TAGS: &[&str] = &[
    "body",
    "border",
    "child",
    "component",
    "container",
    "enclosure",
    "extend",
    "fragment",
    "head",
    "label",
    "link",
    "message",
    "panel",
    "param",
    "remove",
];

/// Assigns component ids from `wicket:id` and to framework tags
#[derive(Debug, Default)]
pub struct WicketTagIdentifier;

impl WicketTagIdentifier {
    pub fn new() -> Self {
        Self
    }

    pub fn is_known_tag(name: &str) -> bool {
        KNOWN_TAGS.contains(&name.to_ascii_lowercase().as_str())
    }
}

impl MarkupFilter for WicketTagIdentifier {
    fn name(&self) -> &'static str {
        "wicket-tag-identifier"
    }

    fn process(
        &mut self,
        mut tag: ComponentTag,
        ctx: &mut FilterContext,
    ) -> TrellisResult<FilterResult> {
        let id_attribute = format!("{}:id", ctx.namespace);
        let id = tag
            .attributes()
            .get(&id_attribute)
            .map(|value| value.trim().to_string());
        if let Some(id) = id {
            if id.is_empty() {
                return Err(ctx.error(
                    &tag,
                    format!("the {} attribute value must not be empty", id_attribute),
                ));
            }
            tag.id = Some(id);
        }

        if tag.is_in_namespace(&ctx.namespace) {
            if !Self::is_known_tag(tag.name()) {
                return Err(ctx.error(
                    &tag,
                    format!("unknown tag <{}:{}>", ctx.namespace, tag.name()),
                ));
            }
            if tag.id.is_none() {
                tag.id = Some(format!("_{}", tag.name().to_ascii_lowercase()));
            }
        }

        Ok(FilterResult::Keep(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::run;
    use super::super::FilterChain;
    use super::*;

    fn chain() -> FilterChain {
        let mut chain = FilterChain::new();
        chain.push(Box::new(WicketTagIdentifier::new()));
        chain
    }

    #[test]
    fn assigns_component_ids() {
        let tags = run(&mut chain(), "<span wicket:id=\" name \">x</span><p>").unwrap();
        assert_eq!(tags[0].id.as_deref(), Some("name"));
        assert_eq!(tags[1].id, None);
        assert_eq!(tags[2].id, None);
    }

    #[test]
    fn framework_tags_get_generated_ids() {
        let tags = run(&mut chain(), "<wicket:panel></wicket:panel>").unwrap();
        assert_eq!(tags[0].id.as_deref(), Some("_panel"));
        assert_eq!(tags[1].id.as_deref(), Some("_panel"));
    }

    #[test]
    fn empty_id_is_rejected() {
        let err = run(&mut chain(), "<span wicket:id=\"\">").unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn unknown_framework_tag_is_rejected() {
        let err = run(&mut chain(), "<wicket:bogus>").unwrap_err();
        assert!(err.to_string().contains("unknown tag <wicket:bogus>"));
    }

    #[test]
    fn other_namespaces_pass_through() {
        let tags = run(&mut chain(), "<svg:rect wicket:id=\"r\"/>").unwrap();
        assert_eq!(tags[0].id.as_deref(), Some("r"));
    }
}
