//! Drops `<wicket:remove>` regions
//!
//! Designers put preview-only markup inside `<wicket:remove>`; none of it,
//! tags or text, ends up in the parsed markup.

use super::{FilterContext, FilterResult, MarkupFilter};
use crate::error::TrellisResult;
use crate::markup::ComponentTag;

#[derive(Debug, Default)]
pub struct WicketRemoveTagHandler {
    inside: bool,
}

impl WicketRemoveTagHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MarkupFilter for WicketRemoveTagHandler {
    fn name(&self) -> &'static str {
        "wicket-remove-tag-handler"
    }

    fn process(
        &mut self,
        mut tag: ComponentTag,
        ctx: &mut FilterContext,
    ) -> TrellisResult<FilterResult> {
        let is_remove = tag.is_wicket_tag(&ctx.namespace, "remove");

        if self.inside {
            if is_remove {
                if tag.is_close() {
                    self.inside = false;
                } else {
                    return Err(ctx.error(
                        &tag,
                        format!("<{}:remove> must not be nested", ctx.namespace),
                    ));
                }
            }
            return Ok(FilterResult::Discard);
        }

        if is_remove {
            if tag.is_open_close() {
                return Err(ctx.error(
                    &tag,
                    format!(
                        "<{}:remove/> has no body; use an open and a close tag",
                        ctx.namespace
                    ),
                ));
            }
            if tag.is_open() {
                tag.ignore = true;
                self.inside = true;
            }
        }

        Ok(FilterResult::Keep(tag))
    }

    fn finish(&mut self, ctx: &mut FilterContext) -> TrellisResult<()> {
        if self.inside {
            return Err(crate::error::TrellisError::markup(
                &ctx.location,
                format!("<{}:remove> is never closed", ctx.namespace),
            ));
        }
        Ok(())
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
        chain.push(Box::new(WicketRemoveTagHandler::new()));
        chain
    }

    #[test]
    fn region_is_discarded() {
        let tags = run(
            &mut chain(),
            "<b>keep</b><wicket:remove><span wicket:id=\"x\">preview</span></wicket:remove><i>",
        )
        .unwrap();

        let names: Vec<_> = tags.iter().map(|t| t.name().to_string()).collect();
        assert_eq!(names, vec!["b", "b", "remove", "i"]);
        assert!(tags[2].ignore);
    }

    #[test]
    fn nesting_is_an_error() {
        let err = run(
            &mut chain(),
            "<wicket:remove><wicket:remove></wicket:remove></wicket:remove>",
        )
        .unwrap_err();
        assert!(err.to_string().contains("must not be nested"));
    }

    #[test]
    fn open_close_is_an_error() {
        assert!(run(&mut chain(), "<wicket:remove/>").is_err());
    }

    #[test]
    fn unclosed_region_is_an_error() {
        let err = run(&mut chain(), "<wicket:remove>text").unwrap_err();
        assert!(err.to_string().contains("never closed"));
    }
}
