//! Turns `<body>` into a component so containers can contribute `onload`

use super::{FilterContext, FilterResult, MarkupFilter};
use crate::error::TrellisResult;
use crate::markup::ComponentTag;

pub const BODY_ID: &str = "_body";

#[derive(Debug, Default)]
pub struct BodyOnLoadHandler;

impl BodyOnLoadHandler {
    pub fn new() -> Self {
        Self
    }
}

impl MarkupFilter for BodyOnLoadHandler {
    fn name(&self) -> &'static str {
        "body-onload-handler"
    }

    fn process(
        &mut self,
        mut tag: ComponentTag,
        _ctx: &mut FilterContext,
    ) -> TrellisResult<FilterResult> {
        if tag.is_html("body") && !tag.is_close() && tag.id.is_none() {
            tag.id = Some(BODY_ID.to_string());
        }
        Ok(FilterResult::Keep(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::run;
    use super::super::FilterChain;
    use super::*;

    #[test]
    fn body_becomes_component() {
        let mut chain = FilterChain::new();
        chain.push(Box::new(BodyOnLoadHandler::new()));
        let tags = run(&mut chain, "<body onload=\"init()\"></body>").unwrap();
        assert_eq!(tags[0].id.as_deref(), Some(BODY_ID));
        assert_eq!(tags[1].id, None);
    }
}
