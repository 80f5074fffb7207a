//! Checks that open and close tags are balanced

use super::{FilterContext, FilterResult, MarkupFilter};
use crate::error::TrellisResult;
use crate::markup::ComponentTag;

/// HTML elements whose close tag is optional or forbidden
const NO_CLOSE_TAG_REQUIRED: &[&str] = &[
    "area", "base", "basefont", "br", "col", "colgroup", "dd", "dt", "embed", "frame", "hr",
    "img", "input", "isindex", "keygen", "li", "link", "meta", "option", "p", "param", "source",
    "tbody", "td", "tfoot", "th", "thead", "tr", "track", "wbr",
];

#[derive(Debug)]
struct OpenTag {
    qualified_name: String,
    plain_html: bool,
    id: Option<String>,
    line: usize,
    column: usize,
}

impl OpenTag {
    fn may_stay_open(&self) -> bool {
        self.plain_html
            && NO_CLOSE_TAG_REQUIRED.contains(&self.qualified_name.to_ascii_lowercase().as_str())
    }
}

/// Tracks open tags and pairs close tags with them
#[derive(Debug, Default)]
pub struct HtmlHandler {
    stack: Vec<OpenTag>,
}

impl HtmlHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MarkupFilter for HtmlHandler {
    fn name(&self) -> &'static str {
        "html-handler"
    }

    fn process(
        &mut self,
        mut tag: ComponentTag,
        ctx: &mut FilterContext,
    ) -> TrellisResult<FilterResult> {
        if tag.is_open() {
            self.stack.push(OpenTag {
                qualified_name: tag.xml.qualified_name(),
                plain_html: tag.namespace().is_none(),
                id: tag.id.clone(),
                line: tag.xml.line,
                column: tag.xml.column,
            });
        } else if tag.is_close() {
            let name = tag.xml.qualified_name();
            let Some(index) = self
                .stack
                .iter()
                .rposition(|open| open.qualified_name.eq_ignore_ascii_case(&name))
            else {
                return Err(ctx.error(&tag, format!("tag </{}> has no matching open tag", name)));
            };

            if let Some(unclosed) = self.stack[index + 1..].iter().find(|o| !o.may_stay_open()) {
                return Err(ctx.error(
                    &tag,
                    format!(
                        "expected </{}> (opened at line {}, column {}) before </{}>",
                        unclosed.qualified_name, unclosed.line, unclosed.column, name
                    ),
                ));
            }

            self.stack.truncate(index + 1);
            if let Some(open) = self.stack.pop() {
                if tag.open_tag_id.is_none() {
                    tag.open_tag_id = open.id;
                }
            }
        }

        Ok(FilterResult::Keep(tag))
    }

    fn finish(&mut self, ctx: &mut FilterContext) -> TrellisResult<()> {
        if let Some(unclosed) = self.stack.iter().find(|o| !o.may_stay_open()) {
            return Err(crate::error::TrellisError::parse(
                &ctx.location,
                unclosed.line,
                unclosed.column,
                format!("tag <{}> has no close tag", unclosed.qualified_name),
            ));
        }
        self.stack.clear();
        Ok(())
    }
}
