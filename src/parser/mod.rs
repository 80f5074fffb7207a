//! Markup parser
//!
//! Runs the XML pull parser through the markup filter chain and splits the
//! document into raw text and component tags. Text between component tags
//! is kept verbatim, optionally with comments stripped and whitespace
//! compressed.

pub mod filter;
pub mod xml;

pub use filter::{FilterChain, FilterContext, FilterResult, MarkupFilter};
pub use xml::XmlPullParser;

use crate::config::MarkupConfig;
use crate::error::TrellisResult;
use crate::markup::{ComponentTag, Markup, MarkupElement, MarkupResourceStream, WICKET_NAMESPACE};
use filter::{
    BodyOnLoadHandler, HtmlHandler, HtmlHeaderSectionHandler, Processed, TagTypeHandler,
    WicketLinkTagHandler, WicketRemoveTagHandler, WicketTagIdentifier,
};
use std::sync::Arc;
use tracing::trace;

/// Namespace URIs that declare the framework namespace on `<html>`
const WICKET_URIS: &[&str] = &["http://wicket.apache.org", "http://wicket.sourceforge.net"];

const XMLNS: &str = "xmlns:";

/// Parser settings, usually taken from `[markup]` config
#[derive(Debug, Clone)]
pub struct ParserSettings {
    pub strip_comments: bool,
    pub compress_whitespace: bool,
    pub strip_wicket_tags: bool,
    pub default_encoding: String,
    pub automatic_linking: bool,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self::from(&MarkupConfig::default())
    }
}

impl From<&MarkupConfig> for ParserSettings {
    fn from(config: &MarkupConfig) -> Self {
        Self {
            strip_comments: config.strip_comments,
            compress_whitespace: config.compress_whitespace,
            strip_wicket_tags: config.strip_wicket_tags,
            default_encoding: config.default_encoding.clone(),
            automatic_linking: config.automatic_linking,
        }
    }
}

/// Parses one document. Filters keep per-document state, so a parser is
/// consumed by `parse`.
pub struct MarkupParser {
    settings: ParserSettings,
    namespace: String,
    extra_filters: Vec<Box<dyn MarkupFilter>>,
}

impl MarkupParser {
    pub fn new(settings: ParserSettings) -> Self {
        Self {
            settings,
            namespace: WICKET_NAMESPACE.to_string(),
            extra_filters: Vec::new(),
        }
    }

    /// Use a different framework namespace from the start
    pub fn with_wicket_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Append a filter after the standard chain
    pub fn append_filter(&mut self, filter: Box<dyn MarkupFilter>) {
        self.extra_filters.push(filter);
    }

    /// Parse markup that is not backed by a resource
    pub fn parse(self, text: &str) -> TrellisResult<Markup> {
        self.parse_markup(text, None)
    }

    /// Parse the contents of a markup resource
    pub fn parse_resource(
        self,
        text: &str,
        resource: Arc<MarkupResourceStream>,
    ) -> TrellisResult<Markup> {
        self.parse_markup(text, Some(resource))
    }

    fn filter_chain(&mut self, resource: Option<&MarkupResourceStream>) -> FilterChain {
        let mut chain = FilterChain::new();
        chain.push(Box::new(WicketTagIdentifier::new()));
        chain.push(Box::new(TagTypeHandler::new()));
        chain.push(Box::new(HtmlHandler::new()));
        chain.push(Box::new(WicketRemoveTagHandler::new()));
        chain.push(Box::new(WicketLinkTagHandler::new(
            self.settings.automatic_linking,
        )));

        // Handlers that only make sense for markup bound to a component
        if let Some(resource) = resource {
            chain.push(Box::new(BodyOnLoadHandler::new()));
            if resource.markup_class.is_page() {
                chain.push(Box::new(HtmlHeaderSectionHandler::new()));
            }
        }

        for filter in self.extra_filters.drain(..) {
            chain.push(filter);
        }
        chain
    }

    fn parse_markup(
        mut self,
        text: &str,
        resource: Option<Arc<MarkupResourceStream>>,
    ) -> TrellisResult<Markup> {
        let location = resource
            .as_ref()
            .map(|r| r.location_as_string())
            .unwrap_or_else(|| "<string>".to_string());

        let mut chain = self.filter_chain(resource.as_deref());
        trace!("Filter chain for {}: {:?}", location, chain.names());

        let mut markup = Markup::new(resource);
        markup.set_wicket_namespace(&self.namespace);

        let mut xml = XmlPullParser::new(text, &location);
        let mut ctx = FilterContext::new(&location, &self.namespace);
        let mut open_tags: Vec<(String, Option<String>)> = Vec::new();

        while let Some(xml_tag) = xml.next_tag()? {
            for processed in chain.process(ComponentTag::new(xml_tag), &mut ctx)? {
                match processed {
                    Processed::Discarded { end } => xml.set_marker(end),
                    Processed::Tag(mut tag) => {
                        resolve_open_tag(&mut open_tags, &mut tag);
                        self.add_tag(tag, &mut xml, &mut ctx, &mut markup);
                    }
                }
            }
        }
        chain.finish(&mut ctx)?;

        let tail = xml.input_from_marker(None);
        if !tail.is_empty() {
            markup.add_raw(self.clean_raw(tail));
        }

        markup.set_encoding(
            xml.encoding()
                .map(str::to_string)
                .or_else(|| Some(self.settings.default_encoding.clone())),
        );
        markup.set_xml_declaration(xml.xml_declaration().map(str::to_string));

        Ok(markup)
    }

    fn add_tag(
        &self,
        mut tag: ComponentTag,
        xml: &mut XmlPullParser<'_>,
        ctx: &mut FilterContext,
        markup: &mut Markup,
    ) {
        let mut add = tag.id.is_some() || (tag.is_close() && tag.open_tag_id.is_some());

        // <html xmlns:wicket="..."> may redeclare the framework namespace
        let mut replacement = None;
        if tag.is_open() && tag.is_html("html") {
            add |= self.determine_wicket_namespace(&mut tag, ctx, markup);
            if add && tag.id.is_none() {
                replacement = Some(tag.to_markup());
            }
        }

        if add || !ctx.auto_add.is_empty() || tag.modified {
            let text = xml.input_from_marker(Some(tag.xml.pos));
            if !text.is_empty() {
                markup.add_raw(self.clean_raw(text));
            }

            if !add && !ctx.auto_add.is_empty() {
                xml.set_marker(tag.xml.pos);
            }

            for element in ctx.auto_add.drain(..) {
                markup.add(element);
            }
        }

        if add {
            xml.set_marker(tag.xml.end());
            if !tag.ignore {
                match replacement {
                    Some(raw) => markup.add_raw(raw),
                    None => markup.add(MarkupElement::Tag(tag)),
                }
            }
        } else if tag.modified {
            markup.add_raw(tag.to_markup());
            xml.set_marker(tag.xml.end());
        }
    }

    fn determine_wicket_namespace(
        &self,
        tag: &mut ComponentTag,
        ctx: &mut FilterContext,
        markup: &mut Markup,
    ) -> bool {
        let mut declaration = None;
        for (name, value) in tag.attributes().iter() {
            let Some(namespace) = name.strip_prefix(XMLNS) else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() || WICKET_URIS.iter().any(|uri| value.starts_with(uri)) {
                declaration = Some((name.to_string(), namespace.to_string()));
            }
        }

        let Some((attribute, namespace)) = declaration else {
            return false;
        };
        markup.set_wicket_namespace(&namespace);
        ctx.namespace = namespace;

        if self.settings.strip_wicket_tags {
            tag.attributes_mut().remove(&attribute);
            return true;
        }
        false
    }

    fn clean_raw(&self, text: &str) -> String {
        let mut raw = if self.settings.strip_comments {
            remove_comments(text)
        } else {
            text.to_string()
        };
        if self.settings.compress_whitespace {
            raw = compress_whitespace(&raw);
        }
        raw
    }
}

/// Pair a close tag with the id of its open tag as it left the chain.
///
/// Filters after the html handler may assign ids to open tags (body,
/// header, autolinks); their close tags pick those ids up here.
fn resolve_open_tag(open_tags: &mut Vec<(String, Option<String>)>, tag: &mut ComponentTag) {
    let name = tag.xml.qualified_name().to_ascii_lowercase();
    if tag.is_open() {
        open_tags.push((name, tag.id.clone()));
    } else if tag.is_close() {
        if let Some(index) = open_tags.iter().rposition(|(open, _)| *open == name) {
            let (_, id) = open_tags.remove(index);
            open_tags.truncate(index);
            if tag.open_tag_id.is_none() {
                tag.open_tag_id = id;
            }
        }
    }
}

/// Remove `<!-- ... -->` comments; conditional comments are kept
pub fn remove_comments(text: &str) -> String {
    const END_IF: &str = "<![endif]-->";

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("<!--") {
        let comment = &rest[start..];
        if comment.starts_with("<!--[if") {
            match comment.find(END_IF) {
                Some(end) => {
                    let stop = start + end + END_IF.len();
                    out.push_str(&rest[..stop]);
                    rest = &rest[stop..];
                    continue;
                }
                None => break,
            }
        }
        match comment[4..].find("-->") {
            Some(end) => {
                out.push_str(&rest[..start]);
                rest = &rest[start + 4 + end + 3..];
            }
            None => break,
        }
    }

    out.push_str(rest);
    out
}

/// Collapse runs of spaces and tabs to one space, and any run of line
/// breaks (with a space on either side) to a single `\n`
pub fn compress_whitespace(text: &str) -> String {
    let mut spaced = String::with_capacity(text.len());
    let mut in_blank = false;
    for c in text.chars() {
        if c == ' ' || c == '\t' {
            if !in_blank {
                spaced.push(' ');
            }
            in_blank = true;
        } else {
            spaced.push(c);
            in_blank = false;
        }
    }

    let chars: Vec<char> = spaced.chars().collect();
    let is_break = |c: char| c == '\r' || c == '\n';
    let mut out = String::with_capacity(spaced.len());
    let mut i = 0;
    while i < chars.len() {
        let mut j = i;
        let mut matched = false;
        loop {
            let mut k = j;
            if k < chars.len() && chars[k] == ' ' {
                k += 1;
            }
            if k < chars.len() && is_break(chars[k]) {
                k += 1;
                if k < chars.len() && chars[k] == ' ' {
                    k += 1;
                }
                j = k;
                matched = true;
            } else {
                break;
            }
        }

        if matched {
            out.push('\n');
            i = j;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}
