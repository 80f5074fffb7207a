//! Markup inheritance
//!
//! A derived template wraps its content in `<wicket:extend>`; the base
//! template marks the insertion point with `<wicket:child>`. Merging copies
//! the base markup and replaces the child region with the extend region.
//! `<wicket:head>` sections of the derived markup are moved in front of the
//! base markup's `</head>`.

use super::{ComponentTag, Markup, MarkupElement, MarkupResourceStream, TagType, XmlTag};
use crate::error::{TrellisError, TrellisResult};
use std::sync::Arc;

/// Whether the markup extends a base markup
pub fn is_inherited(markup: &Markup) -> bool {
    markup.find_wicket_tag("extend").is_some()
}

/// Merge a derived markup into its base markup
pub fn merge(derived: &Markup, base: &Markup) -> TrellisResult<Markup> {
    let location = derived
        .location_as_string()
        .unwrap_or_else(|| "<string>".to_string());

    let extend = region(derived, "extend").ok_or_else(|| {
        TrellisError::markup(&location, "inherited markup has no <wicket:extend> region")
    })?;

    let base_location = base
        .location_as_string()
        .unwrap_or_else(|| "<string>".to_string());
    let child_start = innermost_child(base).ok_or_else(|| {
        TrellisError::markup(
            &base_location,
            "base markup of inherited markup has no <wicket:child> tag",
        )
    })?;

    let head_sections = all_regions(derived, "head");

    let mut merged = Markup::new(derived.resource().map(|resource| {
        Arc::new(MarkupResourceStream {
            base: base.resource().cloned(),
            ..(**resource).clone()
        })
    }));
    merged.set_wicket_namespace(derived.wicket_namespace());
    merged.set_encoding(base.encoding().map(str::to_string));
    merged.set_xml_declaration(base.xml_declaration().map(str::to_string));

    let elements = base.elements();
    let mut index = 0;
    while index < child_start {
        let element = &elements[index];
        if is_head_close(element) {
            for (start, end) in &head_sections {
                for e in &derived.elements()[*start..=*end] {
                    merged.add(e.clone());
                }
            }
        }
        merged.add(element.clone());
        index += 1;
    }

    let child = elements[child_start]
        .as_tag()
        .cloned()
        .ok_or_else(|| TrellisError::Internal("child position is not a tag".to_string()))?;

    // Default content of an open child tag is replaced by the extend region
    let resume_at = if child.is_open_close() {
        child_start + 1
    } else {
        matching_close(base, child_start, "child").ok_or_else(|| {
            TrellisError::markup(&base_location, "<wicket:child> has no close tag")
        })? + 1
    };

    let mut open_child = child.clone();
    if open_child.is_open_close() {
        open_child.xml.tag_type = TagType::Open;
        open_child.modified = true;
    }
    merged.add(MarkupElement::Tag(open_child));

    let (extend_start, extend_end) = extend;
    for element in &derived.elements()[extend_start..=extend_end] {
        merged.add(element.clone());
    }

    let mut close_child = ComponentTag::new(XmlTag::synthetic(
        &child.xml.name,
        child.namespace(),
        TagType::Close,
        child.xml.end(),
    ));
    close_child.open_tag_id = child.id.clone();
    close_child.modified = true;
    merged.add(MarkupElement::Tag(close_child));

    for element in &elements[resume_at..] {
        if is_head_close(element) {
            for (start, end) in &head_sections {
                for e in &derived.elements()[*start..=*end] {
                    merged.add(e.clone());
                }
            }
        }
        merged.add(element.clone());
    }

    Ok(merged)
}

/// The insertion point. A base that is itself merged contains the child
/// tags of every level; the innermost one comes last.
fn innermost_child(base: &Markup) -> Option<usize> {
    let ns = base.wicket_namespace();
    base.elements().iter().rposition(|e| {
        e.as_tag()
            .is_some_and(|t| !t.is_close() && t.is_wicket_tag(ns, "child"))
    })
}

fn is_head_close(element: &MarkupElement) -> bool {
    element
        .as_tag()
        .is_some_and(|t| t.is_close() && t.is_html("head"))
}

/// Index range (inclusive) of the first `<ns:name>...</ns:name>` region
fn region(markup: &Markup, name: &str) -> Option<(usize, usize)> {
    let start = markup.find_wicket_tag(name)?;
    let tag = markup.get(start)?.as_tag()?;
    if tag.is_open_close() {
        return Some((start, start));
    }
    let end = matching_close(markup, start, name)?;
    Some((start, end))
}

fn all_regions(markup: &Markup, name: &str) -> Vec<(usize, usize)> {
    let ns = markup.wicket_namespace();
    let mut regions = Vec::new();
    let mut index = 0;
    while index < markup.len() {
        let opens = markup
            .get(index)
            .and_then(MarkupElement::as_tag)
            .is_some_and(|t| t.is_open() && t.is_wicket_tag(ns, name));
        if opens {
            if let Some(end) = matching_close(markup, index, name) {
                regions.push((index, end));
                index = end;
            }
        }
        index += 1;
    }
    regions
}

fn matching_close(markup: &Markup, start: usize, name: &str) -> Option<usize> {
    let ns = markup.wicket_namespace();
    let mut depth = 0usize;
    for (offset, element) in markup.elements()[start + 1..].iter().enumerate() {
        let Some(tag) = element.as_tag() else {
            continue;
        };
        if !tag.is_wicket_tag(ns, name) {
            continue;
        }
        if tag.is_open() {
            depth += 1;
        } else if tag.is_close() {
            if depth == 0 {
                return Some(start + 1 + offset);
            }
            depth -= 1;
        }
    }
    None
}
