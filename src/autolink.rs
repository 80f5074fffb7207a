//! Resolution of automatic links
//!
//! Tags marked `_autolink_` by the link filter carry a relative `href` (or
//! `src`) written for previewing the template in a browser. At render time
//! the link is resolved against the component that owns the markup:
//!
//! - `Other.html?id=3` becomes a bookmarkable link to the page class
//!   `<package>.Other` with page parameters `id=3`;
//! - `.shop.Cart.html` names the page class absolutely, and is only turned
//!   into a page link if that class is registered;
//! - `css/site.css` becomes `<package path>/css/site.css`;
//! - `/static/site.css` and everything not relative is left alone.

use crate::factory::ComponentRegistry;
use crate::markup::{ComponentTag, Markup};
use serde::Serialize;
use std::collections::BTreeMap;

/// Extension that marks a link to a page template
const PAGE_EXTENSION: &str = "html";

/// A resolved automatic link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AutoLink {
    /// Bookmarkable link to a page class
    Page {
        id: String,
        class_name: String,
        parameters: BTreeMap<String, String>,
    },
    /// Plain link with a rewritten (or unchanged) href
    External { id: String, href: String },
}

impl AutoLink {
    pub fn id(&self) -> &str {
        match self {
            Self::Page { id, .. } | Self::External { id, .. } => id,
        }
    }
}

/// Parse `a=1&b=2` into page parameters. Later duplicates win.
pub fn parse_query(query: &str) -> BTreeMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

/// Resolves autolinks for one page render. Auto ids are made unique by a
/// running index, as several links in a page share the same tag id.
#[derive(Debug)]
pub struct AutoLinkResolver<'a> {
    registry: &'a ComponentRegistry,
    auto_index: usize,
}

impl<'a> AutoLinkResolver<'a> {
    pub fn new(registry: &'a ComponentRegistry) -> Self {
        Self {
            registry,
            auto_index: 0,
        }
    }

    fn next_id(&mut self, id: &str) -> String {
        let auto_id = format!("{}{}", id, self.auto_index);
        self.auto_index += 1;
        auto_id
    }

    /// Resolve `href` found on a tag with component id `id` in markup owned
    /// by a component in `package`
    pub fn resolve(&mut self, id: &str, href: &str, package: &str) -> AutoLink {
        let auto_id = self.next_id(id);

        let (class_path, parameters) = match href.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (href, BTreeMap::new()),
        };

        let (stem, extension) = match class_path.rsplit_once('.') {
            Some((stem, extension)) => (stem, Some(extension)),
            None => (class_path, None),
        };

        if extension.is_some_and(|e| e.eq_ignore_ascii_case(PAGE_EXTENSION)) {
            let class_path = stem.replace('/', ".");
            match class_path.strip_prefix('.') {
                None => {
                    let class_name = if package.is_empty() {
                        class_path
                    } else {
                        format!("{}.{}", package, class_path)
                    };
                    return AutoLink::Page {
                        id: auto_id,
                        class_name,
                        parameters,
                    };
                }
                Some(absolute) if self.registry.contains(absolute) => {
                    return AutoLink::Page {
                        id: auto_id,
                        class_name: absolute.to_string(),
                        parameters,
                    };
                }
                // Unknown absolute class: keep the href as written
                Some(_) => {}
            }
        } else if !class_path.starts_with('/') && !class_path.starts_with('\\') {
            let href = if package.is_empty() {
                href.to_string()
            } else {
                format!("{}/{}", package.replace('.', "/"), href)
            };
            return AutoLink::External { id: auto_id, href };
        }

        AutoLink::External {
            id: auto_id,
            href: href.to_string(),
        }
    }

    /// Resolve the link attribute of an autolinked tag
    pub fn resolve_tag(&mut self, tag: &ComponentTag, package: &str) -> Option<AutoLink> {
        if !tag.autolink || tag.is_close() {
            return None;
        }
        let id = tag.id.as_deref()?;
        let href = tag
            .attributes()
            .get("href")
            .or_else(|| tag.attributes().get("src"))?;
        Some(self.resolve(id, href, package))
    }

    /// Resolve every autolink in `markup`
    pub fn resolve_markup(&mut self, markup: &Markup, package: &str) -> Vec<AutoLink> {
        markup
            .tags()
            .filter_map(|tag| self.resolve_tag(tag, package))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::{ComponentClass, ComponentKind};
    use crate::parser::{MarkupParser, ParserSettings};

    fn registry() -> ComponentRegistry {
        let mut registry = ComponentRegistry::new();
        registry.register(ComponentClass::new("shop.Cart", ComponentKind::Page));
        registry
    }

    #[test]
    fn relative_page_link() {
        let registry = registry();
        let mut resolver = AutoLinkResolver::new(&registry);
        let link = resolver.resolve("_autolink_", "Other.html?id=3&sort", "app.pages");
        assert_eq!(
            link,
            AutoLink::Page {
                id: "_autolink_0".to_string(),
                class_name: "app.pages.Other".to_string(),
                parameters: BTreeMap::from([
                    ("id".to_string(), "3".to_string()),
                    ("sort".to_string(), String::new()),
                ]),
            }
        );
    }

    #[test]
    fn nested_relative_page_link() {
        let registry = registry();
        let mut resolver = AutoLinkResolver::new(&registry);
        match resolver.resolve("_autolink_", "admin/Users.html", "app") {
            AutoLink::Page { class_name, .. } => assert_eq!(class_name, "app.admin.Users"),
            other => panic!("expected page link, got {:?}", other),
        }
    }

    #[test]
    fn absolute_page_link_needs_known_class() {
        let registry = registry();
        let mut resolver = AutoLinkResolver::new(&registry);

        match resolver.resolve("_autolink_", ".shop.Cart.html", "app") {
            AutoLink::Page { class_name, .. } => assert_eq!(class_name, "shop.Cart"),
            other => panic!("expected page link, got {:?}", other),
        }

        let link = resolver.resolve("_autolink_", ".shop.Unknown.html", "app");
        assert_eq!(
            link,
            AutoLink::External {
                id: "_autolink_1".to_string(),
                href: ".shop.Unknown.html".to_string(),
            }
        );
    }

    #[test]
    fn relative_resource_gets_package_path() {
        let registry = registry();
        let mut resolver = AutoLinkResolver::new(&registry);
        let link = resolver.resolve("_autolink_", "css/site.css", "app.pages");
        assert_eq!(
            link,
            AutoLink::External {
                id: "_autolink_0".to_string(),
                href: "app/pages/css/site.css".to_string(),
            }
        );
    }

    #[test]
    fn absolute_resource_is_unchanged() {
        let registry = registry();
        let mut resolver = AutoLinkResolver::new(&registry);
        for href in ["/static/site.css", "\\static\\site.css"] {
            match resolver.resolve("_autolink_", href, "app") {
                AutoLink::External { href: resolved, .. } => assert_eq!(resolved, href),
                other => panic!("expected external link, got {:?}", other),
            }
        }
    }

    #[test]
    fn resolves_autolinks_in_markup() {
        let markup = MarkupParser::new(ParserSettings::default())
            .parse("<wicket:link><a href=\"Next.html\">n</a><img src=\"logo.png\"/></wicket:link><a href=\"Skip.html\">s</a>")
            .unwrap();

        let registry = registry();
        let mut resolver = AutoLinkResolver::new(&registry);
        let links = resolver.resolve_markup(&markup, "app");

        let ids: Vec<&str> = links.iter().map(AutoLink::id).collect();
        assert_eq!(ids, vec!["_autolink_0", "_autolink_1"]);
        assert!(matches!(&links[1], AutoLink::External { href, .. } if href == "app/logo.png"));
    }

    #[test]
    fn parses_query_strings() {
        let params = parse_query("a=1&&b=2&a=3");
        assert_eq!(params.get("a").map(String::as_str), Some("3"));
        assert_eq!(params.get("b").map(String::as_str), Some("2"));
    }
}
