//! XML and component tags

use std::fmt;

/// Whether a tag opens, closes, or opens and closes an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagType {
    /// `<div>`
    Open,
    /// `</div>`
    Close,
    /// `<br/>`
    OpenClose,
}

/// Ordered tag attributes. Names are compared case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert or replace an attribute, keeping its original position
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.0.iter().position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        Some(self.0.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A tag as produced by the XML pull parser
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct XmlTag {
    /// Local name, e.g. `panel` for `<wicket:panel>`
    pub name: String,
    /// Namespace prefix, e.g. `wicket`
    pub namespace: Option<String>,
    pub tag_type: TagType,
    pub attributes: Attributes,
    /// Byte offset of `<` in the source
    pub pos: usize,
    /// Byte length of the tag in the source
    pub length: usize,
    pub line: usize,
    pub column: usize,
    /// The tag exactly as written
    #[serde(skip)]
    pub text: String,
}

impl XmlTag {
    /// A tag that does not exist in the source text, anchored at `pos`
    pub fn synthetic(name: &str, namespace: Option<&str>, tag_type: TagType, pos: usize) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
            tag_type,
            attributes: Attributes::new(),
            pos,
            length: 0,
            line: 0,
            column: 0,
            text: String::new(),
        }
    }

    /// Name including namespace prefix
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}:{}", ns, self.name),
            None => self.name.clone(),
        }
    }

    /// Byte offset just past the tag
    pub fn end(&self) -> usize {
        self.pos + self.length
    }

    pub fn is_open(&self) -> bool {
        self.tag_type == TagType::Open
    }

    pub fn is_close(&self) -> bool {
        self.tag_type == TagType::Close
    }

    pub fn is_open_close(&self) -> bool {
        self.tag_type == TagType::OpenClose
    }
}

/// A tag as seen by the markup layer: an xml tag plus component identity
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ComponentTag {
    #[serde(flatten)]
    pub xml: XmlTag,
    /// Component id (`wicket:id`, or a generated `_name` id)
    pub id: Option<String>,
    /// For close tags: the id of the matching open tag
    pub open_tag_id: Option<String>,
    /// The tag must be re-rendered from its fields rather than its source text
    pub modified: bool,
    /// Parsed but excluded from the markup (e.g. `<wicket:remove>`)
    pub ignore: bool,
    /// The tag was turned into a component by automatic linking
    pub autolink: bool,
}

impl ComponentTag {
    pub fn new(xml: XmlTag) -> Self {
        Self {
            xml,
            id: None,
            open_tag_id: None,
            modified: false,
            ignore: false,
            autolink: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.xml.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.xml.namespace.as_deref()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.xml.attributes
    }

    /// Mutable attribute access; marks the tag as modified
    pub fn attributes_mut(&mut self) -> &mut Attributes {
        self.modified = true;
        &mut self.xml.attributes
    }

    pub fn is_open(&self) -> bool {
        self.xml.is_open()
    }

    pub fn is_close(&self) -> bool {
        self.xml.is_close()
    }

    pub fn is_open_close(&self) -> bool {
        self.xml.is_open_close()
    }

    /// Whether the tag lives in the given (wicket) namespace
    pub fn is_in_namespace(&self, namespace: &str) -> bool {
        self.namespace() == Some(namespace)
    }

    /// Whether this is `<ns:name>` for the given namespace and name
    pub fn is_wicket_tag(&self, namespace: &str, name: &str) -> bool {
        self.is_in_namespace(namespace) && self.name().eq_ignore_ascii_case(name)
    }

    /// Name matches, ignoring case, and the tag has no namespace
    pub fn is_html(&self, name: &str) -> bool {
        self.namespace().is_none() && self.name().eq_ignore_ascii_case(name)
    }

    /// The tag text: source text unless modified
    pub fn to_markup(&self) -> String {
        if !self.modified && !self.xml.text.is_empty() {
            return self.xml.text.clone();
        }

        let mut out = String::with_capacity(32);
        out.push('<');
        if self.is_close() {
            out.push('/');
        }
        out.push_str(&self.xml.qualified_name());
        if !self.is_close() {
            for (name, value) in self.xml.attributes.iter() {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&value.replace('"', "&quot;"));
                out.push('"');
            }
        }
        if self.is_open_close() {
            out.push('/');
        }
        out.push('>');
        out
    }
}

impl fmt::Display for ComponentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_markup())
    }
}
