//! Pull parser that splits markup text into tags
//!
//! Only tags are reported; text between tags is recovered through the
//! position marker. Comments, CDATA sections, processing instructions and
//! DOCTYPE declarations are skipped, as are the bodies of `<script>` and
//! `<style>` elements.

use crate::error::{TrellisError, TrellisResult};
use crate::markup::{Attributes, TagType, XmlTag};

/// Tokenizes markup into [`XmlTag`]s
pub struct XmlPullParser<'a> {
    input: &'a str,
    location: String,
    pos: usize,
    marker: usize,
    line_starts: Vec<usize>,
    raw_text_until: Option<String>,
    encoding: Option<String>,
    xml_declaration: Option<String>,
}

impl<'a> XmlPullParser<'a> {
    pub fn new(input: &'a str, location: impl Into<String>) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(input.match_indices('\n').map(|(i, _)| i + 1));

        Self {
            input,
            location: location.into(),
            pos: 0,
            marker: 0,
            line_starts,
            raw_text_until: None,
            encoding: None,
            xml_declaration: None,
        }
    }

    /// Encoding named by the `<?xml ... ?>` declaration
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// The `<?xml ... ?>` declaration as written
    pub fn xml_declaration(&self) -> Option<&str> {
        self.xml_declaration.as_deref()
    }

    /// 1-based line and column of a byte offset
    pub fn line_column(&self, pos: usize) -> (usize, usize) {
        let line = self.line_starts.partition_point(|&start| start <= pos);
        let start = self.line_starts[line.saturating_sub(1)];
        let column = self.input[start..pos.min(self.input.len())].chars().count() + 1;
        (line, column)
    }

    /// Text between the position marker and `to` (or the end of input)
    pub fn input_from_marker(&self, to: Option<usize>) -> &'a str {
        let end = to.unwrap_or(self.input.len()).min(self.input.len());
        if end <= self.marker {
            return "";
        }
        &self.input[self.marker..end]
    }

    pub fn set_marker(&mut self, pos: usize) {
        self.marker = pos.min(self.input.len());
    }

    pub fn marker(&self) -> usize {
        self.marker
    }

    fn error(&self, pos: usize, message: impl Into<String>) -> TrellisError {
        let (line, column) = self.line_column(pos);
        TrellisError::parse(&self.location, line, column, message)
    }

    /// Next tag, or `None` at end of input
    pub fn next_tag(&mut self) -> TrellisResult<Option<XmlTag>> {
        let input = self.input;
        let bytes = input.as_bytes();

        loop {
            if let Some(name) = self.raw_text_until.take() {
                let needle = format!("</{}", name);
                match find_ignore_case(self.input, &needle, self.pos) {
                    Some(at) => self.pos = at,
                    None => {
                        return Err(self.error(self.pos, format!("<{}> has no close tag", name)))
                    }
                }
            }

            let Some(start) = self.input[self.pos..].find('<').map(|i| i + self.pos) else {
                self.pos = self.input.len();
                return Ok(None);
            };
            let rest = &self.input[start..];

            if rest.starts_with("<!--") {
                self.pos = self.skip_past(start, start + 4, "-->", "comment")?;
                continue;
            }
            if rest.starts_with("<![CDATA[") {
                self.pos = self.skip_past(start, start + 9, "]]>", "CDATA section")?;
                continue;
            }
            if rest.starts_with("<!") {
                self.pos = self.skip_past(start, start + 2, ">", "declaration")?;
                continue;
            }
            if rest.starts_with("<?") {
                let end = self.skip_past(start, start + 2, "?>", "processing instruction")?;
                let instruction = &self.input[start..end];
                if instruction.starts_with("<?xml") {
                    self.encoding = declared_encoding(instruction);
                    self.xml_declaration = Some(instruction.to_string());
                }
                self.pos = end;
                continue;
            }

            let mut cursor = start + 1;
            let closing = bytes.get(cursor) == Some(&b'/');
            if closing {
                cursor += 1;
            }

            let name_start = cursor;
            while cursor < bytes.len() && !is_name_delimiter(bytes[cursor]) {
                cursor += 1;
            }
            let qualified = &self.input[name_start..cursor];
            if !qualified
                .chars()
                .next()
                .is_some_and(|c| c.is_alphabetic() || c == '_')
            {
                // A lone '<' in text, e.g. "a < b"
                self.pos = start + 1;
                continue;
            }

            let (attributes, tag_end, open_close) = self.parse_attributes(start, cursor)?;

            let (namespace, name) = match qualified.split_once(':') {
                Some((ns, local)) => (Some(ns.to_string()), local.to_string()),
                None => (None, qualified.to_string()),
            };
            let tag_type = if closing {
                TagType::Close
            } else if open_close {
                TagType::OpenClose
            } else {
                TagType::Open
            };

            if tag_type == TagType::Open
                && namespace.is_none()
                && (name.eq_ignore_ascii_case("script") || name.eq_ignore_ascii_case("style"))
            {
                self.raw_text_until = Some(name.clone());
            }

            let (line, column) = self.line_column(start);
            self.pos = tag_end;

            return Ok(Some(XmlTag {
                name,
                namespace,
                tag_type,
                attributes,
                pos: start,
                length: tag_end - start,
                line,
                column,
                text: self.input[start..tag_end].to_string(),
            }));
        }
    }

    fn skip_past(
        &self,
        start: usize,
        from: usize,
        terminator: &str,
        what: &str,
    ) -> TrellisResult<usize> {
        self.input
            .get(from..)
            .and_then(|rest| rest.find(terminator))
            .map(|i| from + i + terminator.len())
            .ok_or_else(|| self.error(start, format!("unclosed {}", what)))
    }

    /// Parse attributes starting at `cursor`; returns attributes, the byte
    /// offset just past `>`, and whether the tag ended with `/>`
    fn parse_attributes(
        &self,
        start: usize,
        mut cursor: usize,
    ) -> TrellisResult<(Attributes, usize, bool)> {
        let bytes = self.input.as_bytes();
        let mut attributes = Attributes::new();

        loop {
            while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
                cursor += 1;
            }
            match bytes.get(cursor) {
                None => return Err(self.error(start, "unclosed tag")),
                Some(b'>') => return Ok((attributes, cursor + 1, false)),
                Some(b'/') if bytes.get(cursor + 1) == Some(&b'>') => {
                    return Ok((attributes, cursor + 2, true))
                }
                Some(b'/') => {
                    cursor += 1;
                    continue;
                }
                Some(b'<') => {
                    return Err(self.error(cursor, "unexpected '<' inside tag"));
                }
                Some(_) => {}
            }

            let name_start = cursor;
            while cursor < bytes.len()
                && !bytes[cursor].is_ascii_whitespace()
                && !matches!(bytes[cursor], b'=' | b'>' | b'/' | b'<')
            {
                cursor += 1;
            }
            let name = &self.input[name_start..cursor];
            if name.is_empty() {
                return Err(self.error(cursor, "expected attribute name"));
            }

            while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
                cursor += 1;
            }
            if bytes.get(cursor) != Some(&b'=') {
                attributes.insert(name, "");
                continue;
            }
            cursor += 1;
            while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
                cursor += 1;
            }

            let value = match bytes.get(cursor) {
                Some(&quote @ (b'"' | b'\'')) => {
                    let value_start = cursor + 1;
                    let len = self.input[value_start..]
                        .find(quote as char)
                        .ok_or_else(|| {
                            self.error(name_start, format!("unclosed value of attribute '{}'", name))
                        })?;
                    cursor = value_start + len + 1;
                    &self.input[value_start..value_start + len]
                }
                Some(_) => {
                    let value_start = cursor;
                    while cursor < bytes.len()
                        && !bytes[cursor].is_ascii_whitespace()
                        && bytes[cursor] != b'>'
                    {
                        cursor += 1;
                    }
                    &self.input[value_start..cursor]
                }
                None => return Err(self.error(start, "unclosed tag")),
            };
            attributes.insert(name, value);
        }
    }
}

fn is_name_delimiter(byte: u8) -> bool {
    byte.is_ascii_whitespace() || matches!(byte, b'/' | b'>' | b'<' | b'=')
}

fn find_ignore_case(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || hay.len() < needle.len() {
        return None;
    }
    (from..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

fn declared_encoding(declaration: &str) -> Option<String> {
    let at = declaration.find("encoding")?;
    let rest = declaration[at + "encoding".len()..].trim_start();
    let rest = rest.strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let rest = &rest[1..];
    let end = rest.find(quote)?;
    Some(rest[..end].to_string())
}
