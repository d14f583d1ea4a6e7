//! Markup parsing and serialization.
//!
//! A deliberately small HTML-ish dialect: elements, quoted or bare attributes,
//! text with basic entities, comments (dropped). Unclosed elements close at
//! end of input and stray close tags are ignored; only an unterminated tag or
//! comment is an error.

use super::node::{NodeKind, NodeRef};
use crate::error::MarkupError;

/// Elements that never have children or a close tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "wbr",
];

fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    roots: Vec<NodeRef>,
    open: Vec<(String, NodeRef)>,
}

/// Parse `input` into detached top-level nodes.
pub fn parse_fragment(input: &str) -> Result<Vec<NodeRef>, MarkupError> {
    let mut parser = Parser {
        input,
        pos: 0,
        roots: Vec::new(),
        open: Vec::new(),
    };
    parser.run()?;
    Ok(parser.roots)
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn error(&self, message: impl Into<String>) -> MarkupError {
        MarkupError {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn insert(&mut self, node: &NodeRef) {
        match self.open.last() {
            Some((_, parent)) => parent.append(node),
            None => self.roots.push(node.clone()),
        }
    }

    fn run(&mut self) -> Result<(), MarkupError> {
        while self.pos < self.input.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                let end = rest
                    .find("-->")
                    .ok_or_else(|| self.error("unterminated comment"))?;
                self.pos += end + 3;
            } else if rest.starts_with("</") {
                self.close_tag()?;
            } else if rest.starts_with('<')
                && rest.as_bytes().get(1).is_some_and(u8::is_ascii_alphabetic)
            {
                self.open_tag()?;
            } else {
                self.text();
            }
        }
        Ok(())
    }

    fn text(&mut self) {
        let rest = self.rest();
        // A lone '<' that starts no tag is plain text.
        let skip = usize::from(rest.starts_with('<'));
        let end = rest[skip..].find('<').map_or(rest.len(), |i| i + skip);
        let raw = &rest[..end];
        self.pos += end;
        if !raw.is_empty() {
            let node = NodeRef::text(decode_entities(raw));
            self.insert(&node);
        }
    }

    fn close_tag(&mut self) -> Result<(), MarkupError> {
        let rest = self.rest();
        let end = rest
            .find('>')
            .ok_or_else(|| self.error("unterminated close tag"))?;
        let name = rest[2..end].trim().to_ascii_lowercase();
        self.pos += end + 1;

        if let Some(index) = self.open.iter().rposition(|(tag, _)| *tag == name) {
            self.open.truncate(index);
        }
        Ok(())
    }

    fn name(&mut self) -> String {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':' {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_ascii_lowercase()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn open_tag(&mut self) -> Result<(), MarkupError> {
        self.pos += 1;
        let tag = self.name();
        let element = NodeRef::element(&tag);

        let self_closing = loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(self.error(format!("unterminated <{tag}> tag"))),
                Some(b'>') => {
                    self.pos += 1;
                    break false;
                }
                Some(b'/') if self.rest().starts_with("/>") => {
                    self.pos += 2;
                    break true;
                }
                Some(b'/') => self.pos += 1,
                Some(_) => {
                    let (key, value) = self.attribute()?;
                    if !key.is_empty() {
                        element.set_attr(&key, value);
                    }
                }
            }
        };

        self.insert(&element);
        if !self_closing && !is_void(&tag) {
            self.open.push((tag, element));
        }
        Ok(())
    }

    fn attribute(&mut self) -> Result<(String, String), MarkupError> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() || matches!(b, b'=' | b'>' | b'/') {
                break;
            }
            self.pos += 1;
        }
        let key = self.input[start..self.pos].to_ascii_lowercase();
        if key.is_empty() {
            // Unexpected byte such as a stray quote; skip it.
            self.pos += 1;
            return Ok((key, String::new()));
        }

        self.skip_whitespace();
        if self.peek() != Some(b'=') {
            return Ok((key, String::new()));
        }
        self.pos += 1;
        self.skip_whitespace();

        let value = match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                self.pos += 1;
                let rest = self.rest();
                let end = rest
                    .find(char::from(quote))
                    .ok_or_else(|| self.error("unterminated attribute value"))?;
                let raw = &rest[..end];
                self.pos += end + 1;
                decode_entities(raw)
            }
            _ => {
                let start = self.pos;
                while let Some(b) = self.peek() {
                    if b.is_ascii_whitespace() || b == b'>' {
                        break;
                    }
                    self.pos += 1;
                }
                decode_entities(&self.input[start..self.pos])
            }
        };
        Ok((key, value))
    }
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi))
        });

        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

// =============================================================================
// Serializer
// =============================================================================

/// Append the markup of `node` (and its subtree) to `out`.
pub fn write_node(node: &NodeRef, out: &mut String) {
    match node.kind() {
        NodeKind::Text(text) => escape_into(&text, false, out),
        NodeKind::Element { tag, attributes } => {
            out.push('<');
            out.push_str(&tag);
            for (key, value) in &attributes {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                escape_into(value, true, out);
                out.push('"');
            }
            out.push('>');
            if is_void(&tag) {
                return;
            }
            for child in node.children() {
                write_node(&child, out);
            }
            out.push_str("</");
            out.push_str(&tag);
            out.push('>');
        }
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(input: &str) -> String {
        parse_fragment(input)
            .unwrap()
            .iter()
            .map(NodeRef::outer_markup)
            .collect()
    }

    #[test]
    fn test_self_closing_expands() {
        assert_eq!(roundtrip("<ul><li/></ul>"), "<ul><li></li></ul>");
    }

    #[test]
    fn test_attributes_keep_order() {
        assert_eq!(
            roundtrip(r#"<span id="hello" class='world' data-test=value />"#),
            r#"<span id="hello" class="world" data-test="value"></span>"#
        );
    }

    #[test]
    fn test_unclosed_elements_close_at_end() {
        assert_eq!(
            roundtrip("<div class='a'/><div class='b'><p>x"),
            r#"<div class="a"></div><div class="b"><p>x</p></div>"#
        );
    }

    #[test]
    fn test_stray_close_tag_ignored() {
        assert_eq!(roundtrip("<p>a</span>b</p>"), "<p>ab</p>");
    }

    #[test]
    fn test_text_only() {
        let nodes = parse_fragment("Harry's Games").unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(!nodes[0].is_element());
        assert_eq!(nodes[0].text_content(), "Harry's Games");
    }

    #[test]
    fn test_entities() {
        let nodes = parse_fragment("a &amp; b &lt;c&gt; &#65;&#x42; &unknown;").unwrap();
        assert_eq!(nodes[0].text_content(), "a & b <c> AB &unknown;");
        assert_eq!(
            nodes[0].outer_markup(),
            "a &amp; b &lt;c&gt; AB &amp;unknown;"
        );
    }

    #[test]
    fn test_void_elements() {
        assert_eq!(roundtrip("<p>a<br>b</p>"), "<p>a<br>b</p>");
    }

    #[test]
    fn test_comments_dropped() {
        assert_eq!(roundtrip("<p><!-- note -->x</p>"), "<p>x</p>");
    }

    #[test]
    fn test_unterminated_tag_is_error() {
        let err = parse_fragment("<div class='a'").unwrap_err();
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        assert_eq!(roundtrip("1 < 2"), "1 &lt; 2");
    }
}
