//! Markup parser for string render output.
//!
//! Handles the subset layouts actually return: nested elements, quoted,
//! unquoted and boolean attributes, `/>` self-closing syntax, void elements,
//! comments and text with the common entities. No `{{ }}` interpolation and no
//! error recovery; anything unexpected is a [`MarkupError`].
//!
//! # Example
//!
//! ```ignore
//! use spark_layout::dom::markup;
//!
//! let nodes = markup::parse("<div><span>a</span><span>b</span></div>")?;
//! assert_eq!(nodes.len(), 1);
//! ```

use crate::error::MarkupError;

use super::node::VOID_ELEMENTS;
use super::Node;

/// Parse markup into a list of top-level nodes.
pub fn parse(markup: &str) -> Result<Vec<Node>, MarkupError> {
    let mut parser = Parser {
        src: markup,
        pos: 0,
    };
    parser.parse_nodes(None)
}

/// Keep only the element nodes of a parsed top level.
pub fn top_level_elements(nodes: Vec<Node>) -> Vec<Node> {
    nodes.into_iter().filter(Node::is_element).collect()
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn read_name(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
        {
            self.bump();
        }
        self.src[start..self.pos].to_string()
    }

    /// Parse sibling nodes until the closing tag of `open` (or end of input
    /// at the top level).
    fn parse_nodes(&mut self, open: Option<(&str, usize)>) -> Result<Vec<Node>, MarkupError> {
        let mut nodes = Vec::new();

        loop {
            if self.at_end() {
                return match open {
                    Some((tag, offset)) => Err(MarkupError::Unclosed {
                        tag: tag.to_string(),
                        offset,
                    }),
                    None => Ok(nodes),
                };
            }

            let rest = self.rest();
            if rest.starts_with("<!--") {
                nodes.push(self.parse_comment()?);
            } else if rest.starts_with("</") {
                let offset = self.pos;
                self.pos += 2;
                let tag = self.read_name().to_ascii_lowercase();
                self.skip_whitespace();
                if self.bump() != Some('>') {
                    return Err(MarkupError::Malformed { offset });
                }
                return match open {
                    Some((expected, _)) if expected == tag => Ok(nodes),
                    Some((expected, _)) => Err(MarkupError::Mismatched {
                        expected: expected.to_string(),
                        found: tag,
                        offset,
                    }),
                    None => Err(MarkupError::UnexpectedClose { tag, offset }),
                };
            } else if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
                nodes.push(self.parse_element()?);
            } else {
                let text = self.parse_text();
                if !text.is_empty() {
                    nodes.push(Node::text(text));
                }
            }
        }
    }

    fn parse_comment(&mut self) -> Result<Node, MarkupError> {
        let offset = self.pos;
        self.pos += 4;
        let Some(end) = self.rest().find("-->") else {
            return Err(MarkupError::Malformed { offset });
        };
        let content = self.rest()[..end].to_string();
        self.pos += end + 3;
        Ok(Node::comment(content))
    }

    fn parse_text(&mut self) -> String {
        let start = self.pos;
        // A '<' that does not open a tag is plain text
        if self.peek() == Some('<') {
            self.bump();
        }
        let len = self.rest().find('<').unwrap_or(self.rest().len());
        self.pos += len;
        decode_entities(&self.src[start..self.pos])
    }

    fn parse_element(&mut self) -> Result<Node, MarkupError> {
        let offset = self.pos;
        self.bump();
        let tag = self.read_name().to_ascii_lowercase();
        let element = Node::element(&tag);

        let self_closing = loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.starts_with("/>") {
                self.pos += 2;
                break true;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break false;
            }

            let name = self.read_name();
            if name.is_empty() {
                return Err(MarkupError::Malformed { offset: self.pos });
            }
            self.skip_whitespace();
            let value = if self.peek() == Some('=') {
                self.bump();
                self.skip_whitespace();
                self.parse_attribute_value(offset)?
            } else {
                String::new()
            };
            element.set_attribute(&name.to_ascii_lowercase(), value);
        };

        if !self_closing && !VOID_ELEMENTS.contains(&tag.as_str()) {
            for child in self.parse_nodes(Some((tag.as_str(), offset)))? {
                element.append_child(&child);
            }
        }
        Ok(element)
    }

    fn parse_attribute_value(&mut self, tag_offset: usize) -> Result<String, MarkupError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let Some(end) = self.rest().find(quote) else {
                    return Err(MarkupError::Malformed { offset: tag_offset });
                };
                let raw = &self.rest()[..end];
                let value = decode_entities(raw);
                self.pos += end + 1;
                Ok(value)
            }
            Some(_) => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| !c.is_whitespace() && c != '>' && c != '/')
                {
                    self.bump();
                }
                Ok(decode_entities(&self.src[start..self.pos]))
            }
            None => Err(MarkupError::Malformed { offset: tag_offset }),
        }
    }
}

// =============================================================================
// Entities
// =============================================================================

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
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, semi))
        });

        match decoded {
            Some((c, semi)) => {
                out.push(c);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested() {
        let nodes = parse("<div><span>a</span><span>b</span></div>").unwrap();
        assert_eq!(nodes.len(), 1);

        let div = &nodes[0];
        assert_eq!(div.tag(), Some("div"));
        let spans = div.children();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text_content(), "a");
        assert_eq!(spans[1].text_content(), "b");
    }

    #[test]
    fn test_top_level_elements() {
        let nodes = parse("  <span>a</span>\n<span>b</span>  ").unwrap();
        assert_eq!(top_level_elements(nodes).len(), 2);

        let nodes = parse("<!-- only a comment -->").unwrap();
        assert!(top_level_elements(nodes).is_empty());
    }

    #[test]
    fn test_attributes() {
        let nodes = parse(r#"<input type=text disabled value='a "b"'><template data-slot="header"></template>"#)
            .unwrap();
        assert_eq!(nodes.len(), 2);

        let input = &nodes[0];
        assert_eq!(input.attribute("type").as_deref(), Some("text"));
        assert_eq!(input.attribute("disabled").as_deref(), Some(""));
        assert_eq!(input.attribute("value").as_deref(), Some("a \"b\""));
        assert_eq!(input.child_count(), 0);

        assert_eq!(nodes[1].attribute("data-slot").as_deref(), Some("header"));
    }

    #[test]
    fn test_self_closing_and_comments() {
        let nodes = parse("<section><br/><!--marker--><img src=x /></section>").unwrap();
        let section = &nodes[0];
        assert_eq!(section.child_count(), 3);
        assert_eq!(section.to_html(), "<section><br><!--marker--><img src=\"x\"></section>");
    }

    #[test]
    fn test_entities_and_stray_lt() {
        let nodes = parse("<p>1 < 2 &amp;&amp; 3 &gt; 2 &#65;&#x42; &bogus;</p>").unwrap();
        assert_eq!(nodes[0].text_content(), "1 < 2 && 3 > 2 AB &bogus;");
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            parse("<div><span></div>"),
            Err(MarkupError::Mismatched {
                expected: "span".to_string(),
                found: "div".to_string(),
                offset: 11,
            })
        );
        assert_eq!(
            parse("<div>"),
            Err(MarkupError::Unclosed {
                tag: "div".to_string(),
                offset: 0,
            })
        );
        assert_eq!(
            parse("</p>"),
            Err(MarkupError::UnexpectedClose {
                tag: "p".to_string(),
                offset: 0,
            })
        );
        assert!(matches!(parse("<div title=\"x>"), Err(MarkupError::Malformed { .. })));
    }
}
