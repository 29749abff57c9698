//! Minimal element tree over `quick-xml` events.
//!
//! Shared by the XML Schema validator (for both the schema document and the
//! instance) and by the XML query syntax. Namespace prefixes are dropped from
//! element names; `xmlns` declarations are dropped from attributes.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// Deepest element nesting accepted by [`parse_document`]
pub const MAX_DEPTH: usize = 128;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XmlError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("Document has no root element")]
    NoRoot,

    #[error("line {line}: Document has more than one root element")]
    MultipleRoots { line: usize },

    #[error("Element <{name}> opened on line {line} is never closed")]
    Unclosed { name: String, line: usize },

    #[error("line {line}: Elements are nested deeper than {max} levels")]
    TooDeep { line: usize, max: usize },
}

/// An element with its attributes, child elements and concatenated text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: String,
    /// 1-based line of the start tag
    pub line: usize,
}

impl XmlElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn from_start(start: &BytesStart<'_>, line: usize) -> Result<Self, XmlError> {
        let syntax = |message: String| XmlError::Syntax { line, message };
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| syntax(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            if key == "xmlns" || key.starts_with("xmlns:") {
                continue;
            }
            let value = attr
                .unescape_value()
                .map_err(|e| syntax(e.to_string()))?
                .into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
            text: String::new(),
            line,
        })
    }
}

/// Tracks line numbers as the reader advances
struct LineCounter<'a> {
    input: &'a [u8],
    offset: usize,
    line: usize,
}

impl LineCounter<'_> {
    fn line_at(&mut self, position: usize) -> usize {
        let position = position.min(self.input.len());
        if position > self.offset {
            self.line += self.input[self.offset..position]
                .iter()
                .filter(|b| **b == b'\n')
                .count();
            self.offset = position;
        }
        self.line
    }
}

/// Parse a whole document into its root element
pub fn parse_document(input: &str) -> Result<XmlElement, XmlError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut lines = LineCounter {
        input: input.as_bytes(),
        offset: 0,
        line: 1,
    };
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let position = reader.buffer_position() as usize;
        let event = reader.read_event().map_err(|e| XmlError::Syntax {
            line: lines.line_at(reader.error_position() as usize),
            message: e.to_string(),
        })?;
        // Tag starts are located by skipping leading whitespace from the
        // position before the event.
        let start_line = lines.line_at(skip_whitespace(input, position));

        match event {
            Event::Start(start) => {
                if stack.len() >= MAX_DEPTH {
                    return Err(XmlError::TooDeep {
                        line: start_line,
                        max: MAX_DEPTH,
                    });
                }
                stack.push(XmlElement::from_start(&start, start_line)?);
            }
            Event::Empty(start) => {
                let element = XmlElement::from_start(&start, start_line)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut root, element)?;
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| XmlError::Syntax {
                    line: start_line,
                    message: e.to_string(),
                })?;
                match stack.last_mut() {
                    Some(top) => top.text.push_str(&text),
                    None if !text.trim().is_empty() => {
                        return Err(XmlError::Syntax {
                            line: start_line,
                            message: "Text is not allowed outside the root element".to_string(),
                        })
                    }
                    None => {}
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::Unclosed {
            name: open.name,
            line: open.line,
        });
    }
    root.ok_or(XmlError::NoRoot)
}

fn skip_whitespace(input: &str, position: usize) -> usize {
    let bytes = input.as_bytes();
    let mut pos = position.min(bytes.len());
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), XmlError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(XmlError::MultipleRoots { line: element.line });
    }
    *root = Some(element);
    Ok(())
}
