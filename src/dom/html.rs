//! HTML loading and serialization
//!
//! Parsing goes through `scraper` (html5ever), so the arena sees the same
//! tree a browser would build: implied `html`/`head`/`body`, lowercased tag
//! names, decoded entities.

use scraper::{Html, Node as HtmlNode};

use super::document::{Document, NodeData, NodeId};

/// Elements that never have an end tag
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose text is emitted without escaping
const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

impl Document {
    /// Parse a full HTML document
    pub fn parse_html(html: &str) -> Document {
        let parsed = Html::parse_document(html);
        let mut doc = Document::new();

        let mut pending = vec![(parsed.tree.root(), doc.root())];
        while let Some((source, parent)) = pending.pop() {
            for child in source.children() {
                let created = match child.value() {
                    HtmlNode::Element(el) => {
                        let id = doc.create_element(el.name());
                        for (name, value) in el.attrs() {
                            // element was just created, cannot fail
                            let _ = doc.set_attr(id, name, value);
                        }
                        Some(id)
                    }
                    HtmlNode::Text(text) => {
                        let data: &str = text;
                        Some(doc.create_text(data))
                    }
                    HtmlNode::Comment(comment) => {
                        let data: &str = comment;
                        Some(doc.create_comment(data))
                    }
                    // fragments are transparent: their children attach to the parent
                    HtmlNode::Fragment => {
                        pending.push((child, parent));
                        None
                    }
                    _ => None,
                };
                if let Some(id) = created {
                    if doc.append_child(parent, id).is_ok() {
                        pending.push((child, id));
                    }
                }
            }
        }

        doc
    }

    /// Serialize a node and its subtree (`outerHTML`)
    pub fn to_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out, false);
        out
    }

    /// Serialize the children of a node (`innerHTML`)
    pub fn inner_html(&self, id: NodeId) -> String {
        let raw = self.tag(id).is_some_and(|t| RAW_TEXT_TAGS.contains(&t));
        let mut out = String::new();
        for child in self.children(id) {
            self.write_html(*child, &mut out, raw);
        }
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String, raw_text: bool) {
        match self.data(id) {
            Some(NodeData::Document) => {
                for child in self.children(id) {
                    self.write_html(*child, out, false);
                }
            }
            Some(NodeData::Element { tag, attrs }) => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_TAGS.contains(&tag.as_str()) {
                    return;
                }
                let raw = RAW_TEXT_TAGS.contains(&tag.as_str());
                for child in self.children(id) {
                    self.write_html(*child, out, raw);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            Some(NodeData::Text(text)) => {
                if raw_text {
                    out.push_str(text);
                } else {
                    out.push_str(&escape_text(text));
                }
            }
            Some(NodeData::Comment(text)) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            None => {}
        }
    }
}

fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}
