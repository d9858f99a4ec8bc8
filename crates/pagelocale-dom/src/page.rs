//! Arena-backed markup tree.
//!
//! Nodes are never freed: replacing an element's content detaches the old
//! children but keeps them in the arena, so an [`ElementId`] handed out
//! before the replacement stays valid and writes to it are simply invisible.

use pagelocale_core::{
    error::LocaleError,
    traits::{Document, ElementId, MarkedElement},
};
use std::collections::HashMap;
use std::fmt;

use crate::escape::{escape_text, unescape};

/// Elements that never have content or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose content is not parsed as markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Start tags that end an open `<p>`.
const CLOSES_P: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "details", "dialog", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hgroup", "hr", "li", "main", "menu", "nav", "ol", "p", "pre", "section", "table",
    "ul",
];

/// Elements an implied `<p>` end does not reach past.
const BUTTON_SCOPE: &[&str] = &[
    "applet", "button", "caption", "html", "marquee", "object", "table", "td", "th", "template",
];

const LIST_SCOPE: &[&str] = &[
    "caption", "html", "menu", "ol", "table", "td", "template", "th", "ul",
];

#[derive(Debug, Clone)]
enum Node {
    Text(String),
    /// Comments, doctypes, processing instructions, stray end tags.
    Raw(String),
    Element(Element),
}

#[derive(Debug, Clone)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    /// Start tag exactly as written.
    open_tag: String,
    /// End tag exactly as written, `None` when implied.
    close_tag: Option<String>,
    children: Vec<usize>,
    void: bool,
    self_closed: bool,
    /// Removed from the tree by a content replacement on an ancestor.
    detached: bool,
}

impl Element {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A parsed page.
#[derive(Debug, Clone, Default)]
pub struct Page {
    nodes: Vec<Node>,
    roots: Vec<usize>,
}

impl Page {
    /// Parse a document. Never fails; malformed markup is kept as text.
    pub fn parse(source: &str) -> Self {
        let mut page = Self::default();
        page.roots = parse_fragment(&mut page.nodes, source);
        page
    }

    /// Serialize the whole document.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for &id in &self.roots {
            self.write_node(id, &mut out);
        }
        out
    }

    /// Serialized content of an element.
    #[cfg(test)]
    pub fn inner_html(&self, id: ElementId) -> Option<String> {
        let el = self.element(id.0)?;
        let mut out = String::new();
        for &child in &el.children {
            self.write_node(child, &mut out);
        }
        Some(out)
    }

    /// Concatenated text of an element's descendants, references decoded.
    #[cfg(test)]
    pub fn text_content(&self, id: ElementId) -> Option<String> {
        let el = self.element(id.0)?;
        let mut out = String::new();
        let mut pending: Vec<usize> = el.children.iter().rev().copied().collect();
        while let Some(next) = pending.pop() {
            match &self.nodes[next] {
                Node::Text(t) => out.push_str(t),
                Node::Raw(_) => {}
                Node::Element(child) => pending.extend(child.children.iter().rev()),
            }
        }
        Some(unescape(&out))
    }

    /// Tag name of an element.
    #[cfg(test)]
    pub fn tag_name(&self, id: ElementId) -> Option<&str> {
        self.element(id.0).map(|el| el.name.as_str())
    }

    fn element(&self, id: usize) -> Option<&Element> {
        match self.nodes.get(id) {
            Some(Node::Element(el)) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: ElementId) -> Result<&mut Element, LocaleError> {
        match self.nodes.get_mut(id.0) {
            Some(Node::Element(el)) => Ok(el),
            _ => Err(LocaleError::Document(format!("no element with id {}", id.0))),
        }
    }

    /// Serialize `id` and its subtree. Iterative, so nesting depth is unbounded.
    fn write_node(&self, id: usize, out: &mut String) {
        enum Step {
            Open(usize),
            Close(usize),
        }

        let mut steps = vec![Step::Open(id)];
        while let Some(step) = steps.pop() {
            match step {
                Step::Open(id) => match &self.nodes[id] {
                    Node::Text(t) | Node::Raw(t) => out.push_str(t),
                    Node::Element(el) => {
                        if el.void || (el.self_closed && el.children.is_empty()) {
                            out.push_str(&el.open_tag);
                            continue;
                        }
                        if el.self_closed {
                            // Content was written into `<x/>`: reopen it as a normal pair.
                            let open = el.open_tag.trim_end_matches('>').trim_end_matches('/');
                            out.push_str(open.trim_end());
                            out.push('>');
                        } else {
                            out.push_str(&el.open_tag);
                        }
                        steps.push(Step::Close(id));
                        steps.extend(el.children.iter().rev().map(|&c| Step::Open(c)));
                    }
                },
                Step::Close(id) => {
                    if let Node::Element(el) = &self.nodes[id] {
                        match &el.close_tag {
                            Some(tag) => out.push_str(tag),
                            None if el.self_closed => {
                                out.push_str("</");
                                out.push_str(&el.name);
                                out.push('>');
                            }
                            None => {}
                        }
                    }
                }
            }
        }
    }

    /// Swap in new children for `id`, marking the old subtree detached.
    fn replace_children(&mut self, id: ElementId, children: Vec<usize>) -> Result<(), LocaleError> {
        let el = self.element_mut(id)?;
        let parent_detached = el.detached;
        let old = std::mem::replace(&mut el.children, children.clone());

        self.mark_detached(old);
        if parent_detached {
            self.mark_detached(children);
        }
        Ok(())
    }

    fn mark_detached(&mut self, mut pending: Vec<usize>) {
        while let Some(next) = pending.pop() {
            if let Node::Element(el) = &mut self.nodes[next] {
                el.detached = true;
                pending.extend(el.children.iter().copied());
            }
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_html())
    }
}

impl Document for Page {
    fn marked_elements(&self, attribute: &str) -> Vec<MarkedElement> {
        let mut out = Vec::new();
        let mut pending: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(next) = pending.pop() {
            if let Node::Element(el) = &self.nodes[next] {
                if let Some(key) = el.attr(attribute) {
                    out.push(MarkedElement {
                        id: ElementId(next),
                        key: key.to_string(),
                    });
                }
                pending.extend(el.children.iter().rev());
            }
        }
        out
    }

    fn is_attached(&self, id: ElementId) -> bool {
        self.element(id.0).is_some_and(|el| !el.detached)
    }

    fn set_markup(&mut self, id: ElementId, markup: &str) -> Result<(), LocaleError> {
        self.element_mut(id)?;
        let children = parse_fragment(&mut self.nodes, markup);
        self.replace_children(id, children)
    }

    fn set_text(&mut self, id: ElementId, text: &str) -> Result<(), LocaleError> {
        self.element_mut(id)?;
        let children = if text.is_empty() {
            Vec::new()
        } else {
            self.nodes.push(Node::Text(escape_text(text)));
            vec![self.nodes.len() - 1]
        };
        self.replace_children(id, children)
    }
}

// --- Parsing ---

/// Parse `input` into `nodes`, returning the top-level node ids.
fn parse_fragment(nodes: &mut Vec<Node>, input: &str) -> Vec<usize> {
    let mut roots = Vec::new();
    let mut open = OpenElements::default();
    let mut pos = 0;

    while pos < input.len() {
        let rest = &input[pos..];

        if !rest.starts_with('<') {
            let end = rest.find('<').unwrap_or(rest.len());
            attach(nodes, &mut roots, &open, Node::Text(rest[..end].to_string()));
            pos += end;
            continue;
        }

        if rest.starts_with("<!--") {
            let end = rest[4..].find("-->").map_or(rest.len(), |i| i + 7);
            attach(nodes, &mut roots, &open, Node::Raw(rest[..end].to_string()));
            pos += end;
            continue;
        }

        if rest.starts_with("<!") || rest.starts_with("<?") {
            let end = rest.find('>').map_or(rest.len(), |i| i + 1);
            attach(nodes, &mut roots, &open, Node::Raw(rest[..end].to_string()));
            pos += end;
            continue;
        }

        if let Some(after) = rest.strip_prefix("</") {
            if after.starts_with(|c: char| c.is_ascii_alphabetic()) {
                let end = rest.find('>').map_or(rest.len(), |i| i + 1);
                let name = tag_name_prefix(after).to_ascii_lowercase();
                let close = rest[..end].to_string();
                match open.close(nodes, &name) {
                    Some(id) => {
                        if let Node::Element(el) = &mut nodes[id] {
                            el.close_tag = Some(close);
                        }
                    }
                    None => {
                        attach(nodes, &mut roots, &open, Node::Raw(close));
                    }
                }
                pos += end;
                continue;
            }
        }

        if rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            if let Some((el, consumed)) = parse_start_tag(rest) {
                let is_open = !el.void && !el.self_closed;
                let raw_text = is_open && RAW_TEXT_ELEMENTS.contains(&el.name.as_str());
                let name = el.name.clone();

                open.close_implied_by(nodes, &name);
                let id = attach(nodes, &mut roots, &open, Node::Element(el));
                pos += consumed;

                if raw_text {
                    let body = &input[pos..];
                    let end = find_ascii_ci(body, &format!("</{name}")).unwrap_or(body.len());
                    if end > 0 {
                        nodes.push(Node::Text(body[..end].to_string()));
                        let text_id = nodes.len() - 1;
                        if let Node::Element(el) = &mut nodes[id] {
                            el.children.push(text_id);
                        }
                    }
                    pos += end;
                }
                if is_open {
                    open.push(id, &name);
                }
                continue;
            }
        }

        // A '<' that starts nothing is text.
        attach(nodes, &mut roots, &open, Node::Text("<".to_string()));
        pos += 1;
    }

    roots
}

/// Push `node` into the arena as a child of the innermost open element.
fn attach(nodes: &mut Vec<Node>, roots: &mut Vec<usize>, open: &OpenElements, node: Node) -> usize {
    nodes.push(node);
    let id = nodes.len() - 1;
    match open.ids.last() {
        Some(&parent) => {
            if let Node::Element(el) = &mut nodes[parent] {
                el.children.push(id);
            }
        }
        None => roots.push(id),
    }
    id
}

fn element_name(nodes: &[Node], id: usize) -> &str {
    match &nodes[id] {
        Node::Element(el) => &el.name,
        _ => "",
    }
}

/// Open elements during parsing, innermost last, with a per-name count
/// so implied-end checks skip the scan when nothing could match.
#[derive(Default)]
struct OpenElements {
    ids: Vec<usize>,
    counts: HashMap<String, usize>,
}

impl OpenElements {
    fn push(&mut self, id: usize, name: &str) {
        self.ids.push(id);
        *self.counts.entry(name.to_string()).or_default() += 1;
    }

    fn is_open(&self, name: &str) -> bool {
        self.counts.get(name).is_some_and(|&n| n > 0)
    }

    /// Pop everything from `len` up, leaving those elements' end tags implied.
    fn truncate(&mut self, nodes: &[Node], len: usize) {
        for &id in &self.ids[len..] {
            if let Some(n) = self.counts.get_mut(element_name(nodes, id)) {
                *n = n.saturating_sub(1);
            }
        }
        self.ids.truncate(len);
    }

    /// Close the innermost open element named `name` and anything opened
    /// inside it. Returns its id, or `None` if no such element is open.
    fn close(&mut self, nodes: &[Node], name: &str) -> Option<usize> {
        if !self.is_open(name) {
            return None;
        }
        let idx = self
            .ids
            .iter()
            .rposition(|&id| element_name(nodes, id) == name)?;
        let id = self.ids[idx];
        self.truncate(nodes, idx);
        Some(id)
    }

    /// Close the outermost element named in `closes` that sits above the
    /// nearest `scope` boundary.
    fn close_within(&mut self, nodes: &[Node], closes: &[&str], scope: &[&str]) {
        if !closes.iter().any(|name| self.is_open(name)) {
            return;
        }
        let mut found = None;
        for (idx, &id) in self.ids.iter().enumerate().rev() {
            let name = element_name(nodes, id);
            if closes.contains(&name) {
                found = Some(idx);
            } else if scope.contains(&name) {
                break;
            }
        }
        if let Some(idx) = found {
            self.truncate(nodes, idx);
        }
    }

    /// Apply the optional end tag rules triggered by a `name` start tag.
    fn close_implied_by(&mut self, nodes: &[Node], name: &str) {
        match name {
            "li" => self.close_within(nodes, &["li"], LIST_SCOPE),
            "dt" | "dd" => self.close_within(nodes, &["dt", "dd"], &["dl", "html", "table", "td", "th"]),
            "option" => self.close_within(nodes, &["option"], &["datalist", "optgroup", "select"]),
            "optgroup" => self.close_within(nodes, &["option", "optgroup"], &["datalist", "select"]),
            "tr" => self.close_within(nodes, &["tr", "td", "th"], &["table", "tbody", "tfoot", "thead"]),
            "td" | "th" => self.close_within(nodes, &["td", "th"], &["table", "tr"]),
            "thead" | "tbody" | "tfoot" => self.close_within(
                nodes,
                &["thead", "tbody", "tfoot", "tr", "td", "th"],
                &["table"],
            ),
            "rt" | "rp" => self.close_within(nodes, &["rt", "rp"], &["ruby"]),
            "body" => self.close_within(nodes, &["head"], &["html"]),
            _ => {}
        }
        if CLOSES_P.contains(&name) {
            self.close_within(nodes, &["p"], BUTTON_SCOPE);
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

fn tag_name_prefix(s: &str) -> &str {
    let end = s.find(|c: char| !is_name_char(c)).unwrap_or(s.len());
    &s[..end]
}

/// Parse a start tag at the beginning of `s` (which starts with `<`).
/// Returns `None` if the tag never ends.
fn parse_start_tag(s: &str) -> Option<(Element, usize)> {
    let name = tag_name_prefix(&s[1..]).to_ascii_lowercase();
    let bytes = s.as_bytes();
    let mut i = 1 + name.len();
    let mut attrs = Vec::new();
    let mut self_closed = false;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match *bytes.get(i)? {
            b'>' => {
                i += 1;
                break;
            }
            b'/' => {
                if bytes.get(i + 1) == Some(&b'>') {
                    self_closed = true;
                    i += 2;
                    break;
                }
                i += 1;
                continue;
            }
            _ => {}
        }

        let start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let attr_name = s[start..i].to_ascii_lowercase();

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let mut value = String::new();
        if bytes.get(i) == Some(&b'=') {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match *bytes.get(i)? {
                q @ (b'"' | b'\'') => {
                    let close = s[i + 1..].find(q as char)?;
                    value = unescape(&s[i + 1..i + 1 + close]);
                    i += close + 2;
                }
                _ => {
                    let start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    value = unescape(&s[start..i]);
                }
            }
        }
        if !attr_name.is_empty() {
            attrs.push((attr_name, value));
        }
    }

    let void = VOID_ELEMENTS.contains(&name.as_str());
    Some((
        Element {
            name,
            attrs,
            open_tag: s[..i].to_string(),
            close_tag: None,
            children: Vec::new(),
            void,
            self_closed,
            detached: false,
        },
        i,
    ))
}

/// Byte offset of `needle` in `haystack`, ASCII case-insensitive.
fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}
