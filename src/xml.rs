//! # Ordered XML Document Tree
//!
//! This module is the document-access layer for the merge engine: an
//! ordered, mutable element tree parsed from `quick-xml` events and
//! serialized back by walking the tree.
//!
//! The representation is deliberately lossless for everything the engine
//! does not touch. Whitespace between elements is kept as ordinary text
//! nodes, comments and attributes are kept in place, and serialization
//! re-emits them verbatim. The engine only ever splices new nodes in at
//! computed positions (together with matching indentation), so a
//! hand-maintained document round-trips byte-for-byte outside the touched
//! sub-trees.
//!
//! ## Key Types
//!
//! - [`Document`]: the parsed tree plus its prolog, trailing content, and
//!   the detected indentation unit.
//! - [`Element`]: a named node with attributes, ordered children, and
//!   read-only query helpers (`find`, `child_text`, `descendants_named`).
//! - [`ElementMut`]: a mutation handle that tracks depth so that inserted
//!   elements and comments pick up the document's indentation style.
//! - [`Position`]: where to place a newly created child relative to its
//!   existing siblings.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use quick_xml::escape::{partial_escape, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};

/// Indentation unit assumed when a document carries no detectable one.
const DEFAULT_INDENT: &str = "    ";

/// A node in the ordered document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(Element),
    /// Character data, including whitespace-only formatting runs. Stored
    /// in raw source form (entity references intact) and re-emitted
    /// verbatim; [`Element::text`] unescapes on read.
    Text(String),
    /// Comment content, stored without the `<!--`/`-->` delimiters.
    Comment(String),
}

impl XmlNode {
    fn is_whitespace(&self) -> bool {
        matches!(self, XmlNode::Text(t) if t.chars().all(char::is_whitespace))
    }
}

/// Where to insert a newly created child among its siblings.
#[derive(Debug, Clone, PartialEq)]
pub enum Position {
    /// Immediately before the first existing element with the given tag.
    Before(String),
    /// Immediately after the first existing element with the given tag.
    After(String),
    /// At the end of the parent's children.
    Last,
}

/// A named element with ordered children.
///
/// Attributes are validated at parse time but never interpreted by the
/// engine; the start tag's attribute text is kept as the raw source slice
/// (whitespace and all) and re-emitted verbatim. Element identity among
/// siblings is by tag name for singleton sections; repeated collections
/// are told apart by the text of a designated child, which is the
/// caller's concern.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    name: String,
    /// Raw source between the tag name and the closing `>`, empty for
    /// elements created by the engine.
    attr_source: String,
    children: Vec<XmlNode>,
    self_closing: bool,
}

impl Element {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            attr_source: String::new(),
            children: Vec::new(),
            self_closing: false,
        }
    }

    /// Tag name of this element.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All child nodes, in document order.
    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    /// Iterator over element children only.
    pub fn element_children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    /// Iterator over element children with the given tag name.
    ///
    /// The returned iterator borrows only from `self`, so the name may be
    /// a transient string.
    pub fn children_named(&self, name: &str) -> impl Iterator<Item = &Element> {
        let name = name.to_string();
        self.element_children().filter(move |el| el.name == name)
    }

    /// First element child with the given tag name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children_named(name).next()
    }

    /// Mutable access to the first element child with the given tag name.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|n| match n {
            XmlNode::Element(el) if el.name == name => Some(el),
            _ => None,
        })
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.child(name).is_some()
    }

    /// Concatenated text content, unescaped and trimmed.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            if let XmlNode::Text(t) = node {
                match unescape(t) {
                    Ok(unescaped) => out.push_str(&unescaped),
                    Err(_) => out.push_str(t),
                }
            }
        }
        out.trim().to_string()
    }

    /// Trimmed text of the first child element with the given tag name.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).map(Element::text)
    }

    /// Evaluate a slash-separated path of tag names, returning every match.
    ///
    /// `find("build/plugins/plugin")` walks element children level by
    /// level; each segment fans out over all matches of the previous one.
    pub fn find(&self, path: &str) -> Vec<&Element> {
        let mut current = vec![self];
        for segment in path.split('/') {
            let mut next = Vec::new();
            for el in current {
                next.extend(el.children_named(segment));
            }
            current = next;
        }
        current
    }

    /// All descendant elements with the given tag name, at any depth.
    pub fn descendants_named<'a>(&'a self, name: &'a str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        for el in self.element_children() {
            if el.name == name {
                found.push(el);
            }
            found.extend(el.descendants_named(name));
        }
        found
    }

    /// Replace the element's content with a single text node, escaping
    /// the markup-significant characters.
    ///
    /// Leaf semantics: intended for value-carrying elements like `url` or
    /// `version`, not for sections with element children.
    pub(crate) fn set_text(&mut self, text: &str) {
        self.children = vec![XmlNode::Text(partial_escape(text).into_owned())];
        self.self_closing = false;
    }

    /// Remove every element child with the given tag name matching the
    /// predicate, along with its preceding indentation run. Returns the
    /// number of elements removed.
    pub fn remove_children_where(
        &mut self,
        name: &str,
        predicate: impl Fn(&Element) -> bool,
    ) -> usize {
        let mut doomed: Vec<usize> = self
            .children
            .iter()
            .enumerate()
            .filter_map(|(i, n)| match n {
                XmlNode::Element(el) if el.name == name && predicate(el) => Some(i),
                _ => None,
            })
            .collect();
        let removed = doomed.len();
        // Back to front so earlier indices stay valid.
        doomed.reverse();
        for i in doomed {
            self.children.remove(i);
            if i > 0 && self.children[i - 1].is_whitespace() {
                self.children.remove(i - 1);
            }
        }
        removed
    }

    fn element_index(&self, name: &str) -> Option<usize> {
        self.children.iter().position(|n| match n {
            XmlNode::Element(el) => el.name == name,
            _ => false,
        })
    }

    /// Insert a node at the given position, splicing in an indentation run
    /// so the result reads as if it had always been there. Returns the
    /// index of the inserted node.
    fn insert_node(&mut self, node: XmlNode, pos: &Position, unit: &str, depth: usize) -> usize {
        let lead = format!("\n{}", unit.repeat(depth + 1));
        let close = format!("\n{}", unit.repeat(depth));
        let target = match pos {
            Position::Before(t) => self.element_index(t).map(|i| (i, true)),
            Position::After(t) => self.element_index(t).map(|i| (i, false)),
            Position::Last => None,
        };
        match target {
            Some((i, true)) => {
                self.children.insert(i, XmlNode::Text(lead));
                self.children.insert(i, node);
                i
            }
            Some((i, false)) => {
                self.children.insert(i + 1, XmlNode::Text(lead));
                self.children.insert(i + 2, node);
                i + 2
            }
            None => match self.children.last() {
                // Slot in before the closing tag's indentation run.
                Some(n) if n.is_whitespace() => {
                    let i = self.children.len() - 1;
                    self.children.insert(i, XmlNode::Text(lead));
                    self.children.insert(i + 1, node);
                    i + 1
                }
                _ => {
                    self.children.push(XmlNode::Text(lead));
                    self.children.push(node);
                    self.children.push(XmlNode::Text(close));
                    self.children.len() - 2
                }
            },
        }
    }

    fn insert_element(
        &mut self,
        el: Element,
        pos: &Position,
        unit: &str,
        depth: usize,
    ) -> &mut Element {
        let idx = self.insert_node(XmlNode::Element(el), pos, unit, depth);
        match &mut self.children[idx] {
            XmlNode::Element(el) => el,
            _ => unreachable!("insert_node returned a non-element index"),
        }
    }

    fn get_or_create_child(
        &mut self,
        name: &str,
        pos: &Position,
        unit: &str,
        depth: usize,
    ) -> &mut Element {
        if let Some(i) = self.element_index(name) {
            match &mut self.children[i] {
                XmlNode::Element(el) => return el,
                _ => unreachable!("element_index returned a non-element index"),
            }
        }
        self.insert_element(Element::new(name), pos, unit, depth)
    }
}

/// A mutation handle over one element of a [`Document`].
///
/// Tracks the element's depth and the document's indentation unit so that
/// every created element, comment, and text run lands with formatting that
/// matches the surrounding document. Handles for child elements are
/// obtained through [`get_or_create`](Self::get_or_create) and
/// [`add`](Self::add) and borrow from their parent handle.
pub struct ElementMut<'a> {
    el: &'a mut Element,
    unit: &'a str,
    depth: usize,
}

impl<'a> ElementMut<'a> {
    /// Get the first child with this tag, creating it at the end if absent.
    pub fn get_or_create(&mut self, name: &str) -> ElementMut<'_> {
        self.get_or_create_at(name, &Position::Last)
    }

    /// Get the first child with this tag, creating it at `pos` if absent.
    ///
    /// If the position's reference tag no longer exists the child is
    /// appended at the end instead.
    pub fn get_or_create_at(&mut self, name: &str, pos: &Position) -> ElementMut<'_> {
        ElementMut {
            el: self.el.get_or_create_child(name, pos, self.unit, self.depth),
            unit: self.unit,
            depth: self.depth + 1,
        }
    }

    /// Append a new child element regardless of existing ones.
    pub fn add(&mut self, name: &str) -> ElementMut<'_> {
        ElementMut {
            el: self
                .el
                .insert_element(Element::new(name), &Position::Last, self.unit, self.depth),
            unit: self.unit,
            depth: self.depth + 1,
        }
    }

    /// Replace this element's content with the given text.
    pub fn set_text(&mut self, text: &str) {
        self.el.set_text(text);
    }

    /// Get-or-create a leaf child and overwrite its text.
    pub fn set_child_text(&mut self, name: &str, text: &str) {
        self.get_or_create(name).set_text(text);
    }

    /// Append a comment node, padded the way hand-written comments are.
    pub fn add_comment(&mut self, text: &str) {
        self.el.insert_node(
            XmlNode::Comment(format!(" {} ", text)),
            &Position::Last,
            self.unit,
            self.depth,
        );
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.el.has_child(name)
    }

    /// Read-only view of the underlying element.
    pub fn as_element(&self) -> &Element {
        self.el
    }
}

/// A parsed build-descriptor document.
///
/// Owns the root element plus everything around it: the XML declaration
/// (kept as the raw source slice), any comments or whitespace before the
/// root, and trailing content such as the final newline.
#[derive(Debug, Clone)]
pub struct Document {
    prolog: String,
    leading: Vec<XmlNode>,
    root: Element,
    trailing: Vec<XmlNode>,
    indent_unit: String,
}

impl Document {
    /// Parse a document from its source text.
    pub fn parse(src: &str) -> Result<Self> {
        let (prolog, body) = split_prolog(src);
        let mut reader = Reader::from_str(body);

        let mut leading = Vec::new();
        let mut trailing = Vec::new();
        let mut root: Option<Element> = None;
        let mut stack: Vec<Element> = Vec::new();

        loop {
            let event = reader.read_event().map_err(|e| Error::Document {
                message: format!("malformed XML: {}", e),
            })?;
            match event {
                Event::Start(e) => {
                    if stack.is_empty() && root.is_some() {
                        return Err(Error::Document {
                            message: "multiple root elements".to_string(),
                        });
                    }
                    stack.push(element_from_start(&e)?);
                }
                Event::Empty(e) => {
                    let mut el = element_from_start(&e)?;
                    el.self_closing = true;
                    attach(
                        XmlNode::Element(el),
                        &mut stack,
                        &mut root,
                        &mut leading,
                        &mut trailing,
                    )?;
                }
                Event::End(_) => {
                    let el = stack.pop().ok_or_else(|| Error::Document {
                        message: "unbalanced closing tag".to_string(),
                    })?;
                    attach(
                        XmlNode::Element(el),
                        &mut stack,
                        &mut root,
                        &mut leading,
                        &mut trailing,
                    )?;
                }
                Event::Text(t) => {
                    // Validate entity references up front; the raw source
                    // form is what gets stored and re-emitted.
                    t.unescape().map_err(|e| Error::Document {
                        message: format!("malformed text content: {}", e),
                    })?;
                    let text = String::from_utf8_lossy(&t).into_owned();
                    attach(
                        XmlNode::Text(text),
                        &mut stack,
                        &mut root,
                        &mut leading,
                        &mut trailing,
                    )?;
                }
                Event::CData(t) => {
                    // CDATA content is plain character data once parsed;
                    // escape it so the re-emitted form stays well-formed.
                    let text = partial_escape(&String::from_utf8_lossy(&t)).into_owned();
                    attach(
                        XmlNode::Text(text),
                        &mut stack,
                        &mut root,
                        &mut leading,
                        &mut trailing,
                    )?;
                }
                Event::Comment(t) => {
                    let text = String::from_utf8_lossy(&t).into_owned();
                    attach(
                        XmlNode::Comment(text),
                        &mut stack,
                        &mut root,
                        &mut leading,
                        &mut trailing,
                    )?;
                }
                Event::Eof => break,
                // Processing instructions and doctypes do not occur in
                // build descriptors; they are dropped rather than modeled.
                other => {
                    log::warn!("ignoring unsupported XML construct: {:?}", other);
                }
            }
        }

        let root = root.ok_or_else(|| Error::Document {
            message: "document has no root element".to_string(),
        })?;
        let indent_unit = detect_indent(&root);
        Ok(Document {
            prolog,
            leading,
            root,
            trailing,
            indent_unit,
        })
    }

    /// Load a document from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let src = fs::read_to_string(path).map_err(|e| Error::Document {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::parse(&src)
    }

    /// Serialize and write the document back to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_xml())?;
        Ok(())
    }

    /// Serialize the document to its textual form.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.prolog);
        for node in &self.leading {
            write_node(&mut out, node);
        }
        write_element(&mut out, &self.root);
        for node in &self.trailing {
            write_node(&mut out, node);
        }
        out
    }

    /// The document element.
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Mutable access to the document element, for structural removal.
    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Formatting-aware mutation handle on the document element.
    pub fn edit_root(&mut self) -> ElementMut<'_> {
        ElementMut {
            el: &mut self.root,
            unit: &self.indent_unit,
            depth: 0,
        }
    }

    /// Indentation unit detected at parse time.
    pub fn indent_unit(&self) -> &str {
        &self.indent_unit
    }
}

/// Peel off the XML declaration (and any whitespace before it) as a raw
/// source slice, so it round-trips exactly.
fn split_prolog(src: &str) -> (String, &str) {
    let ws_len = src.len() - src.trim_start().len();
    let rest = &src[ws_len..];
    if rest.starts_with("<?xml") {
        if let Some(end) = rest.find("?>") {
            let cut = ws_len + end + 2;
            return (src[..cut].to_string(), &src[cut..]);
        }
    }
    (String::new(), src)
}

fn element_from_start(e: &BytesStart) -> Result<Element> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    // Validate the attributes, then keep their raw source so the start
    // tag (line breaks between attributes included) re-emits verbatim.
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::Document {
            message: format!("bad attribute in <{}>: {}", name, err),
        })?;
        attr.unescape_value().map_err(|err| Error::Document {
            message: format!("bad attribute value in <{}>: {}", name, err),
        })?;
    }
    let attr_source = String::from_utf8_lossy(e.attributes_raw()).into_owned();
    Ok(Element {
        name,
        attr_source,
        children: Vec::new(),
        self_closing: false,
    })
}

fn attach(
    node: XmlNode,
    stack: &mut Vec<Element>,
    root: &mut Option<Element>,
    leading: &mut Vec<XmlNode>,
    trailing: &mut Vec<XmlNode>,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    match node {
        XmlNode::Element(el) => {
            if root.is_some() {
                return Err(Error::Document {
                    message: "multiple root elements".to_string(),
                });
            }
            *root = Some(el);
        }
        other => {
            if root.is_none() {
                leading.push(other);
            } else {
                trailing.push(other);
            }
        }
    }
    Ok(())
}

/// Derive the indentation unit from the run of whitespace before the
/// root's first element child.
fn detect_indent(root: &Element) -> String {
    let mut pending: Option<&str> = None;
    for node in &root.children {
        match node {
            XmlNode::Text(t) if t.chars().all(char::is_whitespace) => {
                if let Some(i) = t.rfind('\n') {
                    pending = Some(&t[i + 1..]);
                }
            }
            XmlNode::Element(_) => {
                if let Some(unit) = pending {
                    if !unit.is_empty() {
                        return unit.to_string();
                    }
                }
                break;
            }
            _ => {}
        }
    }
    DEFAULT_INDENT.to_string()
}

fn write_node(out: &mut String, node: &XmlNode) {
    match node {
        XmlNode::Element(el) => write_element(out, el),
        // Text is stored in raw source form, so no escaping on the way out.
        XmlNode::Text(t) => out.push_str(t),
        XmlNode::Comment(t) => {
            let _ = write!(out, "<!--{}-->", t);
        }
    }
}

fn write_element(out: &mut String, el: &Element) {
    out.push('<');
    out.push_str(&el.name);
    out.push_str(&el.attr_source);
    if el.self_closing && el.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &el.children {
        write_node(out, child);
    }
    let _ = write!(out, "</{}>", el.name);
}
