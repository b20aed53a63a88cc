//! Node tree.
//!
//! A small reference-counted DOM: elements, text, comments and fragments.
//! Parents own their children; a child only holds a weak link back, so a
//! detached subtree is freed as soon as the last handle to it is dropped.
//!
//! Identity matters more than structure here. Two `Node` handles are equal
//! only if they point at the same node, and moving a node (appending it
//! somewhere else) keeps its identity.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::events::{Event, EventHandler, Listener, ListenerId};

/// Elements that never have children or a closing tag.
pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

// =============================================================================
// Node Kind
// =============================================================================

/// What a node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Element with a lower-cased tag name.
    Element(String),
    /// Text content.
    Text,
    /// Comment, used for slot markers.
    Comment,
    /// Detached container whose children move when it is inserted.
    Fragment,
}

impl NodeKind {
    /// Short label for diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Element(_) => "element",
            NodeKind::Text => "text",
            NodeKind::Comment => "comment",
            NodeKind::Fragment => "fragment",
        }
    }
}

// =============================================================================
// Node
// =============================================================================

struct NodeInner {
    kind: NodeKind,
    parent: RefCell<Weak<NodeInner>>,
    children: RefCell<Vec<Node>>,
    attributes: RefCell<Vec<(String, String)>>,
    text: RefCell<String>,
    listeners: RefCell<Vec<Listener>>,
}

/// Handle to a node in the tree.
#[derive(Clone)]
pub struct Node(Rc<NodeInner>);

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.kind {
            NodeKind::Element(tag) => write!(f, "Node(<{tag}>)"),
            NodeKind::Text => write!(f, "Node(text {:?})", self.0.text.borrow()),
            NodeKind::Comment => write!(f, "Node(<!--{}-->)", self.0.text.borrow()),
            NodeKind::Fragment => write!(f, "Node(fragment)"),
        }
    }
}

impl Node {
    fn new(kind: NodeKind, text: String) -> Self {
        Node(Rc::new(NodeInner {
            kind,
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            attributes: RefCell::new(Vec::new()),
            text: RefCell::new(text),
            listeners: RefCell::new(Vec::new()),
        }))
    }

    /// Create an element. The tag is lower-cased.
    pub fn element(tag: &str) -> Self {
        Self::new(NodeKind::Element(tag.to_ascii_lowercase()), String::new())
    }

    /// Create a text node.
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(NodeKind::Text, content.into())
    }

    /// Create a comment node.
    pub fn comment(content: impl Into<String>) -> Self {
        Self::new(NodeKind::Comment, content.into())
    }

    /// Create an empty fragment.
    pub fn fragment() -> Self {
        Self::new(NodeKind::Fragment, String::new())
    }

    pub fn kind(&self) -> &NodeKind {
        &self.0.kind
    }

    pub fn is_element(&self) -> bool {
        matches!(self.0.kind, NodeKind::Element(_))
    }

    /// Tag name if this is an element.
    pub fn tag(&self) -> Option<&str> {
        match &self.0.kind {
            NodeKind::Element(tag) => Some(tag.as_str()),
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Attributes
    // -------------------------------------------------------------------------

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.0
            .attributes
            .borrow()
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attribute(&self, name: &str, value: impl Into<String>) {
        let value = value.into();
        let mut attributes = self.0.attributes.borrow_mut();
        match attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => attributes.push((name.to_string(), value)),
        }
    }

    // -------------------------------------------------------------------------
    // Tree Navigation
    // -------------------------------------------------------------------------

    pub fn parent(&self) -> Option<Node> {
        self.0.parent.borrow().upgrade().map(Node)
    }

    pub fn children(&self) -> Vec<Node> {
        self.0.children.borrow().clone()
    }

    pub fn child_count(&self) -> usize {
        self.0.children.borrow().len()
    }

    pub fn first_child(&self) -> Option<Node> {
        self.0.children.borrow().first().cloned()
    }

    pub fn next_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let siblings = parent.0.children.borrow();
        let index = siblings.iter().position(|sibling| sibling == self)?;
        siblings.get(index + 1).cloned()
    }

    /// True if `other` is this node or one of its descendants.
    pub fn contains(&self, other: &Node) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if node == *self {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// All descendants in document (pre-) order, not including this node.
    pub fn descendants(&self) -> Vec<Node> {
        let mut out = Vec::new();
        let mut stack: Vec<Node> = self.children().into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            stack.extend(node.children().into_iter().rev());
            out.push(node);
        }
        out
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Append a child, moving it out of its current parent.
    ///
    /// Appending a fragment moves all of its children and leaves it empty.
    pub fn append_child(&self, child: &Node) {
        self.insert_before(child, None);
    }

    /// Insert `new` before `reference`, or at the end if `reference` is `None`
    /// or not a child of this node.
    ///
    /// Inserting an ancestor of this node (or the node itself) is ignored.
    pub fn insert_before(&self, new: &Node, reference: Option<&Node>) {
        if new.contains(self) {
            return;
        }
        if matches!(new.0.kind, NodeKind::Fragment) {
            for child in new.children() {
                self.insert_before(&child, reference);
            }
            return;
        }

        new.remove();
        {
            let mut children = self.0.children.borrow_mut();
            let index = reference
                .and_then(|r| children.iter().position(|child| child == r))
                .unwrap_or(children.len());
            children.insert(index, new.clone());
        }
        *new.0.parent.borrow_mut() = Rc::downgrade(&self.0);
    }

    /// Detach this node from its parent. No-op if it has none.
    pub fn remove(&self) {
        let parent = self.0.parent.replace(Weak::new()).upgrade();
        if let Some(parent) = parent {
            parent
                .children
                .borrow_mut()
                .retain(|child| !Rc::ptr_eq(&child.0, &self.0));
        }
    }

    // -------------------------------------------------------------------------
    // Text
    // -------------------------------------------------------------------------

    /// Text of a text/comment node, or the concatenated text of all text
    /// descendants otherwise.
    pub fn text_content(&self) -> String {
        match self.0.kind {
            NodeKind::Text | NodeKind::Comment => self.0.text.borrow().clone(),
            _ => self
                .descendants()
                .iter()
                .filter(|node| matches!(node.0.kind, NodeKind::Text))
                .map(|node| node.0.text.borrow().clone())
                .collect(),
        }
    }

    /// Serialize this node (and its subtree) as markup.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match &self.0.kind {
            NodeKind::Element(tag) => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in self.0.attributes.borrow().iter() {
                    out.push(' ');
                    out.push_str(name);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape(value, true));
                        out.push('"');
                    }
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                for child in self.0.children.borrow().iter() {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            NodeKind::Text => out.push_str(&escape(&self.0.text.borrow(), false)),
            NodeKind::Comment => {
                out.push_str("<!--");
                out.push_str(&self.0.text.borrow());
                out.push_str("-->");
            }
            NodeKind::Fragment => {
                for child in self.0.children.borrow().iter() {
                    child.write_html(out);
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    /// Register a listener for `event`.
    pub fn add_listener(&self, event: &str, handler: impl Fn(&Event) + 'static) -> ListenerId {
        let id = ListenerId::next();
        let handler: EventHandler = Rc::new(handler);
        self.0.listeners.borrow_mut().push(Listener {
            id,
            event: event.to_string(),
            handler,
        });
        id
    }

    /// Remove a listener. Returns false if it was not registered here.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.0.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|listener| listener.id != id);
        listeners.len() != before
    }

    /// Invoke every listener registered for `event`. Returns how many ran.
    ///
    /// Handlers may add or remove listeners; they take effect on the next
    /// dispatch.
    pub fn dispatch(&self, event: &str) -> usize {
        let handlers: Vec<EventHandler> = self
            .0
            .listeners
            .borrow()
            .iter()
            .filter(|listener| listener.event == event)
            .map(|listener| listener.handler.clone())
            .collect();

        let payload = Event {
            kind: event.to_string(),
            target: self.clone(),
        };
        for handler in &handlers {
            handler(&payload);
        }
        handlers.len()
    }

    /// Number of listeners registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.0
            .listeners
            .borrow()
            .iter()
            .filter(|listener| listener.event == event)
            .count()
    }
}

fn escape(value: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
