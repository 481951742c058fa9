//! Simple in-memory tree implementing [`XPathNode`], for tests, benches
//! and hosts that need a quick tree without a full XML parser.
//!
//! Nodes are `Arc`-backed handles with pointer identity, so clones are
//! cheap and equality means "same node". The builder wires parent links
//! when `build` runs:
//!
//! ```
//! use locpath::simple_node::{attr, elem, text};
//! use locpath::XPathNode;
//!
//! // <root id="r"><child>Hello</child><child/></root>
//! let root = elem("root")
//!     .attr(attr("id", "r"))
//!     .child(elem("child").child(text("Hello")))
//!     .child(elem("child"))
//!     .build();
//!
//! assert_eq!(root.name().unwrap().local, "root");
//! assert_eq!(root.children().len(), 2);
//! assert_eq!(root.string_value(), "Hello");
//! ```

use std::fmt;
use std::sync::{Arc, RwLock, Weak};

use crate::model::{NodeKind, QName, XPathNode};

pub(crate) struct Inner {
    kind: NodeKind,
    name: Option<QName>,
    value: Option<String>, // text / comment / PI / attribute / namespace content
    parent: RwLock<Option<Weak<Inner>>>,
    namespaces: RwLock<Vec<SimpleNode>>,
    attributes: RwLock<Vec<SimpleNode>>,
    children: RwLock<Vec<SimpleNode>>,
    cached_text: RwLock<Option<String>>, // memoized string-value for element/document
}

/// An `Arc`-backed node handle.
#[derive(Clone)]
pub struct SimpleNode(pub(crate) Arc<Inner>);

impl PartialEq for SimpleNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for SimpleNode {}

impl std::hash::Hash for SimpleNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for SimpleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleNode")
            .field("kind", &self.0.kind)
            .field("name", &self.0.name)
            .field("value", &self.0.value)
            .finish()
    }
}

impl SimpleNode {
    fn new(kind: NodeKind, name: Option<QName>, value: Option<String>) -> Self {
        SimpleNode(Arc::new(Inner {
            kind,
            name,
            value,
            parent: RwLock::new(None),
            namespaces: RwLock::new(Vec::new()),
            attributes: RwLock::new(Vec::new()),
            children: RwLock::new(Vec::new()),
            cached_text: RwLock::new(None),
        }))
    }

    pub fn document() -> SimpleNodeBuilder {
        SimpleNodeBuilder::new(NodeKind::Document, None, None)
    }

    pub fn element(name: &str) -> SimpleNodeBuilder {
        SimpleNodeBuilder::new(NodeKind::Element, Some(QName::local(name)), None)
    }

    pub fn element_ns(prefix: &str, local: &str, uri: &str) -> SimpleNodeBuilder {
        let name = QName {
            prefix: Some(prefix.to_string()),
            local: local.to_string(),
            ns_uri: Some(uri.to_string()),
        };
        SimpleNodeBuilder::new(NodeKind::Element, Some(name), None)
    }

    pub fn attribute(name: &str, value: &str) -> SimpleNode {
        SimpleNode::new(
            NodeKind::Attribute,
            Some(QName::local(name)),
            Some(value.to_string()),
        )
    }

    pub fn attribute_ns(prefix: &str, local: &str, uri: &str, value: &str) -> SimpleNode {
        let name = QName {
            prefix: Some(prefix.to_string()),
            local: local.to_string(),
            ns_uri: Some(uri.to_string()),
        };
        SimpleNode::new(NodeKind::Attribute, Some(name), Some(value.to_string()))
    }

    pub fn text(value: &str) -> SimpleNode {
        SimpleNode::new(NodeKind::Text, None, Some(value.to_string()))
    }

    pub fn comment(value: &str) -> SimpleNode {
        SimpleNode::new(NodeKind::Comment, None, Some(value.to_string()))
    }

    pub fn pi(target: &str, data: &str) -> SimpleNode {
        SimpleNode::new(
            NodeKind::ProcessingInstruction,
            Some(QName::local(target)),
            Some(data.to_string()),
        )
    }

    /// A namespace node. Its expanded-name local part is the prefix (the
    /// empty string for the default namespace); its string-value is the
    /// bound URI.
    pub fn namespace(prefix: &str, uri: &str) -> SimpleNode {
        SimpleNode::new(
            NodeKind::Namespace,
            Some(QName::local(prefix)),
            Some(uri.to_string()),
        )
    }

    /// Resolves a prefix by walking the ancestor-or-self namespace nodes.
    pub fn lookup_namespace_uri(&self, prefix: &str) -> Option<String> {
        let mut cursor: Option<SimpleNode> = Some(self.clone());
        while let Some(node) = cursor {
            for ns in node.namespaces() {
                if ns.name().is_some_and(|q| q.local == prefix) {
                    return Some(ns.string_value());
                }
            }
            cursor = node.parent();
        }
        None
    }
}

pub struct SimpleNodeBuilder {
    node: SimpleNode,
    pending_children: Vec<SimpleNode>,
    pending_attrs: Vec<SimpleNode>,
    pending_ns: Vec<SimpleNode>,
}

impl SimpleNodeBuilder {
    fn new(kind: NodeKind, name: Option<QName>, value: Option<String>) -> Self {
        Self {
            node: SimpleNode::new(kind, name, value),
            pending_children: Vec::new(),
            pending_attrs: Vec::new(),
            pending_ns: Vec::new(),
        }
    }

    pub fn child(mut self, child: impl Into<SimpleNodeOrBuilder>) -> Self {
        match child.into() {
            SimpleNodeOrBuilder::Built(n) => self.pending_children.push(n),
            SimpleNodeOrBuilder::Builder(b) => self.pending_children.push(b.build()),
        }
        self
    }

    pub fn attr(mut self, attr: SimpleNode) -> Self {
        debug_assert!(attr.kind() == NodeKind::Attribute);
        self.pending_attrs.push(attr);
        self
    }

    pub fn namespace(mut self, ns: SimpleNode) -> Self {
        debug_assert!(ns.kind() == NodeKind::Namespace);
        self.pending_ns.push(ns);
        self
    }

    pub fn build(self) -> SimpleNode {
        {
            let mut namespaces = self.node.0.namespaces.write().unwrap();
            for ns in &self.pending_ns {
                *ns.0.parent.write().unwrap() = Some(Arc::downgrade(&self.node.0));
            }
            namespaces.extend(self.pending_ns);
        }
        {
            let mut attributes = self.node.0.attributes.write().unwrap();
            for attr in &self.pending_attrs {
                *attr.0.parent.write().unwrap() = Some(Arc::downgrade(&self.node.0));
            }
            attributes.extend(self.pending_attrs);
        }
        {
            let mut children = self.node.0.children.write().unwrap();
            for child in &self.pending_children {
                *child.0.parent.write().unwrap() = Some(Arc::downgrade(&self.node.0));
            }
            children.extend(self.pending_children);
        }
        self.node
    }
}

pub enum SimpleNodeOrBuilder {
    Built(SimpleNode),
    Builder(SimpleNodeBuilder),
}

impl From<SimpleNode> for SimpleNodeOrBuilder {
    fn from(n: SimpleNode) -> Self {
        SimpleNodeOrBuilder::Built(n)
    }
}

impl From<SimpleNodeBuilder> for SimpleNodeOrBuilder {
    fn from(b: SimpleNodeBuilder) -> Self {
        SimpleNodeOrBuilder::Builder(b)
    }
}

// Concise helpers for test code.
pub fn doc() -> SimpleNodeBuilder {
    SimpleNode::document()
}
pub fn elem(name: &str) -> SimpleNodeBuilder {
    SimpleNode::element(name)
}
pub fn elem_ns(prefix: &str, local: &str, uri: &str) -> SimpleNodeBuilder {
    SimpleNode::element_ns(prefix, local, uri)
}
pub fn text(v: &str) -> SimpleNode {
    SimpleNode::text(v)
}
pub fn attr(name: &str, v: &str) -> SimpleNode {
    SimpleNode::attribute(name, v)
}
pub fn attr_ns(prefix: &str, local: &str, uri: &str, v: &str) -> SimpleNode {
    SimpleNode::attribute_ns(prefix, local, uri, v)
}
pub fn comment(v: &str) -> SimpleNode {
    SimpleNode::comment(v)
}
pub fn pi(target: &str, data: &str) -> SimpleNode {
    SimpleNode::pi(target, data)
}
pub fn ns(prefix: &str, uri: &str) -> SimpleNode {
    SimpleNode::namespace(prefix, uri)
}

impl XPathNode for SimpleNode {
    fn kind(&self) -> NodeKind {
        self.0.kind
    }

    fn name(&self) -> Option<QName> {
        self.0.name.clone()
    }

    fn string_value(&self) -> String {
        match self.kind() {
            NodeKind::Element | NodeKind::Document => {
                if let Some(cached) = self.0.cached_text.read().unwrap().clone() {
                    return cached;
                }
                fn collect(node: &SimpleNode, out: &mut String) {
                    if node.kind() == NodeKind::Text
                        && let Some(v) = &node.0.value
                    {
                        out.push_str(v);
                    }
                    for child in node.children() {
                        collect(&child, out);
                    }
                }
                let mut out = String::new();
                collect(self, &mut out);
                *self.0.cached_text.write().unwrap() = Some(out.clone());
                out
            }
            _ => self.0.value.clone().unwrap_or_default(),
        }
    }

    fn parent(&self) -> Option<Self> {
        self.0
            .parent
            .read()
            .ok()?
            .as_ref()
            .and_then(Weak::upgrade)
            .map(SimpleNode)
    }

    fn children(&self) -> Vec<Self> {
        self.0.children.read().unwrap().clone()
    }

    fn attributes(&self) -> Vec<Self> {
        self.0.attributes.read().unwrap().clone()
    }

    fn namespaces(&self) -> Vec<Self> {
        self.0.namespaces.read().unwrap().clone()
    }
}
