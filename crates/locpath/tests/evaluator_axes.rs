//! Axis traversal against a hand-rolled index-based adapter, proving the
//! engine runs on any `XPathNode` implementation, not just `SimpleNode`.

use locpath::model::{NodeKind, QName, XPathNode};
use locpath::{StaticContext, Value, evaluate, evaluate_on, parse_xpath};
use rstest::{fixture, rstest};
use std::sync::Arc;

#[derive(Debug)]
struct Dom {
    nodes: Vec<NodeRec>,
}

#[derive(Debug)]
struct NodeRec {
    kind: NodeKind,
    name: Option<QName>,
    value: String,
    parent: Option<usize>,
    children: Vec<usize>,
    attrs: Vec<usize>,
}

#[derive(Debug, Clone)]
struct Node {
    dom: Arc<Dom>,
    idx: usize,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.dom, &other.dom) && self.idx == other.idx
    }
}
impl Eq for Node {}

impl XPathNode for Node {
    fn kind(&self) -> NodeKind {
        self.dom.nodes[self.idx].kind
    }
    fn name(&self) -> Option<QName> {
        self.dom.nodes[self.idx].name.clone()
    }
    fn string_value(&self) -> String {
        let rec = &self.dom.nodes[self.idx];
        match rec.kind {
            NodeKind::Element | NodeKind::Document => {
                let mut out = String::new();
                fn collect(dom: &Dom, idx: usize, out: &mut String) {
                    let rec = &dom.nodes[idx];
                    if rec.kind == NodeKind::Text {
                        out.push_str(&rec.value);
                    }
                    for &c in &rec.children {
                        collect(dom, c, out);
                    }
                }
                collect(&self.dom, self.idx, &mut out);
                out
            }
            _ => rec.value.clone(),
        }
    }
    fn parent(&self) -> Option<Self> {
        self.dom.nodes[self.idx].parent.map(|i| Node {
            dom: self.dom.clone(),
            idx: i,
        })
    }
    fn children(&self) -> Vec<Self> {
        self.dom.nodes[self.idx]
            .children
            .iter()
            .map(|&i| Node {
                dom: self.dom.clone(),
                idx: i,
            })
            .collect()
    }
    fn attributes(&self) -> Vec<Self> {
        self.dom.nodes[self.idx]
            .attrs
            .iter()
            .map(|&i| Node {
                dom: self.dom.clone(),
                idx: i,
            })
            .collect()
    }
    fn compare_document_order(&self, other: &Self) -> std::cmp::Ordering {
        // Nodes are allocated in document order.
        self.idx.cmp(&other.idx)
    }
}

fn el(dom: &mut Dom, parent: Option<usize>, local: &str) -> usize {
    let i = dom.nodes.len();
    dom.nodes.push(NodeRec {
        kind: NodeKind::Element,
        name: Some(QName::local(local)),
        value: String::new(),
        parent,
        children: vec![],
        attrs: vec![],
    });
    if let Some(p) = parent {
        dom.nodes[p].children.push(i);
    }
    i
}

fn at(dom: &mut Dom, parent: usize, local: &str, value: &str) -> usize {
    let i = dom.nodes.len();
    dom.nodes.push(NodeRec {
        kind: NodeKind::Attribute,
        name: Some(QName::local(local)),
        value: value.into(),
        parent: Some(parent),
        children: vec![],
        attrs: vec![],
    });
    dom.nodes[parent].attrs.push(i);
    i
}

fn tx(dom: &mut Dom, parent: usize, value: &str) -> usize {
    let i = dom.nodes.len();
    dom.nodes.push(NodeRec {
        kind: NodeKind::Text,
        name: None,
        value: value.into(),
        parent: Some(parent),
        children: vec![],
        attrs: vec![],
    });
    dom.nodes[parent].children.push(i);
    i
}

// <root>
//   <a id="x"><a><c>hi</c></a></a>
//   <d/>
//   <a/>
// </root>
fn sample() -> Node {
    let mut d = Dom { nodes: vec![] };
    let root = el(&mut d, None, "root");
    let a1 = el(&mut d, Some(root), "a");
    at(&mut d, a1, "id", "x");
    let a2 = el(&mut d, Some(a1), "a");
    let c = el(&mut d, Some(a2), "c");
    tx(&mut d, c, "hi");
    let _d = el(&mut d, Some(root), "d");
    let _a3 = el(&mut d, Some(root), "a");
    Node {
        dom: Arc::new(d),
        idx: root,
    }
}

#[fixture]
fn root() -> Node {
    sample()
}

fn names(value: &Value<Node>) -> Vec<String> {
    let Value::NodeSet(set) = value else {
        panic!("expected a node-set, got {value:?}");
    };
    set.iter()
        .filter_map(|n| n.name().map(|q| q.local))
        .collect()
}

fn run(expr: &str, context: Node) -> Value<Node> {
    let parsed = parse_xpath(expr).unwrap();
    evaluate_on(&parsed, context).unwrap()
}

#[rstest]
fn descendant_axis_excludes_self(root: Node) {
    let out = run("a/descendant::a", root);
    assert_eq!(names(&out), vec!["a"]);
}

#[rstest]
fn descendant_reaches_depth(root: Node) {
    let out = run("a/descendant::c", root);
    assert_eq!(names(&out), vec!["c"]);
}

#[rstest]
fn parent_and_ancestor(root: Node) {
    let out = run("//c/parent::a", root.clone());
    assert_eq!(names(&out), vec!["a"]);

    let out = run("//c/ancestor::a", root.clone());
    assert_eq!(names(&out), vec!["a", "a"]);

    let out = run("//c/ancestor-or-self::*", root);
    assert_eq!(names(&out), vec!["root", "a", "a", "c"]);
}

#[rstest]
fn following_and_preceding(root: Node) {
    let out = run("a/following::d", root.clone());
    assert_eq!(names(&out), vec!["d"]);

    // The third child of root has two preceding siblings.
    let out = run("*[3]/preceding-sibling::*", root.clone());
    assert_eq!(names(&out), vec!["a", "d"]);

    let out = run("//d/preceding::c", root);
    assert_eq!(names(&out), vec!["c"]);
}

#[rstest]
fn following_excludes_descendants(root: Node) {
    // From the outer <a>, following contains d and the last a, but not
    // the nested <a> or <c>.
    let out = run("a[1]/following::*", root);
    assert_eq!(names(&out), vec!["d", "a"]);
}

#[rstest]
fn attribute_axis(root: Node) {
    let out = run("a/attribute::id", root.clone());
    let Value::NodeSet(set) = &out else {
        panic!("expected node-set")
    };
    assert_eq!(set.len(), 1);
    assert_eq!(set.string_value(), "x");

    let out = run("a/@*", root);
    assert_eq!(names(&out), vec!["id"]);
}

#[rstest]
fn self_axis(root: Node) {
    let out = run("self::root", root.clone());
    assert_eq!(names(&out), vec!["root"]);
    let out = run("self::nothing", root);
    assert_eq!(names(&out), Vec::<String>::new());
}

#[rstest]
#[case("ancestor::missing")]
#[case("ancestor-or-self::missing")]
#[case("attribute::missing")]
#[case("child::missing")]
#[case("descendant::missing")]
#[case("descendant-or-self::missing")]
#[case("following::missing")]
#[case("following-sibling::missing")]
#[case("namespace::missing")]
#[case("parent::missing")]
#[case("preceding::missing")]
#[case("preceding-sibling::missing")]
#[case("self::missing")]
fn every_axis_yields_empty_not_error(#[case] expr: &str, root: Node) {
    let parsed = parse_xpath(expr).unwrap();
    let out = evaluate(&parsed, &StaticContext::default(), &{
        locpath::DynamicContextBuilder::new()
            .with_context_node(root)
            .build()
    })
    .unwrap();
    let Value::NodeSet(set) = out else {
        panic!("expected a node-set");
    };
    assert!(set.is_empty());
}

#[rstest]
fn reverse_axis_proximity_positions(root: Node) {
    // preceding-sibling::*[1] is the *nearest* preceding sibling.
    let out = run("*[3]/preceding-sibling::*[1]", root);
    assert_eq!(names(&out), vec!["d"]);
}

#[rstest]
fn namespace_axis_on_non_element_is_empty(root: Node) {
    let out = run("//c/text()/namespace::*", root);
    let Value::NodeSet(set) = out else {
        panic!("expected a node-set");
    };
    assert!(set.is_empty());
}
