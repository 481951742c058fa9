//! Tree-walk evaluator.
//!
//! One exhaustive match over the AST — the grammar is a closed set, so
//! every new variant is a compile error here until handled. Evaluation
//! never mutates a context: predicates and nested expressions run against
//! derived contexts carrying their own node, position and size.

use smallvec::SmallVec;
use tracing::trace;

use crate::error::EvalError;
use crate::model::{NodeKind, PrincipalNodeKind, QName, XPathNode};
use crate::namespaces::ExpandedName;
use crate::parser::ast::{
    Axis, BinaryOp, Expr, KindTest, NameTest, NodeTest, PathExpr, PathStart, Step,
};
use crate::runtime::{CallCtx, DynamicContext, DynamicContextBuilder, StaticContext};
use crate::value::{NodeSet, Value, parse_number};

/// Evaluates a parsed expression. The AST is read-only and stays usable
/// after an error; only the failing call is aborted.
pub fn evaluate<N: XPathNode>(
    expr: &Expr,
    static_ctx: &StaticContext,
    dyn_ctx: &DynamicContext<N>,
) -> Result<Value<N>, EvalError> {
    match expr {
        Expr::Literal(s) => Ok(Value::String(s.clone())),
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::VarRef(name) => {
            let expanded = expand_name(name, static_ctx)?;
            dyn_ctx
                .variables
                .get(&expanded)
                .cloned()
                .ok_or_else(|| EvalError::UnknownVariable(name.lexical()))
        }
        Expr::FunctionCall { name, args } => {
            let expanded = expand_name(name, static_ctx)?;
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate(arg, static_ctx, dyn_ctx)?);
            }
            let func = dyn_ctx
                .functions
                .resolve(&expanded, values.len())
                .map_err(|e| e.into_eval_error(&name.lexical(), values.len()))?;
            let call_ctx = CallCtx {
                dyn_ctx,
                static_ctx,
            };
            func(&call_ctx, &values)
        }
        Expr::Binary { left, op, right } => match op {
            BinaryOp::Or => {
                let l = evaluate(left, static_ctx, dyn_ctx)?;
                if l.boolean() {
                    return Ok(Value::Boolean(true));
                }
                let r = evaluate(right, static_ctx, dyn_ctx)?;
                Ok(Value::Boolean(r.boolean()))
            }
            BinaryOp::And => {
                let l = evaluate(left, static_ctx, dyn_ctx)?;
                if !l.boolean() {
                    return Ok(Value::Boolean(false));
                }
                let r = evaluate(right, static_ctx, dyn_ctx)?;
                Ok(Value::Boolean(r.boolean()))
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                let l = evaluate(left, static_ctx, dyn_ctx)?;
                let r = evaluate(right, static_ctx, dyn_ctx)?;
                Ok(Value::Boolean(compare_equality(
                    &l,
                    &r,
                    *op == BinaryOp::Ne,
                )))
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let l = evaluate(left, static_ctx, dyn_ctx)?;
                let r = evaluate(right, static_ctx, dyn_ctx)?;
                Ok(Value::Boolean(compare_relational(*op, &l, &r)))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let l = evaluate(left, static_ctx, dyn_ctx)?.number();
                let r = evaluate(right, static_ctx, dyn_ctx)?.number();
                // IEEE semantics throughout: x div 0 is ±Infinity, 0 div 0
                // is NaN. Never an error.
                let result = match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => l / r,
                    BinaryOp::Mod => l % r,
                    _ => unreachable!(),
                };
                Ok(Value::Number(result))
            }
        },
        Expr::Negate(inner) => {
            let v = evaluate(inner, static_ctx, dyn_ctx)?;
            Ok(Value::Number(-v.number()))
        }
        Expr::Union { left, right } => {
            let mut nodes = evaluate(left, static_ctx, dyn_ctx)?
                .into_node_set()?
                .into_vec();
            nodes.extend(evaluate(right, static_ctx, dyn_ctx)?.into_node_set()?);
            Ok(Value::NodeSet(NodeSet::from_nodes(nodes)))
        }
        Expr::Path(path) => eval_path(path, static_ctx, dyn_ctx),
        Expr::Filter {
            primary,
            predicates,
        } => {
            let set = evaluate(primary, static_ctx, dyn_ctx)?.into_node_set()?;
            let mut nodes = set.into_vec();
            for pred in predicates {
                nodes = apply_predicate(pred, nodes, static_ctx, dyn_ctx)?;
            }
            Ok(Value::NodeSet(NodeSet::from_document_order(nodes)))
        }
    }
}

/// Evaluates against a bare context node with default contexts — the
/// common host entry point.
pub fn evaluate_on<N: XPathNode>(expr: &Expr, context_node: N) -> Result<Value<N>, EvalError> {
    let dyn_ctx = DynamicContextBuilder::new()
        .with_context_node(context_node)
        .build();
    evaluate(expr, &StaticContext::default(), &dyn_ctx)
}

fn expand_name(name: &QName, static_ctx: &StaticContext) -> Result<ExpandedName, EvalError> {
    let ns_uri = match &name.prefix {
        Some(prefix) => Some(static_ctx.namespaces.resolve(prefix)?.to_string()),
        None => None,
    };
    Ok(ExpandedName::new(ns_uri, name.local.clone()))
}

fn eval_path<N: XPathNode>(
    path: &PathExpr,
    static_ctx: &StaticContext,
    dyn_ctx: &DynamicContext<N>,
) -> Result<Value<N>, EvalError> {
    let context_node = || {
        dyn_ctx
            .context_node
            .clone()
            .ok_or(EvalError::MissingContextNode)
    };
    let start: Vec<N> = match &path.start {
        PathStart::Root => vec![root_of(context_node()?)],
        PathStart::Relative => vec![context_node()?],
        PathStart::Filter(expr) => evaluate(expr, static_ctx, dyn_ctx)?
            .into_node_set()?
            .into_vec(),
    };
    let mut current = NodeSet::from_nodes(start);
    for step in &path.steps {
        current = eval_step(step, &current, static_ctx, dyn_ctx)?;
        trace!(
            axis = step.axis.as_str(),
            nodes = current.len(),
            "location step"
        );
    }
    Ok(Value::NodeSet(current))
}

/// One location step: for every node of the input set, collect the axis's
/// candidates in axis order, filter by node test, then run each predicate
/// with proximity positions over the *current* filtered list. The union
/// of all per-node results is deduplicated and document-ordered.
fn eval_step<N: XPathNode>(
    step: &Step,
    input: &NodeSet<N>,
    static_ctx: &StaticContext,
    dyn_ctx: &DynamicContext<N>,
) -> Result<NodeSet<N>, EvalError> {
    let mut output: Vec<N> = Vec::new();
    for node in input {
        let mut matched: SmallVec<[N; 8]> = SmallVec::new();
        for candidate in apply_axis(node, step.axis) {
            if matches_node_test(&candidate, step.axis, &step.test, static_ctx)? {
                matched.push(candidate);
            }
        }
        let mut matched: Vec<N> = matched.into_vec();
        for pred in &step.predicates {
            matched = apply_predicate(pred, matched, static_ctx, dyn_ctx)?;
        }
        output.extend(matched);
    }
    Ok(NodeSet::from_nodes(output))
}

fn apply_predicate<N: XPathNode>(
    pred: &Expr,
    candidates: Vec<N>,
    static_ctx: &StaticContext,
    dyn_ctx: &DynamicContext<N>,
) -> Result<Vec<N>, EvalError> {
    let size = candidates.len();
    let mut kept = Vec::new();
    for (index, node) in candidates.into_iter().enumerate() {
        let position = index + 1;
        let local = dyn_ctx.derived(node.clone(), position, size);
        let value = evaluate(pred, static_ctx, &local)?;
        if predicate_truth(&value, position) {
            kept.push(node);
        }
    }
    Ok(kept)
}

/// A number predicate is a proximity-position test; everything else goes
/// through boolean().
fn predicate_truth<N: XPathNode>(value: &Value<N>, position: usize) -> bool {
    match value {
        Value::Number(n) => *n == position as f64,
        other => other.boolean(),
    }
}

fn root_of<N: XPathNode>(mut node: N) -> N {
    while let Some(parent) = node.parent() {
        node = parent;
    }
    node
}

fn push_subtree<N: XPathNode>(node: &N, out: &mut Vec<N>) {
    out.push(node.clone());
    for child in node.children() {
        push_subtree(&child, out);
    }
}

/// Subtree in reverse document order: descendants before their ancestors,
/// later siblings first.
fn push_subtree_rev<N: XPathNode>(node: &N, out: &mut Vec<N>) {
    let children = node.children();
    for child in children.iter().rev() {
        push_subtree_rev(child, out);
    }
    out.push(node.clone());
}

/// Yields an axis's nodes in axis order: forward axes in document order,
/// reverse axes nearest-first. An axis a node kind cannot carry (e.g.
/// `namespace::` on a text node) yields the empty list.
pub(crate) fn apply_axis<N: XPathNode>(node: &N, axis: Axis) -> Vec<N> {
    match axis {
        Axis::SelfAxis => vec![node.clone()],
        Axis::Child => node.children(),
        Axis::Parent => node.parent().into_iter().collect(),
        Axis::Attribute => node.attributes(),
        Axis::Namespace => {
            if node.kind() == NodeKind::Element {
                node.namespaces()
            } else {
                Vec::new()
            }
        }
        Axis::Descendant => {
            let mut out = Vec::new();
            for child in node.children() {
                push_subtree(&child, &mut out);
            }
            out
        }
        Axis::DescendantOrSelf => {
            let mut out = Vec::new();
            push_subtree(node, &mut out);
            out
        }
        Axis::Ancestor => {
            let mut out = Vec::new();
            let mut cursor = node.parent();
            while let Some(parent) = cursor {
                out.push(parent.clone());
                cursor = parent.parent();
            }
            out
        }
        Axis::AncestorOrSelf => {
            let mut out = vec![node.clone()];
            let mut cursor = node.parent();
            while let Some(parent) = cursor {
                out.push(parent.clone());
                cursor = parent.parent();
            }
            out
        }
        Axis::FollowingSibling => {
            if matches!(node.kind(), NodeKind::Attribute | NodeKind::Namespace) {
                return Vec::new();
            }
            let Some(parent) = node.parent() else {
                return Vec::new();
            };
            let siblings = parent.children();
            match siblings.iter().position(|c| c == node) {
                Some(i) => siblings[i + 1..].to_vec(),
                None => Vec::new(),
            }
        }
        Axis::PrecedingSibling => {
            if matches!(node.kind(), NodeKind::Attribute | NodeKind::Namespace) {
                return Vec::new();
            }
            let Some(parent) = node.parent() else {
                return Vec::new();
            };
            let siblings = parent.children();
            match siblings.iter().position(|c| c == node) {
                Some(i) => siblings[..i].iter().rev().cloned().collect(),
                None => Vec::new(),
            }
        }
        Axis::Following => {
            let mut out = Vec::new();
            let mut cursor = node.clone();
            if matches!(node.kind(), NodeKind::Attribute | NodeKind::Namespace) {
                // The owning element's content follows its attributes.
                let Some(parent) = node.parent() else {
                    return out;
                };
                for child in parent.children() {
                    push_subtree(&child, &mut out);
                }
                cursor = parent;
            }
            loop {
                let Some(parent) = cursor.parent() else {
                    break;
                };
                let siblings = parent.children();
                if let Some(i) = siblings.iter().position(|c| c == &cursor) {
                    for sibling in &siblings[i + 1..] {
                        push_subtree(sibling, &mut out);
                    }
                }
                cursor = parent;
            }
            out
        }
        Axis::Preceding => {
            let mut out = Vec::new();
            let mut cursor = match node.kind() {
                NodeKind::Attribute | NodeKind::Namespace => match node.parent() {
                    Some(parent) => parent,
                    None => return out,
                },
                _ => node.clone(),
            };
            loop {
                let Some(parent) = cursor.parent() else {
                    break;
                };
                let siblings = parent.children();
                if let Some(i) = siblings.iter().position(|c| c == &cursor) {
                    for sibling in siblings[..i].iter().rev() {
                        push_subtree_rev(sibling, &mut out);
                    }
                }
                cursor = parent;
            }
            out
        }
    }
}

fn kind_matches_principal(kind: NodeKind, principal: PrincipalNodeKind) -> bool {
    matches!(
        (kind, principal),
        (NodeKind::Element, PrincipalNodeKind::Element)
            | (NodeKind::Attribute, PrincipalNodeKind::Attribute)
            | (NodeKind::Namespace, PrincipalNodeKind::Namespace)
    )
}

/// Applies a node test. Name tests select the axis's principal node kind
/// and never use the default namespace; an undeclared prefix is a hard
/// error, not an empty match.
fn matches_node_test<N: XPathNode>(
    node: &N,
    axis: Axis,
    test: &NodeTest,
    static_ctx: &StaticContext,
) -> Result<bool, EvalError> {
    match test {
        NodeTest::Kind(kind) => Ok(match kind {
            KindTest::Node => true,
            KindTest::Text => node.kind() == NodeKind::Text,
            KindTest::Comment => node.kind() == NodeKind::Comment,
            KindTest::ProcessingInstruction(target) => {
                node.kind() == NodeKind::ProcessingInstruction
                    && target
                        .as_ref()
                        .is_none_or(|t| node.name().is_some_and(|q| q.local == *t))
            }
        }),
        NodeTest::Name(name_test) => {
            if !kind_matches_principal(node.kind(), axis.principal_node_kind()) {
                return Ok(false);
            }
            match name_test {
                NameTest::Any => Ok(true),
                NameTest::Namespace(prefix) => {
                    let uri = static_ctx.namespaces.resolve(prefix)?;
                    Ok(node
                        .name()
                        .is_some_and(|q| q.ns_uri.as_deref() == Some(uri)))
                }
                NameTest::Name(test_name) => {
                    let test_uri = match &test_name.prefix {
                        Some(prefix) => Some(static_ctx.namespaces.resolve(prefix)?.to_string()),
                        None => None,
                    };
                    Ok(node
                        .name()
                        .is_some_and(|q| q.local == test_name.local && q.ns_uri == test_uri))
                }
            }
        }
    }
}

fn num_cmp(op: BinaryOp, a: f64, b: f64) -> bool {
    match op {
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::Ge => a >= b,
        _ => unreachable!("relational comparison with non-relational operator"),
    }
}

/// `=` and `!=` per XPath 1.0 §3.4. Node-set operands compare
/// existentially: the result is true iff *some* node satisfies the
/// comparison, which is why `!=` is not the negation of `=`.
fn compare_equality<N: XPathNode>(left: &Value<N>, right: &Value<N>, negate: bool) -> bool {
    match (left, right) {
        (Value::NodeSet(a), Value::NodeSet(b)) => {
            let values: Vec<String> = b.iter().map(N::string_value).collect();
            a.iter().any(|n| {
                let s = n.string_value();
                values.iter().any(|t| (s == *t) != negate)
            })
        }
        (Value::NodeSet(set), Value::Number(num)) | (Value::Number(num), Value::NodeSet(set)) => {
            set.iter()
                .any(|n| (parse_number(&n.string_value()) == *num) != negate)
        }
        (Value::NodeSet(set), Value::String(s)) | (Value::String(s), Value::NodeSet(set)) => {
            set.iter().any(|n| (n.string_value() == *s) != negate)
        }
        (set @ Value::NodeSet(_), Value::Boolean(b))
        | (Value::Boolean(b), set @ Value::NodeSet(_)) => (set.boolean() == *b) != negate,
        (l, r) => {
            let equal = if matches!(l, Value::Boolean(_)) || matches!(r, Value::Boolean(_)) {
                l.boolean() == r.boolean()
            } else if matches!(l, Value::Number(_)) || matches!(r, Value::Number(_)) {
                l.number() == r.number()
            } else {
                l.string() == r.string()
            };
            equal != negate
        }
    }
}

/// `<`, `<=`, `>`, `>=`: both sides become numbers; node-set operands
/// compare existentially over their nodes' string-values.
fn compare_relational<N: XPathNode>(op: BinaryOp, left: &Value<N>, right: &Value<N>) -> bool {
    match (left, right) {
        (Value::NodeSet(a), Value::NodeSet(b)) => {
            let values: Vec<f64> = b.iter().map(|n| parse_number(&n.string_value())).collect();
            a.iter().any(|n| {
                let x = parse_number(&n.string_value());
                values.iter().any(|y| num_cmp(op, x, *y))
            })
        }
        (Value::NodeSet(set), other) => {
            let y = other.number();
            set.iter()
                .any(|n| num_cmp(op, parse_number(&n.string_value()), y))
        }
        (other, Value::NodeSet(set)) => {
            let x = other.number();
            set.iter()
                .any(|n| num_cmp(op, x, parse_number(&n.string_value())))
        }
        (l, r) => num_cmp(op, l.number(), r.number()),
    }
}
