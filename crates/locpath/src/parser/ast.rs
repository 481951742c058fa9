//! Expression AST.
//!
//! Tagged variants over the XPath 1.0 grammar, owned exclusively by their
//! parent and immutable after parsing. `Display` renders the canonical
//! unabbreviated form; parsing that rendering yields a structurally equal
//! tree, which the serializer tests rely on.

use core::fmt;

use crate::model::{PrincipalNodeKind, QName};
use crate::value::format_number;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Or => "or",
            Self::And => "and",
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "div",
            Self::Mod => "mod",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(String),
    Number(f64),
    VarRef(QName),
    FunctionCall {
        name: QName,
        args: Vec<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// Unary minus. `--x` nests.
    Negate(Box<Expr>),
    /// `left | right` over node-sets.
    Union {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Path(PathExpr),
    /// A primary expression with one or more predicates and no trailing
    /// path (`$x[1]`, `(//a)[2]`). With a trailing path this becomes
    /// [`PathStart::Filter`].
    Filter {
        primary: Box<Expr>,
        predicates: Vec<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathStart {
    /// Absolute path: starts at the root of the context node's tree.
    Root,
    /// Relative path: starts at the context node.
    Relative,
    /// A filter expression followed by `/` or `//` and further steps.
    Filter(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    pub start: PathStart,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Ancestor,
    AncestorOrSelf,
    Attribute,
    Child,
    Descendant,
    DescendantOrSelf,
    Following,
    FollowingSibling,
    Namespace,
    Parent,
    Preceding,
    PrecedingSibling,
    SelfAxis,
}

impl Axis {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ancestor" => Some(Self::Ancestor),
            "ancestor-or-self" => Some(Self::AncestorOrSelf),
            "attribute" => Some(Self::Attribute),
            "child" => Some(Self::Child),
            "descendant" => Some(Self::Descendant),
            "descendant-or-self" => Some(Self::DescendantOrSelf),
            "following" => Some(Self::Following),
            "following-sibling" => Some(Self::FollowingSibling),
            "namespace" => Some(Self::Namespace),
            "parent" => Some(Self::Parent),
            "preceding" => Some(Self::Preceding),
            "preceding-sibling" => Some(Self::PrecedingSibling),
            "self" => Some(Self::SelfAxis),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ancestor => "ancestor",
            Self::AncestorOrSelf => "ancestor-or-self",
            Self::Attribute => "attribute",
            Self::Child => "child",
            Self::Descendant => "descendant",
            Self::DescendantOrSelf => "descendant-or-self",
            Self::Following => "following",
            Self::FollowingSibling => "following-sibling",
            Self::Namespace => "namespace",
            Self::Parent => "parent",
            Self::Preceding => "preceding",
            Self::PrecedingSibling => "preceding-sibling",
            Self::SelfAxis => "self",
        }
    }

    /// Which node kind this axis's name tests select.
    pub fn principal_node_kind(self) -> PrincipalNodeKind {
        match self {
            Self::Attribute => PrincipalNodeKind::Attribute,
            Self::Namespace => PrincipalNodeKind::Namespace,
            _ => PrincipalNodeKind::Element,
        }
    }

    /// Reverse axes yield candidates in reverse document order, so
    /// proximity positions count toward the context node.
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Self::Ancestor | Self::AncestorOrSelf | Self::Preceding | Self::PrecedingSibling
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    /// The `descendant-or-self::node()` step `//` abbreviates.
    pub fn descendant_or_self() -> Self {
        Self {
            axis: Axis::DescendantOrSelf,
            test: NodeTest::Kind(KindTest::Node),
            predicates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    Name(NameTest),
    Kind(KindTest),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NameTest {
    /// `*` — any name on the axis's principal node kind.
    Any,
    /// `prefix:*` — any local name in the prefix's namespace.
    Namespace(String),
    /// An exact name; the prefix is resolved against the evaluation's
    /// namespace bindings.
    Name(QName),
}

#[derive(Debug, Clone, PartialEq)]
pub enum KindTest {
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

fn is_primary(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Literal(_) | Expr::Number(_) | Expr::VarRef(_) | Expr::FunctionCall { .. }
    )
}

fn fmt_primary(expr: &Expr, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if is_primary(expr) {
        write!(f, "{expr}")
    } else {
        write!(f, "({expr})")
    }
}

fn fmt_quoted(s: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    // Literals carry no escapes; pick whichever quote the text doesn't use.
    if s.contains('"') {
        write!(f, "'{s}'")
    } else {
        write!(f, "\"{s}\"")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(s) => fmt_quoted(s, f),
            Expr::Number(n) => f.write_str(&format_number(*n)),
            Expr::VarRef(name) => write!(f, "${}", name.lexical()),
            Expr::FunctionCall { name, args } => {
                write!(f, "{}(", name.lexical())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Expr::Binary { left, op, right } => {
                write!(f, "({left} {} {right})", op.symbol())
            }
            Expr::Negate(inner) => write!(f, "-({inner})"),
            Expr::Union { left, right } => write!(f, "{left} | {right}"),
            Expr::Path(path) => write!(f, "{path}"),
            Expr::Filter {
                primary,
                predicates,
            } => {
                fmt_primary(primary, f)?;
                for pred in predicates {
                    write!(f, "[{pred}]")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.start {
            PathStart::Root => {
                f.write_str("/")?;
                for (i, step) in self.steps.iter().enumerate() {
                    if i > 0 {
                        f.write_str("/")?;
                    }
                    write!(f, "{step}")?;
                }
                Ok(())
            }
            PathStart::Relative => {
                for (i, step) in self.steps.iter().enumerate() {
                    if i > 0 {
                        f.write_str("/")?;
                    }
                    write!(f, "{step}")?;
                }
                Ok(())
            }
            PathStart::Filter(expr) => {
                fmt_primary(expr, f)?;
                for step in &self.steps {
                    write!(f, "/{step}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.axis.as_str(), self.test)?;
        for pred in &self.predicates {
            write!(f, "[{pred}]")?;
        }
        Ok(())
    }
}

impl fmt::Display for NodeTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeTest::Name(NameTest::Any) => f.write_str("*"),
            NodeTest::Name(NameTest::Namespace(prefix)) => write!(f, "{prefix}:*"),
            NodeTest::Name(NameTest::Name(name)) => f.write_str(&name.lexical()),
            NodeTest::Kind(KindTest::Node) => f.write_str("node()"),
            NodeTest::Kind(KindTest::Text) => f.write_str("text()"),
            NodeTest::Kind(KindTest::Comment) => f.write_str("comment()"),
            NodeTest::Kind(KindTest::ProcessingInstruction(target)) => match target {
                Some(t) => {
                    f.write_str("processing-instruction(")?;
                    fmt_quoted(t, f)?;
                    f.write_str(")")
                }
                None => f.write_str("processing-instruction()"),
            },
        }
    }
}
