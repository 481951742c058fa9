use thiserror::Error;

/// Errors produced while tokenizing an expression string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unterminated literal starting at offset {offset}")]
    UnterminatedLiteral { offset: usize },
    #[error("malformed number at offset {offset}")]
    InvalidNumber { offset: usize },
    #[error("expected ':' after ':' at offset {offset}")]
    LoneColon { offset: usize },
    #[error("expected '=' after '!' at offset {offset}")]
    LoneBang { offset: usize },
    #[error("expected a name after '$' at offset {offset}")]
    MissingVariableName { offset: usize },
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
}

impl LexError {
    /// Byte offset into the expression at which lexing failed.
    pub fn offset(&self) -> usize {
        match self {
            Self::UnterminatedLiteral { offset }
            | Self::InvalidNumber { offset }
            | Self::LoneColon { offset }
            | Self::LoneBang { offset }
            | Self::MissingVariableName { offset }
            | Self::UnexpectedChar { offset, .. } => *offset,
        }
    }
}

/// A grammar mismatch. Parsing is all-or-nothing: no partial AST is
/// produced and no recovery is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at offset {position}: expected {expected}, found {found}")]
pub struct SyntaxError {
    pub position: usize,
    pub expected: String,
    pub found: String,
}

/// Everything that can go wrong between an expression string and an AST.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

/// Violations of the XML Namespaces constraints.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamespaceError {
    /// A non-empty prefix has no active binding in scope.
    #[error("prefix '{0}' is not declared in scope")]
    UndeclaredPrefix(String),
    /// Attempt to bind or rebind a reserved prefix (`xmlns`, or `xml` to a
    /// URI other than the XML namespace).
    #[error("prefix '{0}' is reserved and cannot be bound here")]
    ReservedPrefix(String),
    /// Attempt to bind a reserved namespace URI to an ordinary prefix.
    #[error("namespace URI '{0}' is reserved and cannot be bound to a prefix")]
    ReservedNamespace(String),
    /// Two attributes on one start-tag expand to the same (URI, local) pair.
    #[error("duplicate attribute '{local}' after namespace expansion")]
    DuplicateAttribute {
        local: String,
        ns_uri: Option<String>,
    },
    /// The lexical form is not a QName (empty part, stray colon, bad character).
    #[error("'{0}' is not a valid qualified name")]
    InvalidQName(String),
}

/// Errors raised while evaluating a parsed expression. The AST stays
/// reusable; only the failing `evaluate` call is aborted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("unknown function {name}()")]
    UnknownFunction { name: String },
    #[error("{name}() called with {found} arguments, accepts {expected:?}")]
    WrongArity {
        name: String,
        expected: Vec<usize>,
        found: usize,
    },
    #[error("unknown variable ${0}")]
    UnknownVariable(String),
    #[error(transparent)]
    Namespace(#[from] NamespaceError),
    #[error("expected a node-set, got a {0}")]
    NotANodeSet(&'static str),
    #[error("no context node for this evaluation")]
    MissingContextNode,
}

/// Umbrella error for hosts that funnel parse and evaluation failures
/// through one channel.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Namespace(#[from] NamespaceError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}
