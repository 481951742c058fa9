pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod model;
pub mod namespaces;
pub mod parser;
pub mod runtime;
pub mod simple_node;
pub mod value;

pub use error::{Error, EvalError, LexError, NamespaceError, ParseError, SyntaxError};
pub use evaluator::{evaluate, evaluate_on};
pub use functions::default_function_registry;
pub use model::{NodeKind, QName, XPathNode};
pub use namespaces::{ExpandedName, NamespaceBindings, NamespaceScope};
pub use parser::parse_xpath;
pub use runtime::{
    DynamicContext, DynamicContextBuilder, FunctionRegistry, StaticContext, StaticContextBuilder,
};
pub use simple_node::{SimpleNode, SimpleNodeBuilder};
pub use value::{NodeSet, Value};
