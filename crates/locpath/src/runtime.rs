//! Evaluation contexts and the function registry.
//!
//! Nothing here is process-global: the registry and the namespace
//! bindings are plain values handed to the evaluator, so two hosts with
//! different function libraries or prefix maps never interfere.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::EvalError;
use crate::model::XPathNode;
use crate::namespaces::{ExpandedName, NamespaceBindings};
use crate::value::Value;

pub type Arity = usize;

/// Error type returned by function resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No function registered under the name.
    Unknown(ExpandedName),
    /// Function exists, but not for the requested arity. Carries the
    /// bounded arities known for the name.
    WrongArity {
        name: ExpandedName,
        available: Vec<Arity>,
    },
}

impl ResolveError {
    /// Converts into the evaluator-facing error, using the lexical name
    /// the expression spelled.
    pub(crate) fn into_eval_error(self, lexical: &str, found: Arity) -> EvalError {
        match self {
            ResolveError::Unknown(_) => EvalError::UnknownFunction {
                name: lexical.to_string(),
            },
            ResolveError::WrongArity { available, .. } => EvalError::WrongArity {
                name: lexical.to_string(),
                expected: available,
                found,
            },
        }
    }
}

/// Context passed into function implementations.
pub struct CallCtx<'a, N: XPathNode> {
    pub dyn_ctx: &'a DynamicContext<N>,
    pub static_ctx: &'a StaticContext,
}

impl<N: XPathNode> CallCtx<'_, N> {
    /// The context node, required by the many functions that default to
    /// it when called without arguments.
    pub fn context_node(&self) -> Result<N, EvalError> {
        self.dyn_ctx
            .context_node
            .clone()
            .ok_or(EvalError::MissingContextNode)
    }
}

pub type FunctionImpl<N> =
    Arc<dyn Fn(&CallCtx<N>, &[Value<N>]) -> Result<Value<N>, EvalError> + Send + Sync>;

type FunctionOverload<N> = (Arity, Option<Arity>, FunctionImpl<N>);

/// Function library keyed by expanded name.
///
/// Registrations are arity ranges: an exact-arity function is stored as
/// `[arity, arity]`, a variadic one as `[min, ∞)`. Overlapping ranges are
/// allowed; overloads are kept sorted so the most specific (highest min,
/// then smallest max) wins.
pub struct FunctionRegistry<N: XPathNode> {
    fns: HashMap<ExpandedName, Vec<FunctionOverload<N>>>,
}

impl<N: XPathNode> Default for FunctionRegistry<N> {
    fn default() -> Self {
        Self {
            fns: HashMap::new(),
        }
    }
}

impl<N: XPathNode> FunctionRegistry<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function under an expanded name with an arity range.
    /// `max_arity` of `None` means variadic from `min_arity` up.
    pub fn register_range<F>(
        &mut self,
        name: ExpandedName,
        min_arity: Arity,
        max_arity: Option<Arity>,
        f: F,
    ) where
        F: 'static + Send + Sync + Fn(&CallCtx<N>, &[Value<N>]) -> Result<Value<N>, EvalError>,
    {
        let overloads = self.fns.entry(name).or_default();
        overloads.push((min_arity, max_arity, Arc::new(f)));
        overloads.sort_by(|a, b| {
            b.0.cmp(&a.0).then_with(|| match (&a.1, &b.1) {
                (Some(x), Some(y)) => x.cmp(y),
                (Some(_), None) => core::cmp::Ordering::Less,
                (None, Some(_)) => core::cmp::Ordering::Greater,
                (None, None) => core::cmp::Ordering::Equal,
            })
        });
    }

    /// Exact-arity registration under a no-namespace name, the common
    /// case for the core library.
    pub fn register_local<F>(&mut self, local: &str, arity: Arity, f: F)
    where
        F: 'static + Send + Sync + Fn(&CallCtx<N>, &[Value<N>]) -> Result<Value<N>, EvalError>,
    {
        self.register_range(ExpandedName::local(local), arity, Some(arity), f);
    }

    /// Arity-range registration under a no-namespace name.
    pub fn register_local_range<F>(
        &mut self,
        local: &str,
        min_arity: Arity,
        max_arity: Option<Arity>,
        f: F,
    ) where
        F: 'static + Send + Sync + Fn(&CallCtx<N>, &[Value<N>]) -> Result<Value<N>, EvalError>,
    {
        self.register_range(ExpandedName::local(local), min_arity, max_arity, f);
    }

    /// Variadic registration under a no-namespace name.
    pub fn register_local_variadic<F>(&mut self, local: &str, min_arity: Arity, f: F)
    where
        F: 'static + Send + Sync + Fn(&CallCtx<N>, &[Value<N>]) -> Result<Value<N>, EvalError>,
    {
        self.register_range(ExpandedName::local(local), min_arity, None, f);
    }

    /// Registration under a namespace URI, for host extension libraries.
    pub fn register_ns<F>(&mut self, ns_uri: &str, local: &str, arity: Arity, f: F)
    where
        F: 'static + Send + Sync + Fn(&CallCtx<N>, &[Value<N>]) -> Result<Value<N>, EvalError>,
    {
        self.register_range(
            ExpandedName::new(Some(ns_uri.to_string()), local),
            arity,
            Some(arity),
            f,
        );
    }

    /// Looks up a function for a call with `arity` arguments, returning a
    /// typed error that distinguishes unknown names from known names with
    /// no matching arity.
    pub fn resolve(
        &self,
        name: &ExpandedName,
        arity: Arity,
    ) -> Result<&FunctionImpl<N>, ResolveError> {
        let Some(overloads) = self.fns.get(name) else {
            return Err(ResolveError::Unknown(name.clone()));
        };
        if let Some((_, _, f)) = overloads
            .iter()
            .find(|(min, max, _)| arity >= *min && max.is_none_or(|m| arity <= m))
        {
            return Ok(f);
        }
        let mut available: Vec<Arity> = Vec::new();
        for (min, max, _) in overloads {
            if let Some(m) = max {
                available.extend(*min..=*m);
            }
        }
        available.sort_unstable();
        available.dedup();
        Err(ResolveError::WrongArity {
            name: name.clone(),
            available,
        })
    }
}

/// Context fixed before evaluation starts: the prefix bindings used to
/// resolve qualified names inside the expression itself.
#[derive(Debug, Clone, Default)]
pub struct StaticContext {
    pub namespaces: NamespaceBindings,
}

pub struct StaticContextBuilder {
    ctx: StaticContext,
}

impl Default for StaticContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticContextBuilder {
    pub fn new() -> Self {
        Self {
            ctx: StaticContext::default(),
        }
    }

    /// Registers a prefix → URI mapping. Attempts to rebind the reserved
    /// prefixes are ignored, keeping the implicit `xml` binding intact.
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        let _ = self.ctx.namespaces.bind(prefix, uri);
        self
    }

    pub fn build(self) -> StaticContext {
        self.ctx
    }
}

/// Per-evaluation context: context node, proximity position and size,
/// variable bindings, function library. Derived contexts are created for
/// nested evaluations (predicates, function arguments); the original is
/// never mutated.
#[derive(Clone)]
pub struct DynamicContext<N: XPathNode> {
    pub context_node: Option<N>,
    /// 1-based proximity position of the context node.
    pub position: usize,
    /// Size of the node list the context node was drawn from.
    pub size: usize,
    pub variables: HashMap<ExpandedName, Value<N>>,
    pub functions: Arc<FunctionRegistry<N>>,
}

impl<N: XPathNode> Default for DynamicContext<N> {
    fn default() -> Self {
        Self {
            context_node: None,
            position: 1,
            size: 1,
            variables: HashMap::new(),
            functions: Arc::new(crate::functions::default_function_registry()),
        }
    }
}

impl<N: XPathNode> DynamicContext<N> {
    /// A context for `node` at `position` of `size`, sharing this
    /// context's variables and functions.
    pub(crate) fn derived(&self, node: N, position: usize, size: usize) -> Self {
        Self {
            context_node: Some(node),
            position,
            size,
            variables: self.variables.clone(),
            functions: self.functions.clone(),
        }
    }
}

pub struct DynamicContextBuilder<N: XPathNode> {
    ctx: DynamicContext<N>,
}

impl<N: XPathNode> Default for DynamicContextBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: XPathNode> DynamicContextBuilder<N> {
    pub fn new() -> Self {
        Self {
            ctx: DynamicContext::default(),
        }
    }

    pub fn with_context_node(mut self, node: N) -> Self {
        self.ctx.context_node = Some(node);
        self
    }

    pub fn with_variable(mut self, name: ExpandedName, value: impl Into<Value<N>>) -> Self {
        self.ctx.variables.insert(name, value.into());
        self
    }

    pub fn with_functions(mut self, registry: Arc<FunctionRegistry<N>>) -> Self {
        self.ctx.functions = registry;
        self
    }

    pub fn build(self) -> DynamicContext<N> {
        self.ctx
    }
}
