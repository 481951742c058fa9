//! The XPath 1.0 core function library.
//!
//! Registration conventions:
//! - One registration per function, using an arity range where XPath
//!   allows an optional argument; dispatch on `args.len()` inside the
//!   closure.
//! - `register_local_variadic` for `concat`, the only truly variadic
//!   core function.
//! - Helpers suffixed `_default` share logic between the explicit-argument
//!   and context-node forms.

use crate::error::EvalError;
use crate::model::{NodeKind, XPathNode};
use crate::namespaces::XML_NS_URI;
use crate::runtime::{CallCtx, FunctionRegistry};
use crate::value::{NodeSet, Value, parse_number};

fn node_set_arg<'a, N: XPathNode>(args: &'a [Value<N>], i: usize) -> Result<&'a NodeSet<N>, EvalError> {
    match &args[i] {
        Value::NodeSet(set) => Ok(set),
        other => Err(EvalError::NotANodeSet(other.type_name())),
    }
}

fn root_of<N: XPathNode>(mut node: N) -> N {
    while let Some(parent) = node.parent() {
        node = parent;
    }
    node
}

/// round() per §4.4: round half toward positive infinity, NaN and the
/// infinities pass through.
fn xpath_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        return n;
    }
    (n + 0.5).floor()
}

/// The target node for name()/local-name()/namespace-uri(): the context
/// node without an argument, otherwise the first node of the argument
/// node-set (or none if it is empty).
fn name_target<N: XPathNode>(
    ctx: &CallCtx<N>,
    args: &[Value<N>],
) -> Result<Option<N>, EvalError> {
    match args.first() {
        None => Ok(Some(ctx.context_node()?)),
        Some(_) => Ok(node_set_arg(args, 0)?.first().cloned()),
    }
}

fn string_default<N: XPathNode>(
    ctx: &CallCtx<N>,
    args: &[Value<N>],
) -> Result<String, EvalError> {
    match args.first() {
        None => Ok(ctx.context_node()?.string_value()),
        Some(v) => Ok(v.string()),
    }
}

fn substring_by_position(s: &str, start: f64, length: Option<f64>) -> String {
    let start = xpath_round(start);
    let end = match length {
        Some(l) => start + xpath_round(l),
        None => f64::INFINITY,
    };
    // NaN bounds make both comparisons false, so the result is empty.
    s.chars()
        .enumerate()
        .filter(|(i, _)| {
            let p = (i + 1) as f64;
            p >= start && p < end
        })
        .map(|(_, c)| c)
        .collect()
}

/// xml:lang test per §4.3: the nearest ancestor-or-self xml:lang wins;
/// the argument matches it exactly or as a language-range prefix,
/// case-insensitively.
fn lang_matches<N: XPathNode>(node: &N, wanted: &str) -> bool {
    let wanted = wanted.to_ascii_lowercase();
    let mut cursor = Some(node.clone());
    while let Some(n) = cursor {
        for attribute in n.attributes() {
            let Some(q) = attribute.name() else { continue };
            let is_xml_lang = q.local == "lang"
                && (q.prefix.as_deref() == Some("xml")
                    || q.ns_uri.as_deref() == Some(XML_NS_URI));
            if is_xml_lang {
                let value = attribute.string_value().to_ascii_lowercase();
                return value == wanted || value.starts_with(&format!("{wanted}-"));
            }
        }
        cursor = n.parent();
    }
    false
}

/// Builds the default registry with the complete §4 core library.
pub fn default_function_registry<N: XPathNode>() -> FunctionRegistry<N> {
    let mut reg: FunctionRegistry<N> = FunctionRegistry::new();

    // ===== Node-set functions (§4.1) =====
    reg.register_local("last", 0, |ctx, _args| {
        Ok(Value::Number(ctx.dyn_ctx.size as f64))
    });
    reg.register_local("position", 0, |ctx, _args| {
        Ok(Value::Number(ctx.dyn_ctx.position as f64))
    });
    reg.register_local("count", 1, |_ctx, args| {
        Ok(Value::Number(node_set_arg(args, 0)?.len() as f64))
    });
    reg.register_local("id", 1, |ctx, args| {
        let mut tokens: Vec<String> = Vec::new();
        match &args[0] {
            Value::NodeSet(set) => {
                for node in set {
                    tokens.extend(node.string_value().split_whitespace().map(str::to_string));
                }
            }
            other => tokens.extend(other.string().split_whitespace().map(str::to_string)),
        }
        let root = root_of(ctx.context_node()?);
        let mut found: Vec<N> = Vec::new();
        fn scan<N: XPathNode>(node: &N, tokens: &[String], found: &mut Vec<N>) {
            if node.kind() == NodeKind::Element {
                let has_id = node.attributes().iter().any(|a| {
                    a.name()
                        .is_some_and(|q| q.local == "id" && q.ns_uri.is_none())
                        && tokens.contains(&a.string_value())
                });
                if has_id {
                    found.push(node.clone());
                }
            }
            for child in node.children() {
                scan(&child, tokens, found);
            }
        }
        scan(&root, &tokens, &mut found);
        Ok(Value::NodeSet(NodeSet::from_nodes(found)))
    });
    reg.register_local_range("local-name", 0, Some(1), |ctx, args| {
        let name = name_target(ctx, args)?
            .and_then(|n| n.name())
            .map(|q| q.local)
            .unwrap_or_default();
        Ok(Value::String(name))
    });
    reg.register_local_range("namespace-uri", 0, Some(1), |ctx, args| {
        let uri = name_target(ctx, args)?
            .and_then(|n| n.name())
            .and_then(|q| q.ns_uri)
            .unwrap_or_default();
        Ok(Value::String(uri))
    });
    reg.register_local_range("name", 0, Some(1), |ctx, args| {
        let name = name_target(ctx, args)?
            .and_then(|n| n.name())
            .map(|q| q.lexical())
            .unwrap_or_default();
        Ok(Value::String(name))
    });

    // ===== String functions (§4.2) =====
    reg.register_local_range("string", 0, Some(1), |ctx, args| {
        Ok(Value::String(string_default(ctx, args)?))
    });
    reg.register_local_variadic("concat", 2, |_ctx, args| {
        let mut out = String::new();
        for arg in args {
            out.push_str(&arg.string());
        }
        Ok(Value::String(out))
    });
    reg.register_local("starts-with", 2, |_ctx, args| {
        Ok(Value::Boolean(
            args[0].string().starts_with(&args[1].string()),
        ))
    });
    reg.register_local("contains", 2, |_ctx, args| {
        Ok(Value::Boolean(args[0].string().contains(&args[1].string())))
    });
    reg.register_local("substring-before", 2, |_ctx, args| {
        let s = args[0].string();
        let needle = args[1].string();
        let out = s.find(&needle).map(|i| s[..i].to_string()).unwrap_or_default();
        Ok(Value::String(out))
    });
    reg.register_local("substring-after", 2, |_ctx, args| {
        let s = args[0].string();
        let needle = args[1].string();
        let out = s
            .find(&needle)
            .map(|i| s[i + needle.len()..].to_string())
            .unwrap_or_default();
        Ok(Value::String(out))
    });
    reg.register_local_range("substring", 2, Some(3), |_ctx, args| {
        let s = args[0].string();
        let start = args[1].number();
        let length = args.get(2).map(Value::number);
        Ok(Value::String(substring_by_position(&s, start, length)))
    });
    reg.register_local_range("string-length", 0, Some(1), |ctx, args| {
        let s = string_default(ctx, args)?;
        Ok(Value::Number(s.chars().count() as f64))
    });
    reg.register_local_range("normalize-space", 0, Some(1), |ctx, args| {
        let s = string_default(ctx, args)?;
        Ok(Value::String(
            s.split_whitespace().collect::<Vec<_>>().join(" "),
        ))
    });
    reg.register_local("translate", 3, |_ctx, args| {
        let s = args[0].string();
        let from: Vec<char> = args[1].string().chars().collect();
        let to: Vec<char> = args[2].string().chars().collect();
        let mut out = String::with_capacity(s.len());
        for c in s.chars() {
            // First occurrence in the from-string decides; positions past
            // the end of the to-string delete the character.
            match from.iter().position(|&f| f == c) {
                Some(i) => {
                    if let Some(&replacement) = to.get(i) {
                        out.push(replacement);
                    }
                }
                None => out.push(c),
            }
        }
        Ok(Value::String(out))
    });

    // ===== Boolean functions (§4.3) =====
    reg.register_local("boolean", 1, |_ctx, args| {
        Ok(Value::Boolean(args[0].boolean()))
    });
    reg.register_local("not", 1, |_ctx, args| {
        Ok(Value::Boolean(!args[0].boolean()))
    });
    reg.register_local("true", 0, |_ctx, _args| Ok(Value::Boolean(true)));
    reg.register_local("false", 0, |_ctx, _args| Ok(Value::Boolean(false)));
    reg.register_local("lang", 1, |ctx, args| {
        let node = ctx.context_node()?;
        Ok(Value::Boolean(lang_matches(&node, &args[0].string())))
    });

    // ===== Number functions (§4.4) =====
    reg.register_local_range("number", 0, Some(1), |ctx, args| {
        let n = match args.first() {
            None => parse_number(&ctx.context_node()?.string_value()),
            Some(v) => v.number(),
        };
        Ok(Value::Number(n))
    });
    reg.register_local("sum", 1, |_ctx, args| {
        let total: f64 = node_set_arg(args, 0)?
            .iter()
            .map(|n| parse_number(&n.string_value()))
            .sum();
        Ok(Value::Number(total))
    });
    reg.register_local("floor", 1, |_ctx, args| {
        Ok(Value::Number(args[0].number().floor()))
    });
    reg.register_local("ceiling", 1, |_ctx, args| {
        Ok(Value::Number(args[0].number().ceil()))
    });
    reg.register_local("round", 1, |_ctx, args| {
        Ok(Value::Number(xpath_round(args[0].number())))
    });

    reg
}
