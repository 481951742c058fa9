//! Qualified-name resolution per the XML Namespaces recommendation.
//!
//! Two binding containers live here. [`NamespaceBindings`] is the flat
//! prefix-to-URI map a caller supplies for prefixes used *inside an
//! expression*. [`NamespaceScope`] is the nested, per-element stack a host
//! XML parser drives while walking start-tags; it enforces the reserved
//! prefix constraints and the "Attributes Unique" rule.
//!
//! Element and attribute names resolve asymmetrically: an unprefixed
//! element name picks up the default namespace, an unprefixed attribute
//! name gets no namespace at all. Name tests inside expressions never use
//! the default namespace (XPath 1.0 §2.3), so [`NamespaceBindings::resolve`]
//! only deals in explicit prefixes.

use std::collections::HashMap;

use crate::error::NamespaceError;

/// Namespace URI implicitly bound to the `xml` prefix.
pub const XML_NS_URI: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace URI of namespace declarations themselves; never bindable.
pub const XMLNS_NS_URI: &str = "http://www.w3.org/2000/xmlns/";

/// A resolved name: optional namespace URI plus local part. Used as the
/// key for variable bindings and function registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedName {
    pub ns_uri: Option<String>,
    pub local: String,
}

impl ExpandedName {
    pub fn new(ns_uri: Option<String>, local: impl Into<String>) -> Self {
        Self {
            ns_uri,
            local: local.into(),
        }
    }

    /// A name with no namespace.
    pub fn local(local: impl Into<String>) -> Self {
        Self::new(None, local)
    }
}

fn check_reserved(prefix: &str, uri: &str) -> Result<(), NamespaceError> {
    if prefix == "xmlns" {
        return Err(NamespaceError::ReservedPrefix(prefix.to_string()));
    }
    if prefix == "xml" && uri != XML_NS_URI {
        return Err(NamespaceError::ReservedPrefix(prefix.to_string()));
    }
    if uri == XMLNS_NS_URI {
        return Err(NamespaceError::ReservedNamespace(uri.to_string()));
    }
    if uri == XML_NS_URI && prefix != "xml" {
        return Err(NamespaceError::ReservedNamespace(uri.to_string()));
    }
    Ok(())
}

fn is_ncname(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Splits a lexical QName into `(prefix, local)`, validating both halves
/// against the NCName grammar.
pub fn split_qname(lexical: &str) -> Result<(Option<&str>, &str), NamespaceError> {
    let invalid = || NamespaceError::InvalidQName(lexical.to_string());
    match lexical.split_once(':') {
        Some((prefix, local)) => {
            if !is_ncname(prefix) || !is_ncname(local) {
                return Err(invalid());
            }
            Ok((Some(prefix), local))
        }
        None => {
            if !is_ncname(lexical) {
                return Err(invalid());
            }
            Ok((None, lexical))
        }
    }
}

/// Flat prefix-to-URI bindings for resolving prefixes that appear inside
/// an expression. `xml` is pre-bound and cannot be redirected.
#[derive(Debug, Clone)]
pub struct NamespaceBindings {
    by_prefix: HashMap<String, String>,
}

impl Default for NamespaceBindings {
    fn default() -> Self {
        let mut by_prefix = HashMap::new();
        by_prefix.insert("xml".to_string(), XML_NS_URI.to_string());
        Self { by_prefix }
    }
}

impl NamespaceBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `prefix` to `uri`, rejecting reserved prefixes and URIs.
    pub fn bind(
        &mut self,
        prefix: impl Into<String>,
        uri: impl Into<String>,
    ) -> Result<(), NamespaceError> {
        let prefix = prefix.into();
        let uri = uri.into();
        check_reserved(&prefix, &uri)?;
        self.by_prefix.insert(prefix, uri);
        Ok(())
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.by_prefix.get(prefix).map(String::as_str)
    }

    /// Resolves a non-empty prefix, failing if it has no binding.
    pub fn resolve(&self, prefix: &str) -> Result<&str, NamespaceError> {
        self.get(prefix)
            .ok_or_else(|| NamespaceError::UndeclaredPrefix(prefix.to_string()))
    }
}

#[derive(Debug, Clone, Default)]
struct Frame {
    // Prefix "" holds the default namespace; an empty URI undeclares it.
    bindings: Vec<(String, String)>,
}

/// Nested namespace declarations, one frame per open element.
///
/// A host XML parser pushes a frame when it enters a start-tag, records
/// the tag's `xmlns`/`xmlns:p` declarations with [`bind`](Self::bind),
/// resolves the element and attribute names in that scope, and pops the
/// frame at the matching end-tag.
#[derive(Debug, Clone, Default)]
pub struct NamespaceScope {
    frames: Vec<Frame>,
}

impl NamespaceScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new element scope.
    pub fn push(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Closes the innermost scope. Popping an empty scope stack is a
    /// caller bug and panics.
    pub fn pop(&mut self) {
        self.frames
            .pop()
            .expect("NamespaceScope::pop on an empty scope stack");
    }

    /// Records one declaration in the innermost scope. The empty prefix
    /// declares the default namespace; an empty URI is only meaningful
    /// there (it undeclares the default).
    pub fn bind(&mut self, prefix: &str, uri: &str) -> Result<(), NamespaceError> {
        if !prefix.is_empty() {
            check_reserved(prefix, uri)?;
            if uri.is_empty() {
                // Namespaces 1.0: only the default namespace can be undeclared.
                return Err(NamespaceError::InvalidQName(format!("xmlns:{prefix}=\"\"")));
            }
        } else if uri == XML_NS_URI || uri == XMLNS_NS_URI {
            return Err(NamespaceError::ReservedNamespace(uri.to_string()));
        }
        let frame = self
            .frames
            .last_mut()
            .expect("NamespaceScope::bind with no open scope");
        frame.bindings.push((prefix.to_string(), uri.to_string()));
        Ok(())
    }

    /// Innermost binding for `prefix`, if any. The empty prefix looks up
    /// the default namespace (`None` when undeclared or never declared).
    pub fn lookup(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NS_URI);
        }
        for frame in self.frames.iter().rev() {
            for (p, uri) in frame.bindings.iter().rev() {
                if p == prefix {
                    if uri.is_empty() {
                        return None;
                    }
                    return Some(uri);
                }
            }
        }
        None
    }

    /// Expands an element name: the default namespace applies to
    /// unprefixed names.
    pub fn resolve_element_name(&self, lexical: &str) -> Result<ExpandedName, NamespaceError> {
        let (prefix, local) = split_qname(lexical)?;
        let ns_uri = match prefix {
            Some(p) => Some(
                self.lookup(p)
                    .ok_or_else(|| NamespaceError::UndeclaredPrefix(p.to_string()))?
                    .to_string(),
            ),
            None => self.lookup("").map(str::to_string),
        };
        Ok(ExpandedName::new(ns_uri, local))
    }

    /// Expands an attribute name: unprefixed attributes are in no
    /// namespace, whatever the default binding says.
    pub fn resolve_attribute_name(&self, lexical: &str) -> Result<ExpandedName, NamespaceError> {
        let (prefix, local) = split_qname(lexical)?;
        let ns_uri = match prefix {
            Some(p) => Some(
                self.lookup(p)
                    .ok_or_else(|| NamespaceError::UndeclaredPrefix(p.to_string()))?
                    .to_string(),
            ),
            None => None,
        };
        Ok(ExpandedName::new(ns_uri, local))
    }

    /// "Attributes Unique": no two attributes of one start-tag may expand
    /// to the same (namespace URI, local name) pair.
    pub fn verify_unique_attributes<'a, I>(&self, names: I) -> Result<(), NamespaceError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen: Vec<ExpandedName> = Vec::new();
        for lexical in names {
            let expanded = self.resolve_attribute_name(lexical)?;
            if seen.contains(&expanded) {
                return Err(NamespaceError::DuplicateAttribute {
                    local: expanded.local,
                    ns_uri: expanded.ns_uri,
                });
            }
            seen.push(expanded);
        }
        Ok(())
    }
}
