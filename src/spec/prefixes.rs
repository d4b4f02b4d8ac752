//! Prefix bindings and IRI expansion.
//!
//! Specification documents may write any IRI-valued field as a full IRI,
//! as `<IRI>`, or as a CURIE (`sdo:headline`) over the merged prefix set.

use indexmap::IndexMap;
use oxigraph::model::NamedNode;
use serde::Serialize;

/// Bindings present in every effective specification. Documents may override them.
pub const DEFAULT_PREFIXES: &[(&str, &str)] = &[
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("owl", "http://www.w3.org/2002/07/owl#"),
];

/// Ordered prefix-name -> namespace IRI map.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PrefixMap {
    bindings: IndexMap<String, String>,
}

impl PrefixMap {
    /// Create a map holding only [`DEFAULT_PREFIXES`].
    pub fn with_defaults() -> Self {
        let bindings = DEFAULT_PREFIXES
            .iter()
            .map(|(name, iri)| (name.to_string(), iri.to_string()))
            .collect();
        Self { bindings }
    }

    /// Bind `name` to `iri`, replacing any earlier binding. Angle brackets are stripped.
    pub fn bind(&mut self, name: impl Into<String>, iri: &str) {
        self.bindings.insert(name.into(), strip_angles(iri).to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn as_map(&self) -> &IndexMap<String, String> {
        &self.bindings
    }

    /// Expand a term to a full IRI string.
    ///
    /// `<…>` wrappers are removed; terms with a scheme that is not a bound
    /// prefix (`http://…`, `urn:…`) are returned as-is; `prefix:local`
    /// is expanded against the bindings.
    ///
    /// # Errors
    /// Returns a message when the term has no colon or uses an unbound prefix.
    pub fn expand(&self, term: &str) -> Result<String, String> {
        let term = term.trim();
        if term.starts_with('<') && term.ends_with('>') {
            return Ok(strip_angles(term).to_string());
        }

        let (prefix, local) = term
            .split_once(':')
            .ok_or_else(|| format!("'{}' is neither an IRI nor a CURIE", term))?;

        if let Some(namespace) = self.bindings.get(prefix) {
            return Ok(format!("{}{}", namespace, local));
        }

        if local.starts_with("//") || prefix == "urn" {
            return Ok(term.to_string());
        }

        Err(format!("prefix '{}' in '{}' is not bound", prefix, term))
    }

    /// Expand a term and check that the result is a valid IRI.
    pub fn expand_iri(&self, term: &str) -> Result<NamedNode, String> {
        let expanded = self.expand(term)?;
        NamedNode::new(expanded.as_str()).map_err(|e| format!("'{}': {}", expanded, e))
    }

    /// Render the bindings as Turtle `@prefix` directives.
    pub fn turtle_header(&self) -> String {
        let mut header = String::new();
        for (name, iri) in &self.bindings {
            header.push_str(&format!("@prefix {}: <{}> .\n", name, iri));
        }
        header
    }
}

impl From<IndexMap<String, String>> for PrefixMap {
    fn from(map: IndexMap<String, String>) -> Self {
        let mut prefixes = PrefixMap::default();
        for (name, iri) in map {
            prefixes.bind(name, &iri);
        }
        prefixes
    }
}

pub(crate) fn strip_angles(value: &str) -> &str {
    value
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
}
