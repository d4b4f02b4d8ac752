//! Schema validation of a merged specification document.
//!
//! Validation collects every violation instead of stopping at the first one,
//! so authors can fix a document in one pass.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::spec::document::{ColumnMapping, SpecDocument};
use crate::spec::prefixes::PrefixMap;

/// strftime directives and separators accepted in `datestr`.
static DATESTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(%[aAbBcdeDFHIjmMpRSTUwWxXyYzZfGuvV]|%\.f|[\-\s:./,T])+$")
        .expect("valid datestr regex")
});

/// Accumulates schema violations while expanding IRI-valued fields.
pub struct SchemaValidator<'a> {
    prefixes: &'a PrefixMap,
    errors: Vec<String>,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(prefixes: &'a PrefixMap) -> Self {
        Self {
            prefixes,
            errors: Vec::new(),
        }
    }

    /// Record a violation.
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Expand `term` to a valid IRI, recording a violation against `field` on failure.
    pub fn iri(&mut self, field: &str, term: &str) -> Option<String> {
        match self.prefixes.expand_iri(term) {
            Ok(node) => Some(node.into_string()),
            Err(e) => {
                self.error(format!("{}: {}", field, e));
                None
            }
        }
    }

    /// Expand an optional IRI-valued field.
    pub fn optional_iri(&mut self, field: &str, term: Option<&str>) -> Option<String> {
        term.and_then(|t| self.iri(field, t))
    }

    /// Finish, returning all violations if any were recorded.
    pub fn finish(self) -> Result<(), Vec<String>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Check the document-level rules that do not depend on IRI expansion.
pub fn check_document(doc: &SpecDocument, validator: &mut SchemaValidator<'_>) {
    if doc.infile.is_none() {
        validator.error("infile is required");
    }

    let has_columns = doc.columns.as_ref().is_some_and(|c| !c.is_empty());
    let has_template = doc
        .template
        .as_ref()
        .is_some_and(|t| !t.trim().is_empty());
    if !has_columns && !has_template {
        validator.error("at least one of columns or template must be given");
    }

    if let Some(size) = doc.max_graph_size_mb {
        if size <= 0.0 || !size.is_finite() {
            validator.error(format!("maxGraphSizeMb must be positive, got {}", size));
        }
    }

    if let Some(identifier) = &doc.identifier {
        if identifier.trim().is_empty() {
            validator.error("identifier must not be empty");
        }
    }

    for (name, iri) in &doc.prefixes {
        let bare = crate::spec::prefixes::strip_angles(iri);
        let absolute = ["http://", "https://", "urn:"]
            .iter()
            .any(|scheme| bare.starts_with(scheme));
        if !absolute {
            validator.error(format!(
                "prefix '{}' must bind an absolute IRI, got '{}'",
                name, iri
            ));
        }
    }
}

/// Check the rules of one column mapping that do not depend on IRI expansion.
pub fn check_column(position: usize, column: &ColumnMapping, validator: &mut SchemaValidator<'_>) {
    let at = format!("columns[{}]", position);

    if column.column.trim().is_empty() {
        validator.error(format!("{}: column must not be empty", at));
    }
    if column.predicate.trim().is_empty() {
        validator.error(format!("{}: predicate must not be empty", at));
    }

    if let Some(datestr) = &column.datestr {
        if !DATESTR_RE.is_match(datestr) {
            validator.error(format!("{}: unsupported datestr '{}'", at, datestr));
        }
        if column.as_iri {
            validator.error(format!("{}: datestr cannot be combined with as_iri", at));
        }
    }

    if column.as_uuid {
        if !column.as_iri {
            validator.error(format!("{}: as_uuid requires as_iri", at));
        }
        if column.namespace.is_none() {
            validator.error(format!("{}: as_uuid requires a namespace", at));
        }
    }

    if column.regex {
        match &column.separator {
            None => validator.error(format!("{}: regex requires a separator", at)),
            Some(pattern) => {
                if let Err(e) = Regex::new(pattern) {
                    validator.error(format!("{}: invalid separator regex: {}", at, e));
                }
            }
        }
    }

    if let Some(separator) = &column.separator {
        if separator.is_empty() {
            validator.error(format!("{}: separator must not be empty", at));
        }
    }
}
