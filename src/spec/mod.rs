//! Conversion specifications.
//!
//! A specification is one or more YAML documents joined through `imports`.
//! [`resolve`] loads the root document, folds its imports in, validates the
//! merged result and expands every CURIE, producing an [`EffectiveSpec`].

pub mod document;
pub mod prefixes;
pub mod resolver;
pub mod validate;

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::SpecResolutionError;

pub use document::{ColumnMapping, SpecDocument};
pub use prefixes::{PrefixMap, DEFAULT_PREFIXES};
pub use resolver::{resolve_document, SpecResolver};
pub use validate::SchemaValidator;

const BYTES_PER_MB: f64 = 1_048_576.0;

/// Merged, validated specification. Immutable once built.
///
/// All IRI-valued fields hold expanded IRIs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveSpec {
    pub prefixes: PrefixMap,
    pub infile: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outdir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub types: Vec<String>,
    pub columns: Vec<ColumnMapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_functions: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_graph_size_mb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

impl EffectiveSpec {
    /// Validate a merged document and expand its IRI-valued fields.
    ///
    /// # Arguments
    /// * `document` - Merged document, imports already folded in
    /// * `source` - Root document path, used in error messages
    ///
    /// # Errors
    /// Returns [`SpecResolutionError::Schema`] listing every violation found
    pub fn from_document(
        document: SpecDocument,
        source: &Path,
    ) -> Result<Self, SpecResolutionError> {
        let mut prefixes = PrefixMap::with_defaults();
        for (name, iri) in &document.prefixes {
            prefixes.bind(name.clone(), iri);
        }

        let expanded = {
            let mut validator = SchemaValidator::new(&prefixes);
            validate::check_document(&document, &mut validator);

            let namespace = validator.optional_iri("namespace", document.namespace.as_deref());
            let graph = validator.optional_iri("graph", document.graph.as_deref());
            let types: Vec<String> = document
                .types
                .iter()
                .flatten()
                .enumerate()
                .filter_map(|(i, t)| validator.iri(&format!("types[{}]", i), t))
                .collect();

            let columns: Vec<ColumnMapping> = document
                .columns
                .iter()
                .flatten()
                .enumerate()
                .map(|(i, column)| {
                    validate::check_column(i, column, &mut validator);
                    expand_column(i, column, &mut validator)
                })
                .collect();

            validator
                .finish()
                .map_err(|errors| SpecResolutionError::Schema {
                    path: source.to_path_buf(),
                    errors,
                })?;
            (namespace, graph, types, columns)
        };
        let (namespace, graph, types, columns) = expanded;

        let infile = document
            .infile
            .ok_or_else(|| SpecResolutionError::Schema {
                path: source.to_path_buf(),
                errors: vec!["infile is required".to_string()],
            })?;

        Ok(Self {
            prefixes,
            infile,
            outdir: document.outdir,
            graph,
            identifier: document.identifier,
            namespace,
            types,
            columns,
            template: document.template.filter(|t| !t.trim().is_empty()),
            template_functions: document.template_functions,
            max_graph_size_mb: document.max_graph_size_mb,
            encoding: document.encoding,
        })
    }

    /// Chunk threshold in bytes, if chunking is configured.
    pub fn max_graph_size_bytes(&self) -> Option<u64> {
        self.max_graph_size_mb
            .map(|mb| (mb * BYTES_PER_MB).ceil() as u64)
    }

    /// Names of the columns this specification reads directly.
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        if let Some(identifier) = &self.identifier {
            names.push(identifier);
        }
        for column in &self.columns {
            if !names.contains(&column.column.as_str()) {
                names.push(&column.column);
            }
        }
        names
    }

    /// Render the specification as YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

fn expand_column(
    position: usize,
    column: &ColumnMapping,
    validator: &mut SchemaValidator<'_>,
) -> ColumnMapping {
    let at = |field: &str| format!("columns[{}].{}", position, field);

    let mut expanded = column.clone();
    if let Some(predicate) = validator.iri(&at("predicate"), &column.predicate) {
        expanded.predicate = predicate;
    }
    expanded.datatype = validator
        .optional_iri(&at("datatype"), column.datatype.as_deref())
        .or_else(|| column.datatype.clone());
    expanded.namespace = validator
        .optional_iri(&at("namespace"), column.namespace.as_deref())
        .or_else(|| column.namespace.clone());
    expanded.r#type = validator
        .optional_iri(&at("type"), column.r#type.as_deref())
        .or_else(|| column.r#type.clone());
    expanded.label = validator
        .optional_iri(&at("label"), column.label.as_deref())
        .or_else(|| column.label.clone());
    expanded
}

/// Resolve the specification rooted at `path` into an [`EffectiveSpec`].
///
/// # Errors
/// Returns error on a missing document or import, an import cycle, invalid
/// YAML, or a schema violation in the merged result
pub fn resolve(path: &Path) -> Result<EffectiveSpec, SpecResolutionError> {
    let document = resolve_document(path)?;
    EffectiveSpec::from_document(document, path)
}
