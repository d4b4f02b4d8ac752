//! Specification document model.
//!
//! A [`SpecDocument`] is one parsed YAML file before merging. Every field is
//! optional; the merged result is validated separately.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SpecResolutionError;

/// One parsed, not-yet-merged specification document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecDocument {
    /// Prefix name -> namespace IRI
    #[serde(default, deserialize_with = "deserialize_prefixes")]
    pub prefixes: IndexMap<String, String>,

    /// Input data file
    #[serde(default)]
    pub infile: Option<PathBuf>,

    /// Output directory
    #[serde(default)]
    pub outdir: Option<PathBuf>,

    /// Named graph the output is placed in
    #[serde(default)]
    pub graph: Option<String>,

    /// Column holding each record's identifier
    #[serde(default)]
    pub identifier: Option<String>,

    /// Base namespace for record subjects
    #[serde(default)]
    pub namespace: Option<String>,

    /// rdf:type values emitted for every record subject
    #[serde(default)]
    pub types: Option<Vec<String>>,

    #[serde(default)]
    pub columns: Option<Vec<ColumnMapping>>,

    /// Turtle template with `{Column}` placeholders and `{{ fn(...) }}` calls
    #[serde(default)]
    pub template: Option<String>,

    /// Path to an external function module
    #[serde(default, alias = "templateFunctions")]
    pub template_functions: Option<PathBuf>,

    #[serde(default)]
    pub imports: Vec<PathBuf>,

    /// Chunk threshold in mebibytes
    #[serde(default, alias = "maxGraphSizeMb")]
    pub max_graph_size_mb: Option<f64>,

    /// Input character encoding label
    #[serde(default)]
    pub encoding: Option<String>,
}

/// Direct column -> predicate mapping rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnMapping {
    pub column: String,

    pub predicate: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,

    /// strftime-style format the cell is parsed with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datestr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,

    /// Treat `separator` as a regular expression
    #[serde(default)]
    pub regex: bool,

    #[serde(default)]
    pub as_iri: bool,

    #[serde(default)]
    pub as_uuid: bool,

    /// Lower-case tokens before forming IRIs
    #[serde(default)]
    pub ignore_case: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// rdf:type emitted for minted object IRIs
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,

    /// Predicate linking minted object IRIs to the token text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Prefixes may be written as a mapping or as a list of single-entry mappings.
#[derive(Deserialize)]
#[serde(untagged)]
enum PrefixDecl {
    Map(IndexMap<String, String>),
    List(Vec<IndexMap<String, String>>),
}

fn deserialize_prefixes<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let decl = Option::<PrefixDecl>::deserialize(deserializer)?;
    Ok(match decl {
        None => IndexMap::new(),
        Some(PrefixDecl::Map(map)) => map,
        Some(PrefixDecl::List(list)) => list.into_iter().flatten().collect(),
    })
}

impl SpecDocument {
    /// Parse a document from YAML text without touching relative paths.
    pub fn from_yaml(path: &Path, contents: &str) -> Result<Self, SpecResolutionError> {
        // An empty file is an empty document.
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents).map_err(|source| SpecResolutionError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a document from disk and anchor its relative paths to the file's directory.
    ///
    /// # Errors
    /// Returns error if the file does not exist, cannot be read, or is not valid YAML
    pub fn load(path: &Path) -> Result<Self, SpecResolutionError> {
        if !path.exists() {
            return Err(SpecResolutionError::NotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path).map_err(|source| SpecResolutionError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut document = Self::from_yaml(path, &contents)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        document.anchor_paths(base);
        Ok(document)
    }

    /// Rewrite relative `infile`, `outdir`, `templateFunctions` and `imports` against `base`.
    pub fn anchor_paths(&mut self, base: &Path) {
        let anchor = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        if let Some(p) = self.infile.as_mut() {
            anchor(p);
        }
        if let Some(p) = self.outdir.as_mut() {
            anchor(p);
        }
        if let Some(p) = self.template_functions.as_mut() {
            anchor(p);
        }
        for p in &mut self.imports {
            anchor(p);
        }
    }

    /// Fold `later` on top of `self`.
    ///
    /// Prefixes merge key by key with `later` winning. Every other field is
    /// replaced wholesale when `later` sets it. Imports are not carried over:
    /// they are consumed by resolution.
    pub fn merge(mut self, later: SpecDocument) -> SpecDocument {
        for (name, iri) in later.prefixes {
            self.prefixes.insert(name, iri);
        }

        SpecDocument {
            prefixes: self.prefixes,
            infile: later.infile.or(self.infile),
            outdir: later.outdir.or(self.outdir),
            graph: later.graph.or(self.graph),
            identifier: later.identifier.or(self.identifier),
            namespace: later.namespace.or(self.namespace),
            types: later.types.or(self.types),
            columns: later.columns.or(self.columns),
            template: later.template.or(self.template),
            template_functions: later.template_functions.or(self.template_functions),
            imports: Vec::new(),
            max_graph_size_mb: later.max_graph_size_mb.or(self.max_graph_size_mb),
            encoding: later.encoding.or(self.encoding),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> SpecDocument {
        SpecDocument::from_yaml(Path::new("test.yaml"), yaml).unwrap()
    }

    #[test]
    fn test_parse_full_document() {
        let doc = parse(
            r#"
prefixes:
  sdo: <https://schema.org/>
infile: data.csv
identifier: ID
namespace: https://example.org/pid/
types: [sdo:CreativeWork]
columns:
  - column: Title
    predicate: sdo:headline
  - column: Authors
    predicate: sdo:author
    separator: "||"
    as_iri: true
    as_uuid: true
    namespace: https://example.org/person/
    type: sdo:Person
    label: rdfs:label
templateFunctions: functions.yaml
maxGraphSizeMb: 2.5
encoding: utf-8
imports: [base.yaml]
"#,
        );

        assert_eq!(doc.prefixes.get("sdo").map(String::as_str), Some("<https://schema.org/>"));
        assert_eq!(doc.identifier.as_deref(), Some("ID"));
        assert_eq!(doc.types, Some(vec!["sdo:CreativeWork".to_string()]));
        assert_eq!(doc.max_graph_size_mb, Some(2.5));
        assert_eq!(doc.template_functions, Some(PathBuf::from("functions.yaml")));

        let columns = doc.columns.unwrap();
        assert_eq!(columns.len(), 2);
        assert!(!columns[0].as_iri);
        assert_eq!(columns[1].separator.as_deref(), Some("||"));
        assert_eq!(columns[1].r#type.as_deref(), Some("sdo:Person"));
        assert!(columns[1].as_uuid);
    }

    #[test]
    fn test_prefixes_as_list() {
        let doc = parse(
            r#"
prefixes:
  - ex: <https://example.org/>
  - sdo: <https://schema.org/>
"#,
        );
        let names: Vec<&String> = doc.prefixes.keys().collect();
        assert_eq!(names, vec!["ex", "sdo"]);
    }

    #[test]
    fn test_snake_case_aliases() {
        let doc = parse("template_functions: f.yaml\nmax_graph_size_mb: 1\n");
        assert_eq!(doc.template_functions, Some(PathBuf::from("f.yaml")));
        assert_eq!(doc.max_graph_size_mb, Some(1.0));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = SpecDocument::from_yaml(Path::new("bad.yaml"), "colums: []\n");
        assert!(matches!(result, Err(SpecResolutionError::Parse { .. })));
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(parse(""), SpecDocument::default());
    }

    #[test]
    fn test_anchor_paths_only_touches_relative() {
        let mut doc = parse("infile: data.csv\noutdir: /abs/out\nimports: [base.yaml]\n");
        doc.anchor_paths(Path::new("/specs"));
        assert_eq!(doc.infile, Some(PathBuf::from("/specs/data.csv")));
        assert_eq!(doc.outdir, Some(PathBuf::from("/abs/out")));
        assert_eq!(doc.imports, vec![PathBuf::from("/specs/base.yaml")]);
    }

    #[test]
    fn test_merge_is_right_biased_per_prefix_key() {
        let a = parse("prefixes:\n  ex: https://a.example/\n  only_a: https://only-a.example/\n");
        let b = parse("prefixes:\n  ex: https://b.example/\n");

        let merged = a.merge(b);
        assert_eq!(merged.prefixes.get("ex").map(String::as_str), Some("https://b.example/"));
        assert_eq!(
            merged.prefixes.get("only_a").map(String::as_str),
            Some("https://only-a.example/")
        );
    }

    #[test]
    fn test_merge_replaces_lists_wholesale() {
        let a = parse(
            "types: [ex:A, ex:B]\nidentifier: ID\ncolumns:\n  - column: X\n    predicate: ex:x\n",
        );
        let b = parse("types: [ex:C]\n");

        let merged = a.merge(b);
        assert_eq!(merged.types, Some(vec!["ex:C".to_string()]));
        assert_eq!(merged.identifier.as_deref(), Some("ID"));
        assert_eq!(merged.columns.map(|c| c.len()), Some(1));
    }
}
