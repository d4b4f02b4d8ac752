//! Column mapping engine.
//!
//! A [`RowMapper`] is compiled once from the effective specification and then
//! applied to every record. For each record it determines the primary subject
//! and turns each mapped cell into statements:
//!
//! - cells are split on the column separator (a literal string or a regular
//!   expression), tokens are trimmed and empty tokens are dropped
//! - `as_iri` tokens become object IRIs under the column namespace, or under a
//!   freshly minted UUID with `as_uuid`, with optional type and label statements
//! - other tokens become literals, parsed with `datestr` when one is declared

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use oxigraph::model::vocab::{rdf, xsd};
use oxigraph::model::{BlankNode, Literal, NamedNode, NamedOrBlankNode, Term, Triple};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use uuid::Uuid;

use crate::error::{MappingError, RecordTransformError};
use crate::record::Record;
use crate::spec::prefixes::strip_angles;
use crate::spec::{ColumnMapping, EffectiveSpec};

/// Characters left unescaped when a cell value becomes part of an IRI.
const IRI_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@');

/// Percent-encode a cell value for use after a namespace IRI.
pub fn encode_iri_value(value: &str) -> String {
    utf8_percent_encode(value, IRI_VALUE).to_string()
}

#[derive(Debug)]
enum Splitter {
    Literal(String),
    Pattern(Regex),
}

impl Splitter {
    fn split<'a>(&self, cell: &'a str) -> Vec<&'a str> {
        match self {
            Splitter::Literal(separator) => cell.split(separator.as_str()).collect(),
            Splitter::Pattern(re) => re.split(cell).collect(),
        }
    }
}

/// One compiled column mapping.
#[derive(Debug)]
struct ColumnRule {
    column: String,
    predicate: NamedNode,
    datatype: Option<NamedNode>,
    datestr: Option<String>,
    splitter: Option<Splitter>,
    as_iri: bool,
    as_uuid: bool,
    ignore_case: bool,
    namespace: Option<String>,
    object_type: Option<NamedNode>,
    label: Option<NamedNode>,
}

impl ColumnRule {
    fn compile(mapping: &ColumnMapping) -> Result<Self, MappingError> {
        let splitter = match &mapping.separator {
            None => None,
            Some(pattern) if mapping.regex => Some(Splitter::Pattern(
                Regex::new(pattern).map_err(|e| MappingError::InvalidSeparator {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?,
            )),
            Some(separator) => Some(Splitter::Literal(separator.clone())),
        };

        Ok(Self {
            column: mapping.column.clone(),
            predicate: named_node(&mapping.predicate)?,
            datatype: mapping.datatype.as_deref().map(named_node).transpose()?,
            datestr: mapping.datestr.clone(),
            splitter,
            as_iri: mapping.as_iri,
            as_uuid: mapping.as_uuid,
            ignore_case: mapping.ignore_case,
            namespace: mapping.namespace.clone(),
            object_type: mapping.r#type.as_deref().map(named_node).transpose()?,
            label: mapping.label.as_deref().map(named_node).transpose()?,
        })
    }

    /// Non-empty, trimmed tokens of a cell.
    fn tokens<'a>(&self, cell: &'a str) -> Vec<&'a str> {
        let pieces = match &self.splitter {
            Some(splitter) => splitter.split(cell),
            None => vec![cell],
        };
        pieces
            .into_iter()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .collect()
    }

    fn object_iri(&self, token: &str) -> Result<NamedNode, MappingError> {
        if self.as_uuid {
            let namespace = self.namespace.as_deref().unwrap_or_default();
            return named_node(&format!("{}{}", namespace, Uuid::new_v4()));
        }

        let text = if self.ignore_case {
            token.to_lowercase()
        } else {
            token.to_string()
        };
        let text = strip_angles(&text);
        match &self.namespace {
            Some(namespace) => named_node(&format!("{}{}", namespace, encode_iri_value(text))),
            None => named_node(text),
        }
    }

    fn literal(&self, token: &str) -> Result<Literal, MappingError> {
        if let Some(format) = &self.datestr {
            let value = normalize_datetime(token, format).ok_or_else(|| MappingError::DateParse {
                value: token.to_string(),
                format: format.clone(),
            })?;
            let datatype = self
                .datatype
                .clone()
                .unwrap_or_else(|| xsd::DATE_TIME.into_owned());
            return Ok(Literal::new_typed_literal(value, datatype));
        }

        Ok(match &self.datatype {
            Some(datatype) => Literal::new_typed_literal(token, datatype.clone()),
            None => Literal::new_simple_literal(token),
        })
    }

    fn apply(
        &self,
        subject: &NamedOrBlankNode,
        cell: &str,
        out: &mut Vec<Triple>,
    ) -> Result<(), MappingError> {
        for token in self.tokens(cell) {
            if self.as_iri {
                let object = self.object_iri(token)?;
                out.push(Triple::new(
                    subject.clone(),
                    self.predicate.clone(),
                    object.clone(),
                ));
                if let Some(object_type) = &self.object_type {
                    out.push(Triple::new(
                        object.clone(),
                        rdf::TYPE.into_owned(),
                        object_type.clone(),
                    ));
                }
                if let Some(label) = &self.label {
                    out.push(Triple::new(
                        object,
                        label.clone(),
                        Literal::new_simple_literal(token),
                    ));
                }
            } else {
                let literal = self.literal(token)?;
                out.push(Triple::new(subject.clone(), self.predicate.clone(), literal));
            }
        }
        Ok(())
    }
}

fn named_node(iri: &str) -> Result<NamedNode, MappingError> {
    NamedNode::new(iri).map_err(|e| MappingError::InvalidIri {
        value: iri.to_string(),
        message: e.to_string(),
    })
}

/// Parse `token` with a strftime-style `format` and render it in ISO 8601.
///
/// Fields the format leaves out default the way strptime defaults them: year
/// 1900, month and day 1, midnight. Formats with an offset keep it
/// (`2021-03-04T05:06:07+02:00`). `%f` reads microseconds. Fractional seconds
/// are printed only when non-zero.
pub fn normalize_datetime(token: &str, format: &str) -> Option<String> {
    const ISO: &str = "%Y-%m-%dT%H:%M:%S%.f";

    let (token, format) = with_date_defaults(token, &strptime_format(format));

    if let Ok(value) = DateTime::parse_from_str(&token, &format) {
        return Some(value.format("%Y-%m-%dT%H:%M:%S%.f%:z").to_string());
    }
    if let Ok(value) = NaiveDateTime::parse_from_str(&token, &format) {
        return Some(value.format(ISO).to_string());
    }
    NaiveDate::parse_from_str(&token, &format)
        .ok()
        .map(|value| value.and_time(NaiveTime::MIN).format(ISO).to_string())
}

/// Rewrite `%f` (microseconds) to chrono's six-digit fraction.
fn strptime_format(format: &str) -> String {
    let mut out = String::with_capacity(format.len() + 2);
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('f') => out.push_str("%6f"),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

/// Directive letters of a strftime format, ignoring padding and width flags.
fn directives(format: &str) -> Vec<char> {
    let mut found = Vec::new();
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            let directive = chars
                .by_ref()
                .find(|d| !matches!(*d, '.' | '-' | '_' | '0'..='9'));
            if let Some(d) = directive {
                found.push(d);
            }
        }
    }
    found
}

/// Append the year, month and day fields `format` does not parse.
fn with_date_defaults(token: &str, format: &str) -> (String, String) {
    const YEAR: &[char] = &['Y', 'y', 'G', 'D', 'F', 'x', 'c'];
    const MONTH: &[char] = &['m', 'b', 'B', 'h', 'D', 'F', 'x', 'c', 'j', 'U', 'W', 'V'];
    const DAY: &[char] = &['d', 'e', 'D', 'F', 'x', 'c', 'j', 'U', 'W', 'V'];

    let used = directives(format);
    let missing = |set: &[char]| !used.iter().any(|d| set.contains(d));

    let mut token = token.to_string();
    let mut format = format.to_string();
    let defaults = [
        (YEAR, " %Y", " 1900"),
        (MONTH, " %m", " 01"),
        (DAY, " %d", " 01"),
    ];
    for (set, directive, default) in defaults {
        if missing(set) {
            format.push_str(directive);
            token.push_str(default);
        }
    }
    (token, format)
}

/// Applies direct column mappings to records.
#[derive(Debug)]
pub struct RowMapper {
    identifier: Option<String>,
    namespace: Option<String>,
    types: Vec<NamedNode>,
    rules: Vec<ColumnRule>,
}

impl RowMapper {
    /// Compile the mappings of `spec`.
    ///
    /// # Errors
    /// Returns error if an IRI or separator pattern in the specification is invalid
    pub fn new(spec: &EffectiveSpec) -> Result<Self, MappingError> {
        let types = spec
            .types
            .iter()
            .map(|t| named_node(t))
            .collect::<Result<Vec<_>, _>>()?;
        let rules = spec
            .columns
            .iter()
            .map(ColumnRule::compile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            identifier: spec.identifier.clone(),
            namespace: spec.namespace.clone(),
            types,
            rules,
        })
    }

    /// Columns read by the mapping rules, identifier included.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.identifier
            .as_deref()
            .into_iter()
            .chain(self.rules.iter().map(|r| r.column.as_str()))
    }

    /// Primary subject of `record`.
    ///
    /// Without an identifier column the subject is a fresh blank node.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(subject))` - Subject for the record
    /// * `Ok(None)` - The identifier cell is empty; the record is skipped
    /// * `Err(RecordTransformError)` - The identifier does not form a valid IRI
    pub fn subject_for(
        &self,
        record: &Record,
    ) -> Result<Option<NamedOrBlankNode>, RecordTransformError> {
        let Some(identifier) = &self.identifier else {
            return Ok(Some(BlankNode::default().into()));
        };

        let fail = |err: MappingError| {
            RecordTransformError::mapping(record.index(), identifier.as_str(), err)
        };
        let cell = record
            .get(identifier)
            .ok_or_else(|| fail(MappingError::MissingColumn(identifier.clone())))?
            .trim();
        if cell.is_empty() {
            return Ok(None);
        }

        let iri = match &self.namespace {
            Some(namespace) => format!("{}{}", namespace, encode_iri_value(cell)),
            None => strip_angles(cell).to_string(),
        };
        named_node(&iri).map(|n| Some(n.into())).map_err(fail)
    }

    /// Statements for `record` about `subject`: one `rdf:type` per
    /// configured type, then the statements of every column mapping in order.
    ///
    /// # Errors
    /// Returns error naming the record index and column when a cell can't be mapped
    pub fn map_record(
        &self,
        record: &Record,
        subject: &NamedOrBlankNode,
    ) -> Result<Vec<Triple>, RecordTransformError> {
        let mut statements = Vec::new();
        for object_type in &self.types {
            statements.push(Triple::new(
                subject.clone(),
                rdf::TYPE.into_owned(),
                object_type.clone(),
            ));
        }

        for rule in &self.rules {
            let fail = |err: MappingError| {
                RecordTransformError::mapping(record.index(), rule.column.as_str(), err)
            };
            let cell = record
                .get(&rule.column)
                .ok_or_else(|| fail(MappingError::MissingColumn(rule.column.clone())))?;
            rule.apply(subject, cell, &mut statements).map_err(fail)?;
        }
        Ok(statements)
    }
}

/// Object terms of `statements` with the given predicate, in order.
#[cfg(test)]
pub(crate) fn objects_of<'a>(statements: &'a [Triple], predicate: &str) -> Vec<&'a Term> {
    statements
        .iter()
        .filter(|t| t.predicate.as_str() == predicate)
        .map(|t| &t.object)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RecordFailure, Stage};
    use crate::spec::SpecDocument;
    use std::path::Path;

    const SDO: &str = "https://schema.org/";

    fn mapper(yaml: &str) -> RowMapper {
        let document = SpecDocument::from_yaml(Path::new("spec.yaml"), yaml).unwrap();
        let spec = EffectiveSpec::from_document(document, Path::new("spec.yaml")).unwrap();
        RowMapper::new(&spec).unwrap()
    }

    fn record(pairs: &[(&str, &str)]) -> Record {
        Record::from_pairs(1, pairs.iter().copied())
    }

    fn run(mapper: &RowMapper, record: &Record) -> Vec<Triple> {
        let subject = mapper.subject_for(record).unwrap().unwrap();
        mapper.map_record(record, &subject).unwrap()
    }

    fn literal_values(terms: Vec<&Term>) -> Vec<String> {
        terms
            .into_iter()
            .map(|t| match t {
                Term::Literal(l) => l.value().to_string(),
                other => panic!("expected literal, got {other}"),
            })
            .collect()
    }

    const BASE: &str = "prefixes:\n  sdo: https://schema.org/\ninfile: data.csv\nidentifier: ID\n\
                        namespace: https://example.org/pid/\ntypes: [sdo:CreativeWork]\n";

    #[test]
    fn test_subject_and_types() {
        let mapper = mapper(&format!(
            "{}columns:\n  - column: Title\n    predicate: sdo:headline\n",
            BASE
        ));
        let record = record(&[("ID", "1001"), ("Title", "Gattaca")]);

        let subject = mapper.subject_for(&record).unwrap().unwrap();
        assert_eq!(subject.to_string(), "<https://example.org/pid/1001>");

        let statements = mapper.map_record(&record, &subject).unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(
            objects_of(&statements, rdf::TYPE.as_str())[0].to_string(),
            format!("<{}CreativeWork>", SDO)
        );
        assert_eq!(
            literal_values(objects_of(&statements, "https://schema.org/headline")),
            vec!["Gattaca"]
        );
    }

    #[test]
    fn test_identifier_is_percent_encoded() {
        let mapper = mapper(&format!("{}template: x\n", BASE));
        let record = record(&[("ID", "a b/é")]);
        let subject = mapper.subject_for(&record).unwrap().unwrap();
        assert_eq!(
            subject.to_string(),
            "<https://example.org/pid/a%20b%2F%C3%A9>"
        );
    }

    #[test]
    fn test_empty_identifier_skips_record() {
        let mapper = mapper(&format!("{}template: x\n", BASE));
        assert!(mapper.subject_for(&record(&[("ID", "  ")])).unwrap().is_none());
    }

    #[test]
    fn test_no_identifier_gives_blank_subject() {
        let mapper = mapper("infile: a.csv\ncolumns:\n  - column: T\n    predicate: rdfs:label\n");
        let subject = mapper.subject_for(&record(&[("T", "x")])).unwrap().unwrap();
        assert!(matches!(subject, NamedOrBlankNode::BlankNode(_)));
    }

    #[test]
    fn test_identifier_without_namespace_is_full_iri() {
        let mapper = mapper("infile: a.csv\nidentifier: IRI\ntemplate: x\n");
        let subject = mapper
            .subject_for(&record(&[("IRI", "<https://example.org/thing>")]))
            .unwrap()
            .unwrap();
        assert_eq!(subject.to_string(), "<https://example.org/thing>");

        let err = mapper.subject_for(&record(&[("IRI", "not an iri")])).unwrap_err();
        assert_eq!(err.field, "IRI");
        assert_eq!(err.stage(), Stage::Mapping);
    }

    #[test]
    fn test_separator_splits_and_trims() {
        let mapper = mapper(&format!(
            "{}columns:\n  - column: Authors\n    predicate: sdo:author\n    separator: '||'\n",
            BASE
        ));

        let both = run(&mapper, &record(&[("ID", "1"), ("Authors", "john|| mary")]));
        assert_eq!(
            literal_values(objects_of(&both, "https://schema.org/author")),
            vec!["john", "mary"]
        );

        let one = run(&mapper, &record(&[("ID", "2"), ("Authors", "benjamin")]));
        assert_eq!(objects_of(&one, "https://schema.org/author").len(), 1);

        let none = run(&mapper, &record(&[("ID", "3"), ("Authors", "||")]));
        assert!(objects_of(&none, "https://schema.org/author").is_empty());

        let empty = run(&mapper, &record(&[("ID", "4"), ("Authors", "")]));
        assert!(objects_of(&empty, "https://schema.org/author").is_empty());
    }

    #[test]
    fn test_regex_separator() {
        let mapper = mapper(&format!(
            "{}columns:\n  - column: Tags\n    predicate: sdo:keywords\n    separator: '[;,]'\n    regex: true\n",
            BASE
        ));
        let statements = run(&mapper, &record(&[("ID", "1"), ("Tags", "a; b,c")]));
        assert_eq!(
            literal_values(objects_of(&statements, "https://schema.org/keywords")),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_as_uuid_mints_fresh_iri_per_token() {
        let mapper = mapper(&format!(
            "{}columns:\n  - column: Authors\n    predicate: sdo:author\n    separator: '||'\n    as_iri: true\n    as_uuid: true\n    namespace: https://example.org/person/\n    type: sdo:Person\n    label: rdfs:label\n",
            BASE
        ));
        let statements = run(&mapper, &record(&[("ID", "1"), ("Authors", "john||john")]));

        let authors = objects_of(&statements, "https://schema.org/author");
        assert_eq!(authors.len(), 2);
        assert_ne!(authors[0], authors[1]);

        for author in authors {
            let Term::NamedNode(node) = author else {
                panic!("expected IRI, got {author}");
            };
            let suffix = node
                .as_str()
                .strip_prefix("https://example.org/person/")
                .unwrap();
            assert!(Uuid::parse_str(suffix).is_ok());

            let about: Vec<&Triple> = statements
                .iter()
                .filter(|t| t.subject.to_string() == node.to_string())
                .collect();
            assert_eq!(about.len(), 2);
        }

        let labels = objects_of(&statements, "http://www.w3.org/2000/01/rdf-schema#label");
        assert_eq!(literal_values(labels), vec!["john", "john"]);
    }

    #[test]
    fn test_as_iri_with_namespace_and_case() {
        let mapper = mapper(&format!(
            "{}columns:\n  - column: Genre\n    predicate: sdo:genre\n    as_iri: true\n    ignore_case: true\n    namespace: https://example.org/genre/\n",
            BASE
        ));
        let statements = run(&mapper, &record(&[("ID", "1"), ("Genre", "Science Fiction")]));
        let genres = objects_of(&statements, "https://schema.org/genre");
        assert_eq!(
            genres[0].to_string(),
            "<https://example.org/genre/science%20fiction>"
        );
    }

    #[test]
    fn test_angle_brackets_stripped_before_namespace() {
        let mapper = mapper(&format!(
            "{}columns:\n  - column: Genre\n    predicate: sdo:genre\n    as_iri: true\n    \
             separator: ';'\n    namespace: https://example.org/genre/\n  \
             - column: SameAs\n    predicate: sdo:sameAs\n    as_iri: true\n",
            BASE
        ));
        let statements = run(
            &mapper,
            &record(&[
                ("ID", "1"),
                ("Genre", "<Drama>; Crime"),
                ("SameAs", "<https://example.org/films/heat>"),
            ]),
        );

        let genres: Vec<String> = objects_of(&statements, "https://schema.org/genre")
            .iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(
            genres,
            vec![
                "<https://example.org/genre/Drama>",
                "<https://example.org/genre/Crime>"
            ]
        );
        let same_as = objects_of(&statements, "https://schema.org/sameAs");
        assert_eq!(same_as[0].to_string(), "<https://example.org/films/heat>");
    }

    #[test]
    fn test_datestr_literal() {
        let mapper = mapper(&format!(
            "{}columns:\n  - column: Released\n    predicate: sdo:datePublished\n    datestr: '%d.%m.%Y'\n",
            BASE
        ));
        let statements = run(&mapper, &record(&[("ID", "1"), ("Released", "24.10.1997")]));
        let dates = objects_of(&statements, "https://schema.org/datePublished");
        let Term::Literal(literal) = dates[0] else {
            panic!("expected literal");
        };
        assert_eq!(literal.value(), "1997-10-24T00:00:00");
        assert_eq!(literal.datatype(), xsd::DATE_TIME);
    }

    #[test]
    fn test_datestr_failure_names_record_and_field() {
        let mapper = mapper(&format!(
            "{}columns:\n  - column: Released\n    predicate: sdo:datePublished\n    datestr: '%Y-%m-%d'\n",
            BASE
        ));
        let record = Record::from_pairs(7, [("ID", "1"), ("Released", "soon")]);
        let subject = mapper.subject_for(&record).unwrap().unwrap();
        let err = mapper.map_record(&record, &subject).unwrap_err();

        assert_eq!(err.index, 7);
        assert_eq!(err.field, "Released");
        assert!(matches!(
            err.failure,
            RecordFailure::Mapping(MappingError::DateParse { .. })
        ));
    }

    #[test]
    fn test_typed_literal() {
        let mapper = mapper(&format!(
            "{}columns:\n  - column: Runtime\n    predicate: sdo:duration\n    datatype: xsd:integer\n",
            BASE
        ));
        let statements = run(&mapper, &record(&[("ID", "1"), ("Runtime", "106")]));
        let runtime = objects_of(&statements, "https://schema.org/duration");
        assert_eq!(
            runtime[0].to_string(),
            "\"106\"^^<http://www.w3.org/2001/XMLSchema#integer>"
        );
    }

    #[test]
    fn test_normalize_datetime_variants() {
        assert_eq!(
            normalize_datetime("2021-03-04 05:06:07", "%Y-%m-%d %H:%M:%S").as_deref(),
            Some("2021-03-04T05:06:07")
        );
        assert_eq!(
            normalize_datetime("2021-03-04T05:06:07+0200", "%Y-%m-%dT%H:%M:%S%z").as_deref(),
            Some("2021-03-04T05:06:07+02:00")
        );
        assert_eq!(
            normalize_datetime("05:06", "%H:%M").as_deref(),
            Some("1900-01-01T05:06:00")
        );
        assert!(normalize_datetime("2021-13-01", "%Y-%m-%d").is_none());
    }

    #[test]
    fn test_partial_dates_default_month_and_day() {
        assert_eq!(
            normalize_datetime("1997", "%Y").as_deref(),
            Some("1997-01-01T00:00:00")
        );
        assert_eq!(
            normalize_datetime("1997-10", "%Y-%m").as_deref(),
            Some("1997-10-01T00:00:00")
        );
        assert_eq!(
            normalize_datetime("Oct 1997", "%b %Y").as_deref(),
            Some("1997-10-01T00:00:00")
        );
        assert_eq!(
            normalize_datetime("24 Oct", "%d %b").as_deref(),
            Some("1900-10-24T00:00:00")
        );
    }

    #[test]
    fn test_fractional_seconds_are_microseconds() {
        assert_eq!(
            normalize_datetime("2021-03-04 05:06:07.123456", "%Y-%m-%d %H:%M:%S.%f").as_deref(),
            Some("2021-03-04T05:06:07.123456")
        );
        assert_eq!(
            normalize_datetime("07.250000", "%S.%f").as_deref(),
            Some("1900-01-01T00:00:07.250")
        );
        assert_eq!(strptime_format("%%f %.f %f"), "%%f %.f %6f");
    }

    #[test]
    fn test_missing_column_is_mapping_error() {
        let mapper = mapper(&format!(
            "{}columns:\n  - column: Title\n    predicate: sdo:headline\n",
            BASE
        ));
        let record = record(&[("ID", "1")]);
        let subject = mapper.subject_for(&record).unwrap().unwrap();
        let err = mapper.map_record(&record, &subject).unwrap_err();
        assert_eq!(err.field, "Title");
    }
}
