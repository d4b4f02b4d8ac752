//! Error types for every stage of a conversion run.
//!
//! Each stage owns one error enum. [`ConvertError`] wraps them so that the
//! binary can report a single message naming the failing stage.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure while loading, merging, or validating specification documents.
#[derive(Debug, Error)]
pub enum SpecResolutionError {
    #[error("specification {} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read specification {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse specification {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("import '{}' referenced from {} does not exist", .import.display(), .from.display())]
    MissingImport { import: PathBuf, from: PathBuf },

    #[error("import cycle detected: {}", display_chain(.chain))]
    ImportCycle { chain: Vec<PathBuf> },

    #[error("specification {} is invalid: {}", .path.display(), .errors.join("; "))]
    Schema { path: PathBuf, errors: Vec<String> },
}

fn display_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Failure while loading an external template-function module.
#[derive(Debug, Error)]
pub enum FunctionLoadError {
    #[error("function module {} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read function module {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse function module {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("function module {} is invalid: {message}", .path.display())]
    Invalid { path: PathBuf, message: String },

    #[error("function module {} is not supported: {reason}", .path.display())]
    Unsupported { path: PathBuf, reason: String },
}

/// Failure while invoking a template function.
#[derive(Debug, Clone, Error)]
pub enum FunctionCallError {
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("invalid arguments to '{function}': {message}")]
    InvalidArgs { function: String, message: String },

    #[error("function '{function}' failed: {message}")]
    Failed { function: String, message: String },
}

/// Failure while turning column cells into statements.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("column '{0}' is not present in the record")]
    MissingColumn(String),

    #[error("could not parse '{value}' with datestr '{format}'")]
    DateParse { value: String, format: String },

    #[error("'{value}' is not a valid IRI: {message}")]
    InvalidIri { value: String, message: String },

    #[error("invalid separator pattern '{pattern}': {message}")]
    InvalidSeparator { pattern: String, message: String },
}

/// Failure while rendering the template for one record.
#[derive(Debug, Error)]
pub enum TemplateRenderError {
    #[error("placeholder '{{{0}}}' does not name a column")]
    UnknownColumn(String),

    #[error("unterminated placeholder starting at byte {0}")]
    UnterminatedPlaceholder(usize),

    #[error("unterminated function call starting at byte {0}")]
    UnterminatedCall(usize),

    #[error("malformed function call '{expression}': {message}")]
    MalformedCall { expression: String, message: String },

    #[error(transparent)]
    Function(#[from] FunctionCallError),

    #[error("rendered template is not a valid graph fragment: {message}")]
    Parse { message: String, rendered: String },
}

/// Pipeline stage a record failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Mapping,
    Templating,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Mapping => write!(f, "mapping"),
            Stage::Templating => write!(f, "templating"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RecordFailure {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Template(#[from] TemplateRenderError),
}

/// A record that could not be fully transformed. Always fatal to the run.
#[derive(Debug, Error)]
#[error("{stage} failed at record {index}, field '{field}': {failure}", stage = stage_of(.failure))]
pub struct RecordTransformError {
    /// 1-based position of the record in the input, header excluded.
    pub index: usize,
    /// Column name, or `template` for template failures.
    pub field: String,
    #[source]
    pub failure: RecordFailure,
}

impl RecordTransformError {
    pub fn mapping(index: usize, field: impl Into<String>, err: MappingError) -> Self {
        Self {
            index,
            field: field.into(),
            failure: RecordFailure::Mapping(err),
        }
    }

    pub fn template(index: usize, err: TemplateRenderError) -> Self {
        Self {
            index,
            field: "template".to_string(),
            failure: RecordFailure::Template(err),
        }
    }

    pub fn stage(&self) -> Stage {
        stage_of(&self.failure)
    }
}

fn stage_of(failure: &RecordFailure) -> Stage {
    match failure {
        RecordFailure::Mapping(_) => Stage::Mapping,
        RecordFailure::Template(_) => Stage::Templating,
    }
}

/// Failure while serializing or flushing a chunk.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to write {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid prefix binding {prefix}: {message}")]
    Prefix { prefix: String, message: String },
}

impl WriteError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        WriteError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Top-level error for a conversion run.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("resolution: {0}")]
    Resolution(#[from] SpecResolutionError),

    #[error("functions: {0}")]
    FunctionLoad(#[from] FunctionLoadError),

    #[error("mapping: {0}")]
    Setup(#[from] MappingError),

    #[error("templating: {0}")]
    Template(#[from] TemplateRenderError),

    #[error(transparent)]
    Record(#[from] RecordTransformError),

    #[error("input: {} does not exist", .0.display())]
    MissingInput(PathBuf),

    #[error("input: column '{column}' is not in the header of {}", .path.display())]
    UnknownColumn { column: String, path: PathBuf },

    #[error("input: unknown encoding '{0}'")]
    UnknownEncoding(String),

    #[error("input: failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: csv::Error },

    #[error("writing: {0}")]
    Write(#[from] WriteError),
}
