//! Conversion pipeline.
//!
//! A [`Converter`] is built once from the effective specification. It holds
//! everything that is fixed for a run: the function registry, the compiled
//! column mappings and template, and the input encoding. [`Converter::run`]
//! then streams records through the mapper and template into the graph
//! accumulator, handing the graph to the chunked writer after every record.

use encoding_rs::Encoding;
use oxigraph::model::{NamedNode, Triple};
use std::env;
use std::path::{Path, PathBuf};

use crate::encoding::resolve_encoding;
use crate::error::{ConvertError, RecordTransformError};
use crate::functions::FunctionRegistry;
use crate::graph::GraphAccumulator;
use crate::mapping::RowMapper;
use crate::record::{CsvRecordSource, Record};
use crate::spec::{self, EffectiveSpec};
use crate::template::TemplateEngine;
use crate::writer::{ChunkInfo, ChunkedWriter};

/// Environment variable overriding the specification's `outdir`.
pub const OUTDIR_ENV: &str = "RDFCON_OUTDIR";

/// Per-run options that don't belong to the specification.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Stop after this many input records.
    pub limit: Option<usize>,
    /// Output directory, taking precedence over every other source.
    pub output_dir: Option<PathBuf>,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    /// Input records read, including skipped ones.
    pub records: usize,
    /// Records skipped because their identifier cell was empty.
    pub skipped: usize,
    /// Statements written, summed over chunks.
    pub statements: usize,
    pub chunks: Vec<ChunkInfo>,
}

impl ConversionSummary {
    pub fn files(&self) -> Vec<&Path> {
        self.chunks.iter().map(|c| c.path.as_path()).collect()
    }
}

/// Record-to-graph converter for one effective specification.
#[derive(Debug)]
pub struct Converter {
    spec: EffectiveSpec,
    functions: FunctionRegistry,
    mapper: RowMapper,
    template: Option<TemplateEngine>,
    encoding: &'static Encoding,
}

impl Converter {
    /// Resolve the specification at `path` and prepare a converter for it.
    ///
    /// # Errors
    /// Returns error if resolution, function loading or setup fails
    pub fn from_spec_file(path: &Path) -> Result<Self, ConvertError> {
        let spec = spec::resolve(path)?;
        tracing::debug!("Resolved specification {}", path.display());
        Self::new(spec)
    }

    /// Prepare a converter for an already resolved specification.
    ///
    /// Loads the template function module exactly once.
    ///
    /// # Errors
    /// Returns error if the function module can't be loaded, a mapping or the
    /// template can't be compiled, or the declared encoding is unknown
    pub fn new(spec: EffectiveSpec) -> Result<Self, ConvertError> {
        let functions = FunctionRegistry::load(spec.template_functions.as_deref())?;
        let mapper = RowMapper::new(&spec)?;
        let template = spec
            .template
            .as_deref()
            .map(|t| TemplateEngine::new(t, &spec.prefixes))
            .transpose()?;

        let (encoding, source) = resolve_encoding(spec.encoding.as_deref())?;
        tracing::debug!("Reading input as {} (from {})", encoding.name(), source);

        Ok(Self {
            spec,
            functions,
            mapper,
            template,
            encoding,
        })
    }

    pub fn spec(&self) -> &EffectiveSpec {
        &self.spec
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// All statements for one record.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(statements))` - Mapping statements followed by template statements
    /// * `Ok(None)` - The record's identifier is empty and it is skipped
    /// * `Err(RecordTransformError)` - The record can't be fully transformed
    pub fn convert_record(
        &self,
        record: &Record,
    ) -> Result<Option<Vec<Triple>>, RecordTransformError> {
        let Some(subject) = self.mapper.subject_for(record)? else {
            return Ok(None);
        };

        let mut statements = self.mapper.map_record(record, &subject)?;
        if let Some(template) = &self.template {
            let rendered = template
                .render(record, &self.functions)
                .map_err(|e| RecordTransformError::template(record.index(), e))?;
            statements.extend(rendered);
        }
        Ok(Some(statements))
    }

    /// Check an input header against the specification.
    ///
    /// Columns read by the mapping rules must be present. Columns nothing
    /// reads are reported as a warning.
    ///
    /// # Errors
    /// Returns [`ConvertError::UnknownColumn`] for the first mapped column
    /// missing from the header
    pub fn check_header(&self, headers: &[String], path: &Path) -> Result<(), ConvertError> {
        if let Some(missing) = self
            .mapper
            .columns()
            .find(|c| !headers.iter().any(|h| h == c))
        {
            return Err(ConvertError::UnknownColumn {
                column: missing.to_string(),
                path: path.to_path_buf(),
            });
        }

        let unused = self.unused_columns(headers);
        if !unused.is_empty() {
            let name = path.file_name().unwrap_or(path.as_os_str()).to_string_lossy();
            tracing::warn!(
                "{} columns in {} are not used: {}",
                unused.len(),
                name,
                unused.join(", ")
            );
        }
        Ok(())
    }

    /// Header columns read by neither the mappings nor the template.
    pub fn unused_columns<'h>(&self, headers: &'h [String]) -> Vec<&'h str> {
        let placeholders = self
            .template
            .as_ref()
            .map(TemplateEngine::placeholders)
            .unwrap_or_default();

        headers
            .iter()
            .map(String::as_str)
            .filter(|h| !self.mapper.columns().any(|c| c == *h))
            .filter(|h| !placeholders.contains(h))
            .collect()
    }

    /// Output directory for a run.
    pub fn output_dir(&self, cli: Option<&Path>) -> PathBuf {
        resolve_output_dir(
            cli,
            env::var_os(OUTDIR_ENV).map(PathBuf::from),
            self.spec.outdir.as_deref(),
            &self.spec.infile,
        )
    }

    /// File stem shared by the output chunks and the log file.
    pub fn output_stem(&self) -> String {
        self.spec
            .infile
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string())
    }

    /// Path of the run's log file, `<outdir>/<stem>.log`.
    pub fn log_path(&self, cli: Option<&Path>) -> PathBuf {
        self.output_dir(cli).join(format!("{}.log", self.output_stem()))
    }

    /// Convert the whole input.
    ///
    /// Stops at the first record that can't be transformed; chunks already
    /// flushed stay on disk.
    ///
    /// # Errors
    /// Returns error if the input can't be read, a record fails, or output
    /// can't be written
    pub fn run(&self, options: &ConvertOptions) -> Result<ConversionSummary, ConvertError> {
        let source = CsvRecordSource::open(&self.spec.infile, self.encoding)?;
        self.check_header(source.headers(), source.path())?;

        // expanded and validated when the specification was resolved
        let graph_name = self.spec.graph.clone().map(NamedNode::new_unchecked);

        let mut writer = ChunkedWriter::new(
            self.output_dir(options.output_dir.as_deref()),
            self.output_stem(),
            self.spec.prefixes.clone(),
            graph_name,
            self.spec.max_graph_size_bytes(),
        );
        let mut accumulator = GraphAccumulator::new();
        let mut summary = ConversionSummary::default();

        let limit = options.limit.unwrap_or(usize::MAX);
        for record in source.take(limit) {
            let record = record?;
            summary.records += 1;

            match self.convert_record(&record)? {
                Some(statements) => {
                    accumulator.add_record_statements(statements);
                }
                None => {
                    tracing::debug!("Skipping record {}: identifier is empty", record.index());
                    summary.skipped += 1;
                    continue;
                }
            }
            writer.observe(&mut accumulator)?;
        }

        summary.chunks = writer.finish(&mut accumulator)?;
        summary.statements = summary.chunks.iter().map(|c| c.statements).sum();

        tracing::info!(
            "Converted {} records into {} statements across {} files",
            summary.records - summary.skipped,
            summary.statements,
            summary.chunks.len()
        );
        Ok(summary)
    }
}

/// Pick the output directory: CLI flag, then environment, then the
/// specification, then the input file's directory.
pub fn resolve_output_dir(
    cli: Option<&Path>,
    env: Option<PathBuf>,
    spec: Option<&Path>,
    infile: &Path,
) -> PathBuf {
    if let Some(dir) = cli {
        return dir.to_path_buf();
    }
    if let Some(dir) = env.filter(|d| !d.as_os_str().is_empty()) {
        return dir;
    }
    if let Some(dir) = spec {
        return dir.to_path_buf();
    }
    match infile.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
