//! # rdfcon: Tabular Data to RDF
//!
//! rdfcon converts delimited tabular records into RDF statements according to
//! a declarative, mergeable YAML specification.
//!
//! ## Features
//!
//! - **Mergeable specifications**: documents pull in shared prefixes and mappings through `imports`
//! - **Column mappings**: split cells, mint IRIs or UUIDs, parse dates into typed literals
//! - **Templates**: Turtle fragments with `{Column}` placeholders and `{{ function(args) }}` calls
//! - **Function modules**: declarative YAML modules, or Python modules (feature: `python-bridge`)
//! - **Chunked output**: Turtle or TriG files split at record boundaries by size
//!
//! ## Example: Specification
//!
//! ```yaml
//! prefixes:
//!   sdo: https://schema.org/
//! infile: films.csv
//! identifier: ID
//! namespace: https://example.org/pid/
//! types: [sdo:Movie]
//! columns:
//!   - column: Title
//!     predicate: sdo:headline
//!   - column: Authors
//!     predicate: sdo:author
//!     separator: "||"
//! template: |
//!   <https://example.org/pid/{ID}> sdo:genre "{{ genre({Title}) }}" .
//! templateFunctions: functions.yaml
//! maxGraphSizeMb: 50
//! ```
//!
//! ## Example: Library
//!
//! ```no_run
//! use rdfcon::{ConvertOptions, Converter};
//! use std::path::Path;
//!
//! let converter = Converter::from_spec_file(Path::new("films.yaml"))?;
//! let summary = converter.run(&ConvertOptions::default())?;
//! println!("{} statements", summary.statements);
//! # Ok::<(), rdfcon::ConvertError>(())
//! ```

pub mod convert;
pub mod encoding;
pub mod error;
pub mod functions;
pub mod graph;
pub mod logging;
pub mod mapping;
pub mod record;
pub mod spec;
pub mod template;
pub mod writer;

pub use convert::{ConversionSummary, ConvertOptions, Converter};
pub use error::{
    ConvertError, FunctionCallError, FunctionLoadError, MappingError, RecordTransformError,
    SpecResolutionError, Stage, TemplateRenderError, WriteError,
};
pub use functions::{FunctionArgs, FunctionRegistry, TemplateFunction};
pub use graph::GraphAccumulator;
pub use mapping::RowMapper;
pub use record::{CsvRecordSource, Record};
pub use spec::{resolve, EffectiveSpec, PrefixMap, SpecDocument};
pub use template::TemplateEngine;
pub use writer::{ChunkInfo, ChunkedWriter};
