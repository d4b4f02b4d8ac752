//! Chunked output.
//!
//! The writer is consulted after every record. Once the accumulated graph
//! reaches the size threshold it is serialized to `<stem>_<n>.<ext>` and
//! the accumulator starts over, so a chunk always holds whole records.
//! Output is Turtle, or TriG with every statement in the configured named
//! graph.

use oxigraph::io::{RdfFormat, RdfSerializer};
use oxigraph::model::{Graph, GraphNameRef, NamedNode};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::WriteError;
use crate::graph::GraphAccumulator;
use crate::spec::PrefixMap;

/// One flushed output artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkInfo {
    pub path: PathBuf,
    pub statements: usize,
    pub records: usize,
}

/// Serializes accumulated graphs, splitting output at record boundaries.
#[derive(Debug)]
pub struct ChunkedWriter {
    outdir: PathBuf,
    stem: String,
    prefixes: PrefixMap,
    graph_name: Option<NamedNode>,
    threshold: Option<u64>,
    chunks: Vec<ChunkInfo>,
}

impl ChunkedWriter {
    /// Create a writer.
    ///
    /// # Arguments
    ///
    /// * `outdir` - Directory artifacts are written to, created on first flush
    /// * `stem` - File name stem shared by every artifact
    /// * `prefixes` - Bindings declared in every artifact
    /// * `graph_name` - Named graph; selects TriG output when set
    /// * `threshold` - Chunk size in bytes; `None` writes a single artifact
    pub fn new(
        outdir: impl Into<PathBuf>,
        stem: impl Into<String>,
        prefixes: PrefixMap,
        graph_name: Option<NamedNode>,
        threshold: Option<u64>,
    ) -> Self {
        Self {
            outdir: outdir.into(),
            stem: stem.into(),
            prefixes,
            graph_name,
            threshold,
            chunks: Vec::new(),
        }
    }

    fn format(&self) -> RdfFormat {
        if self.graph_name.is_some() {
            RdfFormat::TriG
        } else {
            RdfFormat::Turtle
        }
    }

    pub fn extension(&self) -> &'static str {
        self.format().file_extension()
    }

    /// Path of the single, unsuffixed artifact.
    pub fn output_path(&self) -> PathBuf {
        self.outdir.join(format!("{}.{}", self.stem, self.extension()))
    }

    fn chunk_path(&self, number: usize) -> PathBuf {
        self.outdir
            .join(format!("{}_{}.{}", self.stem, number, self.extension()))
    }

    /// Chunks written so far.
    pub fn chunks(&self) -> &[ChunkInfo] {
        &self.chunks
    }

    /// Flush the accumulated graph if it has reached the threshold.
    ///
    /// Call only between records.
    ///
    /// # Returns
    /// The flushed chunk, if one was written
    ///
    /// # Errors
    /// Returns error if the chunk can't be written
    pub fn observe(
        &mut self,
        accumulator: &mut GraphAccumulator,
    ) -> Result<Option<&ChunkInfo>, WriteError> {
        match self.threshold {
            Some(threshold) if accumulator.size() >= threshold => {
                let path = self.chunk_path(self.chunks.len() + 1);
                self.flush(accumulator, path)?;
                Ok(self.chunks.last())
            }
            _ => Ok(None),
        }
    }

    /// Flush what remains and return every artifact written.
    ///
    /// A trailing empty graph is only written when nothing else was. When
    /// chunking produced a single chunk it is renamed to the unsuffixed name.
    ///
    /// # Errors
    /// Returns error if the last chunk can't be written or renamed
    pub fn finish(
        mut self,
        accumulator: &mut GraphAccumulator,
    ) -> Result<Vec<ChunkInfo>, WriteError> {
        if self.threshold.is_none() {
            let path = self.output_path();
            self.flush(accumulator, path)?;
            return Ok(self.chunks);
        }

        if !accumulator.is_empty() || self.chunks.is_empty() {
            let path = self.chunk_path(self.chunks.len() + 1);
            self.flush(accumulator, path)?;
        }

        let target = self.output_path();
        if let [only] = self.chunks.as_mut_slice() {
            fs::rename(&only.path, &target).map_err(|e| WriteError::io(&target, e))?;
            tracing::debug!("Renamed {} to {}", only.path.display(), target.display());
            only.path = target;
        }
        Ok(self.chunks)
    }

    fn flush(
        &mut self,
        accumulator: &mut GraphAccumulator,
        path: PathBuf,
    ) -> Result<(), WriteError> {
        let records = accumulator.record_count();
        let graph = accumulator.take();
        self.write_graph(&graph, &path)?;

        tracing::info!(
            "{} {} from {} records written to {}",
            graph.len(),
            if self.graph_name.is_some() { "quads" } else { "triples" },
            records,
            path.display()
        );
        self.chunks.push(ChunkInfo {
            path,
            statements: graph.len(),
            records,
        });
        Ok(())
    }

    fn write_graph(&self, graph: &Graph, path: &Path) -> Result<(), WriteError> {
        fs::create_dir_all(&self.outdir).map_err(|e| WriteError::io(&self.outdir, e))?;
        let file = File::create(path).map_err(|e| WriteError::io(path, e))?;

        let mut serializer = RdfSerializer::from_format(self.format());
        for (name, iri) in self.prefixes.iter() {
            serializer = serializer
                .with_prefix(name, iri)
                .map_err(|e| WriteError::Prefix {
                    prefix: name.to_string(),
                    message: e.to_string(),
                })?;
        }
        let mut serializer = serializer.for_writer(BufWriter::new(file));

        for triple in graph.iter() {
            match &self.graph_name {
                Some(name) => {
                    let graph_name = GraphNameRef::NamedNode(name.as_ref());
                    serializer.serialize_quad(triple.in_graph(graph_name))
                }
                None => serializer.serialize_triple(triple),
            }
            .map_err(|e| WriteError::io(path, e))?;
        }

        serializer
            .finish()
            .and_then(|mut out| out.flush())
            .map_err(|e| WriteError::io(path, e))
    }
}
