//! Recursive import resolution.
//!
//! A document's imports are resolved depth-first, left to right, and folded
//! into an accumulator in declaration order; the importing document is folded
//! last so that it wins over everything it imports. Cycles are detected with
//! the chain of documents on the current resolution path, so a document may be
//! imported from several places (a diamond) as long as it never imports itself.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SpecResolutionError;
use crate::spec::document::SpecDocument;

/// Resolves a root document and its imports into one merged document.
#[derive(Debug, Default)]
pub struct SpecResolver {
    chain: Vec<PathBuf>,
    loaded: Vec<PathBuf>,
}

impl SpecResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `path` and everything it imports.
    ///
    /// # Errors
    /// Returns error if any document is missing or malformed, or an import cycle exists
    pub fn resolve(&mut self, path: &Path) -> Result<SpecDocument, SpecResolutionError> {
        if !path.exists() {
            return Err(SpecResolutionError::NotFound(path.to_path_buf()));
        }
        let canonical = canonical(path)?;
        self.resolve_canonical(canonical)
    }

    /// Documents read during resolution, in the order they were loaded.
    pub fn loaded(&self) -> &[PathBuf] {
        &self.loaded
    }

    fn resolve_canonical(&mut self, path: PathBuf) -> Result<SpecDocument, SpecResolutionError> {
        if self.chain.contains(&path) {
            let mut cycle = self.chain.clone();
            cycle.push(path);
            return Err(SpecResolutionError::ImportCycle { chain: cycle });
        }

        let mut document = SpecDocument::load(&path)?;
        tracing::debug!(
            "Loaded specification {} ({} imports)",
            path.display(),
            document.imports.len()
        );
        self.loaded.push(path.clone());

        let imports = std::mem::take(&mut document.imports);
        self.chain.push(path.clone());

        let mut merged = SpecDocument::default();
        for import in imports {
            if !import.exists() {
                return Err(SpecResolutionError::MissingImport {
                    import,
                    from: path,
                });
            }
            let resolved = self.resolve_canonical(canonical(&import)?)?;
            merged = merged.merge(resolved);
        }

        self.chain.pop();
        Ok(merged.merge(document))
    }
}

fn canonical(path: &Path) -> Result<PathBuf, SpecResolutionError> {
    fs::canonicalize(path).map_err(|source| SpecResolutionError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolve `path` into a single merged, not yet validated, document.
pub fn resolve_document(path: &Path) -> Result<SpecDocument, SpecResolutionError> {
    SpecResolver::new().resolve(path)
}
