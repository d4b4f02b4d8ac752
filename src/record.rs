//! Input records.
//!
//! A [`Record`] is one data row keyed by header name. [`CsvRecordSource`]
//! reads them from a delimited file with a header row, decoding the bytes
//! with the resolved input encoding.

use encoding_rs::Encoding;
use encoding_rs_io::DecodeReaderBytesBuilder;
use indexmap::IndexMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::ConvertError;

/// One input row: header name -> raw cell text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    index: usize,
    values: IndexMap<String, String>,
}

impl Record {
    /// Create a record. `index` is 1-based, header row excluded.
    pub fn new(index: usize, values: IndexMap<String, String>) -> Self {
        Self { index, values }
    }

    /// Build a record from `(column, value)` pairs.
    pub fn from_pairs<I, K, V>(index: usize, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(
            index,
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Raw text of `column`, if the column exists.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Streaming reader of records from a delimited file.
///
/// Rows may be shorter or longer than the header: missing trailing cells
/// read as empty and extra cells are ignored.
pub struct CsvRecordSource {
    path: PathBuf,
    headers: Vec<String>,
    reader: csv::Reader<Box<dyn Read>>,
    row: csv::StringRecord,
    next_index: usize,
}

impl CsvRecordSource {
    /// Open `path` and read its header row.
    ///
    /// # Errors
    /// Returns error if the file is missing or its header can't be read
    pub fn open(path: &Path, encoding: &'static Encoding) -> Result<Self, ConvertError> {
        if !path.is_file() {
            return Err(ConvertError::MissingInput(path.to_path_buf()));
        }

        let file = File::open(path).map_err(|e| ConvertError::Read {
            path: path.to_path_buf(),
            source: e.into(),
        })?;

        let decoded = DecodeReaderBytesBuilder::new()
            .encoding(Some(encoding))
            .bom_override(true)
            .strip_bom(true)
            .build(file);

        Self::from_reader(path, Box::new(decoded))
    }

    /// Read records from an already-decoded UTF-8 stream.
    pub fn from_reader(path: &Path, input: Box<dyn Read>) -> Result<Self, ConvertError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(input);

        let headers = reader
            .headers()
            .map_err(|source| ConvertError::Read {
                path: path.to_path_buf(),
                source,
            })?
            .iter()
            .map(str::to_string)
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            headers,
            reader,
            row: csv::StringRecord::new(),
            next_index: 1,
        })
    }

    /// Header names in file order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_next(&mut self) -> Result<Option<Record>, ConvertError> {
        let more = self
            .reader
            .read_record(&mut self.row)
            .map_err(|source| ConvertError::Read {
                path: self.path.clone(),
                source,
            })?;
        if !more {
            return Ok(None);
        }

        let values = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), self.row.get(i).unwrap_or("").to_string()))
            .collect();

        let record = Record::new(self.next_index, values);
        self.next_index += 1;
        Ok(Some(record))
    }
}

impl Iterator for CsvRecordSource {
    type Item = Result<Record, ConvertError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{UTF_8, WINDOWS_1252};
    use std::fs;
    use tempfile::TempDir;

    fn source(dir: &TempDir, bytes: &[u8], encoding: &'static Encoding) -> CsvRecordSource {
        let path = dir.path().join("input.csv");
        fs::write(&path, bytes).unwrap();
        CsvRecordSource::open(&path, encoding).unwrap()
    }

    #[test]
    fn test_reads_records_in_order() {
        let dir = TempDir::new().unwrap();
        let mut records = source(
            &dir,
            b"ID,Title\n1001,Gattaca\n1002,2001 a Space Odyssey\n",
            UTF_8,
        );

        assert_eq!(records.headers().to_vec(), vec!["ID", "Title"]);
        let first = records.next().unwrap().unwrap();
        assert_eq!(first.index(), 1);
        assert_eq!(first.get("Title"), Some("Gattaca"));
        let second = records.next().unwrap().unwrap();
        assert_eq!(second.index(), 2);
        assert_eq!(second.get("Title"), Some("2001 a Space Odyssey"));
        assert!(records.next().is_none());
    }

    #[test]
    fn test_short_rows_read_as_empty() {
        let dir = TempDir::new().unwrap();
        let mut records = source(&dir, b"A,B,C\n1\n2,x,y,extra\n", UTF_8);

        let short = records.next().unwrap().unwrap();
        assert_eq!(short.get("A"), Some("1"));
        assert_eq!(short.get("C"), Some(""));

        let long = records.next().unwrap().unwrap();
        assert_eq!(long.len(), 3);
        assert_eq!(long.get("C"), Some("y"));
    }

    #[test]
    fn test_decodes_declared_encoding() {
        let dir = TempDir::new().unwrap();
        let mut records = source(&dir, b"Name\nJos\xe9\n", WINDOWS_1252);
        let record = records.next().unwrap().unwrap();
        assert_eq!(record.get("Name"), Some("José"));
    }

    #[test]
    fn test_utf8_bom_stripped_from_header() {
        let dir = TempDir::new().unwrap();
        let records = source(&dir, b"\xef\xbb\xbfID,Title\n1,x\n", UTF_8);
        assert_eq!(records.headers()[0], "ID");
    }

    #[test]
    fn test_missing_input() {
        let err = CsvRecordSource::open(Path::new("/no/such/input.csv"), UTF_8)
            .err()
            .unwrap();
        assert!(matches!(err, ConvertError::MissingInput(_)));
    }

    #[test]
    fn test_quoted_cells_keep_delimiters() {
        let dir = TempDir::new().unwrap();
        let mut records = source(&dir, b"ID,Authors\n1,\"john||mary, jr\"\n", UTF_8);
        let record = records.next().unwrap().unwrap();
        assert_eq!(record.get("Authors"), Some("john||mary, jr"));
    }
}
