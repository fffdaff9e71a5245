//! Delimited-file persistence for extracted products.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::models::Product;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("category {second:?} would overwrite {first:?} in {path}")]
    NameCollision {
        first: String,
        second: String,
        path: PathBuf,
    },
}

/// Append-only writer for one table: a header, then rows.
pub trait RecordSink {
    fn write_header(&mut self, fields: &[&str]) -> Result<(), StorageError>;

    fn append_rows(&mut self, records: &[Product]) -> Result<(), StorageError>;
}

/// [`RecordSink`] writing delimited text to any writer.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W, delimiter: u8) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .delimiter(delimiter)
            .from_writer(inner);
        Self { writer }
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(self) -> Result<W, StorageError> {
        self.writer
            .into_inner()
            .map_err(|e| StorageError::Io(e.into_error()))
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn write_header(&mut self, fields: &[&str]) -> Result<(), StorageError> {
        self.writer.write_record(fields)?;
        Ok(())
    }

    fn append_rows(&mut self, records: &[Product]) -> Result<(), StorageError> {
        for record in records {
            self.writer.serialize(record)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Destination for one category's products.
pub trait ProductStore {
    fn persist(&mut self, category: &str, products: &[Product]) -> Result<(), StorageError>;
}

/// Writes `<dir>/<category>.csv` per category, replacing earlier runs.
///
/// Within one store, a second category mapping to an already written file is
/// refused.
#[derive(Debug, Clone)]
pub struct CsvStore {
    dir: PathBuf,
    delimiter: u8,
    /// File stem -> category written under it.
    written: HashMap<String, String>,
}

impl CsvStore {
    pub fn new(dir: impl Into<PathBuf>, delimiter: u8) -> Self {
        Self {
            dir: dir.into(),
            delimiter,
            written: HashMap::new(),
        }
    }

    pub fn path_for(&self, category: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", file_stem(category)))
    }
}

impl ProductStore for CsvStore {
    fn persist(&mut self, category: &str, products: &[Product]) -> Result<(), StorageError> {
        let stem = file_stem(category);
        let path = self.path_for(category);
        match self.written.get(&stem) {
            Some(first) if first != category => {
                return Err(StorageError::NameCollision {
                    first: first.clone(),
                    second: category.to_string(),
                    path,
                });
            }
            _ => {}
        }

        fs::create_dir_all(&self.dir)?;

        let mut sink = CsvSink::new(File::create(&path)?, self.delimiter);
        sink.write_header(&Product::FIELDS)?;
        sink.append_rows(products)?;
        sink.into_inner()?.sync_all()?;

        self.written.insert(stem, category.to_string());
        info!("Wrote {} products to {}", products.len(), path.display());
        Ok(())
    }
}

/// Read a file written by [`CsvStore`] back into products.
pub fn read_products(path: &Path, delimiter: u8) -> Result<Vec<Product>, StorageError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(path)?;
    reader
        .deserialize()
        .map(|row| row.map_err(StorageError::from))
        .collect()
}

/// File name (without extension) a category is written under. Anything
/// outside `[A-Za-z0-9_-]` becomes `_`, so distinct names can collide;
/// configuration rejects such pairs.
pub fn file_stem(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "category".to_string()
    } else {
        cleaned
    }
}
