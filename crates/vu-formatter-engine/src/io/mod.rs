use crate::document::Document;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid document tree in {path}: {source}")]
    InvalidTree {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to serialize document tree: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Read a source file as text
pub fn read_source(path: &Path) -> Result<String, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(IoError::Io)
}

/// Write text to a file, creating parent directories as needed
pub fn write_output(path: &Path, content: &str) -> Result<(), IoError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(IoError::Io)?;
    }

    fs::write(path, content).map_err(IoError::Io)
}

/// Load a document tree serialized as JSON
pub fn read_document(path: &Path) -> Result<Document, IoError> {
    let content = read_source(path)?;
    serde_json::from_str(&content).map_err(|source| IoError::InvalidTree {
        path: path.to_path_buf(),
        source,
    })
}

pub fn document_to_json(document: &Document) -> Result<String, IoError> {
    let mut json = serde_json::to_string_pretty(document)?;
    json.push('\n');
    Ok(json)
}

pub fn write_document(path: &Path, document: &Document) -> Result<(), IoError> {
    write_output(path, &document_to_json(document)?)
}
