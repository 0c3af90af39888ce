//! Loading YAML/JSON documents (initial props, session scripts, comparison
//! payloads) from disk.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{PlaygroundError, Result};
use crate::models::InitialProps;

pub fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Load a document, picking the format from the file extension.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    match ext.as_str() {
        "yaml" | "yml" => load_yaml(path),
        "json" => load_json(path),
        _ => Err(PlaygroundError::UnsupportedFormat(ext)),
    }
}

pub fn load_initial_props(path: &Path) -> Result<InitialProps> {
    load_document(path)
}
