//! Metadata readers
//!
//! One reader per [`SourceKind`]. All readers accumulate into a shared
//! [`SymbolSet`]; a file that cannot be parsed at all is an error, while
//! individual malformed entries inside a valid file are skipped.

mod application;
mod core_metadata;
mod header;

pub use application::ApplicationReader;
pub use core_metadata::CoreReader;
pub use header::HeaderReader;

use crate::discovery::SourceKind;
use crate::symbols::SymbolSet;
use crate::{OpgenError, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Extracts symbols from one kind of metadata source
pub trait MetadataReader {
    /// Kind of source this reader understands
    fn kind(&self) -> SourceKind;

    /// Extract symbols from already-loaded content; `origin` is used in errors
    fn read_str(&self, content: &str, origin: &Path, symbols: &mut SymbolSet) -> Result<()>;

    /// Load a file and extract its symbols
    fn read_file(&self, path: &Path, symbols: &mut SymbolSet) -> Result<()> {
        let bytes = fs::read(path).map_err(|e| OpgenError::io(path, e))?;
        let content = String::from_utf8_lossy(&bytes);
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
        debug!("Reading {} metadata from {}", self.kind(), path.display());
        self.read_str(content, path, symbols)
    }
}

/// The reader for a source kind
pub fn reader_for(kind: SourceKind) -> &'static dyn MetadataReader {
    match kind {
        SourceKind::Core => &CoreReader,
        SourceKind::Application => &ApplicationReader,
        SourceKind::Header => &HeaderReader,
    }
}

/// Parse a structured metadata document, requiring an object at the root
fn parse_object(
    content: &str,
    origin: &Path,
) -> Result<serde_json::Map<String, serde_json::Value>> {
    let value: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| OpgenError::malformed_metadata(origin, e.to_string()))?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(OpgenError::malformed_metadata(
            origin,
            format!("expected an object at the root, found {}", json_type_name(&other)),
        )),
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_reader_for_kind() {
        for kind in [SourceKind::Core, SourceKind::Application, SourceKind::Header] {
            assert_eq!(reader_for(kind).kind(), kind);
        }
    }

    #[test]
    fn test_read_file_strips_bom() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("OpenplanetNext.json");
        fs::write(&path, "\u{feff}{\"ns\": {\"UI\": {}}}").unwrap();

        let mut symbols = SymbolSet::new();
        ApplicationReader.read_file(&path, &mut symbols).unwrap();
        assert!(symbols.namespaces().contains("UI"));
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let mut symbols = SymbolSet::new();
        let err = CoreReader
            .read_file(&PathBuf::from("/definitely/not/here.json"), &mut symbols)
            .unwrap_err();
        assert!(matches!(err, OpgenError::Io { .. }));
    }

    #[test]
    fn test_non_object_root_is_malformed() {
        let err = parse_object("[1, 2]", Path::new("x.json")).unwrap_err();
        assert!(matches!(err, OpgenError::MalformedMetadata { .. }));
        assert!(err.to_string().contains("an array"));
    }
}
