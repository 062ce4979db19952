//! Loading and saving the grammar document
//!
//! The document is re-serialized with the indentation unit detected in the
//! file it was read from, so regeneration only produces diffs where content
//! actually changed. Key order is preserved through `serde_json`'s
//! `preserve_order` feature.

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{OpgenError, Result};

const DEFAULT_INDENT: &str = "  ";

/// A grammar document held in memory for one run
#[derive(Debug, Clone)]
pub struct GrammarDocument {
    path: PathBuf,
    root: Value,
    original: String,
}

impl GrammarDocument {
    /// Read and parse the document at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| OpgenError::io(path, e))?;
        let content = String::from_utf8(bytes)
            .map_err(|e| OpgenError::malformed_grammar(path, format!("not valid UTF-8: {e}")))?;
        Self::parse(path, content)
    }

    /// Parse `content` as the document stored at `path`
    pub fn parse(path: &Path, content: String) -> Result<Self> {
        let text = content.strip_prefix('\u{feff}').unwrap_or(&content);
        let root: Value = serde_json::from_str(text)
            .map_err(|e| OpgenError::malformed_grammar(path, e.to_string()))?;
        if !root.is_object() {
            return Err(OpgenError::malformed_grammar(
                path,
                "the document root must be an object",
            ));
        }
        debug!("Loaded grammar document {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            root,
            original: content,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Value {
        &mut self.root
    }

    /// The document as it will be written, with a trailing newline
    pub fn to_pretty_string(&self) -> Result<String> {
        let indent = detect_indent(&self.original);
        let mut buffer = Vec::with_capacity(self.original.len());
        let formatter = PrettyFormatter::with_indent(indent.as_bytes());
        let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
        self.root
            .serialize(&mut serializer)
            .map_err(|e| OpgenError::malformed_grammar(&self.path, e.to_string()))?;
        buffer.push(b'\n');
        String::from_utf8(buffer).map_err(|e| OpgenError::malformed_grammar(&self.path, e.to_string()))
    }

    /// True when saving would change the file
    pub fn is_modified(&self) -> Result<bool> {
        Ok(self.to_pretty_string()? != self.original)
    }

    /// Write back to the path the document was loaded from
    pub fn save(&self) -> Result<bool> {
        self.save_to(&self.path)
    }

    /// Write the document to `path`, atomically
    ///
    /// Returns false without touching the file when its current content is
    /// already identical.
    pub fn save_to(&self, path: &Path) -> Result<bool> {
        let serialized = self.to_pretty_string()?;
        if let Ok(current) = fs::read(path)
            && current == serialized.as_bytes()
        {
            debug!("{} is up to date", path.display());
            return Ok(false);
        }

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(parent).map_err(|e| OpgenError::io(parent, e))?;
        temp.write_all(serialized.as_bytes())
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| OpgenError::io(temp.path(), e))?;
        if let Ok(metadata) = fs::metadata(path) {
            fs::set_permissions(temp.path(), metadata.permissions())
                .map_err(|e| OpgenError::io(temp.path(), e))?;
        }
        temp.persist(path)
            .map_err(|e| OpgenError::io(path, e.error))?;

        debug!("Wrote {} bytes to {}", serialized.len(), path.display());
        Ok(true)
    }
}

/// Indentation unit of the first indented line, or two spaces
fn detect_indent(content: &str) -> String {
    content
        .lines()
        .skip(1)
        .find_map(|line| {
            let trimmed = line.trim_start_matches([' ', '\t']);
            if trimmed.is_empty() || trimmed.len() == line.len() {
                return None;
            }
            let leading = &line[..line.len() - trimmed.len()];
            if leading.starts_with('\t') {
                Some("\t".to_string())
            } else {
                Some(" ".repeat(leading.len()))
            }
        })
        .unwrap_or_else(|| DEFAULT_INDENT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_is_byte_identical() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("grammar.json");
        let content = "{\n    \"name\": \"AngelScript\",\n    \"patterns\": [\n        {\n            \"include\": \"#types\"\n        }\n    ],\n    \"a\": 1\n}\n";
        fs::write(&path, content).unwrap();

        let document = GrammarDocument::load(&path).unwrap();
        assert_eq!(document.to_pretty_string().unwrap(), content);
        assert!(!document.is_modified().unwrap());
        assert!(!document.save().unwrap());
    }

    #[test]
    fn test_key_order_is_preserved() {
        let document =
            GrammarDocument::parse(Path::new("g.json"), r#"{"z": 1, "a": 2, "m": 3}"#.to_string())
                .unwrap();
        let keys: Vec<&String> = document.root().as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_detect_indent() {
        assert_eq!(detect_indent("{\n\t\"a\": 1\n}"), "\t");
        assert_eq!(detect_indent("{\n    \"a\": 1\n}"), "    ");
        assert_eq!(detect_indent("{}"), DEFAULT_INDENT);
    }

    #[test]
    fn test_non_object_root_is_malformed() {
        let err = GrammarDocument::parse(Path::new("g.json"), "[1, 2]".to_string()).unwrap_err();
        assert!(matches!(err, OpgenError::MalformedGrammar { .. }));
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = GrammarDocument::parse(Path::new("g.json"), "{\"a\": ".to_string()).unwrap_err();
        assert!(matches!(err, OpgenError::MalformedGrammar { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = GrammarDocument::load(&temp_dir.path().join("none.json")).unwrap_err();
        assert!(matches!(err, OpgenError::Io { .. }));
    }

    #[test]
    fn test_save_writes_changes_with_trailing_newline() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("grammar.json");
        fs::write(&path, "{\"name\":\"x\"}").unwrap();

        let mut document = GrammarDocument::load(&path).unwrap();
        document.root_mut()["name"] = Value::String("y".to_string());
        assert!(document.save().unwrap());

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "{\n  \"name\": \"y\"\n}\n");
        let leftovers = fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_bom_is_tolerated() {
        let document =
            GrammarDocument::parse(Path::new("g.json"), "\u{feff}{\"a\": 1}".to_string()).unwrap();
        assert_eq!(document.root()["a"], 1);
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("grammar.json");
        fs::write(&path, b"{\"name\": \"\xff\xfe\"}").unwrap();

        let err = GrammarDocument::load(&path).unwrap_err();
        assert!(matches!(err, OpgenError::MalformedGrammar { .. }));
        assert!(err.to_string().contains("UTF-8"));
    }
}
