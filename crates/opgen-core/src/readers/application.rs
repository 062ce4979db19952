//! Reader for per-application metadata (OpenplanetNext.json and friends)
//!
//! The document maps namespace names to their classes under the `ns` key:
//! `{"ns": {"UI": {"Label": {...}}}}`. Class collections may also be given
//! as a list of names or of `{"name": ...}` objects. This source never
//! contributes global functions.

use serde_json::Value;
use std::path::Path;
use tracing::debug;

use super::{MetadataReader, parse_object};
use crate::Result;
use crate::discovery::SourceKind;
use crate::symbols::SymbolSet;

const NAMESPACE_MAP_KEY: &str = "ns";

#[derive(Debug, Clone, Copy, Default)]
pub struct ApplicationReader;

impl MetadataReader for ApplicationReader {
    fn kind(&self) -> SourceKind {
        SourceKind::Application
    }

    fn read_str(&self, content: &str, origin: &Path, symbols: &mut SymbolSet) -> Result<()> {
        let document = parse_object(content, origin)?;

        let Some(namespaces) = document.get(NAMESPACE_MAP_KEY).and_then(Value::as_object) else {
            debug!(
                "{}: no '{}' namespace map, nothing to read",
                origin.display(),
                NAMESPACE_MAP_KEY
            );
            return Ok(());
        };

        for (namespace, classes) in namespaces {
            symbols.add_namespace(namespace);
            match classes {
                Value::Object(map) => {
                    for class in map.keys() {
                        symbols.add_type(class);
                    }
                }
                Value::Array(items) => {
                    for item in items {
                        match item {
                            Value::String(class) => {
                                symbols.add_type(class);
                            }
                            Value::Object(obj) => {
                                if let Some(class) = obj.get("name").and_then(Value::as_str) {
                                    symbols.add_type(class);
                                }
                            }
                            _ => debug!(
                                "{}: skipping malformed class entry in '{}'",
                                origin.display(),
                                namespace
                            ),
                        }
                    }
                }
                _ => debug!(
                    "{}: classes of '{}' are neither a map nor a list",
                    origin.display(),
                    namespace
                ),
            }
        }

        Ok(())
    }
}
