//! Reader for OpenplanetCore.json
//!
//! The core document lists descriptors under `functions`, `enums`, `props`,
//! `funcdefs` and `classes`. Each descriptor may carry an owning namespace in
//! `ns`. Namespaces come from every list, types from `classes`, and global
//! functions from `functions` entries without a namespace.

use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

use super::{MetadataReader, parse_object};
use crate::Result;
use crate::discovery::SourceKind;
use crate::symbols::SymbolSet;

const DESCRIPTOR_LISTS: [&str; 5] = ["functions", "enums", "props", "funcdefs", "classes"];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Descriptor {
    name: Option<String>,
    #[serde(alias = "namespace")]
    ns: Option<String>,
}

impl Descriptor {
    fn namespace(&self) -> Option<&str> {
        self.ns.as_deref().filter(|ns| !ns.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CoreReader;

impl MetadataReader for CoreReader {
    fn kind(&self) -> SourceKind {
        SourceKind::Core
    }

    fn read_str(&self, content: &str, origin: &Path, symbols: &mut SymbolSet) -> Result<()> {
        let document = parse_object(content, origin)?;

        for list in DESCRIPTOR_LISTS {
            let Some(entries) = document.get(list) else {
                continue;
            };
            let Some(entries) = entries.as_array() else {
                debug!("{}: '{}' is not a list, skipping", origin.display(), list);
                continue;
            };

            for entry in entries {
                let Some(descriptor) = parse_descriptor(entry) else {
                    debug!("{}: skipping malformed {} entry", origin.display(), list);
                    continue;
                };

                if let Some(namespace) = descriptor.namespace() {
                    symbols.add_namespace(namespace);
                }

                let Some(name) = descriptor.name.as_deref() else {
                    continue;
                };
                match list {
                    "classes" => {
                        symbols.add_type(name);
                    }
                    "functions" if descriptor.namespace().is_none() => {
                        symbols.add_function(name);
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }
}

fn parse_descriptor(entry: &Value) -> Option<Descriptor> {
    if !entry.is_object() {
        return None;
    }
    Descriptor::deserialize(entry).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OpgenError;

    fn read(content: &str) -> Result<SymbolSet> {
        let mut symbols = SymbolSet::new();
        CoreReader.read_str(content, Path::new("OpenplanetCore.json"), &mut symbols)?;
        Ok(symbols)
    }

    #[test]
    fn test_extracts_all_three_kinds() {
        let symbols = read(
            r#"{
                "functions": [
                    {"name": "GetApp"},
                    {"name": "GetPlayer", "ns": "VehicleState"},
                    {"name": "print", "ns": ""}
                ],
                "enums": [{"name": "Key", "ns": "Input"}],
                "props": [{"name": "Frametime", "ns": "Time"}],
                "funcdefs": [{"name": "Callback", "ns": "Meta"}],
                "classes": [
                    {"name": "PlayerInfo"},
                    {"name": "Request", "ns": "Net"}
                ]
            }"#,
        )
        .unwrap();

        let namespaces: Vec<&str> = symbols.namespaces().iter().map(String::as_str).collect();
        assert_eq!(namespaces, vec!["Input", "Meta", "Net", "Time", "VehicleState"]);
        assert!(symbols.types().contains("PlayerInfo"));
        assert!(symbols.types().contains("Request"));
        let functions: Vec<&str> = symbols.functions().iter().map(String::as_str).collect();
        assert_eq!(functions, vec!["GetApp", "print"]);
    }

    #[test]
    fn test_reserved_class_names_are_dropped() {
        let symbols = read(r#"{"classes": [{"name": "string"}, {"name": "MwId"}]}"#).unwrap();
        assert_eq!(symbols.types().len(), 1);
        assert!(symbols.types().contains("MwId"));
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let symbols = read(
            r#"{
                "functions": [
                    42,
                    {"name": 7},
                    {"name": "Good"},
                    {"name": "bad name"},
                    {"ns": "Orphan"}
                ],
                "classes": "not a list",
                "enums": [{"name": "E", "ns": "Bad::"}]
            }"#,
        )
        .unwrap();

        assert_eq!(symbols.functions().len(), 1);
        assert!(symbols.functions().contains("Good"));
        assert!(symbols.namespaces().contains("Orphan"));
        assert!(!symbols.namespaces().iter().any(|ns| ns.starts_with("Bad")));
        assert!(symbols.types().is_empty());
    }

    #[test]
    fn test_missing_lists_are_absent() {
        let symbols = read("{}").unwrap();
        assert_eq!(symbols, SymbolSet::new());
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = read(r#"{"functions": ["#).unwrap_err();
        assert!(matches!(err, OpgenError::MalformedMetadata { .. }));
    }

    #[test]
    fn test_namespace_alias() {
        let symbols = read(r#"{"props": [{"name": "x", "namespace": "Display"}]}"#).unwrap();
        assert!(symbols.namespaces().contains("Display"));
    }
}
