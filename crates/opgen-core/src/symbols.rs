//! Symbol sets and their aggregation across metadata sources
//!
//! Every reader writes into one shared [`SymbolSet`]. Entries are validated
//! on insertion: malformed identifiers and reserved primitive type names are
//! dropped silently, so untrusted metadata can never poison the grammar.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::Result;
use crate::discovery::{SourceKind, SymbolSource};
use crate::readers;

/// Namespaces recognized even when no metadata mentions them
pub const ALWAYS_INCLUDE_NAMESPACES: [&str; 4] =
    ["Controls", "Camera", "VehicleState", "NadeoServices"];

/// Builtin type names that the hand-written grammar already scopes
pub const RESERVED_PRIMITIVES: [&str; 17] = [
    "void", "bool", "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16", "uint32",
    "uint64", "float", "double", "string", "auto", "dictionary",
];

static SCOPED_IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:::[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("scoped identifier pattern is valid")
});

/// `Name` or `Outer::Inner`, segments of letters, digits and underscores
pub fn is_scoped_identifier(candidate: &str) -> bool {
    SCOPED_IDENTIFIER.is_match(candidate)
}

pub fn is_reserved_primitive(candidate: &str) -> bool {
    RESERVED_PRIMITIVES.contains(&candidate)
}

/// Deduplicated namespaces, types and global functions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolSet {
    namespaces: BTreeSet<String>,
    types: BTreeSet<String>,
    functions: BTreeSet<String>,
}

impl SymbolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding only the always-include namespaces
    pub fn seeded() -> Self {
        let mut set = Self::new();
        for namespace in ALWAYS_INCLUDE_NAMESPACES {
            set.add_namespace(namespace);
        }
        set
    }

    /// Returns false when the name was rejected or already present
    pub fn add_namespace(&mut self, name: &str) -> bool {
        if !is_scoped_identifier(name) {
            debug!("Dropping malformed namespace {:?}", name);
            return false;
        }
        self.namespaces.insert(name.to_string())
    }

    /// Returns false when the name was rejected or already present
    pub fn add_type(&mut self, name: &str) -> bool {
        if is_reserved_primitive(name) {
            return false;
        }
        if !is_scoped_identifier(name) {
            debug!("Dropping malformed type name {:?}", name);
            return false;
        }
        self.types.insert(name.to_string())
    }

    /// Returns false when the name was rejected or already present
    pub fn add_function(&mut self, name: &str) -> bool {
        if !is_scoped_identifier(name) {
            debug!("Dropping malformed function name {:?}", name);
            return false;
        }
        self.functions.insert(name.to_string())
    }

    pub fn namespaces(&self) -> &BTreeSet<String> {
        &self.namespaces
    }

    pub fn types(&self) -> &BTreeSet<String> {
        &self.types
    }

    pub fn functions(&self) -> &BTreeSet<String> {
        &self.functions
    }

    /// Union another set into this one
    pub fn merge(&mut self, other: SymbolSet) {
        self.namespaces.extend(other.namespaces);
        self.types.extend(other.types);
        self.functions.extend(other.functions);
    }
}

/// Per-kind file counts of one aggregation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceCounts {
    pub core: usize,
    pub application: usize,
    pub header: usize,
}

/// Merges symbols from every resolved source
#[derive(Debug)]
pub struct SymbolAggregator {
    symbols: SymbolSet,
    counts: SourceCounts,
}

impl Default for SymbolAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolAggregator {
    /// Start from the always-include namespaces
    pub fn new() -> Self {
        Self {
            symbols: SymbolSet::seeded(),
            counts: SourceCounts::default(),
        }
    }

    /// Read one source into the aggregate
    pub fn read_source(&mut self, source: &SymbolSource) -> Result<()> {
        readers::reader_for(source.kind).read_file(&source.path, &mut self.symbols)?;
        match source.kind {
            SourceKind::Core => self.counts.core += 1,
            SourceKind::Application => self.counts.application += 1,
            SourceKind::Header => self.counts.header += 1,
        }
        Ok(())
    }

    /// Read every source, failing on the first unreadable one
    pub fn read_all<'a>(&mut self, sources: impl IntoIterator<Item = &'a SymbolSource>) -> Result<()> {
        for source in sources {
            self.read_source(source)?;
        }
        Ok(())
    }

    pub fn counts(&self) -> SourceCounts {
        self.counts
    }

    pub fn finish(self) -> SymbolSet {
        info!(
            "Aggregated {} namespaces, {} types, {} global functions",
            self.symbols.namespaces.len(),
            self.symbols.types.len(),
            self.symbols.functions.len()
        );
        self.symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_identifier_shape() {
        assert!(is_scoped_identifier("UI"));
        assert!(is_scoped_identifier("Net::Secure"));
        assert!(is_scoped_identifier("_private9"));
        assert!(!is_scoped_identifier(""));
        assert!(!is_scoped_identifier("9Lives"));
        assert!(!is_scoped_identifier("Net::"));
        assert!(!is_scoped_identifier("Net:Secure"));
        assert!(!is_scoped_identifier("a b"));
        assert!(!is_scoped_identifier("UI|.*"));
    }

    #[test]
    fn test_seeded_contains_always_include() {
        let set = SymbolSet::seeded();
        for namespace in ALWAYS_INCLUDE_NAMESPACES {
            assert!(set.namespaces().contains(namespace));
        }
        assert!(set.types().is_empty());
        assert!(set.functions().is_empty());
    }

    #[test]
    fn test_reserved_primitives_are_excluded() {
        let mut set = SymbolSet::new();
        assert!(!set.add_type("int"));
        assert!(!set.add_type("string"));
        assert!(set.add_type("Integer"));
        assert_eq!(set.types().len(), 1);
    }

    #[test]
    fn test_duplicates_collapse() {
        let mut set = SymbolSet::new();
        assert!(set.add_function("GetApp"));
        assert!(!set.add_function("GetApp"));
        assert_eq!(set.functions().len(), 1);
    }

    #[test]
    fn test_merge_is_union() {
        let mut a = SymbolSet::new();
        a.add_type("PlayerInfo");
        let mut b = SymbolSet::new();
        b.add_type("Label");
        b.add_type("PlayerInfo");
        b.add_namespace("UI");
        a.merge(b);
        assert_eq!(a.types().len(), 2);
        assert!(a.namespaces().contains("UI"));
    }

    #[test]
    fn test_empty_aggregate_keeps_seed() {
        let symbols = SymbolAggregator::new().finish();
        assert_eq!(symbols, SymbolSet::seeded());
    }
}
