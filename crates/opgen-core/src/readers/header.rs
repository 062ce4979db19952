//! Best-effort reader for Openplanet.h
//!
//! A textual scan, not a parse: comments are stripped, then namespace
//! blocks, `using namespace` statements, class/struct declarations and
//! scoped enums are picked out with regexes. Anything else is ignored.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use super::MetadataReader;
use crate::Result;
use crate::discovery::SourceKind;
use crate::symbols::SymbolSet;

static BLOCK_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());

static LINE_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"//[^\n]*").unwrap());

static NAMESPACE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bnamespace\s+([A-Za-z_]\w*(?:\s*::\s*[A-Za-z_]\w*)*)\s*\{").unwrap()
});

static USING_NAMESPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\busing\s+namespace\s+([A-Za-z_]\w*(?:\s*::\s*[A-Za-z_]\w*)*)\s*;").unwrap()
});

// Requires `{`, `:` or `;` after the name so template parameters are skipped.
static CLASS_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:class|struct)\s+([A-Za-z_]\w*)\s*(?:final\s*)?[:{;]").unwrap()
});

static SCOPED_ENUM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\benum\s+(?:class|struct)\s+([A-Za-z_]\w*(?:\s*::\s*[A-Za-z_]\w*)*)").unwrap()
});

const KEYWORDS: [&str; 8] = [
    "class", "struct", "enum", "final", "namespace", "template", "typename", "using",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderReader;

impl MetadataReader for HeaderReader {
    fn kind(&self) -> SourceKind {
        SourceKind::Header
    }

    fn read_str(&self, content: &str, _origin: &Path, symbols: &mut SymbolSet) -> Result<()> {
        let source = strip_comments(content);

        for regex in [&*NAMESPACE_BLOCK, &*USING_NAMESPACE] {
            for captures in regex.captures_iter(&source) {
                symbols.add_namespace(&compact(&captures[1]));
            }
        }

        for captures in CLASS_DECL.captures_iter(&source) {
            let name = &captures[1];
            if !KEYWORDS.contains(&name) {
                symbols.add_type(name);
            }
        }

        for captures in SCOPED_ENUM.captures_iter(&source) {
            for segment in compact(&captures[1]).split("::") {
                if !KEYWORDS.contains(&segment) {
                    symbols.add_type(segment);
                }
            }
        }

        Ok(())
    }
}

fn strip_comments(content: &str) -> String {
    let without_blocks = BLOCK_COMMENT.replace_all(content, " ");
    LINE_COMMENT.replace_all(&without_blocks, "").into_owned()
}

/// Drop whitespace inside `A :: B`
fn compact(scoped: &str) -> String {
    scoped.split_whitespace().collect()
}
