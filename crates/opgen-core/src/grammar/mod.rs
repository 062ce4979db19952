//! TextMate grammar document handling
//!
//! [`GrammarDocument`] owns the on-disk document for one run; the functions
//! re-exported from `patcher` edit its tree by stable node name.

mod document;
mod patcher;

pub use document::GrammarDocument;
pub use patcher::{
    GENERATED_MARKER, find_node, find_node_by_name, generated_node, is_generated,
    is_generated_in_group, patterns_of, reorder_includes, set_match_rule, upsert_generated_nodes,
};
