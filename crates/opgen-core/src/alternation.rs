//! Regex alternation building
//!
//! Symbols are ordered longest first (ties broken lexically) so that a
//! symbol never shadows a longer symbol it is a prefix of: `GetApp` must be
//! tried before `Get`. Every symbol is escaped before joining.

use crate::{OpgenError, Result};

/// Alternation emitted for an empty symbol set; never matches
pub const NEVER_MATCH: &str = "(?!)";

const SEPARATOR: char = '|';

/// Escaped symbols in emission order
fn ordered_escaped<I, S>(symbols: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut items: Vec<String> = symbols
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect();
    items.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    items.dedup();
    items.iter().map(|s| regex::escape(s)).collect()
}

/// Join all symbols into one alternation
pub fn build_alternation<I, S>(symbols: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let items = ordered_escaped(symbols);
    if items.is_empty() {
        return NEVER_MATCH.to_string();
    }
    items.join("|")
}

/// Split the alternation into chunks of at most `max_chunk_length` bytes
///
/// The global order is sliced, never re-sorted, so each chunk keeps the
/// longest-first order. Every chunk is at most `max_chunk_length` bytes; a
/// symbol that cannot fit in any chunk is a configuration error.
pub fn build_chunked_alternation<I, S>(symbols: I, max_chunk_length: usize) -> Result<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let items = ordered_escaped(symbols);
    if items.is_empty() {
        return Ok(vec![NEVER_MATCH.to_string()]);
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for item in items {
        if item.len() > max_chunk_length {
            return Err(OpgenError::configuration(format!(
                "Symbol '{item}' is {} bytes, longer than maxChunkLength {max_chunk_length}",
                item.len()
            )));
        }
        if !current.is_empty() && current.len() + SEPARATOR.len_utf8() + item.len() > max_chunk_length
        {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(SEPARATOR);
        }
        current.push_str(&item);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use std::collections::BTreeSet;

    fn unescaped_members(chunk: &str) -> BTreeSet<String> {
        chunk.split('|').map(|s| s.replace('\\', "")).collect()
    }

    #[test]
    fn test_longest_first_then_lexical() {
        assert_snapshot!(build_alternation(["Get", "GetApp", "Foo", "Abc"]), @"GetApp|Abc|Foo|Get");
    }

    #[test]
    fn test_order_independent_of_input_order() {
        let a = build_alternation(["UI", "Net::Secure", "Camera", "Net"]);
        let b = build_alternation(["Net", "Camera", "UI", "Net::Secure"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_prefix_never_precedes_longer_symbol() {
        let symbols = ["Get", "GetApp", "GetAppX", "G", "Ge", "Other"];
        let alternation = build_alternation(symbols);
        let order: Vec<&str> = alternation.split('|').collect();
        for (i, a) in order.iter().enumerate() {
            for b in &order[i + 1..] {
                assert!(!b.starts_with(a), "{a} appears before its extension {b}");
            }
        }
    }

    #[test]
    fn test_metacharacters_are_escaped() {
        assert_snapshot!(build_alternation(["a.b", "c+"]), @r"a\.b|c\+");
    }

    #[test]
    fn test_empty_set_never_matches() {
        let empty: [&str; 0] = [];
        assert_eq!(build_alternation(empty), NEVER_MATCH);
        assert_eq!(build_chunked_alternation(empty, 10).unwrap(), vec![NEVER_MATCH]);
    }

    #[test]
    fn test_duplicates_are_emitted_once() {
        assert_eq!(build_alternation(["A", "A", "B"]), "A|B");
    }

    #[test]
    fn test_chunks_respect_bound_and_cover_set() {
        let symbols: Vec<String> = (0..200).map(|i| format!("Symbol{i}")).collect();
        let chunks = build_chunked_alternation(&symbols, 64).unwrap();

        assert!(chunks.len() > 1);
        let mut covered = BTreeSet::new();
        for chunk in &chunks {
            assert!(chunk.len() <= 64, "chunk of {} bytes", chunk.len());
            covered.extend(unescaped_members(chunk));
        }
        let expected: BTreeSet<String> = symbols.into_iter().collect();
        assert_eq!(covered, expected);
    }

    #[test]
    fn test_chunks_slice_the_global_order() {
        let symbols = ["AAAA", "BBB", "CC", "D", "EEEE", "FFF"];
        let chunks = build_chunked_alternation(symbols, 9).unwrap();
        assert_eq!(chunks, vec!["AAAA|EEEE", "BBB|FFF", "CC|D"]);
        assert_eq!(chunks.join("|"), build_alternation(symbols));
    }

    #[test]
    fn test_exact_fit() {
        let chunks = build_chunked_alternation(["AB", "CD"], 5).unwrap();
        assert_eq!(chunks, vec!["AB|CD"]);
    }

    #[test]
    fn test_symbol_longer_than_limit_is_rejected() {
        let err = build_chunked_alternation(["VeryLongSymbolName", "A"], 4).unwrap_err();
        assert!(matches!(err, OpgenError::Configuration { .. }));
        assert!(err.to_string().contains("VeryLongSymbolName"));
    }

    #[test]
    fn test_escaping_counts_toward_limit() {
        // `a.b` escapes to four bytes
        assert!(build_chunked_alternation(["a.b"], 3).is_err());
        assert_eq!(build_chunked_alternation(["a.b"], 4).unwrap(), vec![r"a\.b"]);
    }
}
