//! One grammar generation run
//!
//! Resolve sources, aggregate symbols, build alternations, patch the
//! grammar document, write it back. Every fallible step completes before
//! the document is written, so a failed run leaves the file untouched.

use serde::Serialize;
use std::error::Error as _;
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::alternation::{build_alternation, build_chunked_alternation};
use crate::config::{GeneratedGroup, GeneratorOptions, render_template};
use crate::discovery::{SourceKind, SourceResolver};
use crate::grammar::{self, GrammarDocument};
use crate::symbols::{SymbolAggregator, SymbolSet};
use crate::{OpgenError, Result};

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSummary {
    pub install_dirs: usize,
    pub core_files: usize,
    pub application_files: usize,
    pub header_files: usize,
    pub namespaces: usize,
    pub types: usize,
    pub functions: usize,
    /// Generated type and function nodes together
    pub chunks: usize,
    pub grammar: PathBuf,
    /// False when the document already had the generated content
    pub written: bool,
}

/// Runs the generation pipeline for one set of options
#[derive(Debug, Clone)]
pub struct Generator {
    options: GeneratorOptions,
    resolver: SourceResolver,
}

impl Generator {
    pub fn new(options: GeneratorOptions) -> Self {
        let resolver = SourceResolver::new(&options);
        Self { options, resolver }
    }

    /// Use a resolver with custom environment or default directories
    pub fn with_resolver(mut self, resolver: SourceResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Execute the full pipeline once
    pub fn run(&self) -> Result<GenerationSummary> {
        self.options.validate()?;

        let sources = self.resolver.resolve()?;
        let mut aggregator = SymbolAggregator::new();
        aggregator.read_all(&sources.sources)?;
        let symbols = aggregator.finish();

        let grammar_path = self.options.grammar_path();
        let mut document = GrammarDocument::load(&grammar_path)?;
        let chunks = self.patch(&mut document, &symbols)?;
        let written = document.save()?;

        let summary = GenerationSummary {
            install_dirs: sources.install_dirs.len(),
            core_files: sources.count(SourceKind::Core),
            application_files: sources.count(SourceKind::Application),
            header_files: sources.count(SourceKind::Header),
            namespaces: symbols.namespaces().len(),
            types: symbols.types().len(),
            functions: symbols.functions().len(),
            chunks,
            grammar: grammar_path,
            written,
        };
        info!(
            "{} {} ({} chunk(s))",
            if written { "Updated" } else { "Unchanged" },
            summary.grammar.display(),
            summary.chunks
        );
        Ok(summary)
    }

    /// Apply every edit to the in-memory document, returning the chunk count
    pub fn patch(&self, document: &mut GrammarDocument, symbols: &SymbolSet) -> Result<usize> {
        let layout = &self.options.layout;
        let max = self.options.max_chunk_length();
        let type_chunks = build_chunked_alternation(symbols.types(), max)?;
        let function_chunks = build_chunked_alternation(symbols.functions(), max)?;
        let root = document.root_mut();

        let namespace_rule = render_template(
            &layout.namespaces.template,
            &build_alternation(symbols.namespaces()),
        );
        let node = grammar::find_node_by_name(root, &layout.namespaces.node)?;
        grammar::set_match_rule(node, &namespace_rule);

        let chunks = type_chunks.len() + function_chunks.len();
        upsert_group(root, &layout.types, &type_chunks)?;
        upsert_group(root, &layout.functions, &function_chunks)?;

        if !layout.include_order.is_empty() {
            match root.get_mut("patterns").and_then(|p| p.as_array_mut()) {
                Some(top_level) => {
                    for rule in &layout.include_order {
                        grammar::reorder_includes(top_level, &rule.includes, &rule.before);
                    }
                }
                None => warn!("Grammar has no top-level patterns, includes were not reordered"),
            }
        }

        Ok(chunks)
    }
}

fn upsert_group(
    root: &mut serde_json::Value,
    group: &GeneratedGroup,
    chunks: &[String],
) -> Result<()> {
    let total = chunks.len();
    let nodes = chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| {
            grammar::generated_node(
                &group.group,
                index,
                total,
                &group.scope,
                &render_template(&group.template, chunk),
            )
        })
        .collect();
    let list = grammar::patterns_of(root, &group.parent)?;
    grammar::upsert_generated_nodes(list, &group.group, nodes, &group.anchor, group.placement);
    Ok(())
}

/// Result of [`regenerate_now`], for callers that only surface outcomes
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerationReport {
    pub success: bool,
    pub diagnostics: Vec<String>,
    pub summary: Option<GenerationSummary>,
}

impl RegenerationReport {
    fn failed(err: &OpgenError) -> Self {
        let mut diagnostics = vec![err.to_string()];
        let mut source = err.source();
        while let Some(cause) = source {
            diagnostics.push(format!("caused by: {cause}"));
            source = cause.source();
        }
        Self {
            success: false,
            diagnostics,
            summary: None,
        }
    }

    /// Diagnostics joined into one message
    pub fn message(&self) -> String {
        self.diagnostics.join("\n")
    }
}

/// Regenerate the grammar with resolved options, capturing any failure
pub fn regenerate_now(options: &GeneratorOptions) -> RegenerationReport {
    match Generator::new(options.clone()).run() {
        Ok(summary) => RegenerationReport {
            success: true,
            diagnostics: Vec::new(),
            summary: Some(summary),
        },
        Err(err) => {
            error!("Regeneration failed: {}", err);
            RegenerationReport::failed(&err)
        }
    }
}
