//! Configuration types for opgen
//!
//! `GeneratorOptions` carries every invocation input of a generation run.
//! `GrammarLayout` names the grammar nodes the patcher edits; its defaults
//! describe the stock Openplanet AngelScript grammar.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{OpgenError, Result};

/// Grammar path used when neither the config file nor the CLI names one
pub const DEFAULT_GRAMMAR_PATH: &str = "syntaxes/angelscript.tmLanguage.json";

/// Upper bound on the length of one generated alternation
pub const DEFAULT_MAX_CHUNK_LENGTH: usize = 8000;

/// Placeholder substituted with the built alternation inside match templates
pub const ALTERNATION_PLACEHOLDER: &str = "{alternation}";

/// Inputs of one generation run
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorOptions {
    /// Explicit core metadata file (OpenplanetCore.json)
    #[schemars(description = "Path to an OpenplanetCore.json file")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub core: Option<PathBuf>,

    /// Explicit per-application metadata files (OpenplanetNext.json, ...)
    #[serde(alias = "next")]
    #[schemars(description = "Paths to per-application Openplanet*.json files")]
    pub game: Vec<PathBuf>,

    /// Explicit header file
    #[schemars(description = "Path to an Openplanet header file")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<PathBuf>,

    /// Explicit install directories, scanned instead of environment/default ones
    #[schemars(description = "Openplanet install directories to scan")]
    pub openplanet_dirs: Vec<PathBuf>,

    /// Scan install directories for the header file too
    #[schemars(description = "Also read Openplanet.h from install directories")]
    pub include_headers: bool,

    /// Grammar document to patch in place
    #[schemars(description = "Path to the TextMate grammar to regenerate")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grammar: Option<PathBuf>,

    /// Maximum length of one generated alternation
    #[schemars(description = "Maximum length in bytes of one generated alternation")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_chunk_length: Option<usize>,

    /// Stable names of the nodes the generator edits
    #[schemars(description = "Grammar nodes edited by the generator")]
    pub layout: GrammarLayout,
}

impl GeneratorOptions {
    /// Grammar path, falling back to the stock location
    pub fn grammar_path(&self) -> PathBuf {
        self.grammar
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_GRAMMAR_PATH))
    }

    pub fn max_chunk_length(&self) -> usize {
        self.max_chunk_length.unwrap_or(DEFAULT_MAX_CHUNK_LENGTH)
    }

    /// True when any single source file was named explicitly
    pub fn has_explicit_files(&self) -> bool {
        self.core.is_some() || !self.game.is_empty() || self.header.is_some()
    }

    /// Parse a semicolon-delimited directory list, dropping empty segments
    pub fn split_dir_list(list: &str) -> Vec<PathBuf> {
        list.split(';')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(PathBuf::from)
            .collect()
    }

    /// Resolve relative paths against the directory the options were read from
    pub fn rebase(&mut self, base: &Path) {
        let rebase = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        self.core.iter_mut().for_each(rebase);
        self.game.iter_mut().for_each(rebase);
        self.header.iter_mut().for_each(rebase);
        self.openplanet_dirs.iter_mut().for_each(rebase);
        self.grammar.iter_mut().for_each(rebase);
    }

    /// Reject option values the generator cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_length == Some(0) {
            return Err(OpgenError::configuration(
                "maxChunkLength must be greater than zero",
            ));
        }
        self.layout.validate()
    }
}

/// Where generated nodes go relative to their anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Immediately before the anchor; list start when the anchor is absent
    Before,
    /// Immediately after the anchor; list end when the anchor is absent
    After,
}

/// A hand-written node whose `match` is replaced on every run
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchTarget {
    /// Stable name of the node
    pub node: String,
    /// Regex template; `{alternation}` is replaced with the built alternation
    pub template: String,
}

/// A group of generated nodes inserted into a parent pattern list
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedGroup {
    /// Group tag written into each generated node's marker
    pub group: String,
    /// Stable name of the node owning the `patterns` list
    pub parent: String,
    /// Stable name of the sibling used as insertion point
    pub anchor: String,
    pub placement: Placement,
    /// Scope name given to each generated node
    pub scope: String,
    /// Regex template; `{alternation}` is replaced with one chunk
    pub template: String,
}

/// Moves include directives ahead of another include in the top-level list
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncludeReorder {
    /// Include targets to move, in the order they should end up
    pub includes: Vec<String>,
    /// Include target they must precede
    pub before: String,
}

/// Grammar nodes edited by the generator
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GrammarLayout {
    pub namespaces: MatchTarget,
    pub types: GeneratedGroup,
    pub functions: GeneratedGroup,
    pub include_order: Vec<IncludeReorder>,
}

impl Default for GrammarLayout {
    fn default() -> Self {
        Self {
            namespaces: MatchTarget {
                node: "entity.name.namespace.openplanet.angelscript".to_string(),
                template: r"\b(?:{alternation})\b(?=\s*::)".to_string(),
            },
            types: GeneratedGroup {
                group: "openplanet-types".to_string(),
                parent: "#types".to_string(),
                anchor: "storage.type.primitive.angelscript".to_string(),
                placement: Placement::After,
                scope: "support.type.openplanet.angelscript".to_string(),
                template: r"\b(?:{alternation})\b".to_string(),
            },
            functions: GeneratedGroup {
                group: "openplanet-functions".to_string(),
                parent: "#function-calls".to_string(),
                anchor: "entity.name.function.call.angelscript".to_string(),
                placement: Placement::Before,
                scope: "support.function.openplanet.angelscript".to_string(),
                template: r"\b(?:{alternation})\b(?=\s*\()".to_string(),
            },
            include_order: vec![IncludeReorder {
                includes: vec!["#function-calls".to_string()],
                before: "#types".to_string(),
            }],
        }
    }
}

impl GrammarLayout {
    fn validate(&self) -> Result<()> {
        let templates = [
            ("namespaces", &self.namespaces.template),
            ("types", &self.types.template),
            ("functions", &self.functions.template),
        ];
        for (section, template) in templates {
            if !template.contains(ALTERNATION_PLACEHOLDER) {
                return Err(OpgenError::configuration(format!(
                    "layout.{section}.template must contain {ALTERNATION_PLACEHOLDER}"
                )));
            }
        }
        if self.types.group == self.functions.group {
            return Err(OpgenError::configuration(format!(
                "layout.types.group and layout.functions.group must differ (both '{}')",
                self.types.group
            )));
        }
        Ok(())
    }
}

/// Substitute an alternation into a match template
pub fn render_template(template: &str, alternation: &str) -> String {
    template.replace(ALTERNATION_PLACEHOLDER, alternation)
}
