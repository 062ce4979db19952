//! Configuration system for opgen
//!
//! Options for a generation run come from three layers, lowest priority first:
//! built-in defaults, a config file, and command-line flags.
//!
//! ## Configuration Files
//!
//! - `.opgenrc.json` - JSON
//! - `.opgenrc.toml` - TOML
//!
//! When no explicit config path is provided, the loader searches for these
//! files starting from the current directory and moving up the directory
//! tree. Relative paths in a config file are resolved against its directory.
//!
//! ## Example Configuration
//!
//! ```json
//! {
//!   "openplanetDirs": ["C:/Users/me/OpenplanetNext"],
//!   "includeHeaders": true,
//!   "grammar": "syntaxes/angelscript.tmLanguage.json",
//!   "maxChunkLength": 8000
//! }
//! ```

mod loader;
mod options;

pub use loader::{CONFIG_FILE_NAMES, ConfigLoader};
pub use options::{
    ALTERNATION_PLACEHOLDER, DEFAULT_GRAMMAR_PATH, DEFAULT_MAX_CHUNK_LENGTH, GeneratedGroup,
    GeneratorOptions, GrammarLayout, IncludeReorder, MatchTarget, Placement, render_template,
};
