//! opgen core
//!
//! Regenerates the Openplanet symbol patterns of an AngelScript TextMate
//! grammar from the metadata files an Openplanet install ships.
//! This crate provides source discovery, the metadata readers, regex
//! alternation building, structural grammar patching and watch mode.

pub mod alternation;
pub mod config;
pub mod discovery;
pub mod error;
pub mod generator;
pub mod grammar;
pub mod readers;
pub mod result;
pub mod symbols;
pub mod watch;

// Re-export commonly used types
pub use alternation::{NEVER_MATCH, build_alternation, build_chunked_alternation};
pub use config::{ConfigLoader, GeneratorOptions, GrammarLayout, Placement};
pub use discovery::{SourceKind, SourceResolver, SourceSet, SymbolSource};
pub use error::{ErrorKind, OpgenError};
pub use generator::{GenerationSummary, Generator, RegenerationReport, regenerate_now};
pub use grammar::GrammarDocument;
pub use readers::{MetadataReader, reader_for};
pub use result::Result;
pub use symbols::{SymbolAggregator, SymbolSet};
pub use watch::{FileWatcher, RegenerationQueue, watch, watch_until};

/// Default log filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "opgen=info";

/// Initialize the tracing subscriber for logging
pub fn init_tracing() {
    init_tracing_with(DEFAULT_LOG_FILTER);
}

/// Initialize tracing, using `default_filter` unless `RUST_LOG` is set
pub fn init_tracing_with(default_filter: &str) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A second initialization (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
