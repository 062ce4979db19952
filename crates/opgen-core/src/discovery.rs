//! Metadata source discovery
//!
//! Decides which Openplanet metadata files feed a generation run. Sources
//! come from explicit file options, explicit install directories,
//! environment-provided directories, or the default install directories
//! under the home directory, in that order of precedence.

use crate::config::GeneratorOptions;
use crate::{OpgenError, Result};
use glob::Pattern;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Reserved file name of the core metadata document
pub const CORE_FILE_NAME: &str = "OpenplanetCore.json";

/// File name pattern of per-application metadata documents
pub const APPLICATION_FILE_PATTERN: &str = "Openplanet*.json";

/// File name of the optional header source
pub const HEADER_FILE_NAME: &str = "Openplanet.h";

/// Install directory names probed under the home directory
pub const DEFAULT_INSTALL_DIR_NAMES: [&str; 3] = ["OpenplanetNext", "Openplanet4", "OpenplanetTurbo"];

/// Single install directory
pub const ENV_OPENPLANET_DIR: &str = "OPENPLANET_DIR";

/// Semicolon-delimited list of install directories
pub const ENV_OPENPLANET_DIRS: &str = "OPENPLANET_DIRS";

const CASE_INSENSITIVE_FS: bool = cfg!(any(windows, target_os = "macos"));

/// Kind of metadata source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// OpenplanetCore.json
    Core,
    /// Openplanet<App>.json
    Application,
    /// Openplanet.h
    Header,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Core => write!(f, "core"),
            SourceKind::Application => write!(f, "application"),
            SourceKind::Header => write!(f, "header"),
        }
    }
}

/// One metadata file to read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolSource {
    pub path: PathBuf,
    pub kind: SourceKind,
}

/// Result of source resolution
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    /// Sources ordered by kind, then path
    pub sources: Vec<SymbolSource>,
    /// Install directories that existed and were scanned
    pub install_dirs: Vec<PathBuf>,
}

impl SourceSet {
    pub fn count(&self, kind: SourceKind) -> usize {
        self.sources.iter().filter(|s| s.kind == kind).count()
    }

    pub fn of_kind(&self, kind: SourceKind) -> impl Iterator<Item = &SymbolSource> {
        self.sources.iter().filter(move |s| s.kind == kind)
    }

    /// Directories whose contents can change the resolved sources
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = self.install_dirs.clone();
        for source in &self.sources {
            if let Some(parent) = source.path.parent()
                && !roots.iter().any(|r| r == parent)
            {
                roots.push(parent.to_path_buf());
            }
        }
        roots
    }
}

/// Accumulates sources, dropping duplicate paths
#[derive(Default)]
struct SourceCollector {
    seen: HashSet<String>,
    sources: Vec<SymbolSource>,
}

impl SourceCollector {
    fn push(&mut self, path: PathBuf, kind: SourceKind) {
        if self.seen.insert(dedup_key(&path)) {
            debug!("Found {} source: {}", kind, path.display());
            self.sources.push(SymbolSource { path, kind });
        } else {
            debug!("Skipping duplicate source: {}", path.display());
        }
    }

    fn finish(mut self) -> Vec<SymbolSource> {
        self.sources
            .sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.path.cmp(&b.path)));
        self.sources
    }
}

/// Comparison key honoring the file system's case sensitivity
fn dedup_key(path: &Path) -> String {
    let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let key = canonical.to_string_lossy().into_owned();
    if CASE_INSENSITIVE_FS {
        key.to_lowercase()
    } else {
        key
    }
}

/// Directories named by `OPENPLANET_DIR` and `OPENPLANET_DIRS`
pub fn environment_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(single) = std::env::var(ENV_OPENPLANET_DIR) {
        let single = single.trim();
        if !single.is_empty() {
            dirs.push(PathBuf::from(single));
        }
    }
    if let Ok(list) = std::env::var(ENV_OPENPLANET_DIRS) {
        dirs.extend(GeneratorOptions::split_dir_list(&list));
    }
    dirs
}

/// Default install directories under the home directory
pub fn default_install_dirs() -> Vec<PathBuf> {
    match dirs::home_dir() {
        Some(home) => DEFAULT_INSTALL_DIR_NAMES
            .iter()
            .map(|name| home.join(name))
            .collect(),
        None => {
            warn!("Could not determine home directory; no default install directories");
            Vec::new()
        }
    }
}

/// Resolves the metadata sources of one generation run
#[derive(Debug, Clone)]
pub struct SourceResolver {
    core: Option<PathBuf>,
    game: Vec<PathBuf>,
    header: Option<PathBuf>,
    explicit_dirs: Vec<PathBuf>,
    include_headers: bool,
    environment_dirs: Vec<PathBuf>,
    default_dirs: Vec<PathBuf>,
}

impl SourceResolver {
    /// Create a resolver reading environment and default directories from the host
    pub fn new(options: &GeneratorOptions) -> Self {
        Self {
            core: options.core.clone(),
            game: options.game.clone(),
            header: options.header.clone(),
            explicit_dirs: options.openplanet_dirs.clone(),
            include_headers: options.include_headers,
            environment_dirs: environment_dirs(),
            default_dirs: default_install_dirs(),
        }
    }

    pub fn with_environment_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.environment_dirs = dirs;
        self
    }

    pub fn with_default_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.default_dirs = dirs;
        self
    }

    fn has_explicit_files(&self) -> bool {
        self.core.is_some() || !self.game.is_empty() || self.header.is_some()
    }

    /// Directories to scan, by precedence
    fn candidate_dirs(&self) -> &[PathBuf] {
        if !self.explicit_dirs.is_empty() {
            &self.explicit_dirs
        } else if !self.environment_dirs.is_empty() {
            &self.environment_dirs
        } else {
            &self.default_dirs
        }
    }

    /// Produce the final source set
    pub fn resolve(&self) -> Result<SourceSet> {
        let mut collector = SourceCollector::default();
        let mut install_dirs = Vec::new();
        let searched: Vec<PathBuf>;

        if self.has_explicit_files() {
            if !self.explicit_dirs.is_empty() {
                warn!(
                    "Explicit source files given; ignoring {} install director{}",
                    self.explicit_dirs.len(),
                    if self.explicit_dirs.len() == 1 { "y" } else { "ies" }
                );
            }
            let explicit = self
                .core
                .iter()
                .map(|p| (p, SourceKind::Core))
                .chain(self.game.iter().map(|p| (p, SourceKind::Application)))
                .chain(self.header.iter().map(|p| (p, SourceKind::Header)));
            for (path, kind) in explicit {
                if !path.is_file() {
                    return Err(OpgenError::missing_source(path, kind));
                }
                collector.push(path.clone(), kind);
            }
            searched = Vec::new();
        } else {
            searched = self.candidate_dirs().to_vec();
            let mut seen_dirs = HashSet::new();
            for dir in &searched {
                if !seen_dirs.insert(dedup_key(dir)) {
                    continue;
                }
                if !dir.is_dir() {
                    debug!("Skipping missing install directory: {}", dir.display());
                    continue;
                }
                self.scan_dir(dir, &mut collector)?;
                install_dirs.push(dir.clone());
            }
        }

        let sources = collector.finish();
        let set = SourceSet {
            sources,
            install_dirs,
        };

        if set.count(SourceKind::Core) + set.count(SourceKind::Application) == 0 {
            let detail = if searched.is_empty() {
                "the explicit source files contain no core or application metadata".to_string()
            } else {
                format!(
                    "searched: {}",
                    searched
                        .iter()
                        .map(|d| d.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            };
            return Err(OpgenError::configuration(format!(
                "No {CORE_FILE_NAME} or {APPLICATION_FILE_PATTERN} metadata found ({detail})"
            )));
        }

        info!(
            "Resolved {} core, {} application, {} header source(s) from {} install dir(s)",
            set.count(SourceKind::Core),
            set.count(SourceKind::Application),
            set.count(SourceKind::Header),
            set.install_dirs.len()
        );
        Ok(set)
    }

    /// Classify the files directly inside one install directory
    fn scan_dir(&self, dir: &Path, collector: &mut SourceCollector) -> Result<()> {
        let application = Pattern::new(APPLICATION_FILE_PATTERN)
            .map_err(|e| OpgenError::configuration(format!("Invalid file pattern: {e}")))?;

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let kind = self.classify(&entry.file_name().to_string_lossy(), &application);
            if let Some(kind) = kind {
                collector.push(entry.into_path(), kind);
            }
        }
        Ok(())
    }

    fn classify(&self, name: &str, application: &Pattern) -> Option<SourceKind> {
        if name == CORE_FILE_NAME {
            Some(SourceKind::Core)
        } else if application.matches(name) {
            Some(SourceKind::Application)
        } else if self.include_headers && name == HEADER_FILE_NAME {
            Some(SourceKind::Header)
        } else {
            None
        }
    }
}
