//! Output directory resolution
//!
//! Reports land in `<project root>/data/processed` unless an explicit
//! override is configured. The directory is not created here; the writer
//! creates it lazily.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// Any of these inside a directory marks it as the project root
pub const PROJECT_MARKERS: &[&str] = &["Cargo.lock", "uv.lock", "pyproject.toml", ".git"];

/// Subpath of the project root that receives reports
pub const PROCESSED_SUBDIR: &[&str] = &["data", "processed"];

#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Explicit output directory (`OUTPUT_DIR`); trusted as-is
    pub override_dir: Option<String>,
    /// Where the upward root search starts; the working directory when unset
    pub anchor: Option<PathBuf>,
}

/// Resolves the output directory once and caches it.
#[derive(Debug)]
pub struct OutputDirResolver {
    config: OutputConfig,
    resolved: OnceLock<PathBuf>,
}

impl OutputDirResolver {
    pub fn new(config: OutputConfig) -> Self {
        Self {
            config,
            resolved: OnceLock::new(),
        }
    }

    pub fn resolve(&self) -> &Path {
        self.resolved.get_or_init(|| {
            let dir = resolve_output_directory(&self.config);
            debug!(output_dir = %dir.display(), "Resolved output directory");
            dir
        })
    }
}

pub fn resolve_output_directory(config: &OutputConfig) -> PathBuf {
    if let Some(dir) = config
        .override_dir
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
    {
        return absolutize(&expand_home(dir));
    }

    let cwd = current_dir();
    let anchor = config
        .anchor
        .as_deref()
        .map(absolutize)
        .unwrap_or_else(|| cwd.clone());
    let root = find_project_root(&anchor).unwrap_or(cwd);

    PROCESSED_SUBDIR
        .iter()
        .fold(root, |path, segment| path.join(segment))
}

/// Walk from `start` through its ancestors and return the first one that
/// contains a project marker.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| PROJECT_MARKERS.iter().any(|m| dir.join(m).exists()))
        .map(Path::to_path_buf)
}

fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| current_dir().join(path))
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
