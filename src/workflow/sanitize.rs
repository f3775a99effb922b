//! Root path normalization

use std::io;
use std::path::{Component, Path, PathBuf};

/// Turns user-supplied root strings into absolute, de-duplicated, non-nested paths
#[derive(Debug, Clone)]
pub struct PathSanitizer {
    base: PathBuf,
    home: Option<PathBuf>,
}

impl PathSanitizer {
    pub fn new(base: PathBuf, home: Option<PathBuf>) -> Self {
        Self { base, home }
    }

    /// Current directory as base, `$HOME` for `~`
    pub fn from_environment() -> io::Result<Self> {
        let base = std::env::current_dir()?;
        let home = std::env::var_os("HOME").map(PathBuf::from);
        Ok(Self::new(base, home))
    }

    /// Normalize a single path; empty input yields `None`
    pub fn sanitize(&self, raw: &str) -> Option<PathBuf> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let expanded = match (trimmed, &self.home) {
            ("~", Some(home)) => home.clone(),
            (value, Some(home)) if value.starts_with("~/") => home.join(&value[2..]),
            (value, _) => PathBuf::from(value),
        };
        let absolute = if expanded.is_absolute() {
            expanded
        } else {
            self.base.join(expanded)
        };
        Some(clean(&absolute))
    }

    /// Sanitize every root, drop duplicates and roots nested in another root.
    /// No usable roots means the base directory.
    pub fn sanitize_roots(&self, raw: &[String]) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = Vec::new();
        for path in raw.iter().filter_map(|r| self.sanitize(r)) {
            if !roots.contains(&path) {
                roots.push(path);
            }
        }
        if roots.is_empty() {
            return vec![clean(&self.base)];
        }

        let candidates = roots.clone();
        roots.retain(|root| {
            !candidates
                .iter()
                .any(|other| other != root && root.starts_with(other))
        });
        roots
    }
}

/// Lexical cleanup: drops `.` and resolves `..` without touching the file system
fn clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() {
                    cleaned.push(component);
                }
            }
            other => cleaned.push(other),
        }
    }
    cleaned
}
