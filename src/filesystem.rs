//! Filesystem capability used for existence checks and glob expansion.
//!
//! The path layer never walks the real filesystem directly; it goes through
//! the `FileSystem` trait on the active configuration. `OsFs` is the real
//! implementation, `MockFs` is an in-memory one for tests and for embedders
//! that stage a virtual source tree.
//!
//! Glob conventions shared by both implementations:
//! - `*` and `?` do not cross directory separators; `**` does.
//! - Matches are returned sorted.
//! - Matched directories carry a trailing `/` so files-only callers can
//!   filter them out without extra filesystem queries.
//! - `excludes` are glob patterns as well, filtered during matching so that
//!   large unfiltered match sets are never materialized.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path as FsPath;

use glob::{MatchOptions, Pattern};

use crate::error::{Error, Result};
use crate::validate::is_glob;

/// Existence and glob queries against a source tree.
pub trait FileSystem: fmt::Debug + Send + Sync {
    /// Whether a file or directory exists at `path`.
    fn exists(&self, path: &str) -> Result<bool>;

    /// Whether `path` exists and is a directory.
    fn is_dir(&self, path: &str) -> Result<bool>;

    /// Expands `pattern`, omitting anything matched by `excludes`. See the
    /// module documentation for result conventions.
    fn glob(&self, pattern: &str, excludes: &[String]) -> Result<Vec<String>>;
}

fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

fn compile(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(Error::Glob)
}

fn excluded(path: &str, excludes: &[Pattern]) -> bool {
    let opts = match_options();
    excludes.iter().any(|e| e.matches_with(path, opts))
}

fn compile_excludes(excludes: &[String]) -> Result<Vec<Pattern>> {
    excludes.iter().map(|e| compile(e)).collect()
}

/// In-memory filesystem keyed by relative path. Directories are implied by
/// the files added beneath them.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file, creating implied parent directories.
    pub fn add_file(&mut self, path: &str, contents: Vec<u8>) {
        let mut dir = path;
        while let Some(idx) = dir.rfind('/') {
            dir = &dir[..idx];
            self.dirs.insert(dir.to_string());
        }
        self.files.insert(path.to_string(), contents);
    }

    /// Add or replace a file with string contents.
    pub fn add_file_string(&mut self, path: &str, contents: &str) {
        self.add_file(path, contents.as_bytes().to_vec());
    }

    pub fn contents(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(|c| c.as_slice())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileSystem for MockFs {
    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.files.contains_key(path) || self.dirs.contains(path))
    }

    fn is_dir(&self, path: &str) -> Result<bool> {
        Ok(self.dirs.contains(path))
    }

    fn glob(&self, pattern: &str, excludes: &[String]) -> Result<Vec<String>> {
        if !is_glob(pattern) {
            // A literal path "matches" itself when present.
            return Ok(if self.files.contains_key(pattern) {
                vec![pattern.to_string()]
            } else if self.dirs.contains(pattern) {
                vec![format!("{}/", pattern)]
            } else {
                Vec::new()
            });
        }

        let compiled = compile(pattern)?;
        let exclude_patterns = compile_excludes(excludes)?;
        let opts = match_options();

        let mut matches = Vec::new();
        for path in self.files.keys() {
            if compiled.matches_with(path, opts) && !excluded(path, &exclude_patterns) {
                matches.push(path.clone());
            }
        }
        for dir in &self.dirs {
            if compiled.matches_with(dir, opts) && !excluded(dir, &exclude_patterns) {
                matches.push(format!("{}/", dir));
            }
        }
        matches.sort();
        Ok(matches)
    }
}

/// Real filesystem, with paths resolved relative to the process working
/// directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl OsFs {
    pub fn new() -> Self {
        Self
    }
}

/// The longest pattern prefix free of glob metacharacters, used as the walk
/// root so expansion does not traverse unrelated subtrees.
fn non_glob_prefix(pattern: &str) -> &str {
    let mut prefix_end = 0;
    for (idx, comp) in pattern.split('/').enumerate() {
        if is_glob(comp) {
            break;
        }
        if idx > 0 {
            prefix_end += 1;
        }
        prefix_end += comp.len();
    }
    &pattern[..prefix_end]
}

fn normalize(path: &str) -> &str {
    path.strip_prefix("./").unwrap_or(path)
}

impl FileSystem for OsFs {
    fn exists(&self, path: &str) -> Result<bool> {
        Ok(FsPath::new(path).exists())
    }

    fn is_dir(&self, path: &str) -> Result<bool> {
        Ok(FsPath::new(path).is_dir())
    }

    fn glob(&self, pattern: &str, excludes: &[String]) -> Result<Vec<String>> {
        if !is_glob(pattern) {
            return Ok(if self.is_dir(pattern)? {
                vec![format!("{}/", pattern)]
            } else if self.exists(pattern)? {
                vec![pattern.to_string()]
            } else {
                Vec::new()
            });
        }

        let compiled = compile(pattern)?;
        let exclude_patterns = compile_excludes(excludes)?;
        let opts = match_options();

        let root = non_glob_prefix(pattern);
        let walk_root = if root.is_empty() { "." } else { root };

        let mut matches = Vec::new();
        for entry in walkdir::WalkDir::new(walk_root).min_depth(1) {
            let entry = entry.map_err(|e| Error::GlobExpansion {
                message: e.to_string(),
            })?;
            let Some(path) = entry.path().to_str() else {
                continue;
            };
            let path = normalize(path);
            if !compiled.matches_with(path, opts) || excluded(path, &exclude_patterns) {
                continue;
            }
            if entry.file_type().is_dir() {
                matches.push(format!("{}/", path));
            } else {
                matches.push(path.to_string());
            }
        }
        matches.sort();
        Ok(matches)
    }
}
