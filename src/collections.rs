//! Ordered-collection helpers used throughout the path layer.
//!
//! The dedup helpers keep two implementations each: a pairwise scan for
//! small inputs and a hash-set scan above a size threshold. Both produce
//! identical output (order and chosen representative); the property tests
//! in `path_proptest` hold them to that.

use std::collections::HashMap;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::OnceLock;

use regex::Regex;

use crate::paths::{Path, Paths};
use crate::validate::{clean, file_ext};

/// Input size above which the dedup helpers switch from the pairwise scan
/// to the hash-set scan; benchmark-derived (see `benches/collections.rs`).
const DEDUP_HASH_THRESHOLD: usize = 128;

/// Returns all unique elements of a list, keeping the first copy of each
/// and preserving order.
pub fn first_unique<T>(list: Vec<T>) -> Vec<T>
where
    T: Clone + Eq + Hash,
{
    if list.len() > DEDUP_HASH_THRESHOLD {
        first_unique_hashed(list)
    } else {
        first_unique_pairwise(list)
    }
}

/// Pairwise O(n²) first-unique; cheaper than hashing for small inputs.
pub(crate) fn first_unique_pairwise<T>(mut list: Vec<T>) -> Vec<T>
where
    T: Clone + Eq,
{
    let mut write_index = 0;
    'outer: for read_index in 0..list.len() {
        for compare_index in 0..write_index {
            if list[read_index] == list[compare_index] {
                // The value already exists in the output region before
                // write_index, skip it.
                continue 'outer;
            }
        }
        if read_index != write_index {
            list.swap(write_index, read_index);
        }
        write_index += 1;
    }
    list.truncate(write_index);
    list
}

/// Hash-set O(n) first-unique for large inputs.
pub(crate) fn first_unique_hashed<T>(mut list: Vec<T>) -> Vec<T>
where
    T: Clone + Eq + Hash,
{
    let mut seen = HashSet::with_capacity(list.len());
    let mut write_index = 0;
    for read_index in 0..list.len() {
        if !seen.insert(list[read_index].clone()) {
            continue;
        }
        if read_index != write_index {
            list.swap(write_index, read_index);
        }
        write_index += 1;
    }
    list.truncate(write_index);
    list
}

/// Returns all unique elements of a list, keeping the last copy of each.
/// Survivors keep their original relative order.
pub fn last_unique<T>(list: Vec<T>) -> Vec<T>
where
    T: Clone + Eq + Hash,
{
    if list.len() > DEDUP_HASH_THRESHOLD {
        last_unique_hashed(list)
    } else {
        last_unique_pairwise(list)
    }
}

/// Pairwise O(n²) last-unique.
pub(crate) fn last_unique_pairwise<T>(list: Vec<T>) -> Vec<T>
where
    T: Clone + Eq,
{
    let mut out: Vec<T> = Vec::with_capacity(list.len());
    for (index, item) in list.iter().enumerate() {
        if !list[index + 1..].contains(item) {
            out.push(item.clone());
        }
    }
    out
}

/// Hash-set O(n) last-unique.
pub(crate) fn last_unique_hashed<T>(list: Vec<T>) -> Vec<T>
where
    T: Clone + Eq + Hash,
{
    let mut seen = HashSet::with_capacity(list.len());
    let mut out: Vec<T> = Vec::with_capacity(list.len());
    for item in list.into_iter().rev() {
        if seen.insert(item.clone()) {
            out.push(item);
        }
    }
    out.reverse();
    out
}

/// Unique elements in ascending order.
pub fn sorted_unique<T>(list: Vec<T>) -> Vec<T>
where
    T: Clone + Eq + Hash + Ord,
{
    let mut unique = first_unique(list);
    unique.sort();
    unique
}

/// Unique paths ordered by their string form.
pub fn sorted_unique_paths(paths: Paths) -> Paths {
    let mut unique = first_unique(paths);
    unique.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    unique
}

/// Splits a list into chunks of at most `shard_size` elements, preserving
/// order; the last chunk may be shorter. Empty input produces no chunks.
/// Used to keep build-command argument lists under OS limits.
pub fn shard<T: Clone>(list: &[T], shard_size: usize) -> Vec<Vec<T>> {
    if list.is_empty() {
        return Vec::new();
    }
    list.chunks(shard_size).map(|c| c.to_vec()).collect()
}

/// Prepends `prefix` to each string and joins them with `sep`.
pub fn join_with_prefix_and_separator(strs: &[String], prefix: &str, sep: &str) -> String {
    strs.iter()
        .map(|s| format!("{}{}", prefix, s))
        .collect::<Vec<_>>()
        .join(sep)
}

/// Prepends `prefix` to each string and joins them with spaces.
pub fn join_with_prefix(strs: &[String], prefix: &str) -> String {
    join_with_prefix_and_separator(strs, prefix, " ")
}

/// Converts the paths to strings, prepends `prefix` to each, and joins
/// them with spaces.
pub fn join_paths_with_prefix(paths: &[Path], prefix: &str) -> String {
    let strs: Vec<String> = paths.iter().map(|p| p.as_str().to_string()).collect();
    join_with_prefix(&strs, prefix)
}

/// The keys of the map in ascending order.
pub fn sorted_keys<K, V>(m: &HashMap<K, V>) -> Vec<K>
where
    K: Ord + Clone,
{
    let mut keys: Vec<K> = m.keys().cloned().collect();
    keys.sort();
    keys
}

fn shlib_version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?:\.\d+(?:svn)?)+").expect("static regex"))
}

/// Splits a file name into root, suffix, and extension, where the suffix
/// also carries any trailing shared-library version digits:
/// `libfoo.so.1.0` splits into (`libfoo`, `.so.1.0`, `.so`).
pub fn split_file_ext(name: &str) -> (String, String, String) {
    let mut name = name.to_string();
    let mut suffix = String::new();
    let version_start = shlib_version_pattern()
        .find_iter(&name)
        .last()
        .filter(|m| m.end() == name.len())
        .map(|m| m.start());
    if let Some(start) = version_start {
        suffix = name[start..].to_string();
        name.truncate(start);
    }

    let ext = file_ext(&name).to_string();
    let root = name[..name.len() - ext.len()].to_string();
    (root, format!("{}{}", ext, suffix), ext)
}

/// A list of paths sorted by string form, so that all files under a
/// directory (including subdirectories) occupy a contiguous subrange that
/// binary search can find in O(log n).
#[derive(Debug, Clone, Default)]
pub struct DirectorySortedPaths {
    paths: Paths,
}

impl DirectorySortedPaths {
    pub fn new(mut paths: Paths) -> Self {
        paths.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Self { paths }
    }

    /// All entries inside `dir` and its subdirectories.
    pub fn paths_in_directory(&self, dir: &str) -> &[Path] {
        let prefix = format!("{}/", clean(dir));
        let start = self
            .paths
            .partition_point(|p| p.as_str() <= prefix.as_str());
        let rest = &self.paths[start..];
        let end = rest.partition_point(|p| p.as_str().starts_with(&prefix));
        &rest[..end]
    }

    pub fn as_slice(&self) -> &[Path] {
        &self.paths
    }
}
