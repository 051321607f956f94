//! # Source Expansion
//!
//! Turns the path-like strings of a module definition (literal paths, glob
//! patterns, `:module` references) into concrete path values, in input
//! order, with excludes applied and duplicates removed.
//!
//! Missing dependencies are data, not errors: they are collected per call
//! and handed to the caller, which either turns them into module errors or
//! marks the module as having unresolved dependencies, depending on the
//! allow-missing-dependencies configuration. Hard errors (an unrecognized
//! output tag, a glob in an exclude list) go through the context's error
//! sink, and expansion continues so one pass reports everything.

use log::debug;

use crate::context::{DepsPathContext, ModulePathContext};
use crate::collections::first_unique;
use crate::error::Error;
use crate::paths::{
    safe_path_for_source, source_path_unchecked, Path, PathList, Paths, SourcePath,
};
use crate::refs::{parse_src_reference, paths_from_module_dep, DepError};
use crate::validate::{clean, is_glob, join_clean, validate_path};

/// The module's source directory as a source path.
fn module_src_prefix(ctx: &dyn ModulePathContext) -> SourcePath {
    source_path_for_module(ctx, "")
}

/// A source path under the module's source directory, with `rel` relative
/// to that directory. Existence checking is left to the per-entry rules of
/// the expansion engine.
fn source_path_for_module(ctx: &dyn ModulePathContext, path: &str) -> SourcePath {
    let validated = match validate_path(&[path]) {
        Ok(p) => p,
        Err(err) => {
            ctx.report_error(err);
            String::new()
        }
    };
    source_path_unchecked(ctx, &[ctx.module_dir(), &validated]).set_rel(&validated)
}

/// Globs files and directories matching `pattern` relative to the module
/// directory, omitting anything matching `excludes`.
pub fn glob(ctx: &dyn ModulePathContext, pattern: &str, excludes: &[String]) -> Paths {
    expand_glob(ctx, pattern, excludes, true)
}

/// Globs only files (not directories) matching `pattern` relative to the
/// module directory, omitting anything matching `excludes`.
pub fn glob_files(ctx: &dyn ModulePathContext, pattern: &str, excludes: &[String]) -> Paths {
    expand_glob(ctx, pattern, excludes, false)
}

fn expand_glob(
    ctx: &dyn ModulePathContext,
    pattern: &str,
    excludes: &[String],
    include_dirs: bool,
) -> Paths {
    // Excludes are passed through to the glob provider, which filters
    // during matching instead of materializing unfiltered match sets.
    match ctx.config().fs().glob(pattern, excludes) {
        Ok(matches) => paths_for_module_src_from_full_path(ctx, &matches, include_dirs),
        Err(err) => {
            ctx.report_error(Error::GlobExpansion {
                message: err.to_string(),
            });
            Vec::new()
        }
    }
}

/// Re-roots glob results (full source-root-relative strings) as source
/// paths, stripping the module source directory prefix. Paths outside the
/// module directory are reported and skipped. If `include_dirs` is false,
/// matches with a trailing `/` are dropped.
fn paths_for_module_src_from_full_path(
    ctx: &dyn ModulePathContext,
    full_paths: &[String],
    include_dirs: bool,
) -> Paths {
    let prefix_dir = join_clean(&[ctx.config().src_dir(), ctx.module_dir()]);
    let prefix = if prefix_dir == "." {
        String::new()
    } else {
        format!("{}/", prefix_dir)
    };

    let mut ret: Paths = Vec::with_capacity(full_paths.len());
    for p in full_paths {
        if !include_dirs && p.ends_with('/') {
            continue;
        }
        let path = clean(p);
        let Some(rel_part) = path.strip_prefix(&prefix) else {
            ctx.report_error(Error::PathOutsideModuleDirectory {
                path: p.clone(),
                dir: prefix.clone(),
            });
            continue;
        };
        // Globbed names exist on disk and may legitimately contain `$`, so
        // they re-enter through the safe validation variant.
        let src_path = safe_path_for_source(ctx, &[ctx.module_dir(), rel_part]);
        let logical = src_path.logical_path().to_string();
        ret.push(src_path.set_rel(&logical).into());
    }
    ret
}

/// Replaces each path's `rel` with its path relative to `sub_dir` inside
/// the module source directory. Paths not inside `sub_dir` are reported.
pub fn paths_with_module_src_sub_dir(
    ctx: &dyn ModulePathContext,
    paths: Paths,
    sub_dir: &str,
) -> Paths {
    let sub_dir_path = source_path_for_module(ctx, sub_dir);
    paths
        .into_iter()
        .map(|path| {
            let rel = crate::paths::rel(ctx, sub_dir_path.as_str(), path.as_str());
            sub_dir_path.join_safe(ctx, &[&rel]).into()
        })
        .collect()
}

/// Expands one path-like string, filtering out `expanded_excludes` (full
/// string forms).
fn expand_one_src_path(
    ctx: &dyn DepsPathContext,
    s: &str,
    expanded_excludes: &[String],
) -> Result<Paths, DepError> {
    let excluded = |p: &Path| expanded_excludes.iter().any(|e| e == p.as_str());

    if let Some((module, tag)) = parse_src_reference(s) {
        let paths = paths_from_module_dep(ctx, s, module, tag)?;
        Ok(paths.into_iter().filter(|p| !excluded(p)).collect())
    } else if is_glob(s) {
        let pattern = source_path_for_module(ctx, s);
        let paths = glob_files(ctx, pattern.as_str(), expanded_excludes);
        Ok(paths_with_module_src_sub_dir(ctx, paths, ""))
    } else {
        let path = source_path_for_module(ctx, s);
        match ctx.config().fs().exists(path.as_str()) {
            Err(err) => ctx.report_error(err),
            Ok(true) => {
                if matches!(ctx.config().fs().is_dir(path.as_str()), Ok(true)) {
                    ctx.report_error(Error::UnexpectedDirectory {
                        path: path.as_str().to_string(),
                    });
                }
            }
            Ok(false) => {
                if !ctx.config().test_allow_non_existent_paths() {
                    ctx.report_error(Error::NonExistentPath {
                        path: path.as_str().to_string(),
                    });
                }
            }
        }
        let path: Path = path.into();
        if excluded(&path) {
            Ok(Vec::new())
        } else {
            Ok(vec![path])
        }
    }
}

/// Expands `paths` minus `excludes` into source-rooted path values plus the
/// names of any unresolvable module references.
///
/// Entries are expanded in input order and the result is deduplicated
/// keeping first occurrences; downstream build-command argument order
/// depends on this. Missing dependencies from `paths` come before those
/// from `excludes` in the returned list, and never abort the expansion.
pub fn paths_and_missing_deps_for_module_src_excludes(
    ctx: &dyn DepsPathContext,
    paths: &[String],
    excludes: &[String],
) -> (Paths, Vec<String>) {
    let prefix = module_src_prefix(ctx);

    let mut expanded_excludes: Vec<String> = Vec::with_capacity(excludes.len());
    let mut missing_exclude_deps: Vec<String> = Vec::new();

    for e in excludes {
        if let Some((module, tag)) = parse_src_reference(e) {
            match paths_from_module_dep(ctx, e, module, tag) {
                Ok(module_paths) => expanded_excludes.extend(module_paths.strings()),
                Err(DepError::Missing(names)) => missing_exclude_deps.extend(names),
                Err(DepError::Hard(err)) => ctx.report_error(err),
            }
        } else if is_glob(e) {
            ctx.report_error(Error::GlobInExcludes {
                pattern: e.clone(),
            });
        } else {
            expanded_excludes.push(join_clean(&[prefix.as_str(), e]));
        }
    }

    let mut missing_deps: Vec<String> = Vec::new();
    let mut expanded: Paths = Vec::with_capacity(paths.len());
    for s in paths {
        match expand_one_src_path(ctx, s, &expanded_excludes) {
            Ok(src_paths) => expanded.extend(src_paths),
            Err(DepError::Missing(names)) => missing_deps.extend(names),
            Err(DepError::Hard(err)) => ctx.report_error(err),
        }
    }

    let expanded = first_unique(expanded);
    missing_deps.extend(missing_exclude_deps);
    if !missing_deps.is_empty() {
        debug!(
            "module {}: {} unresolved path dependencies",
            ctx.module_name(),
            missing_deps.len()
        );
    }
    (expanded, missing_deps)
}

/// Expands `paths` minus `excludes`, applying the configured
/// missing-dependency policy: with allow-missing-dependencies on, the
/// module is marked as having unresolved dependencies; with it off, each
/// missing name becomes a module error.
pub fn paths_for_module_src_excludes(
    ctx: &dyn DepsPathContext,
    paths: &[String],
    excludes: &[String],
) -> Paths {
    let (ret, missing_deps) =
        paths_and_missing_deps_for_module_src_excludes(ctx, paths, excludes);
    apply_missing_deps(ctx, missing_deps);
    ret
}

/// Expands `paths` with no excludes; see `paths_for_module_src_excludes`.
pub fn paths_for_module_src(ctx: &dyn DepsPathContext, paths: &[String]) -> Paths {
    paths_for_module_src_excludes(ctx, paths, &[])
}

/// Expands a single path-like string that must produce exactly one file.
/// Produces `None` (with the policy applied) for missing dependencies, and
/// reports when the expansion yields no files or more than one.
pub fn path_for_module_src(ctx: &dyn DepsPathContext, path: &str) -> Option<Path> {
    let validated = match validate_path(&[path]) {
        Ok(p) => p,
        Err(err) => {
            ctx.report_error(err);
            return None;
        }
    };
    match expand_one_src_path(ctx, &validated, &[]) {
        Err(DepError::Missing(names)) => {
            apply_missing_deps(ctx, names);
            None
        }
        Err(DepError::Hard(err)) => {
            ctx.report_error(err);
            None
        }
        Ok(paths) => {
            if paths.is_empty() {
                ctx.report_error(Error::NoFiles {
                    reference: validated,
                });
                return None;
            }
            if paths.len() > 1 {
                ctx.report_error(Error::MultipleFiles {
                    reference: validated,
                    count: paths.len(),
                });
            }
            paths.into_iter().next()
        }
    }
}

/// Expands `input` if present; otherwise globs `default` under the module
/// directory so absent defaults expand to nothing instead of erroring.
pub fn paths_with_optional_default_for_module_src(
    ctx: &dyn DepsPathContext,
    input: Option<&[String]>,
    default: &str,
) -> Paths {
    if let Some(input) = input {
        return paths_for_module_src(ctx, input);
    }
    let pattern = join_clean(&[ctx.config().src_dir(), ctx.module_dir(), default]);
    glob(ctx, &pattern, &[])
}

fn apply_missing_deps(ctx: &dyn DepsPathContext, missing_deps: Vec<String>) {
    if missing_deps.is_empty() {
        return;
    }
    if ctx.config().allow_missing_dependencies() {
        ctx.record_missing_deps(&missing_deps);
    } else {
        for name in missing_deps {
            ctx.report_error(Error::MissingDependency { name });
        }
    }
}
