//! # Module Path Resolution Library
//!
//! This library is the path-resolution and module dependency/output-file
//! layer of a declarative build system. It converts the path-like strings
//! found in module definitions (literal paths, glob patterns, `:module`
//! and `:module{tag}` references) into validated, sandbox-safe path values,
//! while reading the dependency graph so the build scheduler knows what
//! must be built first.
//!
//! ## Quick Example
//!
//! ```
//! use modpath::expand::paths_for_module_src;
//! use modpath::filesystem::MockFs;
//! use modpath::paths::PathList;
//! use modpath::testing::{test_config, TestModuleContext};
//!
//! // Stage a source tree with one file under the module directory.
//! let mut fs = MockFs::new();
//! fs.add_file_string("mymodule/src/main.c", "int main() {}");
//!
//! // Expand the module's srcs property.
//! let ctx = TestModuleContext::new(test_config("out", fs), "mymodule", "mymodule");
//! let srcs = paths_for_module_src(&ctx, &["src/*.c".to_string()]);
//! assert_eq!(srcs.strings(), vec!["mymodule/src/main.c"]);
//! ```
//!
//! ## Core Concepts
//!
//! - **Path values (`paths`, `install`)**: immutable values tagged with
//!   provenance (source tree, output tree, install tree, phony), each
//!   carrying its full string form and a display-relative form.
//! - **Validation (`validate`)**: purely lexical traversal and character
//!   checks; nothing escapes its configured root, even transitively.
//! - **Expansion (`expand`, `refs`)**: turns srcs/excludes string lists
//!   into ordered, deduplicated path sets, resolving module references
//!   against the dependency graph and collecting missing dependencies as
//!   data rather than failures.
//! - **Contexts (`context`)**: narrow trait interfaces through which the
//!   surrounding build system supplies configuration, module identity, the
//!   dependency graph, and the accumulating error sink.
//! - **Configuration (`config`, `once`)**: per-invocation roots, feature
//!   flags, product variables, and compute-once registries.
//!
//! ## Error Model
//!
//! Input-data errors accumulate through the context's error sink while
//! resolution continues with best-effort values, so one build pass surfaces
//! as many independent errors as possible. Missing dependencies are
//! collected as data and handed to the caller, which fails the module or
//! defers per the allow-missing-dependencies configuration. Misuse of the
//! API (dereferencing an invalid `OptionalPath`, test-only calls outside a
//! test configuration) panics.

pub mod collections;
pub mod config;
pub mod context;
pub mod error;
pub mod expand;
pub mod filesystem;
pub mod install;
pub mod once;
pub mod path_properties;
pub mod paths;
pub mod refs;
pub mod target;
pub mod testing;
pub mod validate;

#[cfg(test)]
mod path_proptest;
