//! # Error Handling
//!
//! This module defines the centralized error handling mechanism for the
//! `modpath` library. It uses the `thiserror` library to create a
//! comprehensive `Error` enum that covers all anticipated failure modes,
//! providing clear and descriptive error messages.
//!
//! Two classes of failures exist and are handled differently:
//!
//! - **Input-data errors** (bad paths in a build file, unresolvable module
//!   references, unrecognized output tags) are values of the `Error` enum.
//!   They are never thrown across a resolution pass; instead they are pushed
//!   into the accumulating error sink on the active context so that a single
//!   build invocation can surface as many independent errors as possible.
//!
//! - **Programming-contract violations** (dereferencing an invalid
//!   `OptionalPath`, calling test-only APIs from production code) panic.
//!   They indicate a caller-side bug rather than bad input, and are
//!   deliberately not representable here.
//!
//! The `Result` type alias is used to return `Result<T, Error>` from
//! functions, making it easy to handle errors and propagate them up the
//! call stack.

use thiserror::Error;

/// Main error type for path resolution and expansion operations
#[derive(Error, Debug)]
pub enum Error {
    /// A path component attempts to escape its containing directory, either
    /// with a leading `..` after lexical cleaning or by being absolute.
    #[error("path is outside directory: {path}")]
    PathTraversal { path: String },

    /// A path component contains the build-variable sentinel character,
    /// which could smuggle extra path segments in post-expansion.
    #[error("path contains invalid character ($): {path}")]
    ForbiddenCharacter { path: String },

    /// A source path resolved to a location inside the output tree.
    #[error("source path {path:?} is in the output directory")]
    SourcePathInOutput { path: String },

    /// A path that must be a plain file path contains glob metacharacters.
    #[error("path may not contain a glob: {path}")]
    GlobInPath { path: String },

    /// Glob patterns are rejected in exclude lists; excludes must be literal
    /// paths or module references.
    #[error("glob patterns are not permitted in excludes: {pattern:?}")]
    GlobInExcludes { pattern: String },

    /// A tagged module reference resolved to a module that produces no
    /// output files.
    #[error("path dependency {reference:?} is not an output file producing module")]
    NotAnOutputProducer { reference: String },

    /// An untagged module reference resolved to a module that produces
    /// neither source nor output files.
    #[error("path dependency {reference:?} is not a source file producing module")]
    NotASourceProducer { reference: String },

    /// A module reference resolved, but the referenced module rejected the
    /// request (typically an unrecognized output tag).
    #[error("path dependency {reference:?}: {message}")]
    PathDependency { reference: String, message: String },

    /// An output-file producer was asked for a tag it does not define.
    #[error("unsupported module reference tag {tag:?}")]
    UnsupportedTag { tag: String },

    /// A module reference points at a host tool that has not produced its
    /// binary.
    #[error("host tool dependency {reference:?} is missing an output file")]
    MissingToolOutput { reference: String },

    /// The caller-facing rendering of an unresolved module reference when
    /// missing dependencies are not allowed by the configuration.
    #[error("missing dependency on {name:?}, is the property annotated as a path?")]
    MissingDependency { name: String },

    /// A literal source path does not exist in the source tree.
    #[error("module source path {path:?} does not exist")]
    NonExistentPath { path: String },

    /// A literal source path names a directory where a file was expected.
    #[error("module source path {path:?} is a directory")]
    UnexpectedDirectory { path: String },

    /// A glob result fell outside the module's source directory.
    #[error("path {path:?} is not in module source directory {dir:?}")]
    PathOutsideModuleDirectory { path: String, dir: String },

    /// A single-path property expanded to nothing.
    #[error("{reference:?} produced no files, expected exactly one")]
    NoFiles { reference: String },

    /// A single-path property expanded to more than one file.
    #[error("{reference:?} produced {count} files, expected exactly one")]
    MultipleFiles { reference: String, count: usize },

    /// A typed path derivation (gen/obj/res) was attempted from a path
    /// variant that does not support it.
    #[error("tried to create {target} file from unsupported path: {path}")]
    UnsupportedPathDerivation { target: String, path: String },

    /// Phony targets are plain names, not paths.
    #[error("phony target contains invalid character ($ or /): {name}")]
    InvalidPhonyName { name: String },

    /// Replacement extensions must stay within the final path component.
    #[error("extension {ext:?} cannot contain /")]
    InvalidExtension { ext: String },

    /// A relative-path computation was asked to escape its base.
    #[error("path {path:?} is not under path {base:?}")]
    NotUnderPath { path: String, base: String },

    /// A glob pattern failed to compile, wrapped from `glob::PatternError`.
    #[error("glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// The filesystem glob provider failed while expanding a pattern.
    #[error("glob: {message}")]
    GlobExpansion { message: String },

    /// A once-cache computation failed in another caller; the key is not
    /// wedged and later callers will retry.
    #[error("cached computation for {key} failed in another caller")]
    OnceFailed { key: String },

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A product-variables parsing error, wrapped from `serde_json::Error`.
    #[error("product variables parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
