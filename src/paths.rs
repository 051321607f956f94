//! # Path Value Types
//!
//! Immutable path values distinguishing provenance. Every value carries its
//! precomputed string form plus a logical relative path, so equality,
//! hashing, and display never need to re-consult the configuration.
//!
//! ## Variants
//!
//! - [`SourcePath`]: rooted under the read-only source tree.
//! - [`OutputPath`]: rooted under the writable output tree. The module
//!   output specializations ([`ModuleOutPath`], [`ModuleGenPath`],
//!   [`ModuleObjPath`], [`ModuleResPath`]) scope an output path under
//!   `.intermediates/<module-dir>/<module-name>/<variant>/{,gen,obj,res}`.
//! - `InstallPath` (see the `install` module): rooted under a
//!   partition-specific install tree.
//! - [`PhonyPath`]: a named build-system alias, not a filesystem path.
//! - [`TestPath`]: test-harness paths that bypass root validation.
//!
//! ## Error model
//!
//! Constructors validate their components and report failures through the
//! context's error sink, then still return a best-effort value. Call chains
//! therefore never need defensive checks mid-expression, and a single pass
//! collects every error before the phase ends.

use std::fmt;

use crate::config::Config;
use crate::context::{ModulePathContext, PathContext};
use crate::error::Error;
use crate::install::InstallPath;
use crate::validate::{
    base_name, clean, file_ext, is_glob, join_clean, replace_extension as replace_ext,
    parent_dir, validate_path, validate_safe_path,
};

/// Which flavor of output-tree path a value is; used by the typed
/// derivation helpers to tell module-gen paths apart from plain outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    Plain,
    ModuleOut,
    Gen,
    Obj,
    Res,
}

/// A file path rooted under the project's source tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourcePath {
    /// Path relative to the source root.
    path: String,
    /// Display-relative component, see [`SourcePath::rel`].
    rel: String,
    /// Full string form, source root included.
    full: String,
}

impl SourcePath {
    fn new(config: &Config, logical: String) -> Self {
        let full = join_clean(&[config.src_dir(), &logical]);
        Self {
            path: logical,
            rel: String::new(),
            full,
        }
    }

    /// Full string form of the path.
    pub fn as_str(&self) -> &str {
        &self.full
    }

    /// Path relative to the source root.
    pub fn logical_path(&self) -> &str {
        &self.path
    }

    /// The portion of the path relative to the directory it was created
    /// from: the module directory for module sources, the joined component
    /// for joins.
    pub fn rel(&self) -> &str {
        if self.rel.is_empty() {
            &self.path
        } else {
            &self.rel
        }
    }

    pub fn ext(&self) -> &str {
        file_ext(&self.full)
    }

    pub fn base(&self) -> &str {
        base_name(&self.full)
    }

    /// Joins further components, revalidating them. `..` may not escape the
    /// current path.
    pub fn join(&self, ctx: &dyn PathContext, components: &[&str]) -> SourcePath {
        let rel = match validate_path(components) {
            Ok(p) => p,
            Err(err) => {
                ctx.report_error(err);
                String::new()
            }
        };
        self.with_rel(&rel)
    }

    /// Like `join`, but allows embedded build-variable characters. Used for
    /// glob results, where `$` is a legal filename character.
    pub(crate) fn join_safe(&self, ctx: &dyn PathContext, components: &[&str]) -> SourcePath {
        let rel = match validate_safe_path(components) {
            Ok(p) => p,
            Err(err) => {
                ctx.report_error(err);
                String::new()
            }
        };
        self.with_rel(&rel)
    }

    fn with_rel(&self, rel: &str) -> SourcePath {
        SourcePath {
            path: join_clean(&[&self.path, rel]),
            rel: rel.to_string(),
            full: join_clean(&[&self.full, rel]),
        }
    }

    pub(crate) fn set_rel(mut self, rel: &str) -> SourcePath {
        self.rel = rel.to_string();
        self
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

/// A file path rooted under the build output tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputPath {
    kind: OutputKind,
    /// Path relative to the output root.
    path: String,
    rel: String,
    /// Full string form, output root included.
    full: String,
}

impl OutputPath {
    fn new(config: &Config, logical: String, kind: OutputKind) -> Self {
        let full = join_clean(&[config.build_dir(), &logical]);
        Self {
            kind,
            path: logical,
            rel: String::new(),
            full,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.full
    }

    /// Path relative to the output root.
    pub fn logical_path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> OutputKind {
        self.kind
    }

    pub fn rel(&self) -> &str {
        if self.rel.is_empty() {
            &self.path
        } else {
            &self.rel
        }
    }

    pub fn ext(&self) -> &str {
        file_ext(&self.full)
    }

    pub fn base(&self) -> &str {
        base_name(&self.full)
    }

    /// Joins further components, revalidating them. `..` may not escape the
    /// current path.
    pub fn join(&self, ctx: &dyn PathContext, components: &[&str]) -> OutputPath {
        let rel = match validate_path(components) {
            Ok(p) => p,
            Err(err) => {
                ctx.report_error(err);
                String::new()
            }
        };
        self.with_rel(&rel)
    }

    fn with_rel(&self, rel: &str) -> OutputPath {
        OutputPath {
            kind: self.kind,
            path: join_clean(&[&self.path, rel]),
            rel: rel.to_string(),
            full: join_clean(&[&self.full, rel]),
        }
    }

    fn with_kind(mut self, kind: OutputKind) -> OutputPath {
        self.kind = kind;
        self
    }

    /// Resets the display-relative portion to the file name alone.
    pub fn without_rel(mut self) -> OutputPath {
        self.rel = base_name(&self.path).to_string();
        self
    }

    /// Returns a new output path with the extension of the final component
    /// replaced by `ext`.
    pub fn replace_extension(&self, ctx: &dyn PathContext, ext: &str) -> OutputPath {
        if ext.contains('/') {
            ctx.report_error(Error::InvalidExtension {
                ext: ext.to_string(),
            });
        }
        let mut ret = path_for_output(ctx, &[&replace_ext(&self.path, ext)]);
        ret.rel = replace_ext(&self.rel, ext);
        ret.kind = self.kind;
        ret
    }

    /// Returns a new output path in the directory of the current path,
    /// built from the given components.
    pub fn in_same_dir(&self, ctx: &dyn PathContext, components: &[&str]) -> OutputPath {
        let path = match validate_path(components) {
            Ok(p) => p,
            Err(err) => {
                ctx.report_error(err);
                String::new()
            }
        };
        let mut ret = path_for_output(ctx, &[parent_dir(&self.path), &path]);
        ret.rel = join_clean(&[parent_dir(&self.rel), &path]);
        ret.kind = self.kind;
        ret
    }

    /// Re-roots the path as if the output directory were the top-level
    /// `out` directory. Only usable from tests: in production the real
    /// output root is load-bearing for generated build files.
    ///
    /// Panics when called outside a test configuration.
    pub fn relative_to_top(&self, ctx: &dyn PathContext) -> OutputPath {
        assert!(
            ctx.config().running_as_test(),
            "relative_to_top may only be used from tests"
        );
        OutputPath {
            kind: self.kind,
            path: self.path.clone(),
            rel: self.rel.clone(),
            full: join_clean(&["out", &self.path]),
        }
    }
}

impl fmt::Display for OutputPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

macro_rules! output_path_wrapper {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(pub(crate) OutputPath);

        impl std::ops::Deref for $name {
            type Target = OutputPath;

            fn deref(&self) -> &OutputPath {
                &self.0
            }
        }

        impl From<$name> for Path {
            fn from(p: $name) -> Path {
                Path::Output(p.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

output_path_wrapper!(
    /// A module's private output directory.
    ModuleOutPath
);
output_path_wrapper!(
    /// The `gen` directory in a module's output directory, for generated
    /// sources.
    ModuleGenPath
);
output_path_wrapper!(
    /// The `obj` directory in a module's output directory, for compiled
    /// objects.
    ModuleObjPath
);
output_path_wrapper!(
    /// The `res` directory in a module's output directory.
    ModuleResPath
);

/// A named build-system alias. Not a filesystem path; may not contain path
/// separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhonyPath {
    name: String,
}

impl PhonyPath {
    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for PhonyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A path used only by test harnesses; bypasses root validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestPath {
    pub(crate) path: String,
    pub(crate) rel: String,
}

impl TestPath {
    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn rel(&self) -> &str {
        if self.rel.is_empty() {
            &self.path
        } else {
            &self.rel
        }
    }
}

impl fmt::Display for TestPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// An immutable path value with provenance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Path {
    Source(SourcePath),
    Output(OutputPath),
    Install(InstallPath),
    Phony(PhonyPath),
    Test(TestPath),
}

impl Path {
    /// Full string form of the path.
    pub fn as_str(&self) -> &str {
        match self {
            Path::Source(p) => p.as_str(),
            Path::Output(p) => p.as_str(),
            Path::Install(p) => p.as_str(),
            Path::Phony(p) => p.as_str(),
            Path::Test(p) => p.as_str(),
        }
    }

    /// The portion of the path relative to the directory it was created
    /// from.
    pub fn rel(&self) -> &str {
        match self {
            Path::Source(p) => p.rel(),
            Path::Output(p) => p.rel(),
            Path::Install(p) => p.rel(),
            Path::Phony(p) => p.as_str(),
            Path::Test(p) => p.rel(),
        }
    }

    /// Extension of the last path element, including the leading dot.
    pub fn ext(&self) -> &str {
        file_ext(self.as_str())
    }

    /// Last element of the path.
    pub fn base(&self) -> &str {
        base_name(self.as_str())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SourcePath> for Path {
    fn from(p: SourcePath) -> Path {
        Path::Source(p)
    }
}

impl From<OutputPath> for Path {
    fn from(p: OutputPath) -> Path {
        Path::Output(p)
    }
}

impl From<InstallPath> for Path {
    fn from(p: InstallPath) -> Path {
        Path::Install(p)
    }
}

impl From<PhonyPath> for Path {
    fn from(p: PhonyPath) -> Path {
        Path::Phony(p)
    }
}

impl From<TestPath> for Path {
    fn from(p: TestPath) -> Path {
        Path::Test(p)
    }
}

/// An ordered collection of path values.
pub type Paths = Vec<Path>;

/// Collection helpers shared by all path lists.
pub trait PathList {
    /// The paths in string form.
    fn strings(&self) -> Vec<String>;

    /// Whether any path has extension `ext`.
    fn has_ext(&self, ext: &str) -> bool;

    /// The subset of paths with extension `ext`.
    fn filter_by_ext(&self, ext: &str) -> Paths;

    /// The subset of paths without extension `ext`.
    fn filter_out_by_ext(&self, ext: &str) -> Paths;
}

impl PathList for [Path] {
    fn strings(&self) -> Vec<String> {
        self.iter().map(|p| p.as_str().to_string()).collect()
    }

    fn has_ext(&self, ext: &str) -> bool {
        self.iter().any(|p| p.ext() == ext)
    }

    fn filter_by_ext(&self, ext: &str) -> Paths {
        self.iter().filter(|p| p.ext() == ext).cloned().collect()
    }

    fn filter_out_by_ext(&self, ext: &str) -> Paths {
        self.iter().filter(|p| p.ext() != ext).cloned().collect()
    }
}

/// A container that either holds a valid path or records why it has none.
///
/// Dereferencing an invalid `OptionalPath` is a caller bug, not an input
/// error, and panics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct OptionalPath {
    path: Option<Path>,
    reason: String,
}

impl OptionalPath {
    pub fn from_path(path: Path) -> Self {
        Self {
            path: Some(path),
            reason: String::new(),
        }
    }

    pub fn invalid(reason: &str) -> Self {
        Self {
            path: None,
            reason: reason.to_string(),
        }
    }

    pub fn valid(&self) -> bool {
        self.path.is_some()
    }

    /// The contained path.
    ///
    /// Panics if the `OptionalPath` is invalid.
    pub fn path(&self) -> &Path {
        match &self.path {
            Some(path) => path,
            None => panic!("dereferenced an invalid OptionalPath: {}", self.reason),
        }
    }

    /// The string form of the path, or `""` when invalid.
    pub fn as_str(&self) -> &str {
        match &self.path {
            Some(path) => path.as_str(),
            None => "",
        }
    }

    pub fn invalid_reason(&self) -> &str {
        &self.reason
    }
}

fn report_and_default(ctx: &dyn PathContext, validated: crate::error::Result<String>) -> String {
    match validated {
        Ok(p) => p,
        Err(err) => {
            ctx.report_error(err);
            String::new()
        }
    }
}

fn new_source_path(
    ctx: &dyn PathContext,
    components: &[&str],
    safe: bool,
) -> (SourcePath, bool) {
    let validated = if safe {
        validate_safe_path(components)
    } else {
        validate_path(components)
    };
    let (logical, mut ok) = match validated {
        Ok(p) => (p, true),
        Err(err) => {
            ctx.report_error(err);
            (String::new(), false)
        }
    };
    let path = SourcePath::new(ctx.config(), logical);

    let build_dir = ctx.config().build_dir();
    if !build_dir.is_empty()
        && (path.full == build_dir || path.full.starts_with(&format!("{}/", build_dir)))
    {
        ctx.report_error(Error::SourcePathInOutput {
            path: path.full.clone(),
        });
        ok = false;
    }
    (path, ok)
}

/// Joins the components and validates that the result neither escapes the
/// source tree nor lands in the output tree. On error, reports through the
/// context and still returns a usable (if invalid-looking) path.
pub fn path_for_source(ctx: &dyn PathContext, components: &[&str]) -> SourcePath {
    let (path, _) = new_source_path(ctx, components, false);

    if is_glob(path.as_str()) {
        ctx.report_error(Error::GlobInPath {
            path: path.as_str().to_string(),
        });
    }

    match ctx.config().fs().exists(path.as_str()) {
        Err(err) => ctx.report_error(err),
        Ok(true) => {}
        Ok(false) => {
            let missing = [path.as_str().to_string()];
            if ctx.config().allow_missing_dependencies() && ctx.record_missing_deps(&missing) {
                // The module is marked incomplete instead of failing.
            } else if !ctx.config().test_allow_non_existent_paths() {
                ctx.report_error(Error::NonExistentPath {
                    path: path.as_str().to_string(),
                });
            }
        }
    }
    path
}

/// Like `path_for_source`, but tolerates embedded build-variable characters
/// in the components. For glob results and other trusted inputs.
pub(crate) fn safe_path_for_source(ctx: &dyn PathContext, components: &[&str]) -> SourcePath {
    new_source_path(ctx, components, true).0
}

/// A source path with validation and output-tree checking only; existence
/// and glob checking are left to the caller. Used by the expansion engine,
/// which applies its own per-entry rules.
pub(crate) fn source_path_unchecked(ctx: &dyn PathContext, components: &[&str]) -> SourcePath {
    new_source_path(ctx, components, false).0
}

/// Returns a valid `OptionalPath` if the source path exists, or an invalid
/// one if it does not.
pub fn existent_path_for_source(ctx: &dyn PathContext, components: &[&str]) -> OptionalPath {
    let (path, ok) = new_source_path(ctx, components, false);
    if !ok {
        return OptionalPath::invalid("");
    }
    if is_glob(path.as_str()) {
        ctx.report_error(Error::GlobInPath {
            path: path.as_str().to_string(),
        });
        return OptionalPath::invalid("");
    }
    match ctx.config().fs().exists(path.as_str()) {
        Err(err) => {
            ctx.report_error(err);
            OptionalPath::invalid("")
        }
        Ok(false) => {
            OptionalPath::invalid(&format!("{} does not exist", path.as_str()))
        }
        Ok(true) => OptionalPath::from_path(path.into()),
    }
}

/// Source paths for each of the given strings.
pub fn paths_for_source(ctx: &dyn PathContext, paths: &[&str]) -> Paths {
    paths
        .iter()
        .map(|p| path_for_source(ctx, &[p]).into())
        .collect()
}

/// Source paths for the given strings, omitting any that do not exist.
pub fn existent_paths_for_sources(ctx: &dyn PathContext, paths: &[&str]) -> Paths {
    paths
        .iter()
        .filter_map(|p| {
            let path = existent_path_for_source(ctx, &[p]);
            path.valid().then(|| path.path().clone())
        })
        .collect()
}

/// Joins the components and returns an output path validated not to escape
/// the output tree. On error, reports through the context and still returns
/// a usable value.
pub fn path_for_output(ctx: &dyn PathContext, components: &[&str]) -> OutputPath {
    let path = report_and_default(ctx, validate_path(components));
    OutputPath::new(ctx.config(), path, OutputKind::Plain)
}

/// Output paths for each of the given strings.
pub fn paths_for_output(ctx: &dyn PathContext, paths: &[&str]) -> Paths {
    paths
        .iter()
        .map(|p| path_for_output(ctx, &[p]).into())
        .collect()
}

/// An output path under the top-level intermediates directory.
pub fn path_for_intermediates(ctx: &dyn PathContext, components: &[&str]) -> OutputPath {
    let path = report_and_default(ctx, validate_path(components));
    path_for_output(ctx, &[".intermediates", &path])
}

fn path_for_module_out_dir(ctx: &dyn ModulePathContext) -> OutputPath {
    let path = report_and_default(
        ctx,
        validate_path(&[
            ".intermediates",
            ctx.module_dir(),
            ctx.module_name(),
            ctx.module_sub_dir(),
        ]),
    );
    OutputPath::new(ctx.config(), path, OutputKind::ModuleOut)
}

/// A path under the module's private output directory.
pub fn path_for_module_out(ctx: &dyn ModulePathContext, components: &[&str]) -> ModuleOutPath {
    let path = report_and_default(ctx, validate_path(components));
    ModuleOutPath(path_for_module_out_dir(ctx).with_rel(&path))
}

/// A path under the module's `gen` directory, for generated sources.
pub fn path_for_module_gen(ctx: &dyn ModulePathContext, components: &[&str]) -> ModuleGenPath {
    let path = report_and_default(ctx, validate_path(components));
    ModuleGenPath(
        path_for_module_out_dir(ctx)
            .with_rel("gen")
            .with_rel(&path)
            .with_kind(OutputKind::Gen),
    )
}

/// A path under the module's `obj` directory, for compiled objects.
pub fn path_for_module_obj(ctx: &dyn ModulePathContext, components: &[&str]) -> ModuleObjPath {
    let path = report_and_default(ctx, validate_path(components));
    ModuleObjPath(
        path_for_module_out(ctx, &["obj", &path])
            .0
            .with_kind(OutputKind::Obj),
    )
}

/// A path under the module's `res` directory.
pub fn path_for_module_res(ctx: &dyn ModulePathContext, components: &[&str]) -> ModuleResPath {
    let path = report_and_default(ctx, validate_path(components));
    ModuleResPath(
        path_for_module_out(ctx, &["res", &path])
            .0
            .with_kind(OutputKind::Res),
    )
}

/// Derives a generated-sources path from `path` with a new extension,
/// under the module's `gen/<subdir>` directory. Only source paths and
/// already-generated paths support this derivation.
pub fn gen_path_with_ext(
    ctx: &dyn ModulePathContext,
    subdir: &str,
    path: &Path,
    ext: &str,
) -> ModuleGenPath {
    match path {
        Path::Source(p) => {
            path_for_module_gen(ctx, &[subdir, &replace_ext(p.logical_path(), ext)])
        }
        Path::Output(p) if p.kind() == OutputKind::Gen => {
            path_for_module_gen(ctx, &[subdir, &replace_ext(p.logical_path(), ext)])
        }
        other => {
            ctx.report_error(Error::UnsupportedPathDerivation {
                target: "generated".to_string(),
                path: other.as_str().to_string(),
            });
            path_for_module_gen(ctx, &[])
        }
    }
}

/// Derives an object path from `path` with a new extension, under the
/// module's `obj/<subdir>` directory.
pub fn obj_path_with_ext(
    ctx: &dyn ModulePathContext,
    subdir: &str,
    path: &Path,
    ext: &str,
) -> ModuleObjPath {
    match path {
        Path::Source(p) => {
            path_for_module_obj(ctx, &[subdir, &replace_ext(p.logical_path(), ext)])
        }
        Path::Output(p) => {
            path_for_module_obj(ctx, &[subdir, &replace_ext(p.logical_path(), ext)])
        }
        other => {
            ctx.report_error(Error::UnsupportedPathDerivation {
                target: "object".to_string(),
                path: other.as_str().to_string(),
            });
            path_for_module_obj(ctx, &[])
        }
    }
}

/// Derives a resource path named `name` in the module's `res` directory,
/// using the source path to form the directory name.
pub fn res_path_with_name(
    ctx: &dyn ModulePathContext,
    path: &Path,
    name: &str,
) -> ModuleResPath {
    match path {
        Path::Source(p) => path_for_module_res(ctx, &[p.logical_path(), name]),
        other => {
            ctx.report_error(Error::UnsupportedPathDerivation {
                target: "resource".to_string(),
                path: other.as_str().to_string(),
            });
            path_for_module_res(ctx, &[])
        }
    }
}

/// A phony (alias) target. The name may not contain `/` or `$`.
pub fn path_for_phony(ctx: &dyn PathContext, name: &str) -> PhonyPath {
    if name.contains('$') || name.contains('/') {
        ctx.report_error(Error::InvalidPhonyName {
            name: name.to_string(),
        });
    }
    PhonyPath {
        name: name.to_string(),
    }
}

fn maybe_rel_impl(base: &str, target: &str) -> Option<String> {
    if base.starts_with('/') != target.starts_with('/') {
        return None;
    }
    let base = clean(base);
    let target = clean(target);
    if base == "." {
        return Some(target);
    }
    if target == base {
        return Some(".".to_string());
    }
    target
        .strip_prefix(&format!("{}/", base))
        .map(|rest| rest.to_string())
}

/// The path of `target` relative to `base`, or `None` if `target` is not
/// inside `base`.
pub fn maybe_rel(base: &str, target: &str) -> Option<String> {
    maybe_rel_impl(base, target)
}

/// The path of `target` relative to `base`. Reports an error and returns an
/// empty string if `target` is not inside `base`.
pub fn rel(ctx: &dyn PathContext, base: &str, target: &str) -> String {
    match maybe_rel_impl(base, target) {
        Some(rel) => rel,
        None => {
            ctx.report_error(Error::NotUnderPath {
                path: target.to_string(),
                base: base.to_string(),
            });
            String::new()
        }
    }
}
