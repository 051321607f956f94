//! # Contexts and Module Capabilities
//!
//! The path layer never owns the module graph; it consumes it through the
//! narrow trait surface defined here.
//!
//! ## Context ladder
//!
//! Contexts form a ladder of capabilities mirroring the phases of a build:
//!
//! - [`PathContext`]: configuration access plus the accumulating error
//!   sink. Enough for constructing source and output paths.
//! - [`ModulePathContext`]: adds the identity of the module whose actions
//!   are being generated (directory, name, variant). Enough for
//!   module-scoped paths and glob expansion.
//! - [`DepsPathContext`]: adds read access to the already-finalized
//!   dependency graph and the per-module missing-dependency accumulator.
//!   Required for resolving `:module` references.
//! - [`ModuleInstallPathContext`]: adds the install-location flags and
//!   target classification consulted by install-path construction.
//!
//! ## Error sink
//!
//! `report_error` accumulates; it never unwinds. Path constructors report
//! and then return a best-effort value so that a single pass over a module
//! surfaces every problem instead of stopping at the first.
//!
//! ## Module capabilities
//!
//! A module opts into producing files for other modules by overriding the
//! corresponding `as_*` accessor to return itself. This replaces structural
//! capability probing with explicit conformance while keeping the same
//! dispatch logic at resolution time.

use std::sync::Arc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::paths::{OptionalPath, Paths};
use crate::target::{ArchType, OsType};

/// Minimal context for constructing paths: configuration plus error sink.
pub trait PathContext {
    fn config(&self) -> &Config;

    /// Record an input-data error. Errors accumulate; resolution continues
    /// with best-effort values.
    fn report_error(&self, err: Error);

    /// Record unresolved dependencies on the acting module, returning true
    /// if this context supports doing so. Contexts without a module scope
    /// return false and the caller falls back to reporting an error.
    fn record_missing_deps(&self, _deps: &[String]) -> bool {
        false
    }
}

/// Context for path operations scoped to a module definition.
pub trait ModulePathContext: PathContext {
    /// Directory of the build file that defined the module, relative to the
    /// source root.
    fn module_dir(&self) -> &str;

    fn module_name(&self) -> &str;

    /// Variant suffix distinguishing multiple builds of the same module.
    fn module_sub_dir(&self) -> &str {
        ""
    }
}

/// Context for path operations that resolve module references. Dependency
/// edges must already exist; they are added by the pre-pass in
/// `path_properties` during an earlier phase.
pub trait DepsPathContext: ModulePathContext {
    /// The module resolved for the dependency edge keyed exactly
    /// `(name, tag)`, if such an edge exists.
    fn get_dep_with_tag(&self, name: &str, tag: &str) -> Option<Arc<dyn Module>>;
}

/// Install-location flags and target classification for install paths.
///
/// The flag accessors correspond to module properties; they default to
/// false so implementations only override what they set.
pub trait ModuleInstallPathContext: ModulePathContext {
    fn os(&self) -> OsType;
    fn arch(&self) -> ArchType;

    /// Overrides the target OS/architecture for modules that install into
    /// another target's directory tree.
    fn install_force_os(&self) -> Option<(OsType, ArchType)> {
        None
    }

    fn debug_install(&self) -> bool {
        false
    }

    fn install_in_data(&self) -> bool {
        false
    }

    fn install_in_testcases(&self) -> bool {
        false
    }

    fn install_in_sanitizer_dir(&self) -> bool {
        false
    }

    fn install_in_ramdisk(&self) -> bool {
        false
    }

    fn install_in_vendor_ramdisk(&self) -> bool {
        false
    }

    fn install_in_debug_ramdisk(&self) -> bool {
        false
    }

    fn install_in_recovery(&self) -> bool {
        false
    }

    fn install_in_root(&self) -> bool {
        false
    }

    fn soc_specific(&self) -> bool {
        false
    }

    fn device_specific(&self) -> bool {
        false
    }

    fn product_specific(&self) -> bool {
        false
    }

    fn system_ext_specific(&self) -> bool {
        false
    }

    /// Install using the legacy install-root addressing instead of the
    /// native build output tree.
    fn install_bypass_native(&self) -> bool {
        false
    }
}

/// A named build unit participating in the dependency graph.
///
/// Capability accessors return `None` by default; a module that produces
/// files for other modules overrides the matching accessor to return
/// itself.
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    /// Disabled modules are skipped by resolution exactly as if the
    /// dependency edge were missing.
    fn enabled(&self) -> bool {
        true
    }

    fn as_source_file_producer(&self) -> Option<&dyn SourceFileProducer> {
        None
    }

    fn as_output_file_producer(&self) -> Option<&dyn OutputFileProducer> {
        None
    }

    fn as_host_tool_provider(&self) -> Option<&dyn HostToolProvider> {
        None
    }
}

impl std::fmt::Debug for dyn Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Module({})", self.name())
    }
}

/// A module that can be referenced with `:name` to stand in for its full
/// list of source files.
pub trait SourceFileProducer {
    fn srcs(&self) -> Paths;
}

/// A module that can be referenced with `:name` or `:name{tag}` to stand in
/// for one of its named output file groups. The empty tag names the default
/// group.
pub trait OutputFileProducer {
    fn output_files(&self, tag: &str) -> Result<Paths>;
}

/// A module that builds a host tool binary; `:name` references resolve to
/// the installed binary.
pub trait HostToolProvider {
    /// The path of the built tool, invalid if the tool failed to configure.
    fn host_tool_path(&self) -> OptionalPath;
}

/// Receiver for dependency edges registered by the path-property pre-pass.
pub trait DepRegistrar {
    /// Register a dependency edge keyed `(module, tag)` from the current
    /// module to `module`.
    fn add_dependency(&mut self, module: &str, tag: &str);
}
