//! Test fixtures: configurations, contexts, and canned producer modules.
//!
//! Everything here is for tests (this crate's and downstream crates').
//! Configurations built by `test_config` are marked as test configurations,
//! which unlocks the test-only conveniences (`relative_to_top`, tolerated
//! non-existent source paths) that panic in production configurations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::{Config, ProductVariables};
use crate::context::{
    DepsPathContext, HostToolProvider, Module, ModuleInstallPathContext, ModulePathContext,
    OutputFileProducer, PathContext, SourceFileProducer,
};
use crate::error::{Error, Result};
use crate::filesystem::MockFs;
use crate::paths::{OptionalPath, Path, Paths, TestPath};
use crate::target::{ArchType, OsType};
use crate::validate::validate_safe_path;

/// A test configuration over an in-memory filesystem, with the source root
/// at `.` and outputs under `build_dir`.
pub fn test_config(build_dir: &str, fs: MockFs) -> Config {
    test_config_with_variables(build_dir, fs, ProductVariables::default())
}

/// A test configuration with explicit product variables.
pub fn test_config_with_variables(
    build_dir: &str,
    fs: MockFs,
    variables: ProductVariables,
) -> Config {
    Config::with_fs(".", build_dir, variables, Arc::new(fs)).for_testing()
}

/// A path constructed by joining the components with `/`, bypassing root
/// validation. Only for use in tests.
///
/// Panics on traversal, since tests supply literal inputs.
pub fn path_for_testing(components: &[&str]) -> Path {
    let path = validate_safe_path(components).expect("test path escapes its directory");
    Path::Test(TestPath {
        rel: path.clone(),
        path,
    })
}

/// Test paths for each of the given strings.
pub fn paths_for_testing(strs: &[&str]) -> Paths {
    strs.iter().map(|s| path_for_testing(&[s])).collect()
}

/// Minimal context carrying a configuration and an error accumulator.
#[derive(Debug)]
pub struct TestPathContext {
    config: Config,
    errors: Mutex<Vec<Error>>,
}

impl TestPathContext {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            errors: Mutex::new(Vec::new()),
        }
    }

    /// Accumulated error messages, in report order.
    pub fn errors(&self) -> Vec<String> {
        self.errors
            .lock()
            .expect("error sink lock")
            .iter()
            .map(|e| e.to_string())
            .collect()
    }
}

impl PathContext for TestPathContext {
    fn config(&self) -> &Config {
        &self.config
    }

    fn report_error(&self, err: Error) {
        self.errors.lock().expect("error sink lock").push(err);
    }
}

/// Module-scoped context with a configurable dependency graph and
/// missing-dependency recorder.
#[derive(Debug)]
pub struct TestModuleContext {
    config: Config,
    module_dir: String,
    module_name: String,
    module_sub_dir: String,
    deps: HashMap<(String, String), Arc<dyn Module>>,
    errors: Mutex<Vec<Error>>,
    missing_deps: Mutex<Vec<String>>,
}

impl TestModuleContext {
    pub fn new(config: Config, module_dir: &str, module_name: &str) -> Self {
        Self {
            config,
            module_dir: module_dir.to_string(),
            module_name: module_name.to_string(),
            module_sub_dir: String::new(),
            deps: HashMap::new(),
            errors: Mutex::new(Vec::new()),
            missing_deps: Mutex::new(Vec::new()),
        }
    }

    pub fn with_sub_dir(mut self, sub_dir: &str) -> Self {
        self.module_sub_dir = sub_dir.to_string();
        self
    }

    /// Registers a resolved dependency edge keyed `(name, tag)`.
    pub fn add_dep(&mut self, name: &str, tag: &str, module: impl Module + 'static) {
        self.deps
            .insert((name.to_string(), tag.to_string()), Arc::new(module));
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors
            .lock()
            .expect("error sink lock")
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    /// Names recorded through the missing-dependency accumulator.
    pub fn missing_deps(&self) -> Vec<String> {
        self.missing_deps
            .lock()
            .expect("missing deps lock")
            .clone()
    }
}

impl PathContext for TestModuleContext {
    fn config(&self) -> &Config {
        &self.config
    }

    fn report_error(&self, err: Error) {
        self.errors.lock().expect("error sink lock").push(err);
    }

    fn record_missing_deps(&self, deps: &[String]) -> bool {
        self.missing_deps
            .lock()
            .expect("missing deps lock")
            .extend(deps.iter().cloned());
        true
    }
}

impl ModulePathContext for TestModuleContext {
    fn module_dir(&self) -> &str {
        &self.module_dir
    }

    fn module_name(&self) -> &str {
        &self.module_name
    }

    fn module_sub_dir(&self) -> &str {
        &self.module_sub_dir
    }
}

impl DepsPathContext for TestModuleContext {
    fn get_dep_with_tag(&self, name: &str, tag: &str) -> Option<Arc<dyn Module>> {
        self.deps
            .get(&(name.to_string(), tag.to_string()))
            .cloned()
    }
}

/// Install-path context with all location flags exposed as plain fields.
#[derive(Debug)]
pub struct TestInstallContext {
    inner: TestModuleContext,
    pub os: OsType,
    pub arch: ArchType,
    pub force_os: Option<(OsType, ArchType)>,
    pub debug: bool,
    pub in_data: bool,
    pub in_testcases: bool,
    pub in_sanitizer_dir: bool,
    pub in_ramdisk: bool,
    pub in_vendor_ramdisk: bool,
    pub in_debug_ramdisk: bool,
    pub in_recovery: bool,
    pub in_root: bool,
    pub soc_specific: bool,
    pub device_specific: bool,
    pub product_specific: bool,
    pub system_ext_specific: bool,
    pub bypass_native: bool,
}

impl TestInstallContext {
    pub fn new(config: Config) -> Self {
        Self {
            inner: TestModuleContext::new(config, "", "test_module"),
            os: OsType::Android,
            arch: ArchType::Arm64,
            force_os: None,
            debug: false,
            in_data: false,
            in_testcases: false,
            in_sanitizer_dir: false,
            in_ramdisk: false,
            in_vendor_ramdisk: false,
            in_debug_ramdisk: false,
            in_recovery: false,
            in_root: false,
            soc_specific: false,
            device_specific: false,
            product_specific: false,
            system_ext_specific: false,
            bypass_native: false,
        }
    }

    pub fn errors(&self) -> Vec<String> {
        self.inner.errors()
    }
}

impl PathContext for TestInstallContext {
    fn config(&self) -> &Config {
        self.inner.config()
    }

    fn report_error(&self, err: Error) {
        self.inner.report_error(err);
    }
}

impl ModulePathContext for TestInstallContext {
    fn module_dir(&self) -> &str {
        self.inner.module_dir()
    }

    fn module_name(&self) -> &str {
        self.inner.module_name()
    }
}

impl ModuleInstallPathContext for TestInstallContext {
    fn os(&self) -> OsType {
        self.os
    }

    fn arch(&self) -> ArchType {
        self.arch
    }

    fn install_force_os(&self) -> Option<(OsType, ArchType)> {
        self.force_os
    }

    fn debug_install(&self) -> bool {
        self.debug
    }

    fn install_in_data(&self) -> bool {
        self.in_data
    }

    fn install_in_testcases(&self) -> bool {
        self.in_testcases
    }

    fn install_in_sanitizer_dir(&self) -> bool {
        self.in_sanitizer_dir
    }

    fn install_in_ramdisk(&self) -> bool {
        self.in_ramdisk
    }

    fn install_in_vendor_ramdisk(&self) -> bool {
        self.in_vendor_ramdisk
    }

    fn install_in_debug_ramdisk(&self) -> bool {
        self.in_debug_ramdisk
    }

    fn install_in_recovery(&self) -> bool {
        self.in_recovery
    }

    fn install_in_root(&self) -> bool {
        self.in_root
    }

    fn soc_specific(&self) -> bool {
        self.soc_specific
    }

    fn device_specific(&self) -> bool {
        self.device_specific
    }

    fn product_specific(&self) -> bool {
        self.product_specific
    }

    fn system_ext_specific(&self) -> bool {
        self.system_ext_specific
    }

    fn install_bypass_native(&self) -> bool {
        self.bypass_native
    }
}

/// A module that produces a fixed list of source files.
pub struct SourceFilesModule {
    name: String,
    srcs: Paths,
    enabled: bool,
}

impl SourceFilesModule {
    pub fn new(name: &str, srcs: Paths) -> Self {
        Self {
            name: name.to_string(),
            srcs,
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

impl Module for SourceFilesModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn as_source_file_producer(&self) -> Option<&dyn SourceFileProducer> {
        Some(self)
    }
}

impl SourceFileProducer for SourceFilesModule {
    fn srcs(&self) -> Paths {
        self.srcs.clone()
    }
}

/// A module that produces tagged output file groups.
pub struct OutputFilesModule {
    name: String,
    outputs: HashMap<String, Paths>,
    enabled: bool,
}

impl OutputFilesModule {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            outputs: HashMap::new(),
            enabled: true,
        }
    }

    pub fn with_default_output(self, paths: Paths) -> Self {
        self.with_tagged_output("", paths)
    }

    pub fn with_tagged_output(mut self, tag: &str, paths: Paths) -> Self {
        self.outputs.insert(tag.to_string(), paths);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

impl Module for OutputFilesModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn as_output_file_producer(&self) -> Option<&dyn OutputFileProducer> {
        Some(self)
    }
}

impl OutputFileProducer for OutputFilesModule {
    fn output_files(&self, tag: &str) -> Result<Paths> {
        self.outputs
            .get(tag)
            .cloned()
            .ok_or_else(|| Error::UnsupportedTag {
                tag: tag.to_string(),
            })
    }
}

/// A module that builds a host tool.
pub struct HostToolModule {
    name: String,
    tool_path: OptionalPath,
}

impl HostToolModule {
    pub fn new(name: &str, tool_path: Option<Path>) -> Self {
        Self {
            name: name.to_string(),
            tool_path: match tool_path {
                Some(path) => OptionalPath::from_path(path),
                None => OptionalPath::invalid("tool not configured"),
            },
        }
    }
}

impl Module for HostToolModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_host_tool_provider(&self) -> Option<&dyn HostToolProvider> {
        Some(self)
    }
}

impl HostToolProvider for HostToolModule {
    fn host_tool_path(&self) -> OptionalPath {
        self.tool_path.clone()
    }
}

/// A module with no producer capabilities, for exercising classification
/// errors.
pub struct PlainModule {
    name: String,
}

impl PlainModule {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl Module for PlainModule {
    fn name(&self) -> &str {
        &self.name
    }
}
