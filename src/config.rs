//! # Build Configuration
//!
//! This module defines the configuration surface the path layer consumes:
//!
//! - **`ProductVariables`**: the declarative build-variable set, parsed from
//!   a JSON document produced by the outer build orchestration. Only the
//!   variables this layer reads are modeled here.
//! - **`Config`**: the per-build-invocation configuration handle. It carries
//!   the source and output roots, feature flags, the filesystem capability
//!   used for existence checks and globs, and a compute-once cache scoped to
//!   the build invocation.
//! - **`DeviceConfig`**: the partition directory-override registry derived
//!   from the product variables, computed once per build through the
//!   once-cache.
//!
//! `Config` is a cheap clone (the state is shared behind an `Arc`), so
//! contexts can hold it by value while the external scheduler fans module
//! callbacks out across worker threads.

use std::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::filesystem::{FileSystem, OsFs};
use crate::once::{OnceKey, OnceMap};
use crate::target::{ArchType, OsType};

/// Build variables supplied by the product definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductVariables {
    /// Name of the device being built, used in install path construction.
    pub device_name: String,
    /// Override for the vendor partition directory.
    pub vendor_path: Option<String>,
    /// Override for the odm partition directory.
    pub odm_path: Option<String>,
    /// Override for the product partition directory.
    pub product_path: Option<String>,
    /// Override for the system_ext partition directory.
    pub system_ext_path: Option<String>,
    /// When set, unresolved module references mark the referencing module as
    /// having missing dependencies instead of failing the build. Used for
    /// IDE and partial-graph scenarios.
    pub allow_missing_dependencies: bool,
    /// Whether build actions may execute remotely. This layer only carries
    /// the flag; remote execution itself lives in the executor.
    pub use_remote_build: bool,
    /// The device boots from the recovery image, which changes where
    /// ramdisk modules install.
    pub board_uses_recovery_as_boot: bool,
    /// Recovery resources live in the vendor boot image, which changes
    /// where vendor-ramdisk modules install.
    pub board_move_recovery_resources_to_vendor_boot: bool,
}

impl Default for ProductVariables {
    fn default() -> Self {
        Self {
            device_name: "generic".to_string(),
            vendor_path: None,
            odm_path: None,
            product_path: None,
            system_ext_path: None,
            allow_missing_dependencies: false,
            use_remote_build: false,
            board_uses_recovery_as_boot: false,
            board_move_recovery_resources_to_vendor_boot: false,
        }
    }
}

impl ProductVariables {
    /// Parses product variables from their JSON representation.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses product variables from a JSON file.
    pub fn from_json_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

/// Partition directory overrides, derived once per build from the product
/// variables.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    vendor_path: String,
    odm_path: String,
    product_path: String,
    system_ext_path: String,
    recovery_as_boot: bool,
    move_recovery_resources_to_vendor_boot: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            vendor_path: "vendor".to_string(),
            odm_path: "odm".to_string(),
            product_path: "product".to_string(),
            system_ext_path: "system_ext".to_string(),
            recovery_as_boot: false,
            move_recovery_resources_to_vendor_boot: false,
        }
    }
}

impl DeviceConfig {
    fn from_variables(vars: &ProductVariables) -> Self {
        let defaults = Self::default();
        Self {
            vendor_path: vars.vendor_path.clone().unwrap_or(defaults.vendor_path),
            odm_path: vars.odm_path.clone().unwrap_or(defaults.odm_path),
            product_path: vars.product_path.clone().unwrap_or(defaults.product_path),
            system_ext_path: vars
                .system_ext_path
                .clone()
                .unwrap_or(defaults.system_ext_path),
            recovery_as_boot: vars.board_uses_recovery_as_boot,
            move_recovery_resources_to_vendor_boot: vars
                .board_move_recovery_resources_to_vendor_boot,
        }
    }

    pub fn vendor_path(&self) -> &str {
        &self.vendor_path
    }

    pub fn odm_path(&self) -> &str {
        &self.odm_path
    }

    pub fn product_path(&self) -> &str {
        &self.product_path
    }

    pub fn system_ext_path(&self) -> &str {
        &self.system_ext_path
    }

    pub fn recovery_as_boot(&self) -> bool {
        self.recovery_as_boot
    }

    pub fn move_recovery_resources_to_vendor_boot(&self) -> bool {
        self.move_recovery_resources_to_vendor_boot
    }
}

struct ConfigState {
    src_dir: String,
    build_dir: String,
    device_os: OsType,
    device_arch: ArchType,
    host_os: OsType,
    host_arch: ArchType,
    product_variables: ProductVariables,
    test_allow_non_existent_paths: bool,
    running_as_test: bool,
    fs: Arc<dyn FileSystem>,
    once: OnceMap<OnceKey, Arc<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for ConfigState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigState")
            .field("src_dir", &self.src_dir)
            .field("build_dir", &self.build_dir)
            .field("device_os", &self.device_os)
            .field("device_arch", &self.device_arch)
            .field("product_variables", &self.product_variables)
            .field("running_as_test", &self.running_as_test)
            .field("fs", &self.fs)
            .finish_non_exhaustive()
    }
}

/// Per-build-invocation configuration handle.
#[derive(Debug, Clone)]
pub struct Config {
    state: Arc<ConfigState>,
}

const DEVICE_CONFIG_KEY: OnceKey = OnceKey::new("device config");

impl Config {
    /// Creates a configuration rooted at `src_dir` with build outputs under
    /// `build_dir`, using the real filesystem.
    pub fn new(src_dir: &str, build_dir: &str, product_variables: ProductVariables) -> Self {
        Self::with_fs(src_dir, build_dir, product_variables, Arc::new(OsFs::new()))
    }

    /// Creates a configuration with an explicit filesystem capability.
    pub fn with_fs(
        src_dir: &str,
        build_dir: &str,
        product_variables: ProductVariables,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            state: Arc::new(ConfigState {
                src_dir: src_dir.to_string(),
                build_dir: build_dir.to_string(),
                device_os: OsType::Android,
                device_arch: ArchType::Arm64,
                host_os: OsType::Linux,
                host_arch: ArchType::X86_64,
                product_variables,
                test_allow_non_existent_paths: false,
                running_as_test: false,
                fs,
                once: OnceMap::new(),
            }),
        }
    }

    /// Marks this configuration as a test configuration, enabling test-only
    /// conveniences such as `relative_to_top` and non-existent source paths.
    pub(crate) fn for_testing(mut self) -> Self {
        let state = self.state_mut();
        state.running_as_test = true;
        state.test_allow_non_existent_paths = true;
        self
    }

    /// Returns a copy with existence checking of literal source paths
    /// re-enabled or disabled. Only meaningful for test configurations.
    pub fn with_test_allow_non_existent_paths(mut self, allow: bool) -> Self {
        self.state_mut().test_allow_non_existent_paths = allow;
        self
    }

    /// Returns a copy with the allow-missing-dependencies mode changed.
    pub fn with_allow_missing_dependencies(mut self, allow: bool) -> Self {
        self.state_mut()
            .product_variables
            .allow_missing_dependencies = allow;
        self
    }

    /// Returns a copy targeting the given device OS and architecture.
    pub fn with_device_target(mut self, os: OsType, arch: ArchType) -> Self {
        let state = self.state_mut();
        state.device_os = os;
        state.device_arch = arch;
        self
    }

    /// Returns a copy targeting the given host OS and architecture.
    pub fn with_host_target(mut self, os: OsType, arch: ArchType) -> Self {
        let state = self.state_mut();
        state.host_os = os;
        state.host_arch = arch;
        self
    }

    // Copy-on-write access for the builder-style modifiers above. Any
    // cached once-values are dropped with the old state, which is safe
    // because modifiers run before the configuration is shared.
    fn state_mut(&mut self) -> &mut ConfigState {
        if Arc::get_mut(&mut self.state).is_none() {
            let state = &self.state;
            self.state = Arc::new(ConfigState {
                src_dir: state.src_dir.clone(),
                build_dir: state.build_dir.clone(),
                device_os: state.device_os,
                device_arch: state.device_arch,
                host_os: state.host_os,
                host_arch: state.host_arch,
                product_variables: state.product_variables.clone(),
                test_allow_non_existent_paths: state.test_allow_non_existent_paths,
                running_as_test: state.running_as_test,
                fs: Arc::clone(&state.fs),
                once: OnceMap::new(),
            });
        }
        Arc::get_mut(&mut self.state).expect("state was just made unique")
    }

    pub fn src_dir(&self) -> &str {
        &self.state.src_dir
    }

    pub fn build_dir(&self) -> &str {
        &self.state.build_dir
    }

    pub fn device_name(&self) -> &str {
        &self.state.product_variables.device_name
    }

    pub fn device_os(&self) -> OsType {
        self.state.device_os
    }

    pub fn device_arch(&self) -> ArchType {
        self.state.device_arch
    }

    pub fn host_os(&self) -> OsType {
        self.state.host_os
    }

    pub fn host_arch(&self) -> ArchType {
        self.state.host_arch
    }

    pub fn product_variables(&self) -> &ProductVariables {
        &self.state.product_variables
    }

    pub fn allow_missing_dependencies(&self) -> bool {
        self.state.product_variables.allow_missing_dependencies
    }

    pub fn use_remote_build(&self) -> bool {
        self.state.product_variables.use_remote_build
    }

    pub fn test_allow_non_existent_paths(&self) -> bool {
        self.state.test_allow_non_existent_paths
    }

    pub fn running_as_test(&self) -> bool {
        self.state.running_as_test
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.state.fs.as_ref()
    }

    /// Computes a value at most once per build invocation. Concurrent
    /// callers for the same key share one computation; a failed computation
    /// leaves the key retryable.
    ///
    /// Panics if two callers use the same key with different value types;
    /// that is a programming error, not an input error.
    pub fn once<T, F>(&self, key: OnceKey, compute: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<T>,
    {
        let value = self
            .state
            .once
            .once(key, || compute().map(|v| Arc::new(v) as Arc<dyn Any + Send + Sync>))?;
        match value.downcast::<T>() {
            Ok(typed) => Ok(typed),
            Err(_) => panic!("once key {} used with conflicting value types", key),
        }
    }

    /// The partition directory-override registry for the device being
    /// built, computed once per build.
    pub fn device_config(&self) -> Result<Arc<DeviceConfig>> {
        self.once(DEVICE_CONFIG_KEY, || {
            Ok(DeviceConfig::from_variables(self.product_variables()))
        })
    }
}
