//! # Install Paths
//!
//! Install paths name the final on-device (or on-host) location of a built
//! artifact. They are rooted under the build output tree, in a partition
//! directory chosen by `module_partition`.
//!
//! The partition decision table is evaluated in a fixed priority order
//! (testcases, then the ramdisk family, then recovery, then
//! partition-specific flags, then root, then system). This ordering is a
//! strict contract: reordering it changes install locations for existing
//! modules.

use std::fmt;

use crate::config::DeviceConfig;
use crate::context::{ModuleInstallPathContext, PathContext};
use crate::paths::{path_for_output, rel};
use crate::target::{ArchType, OsClass, OsType};
use crate::validate::{base_name, file_ext, join_clean, validate_path};

/// A file path under a partition-specific install tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstallPath {
    /// Path relative to the output root (legacy addressing re-roots it to
    /// the output root's parent instead).
    path: String,
    rel: String,
    /// The partition portion of the path, automatically determined: for
    /// device modules `target/product/<device>/<partition>`, for host
    /// modules `host/<os>-<arch>`.
    partition_dir: String,
    /// Whether the path uses the legacy install root next to the native
    /// output tree.
    legacy: bool,
    build_dir: String,
    full: String,
}

impl InstallPath {
    fn render(build_dir: &str, path: &str, legacy: bool) -> String {
        if legacy {
            join_clean(&[build_dir, "..", path])
        } else {
            join_clean(&[build_dir, path])
        }
    }

    pub fn as_str(&self) -> &str {
        &self.full
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

    /// The path to the partition the install path is rooted at.
    pub fn partition_dir(&self) -> String {
        Self::render(&self.build_dir, &self.partition_dir, self.legacy)
    }

    /// Joins further components, revalidating them. `..` may not escape the
    /// current path.
    pub fn join(&self, ctx: &dyn PathContext, components: &[&str]) -> InstallPath {
        let rel = match validate_path(components) {
            Ok(p) => p,
            Err(err) => {
                ctx.report_error(err);
                String::new()
            }
        };
        self.with_rel(&rel)
    }

    fn with_rel(&self, rel: &str) -> InstallPath {
        let path = join_clean(&[&self.path, rel]);
        InstallPath {
            full: Self::render(&self.build_dir, &path, self.legacy),
            path,
            rel: rel.to_string(),
            partition_dir: self.partition_dir.clone(),
            legacy: self.legacy,
            build_dir: self.build_dir.clone(),
        }
    }

    /// Switches the path to the legacy install root next to the native
    /// output tree.
    pub fn to_legacy(mut self) -> InstallPath {
        self.legacy = true;
        self.full = Self::render(&self.build_dir, &self.path, true);
        self
    }

    /// Re-roots the path as if the output directory were the top-level
    /// `out` directory. Test-only, like `OutputPath::relative_to_top`.
    ///
    /// Panics when called outside a test configuration.
    pub fn relative_to_top(&self, ctx: &dyn PathContext) -> InstallPath {
        assert!(
            ctx.config().running_as_test(),
            "relative_to_top may only be used from tests"
        );
        let mut ret = self.clone();
        ret.build_dir = "out".to_string();
        ret.full = Self::render("out", &ret.path, ret.legacy);
        ret
    }
}

impl fmt::Display for InstallPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

/// An ordered collection of install paths.
pub type InstallPaths = Vec<InstallPath>;

/// The install path for the current module, appended with `components`.
pub fn path_for_module_install(
    ctx: &dyn ModuleInstallPathContext,
    components: &[&str],
) -> InstallPath {
    let (os, arch) = ctx
        .install_force_os()
        .unwrap_or((ctx.os(), ctx.arch()));
    let partition = module_partition(ctx, os);
    let ret = path_for_install(ctx, os, arch, &partition, ctx.debug_install(), components);

    if ctx.install_bypass_native() {
        return ret.to_legacy();
    }
    ret
}

/// An install path for the given target and partition.
pub fn path_for_install(
    ctx: &dyn PathContext,
    os: OsType,
    arch: ArchType,
    partition: &str,
    debug: bool,
    components: &[&str],
) -> InstallPath {
    let mut partition_components: Vec<String> = Vec::new();
    if os.class() == OsClass::Device {
        partition_components.extend([
            "target".to_string(),
            "product".to_string(),
            ctx.config().device_name().to_string(),
            partition.to_string(),
        ]);
    } else {
        // Host install directories keep their historical names: plain
        // "linux", and 32-bit x86 even on 64-bit hosts.
        let os_name = if os == OsType::Linux { "linux" } else { os.name() };
        let arch_name = if matches!(arch, ArchType::X86_64 | ArchType::Common) {
            ArchType::X86.name()
        } else {
            arch.name()
        };
        partition_components.extend([
            "host".to_string(),
            format!("{}-{}", os_name, arch_name),
            partition.to_string(),
        ]);
    }
    if debug {
        partition_components.insert(0, "debug".to_string());
    }

    let refs: Vec<&str> = partition_components.iter().map(|s| s.as_str()).collect();
    let partition_path = match validate_path(&refs) {
        Ok(p) => p,
        Err(err) => {
            ctx.report_error(err);
            String::new()
        }
    };

    let build_dir = ctx.config().build_dir().to_string();
    let full = InstallPath::render(&build_dir, &partition_path, false);
    let base = InstallPath {
        path: partition_path.clone(),
        rel: String::new(),
        partition_dir: partition_path,
        legacy: false,
        build_dir,
        full,
    };
    base.join(ctx, components)
}

fn install_root(ctx: &dyn PathContext, prefix: &str, components: &[&str]) -> InstallPath {
    let base = InstallPath {
        path: prefix.to_string(),
        rel: String::new(),
        partition_dir: prefix.to_string(),
        legacy: false,
        build_dir: ctx.config().build_dir().to_string(),
        full: InstallPath::render(ctx.config().build_dir(), prefix, false),
    };
    base.join(ctx, components)
}

/// An install path under the NDK output root.
pub fn path_for_ndk_install(ctx: &dyn PathContext, components: &[&str]) -> InstallPath {
    install_root(ctx, "ndk", components)
}

/// An install path under the mainline SDKs output root.
pub fn path_for_mainline_sdks_install(
    ctx: &dyn PathContext,
    components: &[&str],
) -> InstallPath {
    install_root(ctx, "mainline-sdks", components)
}

/// Maps an install path to the absolute path the file will have on the
/// device.
pub fn install_path_to_on_device_path(ctx: &dyn PathContext, path: &InstallPath) -> String {
    let device_root = path_for_output(
        ctx,
        &["target", "product", ctx.config().device_name()],
    );
    format!("/{}", rel(ctx, device_root.as_str(), path.as_str()))
}

/// The partition directory a module installs into, decided from the
/// module's install-location flags in fixed priority order.
fn module_partition(ctx: &dyn ModuleInstallPathContext, os: OsType) -> String {
    let device_config = match ctx.config().device_config() {
        Ok(dc) => dc,
        Err(err) => {
            ctx.report_error(err);
            std::sync::Arc::new(DeviceConfig::default())
        }
    };

    let mut partition = String::new();
    if ctx.install_in_testcases() {
        // "testcases" install directory can be used for host or device modules.
        partition = "testcases".to_string();
    } else if os.class() == OsClass::Device {
        if ctx.install_in_data() {
            partition = "data".to_string();
        } else if ctx.install_in_ramdisk() {
            if device_config.recovery_as_boot() {
                partition = "recovery/root/first_stage_ramdisk".to_string();
            } else {
                partition = "ramdisk".to_string();
            }
            if !ctx.install_in_root() {
                partition.push_str("/system");
            }
        } else if ctx.install_in_vendor_ramdisk() {
            // The module is only available after switching root into
            // /first_stage_ramdisk. To expose the module before switching
            // root on a device without a dedicated recovery partition,
            // install the recovery variant.
            if device_config.move_recovery_resources_to_vendor_boot() {
                partition = "vendor-ramdisk/first_stage_ramdisk".to_string();
            } else {
                partition = "vendor-ramdisk".to_string();
            }
            if !ctx.install_in_root() {
                partition.push_str("/system");
            }
        } else if ctx.install_in_debug_ramdisk() {
            partition = "debug_ramdisk".to_string();
        } else if ctx.install_in_recovery() {
            if ctx.install_in_root() {
                partition = "recovery/root".to_string();
            } else {
                // The layout of the recovery partition mirrors the system
                // partition.
                partition = "recovery/root/system".to_string();
            }
        } else if ctx.soc_specific() {
            partition = device_config.vendor_path().to_string();
        } else if ctx.device_specific() {
            partition = device_config.odm_path().to_string();
        } else if ctx.product_specific() {
            partition = device_config.product_path().to_string();
        } else if ctx.system_ext_specific() {
            partition = device_config.system_ext_path().to_string();
        } else if ctx.install_in_root() {
            partition = "root".to_string();
        } else {
            partition = "system".to_string();
        }
        if ctx.install_in_sanitizer_dir() {
            partition = format!("data/asan/{}", partition);
        }
    }
    partition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProductVariables;
    use crate::filesystem::MockFs;
    use crate::testing::{test_config_with_variables, TestInstallContext};

    fn device_ctx() -> TestInstallContext {
        let vars = ProductVariables {
            device_name: "test_device".to_string(),
            ..Default::default()
        };
        TestInstallContext::new(test_config_with_variables("out", MockFs::new(), vars))
    }

    struct PartitionCase {
        name: &'static str,
        setup: fn(&mut TestInstallContext),
        expected: &'static str,
    }

    #[test]
    fn test_module_install_partition_table() {
        let cases = [
            PartitionCase {
                name: "system",
                setup: |_| {},
                expected: "target/product/test_device/system/bin/my_test",
            },
            PartitionCase {
                name: "testcases",
                setup: |ctx| ctx.in_testcases = true,
                expected: "target/product/test_device/testcases/bin/my_test",
            },
            PartitionCase {
                name: "data",
                setup: |ctx| ctx.in_data = true,
                expected: "target/product/test_device/data/bin/my_test",
            },
            PartitionCase {
                name: "ramdisk",
                setup: |ctx| ctx.in_ramdisk = true,
                expected: "target/product/test_device/ramdisk/system/bin/my_test",
            },
            PartitionCase {
                name: "ramdisk root",
                setup: |ctx| {
                    ctx.in_ramdisk = true;
                    ctx.in_root = true;
                },
                expected: "target/product/test_device/ramdisk/bin/my_test",
            },
            PartitionCase {
                name: "vendor-ramdisk",
                setup: |ctx| ctx.in_vendor_ramdisk = true,
                expected: "target/product/test_device/vendor-ramdisk/system/bin/my_test",
            },
            PartitionCase {
                name: "debug ramdisk",
                setup: |ctx| ctx.in_debug_ramdisk = true,
                expected: "target/product/test_device/debug_ramdisk/bin/my_test",
            },
            PartitionCase {
                name: "recovery",
                setup: |ctx| ctx.in_recovery = true,
                expected: "target/product/test_device/recovery/root/system/bin/my_test",
            },
            PartitionCase {
                name: "recovery root",
                setup: |ctx| {
                    ctx.in_recovery = true;
                    ctx.in_root = true;
                },
                expected: "target/product/test_device/recovery/root/bin/my_test",
            },
            PartitionCase {
                name: "vendor",
                setup: |ctx| ctx.soc_specific = true,
                expected: "target/product/test_device/vendor/bin/my_test",
            },
            PartitionCase {
                name: "odm",
                setup: |ctx| ctx.device_specific = true,
                expected: "target/product/test_device/odm/bin/my_test",
            },
            PartitionCase {
                name: "product",
                setup: |ctx| ctx.product_specific = true,
                expected: "target/product/test_device/product/bin/my_test",
            },
            PartitionCase {
                name: "system_ext",
                setup: |ctx| ctx.system_ext_specific = true,
                expected: "target/product/test_device/system_ext/bin/my_test",
            },
            PartitionCase {
                name: "root",
                setup: |ctx| ctx.in_root = true,
                expected: "target/product/test_device/root/bin/my_test",
            },
            PartitionCase {
                name: "sanitized system",
                setup: |ctx| ctx.in_sanitizer_dir = true,
                expected: "target/product/test_device/data/asan/system/bin/my_test",
            },
            PartitionCase {
                name: "sanitized vendor",
                setup: |ctx| {
                    ctx.soc_specific = true;
                    ctx.in_sanitizer_dir = true;
                },
                expected: "target/product/test_device/data/asan/vendor/bin/my_test",
            },
            PartitionCase {
                name: "sanitized data",
                setup: |ctx| {
                    ctx.in_data = true;
                    ctx.in_sanitizer_dir = true;
                },
                expected: "target/product/test_device/data/asan/data/bin/my_test",
            },
        ];

        for case in cases {
            let mut ctx = device_ctx();
            (case.setup)(&mut ctx);
            let path = path_for_module_install(&ctx, &["bin", "my_test"]);
            assert_eq!(
                path.as_str(),
                format!("out/{}", case.expected),
                "partition case {:?}",
                case.name
            );
            assert!(ctx.errors().is_empty(), "partition case {:?}", case.name);
        }
    }

    #[test]
    fn test_testcases_beats_every_other_flag() {
        let mut ctx = device_ctx();
        ctx.in_testcases = true;
        ctx.in_data = true;
        ctx.in_ramdisk = true;
        ctx.in_recovery = true;
        let path = path_for_module_install(&ctx, &["my_test"]);
        assert_eq!(
            path.as_str(),
            "out/target/product/test_device/testcases/my_test"
        );
    }

    #[test]
    fn test_recovery_as_boot_moves_ramdisk() {
        let vars = ProductVariables {
            device_name: "test_device".to_string(),
            board_uses_recovery_as_boot: true,
            ..Default::default()
        };
        let mut ctx =
            TestInstallContext::new(test_config_with_variables("out", MockFs::new(), vars));
        ctx.in_ramdisk = true;
        let path = path_for_module_install(&ctx, &["init"]);
        assert_eq!(
            path.as_str(),
            "out/target/product/test_device/recovery/root/first_stage_ramdisk/system/init"
        );
    }

    #[test]
    fn test_vendor_partition_override() {
        let vars = ProductVariables {
            device_name: "test_device".to_string(),
            vendor_path: Some("oem".to_string()),
            ..Default::default()
        };
        let mut ctx =
            TestInstallContext::new(test_config_with_variables("out", MockFs::new(), vars));
        ctx.soc_specific = true;
        let path = path_for_module_install(&ctx, &["lib", "libfoo.so"]);
        assert_eq!(
            path.as_str(),
            "out/target/product/test_device/oem/lib/libfoo.so"
        );
    }

    #[test]
    fn test_host_install_path() {
        let mut ctx = device_ctx();
        ctx.os = OsType::Linux;
        ctx.arch = ArchType::X86_64;
        let path = path_for_module_install(&ctx, &["bin", "my_test"]);
        assert_eq!(path.as_str(), "out/host/linux-x86/bin/my_test");
        assert_eq!(path.partition_dir(), "out/host/linux-x86");
    }

    #[test]
    fn test_host_testcases_install_path() {
        let mut ctx = device_ctx();
        ctx.os = OsType::Linux;
        ctx.arch = ArchType::X86_64;
        ctx.in_testcases = true;
        let path = path_for_module_install(&ctx, &["my_test", "my_test_bin"]);
        assert_eq!(
            path.as_str(),
            "out/host/linux-x86/testcases/my_test/my_test_bin"
        );
    }

    #[test]
    fn test_force_os_overrides_target() {
        let mut ctx = device_ctx();
        ctx.force_os = Some((OsType::Linux, ArchType::Common));
        let path = path_for_module_install(&ctx, &["bin", "my_test"]);
        assert_eq!(path.as_str(), "out/host/linux-x86/bin/my_test");
    }

    #[test]
    fn test_debug_install_prefix() {
        let mut ctx = device_ctx();
        ctx.debug = true;
        let path = path_for_module_install(&ctx, &["bin", "my_test"]);
        assert_eq!(
            path.as_str(),
            "out/debug/target/product/test_device/system/bin/my_test"
        );
    }

    #[test]
    fn test_legacy_addressing() {
        let mut ctx = device_ctx();
        ctx.bypass_native = true;
        let path = path_for_module_install(&ctx, &["bin", "my_test"]);
        assert_eq!(
            path.as_str(),
            "target/product/test_device/system/bin/my_test"
        );
        assert_eq!(path.partition_dir(), "target/product/test_device/system");
    }

    #[test]
    fn test_install_path_join_and_rel() {
        let ctx = device_ctx();
        let path = path_for_module_install(&ctx, &["bin"]).join(&ctx, &["my_test"]);
        assert_eq!(
            path.as_str(),
            "out/target/product/test_device/system/bin/my_test"
        );
        assert_eq!(path.rel(), "my_test");
    }

    #[test]
    fn test_install_path_to_on_device_path() {
        let ctx = device_ctx();
        let path = path_for_module_install(&ctx, &["bin", "my_test"]);
        assert_eq!(
            install_path_to_on_device_path(&ctx, &path),
            "/system/bin/my_test"
        );
    }

    #[test]
    fn test_ndk_install_root() {
        let ctx = device_ctx();
        let path = path_for_ndk_install(&ctx, &["sysroot", "usr"]);
        assert_eq!(path.as_str(), "out/ndk/sysroot/usr");
    }
}
