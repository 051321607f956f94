//! Target OS and architecture classification used by install paths.

use std::fmt;

/// Broad class of a target: host tools vs. files destined for the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsClass {
    Host,
    Device,
}

/// Operating systems a module can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsType {
    Linux,
    Darwin,
    Windows,
    Android,
}

impl OsType {
    pub fn class(self) -> OsClass {
        match self {
            OsType::Android => OsClass::Device,
            _ => OsClass::Host,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OsType::Linux => "linux_glibc",
            OsType::Darwin => "darwin",
            OsType::Windows => "windows",
            OsType::Android => "android",
        }
    }
}

impl fmt::Display for OsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// CPU architectures a module can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchType {
    Arm,
    Arm64,
    X86,
    X86_64,
    Common,
}

impl ArchType {
    pub fn name(self) -> &'static str {
        match self {
            ArchType::Arm => "arm",
            ArchType::Arm64 => "arm64",
            ArchType::X86 => "x86",
            ArchType::X86_64 => "x86_64",
            ArchType::Common => "common",
        }
    }
}

impl fmt::Display for ArchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
