//! Well-known ignition paths

use std::path::{Path, PathBuf};

/// Root the provisioned system is mounted at
pub const ROOT_DIR: &str = "/sysroot";

/// Where the rendered user config is cached between stages
pub const CONFIG_CACHE: &str = "/run/ignition.json";

/// Directory holding distribution-supplied configs
pub const SYSTEM_CONFIG_DIR: &str = "/usr/lib/ignition";

/// Kernel command line
pub const CMDLINE: &str = "/proc/cmdline";

/// Locations ignition reads from and writes to
#[derive(Debug, Clone)]
pub struct IgnitionPaths {
    /// Provisioning root (default: /sysroot)
    pub root: PathBuf,
    /// Rendered config cache (default: /run/ignition.json)
    pub config_cache: PathBuf,
    /// System config directory (default: /usr/lib/ignition)
    pub system_config_dir: PathBuf,
    /// Kernel command line (default: /proc/cmdline)
    pub cmdline: PathBuf,
}

impl Default for IgnitionPaths {
    fn default() -> Self {
        Self::new()
    }
}

impl IgnitionPaths {
    /// Create with default paths
    pub fn new() -> Self {
        Self {
            root: PathBuf::from(ROOT_DIR),
            config_cache: PathBuf::from(CONFIG_CACHE),
            system_config_dir: PathBuf::from(SYSTEM_CONFIG_DIR),
            cmdline: PathBuf::from(CMDLINE),
        }
    }

    /// Place every path under `base` (useful for testing)
    pub fn with_base(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            root: base.join("sysroot"),
            config_cache: base.join("run/ignition.json"),
            system_config_dir: base.join("usr/lib/ignition"),
            cmdline: base.join("proc/cmdline"),
        }
    }

    /// <system config dir>/base.ign - Platform base layer
    pub fn base_config(&self) -> PathBuf {
        self.system_config_dir.join("base.ign")
    }

    /// <system config dir>/default.ign - Used when the user config is unusable
    pub fn default_config(&self) -> PathBuf {
        self.system_config_dir.join("default.ign")
    }

    /// <system config dir>/user.ign - Baked-in user config
    pub fn user_config(&self) -> PathBuf {
        self.system_config_dir.join("user.ign")
    }
}
