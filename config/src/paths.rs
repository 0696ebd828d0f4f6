//! Fixed configuration paths and path normalization helpers
//!
//! Relative paths in this module are joined onto the configuration root
//! (`PORTAGE_CONFIGROOT` in Gentoo terms).

use std::path::{Component, Path, PathBuf};

/// User configuration directory, relative to the config root
pub const USER_CONFIG_PATH: &str = "etc/buckos";

/// Active profile link, relative to the config root
pub const PROFILE_PATH: &str = "etc/buckos/make.profile";

/// Pre-Buckos location of the active profile link, relative to the config root
pub const DEPRECATED_PROFILE_PATH: &str = "etc/make.profile";

/// User override profile directory, relative to the config root
pub const CUSTOM_PROFILE_PATH: &str = "etc/buckos/profile";

/// Global make.conf, relative to the config root
pub const MAKE_CONF_PATH: &str = "etc/buckos/make.conf";

/// repos.conf file or directory, relative to the config root
pub const REPOS_CONF_PATH: &str = "etc/buckos/repos.conf";

/// Read-only defaults shipped with the package manager
pub const GLOBAL_CONFIG_PATH: &str = "/usr/share/buckos/config";

/// Installation prefix compiled into this build (empty for a normal install)
pub const EPREFIX: &str = "";

/// Environment variable names consulted for location defaults
pub mod env_vars {
    /// Configuration root override
    pub const CONFIG_ROOT: &str = "BUCKOS_CONFIG_ROOT";
    /// Portage compatibility spelling of the configuration root
    pub const PORTAGE_CONFIGROOT: &str = "PORTAGE_CONFIGROOT";
    /// Offset prefix
    pub const EPREFIX: &str = "EPREFIX";
    /// Root the build dependencies are installed into
    pub const SYSROOT: &str = "SYSROOT";
    /// Root packages are merged into
    pub const ROOT: &str = "ROOT";
}

/// Lexically normalize a path: collapse `.` and `..` components and
/// duplicate separators without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    let mut depth = 0usize;

    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth > 0 {
                    out.pop();
                    depth -= 1;
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(name) => {
                out.push(name);
                depth += 1;
            }
        }
    }

    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Resolve symlinks when the path exists, otherwise return the normalized
/// absolute form.
pub fn realpath(path: &Path) -> PathBuf {
    match std::fs::canonicalize(path) {
        Ok(resolved) => resolved,
        Err(_) => normalize_path(&absolute(path)),
    }
}

/// Make a path absolute against the current working directory
pub fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => Path::new("/").join(path),
    }
}

/// Join an absolute prefix onto a base, the way `$ROOT$EPREFIX` composes.
///
/// The prefix's leading separator is dropped; an empty or `/` prefix leaves
/// the base unchanged.
pub fn join_prefixed(base: &Path, prefix: &Path) -> PathBuf {
    let relative = prefix.strip_prefix("/").unwrap_or(prefix);
    if relative.as_os_str().is_empty() {
        base.to_path_buf()
    } else {
        base.join(relative)
    }
}

/// Whether `path` lies at or below `base`, compared component-wise
pub fn is_relative_to(path: &Path, base: &Path) -> bool {
    path.starts_with(base)
}
