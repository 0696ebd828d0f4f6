//! Root locations
//!
//! Computes the absolute roots every other lookup is relative to:
//!
//! ```text
//! config_root   where etc/buckos lives (PORTAGE_CONFIGROOT)
//! eprefix       offset prefix, empty for a normal install
//! sysroot       where build dependencies are installed
//! esysroot      sysroot + eprefix
//! target_root   where packages are merged (ROOT)
//! eroot         target_root + eprefix
//! broot         where the build tools themselves live
//! ```
//!
//! Resolution happens in two steps. [`RootLocationsBuilder::resolve`] fixes
//! and validates the config root; the target root is only known once
//! make.conf has been read, so [`ConfigRoot::apply_root_override`] finishes
//! the job.

use crate::paths::{self, absolute, join_prefixed, normalize_path, realpath};
use crate::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Collects location overrides before validation
#[derive(Debug, Clone)]
pub struct RootLocationsBuilder {
    config_root: Option<PathBuf>,
    eprefix: Option<PathBuf>,
    sysroot: Option<PathBuf>,
    target_root: Option<PathBuf>,
    default_eprefix: PathBuf,
}

impl Default for RootLocationsBuilder {
    fn default() -> Self {
        Self {
            config_root: None,
            eprefix: None,
            sysroot: None,
            target_root: None,
            default_eprefix: PathBuf::from(paths::EPREFIX),
        }
    }
}

impl RootLocationsBuilder {
    /// Create a builder with no overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder seeded from the environment
    pub fn from_env() -> Self {
        let var = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
        };

        Self {
            config_root: var(paths::env_vars::CONFIG_ROOT)
                .or_else(|| var(paths::env_vars::PORTAGE_CONFIGROOT)),
            eprefix: var(paths::env_vars::EPREFIX),
            sysroot: var(paths::env_vars::SYSROOT),
            target_root: var(paths::env_vars::ROOT),
            ..Self::default()
        }
    }

    /// Set the configuration root
    pub fn config_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_root = Some(path.into());
        self
    }

    /// Set the offset prefix
    pub fn eprefix(mut self, path: impl Into<PathBuf>) -> Self {
        self.eprefix = Some(path.into());
        self
    }

    /// Set the sysroot
    pub fn sysroot(mut self, path: impl Into<PathBuf>) -> Self {
        self.sysroot = Some(path.into());
        self
    }

    /// Fix the target root; this wins over any make.conf override
    pub fn target_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.target_root = Some(path.into());
        self
    }

    /// Replace the compiled-in default prefix
    pub fn default_eprefix(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_eprefix = path.into();
        self
    }

    /// Normalize the inputs and validate the config root
    pub fn resolve(self) -> Result<ConfigRoot> {
        let eprefix = match self.eprefix {
            None => self.default_eprefix.clone(),
            Some(p) if p.as_os_str().is_empty() => p,
            Some(p) => {
                let p = normalize_path(&p);
                if p == Path::new("/") {
                    PathBuf::new()
                } else {
                    p
                }
            }
        };

        let config_root = match self.config_root {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => join_prefixed(Path::new("/"), &self.default_eprefix),
        };
        let config_root = realpath(&config_root);
        check_var_directory("PORTAGE_CONFIGROOT", &config_root)?;

        let sysroot = match self.sysroot {
            Some(p) if !p.as_os_str().is_empty() => normalize_path(&absolute(&p)),
            _ => PathBuf::from("/"),
        };
        let esysroot = join_prefixed(&sysroot, &eprefix);
        let broot = join_prefixed(Path::new("/"), &self.default_eprefix);

        debug!(
            "Config root {} (eprefix={:?}, sysroot={})",
            config_root.display(),
            eprefix,
            sysroot.display()
        );

        Ok(ConfigRoot {
            abs_user_config: config_root.join(paths::USER_CONFIG_PATH),
            config_root,
            eprefix,
            sysroot,
            esysroot,
            broot,
            target_root: self.target_root,
            default_eprefix: self.default_eprefix,
        })
    }
}

/// Locations known once the config root has been validated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRoot {
    /// Absolute, symlink-resolved configuration root
    pub config_root: PathBuf,
    /// `<config_root>/etc/buckos`
    pub abs_user_config: PathBuf,
    /// Offset prefix, empty for a normal install
    pub eprefix: PathBuf,
    /// Build dependency root
    pub sysroot: PathBuf,
    /// sysroot + eprefix
    pub esysroot: PathBuf,
    /// Build tool root
    pub broot: PathBuf,
    target_root: Option<PathBuf>,
    default_eprefix: PathBuf,
}

impl ConfigRoot {
    /// Fix the target root and derive the remaining locations.
    ///
    /// A target root given to the builder wins over `root_override`. A blank
    /// override counts as unset and the target root defaults to `/`.
    pub fn apply_root_override(self, root_override: Option<&Path>) -> Result<RootLocations> {
        let target_root = self.target_root.clone().or_else(|| {
            root_override
                .filter(|p| !p.to_string_lossy().trim().is_empty())
                .map(Path::to_path_buf)
        });
        let target_root = realpath(&target_root.unwrap_or_else(|| PathBuf::from("/")));

        if self.sysroot != Path::new("/") && self.sysroot != target_root {
            error!(
                "SYSROOT (currently {}) must equal / or ROOT (currently {})",
                self.sysroot.display(),
                target_root.display()
            );
            return Err(ConfigError::InvalidLocation {
                sysroot: self.sysroot,
                target_root,
            });
        }

        ensure_dir(&target_root)?;
        check_var_directory("ROOT", &target_root)?;

        let eroot = join_prefixed(&target_root, &self.eprefix);
        let global_config_path = join_prefixed(
            &join_prefixed(Path::new("/"), &self.default_eprefix),
            Path::new(paths::GLOBAL_CONFIG_PATH),
        );

        Ok(RootLocations {
            config_root: self.config_root,
            abs_user_config: self.abs_user_config,
            eprefix: self.eprefix,
            sysroot: self.sysroot,
            esysroot: self.esysroot,
            target_root,
            eroot,
            broot: self.broot,
            global_config_path,
        })
    }
}

/// Fully resolved root locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootLocations {
    pub config_root: PathBuf,
    pub abs_user_config: PathBuf,
    pub eprefix: PathBuf,
    pub sysroot: PathBuf,
    pub esysroot: PathBuf,
    pub target_root: PathBuf,
    pub eroot: PathBuf,
    pub broot: PathBuf,
    pub global_config_path: PathBuf,
}

impl RootLocations {
    /// The active profile link
    pub fn profile_link(&self) -> PathBuf {
        self.config_root.join(paths::PROFILE_PATH)
    }

    /// The pre-Buckos active profile link
    pub fn deprecated_profile_link(&self) -> PathBuf {
        self.config_root.join(paths::DEPRECATED_PROFILE_PATH)
    }

    /// The user override profile directory
    pub fn custom_profile(&self) -> PathBuf {
        self.config_root.join(paths::CUSTOM_PROFILE_PATH)
    }
}

fn check_var_directory(varname: &str, path: &Path) -> Result<()> {
    if !path.is_dir() {
        error!(
            "{}='{}' is not a directory. Please correct this.",
            varname,
            path.display()
        );
        return Err(ConfigError::DirectoryNotFound(path.to_path_buf()));
    }
    Ok(())
}

fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        debug!("Creating {}", path.display());
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
