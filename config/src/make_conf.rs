//! Location settings from the global make.conf
//!
//! Only the keys that influence where profiles are looked up are read here;
//! the rest of make.conf belongs to the later merge stage and is ignored.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Location-related make.conf settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MakeConf {
    /// ROOT override, used when the caller did not fix the target root
    pub root: Option<PathBuf>,
    /// Main repository location (PORTDIR)
    pub portdir: Option<PathBuf>,
    /// Extra repository locations, shell-quoted (PORTDIR_OVERLAY)
    pub portdir_overlay: Option<String>,
}

impl MakeConf {
    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `etc/buckos/make.conf` under a config root, or defaults if absent
    pub fn load_from_root(config_root: &Path) -> Result<Self> {
        let path = config_root.join(crate::paths::MAKE_CONF_PATH);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}
