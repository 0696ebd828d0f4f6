//! Profile search directories
//!
//! Turns PORTDIR and the shell-quoted PORTDIR_OVERLAY list into the ordered
//! list of `profiles` directories consulted for repository-wide profile
//! data. No inheritance is involved here.

use crate::paths::normalize_path;
use crate::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Ordered profile search directories
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSearchDirs {
    /// `profiles` directories of each overlay that has one
    pub overlay_profiles: Vec<PathBuf>,
    /// Main repository's `profiles` directory followed by the overlays'
    pub profile_locations: Vec<PathBuf>,
    /// `profile_locations` plus the user config directory, when enabled
    pub profile_and_user_locations: Vec<PathBuf>,
}

/// Splits overlay lists into profile search directories
#[derive(Debug, Clone, Default)]
pub struct OverlaySplitter {
    portdir: Option<PathBuf>,
    user_config: Option<PathBuf>,
}

impl OverlaySplitter {
    /// Create a splitter for the given main repository
    pub fn new(portdir: Option<PathBuf>) -> Self {
        Self {
            portdir,
            user_config: None,
        }
    }

    /// Append the user config directory to the combined list
    pub fn with_user_config(mut self, abs_user_config: impl Into<PathBuf>) -> Self {
        self.user_config = Some(abs_user_config.into());
        self
    }

    /// Split `portdir_overlay` and build the search directories
    pub fn split(&self, portdir_overlay: Option<&str>) -> Result<ProfileSearchDirs> {
        let overlays = split_overlay_list(portdir_overlay.unwrap_or(""))?;
        Ok(self.for_overlays(&overlays))
    }

    /// Build the search directories from already split overlay roots
    pub fn for_overlays(&self, overlays: &[PathBuf]) -> ProfileSearchDirs {
        let overlay_profiles: Vec<PathBuf> = overlays
            .iter()
            .map(|ov| ov.join("profiles"))
            .filter(|dir| {
                let keep = dir.is_dir();
                if !keep {
                    debug!("Skipping overlay without profiles: {}", dir.display());
                }
                keep
            })
            .collect();

        let mut profile_locations = Vec::with_capacity(overlay_profiles.len() + 1);
        if let Some(portdir) = &self.portdir {
            profile_locations.push(portdir.join("profiles"));
        }
        profile_locations.extend(overlay_profiles.iter().cloned());

        let mut profile_and_user_locations = profile_locations.clone();
        if let Some(user_config) = &self.user_config {
            profile_and_user_locations.push(user_config.clone());
        }

        ProfileSearchDirs {
            overlay_profiles,
            profile_locations,
            profile_and_user_locations,
        }
    }
}

/// Split a shell-quoted list of repository paths, normalizing each
pub fn split_overlay_list(list: &str) -> Result<Vec<PathBuf>> {
    let tokens = shlex::split(list).ok_or_else(|| {
        ConfigError::Invalid(format!("Unbalanced quoting in overlay list: {}", list))
    })?;
    Ok(tokens
        .iter()
        .map(|t| normalize_path(Path::new(t)))
        .collect())
}
