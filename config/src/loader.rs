//! Configuration loading utilities
//!
//! Ties the pieces together the way the package manager does at startup:
//! validate the config root, read make.conf, fix the target root, read
//! repos.conf, then build the profile search directories and the profile
//! stack.

use crate::locations::{RootLocations, RootLocationsBuilder};
use crate::make_conf::MakeConf;
use crate::overlay::{split_overlay_list, OverlaySplitter, ProfileSearchDirs};
use crate::repos::{ReposConfig, Repository};
use crate::stack::{LoadedProfiles, ProfileStackBuilder};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Everything profile-related known after a configuration load
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileEnvironment {
    /// Validated root locations
    pub locations: RootLocations,
    /// Location settings from make.conf
    pub make_conf: MakeConf,
    /// Configured repositories
    pub repos: ReposConfig,
    /// Main repository location, if known
    pub portdir: Option<PathBuf>,
    /// Profile search directories
    pub search_dirs: ProfileSearchDirs,
    /// Resolved profile stack
    pub profiles: LoadedProfiles,
}

/// Loader for the profile environment
pub struct ProfileLoader {
    roots: RootLocationsBuilder,
    profile_path: Option<PathBuf>,
    local_config: bool,
    strict: bool,
    extra_repos: Vec<Repository>,
}

impl ProfileLoader {
    /// Create a loader for the given root overrides
    pub fn new(roots: RootLocationsBuilder) -> Self {
        Self {
            roots,
            profile_path: None,
            local_config: true,
            strict: false,
            extra_repos: Vec::new(),
        }
    }

    /// Create a loader seeded from the environment
    pub fn system() -> Self {
        Self::new(RootLocationsBuilder::from_env())
    }

    /// Resolve this profile instead of the make.profile link
    pub fn profile_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.profile_path = Some(path.into());
        self
    }

    /// Set whether user configuration is honoured
    pub fn local_config(mut self, enabled: bool) -> Self {
        self.local_config = enabled;
        self
    }

    /// Set whether profile parse errors are fatal
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Add a repository on top of repos.conf
    pub fn repository(mut self, repo: Repository) -> Self {
        self.extra_repos.push(repo);
        self
    }

    /// Load the complete profile environment
    pub fn load(self) -> Result<ProfileEnvironment> {
        let config_root = self.roots.resolve()?;
        let make_conf = MakeConf::load_from_root(&config_root.config_root)?;
        let locations = config_root.apply_root_override(make_conf.root.as_deref())?;

        let mut repos = ReposConfig::load(&locations.config_root)?;
        for repo in self.extra_repos {
            repos.add_repo(repo);
        }

        let portdir = make_conf
            .portdir
            .clone()
            .or_else(|| repos.main_repo().map(|r| r.location.clone()));

        let overlays = match &make_conf.portdir_overlay {
            Some(list) => split_overlay_list(list)?,
            None => repos
                .overlays()
                .into_iter()
                .map(|r| r.location.clone())
                .collect(),
        };
        debug!("PORTDIR={:?} overlays={:?}", portdir, overlays);

        let mut splitter = OverlaySplitter::new(portdir.clone());
        if self.local_config {
            splitter = splitter.with_user_config(&locations.abs_user_config);
        }
        let search_dirs = splitter.for_overlays(&overlays);

        let mut known: Vec<PathBuf> = portdir.iter().cloned().collect();
        known.extend(overlays);
        known.extend(repos.locations());
        known.retain(|p| p.is_dir());

        let mut builder = ProfileStackBuilder::new(&locations, &repos)
            .local_config(self.local_config)
            .strict(self.strict);
        if let Some(path) = self.profile_path {
            builder = builder.profile_path(path);
        }
        let profiles = builder.load(&known)?;

        Ok(ProfileEnvironment {
            locations,
            make_conf,
            repos,
            portdir,
            search_dirs,
            profiles,
        })
    }
}

/// Load the profile environment for the running system
pub fn load_system_profiles() -> Result<ProfileEnvironment> {
    ProfileLoader::system().load()
}
