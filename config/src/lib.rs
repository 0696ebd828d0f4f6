//! Buckos Profile Configuration
//!
//! This crate resolves the layered profile configuration of a Buckos
//! system, following the layout of Gentoo's /etc/portage.
//!
//! # Overview
//!
//! - [`locations`]: Root locations (config root, prefix, sysroot, target root)
//! - [`make_conf`]: Location settings from make.conf
//! - [`repos`]: Repository configuration (repos.conf)
//! - [`layout`]: Per-repository profile formats and the repository index
//! - [`eapi`]: EAPI support rules
//! - [`resolver`]: Profile inheritance through `parent` files
//! - [`stack`]: Active profile selection and user profile handling
//! - [`overlay`]: Profile search directories from the overlay list
//! - [`loader`]: Configuration loading utilities
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use buckos_config::ProfileLoader;
//!
//! let env = ProfileLoader::system().load().unwrap();
//! for node in &env.profiles.stack {
//!     println!("{} (EAPI {})", node.path.display(), node.eapi_or_default());
//! }
//! ```
//!
//! # Configuration Structure
//!
//! ```text
//! /etc/buckos/
//! ├── make.conf              # root, portdir, portdir_overlay
//! ├── make.profile -> ...    # Active profile
//! ├── profile/               # User profile overrides
//! └── repos.conf             # Repository configuration
//! ```

pub mod eapi;
pub mod error;
pub mod layout;
pub mod loader;
pub mod locations;
pub mod make_conf;
pub mod node;
pub mod overlay;
pub mod paths;
pub mod repos;
pub mod resolver;
pub mod stack;

pub use eapi::{EapiPolicy, StandardEapi, DEFAULT_EAPI};
pub use error::{ConfigError, ParseError, Result};
pub use layout::{RepoLayout, RepositoryLayoutIndex, RepositoryLookup};
pub use loader::{load_system_profiles, ProfileEnvironment, ProfileLoader};
pub use locations::{ConfigRoot, RootLocations, RootLocationsBuilder};
pub use make_conf::MakeConf;
pub use node::{Diagnostic, DiagnosticKind, ProfileNode, ProfileStack};
pub use overlay::{split_overlay_list, OverlaySplitter, ProfileSearchDirs};
pub use repos::{RepoDefaults, ReposConfig, Repository};
pub use resolver::{expand_parent_colon, ProfileResolver, Resolution};
pub use stack::{LoadedProfiles, ProfileStackBuilder};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ConfigError, Diagnostic, LoadedProfiles, MakeConf, ParseError, ProfileEnvironment,
        ProfileLoader, ProfileNode, ProfileStack, ProfileStackBuilder, ReposConfig, Repository,
        Result, RootLocations, RootLocationsBuilder,
    };
}
