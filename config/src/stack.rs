//! Profile stack assembly
//!
//! Picks the active profile directory, resolves its inheritance chain and
//! appends the user override profile from `etc/buckos/profile`.

use crate::eapi::{EapiPolicy, StandardEapi};
use crate::layout::{read_eapi_file, RepositoryLayoutIndex, RepositoryLookup};
use crate::locations::RootLocations;
use crate::node::{Diagnostic, DiagnosticKind, ProfileNode, ProfileStack};
use crate::paths::realpath;
use crate::resolver::{ProfileResolver, Resolution};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Formats the user override profile supports
pub const USER_PROFILE_FORMATS: &[&str] = &["profile-bashrcs", "profile-set"];

/// Result of loading the profile stack
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadedProfiles {
    /// The selected top-level profile directory, if any
    pub profile_path: Option<PathBuf>,
    /// Resolved nodes in merge order
    pub stack: ProfileStack,
    /// The user override directory, when it was appended
    pub user_profile_dir: Option<PathBuf>,
    /// Advisories collected along the way
    pub diagnostics: Vec<Diagnostic>,
}

/// Builds the profile stack for a set of root locations
pub struct ProfileStackBuilder<'a> {
    locations: &'a RootLocations,
    repositories: &'a dyn RepositoryLookup,
    eapi: &'a dyn EapiPolicy,
    profile_path: Option<PathBuf>,
    local_config: bool,
    strict: bool,
    log_diagnostics: bool,
}

impl<'a> ProfileStackBuilder<'a> {
    /// Create a builder with user configuration enabled
    pub fn new(locations: &'a RootLocations, repositories: &'a dyn RepositoryLookup) -> Self {
        Self {
            locations,
            repositories,
            eapi: &StandardEapi,
            profile_path: None,
            local_config: true,
            strict: false,
            log_diagnostics: true,
        }
    }

    /// Use this profile directory instead of the make.profile link.
    ///
    /// An empty path selects no profile at all.
    pub fn profile_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.profile_path = Some(path.into());
        self
    }

    /// Whether the user override profile may be appended
    pub fn local_config(mut self, enabled: bool) -> Self {
        self.local_config = enabled;
        self
    }

    /// Propagate profile parse errors instead of falling back to an empty
    /// stack
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Whether diagnostics are also emitted as warnings
    pub fn log_diagnostics(mut self, enabled: bool) -> Self {
        self.log_diagnostics = enabled;
        self
    }

    /// Use different EAPI rules
    pub fn with_eapi_policy(mut self, eapi: &'a dyn EapiPolicy) -> Self {
        self.eapi = eapi;
        self
    }

    /// Select the active profile and build its stack.
    ///
    /// `known_repository_paths` are the repository roots used to attribute
    /// profile directories to repositories.
    pub fn load<I, P>(&self, known_repository_paths: I) -> Result<LoadedProfiles>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let index =
            RepositoryLayoutIndex::build(known_repository_paths, self.repositories, self.eapi)?;
        debug!("Indexed {} repositories", index.len());

        let mut loaded = LoadedProfiles::default();
        let profile_path = self.select_profile_path(&mut loaded.diagnostics);

        if let Some(path) = &profile_path {
            let resolver =
                ProfileResolver::new(&index, self.repositories).with_eapi_policy(self.eapi);
            match resolver.resolve(&realpath(path)) {
                Ok(Resolution { stack, diagnostics }) => {
                    loaded.stack = stack;
                    loaded.diagnostics.extend(diagnostics);
                }
                Err(e) if e.is_parse() && !self.strict => {
                    loaded.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::UnparsableProfile {
                            error: e.to_string(),
                        },
                        path,
                    ));
                }
                Err(e) => return Err(e),
            }
        }
        loaded.profile_path = profile_path;

        if self.local_config && !loaded.stack.is_empty() {
            if let Some(node) = self.user_profile()? {
                loaded.user_profile_dir = Some(node.path.clone());
                loaded.stack.push(node);
            }
        }

        if self.log_diagnostics {
            for diag in &loaded.diagnostics {
                warn!("{}", diag);
            }
        }

        info!(
            "Resolved {} profile(s) from {}",
            loaded.stack.len(),
            loaded
                .profile_path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<none>".to_string())
        );

        Ok(loaded)
    }

    /// Pick the top-level profile directory.
    ///
    /// An explicit path wins. Otherwise `etc/buckos/make.profile` is
    /// preferred over the deprecated `etc/make.profile`.
    fn select_profile_path(&self, diagnostics: &mut Vec<Diagnostic>) -> Option<PathBuf> {
        if let Some(path) = &self.profile_path {
            if path.as_os_str().is_empty() {
                return None;
            }
            return Some(path.clone());
        }

        let current = self.locations.profile_link();
        let deprecated = self.locations.deprecated_profile_link();

        if current.is_dir() {
            if deprecated.is_dir() && !same_file(&current, &deprecated) {
                // Identical links are kept for backward compatibility with old
                // tools and do not warrant a warning.
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::DuplicateProfileLink {
                        ignored: deprecated,
                    },
                    &current,
                ));
            }
            Some(current)
        } else if deprecated.is_dir() {
            Some(deprecated)
        } else {
            None
        }
    }

    /// The user override profile node, if its directory exists
    fn user_profile(&self) -> Result<Option<ProfileNode>> {
        let custom = self.locations.custom_profile();
        if !custom.exists() {
            return Ok(None);
        }

        // No EAPI fallback: an unset EAPI lets the merge stage accept things
        // like wildcard atoms.
        let eapi = read_eapi_file(&custom)?;

        Ok(Some(ProfileNode {
            path: custom,
            allow_directories: true,
            is_user_profile: true,
            formats: USER_PROFILE_FORMATS.iter().map(|s| s.to_string()).collect(),
            eapi,
            supports_build_id: true,
            show_deprecated_warning: false,
        }))
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locations::RootLocationsBuilder;
    use crate::repos::ReposConfig;
    use crate::ConfigError;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn locations(temp: &TempDir) -> RootLocations {
        let root = realpath(temp.path());
        RootLocationsBuilder::new()
            .config_root(&root)
            .target_root(&root)
            .resolve()
            .unwrap()
            .apply_root_override(None)
            .unwrap()
    }

    #[test]
    fn test_no_profile_selected() {
        let temp = TempDir::new().unwrap();
        let locations = locations(&temp);
        let repos = ReposConfig::new();

        let loaded = ProfileStackBuilder::new(&locations, &repos)
            .load(Vec::<PathBuf>::new())
            .unwrap();
        assert!(loaded.profile_path.is_none());
        assert!(loaded.stack.is_empty());
        assert!(loaded.user_profile_dir.is_none());
    }

    #[test]
    fn test_empty_explicit_path_means_no_profile() {
        let temp = TempDir::new().unwrap();
        let locations = locations(&temp);
        std::fs::create_dir_all(locations.profile_link()).unwrap();
        let repos = ReposConfig::new();

        let loaded = ProfileStackBuilder::new(&locations, &repos)
            .profile_path("")
            .load(Vec::<PathBuf>::new())
            .unwrap();
        assert!(loaded.profile_path.is_none());
        assert!(loaded.stack.is_empty());
    }

    #[test]
    fn test_duplicate_profile_links() {
        let temp = TempDir::new().unwrap();
        let locations = locations(&temp);
        std::fs::create_dir_all(locations.profile_link()).unwrap();
        std::fs::create_dir_all(locations.deprecated_profile_link()).unwrap();
        let repos = ReposConfig::new();

        let loaded = ProfileStackBuilder::new(&locations, &repos)
            .log_diagnostics(false)
            .load(Vec::<PathBuf>::new())
            .unwrap();
        assert_eq!(loaded.profile_path, Some(locations.profile_link()));
        assert_matches!(
            loaded.diagnostics[0].kind,
            DiagnosticKind::DuplicateProfileLink { .. }
        );
    }

    #[test]
    fn test_deprecated_link_used_alone() {
        let temp = TempDir::new().unwrap();
        let locations = locations(&temp);
        std::fs::create_dir_all(locations.deprecated_profile_link()).unwrap();
        let repos = ReposConfig::new();

        let loaded = ProfileStackBuilder::new(&locations, &repos)
            .load(Vec::<PathBuf>::new())
            .unwrap();
        assert_eq!(loaded.profile_path, Some(locations.deprecated_profile_link()));
        assert!(loaded.diagnostics.is_empty());
        assert_eq!(loaded.stack.len(), 1);
    }

    #[test]
    fn test_parse_failure_fallback_and_strict() {
        let temp = TempDir::new().unwrap();
        let locations = locations(&temp);
        let profile = locations.profile_link();
        std::fs::create_dir_all(&profile).unwrap();
        std::fs::write(profile.join("parent"), "\n").unwrap();
        std::fs::create_dir_all(locations.custom_profile()).unwrap();
        let repos = ReposConfig::new();

        let loaded = ProfileStackBuilder::new(&locations, &repos)
            .log_diagnostics(false)
            .load(Vec::<PathBuf>::new())
            .unwrap();
        assert!(loaded.stack.is_empty());
        assert!(loaded.user_profile_dir.is_none());
        assert_matches!(
            loaded.diagnostics[0].kind,
            DiagnosticKind::UnparsableProfile { .. }
        );

        let err = ProfileStackBuilder::new(&locations, &repos)
            .strict(true)
            .load(Vec::<PathBuf>::new())
            .unwrap_err();
        assert_matches!(err, ConfigError::Parse(_));
    }

    #[test]
    fn test_user_profile_appended_last() {
        let temp = TempDir::new().unwrap();
        let locations = locations(&temp);
        std::fs::create_dir_all(locations.profile_link()).unwrap();
        let custom = locations.custom_profile();
        std::fs::create_dir_all(&custom).unwrap();
        std::fs::write(custom.join("eapi"), "8\n").unwrap();
        let repos = ReposConfig::new();

        let loaded = ProfileStackBuilder::new(&locations, &repos)
            .load(Vec::<PathBuf>::new())
            .unwrap();
        assert_eq!(loaded.stack.len(), 2);
        let user = loaded.stack.user_profile().unwrap();
        assert_eq!(user.path, custom);
        assert_eq!(user.eapi.as_deref(), Some("8"));
        assert!(user.allow_directories);
        assert!(!user.show_deprecated_warning);
        assert_eq!(user.formats, vec!["profile-bashrcs", "profile-set"]);
        assert_eq!(loaded.user_profile_dir, Some(custom.clone()));

        let loaded = ProfileStackBuilder::new(&locations, &repos)
            .local_config(false)
            .load(Vec::<PathBuf>::new())
            .unwrap();
        assert_eq!(loaded.stack.len(), 1);
        assert!(loaded.stack.user_profile().is_none());
    }
}
