//! Profile inheritance resolution
//!
//! A profile directory may list parent profiles in a `parent` file. Parents
//! are resolved depth-first in file order, so the stack for a profile is
//! the stack of its first parent, then the stack of its second parent, and
//! so on, followed by the profile itself.
//!
//! Each node is attributed to the innermost known repository containing it.
//! That repository's layout and the node's EAPI decide whether
//! directory-style entries are allowed and whether parent references may use
//! the `repo:path` syntax.
//!
//! Resolution never logs. Advisories are returned as [`Diagnostic`]s and
//! the caller decides what to do with them.

use crate::eapi::{EapiPolicy, StandardEapi, DEFAULT_EAPI};
use crate::error::ParseError;
use crate::layout::{
    read_eapi_file, RepoLayout, RepositoryLayoutIndex, RepositoryLookup, FORMAT_BUILD_ID,
};
use crate::node::{Diagnostic, DiagnosticKind, ProfileNode, ProfileStack};
use crate::paths::{normalize_path, realpath};
use crate::{ConfigError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Profile entries that portage-1 allowed to be directories
pub const PORTAGE1_DIRECTORIES: &[&str] = &[
    "package.mask",
    "package.provided",
    "package.use",
    "package.use.mask",
    "package.use.force",
    "use.mask",
    "use.force",
];

/// Output of a resolution pass
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Resolved nodes, ancestors first
    pub stack: ProfileStack,
    /// Advisories raised while walking the tree
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    fn append(&mut self, other: Resolution) {
        self.stack.extend(other.stack);
        self.diagnostics.extend(other.diagnostics);
    }
}

/// Walks a profile's parent graph
pub struct ProfileResolver<'a> {
    index: &'a RepositoryLayoutIndex,
    repositories: &'a dyn RepositoryLookup,
    eapi: &'a dyn EapiPolicy,
}

impl<'a> ProfileResolver<'a> {
    /// Create a resolver over a prebuilt layout index
    pub fn new(index: &'a RepositoryLayoutIndex, repositories: &'a dyn RepositoryLookup) -> Self {
        Self {
            index,
            repositories,
            eapi: &StandardEapi,
        }
    }

    /// Use different EAPI rules
    pub fn with_eapi_policy(mut self, eapi: &'a dyn EapiPolicy) -> Self {
        self.eapi = eapi;
        self
    }

    /// Resolve the full stack for the profile at `start`
    pub fn resolve(&self, start: &Path) -> Result<Resolution> {
        if !start.is_dir() {
            return Err(ParseError::ProfileNotFound(start.to_path_buf()).into());
        }
        self.visit(start, &[], &[])
    }

    fn visit(
        &self,
        current: &Path,
        previous_repos: &[PathBuf],
        ancestors: &[PathBuf],
    ) -> Result<Resolution> {
        // Files are read and parents joined through the path as reached, so a
        // symlinked profile keeps `..` inside the repository tree. The
        // resolved path is only used for attribution and identity.
        let dir = normalize_path(current);
        let path = realpath(&dir);

        if ancestors.contains(&path) {
            let mut chain = ancestors.to_vec();
            chain.push(path.clone());
            return Err(ConfigError::CyclicProfile { path, chain });
        }
        let mut descent = ancestors.to_vec();
        descent.push(path.clone());

        let intersecting: Vec<PathBuf> = self
            .index
            .intersecting(&path)
            .into_iter()
            .map(|r| r.location.clone())
            .collect();
        let repo = self.index.attribute(&path);

        let eapi = self.resolve_eapi(&dir, repo)?;
        let eapi_allows_dirs = self.eapi.allows_profile_directories(&eapi);

        let (allow_directories, compat_mode, allow_parent_colon, formats) = match repo {
            Some(layout) => (
                eapi_allows_dirs || layout.allows_directories(),
                !eapi_allows_dirs && layout.is_compat_only(),
                layout.allows_parent_colon(),
                layout.profile_formats.clone(),
            ),
            None => (true, false, true, Vec::new()),
        };

        // A deprecation warning is not inherited: only crossing into a
        // different repository makes it relevant again.
        let show_deprecated_warning = previous_repos != intersecting.as_slice();

        debug!(
            "Visiting profile {} (repo={:?}, eapi={}, compat={})",
            path.display(),
            repo.map(|r| &r.location),
            eapi,
            compat_mode
        );

        let mut resolution = Resolution::default();

        if show_deprecated_warning {
            if compat_mode {
                let offenders = legacy_directories(&dir);
                if !offenders.is_empty() {
                    resolution.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::LegacyDirectoryLayout {
                            offenders,
                            repository: repo.map(|r| r.location.clone()),
                        },
                        &path,
                    ));
                }
            }
            if let Some(diag) = deprecation_notice(&dir, &path) {
                resolution.diagnostics.push(diag);
            }
        }

        let parent_file = dir.join("parent");
        if parent_file.exists() {
            let parents = read_parent_file(&parent_file)?;
            if parents.is_empty() {
                return Err(ParseError::EmptyParentFile(parent_file).into());
            }

            for reference in &parents {
                let reference = if !reference.starts_with('/') && allow_parent_colon {
                    expand_parent_colon(
                        &parent_file,
                        reference,
                        repo.map(|r| r.location.as_path()),
                        self.repositories,
                    )?
                } else {
                    PathBuf::from(reference)
                };

                // Joining an absolute reference discards the base.
                let parent = normalize_path(&dir.join(reference));

                if !parent.exists() {
                    return Err(ParseError::ParentNotFound {
                        parent,
                        parent_file: parent_file.clone(),
                    }
                    .into());
                }

                let inherited = self.visit(&parent, &intersecting, &descent)?;
                resolution.append(inherited);
            }
        }

        resolution.stack.push(ProfileNode {
            supports_build_id: formats.iter().any(|f| f == FORMAT_BUILD_ID),
            path,
            allow_directories,
            is_user_profile: false,
            formats,
            eapi: Some(eapi),
            show_deprecated_warning,
        });

        Ok(resolution)
    }

    /// EAPI precedence: the profile's `eapi` file, then the repository
    /// default, then "0". Only an explicit `eapi` file is validated.
    fn resolve_eapi(&self, path: &Path, repo: Option<&RepoLayout>) -> Result<String> {
        match read_eapi_file(path)? {
            Some(eapi) => {
                if !self.eapi.is_supported(&eapi) {
                    return Err(ParseError::UnsupportedEapi {
                        eapi,
                        file: realpath(&path.join("eapi")),
                    }
                    .into());
                }
                Ok(eapi)
            }
            None => Ok(repo
                .and_then(|r| r.default_eapi.clone())
                .unwrap_or_else(|| DEFAULT_EAPI.to_string())),
        }
    }
}

/// Expand a `repo:path` or `:path` parent reference.
///
/// A reference without a colon is returned unchanged. `:path` is anchored at
/// the current repository's `profiles` directory and `name:path` at the
/// `profiles` directory of the named repository.
pub fn expand_parent_colon(
    parent_file: &Path,
    reference: &str,
    repo_location: Option<&Path>,
    repositories: &dyn RepositoryLookup,
) -> Result<PathBuf> {
    let Some(colon) = reference.find(':') else {
        return Ok(PathBuf::from(reference));
    };

    let subpath = &reference[colon + 1..];
    let base = if colon == 0 {
        repo_location
            .map(Path::to_path_buf)
            .ok_or_else(|| ParseError::NoCurrentRepository {
                reference: reference.to_string(),
                parent_file: parent_file.to_path_buf(),
            })?
    } else {
        repositories
            .location_for_name(&reference[..colon])
            .ok_or_else(|| ParseError::UnknownRepository {
                reference: reference.to_string(),
                parent_file: parent_file.to_path_buf(),
            })?
    };

    Ok(normalize_path(&base.join("profiles").join(subpath)))
}

/// Read a parent file: trimmed, non-empty, non-comment lines in order
fn read_parent_file(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// portage-1 entries that exist as directories under `dir`, sorted.
///
/// Advisory only: an unreadable directory yields no offenders.
fn legacy_directories(dir: &Path) -> Vec<String> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Skipping legacy layout check of {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut offenders: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| PORTAGE1_DIRECTORIES.contains(&name.as_str()))
        .collect();
    offenders.sort();
    offenders
}

/// Build a deprecation diagnostic from a `deprecated` marker file.
///
/// The first line names the replacement profile. The diagnostic is reported
/// against `node_path`; an unreadable marker yields none.
fn deprecation_notice(dir: &Path, node_path: &Path) -> Option<Diagnostic> {
    let marker = dir.join("deprecated");
    if !marker.is_file() {
        return None;
    }

    let bytes = match std::fs::read(&marker) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Unable to read {}: {}", marker.display(), e);
            return None;
        }
    };
    let content = String::from_utf8_lossy(&bytes);
    let replacement = content
        .lines()
        .next()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string);

    Some(Diagnostic::new(
        DiagnosticKind::DeprecatedProfile { replacement },
        node_path,
    ))
}
