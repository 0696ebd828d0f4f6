//! Repository layout metadata
//!
//! Each repository describes in `metadata/layout.conf` which profile formats
//! it uses and which EAPI its profiles default to. Profile resolution looks
//! these up by path: a profile directory belongs to the innermost known
//! repository whose location contains it.

use crate::eapi::EapiPolicy;
use crate::paths::{is_relative_to, realpath};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Format tag enabling `repo:path` references in parent files
pub const FORMAT_PORTAGE_2: &str = "portage-2";

/// Format tag declaring directory-style profile entries
pub const FORMAT_PORTAGE_1: &str = "portage-1";

/// Format tag for repositories that predate the portage-1 declaration
pub const FORMAT_PORTAGE_1_COMPAT: &str = "portage-1-compat";

/// Format tag enabling build-id aware binary packages
pub const FORMAT_BUILD_ID: &str = "build-id";

/// Formats that permit directories in place of flat profile files
pub const DIRECTORY_FORMATS: &[&str] = &[
    FORMAT_PORTAGE_1_COMPAT,
    FORMAT_PORTAGE_1,
    FORMAT_PORTAGE_2,
];

/// Formats that permit colon references in parent files
pub const PARENT_COLON_FORMATS: &[&str] = &[FORMAT_PORTAGE_2];

/// Layout of a single repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoLayout {
    /// Absolute, symlink-resolved repository root
    pub location: PathBuf,
    /// Declared `profile-formats`, in file order
    pub profile_formats: Vec<String>,
    /// `profile_eapi_when_unspecified`, if declared
    pub default_eapi: Option<String>,
}

impl RepoLayout {
    /// Create a layout record
    pub fn new(
        location: impl Into<PathBuf>,
        profile_formats: Vec<String>,
        default_eapi: Option<String>,
    ) -> Self {
        Self {
            location: location.into(),
            profile_formats,
            default_eapi,
        }
    }

    /// Check whether a format tag is declared
    pub fn has_format(&self, format: &str) -> bool {
        self.profile_formats.iter().any(|f| f == format)
    }

    /// Whether any declared format permits directory-style profile entries
    pub fn allows_directories(&self) -> bool {
        self.profile_formats
            .iter()
            .any(|f| DIRECTORY_FORMATS.contains(&f.as_str()))
    }

    /// Whether parent files may use `repo:path` references
    pub fn allows_parent_colon(&self) -> bool {
        self.profile_formats
            .iter()
            .any(|f| PARENT_COLON_FORMATS.contains(&f.as_str()))
    }

    /// Whether the repository declares exactly the legacy compat format
    pub fn is_compat_only(&self) -> bool {
        self.profile_formats.len() == 1 && self.profile_formats[0] == FORMAT_PORTAGE_1_COMPAT
    }

    /// Read `metadata/layout.conf` under a repository root
    pub fn load(location: &Path, eapi: &dyn EapiPolicy) -> Result<Self> {
        let layout_conf = location.join("metadata").join("layout.conf");
        let entries = if layout_conf.is_file() {
            match std::fs::read_to_string(&layout_conf) {
                Ok(content) => parse_layout_conf(&content, &layout_conf),
                Err(e) => {
                    warn!("Unable to read {}: {}", layout_conf.display(), e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let lookup = |key: &str| {
            entries
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };

        let profile_formats = match lookup("profile-formats") {
            Some(raw) => raw.split_whitespace().map(|s| s.to_string()).collect(),
            None => {
                // Without a declaration, the repository's own profiles EAPI
                // decides whether directories are implied.
                let repo_eapi = read_eapi_file(&location.join("profiles"))?;
                let implied = match repo_eapi {
                    Some(ref e) if eapi.allows_profile_directories(e) => FORMAT_PORTAGE_1,
                    _ => FORMAT_PORTAGE_1_COMPAT,
                };
                vec![implied.to_string()]
            }
        };

        let default_eapi = lookup("profile_eapi_when_unspecified")
            .or_else(|| lookup("profile-eapi-when-unspecified"))
            .filter(|e| !e.is_empty());

        debug!(
            "Layout for {}: formats={:?} default_eapi={:?}",
            location.display(),
            profile_formats,
            default_eapi
        );

        Ok(Self {
            location: location.to_path_buf(),
            profile_formats,
            default_eapi,
        })
    }
}

/// Parse layout.conf content into ordered key/value pairs.
///
/// Lines that are not `key = value` are skipped with a warning; the valid
/// keys of the file still apply.
fn parse_layout_conf(content: &str, file: &Path) -> Vec<(String, String)> {
    let mut entries = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some(eq_idx) = line.find('=') else {
            warn!(
                "{}:{}: expected 'key = value', found '{}'",
                file.display(),
                idx + 1,
                line
            );
            continue;
        };

        let key = line[..eq_idx].trim().to_string();
        let value = line[eq_idx + 1..]
            .trim()
            .trim_matches('"')
            .trim_matches('\'')
            .to_string();
        entries.push((key, value));
    }

    entries
}

/// Read the first line of an `eapi` marker file in `dir`, trimmed
pub fn read_eapi_file(dir: &Path) -> Result<Option<String>> {
    let eapi_file = dir.join("eapi");
    if !eapi_file.is_file() {
        return Ok(None);
    }

    let bytes = std::fs::read(&eapi_file)?;
    let content = String::from_utf8_lossy(&bytes);
    Ok(Some(content.lines().next().unwrap_or("").trim().to_string()))
}

/// Lookups the resolver needs from the configured repositories
pub trait RepositoryLookup {
    /// Layout of the configured repository rooted at `location`, if any
    fn layout_for_location(&self, location: &Path) -> Option<RepoLayout>;

    /// Location of the repository called `name`, if configured
    fn location_for_name(&self, name: &str) -> Option<PathBuf>;
}

/// Read-only index of known repository layouts, built before resolution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryLayoutIndex {
    repos: Vec<RepoLayout>,
}

impl RepositoryLayoutIndex {
    /// Create an index from already-resolved layouts
    pub fn new(mut repos: Vec<RepoLayout>) -> Self {
        repos.sort_by(|a, b| a.location.cmp(&b.location));
        repos.dedup_by(|a, b| a.location == b.location);
        Self { repos }
    }

    /// Build the index for a set of known repository paths.
    ///
    /// Paths are symlink-resolved and de-duplicated. A configured repository
    /// supplies its own layout; any other path is read from its
    /// `metadata/layout.conf`.
    pub fn build<I, P>(
        paths: I,
        repositories: &dyn RepositoryLookup,
        eapi: &dyn EapiPolicy,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let locations: BTreeSet<PathBuf> =
            paths.into_iter().map(|p| realpath(p.as_ref())).collect();

        let mut repos = Vec::with_capacity(locations.len());
        for location in locations {
            let layout = match repositories.layout_for_location(&location) {
                Some(mut layout) => {
                    layout.location = location;
                    layout
                }
                None => RepoLayout::load(&location, eapi)?,
            };
            repos.push(layout);
        }

        Ok(Self::new(repos))
    }

    /// All known layouts, ordered by location
    pub fn repos(&self) -> &[RepoLayout] {
        &self.repos
    }

    /// Number of known repositories
    pub fn len(&self) -> usize {
        self.repos.len()
    }

    /// Whether no repositories are known
    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    /// Every known repository whose location contains `path`
    pub fn intersecting(&self, path: &Path) -> Vec<&RepoLayout> {
        self.repos
            .iter()
            .filter(|r| is_relative_to(path, &r.location))
            .collect()
    }

    /// The innermost repository containing `path`
    pub fn attribute(&self, path: &Path) -> Option<&RepoLayout> {
        self.intersecting(path)
            .into_iter()
            .max_by_key(|r| r.location.components().count())
    }
}
