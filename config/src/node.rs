//! Resolved profile nodes and the diagnostics produced while resolving them

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One resolved node in the profile inheritance chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileNode {
    /// Absolute, symlink-resolved profile directory
    pub path: PathBuf,
    /// Whether package.mask, use.force and friends may be directories
    pub allow_directories: bool,
    /// Set only for the local user override profile
    pub is_user_profile: bool,
    /// Profile formats of the owning repository
    pub formats: Vec<String>,
    /// Resolved EAPI. Always set for repository profiles; `None` on the user
    /// profile means no explicit EAPI was given.
    pub eapi: Option<String>,
    /// Whether build-id aware binary packages are enabled
    pub supports_build_id: bool,
    /// Whether deprecation warnings for this node should be shown
    pub show_deprecated_warning: bool,
}

impl ProfileNode {
    /// The node's EAPI, or `"0"` when unspecified
    pub fn eapi_or_default(&self) -> &str {
        self.eapi.as_deref().unwrap_or(crate::eapi::DEFAULT_EAPI)
    }
}

/// Ordered profile nodes, ancestors before descendants.
///
/// Later entries override earlier ones when the stack is merged. The user
/// override profile, when present, is always last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStack {
    nodes: Vec<ProfileNode>,
}

impl ProfileStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes in merge order
    pub fn nodes(&self) -> &[ProfileNode] {
        &self.nodes
    }

    /// Profile directories in merge order
    pub fn paths(&self) -> Vec<&Path> {
        self.nodes.iter().map(|n| n.path.as_path()).collect()
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no profile was resolved
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The user override node, if one was appended
    pub fn user_profile(&self) -> Option<&ProfileNode> {
        self.nodes.last().filter(|n| n.is_user_profile)
    }

    /// Append a node
    pub(crate) fn push(&mut self, node: ProfileNode) {
        self.nodes.push(node);
    }

    /// Append every node of another stack, keeping its order
    pub(crate) fn extend(&mut self, other: ProfileStack) {
        self.nodes.extend(other.nodes);
    }

    /// Iterate over nodes in merge order
    pub fn iter(&self) -> std::slice::Iter<'_, ProfileNode> {
        self.nodes.iter()
    }
}

impl<'a> IntoIterator for &'a ProfileStack {
    type Item = &'a ProfileNode;
    type IntoIter = std::slice::Iter<'a, ProfileNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

/// What a diagnostic is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum DiagnosticKind {
    /// A profile in a portage-1-compat repository uses directories where the
    /// repository only promises flat files
    LegacyDirectoryLayout {
        offenders: Vec<String>,
        repository: Option<PathBuf>,
    },
    /// The profile carries a `deprecated` marker
    DeprecatedProfile { replacement: Option<String> },
    /// Both the current and the deprecated make.profile link exist
    DuplicateProfileLink { ignored: PathBuf },
    /// The profile could not be parsed and an empty stack was used instead
    UnparsableProfile { error: String },
}

/// An advisory produced during resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Kind and kind-specific data
    #[serde(flatten)]
    pub kind: DiagnosticKind,
    /// Profile directory (or link) the diagnostic refers to
    pub path: PathBuf,
}

impl Diagnostic {
    /// Create a diagnostic
    pub fn new(kind: DiagnosticKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::LegacyDirectoryLayout {
                offenders,
                repository,
            } => {
                let repo = repository
                    .as_ref()
                    .map(|r| r.display().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string());
                write!(
                    f,
                    "The selected profile is implicitly using the 'portage-1' format:\n\
                     \tprofile = {}\n\
                     But this repository is not using that format:\n\
                     \trepo = {}\n\
                     This will break in the future.  Please convert these dirs to files:\n\
                     \t{}\n\
                     Or, add this line to the repository's layout.conf:\n\
                     \tprofile-formats = portage-1",
                    self.path.display(),
                    repo,
                    offenders.join("\n\t")
                )
            }
            DiagnosticKind::DeprecatedProfile { replacement } => match replacement {
                Some(r) => write!(
                    f,
                    "Your current profile is deprecated: {}\nPlease upgrade to: {}",
                    self.path.display(),
                    r
                ),
                None => write!(
                    f,
                    "Your current profile is deprecated: {}",
                    self.path.display()
                ),
            },
            DiagnosticKind::DuplicateProfileLink { ignored } => write!(
                f,
                "Found 2 make.profile dirs: using '{}', ignoring '{}'",
                self.path.display(),
                ignored.display()
            ),
            DiagnosticKind::UnparsableProfile { error } => write!(
                f,
                "Unable to parse profile: '{}': {}",
                self.path.display(),
                error
            ),
        }
    }
}
