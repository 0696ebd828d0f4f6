//! Repository configuration
//!
//! Implements Gentoo-style repos.conf:
//! - Repository definitions and locations
//! - Main repository selection
//! - Per-repository profile format overrides

use crate::error::ParseError;
use crate::layout::{RepoLayout, RepositoryLookup};
use crate::paths::realpath;
use crate::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Repository configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReposConfig {
    /// Default repository settings
    pub defaults: RepoDefaults,
    /// Repository definitions
    pub repos: HashMap<String, Repository>,
}

impl ReposConfig {
    /// Create a new repository configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load repos.conf from a config root, returning an empty configuration
    /// when none exists
    pub fn load(config_root: &Path) -> Result<Self> {
        let path = config_root.join(crate::paths::REPOS_CONF_PATH);
        if path.exists() {
            parse_repos_conf(&path)
        } else {
            Ok(Self::new())
        }
    }

    /// Add a repository
    pub fn add_repo(&mut self, repo: Repository) {
        self.repos.insert(repo.name.clone(), repo);
    }

    /// Look up a repository by name or alias
    pub fn repository(&self, name: &str) -> Option<&Repository> {
        self.repos.get(name).or_else(|| {
            self.repos
                .values()
                .find(|r| r.aliases.iter().any(|a| a == name))
        })
    }

    /// Get all repositories sorted by priority, highest first
    pub fn repos_by_priority(&self) -> Vec<&Repository> {
        let mut repos: Vec<&Repository> = self.repos.values().collect();
        repos.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.name.cmp(&b.name)));
        repos
    }

    /// The repository named by `main-repo`, else the highest priority one
    pub fn main_repo(&self) -> Option<&Repository> {
        match &self.defaults.main_repo {
            Some(name) => self.repository(name),
            None => self.repos_by_priority().into_iter().next(),
        }
    }

    /// Repositories other than the main one, highest priority first
    pub fn overlays(&self) -> Vec<&Repository> {
        let main = self.main_repo().map(|r| r.name.as_str());
        self.repos_by_priority()
            .into_iter()
            .filter(|r| Some(r.name.as_str()) != main)
            .collect()
    }

    /// Locations of every configured repository
    pub fn locations(&self) -> Vec<PathBuf> {
        self.repos_by_priority()
            .into_iter()
            .map(|r| r.location.clone())
            .collect()
    }
}

impl RepositoryLookup for ReposConfig {
    fn layout_for_location(&self, location: &Path) -> Option<RepoLayout> {
        let repo = self
            .repos
            .values()
            .find(|r| realpath(&r.location) == location)?;
        let formats = repo.profile_formats.clone()?;
        Some(RepoLayout::new(
            location,
            formats,
            repo.profile_eapi_when_unspecified.clone(),
        ))
    }

    fn location_for_name(&self, name: &str) -> Option<PathBuf> {
        self.repository(name).map(|r| r.location.clone())
    }
}

/// Default settings for repositories
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoDefaults {
    /// Default main repository
    pub main_repo: Option<String>,
}

/// A single repository definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Repository {
    /// Repository name
    pub name: String,
    /// Local location
    pub location: PathBuf,
    /// Priority (higher = more important)
    pub priority: i32,
    /// Master repositories
    pub masters: Vec<String>,
    /// Repository aliases
    pub aliases: Vec<String>,
    /// Profile formats overriding the repository's layout.conf
    pub profile_formats: Option<Vec<String>>,
    /// Profile EAPI default overriding the repository's layout.conf
    pub profile_eapi_when_unspecified: Option<String>,
}

impl Repository {
    /// Create a new repository
    pub fn new(name: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            ..Default::default()
        }
    }

    /// Set priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Add an alias
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Override the profile formats normally read from layout.conf
    pub fn with_profile_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profile_formats = Some(formats.into_iter().map(Into::into).collect());
        self
    }
}

/// Read a repos.conf file, or every `*.conf` file of a repos.conf directory
/// in name order. Later sections replace earlier ones with the same name.
pub fn parse_repos_conf(path: &Path) -> Result<ReposConfig> {
    let files = if path.is_dir() {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let file = entry?.path();
            if file.is_file() && file.extension().is_some_and(|ext| ext == "conf") {
                files.push(file);
            }
        }
        files.sort();
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut config = ReposConfig::new();
    for file in &files {
        let content = std::fs::read_to_string(file)?;
        parse_repos_conf_content(&content, file, &mut config)?;
    }
    debug!("Read {} repositories from {}", config.repos.len(), path.display());
    Ok(config)
}

/// One `[name]` block of a repos.conf file
struct Section {
    name: String,
    values: HashMap<String, String>,
}

impl Section {
    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn words(&self, key: &str) -> Option<Vec<String>> {
        self.get(key)
            .map(|v| v.split_whitespace().map(str::to_string).collect())
    }
}

fn parse_repos_conf_content(content: &str, file: &Path, config: &mut ReposConfig) -> Result<()> {
    for section in split_sections(content, file)? {
        if section.name == "DEFAULT" {
            if let Some(main) = section.get("main-repo") {
                config.defaults.main_repo = Some(main.to_string());
            }
        } else {
            config.add_repo(section_to_repository(&section)?);
        }
    }
    Ok(())
}

/// Split INI text into sections. Blank lines and `#` comments are skipped;
/// any other line must be a header or a `key = value` pair inside a section.
fn split_sections(content: &str, file: &Path) -> Result<Vec<Section>> {
    let mut sections: Vec<Section> = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            sections.push(Section {
                name: name.trim().to_string(),
                values: HashMap::new(),
            });
            continue;
        }

        let pair = line.split_once('=');
        match (sections.last_mut(), pair) {
            (Some(section), Some((key, value))) => {
                section
                    .values
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
            _ => {
                return Err(ParseError::ReposConf {
                    file: file.to_path_buf(),
                    line: idx + 1,
                    message: format!("unexpected line '{}'", line),
                }
                .into());
            }
        }
    }

    Ok(sections)
}

fn section_to_repository(section: &Section) -> Result<Repository> {
    let location = match section.get("location") {
        Some(l) if !l.is_empty() => l,
        _ => {
            return Err(ConfigError::Invalid(format!(
                "Repository '{}' has no location",
                section.name
            )))
        }
    };

    let mut repo = Repository::new(section.name.as_str(), location);
    if let Some(priority) = section.get("priority") {
        repo.priority = priority.parse().map_err(|_| {
            ConfigError::Invalid(format!(
                "Repository '{}' has invalid priority '{}'",
                section.name, priority
            ))
        })?;
    }
    repo.masters = section.words("masters").unwrap_or_default();
    repo.aliases = section.words("aliases").unwrap_or_default();
    repo.profile_formats = section.words("profile-formats");
    repo.profile_eapi_when_unspecified = section
        .get("profile-eapi-when-unspecified")
        .filter(|e| !e.is_empty())
        .map(str::to_string);

    Ok(repo)
}
