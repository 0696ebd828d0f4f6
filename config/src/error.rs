//! Error types for configuration operations

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("SYSROOT (currently {sysroot}) must equal / or ROOT (currently {target_root})")]
    InvalidLocation {
        sysroot: PathBuf,
        target_root: PathBuf,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Circular profile inheritance at {path}: {}", format_chain(.chain))]
    CyclicProfile { path: PathBuf, chain: Vec<PathBuf> },
}

impl ConfigError {
    /// Whether the error came from reading profile or repository metadata.
    ///
    /// Parse errors at the top of profile resolution are recoverable outside
    /// of strict mode; everything else aborts the configuration load.
    pub fn is_parse(&self) -> bool {
        matches!(self, ConfigError::Parse(_) | ConfigError::CyclicProfile { .. })
    }
}

/// Errors raised while reading profile trees and repository metadata
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Profile contains unsupported EAPI '{eapi}': '{}'", .file.display())]
    UnsupportedEapi { eapi: String, file: PathBuf },

    #[error("Profile directory not found: '{}'", .0.display())]
    ProfileNotFound(PathBuf),

    #[error("Empty parent file: '{}'", .0.display())]
    EmptyParentFile(PathBuf),

    #[error("Parent '{}' not found: '{}'", .parent.display(), .parent_file.display())]
    ParentNotFound {
        parent: PathBuf,
        parent_file: PathBuf,
    },

    #[error("Parent '{reference}' not found: '{}' (unknown repository)", .parent_file.display())]
    UnknownRepository {
        reference: String,
        parent_file: PathBuf,
    },

    #[error("Parent '{reference}' not found: '{}' (profile is outside any repository)", .parent_file.display())]
    NoCurrentRepository {
        reference: String,
        parent_file: PathBuf,
    },

    #[error("{}:{line}: {message}", .file.display())]
    ReposConf {
        file: PathBuf,
        line: usize,
        message: String,
    },
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Result type alias for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_errors_are_recoverable() {
        let err: ConfigError = ParseError::EmptyParentFile(PathBuf::from("/p/parent")).into();
        assert!(err.is_parse());

        let err = ConfigError::DirectoryNotFound(PathBuf::from("/missing"));
        assert!(!err.is_parse());
    }

    #[test]
    fn test_cycle_message_lists_chain() {
        let err = ConfigError::CyclicProfile {
            path: PathBuf::from("/a"),
            chain: vec![PathBuf::from("/a"), PathBuf::from("/b"), PathBuf::from("/a")],
        };
        assert_eq!(
            err.to_string(),
            "Circular profile inheritance at /a: /a -> /b -> /a"
        );
    }

    #[test]
    fn test_parent_not_found_names_both_paths() {
        let err = ParseError::ParentNotFound {
            parent: PathBuf::from("/repo/profiles/missing"),
            parent_file: PathBuf::from("/repo/profiles/p/parent"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/repo/profiles/missing"));
        assert!(msg.contains("/repo/profiles/p/parent"));
    }
}
