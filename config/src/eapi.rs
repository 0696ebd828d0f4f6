//! EAPI capability queries
//!
//! Profile resolution only needs two answers from the EAPI rules: whether a
//! version is supported at all, and whether it permits directory-style
//! entries (`package.mask/`, `use.force/`, ...) at the profile and
//! repository level.

/// EAPI used when neither the profile nor its repository declare one
pub const DEFAULT_EAPI: &str = "0";

/// Numbered EAPIs understood by this implementation
const SUPPORTED_EAPIS: &[&str] = &["0", "1", "2", "3", "4", "5", "6", "7", "8"];

/// Testing and deprecated EAPIs that are still accepted
const EXTRA_EAPIS: &[&str] = &["4-python", "4-slot-abi", "5-progress"];

/// EAPIs that predate directory-style profile entries
const FLAT_FILE_EAPIS: &[&str] = &["0", "1", "2", "3", "4", "4-slot-abi", "5", "6"];

/// EAPI rules consulted during profile resolution
pub trait EapiPolicy {
    /// Whether `eapi` is a version this package manager can handle
    fn is_supported(&self, eapi: &str) -> bool;

    /// Whether profile entries may be directories under `eapi`
    fn allows_profile_directories(&self, eapi: &str) -> bool;
}

/// The EAPI rules shipped with Buckos
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardEapi;

impl EapiPolicy for StandardEapi {
    fn is_supported(&self, eapi: &str) -> bool {
        let eapi = eapi.trim();
        SUPPORTED_EAPIS.contains(&eapi) || EXTRA_EAPIS.contains(&eapi)
    }

    fn allows_profile_directories(&self, eapi: &str) -> bool {
        !FLAT_FILE_EAPIS.contains(&eapi.trim())
    }
}
