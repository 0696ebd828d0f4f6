//! Tests for profile stack resolution across repositories

use assert_matches::assert_matches;
use buckos_config::paths::realpath;
use buckos_config::{
    ConfigError, DiagnosticKind, ParseError, ProfileLoader, ProfileResolver, ReposConfig,
    Repository, RepositoryLayoutIndex, RootLocationsBuilder, StandardEapi,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary system with a config root and a repository directory
struct TestSystem {
    _temp: TempDir,
    root: PathBuf,
}

impl TestSystem {
    fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let root = realpath(temp.path());
        fs::create_dir_all(root.join("etc/buckos")).unwrap();
        Self { _temp: temp, root }
    }

    /// Create a repository with the given layout.conf content
    fn repo(&self, name: &str, layout_conf: &str) -> PathBuf {
        let location = self.root.join("var/db/repos").join(name);
        fs::create_dir_all(location.join("metadata")).unwrap();
        fs::create_dir_all(location.join("profiles")).unwrap();
        fs::write(location.join("metadata/layout.conf"), layout_conf).unwrap();
        location
    }

    fn repos_conf(&self, content: &str) {
        fs::write(self.root.join("etc/buckos/repos.conf"), content).unwrap();
    }

    fn loader(&self) -> ProfileLoader {
        ProfileLoader::new(RootLocationsBuilder::new().config_root(&self.root))
    }
}

/// Create a profile directory with an optional parent file
fn profile(dir: &Path, parents: &[&str]) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    if !parents.is_empty() {
        fs::write(dir.join("parent"), parents.join("\n") + "\n").unwrap();
    }
    dir.to_path_buf()
}

mod multi_repository {
    use super::*;
    use pretty_assertions::assert_eq;

    fn setup() -> (TestSystem, PathBuf, PathBuf) {
        let sys = TestSystem::new();
        let gentoo = sys.repo("gentoo", "profile-formats = portage-2\n");
        let other = sys.repo(
            "other",
            "profile-formats = portage-1\nprofile_eapi_when_unspecified = 7\n",
        );
        sys.repos_conf(&format!(
            "[DEFAULT]\nmain-repo = gentoo\n\n[gentoo]\nlocation = {}\n\n[other]\nlocation = {}\npriority = 10\n",
            gentoo.display(),
            other.display()
        ));

        profile(&gentoo.join("profiles/base"), &[]);
        fs::write(gentoo.join("profiles/base/eapi"), "5\n").unwrap();
        profile(&other.join("profiles/foo"), &[]);
        profile(
            &gentoo.join("profiles/desktop"),
            &["../base", "other:foo"],
        );
        (sys, gentoo, other)
    }

    #[test]
    fn test_parents_resolve_in_order() {
        let (sys, gentoo, other) = setup();

        let env = sys
            .loader()
            .profile_path(gentoo.join("profiles/desktop"))
            .load()
            .unwrap();

        assert_eq!(
            env.profiles.stack.paths(),
            vec![
                gentoo.join("profiles/base").as_path(),
                other.join("profiles/foo").as_path(),
                gentoo.join("profiles/desktop").as_path(),
            ]
        );
        assert!(env.profiles.diagnostics.is_empty());
    }

    #[test]
    fn test_repository_default_eapi() {
        let (sys, gentoo, _other) = setup();

        let env = sys
            .loader()
            .profile_path(gentoo.join("profiles/desktop"))
            .load()
            .unwrap();
        let nodes = env.profiles.stack.nodes();

        assert_eq!(nodes[0].eapi.as_deref(), Some("5"));
        assert_eq!(nodes[1].eapi.as_deref(), Some("7"));
        assert!(nodes[1].allow_directories);
        assert_eq!(nodes[1].formats, vec!["portage-1"]);
        assert_eq!(nodes[2].eapi.as_deref(), Some("0"));
        assert_eq!(nodes[2].formats, vec!["portage-2"]);
        assert!(!nodes[2].supports_build_id);
    }

    #[test]
    fn test_deprecation_warning_follows_repository_changes() {
        let (sys, gentoo, _other) = setup();

        let env = sys
            .loader()
            .profile_path(gentoo.join("profiles/desktop"))
            .load()
            .unwrap();
        let shown: Vec<bool> = env
            .profiles
            .stack
            .iter()
            .map(|n| n.show_deprecated_warning)
            .collect();

        // base stays in gentoo, foo crosses into another repository
        assert_eq!(shown, vec![false, true, true]);
    }

    #[test]
    fn test_search_dirs_and_portdir() {
        let (sys, gentoo, other) = setup();

        let env = sys.loader().local_config(false).load().unwrap();
        assert_eq!(env.portdir, Some(gentoo.clone()));
        assert_eq!(env.search_dirs.overlay_profiles, vec![other.join("profiles")]);
        assert_eq!(
            env.search_dirs.profile_locations,
            vec![gentoo.join("profiles"), other.join("profiles")]
        );
        assert_eq!(
            env.search_dirs.profile_and_user_locations,
            env.search_dirs.profile_locations
        );
    }

    #[test]
    fn test_unknown_repository_reference() {
        let (sys, gentoo, _other) = setup();
        let broken = profile(&gentoo.join("profiles/broken"), &["missing:foo"]);

        let err = sys
            .loader()
            .profile_path(&broken)
            .strict(true)
            .load()
            .unwrap_err();
        assert_matches!(
            err,
            ConfigError::Parse(ParseError::UnknownRepository { ref reference, .. })
                if reference == "missing:foo"
        );
    }
}

mod repository_attribution {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nested_repository_wins() {
        let sys = TestSystem::new();
        let outer = sys.repo("outer", "profile-formats = portage-2\n");
        let inner = outer.join("nested");
        fs::create_dir_all(inner.join("metadata")).unwrap();
        fs::write(
            inner.join("metadata/layout.conf"),
            "profile-formats = portage-1-compat\n",
        )
        .unwrap();

        let p = profile(&inner.join("profiles/p"), &[]);
        fs::create_dir_all(p.join("package.mask")).unwrap();
        fs::write(p.join("use.mask"), "").unwrap();

        let repos = ReposConfig::new();
        let index =
            RepositoryLayoutIndex::build([&outer, &inner], &repos, &StandardEapi).unwrap();
        let resolution = ProfileResolver::new(&index, &repos).resolve(&p).unwrap();

        let node = &resolution.stack.nodes()[0];
        assert_eq!(node.formats, vec!["portage-1-compat"]);
        assert_eq!(node.eapi.as_deref(), Some("0"));

        assert_eq!(resolution.diagnostics.len(), 1);
        assert_matches!(
            &resolution.diagnostics[0].kind,
            DiagnosticKind::LegacyDirectoryLayout { offenders, repository }
                if offenders == &vec!["package.mask".to_string()]
                    && repository.as_deref() == Some(inner.as_path())
        );
    }

    #[test]
    fn test_repos_conf_formats_override_layout() {
        let sys = TestSystem::new();
        let repo = sys.repo("local", "profile-formats = portage-1-compat\n");
        let p = profile(&repo.join("profiles/p"), &[]);

        let env = sys
            .loader()
            .repository(
                Repository::new("local", &repo).with_profile_formats(["portage-2", "build-id"]),
            )
            .profile_path(&p)
            .load()
            .unwrap();

        let node = &env.profiles.stack.nodes()[0];
        assert!(node.supports_build_id);
        assert_eq!(node.formats, vec!["portage-2", "build-id"]);
    }
}

mod failures {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_malformed_overlay_layout_still_resolves() {
        let sys = TestSystem::new();
        let gentoo = sys.repo("gentoo", "profile-formats = portage-2\n");
        let overlay = sys.repo(
            "overlay",
            "masters = gentoo\nsign-commits\nprofile-formats = portage-2\n",
        );
        sys.repos_conf(&format!(
            "[DEFAULT]\nmain-repo = gentoo\n\n[gentoo]\nlocation = {}\n\n[overlay]\nlocation = {}\n",
            gentoo.display(),
            overlay.display()
        ));
        profile(&gentoo.join("profiles/base"), &[]);
        let p = profile(&overlay.join("profiles/desktop"), &["gentoo:base"]);

        let env = sys.loader().profile_path(&p).strict(false).load().unwrap();
        assert_eq!(
            env.profiles.stack.paths(),
            vec![gentoo.join("profiles/base").as_path(), p.as_path()]
        );
        assert!(env.profiles.diagnostics.is_empty());
    }

    #[test]
    fn test_missing_parent_names_both_paths() {
        let sys = TestSystem::new();
        let repo = sys.repo("gentoo", "profile-formats = portage-2\n");
        let p = profile(&repo.join("profiles/p"), &["../missing"]);

        let err = sys
            .loader()
            .profile_path(&p)
            .strict(true)
            .load()
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(&repo.join("profiles/missing").display().to_string()));
        assert!(msg.contains(&p.join("parent").display().to_string()));
    }

    #[test]
    fn test_missing_parent_falls_back_to_empty_stack() {
        let sys = TestSystem::new();
        let repo = sys.repo("gentoo", "profile-formats = portage-2\n");
        let p = profile(&repo.join("profiles/p"), &["../missing"]);
        fs::create_dir_all(sys.root.join("etc/buckos/profile")).unwrap();

        let env = sys.loader().profile_path(&p).load().unwrap();
        assert!(env.profiles.stack.is_empty());
        assert!(env.profiles.user_profile_dir.is_none());
        assert_matches!(
            env.profiles.diagnostics[0].kind,
            DiagnosticKind::UnparsableProfile { .. }
        );
    }

    #[test]
    fn test_unsupported_eapi() {
        let sys = TestSystem::new();
        let repo = sys.repo("gentoo", "profile-formats = portage-2\n");
        let p = profile(&repo.join("profiles/p"), &[]);
        fs::write(p.join("eapi"), "9000\n").unwrap();

        let err = sys
            .loader()
            .profile_path(&p)
            .strict(true)
            .load()
            .unwrap_err();
        assert_matches!(
            err,
            ConfigError::Parse(ParseError::UnsupportedEapi { ref eapi, .. }) if eapi == "9000"
        );
    }
}

#[cfg(unix)]
mod profile_links {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_make_profile_symlink_with_user_profile() {
        let sys = TestSystem::new();
        let repo = sys.repo("gentoo", "profile-formats = portage-2\n");
        profile(&repo.join("profiles/base"), &[]);
        let p = profile(&repo.join("profiles/desktop"), &[":base"]);
        sys.repos_conf(&format!("[gentoo]\nlocation = {}\n", repo.display()));
        std::os::unix::fs::symlink(&p, sys.root.join("etc/buckos/make.profile")).unwrap();
        let user = sys.root.join("etc/buckos/profile");
        fs::create_dir_all(&user).unwrap();

        let env = sys.loader().load().unwrap();
        assert_eq!(
            env.profiles.profile_path,
            Some(sys.root.join("etc/buckos/make.profile"))
        );
        assert_eq!(
            env.profiles.stack.paths(),
            vec![
                repo.join("profiles/base").as_path(),
                p.as_path(),
                user.as_path(),
            ]
        );
        let user_node = env.profiles.stack.user_profile().unwrap();
        assert_eq!(user_node.eapi, None);
        assert_eq!(user_node.eapi_or_default(), "0");
    }
}
