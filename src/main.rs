//! Buckos profile inspector
//!
//! Resolves the active profile stack the same way the package manager does
//! and prints it, together with the root locations and profile search
//! directories it was derived from.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{ProfileEnvironment, ProfileLoader, Repository, RootLocationsBuilder};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Buckos Profile - inspect the resolved profile stack
#[derive(Parser, Debug)]
#[command(name = "buckos-profile", version, author, about, long_about = None)]
struct Cli {
    /// Configuration root (defaults to $BUCKOS_CONFIG_ROOT or $PORTAGE_CONFIGROOT)
    #[arg(long, global = true)]
    config_root: Option<PathBuf>,

    /// Offset prefix
    #[arg(long, global = true)]
    eprefix: Option<PathBuf>,

    /// Build dependency root
    #[arg(long, global = true)]
    sysroot: Option<PathBuf>,

    /// Target root (ROOT)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Resolve this profile directory instead of make.profile
    #[arg(long, global = true)]
    profile: Option<PathBuf>,

    /// Fail on profile parse errors instead of using an empty stack
    #[arg(long, global = true)]
    strict: bool,

    /// Ignore the user profile in etc/buckos/profile
    #[arg(long = "no-user-config", global = true)]
    no_user_config: bool,

    /// Extra repository, as NAME=PATH
    #[arg(long = "repo", global = true, value_parser = parse_repo)]
    repos: Vec<Repository>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the resolved profile stack (default)
    Show,
    /// Show the root locations
    Locations,
    /// Show the profile search directories
    SearchDirs,
}

fn parse_repo(value: &str) -> std::result::Result<Repository, String> {
    let (name, path) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=PATH, got '{}'", value))?;
    if name.is_empty() || path.is_empty() {
        return Err(format!("expected NAME=PATH, got '{}'", value));
    }
    Ok(Repository::new(name, path))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("BUCKOS_LOG")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut roots = RootLocationsBuilder::from_env();
    if let Some(path) = cli.config_root {
        roots = roots.config_root(path);
    }
    if let Some(path) = cli.eprefix {
        roots = roots.eprefix(path);
    }
    if let Some(path) = cli.sysroot {
        roots = roots.sysroot(path);
    }
    if let Some(path) = cli.root {
        roots = roots.target_root(path);
    }

    let mut loader = ProfileLoader::new(roots)
        .strict(cli.strict)
        .local_config(!cli.no_user_config);
    if let Some(path) = cli.profile {
        loader = loader.profile_path(path);
    }
    for repo in cli.repos {
        loader = loader.repository(repo);
    }

    let env = loader.load().context("Failed to load profile configuration")?;

    match cli.command.unwrap_or(Commands::Show) {
        Commands::Show => show(&env, cli.json),
        Commands::Locations => locations(&env, cli.json),
        Commands::SearchDirs => search_dirs(&env, cli.json),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn show(env: &ProfileEnvironment, json: bool) -> Result<()> {
    if json {
        return print_json(&env.profiles);
    }

    match &env.profiles.profile_path {
        Some(path) => println!("Profile: {}", path.display()),
        None => println!("Profile: <none>"),
    }
    println!();
    for node in &env.profiles.stack {
        let mut flags = Vec::new();
        if node.is_user_profile {
            flags.push("user".to_string());
        }
        if node.allow_directories {
            flags.push("dirs".to_string());
        }
        if node.supports_build_id {
            flags.push("build-id".to_string());
        }
        println!(
            "  {} [EAPI {}] {}",
            node.path.display(),
            node.eapi_or_default(),
            flags.join(",")
        );
    }

    if !env.profiles.diagnostics.is_empty() {
        println!();
        println!("Diagnostics:");
        for diag in &env.profiles.diagnostics {
            for line in diag.to_string().lines() {
                println!("  {}", line);
            }
        }
    }
    Ok(())
}

fn locations(env: &ProfileEnvironment, json: bool) -> Result<()> {
    let l = &env.locations;
    if json {
        return print_json(l);
    }

    let rows = [
        ("PORTAGE_CONFIGROOT", &l.config_root),
        ("USER_CONFIG", &l.abs_user_config),
        ("EPREFIX", &l.eprefix),
        ("SYSROOT", &l.sysroot),
        ("ESYSROOT", &l.esysroot),
        ("ROOT", &l.target_root),
        ("EROOT", &l.eroot),
        ("BROOT", &l.broot),
        ("GLOBAL_CONFIG_PATH", &l.global_config_path),
    ];
    for (name, path) in rows {
        println!("{:<20} {}", name, path.display());
    }
    Ok(())
}

fn search_dirs(env: &ProfileEnvironment, json: bool) -> Result<()> {
    let dirs = &env.search_dirs;
    if json {
        return print_json(dirs);
    }

    if let Some(portdir) = &env.portdir {
        println!("PORTDIR: {}", portdir.display());
    }
    println!("Profile locations:");
    for dir in &dirs.profile_and_user_locations {
        println!("  {}", dir.display());
    }
    Ok(())
}
