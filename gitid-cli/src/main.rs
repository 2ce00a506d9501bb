mod output;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gitid_core::editor::expand_home;
use gitid_core::{init_logging_with_config, AppContext, GitIdConfig, Identity, LogConfig, LogLevel};
use serde::Serialize;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "gitid")]
#[command(author, version, about = "Per-directory Git author identities", long_about = None)]
struct Args {
    /// Settings file (defaults to <config dir>/gitid/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Raise the log level, once per occurrence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Enable JSON formatted logging
    #[arg(long, global = true)]
    json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prepare the config locations and show where gitid reads and writes
    Init {
        /// Also write the resolved settings to the settings file
        #[arg(long)]
        save_config: bool,
    },

    /// Register a new identity
    Add {
        /// Identity name, also used in the credential file name
        name: String,

        /// Author name recorded in commits
        #[arg(short = 'n', long = "name")]
        display_name: String,

        /// Author email recorded in commits
        #[arg(short, long)]
        email: String,

        /// Directory whose repositories use this identity
        #[arg(short, long = "path", required = true, num_args = 1..)]
        paths: Vec<String>,
    },

    /// List every identity
    List {
        #[arg(long)]
        json: bool,
    },

    /// Show one identity
    Show {
        name: String,

        #[arg(long)]
        json: bool,
    },

    /// Remove an identity and its credential file
    Remove { name: String },

    /// Show which identity applies to the current directory
    Status,

    /// Show which identities apply to a path
    Test {
        path: String,

        #[arg(long)]
        json: bool,
    },
}

impl Command {
    fn is_mutating(&self) -> bool {
        matches!(self, Command::Add { .. } | Command::Remove { .. })
    }
}

/// One identity covering a queried path
#[derive(Debug, Serialize)]
struct PathMatch<'a> {
    identity: &'a str,
    display_name: &'a str,
    email: &'a str,
    prefix: &'a str,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let mut config =
        GitIdConfig::load(args.config.as_deref()).context("failed to load gitid settings")?;

    if let Some(level) = &args.log_level {
        match LogLevel::from_str(level) {
            Some(parsed) => config.logging.level = parsed.as_str().to_string(),
            None => output::print_warning(&format!(
                "Invalid log level '{}', using '{}'",
                level, config.logging.level
            )),
        }
    }
    if args.json_logs {
        config.logging.json_format = true;
    }

    let level = LogLevel::from_str(&config.logging.level)
        .unwrap_or_default()
        .raised_by(args.verbose);
    init_logging_with_config(LogConfig::new(level).json_format(config.logging.json_format))
        .context("failed to initialize logging")?;

    debug!(
        global_config = %config.paths.global_config.display(),
        identity_dir = %config.paths.identity_dir.display(),
        "settings resolved"
    );

    let settings_file = args.config.clone();
    let mut ctx = AppContext::bootstrap(config);

    if !args.command.is_mutating() {
        if let Some(e) = ctx.load_error() {
            output::print_warning(&format!("Existing identities could not be loaded: {}", e));
        }
    }

    match args.command {
        Command::Init { save_config } => cmd_init(&ctx, save_config, settings_file),
        Command::Add {
            name,
            display_name,
            email,
            paths,
        } => cmd_add(&mut ctx, &name, &display_name, &email, &paths),
        Command::List { json } => cmd_list(&ctx, json),
        Command::Show { name, json } => cmd_show(&ctx, &name, json),
        Command::Remove { name } => cmd_remove(&mut ctx, &name),
        Command::Status => {
            let cwd = std::env::current_dir().context("failed to resolve the current directory")?;
            report_matches(&ctx, &cwd.to_string_lossy(), false)
        }
        Command::Test { path, json } => {
            let path = normalize_path(&path, &ctx.config().paths.home_dir)?;
            report_matches(&ctx, &path, json)
        }
    }
}

fn cmd_init(ctx: &AppContext, save_config: bool, settings_file: Option<PathBuf>) -> Result<()> {
    let paths = &ctx.config().paths;
    let dirs = [paths.global_config.parent(), Some(paths.identity_dir.as_path())];
    for dir in dirs.into_iter().flatten() {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    output::print_field("Global config", &paths.global_config.display().to_string());
    output::print_field("Identity files", &paths.identity_dir.display().to_string());
    output::print_field("Identities", &ctx.registry().list().len().to_string());

    if save_config {
        let target = match settings_file.or_else(GitIdConfig::default_config_file) {
            Some(path) => path,
            None => bail!("no settings file location available, pass --config"),
        };
        ctx.config()
            .save_to_file(&target)
            .with_context(|| format!("failed to save settings to {}", target.display()))?;
        output::print_success(&format!("Saved settings to {}", target.display()));
    }

    output::print_success("gitid is ready");
    Ok(())
}

fn cmd_add(
    ctx: &mut AppContext,
    name: &str,
    display_name: &str,
    email: &str,
    paths: &[String],
) -> Result<()> {
    ensure_loaded(ctx)?;

    let home = ctx.config().paths.home_dir.clone();
    let paths = paths
        .iter()
        .map(|path| normalize_path(path, &home))
        .collect::<Result<Vec<_>>>()?;

    let identity = ctx
        .registry_mut()
        .add(name, display_name, email, paths)
        .with_context(|| format!("failed to add identity '{}'", name))?;

    output::print_success(&format!("Added identity '{}'", identity.name));
    output::print_identity(identity);
    Ok(())
}

fn cmd_remove(ctx: &mut AppContext, name: &str) -> Result<()> {
    ensure_loaded(ctx)?;

    let removed = ctx
        .registry_mut()
        .remove(name)
        .with_context(|| format!("failed to remove identity '{}'", name))?;

    output::print_success(&format!("Removed identity '{}'", removed.name));
    Ok(())
}

fn cmd_list(ctx: &AppContext, json: bool) -> Result<()> {
    let identities = sorted_identities(ctx);

    if json {
        return output::print_json(&identities);
    }
    if identities.is_empty() {
        output::print_info("No identities configured");
        return Ok(());
    }
    for identity in identities {
        output::print_identity(identity);
    }
    Ok(())
}

fn cmd_show(ctx: &AppContext, name: &str, json: bool) -> Result<()> {
    let identity = ctx
        .registry()
        .get(name)
        .with_context(|| format!("failed to show identity '{}'", name))?;

    if json {
        return output::print_json(identity);
    }
    output::print_identity(identity);
    Ok(())
}

fn report_matches(ctx: &AppContext, path: &str, json: bool) -> Result<()> {
    let matches: Vec<PathMatch<'_>> = ctx
        .registry()
        .matching(path)
        .into_iter()
        .map(|(identity, prefix)| PathMatch {
            identity: &identity.name,
            display_name: &identity.display_name,
            email: &identity.email,
            prefix,
        })
        .collect();

    if json {
        return output::print_json(&matches);
    }

    output::print_field("Directory", path);
    if matches.is_empty() {
        output::print_info("No identity applies here");
        return Ok(());
    }
    for m in &matches {
        output::print_success(&format!(
            "{} <{}> ({}, via {})",
            m.display_name, m.email, m.identity, m.prefix
        ));
    }
    Ok(())
}

/// Refuse to rewrite a global config that could not be parsed at startup
fn ensure_loaded(ctx: &AppContext) -> Result<()> {
    if let Some(e) = ctx.load_error() {
        bail!(
            "refusing to modify {}: {}",
            ctx.config().paths.global_config.display(),
            e
        );
    }
    Ok(())
}

fn sorted_identities(ctx: &AppContext) -> Vec<&Identity> {
    let mut identities: Vec<&Identity> = ctx.registry().list().values().collect();
    identities.sort_by(|a, b| a.name.cmp(&b.name));
    identities
}

/// Absolute form of a user-supplied directory
///
/// `~` expands against the configured home, relative paths resolve against
/// the current directory, and `.` components and trailing separators drop.
fn normalize_path(raw: &str, home: &Path) -> Result<String> {
    let expanded = PathBuf::from(expand_home(raw, home));
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()
            .context("failed to resolve the current directory")?
            .join(expanded)
    };
    let normalized: PathBuf = absolute.components().collect();
    Ok(normalized.to_string_lossy().into_owned())
}
