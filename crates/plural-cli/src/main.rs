//! Plural - deployment workspace and ledger tool
//!
//! Usage:
//!   plural prepare <repo>          # Assemble and lay out a workspace
//!   plural lock show <repo>        # Print the applied fingerprints
//!   plural diff <repo> helm        # Captured diff against the cluster

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use plural_core::api::{ApiClient, InstallationSource, LedgerClient};
use plural_core::config::paths::default_config_dir;
use plural_core::context::AppContext;
use plural_core::coordination::{Acquired, LockCoordinator, Persisted};
use plural_core::lockfile::Lockfile;
use plural_core::types::ComponentKind;
use plural_core::workspace::{MinimalWorkspace, Workspace};

const LOCK_PROFILE_ENV: &str = "PLURAL_LOCK_PROFILE";

#[derive(Parser)]
#[command(name = "plural")]
#[command(about = "Deployment workspace and ledger tool", long_about = None)]
struct Cli {
    /// Directory holding config.toml (defaults to ~/.config/plural)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Lock profile, overriding config and PLURAL_LOCK_PROFILE
    #[arg(long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble the workspace for a repository and lay it out on disk,
    /// holding the ledger for the duration
    Prepare {
        /// Repository name
        repo: String,
    },

    /// Inspect or update the fingerprint ledger
    Lock(LockArgs),

    /// Diff a repository against what is deployed
    Diff {
        /// Repository name
        repo: String,
        /// Component to diff
        target: DiffTarget,
    },

    /// Print the fingerprint of a file or directory
    Fingerprint {
        /// Path to fingerprint
        path: PathBuf,
    },
}

#[derive(Args)]
struct LockArgs {
    #[command(subcommand)]
    command: LockSubcommand,
}

#[derive(Subcommand)]
enum LockSubcommand {
    /// Print the ledger for a repository
    Show {
        /// Repository name
        repo: String,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Record a fingerprint and persist the ledger
    Set {
        /// Repository name
        repo: String,
        /// Component kind (artifact, terraform, helm, recipe, integration, crd, ird, tag, attrs)
        kind: String,
        /// Component key
        key: String,
        /// Fingerprint to record
        sha: String,
    },

    /// Print the local lockfile path
    Path {
        /// Repository name; the project lockfile when omitted
        repo: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DiffTarget {
    Helm,
    Terraform,
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
    /// Raw YAML ledger document
    Yaml,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plural=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let app = load_context(cli.config_dir, cli.profile)?;

    match cli.command {
        Commands::Prepare { repo } => run_prepare(&app, &repo),
        Commands::Lock(args) => match args.command {
            LockSubcommand::Show { repo, format } => run_lock_show(&app, &repo, format),
            LockSubcommand::Set {
                repo,
                kind,
                key,
                sha,
            } => run_lock_set(&app, &repo, &kind, &key, &sha),
            LockSubcommand::Path { repo } => run_lock_path(&app, repo.as_deref()),
        },
        Commands::Diff { repo, target } => run_diff(&app, &repo, target),
        Commands::Fingerprint { path } => {
            println!("{}", plural_core::fs::fingerprint(&path)?);
            Ok(())
        }
    }
}

fn load_context(config_dir: Option<PathBuf>, profile: Option<String>) -> Result<AppContext> {
    let project_root = std::env::current_dir().context("Failed to resolve current directory")?;
    let config_dir = match config_dir {
        Some(dir) => dir,
        None => default_config_dir()?,
    };
    let profile = profile.or_else(|| {
        std::env::var(LOCK_PROFILE_ENV)
            .ok()
            .filter(|p| !p.trim().is_empty())
    });
    debug!(config_dir = %config_dir.display(), profile = ?profile, "loading context");
    Ok(AppContext::load(project_root, config_dir)?.with_lock_profile(profile))
}

fn api_client(app: &AppContext) -> Result<ApiClient> {
    if app.config().token.is_empty() {
        anyhow::bail!(
            "No API token configured; set `token` in {}",
            app.config_store().config_path().display()
        );
    }
    ApiClient::from_config(app.config())
}

fn coordinator(app: &AppContext) -> Result<LockCoordinator> {
    let remote: Option<Box<dyn LedgerClient>> = if app.config().remote_enabled() {
        Some(Box::new(ApiClient::from_config(app.config())?))
    } else {
        None
    };
    Ok(app.coordinator(remote))
}

fn run_prepare(app: &AppContext, repo: &str) -> Result<()> {
    let client = api_client(app)?;
    let installation = client.installation(repo)?;
    let workspace = Workspace::new(&client, app, installation)?;
    let root = workspace.prepare_with_ledger(&coordinator(app)?)?;

    println!(
        "{} {} at {}",
        style("Prepared").green().bold(),
        workspace.name(),
        root.display()
    );
    Ok(())
}

fn run_lock_show(app: &AppContext, repo: &str, format: OutputFormat) -> Result<()> {
    let coordinator = coordinator(app)?;
    let manifest_path = app.manifest_path(repo)?;
    let acquired = coordinator.acquire(repo, &manifest_path);

    let printed = print_ledger(acquired.lockfile(), format);
    // Hand the ledger back untouched so other runs are not blocked.
    if let Acquired::Coordinated(lockfile) = &acquired {
        coordinator.release(repo, lockfile)?;
    }
    printed?;

    if !acquired.is_coordinated() {
        eprintln!("{}", style("(uncoordinated: local ledger)").dim());
    }
    Ok(())
}

fn run_lock_set(app: &AppContext, repo: &str, kind: &str, key: &str, sha: &str) -> Result<()> {
    let coordinator = coordinator(app)?;
    let manifest_path = app.manifest_path(repo)?;
    let acquired = coordinator.acquire(repo, &manifest_path);
    let coordinated = acquired.is_coordinated();
    let mut lockfile = acquired.into_lockfile();

    if let Err(err) = lockfile.set_dyn(kind, key, sha) {
        if coordinated {
            coordinator.release(repo, &lockfile)?;
        }
        return Err(err.into());
    }

    match coordinator.persist(repo, &manifest_path, &lockfile)? {
        Persisted::Remote => println!("{} {} {}", style("Released").green(), kind, key),
        Persisted::Local(path) => {
            println!("{} {}", style("Wrote").green(), path.display())
        }
    }
    Ok(())
}

fn run_lock_path(app: &AppContext, repo: Option<&str>) -> Result<()> {
    let manifest_path = match repo {
        Some(repo) => app.manifest_path(repo)?,
        None => app.project_manifest_path(),
    };
    println!("{}", app.lockfile_store().lock_path(&manifest_path).display());
    Ok(())
}

fn run_diff(app: &AppContext, repo: &str, target: DiffTarget) -> Result<()> {
    let workspace = MinimalWorkspace::load(app, repo)?;
    let capture = match target {
        DiffTarget::Helm => workspace.diff_helm()?,
        DiffTarget::Terraform => workspace.diff_terraform()?,
    };
    eprintln!("{} {}", style("Captured").dim(), capture.display());
    Ok(())
}

fn print_ledger(lockfile: &Lockfile, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_ledger_table(lockfile),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(lockfile)?),
        OutputFormat::Yaml => print!("{}", lockfile.to_yaml()?),
    }
    Ok(())
}

fn print_ledger_table(lockfile: &Lockfile) {
    if lockfile.is_empty() {
        println!("No fingerprints recorded.");
        return;
    }

    println!("{:<12} {:<30} Fingerprint", "Kind", "Key");
    println!("{}", "-".repeat(70));

    for kind in ComponentKind::ALL {
        for (key, sha) in lockfile.iter(kind) {
            println!("{:<12} {:<30} {}", kind.as_str(), truncate(key, 30), sha);
        }
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
