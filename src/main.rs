//! fdev - CLI entry point.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use git2::Repository;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use fdev::commit::{CommitOptions, DialoguerConfirmer, commit_with_config};
use fdev::config::{self, Config, PROVIDER_ENV_VAR};
use fdev::discard::{DiscardOptions, DiscardOutcome, run_discard};
use fdev::error::GitError;
use fdev::llm::{Provider, check_connection};
use fdev::release::{ReleaseOptions, ReleaseOutcome, run_release};

/// Env var holding a tracing filter directive, e.g. `fdev=trace`.
const LOG_ENV_VAR: &str = "FDEV_LOG";

/// Developer conveniences for Flutter projects.
#[derive(Parser, Debug)]
#[command(name = "fdev")]
#[command(about = "AI commit messages and release tagging for Flutter projects")]
#[command(version)]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a commit message for pending changes and commit after confirmation
    Commit {
        /// Stage all working-tree changes even when something is already staged
        #[arg(short, long)]
        all: bool,
    },

    /// Bump the pubspec version, commit, tag and push a release
    Tag {
        /// Print the release plan without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Commit and tag locally but do not push
        #[arg(long)]
        no_push: bool,
    },

    /// Show the text-generation provider, or switch to another one
    Ai {
        /// Provider to switch to (gemini, groq, mistral, sambanova, openrouter)
        provider: Option<String>,

        /// Send one test request to the configured provider
        #[arg(long)]
        test: bool,
    },

    /// Throw away uncommitted changes after confirmation
    Discard {
        /// Reset tracked files only and leave untracked files in place
        #[arg(long)]
        keep_untracked: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Commit { all } => commit(all).await,
        Commands::Tag { dry_run, no_push } => tag(ReleaseOptions { dry_run, no_push }),
        Commands::Ai { provider, test } => ai(provider.as_deref(), test).await,
        Commands::Discard { keep_untracked } => discard(DiscardOptions { keep_untracked }),
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "fdev=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn open_repo() -> Result<Repository> {
    let repo = Repository::discover(".")
        .map_err(GitError::OpenRepository)
        .context("Not a git repository. Run fdev from within a git repository.")?;
    if repo.workdir().is_none() {
        return Err(GitError::BareRepository.into());
    }
    Ok(repo)
}

async fn commit(all: bool) -> Result<()> {
    let repo = open_repo()?;
    let config = Config::load(repo.workdir()).context("Failed to load configuration")?;
    debug!(?config, "Using configuration");

    let result = commit_with_config(
        &repo,
        &config,
        &DialoguerConfirmer,
        CommitOptions { stage_all: all },
    )
    .await;

    match result {
        Ok(outcome) => {
            let short = outcome.oid.to_string();
            println!(
                "✓ Committed {}: {}",
                &short[..short.len().min(7)],
                outcome.message.subject()
            );
            Ok(())
        }
        Err(e) if e.is_informational() => {
            println!("{}", e);
            Ok(())
        }
        Err(e) => {
            debug!(kind = %e.kind(), "Commit failed");
            Err(e.into())
        }
    }
}

fn tag(options: ReleaseOptions) -> Result<()> {
    let repo = open_repo()?;
    match run_release(&repo, &DialoguerConfirmer, options)? {
        ReleaseOutcome::DryRun => {}
        ReleaseOutcome::Tagged { commit, pushed } => {
            debug!(%commit, pushed, "Release finished");
        }
    }
    Ok(())
}

fn discard(options: DiscardOptions) -> Result<()> {
    let repo = open_repo()?;
    match run_discard(&repo, &DialoguerConfirmer, options)? {
        DiscardOutcome::NothingToDiscard => {}
        DiscardOutcome::Discarded { reset, removed } => {
            debug!(reset, removed, "Discard finished");
            println!("✓ Discarded uncommitted changes");
        }
    }
    Ok(())
}

async fn ai(provider: Option<&str>, test: bool) -> Result<()> {
    let project_root = Repository::discover(".")
        .ok()
        .and_then(|r| r.workdir().map(|p| p.to_path_buf()));

    if let Some(name) = provider {
        let provider: Provider = name.parse()?;
        let path = config::user_config_path()?;
        let cleared = config::set_provider(&path, provider)?;
        println!(
            "✓ Switched to {} (saved to {})",
            provider.display_name(),
            path.display()
        );
        if !cleared.is_empty() {
            println!(
                "  Cleared {} set for the previous provider",
                cleared.join(", ")
            );
        }
        if std::env::var(PROVIDER_ENV_VAR).is_ok_and(|v| !v.trim().is_empty()) {
            eprintln!(
                "Warning: {} is set and overrides the config file.",
                PROVIDER_ENV_VAR
            );
        }
    }

    let config = Config::load(project_root.as_deref()).context("Failed to load configuration")?;

    if provider.is_none() || test {
        println!("Provider: {}", config.provider.display_name());
        println!("Model:    {}", config.model());
        println!("Endpoint: {}", config.base_url());
        println!(
            "API key:  {}",
            if config.api_key.is_some() {
                "configured".to_string()
            } else {
                format!("missing (set {})", config.provider.api_key_env())
            }
        );
        if provider.is_none() && !test {
            println!();
            println!("Available providers: {}", Provider::valid_names());
        }
    }

    if test {
        println!();
        println!("Testing {} connection...", config.provider.display_name());
        let reply = check_connection(&config)
            .await
            .with_context(|| format!("{} connection failed", config.provider.display_name()))?;
        println!("✓ {} connection successful", config.provider.display_name());
        debug!(%reply, "Connection test reply");
    }

    Ok(())
}
