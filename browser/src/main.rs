use browser::{build_page, BrowserConfig};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};
use vcs::{GitLocal, RepositoryBrowser};

#[derive(Parser)]
#[command(name = "browser")]
#[command(about = "Browse branches, history and files of a local git repository")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Repository to browse, overriding the configuration and GIT_REPO
    #[arg(short, long)]
    repo: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the page for a ref and an optional path inside it
    Open {
        /// Branch, commit or HEAD
        reference: String,
        /// Path inside the tree, the root when omitted
        path: Option<String>,
    },
    /// List branches
    Branches,
    /// Show the commit history of a ref
    Log {
        #[arg(default_value = "HEAD")]
        reference: String,
    },
    /// Show the working tree status
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = BrowserConfig::load(cli.config.as_deref())?
        .apply_repo_override(cli.repo)
        .validated()?;
    info!("Browsing {}", config.repo.display());

    let repo = GitLocal::new(config.git_config())?;

    match cli.command {
        Commands::Open { reference, path } => {
            let page = build_page(&repo, &config, &reference, path.as_deref()).await;
            print_json(&page)?;
            if page.is_not_found() {
                error!("Nothing to show for {}", reference);
                std::process::exit(1);
            }
        }
        Commands::Branches => {
            print_json(&repo.branches().await?)?;
        }
        Commands::Log { reference } => {
            print_json(&repo.commit_history(&reference).await?)?;
        }
        Commands::Status => {
            print!("{}", repo.git().status(&[]).await?);
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
