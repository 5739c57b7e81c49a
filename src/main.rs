//! credentials - manage an encrypted credentials directory
//!
//! Commands:
//! - init: Create the master key and seed document (safe to repeat)
//! - edit: Open the decrypted document in $EDITOR and re-encrypt it
//! - show: Print the decrypted document
//! - values: Print the parsed KEY=VALUE pairs

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use env_credentials::config::{Config, DirectoryDiscovery, FixedDirectory};
use env_credentials::{CredentialsStore, ShellEditor};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "credentials")]
#[command(about = "Encrypted credentials stored next to their master key")]
#[command(version)]
#[command(after_help = r#"FILES:
    master.key            Master key; registered in .gitignore, never commit it
    credentials.env.enc   Encrypted KEY=VALUE document, safe to commit

ENVIRONMENT:
    CREDENTIALS_DIR          Default for --dir
    CREDENTIALS_IGNORE_FILE  Default for --ignore-file
    EDITOR                   Editor used by `edit` (default: vi)"#)]
struct Cli {
    /// The directory in which the configuration and key files are stored
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    /// Ignore file to register the key in (default: <dir>/.gitignore)
    #[arg(long, global = true)]
    ignore_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the credentials and master key files
    Init,

    /// Open the credentials file in your editor for altering
    Edit,

    /// Decrypt and print the credentials file to the terminal
    Show,

    /// Print the parsed credentials, sorted by key
    Values {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so `show` and `values` output can be piped
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "env_credentials=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        eprintln!();
        std::process::exit(2);
    };

    let config = Config::from_env()?;
    let dir = match cli.dir {
        Some(dir) => FixedDirectory(dir),
        None => config
            .discovery()
            .context("No credentials directory given; pass --dir or set CREDENTIALS_DIR")?,
    };

    let mut store = CredentialsStore::new(dir.base_dir()?)?;
    if let Some(ignore_file) = cli.ignore_file.or_else(|| config.ignore_file.clone()) {
        store = store.with_ignore_file(ignore_file);
    }

    match command {
        Commands::Init => cmd_init(&mut store),
        Commands::Edit => cmd_edit(&mut store, &config),
        Commands::Show => cmd_show(&mut store),
        Commands::Values { json } => cmd_values(&mut store, json),
    }
}

/// Create the key and seed document
fn cmd_init(store: &mut CredentialsStore) -> Result<()> {
    store
        .initialize()
        .with_context(|| format!("Failed to initialize {}", store.dir().display()))?;

    info!("Credentials ready in {}", store.dir().display());
    println!("Key:         {}", store.key_path().display());
    println!("Credentials: {}", store.document_path().display());
    println!("Ignored in:  {}", store.ignore_file().display());
    Ok(())
}

/// Edit through the configured editor
fn cmd_edit(store: &mut CredentialsStore, config: &Config) -> Result<()> {
    store
        .edit(&config.editor, &ShellEditor)
        .with_context(|| format!("Failed to edit credentials in {}", store.dir().display()))
}

/// Print the decrypted document verbatim
fn cmd_show(store: &mut CredentialsStore) -> Result<()> {
    let content = store.read().context("Failed to read credentials")?;
    print!("{}", content);
    Ok(())
}

/// Print parsed values
fn cmd_values(store: &mut CredentialsStore, json: bool) -> Result<()> {
    let values = store.values().context("Failed to read credentials")?;

    if json {
        println!("{}", serde_json::to_string_pretty(values)?);
        return Ok(());
    }

    for (key, value) in values {
        println!("{}={}", key, value);
    }
    Ok(())
}
