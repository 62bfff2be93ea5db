use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{bail, Context};
use bookshelf_app::modules::books::models::Library;
use bookshelf_kernel::settings::Settings;
use bookshelf_store::{DocumentStore, JsonFileStore};
use clap::{Args, Parser, Subcommand};

/// Operator tooling for the bookshelf service
#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve(StoreArgs),
    /// Write an empty book document
    Init {
        #[command(flatten)]
        store: StoreArgs,
        /// Overwrite an existing document
        #[arg(long)]
        force: bool,
    },
    /// Parse the book document and report its contents
    Check(StoreArgs),
}

#[derive(Debug, Args)]
struct StoreArgs {
    /// Path of the JSON document, overriding `store.path`
    #[arg(long)]
    store: Option<PathBuf>,
}

impl StoreArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(path) = &self.store {
            settings.store.path = path.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings =
        Settings::load().with_context(|| "failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry);

    match cli.command {
        Command::Serve(args) => {
            args.apply(&mut settings);
            tracing::info!(env = ?settings.environment, "serving bookshelf");
            bookshelf_app::run(settings).await
        }
        Command::Init { store, force } => {
            store.apply(&mut settings);
            init(&settings, force).await
        }
        Command::Check(args) => {
            args.apply(&mut settings);
            check(&settings).await
        }
    }
}

async fn init(settings: &Settings, force: bool) -> anyhow::Result<()> {
    let store = JsonFileStore::new(&settings.store.path);
    let empty = Library::default();

    if store.ensure_exists(&empty).await? {
        println!("created {}", store.path().display());
        return Ok(());
    }
    if !force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            store.path().display()
        );
    }

    store.save(&empty).await?;
    println!("reset {}", store.path().display());
    Ok(())
}

async fn check(settings: &Settings) -> anyhow::Result<()> {
    let store = JsonFileStore::new(&settings.store.path);
    let library: Library = store.load().await?;

    let mut seen = HashSet::new();
    let duplicates: Vec<&str> = library
        .books
        .iter()
        .filter(|book| !seen.insert(book.id.as_str()))
        .map(|book| book.id.as_str())
        .collect();

    println!(
        "{}: {} books, {} other keys",
        store.path().display(),
        library.books.len(),
        library.extra.len()
    );

    if !duplicates.is_empty() {
        bail!("duplicate book ids: {}", duplicates.join(", "));
    }
    Ok(())
}
