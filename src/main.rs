//! mailvec - Entry point for the ingest and search CLI

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use mailvec::config::{PartitionErrorPolicy, Settings};
use mailvec::domain::{Category, ElementId};
use mailvec::embedding;
use mailvec::ingest::AutoPartitioner;
use mailvec::retrieval::{Match, SortOrder};
use mailvec::services::{IngestOptions, IngestService, SearchService};
use mailvec::storage::queries::elements;
use mailvec::storage::{Database, InsertMode};

#[derive(Parser)]
#[command(name = "mailvec")]
#[command(about = "Embed email and text documents into SQLite and query them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (defaults to the user config directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Store path, overriding the settings file
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Partition, embed and store every document in a directory
    Ingest {
        dir: PathBuf,

        /// Descend into subdirectories
        #[arg(long)]
        recursive: bool,

        /// Skip documents that fail to partition instead of aborting
        #[arg(long)]
        skip_malformed: bool,

        /// Skip elements that are already stored
        #[arg(long)]
        dedup: bool,
    },
    /// Nearest elements by distance
    Search {
        query: String,

        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Elements ranked by recency-decayed distance
    Recent {
        query: String,

        /// Decay per day of age
        #[arg(long)]
        decay_rate: Option<f64>,

        #[arg(long, value_enum)]
        order: Option<CliOrder>,

        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Print one stored element
    Show { id: i64 },
    /// Element counts per category
    Stats,
}

#[derive(clap::Args)]
struct FilterArgs {
    /// Number of results
    #[arg(long)]
    limit: Option<usize>,

    /// Only return elements with this category
    #[arg(long, conflicts_with = "all_categories")]
    category: Option<String>,

    /// Ignore the configured category filter
    #[arg(long)]
    all_categories: bool,
}

impl FilterArgs {
    fn category(&self, settings: &Settings) -> Option<Category> {
        if self.all_categories {
            return None;
        }
        match &self.category {
            Some(label) => Some(Category::from(label.as_str())),
            None => settings.retrieval.category.clone(),
        }
    }

    fn limit(&self, settings: &Settings) -> usize {
        self.limit.unwrap_or(settings.retrieval.limit)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliOrder {
    Asc,
    Desc,
}

impl From<CliOrder> for SortOrder {
    fn from(order: CliOrder) -> Self {
        match order {
            CliOrder::Asc => SortOrder::Ascending,
            CliOrder::Desc => SortOrder::Descending,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries results.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let settings_path = match &cli.config {
        Some(path) => path.clone(),
        None => Settings::default_path()?,
    };
    let mut settings = Settings::load_or_default(&settings_path)?;
    if let Some(db) = cli.db {
        settings.database.path = Some(db);
    }

    let db_path = settings.database_path()?;
    let db = Database::open(&db_path, settings.embedding.dimensions)
        .await
        .with_context(|| format!("opening store at {}", db_path.display()))?;

    match cli.command {
        Commands::Ingest {
            dir,
            recursive,
            skip_malformed,
            dedup,
        } => {
            let mut options = IngestOptions::from_settings(&settings);
            options.recursive |= recursive;
            if skip_malformed {
                options.on_partition_error = PartitionErrorPolicy::Skip;
            }
            if dedup {
                options.insert_mode = InsertMode::SkipDuplicates;
            }

            let embedder = embedding::from_settings(&settings.embedding)?;
            let partitioner = Arc::new(AutoPartitioner::new());
            let service = IngestService::new(db, embedder, partitioner, options);
            let report = service.run(&dir).await?;

            for skipped in &report.skipped {
                eprintln!("skipped\t{}\t{}", skipped.filename, skipped.reason);
            }
            println!(
                "run {}: {} documents, {} elements, {} inserted, {} duplicates",
                report.run_id,
                report.documents,
                report.elements,
                report.inserted.len(),
                report.duplicates
            );
        }
        Commands::Search { query, filter } => {
            let service = SearchService::new(db, embedding::from_settings(&settings.embedding)?);
            let matches = service
                .similar(&query, filter.category(&settings), filter.limit(&settings))
                .await?;
            print_matches(&matches);
        }
        Commands::Recent {
            query,
            decay_rate,
            order,
            filter,
        } => {
            let service = SearchService::new(db, embedding::from_settings(&settings.embedding)?);
            let matches = service
                .recent(
                    &query,
                    decay_rate.unwrap_or(settings.retrieval.decay_rate),
                    order.map(SortOrder::from).unwrap_or(settings.retrieval.decay_order),
                    filter.category(&settings),
                    filter.limit(&settings),
                )
                .await?;
            print_matches(&matches);
        }
        Commands::Show { id } => match elements::get_by_id(&db, ElementId(id)).await? {
            Some(element) => {
                println!("id\t{}", element.id);
                println!("category\t{}", element.category);
                println!("filename\t{}", element.metadata.filename);
                if let Some(subject) = &element.metadata.subject {
                    println!("subject\t{}", subject);
                }
                if let Some(date) = element.metadata.date {
                    println!("date\t{}", date.to_rfc3339());
                }
                println!("from\t{}", element.metadata.sent_from.join(", "));
                println!("to\t{}", element.metadata.sent_to.join(", "));
                println!("text\t{}", one_line(&element.text));
            }
            None => anyhow::bail!("no element with id {}", id),
        },
        Commands::Stats => {
            for (category, count) in elements::count_by_category(&db).await? {
                println!("{}\t{}", category, count);
            }
            println!("total\t{}", elements::count(&db).await?);
        }
    }

    Ok(())
}

fn print_matches(matches: &[Match]) {
    for m in matches {
        println!("{}\t{:.6}\t{}", m.id, m.score, one_line(&m.text));
    }
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
