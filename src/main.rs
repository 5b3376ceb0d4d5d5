//! CLI entry point for the book ratings sync tool.
//!
//! Aggregates a ratings CSV and creates one Notion database record per book that the
//! database does not already contain.

use anyhow::{Context, Result};
use book_ratings_sync::config::SyncConfig;
use book_ratings_sync::infra::notion::NotionClient;
use book_ratings_sync::output::{append_record, print_json};
use book_ratings_sync::sync::{self, SyncOptions, existing_titles};
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "book_ratings_sync")]
#[command(about = "Sync aggregated book ratings from a CSV file into a Notion database", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Ratings file: book, rater, rating per row, no header
    #[arg(short, long, default_value = "ratings.csv")]
    input: PathBuf,

    /// Field delimiter
    #[arg(short, long, default_value_t = ',')]
    delimiter: char,
}

impl InputArgs {
    fn options(&self, dry_run: bool) -> Result<SyncOptions> {
        let delimiter = u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .with_context(|| {
                format!("Delimiter '{}' must be a single ASCII character", self.delimiter)
            })?;

        Ok(SyncOptions {
            input: self.input.clone(),
            delimiter,
            dry_run,
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate the ratings file and create records for new books
    Sync {
        #[command(flatten)]
        input: InputArgs,

        /// Log the records that would be created without creating them
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Optional: CSV file to append a run summary to
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Aggregate the ratings file locally and log per-book statistics
    Summarize {
        #[command(flatten)]
        input: InputArgs,

        /// Dump the aggregates as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List the book titles already present in the database
    ListBooks,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/book_ratings_sync.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("book_ratings_sync.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match execute(cli.command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            error!("An error occurred: {e:#}");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn execute(command: Commands) -> Result<()> {
    match command {
        Commands::Sync {
            input,
            dry_run,
            report,
        } => {
            let options = input.options(dry_run)?;
            let config = SyncConfig::from_env()?;
            let client = NotionClient::from_config(&config)?;

            let summary = sync::run(&client, &config.database_id, &options).await?;

            if let Some(path) = report {
                append_record(&path, &summary)?;
                info!(path = %path.display(), "Run summary appended");
            }
        }
        Commands::Summarize { input, json } => {
            let options = input.options(true)?;
            let Some(aggregation) = sync::load_and_aggregate(&options)? else {
                return Ok(());
            };

            for (title, stats) in &aggregation.books {
                info!(
                    book = %title,
                    ratings = stats.num_ratings,
                    average_rating = stats.average_rating(),
                    favourites = stats.num_favourites,
                    "Book"
                );
            }

            info!(
                rows = aggregation.rows_read,
                books = aggregation.books.len(),
                invalid_rows = aggregation.invalid_rows(),
                invalid_ratings = aggregation.invalid_ratings(),
                duplicates = aggregation.duplicate_ratings,
                "Ratings summary"
            );

            if json {
                print_json(&aggregation)?;
            }
        }
        Commands::ListBooks => {
            let config = SyncConfig::from_env()?;
            let client = NotionClient::from_config(&config)?;

            let titles = existing_titles(&client, &config.database_id).await?;

            let mut titles: Vec<_> = titles.into_iter().collect();
            titles.sort();
            for title in &titles {
                info!(title = %title, "Book");
            }
            info!(total = titles.len(), "Book list fetched");
        }
    }

    Ok(())
}
