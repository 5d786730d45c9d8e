use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use qm_ingest_service::fetcher::{SourceFetcher, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT_SECS};
use qm_ingest_service::qm::{select_sheet, QmImporter, QmSheet, SheetHint};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "qm-import")]
#[command(about = "Import a call-center QM workbook and print its rows as JSON", long_about = None)]
struct Cli {
    /// Local path or http(s) URL of the workbook
    #[arg(long)]
    source: String,

    /// Sheet to import (falls back to automatic selection if absent from the workbook)
    #[arg(long)]
    sheet: Option<String>,

    /// Reporting month, YYYY-MM
    #[arg(long)]
    month: Option<String>,

    /// Cookie sent with every download request
    #[arg(long, env = "SOURCE_COOKIE", hide_env_values = true)]
    cookie: Option<String>,

    /// Print the workbook's sheets and the selected one instead of importing
    #[arg(long)]
    list_sheets: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Maximum redirects followed while downloading
    #[arg(long, default_value_t = DEFAULT_MAX_REDIRECTS)]
    max_redirects: usize,

    /// Request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Keep the downloaded workbook at this path instead of deleting it
    #[arg(long)]
    keep_file: Option<PathBuf>,
}

#[derive(Serialize)]
struct SheetsOutput<'a> {
    sheets: &'a [String],
    selected: &'a str,
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), serde_json::Error> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    // stdout carries the JSON output, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let start_time = Instant::now();

    let fetcher =
        SourceFetcher::with_options(Duration::from_secs(cli.timeout_secs), cli.max_redirects);
    let fetched = fetcher
        .fetch_with_cookie(&cli.source, cli.cookie.as_deref())
        .await?;
    info!("Reading workbook {}", fetched.path().display());

    let hint = SheetHint {
        explicit_sheet: cli.sheet.clone(),
        month: cli.month.clone(),
    };
    let importer = QmImporter::new(fetched.path());

    if cli.list_sheets {
        let sheets = importer.sheet_names()?;
        let selected = select_sheet(&sheets, &hint)?;
        print_json(
            &SheetsOutput {
                sheets: &sheets,
                selected: &selected,
            },
            cli.pretty,
        )?;
    } else {
        let QmSheet { sheet, rows } = importer.import(&hint)?;
        if rows.is_empty() {
            warn!("Sheet {} yielded no rows", sheet);
        }
        info!(
            "Imported {} rows from sheet {} in {:.2}s",
            rows.len(),
            sheet,
            start_time.elapsed().as_secs_f64()
        );
        print_json(&rows, cli.pretty)?;
    }

    if let Some(dest) = cli.keep_file.as_deref() {
        if fetched.is_downloaded() {
            let path = fetched.persist(Some(dest))?;
            info!("Kept downloaded workbook at {}", path.display());
        } else {
            warn!("--keep-file ignored for local source {}", cli.source);
        }
    }

    Ok(())
}
