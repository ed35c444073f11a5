//! qrsheets command line.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use qrsheets::config::Config;
use qrsheets::export::{ExportCoordinator, FixedDestination, FsSink};
use qrsheets::markup::QrMarkup;
use qrsheets::print::{HtmlSpool, PrintCoordinator, PrintOutcome};
use qrsheets::render::{PageRenderer, SvgRasterizer};
use qrsheets::workbook::{load_sheets, CalamineReader, SpreadsheetReader};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "qrsheets", version, about = "Labeled QR code sheets from spreadsheets")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    render: RenderArgs,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the sheets of a workbook
    Sheets { workbook: PathBuf },

    /// Export every page as PNG under OUT/<sheet>/cheat-sheet-N.png
    Export {
        workbook: PathBuf,
        /// Sheets to export, all when omitted
        #[arg(short, long = "sheet")]
        sheets: Vec<String>,
        /// Destination root; nothing is written without it
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Print the export report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Spool all sheets into one printable HTML document
    Print {
        workbook: PathBuf,
        #[arg(short, long = "sheet")]
        sheets: Vec<String>,
        #[arg(long)]
        spool: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
struct RenderArgs {
    #[arg(long, global = true, env = "QRSHEETS_MARKUP_TIMEOUT_MS")]
    markup_timeout_ms: Option<u64>,
    #[arg(long, global = true, env = "QRSHEETS_RENDER_TIMEOUT_MS")]
    render_timeout_ms: Option<u64>,
    #[arg(long, global = true, env = "QRSHEETS_RENDER_CONCURRENCY")]
    concurrency: Option<usize>,
    #[arg(long, global = true, env = "QRSHEETS_FONT_DIR")]
    font_dir: Option<PathBuf>,
    /// Skip installed system fonts
    #[arg(long, global = true)]
    no_system_fonts: bool,
}

impl RenderArgs {
    fn apply(&self, mut config: Config) -> Config {
        if let Some(ms) = self.markup_timeout_ms {
            config.markup_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.render_timeout_ms {
            config.render_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = self.concurrency {
            config.render_concurrency = n;
        }
        if self.font_dir.is_some() {
            config.font_dir = self.font_dir.clone();
        }
        if self.no_system_fonts {
            config.system_fonts = false;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qrsheets=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.render.apply(Config::from_env());
    config.validate()?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, stopping after the current page");
                cancel.cancel();
            }
        });
    }

    let reader = CalamineReader;
    match cli.command {
        Command::Sheets { workbook } => {
            let names = reader
                .sheet_names(&workbook)
                .await
                .with_context(|| format!("Failed to open workbook {}", workbook.display()))?;
            for name in names {
                println!("{name}");
            }
        }
        Command::Export {
            workbook,
            sheets,
            out,
            json,
        } => {
            let sheets = load_sheets(&reader, &workbook, &sheets)
                .await
                .with_context(|| format!("Failed to read workbook {}", workbook.display()))?;
            let rasterizer = SvgRasterizer::new(&config);
            let renderer = PageRenderer::new(QrMarkup::default(), rasterizer, config);
            let exporter = ExportCoordinator::new(renderer, FixedDestination(out), FsSink)
                .with_cancellation(cancel);

            let report = exporter.export_all(&sheets).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for path in &report.written {
                    println!("{}", path.display());
                }
                for failure in &report.failures {
                    eprintln!(
                        "skipped {} page {}: {}",
                        failure.sheet, failure.page, failure.reason
                    );
                }
            }
        }
        Command::Print {
            workbook,
            sheets,
            spool,
        } => {
            let sheets = load_sheets(&reader, &workbook, &sheets)
                .await
                .with_context(|| format!("Failed to read workbook {}", workbook.display()))?;
            let renderer = PageRenderer::new(QrMarkup::default(), (), config);
            let printer = PrintCoordinator::new(renderer, HtmlSpool { path: spool })
                .with_cancellation(cancel);

            match printer.print_all(&sheets).await {
                PrintOutcome::Presented { pages } => println!("{pages} page(s) spooled"),
                other => eprintln!("Nothing printed: {other:?}"),
            }
        }
    }

    Ok(())
}
