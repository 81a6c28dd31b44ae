//! CLI binary for tropy-atr.
//!
//! A thin shim over the library crate that maps CLI flags to
//! [`EnrichConfig`] / phase options and prints outcomes.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tropy_atr::{
    run, CatalogDocument, Credentials, EnrichConfig, EnrichOptions, FileLedgerStore,
    SubmitOptions, TranskribusProcessing,
};

const AFTER_HELP: &str = r#"EXAMPLES:
  # Submit all photos of every "Foto" item for recognition
  tropy-atr submit export.json --item-type Foto

  # Submit only the second photo, remapping paths recorded on another machine
  tropy-atr submit export.json --photo-index 1 --common-dir /mnt/share/archive

  # A day later: download the recognition results
  tropy-atr download --ledger mapping.csv

  # Merge transcriptions into the export, with per-line selections
  tropy-atr enrich export_updated.json --lines

  # Catalog overview (no credentials needed)
  tropy-atr inspect export.json --json

WORKFLOW:
  The three phases are separate runs: recognition jobs complete
  asynchronously on the Transkribus side (allow up to 24 hours). The
  ledger file written by `submit` is the only state the phases share —
  keep it until `enrich` has run.

ENVIRONMENT VARIABLES:
  TRANSKRIBUS_USER       Transkribus account email
  TRANSKRIBUS_PASSWORD   Transkribus account password
"#;

/// Enrich Tropy exports with Transkribus text recognition.
#[derive(Parser, Debug)]
#[command(
    name = "tropy-atr",
    version,
    about = "Enrich Tropy catalog exports with Transkribus text recognition",
    arg_required_else_help = true,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Transkribus account email.
    #[arg(long, env = "TRANSKRIBUS_USER", global = true)]
    user: Option<String>,

    /// Transkribus account password.
    #[arg(long, env = "TRANSKRIBUS_PASSWORD", global = true, hide_env_values = true)]
    password: Option<String>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit catalog images for recognition and tag the items.
    Submit {
        /// Tropy export file (JSON-LD).
        export: PathBuf,

        /// Write the updated export here instead of '<export>_updated.json'.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the submission ledger here.
        #[arg(long, default_value = "mapping.csv")]
        ledger: PathBuf,

        /// Only submit items of exactly this type.
        #[arg(long)]
        item_type: Option<String>,

        /// Only submit items carrying this tag.
        #[arg(long)]
        tag: Option<String>,

        /// Only submit the photo at this index (0-based); all photos if omitted.
        #[arg(long)]
        photo_index: Option<usize>,

        /// Lowest directory shared with the authoring machine, for path remapping.
        #[arg(long)]
        common_dir: Option<String>,

        /// Layout/line-detection model id.
        #[arg(long)]
        line_model: Option<u64>,

        /// Text-recognition model id.
        #[arg(long)]
        atr_model: Option<u64>,
    },

    /// Download recognition results for a submission ledger.
    Download {
        /// Submission ledger written by `submit`.
        #[arg(long, default_value = "mapping.csv")]
        ledger: PathBuf,

        /// Write the downloaded results here.
        #[arg(short, long, default_value = "download.json")]
        output: PathBuf,
    },

    /// Merge downloaded transcriptions into a Tropy export.
    Enrich {
        /// Tropy export file (the tagged one written by `submit`).
        export: PathBuf,

        /// Results file written by `download`.
        #[arg(long, default_value = "download.json")]
        results: PathBuf,

        /// Write the enriched export here instead of '<export>_enriched.json'.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also add one selection element per recognised line.
        #[arg(long)]
        lines: bool,

        /// Language code stamped on synthesized notes.
        #[arg(long, default_value = tropy_atr::config::DEFAULT_LANGUAGE)]
        language: String,
    },

    /// Print a catalog overview (item count, types present).
    Inspect {
        /// Tropy export file.
        export: PathBuf,

        /// Output JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },
}

/// Sibling path with a suffix before the extension:
/// `export.json` → `export_updated.json`.
fn derive_output(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());
    input.with_file_name(format!("{stem}{suffix}.json"))
}

/// Default config carrying any credentials given on the command line;
/// `TranskribusProcessing::from_config` falls back to the environment.
fn base_config(cli: &Cli) -> Result<EnrichConfig> {
    let mut builder = EnrichConfig::builder();
    if let (Some(user), Some(password)) = (&cli.user, &cli.password) {
        builder = builder.credentials(Credentials::new(user.as_str(), password.as_str()));
    }
    builder.build().context("Invalid configuration")
}

async fn login(config: &EnrichConfig) -> Result<TranskribusProcessing> {
    TranskribusProcessing::from_config(config)
        .await
        .context("Failed to authenticate with the Transkribus Processing API")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Submit {
            export,
            output,
            ledger,
            item_type,
            tag,
            photo_index,
            common_dir,
            line_model,
            atr_model,
        } => {
            let config = base_config(&cli)?;
            let service = login(&config).await?;
            let store = FileLedgerStore::new(ledger.clone(), PathBuf::from("download.json"));
            let options = SubmitOptions {
                item_type: item_type.clone(),
                tag: tag.clone(),
                photo_index: *photo_index,
                lowest_common_dir: common_dir.clone(),
                line_model_id: *line_model,
                atr_model_id: *atr_model,
            };
            let save_path = output
                .clone()
                .unwrap_or_else(|| derive_output(export, "_updated"));

            let outcome =
                run::submit_catalog(export, &save_path, &store, &options, &config, &service)
                    .await
                    .context("Submission failed")?;

            eprintln!(
                "{} images from {} items submitted ({} skipped)",
                outcome.submitted_images,
                outcome.selected_records,
                outcome.skipped.len()
            );
            eprintln!("ledger:  {}", ledger.display());
            eprintln!("catalog: {}", save_path.display());
        }

        Command::Download { ledger, output } => {
            let config = base_config(&cli)?;
            let service = login(&config).await?;
            let store = FileLedgerStore::new(ledger.clone(), output.clone());

            let result = run::download_results(&store, &config, &service)
                .await
                .context("Download failed")?;

            eprintln!("{} results downloaded to {}", result.len(), output.display());
        }

        Command::Enrich {
            export,
            results,
            output,
            lines,
            language,
        } => {
            let config = EnrichConfig::builder()
                .language(language.as_str())
                .build()
                .context("Invalid configuration")?;
            let store = FileLedgerStore::new(PathBuf::from("mapping.csv"), results.clone());
            let options = EnrichOptions { lines: *lines };
            let save_path = output
                .clone()
                .unwrap_or_else(|| derive_output(export, "_enriched"));

            let outcome = run::enrich_catalog(export, &save_path, &store, &options, &config)
                .await
                .context("Enrichment failed")?;

            eprintln!(
                "{} items enriched, {} selections added ({} skipped)",
                outcome.enriched_records,
                outcome.selections_added,
                outcome.skipped.len()
            );
            eprintln!("catalog: {}", save_path.display());
        }

        Command::Inspect { export, json } => {
            let catalog = CatalogDocument::load(export)
                .await
                .context("Failed to load export")?;
            let summary = run::inspect(&catalog);

            if *json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&summary)
                        .context("Failed to serialize summary")?
                );
            } else {
                println!("File:   {}", export.display());
                println!("Items:  {}", summary.records);
                println!(
                    "Types:  {}",
                    if summary.types.is_empty() {
                        "(none)".to_string()
                    } else {
                        summary.types.into_iter().collect::<Vec<_>>().join(", ")
                    }
                );
            }
        }
    }

    Ok(())
}
