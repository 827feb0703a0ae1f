//! ReaderLens - reading-history analysis sessions from the terminal
//!
//! Picks borrow-record workbooks and a reader list, hands them to an
//! analysis engine, and writes per-reader charts and data dumps.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any error (invalid input, engine failure, write failure, etc.)

mod analysis;
mod charts;
mod cli;
mod config;
mod engine;
mod error;
mod export;
mod models;
mod picker;
mod session;
mod view;

use anyhow::{Context, Result};
use charts::{ChartRegistry, RasterBackend};
use chrono::Utc;
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use engine::Backend;
use picker::FsPicker;
use session::{AnalysisOrchestrator, SwitchOutcome, TerminalProgress};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use view::ViewController;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("ReaderLens v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run_session(args).await {
        error!("Session failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .readerlens.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to choose the engine backend, output directory and chart size.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run one analysis session from input picking to exported artifacts.
async fn run_session(args: Args) -> Result<()> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let backend =
        Backend::from_config(&config.engine).context("Failed to set up the analysis engine")?;
    println!("🔌 Engine: {} ({})", backend.kind(), backend.describe());
    println!("   Timeout: {}s", config.engine.timeout_seconds);

    let output_dir = config.general.output_dir.clone();
    let picker = FsPicker::new(output_dir.clone())
        .with_borrow_files(args.borrow.clone())
        .with_reader_list(args.reader_list.clone())
        .with_input_dir(config.picker.input_dir.clone());

    let orchestrator = AnalysisOrchestrator::new(backend)
        .with_timeout(Duration::from_secs(config.engine.timeout_seconds))
        .with_extensions(config.picker.extensions.clone());

    if !args.no_charts {
        if let Some(font) = charts::font::install(config.charts.font_path.as_deref()) {
            debug!("Chart text uses {}", font.display());
        }
    }

    let view = Rc::new(ViewController::new(ChartRegistry::new(
        RasterBackend,
        config.charts.width,
        config.charts.height,
    )));
    orchestrator.subscribe(view.clone());
    let progress = orchestrator.subscribe(Rc::new(TerminalProgress::new(!args.quiet)));

    // Step 1: Pick the inputs
    let selection = orchestrator.select_inputs(&picker).await?;
    println!(
        "📥 Borrow records: {} file(s), reader list: {}",
        selection.borrow_files.len(),
        selection
            .member_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".to_string())
    );

    // Step 2: Load every document and analyze the first one
    println!("\n🔬 Running analysis...");
    orchestrator.run_full_analysis(&selection).await?;
    println!("   Found {} reader documents", orchestrator.list_documents().len());

    if args.list_documents {
        print_documents(&orchestrator).await?;
    }

    // Step 3: Optionally switch to another document
    if let Some(index) = args.document {
        match orchestrator.switch_active_document(index).await? {
            SwitchOutcome::Committed(record) => {
                println!("\n🔀 Switched to document {}: {}", index, record.reader_name)
            }
            SwitchOutcome::AlreadyActive(_) => {
                println!("\n🔀 Document {} is already active", index)
            }
            SwitchOutcome::Superseded => warn!("Switch to document {} was superseded", index),
        }
    }

    // Progress output is done; keep the summary clean.
    orchestrator.unsubscribe(progress);

    // Step 4: Show the statistics
    let record = orchestrator.active_record()?;
    println!("\n📊 Reader statistics:");
    print!("{}", view::render_cards(&record));

    // Step 5: Write charts and the data dump
    if args.no_charts {
        debug!("Chart images disabled");
    } else {
        let written = view.export_charts(&output_dir)?;
        println!("\n🖼  {} chart image(s) written", written.len());
        for path in &written {
            println!("   {}", path.display());
        }
    }

    let dump = export::write_session_dump(&record, &output_dir, Utc::now().date_naive())?;
    println!("💾 Session data: {}", dump.display());

    // Step 6: Engine reports
    if args.export_report {
        match orchestrator.export_report(&picker).await? {
            Some(path) => println!("📝 Report: {}", path.display()),
            None => println!("📝 Report export cancelled"),
        }
    }

    if args.export_all {
        match orchestrator.export_all_reports(&picker).await? {
            Some(paths) => println!("📝 {} report(s) exported", paths.len()),
            None => println!("📝 Report export cancelled"),
        }
    }

    println!("\n✅ Done! Output saved to: {}", output_dir.display());
    Ok(())
}

/// Print the session's documents, checked against the engine's own list.
async fn print_documents<S: engine::AnalysisService>(
    orchestrator: &AnalysisOrchestrator<S>,
) -> Result<()> {
    let documents = orchestrator.list_documents();
    let names = orchestrator.document_names().await?;

    if names.len() != documents.len() {
        warn!(
            "Engine reports {} documents, session holds {}",
            names.len(),
            documents.len()
        );
    }
    for (doc, name) in documents.iter().zip(&names) {
        if doc.primary_name != *name {
            warn!("Document {} is named '{}' by the engine", doc.index, name);
        }
    }

    println!("\n📄 Documents:");
    print!(
        "{}",
        view::render_documents(&documents, orchestrator.active_index())
    );
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
