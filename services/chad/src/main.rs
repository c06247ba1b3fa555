//! CHAD command-line front end.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use chad::{
    first_case_number, load_session_config, run_commands, BundleWriter, CaseNotebook, ConsoleRenderer,
    JsonDatasetSource, SessionSettings,
};
use clickhist::{DataSource, ExploreSession, JointHistogram, Renderer, VariablePair};

/// Joint-histogram case selection for paired precipitation datasets
#[derive(Parser, Debug)]
#[command(name = "chad")]
#[command(about = "Pick cases out of a joint histogram of two coregistered variables")]
struct Args {
    /// Session configuration file
    #[arg(short, long, default_value = "session.yaml", env = "CHAD_CONFIG")]
    config: PathBuf,

    /// Dataset file, overriding the one named in the session file
    #[arg(long, env = "CHAD_DATASET")]
    dataset: Option<PathBuf>,

    /// Seed for the per-cell sample
    #[arg(long)]
    seed: Option<u64>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "json", env = "CHAD_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive session on stdin/stdout (default)
    Explore,
    /// Print the histogram, quantiles and non-empty cells, then exit
    Summary,
    /// Check the session file, templates and dataset without exploring
    Validate,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.log_format);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(run(args))
}

fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // stdout belongs to the console renderer
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

async fn run(args: Args) -> Result<()> {
    let mut settings = load_session_config(&args.config)?;
    if let Some(dataset) = args.dataset {
        settings.dataset.path = dataset;
    }
    if args.seed.is_some() {
        settings.engine.sample_seed = args.seed;
    }

    info!(
        config = %args.config.display(),
        tag = %settings.tag,
        dataset = %settings.dataset.path.display(),
        label = %settings.engine.metadata_label(),
        "Loaded session"
    );

    match args.command.unwrap_or(Commands::Explore) {
        Commands::Explore => explore(settings).await,
        Commands::Summary => summary(settings).await,
        Commands::Validate => validate(settings).await,
    }
}

async fn load_window(settings: &SessionSettings) -> Result<VariablePair> {
    let source = JsonDatasetSource::new(
        settings.dataset.clone(),
        settings.engine.x.metadata.clone(),
        settings.engine.y.metadata.clone(),
    );
    let pair = source
        .fetch_window(&settings.engine.bounds)
        .await
        .with_context(|| format!("Failed to load {:?}", settings.dataset.path))?;
    Ok(pair)
}

async fn explore(settings: SessionSettings) -> Result<()> {
    let bundle = BundleWriter::new(&settings.output_dir, &settings.tag, settings.templates.clone());
    bundle.check_templates().await?;

    let pair = load_window(&settings).await?;

    let x = settings.engine.x.metadata.clone();
    let y = settings.engine.y.metadata.clone();
    let notebook = CaseNotebook::open(
        &settings.output_dir,
        &settings.tag,
        &settings.engine.metadata_label(),
        x.clone(),
        y.clone(),
    )
    .await?;
    let first_case = first_case_number(&bundle, &notebook).await?;
    info!(path = %notebook.path().display(), first_case, "Case notebook ready");

    let renderer = ConsoleRenderer::new(std::io::stdout(), x, y);
    let mut session = ExploreSession::from_config(
        &settings.engine,
        pair,
        Arc::new(bundle),
        Arc::new(notebook),
        renderer,
    )?
    .with_first_case(first_case);

    session.start();
    session.renderer_mut().show_help();

    let stats = run_commands(&mut session, BufReader::new(tokio::io::stdin())).await?;

    info!(
        session_id = %session.session_log().session_id(),
        cases = session.session_log().len(),
        rejected = stats.rejected,
        "Session ended"
    );
    Ok(())
}

async fn summary(settings: SessionSettings) -> Result<()> {
    let pair = load_window(&settings).await?;
    let engine = &settings.engine;
    let histogram = JointHistogram::build(&pair.x, &pair.y, &engine.x.edges, &engine.y.edges)?;

    let mut renderer = ConsoleRenderer::new(
        std::io::stdout(),
        engine.x.metadata.clone(),
        engine.y.metadata.clone(),
    );
    renderer.show_histogram(&engine.metadata_label(), &histogram.regions());
    renderer.show_overlay(&histogram.quantile_markers(&engine.quantiles));
    renderer.show_cell_table(&histogram);
    Ok(())
}

async fn validate(settings: SessionSettings) -> Result<()> {
    let bundle = BundleWriter::new(&settings.output_dir, &settings.tag, settings.templates.clone());
    bundle.check_templates().await?;

    let pair = load_window(&settings).await?;
    let engine = &settings.engine;
    let histogram = JointHistogram::build(&pair.x, &pair.y, &engine.x.edges, &engine.y.edges)?;

    let [nt, nlat, nlon] = pair.shape().as_array();
    println!("Session '{}' OK", settings.tag);
    println!("  {}", engine.metadata_label());
    println!("  Window: {} times x {} lats x {} lons", nt, nlat, nlon);
    println!(
        "  Valid: {} = {}, {} = {}",
        engine.x.metadata.id,
        pair.x.valid_count(),
        engine.y.metadata.id,
        pair.y.valid_count()
    );
    println!(
        "  Binned: {} in {}x{} cells",
        histogram.total_count(),
        histogram.n_bins_x(),
        histogram.n_bins_y()
    );
    println!("  Templates: {}", settings.templates.len());
    Ok(())
}
