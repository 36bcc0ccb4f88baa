use clap::{Args as ClapArgs, Parser, Subcommand};
use fieldrecon_api::{AppState, RestApi};
use fieldrecon_core::{EngineConfig, TypeHints};
use fieldrecon_similarity::{CompareOptions, Reconciler, StaticHintProvider, TokenHint};
use fieldrecon_storage::ModelRepository;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Reconcile API field structures against canonical data models
#[derive(Parser, Debug)]
#[command(name = "fieldrecon")]
#[command(about = "Schema reconciliation engine", long_about = None)]
struct Args {
    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Fuzzy match threshold, overrides the config file
    #[arg(long, global = true)]
    threshold: Option<f64>,

    /// Log level (ignored when RUST_LOG is set)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the REST API
    Serve {
        /// HTTP API port
        #[arg(long, default_value_t = 8080)]
        port: u16,

        /// Path to the data directory
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,
    },
    /// Compare an API document from the command line and print the result
    Compare(CompareArgs),
}

#[derive(ClapArgs, Debug)]
struct CompareArgs {
    /// API document (OpenAPI JSON)
    #[arg(long)]
    api: PathBuf,

    /// Canonical model document; when omitted, candidates come from --data-dir
    #[arg(long)]
    model: Option<PathBuf>,

    /// Model store to select candidates from
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Type hints for path-list models (JSON object of path to type)
    #[arg(long)]
    type_hints: Option<PathBuf>,

    /// Token hints (JSON array of {"token", "related"}) enabling hint augmentation
    #[arg(long)]
    hints: Option<PathBuf>,

    /// Mapping key used by candidate selection
    #[arg(long)]
    system_code: Option<String>,

    /// Report name, defaults to the document title
    #[arg(long)]
    api_name: Option<String>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

fn init_logging(log_level: &str) -> anyhow::Result<()> {
    if std::env::var_os("RUST_LOG").is_some() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
        return Ok(());
    }

    let log_level = match log_level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn load_config(path: Option<&Path>, threshold: Option<f64>) -> anyhow::Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(threshold) = threshold {
        config.fuzzy_threshold = threshold;
        config.validate()?;
    }
    Ok(config)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let bytes = std::fs::read(path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let config = load_config(args.config.as_deref(), args.threshold)?;

    match args.command {
        Command::Serve { port, data_dir } => serve(config, port, data_dir).await,
        Command::Compare(compare_args) => compare(config, compare_args).await,
    }
}

async fn serve(config: EngineConfig, port: u16, data_dir: PathBuf) -> anyhow::Result<()> {
    info!("Starting fieldrecon v{}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {:?}", data_dir);
    info!("Fuzzy threshold: {}", config.fuzzy_threshold);

    let repository = Arc::new(ModelRepository::open(&data_dir)?);
    info!("Model store initialized: {} models", repository.len());

    let reconciler = Arc::new(Reconciler::new(config)?);
    reconciler.init()?;

    let state = AppState {
        reconciler: reconciler.clone(),
        repository,
    };
    let http_handle = std::thread::spawn(move || {
        info!("Starting HTTP server on port {}", port);
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(state, port).await {
                tracing::error!("HTTP server error: {}", e);
            }
        })
    });

    info!("HTTP API: http://localhost:{}/", port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = tokio::task::spawn_blocking(move || {
            http_handle.join().ok();
        }) => {
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    reconciler.shutdown();
    Ok(())
}

async fn compare(config: EngineConfig, args: CompareArgs) -> anyhow::Result<()> {
    let mut reconciler = Reconciler::new(config)?;

    let mut options = CompareOptions {
        system_code: args.system_code,
        api_name: args.api_name,
        ..CompareOptions::default()
    };
    if let Some(path) = &args.type_hints {
        options.type_hints = Some(read_json::<TypeHints>(path)?);
    }
    if let Some(path) = &args.hints {
        let hints: Vec<TokenHint> = read_json(path)?;
        info!("Loaded {} token hints", hints.len());
        reconciler = reconciler.with_hint_provider(Arc::new(StaticHintProvider::new(hints)));
        options.ai_hints = true;
    }

    let api_bytes = std::fs::read(&args.api)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", args.api.display(), e))?;
    let api = reconciler.parse_document(&api_bytes)?;

    let output = match (&args.model, &args.data_dir) {
        (Some(model_path), _) => {
            let model_bytes = std::fs::read(model_path)
                .map_err(|e| anyhow::anyhow!("cannot read {}: {}", model_path.display(), e))?;
            let model = reconciler.parse_document(&model_bytes)?;
            let result = reconciler.compare(&api, &model, &options).await?;
            serde_json::to_value(result.as_ref())?
        }
        (None, Some(data_dir)) => {
            let repository = ModelRepository::open(data_dir)?;
            let comparison = reconciler
                .compare_with_source(&api, &repository, &options)
                .await?;
            serde_json::to_value(&comparison)?
        }
        (None, None) => anyhow::bail!("either --model or --data-dir is required"),
    };

    let text = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", text);
    Ok(())
}
