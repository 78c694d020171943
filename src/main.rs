//! url-sentinel entrypoint: train a model offline, assess URLs, inspect features and history.

use clap::{Parser, Subcommand};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use url_sentinel::{
    config::SentinelConfig,
    decision::{AssessmentContext, DecisionEngine},
    features::{FeatureExtractor, Lexicon},
    logging::StructuredLogger,
    model::ModelSlot,
    storage::VerdictStore,
    training::{self, RawLabeledUrl},
    Error, Result,
};

#[derive(Parser, Debug)]
#[command(name = "url-sentinel")]
#[command(author, version, about = "Assess URLs for phishing and malware indicators")]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (JSON); defaults apply when missing
    #[arg(long, env = "URL_SENTINEL_CONFIG_PATH", default_value = "config.json")]
    config: PathBuf,

    /// Override the model artifact path
    #[arg(long, env = "URL_SENTINEL_MODEL_PATH")]
    model: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train on a labeled dataset and write the model artifact
    Train {
        /// JSON lines (`{"url": .., "type": ..}`) or CSV with `url,type` columns
        #[arg(short, long)]
        dataset: PathBuf,

        /// Artifact output path (defaults to the configured model path)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Assess one or more URLs; prints one JSON verdict per line
    Assess {
        #[arg(required = true)]
        urls: Vec<String>,

        /// Client identifier stored (encrypted) with each check
        #[arg(long)]
        client_id: Option<String>,

        /// Do not record checks in the local store
        #[arg(long)]
        no_store: bool,
    },

    /// Print the feature vector of a URL
    Features { url: String },

    /// Print recently recorded checks
    History {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

fn load_lexicon(config: &SentinelConfig) -> Result<Arc<Lexicon>> {
    match &config.lexicon_path {
        Some(path) => {
            let lexicon = Lexicon::load(path)?;
            info!(path = %path.display(), version = lexicon.version, "lexicon loaded");
            Ok(Arc::new(lexicon))
        }
        None => Ok(Arc::new(Lexicon::default())),
    }
}

fn open_store(config: &SentinelConfig) -> Result<VerdictStore> {
    let secret = match std::env::var(&config.store.secret_env) {
        Ok(s) if !s.is_empty() => s,
        _ => {
            warn!(env = %config.store.secret_env, "store secret not set; using built-in placeholder");
            "url-sentinel-local-secret".to_string()
        }
    };
    VerdictStore::open(&config.store_path(), secret.as_bytes())
}

/// JSON lines by default; `.csv` files are read as `url,type` with a header row.
fn read_dataset(path: &Path) -> Result<Vec<RawLabeledUrl>> {
    let reader = BufReader::new(std::fs::File::open(path)?);
    let csv = path
        .extension()
        .map_or(false, |e| e.eq_ignore_ascii_case("csv"));
    let mut rows = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || (csv && n == 0) {
            continue;
        }
        if csv {
            let (url, category) = line.rsplit_once(',').ok_or_else(|| {
                Error::invalid_dataset(format!("line {}: expected `url,type`", n + 1))
            })?;
            rows.push(RawLabeledUrl {
                url: url.trim().trim_matches('"').to_string(),
                category: category.trim().trim_matches('"').to_string(),
            });
        } else {
            let row = serde_json::from_str(line)
                .map_err(|e| Error::invalid_dataset(format!("line {}: {}", n + 1, e)))?;
            rows.push(row);
        }
    }
    Ok(rows)
}

fn run_train(config: &SentinelConfig, model_path: &Path, dataset: &Path, out: Option<PathBuf>) -> Result<()> {
    let raw = read_dataset(dataset)?;
    info!(rows = raw.len(), path = %dataset.display(), "dataset read");
    let extractor = FeatureExtractor::new(load_lexicon(config)?);
    let run = training::train(&raw, &extractor, &config.training)?;

    for family in &run.selection.families {
        println!(
            "{:<20} cv weighted F1 {:.4} (+/- {:.4})  {}",
            family.family.as_str(),
            family.cv_mean,
            family.cv_std * 2.0,
            family.best_params
        );
    }
    for (family, err) in &run.selection.failures {
        println!("{:<20} excluded: {}", family.as_str(), err);
    }
    println!("selected: {} ({})", run.model.family, run.model.params);
    if let Some(report) = &run.evaluation {
        println!("{}", report);
    }

    let out = out.unwrap_or_else(|| model_path.to_path_buf());
    run.model.save(&out)?;
    println!("model written to {}", out.display());
    Ok(())
}

fn run_assess(
    config: &SentinelConfig,
    model_path: &Path,
    urls: &[String],
    client_id: Option<String>,
    no_store: bool,
) -> Result<()> {
    let slot = Arc::new(ModelSlot::load_from(model_path));
    let mut engine = DecisionEngine::from_config(config, load_lexicon(config)?, slot);
    if config.store.enabled && !no_store {
        match open_store(config) {
            Ok(store) => engine = engine.with_sink(Arc::new(store)),
            Err(e) => warn!(error = %e, "verdict store unavailable; checks will not be recorded"),
        }
    }

    let context = AssessmentContext {
        client_id,
        status_message: None,
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for url in urls {
        let verdict = engine.assess_with_context(url, &context);
        StructuredLogger::emit_json(&verdict, &mut out)?;
    }
    Ok(())
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let config = SentinelConfig::load(&cli.config);
    StructuredLogger::init(config.log.json, &config.log.level);

    let model_path = cli.model.clone().unwrap_or_else(|| config.model_path.clone());

    match cli.command {
        Commands::Train { dataset, out } => run_train(&config, &model_path, &dataset, out)?,
        Commands::Assess {
            urls,
            client_id,
            no_store,
        } => run_assess(&config, &model_path, &urls, client_id, no_store)?,
        Commands::Features { url } => {
            let extractor = FeatureExtractor::new(load_lexicon(&config)?);
            let features = extractor.extract(&url);
            println!("{}", serde_json::to_string_pretty(&features)?);
        }
        Commands::History { limit } => {
            let store = open_store(&config)?;
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            for check in store.recent_checks(limit)? {
                StructuredLogger::emit_json(&check, &mut out)?;
            }
        }
    }
    Ok(())
}
