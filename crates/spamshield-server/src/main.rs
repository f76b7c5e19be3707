//! SpamShield: SMS spam tagging as a batch command and an HTTP service.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use spamshield_core::{RecordSet, SpamShieldConfig};
use spamshield_runtime::TaggingOrchestrator;
use spamshield_server::{build_router, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn resolve_model_dir() -> PathBuf {
    std::env::var("SPAMSHIELD_MODEL_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));
            if let Some(dir) = exe_dir {
                let parent_models = dir.join("../models");
                if parent_models.exists() {
                    return parent_models;
                }
            }
            PathBuf::from("models")
        })
}

fn print_help() {
    println!("SpamShield: SMS spam tagging pipeline");
    println!();
    println!("Usage: spamshield [command]");
    println!();
    println!("Commands:");
    println!("  (none) | serve               Start the HTTP server");
    println!("  tag <input.json> [out.json]  Tag a JSON array of records");
    println!("  help                         Show this help message");
    println!();
    println!("Models are read from $SPAMSHIELD_MODEL_DIR (default: models/).");
}

/// Load config and every model. Runs off the async executor because the
/// translator owns a blocking HTTP client.
async fn load_pipeline() -> anyhow::Result<(SpamShieldConfig, TaggingOrchestrator)> {
    let model_dir = resolve_model_dir();
    info!("Model directory: {}", model_dir.display());

    tokio::task::spawn_blocking(move || {
        let config = SpamShieldConfig::from_env(&model_dir)?;
        let orchestrator = TaggingOrchestrator::from_config(&config)?;
        Ok::<_, anyhow::Error>((config, orchestrator))
    })
    .await?
}

fn run_tag(
    orchestrator: &TaggingOrchestrator,
    input: &Path,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let records = RecordSet::read_json(input)
        .with_context(|| format!("Failed to load records from {}", input.display()))?;

    let (labeled, report) = orchestrator.tag(&records)?;
    info!(
        "Report: {}",
        serde_json::to_string(&report).unwrap_or_default()
    );

    match output {
        Some(path) => {
            labeled
                .write_json(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} tagged records to {}", labeled.len(), path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&labeled)?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "serve" => {}
            "tag" => {
                if args.len() < 3 {
                    eprintln!("Usage: spamshield tag <input.json> [output.json]");
                    std::process::exit(1);
                }
                let input = PathBuf::from(&args[2]);
                let output = args.get(3).map(PathBuf::from);
                let (_, orchestrator) = load_pipeline().await?;
                return tokio::task::spawn_blocking(move || {
                    run_tag(&orchestrator, &input, output.as_deref())
                })
                .await?;
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'spamshield help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let (config, orchestrator) = load_pipeline().await?;
    let port = config.port;
    let pipeline = orchestrator.info();
    info!(
        "Pipeline ready: encoder={} dim={} translator={}",
        pipeline.encoder, pipeline.embedding_dim, pipeline.translator
    );

    let state = Arc::new(AppState::new(config, orchestrator));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("SpamShield server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
