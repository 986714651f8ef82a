//! NephroCare: CKD risk assessment
//!
//! Reads one clinical record as JSON (first argument, or stdin) and prints
//! the assessment response as JSON on stdout.

use std::io::Read;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use nephrocare::adapters::sanitize::SanitizingMakeWriter;
use nephrocare::adapters::ModelStore;
use nephrocare::application::InferenceContext;
use nephrocare::config::{LogMode, Settings};
use nephrocare::{AssessmentResponse, AssessmentService, TieredInference};

fn main() -> Result<()> {
    let settings = Settings::from_env();

    // Stdout carries the response, so logs go to stderr or a file.
    let (writer, guard) = match settings.log_mode {
        LogMode::File => {
            if let Some(parent) = settings.log_file.parent() {
                // Best-effort: don't fail startup just because the directory is missing.
                let _ = std::fs::create_dir_all(parent);
            }
            match std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&settings.log_file)
            {
                Ok(file) => tracing_appender::non_blocking(file),
                Err(e) => {
                    eprintln!(
                        "Cannot open log file {:?} ({e}); logging to stderr",
                        settings.log_file
                    );
                    tracing_appender::non_blocking(std::io::stderr())
                }
            }
        }
        LogMode::Stderr => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(SanitizingMakeWriter::new(writer)),
        )
        .init();

    let store = ModelStore::load_or_empty(&settings.model_dir, settings.require_manifest);
    let context = InferenceContext::from_store(&store);
    tracing::info!("{} statistical tier(s) ready", context.ready_count());
    let service = AssessmentService::new(TieredInference::new(context))
        .with_explanation(settings.include_explanation);

    let response = match read_input() {
        Ok(input) => service.assess_str(&input),
        Err(e) => {
            tracing::error!("{e:#}");
            AssessmentResponse::failure(format!("{e:#}"))
        }
    };

    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.success {
        drop(guard);
        std::process::exit(1);
    }
    Ok(())
}

fn read_input() -> Result<String> {
    if let Some(arg) = std::env::args().nth(1) {
        return Ok(arg);
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read request from stdin")?;
    Ok(buf)
}
