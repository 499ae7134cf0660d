//! asset_render CLI entry point.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tts_core::style::AUDITION_PROMPT;
use tts_core::{HttpModelLoader, ModelLoader, ModelSpec, Precision, StyleConfig};

use asset_render::{render_audition, render_catalog, Catalog};

/// Pre-render voice clips with the voice-design model.
#[derive(Parser, Debug)]
#[command(name = "asset_render")]
#[command(version)]
struct Args {
    /// Inference backend base URL
    #[arg(long, env = "MODEL_BACKEND_URL", default_value = "http://127.0.0.1:5002")]
    backend: String,

    /// Model identifier to load
    #[arg(long, env = "MODEL_ID", default_value = tts_core::DEFAULT_MODEL_ID)]
    model_id: String,

    /// Device to load the model on; CPU avoids accelerator instability
    #[arg(long, default_value = "cpu")]
    device: String,

    /// Weight precision
    #[arg(long, default_value = "float32")]
    dtype: Precision,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a phrase catalog, skipping clips that already exist
    Assets {
        /// Output directory (e.g. the frontend's public/audio)
        #[arg(short, long, default_value = "../public/audio")]
        out: PathBuf,

        /// JSON catalog `{subfolder: {name: text}}`; defaults to the UI lines
        #[arg(short, long)]
        catalog: Option<PathBuf>,
    },
    /// Render one line with several seeds to pick a voice
    Audition {
        #[arg(short, long)]
        text: String,

        #[arg(short, long, default_value = "audition")]
        out: PathBuf,

        #[arg(long, value_delimiter = ',', default_values_t = [5555u64, 777, 1111, 8888, 1234])]
        seeds: Vec<u64>,

        /// Voice-design instructions; defaults to the audition prompt
        #[arg(long)]
        prompt: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let spec = ModelSpec {
        model_id: args.model_id,
        device_map: args.device,
        dtype: args.dtype,
        ..ModelSpec::default()
    };
    info!("Loading model {} on {}...", spec.model_id, spec.device_map);
    let loader = HttpModelLoader::new(args.backend, spec);
    let mut model = loader.load().context("Failed to load model")?;

    let style = StyleConfig::default();
    match args.command {
        Command::Assets { out, catalog } => {
            let catalog = match catalog {
                Some(path) => Catalog::from_file(&path)?,
                None => Catalog::ui(),
            };
            info!("--- Starting batch generation of {} clip(s) ---", catalog.len());
            let report = render_catalog(model.as_mut(), &style, &catalog, &out)?;
            info!(
                "All assets generated: {} rendered, {} skipped. Output: {}",
                report.rendered,
                report.skipped,
                out.display()
            );
        }
        Command::Audition {
            text,
            out,
            seeds,
            prompt,
        } => {
            let style = style.with_instruct(prompt.unwrap_or_else(|| AUDITION_PROMPT.to_string()));
            let paths = render_audition(model.as_mut(), &style, &text, &seeds, &out)?;
            info!("Done! {} candidate(s) in {}", paths.len(), out.display());
        }
    }

    Ok(())
}
