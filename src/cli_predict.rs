use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead};
use std::path::PathBuf;

use anime_score_server::load_artifacts;
use anime_score_server::pipeline::{
    AnimeAttributes, OneHotPolicy, PipelineOptions, ScorePipeline, SourceFallback,
};

fn parse_model_dir(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s)
        .canonicalize()
        .with_context(|| format!("Cannot resolve {}", s))?;
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

/// Reads one JSON prediction request per line from stdin and prints the
/// predicted score for each.
#[derive(Parser, Debug)]
struct CliArgs {
    #[clap(value_parser = parse_model_dir)]
    pub model_dir: PathBuf,

    #[clap(long)]
    pub drop_first: bool,

    #[clap(long, value_enum, default_value_t = SourceFallback::StudioMean)]
    pub source_fallback: SourceFallback,

    /// Also print the feature trace of every prediction.
    #[clap(long)]
    pub trace: bool,
}

fn predict_line(pipeline: &ScorePipeline, line: &str, trace: bool) -> String {
    let attributes = match AnimeAttributes::from_json_slice(line.as_bytes()) {
        Ok(attributes) => attributes,
        Err(err) => return format!("error: {}", err),
    };
    match pipeline.predict(&attributes) {
        Ok(prediction) if trace => match serde_json::to_string(&prediction.trace) {
            Ok(trace) => format!("{} {}", prediction.rounded_score(), trace),
            Err(_) => prediction.rounded_score().to_string(),
        },
        Ok(prediction) => prediction.rounded_score().to_string(),
        Err(err) => format!("error: {}", err),
    }
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    println!("Cli Predict loading model at {}...", cli_args.model_dir.display());

    let artifacts = load_artifacts(&cli_args.model_dir)?;
    let options = PipelineOptions {
        one_hot: OneHotPolicy {
            drop_first: cli_args.drop_first,
        },
        source_fallback: cli_args.source_fallback,
    };
    let pipeline = ScorePipeline::new(artifacts, options)?;
    println!("Done! Enter one JSON request per line.");

    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read from stdin")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        println!("{}", predict_line(&pipeline, line, cli_args.trace));
    }
    Ok(())
}
