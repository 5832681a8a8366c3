use anyhow::{anyhow, Context, Result};
use recipe_eval::cli::parse_args;
use recipe_eval::{EvaluationReport, EvaluationService, EvaluationStore};
use std::path::Path;
use tokio::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "recipe_eval=debug" } else { "recipe_eval=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = parse_args();
    init_logging(cli_args.verbose);

    let config = cli_args
        .load_config()
        .context("Failed to read evaluator settings")?;

    let recipe_text = fs::read_to_string(&cli_args.recipe_file)
        .await
        .with_context(|| format!("Failed to read recipe file '{}'", cli_args.recipe_file))?;
    let recipe_id = cli_args.recipe_id.clone().unwrap_or_else(|| {
        Path::new(&cli_args.recipe_file)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| cli_args.recipe_file.clone())
    });

    let service = EvaluationService::new(&config);
    let mut store = EvaluationStore::new();
    let outcome = service
        .evaluate_into(&mut store, &recipe_id, &recipe_text)
        .await
        .cloned();
    let failed = outcome.is_err();
    if let Some(summary) = store.summary() {
        info!(
            recipes = summary.recipes_evaluated,
            average = %format!("{:.1}/5.0", summary.average_score),
            "evaluation stored"
        );
    }
    let report = EvaluationReport::from(outcome);

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize evaluation report")?
    );

    if failed {
        return Err(anyhow!("Evaluation of '{}' failed", recipe_id));
    }
    Ok(())
}
