use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde_json::json;

use fitsize_core::config::{AppConfig, LoadOptions};
use fitsize_core::sizing::{RecommendationRequest, SizeRecommendationEngine};
use fitsize_db::{DemoCohort, Snapshot};

use super::{CommandResult, EXIT_CONFIG, EXIT_ENGINE, EXIT_INPUT};

const COMMAND: &str = "recommend";

#[derive(Debug, Clone, Args)]
pub struct RecommendArgs {
    #[arg(long, help = "Shopper to recommend a size for")]
    pub shopper: String,
    #[arg(long, help = "Product whose size is being chosen")]
    pub product: String,
    #[arg(long, help = "Cap on the similar-shopper pool (defaults to config)")]
    pub limit: Option<usize>,
    #[arg(long, help = "JSON snapshot with `profiles` and `orders`; defaults to the demo cohort")]
    pub snapshot: Option<PathBuf>,
    #[arg(long = "as-of", help = "RFC 3339 reference time for recency weighting")]
    pub as_of: Option<String>,
    #[arg(long, help = "Include reasoning lines and per-size statistics")]
    pub explain: bool,
}

pub fn run(args: &RecommendArgs, options: LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            );
        }
    };

    let explicit_as_of = match args.as_of.as_deref().map(parse_as_of).transpose() {
        Ok(as_of) => as_of,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "invalid_input",
                format!("{error:#}"),
                EXIT_INPUT,
            );
        }
    };

    let (snapshot, default_as_of) = match load_snapshot(args) {
        Ok(loaded) => loaded,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "snapshot_load",
                format!("{error:#}"),
                EXIT_INPUT,
            );
        }
    };

    let mut request = RecommendationRequest::new(args.shopper.as_str(), args.product.as_str());
    if let Some(limit) = args.limit {
        request = request.with_similar_user_limit(limit);
    }
    if let Some(as_of) = explicit_as_of.or(default_as_of) {
        request = request.with_as_of(as_of);
    }

    let stores = snapshot.into_stores();
    let engine = match SizeRecommendationEngine::new(
        config.sizing,
        stores.profiles.clone(),
        stores.profiles,
        stores.orders,
    ) {
        Ok(engine) => engine,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                error.error_class(),
                error.to_string(),
                EXIT_CONFIG,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                EXIT_ENGINE,
            );
        }
    };

    let analysis = match runtime.block_on(engine.analyze(&request)) {
        Ok(analysis) => analysis,
        Err(error) => {
            let error_class = error.error_class();
            let message = error.to_string();
            return CommandResult::failure(COMMAND, error_class, message, EXIT_ENGINE);
        }
    };

    let summary = match &analysis.result.recommended_size {
        Some(size) => format!(
            "recommended size {size} for shopper {} ({:.0}% confidence)",
            request.shopper_id,
            analysis.result.confidence * 100.0
        ),
        None if !analysis.result.has_measurements => {
            format!("shopper {} has no measurement profile", request.shopper_id)
        }
        None => {
            format!("not enough evidence to recommend a size for shopper {}", request.shopper_id)
        }
    };

    let mut data = json!({ "result": analysis.result });
    if args.explain {
        data["reasons"] = json!(engine.explain(&analysis.result));
        data["sizeStatistics"] = json!(analysis.size_statistics);
    }

    CommandResult::success_with_data(COMMAND, summary, Some(data))
}

fn parse_as_of(raw: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("`--as-of {raw}` is not an RFC 3339 timestamp"))?;
    Ok(parsed.with_timezone(&Utc))
}

/// The demo cohort carries its own reference time so its output is stable.
fn load_snapshot(args: &RecommendArgs) -> Result<(Snapshot, Option<DateTime<Utc>>)> {
    match &args.snapshot {
        Some(path) => {
            let snapshot = Snapshot::load(path)
                .with_context(|| format!("failed to load snapshot `{}`", path.display()))?;
            Ok((snapshot, None))
        }
        None => {
            let snapshot = DemoCohort::snapshot().context("failed to build demo cohort")?;
            let anchor = DemoCohort::anchor().context("failed to resolve demo anchor")?;
            Ok((snapshot, Some(anchor)))
        }
    }
}
