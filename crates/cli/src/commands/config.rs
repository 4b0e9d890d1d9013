use std::env;
use std::fs;
use std::path::Path;

use fitsize_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

use super::{CommandResult, EXIT_CONFIG};

const COMMAND: &str = "config";

pub fn run(options: LoadOptions) -> CommandResult {
    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                format!("config validation failed: {error}"),
                EXIT_CONFIG,
            );
        }
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let sizing = &config.sizing;
    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "sizing.version",
        &sizing.version,
        source("sizing.version", &["FITSIZE_CONFIG_VERSION"]),
    ));
    lines.push(render_line(
        "sizing.ranking.default_similar_user_limit",
        &sizing.ranking.default_similar_user_limit.to_string(),
        source("sizing.ranking.default_similar_user_limit", &["FITSIZE_SIMILAR_USER_LIMIT"]),
    ));
    lines.push(render_line(
        "sizing.ranking.close_alternative_margin",
        &sizing.ranking.close_alternative_margin.to_string(),
        source("sizing.ranking.close_alternative_margin", &["FITSIZE_CLOSE_ALTERNATIVE_MARGIN"]),
    ));
    lines.push(render_line(
        "sizing.ranking.high_confidence",
        &sizing.ranking.high_confidence.to_string(),
        source("sizing.ranking.high_confidence", &[]),
    ));
    lines.push(render_line(
        "sizing.ranking.medium_confidence",
        &sizing.ranking.medium_confidence.to_string(),
        source("sizing.ranking.medium_confidence", &[]),
    ));
    lines.push(render_line(
        "sizing.clustering.bmi_half_width",
        &sizing.clustering.bmi_half_width.to_string(),
        source("sizing.clustering.bmi_half_width", &[]),
    ));
    lines.push(render_line(
        "sizing.clustering.bmi_buckets",
        &sizing
            .clustering
            .bmi_buckets
            .iter()
            .map(|bucket| format!("[{}, {})", bucket.lower, bucket.upper))
            .collect::<Vec<_>>()
            .join(" "),
        source("sizing.clustering.bmi_buckets", &[]),
    ));
    lines.push(render_line(
        "sizing.similarity",
        &format!(
            "chest={} waist={} hips={} height={} weight={}",
            sizing.similarity.chest,
            sizing.similarity.waist,
            sizing.similarity.hips,
            sizing.similarity.height,
            sizing.similarity.weight
        ),
        source("sizing.similarity", &[]),
    ));
    lines.push(render_line(
        "sizing.aggregation.recency_floor",
        &sizing.aggregation.recency_floor.to_string(),
        source("sizing.aggregation.recency_floor", &[]),
    ));
    lines.push(render_line(
        "sizing.aggregation.returned_sign",
        &sizing.aggregation.returned_sign.to_string(),
        source("sizing.aggregation.returned_sign", &[]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["FITSIZE_LOGGING_LEVEL", "FITSIZE_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", &["FITSIZE_LOGGING_FORMAT", "FITSIZE_LOG_FORMAT"]),
    ));

    CommandResult::success(COMMAND, lines.join("\n"))
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn nested_key_lookup_walks_tables() {
        let doc: Value = "[sizing.ranking]\ndefault_similar_user_limit = 12\n".parse().unwrap();
        assert!(contains_path(&doc, "sizing.ranking.default_similar_user_limit"));
        assert!(!contains_path(&doc, "sizing.ranking.high_confidence"));
        assert!(!contains_path(&doc, "logging.level"));
    }

    #[test]
    fn file_source_names_the_file() {
        let doc: Value = "[logging]\nlevel = \"debug\"\n".parse().unwrap();
        let source = field_source(
            "logging.level",
            &[],
            Some(&doc),
            Some(PathBuf::from("fitsize.toml").as_path()),
        );
        assert_eq!(source, "file (fitsize.toml)");
        assert_eq!(field_source("logging.format", &[], Some(&doc), None), "default");
    }
}
