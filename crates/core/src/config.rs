use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "fitsize.toml";
pub const NESTED_CONFIG_FILE: &str = "config/fitsize.toml";

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub sizing: SizingConfig,
    pub logging: LoggingConfig,
}

/// Every constant the recommendation pipeline depends on. Versioned so that a
/// change in scoring behavior is visible in logs and operator output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    pub version: String,
    pub clustering: ClusteringPolicy,
    pub similarity: SimilarityWeights,
    pub aggregation: AggregationPolicy,
    pub ranking: RankingPolicy,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Half-open BMI bucket `[lower, upper)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BmiBucket {
    pub lower: f64,
    pub upper: f64,
}

impl BmiBucket {
    pub fn center(&self) -> f64 {
        (self.lower + self.upper) / 2.0
    }

    pub fn contains(&self, bmi: f64) -> bool {
        bmi >= self.lower && bmi < self.upper
    }
}

/// Age tolerance applied to targets at or above `min_age` (until the next band).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgeBand {
    pub min_age: u32,
    pub tolerance_years: u32,
    #[serde(default)]
    pub open_ended: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringPolicy {
    pub bmi_buckets: Vec<BmiBucket>,
    pub bmi_half_width: f64,
    pub age_bands: Vec<AgeBand>,
    pub plausible_bmi: Bounds,
    pub plausible_height_cm: Bounds,
    pub plausible_weight_kg: Bounds,
}

impl Default for ClusteringPolicy {
    fn default() -> Self {
        Self {
            bmi_buckets: vec![
                BmiBucket { lower: 15.0, upper: 20.0 },
                BmiBucket { lower: 20.0, upper: 25.0 },
                BmiBucket { lower: 25.0, upper: 30.0 },
                BmiBucket { lower: 30.0, upper: 40.0 },
            ],
            bmi_half_width: 2.5,
            age_bands: vec![
                AgeBand { min_age: 0, tolerance_years: 5, open_ended: false },
                AgeBand { min_age: 30, tolerance_years: 7, open_ended: false },
                AgeBand { min_age: 45, tolerance_years: 10, open_ended: true },
            ],
            plausible_bmi: Bounds::new(15.0, 40.0),
            plausible_height_cm: Bounds::new(140.0, 220.0),
            plausible_weight_kg: Bounds::new(30.0, 200.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityWeights {
    pub chest: f64,
    pub waist: f64,
    pub hips: f64,
    pub height: f64,
    pub weight: f64,
    pub fit_exact_bonus: f64,
    pub fit_adjacent_bonus: f64,
    pub belly_shape_bonus: f64,
    pub hip_shape_bonus: f64,
    pub chest_shape_bonus: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            chest: 1.0,
            waist: 1.0,
            hips: 1.0,
            height: 0.1,
            weight: 0.05,
            fit_exact_bonus: 0.15,
            fit_adjacent_bonus: 0.05,
            belly_shape_bonus: 0.08,
            hip_shape_bonus: 0.08,
            chest_shape_bonus: 0.08,
        }
    }
}

/// Purchases at most `max_days` old get `weight`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecencyStep {
    pub max_days: i64,
    pub weight: f64,
}

/// Average ratings at or above `min_rating` scale the size score by `multiplier`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualityStep {
    pub min_rating: f64,
    pub multiplier: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationPolicy {
    pub recency_steps: Vec<RecencyStep>,
    pub recency_floor: f64,
    pub successful_sign: f64,
    pub returned_sign: f64,
    pub cancelled_sign: f64,
    pub quality_steps: Vec<QualityStep>,
    pub low_rating_multiplier: f64,
    pub high_rating_threshold: f64,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self {
            recency_steps: vec![
                RecencyStep { max_days: 90, weight: 1.0 },
                RecencyStep { max_days: 180, weight: 0.85 },
                RecencyStep { max_days: 365, weight: 0.70 },
                RecencyStep { max_days: 730, weight: 0.50 },
            ],
            recency_floor: 0.30,
            successful_sign: 1.0,
            returned_sign: -0.5,
            cancelled_sign: 0.0,
            quality_steps: vec![
                QualityStep { min_rating: 4.5, multiplier: 1.20 },
                QualityStep { min_rating: 4.0, multiplier: 1.10 },
                QualityStep { min_rating: 3.5, multiplier: 1.00 },
            ],
            low_rating_multiplier: 0.90,
            high_rating_threshold: 4.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingPolicy {
    pub default_similar_user_limit: usize,
    pub close_alternative_margin: f64,
    pub high_confidence: f64,
    pub medium_confidence: f64,
    pub excellent_contributors: usize,
    pub excellent_min_rating: f64,
    pub good_contributors: usize,
    pub good_min_rating: f64,
    pub fair_contributors: usize,
}

impl Default for RankingPolicy {
    fn default() -> Self {
        Self {
            default_similar_user_limit: crate::sizing::DEFAULT_SIMILAR_USER_LIMIT,
            close_alternative_margin: 0.15,
            high_confidence: 0.70,
            medium_confidence: 0.50,
            excellent_contributors: 20,
            excellent_min_rating: 4.0,
            good_contributors: 10,
            good_min_rating: 3.5,
            fair_contributors: 5,
        }
    }
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            version: "2024.1".to_string(),
            clustering: ClusteringPolicy::default(),
            similarity: SimilarityWeights::default(),
            aggregation: AggregationPolicy::default(),
            ranking: RankingPolicy::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub similar_user_limit: Option<usize>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sizing: SizingConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(sizing) = patch.sizing {
            self.sizing = sizing;
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("FITSIZE_CONFIG_VERSION") {
            self.sizing.version = value;
        }
        if let Some(value) = read_env("FITSIZE_SIMILAR_USER_LIMIT") {
            self.sizing.ranking.default_similar_user_limit =
                parse_usize("FITSIZE_SIMILAR_USER_LIMIT", &value)?;
        }
        if let Some(value) = read_env("FITSIZE_CLOSE_ALTERNATIVE_MARGIN") {
            self.sizing.ranking.close_alternative_margin =
                parse_f64("FITSIZE_CLOSE_ALTERNATIVE_MARGIN", &value)?;
        }

        let log_level =
            read_env("FITSIZE_LOGGING_LEVEL").or_else(|| read_env("FITSIZE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("FITSIZE_LOGGING_FORMAT").or_else(|| read_env("FITSIZE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(limit) = overrides.similar_user_limit {
            self.sizing.ranking.default_similar_user_limit = limit;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sizing.validate()?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

impl SizingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.trim().is_empty() {
            return Err(ConfigError::Validation("sizing.version must not be empty".to_string()));
        }
        validate_clustering(&self.clustering)?;
        validate_similarity(&self.similarity)?;
        validate_aggregation(&self.aggregation)?;
        validate_ranking(&self.ranking)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_bounds(key: &str, bounds: &Bounds) -> Result<(), ConfigError> {
    if !(bounds.min.is_finite() && bounds.max.is_finite()) || bounds.min >= bounds.max {
        return Err(ConfigError::Validation(format!("{key} must satisfy min < max")));
    }
    Ok(())
}

fn validate_clustering(clustering: &ClusteringPolicy) -> Result<(), ConfigError> {
    if clustering.bmi_buckets.is_empty() {
        return Err(ConfigError::Validation(
            "sizing.clustering.bmi_buckets must contain at least one bucket".to_string(),
        ));
    }
    let ordered = clustering.bmi_buckets.windows(2).all(|pair| pair[0].upper <= pair[1].lower);
    let well_formed = clustering.bmi_buckets.iter().all(|bucket| bucket.lower < bucket.upper);
    if !ordered || !well_formed {
        return Err(ConfigError::Validation(
            "sizing.clustering.bmi_buckets must be non-empty ranges in ascending order".to_string(),
        ));
    }

    if !(clustering.bmi_half_width > 0.0) {
        return Err(ConfigError::Validation(
            "sizing.clustering.bmi_half_width must be greater than zero".to_string(),
        ));
    }

    if clustering.age_bands.is_empty() || clustering.age_bands[0].min_age != 0 {
        return Err(ConfigError::Validation(
            "sizing.clustering.age_bands must start with a band at min_age = 0".to_string(),
        ));
    }
    if !clustering.age_bands.windows(2).all(|pair| pair[0].min_age < pair[1].min_age) {
        return Err(ConfigError::Validation(
            "sizing.clustering.age_bands must be sorted by strictly increasing min_age"
                .to_string(),
        ));
    }

    validate_bounds("sizing.clustering.plausible_bmi", &clustering.plausible_bmi)?;
    validate_bounds("sizing.clustering.plausible_height_cm", &clustering.plausible_height_cm)?;
    validate_bounds("sizing.clustering.plausible_weight_kg", &clustering.plausible_weight_kg)?;

    Ok(())
}

fn validate_similarity(weights: &SimilarityWeights) -> Result<(), ConfigError> {
    let named = [
        ("chest", weights.chest),
        ("waist", weights.waist),
        ("hips", weights.hips),
        ("height", weights.height),
        ("weight", weights.weight),
        ("fit_exact_bonus", weights.fit_exact_bonus),
        ("fit_adjacent_bonus", weights.fit_adjacent_bonus),
        ("belly_shape_bonus", weights.belly_shape_bonus),
        ("hip_shape_bonus", weights.hip_shape_bonus),
        ("chest_shape_bonus", weights.chest_shape_bonus),
    ];

    for (name, value) in named {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::Validation(format!(
                "sizing.similarity.{name} must be a non-negative number"
            )));
        }
    }

    if weights.fit_adjacent_bonus > weights.fit_exact_bonus {
        return Err(ConfigError::Validation(
            "sizing.similarity.fit_adjacent_bonus must not exceed fit_exact_bonus".to_string(),
        ));
    }

    Ok(())
}

fn validate_aggregation(aggregation: &AggregationPolicy) -> Result<(), ConfigError> {
    let steps = &aggregation.recency_steps;
    let days_ascending = steps.windows(2).all(|pair| pair[0].max_days < pair[1].max_days);
    let weights_descending = steps.windows(2).all(|pair| pair[0].weight >= pair[1].weight);
    if !days_ascending || !weights_descending {
        return Err(ConfigError::Validation(
            "sizing.aggregation.recency_steps must have ascending max_days \
             and non-increasing weights"
                .to_string(),
        ));
    }

    if !(aggregation.recency_floor > 0.0 && aggregation.recency_floor <= 1.0) {
        return Err(ConfigError::Validation(
            "sizing.aggregation.recency_floor must be in range (0, 1]".to_string(),
        ));
    }
    if steps.last().is_some_and(|step| step.weight < aggregation.recency_floor) {
        return Err(ConfigError::Validation(
            "sizing.aggregation.recency_floor must not exceed the last recency step weight"
                .to_string(),
        ));
    }

    if !(aggregation.successful_sign > 0.0) {
        return Err(ConfigError::Validation(
            "sizing.aggregation.successful_sign must be positive".to_string(),
        ));
    }
    if aggregation.returned_sign > 0.0 {
        return Err(ConfigError::Validation(
            "sizing.aggregation.returned_sign must not be positive".to_string(),
        ));
    }

    if !aggregation.quality_steps.windows(2).all(|pair| pair[0].min_rating > pair[1].min_rating) {
        return Err(ConfigError::Validation(
            "sizing.aggregation.quality_steps must be sorted by descending min_rating".to_string(),
        ));
    }
    let multipliers_positive = aggregation
        .quality_steps
        .iter()
        .map(|step| step.multiplier)
        .chain(std::iter::once(aggregation.low_rating_multiplier))
        .all(|multiplier| multiplier > 0.0);
    if !multipliers_positive {
        return Err(ConfigError::Validation(
            "sizing.aggregation quality multipliers must be positive".to_string(),
        ));
    }

    Ok(())
}

fn validate_ranking(ranking: &RankingPolicy) -> Result<(), ConfigError> {
    if ranking.default_similar_user_limit == 0 {
        return Err(ConfigError::Validation(
            "sizing.ranking.default_similar_user_limit must be greater than zero".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&ranking.close_alternative_margin) {
        return Err(ConfigError::Validation(
            "sizing.ranking.close_alternative_margin must be in range 0..=1".to_string(),
        ));
    }

    if !(ranking.medium_confidence < ranking.high_confidence && ranking.high_confidence <= 1.0) {
        return Err(ConfigError::Validation(
            "sizing.ranking requires medium_confidence < high_confidence <= 1".to_string(),
        ));
    }

    let contributors_ordered = ranking.fair_contributors <= ranking.good_contributors
        && ranking.good_contributors <= ranking.excellent_contributors;
    if !contributors_ordered {
        return Err(ConfigError::Validation(
            "sizing.ranking contributor thresholds must satisfy fair <= good <= excellent"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    sizing: Option<SizingConfig>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_published_policy_constants() -> Result<(), String> {
        let config = AppConfig::default();
        config.validate().map_err(|err| err.to_string())?;

        let sizing = &config.sizing;
        ensure(sizing.similarity.waist == 1.0, "waist weight should be 1.0")?;
        ensure(sizing.similarity.height == 0.1, "height weight should be 0.1")?;
        ensure(sizing.similarity.weight == 0.05, "weight weight should be 0.05")?;
        ensure(sizing.aggregation.returned_sign == -0.5, "returned sign should be -0.5")?;
        ensure(sizing.aggregation.recency_floor == 0.30, "recency floor should be 0.30")?;
        ensure(
            sizing.ranking.default_similar_user_limit == 30,
            "default similar user limit should be 30",
        )?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_FITSIZE_POLICY_VERSION", "2025.3-canary");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("fitsize.toml");
            fs::write(
                &path,
                r#"
[sizing]
version = "${TEST_FITSIZE_POLICY_VERSION}"

[sizing.similarity]
height = 0.2
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.sizing.version == "2025.3-canary", "version should come from env")?;
            ensure(config.sizing.similarity.height == 0.2, "height weight should come from file")?;
            ensure(
                config.sizing.similarity.chest == 1.0,
                "unspecified weights should keep their defaults",
            )
        })();

        clear_vars(&["TEST_FITSIZE_POLICY_VERSION"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("fitsize.toml");
        fs::write(&path, "[sizing]\nversion = \"${FITSIZE_TEST_SURELY_UNSET}\"\n")
            .map_err(|err| err.to_string())?;

        match AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() }) {
            Err(ConfigError::MissingEnvInterpolation { var }) => {
                ensure(var == "FITSIZE_TEST_SURELY_UNSET", "error should name the variable")
            }
            other => Err(format!("expected interpolation failure, got {other:?}")),
        }
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("FITSIZE_LOG_LEVEL", "warn");
        env::set_var("FITSIZE_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&["FITSIZE_LOG_LEVEL", "FITSIZE_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("FITSIZE_SIMILAR_USER_LIMIT", "45");
        env::set_var("FITSIZE_CLOSE_ALTERNATIVE_MARGIN", "0.2");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("fitsize.toml");
            fs::write(
                &path,
                r#"
[sizing.ranking]
default_similar_user_limit = 12
close_alternative_margin = 0.1

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    similar_user_limit: Some(60),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.sizing.ranking.default_similar_user_limit == 60,
                "override similar user limit should win",
            )?;
            ensure(
                config.sizing.ranking.close_alternative_margin == 0.2,
                "env margin should win over file and defaults",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")
        })();

        clear_vars(&["FITSIZE_SIMILAR_USER_LIMIT", "FITSIZE_CLOSE_ALTERNATIVE_MARGIN"]);
        result
    }

    #[test]
    fn invalid_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("FITSIZE_SIMILAR_USER_LIMIT", "lots");

        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, .. }) => {
                ensure(key == "FITSIZE_SIMILAR_USER_LIMIT", "error should name the env key")
            }
            other => Err(format!("expected invalid override, got {other:?}")),
        };

        clear_vars(&["FITSIZE_SIMILAR_USER_LIMIT"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("fitsize.toml");
        fs::write(
            &path,
            r#"
[sizing.aggregation]
recency_floor = 0.0
"#,
        )
        .map_err(|err| err.to_string())?;

        let error =
            match AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
            {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("recency_floor")
        );
        ensure(has_message, "validation failure should mention recency_floor")
    }

    #[test]
    fn required_file_must_exist() {
        let options = LoadOptions {
            config_path: Some("does/not/exist/fitsize.toml".into()),
            require_file: true,
            ..LoadOptions::default()
        };

        assert!(matches!(AppConfig::load(options), Err(ConfigError::MissingConfigFile(_))));
    }
}
