//! Configuration loading.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use assessa_core::engine::EngineConfig;
use assessa_core::history::HistoryOptions;
use assessa_core::profile::{DimensionMapping, MacroCategory, ProfileNormalizer, ProfileSettings};

/// Display metadata for one assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub title: String,
    #[serde(default)]
    pub category: String,
}

/// Top-level assessa configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessaConfig {
    /// Where completed-assessment records are written.
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
    /// Directory of assessment TOML files.
    #[serde(default = "default_questions_dir")]
    pub questions_dir: PathBuf,
    /// Respondent id used when none is given on the command line.
    #[serde(default = "default_respondent")]
    pub respondent: String,
    /// Assessment whose newest record feeds the profile. Empty disables.
    #[serde(default = "default_primary_assessment")]
    pub primary_assessment: String,
    /// Maximum number of points in the score trend.
    #[serde(default = "default_trend_limit")]
    pub trend_limit: usize,
    /// Retries of a failed record save.
    #[serde(default = "default_save_retries")]
    pub save_retries: u32,
    /// Delay before the first save retry in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    #[serde(default)]
    pub profile: ProfileSettings,
    /// Fine dimension key → macro category key. Replaces the standard
    /// table when non-empty.
    #[serde(default)]
    pub dimensions: BTreeMap<String, String>,
    /// Titles and categories shown in history, keyed by assessment id.
    #[serde(default)]
    pub catalog: BTreeMap<String, CatalogEntry>,
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("./assessa-records")
}
fn default_questions_dir() -> PathBuf {
    PathBuf::from("./assessments")
}
fn default_respondent() -> String {
    "anonymous".to_string()
}
fn default_primary_assessment() -> String {
    "national-survey".to_string()
}
fn default_trend_limit() -> usize {
    assessa_core::profile::DEFAULT_TREND_LIMIT
}
fn default_save_retries() -> u32 {
    2
}
fn default_retry_delay() -> u64 {
    250
}

impl Default for AssessaConfig {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            questions_dir: default_questions_dir(),
            respondent: default_respondent(),
            primary_assessment: default_primary_assessment(),
            trend_limit: default_trend_limit(),
            save_retries: default_save_retries(),
            retry_delay_ms: default_retry_delay(),
            profile: ProfileSettings::default(),
            dimensions: BTreeMap::new(),
            catalog: BTreeMap::new(),
        }
    }
}

impl AssessaConfig {
    /// The dimension table: the configured one, or the standard table.
    pub fn dimension_mapping(&self) -> Result<DimensionMapping> {
        if self.dimensions.is_empty() {
            return Ok(DimensionMapping::standard());
        }
        self.dimensions
            .iter()
            .map(|(fine, category)| {
                let category: MacroCategory = category
                    .parse()
                    .map_err(|e: String| anyhow::anyhow!(e))
                    .with_context(|| format!("invalid [dimensions] entry for '{fine}'"))?;
                Ok((fine.clone(), category))
            })
            .collect()
    }

    pub fn normalizer(&self) -> Result<ProfileNormalizer> {
        Ok(ProfileNormalizer::new(self.dimension_mapping()?).with_settings(self.profile))
    }

    pub fn history_options(&self) -> HistoryOptions {
        HistoryOptions {
            primary_assessment: Some(self.primary_assessment.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            trend_limit: self.trend_limit,
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            save_retries: self.save_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            history: self.history_options(),
        }
    }

    /// Display title for an assessment, falling back to its id.
    pub fn title_of<'a>(&'a self, assessment_id: &'a str) -> &'a str {
        self.catalog
            .get(assessment_id)
            .map(|e| e.title.as_str())
            .unwrap_or(assessment_id)
    }

    /// Assessment id → title for every catalog entry.
    pub fn titles(&self) -> BTreeMap<String, String> {
        self.catalog
            .iter()
            .map(|(id, entry)| (id.clone(), entry.title.clone()))
            .collect()
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut pos = 0;
    while let Some(offset) = result[pos..].find("${") {
        let start = pos + offset;
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
            // Substituted text is not scanned again.
            pos = start + value.len();
        } else {
            break;
        }
    }
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `assessa.toml` in the current directory
/// 2. `~/.config/assessa/config.toml`
///
/// Environment variable overrides: `ASSESSA_STORE_DIR`.
pub fn load_config() -> Result<AssessaConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<AssessaConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("assessa.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = toml::from_str::<AssessaConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "config loaded");
            config
        }
        None => AssessaConfig::default(),
    };

    if let Ok(dir) = std::env::var("ASSESSA_STORE_DIR") {
        if !dir.is_empty() {
            config.store_dir = PathBuf::from(dir);
        }
    }

    config.store_dir = resolve_path(&config.store_dir);
    config.questions_dir = resolve_path(&config.questions_dir);

    // Fail early on a bad dimension table or scale rather than at history time.
    config.dimension_mapping()?;
    let profile = &config.profile;
    if !profile.max_item_score.is_finite() || profile.max_item_score <= 0.0 {
        anyhow::bail!(
            "profile.max_item_score must be a positive number, got {}",
            profile.max_item_score
        );
    }
    if profile.zero_floor > 100 {
        anyhow::bail!(
            "profile.zero_floor must be within 0..=100, got {}",
            profile.zero_floor
        );
    }

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("assessa"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_ASSESSA_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_ASSESSA_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_ASSESSA_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("${unterminated"), "${unterminated");
        std::env::remove_var("_ASSESSA_TEST_VAR");
    }

    #[test]
    fn self_referencing_var_is_substituted_once() {
        std::env::set_var("_ASSESSA_TEST_SELF", "${_ASSESSA_TEST_SELF}");
        std::env::set_var("_ASSESSA_TEST_NEXT", "b");
        assert_eq!(
            resolve_env_vars("${_ASSESSA_TEST_SELF}/x"),
            "${_ASSESSA_TEST_SELF}/x"
        );
        assert_eq!(
            resolve_env_vars("${_ASSESSA_TEST_SELF}/${_ASSESSA_TEST_NEXT}"),
            "${_ASSESSA_TEST_SELF}/b"
        );
        std::env::remove_var("_ASSESSA_TEST_SELF");
        std::env::remove_var("_ASSESSA_TEST_NEXT");
    }

    #[test]
    fn default_config() {
        let config = AssessaConfig::default();
        assert_eq!(config.respondent, "anonymous");
        assert_eq!(config.trend_limit, 10);
        assert_eq!(config.profile.zero_floor, 20);
        assert_eq!(config.dimension_mapping().unwrap(), DimensionMapping::standard());
        assert_eq!(
            config.history_options().primary_assessment.as_deref(),
            Some("national-survey")
        );
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
store_dir = "/tmp/records"
respondent = "student-7"
primary_assessment = ""
trend_limit = 5
save_retries = 4

[profile]
zero_floor = 0

[dimensions]
curiosity = "school_experience"
calm = "health_wellbeing"

[catalog.logic-01]
title = "Logic Warm-up"
category = "logic"
"#;
        let config: AssessaConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.respondent, "student-7");
        assert_eq!(config.profile.zero_floor, 0);
        assert_eq!(config.profile.max_item_score, 5.0);
        assert!(config.history_options().primary_assessment.is_none());
        assert_eq!(config.engine_config().save_retries, 4);

        let mapping = config.dimension_mapping().unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.category_of("curiosity"), Some(MacroCategory::SchoolExperience));
        assert_eq!(mapping.category_of("optimism"), None);

        assert_eq!(config.title_of("logic-01"), "Logic Warm-up");
        assert_eq!(config.title_of("other"), "other");
    }

    #[test]
    fn bad_dimension_category_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assessa.toml");
        std::fs::write(&path, "[dimensions]\ncuriosity = \"hobbies\"\n").unwrap();

        let err = load_config_from(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("curiosity"));
    }

    #[test]
    fn out_of_range_profile_settings_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assessa.toml");

        std::fs::write(&path, "[profile]\nzero_floor = 250\n").unwrap();
        let err = load_config_from(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("zero_floor"));

        for score in ["nan", "inf", "0.0", "-5.0"] {
            std::fs::write(&path, format!("[profile]\nmax_item_score = {score}\n")).unwrap();
            let err = load_config_from(Some(&path)).unwrap_err();
            assert!(format!("{err:#}").contains("max_item_score"), "{score}");
        }

        std::fs::write(&path, "[profile]\nzero_floor = 100\nmax_item_score = 4.0\n").unwrap();
        let config = load_config_from(Some(&path)).unwrap();
        let profile = config.normalizer().unwrap().normalize(&Default::default());
        assert!(profile.iter().all(|e| e.value == 100));
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let err = load_config_from(Some(Path::new("/no/such/assessa.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn load_explicit_config_expands_paths() {
        std::env::set_var("_ASSESSA_TEST_ROOT", "/srv/assessa");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assessa.toml");
        std::fs::write(&path, "questions_dir = \"${_ASSESSA_TEST_ROOT}/questions\"\n").unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.questions_dir, PathBuf::from("/srv/assessa/questions"));
        std::env::remove_var("_ASSESSA_TEST_ROOT");
    }
}
