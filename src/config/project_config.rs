use crate::domain::variation::Variation;
use crate::utils::error::{GritError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_time_range, validate_url, Validate,
};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;

pub const PROJECT_FILE: &str = "grit.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub project: ProjectSection,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub grafana: Option<GrafanaConfig>,
    #[serde(default)]
    pub alerting: AlertingDefaults,
    #[serde(default)]
    pub variations: Vec<Variation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSection {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
}

fn default_output_path() -> String {
    "out".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: String,
    #[serde(default)]
    pub bundle: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            bundle: false,
        }
    }
}

fn default_overwrite() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrafanaConfig {
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_overwrite")]
    pub overwrite: bool,
}

fn default_evaluate_for() -> String {
    "5m".to_string()
}

/// Project-wide alerting defaults, overridable per definition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertingDefaults {
    #[serde(default = "default_evaluate_for")]
    pub evaluate_for: String,
    #[serde(default = "crate::domain::alert::default_evaluate_interval")]
    pub evaluate_interval: String,
}

impl Default for AlertingDefaults {
    fn default() -> Self {
        Self {
            evaluate_for: default_evaluate_for(),
            evaluate_interval: crate::domain::alert::default_evaluate_interval(),
        }
    }
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
    })
}

/// Replaces `${NAME}` with `vars[NAME]`, then the process environment.
/// Unknown names are left as they are.
pub fn substitute_vars(content: &str, vars: &BTreeMap<String, String>) -> String {
    placeholder()
        .replace_all(content, |caps: &Captures| {
            let name = &caps[1];
            vars.get(name)
                .cloned()
                .or_else(|| std::env::var(name).ok())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// True when `value` still holds a `${NAME}` nobody resolved.
pub fn has_unresolved_placeholder(value: &str) -> bool {
    placeholder().is_match(value)
}

impl ProjectConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content, &path.as_ref().display().to_string())
    }

    pub fn from_toml_str(content: &str, source: &str) -> Result<Self> {
        let processed = substitute_vars(content, &BTreeMap::new());
        let mut config: ProjectConfig =
            toml::from_str(&processed).map_err(|e| GritError::ConfigParseError {
                path: source.to_string(),
                message: e.to_string(),
            })?;

        if let Some(grafana) = config.grafana.as_mut() {
            if grafana
                .token
                .as_deref()
                .is_some_and(has_unresolved_placeholder)
            {
                tracing::warn!(
                    "[grafana] token in {} references an unset variable, publishing without it",
                    source
                );
                grafana.token = None;
            }
        }
        Ok(config)
    }

    /// Declared variations, or a single `default` one.
    pub fn variations(&self) -> Vec<Variation> {
        if self.variations.is_empty() {
            vec![Variation::default()]
        } else {
            self.variations.clone()
        }
    }

    pub fn variation(&self, name: &str) -> Result<Variation> {
        let variations = self.variations();
        variations
            .iter()
            .find(|v| v.name == name)
            .cloned()
            .ok_or_else(|| GritError::UnknownVariation {
                name: name.to_string(),
                known: variations
                    .iter()
                    .map(|v| v.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

impl Validate for ProjectConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("project.name", &self.project.name)?;
        validate_path("output.path", &self.output.path)?;
        validate_time_range("alerting.evaluate_for", &self.alerting.evaluate_for)?;
        validate_time_range("alerting.evaluate_interval", &self.alerting.evaluate_interval)?;

        let mut seen = HashSet::new();
        for variation in &self.variations {
            validate_non_empty_string("variations.name", &variation.name)?;
            if !seen.insert(variation.name.as_str()) {
                return Err(GritError::InvalidConfigValueError {
                    field: "variations.name".to_string(),
                    value: variation.name.clone(),
                    reason: "Variation names must be unique".to_string(),
                });
            }
        }

        if let Some(grafana) = &self.grafana {
            validate_url("grafana.url", &grafana.url)?;
        }

        Ok(())
    }
}
