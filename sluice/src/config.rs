//! # Startup Configuration
//!
//! [`AppConfig`] is built once, before any request, and handed around as an
//! `Arc`. Nothing below the CLI reads the process environment on its own.
//!
//! Sources, later wins:
//!
//! 1. defaults (`<base>/admin`, `<base>/public`, mode `auto`)
//! 2. TOML file (`--config`, or `<base>/sluice.toml` when present)
//! 3. `<base>/.env`, only for keys the real environment does not set
//! 4. environment variables
//! 5. CLI overrides
//!
//! Remote model settings count as enabled only when an API key, a supervisor
//! model and a customer model are all known.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_CONFIG_FILE: &str = "sluice.toml";
pub const DOTENV_FILE: &str = ".env";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot determine current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("invalid .env file {}: {source}", path.display())]
    Dotenv {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("invalid model base url '{value}': {source}")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error(
        "model mode 'openrouter' needs an API key plus supervisor and customer models \
         (OPENROUTER_API_KEY, OPENROUTER_SUPERVISOR_MODEL, OPENROUTER_CUSTOMER_MODEL)"
    )]
    ModelSettingsMissing,
}

/// Which collaborators answer requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelMode {
    /// Remote when model settings are complete, offline otherwise.
    #[default]
    Auto,
    /// Remote only; startup fails without model settings.
    Openrouter,
    /// Deterministic local collaborators, no network.
    Offline,
}

/// Snapshot of environment variables, optionally topped up from a `.env` file.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Add the pairs from a `.env` file without overriding anything already set.
    /// A missing file is not an error. The process environment is left alone.
    pub fn with_dotenv_file(mut self, path: &Path) -> Result<Self, ConfigError> {
        let dotenv_error = |source: dotenvy::Error| ConfigError::Dotenv {
            path: path.to_path_buf(),
            source,
        };
        let pairs = match dotenvy::from_path_iter(path) {
            Ok(pairs) => pairs,
            Err(e) if e.not_found() => return Ok(self),
            Err(e) => return Err(dotenv_error(e)),
        };
        let mut added = 0usize;
        for pair in pairs {
            let (key, value) = pair.map_err(dotenv_error)?;
            if !self.vars.contains_key(&key) {
                self.vars.insert(key, value);
                added += 1;
            }
        }
        tracing::debug!(path = %path.display(), added, "loaded .env file");
        Ok(self)
    }

    /// Trimmed, non-empty value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn first(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|k| self.get(k)).map(str::to_string)
    }
}

/// Contents of `sluice.toml`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub admin_root: Option<PathBuf>,
    pub public_root: Option<PathBuf>,
    pub model_mode: Option<ModelMode>,
    pub secret_context_file: Option<PathBuf>,
    pub secret_key_ref: Option<String>,
    #[serde(default)]
    pub model: FileModelConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileModelConfig {
    pub base_url: Option<String>,
    pub supervisor_model: Option<String>,
    pub customer_model: Option<String>,
    pub classifier_model: Option<String>,
    pub temperature: Option<f32>,
}

impl FileConfig {
    pub fn from_toml(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
    }

    /// Load `path`. When `required` is false a missing file yields defaults.
    pub fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml(path, &contents),
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_dir: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub admin_root: Option<PathBuf>,
    pub public_root: Option<PathBuf>,
    pub model_mode: Option<ModelMode>,
}

/// Credentials and model names for the remote collaborators.
#[derive(Clone, PartialEq)]
pub struct ModelSettings {
    pub api_key: String,
    pub base_url: Url,
    pub supervisor_model: String,
    pub customer_model: String,
    pub classifier_model: String,
    pub temperature: f32,
}

impl fmt::Debug for ModelSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("supervisor_model", &self.supervisor_model)
            .field("customer_model", &self.customer_model)
            .field("classifier_model", &self.classifier_model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Collaborators actually used after resolving [`ModelMode::Auto`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collaborators {
    Remote,
    Offline,
}

#[derive(Clone)]
pub struct AppConfig {
    pub base_dir: PathBuf,
    pub admin_root: PathBuf,
    pub public_root: PathBuf,
    pub model_mode: ModelMode,
    pub model: Option<ModelSettings>,
    pub secret_context: Option<String>,
    pub secret_key_ref: Option<String>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("base_dir", &self.base_dir)
            .field("admin_root", &self.admin_root)
            .field("public_root", &self.public_root)
            .field("model_mode", &self.model_mode)
            .field("model", &self.model)
            .field("secret_context", &self.secret_context.as_ref().map(|_| "<redacted>"))
            .field("secret_key_ref", &self.secret_key_ref.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AppConfig {
    /// Offline configuration over explicit roots. Used by tests and embedders.
    pub fn offline(admin_root: impl Into<PathBuf>, public_root: impl Into<PathBuf>) -> Self {
        let admin_root = admin_root.into();
        Self {
            base_dir: admin_root.parent().map(Path::to_path_buf).unwrap_or_default(),
            admin_root,
            public_root: public_root.into(),
            model_mode: ModelMode::Offline,
            model: None,
            secret_context: None,
            secret_key_ref: None,
        }
    }

    /// Load from the real process environment plus `<base>/.env`.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let base_dir = resolve_base_dir(overrides)?;
        let env = Environment::from_process().with_dotenv_file(&base_dir.join(DOTENV_FILE))?;
        Self::resolve(overrides, &env)
    }

    /// Merge every source. `env` is the already-merged environment.
    pub fn resolve(overrides: &ConfigOverrides, env: &Environment) -> Result<Self, ConfigError> {
        let base_dir = resolve_base_dir(overrides)?;
        let file = match &overrides.config_file {
            Some(path) => FileConfig::load(&absolutize(&base_dir, path), true)?,
            None => FileConfig::load(&base_dir.join(DEFAULT_CONFIG_FILE), false)?,
        };

        let pick_path = |cli: &Option<PathBuf>, var: &str, file: &Option<PathBuf>, default: &str| {
            let chosen = cli
                .clone()
                .or_else(|| env.get(var).map(PathBuf::from))
                .or_else(|| file.clone())
                .unwrap_or_else(|| PathBuf::from(default));
            absolutize(&base_dir, &chosen)
        };
        let admin_root = pick_path(&overrides.admin_root, "SLUICE_ADMIN_ROOT", &file.admin_root, "admin");
        let public_root = pick_path(
            &overrides.public_root,
            "SLUICE_PUBLIC_ROOT",
            &file.public_root,
            "public",
        );

        let model_mode = overrides.model_mode.or(file.model_mode).unwrap_or_default();
        let model = model_settings(env, &file.model)?;
        if model_mode == ModelMode::Openrouter && model.is_none() {
            return Err(ConfigError::ModelSettingsMissing);
        }

        let secret_context_file = env
            .get("SLUICE_SECRET_CONTEXT_FILE")
            .map(PathBuf::from)
            .or(file.secret_context_file);
        let secret_context = match secret_context_file {
            Some(path) => {
                let path = absolutize(&base_dir, &path);
                let text = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Read { path, source })?;
                Some(text)
            }
            None => None,
        };
        let secret_key_ref = env
            .get("SLUICE_SECRET_KEY_REF")
            .map(str::to_string)
            .or(file.secret_key_ref);

        let config = Self {
            base_dir,
            admin_root,
            public_root,
            model_mode,
            model,
            secret_context,
            secret_key_ref,
        };
        tracing::debug!(?config, "configuration resolved");
        Ok(config)
    }

    pub fn collaborators(&self) -> Collaborators {
        match (self.model_mode, &self.model) {
            (ModelMode::Offline, _) | (ModelMode::Auto, None) => Collaborators::Offline,
            _ => Collaborators::Remote,
        }
    }
}

fn resolve_base_dir(overrides: &ConfigOverrides) -> Result<PathBuf, ConfigError> {
    let cwd = std::env::current_dir().map_err(ConfigError::CurrentDir)?;
    Ok(match &overrides.base_dir {
        Some(dir) => absolutize(&cwd, dir),
        None => cwd,
    })
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn model_settings(
    env: &Environment,
    file: &FileModelConfig,
) -> Result<Option<ModelSettings>, ConfigError> {
    let raw_url = env
        .first(&["OPENROUTER_BASE_URL", "OPENAI_BASE_URL"])
        .or_else(|| file.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let base_url = Url::parse(&raw_url).map_err(|source| ConfigError::InvalidUrl {
        value: raw_url.clone(),
        source,
    })?;

    let shared = env.first(&["OPENROUTER_MODEL", "OPENAI_MODEL"]);
    let supervisor_model = env
        .first(&["OPENROUTER_SUPERVISOR_MODEL"])
        .or_else(|| file.supervisor_model.clone())
        .or_else(|| shared.clone());
    let customer_model = env
        .first(&["OPENROUTER_CUSTOMER_MODEL"])
        .or_else(|| file.customer_model.clone())
        .or(shared);
    let api_key = env.first(&["OPENROUTER_API_KEY", "OPENAI_API_KEY"]);

    let (Some(api_key), Some(supervisor_model), Some(customer_model)) =
        (api_key, supervisor_model, customer_model)
    else {
        return Ok(None);
    };

    let classifier_model = env
        .first(&["OPENROUTER_CLASSIFIER_MODEL"])
        .or_else(|| file.classifier_model.clone())
        .unwrap_or_else(|| supervisor_model.clone());
    let temperature = match env.get("OPENROUTER_TEMPERATURE") {
        Some(raw) => raw.parse::<f32>().unwrap_or_else(|_| {
            tracing::warn!(value = raw, "ignoring unparseable OPENROUTER_TEMPERATURE");
            0.0
        }),
        None => file.temperature.unwrap_or(0.0),
    };

    Ok(Some(ModelSettings {
        api_key,
        base_url,
        supervisor_model,
        customer_model,
        classifier_model,
        temperature,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn overrides(base: &Path) -> ConfigOverrides {
        ConfigOverrides {
            base_dir: Some(base.to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_are_relative_to_base_dir() {
        let temp = TempDir::new().unwrap();
        let config = AppConfig::resolve(&overrides(temp.path()), &Environment::default()).unwrap();
        assert_eq!(config.admin_root, temp.path().join("admin"));
        assert_eq!(config.public_root, temp.path().join("public"));
        assert_eq!(config.model_mode, ModelMode::Auto);
        assert!(config.model.is_none());
        assert_eq!(config.collaborators(), Collaborators::Offline);
    }

    #[test]
    fn dotenv_file_handles_comments_quotes_and_export() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".env");
        std::fs::write(
            &path,
            "# comment\nexport OPENROUTER_API_KEY=\"sk-1\"\nOPENROUTER_MODEL='m'\n\n",
        )
        .unwrap();
        let env = Environment::default().with_dotenv_file(&path).unwrap();
        assert_eq!(env.get("OPENROUTER_API_KEY"), Some("sk-1"));
        assert_eq!(env.get("OPENROUTER_MODEL"), Some("m"));
    }

    #[test]
    fn missing_dotenv_file_is_a_no_op() {
        let temp = TempDir::new().unwrap();
        let env = Environment::from_pairs([("OPENROUTER_MODEL", "m")])
            .with_dotenv_file(&temp.path().join(".env"))
            .unwrap();
        assert_eq!(env.get("OPENROUTER_MODEL"), Some("m"));
    }

    #[test]
    fn malformed_dotenv_file_is_reported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".env");
        std::fs::write(&path, "NOT A VALID LINE\n").unwrap();
        let err = Environment::default().with_dotenv_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Dotenv { .. }));
    }

    #[test]
    fn dotenv_never_overrides_existing_values() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".env");
        std::fs::write(&path, "OPENROUTER_MODEL=from-file\nOPENROUTER_API_KEY=k\n").unwrap();
        let env = Environment::from_pairs([("OPENROUTER_MODEL", "from-env")])
            .with_dotenv_file(&path)
            .unwrap();
        assert_eq!(env.get("OPENROUTER_MODEL"), Some("from-env"));
        assert_eq!(env.get("OPENROUTER_API_KEY"), Some("k"));
    }

    #[test]
    fn model_settings_need_key_and_both_models() {
        let temp = TempDir::new().unwrap();
        let partial = Environment::from_pairs([
            ("OPENROUTER_API_KEY", "k"),
            ("OPENROUTER_SUPERVISOR_MODEL", "sup"),
        ]);
        let config = AppConfig::resolve(&overrides(temp.path()), &partial).unwrap();
        assert!(config.model.is_none());

        let full = Environment::from_pairs([
            ("OPENROUTER_API_KEY", "k"),
            ("OPENROUTER_SUPERVISOR_MODEL", "sup"),
            ("OPENROUTER_CUSTOMER_MODEL", "cust"),
            ("OPENROUTER_TEMPERATURE", "warm"),
        ]);
        let config = AppConfig::resolve(&overrides(temp.path()), &full).unwrap();
        let model = config.model.clone().unwrap();
        assert_eq!(model.classifier_model, "sup");
        assert_eq!(model.temperature, 0.0);
        assert_eq!(model.base_url.as_str(), "https://openrouter.ai/api/v1");
        assert_eq!(config.collaborators(), Collaborators::Remote);
        assert!(!format!("{config:?}").contains("\"k\""));
    }

    #[test]
    fn openrouter_mode_without_settings_fails() {
        let temp = TempDir::new().unwrap();
        let mut o = overrides(temp.path());
        o.model_mode = Some(ModelMode::Openrouter);
        assert!(matches!(
            AppConfig::resolve(&o, &Environment::default()),
            Err(ConfigError::ModelSettingsMissing)
        ));
    }

    #[test]
    fn precedence_file_then_env_then_cli() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("sluice.toml"),
            "admin_root = \"ops\"\npublic_root = \"site\"\nmodel_mode = \"offline\"\n",
        )
        .unwrap();
        let env = Environment::from_pairs([("SLUICE_PUBLIC_ROOT", "/srv/www")]);
        let mut o = overrides(temp.path());
        o.admin_root = Some(PathBuf::from("/srv/admin"));

        let config = AppConfig::resolve(&o, &env).unwrap();
        assert_eq!(config.admin_root, PathBuf::from("/srv/admin"));
        assert_eq!(config.public_root, PathBuf::from("/srv/www"));
        assert_eq!(config.model_mode, ModelMode::Offline);
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        std::fs::write(&path, "admin_dir = \"x\"\n").unwrap();
        let mut o = overrides(temp.path());
        o.config_file = Some(path);
        assert!(matches!(
            AppConfig::resolve(&o, &Environment::default()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let temp = TempDir::new().unwrap();
        let env = Environment::from_pairs([("OPENROUTER_BASE_URL", "not a url")]);
        assert!(matches!(
            AppConfig::resolve(&overrides(temp.path()), &env),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn secret_context_is_read_from_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("memo.txt"), "internal memo").unwrap();
        let env = Environment::from_pairs([
            ("SLUICE_SECRET_CONTEXT_FILE", "memo.txt"),
            ("SLUICE_SECRET_KEY_REF", "vault:key-7"),
        ]);
        let config = AppConfig::resolve(&overrides(temp.path()), &env).unwrap();
        assert_eq!(config.secret_context.as_deref(), Some("internal memo"));
        assert_eq!(config.secret_key_ref.as_deref(), Some("vault:key-7"));
        assert!(!format!("{config:?}").contains("internal memo"));
    }
}
