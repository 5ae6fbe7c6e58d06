use crate::types::{Voice, MAX_DURATION_MINUTES, MIN_DURATION_MINUTES};
use anyhow::{anyhow, bail, Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

const CONFIG_FILE_NAME: &str = "config.toml";
const ENV_CONFIG_PATH: &str = "SURKAR_CONFIG_PATH";
const ENV_API_KEY: &str = "SURKAR_API_KEY";
const ENV_API_KEY_FALLBACKS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];
const ENV_API_URL: &str = "SURKAR_API_URL";
const ENV_GENERATION_MODEL: &str = "SURKAR_GENERATION_MODEL";
const ENV_SPEECH_MODEL: &str = "SURKAR_SPEECH_MODEL";
const ENV_VOICE: &str = "SURKAR_VOICE";
const ENV_DEFAULT_DURATION: &str = "SURKAR_DEFAULT_DURATION";
const ENV_EXPORT_DIR: &str = "SURKAR_EXPORT_DIR";

#[derive(Debug, Clone)]
pub struct AppConfig {
    api_key: Option<String>,
    api_url: Option<String>,
    generation_model: String,
    speech_model: String,
    default_voice: Voice,
    default_duration_minutes: u8,
    export_dir: PathBuf,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        let path = match config_file_override() {
            Some(path) => path,
            None => Self::default_config_path()?,
        };
        if path.exists() {
            let partial = read_partial(&path)?;
            config.apply_partial(partial)?;
        }

        config.apply_env()?;
        Ok(config)
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn api_url(&self) -> Option<&str> {
        self.api_url.as_deref()
    }

    pub fn generation_model(&self) -> &str {
        &self.generation_model
    }

    pub fn speech_model(&self) -> &str {
        &self.speech_model
    }

    pub fn default_voice(&self) -> Voice {
        self.default_voice
    }

    pub fn default_duration_minutes(&self) -> u8 {
        self.default_duration_minutes
    }

    pub fn export_dir(&self) -> &PathBuf {
        &self.export_dir
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join(CONFIG_FILE_NAME))
    }

    pub fn log_path() -> Result<PathBuf> {
        Ok(project_dirs()?.data_local_dir().join("surkar.log"))
    }

    fn apply_partial(&mut self, partial: PartialConfig) -> Result<()> {
        if let Some(key) = partial.api_key.filter(|key| !key.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(url) = partial.api_url {
            self.api_url = Some(url);
        }
        if let Some(model) = partial.generation_model {
            self.generation_model = model;
        }
        if let Some(model) = partial.speech_model {
            self.speech_model = model;
        }
        if let Some(voice) = partial.default_voice {
            self.default_voice = voice.parse().map_err(|err: String| anyhow!(err))?;
        }
        if let Some(duration) = partial.default_duration_minutes {
            self.default_duration_minutes = check_duration(duration)?;
        }
        if let Some(dir) = partial.export_dir {
            self.export_dir = dir;
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<()> {
        let key = std::iter::once(ENV_API_KEY)
            .chain(ENV_API_KEY_FALLBACKS.iter().copied())
            .filter_map(|name| env::var(name).ok())
            .find(|value| !value.trim().is_empty());
        if let Some(key) = key {
            self.api_key = Some(key.trim().to_string());
        }
        if let Ok(value) = env::var(ENV_API_URL) {
            if value.trim().is_empty() {
                self.api_url = None;
            } else {
                self.api_url = Some(value);
            }
        }
        if let Ok(value) = env::var(ENV_GENERATION_MODEL) {
            if !value.trim().is_empty() {
                self.generation_model = value;
            }
        }
        if let Ok(value) = env::var(ENV_SPEECH_MODEL) {
            if !value.trim().is_empty() {
                self.speech_model = value;
            }
        }
        if let Ok(value) = env::var(ENV_VOICE) {
            if !value.trim().is_empty() {
                self.default_voice = value
                    .parse()
                    .map_err(|err: String| anyhow!("{ENV_VOICE}: {err}"))?;
            }
        }
        if let Ok(value) = env::var(ENV_DEFAULT_DURATION) {
            if !value.trim().is_empty() {
                let parsed = value
                    .trim()
                    .parse::<u8>()
                    .context("SURKAR_DEFAULT_DURATION must be an integer between 1-10")?;
                self.default_duration_minutes = check_duration(parsed)?;
            }
        }
        if let Ok(value) = env::var(ENV_EXPORT_DIR) {
            if !value.trim().is_empty() {
                self.export_dir = PathBuf::from(value);
            }
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: None,
            generation_model: "gemini-3-pro-preview".into(),
            speech_model: "gemini-2.5-flash-preview-tts".into(),
            default_voice: Voice::default(),
            default_duration_minutes: 4,
            export_dir: default_export_dir(),
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "Surkar", "Surkar")
        .ok_or_else(|| anyhow!("unable to determine config directory"))
}

fn check_duration(minutes: u8) -> Result<u8> {
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes) {
        bail!(
            "default duration must be between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES} minutes, got {minutes}"
        );
    }
    Ok(minutes)
}

fn config_file_override() -> Option<PathBuf> {
    let value = env::var_os(ENV_CONFIG_PATH)?;
    if value.is_empty() {
        return None;
    }
    let path = PathBuf::from(value);
    if path.is_dir() {
        return Some(path.join(CONFIG_FILE_NAME));
    }
    Some(path)
}

fn read_partial(path: &Path) -> Result<PartialConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    parse_partial(&contents).with_context(|| format!("failed to parse {}", path.display()))
}

fn parse_partial(contents: &str) -> Result<PartialConfig> {
    Ok(toml::from_str(contents)?)
}

fn default_export_dir() -> PathBuf {
    env::var_os("HOME")
        .map(PathBuf::from)
        .map(|home| home.join("Music").join("Surkar"))
        .unwrap_or_else(|| PathBuf::from("./lyrics"))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PartialConfig {
    api_key: Option<String>,
    api_url: Option<String>,
    generation_model: Option<String>,
    speech_model: Option<String>,
    default_voice: Option<String>,
    default_duration_minutes: Option<u8>,
    export_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_overrides_defaults() {
        let partial = parse_partial(
            r#"
                api_url = "http://localhost:8080/"
                generation_model = "gemini-test"
                default_voice = "fenrir"
                default_duration_minutes = 7
                export_dir = "/tmp/surkar"
            "#,
        )
        .unwrap();
        let mut config = AppConfig::default();
        config.apply_partial(partial).unwrap();
        assert_eq!(config.api_url(), Some("http://localhost:8080/"));
        assert_eq!(config.generation_model(), "gemini-test");
        assert_eq!(config.speech_model(), "gemini-2.5-flash-preview-tts");
        assert_eq!(config.default_voice(), Voice::Fenrir);
        assert_eq!(config.default_duration_minutes(), 7);
        assert_eq!(config.export_dir(), &PathBuf::from("/tmp/surkar"));
    }

    #[test]
    fn blank_api_key_in_file_is_ignored() {
        let partial = parse_partial("api_key = \"  \"").unwrap();
        let mut config = AppConfig::default();
        config.apply_partial(partial).unwrap();
        assert!(config.api_key().is_none());
    }

    #[test]
    fn rejects_out_of_range_duration() {
        let partial = parse_partial("default_duration_minutes = 11").unwrap();
        let mut config = AppConfig::default();
        assert!(config.apply_partial(partial).is_err());
        assert_eq!(config.default_duration_minutes(), 4);
        assert!(check_duration(0).is_err());
        assert_eq!(check_duration(10).unwrap(), 10);
    }

    #[test]
    fn rejects_unknown_voice() {
        let partial = parse_partial("default_voice = \"robot\"").unwrap();
        let mut config = AppConfig::default();
        assert!(config.apply_partial(partial).is_err());
    }
}
