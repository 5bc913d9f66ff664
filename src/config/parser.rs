//! Settings parser for loading the settings file and environment overrides.
//!
//! Precedence, lowest first: defaults, settings file, environment, CLI flags.
//! CLI flags are applied by the caller.

use crate::error::{ConfigError, Result};
use crate::manifest::ManifestFormat;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::settings::Settings;

/// Environment variable holding the API access token.
pub const ACCESS_TOKEN_VAR: &str = "STRATOSPHERE_ACCESS_TOKEN";

/// Fallback environment variable for the access token.
pub const FALLBACK_ACCESS_TOKEN_VAR: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Settings file names to search for.
pub const DEFAULT_SETTINGS_FILES: &[&str] = &["stratosphere.yaml", "stratosphere.yml"];

/// Parser for client settings.
#[derive(Debug, Default, Clone, Copy)]
pub struct SettingsParser;

impl SettingsParser {
    /// Creates a new settings parser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Loads settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Settings> {
        let path = path.as_ref();
        info!("Loading settings from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::parse(format!("Failed to read file: {e}"), path.display().to_string()))?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses settings from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<Settings> {
        debug!("Parsing YAML settings");

        // An empty file deserializes to unit, not to an empty mapping.
        if content.trim().is_empty() {
            return Ok(Settings::default());
        }

        serde_yaml::from_str(content).map_err(|e| {
            ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location: source.map(|p| p.display().to_string()),
            }
            .into()
        })
    }

    /// Resolves the settings: the explicit file if given, else the first file
    /// found by [`find_settings_file`], else defaults; then environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file cannot be loaded or an override is
    /// invalid.
    pub fn resolve(&self, explicit: Option<&Path>) -> Result<Settings> {
        let found = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => std::env::current_dir().ok().and_then(find_settings_file),
        };

        let mut settings = match found {
            Some(path) => self.load_file(path)?,
            None => {
                debug!("No settings file found, using defaults");
                Settings::default()
            }
        };

        Self::apply_env_overrides(&mut settings, |name| std::env::var(name).ok())?;
        Ok(settings)
    }

    /// Applies `STRATOSPHERE_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if `STRATOSPHERE_FORMAT` names an unknown format.
    pub fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(project) = lookup("STRATOSPHERE_PROJECT") {
            debug!("Overriding project from environment");
            settings.project = Some(project);
        }

        if let Some(env) = lookup("STRATOSPHERE_ENV") {
            debug!("Overriding environment from environment");
            settings.environment = Some(env);
        }

        if let Some(format) = lookup("STRATOSPHERE_FORMAT") {
            debug!("Overriding format from environment");
            settings.format = Some(format.parse::<ManifestFormat>()?);
        }

        if let Some(url) = lookup("STRATOSPHERE_API_URL") {
            debug!("Overriding api.base_url from environment");
            settings.api.base_url = url;
        }

        Ok(())
    }

    /// Loads the .env file of the working directory if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = PathBuf::from(".env");

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                ConfigError::parse(format!("Failed to load .env file: {e}"), env_path.display().to_string())
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Gets the API access token from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if neither token variable is set.
    pub fn access_token() -> Result<String> {
        Self::access_token_from(|name| std::env::var(name).ok())
    }

    /// Gets the API access token through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if neither token variable is set.
    pub fn access_token_from(lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
        [ACCESS_TOKEN_VAR, FALLBACK_ACCESS_TOKEN_VAR]
            .into_iter()
            .find_map(|name| lookup(name).filter(|token| !token.trim().is_empty()))
            .map(|token| token.trim().to_string())
            .ok_or_else(|| {
                ConfigError::MissingEnvVar {
                    name: String::from(ACCESS_TOKEN_VAR),
                }
                .into()
            })
    }
}

/// Finds the settings file in `start_dir` or its parents, then in the user
/// config directory.
#[must_use]
pub fn find_settings_file(start_dir: impl AsRef<Path>) -> Option<PathBuf> {
    let mut current = start_dir.as_ref().to_path_buf();

    loop {
        for filename in DEFAULT_SETTINGS_FILES {
            let settings_path = current.join(filename);
            if settings_path.exists() {
                info!("Found settings file: {}", settings_path.display());
                return Some(settings_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    dirs::config_dir()
        .map(|dir| dir.join("stratosphere").join("config.yaml"))
        .filter(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_parse_minimal_settings() {
        let settings = SettingsParser::new().parse_yaml("project: my-project\n", None).unwrap();
        assert_eq!(settings.project.as_deref(), Some("my-project"));
        assert_eq!(settings.environment, None);
        assert_eq!(settings.poll.interval_secs, 1);
    }

    #[test]
    fn test_parse_full_settings() {
        let yaml = r"
project: my-project
environment: staging
format: json
api:
  base_url: http://localhost:8080
  timeout_secs: 5
poll:
  interval_secs: 2
  timeout_secs: 600
";
        let settings = SettingsParser::new().parse_yaml(yaml, None).unwrap();
        assert_eq!(settings.format, Some(ManifestFormat::Json));
        assert_eq!(settings.api.base_url, "http://localhost:8080");
        assert_eq!(settings.api.timeout_secs, 5);
        assert_eq!(settings.poll.timeout_secs, Some(600));
    }

    #[test]
    fn test_empty_file_is_default() {
        let settings = SettingsParser::new().parse_yaml("\n", None).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = SettingsParser::new().parse_yaml("projet: typo\n", None).unwrap_err();
        assert!(err.to_string().contains("YAML parse error"));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stratosphere.yaml");
        std::fs::write(&path, "environment: dev\n").unwrap();

        let settings = SettingsParser::new().load_file(&path).unwrap();
        assert_eq!(settings.environment.as_deref(), Some("dev"));

        assert!(SettingsParser::new().load_file(dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn test_find_settings_file_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("stratosphere.yml"), "project: my-project\n").unwrap();

        let found = find_settings_file(&nested).unwrap();
        assert_eq!(found, dir.path().join("stratosphere.yml"));
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings {
            project: Some(String::from("from-file")),
            ..Settings::default()
        };
        let vars = lookup(&[
            ("STRATOSPHERE_PROJECT", "from-env"),
            ("STRATOSPHERE_FORMAT", "json"),
            ("STRATOSPHERE_API_URL", "http://localhost:1"),
        ]);
        SettingsParser::apply_env_overrides(&mut settings, vars).unwrap();

        assert_eq!(settings.project.as_deref(), Some("from-env"));
        assert_eq!(settings.format, Some(ManifestFormat::Json));
        assert_eq!(settings.api.base_url, "http://localhost:1");
        assert_eq!(settings.environment, None);
    }

    #[test]
    fn test_bad_format_override() {
        let mut settings = Settings::default();
        let result = SettingsParser::apply_env_overrides(&mut settings, lookup(&[("STRATOSPHERE_FORMAT", "toml")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_access_token_fallback() {
        let token = SettingsParser::access_token_from(lookup(&[(FALLBACK_ACCESS_TOKEN_VAR, "ya29.token\n")])).unwrap();
        assert_eq!(token, "ya29.token");

        let token = SettingsParser::access_token_from(lookup(&[
            (ACCESS_TOKEN_VAR, "primary"),
            (FALLBACK_ACCESS_TOKEN_VAR, "fallback"),
        ]))
        .unwrap();
        assert_eq!(token, "primary");

        assert!(SettingsParser::access_token_from(lookup(&[])).is_err());
    }
}
