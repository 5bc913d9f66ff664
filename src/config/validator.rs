//! Settings validation.
//!
//! Settings are checked before any template is rendered or any request is
//! made, so a typo in the project id fails fast.

use crate::error::{ConfigError, Result};
use crate::schema::validators::is_resource_name;
use tracing::{debug, warn};

use super::settings::Settings;

/// Validator for client settings.
#[derive(Debug, Default, Clone, Copy)]
pub struct SettingsValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl SettingsValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns the first validation error found.
    pub fn validate(&self, settings: &Settings) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_identity(settings, &mut result);
        Self::validate_api(settings, &mut result);
        Self::validate_poll(settings, &mut result);

        for warning in &result.warnings {
            warn!("{warning}");
        }

        if let Some(first_error) = result.errors.first() {
            return Err(ConfigError::validation(first_error.message.clone(), first_error.field.clone()).into());
        }

        debug!("Settings validation passed");
        Ok(result)
    }

    fn validate_identity(settings: &Settings, result: &mut ValidationResult) {
        if let Some(project) = &settings.project
            && !is_valid_project_id(project)
        {
            result.errors.push(ValidationError {
                field: String::from("project"),
                message: format!(
                    "Project id '{project}' is invalid. Must be 6 to 30 lowercase letters, digits or hyphens, starting with a letter."
                ),
            });
        }

        if let Some(environment) = &settings.environment
            && !is_resource_name(environment)
        {
            result.errors.push(ValidationError {
                field: String::from("environment"),
                message: format!(
                    "Environment '{environment}' is invalid. Must be lowercase alphanumeric with hyphens."
                ),
            });
        }
    }

    fn validate_api(settings: &Settings, result: &mut ValidationResult) {
        let url = settings.api.base_url.as_str();
        if url.starts_with("http://") {
            result
                .warnings
                .push(format!("API base URL '{url}' is not using TLS"));
        } else if !url.starts_with("https://") {
            result.errors.push(ValidationError {
                field: String::from("api.base_url"),
                message: format!("API base URL '{url}' must start with http:// or https://"),
            });
        }

        if settings.api.timeout_secs == 0 {
            result.errors.push(ValidationError {
                field: String::from("api.timeout_secs"),
                message: String::from("Request timeout must be at least 1 second"),
            });
        }
    }

    fn validate_poll(settings: &Settings, result: &mut ValidationResult) {
        let interval = settings.poll.interval_secs;
        if interval == 0 {
            result.errors.push(ValidationError {
                field: String::from("poll.interval_secs"),
                message: String::from("Poll interval must be at least 1 second"),
            });
        }

        if let Some(timeout) = settings.poll.timeout_secs
            && timeout < interval
        {
            result.errors.push(ValidationError {
                field: String::from("poll.timeout_secs"),
                message: format!("Poll timeout {timeout}s is shorter than the poll interval {interval}s"),
            });
        }
    }
}

/// Validates a project id: 6 to 30 characters, lowercase letters, digits and
/// hyphens, starting with a letter and not ending with a hyphen.
fn is_valid_project_id(project: &str) -> bool {
    if !(6..=30).contains(&project.len()) {
        return false;
    }

    let mut chars = project.chars();

    if let Some(first) = chars.next()
        && !first.is_ascii_lowercase()
    {
        return false;
    }

    for c in chars {
        if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
            return false;
        }
    }

    !project.ends_with('-')
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_project_id() {
        assert!(is_valid_project_id("my-project"));
        assert!(is_valid_project_id("project-123456"));
        assert!(is_valid_project_id("abcdef"));
    }

    #[test]
    fn test_invalid_project_id() {
        assert!(!is_valid_project_id("short"));
        assert!(!is_valid_project_id("My-Project"));
        assert!(!is_valid_project_id("1-project"));
        assert!(!is_valid_project_id("my_project"));
        assert!(!is_valid_project_id("my-project-"));
        assert!(!is_valid_project_id(&"a".repeat(31)));
    }

    #[test]
    fn test_default_settings_are_valid() {
        let result = SettingsValidator::new().validate(&Settings::default()).unwrap();
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 0);
    }

    #[test]
    fn test_bad_environment() {
        let settings = Settings {
            environment: Some(String::from("Prod")),
            ..Settings::default()
        };
        let err = SettingsValidator::new().validate(&settings).unwrap_err();
        assert!(err.to_string().contains("Environment 'Prod' is invalid"));
    }

    #[test]
    fn test_poll_timeout_shorter_than_interval() {
        let mut settings = Settings::default();
        settings.poll.interval_secs = 10;
        settings.poll.timeout_secs = Some(5);
        assert!(SettingsValidator::new().validate(&settings).is_err());
    }

    #[test]
    fn test_plain_http_warns() {
        let mut settings = Settings::default();
        settings.api.base_url = String::from("http://localhost:8080");
        let result = SettingsValidator::new().validate(&settings).unwrap();
        assert_eq!(result.warning_count(), 1);
    }
}
