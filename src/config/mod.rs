//! Configuration module for the provisioning client.
//!
//! This module handles the client settings:
//! - Parsing the optional `stratosphere.yaml`
//! - `.env` loading and environment overrides
//! - Validation of settings values

mod parser;
mod settings;
mod validator;

pub use parser::{
    ACCESS_TOKEN_VAR, DEFAULT_SETTINGS_FILES, FALLBACK_ACCESS_TOKEN_VAR, SettingsParser, find_settings_file,
};
pub use settings::{ApiSettings, DEFAULT_POLL_INTERVAL_SECS, PollSettings, Settings};
pub use validator::{SettingsValidator, ValidationError, ValidationResult};
