//! Startup-script loading.

use std::path::Path;
use tracing::debug;

use crate::error::{ConfigError, Result};

/// Reads a startup script and applies literal substitutions in order.
///
/// # Errors
///
/// Returns an error if the file does not exist or cannot be read.
pub fn load_startup_script<I, K, V>(path: impl AsRef<Path>, substitutions: I) -> Result<String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }

    let mut script = std::fs::read_to_string(path)?;
    for (from, to) in substitutions {
        let (from, to) = (from.as_ref(), to.as_ref());
        if from.is_empty() {
            continue;
        }
        debug!("Substituting '{from}' in {}", path.display());
        script = script.replace(from, to);
    }

    Ok(script)
}
