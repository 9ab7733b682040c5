#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use tracing::{debug, warn};

use super::ConfigError;

/// API credentials read once from a `KEY=VALUE` dotenv file
#[derive(Clone, Default)]
pub struct Secrets {
    values: HashMap<String, String>,
}

impl Secrets {
    /// Load secrets from a dotenv-style `path` without touching the process
    /// environment. A missing file yields an empty store so callers report the
    /// absent key instead of failing at startup.
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let entries = match dotenv::from_path_iter(path) {
            Ok(entries) => entries,
            Err(e) if e.not_found() => {
                warn!("Secrets file not found at {}", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(secrets_error(e)),
        };

        let values = entries
            .collect::<Result<HashMap<_, _>, _>>()
            .map_err(secrets_error)?;

        let secrets = Self { values };
        debug!("Loaded {} secrets from {}", secrets.len(), path.display());
        Ok(secrets)
    }

    /// Look up a secret; empty values count as absent
    #[inline]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Secrets {
    #[inline]
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("Secrets").field("keys", &keys).finish()
    }
}

fn secrets_error(error: dotenv::Error) -> ConfigError {
    match error {
        dotenv::Error::Io(e) => ConfigError::Io(e),
        other => ConfigError::InvalidSecrets(other.to_string()),
    }
}
