use crate::error::{CommonError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A secret value that prevents accidental logging.
///
/// Credentials, kubeconfig blobs, and provider tokens flow through this
/// wrapper everywhere they cross a function boundary so that a stray
/// `{:?}` never leaks them into a log line.
#[derive(Clone)]
pub struct Secret<T> {
    inner: T,
}

impl<T> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Expose the secret value. Callers should use this only at the point
    /// the value is actually needed (e.g. building an HTTP header).
    pub fn expose_secret(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl Secret<String> {
    pub fn from_env(var_name: &str) -> Result<Self> {
        std::env::var(var_name)
            .map_err(|e| CommonError::Secret(format!("environment variable '{var_name}' not set: {e}")))
            .and_then(|val| {
                if val.is_empty() {
                    Err(CommonError::Secret(format!("environment variable '{var_name}' is empty")))
                } else {
                    Ok(Self::new(val))
                }
            })
    }

    pub fn from_env_or(var_name: &str, default: String) -> Self {
        Self::from_env(var_name).unwrap_or_else(|_| Self::new(default))
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T: Serialize> Serialize for Secret<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.inner.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Secret<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Secret::new(T::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_value() {
        let secret = Secret::new("super-sensitive".to_string());
        assert_eq!(format!("{secret:?}"), "Secret([REDACTED])");
        assert_eq!(format!("{secret}"), "[REDACTED]");
    }

    #[test]
    fn expose_secret_returns_value() {
        let secret = Secret::new(42);
        assert_eq!(*secret.expose_secret(), 42);
    }
}
