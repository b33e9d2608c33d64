use thiserror::Error;

/// Errors shared by every gardenchaos crate's ambient stack.
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("secret error: {0}")]
    Secret(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CommonError>;

impl From<String> for CommonError {
    fn from(s: String) -> Self {
        CommonError::Other(s)
    }
}

impl From<&str> for CommonError {
    fn from(s: &str) -> Self {
        CommonError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for CommonError {
    fn from(err: serde_json::Error) -> Self {
        CommonError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for CommonError {
    fn from(err: serde_yaml::Error) -> Self {
        CommonError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for CommonError {
    fn from(err: config::ConfigError) -> Self {
        CommonError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_variant() {
        let err = CommonError::Config("bad port".to_string());
        assert_eq!(err.to_string(), "configuration error: bad port");
    }

    #[test]
    fn from_str_is_other() {
        let err: CommonError = "oops".into();
        assert!(matches!(err, CommonError::Other(_)));
    }
}
