use thiserror::Error;

/// Result type for asset operations
pub type AssetResult<T> = Result<T, AssetError>;

/// Errors that can occur while resolving asset URLs
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Signing rejected ({status}): {message}")]
    Authorization { status: u16, message: String },

    #[error("Signing request failed: {source}")]
    Transport {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Unexpected signing response: {message}")]
    InvalidResponse { message: String },

    #[error("Invalid request: {message}")]
    Invalid { message: String },

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl AssetError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    /// Create a transport error from any error type
    pub fn transport<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            source: Box::new(error),
        }
    }

    /// Create an authorization error from a rejected signing call
    pub fn authorization<S: Into<String>>(status: u16, message: S) -> Self {
        Self::Authorization {
            status,
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response<S: Into<String>>(message: S) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Short machine-friendly label, used as the advisory error flag
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Authorization { status: 404, .. } => "not_found",
            Self::Authorization { status: 401 | 403, .. } => "permission_denied",
            Self::Authorization { .. } => "authorization_failed",
            Self::Transport { .. } => "network",
            Self::InvalidResponse { .. } => "invalid_response",
            Self::Invalid { .. } => "invalid_request",
            Self::Config { .. } => "config",
            Self::Backend { .. } => "backend",
            Self::Io { .. } => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_kinds_follow_status() {
        assert_eq!(AssetError::authorization(404, "missing").kind(), "not_found");
        assert_eq!(AssetError::authorization(403, "nope").kind(), "permission_denied");
        assert_eq!(AssetError::authorization(500, "boom").kind(), "authorization_failed");
    }

    #[test]
    fn display_includes_status() {
        let err = AssetError::authorization(400, "bad key");
        assert_eq!(err.to_string(), "Signing rejected (400): bad key");
    }

    #[test]
    fn io_errors_convert_with_question_mark() {
        fn read(path: &std::path::Path) -> AssetResult<Vec<u8>> {
            Ok(std::fs::read(path)?)
        }
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read(&dir.path().join("missing")).unwrap_err().kind(), "io");
    }
}
