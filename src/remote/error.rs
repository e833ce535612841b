use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid remote url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Remote returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Remote unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = RemoteError::Status { status: 403, message: "not allowed".to_string() };
        assert_eq!(err.to_string(), "Remote returned 403: not allowed");
    }

    #[test]
    fn test_unavailable_error_display() {
        let err = RemoteError::Unavailable("connection refused".to_string());
        assert_eq!(err.to_string(), "Remote unavailable: connection refused");
    }

    #[test]
    fn test_decode_error_from_serde() {
        let err: RemoteError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, RemoteError::Decode(_)));
    }
}
