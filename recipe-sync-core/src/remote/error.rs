//! Remote error taxonomy.

use reqwest::StatusCode;

/// Outcome kinds of a failed remote call. Expected failures are values,
/// never panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("conflict: recipe already exists on the server")]
    Conflict,
    #[error("request timed out")]
    RequestTimeout,
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("server error")]
    ServerError,
    #[error("no internet connection")]
    NoInternet,
    #[error("malformed response body")]
    Serialization,
    #[error("malformed server URI")]
    MalformedServerUri,
    #[error("unexpected status code {0}")]
    Unknown(u16),
}

/// Result of every remote operation.
pub type ApiResult<T> = Result<T, NetworkError>;

impl NetworkError {
    /// Maps a non-success HTTP status to an error kind.
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            401 => NetworkError::Unauthorized,
            408 => NetworkError::RequestTimeout,
            409 => NetworkError::Conflict,
            413 => NetworkError::PayloadTooLarge,
            500..=599 => NetworkError::ServerError,
            code => {
                tracing::error!("Unexpected response status: {}", code);
                NetworkError::Unknown(code)
            }
        }
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            NetworkError::RequestTimeout
        } else if e.is_decode() {
            NetworkError::Serialization
        } else if e.is_builder() {
            NetworkError::MalformedServerUri
        } else if let Some(status) = e.status() {
            NetworkError::from_status(status)
        } else {
            tracing::debug!("Transport failure: {}", e);
            NetworkError::NoInternet
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (401, NetworkError::Unauthorized),
            (408, NetworkError::RequestTimeout),
            (409, NetworkError::Conflict),
            (413, NetworkError::PayloadTooLarge),
            (500, NetworkError::ServerError),
            (503, NetworkError::ServerError),
            (404, NetworkError::Unknown(404)),
            (400, NetworkError::Unknown(400)),
        ];

        for (code, expected) in cases {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(NetworkError::from_status(status), expected, "status {}", code);
        }
    }

    #[test]
    fn test_display_includes_raw_code() {
        assert_eq!(
            NetworkError::Unknown(418).to_string(),
            "unexpected status code 418"
        );
    }
}
