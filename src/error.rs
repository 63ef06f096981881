//! Error taxonomy for the driver
//!
//! Transport and parsing failures never reach this type: the API client
//! absorbs them into `ApiResponse::Failed`. These variants describe what a
//! controller or the setup flow decided went wrong.

use thiserror::Error;

use crate::hub::StatusCode;

#[derive(Debug, Error)]
pub enum Error {
    /// App credentials are missing from the store.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Code exchange or token refresh failed.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Non-2xx status or transport failure on an authenticated call.
    #[error("upstream request failed: {0}")]
    Upstream(String),

    /// Malformed command parameters.
    #[error("invalid command parameters: {0}")]
    Validation(String),

    /// Premium-only command on a free account.
    #[error("command {0} requires Spotify Premium")]
    TierRestricted(String),

    /// Command or capability the entity does not offer.
    #[error("not supported: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<&Error> for StatusCode {
    fn from(err: &Error) -> Self {
        match err {
            Error::Configuration(_) | Error::Authentication(_) => StatusCode::ServiceUnavailable,
            Error::Upstream(_) => StatusCode::ServerError,
            Error::Validation(_) => StatusCode::BadRequest,
            // Free accounts get a silent acknowledgement.
            Error::TierRestricted(_) => StatusCode::Ok,
            Error::Unsupported(_) => StatusCode::NotImplemented,
        }
    }
}
