use actix_web::http::StatusCode;
use actix_web::ResponseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay server is not running")]
    ServerUnavailable,

    #[error("relay server dropped the reply")]
    ReplyDropped,

    #[error("session {0} not found")]
    SessionNotFound(String),

    #[error("cannot decode frame: {0}")]
    Decode(#[from] system::serde_json::Error),
}

impl ResponseError for RelayError {
    fn status_code(&self) -> StatusCode {
        match self {
            RelayError::ServerUnavailable | RelayError::ReplyDropped => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            RelayError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            RelayError::Decode(_) => StatusCode::BAD_REQUEST,
        }
    }
}
