use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use controlview_core::{ControlViewError, FilterError, StoreError};
use tracing::error;

use crate::store::LookupError;

/// Errors that end a request before or inside a handler.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    ControlView(#[from] ControlViewError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("bad filter: {0}")]
    BadFilter(#[from] FilterError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::ControlView(err) if err.is_not_found() => {
                (StatusCode::NOT_FOUND, self.to_string()).into_response()
            }
            ApiError::ControlView(err) => {
                error!(%err, "controlview failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
            ApiError::Lookup(err @ LookupError::BadLineFilter { .. }) => {
                error!(%err, "recipe line filter failed after expansion");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
            ApiError::Store(_) | ApiError::Lookup(_) => {
                (StatusCode::NOT_FOUND, self.to_string()).into_response()
            }
            ApiError::BadFilter(_) => (StatusCode::BAD_REQUEST, self.to_string()).into_response(),
        }
    }
}
